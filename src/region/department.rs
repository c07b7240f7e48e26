use std::{collections::BTreeMap, sync::{Arc, OnceLock}};

use regex::Regex;

/// Department code to region name table for metropolitan France.
const FRANCE: &[(&str, &str)] = &[
    ("75", "Île-de-France"), ("77", "Île-de-France"), ("78", "Île-de-France"), ("91", "Île-de-France"),
    ("92", "Île-de-France"), ("93", "Île-de-France"), ("94", "Île-de-France"), ("95", "Île-de-France"),
    ("18", "Centre-Val de Loire"), ("28", "Centre-Val de Loire"), ("36", "Centre-Val de Loire"),
    ("37", "Centre-Val de Loire"), ("41", "Centre-Val de Loire"), ("45", "Centre-Val de Loire"),
    ("21", "Bourgogne-Franche-Comté"), ("25", "Bourgogne-Franche-Comté"), ("39", "Bourgogne-Franche-Comté"),
    ("58", "Bourgogne-Franche-Comté"), ("70", "Bourgogne-Franche-Comté"), ("71", "Bourgogne-Franche-Comté"),
    ("89", "Bourgogne-Franche-Comté"), ("90", "Bourgogne-Franche-Comté"),
    ("14", "Normandie"), ("27", "Normandie"), ("50", "Normandie"), ("61", "Normandie"), ("76", "Normandie"),
    ("02", "Hauts-de-France"), ("59", "Hauts-de-France"), ("60", "Hauts-de-France"),
    ("62", "Hauts-de-France"), ("80", "Hauts-de-France"),
    ("08", "Grand Est"), ("10", "Grand Est"), ("51", "Grand Est"), ("52", "Grand Est"), ("54", "Grand Est"),
    ("55", "Grand Est"), ("57", "Grand Est"), ("67", "Grand Est"), ("68", "Grand Est"), ("88", "Grand Est"),
    ("44", "Pays de la Loire"), ("49", "Pays de la Loire"), ("53", "Pays de la Loire"),
    ("72", "Pays de la Loire"), ("85", "Pays de la Loire"),
    ("22", "Bretagne"), ("29", "Bretagne"), ("35", "Bretagne"), ("56", "Bretagne"),
    ("16", "Nouvelle-Aquitaine"), ("17", "Nouvelle-Aquitaine"), ("19", "Nouvelle-Aquitaine"),
    ("23", "Nouvelle-Aquitaine"), ("24", "Nouvelle-Aquitaine"), ("33", "Nouvelle-Aquitaine"),
    ("40", "Nouvelle-Aquitaine"), ("47", "Nouvelle-Aquitaine"), ("64", "Nouvelle-Aquitaine"),
    ("79", "Nouvelle-Aquitaine"), ("86", "Nouvelle-Aquitaine"), ("87", "Nouvelle-Aquitaine"),
    ("09", "Occitanie"), ("11", "Occitanie"), ("12", "Occitanie"), ("30", "Occitanie"), ("31", "Occitanie"),
    ("32", "Occitanie"), ("34", "Occitanie"), ("46", "Occitanie"), ("48", "Occitanie"), ("65", "Occitanie"),
    ("66", "Occitanie"), ("81", "Occitanie"), ("82", "Occitanie"),
    ("01", "Auvergne-Rhône-Alpes"), ("03", "Auvergne-Rhône-Alpes"), ("07", "Auvergne-Rhône-Alpes"),
    ("15", "Auvergne-Rhône-Alpes"), ("26", "Auvergne-Rhône-Alpes"), ("38", "Auvergne-Rhône-Alpes"),
    ("42", "Auvergne-Rhône-Alpes"), ("43", "Auvergne-Rhône-Alpes"), ("63", "Auvergne-Rhône-Alpes"),
    ("69", "Auvergne-Rhône-Alpes"), ("73", "Auvergne-Rhône-Alpes"), ("74", "Auvergne-Rhône-Alpes"),
    ("04", "Provence-Alpes-Côte d'Azur"), ("05", "Provence-Alpes-Côte d'Azur"),
    ("06", "Provence-Alpes-Côte d'Azur"), ("13", "Provence-Alpes-Côte d'Azur"),
    ("83", "Provence-Alpes-Côte d'Azur"), ("84", "Provence-Alpes-Côte d'Azur"),
    ("2A", "Corse"), ("2B", "Corse"),
];

/// Leading department code of a parcel identifier: Corsica's `2A`/`2B` or two digits.
fn id_prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(2[AaBb]|\d{2})").expect("valid department prefix regex"))
}

/// Canonical form of a department code: trimmed, upper-case, single digits zero-padded.
pub(crate) fn normalize_code(code: &str) -> String {
    let code = code.trim().to_uppercase();
    if code.len() == 1 && code.chars().all(|c| c.is_ascii_digit()) {
        format!("0{code}")
    } else {
        code
    }
}

/// Injected department -> region mapping used by the attribute-based strategies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepartmentTable {
    regions: BTreeMap<String, Arc<str>>,
}

impl DepartmentTable {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut names: BTreeMap<&str, Arc<str>> = BTreeMap::new();
        let regions = pairs.into_iter()
            .map(|(code, region)| {
                // Share one allocation per region name.
                let name = names.entry(region).or_insert_with(|| Arc::from(region)).clone();
                (normalize_code(code), name)
            })
            .collect();
        Self { regions }
    }

    /// The metropolitan France table.
    pub fn france() -> Self {
        Self::from_pairs(FRANCE.iter().copied())
    }

    #[inline] pub fn len(&self) -> usize { self.regions.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.regions.is_empty() }

    /// Region of a department code, if the table knows it.
    pub fn lookup(&self, code: &str) -> Option<Arc<str>> {
        self.regions.get(&normalize_code(code)).cloned()
    }

    /// Department code inferred from the start of a parcel identifier.
    pub fn department_from_id(id: &str) -> Option<String> {
        id_prefix_pattern().captures(id)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
    }

    /// Distinct region names in the table.
    pub fn region_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.regions.values().cloned().collect();
        names.sort();
        names.dedup();
        names
    }
}
