use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Conditions that make a single parcel record unusable.
///
/// None of these abort a run: the fold skips the record, bumps the tally for
/// the matching [`SkipReason`] and carries on with the next one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParcelError {
    /// Bad container magic, unknown envelope indicator, or a truncated payload.
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),

    /// Well-formed container holding a geometry type we do not handle.
    #[error("unsupported geometry type {0}")]
    UnsupportedGeometry(u32),

    /// Coordinate outside the transform domain.
    #[error("reprojection failed for ({x}, {y}): {message}")]
    ReprojectionError { x: f64, y: f64, message: String },

    /// A required attribute is absent.
    #[error("missing attribute: {0}")]
    MissingAttribute(&'static str),

    /// An attribute is present but cannot be interpreted.
    #[error("invalid attribute {field}: {value:?}")]
    InvalidAttribute { field: &'static str, value: String },
}

pub type ParcelResult<T> = Result<T, ParcelError>;

impl ParcelError {
    #[inline]
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedGeometry(message.into())
    }

    /// The skip category this error is tallied under.
    pub fn reason(&self) -> SkipReason {
        match self {
            Self::MalformedGeometry(_) => SkipReason::MalformedGeometry,
            Self::UnsupportedGeometry(_) => SkipReason::UnsupportedGeometry,
            Self::ReprojectionError { .. } => SkipReason::Reprojection,
            Self::MissingAttribute(_) => SkipReason::MissingAttribute,
            Self::InvalidAttribute { .. } => SkipReason::InvalidAttribute,
        }
    }
}

/// Why a record was left out of every bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MalformedGeometry,
    UnsupportedGeometry,
    Reprojection,
    MissingAttribute,
    InvalidAttribute,
}

impl SkipReason {
    pub const ALL: [SkipReason; 5] = [
        SkipReason::MalformedGeometry,
        SkipReason::UnsupportedGeometry,
        SkipReason::Reprojection,
        SkipReason::MissingAttribute,
        SkipReason::InvalidAttribute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MalformedGeometry => "malformed_geometry",
            SkipReason::UnsupportedGeometry => "unsupported_geometry",
            SkipReason::Reprojection => "reprojection",
            SkipReason::MissingAttribute => "missing_attribute",
            SkipReason::InvalidAttribute => "invalid_attribute",
        }
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
