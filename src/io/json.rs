use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::debug;

use crate::io::{is_stdout, PendingWrite};

/// Round every float in `value` to `places` decimals. Integers are left alone.
pub fn round_floats(value: &mut Value, places: u32) {
    let scale = 10f64.powi(places as i32);
    match value {
        Value::Number(n) if n.is_f64() => {
            if let Some(rounded) = n.as_f64().and_then(|x| Number::from_f64((x * scale).round() / scale)) {
                *n = rounded;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| round_floats(v, places)),
        Value::Object(map) => map.values_mut().for_each(|v| round_floats(v, places)),
        _ => {}
    }
}

/// Serialize `data`, rounding floats when `precision` is set.
pub fn to_json_value<T: Serialize + ?Sized>(data: &T, precision: Option<u32>) -> Result<Value> {
    let mut value = serde_json::to_value(data).context("Failed to serialize output")?;
    if let Some(places) = precision {
        round_floats(&mut value, places);
    }
    Ok(value)
}

/// Pretty-print `data` as JSON to `path` (`-` for stdout).
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T, precision: Option<u32>) -> Result<()> {
    let value = to_json_value(data, precision)?;
    if is_stdout(path) {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &value)?;
        writeln!(out)?;
        return Ok(());
    }

    let mut pending = PendingWrite::open(path)?;
    serde_json::to_writer_pretty(&mut pending, &value)
        .with_context(|| format!("Failed to write JSON: {}", path.display()))?;
    pending.finalize()?;
    debug!(path = %path.display(), "wrote JSON");
    Ok(())
}
