mod geojson;
mod json;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

pub use geojson::{feature, feature_collection, read_regions, regions_from_geojson, write_geojson};
pub use json::{round_floats, to_json_value, write_json};

/// Path meaning "write to standard output".
pub fn is_stdout(path: &Path) -> bool {
    path == Path::new("-")
}

/// Write-then-rename wrapper, so a failed run never leaves a truncated output.
pub(crate) struct PendingWrite {
    target: PathBuf,
    tmp: BufWriter<NamedTempFile>,
}

impl PendingWrite {
    pub(crate) fn open(target: &Path) -> Result<Self> {
        let parent = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
        let tmp = NamedTempFile::new_in(parent).context("create temp file")?;
        Ok(Self { target: target.to_path_buf(), tmp: BufWriter::new(tmp) })
    }

    pub(crate) fn finalize(self) -> Result<()> {
        let tmp = self.tmp.into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("flush {}", self.target.display()))?;
        tmp.as_file().sync_all().ok();
        tmp.persist(&self.target)
            .with_context(|| format!("rename to {}", self.target.display()))?;
        if let Some(dir) = self.target.parent() {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(())
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tmp.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.tmp.flush()
    }
}
