use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub fn assert_not_stdout(path: &Path) -> Result<()> {
    if path == Path::new("-") {
        bail!("stdout is not supported; provide a real file path.");
    }
    Ok(())
}

/// Write-then-rename wrapper so a failed run never leaves a half-written output.
pub struct PendingWrite {
    target: PathBuf,
    tmp: NamedTempFile,
}

pub fn open_for_write(target: &Path, force: bool) -> Result<PendingWrite> {
    let parent = target.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("create dir {}", parent.display()))?;
    if !force && target.exists() {
        bail!("Refusing to overwrite existing file: {} (use --force)", target.display());
    }
    let tmp = NamedTempFile::new_in(parent).context("create temp file")?;
    Ok(PendingWrite { target: target.to_path_buf(), tmp })
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.tmp.write(buf) }

    fn flush(&mut self) -> std::io::Result<()> { self.tmp.flush() }
}

impl PendingWrite {
    /// Move the finished temp file over the target.
    pub fn finalize(self) -> Result<()> {
        self.tmp.as_file().sync_all().ok(); // best-effort fsync file
        self.tmp.persist(&self.target)
            .with_context(|| format!("rename to {}", self.target.display()))?;
        if let Some(dir) = self.target.parent() {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old").unwrap();

        assert!(open_for_write(&path, false).is_err());

        let mut pending = open_for_write(&path, true).unwrap();
        pending.write_all(b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        pending.finalize().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn stdout_dash_is_rejected() {
        assert!(assert_not_stdout(Path::new("-")).is_err());
        assert!(assert_not_stdout(Path::new("a.txt")).is_ok());
    }
}
