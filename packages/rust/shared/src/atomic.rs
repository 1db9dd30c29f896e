//! Atomic file writes: temp sibling + rename.
//!
//! The temp file lives in the destination's directory so the rename never
//! crosses a filesystem. Readers see the old complete content or the new
//! complete content, never a partial write.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PresslineError, Result};

/// A write that has reached its temp file but not yet the destination.
///
/// Dropping it without [`StagedWrite::commit`] removes the temp file.
#[derive(Debug)]
pub struct StagedWrite {
    temp: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Write `bytes` to a fresh temp file next to `dest` and fsync it.
    pub fn stage(dest: &Path, bytes: &[u8]) -> Result<Self> {
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| PresslineError::io(&dir, e))?;

        let name = dest
            .file_name()
            .ok_or_else(|| {
                PresslineError::validation(format!("not a file path: {}", dest.display()))
            })?
            .to_string_lossy();
        let temp = dir.join(format!(".{name}.{}.tmp", uuid::Uuid::now_v7()));

        // Constructed before the write so a failed write still cleans up.
        let staged = Self {
            temp,
            dest: dest.to_path_buf(),
            committed: false,
        };

        let mut file =
            File::create(&staged.temp).map_err(|e| PresslineError::io(&staged.temp, e))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| PresslineError::io(&staged.temp, e))?;

        Ok(staged)
    }

    /// Path of the staged temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Rename the temp file over the destination.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.temp, &self.dest).map_err(|e| PresslineError::io(&self.dest, e))?;
        self.committed = true;
        debug!(path = %self.dest.display(), "atomic write committed");
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp);
        }
    }
}

/// Replace `path` with `bytes` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    StagedWrite::stage(path, bytes)?.commit()
}

/// Atomically write `content` unless the file already holds exactly these
/// bytes. Returns whether a write happened.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    match fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            debug!(path = %path.display(), "content unchanged, skipping write");
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(PresslineError::io(path, e)),
    }

    write_atomic(path, content.as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pl-atomic-test-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn write_atomic_replaces_content() {
        let tmp = temp_dir();
        let path = tmp.join("tasks.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(leftover_temp_files(&tmp).is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let tmp = temp_dir();
        let path = tmp.join("automation").join("tasks.json");

        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn crash_before_rename_keeps_prior_content() {
        let tmp = temp_dir();
        let path = tmp.join("tasks.json");
        fs::write(&path, "old complete content").unwrap();

        let staged = StagedWrite::stage(&path, b"new content that never lands").unwrap();
        let temp = staged.temp_path().to_path_buf();
        // A crash skips all cleanup, including Drop.
        std::mem::forget(staged);

        assert_eq!(fs::read_to_string(&path).unwrap(), "old complete content");
        assert!(temp.exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn abandoned_stage_removes_temp_file() {
        let tmp = temp_dir();
        let path = tmp.join("tasks.json");
        fs::write(&path, "old").unwrap();

        drop(StagedWrite::stage(&path, b"new").unwrap());

        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
        assert!(leftover_temp_files(&tmp).is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_if_changed_skips_identical_content() {
        let tmp = temp_dir();
        let path = tmp.join("sitemap.xml");

        assert!(write_if_changed(&path, "<urlset/>").unwrap());
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();

        assert!(!write_if_changed(&path, "<urlset/>").unwrap());
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), mtime);

        assert!(write_if_changed(&path, "<urlset></urlset>").unwrap());

        let _ = fs::remove_dir_all(&tmp);
    }
}
