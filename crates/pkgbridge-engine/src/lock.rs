use crate::EngineError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Exclusive lock on a target root, held for as long as the target is loaded.
#[derive(Debug)]
pub struct TargetLock {
    lock_file: File,
}

impl TargetLock {
    pub fn try_acquire(lock_path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(EngineError::Locked(lock_path.display().to_string()));
        }
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { lock_file: file })
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/zypp.pid");

        let first = TargetLock::try_acquire(&path).unwrap();
        assert!(path.exists());
        assert!(matches!(
            TargetLock::try_acquire(&path),
            Err(EngineError::Locked(_))
        ));

        drop(first);
        assert!(TargetLock::try_acquire(&path).is_ok());
    }
}
