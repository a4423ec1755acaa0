use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use super::RunLockError;

/// Exclusive claim on a catalog for the duration of one sync run.
///
/// The lock is a `<catalog>.lock` file created with create-new semantics and
/// removed when the guard is dropped. A lock left behind by a crashed process
/// must be removed by hand.
#[derive(Debug)]
pub struct RunLock {
    path: Utf8PathBuf,
}

impl RunLock {
    /// Take the lock guarding `catalog`.
    pub fn acquire(catalog: &Utf8Path) -> Result<Self, RunLockError> {
        let path = lock_path(catalog);
        let io_error = |source: io::Error| RunLockError::Io {
            path: path.clone(),
            source,
        };
        forecourt_fs::ensure_parent_dir(&path).map_err(io_error)?;
        let owner = std::process::id().to_string();
        match forecourt_fs::create_exclusive(&path, owner.as_bytes()) {
            Ok(()) => {
                log::debug!("acquired sync lock {path}");
                Ok(Self { path })
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(RunLockError::Held { path })
            }
            Err(err) => Err(io_error(err)),
        }
    }

    /// Location of the lock file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = forecourt_fs::remove_if_present(&self.path) {
            log::warn!("failed to release sync lock {}: {err}", self.path);
        }
    }
}

fn lock_path(catalog: &Utf8Path) -> Utf8PathBuf {
    let mut name = catalog.as_str().to_owned();
    name.push_str(".lock");
    Utf8PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn catalog(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("catalog.sqlite")).expect("UTF-8 temp path")
    }

    #[rstest]
    fn second_acquire_reports_the_holder(temp_dir: TempDir) {
        let catalog = catalog(&temp_dir);
        let guard = RunLock::acquire(&catalog).expect("first acquire succeeds");
        assert_eq!(guard.path().as_str(), format!("{catalog}.lock"));
        match RunLock::acquire(&catalog) {
            Err(RunLockError::Held { path }) => assert_eq!(path, guard.path()),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[rstest]
    fn dropping_the_guard_releases_the_lock(temp_dir: TempDir) {
        let catalog = catalog(&temp_dir);
        let guard = RunLock::acquire(&catalog).expect("first acquire succeeds");
        let path = guard.path().to_owned();
        drop(guard);
        assert!(!path.exists());
        RunLock::acquire(&catalog).expect("lock is free again");
    }
}
