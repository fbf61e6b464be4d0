//! PID file: the only state persisted across processes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::Pid;

use crate::config::schema::SERVICE_NAME;
use crate::lifecycle::control::ControlError;

/// PID file written by the coordinator; removed on stop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// `<dir>/<service>.pid`
    pub fn path_for(dir: &Path) -> PathBuf {
        dir.join(format!("{SERVICE_NAME}.pid"))
    }

    /// Record the current process id in `dir`.
    pub fn create(dir: &Path) -> Result<Self, ControlError> {
        let path = Self::path_for(dir);
        fs::write(&path, std::process::id().to_string()).map_err(|source| ControlError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "PID file written");
        Ok(Self { path })
    }

    /// Read the process id stored at `path`.
    pub fn read(path: &Path) -> Result<Pid, ControlError> {
        let content = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ControlError::NotRunning(path.to_path_buf()),
            _ => ControlError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        content
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|pid| *pid > 0)
            .map(Pid::from_raw)
            .ok_or_else(|| ControlError::InvalidPid(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::create(dir.path()).unwrap();
        assert_eq!(pid_file.path(), dir.path().join("memserve.pid"));

        let pid = PidFile::read(pid_file.path()).unwrap();
        assert_eq!(pid.as_raw() as u32, std::process::id());

        pid_file.remove().unwrap();
        assert!(matches!(
            PidFile::read(pid_file.path()),
            Err(ControlError::NotRunning(_))
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = PidFile::path_for(dir.path());
        fs::write(&path, "not a pid").unwrap();
        assert!(matches!(PidFile::read(&path), Err(ControlError::InvalidPid(_))));
    }

    #[test]
    fn unwritable_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PidFile::create(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ControlError::Io { .. }));
    }
}
