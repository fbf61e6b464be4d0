//! Operator-facing control commands and their delivery.
//!
//! # Responsibilities
//! - Parse `reload | stop | status`
//! - Map each command to the OS signal the coordinator listens for
//! - Locate the coordinator through its PID file and deliver the signal

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::lifecycle::pidfile::PidFile;

/// Command addressed to a running coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Reload,
    Stop,
    Status,
}

impl ControlCommand {
    /// Signal carrying this command.
    pub fn signal(self) -> Signal {
        match self {
            ControlCommand::Reload => Signal::SIGHUP,
            ControlCommand::Stop => Signal::SIGINT,
            ControlCommand::Status => Signal::SIGUSR1,
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlCommand::Reload => "reload",
            ControlCommand::Stop => "stop",
            ControlCommand::Status => "status",
        };
        f.write_str(name)
    }
}

impl FromStr for ControlCommand {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reload" => Ok(ControlCommand::Reload),
            "stop" => Ok(ControlCommand::Stop),
            "status" => Ok(ControlCommand::Status),
            _ => Err(ControlError::UnknownCommand(s.to_string())),
        }
    }
}

/// Error type for the control channel and PID file.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("unknown command {0:?}, expected reload, stop or status")]
    UnknownCommand(String),
    #[error("can't find pid file {}, is the server running?", .0.display())]
    NotRunning(PathBuf),
    #[error("pid file {} does not contain a process id", .0.display())]
    InvalidPid(PathBuf),
    #[error("pid file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to send {signal} to {pid}: {source}")]
    Deliver {
        pid: Pid,
        signal: Signal,
        #[source]
        source: nix::Error,
    },
}

/// Deliver `command` to the coordinator recorded in `pid_file`.
pub fn send_command(pid_file: &Path, command: ControlCommand) -> Result<Pid, ControlError> {
    let pid = PidFile::read(pid_file)?;
    let signal = command.signal();
    kill(pid, signal).map_err(|source| ControlError::Deliver {
        pid,
        signal,
        source,
    })?;
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!("reload".parse::<ControlCommand>().unwrap(), ControlCommand::Reload);
        assert_eq!("STOP".parse::<ControlCommand>().unwrap(), ControlCommand::Stop);
        assert_eq!("status".parse::<ControlCommand>().unwrap(), ControlCommand::Status);
    }

    #[test]
    fn unknown_command_is_rejected() {
        let err = "restart".parse::<ControlCommand>().unwrap_err();
        assert!(matches!(err, ControlError::UnknownCommand(ref c) if c == "restart"));
    }

    #[test]
    fn signal_mapping() {
        assert_eq!(ControlCommand::Reload.signal(), Signal::SIGHUP);
        assert_eq!(ControlCommand::Stop.signal(), Signal::SIGINT);
        assert_eq!(ControlCommand::Status.signal(), Signal::SIGUSR1);
    }

    #[test]
    fn missing_pid_file_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = send_command(&dir.path().join("memserve.pid"), ControlCommand::Stop).unwrap_err();
        assert!(matches!(err, ControlError::NotRunning(_)));
    }
}
