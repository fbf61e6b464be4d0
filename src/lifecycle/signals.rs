//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGHUP, SIGINT, SIGTERM, SIGUSR1)
//! - Translate signals to [`ControlCommand`]s for the supervisor
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGINT and SIGTERM both mean stop; SIGHUP means reload
//! - SIGUSR1 carries `status`, which the supervisor accepts but does not act on

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::control::ControlCommand;

/// Forward signals to `commands` until the receiving side goes away.
pub fn listen(commands: mpsc::Sender<ControlCommand>) -> io::Result<JoinHandle<()>> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut status = signal(SignalKind::user_defined1())?;

    Ok(tokio::spawn(async move {
        loop {
            let command = tokio::select! {
                _ = hangup.recv() => ControlCommand::Reload,
                _ = interrupt.recv() => ControlCommand::Stop,
                _ = terminate.recv() => ControlCommand::Stop,
                _ = status.recv() => ControlCommand::Status,
            };
            tracing::info!(%command, "Signal received");
            if commands.send(command).await.is_err() {
                break;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::{raise, Signal};
    use std::time::Duration;

    #[tokio::test]
    async fn signals_become_commands() {
        let (tx, mut rx) = mpsc::channel(4);
        let task = listen(tx).unwrap();

        let cases = [
            (Signal::SIGHUP, ControlCommand::Reload),
            (Signal::SIGTERM, ControlCommand::Stop),
            (Signal::SIGINT, ControlCommand::Stop),
            (Signal::SIGUSR1, ControlCommand::Status),
        ];
        for (signal, expected) in cases {
            raise(signal).unwrap();
            let command = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("no command for signal");
            assert_eq!(command, Some(expected), "{signal}");
        }

        task.abort();
    }
}
