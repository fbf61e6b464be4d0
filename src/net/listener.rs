//! Shared TCP listener.
//!
//! # Responsibilities
//! - Bind the configured address once, in the coordinator
//! - Hand every worker a clone of the same socket so the kernel spreads
//!   connections across the pool
//!
//! The socket is left non-blocking so workers can adopt it into their own
//! Tokio runtime with `TcpListener::from_std`.

use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use crate::config::ServerConfig;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("invalid bind address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bind address {0} resolved to nothing")]
    Unresolved(String),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind the server socket.
pub fn bind(config: &ServerConfig) -> Result<TcpListener, ListenerError> {
    let address = config.bind_address();
    let addr = address
        .to_socket_addrs()
        .map_err(|source| ListenerError::Address {
            address: address.clone(),
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::Unresolved(address.clone()))?;

    let listener = TcpListener::bind(addr)
        .and_then(|listener| {
            listener.set_nonblocking(true)?;
            Ok(listener)
        })
        .map_err(|source| ListenerError::Bind {
            address: addr,
            source,
        })?;

    let local = listener.local_addr().unwrap_or(addr);
    tracing::info!(address = %local, "Listener bound");

    Ok(listener)
}
