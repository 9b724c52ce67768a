use std::io;

use thiserror::Error;

/// Errors surfaced while constructing runtime components.
///
/// These are setup failures only: once an [`IoService`](crate::IoService)
/// exists, readiness problems travel as
/// [`PollStatus`](crate::PollStatus) values instead of errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The kernel readiness multiplexer (epoll/kqueue) could not be created.
    #[error("failed to create readiness multiplexer: {0}")]
    Multiplexer(#[source] io::Error),

    /// A wake file descriptor could not be created.
    #[error("failed to create wake descriptor: {0}")]
    WakeFd(#[source] io::Error),

    /// A wake file descriptor could not be registered with the multiplexer.
    #[error("failed to register wake descriptor: {0}")]
    WakeRegistration(#[source] io::Error),

    /// The dedicated I/O thread could not be spawned.
    #[error("failed to spawn reactor thread: {0}")]
    ReactorThread(#[source] io::Error),
}
