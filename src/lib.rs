//! # Riffle
//!
//! **Riffle** is a small, general-purpose asynchronous runtime built around
//! kernel readiness notifications. It provides the primitives an application
//! needs to express concurrent work: lazy [`Task`]s, executors that own
//! worker threads, an I/O reactor ([`IoService`]) that turns epoll/kqueue
//! readiness into resumptions, and composition primitives ([`all()`],
//! [`Event`], [`Latch`], [`sync()`], [`generator()`]).
//!
//! Riffle is readiness-based, not completion-based: the reactor watches file
//! descriptors and resumes the coroutine that asked, on a worker thread of
//! the bound executor. It deliberately has no timers, no work stealing and no
//! cancellation; coroutines run to completion.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use riffle::{sync, ExecutorHandle, IoService, MultiThreadExecutor, PollStatus, PollType};
//!
//! let executor = Arc::new(MultiThreadExecutor::new(4));
//! let io = IoService::new(executor.clone()).unwrap();
//!
//! let status = sync(async move {
//!     // hop onto a worker thread, then wait for `fd` to become readable
//!     io.schedule().await;
//!     io.poll(fd, PollType::Read).await
//! });
//! assert_eq!(status, PollStatus::Ready);
//! ```
//!
//! ## Modules
//!
//! - [`executor`] — single- and multi-threaded executors
//! - [`reactor`] — the I/O service bridging kernel readiness to resumption
//! - [`mod@sync`] — [`Event`], [`Latch`] and the blocking [`sync()`] bridge
//! - [`task`] — the lazy, one-shot [`Task`] and the driver machinery
//! - [`generator()`] — lazy yielded sequences

mod all;
mod error;
mod generator;
mod utils;

pub mod executor;
pub mod reactor;
pub mod sync;
pub mod task;

pub use all::{AllAwaitable, AllTask, all};
pub use error::Error;
pub use executor::{Executor, ExecutorHandle, MultiThreadExecutor, SingleThreadExecutor, Start};
pub use generator::{Generator, Yielder, generator};
pub use reactor::{IoService, PollStatus, PollType};
pub use sync::{Event, Latch, sync};
pub use task::Task;
