//! # Runtime
//!
//! Named [Tokio](https://tokio.rs) runtime profiles for Scribe binaries.
//!
//! Inference runs on the blocking pool (`spawn_blocking`), so the profiles size
//! `max_blocking_threads` next to the async worker count.
//!
//! ## Profiles
//! * **Server**: one worker per core, a blocking pool of twice the core count for model calls.
//! * **Compact**: half the workers and a small blocking pool, for tools and tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[scribe_runtime::main(server)]
//! async fn main() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use scribe_derive::main;

use anyhow::anyhow;
use std::{sync::OnceLock, thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// The default number of worker threads if detection fails.
const DEFAULT_WORKER_THREADS: usize = 4;
/// The default stack size for threads (3 `MiB`).
const DEFAULT_STACK_SIZE: usize = 3 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 1024 * 1024;
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
/// Tokio's own default for the blocking pool.
const DEFAULT_BLOCKING_THREADS: usize = 512;
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(60);

static WORKER_THREADS: OnceLock<usize> = OnceLock::new();

/// `TOKIO_WORKER_THREADS` when set and sane, otherwise the available parallelism.
fn detected_workers() -> usize {
    *WORKER_THREADS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0 && n <= 1024)
            .unwrap_or_else(|| {
                available_parallelism().map(std::num::NonZero::get).unwrap_or(DEFAULT_WORKER_THREADS)
            })
    })
}

/// Configuration for the Tokio runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub max_blocking_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: detected_workers(),
            max_blocking_threads: DEFAULT_BLOCKING_THREADS,
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: "scribe-worker".to_owned(),
            thread_keep_alive: THREAD_KEEP_ALIVE,
        }
    }
}

impl RuntimeConfig {
    /// Profile for the HTTP service.
    ///
    /// The CRNN forward pass is CPU bound; more concurrent model calls than cores only
    /// adds contention, so the blocking pool is capped at twice the core count.
    #[must_use]
    pub fn server() -> Self {
        let workers = detected_workers();
        Self {
            worker_threads: workers,
            max_blocking_threads: workers * 2,
            stack_size: 4 * 1024 * 1024,
            thread_name: "scribe-server".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
        }
    }

    /// Profile for small tools and tests.
    #[must_use]
    pub fn compact() -> Self {
        let workers = (detected_workers() / 2).max(1);
        Self {
            worker_threads: workers,
            max_blocking_threads: workers,
            stack_size: 2 * 1024 * 1024,
            thread_name: "scribe-compact".to_owned(),
            thread_keep_alive: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, 1024);
        self
    }

    #[must_use]
    pub fn with_max_blocking_threads(mut self, threads: usize) -> Self {
        self.max_blocking_threads = threads.clamp(1, DEFAULT_BLOCKING_THREADS);
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.thread_name = if name.trim().is_empty() { "scribe-worker".to_owned() } else { name };
        self
    }

    fn normalized(&self) -> Self {
        self.clone()
            .with_worker_threads(self.worker_threads)
            .with_max_blocking_threads(self.max_blocking_threads)
            .with_stack_size(self.stack_size)
            .with_thread_name(self.thread_name.clone())
    }
}

/// Builds a multi-threaded runtime from `config`. Out-of-range values are clamped.
///
/// # Errors
///
/// Returns an error if the OS refuses to create the runtime threads.
pub fn build_runtime(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.normalized();
    debug!(config = ?config, "Building tokio runtime");

    Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .max_blocking_threads(config.max_blocking_threads)
        .thread_name(&config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all()
        .build()
        .map_err(|e| anyhow!("Failed to initialize runtime: {e}"))
}
