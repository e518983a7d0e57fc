//! `blockpar` global configuration options.
//!
//! See [`Config`] for the list of options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use blockpar_plan::DEFAULT_ESTIMATED_COMPRESSION_RATIO;

/// Global configuration options for the `blockpar` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Worker Count
/// > default: [`std::thread::available_parallelism`] (or 1 if it is unavailable)
///
/// The number of workers used to compress or decompress chunks when [`ParallelOptions`](crate::ParallelOptions) are created with their default.
///
/// ## Estimated Compression Ratio
/// > default: `3.0`
///
/// The estimated ratio of uncompressed to compressed size used to size chunks with a cache target partition policy, if one is not supplied.
///
/// ## Header Indent
/// > default: `4`
///
/// The number of spaces used to indent a layout header written with [`write_header`](crate::layout::write_header).
#[derive(Debug, Clone)]
pub struct Config {
    worker_count: usize,
    estimated_compression_ratio: f64,
    header_indent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism().map_or(1, std::num::NonZero::get),
            estimated_compression_ratio: DEFAULT_ESTIMATED_COMPRESSION_RATIO,
            header_indent: 4,
        }
    }
}

impl Config {
    /// Get the [worker count](#worker-count) configuration.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Set the [worker count](#worker-count) configuration.
    pub fn set_worker_count(&mut self, worker_count: usize) -> &mut Self {
        self.worker_count = worker_count;
        self
    }

    /// Get the [estimated compression ratio](#estimated-compression-ratio) configuration.
    #[must_use]
    pub fn estimated_compression_ratio(&self) -> f64 {
        self.estimated_compression_ratio
    }

    /// Set the [estimated compression ratio](#estimated-compression-ratio) configuration.
    pub fn set_estimated_compression_ratio(
        &mut self,
        estimated_compression_ratio: f64,
    ) -> &mut Self {
        self.estimated_compression_ratio = estimated_compression_ratio;
        self
    }

    /// Get the [header indent](#header-indent) configuration.
    #[must_use]
    pub fn header_indent(&self) -> usize {
        self.header_indent
    }

    /// Set the [header indent](#header-indent) configuration.
    pub fn set_header_indent(&mut self, header_indent: usize) -> &mut Self {
        self.header_indent = header_indent;
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global `blockpar` configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global `blockpar` configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
