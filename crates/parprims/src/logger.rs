//! Verbosity-gated dispatch logging.
//!
//! [`DispatchLogger`] is the optional instrumentation wrapped around each
//! grid dispatch. It never influences control flow: at
//! [`Verbosity::Silent`] every method is a no-op, and at higher levels the
//! messages go to the `log` facade under the `parprims` target.

use std::time::Instant;

/// Verbosity level for dispatch output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Only warnings.
    Warning,
    /// Strategy selection and sizing.
    Info,
    /// Region shape and per-kernel timing.
    Debug,
}

/// Logs and times grid dispatches.
#[derive(Clone, Copy, Debug)]
pub struct DispatchLogger {
    verbosity: Verbosity,
}

impl DispatchLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    /// Report the size returned by a sizing-only call.
    pub fn log_storage_size(&self, bytes: usize) {
        if self.enabled(Verbosity::Info) {
            log::info!(target: "parprims", "temporary storage size: {} bytes", bytes);
        }
    }

    /// Report the sample region before the first dispatch.
    pub fn log_region(&self, columns: usize, rows: usize, blocks_x: usize) {
        if self.enabled(Verbosity::Debug) {
            log::debug!(target: "parprims", "columns {}", columns);
            log::debug!(target: "parprims", "rows {}", rows);
            log::debug!(target: "parprims", "blocks_x {}", blocks_x);
        }
    }

    /// Report which accumulation strategy was selected.
    pub fn log_strategy(&self, strategy: &str, total_bins: usize, threshold: usize) {
        if self.enabled(Verbosity::Info) {
            log::info!(
                target: "parprims",
                "{} strategy ({} total bins, threshold {})",
                strategy,
                total_bins,
                threshold
            );
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.enabled(Verbosity::Warning) {
            log::warn!(target: "parprims", "{}", msg);
        }
    }

    /// Run one dispatch, logging `name(size) <ms> ms` when at `Debug`.
    pub fn time<T>(&self, name: &str, size: usize, dispatch: impl FnOnce() -> T) -> T {
        if !self.enabled(Verbosity::Debug) {
            return dispatch();
        }
        let start = Instant::now();
        let out = dispatch();
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        log::debug!(target: "parprims", "{}({}) {:.3} ms", name, size, ms);
        out
    }
}

impl Default for DispatchLogger {
    fn default() -> Self {
        Self::new(Verbosity::Silent)
    }
}
