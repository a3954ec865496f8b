//! Wall-clock timers for operator and reference calls
//!
//! Offloaded work is fenced by the caller (the driver synchronizes the
//! operator inside the timed region), so a host `Instant` is enough here.
//!
//! ```rust
//! use sampleforge::profiling::KernelTimer;
//!
//! let mut timer = KernelTimer::for_operation("reference");
//! timer.start_cpu();
//! // ... run the operation ...
//! timer.stop_cpu();
//! assert!(timer.elapsed().is_some());
//! ```

use std::time::Instant;

/// Start/stop timer reporting milliseconds
#[derive(Debug)]
pub struct KernelTimer {
    label: String,
    started: Option<Instant>,
    elapsed_ms: Option<f64>,
}

impl KernelTimer {
    pub fn for_operation(label: impl Into<String>) -> Self {
        KernelTimer {
            label: label.into(),
            started: None,
            elapsed_ms: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Start (or restart) the timer, clearing any previous reading
    pub fn start_cpu(&mut self) {
        self.started = Some(Instant::now());
        self.elapsed_ms = None;
    }

    /// Stop the timer; a timer that was never started keeps no reading
    pub fn stop_cpu(&mut self) {
        if let Some(start) = self.started.take() {
            self.elapsed_ms = Some(start.elapsed().as_secs_f64() * 1000.0);
        }
    }

    /// Elapsed milliseconds, `None` until stopped
    pub fn elapsed(&self) -> Option<f64> {
        self.elapsed_ms
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }
}

/// Logs the time from creation to drop at `debug`
#[derive(Debug)]
pub struct ScopedTimer {
    label: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(label: impl Into<String>) -> Self {
        ScopedTimer {
            label: label.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        tracing::debug!("{}: {:.3} ms", self.label, self.elapsed_ms());
    }
}
