//! Timing utilities for the optional profiling phase
//!
//! - [`kernel_timer`]: start/stop and scoped wall-clock timers
//! - [`profile`]: warm-up plus timed-loop averages

pub mod kernel_timer;
pub mod profile;

pub use kernel_timer::{KernelTimer, ScopedTimer};
pub use profile::{profile_operation, speedup, try_profile_operation, ProfileSample};
