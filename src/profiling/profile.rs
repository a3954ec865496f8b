//! Warm-up plus timed-loop measurement of a single call

use serde::Serialize;

use super::KernelTimer;

/// Average cost of one call over a timed loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSample {
    pub label: String,
    pub iterations: usize,
    pub avg_ms: f64,
}

/// Run `f` `num_prerun` times untimed, then `num_iterations` times timed
///
/// With zero iterations the average is reported as `0.0`.
pub fn profile_operation<F>(
    label: &str,
    num_prerun: usize,
    num_iterations: usize,
    mut f: F,
) -> ProfileSample
where
    F: FnMut(),
{
    match try_profile_operation::<_, std::convert::Infallible>(
        label,
        num_prerun,
        num_iterations,
        || {
            f();
            Ok(())
        },
    ) {
        Ok(sample) => sample,
        Err(never) => match never {},
    }
}

/// Fallible variant; stops at the first error
pub fn try_profile_operation<F, E>(
    label: &str,
    num_prerun: usize,
    num_iterations: usize,
    mut f: F,
) -> Result<ProfileSample, E>
where
    F: FnMut() -> Result<(), E>,
{
    for _ in 0..num_prerun {
        f()?;
    }

    let mut timer = KernelTimer::for_operation(label);
    timer.start_cpu();
    for _ in 0..num_iterations {
        f()?;
    }
    timer.stop_cpu();

    let total_ms = timer.elapsed().unwrap_or(0.0);
    let avg_ms = if num_iterations == 0 {
        0.0
    } else {
        total_ms / num_iterations as f64
    };
    tracing::debug!(
        "{}: {} iterations, {:.6} ms/call",
        label,
        num_iterations,
        avg_ms
    );

    Ok(ProfileSample {
        label: label.to_string(),
        iterations: num_iterations,
        avg_ms,
    })
}

/// How many times faster `candidate` is than `baseline`
///
/// `None` when the candidate time is zero.
pub fn speedup(baseline: &ProfileSample, candidate: &ProfileSample) -> Option<f64> {
    if candidate.avg_ms > 0.0 {
        Some(baseline.avg_ms / candidate.avg_ms)
    } else {
        None
    }
}
