//! Batch progress reporting

use tokio::sync::watch;

/// Receives the fraction of a batch that is done, in `0.0..=1.0`.
///
/// Sinks are shared with the loading future, which may run on any worker
/// thread.
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, fraction: f64) {
        self(fraction)
    }
}

impl ProgressSink for watch::Sender<f64> {
    fn report(&self, fraction: f64) {
        self.send_replace(fraction);
    }
}

/// Sink that discards all reports
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _fraction: f64) {}
}
