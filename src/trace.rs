use crate::error::AppError;
use std::time::Duration;

/// Receives timing events for every upstream call a `PokeClient` makes.
///
/// Observers are reporting hooks only. Whatever an implementation does, the
/// request and its result are unaffected.
pub trait FetchObserver: Send + Sync {
    fn on_start(&self, operation: &str, args: &str);
    fn on_finish(&self, operation: &str, elapsed: Duration);
    fn on_error(&self, operation: &str, elapsed: Duration, error: &AppError);
}

/// Emits one `tracing` event per start/finish/error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_start(&self, operation: &str, args: &str) {
        tracing::info!(operation, args, "Starting upstream fetch");
    }

    fn on_finish(&self, operation: &str, elapsed: Duration) {
        tracing::info!(
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            "Finished upstream fetch"
        );
    }

    fn on_error(&self, operation: &str, elapsed: Duration, error: &AppError) {
        tracing::error!(
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            "Upstream fetch failed"
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {
    fn on_start(&self, _operation: &str, _args: &str) {}

    fn on_finish(&self, _operation: &str, _elapsed: Duration) {}

    fn on_error(&self, _operation: &str, _elapsed: Duration, _error: &AppError) {}
}
