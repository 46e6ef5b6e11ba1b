use std::time::Duration;

use time::OffsetDateTime;

/// Clock and timer behind the client inbox, so tests can run reconnects without waiting.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    /// Stamped on the inbox after each successful reload.
    fn now(&self) -> OffsetDateTime;
    /// One reconnect delay.
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}
