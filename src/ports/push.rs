use crate::types::push::Subscription;

#[derive(Debug, thiserror::Error)]
pub enum PushSendError {
    /// The push service no longer accepts this endpoint (404/410).
    #[error("subscription endpoint is gone")]
    Gone,
    #[error("{0}")]
    Failed(String),
}

pub trait PushSender: Clone + Send + Sync + 'static {
    type Fut<'a>: Future<Output = Result<(), PushSendError>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, payload: &'a str) -> Self::Fut<'a>;
}
