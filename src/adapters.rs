use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::error::ServiceError;
use crate::notifications::NotificationService;
use crate::ports;
use crate::ports::inbox::{BoxFuture, LiveStream, Snapshot, SourceError};
use crate::ports::push::PushSendError;
use crate::types::model::User;
use crate::types::push::{Subscription, VapidConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::time::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }

    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &str,
    ) -> Result<(), web_push::WebPushError> {
        let subscription_info = web_push::SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );
        let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
        builder.set_payload(web_push::ContentEncoding::Aes128Gcm, payload.as_bytes());
        let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
            &self.vapid.private_key,
            web_push::URL_SAFE_NO_PAD,
            &subscription_info,
        )?;
        signature_builder.add_claim("sub", self.vapid.subject.as_str());
        builder.set_vapid_signature(signature_builder.build()?);
        self.client.send(builder.build()?).await
    }
}

impl ports::push::PushSender for WebPushSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), PushSendError>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, payload: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            self.deliver(subscription, payload)
                .await
                .map_err(|err| match err {
                    web_push::WebPushError::EndpointNotValid
                    | web_push::WebPushError::EndpointNotFound => PushSendError::Gone,
                    other => PushSendError::Failed(other.to_string()),
                })
        })
    }
}

/// In-process [`ports::inbox::NotificationSource`] for one signed-in user.
#[derive(Clone)]
pub struct LocalNotificationSource {
    service: NotificationService,
    user: User,
}

impl LocalNotificationSource {
    pub fn new(service: NotificationService, user: User) -> Self {
        Self { service, user }
    }
}

fn source_error(err: ServiceError) -> SourceError {
    match err {
        ServiceError::NotFound => SourceError::NotFound,
        other => SourceError::Unavailable(other.to_string()),
    }
}

impl ports::inbox::NotificationSource for LocalNotificationSource {
    fn fetch_recent(&self) -> BoxFuture<'_, Result<Snapshot, SourceError>> {
        Box::pin(async move {
            let notifications = self
                .service
                .list_recent(&self.user, None)
                .map_err(source_error)?;
            let unread = self.service.unread_count(&self.user).map_err(source_error)?;
            Ok(Snapshot {
                notifications,
                unread,
            })
        })
    }

    fn connect(&self) -> BoxFuture<'_, Result<LiveStream, SourceError>> {
        Box::pin(async move {
            let stream: LiveStream = Box::pin(self.service.subscribe_live(&self.user).into_stream());
            Ok(stream)
        })
    }

    fn mark_read<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move { self.service.mark_read(&self.user, id).map_err(source_error) })
    }

    fn mark_all_read(&self) -> BoxFuture<'_, Result<(), SourceError>> {
        Box::pin(async move {
            self.service
                .mark_all_read(&self.user)
                .map(|_| ())
                .map_err(source_error)
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            self.service
                .delete(&self.user, id)
                .map(|_| ())
                .map_err(source_error)
        })
    }

    fn delete_all(&self) -> BoxFuture<'_, Result<(), SourceError>> {
        Box::pin(async move {
            self.service
                .delete_all(&self.user)
                .map(|_| ())
                .map_err(source_error)
        })
    }
}
