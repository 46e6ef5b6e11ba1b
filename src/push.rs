use crate::adapters::WebPushSender;
use crate::config;
use crate::db::Store;

mod dispatch;
mod payload;
pub(crate) mod vapid;

use tokio::task::JoinHandle;

pub(crate) use dispatch::PushDispatcher;
pub use dispatch::PushQueue;
pub(crate) use vapid::{VapidConfigStatus, load_vapid_config};

/// Start background Web Push delivery when VAPID is configured.
///
/// Without a usable configuration the returned queue silently drops jobs, so
/// notification writes never depend on push being available.
pub fn start_dispatcher(
    config: &config::AppConfig,
    store: Store,
) -> (PushQueue, Option<JoinHandle<()>>) {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            tracing::warn!("push notifications disabled: incomplete VAPID configuration");
            return (PushQueue::disabled(), None);
        }
        VapidConfigStatus::Mismatched => {
            tracing::warn!(
                "push notifications disabled: VAPID public key does not match the private key"
            );
            return (PushQueue::disabled(), None);
        }
        VapidConfigStatus::Missing => {
            tracing::info!("push notifications disabled: no VAPID configuration");
            return (PushQueue::disabled(), None);
        }
    };

    let sender = match WebPushSender::new(vapid) {
        Ok(sender) => sender,
        Err(err) => {
            tracing::warn!("push notifications disabled: failed to init web-push ({err})");
            return (PushQueue::disabled(), None);
        }
    };

    let (queue, handle) = PushDispatcher::new(store, sender).spawn();
    tracing::info!("push dispatcher started");
    (queue, Some(handle))
}
