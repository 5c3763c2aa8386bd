// Web Push delivery with VAPID signing. Replaces nothing at the protocol
// level: the web-push crate owns the ES256 signature and the aes128gcm
// payload encryption.

use std::env;

use log::{error, info, warn};
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder,
};

use crate::models::{NotificationPayload, PushSubscriptionJson};
use crate::util::{get_short_endpoint, VAR_VAPID_PRIVATE_KEY, VAR_VAPID_SUBJECT};

#[derive(Clone, Debug)]
pub struct VapidConfig {
    /// PEM-encoded ES256 private key.
    pub private_key: String,
    /// `mailto:` or https contact claim.
    pub subject: String,
}

impl VapidConfig {
    pub fn from_env() -> Result<VapidConfig, std::env::VarError> {
        Ok(VapidConfig {
            private_key: env::var(VAR_VAPID_PRIVATE_KEY)?,
            subject: env::var(VAR_VAPID_SUBJECT)?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("failed to encode payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("VAPID signature error: {0}")]
    Vapid(String),

    #[error("failed to build push message: {0}")]
    MessageBuild(String),

    #[error("push client error: {0}")]
    Client(String),

    #[error("push endpoint is gone, subscription should be deleted")]
    EndpointGone,

    #[error("push delivery failed: {0}")]
    Send(String),
}

/// Dispatch one Web Push message. `Err(PushError::EndpointGone)` means the
/// subscription is permanently invalid and must be removed from the store.
pub async fn send_web_push(
    subscription: &PushSubscriptionJson,
    payload: &NotificationPayload,
    config: &VapidConfig,
) -> Result<(), PushError> {
    let short_endpoint = get_short_endpoint(&subscription.endpoint);
    let body = serde_json::to_string(payload)?;

    let subscription_info = SubscriptionInfo::new(
        &subscription.endpoint,
        &subscription.keys.p256dh,
        &subscription.keys.auth,
    );

    let mut sig_builder =
        VapidSignatureBuilder::from_pem(config.private_key.as_bytes(), &subscription_info)
            .map_err(|e| PushError::Vapid(format!("{:?}", e)))?;
    sig_builder.add_claim("sub", config.subject.as_str());
    let signature = sig_builder
        .build()
        .map_err(|e| PushError::Vapid(format!("{:?}", e)))?;

    let mut message_builder = WebPushMessageBuilder::new(&subscription_info);
    message_builder.set_payload(ContentEncoding::Aes128Gcm, body.as_bytes());
    message_builder.set_vapid_signature(signature);
    let message = message_builder
        .build()
        .map_err(|e| PushError::MessageBuild(format!("{:?}", e)))?;

    let client = IsahcWebPushClient::new().map_err(|e| PushError::Client(format!("{:?}", e)))?;

    match client.send(message).await {
        Ok(()) => {
            info!("Push sent to ...{} ({})", short_endpoint, payload.title);
            Ok(())
        }
        Err(e) => {
            let mapped = classify_send_failure(e);
            match mapped {
                PushError::EndpointGone => warn!("Push endpoint ...{} is gone", short_endpoint),
                ref other => error!("Push error for ...{}: {}", short_endpoint, other),
            }
            Err(mapped)
        }
    }
}

/// Collapse the push client's error space into ours. Gone endpoints are the
/// only case the caller acts on; everything else is a delivery failure.
fn classify_send_failure(err: WebPushError) -> PushError {
    match err {
        WebPushError::EndpointNotValid | WebPushError::EndpointNotFound => PushError::EndpointGone,
        WebPushError::ServerError(retry_after) => PushError::Send(format!(
            "push service error, retry_after={:?}",
            retry_after
        )),
        e => PushError::Send(format!("{:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn gone_endpoints_map_to_endpoint_gone() {
        assert!(matches!(
            classify_send_failure(WebPushError::EndpointNotValid),
            PushError::EndpointGone
        ));
        assert!(matches!(
            classify_send_failure(WebPushError::EndpointNotFound),
            PushError::EndpointGone
        ));
    }

    #[test]
    fn server_errors_map_to_send_failures() {
        let mapped = classify_send_failure(WebPushError::ServerError(Some(Duration::from_secs(30))));
        assert!(matches!(mapped, PushError::Send(_)));

        let mapped = classify_send_failure(WebPushError::Unauthorized);
        assert!(matches!(mapped, PushError::Send(_)));
    }
}
