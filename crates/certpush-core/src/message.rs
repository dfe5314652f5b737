use std::fmt;

use serde_json::{Map, Value};
use uuid::Uuid;

/// One notification addressed to one device.
///
/// Carries both the delivery content and the credentials used to
/// authenticate the submission, so a single service can push on behalf
/// of several applications.
#[derive(Clone)]
pub struct PushMessage {
    message_id: String,
    /// Application bundle id, forwarded as the `apns-topic` header.
    pub topic: String,
    /// Delivery priority, forwarded verbatim as `apns-priority`.
    pub priority: u8,
    /// JSON payload object, typically holding an `aps` entry.
    pub payload: Map<String, Value>,
    /// Hex device token, already normalized by the caller.
    pub device_token: String,
    /// Path to the PKCS#12 bundle authenticating this submission.
    pub certificate_path: String,
    /// Passphrase protecting the bundle.
    pub passphrase: String,
    /// Deliver through the sandbox gateway instead of production.
    pub sandbox: bool,
}

impl PushMessage {
    pub fn new(
        topic: String,
        priority: u8,
        payload: Map<String, Value>,
        device_token: String,
        certificate_path: String,
        passphrase: String,
        sandbox: bool,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            topic,
            priority,
            payload,
            device_token,
            certificate_path,
            passphrase,
            sandbox,
        }
    }

    /// Local correlation id assigned at construction. Never transmitted.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

// Keeps the passphrase out of log output.
impl fmt::Debug for PushMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushMessage")
            .field("message_id", &self.message_id)
            .field("topic", &self.topic)
            .field("priority", &self.priority)
            .field("device_token", &self.device_token)
            .field("certificate_path", &self.certificate_path)
            .field("sandbox", &self.sandbox)
            .finish_non_exhaustive()
    }
}
