use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::{
    error::Error,
    identity::ClientIdentity,
    message::PushMessage,
    response::{ErrorReason, PushResponse, ServiceStatus},
};

/// Production gateway origin.
pub const PRODUCTION_ENDPOINT: &str = "https://api.push.apple.com:443";
/// Sandbox gateway origin for development builds.
pub const SANDBOX_ENDPOINT: &str = "https://api.development.push.apple.com:443";

const APNS_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = "certpush/0.1.0";

/// Tunables for [`ApnsService`].
#[derive(Debug, Clone)]
pub struct ApnsOptions {
    /// Origin used when a message is not flagged for the sandbox.
    pub production_endpoint: String,
    /// Origin used when a message is flagged for the sandbox.
    pub sandbox_endpoint: String,
    /// Per-request timeout applied to every submission.
    pub timeout: Duration,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl Default for ApnsOptions {
    fn default() -> Self {
        Self {
            production_endpoint: PRODUCTION_ENDPOINT.to_string(),
            sandbox_endpoint: SANDBOX_ENDPOINT.to_string(),
            timeout: APNS_TIMEOUT,
            connect_timeout: None,
        }
    }
}

/// APNs client with one identity session per certificate bundle.
///
/// Each distinct bundle path gets its own HTTP client with the decoded
/// identity bound at construction time; concurrent sends for the same
/// bundle share that session.
pub struct ApnsService {
    production_endpoint: Arc<str>,
    sandbox_endpoint: Arc<str>,
    timeout: Duration,
    connect_timeout: Option<Duration>,
    sessions: DashMap<String, Arc<IdentitySession>>,
}

struct IdentitySession {
    identity: Arc<ClientIdentity>,
    client: Client,
}

impl ApnsService {
    pub fn new() -> Self {
        Self::with_options(ApnsOptions::default())
    }

    pub fn with_options(options: ApnsOptions) -> Self {
        Self {
            production_endpoint: Arc::from(options.production_endpoint.trim_end_matches('/')),
            sandbox_endpoint: Arc::from(options.sandbox_endpoint.trim_end_matches('/')),
            timeout: options.timeout,
            connect_timeout: options.connect_timeout,
            sessions: DashMap::new(),
        }
    }

    /// Submit one notification and classify the gateway's answer.
    ///
    /// A response whose reason code is in the catalog comes back as
    /// `Ok`, carrying the classification; only transport failures,
    /// identity failures, and unclassifiable responses are `Err`.
    pub async fn send(&self, message: &PushMessage) -> Result<PushResponse, Error> {
        let session = self.session(&message.certificate_path, &message.passphrase)?;
        let endpoint = self.endpoint_for(message);
        let request_uri = format!("{endpoint}/3/device/{}", message.device_token);
        let body = serde_json::to_vec(&message.payload)?;

        let response = session
            .client
            .post(&request_uri)
            .header("apns-topic", message.topic.as_str())
            .header("apns-priority", message.priority.to_string())
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await?;

        let status_code = response.status().as_u16();
        let apns_id = response
            .headers()
            .get("apns-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let status = ServiceStatus::from_status_code(status_code);

        if status.is_success() {
            return Ok(PushResponse {
                status_code,
                status,
                error_reason: None,
                apns_id,
            });
        }

        let body_text = response.text().await?;
        match parse_reason(&body_text) {
            Some(code) => {
                let reason = code.parse::<ErrorReason>()?;
                Ok(PushResponse {
                    status_code,
                    status,
                    error_reason: Some(reason),
                    apns_id,
                })
            }
            None => {
                warn!(status_code, "gateway error response carried no reason code");
                Err(Error::MalformedResponse {
                    status_code,
                    apns_id,
                    body: body_text,
                })
            }
        }
    }

    /// Decode a bundle again and replace its cached session.
    pub fn reload_identity(
        &self,
        certificate_path: &str,
        passphrase: &str,
    ) -> Result<Arc<ClientIdentity>, Error> {
        let session = self.build_session(certificate_path, passphrase)?;
        let identity = Arc::clone(&session.identity);
        self.sessions.insert(certificate_path.to_string(), session);
        Ok(identity)
    }

    /// Identity cached for a bundle path, if any send has loaded it.
    pub fn cached_identity(&self, certificate_path: &str) -> Option<Arc<ClientIdentity>> {
        self.sessions
            .get(certificate_path)
            .map(|session| Arc::clone(&session.identity))
    }

    /// Tear the service down, dropping cached identities and their
    /// pooled connections.
    pub fn close(self) {
        self.sessions.clear();
    }

    fn endpoint_for(&self, message: &PushMessage) -> &str {
        if message.sandbox {
            &self.sandbox_endpoint
        } else {
            &self.production_endpoint
        }
    }

    fn session(&self, path: &str, passphrase: &str) -> Result<Arc<IdentitySession>, Error> {
        if let Some(existing) = self.sessions.get(path) {
            return Ok(Arc::clone(existing.value()));
        }
        // Built outside the map entry so a slow decode never holds a shard lock.
        let built = self.build_session(path, passphrase)?;
        let entry = self.sessions.entry(path.to_string()).or_insert(built);
        Ok(Arc::clone(entry.value()))
    }

    fn build_session(&self, path: &str, passphrase: &str) -> Result<Arc<IdentitySession>, Error> {
        let identity = Arc::new(ClientIdentity::from_pkcs12_file(path, passphrase)?);
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .identity(identity.transport().clone());
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder.build()?;
        Ok(Arc::new(IdentitySession { identity, client }))
    }
}

impl Default for ApnsService {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ReasonBody {
    reason: Option<String>,
}

fn parse_reason(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ReasonBody>(body).ok()?;
    parsed.reason
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value, json};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::identity::IdentityError;

    const PASSPHRASE: &str = "certpush-test";

    fn bundle_path() -> String {
        format!("{}/testdata/identity.p12", env!("CARGO_MANIFEST_DIR"))
    }

    fn test_payload() -> Map<String, Value> {
        match json!({"aps": {"alert": "hello"}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn service_for(server: &MockServer) -> ApnsService {
        ApnsService::with_options(ApnsOptions {
            production_endpoint: server.uri(),
            sandbox_endpoint: server.uri(),
            ..ApnsOptions::default()
        })
    }

    fn message(sandbox: bool) -> PushMessage {
        PushMessage::new(
            "com.example.app".to_string(),
            10,
            test_payload(),
            "beefcafe0123".to_string(),
            bundle_path(),
            PASSPHRASE.to_string(),
            sandbox,
        )
    }

    #[tokio::test]
    async fn delivered_notification_reports_apns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/3/device/beefcafe0123"))
            .and(header("apns-topic", "com.example.app"))
            .and(header("apns-priority", "10"))
            .respond_with(ResponseTemplate::new(200).insert_header("apns-id", "abc-123"))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        let response = service
            .send(&message(true))
            .await
            .expect("send should classify");

        assert_eq!(response.status_code, 200);
        assert_eq!(response.status, ServiceStatus::Success);
        assert_eq!(response.error_reason, None);
        assert_eq!(response.apns_id.as_deref(), Some("abc-123"));
    }

    #[tokio::test]
    async fn inactive_token_is_a_classified_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(410)
                    .insert_header("apns-id", "dead-beef")
                    .set_body_json(json!({"reason": "Unregistered"})),
            )
            .mount(&server)
            .await;

        let service = service_for(&server);
        let response = service
            .send(&message(true))
            .await
            .expect("classified failure is still a response");

        assert_eq!(response.status_code, 410);
        assert_eq!(response.status, ServiceStatus::DeviceTokenInactive);
        assert_eq!(response.error_reason, Some(ErrorReason::Unregistered));
        assert_eq!(response.apns_id.as_deref(), Some("dead-beef"));
    }

    #[tokio::test]
    async fn unparsable_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .insert_header("apns-id", "id-500")
                    .set_body_string("upstream exploded"),
            )
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.send(&message(false)).await.unwrap_err();
        match err {
            Error::MalformedResponse {
                status_code,
                apns_id,
                body,
            } => {
                assert_eq!(status_code, 500);
                assert_eq!(apns_id.as_deref(), Some("id-500"));
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_body_without_reason_field_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"status": "down"})))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.send(&message(true)).await.unwrap_err();
        match err {
            Error::MalformedResponse { status_code, .. } => assert_eq!(status_code, 503),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_reason_code_is_a_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"reason": "BrandNewFailure"})),
            )
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.send(&message(true)).await.unwrap_err();
        match err {
            Error::UnknownReason(unknown) => assert_eq!(unknown.code, "BrandNewFailure"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_bundle_fails_before_any_request() {
        let service = ApnsService::new();
        let mut msg = message(true);
        msg.passphrase = "wrong".to_string();
        let err = service.send(&msg).await.unwrap_err();
        match err {
            Error::Identity(IdentityError::BadPassphraseOrFormat(_)) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sessions_are_cached_per_bundle_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let service = service_for(&server);
        assert!(service.cached_identity(&bundle_path()).is_none());

        service.send(&message(true)).await.expect("first send");
        let first = service
            .cached_identity(&bundle_path())
            .expect("identity cached after send");

        service.send(&message(true)).await.expect("second send");
        let second = service
            .cached_identity(&bundle_path())
            .expect("identity still cached");
        assert!(Arc::ptr_eq(&first, &second));

        let reloaded = service
            .reload_identity(&bundle_path(), PASSPHRASE)
            .expect("reload should decode again");
        assert!(!Arc::ptr_eq(&first, &reloaded));
        let after = service
            .cached_identity(&bundle_path())
            .expect("reloaded identity cached");
        assert!(Arc::ptr_eq(&reloaded, &after));

        service.close();
    }

    #[test]
    fn endpoint_resolution_follows_the_sandbox_flag() {
        let service = ApnsService::new();
        assert_eq!(
            service.endpoint_for(&message(true)),
            "https://api.development.push.apple.com:443"
        );
        assert_eq!(
            service.endpoint_for(&message(false)),
            "https://api.push.apple.com:443"
        );
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let service = ApnsService::with_options(ApnsOptions {
            production_endpoint: "https://proxy.example:2197/".to_string(),
            ..ApnsOptions::default()
        });
        assert_eq!(
            service.endpoint_for(&message(false)),
            "https://proxy.example:2197"
        );
    }
}
