use thiserror::Error;

use crate::{identity::IdentityError, response::UnknownReasonError};

#[derive(Debug, Error)]
pub enum Error {
    /// Network, TLS, or HTTP client failure before a response was read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The certificate bundle could not be turned into a client identity.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The notification payload could not be encoded as JSON.
    #[error("failed to encode payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The gateway reported a reason code outside the known catalog.
    #[error(transparent)]
    UnknownReason(#[from] UnknownReasonError),

    /// Non-success response whose body carried no usable reason code.
    #[error("unclassifiable gateway response (HTTP {status_code}): {body}")]
    MalformedResponse {
        status_code: u16,
        apns_id: Option<String>,
        body: String,
    },
}
