use std::{fmt, str::FromStr};

use thiserror::Error;

/// Coarse classification of a gateway response, derived from the HTTP
/// status code alone.
///
/// The mapping is total: status codes outside the table (including every
/// 2xx) classify as `Success`. Error detail beyond the status code comes
/// from [`ErrorReason`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Success,
    BadRequest,
    BadCertificate,
    BadMethod,
    DeviceTokenInactive,
    BadPayload,
    TooManyRequests,
    InternalServerError,
    ServiceUnavailable,
}

impl ServiceStatus {
    pub fn from_status_code(code: u16) -> ServiceStatus {
        match code {
            400 => ServiceStatus::BadRequest,
            403 => ServiceStatus::BadCertificate,
            405 => ServiceStatus::BadMethod,
            410 => ServiceStatus::DeviceTokenInactive,
            413 => ServiceStatus::BadPayload,
            429 => ServiceStatus::TooManyRequests,
            500 => ServiceStatus::InternalServerError,
            503 => ServiceStatus::ServiceUnavailable,
            _ => ServiceStatus::Success,
        }
    }

    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, ServiceStatus::Success)
    }
}

/// Machine-readable failure reason reported in a gateway error body.
///
/// The catalog is closed and matching is exact and case-sensitive; a
/// reason string outside it parses to [`UnknownReasonError`] instead of
/// being coerced to a near miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    PayloadEmpty,
    PayloadTooLarge,
    BadTopic,
    TopicDisallowed,
    BadMessageId,
    BadExpirationDate,
    BadPriority,
    MissingDeviceToken,
    BadDeviceToken,
    DeviceTokenNotForTopic,
    Unregistered,
    DuplicateHeaders,
    BadCertificateEnvironment,
    BadCertificate,
    Forbidden,
    BadPath,
    MethodNotAllowed,
    TooManyRequests,
    IdleTimeout,
    Shutdown,
    InternalServerError,
    ServiceUnavailable,
    MissingTopic,
}

impl ErrorReason {
    /// Reason code exactly as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorReason::PayloadEmpty => "PayloadEmpty",
            ErrorReason::PayloadTooLarge => "PayloadTooLarge",
            ErrorReason::BadTopic => "BadTopic",
            ErrorReason::TopicDisallowed => "TopicDisallowed",
            ErrorReason::BadMessageId => "BadMessageId",
            ErrorReason::BadExpirationDate => "BadExpirationDate",
            ErrorReason::BadPriority => "BadPriority",
            ErrorReason::MissingDeviceToken => "MissingDeviceToken",
            ErrorReason::BadDeviceToken => "BadDeviceToken",
            ErrorReason::DeviceTokenNotForTopic => "DeviceTokenNotForTopic",
            ErrorReason::Unregistered => "Unregistered",
            ErrorReason::DuplicateHeaders => "DuplicateHeaders",
            ErrorReason::BadCertificateEnvironment => "BadCertificateEnvironment",
            ErrorReason::BadCertificate => "BadCertificate",
            ErrorReason::Forbidden => "Forbidden",
            ErrorReason::BadPath => "BadPath",
            ErrorReason::MethodNotAllowed => "MethodNotAllowed",
            ErrorReason::TooManyRequests => "TooManyRequests",
            ErrorReason::IdleTimeout => "IdleTimeout",
            ErrorReason::Shutdown => "Shutdown",
            ErrorReason::InternalServerError => "InternalServerError",
            ErrorReason::ServiceUnavailable => "ServiceUnavailable",
            ErrorReason::MissingTopic => "MissingTopic",
        }
    }

    /// Fixed human-readable explanation for this reason.
    pub fn description(self) -> &'static str {
        match self {
            ErrorReason::PayloadEmpty => "The message payload was empty.",
            ErrorReason::PayloadTooLarge => {
                "The message payload was too large. The maximum payload size is 4096 bytes."
            }
            ErrorReason::BadTopic => "The apns-topic was invalid.",
            ErrorReason::TopicDisallowed => "Pushing to this topic is not allowed.",
            ErrorReason::BadMessageId => "The apns-id value is bad.",
            ErrorReason::BadExpirationDate => "The apns-expiration value is bad.",
            ErrorReason::BadPriority => "The apns-priority value is bad.",
            ErrorReason::MissingDeviceToken => {
                "The device token is not specified in the request :path. Verify that the :path \
                 header contains the device token."
            }
            ErrorReason::BadDeviceToken => {
                "The specified device token was bad. Verify that the request contains a valid \
                 token and that the token matches the environment."
            }
            ErrorReason::DeviceTokenNotForTopic => {
                "The device token does not match the specified topic."
            }
            ErrorReason::Unregistered => "The device token is inactive for the specified topic.",
            ErrorReason::DuplicateHeaders => "One or more headers were repeated.",
            ErrorReason::BadCertificateEnvironment => {
                "The client certificate was for the wrong environment."
            }
            ErrorReason::BadCertificate => "The certificate was bad.",
            ErrorReason::Forbidden => "The specified action is not allowed.",
            ErrorReason::BadPath => "The request contained a bad :path value.",
            ErrorReason::MethodNotAllowed => "The specified :method was not POST.",
            ErrorReason::TooManyRequests => {
                "Too many requests were made consecutively to the same device token."
            }
            ErrorReason::IdleTimeout => "Idle time out.",
            ErrorReason::Shutdown => "The server is shutting down.",
            ErrorReason::InternalServerError => "An internal server error occurred.",
            ErrorReason::ServiceUnavailable => "The service is unavailable.",
            ErrorReason::MissingTopic => {
                "The apns-topic header of the request was not specified and was required. The \
                 apns-topic header is mandatory when the client is connected using a certificate \
                 that supports multiple topics."
            }
        }
    }
}

impl FromStr for ErrorReason {
    type Err = UnknownReasonError;

    fn from_str(s: &str) -> Result<ErrorReason, UnknownReasonError> {
        match s {
            "PayloadEmpty" => Ok(ErrorReason::PayloadEmpty),
            "PayloadTooLarge" => Ok(ErrorReason::PayloadTooLarge),
            "BadTopic" => Ok(ErrorReason::BadTopic),
            "TopicDisallowed" => Ok(ErrorReason::TopicDisallowed),
            "BadMessageId" => Ok(ErrorReason::BadMessageId),
            "BadExpirationDate" => Ok(ErrorReason::BadExpirationDate),
            "BadPriority" => Ok(ErrorReason::BadPriority),
            "MissingDeviceToken" => Ok(ErrorReason::MissingDeviceToken),
            "BadDeviceToken" => Ok(ErrorReason::BadDeviceToken),
            "DeviceTokenNotForTopic" => Ok(ErrorReason::DeviceTokenNotForTopic),
            "Unregistered" => Ok(ErrorReason::Unregistered),
            "DuplicateHeaders" => Ok(ErrorReason::DuplicateHeaders),
            "BadCertificateEnvironment" => Ok(ErrorReason::BadCertificateEnvironment),
            "BadCertificate" => Ok(ErrorReason::BadCertificate),
            "Forbidden" => Ok(ErrorReason::Forbidden),
            "BadPath" => Ok(ErrorReason::BadPath),
            "MethodNotAllowed" => Ok(ErrorReason::MethodNotAllowed),
            "TooManyRequests" => Ok(ErrorReason::TooManyRequests),
            "IdleTimeout" => Ok(ErrorReason::IdleTimeout),
            "Shutdown" => Ok(ErrorReason::Shutdown),
            "InternalServerError" => Ok(ErrorReason::InternalServerError),
            "ServiceUnavailable" => Ok(ErrorReason::ServiceUnavailable),
            "MissingTopic" => Ok(ErrorReason::MissingTopic),
            other => Err(UnknownReasonError {
                code: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.as_str(), self.description())
    }
}

/// Reason string the gateway sent that is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error reason code {code:?}")]
pub struct UnknownReasonError {
    pub code: String,
}

/// Classified outcome of one submitted notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResponse {
    /// Raw HTTP status code the gateway answered with.
    pub status_code: u16,
    /// Classification of `status_code`.
    pub status: ServiceStatus,
    /// Recognized failure reason; always `None` when `status` is `Success`.
    pub error_reason: Option<ErrorReason>,
    /// Notification id echoed back in the `apns-id` response header.
    pub apns_id: Option<String>,
}
