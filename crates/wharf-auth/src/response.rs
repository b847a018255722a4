//! What the pipeline asks the transport to send back.
//!
//! [`ResponseIntent`] is transport-neutral: a status code plus an optional
//! JSON body. How the body is encoded is left to the host.

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::error::{Fault, Rejection};
use crate::issuer::IssuedToken;

/// Body of a successful token response.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TokenResponse {
    /// The signed token.
    pub token: String,
    /// Same value as `token`, for OAuth2-style clients.
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    /// Issue instant (RFC 3339).
    pub issued_at: DateTime<Utc>,
    /// Refresh token, when one was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl From<&IssuedToken> for TokenResponse {
    fn from(issued: &IssuedToken) -> Self {
        Self {
            token: issued.token.clone(),
            access_token: issued.token.clone(),
            expires_in: issued.definition.lifetime().num_seconds(),
            issued_at: issued.definition.issued_at,
            refresh_token: None,
        }
    }
}

/// Response the pipeline wants written.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseIntent {
    /// 405, no body.
    MethodNotAllowed,
    /// 400 with a diagnostic.
    BadRequest {
        /// What was wrong.
        message: String,
        /// The offending field, when known.
        field: Option<String>,
    },
    /// 401, no body.
    Unauthorized,
    /// 401 listing the scopes no provider granted.
    Forbidden {
        /// Wire form of every forbidden scope.
        forbidden_scopes: Vec<String>,
    },
    /// 200 with the token.
    Issued(TokenResponse),
    /// 500 with a short, non-sensitive diagnostic.
    Fault {
        /// Kind of failure.
        detail: String,
    },
}

impl ResponseIntent {
    /// HTTP status to send.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::Forbidden { .. } => StatusCode::UNAUTHORIZED,
            Self::Issued(_) => StatusCode::OK,
            Self::Fault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body to send, if any.
    pub fn body(&self) -> Option<serde_json::Value> {
        match self {
            Self::MethodNotAllowed | Self::Unauthorized => None,
            Self::BadRequest { message, field } => Some(json!({ "error": message, "field": field })),
            Self::Forbidden { forbidden_scopes } => Some(json!({ "forbidden_scopes": forbidden_scopes })),
            Self::Issued(response) => serde_json::to_value(response).ok(),
            Self::Fault { detail } => Some(json!({ "error": detail })),
        }
    }
}

impl From<Rejection> for ResponseIntent {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::MethodNotAllowed(_) => Self::MethodNotAllowed,
            Rejection::Validation(err) => Self::BadRequest {
                message: err.to_string(),
                field: err.field().map(str::to_string),
            },
            Rejection::Unauthenticated => Self::Unauthorized,
            Rejection::Forbidden(scopes) => Self::Forbidden {
                forbidden_scopes: scopes.to_strings(),
            },
        }
    }
}

impl From<&Fault> for ResponseIntent {
    fn from(fault: &Fault) -> Self {
        Self::Fault {
            detail: fault.kind().to_string(),
        }
    }
}
