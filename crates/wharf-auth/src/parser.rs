//! Builds a validated [`TokenRequest`] from raw transport input.

use wharf_models::{Scope, ScopeSet, ServiceName, TokenRequest, ValidationError};

use crate::credentials::extract_credentials;
use crate::raw::RawRequest;

/// Query parameter naming the target service.
pub const PARAM_SERVICE: &str = "service";
/// Query parameter naming the requested account.
pub const PARAM_ACCOUNT: &str = "account";
/// Query parameter carrying the client identifier.
pub const PARAM_CLIENT_ID: &str = "client_id";
/// Query parameter asking for an offline token.
pub const PARAM_OFFLINE_TOKEN: &str = "offline_token";
/// Repeated query parameter carrying requested scopes.
pub const PARAM_SCOPE: &str = "scope";

/// Parse and validate a raw request.
///
/// Single-valued parameters use their first occurrence; empty values count
/// as absent. Each `scope` value may hold several space-separated scopes.
/// A single malformed scope fails the whole request.
///
/// # Errors
///
/// - `InvalidQuery` when the transport could not decode the query
/// - `MissingField` when `service` is absent or empty
/// - `InvalidFlag` when `offline_token` is not `true`/`false`
/// - `InvalidScope` for the first malformed scope
pub fn parse_request(raw: &RawRequest) -> Result<TokenRequest, ValidationError> {
    if let Some(reason) = raw.query_error() {
        return Err(ValidationError::InvalidQuery(reason.to_string()));
    }

    let service = ServiceName::new(raw.first(PARAM_SERVICE).unwrap_or_default())?;
    let account = non_empty(raw.first(PARAM_ACCOUNT));
    let client_id = non_empty(raw.first(PARAM_CLIENT_ID));
    let offline_token = parse_flag(PARAM_OFFLINE_TOKEN, raw.first(PARAM_OFFLINE_TOKEN))?;
    let scopes = raw
        .values(PARAM_SCOPE)
        .flat_map(str::split_whitespace)
        .map(Scope::parse)
        .collect::<Result<ScopeSet, _>>()?;

    Ok(TokenRequest {
        id: raw.id().clone(),
        service,
        account,
        client_id,
        offline_token,
        scopes,
        credentials: extract_credentials(raw),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Only the literals `true` and `false` are accepted; absent or empty is `false`.
fn parse_flag(field: &str, value: Option<&str>) -> Result<bool, ValidationError> {
    match value {
        None | Some("") | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(ValidationError::InvalidFlag {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}
