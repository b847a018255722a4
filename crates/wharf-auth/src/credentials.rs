//! Caller credential extraction.
//!
//! Extraction never fails: anything missing or malformed simply comes out
//! as `None` and is left for the authentication strategy to judge.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use wharf_models::{BasicCredentials, ConnectionCredentials, Credentials};

use crate::raw::RawRequest;

/// Collect every credential the transport can supply.
pub fn extract_credentials(raw: &RawRequest) -> Credentials {
    Credentials {
        basic: raw.authorization().and_then(parse_basic_authorization),
        connection: raw.peer().map(|peer| ConnectionCredentials {
            address: peer.ip(),
            port: peer.port(),
        }),
        // Refresh tokens are not accepted yet.
        refresh_token: None,
        authorization_presented: raw.authorization().is_some(),
    }
}

/// Parse an `Authorization: Basic <base64(user:password)>` header value.
///
/// The scheme is matched case-insensitively. The password is everything
/// after the first `:` and may itself contain colons. Returns `None` for
/// other schemes, invalid base64, non-UTF-8 payloads, a missing colon or
/// an empty username.
pub fn parse_basic_authorization(header: &str) -> Option<BasicCredentials> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    if username.is_empty() {
        return None;
    }

    Some(BasicCredentials::new(username, password))
}
