//! Transport-level input handed to the pipeline.

use std::net::SocketAddr;

use http::Method;
use wharf_models::RequestId;

/// Raw, unvalidated input of one token request as the transport saw it.
///
/// Query values are already percent-decoded; repeated keys keep every
/// value in the order they appeared.
#[derive(Debug, Clone)]
pub struct RawRequest {
    id: RequestId,
    method: Method,
    query: Vec<(String, String)>,
    query_error: Option<String>,
    authorization: Option<String>,
    peer: Option<SocketAddr>,
}

impl RawRequest {
    /// A request with no query, no `Authorization` header and no peer.
    pub fn new(id: RequestId, method: Method) -> Self {
        Self {
            id,
            method,
            query: Vec::new(),
            query_error: None,
            authorization: None,
            peer: None,
        }
    }

    /// Set every decoded query pair at once.
    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    /// Append one query pair.
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Record that the transport could not decode the query string.
    pub fn with_malformed_query(mut self, reason: impl Into<String>) -> Self {
        self.query_error = Some(reason.into());
        self
    }

    /// Set the raw `Authorization` header value.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Set the peer address of the connection.
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Correlation id.
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Why the query could not be decoded, if it could not.
    pub fn query_error(&self) -> Option<&str> {
        self.query_error.as_deref()
    }

    /// First value of `key`.
    pub fn first<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        self.values(key).next()
    }

    /// Every value of `key`, in order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Raw `Authorization` header value.
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// Peer address.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}
