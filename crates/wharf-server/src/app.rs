//! HTTP binding of the token pipeline.
//!
//! The token handler turns an axum request into a [`RawRequest`], runs it
//! through the [`TokenPipeline`] and writes the resulting
//! [`ResponseIntent`] with a [`JsonResponder`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;
use wharf_auth::{PipelineOptions, RawRequest, ResponseIntent, TokenOptions, TokenPipeline};
use wharf_models::RequestId;

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::jwt::JwtSigner;
use crate::providers::{
    AnonymousAuthentication, AuthenticationChain, StaticAclAuthorization, StaticUserAuthentication,
};

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// State shared across all Axum handlers.
pub struct AppState {
    /// The request pipeline.
    pub pipeline: TokenPipeline,
    /// Encodes response bodies.
    pub responder: JsonResponder,
    /// Path of the token endpoint.
    pub token_path: String,
    /// Path of the info endpoint.
    pub info_path: String,
}

impl AppState {
    /// Assemble the state described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        Ok(Self {
            pipeline: build_pipeline(config)?,
            responder: JsonResponder::new(config.pretty_json),
            token_path: config.token_path.clone(),
            info_path: config.info_path.clone(),
        })
    }
}

/// Wire the built-in collaborators into a pipeline.
pub fn build_pipeline(config: &AppConfig) -> Result<TokenPipeline, StartupError> {
    let mut authentication = AuthenticationChain::new()
        .with(Arc::new(StaticUserAuthentication::new(config.users.clone())));
    if config.allow_anonymous {
        authentication = authentication.with(Arc::new(AnonymousAuthentication));
    }

    let token = TokenOptions::new(config.issuer.clone(), config.token_lifetime)?;
    let pipeline = TokenPipeline::builder(token)
        .options(PipelineOptions {
            call_timeout: config.call_timeout,
            ..PipelineOptions::default()
        })
        .authentication(Arc::new(authentication))
        .authorization(Arc::new(StaticAclAuthorization::new(config.acl.clone())))
        .signer(Arc::new(JwtSigner::hs256(config.signing_secret.as_bytes())))
        .build()?;

    Ok(pipeline)
}

// ---------------------------------------------------------------------------
// JSON encoding
// ---------------------------------------------------------------------------

/// Encodes JSON response bodies, compact or pretty.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponder {
    pretty: bool,
}

impl JsonResponder {
    /// Responder producing pretty-printed bodies when `pretty` is set.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Turn a pipeline outcome into an HTTP response.
    pub fn respond(&self, intent: &ResponseIntent) -> Response {
        match intent.body() {
            Some(body) => self.json(intent.status(), &body),
            None => intent.status().into_response(),
        }
    }

    /// Encode `body` with `status`.
    pub fn json<T: Serialize>(&self, status: StatusCode, body: &T) -> Response {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(body)
        } else {
            serde_json::to_vec(body)
        };
        match encoded {
            Ok(bytes) => (status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
            Err(e) => {
                error!(error = %e, "failed to encode response body");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Response of the info endpoint.
#[derive(Serialize, Debug)]
struct InfoResponse {
    issuer: String,
    algorithm: String,
    token_lifetime_secs: u64,
    token_endpoint: String,
    authorization_providers: Vec<String>,
}

/// Every method reaches the pipeline, which rejects anything but `GET`.
async fn token(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let intent = state.pipeline.handle(raw_request(&request)).await;
    state.responder.respond(&intent)
}

/// `GET <info_path>`: describe how tokens are issued.
async fn info(State(state): State<Arc<AppState>>) -> Response {
    let options = state.pipeline.token_options();
    let body = InfoResponse {
        issuer: options.issuer().to_string(),
        algorithm: state.pipeline.signing_algorithm().to_string(),
        token_lifetime_secs: options.lifetime().as_secs(),
        token_endpoint: state.token_path.clone(),
        authorization_providers: state.pipeline.provider_names(),
    };
    debug!(issuer = %body.issuer, "info requested");
    state.responder.json(StatusCode::OK, &body)
}

fn raw_request(request: &Request) -> RawRequest {
    let mut raw = RawRequest::new(RequestId::new(Uuid::new_v4().to_string()), request.method().clone());

    match Query::<Vec<(String, String)>>::try_from_uri(request.uri()) {
        Ok(Query(pairs)) => raw = raw.with_query(pairs),
        Err(e) => raw = raw.with_malformed_query(e.body_text()),
    }
    // Undecodable values are kept so the caller is not mistaken for anonymous.
    if let Some(value) = request.headers().get(header::AUTHORIZATION) {
        raw = raw.with_authorization(String::from_utf8_lossy(value.as_bytes()));
    }
    if let Some(ConnectInfo(peer)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        raw = raw.with_peer(*peer);
    }
    raw
}

/// Routes for the token and info endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    info!(
        token_path = %state.token_path,
        info_path = %state.info_path,
        providers = ?state.pipeline.provider_names(),
        "routes registered"
    );
    Router::new()
        .route(&state.token_path, any(token))
        .route(&state.info_path, get(info))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
