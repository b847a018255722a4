//! The request-to-token state machine.
//!
//! ```text
//! Received ─► Parsed ─► Authenticated ─► Authorized ─► Issued ─► Responded
//!    │          │            │               │
//!    └──────────┴────────────┴───────────────┴──► Rejected(kind)
//!
//! any stage ──► Faulted(kind)
//! ```
//!
//! Each request drives its own [`PipelineState`] from `Received` to one of
//! the three terminal states. Nothing is shared between requests except the
//! read-only [`TokenPipeline`] itself. Dropping the future returned by
//! [`TokenPipeline::handle`] (for example when the client disconnects)
//! drops the collaborator call in flight and no later stage runs.

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tracing::{debug, error, info, info_span, warn, Instrument};
use wharf_models::{AuthenticationResult, AuthorizationResult, TokenRequest};

use crate::authn::Authenticator;
use crate::authz::Authorizer;
use crate::error::{ConfigError, Fault, Rejection};
use crate::issuer::{TokenIssuer, TokenOptions};
use crate::parser::parse_request;
use crate::provider::{AuthenticationStrategy, AuthorizationProvider, Signer};
use crate::raw::RawRequest;
use crate::response::{ResponseIntent, TokenResponse};

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Label of a [`PipelineState`], used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStage {
    /// Raw input accepted from the transport.
    Received,
    /// Input validated into a `TokenRequest`.
    Parsed,
    /// Caller authenticated.
    Authenticated,
    /// Every requested scope granted.
    Authorized,
    /// Token signed.
    Issued,
    /// Success response ready.
    Responded,
    /// Refused (terminal).
    Rejected,
    /// Failed on our side (terminal).
    Faulted,
}

/// State of one request travelling through the pipeline.
#[derive(Debug)]
pub enum PipelineState {
    /// Raw input accepted from the transport.
    Received(RawRequest),
    /// Input validated.
    Parsed(TokenRequest),
    /// Caller authenticated.
    Authenticated {
        /// The request.
        request: TokenRequest,
        /// Successful authentication outcome.
        authn: AuthenticationResult,
    },
    /// Every requested scope granted.
    Authorized {
        /// The request.
        request: TokenRequest,
        /// Successful authentication outcome.
        authn: AuthenticationResult,
        /// Successful authorization outcome.
        authz: AuthorizationResult,
    },
    /// Token signed.
    Issued(TokenResponse),
    /// Success response ready (terminal).
    Responded(ResponseIntent),
    /// Refused (terminal).
    Rejected(Rejection),
    /// Failed on our side (terminal).
    Faulted(Fault),
}

impl PipelineState {
    /// Label of this state.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Received(_) => PipelineStage::Received,
            Self::Parsed(_) => PipelineStage::Parsed,
            Self::Authenticated { .. } => PipelineStage::Authenticated,
            Self::Authorized { .. } => PipelineStage::Authorized,
            Self::Issued(_) => PipelineStage::Issued,
            Self::Responded(_) => PipelineStage::Responded,
            Self::Rejected(_) => PipelineStage::Rejected,
            Self::Faulted(_) => PipelineStage::Faulted,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Responded(_) | Self::Rejected(_) | Self::Faulted(_)
        )
    }

    /// The response of a terminal state, or the state itself otherwise.
    pub fn finish(self) -> Result<ResponseIntent, PipelineState> {
        match self {
            Self::Responded(intent) => Ok(intent),
            Self::Rejected(rejection) => Ok(rejection.into()),
            Self::Faulted(fault) => Ok(ResponseIntent::from(&fault)),
            other => Err(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Knobs that are not about tokens themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// The only method allowed past `Received`.
    pub read_method: Method,
    /// Deadline for every collaborator call.
    pub call_timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            read_method: Method::GET,
            call_timeout: None,
        }
    }
}

/// Handles token requests end to end. Cheap to clone and share.
#[derive(Clone)]
pub struct TokenPipeline {
    options: PipelineOptions,
    authenticator: Authenticator,
    authorizer: Authorizer,
    issuer: TokenIssuer,
}

impl TokenPipeline {
    /// Start assembling a pipeline that issues tokens with `token` options.
    pub fn builder(token: TokenOptions) -> PipelineBuilder {
        PipelineBuilder {
            token,
            options: PipelineOptions::default(),
            strategy: None,
            providers: Vec::new(),
            signer: None,
        }
    }

    /// Token options in use.
    pub fn token_options(&self) -> &TokenOptions {
        self.issuer.options()
    }

    /// Algorithm of the configured signer.
    pub fn signing_algorithm(&self) -> &str {
        self.issuer.algorithm()
    }

    /// Names of the authorization providers, in chain order.
    pub fn provider_names(&self) -> Vec<String> {
        self.authorizer.provider_names()
    }

    /// Run one request to completion.
    pub async fn handle(&self, raw: RawRequest) -> ResponseIntent {
        let span = info_span!("token_request", request_id = %raw.id());
        self.run(raw).instrument(span).await
    }

    async fn run(&self, raw: RawRequest) -> ResponseIntent {
        debug!(method = %raw.method(), "token request received");
        let mut state = PipelineState::Received(raw);
        loop {
            state = match state.finish() {
                Ok(intent) => {
                    debug!(status = %intent.status(), "response ready");
                    return intent;
                }
                Err(state) => self.step(state).await,
            };
            debug!(stage = %state.stage(), "pipeline transition");
        }
    }

    /// Advance `state` by one transition. Terminal states are returned as is.
    pub async fn step(&self, state: PipelineState) -> PipelineState {
        match state {
            PipelineState::Received(raw) => {
                if *raw.method() != self.options.read_method {
                    debug!(method = %raw.method(), "not a read request");
                    return PipelineState::Rejected(Rejection::MethodNotAllowed(raw.method().clone()));
                }
                match parse_request(&raw) {
                    Ok(request) => {
                        debug!(
                            service = %request.service,
                            account = ?request.account,
                            scopes = ?request.scopes.to_strings(),
                            "token request parsed"
                        );
                        PipelineState::Parsed(request)
                    }
                    Err(err) => {
                        warn!(error = %err, "invalid token request");
                        PipelineState::Rejected(Rejection::Validation(err))
                    }
                }
            }

            PipelineState::Parsed(request) => match self.authenticator.authenticate(&request).await {
                Ok(authn) if authn.successful => PipelineState::Authenticated { request, authn },
                Ok(_) => PipelineState::Rejected(Rejection::Unauthenticated),
                Err(fault) => self.faulted(fault),
            },

            PipelineState::Authenticated { request, authn } => {
                match self.authorizer.authorize(&request, &authn).await {
                    Ok(authz) if authz.is_successful() => PipelineState::Authorized {
                        request,
                        authn,
                        authz,
                    },
                    Ok(authz) => PipelineState::Rejected(Rejection::Forbidden(authz.forbidden)),
                    Err(fault) => self.faulted(fault),
                }
            }

            PipelineState::Authorized {
                request,
                authn,
                authz,
            } => match self.issuer.issue(&request, &authn, &authz).await {
                Ok(issued) => PipelineState::Issued(TokenResponse::from(&issued)),
                Err(fault) => self.faulted(fault),
            },

            PipelineState::Issued(response) => {
                info!(expires_in = response.expires_in, "token response ready");
                PipelineState::Responded(ResponseIntent::Issued(response))
            }

            terminal => terminal,
        }
    }

    fn faulted(&self, fault: Fault) -> PipelineState {
        error!(error = %fault, "token request faulted");
        PipelineState::Faulted(fault)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`TokenPipeline`].
pub struct PipelineBuilder {
    token: TokenOptions,
    options: PipelineOptions,
    strategy: Option<Arc<dyn AuthenticationStrategy>>,
    providers: Vec<Arc<dyn AuthorizationProvider>>,
    signer: Option<Arc<dyn Signer>>,
}

impl PipelineBuilder {
    /// Replace the pipeline options.
    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the authentication strategy.
    pub fn authentication(mut self, strategy: Arc<dyn AuthenticationStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Append a provider to the end of the authorization chain.
    pub fn authorization(mut self, provider: Arc<dyn AuthorizationProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Set the token signer.
    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Finish the pipeline.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingAuthentication`] when no strategy was set
    /// - [`ConfigError::MissingSigner`] when no signer was set
    pub fn build(self) -> Result<TokenPipeline, ConfigError> {
        let strategy = self.strategy.ok_or(ConfigError::MissingAuthentication)?;
        let signer = self.signer.ok_or(ConfigError::MissingSigner)?;
        let timeout = self.options.call_timeout;

        if self.providers.is_empty() {
            warn!("no authorization provider configured; only anonymous requests can succeed");
        }

        Ok(TokenPipeline {
            authenticator: Authenticator::new(strategy, timeout),
            authorizer: Authorizer::new(self.providers, timeout),
            issuer: TokenIssuer::new(self.token, signer, timeout),
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::error::ProviderError;
    use crate::test_support::{Behaviour, StaticStrategy, StubSigner, TestProvider};
    use serde_json::json;
    use wharf_models::RequestId;

    fn token_options() -> TokenOptions {
        TokenOptions::new("wharf", Duration::from_secs(120)).unwrap()
    }

    fn pipeline(strategy: StaticStrategy, providers: &[Arc<TestProvider>]) -> TokenPipeline {
        let mut builder = TokenPipeline::builder(token_options())
            .authentication(Arc::new(strategy))
            .signer(StubSigner::ok());
        for p in providers {
            builder = builder.authorization(p.clone());
        }
        builder.build().unwrap()
    }

    fn get() -> RawRequest {
        RawRequest::new(RequestId::new("req-1"), Method::GET)
    }

    #[test]
    fn build_requires_strategy_and_signer() {
        let err = TokenPipeline::builder(token_options())
            .signer(StubSigner::ok())
            .build()
            .err();
        assert_eq!(err, Some(ConfigError::MissingAuthentication));

        let err = TokenPipeline::builder(token_options())
            .authentication(Arc::new(StaticStrategy::allow(None)))
            .build()
            .err();
        assert_eq!(err, Some(ConfigError::MissingSigner));
    }

    #[tokio::test]
    async fn anonymous_request_gets_a_token_without_scopes() {
        let p = TestProvider::new("p", Behaviour::Fail);
        let intent = pipeline(StaticStrategy::allow(None), &[p.clone()])
            .handle(get().with_param("service", "registry.example.com"))
            .await;
        let ResponseIntent::Issued(response) = intent else {
            panic!("expected a token");
        };
        assert_eq!(response.token, "signed:registry.example.com:");
        assert_eq!(response.expires_in, 120);
        assert_eq!(p.calls(), 0);
    }

    #[tokio::test]
    async fn single_grant_issues_token_with_that_scope() {
        let pull = TestProvider::grant("pull", &["repository:foo:pull"]);
        let intent = pipeline(StaticStrategy::allow(Some("alice")), &[pull])
            .handle(
                get()
                    .with_param("service", "registry.example.com")
                    .with_param("scope", "repository:foo:pull"),
            )
            .await;
        assert_eq!(intent.status(), http::StatusCode::OK);
        let body = intent.body().unwrap();
        assert_eq!(body["token"], "signed:registry.example.com:repository:foo:pull");
        assert_eq!(body["access_token"], body["token"]);
    }

    #[tokio::test]
    async fn grants_from_two_providers_are_merged() {
        let pull = TestProvider::grant("pull", &["repository:foo:pull"]);
        let push = TestProvider::grant("push", &["repository:foo:push"]);
        let intent = pipeline(StaticStrategy::allow(Some("alice")), &[pull, push])
            .handle(
                get()
                    .with_param("service", "registry.example.com")
                    .with_param("scope", "repository:foo:pull")
                    .with_param("scope", "repository:foo:push"),
            )
            .await;
        let ResponseIntent::Issued(response) = intent else {
            panic!("expected a token");
        };
        assert_eq!(
            response.token,
            "signed:registry.example.com:repository:foo:pull repository:foo:push"
        );
    }

    #[tokio::test]
    async fn ungranted_scope_is_reported() {
        let pull = TestProvider::grant("pull", &["repository:foo:pull"]);
        let intent = pipeline(StaticStrategy::allow(Some("alice")), &[pull])
            .handle(
                get()
                    .with_param("service", "registry.example.com")
                    .with_param("scope", "repository:foo:push"),
            )
            .await;
        assert_eq!(intent.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            intent.body(),
            Some(json!({ "forbidden_scopes": ["repository:foo:push"] }))
        );
    }

    #[tokio::test]
    async fn partial_grant_issues_nothing() {
        let signer = StubSigner::ok();
        let pipeline = TokenPipeline::builder(token_options())
            .authentication(Arc::new(StaticStrategy::allow(Some("alice"))))
            .authorization(TestProvider::grant("pull", &["repository:foo:pull"]))
            .signer(signer.clone())
            .build()
            .unwrap();
        let intent = pipeline
            .handle(
                get()
                    .with_param("service", "svc")
                    .with_param("scope", "repository:foo:pull")
                    .with_param("scope", "repository:foo:push"),
            )
            .await;
        assert_eq!(
            intent,
            ResponseIntent::Forbidden {
                forbidden_scopes: vec!["repository:foo:push".into()]
            }
        );
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_service_is_a_bad_request() {
        let intent = pipeline(StaticStrategy::allow(None), &[]).handle(get()).await;
        assert_eq!(intent.status(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_read_methods_are_not_allowed() {
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let raw = RawRequest::new(RequestId::new("req-1"), method)
                .with_param("service", "registry.example.com");
            let intent = pipeline(StaticStrategy::allow(None), &[]).handle(raw).await;
            assert_eq!(intent, ResponseIntent::MethodNotAllowed);
        }
    }

    #[tokio::test]
    async fn failed_authentication_stops_before_authorization() {
        let p = TestProvider::new("p", Behaviour::GrantAll);
        let intent = pipeline(StaticStrategy::reject(), &[p.clone()])
            .handle(
                get()
                    .with_param("service", "svc")
                    .with_param("scope", "repository:foo:pull"),
            )
            .await;
        assert_eq!(intent, ResponseIntent::Unauthorized);
        assert_eq!(intent.body(), None);
        assert_eq!(p.calls(), 0);
    }

    #[tokio::test]
    async fn strategy_failure_is_a_fault() {
        let intent = pipeline(
            StaticStrategy::error(ProviderError::Unavailable("ldap".into())),
            &[],
        )
        .handle(get().with_param("service", "svc"))
        .await;
        assert_eq!(intent.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn provider_failure_is_a_fault() {
        let faulty = TestProvider::new("faulty", Behaviour::Fail);
        let intent = pipeline(StaticStrategy::allow(Some("alice")), &[faulty])
            .handle(
                get()
                    .with_param("service", "svc")
                    .with_param("scope", "repository:foo:pull"),
            )
            .await;
        assert_eq!(
            intent,
            ResponseIntent::Fault {
                detail: "dependency failure".into()
            }
        );
    }

    fn with_deadline(strategy: StaticStrategy, signer: Arc<StubSigner>, after: Duration) -> TokenPipeline {
        TokenPipeline::builder(token_options())
            .options(PipelineOptions {
                call_timeout: Some(after),
                ..PipelineOptions::default()
            })
            .authentication(Arc::new(strategy))
            .authorization(TestProvider::new("all", Behaviour::GrantAll))
            .signer(signer)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn dropping_the_request_stops_the_chain() {
        let slow = TestProvider::new("slow", Behaviour::Stall(Duration::from_secs(60)));
        let later = TestProvider::new("later", Behaviour::GrantAll);
        let signer = StubSigner::ok();
        let pipeline = TokenPipeline::builder(token_options())
            .authentication(Arc::new(StaticStrategy::allow(Some("alice"))))
            .authorization(slow.clone())
            .authorization(later.clone())
            .signer(signer.clone())
            .build()
            .unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            pipeline.handle(
                get()
                    .with_param("service", "svc")
                    .with_param("scope", "repository:foo:pull"),
            ),
        )
        .await;
        assert!(outcome.is_err());

        // Nothing of the dropped request may still be running.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(slow.calls(), 1);
        assert_eq!(later.calls(), 0);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_strategy_times_out() {
        let signer = StubSigner::ok();
        let intent = with_deadline(
            StaticStrategy::Stall(Duration::from_secs(60)),
            signer.clone(),
            Duration::from_millis(20),
        )
        .handle(get().with_param("service", "svc"))
        .await;
        assert_eq!(
            intent,
            ResponseIntent::Fault {
                detail: "dependency timeout".into()
            }
        );
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_signer_times_out() {
        let signer = StubSigner::stalling(Duration::from_secs(60));
        let intent = with_deadline(
            StaticStrategy::allow(Some("alice")),
            signer.clone(),
            Duration::from_millis(20),
        )
        .handle(
            get()
                .with_param("service", "svc")
                .with_param("scope", "repository:foo:pull"),
        )
        .await;
        assert_eq!(
            intent,
            ResponseIntent::Fault {
                detail: "dependency timeout".into()
            }
        );
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn step_walks_through_every_stage() {
        let pipeline = pipeline(
            StaticStrategy::allow(Some("alice")),
            &[TestProvider::new("all", Behaviour::GrantAll)],
        );
        let mut state = PipelineState::Received(
            get()
                .with_param("service", "svc")
                .with_param("scope", "repository:foo:pull"),
        );
        let mut stages = vec![state.stage()];
        while !state.is_terminal() {
            state = pipeline.step(state).await;
            stages.push(state.stage());
        }
        assert_eq!(
            stages,
            vec![
                PipelineStage::Received,
                PipelineStage::Parsed,
                PipelineStage::Authenticated,
                PipelineStage::Authorized,
                PipelineStage::Issued,
                PipelineStage::Responded,
            ]
        );
    }

    #[tokio::test]
    async fn terminal_states_do_not_move() {
        let pipeline = pipeline(StaticStrategy::allow(None), &[]);
        let state = pipeline
            .step(PipelineState::Rejected(Rejection::Unauthenticated))
            .await;
        assert_eq!(state.stage(), PipelineStage::Rejected);
    }

    #[test]
    fn stage_labels_are_snake_case() {
        assert_eq!(PipelineStage::Authenticated.to_string(), "authenticated");
        assert_eq!(PipelineStage::Faulted.to_string(), "faulted");
    }
}
