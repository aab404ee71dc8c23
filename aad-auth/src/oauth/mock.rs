//! Stub token endpoint for exercising the flow without a provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::error::{exchange_error, Error, ProviderExchangeErrorKind};
use crate::oauth::{TokenEndpoint, TokenRequest, TokenResponse};

/// What the stub answers with.
pub enum StubOutcome {
    Succeed(TokenResponse),
    Fail(ProviderExchangeErrorKind),
}

/// Token endpoint that records calls and returns a fixed outcome.
pub struct StubTokenEndpoint {
    outcome: StubOutcome,
    calls: AtomicUsize,
    last_request: Mutex<Option<TokenRequest>>,
}

impl StubTokenEndpoint {
    pub fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Succeeds with `T1`/`RT1` for `R1`, issued to Ann Lee (`u1`).
    pub fn ann_lee() -> Self {
        Self::new(StubOutcome::Succeed(TokenResponse {
            access_token: "T1".to_string(),
            refresh_token: "RT1".to_string(),
            expires_on: Utc::now() + Duration::hours(1),
            resource_id: "R1".to_string(),
            user_id: "u1".to_string(),
            given_name: "Ann".to_string(),
            family_name: "Lee".to_string(),
        }))
    }

    pub fn failing(kind: ProviderExchangeErrorKind) -> Self {
        Self::new(StubOutcome::Fail(kind))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<TokenRequest> {
        self.last_request.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TokenEndpoint for StubTokenEndpoint {
    async fn exchange_code(&self, request: TokenRequest) -> Result<TokenResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request);

        match &self.outcome {
            StubOutcome::Succeed(response) => Ok(response.clone()),
            StubOutcome::Fail(kind) => Err(exchange_error(kind.clone(), "stubbed failure")),
        }
    }
}
