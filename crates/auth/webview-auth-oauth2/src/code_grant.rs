//! Authorization-code grant flow.

use crate::client::{AuthCore, GrantFlow};
use crate::config::ClientConfiguration;
use crate::error::{AuthError, AuthResult, interpret_error_response};
use crate::query::{decode_query, encode_query, to_param_map};
use async_trait::async_trait;
use http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use webview_auth_core::{HttpRequest, HttpTransport, ReqwestTransport};

/// Parses a token-endpoint response body into a parameter mapping.
///
/// Most providers return JSON; a few return the same payload form-encoded.
/// Inject the matching parser at construction — payload parsing is the only
/// step that varies per provider.
pub trait TokenResponseParser: Send + Sync {
    fn parse(&self, body: &[u8]) -> AuthResult<Map<String, Value>>;
}

/// Default parser for `application/json` token responses.
pub struct JsonTokenParser;

impl TokenResponseParser for JsonTokenParser {
    fn parse(&self, body: &[u8]) -> AuthResult<Map<String, Value>> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AuthError::Network(format!("token response is not valid JSON: {e}")))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(AuthError::Network(
                "token response is not a JSON object".to_string(),
            )),
        }
    }
}

/// For providers that return the token payload form-encoded.
pub struct FormEncodedTokenParser;

impl TokenResponseParser for FormEncodedTokenParser {
    fn parse(&self, body: &[u8]) -> AuthResult<Map<String, Value>> {
        let text = std::str::from_utf8(body)
            .map_err(|_| AuthError::Network("token response is not valid UTF-8".to_string()))?;
        Ok(to_param_map(decode_query(text)))
    }
}

/// Authorization-code grant: the redirect delivers a one-time code in the
/// query string, which is exchanged at the token endpoint for the access
/// (and usually refresh) token.
pub struct CodeGrantFlow {
    core: AuthCore,
    transport: Arc<dyn HttpTransport>,
    parser: Arc<dyn TokenResponseParser>,
}

impl CodeGrantFlow {
    pub fn new(config: ClientConfiguration) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(
        config: ClientConfiguration,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            core: AuthCore::new(config),
            transport,
            parser: Arc::new(JsonTokenParser),
        }
    }

    /// Replaces the token-response parser for providers that do not return
    /// JSON.
    pub fn with_parser(mut self, parser: Arc<dyn TokenResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Validates an intercepted redirect and extracts the authorization code.
    ///
    /// The `state` round-trip is the CSRF defense: a mismatch fails with
    /// [`AuthError::InvalidState`] and leaves the stored state untouched; on
    /// success the state is consumed so it cannot be replayed.
    fn validate_redirect_url(&mut self, url: &Url) -> AuthResult<String> {
        let query = url
            .query()
            .filter(|q| !q.is_empty())
            .ok_or_else(|| {
                AuthError::PrerequisiteFailed(
                    "redirect URL carries no query parameters".to_string(),
                )
            })?;

        let params = decode_query(query);
        let Some(code) = params.get("code").filter(|c| !c.is_empty()) else {
            // No code: the provider answered with an error response instead
            return Err(interpret_error_response(&to_param_map(params)));
        };

        match params.get("state") {
            Some(state) if !self.core.state().is_empty() && state == self.core.state() => {
                let code = code.clone();
                self.core.clear_state();
                Ok(code)
            }
            _ => Err(AuthError::InvalidState),
        }
    }

    /// Exchanges an authorization code for tokens and fires the outcome
    /// callbacks.
    pub async fn exchange_code_for_token(&mut self, code: &str) {
        if self.core.config().verbose {
            debug!("exchanging authorization code");
        }
        let request = self.token_request(&[
            ("code", code.to_string()),
            ("grant_type", "authorization_code".to_string()),
        ]);
        self.execute_token_request(request).await;
    }

    /// Exchanges the held refresh token for a fresh access token.
    ///
    /// Fails immediately through the failure callback when no refresh token
    /// is held; no request is issued in that case.
    pub async fn refresh_access_token(&mut self) {
        if self.core.refresh_token().is_empty() {
            self.core.did_fail(Some(AuthError::PrerequisiteFailed(
                "no refresh token held".to_string(),
            )));
            return;
        }

        let mut grant_params = vec![
            ("refresh_token", self.core.refresh_token().to_string()),
            ("grant_type", "refresh_token".to_string()),
            ("client_id", self.core.config().client_id.clone()),
        ];
        if let Some(scope) = &self.core.config().scope {
            grant_params.push(("scope", scope.clone()));
        }

        let request = self.token_request(&grant_params);
        self.execute_token_request(request).await;
    }

    /// Assembles a token-endpoint POST: configured extra parameters first,
    /// grant parameters and the client secret overwriting them, form-encoded
    /// into the body.
    fn token_request(&self, grant_params: &[(&str, String)]) -> HttpRequest {
        let config = self.core.config();
        let mut params = config.extra_token_params.clone();
        for (key, value) in grant_params {
            params.insert((*key).to_string(), value.clone());
        }
        if let Some(secret) = &config.client_secret {
            params.insert("client_secret".to_string(), secret.clone());
        }

        HttpRequest::new(Method::POST, config.token_endpoint().clone())
            .with_header("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")
            .with_header("Accept", "application/json")
            .with_body(encode_query(&params).into_bytes())
    }

    async fn execute_token_request(&mut self, request: HttpRequest) {
        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                self.core.did_fail(Some(err.into()));
                return;
            }
        };

        let status = response.status;
        match self.parser.parse(&response.body) {
            Ok(params) if status.is_success() => {
                self.core.apply_token_response(&params);
                info!("token exchange succeeded");
                self.core.did_authorize(params);
            }
            Ok(params) => {
                self.core.did_fail(Some(interpret_error_response(&params)));
            }
            Err(_) if !status.is_success() => {
                self.core.did_fail(Some(AuthError::Network(format!(
                    "token endpoint returned HTTP {status} with an unreadable body"
                ))));
            }
            Err(err) => {
                self.core.did_fail(Some(err));
            }
        }
    }
}

#[async_trait]
impl GrantFlow for CodeGrantFlow {
    fn response_type(&self) -> &'static str {
        "code"
    }

    fn core(&self) -> &AuthCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AuthCore {
        &mut self.core
    }

    async fn handle_redirect_url(&mut self, url: &Url) {
        if self.core.config().verbose {
            debug!(%url, "handling code-grant redirect");
        }
        match self.validate_redirect_url(url) {
            Ok(code) => self.exchange_code_for_token(&code).await,
            Err(err) => self.core.did_fail(Some(err)),
        }
    }
}

impl std::fmt::Debug for CodeGrantFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGrantFlow").field("core", &self.core).finish()
    }
}
