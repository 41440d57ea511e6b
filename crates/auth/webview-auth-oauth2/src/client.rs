//! Core authorization flow state, URL construction and outcome delivery.

use crate::config::ClientConfiguration;
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;
use uuid::Uuid;
use webview_auth_core::{CallbackDispatcher, InlineDispatcher};

/// Characters of a fresh UUID kept as the CSRF state token.
const STATE_LEN: usize = 8;

pub type AuthorizeCallback = Arc<dyn Fn(Map<String, Value>) + Send + Sync>;
pub type FailureCallback = Arc<dyn Fn(Option<AuthError>) + Send + Sync>;
pub type CompletionCallback = Arc<dyn Fn(bool, Option<AuthError>) + Send + Sync>;

/// Overrides for a single authorization-URL construction. All fields are
/// optional; configured defaults fill the gaps.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeUrlParams {
    pub redirect: Option<String>,
    pub scope: Option<String>,
    pub response_type: Option<String>,
    /// Extra query parameters; reserved keys are overwritten, not merged.
    pub extra: HashMap<String, String>,
}

/// Mutable per-attempt flow state. One authorization attempt in flight per
/// flow instance; `&mut self` on the mutating operations enforces that.
#[derive(Debug, Default)]
struct FlowState {
    /// The redirect URI actually in use, fixed once resolved.
    redirect: Option<String>,
    /// CSRF token round-tripped through the redirect; empty means "regenerate
    /// at the next URL construction". Cleared on successful code-grant
    /// validation, making each value single-use.
    state: String,
    /// Empty means no token held.
    access_token: String,
    /// `None` means the held token is treated as non-expiring.
    access_token_expiry: Option<DateTime<Utc>>,
    /// Code grant only.
    refresh_token: String,
}

/// Shared core of both grant flows: configuration, token state, authorize-URL
/// construction and the outcome callback surface.
pub struct AuthCore {
    config: ClientConfiguration,
    flow: FlowState,
    dispatcher: Arc<dyn CallbackDispatcher>,
    on_authorize: Option<AuthorizeCallback>,
    on_failure: Option<FailureCallback>,
    after_authorize_or_failure: Option<CompletionCallback>,
}

impl AuthCore {
    pub fn new(config: ClientConfiguration) -> Self {
        Self::with_dispatcher(config, Arc::new(InlineDispatcher))
    }

    /// `dispatcher` designates the execution context every outcome callback
    /// is delivered on.
    pub fn with_dispatcher(
        config: ClientConfiguration,
        dispatcher: Arc<dyn CallbackDispatcher>,
    ) -> Self {
        Self {
            config,
            flow: FlowState::default(),
            dispatcher,
            on_authorize: None,
            on_failure: None,
            after_authorize_or_failure: None,
        }
    }

    pub fn config(&self) -> &ClientConfiguration {
        &self.config
    }

    pub fn set_dispatcher(&mut self, dispatcher: Arc<dyn CallbackDispatcher>) {
        self.dispatcher = dispatcher;
    }

    /// Empty when no token is held.
    pub fn access_token(&self) -> &str {
        &self.flow.access_token
    }

    pub fn access_token_expiry(&self) -> Option<DateTime<Utc>> {
        self.flow.access_token_expiry
    }

    /// Empty when no refresh token is held.
    pub fn refresh_token(&self) -> &str {
        &self.flow.refresh_token
    }

    /// True when a token is held and either never expires or expires strictly
    /// after now.
    pub fn has_unexpired_access_token(&self) -> bool {
        if self.flow.access_token.is_empty() {
            return false;
        }
        match self.flow.access_token_expiry {
            None => true,
            Some(expiry) => expiry > Utc::now(),
        }
    }

    pub(crate) fn state(&self) -> &str {
        &self.flow.state
    }

    pub(crate) fn clear_state(&mut self) {
        self.flow.state.clear();
    }

    /// Discards the current CSRF state token, forcing a fresh one at the next
    /// URL construction. Hosts reusing an implicit-grant flow across attempts
    /// call this between them.
    pub fn expire_state(&mut self) {
        self.clear_state();
    }

    // -- callback surface ---------------------------------------------------

    pub fn set_on_authorize(
        &mut self,
        callback: impl Fn(Map<String, Value>) + Send + Sync + 'static,
    ) {
        self.on_authorize = Some(Arc::new(callback));
    }

    pub fn set_on_failure(
        &mut self,
        callback: impl Fn(Option<AuthError>) + Send + Sync + 'static,
    ) {
        self.on_failure = Some(Arc::new(callback));
    }

    pub fn set_after_authorize_or_failure(
        &mut self,
        callback: impl Fn(bool, Option<AuthError>) + Send + Sync + 'static,
    ) {
        self.after_authorize_or_failure = Some(Arc::new(callback));
    }

    /// Delivers the success callback, then the completion callback, through
    /// the designated dispatcher.
    pub fn did_authorize(&self, params: Map<String, Value>) {
        info!("authorization succeeded");
        let on_authorize = self.on_authorize.clone();
        let after = self.after_authorize_or_failure.clone();
        self.dispatcher.dispatch(Box::new(move || {
            if let Some(callback) = on_authorize {
                callback(params);
            }
            if let Some(callback) = after {
                callback(false, None);
            }
        }));
    }

    /// Delivers the failure callback, then the completion callback. `None`
    /// means the host cancelled the attempt rather than hit an error.
    pub fn did_fail(&self, failure: Option<AuthError>) {
        match &failure {
            Some(err) => error!("authorization failed: {err}"),
            None => info!("authorization cancelled"),
        }
        let on_failure = self.on_failure.clone();
        let after = self.after_authorize_or_failure.clone();
        self.dispatcher.dispatch(Box::new(move || {
            if let Some(callback) = on_failure {
                callback(failure.clone());
            }
            if let Some(callback) = after {
                callback(true, failure);
            }
        }));
    }

    // -- authorize URL ------------------------------------------------------

    /// Builds the authorization URL against `base`.
    ///
    /// Resolves the redirect URI (override, then the cached one, then the
    /// first configured candidate), regenerates the CSRF state token when it
    /// has been consumed, and assembles the query with caller extras first
    /// and the reserved keys (`client_id`, `redirect_uri`, `state`, `scope`,
    /// `response_type`) overwriting any caller-supplied values.
    pub fn build_authorize_url(
        &mut self,
        base: &Url,
        params: &AuthorizeUrlParams,
    ) -> AuthResult<Url> {
        if base.scheme() != "https" {
            return Err(AuthError::PrerequisiteFailed(format!(
                "authorize URL must use https, got {}",
                base.scheme()
            )));
        }
        if base.cannot_be_a_base() {
            return Err(AuthError::PrerequisiteFailed(format!(
                "cannot build an authorization URL on {base}"
            )));
        }

        let redirect = params
            .redirect
            .clone()
            .or_else(|| self.flow.redirect.clone())
            .or_else(|| self.config.redirect_uris.first().cloned())
            .ok_or_else(|| {
                AuthError::PrerequisiteFailed("no redirect URI configured".to_string())
            })?;
        self.flow.redirect = Some(redirect.clone());

        if self.flow.state.is_empty() {
            self.flow.state = generate_state();
        }

        let scope = params.scope.clone().or_else(|| self.config.scope.clone());

        let mut url = base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &params.extra {
                let reserved = matches!(key.as_str(), "client_id" | "redirect_uri" | "state")
                    || (key == "scope" && scope.is_some())
                    || (key == "response_type" && params.response_type.is_some());
                if reserved {
                    continue;
                }
                pairs.append_pair(key, value);
            }
            pairs.append_pair("client_id", &self.config.client_id);
            pairs.append_pair("redirect_uri", &redirect);
            pairs.append_pair("state", &self.flow.state);
            if let Some(scope) = &scope {
                pairs.append_pair("scope", scope);
            }
            if let Some(response_type) = &params.response_type {
                pairs.append_pair("response_type", response_type);
            }
        }

        if self.config.verbose {
            debug!(%url, "built authorization URL");
        }
        Ok(url)
    }

    // -- token state --------------------------------------------------------

    /// Applies a successful token payload: stores `access_token`, converts
    /// `expires_in` seconds into an absolute expiry (absent clears the
    /// expiry), and stores `refresh_token` when the provider rotated one.
    pub(crate) fn apply_token_response(&mut self, params: &Map<String, Value>) {
        if let Some(token) = params.get("access_token").and_then(Value::as_str) {
            self.flow.access_token = token.to_string();
        }
        self.flow.access_token_expiry =
            int_param(params, "expires_in").map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(token) = params.get("refresh_token").and_then(Value::as_str) {
            self.flow.refresh_token = token.to_string();
        }

        if self.config.verbose {
            debug!(
                expires = ?self.flow.access_token_expiry,
                has_refresh_token = !self.flow.refresh_token.is_empty(),
                "token state updated"
            );
        }
    }
}

impl std::fmt::Debug for AuthCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCore")
            .field("client_id", &self.config.client_id)
            .field("has_access_token", &!self.flow.access_token.is_empty())
            .finish()
    }
}

/// Integer parameter that may arrive as a JSON number or, from
/// fragment/query parsing, as a string.
pub(crate) fn int_param(params: &Map<String, Value>, key: &str) -> Option<i64> {
    match params.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn generate_state() -> String {
    let mut state = Uuid::new_v4().simple().to_string();
    state.truncate(STATE_LEN);
    state
}

/// The two supported grants. Closed set: implementing this trait outside the
/// crate buys nothing, since the core state handles are crate-private.
#[async_trait]
pub trait GrantFlow {
    /// `response_type` query value this grant requests.
    fn response_type(&self) -> &'static str;

    fn core(&self) -> &AuthCore;

    fn core_mut(&mut self) -> &mut AuthCore;

    /// Authorization URL from configured defaults alone.
    fn authorize_url(&mut self) -> AuthResult<Url> {
        self.authorize_url_with(AuthorizeUrlParams::default())
    }

    /// Authorization URL with per-call overrides; the grant's response type
    /// always wins.
    fn authorize_url_with(&mut self, mut params: AuthorizeUrlParams) -> AuthResult<Url> {
        params.response_type = Some(self.response_type().to_string());
        let base = self.core().config().authorize_uri.clone();
        self.core_mut().build_authorize_url(&base, &params)
    }

    /// Authorization URL using `redirect` instead of the configured
    /// candidates.
    fn authorize_url_with_redirect(&mut self, redirect: &str) -> AuthResult<Url> {
        self.authorize_url_with(AuthorizeUrlParams {
            redirect: Some(redirect.to_string()),
            ..AuthorizeUrlParams::default()
        })
    }

    /// Consumes an intercepted redirect URL: validates it, extracts or
    /// exchanges the credentials, and fires exactly one outcome callback
    /// followed by the completion callback.
    async fn handle_redirect_url(&mut self, url: &Url);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ClientConfiguration {
        ClientConfiguration::new("abc", Url::parse("https://example.com/auth").unwrap())
            .unwrap()
            .with_redirect_uri("https://app.example.com/callback")
    }

    #[test]
    fn test_authorize_url_carries_reserved_params() {
        let mut core = AuthCore::new(config());
        let url = core
            .build_authorize_url(
                &Url::parse("https://example.com/auth").unwrap(),
                &AuthorizeUrlParams {
                    response_type: Some("code".to_string()),
                    ..AuthorizeUrlParams::default()
                },
            )
            .unwrap();

        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("client_id").map(String::as_str), Some("abc"));
        assert_eq!(
            pairs.get("redirect_uri").map(String::as_str),
            Some("https://app.example.com/callback")
        );
        assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(pairs.get("state").map(String::len), Some(STATE_LEN));
    }

    #[test]
    fn test_reserved_keys_overwrite_caller_extras() {
        let mut core = AuthCore::new(config());
        let mut extra = HashMap::new();
        extra.insert("client_id".to_string(), "evil".to_string());
        extra.insert("prompt".to_string(), "consent".to_string());

        let url = core
            .build_authorize_url(
                &Url::parse("https://example.com/auth").unwrap(),
                &AuthorizeUrlParams {
                    extra,
                    ..AuthorizeUrlParams::default()
                },
            )
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let client_ids: Vec<_> = pairs.iter().filter(|(k, _)| k == "client_id").collect();
        assert_eq!(client_ids.len(), 1);
        assert_eq!(client_ids[0].1, "abc");
        assert!(pairs.iter().any(|(k, v)| k == "prompt" && v == "consent"));
    }

    #[test]
    fn test_state_is_reused_until_cleared_then_regenerated() {
        let mut core = AuthCore::new(config());
        let base = Url::parse("https://example.com/auth").unwrap();
        let params = AuthorizeUrlParams::default();

        core.build_authorize_url(&base, &params).unwrap();
        let first = core.state().to_string();
        core.build_authorize_url(&base, &params).unwrap();
        assert_eq!(core.state(), first);

        core.clear_state();
        core.build_authorize_url(&base, &params).unwrap();
        assert_eq!(core.state().len(), STATE_LEN);
        assert_ne!(core.state(), first);
    }

    #[test]
    fn test_non_https_base_is_rejected() {
        let mut core = AuthCore::new(config());
        let result = core.build_authorize_url(
            &Url::parse("http://example.com/auth").unwrap(),
            &AuthorizeUrlParams::default(),
        );
        assert!(matches!(result, Err(AuthError::PrerequisiteFailed(_))));
    }

    #[test]
    fn test_missing_redirect_is_rejected() {
        let config =
            ClientConfiguration::new("abc", Url::parse("https://example.com/auth").unwrap())
                .unwrap();
        let mut core = AuthCore::new(config);
        let result = core.build_authorize_url(
            &Url::parse("https://example.com/auth").unwrap(),
            &AuthorizeUrlParams::default(),
        );
        assert!(matches!(result, Err(AuthError::PrerequisiteFailed(_))));
    }

    #[test]
    fn test_redirect_override_is_cached_for_later_calls() {
        let mut core = AuthCore::new(config());
        let base = Url::parse("https://example.com/auth").unwrap();

        core.build_authorize_url(
            &base,
            &AuthorizeUrlParams {
                redirect: Some("myapp://override".to_string()),
                ..AuthorizeUrlParams::default()
            },
        )
        .unwrap();

        let url = core
            .build_authorize_url(&base, &AuthorizeUrlParams::default())
            .unwrap();
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs.get("redirect_uri").map(String::as_str),
            Some("myapp://override")
        );
    }

    #[test]
    fn test_has_unexpired_access_token_transitions() {
        let mut core = AuthCore::new(config());
        assert!(!core.has_unexpired_access_token());

        // No expires_in: token treated as non-expiring
        core.apply_token_response(json!({"access_token": "T1"}).as_object().unwrap());
        assert!(core.has_unexpired_access_token());

        core.apply_token_response(
            json!({"access_token": "T1", "expires_in": 3600})
                .as_object()
                .unwrap(),
        );
        assert!(core.has_unexpired_access_token());

        core.apply_token_response(
            json!({"access_token": "T1", "expires_in": -1})
                .as_object()
                .unwrap(),
        );
        assert!(!core.has_unexpired_access_token());
    }

    #[test]
    fn test_expires_in_as_string_is_parsed() {
        let mut core = AuthCore::new(config());
        core.apply_token_response(
            json!({"access_token": "T1", "expires_in": "3600"})
                .as_object()
                .unwrap(),
        );
        let expiry = core.access_token_expiry().unwrap();
        let delta = expiry - Utc::now();
        assert!(delta > Duration::seconds(3590) && delta <= Duration::seconds(3600));
    }
}
