//! Implicit grant flow.

use crate::client::{AuthCore, GrantFlow};
use crate::config::ClientConfiguration;
use crate::error::{AuthError, AuthResult, interpret_error_response};
use crate::query::{decode_query, to_param_map};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use webview_auth_core::CallbackDispatcher;

/// Implicit grant: the provider puts the access token directly into the
/// redirect URL's fragment, so no token-endpoint exchange happens.
///
/// Unlike the code grant, a successful validation does not consume the CSRF
/// state token; call [`AuthCore::expire_state`] between attempts when
/// reusing a flow instance.
pub struct ImplicitGrantFlow {
    core: AuthCore,
}

impl ImplicitGrantFlow {
    pub fn new(config: ClientConfiguration) -> Self {
        Self {
            core: AuthCore::new(config),
        }
    }

    pub fn with_dispatcher(
        config: ClientConfiguration,
        dispatcher: Arc<dyn CallbackDispatcher>,
    ) -> Self {
        Self {
            core: AuthCore::with_dispatcher(config, dispatcher),
        }
    }

    /// Validates an intercepted redirect and stores the token it carries.
    ///
    /// The token arrives in the fragment, not the query. The fragment must be
    /// present, carry a non-empty `access_token` of type `bearer`, and echo
    /// the stored `state` exactly — a missing state is rejected, never
    /// treated as optional.
    fn validate_redirect_url(&mut self, url: &Url) -> AuthResult<Map<String, Value>> {
        let fragment = url.fragment().filter(|f| !f.is_empty()).ok_or_else(|| {
            AuthError::PrerequisiteFailed("redirect URL carries no fragment".to_string())
        })?;

        let params = decode_query(fragment);

        let has_token = params
            .get("access_token")
            .is_some_and(|token| !token.is_empty());
        if !has_token {
            // No token: the provider answered with an error response instead
            return Err(interpret_error_response(&to_param_map(params)));
        }

        match params.get("token_type") {
            Some(token_type) if token_type.eq_ignore_ascii_case("bearer") => {}
            Some(token_type) => {
                return Err(AuthError::UnsupportedTokenType(format!(
                    "expected a bearer token, got {token_type:?}"
                )));
            }
            None => {
                return Err(AuthError::UnsupportedTokenType(
                    "token response names no token type".to_string(),
                ));
            }
        }

        match params.get("state") {
            Some(state) if !self.core.state().is_empty() && state == self.core.state() => {}
            _ => return Err(AuthError::InvalidState),
        }

        let params = to_param_map(params);
        self.core.apply_token_response(&params);
        Ok(params)
    }
}

#[async_trait]
impl GrantFlow for ImplicitGrantFlow {
    fn response_type(&self) -> &'static str {
        "token"
    }

    fn core(&self) -> &AuthCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AuthCore {
        &mut self.core
    }

    async fn handle_redirect_url(&mut self, url: &Url) {
        if self.core.config().verbose {
            debug!(%url, "handling implicit-grant redirect");
        }
        match self.validate_redirect_url(url) {
            Ok(params) => {
                info!("implicit grant succeeded");
                self.core.did_authorize(params);
            }
            Err(err) => self.core.did_fail(Some(err)),
        }
    }
}

impl std::fmt::Debug for ImplicitGrantFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplicitGrantFlow").field("core", &self.core).finish()
    }
}
