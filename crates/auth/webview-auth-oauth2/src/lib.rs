//! Client-side OAuth2 authorization flows for applications that embed the
//! provider's login UI.
//!
//! This crate implements the authorization flow state machine and the
//! token-exchange protocol: authorization-URL construction with a
//! CSRF-protecting `state` token, redirect-URL validation, the
//! authorization-code and implicit grants, token refresh, and bearer-token
//! request signing. The embedded browser, the HTTP transport and the
//! completion context are supplied by the host through the boundary traits
//! in `webview-auth-core`.
//!
//! A typical code-grant session:
//!
//! 1. Build a [`CodeGrantFlow`] from a [`ClientConfiguration`] and register
//!    the outcome callbacks.
//! 2. Navigate the embedded browser to [`GrantFlow::authorize_url`].
//! 3. When the interceptor sees a navigation for which
//!    `webview_auth_core::redirect_matches` is true, pass the full URL to
//!    [`GrantFlow::handle_redirect_url`].
//! 4. The flow validates the redirect, exchanges the code and fires exactly
//!    one outcome callback followed by the completion callback.

mod client;
mod code_grant;
mod config;
mod error;
mod implicit_grant;
mod query;
mod sign;


pub use client::{AuthCore, AuthorizeUrlParams, GrantFlow};
pub use code_grant::{
    CodeGrantFlow, FormEncodedTokenParser, JsonTokenParser, TokenResponseParser,
};
pub use config::{ClientConfiguration, ClientSettings, ConfigError};
pub use error::{AuthError, AuthResult, interpret_error_response};
pub use implicit_grant::ImplicitGrantFlow;
pub use query::{decode_query, encode_query};
pub use sign::sign_request;

// Re-export the boundary contracts for convenience
pub use webview_auth_core::{
    CallbackDispatcher, HttpRequest, HttpResponse, HttpTransport, InlineDispatcher,
    ReqwestTransport, redirect_matches,
};
