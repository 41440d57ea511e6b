//! Boundary contracts for embedded-browser OAuth2 flows.
//!
//! The flow logic in `webview-auth-oauth2` never talks to the network or to a
//! UI toolkit directly. Hosts supply those pieces through the traits defined
//! here: an [`HttpTransport`] for token-endpoint requests, a
//! [`CallbackDispatcher`] that pins outcome delivery to whatever execution
//! context the host considers safe (typically its UI context), and the
//! [`redirect_matches`] predicate a navigation interceptor uses to decide
//! when to capture a redirect.

mod dispatch;
mod redirect;
mod transport;

pub use dispatch::{Callback, CallbackDispatcher, InlineDispatcher};
pub use redirect::redirect_matches;
pub use transport::{
    DEFAULT_HTTP_TIMEOUT, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
    TransportError, TransportResult,
};
