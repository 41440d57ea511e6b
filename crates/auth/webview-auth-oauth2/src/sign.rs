//! Bearer-token request signing.

use crate::client::AuthCore;
use webview_auth_core::HttpRequest;

/// Decorates `request` with `Authorization: Bearer <token>`.
///
/// # Panics
///
/// Panics when `access_token` is empty: signing without a token is a caller
/// bug, not a runtime authorization outcome.
pub fn sign_request(request: HttpRequest, access_token: &str) -> HttpRequest {
    assert!(
        !access_token.is_empty(),
        "cannot sign a request without an access token"
    );
    request.with_header("Authorization", format!("Bearer {access_token}"))
}

impl AuthCore {
    /// Signs `request` with the held access token. Panics when none is held;
    /// check [`AuthCore::has_unexpired_access_token`] first.
    pub fn sign(&self, request: HttpRequest) -> HttpRequest {
        sign_request(request, self.access_token())
    }

    /// `Authorization` header value for the held access token. Panics when
    /// none is held.
    pub fn authorization_header(&self) -> String {
        assert!(
            !self.access_token().is_empty(),
            "cannot build an Authorization header without an access token"
        );
        format!("Bearer {}", self.access_token())
    }
}
