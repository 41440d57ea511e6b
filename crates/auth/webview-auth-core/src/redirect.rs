//! Redirect interception contract.
//!
//! The host's navigation interceptor (web-view delegate, loopback server,
//! custom scheme handler) watches every navigation and, when one targets the
//! registered redirect location, suppresses it and hands the full URL to the
//! flow's `handle_redirect_url` exactly once. This predicate defines
//! "targets the registered redirect location".

use url::Url;

/// True when `candidate` navigates to the registered redirect location.
///
/// Scheme, host, port and path must match exactly; query and fragment carry
/// the authorization result and are ignored for matching.
pub fn redirect_matches(candidate: &Url, registered: &Url) -> bool {
    candidate.scheme() == registered.scheme()
        && candidate.host_str() == registered.host_str()
        && candidate.port_or_known_default() == registered.port_or_known_default()
        && candidate.path() == registered.path()
}
