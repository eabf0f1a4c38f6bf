//! reqwest-backed adapters for the request and credential-refresh ports

mod refresher;
mod sender;

pub use refresher::HttpCredentialRefresher;
pub use sender::{HttpRequestSender, HttpRequestSenderBuilder};

/// Join a base URL and a request path with exactly one `/` between them
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
