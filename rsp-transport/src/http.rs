//! HTTP transport capability

use crate::error::RspResult;
use async_trait::async_trait;

/// Content type of every ES9+/ES11 request body
pub const CONTENT_TYPE_JSON: &str = "application/json;charset=UTF-8";

/// Value drivers send in the `X-Admin-Protocol` header
pub const ADMIN_PROTOCOL: &str = "gsma/rsp/v2.2.0";

/// HTTP response as seen by the remote session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTPS client used to reach SM-DP+ and SM-DS servers
///
/// Implementations perform one POST and return the status and body; network
/// failures are reported as `RspError::Transport`. Non-2xx statuses are
/// returned as responses, not errors. Drivers add the fixed
/// `X-Admin-Protocol: gsma/rsp/v2.2.0` header to every request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, url: &str, content_type: &str, body: &[u8]) -> RspResult<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn post(&self, url: &str, content_type: &str, body: &[u8]) -> RspResult<HttpResponse> {
        (**self).post(url, content_type, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(200, Vec::new()).is_success());
        assert!(HttpResponse::new(204, Vec::new()).is_success());
        assert!(!HttpResponse::new(404, b"not found".to_vec()).is_success());
    }
}
