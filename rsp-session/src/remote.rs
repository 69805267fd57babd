//! Remote session over the injected HTTP transport
//!
//! Requests are JSON bodies whose binary fields carry base64 encoded TLV.
//! Every response body starts with a header:
//!
//! ```text
//! { "header": { "functionExecutionStatus": {
//!     "status": "Executed-Success" | "Executed-WithWarning" | "Failed" | "Expired",
//!     "statusCodeData": { "subjectCode", "reasonCode", "subjectIdentifier", "message" } } },
//!   ...function specific fields... }
//! ```
//!
//! A failed status becomes `RspError::Remote` with the server codes; a
//! non-2xx HTTP status becomes `RspError::Http`.

use crate::error::{RspError, RspResult};
use rsp_transport::{HttpTransport, CONTENT_TYPE_JSON};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const STATUS_SUCCESS: &str = "Executed-Success";
const STATUS_WARNING: &str = "Executed-WithWarning";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseHeader {
    function_execution_status: FunctionExecutionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionExecutionStatus {
    status: String,
    status_code_data: Option<StatusCodeData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusCodeData {
    #[serde(default)]
    subject_code: String,
    #[serde(default)]
    reason_code: String,
    subject_identifier: Option<String>,
    message: Option<String>,
}

impl FunctionExecutionStatus {
    fn into_result(self) -> RspResult<()> {
        if self.status == STATUS_SUCCESS {
            return Ok(());
        }
        if self.status == STATUS_WARNING {
            log::warn!("Server executed the function with a warning");
            return Ok(());
        }

        let data = self.status_code_data.unwrap_or_default();
        let mut message = data.message.unwrap_or_else(|| self.status.clone());
        if let Some(subject) = data.subject_identifier {
            message = format!("{} ({})", message, subject);
        }
        Err(RspError::Remote {
            subject_code: data.subject_code,
            reason_code: data.reason_code,
            message,
        })
    }
}

/// Build the URL of a server function
///
/// A bare host gets the `https://` scheme; an address that already carries
/// a scheme is kept. Trailing slashes are dropped before the path is added.
pub fn endpoint(address: &str, path: &str) -> String {
    let base = address.trim().trim_end_matches('/');
    if base.contains("://") {
        format!("{}{}", base, path)
    } else {
        format!("https://{}{}", base, path)
    }
}

/// Host part of a server address, as carried inside signed structures
pub fn server_host(address: &str) -> &str {
    let base = address.trim().trim_end_matches('/');
    base.split_once("://").map_or(base, |(_, host)| host)
}

/// Base64 encode a TLV field for the JSON body
pub(crate) fn b64(data: &[u8]) -> String {
    base64::encode(data)
}

/// Decode a base64 field of a response
pub(crate) fn from_b64(field: &str, value: &str) -> RspResult<Vec<u8>> {
    base64::decode(value.trim()).map_err(|e| RspError::Decode(format!("Invalid base64 in {}: {}", field, e)))
}

/// Client side of ES9+ (SM-DP+) and ES11 (SM-DS)
#[derive(Debug, Clone)]
pub struct RemoteSession<H: HttpTransport> {
    transport: H,
}

impl<H: HttpTransport> RemoteSession<H> {
    pub fn new(transport: H) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &H {
        &self.transport
    }

    async fn post<Req: Serialize + Sync>(&self, url: &str, request: &Req) -> RspResult<Vec<u8>> {
        let body = serde_json::to_vec(request)
            .map_err(|e| RspError::Transport(format!("Failed to encode request for {}: {}", url, e)))?;

        log::debug!("POST {} ({} bytes)", url, body.len());
        let response = self.transport.post(url, CONTENT_TYPE_JSON, &body).await?;
        log::debug!("{} answered {} ({} bytes)", url, response.status, response.body.len());

        if !response.is_success() {
            return Err(RspError::Http {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }

    /// Call a function and decode its response fields
    pub(crate) async fn invoke<Req, Resp>(&self, address: &str, path: &str, request: &Req) -> RspResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = endpoint(address, path);
        let body = self.post(&url, request).await?;
        let value = check_header(&url, &body)?;
        serde_json::from_value(value).map_err(|e| RspError::Decode(format!("Invalid response from {}: {}", url, e)))
    }

    /// Call a function whose success response may have no body at all
    pub(crate) async fn invoke_no_content<Req>(&self, address: &str, path: &str, request: &Req) -> RspResult<()>
    where
        Req: Serialize + Sync,
    {
        let url = endpoint(address, path);
        let body = self.post(&url, request).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        check_header(&url, &body).map(|_| ())
    }
}

fn check_header(url: &str, body: &[u8]) -> RspResult<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| RspError::Decode(format!("Invalid JSON from {}: {}", url, e)))?;

    let header = value
        .get("header")
        .ok_or_else(|| RspError::Decode(format!("Response from {} has no header", url)))?;
    let header: ResponseHeader = serde_json::from_value(header.clone())
        .map_err(|e| RspError::Decode(format!("Invalid response header from {}: {}", url, e)))?;

    header.function_execution_status.into_result()?;
    Ok(value)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording HTTP transport used by the remote session tests

    use super::*;
    use async_trait::async_trait;
    use rsp_transport::HttpResponse;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Recorded {
        pub url: String,
        pub content_type: String,
        pub body: serde_json::Value,
    }

    #[derive(Default)]
    pub struct RecordingHttp {
        pub replies: Mutex<VecDeque<HttpResponse>>,
        pub requests: Mutex<Vec<Recorded>>,
    }

    impl RecordingHttp {
        pub fn new(replies: Vec<HttpResponse>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn json(status: u16, body: serde_json::Value) -> HttpResponse {
            HttpResponse::new(status, serde_json::to_vec(&body).unwrap())
        }

        pub fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingHttp {
        async fn post(&self, url: &str, content_type: &str, body: &[u8]) -> RspResult<HttpResponse> {
            self.requests.lock().unwrap().push(Recorded {
                url: url.to_string(),
                content_type: content_type.to_string(),
                body: serde_json::from_slice(body).unwrap(),
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| RspError::Transport("no reply scripted".to_string()))
        }
    }
}
