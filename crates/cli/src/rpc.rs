//! Minimal JSON-RPC 2.0 client over HTTP

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Error codes the CLI reacts to
pub mod code {
    pub const NOT_QUEUED: i32 = 4004;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
}

/// Error object returned by the daemon
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("RPC error ({code}): {message}")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Whether `err` is an RPC error with `code`
pub fn has_code(err: &anyhow::Error, code: i32) -> bool {
    err.downcast_ref::<RpcError>()
        .is_some_and(|rpc| rpc.code == code)
}

pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to daemon")?
            .json()
            .await
            .context("Failed to parse response")?;

        let result = into_result(response)?;
        serde_json::from_value(result)
            .with_context(|| format!("Unexpected result shape from {}", method))
    }
}

fn into_result(response: JsonRpcResponse) -> Result<serde_json::Value> {
    if let Some(error) = response.error {
        return Err(error.into());
    }
    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<serde_json::Value> {
        into_result(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_result_is_returned() {
        let result = parse(json!({"jsonrpc": "2.0", "id": 1, "result": {"left": true}})).unwrap();
        assert_eq!(result["left"], true);
    }

    #[test]
    fn test_error_keeps_code() {
        let err = parse(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 4004, "message": "Requester r1 is not queued at zoo"}
        }))
        .unwrap_err();

        assert!(has_code(&err, code::NOT_QUEUED));
        assert!(!has_code(&err, 5003));
        assert_eq!(err.to_string(), "RPC error (4004): Requester r1 is not queued at zoo");
    }

    #[test]
    fn test_missing_result() {
        assert!(parse(json!({"jsonrpc": "2.0", "id": 1})).is_err());
    }
}
