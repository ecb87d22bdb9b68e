// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC client for the ledger wallet daemon.
//!
//! All calls are `POST {base}/json_rpc` with a JSON-RPC 2.0 envelope and
//! optional HTTP basic auth. No call is retried here; retry policy belongs
//! to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use url::Url;

use super::types::{null_as_default, Arguments, IntegratedAddress, TransferEntry};
use super::{LedgerError, LedgerWallet};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Basic auth credentials for the wallet RPC server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCredentials {
    pub username: String,
    pub password: String,
}

/// Wallet JSON-RPC client.
pub struct WalletRpcClient {
    endpoint: Url,
    credentials: Option<RpcCredentials>,
    http: Client,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct GetAddressResult {
    address: String,
}

#[derive(Debug, Deserialize)]
struct MakeIntegratedAddressResult {
    integrated_address: String,
}

#[derive(Debug, Deserialize)]
struct GetTransfersResult {
    #[serde(default, deserialize_with = "null_as_default")]
    entries: Vec<TransferEntry>,
}

impl WalletRpcClient {
    /// Create a client for the wallet RPC server at `base_url`.
    pub fn new(base_url: &str, credentials: Option<RpcCredentials>) -> Result<Self, LedgerError> {
        let base: Url = base_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;
        let endpoint = base
            .join("json_rpc")
            .map_err(|e| LedgerError::InvalidRpcUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            credentials,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
        });
        if let Some(params) = params {
            envelope["params"] = params;
        }

        let mut request = self.http.post(self.endpoint.clone()).json(&envelope);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!("{method}: HTTP {status}")));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(err) = body.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        body.result
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{method}: missing result")))
    }
}

#[async_trait]
impl LedgerWallet for WalletRpcClient {
    async fn get_address(&self) -> Result<String, LedgerError> {
        let result: GetAddressResult = self.call("GetAddress", None).await?;
        Ok(result.address)
    }

    async fn make_integrated_address(
        &self,
        base: &str,
        routing_tag: u64,
        correlation_tag: &str,
    ) -> Result<String, LedgerError> {
        let params = json!({
            "address": base,
            "payload_rpc": Arguments::checkout(routing_tag, correlation_tag),
        });
        let result: MakeIntegratedAddressResult =
            self.call("MakeIntegratedAddress", Some(params)).await?;
        Ok(result.integrated_address)
    }

    async fn split_integrated_address(
        &self,
        address: &str,
    ) -> Result<IntegratedAddress, LedgerError> {
        let params = json!({ "integrated_address": address });
        self.call("SplitIntegratedAddress", Some(params)).await
    }

    async fn get_incoming_transfers(
        &self,
        routing_tag: u64,
        asset: &str,
    ) -> Result<Vec<TransferEntry>, LedgerError> {
        let params = json!({
            "in": true,
            "dstport": routing_tag,
            "scid": asset,
        });
        let result: GetTransfersResult = self.call("GetTransfers", Some(params)).await?;
        Ok(result.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::BASE_ASSET;
    use axum::{http::HeaderMap, routing::post, Json, Router};

    /// "user:pass"
    const EXPECTED_AUTH: &str = "Basic dXNlcjpwYXNz";

    async fn stub_rpc(headers: HeaderMap, Json(req): Json<Value>) -> Json<Value> {
        let id = req["id"].clone();
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some(EXPECTED_AUTH);
        if !authorized {
            return Json(json!({
                "jsonrpc": "2.0", "id": id,
                "error": {"code": -32000, "message": "unauthorized"}
            }));
        }

        let params = &req["params"];
        let result = match req["method"].as_str() {
            Some("GetAddress") => json!({"address": "dero1qbase"}),
            Some("MakeIntegratedAddress") => {
                let args: Arguments =
                    serde_json::from_value(params["payload_rpc"].clone()).unwrap();
                json!({
                    "integrated_address": format!(
                        "deroi1-{}-{}-{}",
                        params["address"].as_str().unwrap(),
                        args.destination_port().unwrap(),
                        args.comment().unwrap()
                    )
                })
            }
            Some("SplitIntegratedAddress") => json!({
                "address": "dero1qbase",
                "payload_rpc": Arguments::checkout(7777, "order-42"),
            }),
            Some("GetTransfers") => {
                assert_eq!(params["in"], true);
                assert_eq!(params["scid"], BASE_ASSET);
                if params["dstport"] == 7777 {
                    json!({"entries": [
                        {"txid": "t1", "dstport": 7777, "amount": 10,
                         "payload_rpc": [{"name": "C", "datatype": "S", "value": "order-42"}]}
                    ]})
                } else {
                    json!({"entries": null})
                }
            }
            _ => {
                return Json(json!({
                    "jsonrpc": "2.0", "id": id,
                    "error": {"code": -32601, "message": "Method not found"}
                }))
            }
        };

        Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
    }

    async fn spawn_stub() -> String {
        let app = Router::new().route("/json_rpc", post(stub_rpc));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn credentials() -> Option<RpcCredentials> {
        Some(RpcCredentials {
            username: "user".to_string(),
            password: "pass".to_string(),
        })
    }

    #[test]
    fn endpoint_appends_json_rpc() {
        let client = WalletRpcClient::new("http://127.0.0.1:10103", None).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:10103/json_rpc");

        assert!(matches!(
            WalletRpcClient::new("not a url", None),
            Err(LedgerError::InvalidRpcUrl(_))
        ));
    }

    #[tokio::test]
    async fn wallet_calls_roundtrip() {
        let base_url = spawn_stub().await;
        let client = WalletRpcClient::new(&base_url, credentials()).unwrap();

        let base = client.get_address().await.unwrap();
        assert_eq!(base, "dero1qbase");

        let integrated = client
            .make_integrated_address(&base, 7777, "order-42")
            .await
            .unwrap();
        assert_eq!(integrated, "deroi1-dero1qbase-7777-order-42");

        let split = client.split_integrated_address(&integrated).await.unwrap();
        let tags = split.tags().unwrap();
        assert_eq!(tags.routing, 7777);
        assert_eq!(tags.correlation, "order-42");

        let entries = client.get_incoming_transfers(7777, BASE_ASSET).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].matches(&tags));

        let none = client.get_incoming_transfers(1, BASE_ASSET).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn rpc_error_object_is_surfaced() {
        let base_url = spawn_stub().await;

        let anonymous = WalletRpcClient::new(&base_url, None).unwrap();
        let err = anonymous.get_address().await.unwrap_err();
        assert!(matches!(err, LedgerError::Rpc { code: -32000, .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::ExternalCallFailed);
    }

    #[tokio::test]
    async fn unreachable_wallet_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WalletRpcClient::new(&format!("http://{addr}"), None).unwrap();
        let err = client.get_address().await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }
}
