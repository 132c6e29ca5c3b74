// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-RPC share-balance reader.
//!
//! Reads an ERC-20 style `balanceOf(address)` via `eth_call` against
//! whatever endpoint the oracle hands it. One HTTP request per call, with
//! a bounded per-call timeout; no internal retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::trace;

use keepr_core::{KeeprError, ShareReader};

/// 4-byte selector of `balanceOf(address)`.
const BALANCE_OF_SELECTOR: &str = "70a08231";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Concrete [`ShareReader`] over HTTP JSON-RPC.
pub struct JsonRpcShareReader {
    client: reqwest::Client,
    timeout: Duration,
}

impl JsonRpcShareReader {
    /// Build a reader with the given per-call timeout.
    pub fn new(timeout: Duration) -> Result<Self, KeeprError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeeprError::Chain {
                message: "failed to build HTTP client".into(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, timeout })
    }

    /// The per-call timeout this reader applies.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ShareReader for JsonRpcShareReader {
    async fn share_balance(
        &self,
        rpc_url: &str,
        wallet_address: &str,
        token_address: &str,
    ) -> Result<u128, KeeprError> {
        let calldata = balance_of_calldata(wallet_address)?;
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{"to": token_address, "data": calldata}, "latest"],
        });

        trace!(rpc_url, wallet_address, token_address, "eth_call balanceOf");

        let response = self
            .client
            .post(rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    KeeprError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    KeeprError::Chain {
                        message: format!("rpc transport failure against {rpc_url}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeeprError::Chain {
                message: format!("rpc endpoint {rpc_url} returned HTTP {status}"),
                source: None,
            });
        }

        let rpc: RpcResponse = response.json().await.map_err(|e| KeeprError::Chain {
            message: format!("malformed rpc response from {rpc_url}"),
            source: Some(Box::new(e)),
        })?;

        if let Some(err) = rpc.error {
            return Err(KeeprError::Chain {
                message: format!("rpc error {} from {rpc_url}: {}", err.code, err.message),
                source: None,
            });
        }

        match rpc.result {
            Some(result) => decode_uint256(&result),
            None => Err(KeeprError::Chain {
                message: format!("rpc response from {rpc_url} carried neither result nor error"),
                source: None,
            }),
        }
    }
}

/// Build `balanceOf(address)` calldata: selector + the address left-padded
/// to 32 bytes.
fn balance_of_calldata(wallet_address: &str) -> Result<String, KeeprError> {
    let addr = wallet_address
        .strip_prefix("0x")
        .unwrap_or(wallet_address)
        .to_ascii_lowercase();
    if addr.len() != 40 || hex::decode(&addr).is_err() {
        return Err(KeeprError::Chain {
            message: format!("`{wallet_address}` is not a 20-byte hex address"),
            source: None,
        });
    }
    Ok(format!("0x{BALANCE_OF_SELECTOR}{:0>64}", addr))
}

/// Decode a 32-byte hex quantity into u128.
///
/// Balances above 2^128 - 1 are rejected rather than silently truncated;
/// no share token in this deployment mints anywhere near that supply.
fn decode_uint256(raw: &str) -> Result<u128, KeeprError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Err(KeeprError::Chain {
            message: "empty eth_call result".into(),
            source: None,
        });
    }
    if digits.len() > 64 || hex::decode(format!("{:0>64}", digits)).is_err() {
        return Err(KeeprError::Chain {
            message: format!("`{raw}` is not a 32-byte hex quantity"),
            source: None,
        });
    }
    let padded = format!("{:0>64}", digits);
    let (high, low) = padded.split_at(32);
    if high.chars().any(|c| c != '0') {
        return Err(KeeprError::Chain {
            message: "balance exceeds u128 range".into(),
            source: None,
        });
    }
    u128::from_str_radix(low, 16).map_err(|e| KeeprError::Chain {
        message: format!("`{raw}` is not a hex quantity"),
        source: Some(Box::new(e)),
    })
}
