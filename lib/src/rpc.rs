//! Minimal JSON-RPC 2.0 transport plus typed wrappers for the two contracts
//! the voting flow reads.

use core::time::Duration;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::abi;
use crate::calldata::selector;
use crate::error::ChainError;
use crate::proposal::{decode_proposal_info_bytes, ProposalInfo};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

// Read selectors are protocol constants: a mismatch against the deployed
// contract is a silent revert, not a decode error.
const SIG_LAST_PROPOSAL_ID: &str = "lastProposalId()";
const SIG_GET_PROPOSAL_INFO: &str = "getProposalInfo(uint256)";
const SIG_GET_PROPOSAL_EVENT_ID: &str = "getProposalEventId(uint256)";
const SIG_GET_ROOT: &str = "getRoot()";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

pub struct EthRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl EthRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        EthRpcClient {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("rpc {} -> {}", method, self.url);
        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .timeout(RPC_TIMEOUT)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response.result.ok_or(ChainError::MissingResult)
    }

    async fn request_hex(&self, method: &str, params: Value) -> Result<Vec<u8>, ChainError> {
        let result = self.request(method, params).await?;
        let text = result
            .as_str()
            .ok_or(ChainError::BadResponse("result is not a hex string"))?;
        abi::decode_hex(text).ok_or(ChainError::BadResponse("result is not valid hex"))
    }

    async fn request_quantity(&self, method: &str, params: Value) -> Result<u64, ChainError> {
        let result = self.request(method, params).await?;
        let text = result
            .as_str()
            .ok_or(ChainError::BadResponse("result is not a quantity"))?;
        let body = text.strip_prefix("0x").unwrap_or(text);
        u64::from_str_radix(body, 16)
            .map_err(|_| ChainError::BadResponse("quantity is not valid hex"))
    }

    /// `eth_call` against the latest block; returns the raw return bytes.
    pub async fn call(&self, to: &str, data: &str) -> Result<Vec<u8>, ChainError> {
        self.request_hex("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    /// `eth_sendRawTransaction`; returns the transaction hash.
    pub async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, ChainError> {
        let result = self.request("eth_sendRawTransaction", json!([raw_hex])).await?;
        result
            .as_str()
            .map(str::to_owned)
            .ok_or(ChainError::BadResponse("transaction hash is not a string"))
    }

    pub async fn transaction_count(&self, address: &str) -> Result<u64, ChainError> {
        self.request_quantity("eth_getTransactionCount", json!([address, "latest"]))
            .await
    }

    pub async fn gas_price(&self) -> Result<u64, ChainError> {
        self.request_quantity("eth_gasPrice", json!([])).await
    }
}

fn call_data(signature: &str, args: &[[u8; abi::WORD]]) -> String {
    let mut buf = selector(signature).to_vec();
    for arg in args {
        buf.extend_from_slice(arg);
    }
    format!("0x{}", hex::encode(buf))
}

pub struct VotingContract<'a> {
    client: &'a EthRpcClient,
    pub address: String,
}

impl<'a> VotingContract<'a> {
    pub fn new(client: &'a EthRpcClient, address: impl Into<String>) -> Self {
        VotingContract {
            client,
            address: address.into(),
        }
    }

    pub async fn last_proposal_id(&self) -> Result<u64, ChainError> {
        let data = self
            .client
            .call(&self.address, &call_data(SIG_LAST_PROPOSAL_ID, &[]))
            .await?;
        abi::uint(&data, 0).ok_or(ChainError::BadResponse("lastProposalId returned no word"))
    }

    pub async fn proposal_info(&self, id: u64) -> Result<ProposalInfo, ChainError> {
        let data = self
            .client
            .call(
                &self.address,
                &call_data(SIG_GET_PROPOSAL_INFO, &[abi::word_from_u64(id)]),
            )
            .await?;
        let mut info = decode_proposal_info_bytes(&data);
        info.id = id;
        info.voting_contract_address = self.address.clone();
        Ok(info)
    }

    pub async fn proposal_event_id(&self, id: u64) -> Result<[u8; abi::WORD], ChainError> {
        let data = self
            .client
            .call(
                &self.address,
                &call_data(SIG_GET_PROPOSAL_EVENT_ID, &[abi::word_from_u64(id)]),
            )
            .await?;
        abi::word(&data, 0).ok_or(ChainError::BadResponse("event id returned no word"))
    }
}

pub struct RegistrationContract<'a> {
    client: &'a EthRpcClient,
    pub address: String,
}

impl<'a> RegistrationContract<'a> {
    pub fn new(client: &'a EthRpcClient, address: impl Into<String>) -> Self {
        RegistrationContract {
            client,
            address: address.into(),
        }
    }

    pub async fn get_root(&self) -> Result<[u8; abi::WORD], ChainError> {
        let data = self
            .client
            .call(&self.address, &call_data(SIG_GET_ROOT, &[]))
            .await?;
        abi::word(&data, 0).ok_or(ChainError::BadResponse("getRoot returned no word"))
    }
}

const FETCH_ATTEMPTS: u32 = 3;

/// Enumerates proposals `1..=lastProposalId`. A failing id is retried with
/// bounded backoff and then skipped; a failure of the enumeration call
/// itself surfaces to the caller, who owns retry policy.
pub async fn fetch_all_proposals(voting: &VotingContract<'_>) -> Result<Vec<ProposalInfo>, ChainError> {
    let last = voting.last_proposal_id().await?;
    let mut proposals = Vec::with_capacity(last.min(1024) as usize);
    for id in 1..=last {
        match fetch_with_retry(voting, id).await {
            Ok(info) => proposals.push(info),
            Err(err) => warn!("skipping proposal {id}: {err}"),
        }
    }
    Ok(proposals)
}

async fn fetch_with_retry(
    voting: &VotingContract<'_>,
    id: u64,
) -> Result<ProposalInfo, ChainError> {
    let mut attempt = 1;
    loop {
        match voting.proposal_info(id).await {
            Ok(info) => return Ok(info),
            Err(err) if attempt < FETCH_ATTEMPTS => {
                warn!("proposal {id} fetch attempt {attempt} failed: {err}");
                tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
