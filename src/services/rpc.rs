//! Remote Read Invoker - `tokenURI(uint256)` over JSON-RPC with failover
//!
//! ## Failover
//!
//! Endpoints are independently operated mirrors of the same chain state. A
//! call walks the list from index 0, one attempt per endpoint, and returns
//! the first successful result. A failed attempt is logged and followed by a
//! fixed backoff before the next endpoint is tried.
//!
//! ## Wire format
//!
//! `JsonRpcReader` issues a plain `eth_call` whose data is the `tokenURI`
//! selector followed by the ABI-encoded token id, and decodes the returned
//! ABI `string`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::time::Duration;
use tracing::{debug, warn};

/// `bytes4(keccak256("tokenURI(uint256)"))`
pub const TOKEN_URI_SELECTOR: [u8; 4] = [0xc8, 0x7b, 0x56, 0xdd];

/// Failures of a single remote read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid token id: {0}")]
    InvalidAssetId(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Every endpoint was tried and none answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("All {attempts} RPC endpoint(s) failed")]
pub struct Exhausted {
    pub attempts: usize,
}

/// Capability to call the read-only `tokenURI` function on a contract
///
/// The implementation owns all protocol-level encoding.
#[async_trait]
pub trait RemoteReader: Send + Sync {
    /// Call `tokenURI(asset_id)` on `contract` through `endpoint`
    async fn token_uri(
        &self,
        endpoint: &str,
        contract: &str,
        asset_id: &str,
    ) -> Result<String, ReadError>;
}

/// Try each endpoint once, in order, stopping on the first success
pub async fn invoke_with_failover(
    reader: &dyn RemoteReader,
    endpoints: &[String],
    contract: &str,
    asset_id: &str,
    backoff: Duration,
) -> Result<String, Exhausted> {
    let contract = match checksum_address(contract) {
        Some(checksummed) => checksummed,
        None => {
            warn!(
                contract = %contract,
                "Contract is not a 20-byte hex address, forwarding verbatim"
            );
            contract.to_string()
        }
    };

    if let Err(e) = encode_uint256(asset_id) {
        warn!(
            asset_id = %asset_id,
            endpoints = endpoints.len(),
            error = %e,
            "Token id is not a decimal or 0x-hex uint256, every endpoint will reject it"
        );
    }

    let total = endpoints.len();
    for (index, endpoint) in endpoints.iter().enumerate() {
        let attempt = index + 1;
        match reader.token_uri(endpoint, &contract, asset_id).await {
            Ok(uri) => {
                debug!(attempt, endpoint = %endpoint, "Token URI read succeeded");
                return Ok(uri);
            }
            Err(e) => {
                warn!(
                    attempt,
                    total,
                    endpoint = %endpoint,
                    error = %e,
                    "Token URI read failed"
                );
                if attempt < total {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    Err(Exhausted { attempts: total })
}

/// EIP-55 mixed-case checksum of a `0x`-prefixed 20-byte hex address
///
/// Returns `None` when the input is not 40 hex digits.
pub fn checksum_address(address: &str) -> Option<String> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))?;
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let lower = hex_part.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Parse a decimal or `0x`-hex token id into a big-endian 256-bit word
pub fn encode_uint256(value: &str) -> Result<[u8; 32], ReadError> {
    let invalid = || ReadError::InvalidAssetId(value.to_string());
    let mut word = [0u8; 32];

    if let Some(hex_digits) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        let trimmed = hex_digits.trim_start_matches('0');
        if hex_digits.is_empty() || trimmed.len() > 64 {
            return Err(invalid());
        }
        let padded = format!("{:0>64}", trimmed);
        hex::decode_to_slice(&padded, &mut word).map_err(|_| invalid())?;
        return Ok(word);
    }

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    for digit in value.bytes().map(|b| b - b'0') {
        // word = word * 10 + digit
        let mut carry = digit as u16;
        for byte in word.iter_mut().rev() {
            let product = (*byte as u16) * 10 + carry;
            *byte = (product & 0xff) as u8;
            carry = product >> 8;
        }
        if carry != 0 {
            return Err(invalid());
        }
    }
    Ok(word)
}

/// Call data for `tokenURI(asset_id)`
pub fn token_uri_call_data(asset_id: &str) -> Result<String, ReadError> {
    let word = encode_uint256(asset_id)?;
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&TOKEN_URI_SELECTOR);
    data.extend_from_slice(&word);
    Ok(format!("0x{}", hex::encode(data)))
}

/// Decode an ABI-encoded single `string` return value
pub fn decode_abi_string(result: &str) -> Result<String, ReadError> {
    let hex_part = result.strip_prefix("0x").unwrap_or(result);
    let bytes = hex::decode(hex_part)
        .map_err(|e| ReadError::Malformed(format!("Invalid hex in result: {}", e)))?;

    if bytes.is_empty() {
        return Err(ReadError::Malformed(
            "Empty result (contract reverted or does not exist)".to_string(),
        ));
    }

    let offset = read_word_as_usize(&bytes, 0)?;
    let length = read_word_as_usize(&bytes, offset)?;
    let start = offset
        .checked_add(32)
        .ok_or_else(|| ReadError::Malformed("String offset overflow".to_string()))?;
    let end = start
        .checked_add(length)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| ReadError::Malformed("String length exceeds payload".to_string()))?;

    String::from_utf8(bytes[start..end].to_vec())
        .map_err(|e| ReadError::Malformed(format!("Token URI is not UTF-8: {}", e)))
}

fn read_word_as_usize(bytes: &[u8], at: usize) -> Result<usize, ReadError> {
    let word = at
        .checked_add(32)
        .and_then(|end| bytes.get(at..end))
        .ok_or_else(|| ReadError::Malformed(format!("Result too short for word at {}", at)))?;

    // Anything above 8 bytes cannot be a sane offset or length
    if word[..24].iter().any(|b| *b != 0) {
        return Err(ReadError::Malformed(format!("Word at {} out of range", at)));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(buf))
        .map_err(|_| ReadError::Malformed(format!("Word at {} out of range", at)))
}

// ============================================================================
// JSON-RPC implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (CallObject<'a>, &'static str),
}

#[derive(Debug, Serialize)]
struct CallObject<'a> {
    to: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// `RemoteReader` backed by Ethereum-style JSON-RPC endpoints
pub struct JsonRpcReader {
    http_client: reqwest::Client,
}

impl JsonRpcReader {
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ul-resolver/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { http_client }
    }
}

#[async_trait]
impl RemoteReader for JsonRpcReader {
    async fn token_uri(
        &self,
        endpoint: &str,
        contract: &str,
        asset_id: &str,
    ) -> Result<String, ReadError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_call",
            params: (
                CallObject {
                    to: contract,
                    data: token_uri_call_data(asset_id)?,
                },
                "latest",
            ),
        };

        let response = self
            .http_client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReadError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReadError::Status(response.status().as_u16()));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ReadError::Malformed(e.to_string()))?;

        if let Some(err) = body.error {
            return Err(ReadError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = body
            .result
            .ok_or_else(|| ReadError::Malformed("Response has neither result nor error".into()))?;
        decode_abi_string(&result)
    }
}
