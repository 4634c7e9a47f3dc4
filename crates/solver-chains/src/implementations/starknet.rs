//! Minimal Starknet JSON-RPC client.

use crate::ChainError;
use alloy::primitives::{B256, U256};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// JSON-RPC error code for an unknown transaction hash.
const TXN_HASH_NOT_FOUND: i64 = 29;

/// Renders a felt as minimal `0x` hex, the form Starknet nodes expect.
pub fn felt_to_hex(felt: B256) -> String {
	format!("{:#x}", U256::from_be_bytes(felt.0))
}

/// Parses a `0x` hex felt into a zero-extended 32-byte word.
pub fn felt_from_hex(value: &str) -> Result<B256, ChainError> {
	let digits = value
		.strip_prefix("0x")
		.or_else(|| value.strip_prefix("0X"))
		.ok_or_else(|| ChainError::InvalidResponse(format!("felt '{}' lacks 0x", value)))?;

	let parsed = U256::from_str_radix(digits, 16)
		.map_err(|e| ChainError::InvalidResponse(format!("felt '{}': {}", value, e)))?;
	Ok(B256::from(parsed.to_be_bytes::<32>()))
}

/// An event as returned by `starknet_getEvents`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmittedEvent {
	pub keys: Vec<String>,
	pub data: Vec<String>,
	/// Absent for events in the pending block.
	#[serde(default)]
	pub block_number: Option<u64>,
}

/// One page of `starknet_getEvents` results.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsChunk {
	pub events: Vec<EmittedEvent>,
	#[serde(default)]
	pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionReceipt {
	pub transaction_hash: String,
	#[serde(default)]
	pub execution_status: Option<String>,
	#[serde(default)]
	pub finality_status: Option<String>,
	#[serde(default)]
	pub block_number: Option<u64>,
	#[serde(default)]
	pub revert_reason: Option<String>,
}

impl TransactionReceipt {
	/// Whether the transaction is part of an accepted block.
	pub fn is_final(&self) -> bool {
		matches!(
			self.finality_status.as_deref(),
			Some("ACCEPTED_ON_L2") | Some("ACCEPTED_ON_L1")
		)
	}

	pub fn succeeded(&self) -> bool {
		self.execution_status.as_deref() == Some("SUCCEEDED")
	}
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
	result: Option<T>,
	error: Option<RpcErrorObject>,
}

impl<T> RpcResponse<T> {
	fn into_result(self) -> Result<T, ChainError> {
		if let Some(error) = self.error {
			return Err(ChainError::Rpc {
				code: error.code,
				message: error.message,
			});
		}
		self.result
			.ok_or_else(|| ChainError::InvalidResponse("response has no result".to_string()))
	}
}

/// JSON-RPC client for a single Starknet node.
pub struct StarknetRpc {
	client: reqwest::Client,
	url: String,
	request_id: AtomicU64,
}

impl StarknetRpc {
	pub fn new(rpc_url: impl Into<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			url: rpc_url.into(),
			request_id: AtomicU64::new(1),
		}
	}

	async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
		let id = self.request_id.fetch_add(1, Ordering::Relaxed);
		let body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		tracing::trace!(method, id, "Starknet RPC request");

		let response = self
			.client
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|e| ChainError::Transport(format!("{}: {}", method, e)))?;

		let envelope: RpcResponse<T> = response
			.json()
			.await
			.map_err(|e| ChainError::Transport(format!("{}: {}", method, e)))?;

		envelope.into_result()
	}

	/// Height of the latest accepted block.
	pub async fn block_number(&self) -> Result<u64, ChainError> {
		self.request("starknet_blockNumber", json!([])).await
	}

	/// Fetches one page of events emitted by `address` whose first key is
	/// `selector`, in the inclusive block range.
	pub async fn get_events(
		&self,
		address: B256,
		selector: B256,
		from_block: u64,
		to_block: u64,
		chunk_size: u64,
		continuation_token: Option<&str>,
	) -> Result<EventsChunk, ChainError> {
		let mut filter = json!({
			"from_block": { "block_number": from_block },
			"to_block": { "block_number": to_block },
			"address": felt_to_hex(address),
			"keys": [[felt_to_hex(selector)]],
			"chunk_size": chunk_size,
		});
		if let Some(token) = continuation_token {
			filter["continuation_token"] = Value::String(token.to_string());
		}

		self.request("starknet_getEvents", json!({ "filter": filter }))
			.await
	}

	/// Calls a view entry point at the latest block.
	pub async fn call(
		&self,
		contract: B256,
		selector: B256,
		calldata: &[B256],
	) -> Result<Vec<B256>, ChainError> {
		let params = json!({
			"request": {
				"contract_address": felt_to_hex(contract),
				"entry_point_selector": felt_to_hex(selector),
				"calldata": calldata.iter().copied().map(felt_to_hex).collect::<Vec<_>>(),
			},
			"block_id": "latest",
		});

		let result: Vec<String> = self.request("starknet_call", params).await?;
		result.iter().map(|felt| felt_from_hex(felt)).collect()
	}

	/// Returns the receipt for `tx_hash`, or `None` if the node does not know
	/// the transaction yet.
	pub async fn transaction_receipt(
		&self,
		tx_hash: B256,
	) -> Result<Option<TransactionReceipt>, ChainError> {
		let params = json!({ "transaction_hash": felt_to_hex(tx_hash) });
		match self
			.request("starknet_getTransactionReceipt", params)
			.await
		{
			Ok(receipt) => Ok(Some(receipt)),
			Err(ChainError::Rpc { code, .. }) if code == TXN_HASH_NOT_FOUND => Ok(None),
			Err(e) => Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

	fn rpc_result(result: Value) -> Value {
		json!({ "jsonrpc": "2.0", "id": 1, "result": result })
	}

	fn rpc_error(code: i64, message: &str) -> Value {
		json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message } })
	}

	/// Answers every call to `rpc_method` with `body`.
	async fn answer(server: &MockServer, rpc_method: &str, body: Value) {
		Mock::given(method("POST"))
			.and(body_partial_json(json!({ "method": rpc_method })))
			.respond_with(ResponseTemplate::new(200).set_body_json(body))
			.mount(server)
			.await;
	}

	/// Matches `starknet_getEvents` requests that carry no continuation token.
	struct FirstPage;

	impl Match for FirstPage {
		fn matches(&self, request: &Request) -> bool {
			serde_json::from_slice::<Value>(&request.body)
				.map(|body| body["params"]["filter"].get("continuation_token").is_none())
				.unwrap_or(false)
		}
	}

	#[test]
	fn test_felt_hex_is_minimal() {
		assert_eq!(felt_to_hex(B256::ZERO), "0x0");

		let mut word = B256::ZERO;
		word.0[31] = 0x2a;
		word.0[30] = 0x01;
		assert_eq!(felt_to_hex(word), "0x12a");
	}

	#[test]
	fn test_felt_from_hex_zero_extends() {
		let felt = felt_from_hex("0x12a").unwrap();
		assert!(felt[..30].iter().all(|b| *b == 0));
		assert_eq!(felt[30], 0x01);
		assert_eq!(felt[31], 0x2a);

		assert_eq!(felt_from_hex(&felt_to_hex(felt)).unwrap(), felt);
	}

	#[test]
	fn test_felt_from_hex_rejects_garbage() {
		assert!(felt_from_hex("12").is_err());
		assert!(felt_from_hex("0xnothex").is_err());
		assert!(felt_from_hex(&format!("0x1{}", "0".repeat(64))).is_err());
	}

	#[test]
	fn test_events_chunk_parses() {
		let raw = json!({
			"events": [{
				"from_address": "0x123",
				"keys": ["0x35d8ba7", "0x1", "0x0"],
				"data": ["0xabc"],
				"block_hash": "0xfeed",
				"block_number": 42,
				"transaction_hash": "0x99"
			}],
			"continuation_token": "42-1"
		});

		let chunk: EventsChunk = serde_json::from_value(raw).unwrap();
		assert_eq!(chunk.events.len(), 1);
		assert_eq!(chunk.events[0].block_number, Some(42));
		assert_eq!(chunk.events[0].keys.len(), 3);
		assert_eq!(chunk.continuation_token.as_deref(), Some("42-1"));
	}

	#[test]
	fn test_rpc_error_envelope() {
		let raw = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"error": { "code": 29, "message": "Transaction hash not found" }
		});

		let envelope: RpcResponse<u64> = serde_json::from_value(raw).unwrap();
		assert!(matches!(
			envelope.into_result(),
			Err(ChainError::Rpc { code: TXN_HASH_NOT_FOUND, .. })
		));

		let envelope: RpcResponse<u64> =
			serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 2, "result": 7 })).unwrap();
		assert_eq!(envelope.into_result().unwrap(), 7);
	}

	#[test]
	fn test_receipt_status() {
		let receipt: TransactionReceipt = serde_json::from_value(json!({
			"transaction_hash": "0x1",
			"execution_status": "REVERTED",
			"finality_status": "ACCEPTED_ON_L2",
			"block_number": 10,
			"revert_reason": "already filled"
		}))
		.unwrap();

		assert!(receipt.is_final());
		assert!(!receipt.succeeded());
	}

	#[tokio::test]
	async fn test_block_number_over_http() {
		let server = MockServer::start().await;
		answer(&server, "starknet_blockNumber", rpc_result(json!(812))).await;

		let rpc = StarknetRpc::new(server.uri());
		assert_eq!(rpc.block_number().await.unwrap(), 812);
	}

	#[tokio::test]
	async fn test_node_error_keeps_code_and_message() {
		let server = MockServer::start().await;
		answer(&server, "starknet_blockNumber", rpc_error(32, "No blocks")).await;

		let rpc = StarknetRpc::new(server.uri());
		match rpc.block_number().await {
			Err(ChainError::Rpc { code, message }) => {
				assert_eq!(code, 32);
				assert_eq!(message, "No blocks");
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_non_json_body_is_transport_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
			.mount(&server)
			.await;

		let rpc = StarknetRpc::new(server.uri());
		assert!(matches!(
			rpc.block_number().await,
			Err(ChainError::Transport(_))
		));
	}

	#[tokio::test]
	async fn test_unknown_transaction_has_no_receipt() {
		let server = MockServer::start().await;
		answer(
			&server,
			"starknet_getTransactionReceipt",
			rpc_error(TXN_HASH_NOT_FOUND, "Transaction hash not found"),
		)
		.await;

		let rpc = StarknetRpc::new(server.uri());
		assert!(rpc
			.transaction_receipt(B256::with_last_byte(9))
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_other_receipt_errors_propagate() {
		let server = MockServer::start().await;
		answer(
			&server,
			"starknet_getTransactionReceipt",
			rpc_error(-32603, "Internal error"),
		)
		.await;

		let rpc = StarknetRpc::new(server.uri());
		assert!(matches!(
			rpc.transaction_receipt(B256::with_last_byte(9)).await,
			Err(ChainError::Rpc { code: -32603, .. })
		));
	}

	#[tokio::test]
	async fn test_receipt_over_http() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "starknet_getTransactionReceipt",
				"params": { "transaction_hash": "0x9" }
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({
				"transaction_hash": "0x9",
				"execution_status": "SUCCEEDED",
				"finality_status": "ACCEPTED_ON_L2",
				"block_number": 501
			}))))
			.mount(&server)
			.await;

		let rpc = StarknetRpc::new(server.uri());
		let receipt = rpc
			.transaction_receipt(B256::with_last_byte(9))
			.await
			.unwrap()
			.unwrap();
		assert!(receipt.is_final());
		assert!(receipt.succeeded());
		assert_eq!(receipt.block_number, Some(501));
	}

	#[tokio::test]
	async fn test_get_events_follows_continuation_token() {
		let server = MockServer::start().await;
		let filter = json!({
			"address": "0x42",
			"keys": [["0x7"]],
			"from_block": { "block_number": 10 },
			"to_block": { "block_number": 20 },
			"chunk_size": 2
		});

		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "starknet_getEvents",
				"params": { "filter": filter.clone() }
			})))
			.and(FirstPage)
			.respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({
				"events": [
					{ "keys": ["0x7"], "data": ["0x1"], "block_number": 11 },
					{ "keys": ["0x7"], "data": ["0x2"], "block_number": 12 }
				],
				"continuation_token": "12-2"
			}))))
			.expect(1)
			.mount(&server)
			.await;

		let mut second = filter;
		second["continuation_token"] = json!("12-2");
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "starknet_getEvents",
				"params": { "filter": second }
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({
				"events": [{ "keys": ["0x7"], "data": ["0x3"] }]
			}))))
			.expect(1)
			.mount(&server)
			.await;

		let rpc = StarknetRpc::new(server.uri());
		let address = B256::with_last_byte(0x42);
		let selector = B256::with_last_byte(0x7);

		let first = rpc
			.get_events(address, selector, 10, 20, 2, None)
			.await
			.unwrap();
		assert_eq!(first.events.len(), 2);
		assert_eq!(first.events[1].block_number, Some(12));

		let token = first.continuation_token.unwrap();
		let last = rpc
			.get_events(address, selector, 10, 20, 2, Some(&token))
			.await
			.unwrap();
		assert_eq!(last.events.len(), 1);
		assert_eq!(last.events[0].block_number, None);
		assert_eq!(last.continuation_token, None);
	}

	#[tokio::test]
	async fn test_call_returns_felts() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "starknet_call",
				"params": {
					"request": {
						"contract_address": "0x42",
						"entry_point_selector": "0x7",
						"calldata": ["0x5", "0x0"]
					},
					"block_id": "latest"
				}
			})))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(rpc_result(json!(["0x46494c4c4544"]))),
			)
			.mount(&server)
			.await;

		let rpc = StarknetRpc::new(server.uri());
		let result = rpc
			.call(
				B256::with_last_byte(0x42),
				B256::with_last_byte(0x7),
				&[B256::with_last_byte(5), B256::ZERO],
			)
			.await
			.unwrap();

		assert_eq!(result.len(), 1);
		assert_eq!(&result[0][26..], b"FILLED");
	}

	#[tokio::test]
	async fn test_call_rejects_non_felt_result() {
		let server = MockServer::start().await;
		answer(&server, "starknet_call", rpc_result(json!(["FILLED"]))).await;

		let rpc = StarknetRpc::new(server.uri());
		assert!(matches!(
			rpc.call(B256::ZERO, B256::ZERO, &[]).await,
			Err(ChainError::InvalidResponse(_))
		));
	}
}
