//! HTTP client for the Starknet account relayer.
//!
//! The relayer owns the solver's Starknet account. It accepts a single
//! contract call, signs and submits it, and answers with the transaction hash.

use crate::DeliveryError;
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use solver_chains::{felt_from_hex, felt_to_hex};

/// One invoke call as posted to `{relayer_url}/transactions`.
#[derive(Debug, Clone, Serialize)]
pub struct RelayerCall {
	pub contract_address: String,
	pub entry_point_selector: String,
	pub calldata: Vec<String>,
}

impl RelayerCall {
	pub fn new(contract: B256, selector: B256, calldata: &[B256]) -> Self {
		Self {
			contract_address: felt_to_hex(contract),
			entry_point_selector: felt_to_hex(selector),
			calldata: calldata.iter().copied().map(felt_to_hex).collect(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
	transaction_hash: String,
}

pub struct RelayerClient {
	client: reqwest::Client,
	base_url: String,
}

impl RelayerClient {
	pub fn new(base_url: &str) -> Self {
		Self {
			client: reqwest::Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
		}
	}

	/// Submits `call` and returns the transaction hash.
	pub async fn submit(&self, call: &RelayerCall) -> Result<B256, DeliveryError> {
		let url = format!("{}/transactions", self.base_url);
		let response = self
			.client
			.post(&url)
			.json(call)
			.send()
			.await
			.map_err(|e| DeliveryError::Submission(format!("relayer unreachable: {}", e)))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(DeliveryError::Submission(format!(
				"relayer answered {}: {}",
				status, body
			)));
		}

		let submitted: SubmitResponse = response
			.json()
			.await
			.map_err(|e| DeliveryError::Submission(format!("relayer response: {}", e)))?;

		felt_from_hex(&submitted.transaction_hash)
			.map_err(|e| DeliveryError::Submission(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn sample_call() -> RelayerCall {
		RelayerCall::new(
			B256::with_last_byte(0x12),
			B256::with_last_byte(0x34),
			&[B256::with_last_byte(1)],
		)
	}

	#[test]
	fn test_call_body_uses_minimal_felts() {
		let call = RelayerCall::new(
			B256::with_last_byte(0x12),
			B256::with_last_byte(0x34),
			&[B256::ZERO, B256::with_last_byte(1)],
		);

		let body = serde_json::to_value(&call).unwrap();
		assert_eq!(
			body,
			serde_json::json!({
				"contract_address": "0x12",
				"entry_point_selector": "0x34",
				"calldata": ["0x0", "0x1"]
			})
		);
	}

	#[test]
	fn test_base_url_trailing_slash() {
		let client = RelayerClient::new("http://localhost:8080/");
		assert_eq!(client.base_url, "http://localhost:8080");
	}

	#[tokio::test]
	async fn test_submit_posts_call_and_returns_hash() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/transactions"))
			.and(body_json(json!({
				"contract_address": "0x12",
				"entry_point_selector": "0x34",
				"calldata": ["0x1"]
			})))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "transaction_hash": "0xabc" })),
			)
			.expect(1)
			.mount(&server)
			.await;

		let client = RelayerClient::new(&format!("{}/", server.uri()));
		let tx_hash = client.submit(&sample_call()).await.unwrap();

		assert_eq!(tx_hash[30], 0x0a);
		assert_eq!(tx_hash[31], 0xbc);
		assert!(tx_hash[..30].iter().all(|b| *b == 0));
	}

	#[tokio::test]
	async fn test_rejected_submission_reports_status_and_body() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/transactions"))
			.respond_with(ResponseTemplate::new(500).set_body_string("nonce too low"))
			.mount(&server)
			.await;

		let client = RelayerClient::new(&server.uri());
		match client.submit(&sample_call()).await {
			Err(DeliveryError::Submission(message)) => {
				assert!(message.contains("500"));
				assert!(message.contains("nonce too low"));
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_malformed_hash_is_submission_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/transactions"))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "transaction_hash": "abc" })),
			)
			.mount(&server)
			.await;

		let client = RelayerClient::new(&server.uri());
		assert!(matches!(
			client.submit(&sample_call()).await,
			Err(DeliveryError::Submission(_))
		));
	}
}
