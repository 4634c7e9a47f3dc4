//! Starknet event source over JSON-RPC.

use crate::{DiscoveryError, EventSource};
use async_trait::async_trait;
use solver_chains::{felt_from_hex, EmittedEvent, StarknetRpc};
use solver_types::{EventFilter, EventPage, RawEvent};

/// Page size requested from `starknet_getEvents`.
const EVENTS_CHUNK_SIZE: u64 = 128;

pub struct StarknetEventSource {
	rpc: StarknetRpc,
}

impl StarknetEventSource {
	pub fn new(rpc_url: &str) -> Self {
		Self {
			rpc: StarknetRpc::new(rpc_url),
		}
	}
}

#[async_trait]
impl EventSource for StarknetEventSource {
	async fn block_number(&self) -> Result<u64, DiscoveryError> {
		self.rpc
			.block_number()
			.await
			.map_err(|e| DiscoveryError::Provider(e.to_string()))
	}

	async fn events(
		&self,
		filter: &EventFilter,
		cursor: Option<String>,
	) -> Result<EventPage, DiscoveryError> {
		let chunk = self
			.rpc
			.get_events(
				filter.address,
				filter.selector,
				filter.from_block,
				filter.to_block,
				EVENTS_CHUNK_SIZE,
				cursor.as_deref(),
			)
			.await
			.map_err(|e| DiscoveryError::Provider(e.to_string()))?;

		let events = chunk
			.events
			.iter()
			.map(raw_event)
			.collect::<Result<Vec<_>, _>>()?;

		Ok(EventPage {
			events,
			continuation: chunk.continuation_token,
		})
	}
}

fn raw_event(event: &EmittedEvent) -> Result<RawEvent, DiscoveryError> {
	let felts = |values: &[String]| {
		values
			.iter()
			.map(|v| felt_from_hex(v))
			.collect::<Result<Vec<_>, _>>()
			.map_err(|e| DiscoveryError::Provider(e.to_string()))
	};

	Ok(RawEvent {
		block_number: event.block_number,
		keys: felts(&event.keys)?,
		data: felts(&event.data)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::B256;
	use serde_json::json;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn emitted(keys: &[&str], data: &[&str]) -> EmittedEvent {
		EmittedEvent {
			keys: keys.iter().map(|s| s.to_string()).collect(),
			data: data.iter().map(|s| s.to_string()).collect(),
			block_number: Some(7),
		}
	}

	#[test]
	fn test_felts_become_words() {
		let raw = raw_event(&emitted(&["0x35d8ba7", "0x2"], &["0x0", "0xff"])).unwrap();

		assert_eq!(raw.block_number, Some(7));
		assert_eq!(raw.keys[1], B256::with_last_byte(2));
		assert_eq!(raw.data[0], B256::ZERO);
		assert_eq!(raw.data[1], B256::with_last_byte(0xff));
	}

	#[test]
	fn test_bad_felt_is_provider_error() {
		assert!(matches!(
			raw_event(&emitted(&["oops"], &[])),
			Err(DiscoveryError::Provider(_))
		));
	}

	#[tokio::test]
	async fn test_pages_are_fetched_with_the_node_cursor() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "starknet_getEvents",
				"params": { "filter": { "continuation_token": "30-128" } }
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0",
				"id": 1,
				"result": {
					"events": [{ "keys": ["0x7", "0x2"], "data": ["0x1"], "block_number": 31 }],
					"continuation_token": ""
				}
			})))
			.expect(1)
			.mount(&server)
			.await;

		let source = StarknetEventSource::new(&server.uri());
		let filter = EventFilter {
			from_block: 30,
			to_block: 40,
			address: B256::with_last_byte(0x42),
			selector: B256::with_last_byte(0x7),
		};

		let page = source
			.events(&filter, Some("30-128".to_string()))
			.await
			.unwrap();
		assert_eq!(page.events.len(), 1);
		assert_eq!(page.events[0].block_number, Some(31));
		assert_eq!(page.events[0].keys[1], B256::with_last_byte(2));
		assert_eq!(page.next_cursor(), None);
	}

	#[tokio::test]
	async fn test_node_error_is_provider_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0",
				"id": 1,
				"error": { "code": 24, "message": "Block not found" }
			})))
			.mount(&server)
			.await;

		let source = StarknetEventSource::new(&server.uri());
		assert!(matches!(
			source.block_number().await,
			Err(DiscoveryError::Provider(_))
		));
	}
}
