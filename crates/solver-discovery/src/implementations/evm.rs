//! EVM event source backed by an alloy provider.

use crate::{DiscoveryError, EventSource};
use alloy::primitives::B256;
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::{Filter, Log};
use async_trait::async_trait;
use solver_order::address_from_word;
use solver_types::{EventFilter, EventPage, RawEvent};

/// Reads blocks and logs over `eth_blockNumber` / `eth_getLogs`.
///
/// `eth_getLogs` answers a whole range at once, so pages never carry a
/// continuation.
pub struct EvmEventSource {
	provider: DynProvider,
}

impl EvmEventSource {
	pub fn new(rpc_url: &str) -> Result<Self, DiscoveryError> {
		let provider = solver_chains::read_provider(rpc_url)
			.map_err(|e| DiscoveryError::Connection(e.to_string()))?;
		Ok(Self { provider })
	}
}

#[async_trait]
impl EventSource for EvmEventSource {
	async fn block_number(&self) -> Result<u64, DiscoveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DiscoveryError::Provider(format!("Failed to get block number: {}", e)))
	}

	async fn events(
		&self,
		filter: &EventFilter,
		_cursor: Option<String>,
	) -> Result<EventPage, DiscoveryError> {
		let query = Filter::new()
			.address(address_from_word(filter.address))
			.event_signature(filter.selector)
			.from_block(filter.from_block)
			.to_block(filter.to_block);

		let logs = self
			.provider
			.get_logs(&query)
			.await
			.map_err(|e| DiscoveryError::Provider(format!("Failed to get logs: {}", e)))?;

		Ok(EventPage {
			events: logs.iter().map(raw_event).collect(),
			continuation: None,
		})
	}
}

fn raw_event(log: &Log) -> RawEvent {
	RawEvent {
		block_number: log.block_number,
		keys: log.topics().to_vec(),
		data: data_words(&log.data().data),
	}
}

/// Splits log data into 32-byte words, zero-filling a trailing partial word.
fn data_words(data: &[u8]) -> Vec<B256> {
	data.chunks(32)
		.map(|chunk| {
			let mut word = B256::ZERO;
			word.0[..chunk.len()].copy_from_slice(chunk);
			word
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{address, Bytes, LogData};

	#[test]
	fn test_data_words() {
		let data: Vec<u8> = (0u8..70).collect();
		let words = data_words(&data);

		assert_eq!(words.len(), 3);
		assert_eq!(words[1].0[0], 32);
		assert_eq!(words[2].0[5], 69);
		assert!(words[2].0[6..].iter().all(|b| *b == 0));
		assert!(data_words(&[]).is_empty());
	}

	#[test]
	fn test_raw_event_from_log() {
		let topic = B256::repeat_byte(0x11);
		let log = Log {
			inner: alloy::primitives::Log {
				address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
				data: LogData::new_unchecked(vec![topic], Bytes::from(vec![0xaa; 64])),
			},
			block_number: Some(12),
			..Default::default()
		};

		let raw = raw_event(&log);
		assert_eq!(raw.block_number, Some(12));
		assert_eq!(raw.keys, vec![topic]);
		assert_eq!(raw.data, vec![B256::repeat_byte(0xaa); 2]);
	}
}
