//! Resumable, confirmation-aware Open event listener for one chain.
//!
//! The listener only ever looks at blocks at least `confirmation_blocks`
//! behind the head. Confirmed blocks past the checkpoint are processed in
//! chunks of at most `max_block_range`, strictly in increasing order, and the
//! checkpoint is committed after each chunk. Events that fail to decode and
//! orders the handler rejects are logged and skipped; they do not hold the
//! checkpoint back.

use crate::{DiscoveryError, EventSource, OrderHandler};
use alloy::primitives::B256;
use solver_order::{codec_for, OpenEventCodec};
use solver_storage::CheckpointStore;
use solver_types::{ChainFamily, DiscoveredOrder, EventFilter, RawEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

/// Static parameters of one chain's listener.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
	/// Configured chain name, also the checkpoint key.
	pub chain: String,
	pub family: ChainFamily,
	/// Settler contract emitting Open events, zero-extended to 32 bytes.
	pub settler: B256,
	pub confirmation_blocks: u64,
	pub max_block_range: u64,
	pub poll_interval: Duration,
	/// First block to scan when no checkpoint is stored.
	pub start_block: Option<u64>,
}

/// What happened to the events of one block range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeSummary {
	/// Events returned by the source.
	pub events: usize,
	/// Orders accepted by the handler.
	pub orders: usize,
	/// Events discarded for a foreign selector, a decode failure or a
	/// handler error.
	pub skipped: usize,
}

pub struct ChainListener {
	settings: ListenerSettings,
	source: Box<dyn EventSource>,
	codec: Box<dyn OpenEventCodec>,
	checkpoints: Arc<dyn CheckpointStore>,
	handler: Arc<dyn OrderHandler>,
	/// First block not yet processed. `None` until initialised.
	next_block: Option<u64>,
}

impl ChainListener {
	pub fn new(
		settings: ListenerSettings,
		source: Box<dyn EventSource>,
		checkpoints: Arc<dyn CheckpointStore>,
		handler: Arc<dyn OrderHandler>,
	) -> Self {
		let codec = codec_for(settings.family);
		Self {
			settings,
			source,
			codec,
			checkpoints,
			handler,
			next_block: None,
		}
	}

	pub fn chain(&self) -> &str {
		&self.settings.chain
	}

	/// Last fully processed block, once initialised.
	pub fn checkpoint(&self) -> Option<u64> {
		self.next_block.and_then(|next| next.checked_sub(1))
	}

	/// Highest block treated as safe from reorgs.
	pub async fn safe_head(&self) -> Result<u64, DiscoveryError> {
		let head = self.source.block_number().await?;
		Ok(head.saturating_sub(self.settings.confirmation_blocks))
	}

	/// Resolves the starting point: the stored checkpoint, else the block
	/// before `start_block`, else the current safe head.
	pub async fn initialize(&mut self) -> Result<u64, DiscoveryError> {
		if let Some(next) = self.next_block {
			return Ok(next);
		}

		let stored = self
			.checkpoints
			.get(&self.settings.chain)
			.await
			.map_err(|e| DiscoveryError::Checkpoint(e.to_string()))?;

		let next = match (stored, self.settings.start_block) {
			(Some(checkpoint), _) => checkpoint.saturating_add(1),
			(None, Some(start)) => start,
			(None, None) => self.safe_head().await?.saturating_add(1),
		};

		info!(
			chain = %self.settings.chain,
			stored_checkpoint = ?stored,
			next_block = next,
			"Listener initialised"
		);
		self.next_block = Some(next);
		Ok(next)
	}

	/// Processes every confirmed block past the checkpoint, one chunk at a
	/// time. Returns `Ok(false)` if a stop signal arrived between chunks.
	pub async fn catch_up(
		&mut self,
		shutdown: &mut broadcast::Receiver<()>,
	) -> Result<bool, DiscoveryError> {
		let mut from_block = self.initialize().await?;
		let safe_head = self.safe_head().await?;
		let span = self.settings.max_block_range.max(1) - 1;

		while from_block <= safe_head {
			if stop_requested(shutdown) {
				return Ok(false);
			}

			let to_block = from_block.saturating_add(span).min(safe_head);
			let summary = self
				.process_range(from_block, to_block)
				.await
				.inspect_err(|e| {
					warn!(
						chain = %self.settings.chain,
						from_block,
						to_block,
						error = %e,
						"Range processing failed, will retry"
					)
				})?;

			debug!(
				chain = %self.settings.chain,
				from_block,
				to_block,
				events = summary.events,
				orders = summary.orders,
				skipped = summary.skipped,
				"Processed range"
			);

			self.commit(to_block).await;
			from_block = to_block + 1;
		}

		Ok(true)
	}

	/// Fetches, decodes and hands off every Open event in the inclusive range,
	/// following the source's pagination until it runs out.
	pub async fn process_range(
		&self,
		from_block: u64,
		to_block: u64,
	) -> Result<RangeSummary, DiscoveryError> {
		let filter = EventFilter {
			from_block,
			to_block,
			address: self.settings.settler,
			selector: self.codec.selector(),
		};

		let mut summary = RangeSummary::default();
		let mut cursor = None;

		loop {
			let page = self.source.events(&filter, cursor.take()).await?;
			for event in &page.events {
				self.handle_event(event, to_block, &mut summary).await;
			}

			match page.next_cursor() {
				Some(next) => cursor = Some(next.to_string()),
				None => break,
			}
		}

		Ok(summary)
	}

	async fn handle_event(&self, event: &RawEvent, to_block: u64, summary: &mut RangeSummary) {
		summary.events += 1;
		let chain = &self.settings.chain;
		let block_number = event.block_number.unwrap_or(to_block);

		if event.keys.first() != Some(&self.codec.selector()) {
			debug!(chain = %chain, block_number, "Discarding event with foreign selector");
			summary.skipped += 1;
			return;
		}

		let order = match self.codec.decode(event) {
			Ok(order) => order,
			Err(e) => {
				warn!(
					chain = %chain,
					block_number,
					error = %e,
					"Skipping undecodable Open event"
				);
				summary.skipped += 1;
				return;
			}
		};

		let order_id = order.order_id;
		info!(
			chain = %chain,
			order_id = %order_id,
			block_number,
			instructions = order.fill_instructions.len(),
			"Discovered order"
		);

		let discovered = DiscoveredOrder {
			order,
			origin_chain: chain.clone(),
			origin_family: self.settings.family,
			block_number,
		};

		match self.handler.handle(discovered).await {
			Ok(()) => summary.orders += 1,
			Err(e) => {
				error!(
					chain = %chain,
					order_id = %order_id,
					block_number,
					error = %e,
					"Order handler failed, skipping order"
				);
				summary.skipped += 1;
			}
		}
	}

	/// Advances past `height`. A persist failure is logged; the in-memory
	/// position still moves so the range is not reprocessed this run.
	async fn commit(&mut self, height: u64) {
		self.next_block = Some(height.saturating_add(1));

		if let Err(e) = self.checkpoints.set(&self.settings.chain, height).await {
			warn!(
				chain = %self.settings.chain,
				height,
				error = %e,
				"Failed to persist checkpoint"
			);
		}
	}

	/// Backfills, then polls every `poll_interval` until `shutdown` fires.
	/// Provider errors are logged and retried on the next tick.
	pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
		info!(
			chain = %self.settings.chain,
			family = %self.settings.family,
			"Starting listener"
		);
		let mut backfilled = false;

		loop {
			if stop_requested(&mut shutdown) {
				break;
			}

			match self.catch_up(&mut shutdown).await {
				Ok(true) => {
					if !backfilled {
						backfilled = true;
						info!(
							chain = %self.settings.chain,
							checkpoint = ?self.checkpoint(),
							"Backfill complete, polling"
						);
					}
				}
				Ok(false) => break,
				Err(e) => warn!(
					chain = %self.settings.chain,
					error = %e,
					"Listener tick failed"
				),
			}

			tokio::select! {
				_ = tokio::time::sleep(self.settings.poll_interval) => {}
				_ = shutdown.recv() => break,
			}
		}

		info!(
			chain = %self.settings.chain,
			checkpoint = ?self.checkpoint(),
			"Listener stopped"
		);
	}
}

/// A closed or lagged channel counts as a stop request.
fn stop_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
	!matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
