//! Fill dispatch: turns a discovered order into destination-chain fills.
//!
//! Each fill instruction is handled in order against the adapter for its
//! destination chain. An order the settler already knows is skipped without
//! submitting anything; a failed fill aborts the remaining instructions.

use crate::error::DispatchError;
use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;
use dashmap::DashMap;
use solver_account::AccountService;
use solver_config::SolverConfig;
use solver_delivery::{create_fill_adapter, AdapterSettings, DeliveryError, FillAdapter};
use solver_discovery::{DiscoveryError, OrderHandler};
use solver_order::{order_id_for_destination, type_tag, CodecError, OrderData};
use solver_types::{
	ChainFamily, ChainId, DiscoveredOrder, FillInstruction, FillReceipt, OrderId, UNFILLED_STATUS,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn, Level};

/// Builds the fill adapter for a destination chain.
pub trait AdapterFactory: Send + Sync {
	fn create(&self, chain_id: ChainId) -> Result<Arc<dyn FillAdapter>, DeliveryError>;
}

/// Adapter factory backed by the solver configuration.
pub struct ConfigAdapterFactory {
	chains: HashMap<ChainId, AdapterSettings>,
	account: Option<AccountService>,
}

impl ConfigAdapterFactory {
	pub fn new(config: &SolverConfig, account: Option<AccountService>) -> Self {
		let confirmation_timeout = config.dispatch.confirmation_timeout();
		let chains = config
			.chains
			.iter()
			.map(|(name, chain)| {
				let settings = AdapterSettings {
					chain: name.clone(),
					chain_id: chain.chain_id,
					family: chain.family,
					rpc_url: chain.rpc_url.clone(),
					relayer_url: chain.relayer_url.clone(),
					confirmation_timeout,
				};
				(chain.chain_id, settings)
			})
			.collect();

		Self { chains, account }
	}
}

impl AdapterFactory for ConfigAdapterFactory {
	fn create(&self, chain_id: ChainId) -> Result<Arc<dyn FillAdapter>, DeliveryError> {
		let settings = self.chains.get(&chain_id).ok_or_else(|| {
			DeliveryError::Configuration(format!("no chain configured with id {}", chain_id))
		})?;

		info!(
			chain = %settings.chain,
			chain_id,
			family = %settings.family,
			"Creating fill adapter"
		);
		create_fill_adapter(settings, self.account.as_ref())
	}
}

/// Runs after every instruction of an order was filled or found filled.
#[async_trait]
pub trait SettlementHook: Send + Sync {
	async fn on_filled(&self, order: &DiscoveredOrder, outcomes: &[InstructionOutcome]);
}

/// Settlement hook that only records the order.
pub struct NoopSettlement;

#[async_trait]
impl SettlementHook for NoopSettlement {
	async fn on_filled(&self, order: &DiscoveredOrder, outcomes: &[InstructionOutcome]) {
		debug!(
			order_id = %order.order.order_id,
			instructions = outcomes.len(),
			"No settlement configured"
		);
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionOutcome {
	/// A fill was submitted and succeeded.
	Filled(FillReceipt),
	/// The settler already reported a non-zero status.
	AlreadyFilled { status: B256 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
	/// At least one instruction produced a fill.
	Filled(Vec<InstructionOutcome>),
	/// Every destination already knew the order.
	AlreadyFilled,
}

type AdapterCell = Arc<OnceCell<Arc<dyn FillAdapter>>>;

pub struct FillDispatcher {
	factory: Box<dyn AdapterFactory>,
	/// One cell per destination chain so concurrent first use builds a
	/// single adapter.
	adapters: DashMap<ChainId, AdapterCell>,
	settlement: Arc<dyn SettlementHook>,
}

impl FillDispatcher {
	pub fn new(factory: Box<dyn AdapterFactory>) -> Self {
		Self {
			factory,
			adapters: DashMap::new(),
			settlement: Arc::new(NoopSettlement),
		}
	}

	pub fn with_settlement(mut self, settlement: Arc<dyn SettlementHook>) -> Self {
		self.settlement = settlement;
		self
	}

	/// Returns the cached adapter for `chain_id`, creating it on first use.
	pub async fn adapter(&self, chain_id: ChainId) -> Result<Arc<dyn FillAdapter>, DispatchError> {
		let cell = self
			.adapters
			.entry(chain_id)
			.or_insert_with(|| Arc::new(OnceCell::new()))
			.clone();

		let adapter = cell
			.get_or_try_init(|| async { self.factory.create(chain_id) })
			.await
			.map_err(|source| DispatchError::Adapter { chain_id, source })?;

		Ok(adapter.clone())
	}

	/// Fills every instruction of `discovered` in order.
	pub async fn dispatch(&self, discovered: &DiscoveredOrder) -> Result<FillOutcome, DispatchError> {
		let order = &discovered.order;
		if order.fill_instructions.is_empty() {
			return Err(DispatchError::NoFillInstructions(order.order_id));
		}

		info!(
			order_id = %order.order_id,
			origin = %discovered.origin_chain,
			instructions = order.fill_instructions.len(),
			"Dispatching order"
		);

		let mut outcomes = Vec::with_capacity(order.fill_instructions.len());
		for instruction in &order.fill_instructions {
			outcomes.push(self.fill_instruction(discovered, instruction).await?);
		}

		self.settlement.on_filled(discovered, &outcomes).await;

		let any_filled = outcomes
			.iter()
			.any(|outcome| matches!(outcome, InstructionOutcome::Filled(_)));
		if any_filled {
			Ok(FillOutcome::Filled(outcomes))
		} else {
			Ok(FillOutcome::AlreadyFilled)
		}
	}

	async fn fill_instruction(
		&self,
		discovered: &DiscoveredOrder,
		instruction: &FillInstruction,
	) -> Result<InstructionOutcome, DispatchError> {
		let chain_id = instruction.destination_chain_id;
		let settler = instruction.destination_settler;
		let adapter = self.adapter(chain_id).await?;
		let order_id = order_id_for_destination(
			discovered.order.order_id,
			discovered.origin_family,
			adapter.family(),
		);

		let status = adapter
			.order_status(settler, order_id)
			.await
			.map_err(|source| DispatchError::StatusCheck { chain_id, source })?;
		if status != UNFILLED_STATUS {
			info!(
				order_id = %order_id,
				chain_id,
				status = %status,
				"Order already filled on destination, skipping"
			);
			return Ok(InstructionOutcome::AlreadyFilled { status });
		}

		let origin_data = origin_data_for(adapter.family(), order_id, &instruction.origin_data)
			.map_err(|source| DispatchError::OriginData { chain_id, source })?;

		let receipt = adapter
			.fill(settler, order_id, &origin_data)
			.await
			.map_err(|source| DispatchError::Fill { chain_id, source })?;
		if !receipt.success {
			error!(
				order_id = %order_id,
				chain_id,
				tx_hash = %receipt.tx_hash,
				"Fill transaction failed"
			);
			return Err(DispatchError::Reverted {
				chain_id,
				tx_hash: receipt.tx_hash,
			});
		}

		info!(
			order_id = %order_id,
			chain_id,
			tx_hash = %receipt.tx_hash,
			block = receipt.block_number,
			"Order filled"
		);

		match adapter.order_status(settler, order_id).await {
			Ok(after) if after != UNFILLED_STATUS => {
				debug!(order_id = %order_id, status = %after, "Destination status after fill")
			}
			Ok(_) => warn!(order_id = %order_id, chain_id, "Status still unfilled after fill"),
			Err(e) => warn!(order_id = %order_id, chain_id, error = %e, "Post-fill status check failed"),
		}

		Ok(InstructionOutcome::Filled(receipt))
	}
}

/// Re-encodes an instruction's origin data in the layout the destination
/// settler decodes.
fn origin_data_for(
	destination: ChainFamily,
	order_id: OrderId,
	origin_data: &Bytes,
) -> Result<Bytes, CodecError> {
	let (data, layout) = OrderData::decode_origin_data(origin_data)?;

	if tracing::enabled!(Level::DEBUG) {
		debug!(
			order_id = %order_id,
			layout = ?layout,
			destination = %destination,
			order_data_type = %type_tag(destination),
			sender = %data.sender,
			recipient = %data.recipient,
			input_token = %data.input_token,
			output_token = %data.output_token,
			amount_in = %data.amount_in,
			amount_out = %data.amount_out,
			nonce = %data.sender_nonce,
			origin_domain = data.origin_domain,
			destination_domain = data.destination_domain,
			fill_deadline = data.fill_deadline,
			data_len = data.data.len(),
			"Filling order"
		);
	}

	data.encode_for(destination).map(Bytes::from)
}

#[async_trait]
impl OrderHandler for FillDispatcher {
	async fn handle(&self, order: DiscoveredOrder) -> Result<(), DiscoveryError> {
		self.dispatch(&order)
			.await
			.map(|_| ())
			.map_err(|e| DiscoveryError::Handler(e.to_string()))
	}
}
