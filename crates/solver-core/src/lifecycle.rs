// solver-core/src/lifecycle.rs

use crate::error::CoreError;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
	Uninitialized,
	Initializing,
	Running,
	Stopping,
	Stopped,
	Failed,
}

impl std::fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Uninitialized => "uninitialized",
			Self::Initializing => "initializing",
			Self::Running => "running",
			Self::Stopping => "stopping",
			Self::Stopped => "stopped",
			Self::Failed => "failed",
		};
		f.write_str(name)
	}
}

/// Engine state machine plus the shutdown broadcast every listener task
/// subscribes to.
pub struct LifecycleManager {
	state: RwLock<LifecycleState>,
	shutdown_tx: broadcast::Sender<()>,
}

impl LifecycleManager {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);

		Self {
			state: RwLock::new(LifecycleState::Uninitialized),
			shutdown_tx,
		}
	}

	pub async fn state(&self) -> LifecycleState {
		*self.state.read().await
	}

	async fn transition(&self, to: LifecycleState) -> Result<(), CoreError> {
		let mut state = self.state.write().await;
		set_state(&mut state, to)
	}

	pub async fn initialize(&self) -> Result<(), CoreError> {
		self.transition(LifecycleState::Initializing).await
	}

	/// Enters `Running`. A shutdown that arrived while initialising wins: the
	/// stop signal is sent again so receivers subscribed since then see it.
	pub async fn start(&self) -> Result<(), CoreError> {
		let mut state = self.state.write().await;
		if *state == LifecycleState::Stopping {
			info!("Shutdown requested during startup");
			let _ = self.shutdown_tx.send(());
			return Ok(());
		}
		set_state(&mut state, LifecycleState::Running)
	}

	pub async fn fail(&self) -> Result<(), CoreError> {
		self.transition(LifecycleState::Failed).await
	}

	/// Signals every subscriber to stop. Tasks are awaited by the owner.
	pub async fn shutdown(&self) -> Result<(), CoreError> {
		self.transition(LifecycleState::Stopping).await?;
		// No receivers just means nothing is running.
		let _ = self.shutdown_tx.send(());
		Ok(())
	}

	/// Marks the end of a run once all tasks have returned. Tasks that ended
	/// without a shutdown request pass through `Stopping` first.
	pub async fn stopped(&self) -> Result<(), CoreError> {
		let mut state = self.state.write().await;
		if *state == LifecycleState::Running {
			warn!("All tasks exited without a shutdown request");
			set_state(&mut state, LifecycleState::Stopping)?;
		}
		set_state(&mut state, LifecycleState::Stopped)
	}

	pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
		self.shutdown_tx.subscribe()
	}
}

impl Default for LifecycleManager {
	fn default() -> Self {
		Self::new()
	}
}

fn set_state(state: &mut LifecycleState, to: LifecycleState) -> Result<(), CoreError> {
	let from = *state;
	if !is_valid_transition(from, to) {
		return Err(CoreError::Lifecycle(format!(
			"cannot go from {} to {}",
			from, to
		)));
	}

	*state = to;
	info!(from = %from, to = %to, "Solver lifecycle changed");
	Ok(())
}

fn is_valid_transition(from: LifecycleState, to: LifecycleState) -> bool {
	use LifecycleState::*;

	match (from, to) {
		(Uninitialized, Initializing) => true,
		(Initializing, Running) => true,
		(Initializing, Stopping) => true,
		(Running, Stopping) => true,
		(Stopping, Stopped) => true,
		(Stopped, _) | (Failed, _) => false,
		(_, Failed) => true,
		_ => false,
	}
}
