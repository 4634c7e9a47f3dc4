//! Core orchestration for the OIF solver.
//!
//! The [`SolverEngine`] runs one chain listener per configured origin chain
//! and routes every decoded order to the shared [`FillDispatcher`].

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod lifecycle;

pub use dispatcher::{
	AdapterFactory, ConfigAdapterFactory, FillDispatcher, FillOutcome, InstructionOutcome,
	NoopSettlement, SettlementHook,
};
pub use engine::{create_storage, reset_checkpoint, SolverEngine};
pub use error::{CoreError, DispatchError};
pub use lifecycle::{LifecycleManager, LifecycleState};
