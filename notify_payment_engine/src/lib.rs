//! Notify Payment Engine
//!
//! The engine correlates expected payments ("deals") with the bank notifications that forwarding devices capture, and
//! decides each deal's outcome exactly once.
//!
//! The library is divided into these sections:
//! 1. State ([`mod@db`]). Deals live in an in-memory [`DealStore`]; devices and accounts live in a separate
//!    [`Registry`]. The data types themselves are defined in [`db_types`] and are public.
//! 2. The public API ([`DealFlowApi`] and [`RegistryApi`]). Clients should only ever go through these.
//! 3. [`helpers`] holds the amount extractor that pulls a payment amount out of free-form notification text.
//! 4. The [`AutoRejectScheduler`], which rejects deals that are not paid in time.
//!
//! The engine also emits events when a deal is confirmed or rejected. Subscribe to them with [`events::EventHooks`].
mod db;
mod npe_api;
mod scheduler;

pub mod db_types;
pub mod errors;
pub mod events;
pub mod helpers;

pub use db::{DealStore, Registry};
pub use errors::DealEngineError;
pub use npe_api::{
    deal_flow_api::DealFlowApi,
    deal_objects::{DealPolicy, IngestResult, DEFAULT_AUTO_REJECT_TIMEOUT, DEFAULT_INSTRUCTION_TEMPLATE},
    registry_api::RegistryApi,
};
pub use scheduler::AutoRejectScheduler;
