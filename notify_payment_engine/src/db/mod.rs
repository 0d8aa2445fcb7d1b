//! # In-memory storage
//!
//! Deals, devices and accounts live in process memory only. Nothing survives a restart.
//!
//! * [`DealStore`] owns every deal record and is the only component allowed to change a deal's status. All status
//!   changes go through its transition methods, which serialize on a single write lock.
//! * [`Registry`] owns devices and accounts. It is read by the match engine on every notification and written by the
//!   registration endpoints. Its locks are independent of the deal store's.
mod deal_store;
mod registry;

pub use deal_store::DealStore;
pub use registry::Registry;
