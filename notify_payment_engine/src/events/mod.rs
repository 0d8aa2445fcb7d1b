//! Deal lifecycle events.
//!
//! Subscribers register async hooks via [`EventHooks`]. Each hook gets its own [`EventHandler`] task, and the deal
//! flow publishes to it through [`EventProducers`] after a terminal transition has been committed. Hooks never see a
//! deal that is still pending and cannot influence the transition that triggered them.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
