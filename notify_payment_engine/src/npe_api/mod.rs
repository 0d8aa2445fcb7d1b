//! # Notify payment engine public API
//!
//! * [`deal_flow_api`] is the primary API. It creates deals, ingests notifications, and carries out manual and
//!   timed-out transitions, publishing an event for every deal that reaches a terminal state.
//! * [`registry_api`] manages the devices that forward notifications and the accounts that receive payments.
//!
//! Both APIs are cheap to clone and can be shared between HTTP workers:
//!
//! ```rust,ignore
//! let registry = Registry::new();
//! let deals = DealFlowApi::new(registry.clone(), producers, DealPolicy::default());
//! let devices = RegistryApi::new(registry);
//! let deal = deals.create_deal(NewDeal::new("1 500")).await?;
//! let result = deals.ingest(NotificationTuple::new("ru.bank", "Зачисление", "Поступление 1 500 ₽")).await;
//! assert_eq!(result.matched.map(|d| d.id), Some(deal.id));
//! ```
pub mod deal_flow_api;
pub mod deal_objects;
pub mod registry_api;
