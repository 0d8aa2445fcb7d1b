use std::fmt::Debug;

use chrono::Utc;
use log::*;
use npg_common::parse_optional_string;

use crate::{
    db::{DealStore, Registry},
    db_types::{
        Deal,
        DealDraft,
        DealId,
        DeviceUpdate,
        MatchCriteria,
        MatchSnapshot,
        NewDeal,
        NotificationTuple,
        RejectReason,
    },
    errors::DealEngineError,
    events::{DealConfirmedEvent, DealRejectedEvent, EventProducers},
    helpers::{extract_amount, normalize_amount},
    npe_api::deal_objects::{DealPolicy, IngestResult},
    scheduler::AutoRejectScheduler,
};

/// `DealFlowApi` is the primary API for the deal lifecycle: creating deals, matching them against incoming bank
/// notifications, and the manual and timed-out transitions.
///
/// Deals move from `pending` to either `confirmed` or `rejected`, and never change again after that. The
/// [`DealStore`] guarantees that exactly one transition wins for each deal, so the timer, the match engine and
/// operators can race freely.
#[derive(Clone)]
pub struct DealFlowApi {
    store: DealStore,
    registry: Registry,
    scheduler: AutoRejectScheduler,
    producers: EventProducers,
    policy: DealPolicy,
}

impl Debug for DealFlowApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DealFlowApi")
    }
}

impl DealFlowApi {
    pub fn new(registry: Registry, producers: EventProducers, policy: DealPolicy) -> Self {
        let store = DealStore::new();
        let scheduler = AutoRejectScheduler::new(store.clone(), producers.clone());
        Self { store, registry, scheduler, producers, policy }
    }

    pub fn policy(&self) -> &DealPolicy {
        &self.policy
    }

    pub fn scheduler(&self) -> &AutoRejectScheduler {
        &self.scheduler
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Creates a pending deal and arms its auto-reject timer.
    ///
    /// The amount is normalized before it is stored. An `InvalidInput` error is returned if the amount is blank, if
    /// the account does not exist, or if the policy requires an account and none was given.
    pub async fn create_deal(&self, deal: NewDeal) -> Result<Deal, DealEngineError> {
        let amount = normalize_amount(&deal.amount)
            .ok_or_else(|| DealEngineError::InvalidInput("The deal amount must not be empty".to_string()))?;
        let account = match deal.account_id {
            Some(id) => Some(
                self.registry
                    .fetch_account(id)
                    .await
                    .ok_or_else(|| DealEngineError::InvalidInput(format!("Account {id} does not exist")))?,
            ),
            None if self.policy.require_account => {
                return Err(DealEngineError::InvalidInput("Deals must be linked to an account".to_string()));
            },
            None => None,
        };
        let draft = DealDraft {
            amount,
            device_id: parse_optional_string(deal.device_id),
            account,
            instruction_template: self.policy.instruction_template.clone(),
        };
        let deal = self.store.insert(draft).await;
        self.arm_timer(deal.id).await;
        info!(
            "🔄️ Deal {} for {} created (device: {}, account: {})",
            deal.id,
            deal.amount,
            deal.device_id.as_deref().unwrap_or("any"),
            deal.account_label.as_deref().unwrap_or("any")
        );
        Ok(deal)
    }

    // The deal is visible to ingests as soon as it is inserted, so it can reach a terminal state before the timer
    // exists. Any transition after the check below sees the timer and cancels it itself.
    async fn arm_timer(&self, id: DealId) {
        self.scheduler.arm(id, self.policy.auto_reject_timeout);
        if !self.store.fetch(id).await.is_some_and(|d| d.is_pending()) {
            trace!("🔄️ Deal {id} left pending before its timer was armed");
            self.scheduler.cancel(id);
        }
    }

    pub async fn fetch_deal(&self, id: DealId) -> Result<Deal, DealEngineError> {
        self.store.fetch(id).await.ok_or(DealEngineError::DealNotFound(id))
    }

    /// All deals in creation order.
    pub async fn fetch_deals(&self) -> Vec<Deal> {
        self.store.fetch_all().await
    }

    pub async fn fetch_pending_deals(&self) -> Vec<Deal> {
        self.store.fetch_pending().await
    }

    /// Operator override: confirms a pending deal without a matching notification.
    pub async fn close_deal(&self, id: DealId) -> Result<Deal, DealEngineError> {
        let deal = self.store.close(id).await?;
        self.scheduler.cancel(id);
        info!("🔄️ Deal {id} closed manually");
        self.producers.publish_deal_confirmed(DealConfirmedEvent::new(deal.clone())).await;
        Ok(deal)
    }

    /// Operator rejection of a pending deal. A blank reason is treated as no reason.
    pub async fn reject_deal(&self, id: DealId, reason: Option<String>) -> Result<Deal, DealEngineError> {
        let reason = RejectReason::Manual(parse_optional_string(reason));
        let deal = self.store.reject(id, reason).await?;
        self.scheduler.cancel(id);
        if let Some(reason) = &deal.reject_reason {
            info!("🔄️ Deal {id} rejected ({reason})");
        }
        self.producers.publish_deal_rejected(DealRejectedEvent::new(deal.clone())).await;
        Ok(deal)
    }

    /// Correlates one bank notification with the oldest eligible pending deal.
    ///
    /// 1. The amount comes from the tuple if the device already extracted one, and from the notification text
    ///    otherwise. Without an amount there is nothing to match.
    /// 2. If the notification names a device, the device record is refreshed, whether or not a deal matches. A device
    ///    that is linked to an account declares that account's label when the notification carries none.
    /// 3. The oldest pending deal with the same amount whose device and account constraints are absent or satisfied is
    ///    confirmed in a single critical section.
    /// 4. The deal's timer is cancelled and a `DealConfirmed` event is published.
    ///
    /// Not matching is a normal outcome, so this never fails.
    pub async fn ingest(&self, mut tuple: NotificationTuple) -> IngestResult {
        let received_at = Utc::now();
        tuple.device_id = parse_optional_string(tuple.device_id.take());
        tuple.account_label = parse_optional_string(tuple.account_label.take());
        let amount = tuple.amount.as_deref().and_then(normalize_amount).or_else(|| extract_amount(&tuple.text));

        if let Some(device_id) = tuple.device_id.clone() {
            let update = DeviceUpdate::from_notification(device_id, tuple.account_label.clone());
            match self.registry.upsert_device(update).await {
                Ok(device) if tuple.account_label.is_none() => tuple.account_label = device.account_label,
                Ok(_) => {},
                Err(e) => warn!("🔄️ Could not refresh the device record for a notification. {e}"),
            }
        }

        let Some(criteria) =
            amount.as_deref().and_then(|a| MatchCriteria::new(a, tuple.device_id.clone(), tuple.account_label.clone()))
        else {
            debug!("🔄️ No amount found in notification from {}", tuple.source_package);
            return IngestResult { amount: None, matched: None };
        };

        let snapshot = MatchSnapshot::from_tuple(&tuple, received_at);
        let matched = self.store.find_and_confirm(&criteria, snapshot).await;
        match &matched {
            Some(deal) => {
                self.scheduler.cancel(deal.id);
                info!("🔄️ Notification for {} from {} confirmed deal {}", criteria.amount, tuple.source_package, deal.id);
                self.producers.publish_deal_confirmed(DealConfirmedEvent::new(deal.clone())).await;
            },
            None => debug!("🔄️ No pending deal matches {} from {}", criteria.amount, tuple.source_package),
        }
        IngestResult { amount: Some(criteria.amount), matched }
    }
}
