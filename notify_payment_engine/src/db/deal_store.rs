use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use log::*;
use tokio::sync::RwLock;

use crate::{
    db_types::{Deal, DealDraft, DealId, DealStatus, MatchCriteria, MatchSnapshot, RejectReason},
    errors::DealEngineError,
};

/// The authoritative, in-memory set of deals.
///
/// Every read that leads to a decision and every write to a deal's status happens under one write lock, so deal
/// transitions are linearizable: exactly one transition ever moves a deal out of `pending`, and every later attempt
/// observes the terminal state. Deal volumes are small, so a single coarse lock is used rather than sharding.
///
/// `DealStore` is a cheap handle. Clones share the same underlying table.
#[derive(Clone, Default)]
pub struct DealStore {
    table: Arc<RwLock<DealTable>>,
}

#[derive(Default)]
struct DealTable {
    last_id: u64,
    // Ids increase monotonically, so iteration order is creation order.
    deals: BTreeMap<DealId, Deal>,
}

enum Outcome {
    Confirm(Option<MatchSnapshot>),
    Reject(RejectReason),
}

impl DealStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new pending deal, assigning its id and creation time.
    pub async fn insert(&self, draft: DealDraft) -> Deal {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = DealId::new(table.last_id);
        let deal = Deal {
            id,
            payment_instruction: draft.render_instruction(id),
            amount: draft.amount,
            device_id: draft.device_id,
            account_id: draft.account.as_ref().map(|a| a.id),
            account_label: draft.account.map(|a| a.label),
            status: DealStatus::Pending,
            created_at: Utc::now(),
            confirmed_at: None,
            rejected_at: None,
            reject_reason: None,
            match_info: None,
        };
        table.deals.insert(id, deal.clone());
        trace!("🗃️ Deal {id} stored. {} deals in the store", table.deals.len());
        deal
    }

    pub async fn fetch(&self, id: DealId) -> Option<Deal> {
        self.table.read().await.deals.get(&id).cloned()
    }

    /// All deals, oldest first.
    pub async fn fetch_all(&self) -> Vec<Deal> {
        self.table.read().await.deals.values().cloned().collect()
    }

    /// All pending deals, oldest first.
    pub async fn fetch_pending(&self) -> Vec<Deal> {
        self.table.read().await.deals.values().filter(|d| d.is_pending()).cloned().collect()
    }

    /// Operator override: `pending` → `confirmed`, without a match snapshot.
    pub async fn close(&self, id: DealId) -> Result<Deal, DealEngineError> {
        self.transition(id, Outcome::Confirm(None)).await
    }

    /// Operator rejection: `pending` → `rejected` with the given reason.
    pub async fn reject(&self, id: DealId, reason: RejectReason) -> Result<Deal, DealEngineError> {
        self.transition(id, Outcome::Reject(reason)).await
    }

    /// `pending` → `rejected(timeout)`.
    ///
    /// Returns `None` when the deal is no longer pending (or never existed). Losing the race against a match or a
    /// manual transition is expected and is not an error.
    pub async fn reject_by_timeout(&self, id: DealId) -> Option<Deal> {
        match self.transition(id, Outcome::Reject(RejectReason::Timeout)).await {
            Ok(deal) => Some(deal),
            Err(e) => {
                debug!("🗃️ Timeout for deal {id} is a no-op. {e}");
                None
            },
        }
    }

    /// Atomically finds the oldest pending deal satisfying `criteria` and confirms it with the given snapshot.
    ///
    /// The eligibility check and the transition happen in one critical section, so no concurrent ingest, timeout or
    /// manual transition can act on the same deal in between.
    pub async fn find_and_confirm(&self, criteria: &MatchCriteria, snapshot: MatchSnapshot) -> Option<Deal> {
        let mut table = self.table.write().await;
        let deal = table.deals.values_mut().find(|d| criteria.is_satisfied_by(d))?;
        apply(deal, Outcome::Confirm(Some(snapshot)));
        Some(deal.clone())
    }

    async fn transition(&self, id: DealId, outcome: Outcome) -> Result<Deal, DealEngineError> {
        let mut table = self.table.write().await;
        let deal = table.deals.get_mut(&id).ok_or(DealEngineError::DealNotFound(id))?;
        if !deal.is_pending() {
            return Err(DealEngineError::InvalidState { id, status: deal.status });
        }
        apply(deal, outcome);
        Ok(deal.clone())
    }
}

// Callers guarantee that `deal` is pending.
fn apply(deal: &mut Deal, outcome: Outcome) {
    let now = Utc::now();
    match outcome {
        Outcome::Confirm(snapshot) => {
            deal.status = DealStatus::Confirmed;
            deal.confirmed_at = Some(now);
            deal.match_info = snapshot;
        },
        Outcome::Reject(reason) => {
            deal.status = DealStatus::Rejected;
            deal.rejected_at = Some(now);
            deal.reject_reason = Some(reason);
        },
    }
}
