//! Auto-reject timers.
//!
//! Every pending deal gets one timer task. When the timer fires it asks the [`DealStore`] to reject the deal with
//! reason `timeout`. The store only honours that request while the deal is still pending, so a timer that fires after
//! a match or a manual transition is harmless. Cancelling on the happy path just keeps the timer table small.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::*;
use tokio::task::JoinHandle;

use crate::{
    db::DealStore,
    db_types::DealId,
    events::{DealRejectedEvent, EventProducers},
};

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerTable {
    next_generation: u64,
    timers: HashMap<DealId, Timer>,
}

#[derive(Clone)]
pub struct AutoRejectScheduler {
    store: DealStore,
    producers: EventProducers,
    table: Arc<Mutex<TimerTable>>,
}

impl AutoRejectScheduler {
    pub fn new(store: DealStore, producers: EventProducers) -> Self {
        Self { store, producers, table: Arc::new(Mutex::new(TimerTable::default())) }
    }

    /// Starts the timer for `id`. Arming a deal that already has a timer replaces the old one.
    pub fn arm(&self, id: DealId, timeout: Duration) {
        let mut table = self.lock();
        table.next_generation += 1;
        let generation = table.next_generation;
        let store = self.store.clone();
        let producers = self.producers.clone();
        let timers = Arc::clone(&self.table);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let rejected = store.reject_by_timeout(id).await;
            {
                let mut table = timers.lock().unwrap_or_else(PoisonError::into_inner);
                if table.timers.get(&id).is_some_and(|t| t.generation == generation) {
                    table.timers.remove(&id);
                }
            }
            if let Some(deal) = rejected {
                info!("⏲️ Deal {id} was not paid within {}s and has been rejected", timeout.as_secs());
                producers.publish_deal_rejected(DealRejectedEvent::new(deal)).await;
            }
        });
        if let Some(old) = table.timers.insert(id, Timer { generation, handle }) {
            debug!("⏲️ Replacing the existing timer for deal {id}");
            old.handle.abort();
        }
        trace!("⏲️ Timer armed for deal {id}. {} timers active", table.timers.len());
    }

    /// Stops the timer for `id`. Returns false if no timer was armed.
    pub fn cancel(&self, id: DealId) -> bool {
        match self.lock().timers.remove(&id) {
            Some(timer) => {
                timer.handle.abort();
                trace!("⏲️ Timer for deal {id} cancelled");
                true
            },
            None => false,
        }
    }

    pub fn is_armed(&self, id: DealId) -> bool {
        self.lock().timers.contains_key(&id)
    }

    pub fn armed_count(&self) -> usize {
        self.lock().timers.len()
    }

    fn lock(&self) -> MutexGuard<'_, TimerTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
