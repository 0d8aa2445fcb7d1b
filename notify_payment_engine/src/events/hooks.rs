use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{DealConfirmedEvent, DealRejectedEvent, EventHandler, EventProducer, Handler};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub deal_confirmed_producer: Vec<EventProducer<DealConfirmedEvent>>,
    pub deal_rejected_producer: Vec<EventProducer<DealRejectedEvent>>,
}

impl EventProducers {
    pub async fn publish_deal_confirmed(&self, event: DealConfirmedEvent) {
        for producer in &self.deal_confirmed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_deal_rejected(&self, event: DealRejectedEvent) {
        for producer in &self.deal_rejected_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_deal_confirmed: Option<EventHandler<DealConfirmedEvent>>,
    pub on_deal_rejected: Option<EventHandler<DealRejectedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_deal_confirmed = hooks.on_deal_confirmed.map(|f| EventHandler::new(buffer_size, f));
        let on_deal_rejected = hooks.on_deal_rejected.map(|f| EventHandler::new(buffer_size, f));
        Self { on_deal_confirmed, on_deal_rejected }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_deal_confirmed {
            result.deal_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_deal_rejected {
            result.deal_rejected_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns one task per registered hook. The tasks exit once every producer has been dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_deal_confirmed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_deal_rejected {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_deal_confirmed: Option<Handler<DealConfirmedEvent>>,
    pub on_deal_rejected: Option<Handler<DealRejectedEvent>>,
}

impl EventHooks {
    pub fn on_deal_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DealConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_deal_confirmed = Some(Arc::new(f));
        self
    }

    pub fn on_deal_rejected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DealRejectedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_deal_rejected = Some(Arc::new(f));
        self
    }
}
