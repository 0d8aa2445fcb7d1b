use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use log::debug;
use notify_payment_engine::{events::EventProducers, DealFlowApi, DealPolicy, Registry, RegistryApi};
use npg_common::Secret;
use serde_json::Value;

use crate::{config::ServerConfig, server::configure_routes};

pub const NOTIFY_SECRET: &str = "notify-secret-for-tests";
pub const ADMIN_TOKEN: &str = "admin-token-for-tests";

/// The engine state behind one test server. Every request built from the same context sees the same deals.
pub struct TestContext {
    pub deals: DealFlowApi,
    pub registry: RegistryApi,
    pub config: ServerConfig,
}

impl TestContext {
    pub fn new(admin_token: bool) -> Self {
        let config = ServerConfig {
            notify_secret: Secret::new(NOTIFY_SECRET.to_string()),
            admin_token: admin_token.then(|| Secret::new(ADMIN_TOKEN.to_string())),
            ..Default::default()
        };
        let registry = Registry::new();
        let deals = DealFlowApi::new(registry.clone(), EventProducers::default(), DealPolicy::default());
        Self { deals, registry: RegistryApi::new(registry), config }
    }

    pub async fn send(&self, req: TestRequest) -> (StatusCode, Value) {
        let config = self.config.clone();
        let app = App::new()
            .app_data(web::Data::new(self.deals.clone()))
            .app_data(web::Data::new(self.registry.clone()))
            .configure(move |cfg| configure_routes(cfg, &config));
        let service = test::init_service(app).await;
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        debug!("Response: {status} {}", String::from_utf8_lossy(&body));
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}
