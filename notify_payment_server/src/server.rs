use std::time::Duration;

use actix_web::{
    dev::Server,
    error::{JsonPayloadError, PathError},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use futures::FutureExt;
use log::*;
use notify_payment_engine::{
    events::{DealConfirmedEvent, DealRejectedEvent, EventHandlers, EventHooks, EventProducers},
    DealFlowApi,
    Registry,
    RegistryApi,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::BearerAuthFactory,
    routes::{
        accounts,
        activate_device,
        close_deal,
        create_account,
        create_deal,
        deal_by_id,
        deals,
        devices,
        health,
        notify,
        register_device,
        reject_deal,
        status,
    },
};

const EVENT_BUFFER_SIZE: usize = 64;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let srv = create_server_instance(config, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, producers: EventProducers) -> Result<Server, ServerError> {
    let registry = Registry::new();
    let deal_api = DealFlowApi::new(registry.clone(), producers, config.deal_policy());
    let registry_api = RegistryApi::new(registry);
    info!(
        "🪛️ Deals are rejected after {}s without payment. Account required: {}",
        config.deal_timeout.as_secs(),
        config.require_account
    );
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("npg::access_log"))
            .app_data(web::Data::new(deal_api.clone()))
            .app_data(web::Data::new(registry_api.clone()))
            .configure(|cfg| configure_routes(cfg, &config))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(bind_addr)?
    .run();
    Ok(srv)
}

/// Registers every route, with the bearer checks the configuration asks for.
///
/// `/health` and `/` are public. `/notify` always requires the notify secret. The remaining routes require the admin
/// token if one is configured. Each management route is wrapped on its own, so paths that match no route still fall
/// through to the default 404.
pub fn configure_routes(cfg: &mut web::ServiceConfig, config: &ServerConfig) {
    let options = ServerOptions::from_config(config);
    let admin = BearerAuthFactory::optional("admin", config.admin_token.clone()).with_options(options);
    let managed = |path: &str| web::resource(path).wrap(admin.clone());
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(health)
        .service(status)
        .service(
            web::resource("/notify")
                .wrap(BearerAuthFactory::new("notify", config.notify_secret.clone(), true).with_options(options))
                .route(web::post().to(notify)),
        )
        .service(managed("/deal").route(web::post().to(create_deal)))
        .service(managed("/deals").route(web::get().to(deals)))
        .service(managed("/deal/{id}").route(web::get().to(deal_by_id)))
        .service(managed("/deal/{id}/close").route(web::post().to(close_deal)))
        .service(managed("/deal/{id}/reject").route(web::post().to(reject_deal)))
        .service(managed("/device").route(web::post().to(register_device)))
        .service(managed("/device/{id}/activate").route(web::post().to(activate_device)))
        .service(managed("/devices").route(web::get().to(devices)))
        .service(managed("/account").route(web::post().to(create_account)))
        .service(managed("/accounts").route(web::get().to(accounts)));
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Could not deserialize request body. {err}");
    ServerError::InvalidRequestBody(err.to_string()).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ServerError::InvalidRequestPath(err.to_string()).into()
}

/// Hooks that log every terminal deal transition.
pub fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_deal_confirmed(|ev: DealConfirmedEvent| {
            async move {
                let how = if ev.is_matched() { "by notification" } else { "manually" };
                info!("📬️ Deal {} for {} confirmed {how}", ev.deal.id, ev.deal.amount);
            }
            .boxed()
        })
        .on_deal_rejected(|ev: DealRejectedEvent| {
            async move {
                let reason = ev.deal.reject_reason.as_ref().map(|r| r.to_string()).unwrap_or_default();
                info!("📬️ Deal {} for {} rejected ({reason})", ev.deal.id, ev.deal.amount);
            }
            .boxed()
        });
    hooks
}
