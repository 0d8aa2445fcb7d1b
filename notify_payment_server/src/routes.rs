//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every engine call is async and never holds a lock across I/O, so
//! handlers must only ever `.await` them.
//!
//! Authentication is not handled here. `/notify` and the management routes are wrapped in
//! [`crate::middleware::BearerAuthFactory`] when the app is assembled in [`crate::server`], which is why only the public
//! routes use the attribute macros.
use std::str::FromStr;

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use notify_payment_engine::{
    db_types::{DealId, NewAccount, NotificationTuple},
    DealFlowApi,
    RegistryApi,
};

use crate::{
    data_objects::{
        CreateDealRequest,
        DeviceRequest,
        NotificationPayload,
        NotifyResponse,
        RejectRequest,
        StatusResponse,
    },
    errors::ServerError,
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

#[get("/")]
pub async fn status(api: web::Data<DealFlowApi>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received status request");
    let all_deals = api.fetch_deals().await;
    Ok(HttpResponse::Ok().json(StatusResponse { ok: true, deals: all_deals }))
}

//----------------------------------------------   Notify  ----------------------------------------------------
/// Route handler for notifications forwarded by devices. Registered at `POST /notify` behind the notify token.
///
/// The response reports whether the notification confirmed a deal. Not matching is not an error.
pub async fn notify(
    body: web::Json<NotificationPayload>,
    api: web::Data<DealFlowApi>,
) -> Result<HttpResponse, ServerError> {
    let tuple = NotificationTuple::from(body.into_inner());
    trace!("💻️ Received notification from {} (device: {:?})", tuple.source_package, tuple.device_id);
    let result = api.ingest(tuple).await;
    Ok(HttpResponse::Ok().json(NotifyResponse::from(result)))
}

//----------------------------------------------   Deals  ----------------------------------------------------
pub async fn create_deal(
    body: web::Json<CreateDealRequest>,
    api: web::Data<DealFlowApi>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received new deal request");
    let deal = api.create_deal(body.into_inner().into()).await.map_err(|e| {
        debug!("💻️ Could not create deal. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(deal))
}

pub async fn deals(api: web::Data<DealFlowApi>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received deals request");
    Ok(HttpResponse::Ok().json(api.fetch_deals().await))
}

pub async fn deal_by_id(path: web::Path<String>, api: web::Data<DealFlowApi>) -> Result<HttpResponse, ServerError> {
    let id = parse_deal_id(&path)?;
    trace!("💻️ Received request for deal {id}");
    let deal = api.fetch_deal(id).await?;
    Ok(HttpResponse::Ok().json(deal))
}

pub async fn close_deal(path: web::Path<String>, api: web::Data<DealFlowApi>) -> Result<HttpResponse, ServerError> {
    let id = parse_deal_id(&path)?;
    trace!("💻️ Received close request for deal {id}");
    let deal = api.close_deal(id).await.map_err(|e| {
        debug!("💻️ Could not close deal {id}. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(deal))
}

/// The body is optional. An empty body rejects the deal without a reason, but a body that is present must be a valid
/// [`RejectRequest`].
pub async fn reject_deal(
    path: web::Path<String>,
    body: web::Bytes,
    api: web::Data<DealFlowApi>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_deal_id(&path)?;
    let reason = parse_reject_request(&body)?.and_then(|r| r.reason);
    trace!("💻️ Received reject request for deal {id}");
    let deal = api.reject_deal(id, reason).await.map_err(|e| {
        debug!("💻️ Could not reject deal {id}. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(deal))
}

fn parse_reject_request(body: &[u8]) -> Result<Option<RejectRequest>, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| {
        debug!("💻️ Could not deserialize reject request. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })
}

// Deal ids are numeric, so anything else cannot name an existing deal
fn parse_deal_id(raw: &str) -> Result<DealId, ServerError> {
    DealId::from_str(raw).map_err(|_| ServerError::NoRecordFound(format!("Deal {raw} does not exist")))
}

//----------------------------------------------   Devices  ----------------------------------------------------
pub async fn register_device(
    body: web::Json<DeviceRequest>,
    api: web::Data<RegistryApi>,
) -> Result<HttpResponse, ServerError> {
    let DeviceRequest { id, label, account_id } = body.into_inner();
    trace!("💻️ Received registration request for device {id}");
    let device = api.register_device(&id, label, account_id).await?;
    Ok(HttpResponse::Ok().json(device))
}

pub async fn activate_device(path: web::Path<String>, api: web::Data<RegistryApi>) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ Received activation request for device {id}");
    let device = api.activate_device(&id).await?;
    Ok(HttpResponse::Ok().json(device))
}

pub async fn devices(api: web::Data<RegistryApi>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received devices request");
    Ok(HttpResponse::Ok().json(api.devices().await))
}

//----------------------------------------------   Accounts  ----------------------------------------------------
pub async fn create_account(
    body: web::Json<NewAccount>,
    api: web::Data<RegistryApi>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received new account request");
    let account = api.create_account(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(account))
}

pub async fn accounts(api: web::Data<RegistryApi>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received accounts request");
    Ok(HttpResponse::Ok().json(api.accounts().await))
}
