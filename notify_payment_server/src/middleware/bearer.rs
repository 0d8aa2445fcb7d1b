//! Bearer token middleware for Actix Web.
//!
//! Requests must carry an `Authorization: Bearer <token>` header that matches the configured secret. Requests without a
//! valid token are answered with `401 Unauthorized` before the wrapped service, and therefore any body extractor, runs.
//!
//! The check can be disabled, in which case every request is passed through.
use std::future::{ready, Ready};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use npg_common::Secret;

use crate::{
    config::ServerOptions,
    errors::{AuthError, ServerError},
    helpers::{bearer_token, get_remote_ip},
};

#[derive(Clone)]
pub struct BearerAuthFactory {
    realm: &'static str,
    token: Secret<String>,
    // If false, then the middleware will not check the token and always allow the call
    enabled: bool,
    options: ServerOptions,
}

impl BearerAuthFactory {
    pub fn new(realm: &'static str, token: Secret<String>, enabled: bool) -> Self {
        Self { realm, token, enabled, options: ServerOptions::default() }
    }

    /// A check that is active only if a token is configured.
    pub fn optional(realm: &'static str, token: Option<Secret<String>>) -> Self {
        let enabled = token.is_some();
        Self::new(realm, token.unwrap_or_default(), enabled)
    }

    /// Controls how the client address is resolved for log messages about rejected requests.
    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuthFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = BearerAuthService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthService {
            realm: self.realm,
            token: self.token.clone(),
            enabled: self.enabled,
            options: self.options,
            service,
        }))
    }
}

pub struct BearerAuthService<S> {
    realm: &'static str,
    token: Secret<String>,
    enabled: bool,
    options: ServerOptions,
    service: S,
}

impl<S> BearerAuthService<S> {
    fn authorize(&self, req: &ServiceRequest) -> Result<(), AuthError> {
        if !self.enabled {
            trace!("🔐️ {} token checks are disabled. Allowing request.", self.realm);
            return Ok(());
        }
        match bearer_token(req.headers()) {
            Some(token) if self.token.matches(token) => {
                trace!("🔐️ {} token check for request ✅️", self.realm);
                Ok(())
            },
            Some(_) => Err(AuthError::InvalidToken),
            None => Err(AuthError::MissingToken),
        }
    }
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Err(e) = self.authorize(&req) {
            let remote = get_remote_ip(req.request(), self.options.use_x_forwarded_for, self.options.use_forwarded)
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "unknown".into());
            warn!("🔐️ Denying {} request to {} from {remote}. {e}", self.realm, req.path());
            let res = req.error_response(ServerError::AuthenticationError(e)).map_into_right_body();
            return Box::pin(ready(Ok(res)));
        }
        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
