//! # Notify payment gateway server
//! This crate hosts the HTTP server for the notify payment gateway. It is responsible for:
//! * Accepting bank notifications from forwarding devices and passing them to the deal matching engine.
//! * Exposing deal, device and account management to the merchant.
//! * Logging every deal that is confirmed or rejected.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/notify`: Notification intake for devices. Requires the notify bearer token.
//! * `/deal`, `/deals`, `/device`, `/devices`, `/account`, `/accounts`: Management routes. These require the admin
//!   bearer token if one is configured.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
