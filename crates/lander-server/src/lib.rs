//! `Lander` HTTP server.
//!
//! Wires together the core renderer, a page store and the HTTP routes into a
//! running Axum server. Serves published landing pages at `/{slug}` and
//! accepts their form submissions at `/{slug}/submit`.

pub mod config;
pub mod cookies;
pub mod error;
pub mod routes;
pub mod state;
pub mod views;
