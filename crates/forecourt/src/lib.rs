//! Fuel-station review platform: users rate stations, every fifth
//! attributable visit earns a loyalty coupon, and administrators moderate
//! stations and broadcast alerts.
//!
//! The crate exposes per-feature axum routers over a pluggable storage
//! port; the `forecourt-api` service wires them to a concrete store.

pub mod alerts;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod reviews;
pub mod stations;
pub mod storage;
pub mod telemetry;

pub(crate) mod respond;

#[cfg(test)]
pub(crate) mod testutil;
