//! ToyRent payment gateway client
//!
//! HTTP client for a Snap-style hosted checkout gateway:
//!
//! - `POST {snap}/snap/v1/transactions` opens a checkout and returns a token
//!   plus redirect URL
//! - `GET {api}/v2/{order_id}/status` reports the authoritative status used
//!   to reconcile callbacks
//!
//! Both calls authenticate with HTTP basic auth, server key as user and an
//! empty password.

pub mod client;
pub mod types;

pub use client::{GatewayError, SnapGatewayClient};
