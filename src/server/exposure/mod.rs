//! API exposures
//!
//! Each exposure consumes the shared [`AppState`](super::state::AppState)
//! and produces a Router for its protocol. Only REST exists today.

pub mod rest;

pub use rest::RestExposure;
