//! # viaprox API
//!
//! Thin actix-web layer over [`SearchOrchestrator`](viaprox_search::SearchOrchestrator).

pub mod rest;

pub use rest::RestApi;
