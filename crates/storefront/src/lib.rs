//! Copperleaf Storefront library.
//!
//! This crate provides the checkout and payment orchestration service as a
//! library, allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod routes;
pub mod services;
pub mod state;
