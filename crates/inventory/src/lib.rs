//! Inventory domain module.
//!
//! A SKU is the stock of one product at one warehouse location. This crate
//! holds its quantity rules as deterministic domain logic (no IO, no storage).

pub mod sku;

pub use sku::Sku;
