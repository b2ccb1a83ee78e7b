//! Crowdfunding pledge payment backend.
//!
//! Implements the two halves of the Postfinance hosted-payment integration:
//! the signed outbound checkout request ([`checkout`]) and the verified,
//! idempotent inbound payment notification ([`ipn`]).  Everything around
//! them (project pages, pledge creation, backer accounts) lives elsewhere;
//! this crate only reads pledges and writes their payment state.

pub mod api;
pub mod checkout;
pub mod config;
pub mod db;
pub mod errors;
pub mod ipn;
pub mod models;
pub mod order;
pub mod signature;
pub mod urls;
