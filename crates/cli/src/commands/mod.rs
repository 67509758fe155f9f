//! Command handlers

pub mod admin;
pub mod ledger;
pub mod node;
pub mod simulate;
