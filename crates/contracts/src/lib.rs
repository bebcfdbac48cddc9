//! Bindings for the exchange contracts and the tokens it settles.

pub mod alloy;
