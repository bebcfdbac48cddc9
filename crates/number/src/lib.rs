//! Conversions between human readable token amounts and on-chain base units.

pub mod units;

pub use units::{EthUnit, to_base_units};
