//! Contains the models that are shared between the harness components and the
//! settlement system adapters.

pub mod asset_data;
pub mod order;
pub mod signature;
pub mod time;

use {
    alloy::{
        primitives::{Address, B256},
        sol_types::{Eip712Domain, eip712_domain},
    },
    std::fmt,
};

/// The EIP-712 domain name used by the exchange.
pub const DOMAIN_NAME: &str = "0x Protocol";

/// The EIP-712 domain version used by the exchange.
pub const DOMAIN_VERSION: &str = "2";

/// Returns the EIP-712 domain of orders settled by `exchange`.
///
/// The domain intentionally has no chain id, orders are only bound to the
/// exchange contract that verifies them.
pub fn domain(exchange: Address) -> Eip712Domain {
    eip712_domain! {
        name: DOMAIN_NAME,
        version: DOMAIN_VERSION,
        verifying_contract: exchange,
    }
}

#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct DomainSeparator(pub B256);

impl DomainSeparator {
    pub fn new(exchange: Address) -> Self {
        Self(domain(exchange).separator())
    }
}

impl fmt::Debug for DomainSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&const_hex::encode(self.0))
    }
}
