use {
    alloy::primitives::{
        U256,
        utils::{ParseUnits, Unit, parse_units},
    },
    anyhow::{Context, Result, bail, ensure},
};

pub trait EthUnit: std::marker::Sized {
    /// Returns the current wei amount.
    fn wei(self) -> U256;

    /// Returns the current Gwei amount as wei (i.e. 1e9 wei).
    fn gwei(self) -> U256 {
        self.wei() * Unit::GWEI.wei()
    }

    /// Returns the current Eth amount as wei (i.e. 1e18 wei).
    fn eth(self) -> U256 {
        self.wei() * Unit::ETHER.wei()
    }
}

impl EthUnit for u64 {
    fn wei(self) -> U256 {
        U256::from(self)
    }
}

impl EthUnit for u128 {
    fn wei(self) -> U256 {
        U256::from(self)
    }
}

impl EthUnit for f64 {
    fn wei(self) -> U256 {
        match parse_units(&self.to_string(), "wei").unwrap() {
            ParseUnits::U256(val) => val,
            _ => panic!("could not parse number as u256: {self}"),
        }
    }

    fn gwei(self) -> U256 {
        match parse_units(&self.to_string(), "gwei").unwrap() {
            ParseUnits::U256(val) => val,
            _ => panic!("could not parse number as u256: {self}"),
        }
    }

    fn eth(self) -> U256 {
        match parse_units(&self.to_string(), "ether").unwrap() {
            ParseUnits::U256(val) => val,
            _ => panic!("could not parse number as u256: {self}"),
        }
    }
}

/// Converts a decimal amount like `"0.1"` into the base units of a token with
/// `decimals` decimals.
///
/// Negative amounts and amounts that are more precise than the token are
/// rejected instead of being rounded.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    ensure!(!amount.is_empty(), "empty amount");
    ensure!(
        !amount.starts_with('-'),
        "amount {amount:?} must not be negative"
    );
    if let Some((_, fraction)) = amount.split_once('.') {
        ensure!(
            fraction.len() <= usize::from(decimals),
            "amount {amount:?} has more than {decimals} decimals"
        );
    }

    match parse_units(amount, decimals)
        .with_context(|| format!("invalid amount {amount:?}"))?
    {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(value) => bail!("amount {value} must not be negative"),
    }
}
