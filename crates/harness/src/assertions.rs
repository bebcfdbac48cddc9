use {
    crate::{error::Error, fixture::Fixture, traits::SettlementSystem},
    alloy::primitives::{Address, U256},
    anyhow::{Context as _, Result},
    model::{
        asset_data::AssetData,
        order::{FillResults, OrderData},
    },
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Balances {
    pub maker: U256,
    pub taker: U256,
}

impl Balances {
    async fn read(
        system: &dyn SettlementSystem,
        asset: AssetData,
        maker: Address,
        taker: Address,
    ) -> Result<Self> {
        Ok(Self {
            maker: system
                .balance(asset, maker)
                .await
                .with_context(|| format!("failed to read maker balance of {asset}"))?,
            taker: system
                .balance(asset, taker)
                .await
                .with_context(|| format!("failed to read taker balance of {asset}"))?,
        })
    }
}

/// Balances of both parties in both traded assets at one point in time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Snapshot {
    pub collectible: Balances,
    pub payment: Balances,
}

impl Snapshot {
    pub async fn take(system: &dyn SettlementSystem, fixture: &Fixture) -> Result<Self> {
        let Fixture { parties, .. } = fixture;
        Ok(Self {
            collectible: Balances::read(system, fixture.collectible, parties.maker, parties.taker)
                .await?,
            payment: Balances::read(system, fixture.payment, parties.maker, parties.taker).await?,
        })
    }
}

/// The maker holds the collectible and the taker holds none.
pub fn expect_preconditions(snapshot: &Snapshot) -> Result<(), Error> {
    expect_eq("maker collectible balance", snapshot.collectible.maker, U256::from(1))?;
    expect_eq("taker collectible balance", snapshot.collectible.taker, U256::ZERO)
}

/// Amounts that are expected to change hands in a settlement, taken from
/// the signed order and the requested fill rather than from what the
/// settlement system reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Expected {
    pub sold: U256,
    pub paid: U256,
}

impl Expected {
    /// A complete fill of `order`.
    pub fn full_fill(order: &OrderData) -> Self {
        Self {
            sold: order.maker_asset_amount,
            paid: order.taker_asset_amount,
        }
    }
}

/// The settlement system reports having filled exactly the expected amounts.
pub fn expect_fill(fill: &FillResults, expected: &Expected) -> Result<(), Error> {
    expect_eq(
        "reported maker asset filled amount",
        fill.maker_asset_filled_amount,
        expected.sold,
    )?;
    expect_eq(
        "reported taker asset filled amount",
        fill.taker_asset_filled_amount,
        expected.paid,
    )
}

/// The sold collectibles moved from maker to taker and the paid amount
/// moved from taker to maker.
pub fn expect_transfer(before: &Snapshot, after: &Snapshot, expected: &Expected) -> Result<(), Error> {
    let Expected { sold, paid } = *expected;
    expect_eq(
        "maker collectible balance",
        after.collectible.maker,
        decrease(before.collectible.maker, sold, "maker collectible balance")?,
    )?;
    expect_eq(
        "taker collectible balance",
        after.collectible.taker,
        before.collectible.taker.saturating_add(sold),
    )?;
    expect_eq(
        "taker payment balance",
        after.payment.taker,
        decrease(before.payment.taker, paid, "taker payment balance")?,
    )?;
    expect_eq(
        "maker payment balance",
        after.payment.maker,
        before.payment.maker.saturating_add(paid),
    )
}

fn decrease(balance: U256, amount: U256, what: &str) -> Result<U256, Error> {
    balance.checked_sub(amount).ok_or_else(|| {
        Error::Assertion(format!("{what} {balance} is lower than the traded amount {amount}"))
    })
}

fn expect_eq(what: &str, actual: U256, expected: U256) -> Result<(), Error> {
    if actual != expected {
        return Err(Error::Assertion(format!(
            "{what} is {actual}, expected {expected}"
        )));
    }
    Ok(())
}
