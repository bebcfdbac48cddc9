use {
    crate::{fixture::Fixture, traits::SettlementSystem},
    alloy::primitives::{Address, U256},
    anyhow::{Context as _, Result},
    model::order::{OrderBuilder, OrderData},
    std::time::Duration,
};

/// How long an order stays fillable unless configured otherwise.
pub const DEFAULT_EXPIRATION_WINDOW: Duration = Duration::from_secs(600);

/// Trade terms of the order the maker offers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderParams {
    pub maker_asset_amount: U256,
    pub taker_asset_amount: U256,
    pub expiration_window: Duration,
    pub maker_fee: U256,
    pub taker_fee: U256,
    /// The only account allowed to fill the order. Zero leaves it open.
    pub taker: Address,
}

impl OrderParams {
    /// One collectible for `taker_asset_amount` of the payment asset, without
    /// fees.
    pub fn new(taker_asset_amount: U256) -> Self {
        Self {
            maker_asset_amount: U256::from(1),
            taker_asset_amount,
            expiration_window: DEFAULT_EXPIRATION_WINDOW,
            maker_fee: U256::ZERO,
            taker_fee: U256::ZERO,
            taker: Address::ZERO,
        }
    }

    pub fn with_taker(mut self, taker: Address) -> Self {
        self.taker = taker;
        self
    }

    pub fn with_expiration_window(mut self, window: Duration) -> Self {
        self.expiration_window = window;
        self
    }
}

/// Builds an order selling the fixture's collectible for its payment asset.
/// The order is open to any sender and, unless `params` names one, to any
/// taker. It expires `expiration_window` after the settlement system's
/// current time and carries a random salt.
pub async fn build_order(
    system: &dyn SettlementSystem,
    fixture: &Fixture,
    params: &OrderParams,
) -> Result<OrderData> {
    let now = system
        .timestamp()
        .await
        .context("failed to read current time")?;
    let order = OrderBuilder::default()
        .with_exchange(system.deployment().exchange)
        .with_maker(fixture.parties.maker)
        .with_taker(params.taker)
        .with_maker_asset(fixture.collectible, params.maker_asset_amount)
        .with_taker_asset(fixture.payment, params.taker_asset_amount)
        .with_fees(params.maker_fee, params.taker_fee)
        .expires_after(now, params.expiration_window)
        .with_random_salt()
        .build()?;
    tracing::debug!(?order, hash = ?order.hash(), "built order");
    Ok(order)
}
