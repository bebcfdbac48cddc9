//! Trait definitions for the settlement system boundary.
//!
//! The harness only talks to the exchange, its asset proxies and the token
//! contracts through these traits so it can be pointed at a real node or at
//! the in-memory ledger, and mocked in unit tests.

use {
    crate::error::SettlementError,
    alloy::primitives::{Address, Bytes, U256},
    anyhow::Result,
    model::{
        asset_data::AssetData,
        order::{FillResults, OrderData, OrderInfo, SignedOrder},
    },
};

/// Addresses of the contracts that make up the settlement system.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Deployment {
    pub network_id: u64,
    pub exchange: Address,
    /// Transfer agent for fungible assets.
    pub erc20_proxy: Address,
    /// Transfer agent for non-fungible assets.
    pub erc721_proxy: Address,
    /// Wrapped native token used as the payment asset.
    pub weth: Address,
    /// Token in which maker and taker fees are paid.
    pub fee_token: Address,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SettlementSystem: Send + Sync {
    fn deployment(&self) -> Deployment;

    /// Timestamp of the latest block in seconds. Order expiration is checked
    /// against this clock.
    async fn timestamp(&self) -> Result<u64>;

    /// Balance of `owner` in the asset's base unit. For non-fungible assets
    /// this is the number of tokens of the collection held by `owner`.
    async fn balance(&self, asset: AssetData, owner: Address) -> Result<U256>;

    async fn native_balance(&self, owner: Address) -> Result<U256>;

    /// Lets the non-fungible transfer agent move any token of `collection`
    /// owned by `owner`.
    async fn approve_collection(&self, collection: Address, owner: Address) -> Result<()>;

    /// Grants the fungible transfer agent an unlimited allowance of `token`
    /// held by `owner`.
    async fn approve_unlimited(&self, token: Address, owner: Address) -> Result<()>;

    /// Converts `amount` of the owner's native balance into the wrapped
    /// native token.
    async fn wrap_native(&self, owner: Address, amount: U256) -> Result<()>;

    async fn order_info(&self, order: &OrderData) -> Result<OrderInfo>;

    /// Fills `amount` of the order's taker asset on behalf of `taker`. The
    /// fill either fully settles or leaves all balances untouched.
    async fn fill_order(
        &self,
        order: &SignedOrder,
        amount: U256,
        taker: Address,
        gas_limit: u64,
    ) -> Result<FillResults, SettlementError>;

    /// Cancels the order on behalf of its maker.
    async fn cancel_order(&self, order: &OrderData) -> Result<()>;
}

/// Non-fungible token contracts the fixture deploys and mints from.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Collectibles: Send + Sync {
    /// Deploys a collection from creation bytecode and returns its address.
    async fn deploy(&self, deployer: Address, bytecode: Bytes) -> Result<Address>;

    async fn mint(
        &self,
        collection: Address,
        minter: Address,
        to: Address,
        token_id: U256,
    ) -> Result<()>;
}
