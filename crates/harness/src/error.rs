use {
    alloy::primitives::{Address, B256, U256},
    model::{asset_data::AssetData, order::OrderStatus},
};

/// Errors that abort a harness run. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("fixture setup failed: {0:#}")]
    Setup(anyhow::Error),
    #[error("order construction failed: {0:#}")]
    Order(anyhow::Error),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("no signing key available for {0}")]
    NoSigner(Address),
    #[error("failed to sign order: {0:#}")]
    Failed(anyhow::Error),
}

/// Reasons for the settlement system to refuse a fill.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("order {hash} is not fillable, status {status}")]
    NotFillable { hash: B256, status: OrderStatus },
    #[error("order signature does not belong to maker {maker}")]
    InvalidSignature { maker: Address },
    #[error("fill amount {requested} exceeds remaining fillable amount {remaining}")]
    OverFill { requested: U256, remaining: U256 },
    #[error("fill amount must be positive")]
    ZeroFill,
    #[error("order can only be filled by {expected}, not {actual}")]
    InvalidTaker { expected: Address, actual: Address },
    #[error("order can only be submitted by {expected}, not {actual}")]
    InvalidSender { expected: Address, actual: Address },
    #[error("filling {0} would cause a rounding error above 0.1%")]
    RoundingError(U256),
    #[error("{owner} has insufficient balance of {asset}")]
    InsufficientBalance { asset: AssetData, owner: Address },
    #[error("{owner} has not authorized the transfer of {asset}")]
    InsufficientAuthorization { asset: AssetData, owner: Address },
    #[error("settlement reverted: {0}")]
    Reverted(String),
    #[error("node error: {0:#}")]
    Node(anyhow::Error),
}
