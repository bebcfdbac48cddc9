//! Contains the order type as it is hashed and signed for the exchange, with
//! serialization matching the JSON order format used by exchange tooling.

use {
    crate::{
        DomainSeparator,
        asset_data::AssetData,
        domain,
        signature::{EcdsaSignature, EcdsaSigningScheme, Signature},
    },
    alloy::{
        primitives::{Address, B256, U256},
        signers::local::PrivateKeySigner,
        sol_types::SolStruct,
    },
    anyhow::{Context as _, Result, anyhow, ensure},
    serde::{Deserialize, Serialize},
    std::{fmt, time::Duration},
};

alloy::sol! {
    /// The order struct exactly as the exchange hashes it.
    #[derive(Debug, PartialEq, Eq)]
    struct Order {
        address makerAddress;
        address takerAddress;
        address feeRecipientAddress;
        address senderAddress;
        uint256 makerAssetAmount;
        uint256 takerAssetAmount;
        uint256 makerFee;
        uint256 takerFee;
        uint256 expirationTimeSeconds;
        uint256 salt;
        bytes makerAssetData;
        bytes takerAssetData;
    }
}

/// The complete order data.
///
/// These are the exact fields that get signed by the maker and verified by the
/// exchange. Parties that are not restricted use the zero address.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    #[serde(rename = "exchangeAddress")]
    pub exchange: Address,
    #[serde(rename = "makerAddress")]
    pub maker: Address,
    #[serde(rename = "takerAddress")]
    pub taker: Address,
    #[serde(rename = "senderAddress")]
    pub sender: Address,
    #[serde(rename = "feeRecipientAddress")]
    pub fee_recipient: Address,
    pub maker_asset_data: AssetData,
    pub taker_asset_data: AssetData,
    pub maker_asset_amount: U256,
    pub taker_asset_amount: U256,
    pub maker_fee: U256,
    pub taker_fee: U256,
    pub expiration_time_seconds: u64,
    pub salt: U256,
}

impl OrderData {
    /// The order in the shape of the exchange's `Order` struct.
    pub fn to_eip712(&self) -> Order {
        Order {
            makerAddress: self.maker,
            takerAddress: self.taker,
            feeRecipientAddress: self.fee_recipient,
            senderAddress: self.sender,
            makerAssetAmount: self.maker_asset_amount,
            takerAssetAmount: self.taker_asset_amount,
            makerFee: self.maker_fee,
            takerFee: self.taker_fee,
            expirationTimeSeconds: U256::from(self.expiration_time_seconds),
            salt: self.salt,
            makerAssetData: self.maker_asset_data.encode(),
            takerAssetData: self.taker_asset_data.encode(),
        }
    }

    /// Returns the value of hashStruct() over the order data as defined by
    /// EIP-712.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712#definition-of-hashstruct
    pub fn hash_struct(&self) -> B256 {
        self.to_eip712().eip712_hash_struct()
    }

    /// The order hash that the maker signs and the exchange uses to track
    /// fills and cancellations.
    pub fn hash(&self) -> B256 {
        self.to_eip712().eip712_signing_hash(&domain(self.exchange))
    }

    pub fn domain_separator(&self) -> DomainSeparator {
        DomainSeparator::new(self.exchange)
    }

    /// Whether `now` is at or past the order's expiration.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiration_time_seconds
    }
}

#[derive(Clone, Debug, Default)]
pub struct OrderBuilder {
    exchange: Address,
    maker: Address,
    taker: Address,
    sender: Address,
    fee_recipient: Address,
    maker_asset_data: Option<AssetData>,
    taker_asset_data: Option<AssetData>,
    maker_asset_amount: U256,
    taker_asset_amount: U256,
    maker_fee: U256,
    taker_fee: U256,
    expiration_time_seconds: u64,
    salt: U256,
}

impl OrderBuilder {
    pub fn with_exchange(mut self, exchange: Address) -> Self {
        self.exchange = exchange;
        self
    }

    pub fn with_maker(mut self, maker: Address) -> Self {
        self.maker = maker;
        self
    }

    pub fn with_taker(mut self, taker: Address) -> Self {
        self.taker = taker;
        self
    }

    pub fn with_fee_recipient(mut self, fee_recipient: Address) -> Self {
        self.fee_recipient = fee_recipient;
        self
    }

    pub fn with_maker_asset(mut self, asset: AssetData, amount: U256) -> Self {
        self.maker_asset_data = Some(asset);
        self.maker_asset_amount = amount;
        self
    }

    pub fn with_taker_asset(mut self, asset: AssetData, amount: U256) -> Self {
        self.taker_asset_data = Some(asset);
        self.taker_asset_amount = amount;
        self
    }

    pub fn with_fees(mut self, maker_fee: U256, taker_fee: U256) -> Self {
        self.maker_fee = maker_fee;
        self.taker_fee = taker_fee;
        self
    }

    pub fn with_expiration(mut self, expiration_time_seconds: u64) -> Self {
        self.expiration_time_seconds = expiration_time_seconds;
        self
    }

    /// Sets the expiration to `window` after `now`, rounded up to the next
    /// full second.
    pub fn expires_after(self, now: u64, window: Duration) -> Self {
        let window = window.as_secs() + u64::from(window.subsec_nanos() > 0);
        self.with_expiration(now.saturating_add(window))
    }

    pub fn with_salt(mut self, salt: U256) -> Self {
        self.salt = salt;
        self
    }

    /// Uses a random 256 bit salt so that otherwise identical orders have
    /// distinct hashes.
    pub fn with_random_salt(self) -> Self {
        self.with_salt(U256::from_be_bytes(rand::random::<[u8; 32]>()))
    }

    pub fn build(self) -> Result<OrderData> {
        let maker_asset_data = self
            .maker_asset_data
            .ok_or_else(|| anyhow!("missing maker asset"))?;
        let taker_asset_data = self
            .taker_asset_data
            .ok_or_else(|| anyhow!("missing taker asset"))?;
        ensure!(!self.exchange.is_zero(), "missing exchange address");
        ensure!(!self.maker.is_zero(), "missing maker address");
        ensure!(
            !self.maker_asset_amount.is_zero(),
            "maker asset amount must be positive"
        );
        ensure!(
            !self.taker_asset_amount.is_zero(),
            "taker asset amount must be positive"
        );
        for (asset, amount) in [
            (&maker_asset_data, self.maker_asset_amount),
            (&taker_asset_data, self.taker_asset_amount),
        ] {
            ensure!(
                asset.is_fungible() || amount == U256::from(1),
                "non-fungible {asset} can only be traded in amounts of 1"
            );
        }
        ensure!(self.expiration_time_seconds > 0, "missing expiration");

        Ok(OrderData {
            exchange: self.exchange,
            maker: self.maker,
            taker: self.taker,
            sender: self.sender,
            fee_recipient: self.fee_recipient,
            maker_asset_data,
            taker_asset_data,
            maker_asset_amount: self.maker_asset_amount,
            taker_asset_amount: self.taker_asset_amount,
            maker_fee: self.maker_fee,
            taker_fee: self.taker_fee,
            expiration_time_seconds: self.expiration_time_seconds,
            salt: self.salt,
        })
    }
}

/// Order data together with the maker's signature over its hash.
///
/// The data can not be modified in place: changing any field requires
/// [`SignedOrder::into_parts`] and signing again, since any change would
/// invalidate the signature.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
    #[serde(flatten)]
    data: OrderData,
    signature: Signature,
}

impl SignedOrder {
    /// Signs the order hash with `signer`.
    pub fn sign(
        data: OrderData,
        scheme: EcdsaSigningScheme,
        signer: &PrivateKeySigner,
    ) -> Result<Self> {
        let signature = EcdsaSignature::sign(scheme, &data.hash(), signer)
            .context("failed to sign order hash")?
            .to_signature(scheme);
        Ok(Self { data, signature })
    }

    /// Attaches an existing signature without checking it.
    pub fn from_parts(data: OrderData, signature: Signature) -> Self {
        Self { data, signature }
    }

    pub fn data(&self) -> &OrderData {
        &self.data
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn hash(&self) -> B256 {
        self.data.hash()
    }

    /// Recovers the address that signed this order.
    pub fn signer(&self) -> Result<Address> {
        self.signature.recover(&self.hash())
    }

    pub fn into_parts(self) -> (OrderData, Signature) {
        (self.data, self.signature)
    }
}

/// Order status as reported by the exchange's `getOrderInfo`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Invalid,
    InvalidMakerAssetAmount,
    InvalidTakerAssetAmount,
    Fillable,
    Expired,
    FullyFilled,
    Cancelled,
}

impl TryFrom<u8> for OrderStatus {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Invalid,
            1 => Self::InvalidMakerAssetAmount,
            2 => Self::InvalidTakerAssetAmount,
            3 => Self::Fillable,
            4 => Self::Expired,
            5 => Self::FullyFilled,
            6 => Self::Cancelled,
            _ => return Err(anyhow!("unknown order status {value}")),
        })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub status: OrderStatus,
    pub hash: B256,
    pub taker_asset_filled_amount: U256,
}

impl OrderInfo {
    /// Taker asset amount that can still be filled.
    pub fn remaining(&self, order: &OrderData) -> U256 {
        order
            .taker_asset_amount
            .saturating_sub(self.taker_asset_filled_amount)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillResults {
    pub maker_asset_filled_amount: U256,
    pub taker_asset_filled_amount: U256,
    pub maker_fee_paid: U256,
    pub taker_fee_paid: U256,
}
