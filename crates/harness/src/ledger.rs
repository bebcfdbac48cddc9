//! In-memory settlement system.
//!
//! Emulates the exchange, its asset proxies, the wrapped native token and
//! non-fungible collections closely enough to run the harness without a
//! node. Settlement follows the exchange's rules: order status precedence,
//! taker and sender restrictions, signature validation on the first fill,
//! proxy authorization, floor rounding with a 0.1% error bound and atomic
//! transfers of assets and fees.

use {
    crate::{
        error::SettlementError,
        traits::{Collectibles, Deployment, SettlementSystem},
    },
    alloy::primitives::{Address, B256, Bytes, U256, address},
    anyhow::{Context as _, Result, anyhow, ensure},
    model::{
        asset_data::AssetData,
        order::{FillResults, OrderData, OrderInfo, OrderStatus, SignedOrder},
    },
    std::{
        collections::{HashMap, HashSet},
        sync::{Mutex, MutexGuard, PoisonError},
        time::Duration,
    },
};

/// Addresses of the contracts in the ganache snapshot.
pub const GANACHE_DEPLOYMENT: Deployment = Deployment {
    network_id: contracts::alloy::networks::GANACHE,
    exchange: address!("0x48bacb9266a570d521063ef5dd96e61686dbe788"),
    erc20_proxy: address!("0x1dc4c1cefef38a777b15aa20260a54e584b16c48"),
    erc721_proxy: address!("0x1d7022f5b17d2f8b695918fb48fa1089c9f85401"),
    weth: address!("0x0b1ba0af832d7c05fd64161e0db78e85978e8082"),
    fee_token: address!("0x871dd7c2b4b25e1aa18728e9d5f2af4c4e431f5c"),
};

pub struct Ledger {
    deployment: Deployment,
    state: Mutex<State>,
}

#[derive(Clone, Debug, Default)]
struct State {
    now: u64,
    native: HashMap<Address, U256>,
    tokens: HashMap<Address, Token>,
    collections: HashMap<Address, Collection>,
    nonces: HashMap<Address, u64>,
    filled: HashMap<B256, U256>,
    cancelled: HashSet<B256>,
}

#[derive(Clone, Debug, Default)]
struct Token {
    balances: HashMap<Address, U256>,
    /// (owner, spender) -> allowance
    allowances: HashMap<(Address, Address), U256>,
}

#[derive(Clone, Debug)]
struct Collection {
    minter: Address,
    owners: HashMap<U256, Address>,
    /// (owner, operator)
    operators: HashSet<(Address, Address)>,
}

impl Ledger {
    pub fn new(deployment: Deployment) -> Self {
        let state = State {
            now: model::time::now_in_epoch_seconds(),
            tokens: [deployment.weth, deployment.fee_token]
                .into_iter()
                .map(|token| (token, Token::default()))
                .collect(),
            ..Default::default()
        };
        Self {
            deployment,
            state: Mutex::new(state),
        }
    }

    /// A ledger with the ganache snapshot's addresses.
    pub fn ganache() -> Self {
        Self::new(GANACHE_DEPLOYMENT)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credits native balance to `owner`.
    pub fn fund(&self, owner: Address, amount: U256) {
        let mut state = self.state();
        let balance = state.native.entry(owner).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Credits `amount` of a fungible token to `owner`, creating the token if
    /// it is not known yet.
    pub fn mint_token(&self, token: Address, owner: Address, amount: U256) {
        let mut state = self.state();
        let balance = state
            .tokens
            .entry(token)
            .or_default()
            .balances
            .entry(owner)
            .or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Creates an empty collection mintable by `minter`, as if it had been
    /// deployed by them.
    pub fn create_collection(&self, minter: Address) -> Address {
        self.state().create_collection(minter)
    }

    pub fn now(&self) -> u64 {
        self.state().now
    }

    pub fn set_time(&self, now: u64) {
        self.state().now = now;
    }

    pub fn advance_time(&self, duration: Duration) {
        let mut state = self.state();
        state.now = state.now.saturating_add(duration.as_secs());
    }
}

impl State {
    fn create_collection(&mut self, minter: Address) -> Address {
        let nonce = self.nonces.entry(minter).or_default();
        let address = minter.create(*nonce);
        *nonce += 1;
        self.collections.insert(
            address,
            Collection {
                minter,
                owners: HashMap::new(),
                operators: HashSet::new(),
            },
        );
        address
    }

    fn token(&self, token: Address) -> Result<&Token> {
        self.tokens
            .get(&token)
            .with_context(|| format!("unknown token {token}"))
    }

    fn token_mut(&mut self, token: Address) -> Result<&mut Token> {
        self.tokens
            .get_mut(&token)
            .with_context(|| format!("unknown token {token}"))
    }

    fn collection(&self, collection: Address) -> Result<&Collection> {
        self.collections
            .get(&collection)
            .with_context(|| format!("unknown collection {collection}"))
    }

    fn collection_mut(&mut self, collection: Address) -> Result<&mut Collection> {
        self.collections
            .get_mut(&collection)
            .with_context(|| format!("unknown collection {collection}"))
    }

    fn order_info(&self, order: &OrderData) -> OrderInfo {
        let hash = order.hash();
        let filled = self.filled.get(&hash).copied().unwrap_or_default();
        let status = if order.maker_asset_amount.is_zero() {
            OrderStatus::InvalidMakerAssetAmount
        } else if order.taker_asset_amount.is_zero() {
            OrderStatus::InvalidTakerAssetAmount
        } else if filled >= order.taker_asset_amount {
            OrderStatus::FullyFilled
        } else if order.is_expired(self.now) {
            OrderStatus::Expired
        } else if self.cancelled.contains(&hash) {
            OrderStatus::Cancelled
        } else {
            OrderStatus::Fillable
        };
        OrderInfo {
            status,
            hash,
            taker_asset_filled_amount: filled,
        }
    }

    fn fill(
        &mut self,
        deployment: &Deployment,
        order: &SignedOrder,
        amount: U256,
        taker: Address,
    ) -> Result<FillResults, SettlementError> {
        let data = order.data();
        let info = self.order_info(data);
        if info.status != OrderStatus::Fillable {
            return Err(SettlementError::NotFillable {
                hash: info.hash,
                status: info.status,
            });
        }
        // The taker submits the transaction itself, so it is also the sender.
        if !data.sender.is_zero() && data.sender != taker {
            return Err(SettlementError::InvalidSender {
                expected: data.sender,
                actual: taker,
            });
        }
        if !data.taker.is_zero() && data.taker != taker {
            return Err(SettlementError::InvalidTaker {
                expected: data.taker,
                actual: taker,
            });
        }
        if info.taker_asset_filled_amount.is_zero() && !is_valid_signature(order) {
            return Err(SettlementError::InvalidSignature { maker: data.maker });
        }

        if amount.is_zero() {
            return Err(SettlementError::ZeroFill);
        }
        let remaining = info.remaining(data);
        if amount > remaining {
            return Err(SettlementError::OverFill {
                requested: amount,
                remaining,
            });
        }
        let results = FillResults {
            maker_asset_filled_amount: partial_amount(
                amount,
                data.taker_asset_amount,
                data.maker_asset_amount,
            )?,
            taker_asset_filled_amount: amount,
            maker_fee_paid: partial_amount(amount, data.taker_asset_amount, data.maker_fee)?,
            taker_fee_paid: partial_amount(amount, data.taker_asset_amount, data.taker_fee)?,
        };

        self.filled
            .insert(info.hash, info.taker_asset_filled_amount + amount);

        let fee_asset = AssetData::Erc20 {
            token: deployment.fee_token,
        };
        self.transfer(
            deployment,
            &data.maker_asset_data,
            data.maker,
            taker,
            results.maker_asset_filled_amount,
        )?;
        self.transfer(
            deployment,
            &data.taker_asset_data,
            taker,
            data.maker,
            results.taker_asset_filled_amount,
        )?;
        self.transfer(
            deployment,
            &fee_asset,
            data.maker,
            data.fee_recipient,
            results.maker_fee_paid,
        )?;
        self.transfer(
            deployment,
            &fee_asset,
            taker,
            data.fee_recipient,
            results.taker_fee_paid,
        )?;
        Ok(results)
    }

    /// Moves `amount` of `asset` through the responsible transfer agent.
    fn transfer(
        &mut self,
        deployment: &Deployment,
        asset: &AssetData,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), SettlementError> {
        if amount.is_zero() || from == to {
            return Ok(());
        }
        let unknown = |err: anyhow::Error| SettlementError::Reverted(format!("{err:#}"));
        match *asset {
            AssetData::Erc20 { token } => {
                let proxy = deployment.erc20_proxy;
                let token = self.token_mut(token).map_err(unknown)?;
                let allowance = token.allowances.get(&(from, proxy)).copied().unwrap_or_default();
                if allowance < amount {
                    return Err(SettlementError::InsufficientAuthorization {
                        asset: *asset,
                        owner: from,
                    });
                }
                let balance = token.balances.get(&from).copied().unwrap_or_default();
                if balance < amount {
                    return Err(SettlementError::InsufficientBalance {
                        asset: *asset,
                        owner: from,
                    });
                }
                if allowance != U256::MAX {
                    token.allowances.insert((from, proxy), allowance - amount);
                }
                token.balances.insert(from, balance - amount);
                let received = token.balances.entry(to).or_default();
                *received = received.saturating_add(amount);
            }
            AssetData::Erc721 {
                token: collection,
                token_id,
            } => {
                if amount != U256::from(1) {
                    return Err(SettlementError::Reverted("INVALID_AMOUNT".to_string()));
                }
                let proxy = deployment.erc721_proxy;
                let collection = self.collection_mut(collection).map_err(unknown)?;
                if collection.owners.get(&token_id) != Some(&from) {
                    return Err(SettlementError::InsufficientBalance {
                        asset: *asset,
                        owner: from,
                    });
                }
                if !collection.operators.contains(&(from, proxy)) {
                    return Err(SettlementError::InsufficientAuthorization {
                        asset: *asset,
                        owner: from,
                    });
                }
                collection.owners.insert(token_id, to);
            }
        }
        Ok(())
    }
}

/// Checks the signature the same way the exchange does: the signature type
/// selects how the order hash was signed and the recovered address must be
/// the maker.
fn is_valid_signature(order: &SignedOrder) -> bool {
    order.signer().is_ok_and(|signer| signer == order.data().maker)
}

/// `numerator * target / denominator` rounded down, rejecting results whose
/// rounding error exceeds 0.1%.
fn partial_amount(numerator: U256, denominator: U256, target: U256) -> Result<U256, SettlementError> {
    if denominator.is_zero() {
        return Err(SettlementError::Reverted("DIVISION_BY_ZERO".to_string()));
    }
    let product = numerator
        .checked_mul(target)
        .ok_or_else(|| SettlementError::Reverted("UINT256_OVERFLOW".to_string()))?;
    if is_rounding_error(numerator, denominator, target)? {
        return Err(SettlementError::RoundingError(numerator));
    }
    Ok(product / denominator)
}

fn is_rounding_error(numerator: U256, denominator: U256, target: U256) -> Result<bool, SettlementError> {
    if numerator.is_zero() || target.is_zero() {
        return Ok(false);
    }
    let remainder = target.mul_mod(numerator, denominator);
    let overflow = || SettlementError::Reverted("UINT256_OVERFLOW".to_string());
    let scaled = remainder.checked_mul(U256::from(1000)).ok_or_else(overflow)?;
    let product = numerator.checked_mul(target).ok_or_else(overflow)?;
    Ok(scaled >= product)
}

#[async_trait::async_trait]
impl SettlementSystem for Ledger {
    fn deployment(&self) -> Deployment {
        self.deployment
    }

    async fn timestamp(&self) -> Result<u64> {
        Ok(self.now())
    }

    async fn balance(&self, asset: AssetData, owner: Address) -> Result<U256> {
        let state = self.state();
        Ok(match asset {
            AssetData::Erc20 { token } => state
                .token(token)?
                .balances
                .get(&owner)
                .copied()
                .unwrap_or_default(),
            AssetData::Erc721 { token, .. } => {
                let owned = state
                    .collection(token)?
                    .owners
                    .values()
                    .filter(|holder| **holder == owner)
                    .count();
                U256::from(owned)
            }
        })
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        Ok(self.state().native.get(&owner).copied().unwrap_or_default())
    }

    async fn approve_collection(&self, collection: Address, owner: Address) -> Result<()> {
        let proxy = self.deployment.erc721_proxy;
        self.state()
            .collection_mut(collection)?
            .operators
            .insert((owner, proxy));
        Ok(())
    }

    async fn approve_unlimited(&self, token: Address, owner: Address) -> Result<()> {
        let proxy = self.deployment.erc20_proxy;
        self.state()
            .token_mut(token)?
            .allowances
            .insert((owner, proxy), U256::MAX);
        Ok(())
    }

    async fn wrap_native(&self, owner: Address, amount: U256) -> Result<()> {
        let weth = self.deployment.weth;
        let mut state = self.state();
        let native = state.native.get(&owner).copied().unwrap_or_default();
        ensure!(
            native >= amount,
            "{owner} has native balance {native}, cannot wrap {amount}"
        );
        state.native.insert(owner, native - amount);
        let wrapped = state.token_mut(weth)?.balances.entry(owner).or_default();
        *wrapped = wrapped.saturating_add(amount);
        Ok(())
    }

    async fn order_info(&self, order: &OrderData) -> Result<OrderInfo> {
        ensure!(
            order.exchange == self.deployment.exchange,
            "order is for exchange {}, not {}",
            order.exchange,
            self.deployment.exchange
        );
        Ok(self.state().order_info(order))
    }

    async fn fill_order(
        &self,
        order: &SignedOrder,
        amount: U256,
        taker: Address,
        _gas_limit: u64,
    ) -> Result<FillResults, SettlementError> {
        if order.data().exchange != self.deployment.exchange {
            return Err(SettlementError::InvalidSignature {
                maker: order.data().maker,
            });
        }
        let mut state = self.state();
        // Fills are applied to a copy that only replaces the ledger state
        // once every transfer succeeded.
        let mut pending = state.clone();
        let results = pending.fill(&self.deployment, order, amount, taker)?;
        *state = pending;
        tracing::debug!(hash = ?order.hash(), ?results, "settled fill");
        Ok(results)
    }

    async fn cancel_order(&self, order: &OrderData) -> Result<()> {
        let mut state = self.state();
        let info = state.order_info(order);
        if info.status != OrderStatus::Fillable {
            return Err(anyhow!(
                "order {} is not fillable, status {}",
                info.hash,
                info.status
            ));
        }
        state.cancelled.insert(info.hash);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Collectibles for Ledger {
    async fn deploy(&self, deployer: Address, bytecode: Bytes) -> Result<Address> {
        ensure!(!bytecode.is_empty(), "empty creation bytecode");
        Ok(self.create_collection(deployer))
    }

    async fn mint(
        &self,
        collection: Address,
        minter: Address,
        to: Address,
        token_id: U256,
    ) -> Result<()> {
        ensure!(!to.is_zero(), "cannot mint to the zero address");
        let mut state = self.state();
        let collection = state.collection_mut(collection)?;
        ensure!(
            collection.minter == minter,
            "{minter} is not allowed to mint"
        );
        ensure!(
            !collection.owners.contains_key(&token_id),
            "token {token_id} already minted"
        );
        collection.owners.insert(token_id, to);
        Ok(())
    }
}
