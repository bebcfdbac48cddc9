//! Settlement system backed by a node.

use {
    crate::{
        error::SettlementError,
        traits::{Collectibles, Deployment, SettlementSystem},
    },
    alloy::{
        contract::{CallBuilder, CallDecoder},
        network::{EthereumWallet, ReceiptResponse as _, TransactionBuilder},
        primitives::{Address, Bytes, U256},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::{BlockNumberOrTag, TransactionReceipt, TransactionRequest},
        sol_types::{Revert, SolError as _},
    },
    anyhow::{Context as _, Result, anyhow, ensure},
    contracts::alloy::{ERC20, ERC721, Exchange, WETH9},
    model::{
        asset_data::{AssetData, ERC20_PROXY_ID, ERC721_PROXY_ID},
        order::{FillResults, OrderData, OrderInfo, OrderStatus, SignedOrder},
    },
    url::Url,
};

/// Which contracts to talk to. Addresses that are not given are taken from
/// the known deployments of the network.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub url: Url,
    pub network_id: u64,
    pub exchange: Option<Address>,
    pub weth: Option<Address>,
}

pub struct OnchainSystem {
    provider: DynProvider,
    deployment: Deployment,
    exchange: Exchange::Instance,
}

impl OnchainSystem {
    /// Connects to the node, checks that it runs the expected network and
    /// resolves the transfer agents through the exchange.
    pub async fn connect(config: &NodeConfig, wallet: EthereumWallet) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(config.url.clone())
            .erased();
        Self::new(provider, config).await
    }

    pub async fn new(provider: DynProvider, config: &NodeConfig) -> Result<Self> {
        let network_id = provider
            .get_net_version()
            .await
            .context("could not fetch network id")?;
        ensure!(
            network_id == config.network_id,
            "node runs network {network_id}, expected {}",
            config.network_id
        );

        let exchange = config
            .exchange
            .or_else(|| Exchange::deployment_address(network_id))
            .with_context(|| format!("no exchange known for network {network_id}"))?;
        let weth = config
            .weth
            .or_else(|| WETH9::deployment_address(network_id))
            .with_context(|| format!("no wrapped native token known for network {network_id}"))?;
        let exchange = Exchange::Instance::new(exchange, provider.clone());

        let erc20_proxy = exchange
            .getAssetProxy(ERC20_PROXY_ID.into())
            .call()
            .await
            .context("failed to resolve ERC20 proxy")?;
        let erc721_proxy = exchange
            .getAssetProxy(ERC721_PROXY_ID.into())
            .call()
            .await
            .context("failed to resolve ERC721 proxy")?;
        ensure!(
            !erc20_proxy.is_zero() && !erc721_proxy.is_zero(),
            "exchange {} has no asset proxies registered",
            exchange.address()
        );
        let fee_asset = exchange
            .ZRX_ASSET_DATA()
            .call()
            .await
            .context("failed to resolve fee token")?;
        let fee_token = AssetData::decode(&fee_asset)
            .context("unexpected fee asset data")?
            .token();

        let deployment = Deployment {
            network_id,
            exchange: *exchange.address(),
            erc20_proxy,
            erc721_proxy,
            weth,
            fee_token,
        };
        tracing::info!(?deployment, "connected to settlement system");
        Ok(Self {
            provider,
            deployment,
            exchange,
        })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

/// The order in the layout of the exchange's ABI.
fn exchange_order(order: &OrderData) -> Exchange::Exchange::Order {
    let order = order.to_eip712();
    Exchange::Exchange::Order {
        makerAddress: order.makerAddress,
        takerAddress: order.takerAddress,
        feeRecipientAddress: order.feeRecipientAddress,
        senderAddress: order.senderAddress,
        makerAssetAmount: order.makerAssetAmount,
        takerAssetAmount: order.takerAssetAmount,
        makerFee: order.makerFee,
        takerFee: order.takerFee,
        expirationTimeSeconds: order.expirationTimeSeconds,
        salt: order.salt,
        makerAssetData: order.makerAssetData,
        takerAssetData: order.takerAssetData,
    }
}

/// Sends the transaction and waits for it to be mined successfully.
async fn send_and_watch<P, D>(call: CallBuilder<P, D>) -> Result<TransactionReceipt>
where
    P: Provider,
    D: CallDecoder,
{
    let receipt = call
        .send()
        .await
        .context("failed to submit transaction")?
        .get_receipt()
        .await
        .context("failed to fetch transaction receipt")?;
    ensure!(
        receipt.status(),
        "transaction {} reverted",
        receipt.transaction_hash
    );
    tracing::debug!(hash = ?receipt.transaction_hash, gas_used = receipt.gas_used, "transaction mined");
    Ok(receipt)
}

/// Reverts carry the contract's reason, anything else is a node problem.
fn settlement_error(err: alloy::contract::Error) -> SettlementError {
    match err.as_revert_data() {
        Some(data) => SettlementError::Reverted(revert_reason(&data)),
        None => SettlementError::Node(err.into()),
    }
}

/// The exchange reverts with `Error(string)` reasons like `ORDER_UNFILLABLE`.
/// Other revert data is kept as hex.
fn revert_reason(data: &[u8]) -> String {
    match Revert::abi_decode(data) {
        Ok(revert) => revert.reason,
        Err(_) => const_hex::encode_prefixed(data),
    }
}

#[async_trait::async_trait]
impl SettlementSystem for OnchainSystem {
    fn deployment(&self) -> Deployment {
        self.deployment
    }

    async fn timestamp(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .context("failed to fetch latest block")?
            .context("node has no latest block")?;
        Ok(block.header.timestamp)
    }

    async fn balance(&self, asset: AssetData, owner: Address) -> Result<U256> {
        let balance = match asset {
            AssetData::Erc20 { token } => {
                ERC20::Instance::new(token, self.provider.clone())
                    .balanceOf(owner)
                    .call()
                    .await
            }
            AssetData::Erc721 { token, .. } => {
                ERC721::Instance::new(token, self.provider.clone())
                    .balanceOf(owner)
                    .call()
                    .await
            }
        };
        balance.with_context(|| format!("failed to read balance of {asset} for {owner}"))
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        self.provider
            .get_balance(owner)
            .await
            .with_context(|| format!("failed to read native balance of {owner}"))
    }

    async fn approve_collection(&self, collection: Address, owner: Address) -> Result<()> {
        let collection = ERC721::Instance::new(collection, self.provider.clone());
        send_and_watch(
            collection
                .setApprovalForAll(self.deployment.erc721_proxy, true)
                .from(owner),
        )
        .await?;
        Ok(())
    }

    async fn approve_unlimited(&self, token: Address, owner: Address) -> Result<()> {
        let token = ERC20::Instance::new(token, self.provider.clone());
        send_and_watch(
            token
                .approve(self.deployment.erc20_proxy, U256::MAX)
                .from(owner),
        )
        .await?;
        Ok(())
    }

    async fn wrap_native(&self, owner: Address, amount: U256) -> Result<()> {
        let weth = WETH9::Instance::new(self.deployment.weth, self.provider.clone());
        send_and_watch(weth.deposit().value(amount).from(owner)).await?;
        Ok(())
    }

    async fn order_info(&self, order: &OrderData) -> Result<OrderInfo> {
        let info = self
            .exchange
            .getOrderInfo(exchange_order(order))
            .call()
            .await
            .context("failed to fetch order info")?;
        Ok(OrderInfo {
            status: OrderStatus::try_from(info.orderStatus)?,
            hash: info.orderHash,
            taker_asset_filled_amount: info.orderTakerAssetFilledAmount,
        })
    }

    async fn fill_order(
        &self,
        order: &SignedOrder,
        amount: U256,
        taker: Address,
        gas_limit: u64,
    ) -> Result<FillResults, SettlementError> {
        let call = self
            .exchange
            .fillOrder(
                exchange_order(order.data()),
                amount,
                order.signature().to_bytes().into(),
            )
            .from(taker)
            .gas(gas_limit);

        // Simulate first so a failing fill reports the exchange's revert
        // reason instead of only a failed receipt.
        let results = call.call().await.map_err(settlement_error)?;

        let receipt = call
            .send()
            .await
            .map_err(settlement_error)?
            .get_receipt()
            .await
            .map_err(|err| SettlementError::Node(err.into()))?;
        if !receipt.status() {
            return Err(SettlementError::Reverted(format!(
                "transaction {} reverted using {} of {gas_limit} gas",
                receipt.transaction_hash, receipt.gas_used
            )));
        }
        tracing::debug!(hash = ?receipt.transaction_hash, gas_used = receipt.gas_used, "fill mined");

        Ok(FillResults {
            maker_asset_filled_amount: results.makerAssetFilledAmount,
            taker_asset_filled_amount: results.takerAssetFilledAmount,
            maker_fee_paid: results.makerFeePaid,
            taker_fee_paid: results.takerFeePaid,
        })
    }

    async fn cancel_order(&self, order: &OrderData) -> Result<()> {
        send_and_watch(
            self.exchange
                .cancelOrder(exchange_order(order))
                .from(order.maker),
        )
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Collectibles for OnchainSystem {
    async fn deploy(&self, deployer: Address, bytecode: Bytes) -> Result<Address> {
        let tx = TransactionRequest::default()
            .from(deployer)
            .with_deploy_code(bytecode);
        let receipt = self
            .provider
            .send_transaction(tx)
            .await
            .context("failed to submit deployment")?
            .get_receipt()
            .await
            .context("failed to fetch deployment receipt")?;
        ensure!(receipt.status(), "deployment {} reverted", receipt.transaction_hash);
        receipt
            .contract_address
            .ok_or_else(|| anyhow!("deployment receipt has no contract address"))
    }

    async fn mint(
        &self,
        collection: Address,
        minter: Address,
        to: Address,
        token_id: U256,
    ) -> Result<()> {
        let collection = ERC721::Instance::new(collection, self.provider.clone());
        send_and_watch(collection.mint(to, token_id).from(minter)).await?;
        Ok(())
    }
}
