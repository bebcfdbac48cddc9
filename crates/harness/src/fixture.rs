use {
    crate::{
        error::Error,
        traits::{Collectibles, SettlementSystem},
    },
    alloy::primitives::{Address, Bytes, U256},
    anyhow::{Context as _, Result, ensure},
    model::asset_data::AssetData,
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

/// Accounts taking part in the trade.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Parties {
    pub maker: Address,
    pub taker: Address,
    pub deployer: Address,
}

/// Where the non-fungible collection comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CollectibleSource {
    /// A collection that is already deployed and mintable by the deployer.
    Existing(Address),
    /// A compiled contract artifact to deploy from.
    Artifact(PathBuf),
}

#[derive(Clone, Debug)]
pub struct FixtureConfig {
    pub collectible: CollectibleSource,
    /// Amount of the taker's native balance to wrap for paying.
    pub wrap_amount: U256,
}

/// State the scenario runs against once setup is complete.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fixture {
    pub parties: Parties,
    pub collection: Address,
    pub token_id: U256,
    /// The token the maker sells.
    pub collectible: AssetData,
    /// The asset the taker pays with.
    pub payment: AssetData,
}

/// Token id minted to the maker: the maker address read as a big-endian
/// integer.
pub fn token_id_for(maker: Address) -> U256 {
    U256::from_be_slice(maker.as_slice())
}

impl Fixture {
    /// Deploys or references the collection, mints the maker's token, grants
    /// both transfer agents access and wraps the taker's payment. The first
    /// failing step aborts the setup.
    pub async fn setup(
        system: &dyn SettlementSystem,
        collectibles: &dyn Collectibles,
        parties: Parties,
        config: &FixtureConfig,
    ) -> Result<Self, Error> {
        Self::try_setup(system, collectibles, parties, config)
            .await
            .map_err(Error::Setup)
    }

    async fn try_setup(
        system: &dyn SettlementSystem,
        collectibles: &dyn Collectibles,
        parties: Parties,
        config: &FixtureConfig,
    ) -> Result<Self> {
        let deployment = system.deployment();

        let collection = match &config.collectible {
            CollectibleSource::Existing(address) => *address,
            CollectibleSource::Artifact(path) => {
                let bytecode = load_bytecode(path)?;
                let address = collectibles
                    .deploy(parties.deployer, bytecode)
                    .await
                    .context("failed to deploy collection")?;
                tracing::info!(?address, "deployed collection");
                address
            }
        };

        let token_id = token_id_for(parties.maker);
        collectibles
            .mint(collection, parties.deployer, parties.maker, token_id)
            .await
            .with_context(|| format!("failed to mint token {token_id} to maker"))?;
        tracing::info!(%token_id, maker = ?parties.maker, "minted collectible");

        system
            .approve_collection(collection, parties.maker)
            .await
            .context("failed to approve collection transfer agent")?;
        system
            .approve_unlimited(deployment.weth, parties.taker)
            .await
            .context("failed to approve payment transfer agent")?;
        tracing::info!("granted transfer authorizations");

        system
            .wrap_native(parties.taker, config.wrap_amount)
            .await
            .context("failed to wrap taker payment")?;
        tracing::info!(amount = %config.wrap_amount, "wrapped taker payment");

        Ok(Self {
            parties,
            collection,
            token_id,
            collectible: AssetData::Erc721 {
                token: collection,
                token_id,
            },
            payment: AssetData::Erc20 {
                token: deployment.weth,
            },
        })
    }
}

#[derive(Deserialize)]
struct Artifact {
    bytecode: ArtifactBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    Hex(String),
    Object { object: String },
}

/// Reads the creation bytecode from a compiled contract artifact. Both the
/// plain `"bytecode": "0x…"` layout and the `"bytecode": { "object": "0x…" }`
/// layout are accepted.
pub fn load_bytecode(path: &Path) -> Result<Bytes> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read artifact {}", path.display()))?;
    let artifact: Artifact = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a contract artifact", path.display()))?;
    let hex = match artifact.bytecode {
        ArtifactBytecode::Hex(hex) | ArtifactBytecode::Object { object: hex } => hex,
    };
    let bytecode = const_hex::decode(hex.trim()).context("artifact bytecode is not hex")?;
    ensure!(!bytecode.is_empty(), "artifact has no bytecode");
    Ok(bytecode.into())
}
