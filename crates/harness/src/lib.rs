//! Verifies that a non-fungible token can be swapped for a fungible payment
//! token through an exchange order that is signed off-chain by the maker and
//! settled on-chain by the taker.

pub mod arguments;
pub mod assertions;
pub mod error;
pub mod fixture;
pub mod ledger;
pub mod onchain;
pub mod order;
pub mod scenario;
pub mod settlement;
pub mod signer;
pub mod traits;

pub use error::{Error, SettlementError, SigningError};
use {
    crate::{
        arguments::{Arguments, Backend},
        fixture::{CollectibleSource, FixtureConfig},
        ledger::Ledger,
        onchain::{NodeConfig, OnchainSystem},
        order::OrderParams,
        scenario::{Outcome, ScenarioConfig},
        signer::Keyring,
    },
    anyhow::{Context as _, Result, bail},
    number::EthUnit as _,
};

/// Accounts used by a run: maker, taker and deployer.
const ACCOUNTS: u32 = 3;

/// Native balance every account starts with on the in-memory backend.
const IN_MEMORY_FUNDING: u128 = 100;

pub async fn run(args: Arguments) -> Result<Outcome> {
    let keyring = Keyring::from_mnemonic(&args.mnemonic, ACCOUNTS)?;
    let parties = keyring.parties()?;

    let outcome = match args.backend {
        Backend::Node => {
            let collectible = match (args.erc721, &args.erc721_artifact) {
                (Some(address), _) => CollectibleSource::Existing(address),
                (None, Some(path)) => CollectibleSource::Artifact(path.clone()),
                (None, None) => bail!("either --erc721 or --erc721-artifact is required"),
            };
            let node = NodeConfig {
                url: args.node_url.clone(),
                network_id: args.network_id,
                exchange: args.exchange,
                weth: args.weth,
            };
            let system = OnchainSystem::connect(&node, keyring.wallet()?)
                .await
                .context("failed to connect to settlement system")?;
            let config = scenario_config(&args, collectible);
            scenario::run(&system, &system, &keyring, parties, &config).await?
        }
        Backend::InMemory => {
            let ledger = Ledger::ganache();
            for account in keyring.accounts() {
                ledger.fund(*account, IN_MEMORY_FUNDING.eth());
            }
            let collectible = match &args.erc721_artifact {
                Some(path) => CollectibleSource::Artifact(path.clone()),
                None => CollectibleSource::Existing(ledger.create_collection(parties.deployer)),
            };
            let config = scenario_config(&args, collectible);
            scenario::run(&ledger, &ledger, &keyring, parties, &config).await?
        }
    };

    tracing::info!(
        order_hash = ?outcome.order_hash,
        paid = %outcome.fill.taker_asset_filled_amount,
        "collectible settled"
    );
    Ok(outcome)
}

fn scenario_config(args: &Arguments, collectible: CollectibleSource) -> ScenarioConfig {
    ScenarioConfig {
        fixture: FixtureConfig {
            collectible,
            wrap_amount: args.wrap_amount,
        },
        order: OrderParams::new(args.taker_asset_amount)
            .with_expiration_window(args.expiration_window),
        signing_scheme: args.signing_scheme,
        fill_gas_limit: args.fill_gas_limit,
    }
}
