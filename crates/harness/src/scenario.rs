use {
    crate::{
        assertions::{self, Expected, Snapshot},
        error::Error,
        fixture::{Fixture, FixtureConfig, Parties},
        order::{OrderParams, build_order},
        settlement::Invoker,
        signer::Keyring,
        traits::{Collectibles, SettlementSystem},
    },
    alloy::primitives::B256,
    model::{order::FillResults, signature::EcdsaSigningScheme},
};

#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub fixture: FixtureConfig,
    pub order: OrderParams,
    pub signing_scheme: EcdsaSigningScheme,
    /// Gas ceiling of the settlement transaction.
    pub fill_gas_limit: u64,
}

/// What a successful run observed.
#[derive(Clone, Copy, Debug)]
pub struct Outcome {
    pub fixture: Fixture,
    pub order_hash: B256,
    pub fill: FillResults,
    pub before: Snapshot,
    pub after: Snapshot,
}

/// Runs the whole trade: set up the fixture, check the starting balances,
/// have the maker sign an order for the collectible, fill it completely as
/// the taker and check that both assets changed hands.
pub async fn run(
    system: &dyn SettlementSystem,
    collectibles: &dyn Collectibles,
    keyring: &Keyring,
    parties: Parties,
    config: &ScenarioConfig,
) -> Result<Outcome, Error> {
    let fixture = Fixture::setup(system, collectibles, parties, &config.fixture).await?;
    tracing::info!(collection = ?fixture.collection, token_id = %fixture.token_id, "fixture ready");

    let before = snapshot(system, &fixture).await?;
    assertions::expect_preconditions(&before)?;
    tracing::info!(?before, "preconditions hold");

    let order = build_order(system, &fixture, &config.order)
        .await
        .map_err(Error::Order)?;
    let signed = keyring.sign(order, config.signing_scheme)?;
    let order_hash = signed.hash();
    tracing::info!(?order_hash, scheme = %config.signing_scheme, "maker signed order");

    let amount = signed.data().taker_asset_amount;
    let fill = Invoker::new(system, config.fill_gas_limit)
        .fill(&signed, amount, parties.taker)
        .await?;

    let expected = Expected::full_fill(signed.data());
    let after = snapshot(system, &fixture).await?;
    assertions::expect_transfer(&before, &after, &expected)?;
    assertions::expect_fill(&fill, &expected)?;
    tracing::info!(?after, "collectible transferred to taker");

    Ok(Outcome {
        fixture,
        order_hash,
        fill,
        before,
        after,
    })
}

async fn snapshot(system: &dyn SettlementSystem, fixture: &Fixture) -> Result<Snapshot, Error> {
    Snapshot::take(system, fixture)
        .await
        .map_err(|err| Error::Assertion(format!("{err:#}")))
}
