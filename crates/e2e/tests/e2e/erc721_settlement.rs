use {
    alloy::primitives::U256,
    e2e::{nodes::local_node::TestNodeApi, setup::*},
    harness::{
        SettlementError,
        assertions::{self, Snapshot},
        fixture::Fixture,
        order::{OrderParams, build_order},
        scenario::{self, ScenarioConfig},
        settlement::Invoker,
        traits::SettlementSystem,
    },
    model::{order::OrderStatus, signature::EcdsaSigningScheme},
    number::EthUnit,
    std::time::Duration,
};

const FILL_GAS_LIMIT: u64 = 400_000;

fn price() -> U256 {
    0.1.eth()
}

#[tokio::test]
#[ignore]
async fn local_node_erc721_for_weth() {
    run_test(erc721_for_weth).await;
}

async fn erc721_for_weth(onchain: Onchain) {
    let config = ScenarioConfig {
        fixture: onchain.fixture_config(),
        order: OrderParams::new(price()),
        signing_scheme: EcdsaSigningScheme::EthSign,
        fill_gas_limit: FILL_GAS_LIMIT,
    };
    let outcome = scenario::run(
        &onchain.system,
        &onchain.system,
        &onchain.keyring,
        onchain.parties,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.after.collectible.maker, U256::ZERO);
    assert_eq!(outcome.after.collectible.taker, U256::from(1));
    assert_eq!(outcome.after.payment.maker, outcome.before.payment.maker + price());
}

#[tokio::test]
#[ignore]
async fn local_node_rejects_invalid_fills() {
    run_test(rejects_invalid_fills).await;
}

async fn rejects_invalid_fills(onchain: Onchain) {
    let system = &onchain.system;
    let fixture = Fixture::setup(system, system, onchain.parties, &onchain.fixture_config())
        .await
        .unwrap();
    let before = Snapshot::take(system, &fixture).await.unwrap();
    assertions::expect_preconditions(&before).unwrap();
    let invoker = Invoker::new(system, FILL_GAS_LIMIT);

    // Signed by someone other than the maker.
    let order = build_order(system, &fixture, &OrderParams::new(price()))
        .await
        .unwrap();
    let forged = onchain
        .keyring
        .sign_as(onchain.outsider, order, EcdsaSigningScheme::EthSign)
        .unwrap();
    let result = invoker.fill(&forged, price(), onchain.parties.taker).await;
    assert!(matches!(result, Err(SettlementError::InvalidSignature { .. })));
    let result = system
        .fill_order(&forged, price(), onchain.parties.taker, FILL_GAS_LIMIT)
        .await;
    assert!(matches!(result, Err(SettlementError::Reverted(_))));

    // More than the order asks for.
    let order = build_order(system, &fixture, &OrderParams::new(price()))
        .await
        .unwrap();
    let order = onchain
        .keyring
        .sign(order, EcdsaSigningScheme::Eip712)
        .unwrap();
    let result = invoker
        .fill(&order, price() + U256::from(1), onchain.parties.taker)
        .await;
    assert!(matches!(result, Err(SettlementError::OverFill { .. })));

    // Cancelled by the maker.
    system.cancel_order(order.data()).await.unwrap();
    let result = invoker.fill(&order, price(), onchain.parties.taker).await;
    assert!(matches!(
        result,
        Err(SettlementError::NotFillable {
            status: OrderStatus::Cancelled,
            ..
        })
    ));

    // Past its expiration.
    let order = build_order(
        system,
        &fixture,
        &OrderParams::new(price()).with_expiration_window(Duration::from_secs(600)),
    )
    .await
    .unwrap();
    let order = onchain
        .keyring
        .sign(order, EcdsaSigningScheme::EthSign)
        .unwrap();
    TestNodeApi::new(onchain.provider().clone())
        .increase_time(Duration::from_secs(601))
        .await
        .unwrap();
    let result = invoker.fill(&order, price(), onchain.parties.taker).await;
    assert!(matches!(
        result,
        Err(SettlementError::NotFillable {
            status: OrderStatus::Expired,
            ..
        })
    ));

    let after = Snapshot::take(system, &fixture).await.unwrap();
    assert_eq!(after, before);
}
