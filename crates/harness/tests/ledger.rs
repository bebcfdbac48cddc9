use {
    alloy::{
        primitives::{Address, Bytes, U256},
        signers::local::PrivateKeySigner,
    },
    harness::{
        Error,
        SettlementError,
        assertions::{self, Snapshot},
        fixture::{CollectibleSource, Fixture, FixtureConfig, Parties, token_id_for},
        ledger::{GANACHE_DEPLOYMENT, Ledger},
        order::{OrderParams, build_order},
        scenario::{self, ScenarioConfig},
        settlement::Invoker,
        signer::Keyring,
        traits::{Collectibles, SettlementSystem},
    },
    model::{
        asset_data::AssetData,
        order::{OrderStatus, SignedOrder},
        signature::EcdsaSigningScheme,
    },
    number::EthUnit,
    rstest::rstest,
    std::time::Duration,
};

const GAS_LIMIT: u64 = 400_000;

struct Setup {
    ledger: Ledger,
    keyring: Keyring,
    parties: Parties,
}

fn setup() -> Setup {
    let keyring = Keyring::new([
        PrivateKeySigner::random(),
        PrivateKeySigner::random(),
        PrivateKeySigner::random(),
        PrivateKeySigner::random(),
    ]);
    let parties = keyring.parties().unwrap();
    let ledger = Ledger::ganache();
    for account in keyring.accounts() {
        ledger.fund(*account, 10u64.eth());
    }
    Setup {
        ledger,
        keyring,
        parties,
    }
}

fn fixture_config(ledger: &Ledger, deployer: Address) -> FixtureConfig {
    FixtureConfig {
        collectible: CollectibleSource::Existing(ledger.create_collection(deployer)),
        wrap_amount: 1u64.eth(),
    }
}

async fn fixture(setup: &Setup) -> Fixture {
    let config = fixture_config(&setup.ledger, setup.parties.deployer);
    Fixture::setup(&setup.ledger, &setup.ledger, setup.parties, &config)
        .await
        .unwrap()
}

fn price() -> U256 {
    0.1.eth()
}

async fn signed_order(setup: &Setup, fixture: &Fixture, params: &OrderParams) -> SignedOrder {
    let order = build_order(&setup.ledger, fixture, params).await.unwrap();
    setup.keyring.sign(order, EcdsaSigningScheme::EthSign).unwrap()
}

#[rstest]
#[tokio::test]
async fn full_fill_transfers_collectible(
    #[values(EcdsaSigningScheme::Eip712, EcdsaSigningScheme::EthSign)] scheme: EcdsaSigningScheme,
) {
    let setup = setup();
    let config = ScenarioConfig {
        fixture: fixture_config(&setup.ledger, setup.parties.deployer),
        order: OrderParams::new(price()),
        signing_scheme: scheme,
        fill_gas_limit: GAS_LIMIT,
    };
    let outcome = scenario::run(
        &setup.ledger,
        &setup.ledger,
        &setup.keyring,
        setup.parties,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.before.collectible.maker, U256::from(1));
    assert_eq!(outcome.before.collectible.taker, U256::ZERO);
    assert_eq!(outcome.after.collectible.maker, U256::ZERO);
    assert_eq!(outcome.after.collectible.taker, U256::from(1));
    assert_eq!(outcome.after.payment.maker, price());
    assert_eq!(outcome.after.payment.taker, 1u64.eth() - price());
    assert_eq!(outcome.fill.maker_asset_filled_amount, U256::from(1));
    assert_eq!(outcome.fill.taker_asset_filled_amount, price());
}

#[tokio::test]
async fn filled_order_cannot_be_filled_again() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let order = signed_order(&setup, &fixture, &OrderParams::new(price())).await;
    let invoker = Invoker::new(&setup.ledger, GAS_LIMIT);

    invoker
        .fill(&order, price(), setup.parties.taker)
        .await
        .unwrap();
    let info = setup.ledger.order_info(order.data()).await.unwrap();
    assert_eq!(info.status, OrderStatus::FullyFilled);
    assert_eq!(info.taker_asset_filled_amount, price());

    let result = setup
        .ledger
        .fill_order(&order, price(), setup.parties.taker, GAS_LIMIT)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::NotFillable {
            status: OrderStatus::FullyFilled,
            ..
        })
    ));
}

#[tokio::test]
async fn order_signed_by_other_account_is_rejected() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let order = build_order(&setup.ledger, &fixture, &OrderParams::new(price()))
        .await
        .unwrap();
    let impostor = setup.keyring.accounts()[3];
    let forged = setup
        .keyring
        .sign_as(impostor, order, EcdsaSigningScheme::EthSign)
        .unwrap();

    let before = Snapshot::take(&setup.ledger, &fixture).await.unwrap();
    let result = setup
        .ledger
        .fill_order(&forged, price(), setup.parties.taker, GAS_LIMIT)
        .await;
    assert!(matches!(result, Err(SettlementError::InvalidSignature { maker }) if maker == setup.parties.maker));
    let result = Invoker::new(&setup.ledger, GAS_LIMIT)
        .fill(&forged, price(), setup.parties.taker)
        .await;
    assert!(matches!(result, Err(SettlementError::InvalidSignature { .. })));
    assert_eq!(Snapshot::take(&setup.ledger, &fixture).await.unwrap(), before);
}

#[tokio::test]
async fn expired_order_is_rejected() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let params = OrderParams::new(price()).with_expiration_window(Duration::from_secs(600));
    let order = signed_order(&setup, &fixture, &params).await;

    setup.ledger.advance_time(Duration::from_secs(599));
    assert_eq!(
        setup.ledger.order_info(order.data()).await.unwrap().status,
        OrderStatus::Fillable
    );

    setup.ledger.advance_time(Duration::from_secs(1));
    let result = setup
        .ledger
        .fill_order(&order, price(), setup.parties.taker, GAS_LIMIT)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::NotFillable {
            status: OrderStatus::Expired,
            ..
        })
    ));
}

#[tokio::test]
async fn over_fill_is_rejected() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let order = signed_order(&setup, &fixture, &OrderParams::new(price())).await;

    let result = setup
        .ledger
        .fill_order(&order, price() + U256::from(1), setup.parties.taker, GAS_LIMIT)
        .await;
    assert!(matches!(result, Err(SettlementError::OverFill { remaining, .. }) if remaining == price()));

    let result = Invoker::new(&setup.ledger, GAS_LIMIT)
        .fill(&order, price() * U256::from(2), setup.parties.taker)
        .await;
    assert!(matches!(result, Err(SettlementError::OverFill { .. })));
}

#[tokio::test]
async fn partial_fill_of_collectible_is_a_rounding_error() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let order = signed_order(&setup, &fixture, &OrderParams::new(price())).await;

    let result = setup
        .ledger
        .fill_order(&order, price() / U256::from(2), setup.parties.taker, GAS_LIMIT)
        .await;
    assert!(matches!(result, Err(SettlementError::RoundingError(_))));
}

#[tokio::test]
async fn cancelled_order_is_rejected() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let order = signed_order(&setup, &fixture, &OrderParams::new(price())).await;

    setup.ledger.cancel_order(order.data()).await.unwrap();
    let result = Invoker::new(&setup.ledger, GAS_LIMIT)
        .fill(&order, price(), setup.parties.taker)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::NotFillable {
            status: OrderStatus::Cancelled,
            ..
        })
    ));
}

#[tokio::test]
async fn order_restricted_to_other_taker_is_rejected() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let restricted_to = setup.keyring.accounts()[3];
    let params = OrderParams::new(price()).with_taker(restricted_to);
    let order = signed_order(&setup, &fixture, &params).await;
    assert_eq!(order.data().taker, restricted_to);

    let result = setup
        .ledger
        .fill_order(&order, price(), setup.parties.taker, GAS_LIMIT)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::InvalidTaker { expected, actual })
            if expected == restricted_to && actual == setup.parties.taker
    ));
}

#[tokio::test]
async fn unauthorized_taker_leaves_state_unchanged() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let order = signed_order(&setup, &fixture, &OrderParams::new(price())).await;

    // Holds wrapped tokens but never approved the transfer agent.
    let outsider = setup.keyring.accounts()[3];
    setup.ledger.wrap_native(outsider, 1u64.eth()).await.unwrap();

    let payment_before = setup.ledger.balance(fixture.payment, outsider).await.unwrap();
    let before = Snapshot::take(&setup.ledger, &fixture).await.unwrap();

    let result = setup
        .ledger
        .fill_order(&order, price(), outsider, GAS_LIMIT)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::InsufficientAuthorization { asset, owner })
            if asset == fixture.payment && owner == outsider
    ));

    assert_eq!(Snapshot::take(&setup.ledger, &fixture).await.unwrap(), before);
    assert_eq!(
        setup.ledger.balance(fixture.payment, outsider).await.unwrap(),
        payment_before
    );
    let info = setup.ledger.order_info(order.data()).await.unwrap();
    assert_eq!(info.status, OrderStatus::Fillable);
    assert!(info.taker_asset_filled_amount.is_zero());
}

#[tokio::test]
async fn taker_without_funds_is_rejected() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let params = OrderParams::new(2u64.eth());
    let order = signed_order(&setup, &fixture, &params).await;

    let result = setup
        .ledger
        .fill_order(&order, 2u64.eth(), setup.parties.taker, GAS_LIMIT)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::InsufficientBalance { owner, .. }) if owner == setup.parties.taker
    ));
    assert_eq!(
        setup
            .ledger
            .balance(fixture.collectible, setup.parties.maker)
            .await
            .unwrap(),
        U256::from(1)
    );
}

#[tokio::test]
async fn fees_are_paid_in_fee_token() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let fee_recipient = Address::repeat_byte(0xfe);
    let fee_token = AssetData::Erc20 {
        token: GANACHE_DEPLOYMENT.fee_token,
    };
    setup
        .ledger
        .mint_token(GANACHE_DEPLOYMENT.fee_token, setup.parties.maker, U256::from(100));
    setup
        .ledger
        .approve_unlimited(GANACHE_DEPLOYMENT.fee_token, setup.parties.maker)
        .await
        .unwrap();

    let order = build_order(&setup.ledger, &fixture, &OrderParams::new(price()))
        .await
        .unwrap();
    let order = model::order::OrderBuilder::default()
        .with_exchange(order.exchange)
        .with_maker(order.maker)
        .with_fee_recipient(fee_recipient)
        .with_maker_asset(order.maker_asset_data, order.maker_asset_amount)
        .with_taker_asset(order.taker_asset_data, order.taker_asset_amount)
        .with_fees(U256::from(30), U256::ZERO)
        .with_expiration(order.expiration_time_seconds)
        .with_random_salt()
        .build()
        .unwrap();
    let order = setup
        .keyring
        .sign(order, EcdsaSigningScheme::Eip712)
        .unwrap();

    let results = setup
        .ledger
        .fill_order(&order, price(), setup.parties.taker, GAS_LIMIT)
        .await
        .unwrap();
    assert_eq!(results.maker_fee_paid, U256::from(30));
    assert_eq!(
        setup.ledger.balance(fee_token, fee_recipient).await.unwrap(),
        U256::from(30)
    );
    assert_eq!(
        setup
            .ledger
            .balance(fee_token, setup.parties.maker)
            .await
            .unwrap(),
        U256::from(70)
    );
}

#[tokio::test]
async fn failed_fixture_step_aborts_setup() {
    let setup = setup();
    let config = FixtureConfig {
        collectible: CollectibleSource::Existing(Address::repeat_byte(0xcc)),
        wrap_amount: 1u64.eth(),
    };
    let result = Fixture::setup(&setup.ledger, &setup.ledger, setup.parties, &config).await;
    assert!(matches!(result, Err(Error::Setup(_))));

    let config = FixtureConfig {
        collectible: CollectibleSource::Existing(setup.ledger.create_collection(setup.parties.deployer)),
        wrap_amount: 1_000u64.eth(),
    };
    let result = Fixture::setup(&setup.ledger, &setup.ledger, setup.parties, &config).await;
    assert!(matches!(result, Err(Error::Setup(_))));
}

#[tokio::test]
async fn preconditions_fail_when_taker_already_holds_collectible() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    setup
        .ledger
        .mint(
            fixture.collection,
            setup.parties.deployer,
            setup.parties.taker,
            U256::from(1),
        )
        .await
        .unwrap();

    let snapshot = Snapshot::take(&setup.ledger, &fixture).await.unwrap();
    assert!(matches!(
        assertions::expect_preconditions(&snapshot),
        Err(Error::Assertion(_))
    ));
}

#[tokio::test]
async fn deploys_collection_from_bytecode() {
    let setup = setup();
    let collection = setup
        .ledger
        .deploy(setup.parties.deployer, Bytes::from_static(&[0x60, 0x80]))
        .await
        .unwrap();
    setup
        .ledger
        .approve_collection(collection, setup.parties.maker)
        .await
        .unwrap();
}

/// The rejected fill moved nothing and left the order fillable.
async fn assert_untouched(setup: &Setup, fixture: &Fixture, order: &SignedOrder, before: Snapshot) {
    assert_eq!(Snapshot::take(&setup.ledger, fixture).await.unwrap(), before);
    let info = setup.ledger.order_info(order.data()).await.unwrap();
    assert_eq!(info.status, OrderStatus::Fillable);
    assert!(info.taker_asset_filled_amount.is_zero());
}

#[tokio::test]
async fn maker_without_collectible_is_rejected() {
    let setup = setup();
    let fixture = fixture(&setup).await;
    let sold = signed_order(&setup, &fixture, &OrderParams::new(price())).await;
    let resold = signed_order(&setup, &fixture, &OrderParams::new(price())).await;

    // The first order already moved the only token to the taker.
    Invoker::new(&setup.ledger, GAS_LIMIT)
        .fill(&sold, price(), setup.parties.taker)
        .await
        .unwrap();
    let before = Snapshot::take(&setup.ledger, &fixture).await.unwrap();
    assert_eq!(before.collectible.maker, U256::ZERO);

    let result = Invoker::new(&setup.ledger, GAS_LIMIT)
        .fill(&resold, price(), setup.parties.taker)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::InsufficientBalance { asset, owner })
            if asset == fixture.collectible && owner == setup.parties.maker
    ));
    assert_untouched(&setup, &fixture, &resold, before).await;
}

#[tokio::test]
async fn maker_without_collection_approval_is_rejected() {
    let setup = setup();
    let Parties {
        maker,
        taker,
        deployer,
    } = setup.parties;
    let collection = setup.ledger.create_collection(deployer);
    let token_id = token_id_for(maker);
    setup
        .ledger
        .mint(collection, deployer, maker, token_id)
        .await
        .unwrap();
    let weth = GANACHE_DEPLOYMENT.weth;
    setup.ledger.approve_unlimited(weth, taker).await.unwrap();
    setup.ledger.wrap_native(taker, 1u64.eth()).await.unwrap();
    let fixture = Fixture {
        parties: setup.parties,
        collection,
        token_id,
        collectible: AssetData::Erc721 {
            token: collection,
            token_id,
        },
        payment: AssetData::Erc20 { token: weth },
    };

    let order = signed_order(&setup, &fixture, &OrderParams::new(price())).await;
    let before = Snapshot::take(&setup.ledger, &fixture).await.unwrap();
    assertions::expect_preconditions(&before).unwrap();

    let result = Invoker::new(&setup.ledger, GAS_LIMIT)
        .fill(&order, price(), taker)
        .await;
    assert!(matches!(
        result,
        Err(SettlementError::InsufficientAuthorization { asset, owner })
            if asset == fixture.collectible && owner == maker
    ));
    assert_untouched(&setup, &fixture, &order, before).await;
}
