use {
    crate::nodes::{NODE_HOST, local_node::Resetter},
    alloy::providers::{DynProvider, Provider, ProviderBuilder},
    contracts::alloy::networks,
    futures::FutureExt,
    harness::{
        arguments::GANACHE_MNEMONIC,
        fixture::{CollectibleSource, FixtureConfig, Parties},
        onchain::{NodeConfig, OnchainSystem},
        signer::Keyring,
    },
    number::EthUnit,
    std::{
        future::Future,
        panic::{self, AssertUnwindSafe},
        sync::Mutex,
    },
};

/// Maker, taker, deployer and one account without any role.
const ACCOUNTS: u32 = 4;

static NODE_MUTEX: Mutex<()> = Mutex::new(());

/// Everything a test needs to drive the settlement system on the node.
pub struct Onchain {
    pub system: OnchainSystem,
    pub keyring: Keyring,
    pub parties: Parties,
    /// An account that is neither maker, taker nor deployer.
    pub outsider: alloy::primitives::Address,
}

impl Onchain {
    pub fn provider(&self) -> &DynProvider {
        self.system.provider()
    }

    /// Collection from `ERC721_ADDRESS` or, if unset, deployed from the
    /// artifact at `ERC721_ARTIFACT`.
    pub fn fixture_config(&self) -> FixtureConfig {
        let collectible = match (
            std::env::var("ERC721_ADDRESS"),
            std::env::var("ERC721_ARTIFACT"),
        ) {
            (Ok(address), _) => {
                CollectibleSource::Existing(address.parse().expect("invalid ERC721_ADDRESS"))
            }
            (_, Ok(path)) => CollectibleSource::Artifact(path.into()),
            _ => panic!("set ERC721_ADDRESS or ERC721_ARTIFACT to run e2e tests"),
        };
        FixtureConfig {
            collectible,
            wrap_amount: 1u64.eth(),
        }
    }
}

fn keyring() -> Keyring {
    Keyring::from_mnemonic(GANACHE_MNEMONIC, ACCOUNTS).expect("invalid test mnemonic")
}

/// *Testing* function that takes a closure and runs it on a local testing
/// node. Before each test, it creates a snapshot of the current state of the
/// chain. The saved state is restored at the end of the test.
///
/// This function also intializes tracing and sets panic hook.
///
/// Note that tests calling with this function will not be run simultaneously.
pub async fn run_test<F, Fut>(f: F)
where
    F: FnOnce(Onchain) -> Fut,
    Fut: Future<Output = ()>,
{
    let filters = ["warn", "e2e=debug", "harness=debug"].join(",");
    observe::tracing::initialize_reentrant(&observe::Config::default().with_env_filter(&filters));

    // The mutex guarantees that no more than a test at a time is running on
    // the testing node.
    // Note that the mutex is expected to become poisoned if a test panics. This
    // is not relevant for us as we are not interested in the data stored in
    // it but rather in the locked state.
    let _lock = NODE_MUTEX.lock();

    let keyring = keyring();
    let url: url::Url = NODE_HOST.parse().unwrap();
    let provider = ProviderBuilder::new()
        .wallet(keyring.wallet().unwrap())
        .connect_http(url.clone())
        .erased();
    let resetter = Resetter::new(&provider).await;

    let config = NodeConfig {
        url,
        network_id: networks::GANACHE,
        exchange: None,
        weth: None,
    };
    let system = OnchainSystem::new(provider, &config)
        .await
        .expect("node does not run the exchange snapshot");
    let onchain = Onchain {
        system,
        parties: keyring.parties().unwrap(),
        outsider: keyring.accounts()[3],
        keyring,
    };

    // Hack: the closure may actually be unwind unsafe; moreover, `catch_unwind`
    // does not catch some types of panics. In this cases, the state of the node
    // is not restored. This is not considered an issue since this function
    // is supposed to be used in a test environment.
    let result = AssertUnwindSafe(f(onchain)).catch_unwind().await;

    resetter.reset().await;

    if let Err(err) = result {
        panic::resume_unwind(err);
    }
}
