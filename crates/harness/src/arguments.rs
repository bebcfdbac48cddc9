use {
    alloy::primitives::{Address, U256},
    clap::{Parser, ValueEnum},
    model::signature::EcdsaSigningScheme,
    std::{path::PathBuf, time::Duration},
    url::Url,
};

/// Mnemonic of the accounts pre-funded in the ganache snapshot.
pub const GANACHE_MNEMONIC: &str =
    "concert load couple harbor equip island argue ramp clarify fence smart topic";

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Backend {
    /// Settle against the contracts on a node.
    Node,
    /// Settle against an in-memory emulation of the contracts.
    InMemory,
}

#[derive(Debug, clap::Args)]
pub struct Logging {
    /// Log filter directives, see
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    #[clap(long, env, default_value = "warn,harness=debug,observe=info")]
    pub log_filter: String,

    /// Events at this level or more severe are written to stderr.
    #[clap(long, env)]
    pub log_stderr_threshold: Option<tracing::Level>,

    /// Write logs as JSON objects.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,
}

#[derive(Debug, Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: Logging,

    #[clap(long, env, value_enum, default_value = "node")]
    pub backend: Backend,

    /// The Ethereum node URL to connect to.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// Network id the node has to report. The default is the ganache
    /// snapshot with the exchange contracts deployed.
    #[clap(long, env, default_value = "50")]
    pub network_id: u64,

    /// Mnemonic of the accounts, used in the order maker, taker, deployer.
    #[clap(long, env, default_value = GANACHE_MNEMONIC)]
    pub mnemonic: String,

    /// Exchange address, defaults to the known deployment of the network.
    #[clap(long, env)]
    pub exchange: Option<Address>,

    /// Wrapped native token address, defaults to the known deployment of the
    /// network.
    #[clap(long, env)]
    pub weth: Option<Address>,

    /// Already deployed collection the deployer can mint from.
    #[clap(long, env, conflicts_with = "erc721_artifact")]
    pub erc721: Option<Address>,

    /// Compiled collection artifact to deploy.
    #[clap(long, env)]
    pub erc721_artifact: Option<PathBuf>,

    /// Price of the collectible in units of the wrapped native token.
    #[clap(long, env, default_value = "0.1", value_parser = parse_ether)]
    pub taker_asset_amount: U256,

    /// How much of the taker's native balance gets wrapped for paying.
    #[clap(long, env, default_value = "1", value_parser = parse_ether)]
    pub wrap_amount: U256,

    /// How long the order stays fillable.
    #[clap(long, env, default_value = "10m", value_parser = humantime::parse_duration)]
    pub expiration_window: Duration,

    /// Gas ceiling of the settlement transaction.
    #[clap(long, env, default_value = "400000")]
    pub fill_gas_limit: u64,

    #[clap(long, env, default_value = "ethsign")]
    pub signing_scheme: EcdsaSigningScheme,
}

fn parse_ether(s: &str) -> anyhow::Result<U256> {
    number::to_base_units(s, 18)
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            logging,
            backend,
            node_url,
            network_id,
            mnemonic: _,
            exchange,
            weth,
            erc721,
            erc721_artifact,
            taker_asset_amount,
            wrap_amount,
            expiration_window,
            fill_gas_limit,
            signing_scheme,
        } = self;

        writeln!(f, "log_filter: {}", logging.log_filter)?;
        writeln!(f, "log_stderr_threshold: {:?}", logging.log_stderr_threshold)?;
        writeln!(f, "use_json_logs: {}", logging.use_json_logs)?;
        writeln!(f, "backend: {backend:?}")?;
        writeln!(f, "node_url: {node_url}")?;
        writeln!(f, "network_id: {network_id}")?;
        writeln!(f, "mnemonic: SECRET")?;
        writeln!(f, "exchange: {exchange:?}")?;
        writeln!(f, "weth: {weth:?}")?;
        writeln!(f, "erc721: {erc721:?}")?;
        writeln!(f, "erc721_artifact: {erc721_artifact:?}")?;
        writeln!(f, "taker_asset_amount: {taker_asset_amount}")?;
        writeln!(f, "wrap_amount: {wrap_amount}")?;
        writeln!(f, "expiration_window: {expiration_window:?}")?;
        writeln!(f, "fill_gas_limit: {fill_gas_limit}")?;
        writeln!(f, "signing_scheme: {signing_scheme}")?;
        Ok(())
    }
}
