use {
    crate::{error::SigningError, fixture::Parties},
    alloy::{
        network::EthereumWallet,
        primitives::Address,
        signers::local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
    },
    anyhow::{Context as _, Result, ensure},
    model::{
        order::{OrderData, SignedOrder},
        signature::EcdsaSigningScheme,
    },
    std::collections::HashMap,
};

/// Signing keys of the accounts taking part in a run, in the node's account
/// order.
#[derive(Clone, Debug, Default)]
pub struct Keyring {
    accounts: Vec<Address>,
    signers: HashMap<Address, PrivateKeySigner>,
}

impl Keyring {
    pub fn new(signers: impl IntoIterator<Item = PrivateKeySigner>) -> Self {
        let mut keyring = Self::default();
        for signer in signers {
            keyring.add(signer);
        }
        keyring
    }

    /// Derives the first `count` accounts of a BIP-39 mnemonic on the default
    /// `m/44'/60'/0'/0/{index}` path, which is also what development nodes
    /// use for their unlocked accounts.
    pub fn from_mnemonic(phrase: &str, count: u32) -> Result<Self> {
        let signers = (0..count)
            .map(|index| {
                MnemonicBuilder::<English>::default()
                    .phrase(phrase)
                    .index(index)?
                    .build()
                    .with_context(|| format!("failed to derive account {index} from mnemonic"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(signers))
    }

    fn add(&mut self, signer: PrivateKeySigner) {
        let address = signer.address();
        if self.signers.insert(address, signer).is_none() {
            self.accounts.push(address);
        }
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    /// Assigns roles by account order: maker, taker, deployer.
    pub fn parties(&self) -> Result<Parties> {
        ensure!(
            self.accounts.len() >= 3,
            "need at least 3 accounts, got {}",
            self.accounts.len()
        );
        Ok(Parties {
            maker: self.accounts[0],
            taker: self.accounts[1],
            deployer: self.accounts[2],
        })
    }

    pub fn signer(&self, address: Address) -> Option<&PrivateKeySigner> {
        self.signers.get(&address)
    }

    /// Wallet that can sign transactions for every account in the keyring.
    pub fn wallet(&self) -> Result<EthereumWallet> {
        let mut signers = self.accounts.iter().filter_map(|a| self.signers.get(a));
        let first = signers.next().context("keyring is empty")?;
        let mut wallet = EthereumWallet::from(first.clone());
        for signer in signers {
            wallet.register_signer(signer.clone());
        }
        Ok(wallet)
    }

    /// Signs the order as its declared maker.
    pub fn sign(
        &self,
        order: OrderData,
        scheme: EcdsaSigningScheme,
    ) -> Result<SignedOrder, SigningError> {
        self.sign_as(order.maker, order, scheme)
    }

    /// Signs the order with the key of `signer`, which does not have to be
    /// the maker.
    pub fn sign_as(
        &self,
        signer: Address,
        order: OrderData,
        scheme: EcdsaSigningScheme,
    ) -> Result<SignedOrder, SigningError> {
        let key = self
            .signers
            .get(&signer)
            .ok_or(SigningError::NoSigner(signer))?;
        SignedOrder::sign(order, scheme, key).map_err(SigningError::Failed)
    }
}
