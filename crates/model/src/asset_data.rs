//! Asset descriptors as understood by the exchange's asset proxies.
//!
//! An asset descriptor is the ABI encoding of a call to one of the
//! `IAssetData` functions below. The 4 byte selector doubles as the id of the
//! asset proxy that is able to transfer the asset.

use {
    alloy::{
        primitives::{Address, Bytes, U256},
        sol_types::SolCall,
    },
    anyhow::{Context as _, Result, bail},
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::fmt::{self, Display, Formatter},
};

alloy::sol! {
    interface IAssetData {
        function ERC20Token(address tokenContract) external;
        function ERC721Token(address tokenContract, uint256 tokenId) external;
    }
}

/// Proxy id of the ERC20 asset proxy.
pub const ERC20_PROXY_ID: [u8; 4] = IAssetData::ERC20TokenCall::SELECTOR;

/// Proxy id of the ERC721 asset proxy.
pub const ERC721_PROXY_ID: [u8; 4] = IAssetData::ERC721TokenCall::SELECTOR;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AssetData {
    /// A fungible token, amounts are in the token's base unit.
    Erc20 { token: Address },
    /// A single non-fungible token. The only valid amount is 1.
    Erc721 { token: Address, token_id: U256 },
}

impl AssetData {
    pub fn encode(&self) -> Bytes {
        let encoded = match *self {
            Self::Erc20 { token } => IAssetData::ERC20TokenCall {
                tokenContract: token,
            }
            .abi_encode(),
            Self::Erc721 { token, token_id } => IAssetData::ERC721TokenCall {
                tokenContract: token,
                tokenId: token_id,
            }
            .abi_encode(),
        };
        encoded.into()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let Some(selector) = data.get(..4) else {
            bail!("asset data is shorter than a proxy id");
        };
        match <[u8; 4]>::try_from(selector)? {
            ERC20_PROXY_ID => {
                let call = IAssetData::ERC20TokenCall::abi_decode(data)
                    .context("malformed ERC20 asset data")?;
                Ok(Self::Erc20 {
                    token: call.tokenContract,
                })
            }
            ERC721_PROXY_ID => {
                let call = IAssetData::ERC721TokenCall::abi_decode(data)
                    .context("malformed ERC721 asset data")?;
                Ok(Self::Erc721 {
                    token: call.tokenContract,
                    token_id: call.tokenId,
                })
            }
            unknown => bail!(
                "unsupported asset proxy id {}",
                const_hex::encode_prefixed(unknown)
            ),
        }
    }

    /// Address of the token contract.
    pub fn token(&self) -> Address {
        match *self {
            Self::Erc20 { token } | Self::Erc721 { token, .. } => token,
        }
    }

    pub fn is_fungible(&self) -> bool {
        matches!(self, Self::Erc20 { .. })
    }
}

impl Display for AssetData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Erc20 { token } => write!(f, "ERC20({token})"),
            Self::Erc721 { token, token_id } => write!(f, "ERC721({token}, #{token_id})"),
        }
    }
}

impl Serialize for AssetData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&const_hex::encode_prefixed(self.encode()))
    }
}

impl<'de> Deserialize<'de> for AssetData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = const_hex::decode(&s).map_err(|err| {
            de::Error::custom(format!("failed to decode {s:?} as hex asset data: {err}"))
        })?;
        Self::decode(&bytes).map_err(|err| de::Error::custom(format!("{err:#}")))
    }
}
