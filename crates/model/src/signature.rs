use {
    alloy::{
        primitives::{Address, B256, U256},
        signers::{SignerSync, local::PrivateKeySigner},
    },
    anyhow::{Context as _, Result, bail, ensure},
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::{
        fmt::{self, Debug, Display, Formatter},
        str::FromStr,
    },
};

/// Signature types understood by the exchange. The type is encoded as the
/// last byte of a signature.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum SignatureType {
    Illegal = 0,
    Invalid = 1,
    Eip712 = 2,
    EthSign = 3,
    Wallet = 4,
    Validator = 5,
    PreSigned = 6,
}

impl TryFrom<u8> for SignatureType {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Illegal,
            1 => Self::Invalid,
            2 => Self::Eip712,
            3 => Self::EthSign,
            4 => Self::Wallet,
            5 => Self::Validator,
            6 => Self::PreSigned,
            _ => bail!("unknown signature type {value}"),
        })
    }
}

/// Schemes for which the order maker produces an ECDSA signature off-chain.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EcdsaSigningScheme {
    /// The order hash is signed directly as EIP-712 typed data.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712
    Eip712,
    /// The order hash is signed according to EIP-191's personal_sign format,
    /// which is what a node's `eth_sign` produces.
    ///
    /// https://eips.ethereum.org/EIPS/eip-191
    #[default]
    EthSign,
}

impl EcdsaSigningScheme {
    pub fn signature_type(self) -> SignatureType {
        match self {
            Self::Eip712 => SignatureType::Eip712,
            Self::EthSign => SignatureType::EthSign,
        }
    }
}

impl FromStr for EcdsaSigningScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eip712" => Ok(Self::Eip712),
            "ethsign" => Ok(Self::EthSign),
            _ => bail!("unknown signing scheme {s:?}, expected eip712 or ethsign"),
        }
    }
}

impl Display for EcdsaSigningScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eip712 => "eip712",
            Self::EthSign => "ethsign",
        })
    }
}

/// Signature over an order hash.
#[derive(Eq, PartialEq, Clone, Copy, Hash)]
pub enum Signature {
    Eip712(EcdsaSignature),
    EthSign(EcdsaSignature),
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let scheme = format!("{:?}", self.scheme());
        let bytes = const_hex::encode_prefixed(self.to_bytes());
        f.debug_tuple(&scheme).field(&bytes).finish()
    }
}

impl Signature {
    pub fn scheme(&self) -> EcdsaSigningScheme {
        match self {
            Self::Eip712(_) => EcdsaSigningScheme::Eip712,
            Self::EthSign(_) => EcdsaSigningScheme::EthSign,
        }
    }

    pub fn ecdsa(&self) -> &EcdsaSignature {
        match self {
            Self::Eip712(signature) | Self::EthSign(signature) => signature,
        }
    }

    /// Recovers the address that signed `hash`.
    pub fn recover(&self, hash: &B256) -> Result<Address> {
        self.ecdsa().recover(self.scheme(), hash)
    }

    /// v + r + s + signature type
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(66);
        bytes.extend_from_slice(&self.ecdsa().to_bytes());
        bytes.push(self.scheme().signature_type() as u8);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (&kind, ecdsa) = bytes.split_last().context("empty signature")?;
        let ecdsa: &[u8; 65] = ecdsa
            .try_into()
            .context("ECDSA signature must be 65 bytes long")?;
        let ecdsa = EcdsaSignature::from_bytes(ecdsa);
        match SignatureType::try_from(kind)? {
            SignatureType::Eip712 => Ok(Self::Eip712(ecdsa)),
            SignatureType::EthSign => Ok(Self::EthSign(ecdsa)),
            other => bail!("unsupported signature type {other:?}"),
        }
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&const_hex::encode_prefixed(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = const_hex::decode(&s).map_err(|err| {
            de::Error::custom(format!("failed to decode {s:?} as hex signature: {err}"))
        })?;
        Self::from_bytes(&bytes).map_err(|err| de::Error::custom(format!("{err:#}")))
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Hash)]
pub struct EcdsaSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl EcdsaSignature {
    pub fn to_signature(self, scheme: EcdsaSigningScheme) -> Signature {
        match scheme {
            EcdsaSigningScheme::Eip712 => Signature::Eip712(self),
            EcdsaSigningScheme::EthSign => Signature::EthSign(self),
        }
    }

    /// v + r + s
    pub fn to_bytes(self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0] = self.v;
        bytes[1..33].copy_from_slice(self.r.as_slice());
        bytes[33..65].copy_from_slice(self.s.as_slice());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        EcdsaSignature {
            v: bytes[0],
            r: B256::from_slice(&bytes[1..33]),
            s: B256::from_slice(&bytes[33..65]),
        }
    }

    pub fn sign(
        scheme: EcdsaSigningScheme,
        hash: &B256,
        signer: &PrivateKeySigner,
    ) -> Result<Self> {
        let signature = match scheme {
            EcdsaSigningScheme::Eip712 => signer.sign_hash_sync(hash)?,
            EcdsaSigningScheme::EthSign => signer.sign_message_sync(hash.as_slice())?,
        };
        Ok(Self {
            v: 27 + u8::from(signature.v()),
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
        })
    }

    pub fn recover(&self, scheme: EcdsaSigningScheme, hash: &B256) -> Result<Address> {
        let y_parity = match self.v {
            0 | 27 => false,
            1 | 28 => true,
            v => bail!("invalid recovery id {v}"),
        };
        let signature = alloy::primitives::Signature::new(
            U256::from_be_bytes(self.r.0),
            U256::from_be_bytes(self.s.0),
            y_parity,
        );
        let signer = match scheme {
            EcdsaSigningScheme::Eip712 => signature.recover_address_from_prehash(hash),
            EcdsaSigningScheme::EthSign => signature.recover_address_from_msg(hash.as_slice()),
        }
        .context("unexpectedly invalid signature")?;
        ensure!(!signer.is_zero(), "signature recovered to the zero address");
        Ok(signer)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::keccak256, hex_literal::hex};

    fn signer() -> PrivateKeySigner {
        PrivateKeySigner::from_bytes(&B256::from(hex!(
            "f2f48ee19680706196e2e339e5da3491186e0c4c5030670656b0e0164837257d"
        )))
        .unwrap()
    }

    #[test]
    fn signature_types() {
        assert_eq!(SignatureType::try_from(2).unwrap(), SignatureType::Eip712);
        assert_eq!(SignatureType::try_from(3).unwrap(), SignatureType::EthSign);
        assert!(SignatureType::try_from(7).is_err());
    }

    #[test]
    fn sign_and_recover() {
        let signer = signer();
        let hash = keccak256(b"order");
        for scheme in [EcdsaSigningScheme::Eip712, EcdsaSigningScheme::EthSign] {
            let signature = EcdsaSignature::sign(scheme, &hash, &signer)
                .unwrap()
                .to_signature(scheme);
            assert!(matches!(signature.ecdsa().v, 27 | 28));
            assert_eq!(signature.recover(&hash).unwrap(), signer.address());
        }
    }

    #[test]
    fn schemes_are_not_interchangeable() {
        let signer = signer();
        let hash = keccak256(b"order");
        let signature = EcdsaSignature::sign(EcdsaSigningScheme::EthSign, &hash, &signer).unwrap();
        let recovered = signature.recover(EcdsaSigningScheme::Eip712, &hash);
        assert!(recovered.is_err() || recovered.unwrap() != signer.address());
    }

    #[test]
    fn signature_byte_layout() {
        let signature = Signature::EthSign(EcdsaSignature {
            v: 27,
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
        });
        let bytes = signature.to_bytes();
        assert_eq!(bytes.len(), 66);
        assert_eq!(bytes[0], 27);
        assert_eq!(&bytes[1..33], &[1; 32]);
        assert_eq!(&bytes[33..65], &[2; 32]);
        assert_eq!(bytes[65], 3);
        assert_eq!(Signature::from_bytes(&bytes).unwrap(), signature);
    }

    #[test]
    fn signature_from_bytes_errors() {
        assert!(Signature::from_bytes(&[]).is_err());
        assert!(Signature::from_bytes(&[0u8; 20]).is_err());
        let mut presigned = [0u8; 66];
        presigned[65] = SignatureType::PreSigned as u8;
        assert!(Signature::from_bytes(&presigned).is_err());
    }

    #[test]
    fn invalid_recovery_id() {
        let signature = EcdsaSignature {
            v: 29,
            ..Default::default()
        };
        assert!(
            signature
                .recover(EcdsaSigningScheme::Eip712, &B256::ZERO)
                .is_err()
        );
    }

    #[test]
    fn serializes_as_hex() {
        let signature = Signature::Eip712(EcdsaSignature {
            v: 28,
            r: B256::repeat_byte(0xab),
            s: B256::repeat_byte(0xcd),
        });
        let json = serde_json::to_value(signature).unwrap();
        let expected = format!("0x1c{}{}02", "ab".repeat(32), "cd".repeat(32));
        assert_eq!(json, serde_json::json!(expected));
        assert_eq!(serde_json::from_value::<Signature>(json).unwrap(), signature);
    }

    #[test]
    fn scheme_from_str() {
        assert_eq!(
            "EIP712".parse::<EcdsaSigningScheme>().unwrap(),
            EcdsaSigningScheme::Eip712
        );
        assert_eq!(
            "ethsign".parse::<EcdsaSigningScheme>().unwrap(),
            EcdsaSigningScheme::EthSign
        );
        assert!("presign".parse::<EcdsaSigningScheme>().is_err());
    }
}
