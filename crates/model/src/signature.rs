use {
    alloy::primitives::{self, Address, B256, U256, uint},
    serde::{Deserialize, Serialize, de},
    std::fmt::{self, Debug, Formatter},
};

/// An ECDSA signature in the compact two word form of EIP-2098.
///
/// `vs` packs the `s` scalar into its low 255 bits and the recovery parity
/// into its top bit.
///
/// https://eips.ethereum.org/EIPS/eip-2098
#[derive(Eq, PartialEq, Clone, Copy, Default, Hash)]
pub struct CompactSignature {
    pub r: B256,
    pub vs: B256,
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("unable to recover signer: {0}")]
    Unrecoverable(#[from] primitives::SignatureError),
    #[error("signature s value is in the upper half of the curve order")]
    HighS,
    #[error("signature recovers to the zero address")]
    ZeroSigner,
    #[error("recovered signer {recovered} is not {expected}")]
    UnexpectedSigner {
        expected: Address,
        recovered: Address,
    },
}

impl CompactSignature {
    const PARITY_BIT: usize = 255;
    /// Half the order of secp256k1. Larger `s` values are the malleable twin
    /// of a valid signature.
    const S_MAX: U256 =
        uint!(0x7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0_U256);

    /// r ‖ vs
    pub fn to_bytes(self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..].copy_from_slice(self.vs.as_slice());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self {
            r: B256::from_slice(&bytes[..32]),
            vs: B256::from_slice(&bytes[32..]),
        }
    }

    pub fn from_signature(signature: &primitives::Signature) -> Self {
        let mut vs = signature.s();
        if signature.v() {
            vs |= U256::from(1) << Self::PARITY_BIT;
        }
        Self {
            r: B256::from(signature.r().to_be_bytes::<32>()),
            vs: B256::from(vs.to_be_bytes::<32>()),
        }
    }

    /// Expands the signature into `r`, `s` and the recovery parity.
    pub fn to_signature(self) -> primitives::Signature {
        let vs = U256::from_be_bytes(self.vs.0);
        let y_parity = vs.bit(Self::PARITY_BIT);
        let s = vs & (U256::MAX >> 1);
        primitives::Signature::new(U256::from_be_bytes(self.r.0), s, y_parity)
    }

    /// Recovers the address that signed `hash`. Only the low `s` form of a
    /// signature is accepted.
    pub fn recover(&self, hash: &B256) -> Result<Address, SignatureError> {
        let signature = self.to_signature();
        if signature.s() > Self::S_MAX {
            return Err(SignatureError::HighS);
        }
        let signer = signature.recover_address_from_prehash(hash)?;
        if signer.is_zero() {
            return Err(SignatureError::ZeroSigner);
        }
        Ok(signer)
    }

    /// Recovers the signer and checks that it is `expected`.
    pub fn verify(&self, hash: &B256, expected: Address) -> Result<(), SignatureError> {
        let recovered = self.recover(hash)?;
        if recovered != expected {
            return Err(SignatureError::UnexpectedSigner {
                expected,
                recovered,
            });
        }
        Ok(())
    }

    #[cfg(any(test, feature = "test-util"))]
    pub fn sign(hash: &B256, signer: &alloy::signers::local::PrivateKeySigner) -> Self {
        use alloy::signers::SignerSync;
        // Signing a 32 byte prehash with a valid key can't fail.
        let signature = signer.sign_hash_sync(hash).unwrap();
        Self::from_signature(&signature)
    }
}

impl Debug for CompactSignature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("CompactSignature")
            .field(&const_hex::encode_prefixed(self.to_bytes()))
            .finish()
    }
}

impl Serialize for CompactSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&const_hex::encode_prefixed(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for CompactSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;
        impl de::Visitor<'_> for Visitor {
            type Value = CompactSignature;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "the 64 compact signature bytes as a hex encoded string, ordered as r, vs"
                )
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let s = s.strip_prefix("0x").ok_or_else(|| {
                    de::Error::custom(format!(
                        "{s:?} can't be decoded as hex signature because it does not start with \
                         '0x'"
                    ))
                })?;
                let mut bytes = [0u8; 64];
                const_hex::decode_to_slice(s, &mut bytes).map_err(|err| {
                    de::Error::custom(format!("failed to decode {s:?} as hex signature: {err}"))
                })?;
                Ok(CompactSignature::from_bytes(&bytes))
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}
