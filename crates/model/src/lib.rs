//! Contains the order model that is shared between the fill engine and the
//! tooling around it: the signed order, its packed trait words, the extension
//! payload and the compact signature.

pub mod extension;
pub mod order;
pub mod signature;
pub mod traits;

pub use {
    extension::Extension,
    order::{Order, OrderBuilder},
    signature::CompactSignature,
    traits::{MakerTraits, TakerTraits},
};

use {
    alloy::primitives::{Address, B256, U256, keccak256},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// The fields of the EIP-712 domain the orders are signed for.
///
/// https://eips.ethereum.org/EIPS/eip-712#definition-of-domainseparator
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            name: "Limit Order Protocol".to_string(),
            version: "4".to_string(),
            chain_id: 1,
            verifying_contract: Address::ZERO,
        }
    }
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct DomainSeparator(pub B256);

impl DomainSeparator {
    /// `keccak256("EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")`
    pub const TYPE_HASH: B256 =
        alloy::primitives::b256!("8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f");

    pub fn new(domain: &Domain) -> Self {
        let mut hash_data = [0u8; 160];
        hash_data[0..32].copy_from_slice(Self::TYPE_HASH.as_slice());
        hash_data[32..64].copy_from_slice(keccak256(domain.name.as_bytes()).as_slice());
        hash_data[64..96].copy_from_slice(keccak256(domain.version.as_bytes()).as_slice());
        hash_data[96..128].copy_from_slice(&U256::from(domain.chain_id).to_be_bytes::<32>());
        hash_data[140..160].copy_from_slice(domain.verifying_contract.as_slice());
        Self(keccak256(hash_data))
    }
}

impl fmt::Debug for DomainSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&const_hex::encode(self.0))
    }
}

/// Returns the digest that is actually signed for a struct hash, i.e.
/// `keccak256("\x19\x01" ‖ domainSeparator ‖ hashStruct(message))`.
pub fn hashed_eip712_message(domain: &DomainSeparator, struct_hash: &B256) -> B256 {
    let mut message = [0u8; 66];
    message[0..2].copy_from_slice(&[0x19, 0x01]);
    message[2..34].copy_from_slice(domain.0.as_slice());
    message[34..66].copy_from_slice(struct_hash.as_slice());
    keccak256(message)
}
