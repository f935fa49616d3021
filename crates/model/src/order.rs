//! The signed limit order and its EIP-712 hashing.

use {
    crate::{DomainSeparator, extension::Extension, hashed_eip712_message, traits::MakerTraits},
    alloy::primitives::{Address, B256, U256, b256, keccak256},
    number::serialization::HexOrDecimalU256,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// The exact fields that get signed by the maker.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde_as(as = "HexOrDecimalU256")]
    pub salt: U256,
    pub maker: Address,
    /// Receives the taker asset. The zero address means the maker.
    #[serde(default)]
    pub receiver: Address,
    pub maker_asset: Address,
    pub taker_asset: Address,
    #[serde_as(as = "HexOrDecimalU256")]
    pub making_amount: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub taking_amount: U256,
    #[serde(default)]
    pub maker_traits: MakerTraits,
}

impl Order {
    /// `keccak256("Order(uint256 salt,address maker,address receiver,address makerAsset,address takerAsset,uint256 makingAmount,uint256 takingAmount,uint256 makerTraits)")`
    pub const TYPE_HASH: B256 =
        b256!("3af21ec5a20011b88d3b7b4ed7c806cef05a5980cf34974bcd53566a131f7e4c");

    /// Returns the value of hashStruct() over the order as defined by EIP-712.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712#definition-of-hashstruct
    pub fn hash_struct(&self) -> B256 {
        let mut hash_data = [0u8; 288];
        hash_data[0..32].copy_from_slice(Self::TYPE_HASH.as_slice());
        hash_data[32..64].copy_from_slice(&self.salt.to_be_bytes::<32>());
        // Addresses are left padded to a full word.
        hash_data[76..96].copy_from_slice(self.maker.as_slice());
        hash_data[108..128].copy_from_slice(self.receiver.as_slice());
        hash_data[140..160].copy_from_slice(self.maker_asset.as_slice());
        hash_data[172..192].copy_from_slice(self.taker_asset.as_slice());
        hash_data[192..224].copy_from_slice(&self.making_amount.to_be_bytes::<32>());
        hash_data[224..256].copy_from_slice(&self.taking_amount.to_be_bytes::<32>());
        hash_data[256..288].copy_from_slice(&self.maker_traits.0.to_be_bytes::<32>());
        keccak256(hash_data)
    }

    /// The digest the maker signs. Doubles as the order's identity.
    pub fn hash(&self, domain: &DomainSeparator) -> B256 {
        hashed_eip712_message(domain, &self.hash_struct())
    }

    /// Where the taker asset is delivered.
    pub fn receiver(&self) -> Address {
        if self.receiver.is_zero() {
            self.maker
        } else {
            self.receiver
        }
    }

    pub fn builder() -> OrderBuilder {
        OrderBuilder::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct OrderBuilder(Order);

impl OrderBuilder {
    pub fn with_salt(mut self, salt: U256) -> Self {
        self.0.salt = salt;
        self
    }

    pub fn with_maker(mut self, maker: Address) -> Self {
        self.0.maker = maker;
        self
    }

    pub fn with_receiver(mut self, receiver: Address) -> Self {
        self.0.receiver = receiver;
        self
    }

    pub fn with_maker_asset(mut self, maker_asset: Address) -> Self {
        self.0.maker_asset = maker_asset;
        self
    }

    pub fn with_taker_asset(mut self, taker_asset: Address) -> Self {
        self.0.taker_asset = taker_asset;
        self
    }

    pub fn with_making_amount(mut self, making_amount: U256) -> Self {
        self.0.making_amount = making_amount;
        self
    }

    pub fn with_taking_amount(mut self, taking_amount: U256) -> Self {
        self.0.taking_amount = taking_amount;
        self
    }

    pub fn with_maker_traits(mut self, maker_traits: MakerTraits) -> Self {
        self.0.maker_traits = maker_traits;
        self
    }

    /// Binds the extension to the order: replaces the low 160 bits of the
    /// salt with the extension hash and sets the extension flag. Call after
    /// [`Self::with_salt`] and [`Self::with_maker_traits`].
    pub fn with_extension(mut self, extension: &[u8]) -> Self {
        let low_bits: U256 = (U256::from(1) << 160) - U256::from(1);
        self.0.salt = (self.0.salt & !low_bits) | Extension::hash(extension);
        self.0.maker_traits = self.0.maker_traits.with_extension();
        self
    }

    pub fn build(self) -> Order {
        self.0
    }
}
