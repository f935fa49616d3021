use {
    super::{FieldOutOfRange, address_low_bits, read_u64, set_flag, write},
    alloy::primitives::{Address, U256},
    serde::{Deserialize, Serialize},
};

/// Packed maker preferences, signed as part of the order.
///
/// High bits are flags:
/// - 255: no partial fills
/// - 254: allow multiple fills
/// - 253: unused
/// - 252: pre-interaction call
/// - 251: post-interaction call
/// - 250: check the epoch manager
/// - 249: has extension
/// - 248: use permit2
/// - 247: unwrap the wrapped native asset
///
/// The low 200 bits hold integer fields:
/// - 0..80: low bits of the allowed sender, zero means anyone may fill
/// - 80..120: expiration timestamp, zero means no expiration
/// - 120..160: nonce or epoch
/// - 160..200: series
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MakerTraits(#[serde(with = "number::serialization::hex_or_decimal")] pub U256);

impl MakerTraits {
    const NO_PARTIAL_FILLS_FLAG: usize = 255;
    const ALLOW_MULTIPLE_FILLS_FLAG: usize = 254;
    const PRE_INTERACTION_CALL_FLAG: usize = 252;
    const POST_INTERACTION_CALL_FLAG: usize = 251;
    const NEED_CHECK_EPOCH_MANAGER_FLAG: usize = 250;
    const HAS_EXTENSION_FLAG: usize = 249;
    const USE_PERMIT2_FLAG: usize = 248;
    const UNWRAP_NATIVE_FLAG: usize = 247;

    const ALLOWED_SENDER_BITS: usize = 80;
    const EXPIRATION_OFFSET: usize = 80;
    const NONCE_OR_EPOCH_OFFSET: usize = 120;
    const SERIES_OFFSET: usize = 160;
    const UINT40_BITS: usize = 40;

    pub fn no_partial_fills(&self) -> bool {
        self.0.bit(Self::NO_PARTIAL_FILLS_FLAG)
    }

    pub fn allow_partial_fills(&self) -> bool {
        !self.no_partial_fills()
    }

    pub fn allow_multiple_fills(&self) -> bool {
        self.0.bit(Self::ALLOW_MULTIPLE_FILLS_FLAG)
    }

    pub fn need_pre_interaction_call(&self) -> bool {
        self.0.bit(Self::PRE_INTERACTION_CALL_FLAG)
    }

    pub fn need_post_interaction_call(&self) -> bool {
        self.0.bit(Self::POST_INTERACTION_CALL_FLAG)
    }

    pub fn need_check_epoch_manager(&self) -> bool {
        self.0.bit(Self::NEED_CHECK_EPOCH_MANAGER_FLAG)
    }

    pub fn has_extension(&self) -> bool {
        self.0.bit(Self::HAS_EXTENSION_FLAG)
    }

    pub fn use_permit2(&self) -> bool {
        self.0.bit(Self::USE_PERMIT2_FLAG)
    }

    pub fn unwrap_native(&self) -> bool {
        self.0.bit(Self::UNWRAP_NATIVE_FLAG)
    }

    /// Single-shot orders are tracked in the maker's bit invalidator instead
    /// of a per-order remaining amount. That is every order that either
    /// forbids partial fills or does not opt into multiple fills.
    pub fn use_bit_invalidator(&self) -> bool {
        !self.allow_partial_fills() || !self.allow_multiple_fills()
    }

    /// The low 80 bits of the only address allowed to fill, or zero.
    pub fn allowed_sender(&self) -> u128 {
        let limbs = self.0.as_limbs();
        let low = u128::from(limbs[0]) | (u128::from(limbs[1]) << 64);
        low & ((1u128 << Self::ALLOWED_SENDER_BITS) - 1)
    }

    pub fn is_allowed_sender(&self, sender: Address) -> bool {
        let allowed = self.allowed_sender();
        allowed == 0 || allowed == address_low_bits(sender)
    }

    pub fn expiration(&self) -> u64 {
        read_u64(self.0, Self::EXPIRATION_OFFSET, Self::UINT40_BITS)
    }

    /// An order expires strictly after its expiration timestamp.
    pub fn is_expired(&self, now: u64) -> bool {
        let expiration = self.expiration();
        expiration != 0 && expiration < now
    }

    pub fn nonce_or_epoch(&self) -> u64 {
        read_u64(self.0, Self::NONCE_OR_EPOCH_OFFSET, Self::UINT40_BITS)
    }

    pub fn series(&self) -> u64 {
        read_u64(self.0, Self::SERIES_OFFSET, Self::UINT40_BITS)
    }

    pub fn decode(&self) -> MakerTraitsFields {
        MakerTraitsFields {
            no_partial_fills: self.no_partial_fills(),
            allow_multiple_fills: self.allow_multiple_fills(),
            pre_interaction: self.need_pre_interaction_call(),
            post_interaction: self.need_post_interaction_call(),
            epoch_check: self.need_check_epoch_manager(),
            has_extension: self.has_extension(),
            use_permit2: self.use_permit2(),
            unwrap_native: self.unwrap_native(),
            series: self.series(),
            nonce_or_epoch: self.nonce_or_epoch(),
            expiration: self.expiration(),
            allowed_sender: self.allowed_sender(),
        }
    }

    /// Copy of the traits with the extension flag set.
    pub fn with_extension(self) -> Self {
        Self(set_flag(self.0, Self::HAS_EXTENSION_FLAG, true))
    }
}

impl From<U256> for MakerTraits {
    fn from(word: U256) -> Self {
        Self(word)
    }
}

/// The decoded form of [`MakerTraits`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MakerTraitsFields {
    pub no_partial_fills: bool,
    pub allow_multiple_fills: bool,
    pub pre_interaction: bool,
    pub post_interaction: bool,
    pub epoch_check: bool,
    pub has_extension: bool,
    pub use_permit2: bool,
    pub unwrap_native: bool,
    pub series: u64,
    pub nonce_or_epoch: u64,
    pub expiration: u64,
    pub allowed_sender: u128,
}

impl MakerTraitsFields {
    /// Restricts the order to fillers whose address ends in the same 80 bits
    /// as `sender`.
    pub fn with_allowed_sender(mut self, sender: Address) -> Self {
        self.allowed_sender = address_low_bits(sender);
        self
    }

    pub fn encode(&self) -> Result<MakerTraits, FieldOutOfRange> {
        let mut word = U256::ZERO;
        word = set_flag(word, MakerTraits::NO_PARTIAL_FILLS_FLAG, self.no_partial_fills);
        word = set_flag(
            word,
            MakerTraits::ALLOW_MULTIPLE_FILLS_FLAG,
            self.allow_multiple_fills,
        );
        word = set_flag(word, MakerTraits::PRE_INTERACTION_CALL_FLAG, self.pre_interaction);
        word = set_flag(word, MakerTraits::POST_INTERACTION_CALL_FLAG, self.post_interaction);
        word = set_flag(word, MakerTraits::NEED_CHECK_EPOCH_MANAGER_FLAG, self.epoch_check);
        word = set_flag(word, MakerTraits::HAS_EXTENSION_FLAG, self.has_extension);
        word = set_flag(word, MakerTraits::USE_PERMIT2_FLAG, self.use_permit2);
        word = set_flag(word, MakerTraits::UNWRAP_NATIVE_FLAG, self.unwrap_native);
        word = write(
            word,
            0,
            MakerTraits::ALLOWED_SENDER_BITS,
            U256::from(self.allowed_sender),
            "allowed sender",
        )?;
        word = write(
            word,
            MakerTraits::EXPIRATION_OFFSET,
            MakerTraits::UINT40_BITS,
            U256::from(self.expiration),
            "expiration",
        )?;
        word = write(
            word,
            MakerTraits::NONCE_OR_EPOCH_OFFSET,
            MakerTraits::UINT40_BITS,
            U256::from(self.nonce_or_epoch),
            "nonce or epoch",
        )?;
        word = write(
            word,
            MakerTraits::SERIES_OFFSET,
            MakerTraits::UINT40_BITS,
            U256::from(self.series),
            "series",
        )?;
        Ok(MakerTraits(word))
    }
}
