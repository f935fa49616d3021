use {
    super::{FieldOutOfRange, mask, read_u64, set_flag, write},
    alloy::primitives::{Address, U256},
    serde::{Deserialize, Serialize},
};

/// Per-call filler preferences.
///
/// High bits are flags:
/// - 255: the amount is a making amount, otherwise a taking amount
/// - 254: unwrap the wrapped native asset
/// - 253: skip the maker permit
/// - 252: use permit2
/// - 251: the args start with a 20 byte recipient for the maker asset
///
/// - 224..248: byte length of the extension inside the args
/// - 200..224: byte length of the taker interaction inside the args
/// - 0..185: threshold, zero disables the check
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TakerTraits(#[serde(with = "number::serialization::hex_or_decimal")] pub U256);

impl TakerTraits {
    const MAKER_AMOUNT_FLAG: usize = 255;
    const UNWRAP_NATIVE_FLAG: usize = 254;
    const SKIP_ORDER_PERMIT_FLAG: usize = 253;
    const USE_PERMIT2_FLAG: usize = 252;
    const ARGS_HAS_TARGET_FLAG: usize = 251;

    const ARGS_EXTENSION_LENGTH_OFFSET: usize = 224;
    const ARGS_INTERACTION_LENGTH_OFFSET: usize = 200;
    const ARGS_LENGTH_BITS: usize = 24;
    const THRESHOLD_BITS: usize = 185;

    /// Whether the filled amount is interpreted as a making amount.
    pub fn is_making_amount(&self) -> bool {
        self.0.bit(Self::MAKER_AMOUNT_FLAG)
    }

    pub fn unwrap_native(&self) -> bool {
        self.0.bit(Self::UNWRAP_NATIVE_FLAG)
    }

    pub fn skip_maker_permit(&self) -> bool {
        self.0.bit(Self::SKIP_ORDER_PERMIT_FLAG)
    }

    pub fn use_permit2(&self) -> bool {
        self.0.bit(Self::USE_PERMIT2_FLAG)
    }

    pub fn args_has_target(&self) -> bool {
        self.0.bit(Self::ARGS_HAS_TARGET_FLAG)
    }

    pub fn args_extension_length(&self) -> u32 {
        read_u64(
            self.0,
            Self::ARGS_EXTENSION_LENGTH_OFFSET,
            Self::ARGS_LENGTH_BITS,
        ) as u32
    }

    pub fn args_interaction_length(&self) -> u32 {
        read_u64(
            self.0,
            Self::ARGS_INTERACTION_LENGTH_OFFSET,
            Self::ARGS_LENGTH_BITS,
        ) as u32
    }

    /// For making amount fills the maximum taking amount, otherwise the
    /// minimum making amount.
    pub fn threshold(&self) -> U256 {
        self.0 & mask(Self::THRESHOLD_BITS)
    }

    pub fn decode(&self) -> TakerTraitsFields {
        TakerTraitsFields {
            making_amount: self.is_making_amount(),
            unwrap_native: self.unwrap_native(),
            skip_maker_permit: self.skip_maker_permit(),
            use_permit2: self.use_permit2(),
            args_has_target: self.args_has_target(),
            args_extension_length: self.args_extension_length(),
            args_interaction_length: self.args_interaction_length(),
            threshold: self.threshold(),
        }
    }

    /// Splits the fill args into the optional maker asset recipient, the
    /// order extension and the taker interaction, as sized by these traits.
    pub fn split_args<'a>(&self, args: &'a [u8]) -> Result<TakerArgs<'a>, ArgsOutOfBounds> {
        let mut rest = args;
        let target = if self.args_has_target() {
            Some(Address::from_slice(take(&mut rest, 20, "target")?))
        } else {
            None
        };
        let extension = take(&mut rest, self.args_extension_length() as usize, "extension")?;
        let interaction = take(
            &mut rest,
            self.args_interaction_length() as usize,
            "interaction",
        )?;
        Ok(TakerArgs {
            target,
            extension,
            interaction,
        })
    }
}

fn take<'a>(
    rest: &mut &'a [u8],
    len: usize,
    part: &'static str,
) -> Result<&'a [u8], ArgsOutOfBounds> {
    if len > rest.len() {
        return Err(ArgsOutOfBounds {
            part,
            len,
            available: rest.len(),
        });
    }
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}

/// The fill args declare a part that is longer than the bytes left.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[error("args {part} of {len} bytes overruns the {available} remaining bytes")]
pub struct ArgsOutOfBounds {
    pub part: &'static str,
    pub len: usize,
    pub available: usize,
}

/// The parts of the fill args. Trailing bytes past the declared lengths are
/// ignored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TakerArgs<'a> {
    pub target: Option<Address>,
    pub extension: &'a [u8],
    pub interaction: &'a [u8],
}

impl From<U256> for TakerTraits {
    fn from(word: U256) -> Self {
        Self(word)
    }
}

/// The decoded form of [`TakerTraits`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakerTraitsFields {
    pub making_amount: bool,
    pub unwrap_native: bool,
    pub skip_maker_permit: bool,
    pub use_permit2: bool,
    pub args_has_target: bool,
    pub args_extension_length: u32,
    pub args_interaction_length: u32,
    pub threshold: U256,
}

impl TakerTraitsFields {
    /// Fill a making amount, paying at most `max_taking_amount` (zero for no
    /// limit).
    pub fn making(max_taking_amount: U256) -> Self {
        Self {
            making_amount: true,
            threshold: max_taking_amount,
            ..Default::default()
        }
    }

    /// Fill a taking amount, receiving at least `min_making_amount` (zero for
    /// no limit).
    pub fn taking(min_making_amount: U256) -> Self {
        Self {
            threshold: min_making_amount,
            ..Default::default()
        }
    }

    pub fn encode(&self) -> Result<TakerTraits, FieldOutOfRange> {
        let mut word = U256::ZERO;
        word = set_flag(word, TakerTraits::MAKER_AMOUNT_FLAG, self.making_amount);
        word = set_flag(word, TakerTraits::UNWRAP_NATIVE_FLAG, self.unwrap_native);
        word = set_flag(word, TakerTraits::SKIP_ORDER_PERMIT_FLAG, self.skip_maker_permit);
        word = set_flag(word, TakerTraits::USE_PERMIT2_FLAG, self.use_permit2);
        word = set_flag(word, TakerTraits::ARGS_HAS_TARGET_FLAG, self.args_has_target);
        word = write(
            word,
            TakerTraits::ARGS_EXTENSION_LENGTH_OFFSET,
            TakerTraits::ARGS_LENGTH_BITS,
            U256::from(self.args_extension_length),
            "args extension length",
        )?;
        word = write(
            word,
            TakerTraits::ARGS_INTERACTION_LENGTH_OFFSET,
            TakerTraits::ARGS_LENGTH_BITS,
            U256::from(self.args_interaction_length),
            "args interaction length",
        )?;
        word = write(
            word,
            0,
            TakerTraits::THRESHOLD_BITS,
            self.threshold,
            "threshold",
        )?;
        Ok(TakerTraits(word))
    }
}
