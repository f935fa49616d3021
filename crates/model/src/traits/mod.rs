//! Codecs for the two packed 256-bit configuration words of an order fill.
//!
//! [`MakerTraits`] is signed as part of the order, [`TakerTraits`] is chosen
//! by the filler for every call. Both are plain newtypes over [`U256`] with
//! accessors that only use masking and shifting, plus a decoded `*Fields`
//! representation that can be encoded back into the word.

mod maker;
mod taker;

pub use {
    maker::{MakerTraits, MakerTraitsFields},
    taker::{ArgsOutOfBounds, TakerArgs, TakerTraits, TakerTraitsFields},
};

use alloy::primitives::{Address, U256};

/// A decoded field does not fit into its slot of the packed word.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[error("{field} does not fit into {bits} bits")]
pub struct FieldOutOfRange {
    pub field: &'static str,
    pub bits: usize,
}

/// Mask with the lowest `bits` bits set.
fn mask(bits: usize) -> U256 {
    (U256::from(1) << bits) - U256::from(1)
}

/// Reads the unsigned integer stored in `bits` bits starting at `offset`.
/// Fields read this way are at most 64 bits wide.
fn read_u64(word: U256, offset: usize, bits: usize) -> u64 {
    debug_assert!(bits <= 64);
    (word >> offset).as_limbs()[0] & (u64::MAX >> (64 - bits))
}

/// Stores `value` into `bits` bits starting at `offset`.
fn write(
    word: U256,
    offset: usize,
    bits: usize,
    value: U256,
    field: &'static str,
) -> Result<U256, FieldOutOfRange> {
    if value > mask(bits) {
        return Err(FieldOutOfRange { field, bits });
    }
    Ok(word | (value << offset))
}

fn set_flag(word: U256, bit: usize, value: bool) -> U256 {
    if value { word | (U256::from(1) << bit) } else { word }
}

/// The lowest 80 bits of an address, which is what an order stores to
/// restrict its filler.
pub fn address_low_bits(address: Address) -> u128 {
    let mut low = [0u8; 16];
    low[6..].copy_from_slice(&address.as_slice()[10..]);
    u128::from_be_bytes(low)
}
