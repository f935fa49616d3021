//! Test cases.

use {
    alloy::primitives::U256,
    model::{
        MakerTraits,
        TakerTraits,
        traits::{MakerTraitsFields, TakerTraitsFields},
    },
};

mod interactions;
mod validation;

/// Taker traits for a taking amount fill without threshold.
pub fn taking() -> TakerTraits {
    TakerTraits::default()
}

/// Taker traits for a making amount fill without threshold.
pub fn making() -> TakerTraits {
    TakerTraitsFields::making(U256::ZERO).encode().unwrap()
}

pub fn multiple_fills() -> MakerTraits {
    MakerTraitsFields {
        allow_multiple_fills: true,
        ..Default::default()
    }
    .encode()
    .unwrap()
}

pub fn no_partial_fills() -> MakerTraits {
    MakerTraitsFields {
        no_partial_fills: true,
        ..Default::default()
    }
    .encode()
    .unwrap()
}
