//! The capabilities the engine calls out to while settling a fill.

use {
    alloy::primitives::{Address, B256, U256},
    model::Order,
};

/// Moves assets between accounts. A fill that fails after some of its
/// transfers went through reverses them with transfers in the opposite
/// direction.
#[mockall::automock]
pub trait AssetLedger: Send + Sync {
    fn transfer(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransferError>;
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("transfer of {amount} {asset} from {from} to {to} failed: {reason}")]
pub struct TransferError {
    pub asset: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub reason: String,
}

/// Hooks invoked synchronously during a fill. The ledger reservation of the
/// fill is already in place when any of them runs, so a fill reentered from
/// a hook sees the reduced capacity.
#[mockall::automock]
pub trait Interactions: Send + Sync {
    /// Runs before any asset moves, when the order asks for it.
    fn pre_interaction(&self, call: &Call) -> Result<(), InteractionError>;

    /// Runs between the maker asset and the taker asset transfers, when the
    /// filler supplied an interaction.
    fn taker_interaction(&self, call: &Call) -> Result<(), InteractionError>;

    /// Runs after both transfers, when the order asks for it.
    fn post_interaction(&self, call: &Call) -> Result<(), InteractionError>;
}

/// Everything a hook is told about the fill it is part of.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Call {
    pub target: Address,
    pub order: Order,
    pub extension: Vec<u8>,
    pub order_hash: B256,
    pub taker: Address,
    pub making_amount: U256,
    pub taking_amount: U256,
    /// Capacity of the order before this fill, except for the post
    /// interaction where it is the capacity left after it.
    pub remaining_making_amount: U256,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("interaction with {target} failed: {reason}")]
pub struct InteractionError {
    pub target: Address,
    pub reason: String,
}

/// Interactions that accept every call. For deployments without hooks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInteractions;

impl Interactions for NoInteractions {
    fn pre_interaction(&self, _: &Call) -> Result<(), InteractionError> {
        Ok(())
    }

    fn taker_interaction(&self, _: &Call) -> Result<(), InteractionError> {
        Ok(())
    }

    fn post_interaction(&self, _: &Call) -> Result<(), InteractionError> {
        Ok(())
    }
}
