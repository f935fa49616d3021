//! Per maker fill state: invalidation bitmaps for single-shot orders,
//! remaining making amounts for orders that can be filled many times, and
//! epoch counters.
//!
//! A fill first takes a [`Reservation`]. The reservation is visible to every
//! later read right away, so a fill reentered from a hook can't spend the
//! same capacity twice. It turns into a committed entry only once the fill
//! went through; dropping it hands the capacity back.

use {
    crate::error::Error,
    alloy::primitives::{Address, B256, U256},
    model::{MakerTraits, Order},
    std::{
        collections::HashMap,
        sync::{Mutex, MutexGuard, PoisonError},
    },
};

/// Epochs live in the 40 bit nonce field of the maker traits.
const MAX_EPOCH: u64 = (1 << 40) - 1;
/// Largest step of a single epoch advance.
const MAX_EPOCH_ADVANCE: u64 = 255;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RemainingAmount {
    /// Never filled nor cancelled: the full making amount is available.
    #[default]
    Unseen,
    Available(U256),
    Cancelled,
}

/// The ledger entry a fill of an order consumes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Claim {
    /// Single-shot orders flip the bit for their nonce.
    Bit { maker: Address, nonce: u64 },
    /// Other orders draw down their remaining making amount.
    Amount {
        maker: Address,
        order_hash: B256,
        full_amount: U256,
    },
}

impl Claim {
    pub fn for_order(order: &Order, order_hash: B256) -> Self {
        if order.maker_traits.use_bit_invalidator() {
            Self::Bit {
                maker: order.maker,
                nonce: order.maker_traits.nonce_or_epoch(),
            }
        } else {
            Self::Amount {
                maker: order.maker,
                order_hash,
                full_amount: order.making_amount,
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    bits: HashMap<(Address, u64), U256>,
    reserved_bits: HashMap<(Address, u64), U256>,
    remaining: HashMap<(Address, B256), RemainingAmount>,
    reserved_amounts: HashMap<(Address, B256), U256>,
    epochs: HashMap<(Address, u64), u64>,
}

/// Splits a nonce into the index of its bitmap word and the bit within.
fn slot(nonce: u64) -> (u64, U256) {
    (nonce >> 8, U256::from(1) << (nonce & 0xff))
}

impl State {
    fn capacity(&self, claim: &Claim) -> Result<U256, Error> {
        match *claim {
            Claim::Bit { maker, nonce } => {
                let (slot, bit) = slot(nonce);
                let taken = self.bits.get(&(maker, slot)).copied().unwrap_or_default()
                    | self
                        .reserved_bits
                        .get(&(maker, slot))
                        .copied()
                        .unwrap_or_default();
                if !(taken & bit).is_zero() {
                    return Err(Error::InvalidatedOrder);
                }
                // Single-shot orders can't be filled past their making amount
                // anyway, the engine bounds them by the order.
                Ok(U256::MAX)
            }
            Claim::Amount {
                maker,
                order_hash,
                full_amount,
            } => {
                let key = (maker, order_hash);
                let committed = match self.remaining.get(&key).copied().unwrap_or_default() {
                    RemainingAmount::Unseen => full_amount,
                    RemainingAmount::Available(amount) => amount,
                    RemainingAmount::Cancelled => return Err(Error::InvalidatedOrder),
                };
                let reserved = self.reserved_amounts.get(&key).copied().unwrap_or_default();
                let available = committed.saturating_sub(reserved);
                if available.is_zero() {
                    return Err(Error::InvalidatedOrder);
                }
                Ok(available)
            }
        }
    }

    fn set_bit(&mut self, maker: Address, nonce: u64) {
        let (slot, bit) = slot(nonce);
        *self.bits.entry((maker, slot)).or_default() |= bit;
    }
}

impl Ledger {
    fn state(&self) -> MutexGuard<'_, State> {
        // Critical sections never panic, the state is consistent even if a
        // holder did.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How much of the order's making amount can still be filled. Fails with
    /// [`Error::InvalidatedOrder`] if nothing can.
    ///
    /// Single-shot orders that are still live report an unbounded capacity.
    pub fn capacity(&self, claim: &Claim) -> Result<U256, Error> {
        self.state().capacity(claim)
    }

    /// Reserves `making_amount` of the claimed entry.
    pub fn reserve(&self, claim: Claim, making_amount: U256) -> Result<Reservation<'_>, Error> {
        let mut state = self.state();
        let capacity = state.capacity(&claim)?;
        if making_amount > capacity {
            return Err(Error::InvalidatedOrder);
        }
        match claim {
            Claim::Bit { maker, nonce } => {
                let (slot, bit) = slot(nonce);
                *state.reserved_bits.entry((maker, slot)).or_default() |= bit;
            }
            Claim::Amount {
                maker, order_hash, ..
            } => {
                *state
                    .reserved_amounts
                    .entry((maker, order_hash))
                    .or_default() += making_amount;
            }
        }
        tracing::debug!(?claim, %making_amount, "reserved ledger entry");
        Ok(Reservation {
            ledger: self,
            claim,
            making_amount,
            capacity,
            remaining_after: match claim {
                Claim::Bit { .. } => U256::ZERO,
                Claim::Amount { .. } => capacity - making_amount,
            },
            settled: false,
        })
    }

    /// Cancels an order of `maker`. Cancelling twice is a no-op.
    pub fn cancel(&self, maker: Address, maker_traits: MakerTraits, order_hash: B256) {
        self.state().cancel(maker, maker_traits, order_hash);
    }

    /// Cancels all orders under one lock, no fill can observe a partially
    /// applied batch.
    pub fn cancel_batch(&self, maker: Address, orders: &[(MakerTraits, B256)]) {
        let mut state = self.state();
        for (maker_traits, order_hash) in orders {
            state.cancel(maker, *maker_traits, *order_hash);
        }
    }

    /// Sets the bit for `nonce` and every bit of `additional_mask` in the
    /// bitmap word holding `nonce`. Returns the new word.
    pub fn invalidate_bits(&self, maker: Address, nonce: u64, additional_mask: U256) -> U256 {
        let (slot, bit) = slot(nonce);
        let mut state = self.state();
        let word = state.bits.entry((maker, slot)).or_default();
        *word |= bit | additional_mask;
        *word
    }

    pub fn bit_invalidator(&self, maker: Address, slot: u64) -> U256 {
        self.state()
            .bits
            .get(&(maker, slot))
            .copied()
            .unwrap_or_default()
    }

    pub fn remaining(&self, maker: Address, order_hash: B256) -> RemainingAmount {
        self.state()
            .remaining
            .get(&(maker, order_hash))
            .copied()
            .unwrap_or_default()
    }

    pub fn epoch(&self, maker: Address, series: u64) -> u64 {
        self.state()
            .epochs
            .get(&(maker, series))
            .copied()
            .unwrap_or_default()
    }

    /// Moves the epoch of a series forward by 1 to 255 steps, invalidating
    /// every order signed for an earlier epoch. Returns the new epoch.
    pub fn advance_epoch(&self, maker: Address, series: u64, amount: u64) -> Result<u64, Error> {
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        if amount > MAX_EPOCH_ADVANCE {
            return Err(Error::ArithmeticOverflow);
        }
        let mut state = self.state();
        let epoch = state.epochs.entry((maker, series)).or_default();
        let next = epoch
            .checked_add(amount)
            .filter(|next| *next <= MAX_EPOCH)
            .ok_or(Error::ArithmeticOverflow)?;
        *epoch = next;
        Ok(next)
    }
}

impl State {
    fn cancel(&mut self, maker: Address, maker_traits: MakerTraits, order_hash: B256) {
        if maker_traits.use_bit_invalidator() {
            self.set_bit(maker, maker_traits.nonce_or_epoch());
        } else {
            self.remaining
                .insert((maker, order_hash), RemainingAmount::Cancelled);
        }
    }
}

/// Capacity held by an in-flight fill. Released on drop unless committed.
#[derive(Debug)]
#[must_use]
pub struct Reservation<'a> {
    ledger: &'a Ledger,
    claim: Claim,
    making_amount: U256,
    capacity: U256,
    remaining_after: U256,
    settled: bool,
}

impl Reservation<'_> {
    /// Capacity of the claimed entry when the reservation was taken, this
    /// reservation not included.
    pub fn capacity(&self) -> U256 {
        self.capacity
    }

    /// Capacity the order has left once this reservation is committed. Zero
    /// for single-shot orders.
    pub fn remaining_after(&self) -> U256 {
        self.remaining_after
    }

    pub fn commit(mut self) {
        let mut state = self.ledger.state();
        match self.claim {
            Claim::Bit { maker, nonce } => {
                let (slot, bit) = slot(nonce);
                if let Some(reserved) = state.reserved_bits.get_mut(&(maker, slot)) {
                    *reserved &= !bit;
                }
                state.set_bit(maker, nonce);
            }
            Claim::Amount {
                maker,
                order_hash,
                full_amount,
            } => {
                let key = (maker, order_hash);
                unreserve(&mut state.reserved_amounts, key, self.making_amount);
                let remaining = state.remaining.entry(key).or_default();
                *remaining = match *remaining {
                    // A cancellation that landed while the fill was in flight
                    // stays.
                    RemainingAmount::Cancelled => RemainingAmount::Cancelled,
                    RemainingAmount::Unseen => {
                        RemainingAmount::Available(full_amount.saturating_sub(self.making_amount))
                    }
                    RemainingAmount::Available(amount) => {
                        RemainingAmount::Available(amount.saturating_sub(self.making_amount))
                    }
                };
            }
        }
        self.settled = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.ledger.state();
        match self.claim {
            Claim::Bit { maker, nonce } => {
                let (slot, bit) = slot(nonce);
                if let Some(reserved) = state.reserved_bits.get_mut(&(maker, slot)) {
                    *reserved &= !bit;
                }
            }
            Claim::Amount {
                maker, order_hash, ..
            } => unreserve(
                &mut state.reserved_amounts,
                (maker, order_hash),
                self.making_amount,
            ),
        }
        tracing::debug!(claim = ?self.claim, "released ledger reservation");
    }
}

fn unreserve(reserved: &mut HashMap<(Address, B256), U256>, key: (Address, B256), amount: U256) {
    if let Some(total) = reserved.get_mut(&key) {
        *total = total.saturating_sub(amount);
        if total.is_zero() {
            reserved.remove(&key);
        }
    }
}
