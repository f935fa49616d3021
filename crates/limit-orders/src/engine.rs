//! Settles fills of signed orders and exposes the maker side operations on
//! the ledger.

use {
    crate::{
        error::Error,
        interactions::{AssetLedger, Call, Interactions},
        ledger::{Claim, Ledger, RemainingAmount},
    },
    alloy::primitives::{Address, B256, U256},
    model::{
        CompactSignature,
        DomainSeparator,
        Extension,
        MakerTraits,
        Order,
        TakerTraits,
        extension::Interaction,
        traits::TakerArgs,
    },
    number::{mul_ratio, mul_ratio_ceil},
    std::sync::Arc,
    tracing::instrument,
};

/// Interaction segments at least this long start with their target.
const ADDRESS_LEN: usize = 20;

/// Who calls an engine operation and when.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Env {
    pub sender: Address,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

/// A settled fill.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fill {
    pub making_amount: U256,
    pub taking_amount: U256,
    pub order_hash: B256,
}

pub struct Engine {
    domain: DomainSeparator,
    ledger: Ledger,
    assets: Arc<dyn AssetLedger>,
    interactions: Arc<dyn Interactions>,
}

impl Engine {
    pub fn new(
        domain: DomainSeparator,
        assets: Arc<dyn AssetLedger>,
        interactions: Arc<dyn Interactions>,
    ) -> Self {
        Self {
            domain,
            ledger: Ledger::default(),
            assets,
            interactions,
        }
    }

    pub fn compute_order_hash(&self, order: &Order) -> B256 {
        order.hash(&self.domain)
    }

    /// Fills an order that has no extension.
    ///
    /// `amount` is a making amount if the taker traits say so and a taking
    /// amount otherwise.
    pub fn fill(
        &self,
        env: &Env,
        order: &Order,
        signature: &CompactSignature,
        amount: U256,
        taker_traits: TakerTraits,
    ) -> Result<Fill, Error> {
        self.settle(env, order, signature, amount, taker_traits, TakerArgs::default())
    }

    pub fn fill_with_extension(
        &self,
        env: &Env,
        order: &Order,
        signature: &CompactSignature,
        amount: U256,
        taker_traits: TakerTraits,
        extension: &[u8],
    ) -> Result<Fill, Error> {
        let args = TakerArgs {
            extension,
            ..Default::default()
        };
        self.settle(env, order, signature, amount, taker_traits, args)
    }

    /// Fills an order with the args laid out as described by the taker traits:
    /// an optional maker asset recipient, the extension and a taker
    /// interaction.
    pub fn fill_with_args(
        &self,
        env: &Env,
        order: &Order,
        signature: &CompactSignature,
        amount: U256,
        taker_traits: TakerTraits,
        args: &[u8],
    ) -> Result<Fill, Error> {
        let args = taker_traits.split_args(args)?;
        self.settle(env, order, signature, amount, taker_traits, args)
    }

    #[instrument(skip_all, fields(maker = %order.maker, sender = %env.sender))]
    fn settle(
        &self,
        env: &Env,
        order: &Order,
        signature: &CompactSignature,
        amount: U256,
        taker_traits: TakerTraits,
        args: TakerArgs<'_>,
    ) -> Result<Fill, Error> {
        let maker_traits = order.maker_traits;
        if maker_traits.is_expired(env.timestamp) {
            return Err(Error::OrderExpired);
        }
        if !maker_traits.is_allowed_sender(env.sender) {
            return Err(Error::PrivateOrder);
        }

        let order_hash = self.compute_order_hash(order);
        signature.verify(&order_hash, order.maker)?;
        let extension = validate_extension(order, args.extension)?;

        if maker_traits.need_check_epoch_manager() {
            if maker_traits.use_bit_invalidator() {
                return Err(Error::InvalidatedOrder);
            }
            let epoch = self.ledger.epoch(order.maker, maker_traits.series());
            if epoch != maker_traits.nonce_or_epoch() {
                return Err(Error::InvalidatedOrder);
            }
        }

        let claim = Claim::for_order(order, order_hash);
        let capacity = self.ledger.capacity(&claim)?.min(order.making_amount);
        let (making_amount, taking_amount) = amounts(order, amount, taker_traits, capacity)?;
        check_threshold(taker_traits, making_amount, taking_amount)?;

        let reservation = self.ledger.reserve(claim, making_amount)?;
        let settlement = Settlement {
            env,
            order,
            order_hash,
            extension,
            args,
            making_amount,
            taking_amount,
            remaining_before: reservation.capacity().min(order.making_amount),
            remaining_after: reservation.remaining_after(),
        };
        let mut journal = Journal::new(self.assets.as_ref());
        if let Err(err) = self.execute(&settlement, &mut journal) {
            if journal.rollback() {
                tracing::warn!(?order_hash, %err, "fill rolled back");
            } else {
                // Assets that could not be moved back stay accounted for as
                // filled, so the order can't pay them out a second time.
                tracing::error!(?order_hash, %err, "fill failed and was not fully rolled back");
                reservation.commit();
            }
            return Err(err);
        }
        reservation.commit();

        tracing::info!(
            ?order_hash,
            %making_amount,
            %taking_amount,
            "filled order"
        );
        Ok(Fill {
            making_amount,
            taking_amount,
            order_hash,
        })
    }

    /// Runs the hooks and moves the assets of a fill whose ledger entry is
    /// already reserved.
    fn execute(&self, settlement: &Settlement, journal: &mut Journal) -> Result<(), Error> {
        let Settlement {
            env,
            order,
            args,
            making_amount,
            taking_amount,
            remaining_before,
            ..
        } = *settlement;

        if order.maker_traits.need_pre_interaction_call() {
            let (target, data) =
                maker_interaction(settlement.extension.pre_interaction(), order);
            self.interactions
                .pre_interaction(&settlement.call(target, data, remaining_before))?;
        }

        let recipient = args
            .target
            .filter(|target| !target.is_zero())
            .unwrap_or(env.sender);
        journal.transfer(order.maker_asset, order.maker, recipient, making_amount)?;

        if args.interaction.len() >= ADDRESS_LEN {
            let Interaction { target, data } = Interaction::split(args.interaction);
            let target = target.unwrap_or(env.sender);
            self.interactions
                .taker_interaction(&settlement.call(target, data, remaining_before))?;
        }

        journal.transfer(
            order.taker_asset,
            env.sender,
            order.receiver(),
            taking_amount,
        )?;

        if order.maker_traits.need_post_interaction_call() {
            let (target, data) =
                maker_interaction(settlement.extension.post_interaction(), order);
            self.interactions.post_interaction(&settlement.call(
                target,
                data,
                settlement.remaining_after,
            ))?;
        }
        Ok(())
    }

    /// Cancels one of the sender's orders. Already settled fills stay.
    pub fn cancel(&self, env: &Env, maker_traits: MakerTraits, order_hash: B256) {
        self.ledger.cancel(env.sender, maker_traits, order_hash);
        tracing::info!(maker = %env.sender, ?order_hash, "cancelled order");
    }

    /// Cancels several of the sender's orders at once.
    pub fn cancel_batch(&self, env: &Env, orders: &[(MakerTraits, B256)]) {
        self.ledger.cancel_batch(env.sender, orders);
        tracing::info!(maker = %env.sender, count = orders.len(), "cancelled orders");
    }

    /// Invalidates the order's nonce bit together with every bit of
    /// `additional_mask` in the same bitmap word of the sender.
    pub fn invalidate_bits(
        &self,
        env: &Env,
        maker_traits: MakerTraits,
        additional_mask: U256,
    ) -> U256 {
        let word = self.ledger.invalidate_bits(
            env.sender,
            maker_traits.nonce_or_epoch(),
            additional_mask,
        );
        tracing::info!(
            maker = %env.sender,
            nonce = maker_traits.nonce_or_epoch(),
            %word,
            "invalidated bits"
        );
        word
    }

    pub fn epoch(&self, maker: Address, series: u64) -> u64 {
        self.ledger.epoch(maker, series)
    }

    pub fn increase_epoch(&self, env: &Env, series: u64) -> Result<u64, Error> {
        self.advance_epoch(env, series, 1)
    }

    pub fn advance_epoch(&self, env: &Env, series: u64, amount: u64) -> Result<u64, Error> {
        let epoch = self.ledger.advance_epoch(env.sender, series, amount)?;
        tracing::info!(maker = %env.sender, series, epoch, "advanced epoch");
        Ok(epoch)
    }

    pub fn bit_invalidator(&self, maker: Address, slot: u64) -> U256 {
        self.ledger.bit_invalidator(maker, slot)
    }

    pub fn remaining(&self, maker: Address, order_hash: B256) -> RemainingAmount {
        self.ledger.remaining(maker, order_hash)
    }
}

/// A fill between its ledger reservation and its commit.
struct Settlement<'a> {
    env: &'a Env,
    order: &'a Order,
    order_hash: B256,
    extension: Extension<'a>,
    args: TakerArgs<'a>,
    making_amount: U256,
    taking_amount: U256,
    remaining_before: U256,
    remaining_after: U256,
}

impl Settlement<'_> {
    fn call(&self, target: Address, data: &[u8], remaining_making_amount: U256) -> Call {
        Call {
            target,
            order: *self.order,
            extension: self.args.extension.to_vec(),
            order_hash: self.order_hash,
            taker: self.env.sender,
            making_amount: self.making_amount,
            taking_amount: self.taking_amount,
            remaining_making_amount,
            data: data.to_vec(),
        }
    }
}

/// Transfers done on behalf of one fill, so that they can be reversed when a
/// later step of the fill fails.
struct Journal<'a> {
    assets: &'a dyn AssetLedger,
    done: Vec<(Address, Address, Address, U256)>,
}

impl<'a> Journal<'a> {
    fn new(assets: &'a dyn AssetLedger) -> Self {
        Self {
            assets,
            done: Vec::new(),
        }
    }

    fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Error> {
        self.assets.transfer(asset, from, to, amount)?;
        self.done.push((asset, from, to, amount));
        Ok(())
    }

    /// Moves every recorded transfer back, newest first. Returns whether all
    /// of them could be reversed.
    fn rollback(self) -> bool {
        let mut reversed = true;
        for (asset, from, to, amount) in self.done.into_iter().rev() {
            if let Err(err) = self.assets.transfer(asset, to, from, amount) {
                tracing::error!(?err, "failed to reverse transfer of a rolled back fill");
                reversed = false;
            }
        }
        reversed
    }
}

fn validate_extension<'a>(order: &Order, bytes: &'a [u8]) -> Result<Extension<'a>, Error> {
    if !order.maker_traits.has_extension() {
        if !bytes.is_empty() {
            return Err(Error::InvalidExtension);
        }
        return Ok(Extension::default());
    }
    if bytes.is_empty() {
        return Err(Error::MissingExtension);
    }
    if !Extension::is_bound_to(bytes, order.salt) {
        return Err(Error::InvalidExtension);
    }
    Ok(Extension::decode(bytes)?)
}

/// Target and payload of a pre or post interaction. Segments without a
/// target notify the maker.
fn maker_interaction<'a>(
    interaction: Option<Interaction<'a>>,
    order: &Order,
) -> (Address, &'a [u8]) {
    match interaction {
        Some(Interaction { target, data }) => (target.unwrap_or(order.maker), data),
        None => (order.maker, &[]),
    }
}

/// Computes the making and taking amounts of a fill. Amounts are rounded in
/// the maker's favor: a derived taking amount up, a derived making amount
/// down.
fn amounts(
    order: &Order,
    amount: U256,
    taker_traits: TakerTraits,
    capacity: U256,
) -> Result<(U256, U256), Error> {
    if amount.is_zero() || order.making_amount.is_zero() || order.taking_amount.is_zero() {
        return Err(Error::ZeroAmount);
    }
    if capacity.is_zero() {
        return Err(Error::InvalidatedOrder);
    }

    let (making_amount, taking_amount) = if taker_traits.is_making_amount() {
        let taking_amount = if amount == order.making_amount {
            order.taking_amount
        } else {
            mul_ratio_ceil(order.taking_amount, amount, order.making_amount)
                .ok_or(Error::ArithmeticOverflow)?
        };
        (amount, taking_amount)
    } else {
        let making_amount = if amount == order.taking_amount {
            order.making_amount
        } else {
            mul_ratio(order.making_amount, amount, order.taking_amount)
                .ok_or(Error::ArithmeticOverflow)?
        };
        (making_amount, amount)
    };

    if making_amount.is_zero() || taking_amount.is_zero() {
        return Err(Error::ZeroAmount);
    }
    if order.maker_traits.no_partial_fills() && making_amount != order.making_amount {
        return Err(Error::PartialFillNotAllowed);
    }
    if making_amount > capacity {
        return Err(Error::InvalidatedOrder);
    }
    Ok((making_amount, taking_amount))
}

/// A making amount fill pays at most the threshold, a taking amount fill
/// receives at least the threshold.
fn check_threshold(
    taker_traits: TakerTraits,
    making_amount: U256,
    taking_amount: U256,
) -> Result<(), Error> {
    let threshold = taker_traits.threshold();
    if threshold.is_zero() {
        return Ok(());
    }
    let met = if taker_traits.is_making_amount() {
        taking_amount <= threshold
    } else {
        making_amount >= threshold
    };
    if !met {
        return Err(Error::ThresholdNotMet);
    }
    Ok(())
}
