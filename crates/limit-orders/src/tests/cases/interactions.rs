use {
    super::{making, taking},
    crate::{
        engine::{Engine, Env},
        error::Error,
        interactions::{
            AssetLedger,
            Call,
            InteractionError,
            Interactions,
            MockAssetLedger,
            MockInteractions,
        },
        ledger::RemainingAmount,
        tests::{
            self,
            setup::{InMemoryAssets, MAKER_ASSET, NOW, TAKER, TAKER_ASSET},
        },
    },
    alloy::primitives::{Address, U256},
    mockall::{Sequence, predicate::eq},
    model::{
        CompactSignature,
        Domain,
        DomainSeparator,
        Extension,
        Order,
        traits::{MakerTraitsFields, TakerTraitsFields},
    },
    std::sync::{
        Arc,
        Mutex,
        OnceLock,
        Weak,
        atomic::{AtomicBool, Ordering},
    },
};

fn hooked(pre: bool, post: bool) -> model::MakerTraits {
    MakerTraitsFields {
        allow_multiple_fills: true,
        pre_interaction: pre,
        post_interaction: post,
        ..Default::default()
    }
    .encode()
    .unwrap()
}

/// Hooks and transfers run in protocol order with the fill's amounts.
#[test]
fn hooks_and_transfers_in_order() {
    let maker = tests::setup::maker();
    let pre_target = Address::repeat_byte(0x01);
    let taker_target = Address::repeat_byte(0x02);
    let post_target = Address::repeat_byte(0x03);

    let extension = Extension::builder()
        .pre_interaction(pre_target, b"pre")
        .post_interaction(post_target, b"post")
        .build();
    let order = Order::builder()
        .with_maker(maker.address())
        .with_maker_asset(MAKER_ASSET)
        .with_taker_asset(TAKER_ASSET)
        .with_making_amount(U256::from(100))
        .with_taking_amount(U256::from(50))
        .with_maker_traits(hooked(true, true))
        .with_extension(&extension)
        .build();
    let interaction = [taker_target.as_slice(), &b"taker"[..]].concat();
    let taker_traits = TakerTraitsFields {
        making_amount: true,
        args_extension_length: u32::try_from(extension.len()).unwrap(),
        args_interaction_length: u32::try_from(interaction.len()).unwrap(),
        ..Default::default()
    }
    .encode()
    .unwrap();
    let args = [&extension[..], &interaction[..]].concat();

    let mut seq = Sequence::new();
    let mut assets = MockAssetLedger::new();
    let mut interactions = MockInteractions::new();
    interactions
        .expect_pre_interaction()
        .times(1)
        .in_sequence(&mut seq)
        .withf(move |call: &Call| {
            call.target == pre_target
                && call.data == b"pre"
                && call.making_amount == U256::from(40)
                && call.taking_amount == U256::from(20)
                && call.remaining_making_amount == U256::from(100)
                && call.taker == TAKER
        })
        .returning(|_| Ok(()));
    assets
        .expect_transfer()
        .times(1)
        .in_sequence(&mut seq)
        .with(
            eq(MAKER_ASSET),
            eq(maker.address()),
            eq(TAKER),
            eq(U256::from(40)),
        )
        .returning(|_, _, _, _| Ok(()));
    interactions
        .expect_taker_interaction()
        .times(1)
        .in_sequence(&mut seq)
        .withf(move |call: &Call| call.target == taker_target && call.data == b"taker")
        .returning(|_| Ok(()));
    assets
        .expect_transfer()
        .times(1)
        .in_sequence(&mut seq)
        .with(
            eq(TAKER_ASSET),
            eq(TAKER),
            eq(maker.address()),
            eq(U256::from(20)),
        )
        .returning(|_, _, _, _| Ok(()));
    let expected_extension = extension.clone();
    interactions
        .expect_post_interaction()
        .times(1)
        .in_sequence(&mut seq)
        .withf(move |call: &Call| {
            call.target == post_target
                && call.data == b"post"
                && call.extension == expected_extension
                && call.remaining_making_amount == U256::from(60)
        })
        .returning(|_| Ok(()));

    let engine = Engine::new(
        DomainSeparator::new(&Domain::default()),
        Arc::new(assets),
        Arc::new(interactions),
    );
    let signature = CompactSignature::sign(&engine.compute_order_hash(&order), &maker);
    let env = Env {
        sender: TAKER,
        timestamp: NOW,
    };

    let fill = engine
        .fill_with_args(&env, &order, &signature, U256::from(40), taker_traits, &args)
        .unwrap();
    assert_eq!(fill.making_amount, U256::from(40));
    assert_eq!(fill.taking_amount, U256::from(20));
}

/// Hook segments without a target notify the maker.
#[test]
fn hooks_default_to_the_maker() {
    let maker = tests::setup::maker().address();
    let mut interactions = MockInteractions::new();
    interactions
        .expect_pre_interaction()
        .times(1)
        .withf(move |call: &Call| call.target == maker && call.data.is_empty())
        .returning(|_| Ok(()));
    interactions
        .expect_post_interaction()
        .times(1)
        .withf(move |call: &Call| call.target == maker && call.data.is_empty())
        .returning(|_| Ok(()));
    interactions.expect_taker_interaction().never();

    let test = tests::setup().interactions(Arc::new(interactions)).done();
    let order = test.order().with_maker_traits(hooked(true, true)).build();

    // Interactions shorter than an address are ignored.
    let taker_traits = TakerTraitsFields {
        args_interaction_length: 19,
        ..Default::default()
    }
    .encode()
    .unwrap();
    test.engine
        .fill_with_args(
            &test.env(),
            &order,
            &test.sign(&order),
            U256::from(50),
            taker_traits,
            &[0xff; 19],
        )
        .unwrap();
}

/// A failing hook fails the whole fill and leaves nothing behind.
#[test]
fn failing_post_interaction_rolls_back() {
    let failed = Arc::new(AtomicBool::new(false));
    let mut interactions = MockInteractions::new();
    let flag = failed.clone();
    interactions
        .expect_post_interaction()
        .times(2)
        .returning(move |call| {
            if flag.swap(true, Ordering::SeqCst) {
                Ok(())
            } else {
                Err(InteractionError {
                    target: call.target,
                    reason: "escrow creation failed".to_string(),
                })
            }
        });

    let test = tests::setup().interactions(Arc::new(interactions)).done();
    let order = test.order().with_maker_traits(hooked(false, true)).build();
    let signature = test.sign(&order);
    let order_hash = test.engine.compute_order_hash(&order);

    let result = test
        .engine
        .fill(&test.env(), &order, &signature, U256::from(50), taking());
    assert!(matches!(result, Err(Error::Interaction(_))));
    assert!(failed.load(Ordering::SeqCst));
    assert_eq!(
        test.engine.remaining(test.maker.address(), order_hash),
        RemainingAmount::Unseen
    );
    for asset in [MAKER_ASSET, TAKER_ASSET] {
        assert_eq!(test.delta(asset, TAKER), 0);
        assert_eq!(test.delta(asset, test.maker.address()), 0);
    }

    // The full amount is still available.
    let fill = test
        .engine
        .fill(&test.env(), &order, &signature, U256::from(50), taking())
        .unwrap();
    assert_eq!(fill.making_amount, U256::from(100));
}

/// Fills the same order again from inside its post interaction.
#[derive(Default)]
struct Reentrant {
    engine: OnceLock<Weak<Engine>>,
    signature: OnceLock<CompactSignature>,
    entered: AtomicBool,
    results: Mutex<Vec<Result<U256, String>>>,
}

impl Interactions for Reentrant {
    fn pre_interaction(&self, _: &Call) -> Result<(), InteractionError> {
        Ok(())
    }

    fn taker_interaction(&self, _: &Call) -> Result<(), InteractionError> {
        Ok(())
    }

    fn post_interaction(&self, call: &Call) -> Result<(), InteractionError> {
        if self.entered.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let engine = self.engine.get().and_then(Weak::upgrade).unwrap();
        let signature = self.signature.get().unwrap();
        let env = Env {
            sender: TAKER,
            timestamp: NOW,
        };
        for amount in [50, 40] {
            let result = engine
                .fill(&env, &call.order, signature, U256::from(amount), making())
                .map(|fill| fill.making_amount)
                .map_err(|err| err.to_string());
            self.results.lock().unwrap().push(result);
        }
        Ok(())
    }
}

/// A fill reentered from a hook sees the capacity the outer fill reserved.
#[test]
fn reentrant_fill_cannot_double_spend() {
    let reentrant = Arc::new(Reentrant::default());
    let test = tests::setup().interactions(reentrant.clone()).done();
    let order = test.order().with_maker_traits(hooked(false, true)).build();
    let signature = test.sign(&order);
    reentrant.engine.set(Arc::downgrade(&test.engine)).unwrap();
    reentrant.signature.set(signature).unwrap();

    let fill = test
        .engine
        .fill(&test.env(), &order, &signature, U256::from(60), making())
        .unwrap();
    assert_eq!(fill.making_amount, U256::from(60));

    let results = reentrant.results.lock().unwrap().clone();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], Err(Error::InvalidatedOrder.to_string()));
    assert_eq!(results[1], Ok(U256::from(40)));

    let order_hash = test.engine.compute_order_hash(&order);
    assert_eq!(
        test.engine.remaining(test.maker.address(), order_hash),
        RemainingAmount::Available(U256::ZERO)
    );
    assert_eq!(test.delta(MAKER_ASSET, TAKER), 100);
}

/// Sends everything the taker holds of the maker asset to the interaction
/// target, then fails the post interaction.
#[derive(Default)]
struct Forwarding {
    assets: OnceLock<Arc<InMemoryAssets>>,
}

impl Interactions for Forwarding {
    fn pre_interaction(&self, _: &Call) -> Result<(), InteractionError> {
        Ok(())
    }

    fn taker_interaction(&self, call: &Call) -> Result<(), InteractionError> {
        let assets = self.assets.get().unwrap();
        let balance = assets.balance(MAKER_ASSET, call.taker);
        assets
            .transfer(MAKER_ASSET, call.taker, call.target, balance)
            .map_err(|err| InteractionError {
                target: call.target,
                reason: err.to_string(),
            })
    }

    fn post_interaction(&self, call: &Call) -> Result<(), InteractionError> {
        Err(InteractionError {
            target: call.target,
            reason: "escrow creation failed".to_string(),
        })
    }
}

/// A failed fill whose maker asset transfer can't be reversed keeps its
/// capacity consumed, the maker never pays out more than the order.
#[test]
fn unreversible_fill_keeps_its_capacity() {
    let forwarding = Arc::new(Forwarding::default());
    let test = tests::setup().interactions(forwarding.clone()).done();
    forwarding.assets.set(test.assets.clone()).unwrap();

    let order = test.order().with_maker_traits(hooked(false, true)).build();
    let signature = test.sign(&order);
    let order_hash = test.engine.compute_order_hash(&order);
    let sink = Address::repeat_byte(0x5c);
    let taker_traits = TakerTraitsFields {
        args_interaction_length: 20,
        ..making().decode()
    }
    .encode()
    .unwrap();

    let result = test.engine.fill_with_args(
        &test.env(),
        &order,
        &signature,
        U256::from(100),
        taker_traits,
        sink.as_slice(),
    );
    assert!(matches!(result, Err(Error::Interaction(_))));
    assert_eq!(test.delta(MAKER_ASSET, test.maker.address()), -100);
    // The taker asset went back to the taker.
    assert_eq!(test.delta(TAKER_ASSET, test.maker.address()), 0);
    assert_eq!(test.delta(TAKER_ASSET, TAKER), 0);
    assert_eq!(
        test.engine.remaining(test.maker.address(), order_hash),
        RemainingAmount::Available(U256::ZERO)
    );

    let result = test
        .engine
        .fill(&test.env(), &order, &signature, U256::from(100), making());
    assert!(matches!(result, Err(Error::InvalidatedOrder)));
    assert_eq!(test.delta(MAKER_ASSET, test.maker.address()), -100);
}
