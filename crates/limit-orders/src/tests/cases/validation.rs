use {
    super::{multiple_fills, taking},
    crate::{
        engine::Env,
        error::Error,
        tests::{self, setup::NOW},
    },
    alloy::{
        primitives::{Address, B256, U256},
        signers::local::PrivateKeySigner,
    },
    model::{CompactSignature, signature::SignatureError, traits::MakerTraitsFields},
};

#[test]
fn expired_order() {
    let test = tests::setup().done();
    let traits = MakerTraitsFields {
        expiration: NOW - 1,
        ..Default::default()
    }
    .encode()
    .unwrap();
    let order = test.order().with_maker_traits(traits).build();

    let result = test.engine.fill(
        &test.env(),
        &order,
        &test.sign(&order),
        U256::from(50),
        taking(),
    );
    assert!(matches!(result, Err(Error::OrderExpired)));

    // The expiration itself is still valid.
    let env = Env {
        timestamp: NOW - 1,
        ..test.env()
    };
    test.engine
        .fill(&env, &order, &test.sign(&order), U256::from(50), taking())
        .unwrap();
}

#[test]
fn private_order() {
    let test = tests::setup().done();
    let allowed = Address::repeat_byte(0x0a);
    let traits = MakerTraitsFields::default()
        .with_allowed_sender(allowed)
        .encode()
        .unwrap();
    let order = test.order().with_maker_traits(traits).build();
    let signature = test.sign(&order);

    test.assets.mint(
        order.taker_asset,
        allowed,
        U256::from(tests::setup::INITIAL_BALANCE),
    );

    let result = test
        .engine
        .fill(&test.env(), &order, &signature, U256::from(50), taking());
    assert!(matches!(result, Err(Error::PrivateOrder)));

    let env = Env {
        sender: allowed,
        timestamp: NOW,
    };
    test.engine
        .fill(&env, &order, &signature, U256::from(50), taking())
        .unwrap();
}

#[test]
fn signature_of_another_key() {
    let test = tests::setup().done();
    let order = test.order().build();
    let impostor = PrivateKeySigner::from_bytes(&B256::repeat_byte(0x43)).unwrap();
    let signature =
        CompactSignature::sign(&test.engine.compute_order_hash(&order), &impostor);

    let result = test
        .engine
        .fill(&test.env(), &order, &signature, U256::from(50), taking());
    assert!(matches!(
        result,
        Err(Error::BadSignature(SignatureError::UnexpectedSigner { .. }))
    ));
}

/// Any change to the signed fields invalidates the signature.
#[test]
fn tampered_order() {
    let test = tests::setup().done();
    let order = test.order().build();
    let signature = test.sign(&order);

    for tampered in [
        model::Order {
            taking_amount: U256::from(1),
            ..order
        },
        model::Order {
            maker_traits: multiple_fills(),
            ..order
        },
        model::Order {
            receiver: Address::repeat_byte(1),
            ..order
        },
    ] {
        let result =
            test.engine
                .fill(&test.env(), &tampered, &signature, U256::from(1), taking());
        assert!(matches!(result, Err(Error::BadSignature(_))));
    }

    let result = test.engine.fill(
        &test.env(),
        &order,
        &CompactSignature::default(),
        U256::from(50),
        taking(),
    );
    assert!(matches!(result, Err(Error::BadSignature(_))));
}

#[test]
fn epoch() {
    let test = tests::setup().done();
    let traits = |epoch| {
        MakerTraitsFields {
            allow_multiple_fills: true,
            epoch_check: true,
            series: 3,
            nonce_or_epoch: epoch,
            ..Default::default()
        }
        .encode()
        .unwrap()
    };
    let current = test.order().with_maker_traits(traits(0)).build();
    let next = test.order().with_maker_traits(traits(1)).build();

    let result = test.engine.fill(
        &test.env(),
        &next,
        &test.sign(&next),
        U256::from(10),
        taking(),
    );
    assert!(matches!(result, Err(Error::InvalidatedOrder)));
    test.engine
        .fill(
            &test.env(),
            &current,
            &test.sign(&current),
            U256::from(10),
            taking(),
        )
        .unwrap();

    assert_eq!(test.engine.increase_epoch(&test.maker_env(), 3).unwrap(), 1);
    assert_eq!(test.engine.epoch(test.maker.address(), 3), 1);
    assert_eq!(test.engine.epoch(test.maker.address(), 0), 0);

    let result = test.engine.fill(
        &test.env(),
        &current,
        &test.sign(&current),
        U256::from(10),
        taking(),
    );
    assert!(matches!(result, Err(Error::InvalidatedOrder)));
    test.engine
        .fill(
            &test.env(),
            &next,
            &test.sign(&next),
            U256::from(10),
            taking(),
        )
        .unwrap();

    assert!(matches!(
        test.engine.advance_epoch(&test.maker_env(), 3, 0),
        Err(Error::ZeroAmount)
    ));
    assert_eq!(
        test.engine.advance_epoch(&test.maker_env(), 3, 255).unwrap(),
        256
    );
}

/// Epochs only work for orders using the remaining amount record.
#[test]
fn epoch_with_bit_invalidator() {
    let test = tests::setup().done();
    let traits = MakerTraitsFields {
        epoch_check: true,
        ..Default::default()
    }
    .encode()
    .unwrap();
    let order = test.order().with_maker_traits(traits).build();

    let result = test.engine.fill(
        &test.env(),
        &order,
        &test.sign(&order),
        U256::from(50),
        taking(),
    );
    assert!(matches!(result, Err(Error::InvalidatedOrder)));
}
