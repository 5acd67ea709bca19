mod common;

use common::{fixture, request, Fixture};
use experience_booking::services::reservation::ReservationError;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use futures::future::join_all;
use proptest::prelude::*;
use proptest::test_runner::Config;
use std::sync::Arc;

async fn race(fx: &Arc<Fixture>, slot_index: usize, attempts: usize, quantity: i64) -> (usize, usize) {
    let handles = (0..attempts).map(|_| {
        let fx = fx.clone();
        tokio::spawn(async move {
            let mut req = request(&fx.experience, slot_index, quantity);
            req.full_name = Name().fake();
            req.email = SafeEmail().fake();
            fx.engine.reserve(req).await
        })
    });

    let mut succeeded = 0;
    let mut sold_out = 0;
    for result in join_all(handles).await {
        match result.expect("reservation task panicked") {
            Ok(_) => succeeded += 1,
            Err(ReservationError::InsufficientAvailability { requested, .. }) => {
                assert_eq!(requested as i64, quantity);
                sold_out += 1;
            }
            Err(other) => panic!("unexpected rejection: {other:?}"),
        }
    }
    (succeeded, sold_out)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn exactly_capacity_single_unit_reservations_succeed() {
    let fx = Arc::new(fixture(100, &[7]).await);

    let (succeeded, sold_out) = race(&fx, 0, 50, 1).await;

    assert_eq!(succeeded, 7);
    assert_eq!(sold_out, 43);
    assert_eq!(fx.booked(0).await, 7);
    assert_eq!(fx.held_units(0), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn multi_unit_races_never_oversell() {
    let fx = Arc::new(fixture(100, &[10]).await);

    let (succeeded, _) = race(&fx, 0, 40, 3).await;

    // 3 + 3 + 3 fits in 10, a fourth would not
    assert_eq!(succeeded, 3);
    assert_eq!(fx.booked(0).await, 9);
    assert_eq!(fx.held_units(0), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn slots_of_one_experience_fill_independently() {
    let fx = Arc::new(fixture(100, &[4, 6]).await);

    let (first, second) = tokio::join!(race(&fx, 0, 20, 1), race(&fx, 1, 20, 1));

    assert_eq!(first.0, 4);
    assert_eq!(second.0, 6);
    assert_eq!(fx.booked(0).await, 4);
    assert_eq!(fx.booked(1).await, 6);
}

proptest! {
    #![proptest_config(Config::with_cases(48))]
    #[test]
    fn booked_count_always_matches_confirmed_bookings(
        capacity in 1_u32..20,
        quantities in proptest::collection::vec(0_i64..8, 1..30),
    ) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let fx = Arc::new(fixture(250, &[capacity]).await);

            let handles = quantities.iter().map(|&quantity| {
                let fx = fx.clone();
                tokio::spawn(async move { fx.engine.reserve(request(&fx.experience, 0, quantity)).await })
            });
            let results = join_all(handles).await;

            let accepted: u32 = results
                .iter()
                .filter_map(|r| r.as_ref().ok())
                .filter_map(|r| r.as_ref().ok())
                .map(|reservation| reservation.booking.quantity)
                .sum();

            let booked = fx.booked(0).await;
            assert!(booked <= capacity);
            assert_eq!(booked, accepted);
            assert_eq!(fx.held_units(0), booked);

            for result in results {
                match result.unwrap() {
                    Ok(_) => {}
                    Err(ReservationError::Validation(_)) => {}
                    Err(ReservationError::InsufficientAvailability { available, requested }) => {
                        assert!(available < requested);
                    }
                    Err(other) => panic!("unexpected rejection: {other:?}"),
                }
            }
        });
    }
}
