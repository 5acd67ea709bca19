use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

use experience_booking::models::{NewExperience, NewSlot};
use experience_booking::services::pricing::PricingCalculator;
use experience_booking::services::reservation::{
    EngineSettings, ReservationEngine, ReservationRequest,
};
use experience_booking::store::{MemoryStore, Store};

fn bench_pricing(c: &mut Criterion) {
    let pricing = PricingCalculator::default();

    c.bench_function("price_without_promo", |b| {
        b.iter(|| pricing.price(black_box(999), black_box(3), None))
    });
    c.bench_function("price_with_promo", |b| {
        b.iter(|| pricing.price(black_box(999), black_box(3), Some(black_box(" save10 "))))
    });
}

fn bench_reserve(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let store = Arc::new(MemoryStore::new(Duration::from_secs(2)));
    let experience = rt
        .block_on(store.insert_experience(NewExperience {
            title: "Coffee Trail".into(),
            location: "Coorg".into(),
            description: "Plantation walk".into(),
            full_description: "Plantation walk with tasting".into(),
            price: 1299,
            image_url: "https://example.com/coffee.jpg".into(),
            slots: vec![NewSlot {
                date: "2025-10-22".parse().expect("date"),
                time: "07:00 am".into(),
                total_capacity: u32::MAX,
            }],
        }))
        .expect("seed");
    let engine = ReservationEngine::new(
        store,
        PricingCalculator::default(),
        EngineSettings::default(),
    );
    let experience_id = experience.id;
    let slot_id = experience.slots[0].id;

    c.bench_function("reserve_single_slot", |b| {
        b.to_async(&rt).iter(|| {
            let engine = engine.clone();
            async move {
                engine
                    .reserve(ReservationRequest {
                        experience_id,
                        slot_id,
                        quantity: 1,
                        full_name: "Anika Rao".into(),
                        email: "anika@example.com".into(),
                        promo_code: Some("FLAT100".into()),
                    })
                    .await
                    .expect("reserve")
            }
        })
    });
}

criterion_group!(benches, bench_pricing, bench_reserve);
criterion_main!(benches);
