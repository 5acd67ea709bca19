#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use experience_booking::models::{Experience, NewExperience, NewSlot};
use experience_booking::services::pricing::PricingCalculator;
use experience_booking::services::reservation::{
    EngineSettings, PromoPolicy, ReservationEngine, ReservationRequest,
};
use experience_booking::store::{MemoryStore, Store};
use uuid::Uuid;

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub engine: ReservationEngine,
    pub experience: Experience,
}

pub fn new_experience(price: i64, capacities: &[u32]) -> NewExperience {
    NewExperience {
        title: "Nandi Hills Sunrise".into(),
        location: "Bangalore".into(),
        description: "Sunrise trek".into(),
        full_description: "Sunrise trek with a certified guide".into(),
        price,
        image_url: "https://example.com/nandi.jpg".into(),
        slots: capacities
            .iter()
            .enumerate()
            .map(|(i, capacity)| NewSlot {
                date: "2025-10-22".parse().unwrap(),
                time: format!("{:02}:00 am", 7 + i),
                total_capacity: *capacity,
            })
            .collect(),
    }
}

pub async fn fixture_with(price: i64, capacities: &[u32], policy: PromoPolicy) -> Fixture {
    let store = Arc::new(MemoryStore::new(Duration::from_secs(2)));
    let experience = store
        .insert_experience(new_experience(price, capacities))
        .await
        .unwrap();
    let engine = ReservationEngine::new(
        store.clone(),
        PricingCalculator::default(),
        EngineSettings {
            promo_policy: policy,
        },
    );
    Fixture { store, engine, experience }
}

pub async fn fixture(price: i64, capacities: &[u32]) -> Fixture {
    fixture_with(price, capacities, PromoPolicy::Ignore).await
}

pub fn request(experience: &Experience, slot_index: usize, quantity: i64) -> ReservationRequest {
    ReservationRequest {
        experience_id: experience.id,
        slot_id: experience.slots[slot_index].id,
        quantity,
        full_name: "Meera Iyer".into(),
        email: "meera@example.com".into(),
        promo_code: None,
    }
}

impl Fixture {
    pub async fn booked(&self, slot_index: usize) -> u32 {
        self.store
            .get_experience(self.experience.id)
            .await
            .unwrap()
            .unwrap()
            .slots[slot_index]
            .booked_count
    }

    pub fn slot_id(&self, slot_index: usize) -> Uuid {
        self.experience.slots[slot_index].id
    }

    /// Sum of quantities over bookings that still hold capacity.
    pub fn held_units(&self, slot_index: usize) -> u32 {
        self.store
            .bookings_for_slot(self.slot_id(slot_index))
            .iter()
            .filter(|b| b.status.holds_capacity())
            .map(|b| b.quantity)
            .sum()
    }
}
