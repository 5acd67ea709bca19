use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CommitOutcome, ReservationDraft, Store, StoreError};
use crate::models::{
    Booking, BookingDetail, Experience, ExperienceSummary, NewExperience, Slot,
};

/// In-process store. Each slot counter sits behind its own mutex, so
/// reservations on different slots never contend.
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
    lock_timeout: Duration,
    fail_inserts: AtomicBool,
}

#[derive(Default)]
struct Catalog {
    order: Vec<Arc<ExperienceEntry>>,
    by_id: HashMap<Uuid, Arc<ExperienceEntry>>,
}

struct ExperienceEntry {
    experience: Experience,
    slots: Vec<SlotEntry>,
}

struct SlotEntry {
    id: Uuid,
    date: NaiveDate,
    time: String,
    total_capacity: u32,
    booked: Mutex<u32>,
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            catalog: RwLock::new(Catalog::default()),
            bookings: RwLock::new(HashMap::new()),
            lock_timeout,
            fail_inserts: AtomicBool::new(false),
        }
    }

    /// Makes every following booking insert fail, which drives the commit
    /// rollback path. Used by tests and fault drills.
    pub fn set_insert_failure(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn bookings_for_slot(&self, slot_id: Uuid) -> Vec<Booking> {
        self.bookings
            .read()
            .values()
            .filter(|b| b.slot_id == slot_id)
            .cloned()
            .collect()
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.read().len()
    }

    fn entry(&self, id: Uuid) -> Option<Arc<ExperienceEntry>> {
        self.catalog.read().by_id.get(&id).cloned()
    }

    fn snapshot(&self, entry: &ExperienceEntry) -> Result<Experience, StoreError> {
        let mut experience = entry.experience.clone();
        experience.slots = entry
            .slots
            .iter()
            .map(|slot| {
                let booked = slot
                    .booked
                    .try_lock_for(self.lock_timeout)
                    .ok_or(StoreError::LockTimeout(slot.id))?;
                Ok(Slot {
                    id: slot.id,
                    date: slot.date,
                    time: slot.time.clone(),
                    total_capacity: slot.total_capacity,
                    booked_count: *booked,
                })
            })
            .collect::<Result<_, StoreError>>()?;
        Ok(experience)
    }

    fn insert_booking(&self, booking: Booking) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::InsertFailed("insert failure injected".to_string()));
        }
        let mut bookings = self.bookings.write();
        if bookings.contains_key(&booking.id) {
            return Err(StoreError::InsertFailed(format!(
                "duplicate booking id {}",
                booking.id
            )));
        }
        bookings.insert(booking.id, booking);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_experiences(&self) -> Result<Vec<ExperienceSummary>, StoreError> {
        Ok(self
            .catalog
            .read()
            .order
            .iter()
            .map(|e| e.experience.summary())
            .collect())
    }

    async fn get_experience(&self, id: Uuid) -> Result<Option<Experience>, StoreError> {
        match self.entry(id) {
            Some(entry) => self.snapshot(&entry).map(Some),
            None => Ok(None),
        }
    }

    async fn count_experiences(&self) -> Result<u64, StoreError> {
        Ok(self.catalog.read().order.len() as u64)
    }

    async fn insert_experience(&self, new: NewExperience) -> Result<Experience, StoreError> {
        let now = Utc::now();
        let slots: Vec<SlotEntry> = new
            .slots
            .into_iter()
            .map(|s| SlotEntry {
                id: Uuid::new_v4(),
                date: s.date,
                time: s.time,
                total_capacity: s.total_capacity,
                booked: Mutex::new(0),
            })
            .collect();

        let experience = Experience {
            id: Uuid::new_v4(),
            title: new.title,
            location: new.location,
            description: new.description,
            full_description: new.full_description,
            price: new.price,
            image_url: new.image_url,
            slots: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let entry = Arc::new(ExperienceEntry { experience, slots });

        {
            let mut catalog = self.catalog.write();
            catalog.order.push(entry.clone());
            catalog.by_id.insert(entry.experience.id, entry.clone());
        }

        self.snapshot(&entry)
    }

    async fn commit_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<CommitOutcome, StoreError> {
        let Some(entry) = self.entry(draft.experience_id) else {
            return Ok(CommitOutcome::SlotMissing);
        };
        let Some(slot) = entry.slots.iter().find(|s| s.id == draft.slot_id) else {
            return Ok(CommitOutcome::SlotMissing);
        };

        // Critical section: check, increment, insert. No await inside.
        let mut booked = slot
            .booked
            .try_lock_for(self.lock_timeout)
            .ok_or(StoreError::LockTimeout(slot.id))?;

        let available = slot.total_capacity.saturating_sub(*booked);
        let quantity = draft.quantity;
        if quantity > available {
            return Ok(CommitOutcome::Insufficient { available });
        }

        *booked += quantity;
        let booking = draft.into_booking(slot.date, slot.time.clone());
        if let Err(e) = self.insert_booking(booking.clone()) {
            *booked -= quantity;
            warn!("rolled back {} units on slot {}: {}", quantity, slot.id, e);
            return Err(e);
        }

        debug!(
            "slot {} booked {}/{}",
            slot.id, *booked, slot.total_capacity
        );
        Ok(CommitOutcome::Committed(booking))
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<BookingDetail>, StoreError> {
        let Some(booking) = self.bookings.read().get(&id).cloned() else {
            return Ok(None);
        };
        let entry = self.entry(booking.experience_id).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "booking {} references missing experience {}",
                booking.id, booking.experience_id
            ))
        })?;

        Ok(Some(BookingDetail {
            title: entry.experience.title.clone(),
            location: entry.experience.location.clone(),
            booking,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSlot;
    use crate::services::pricing::PriceBreakdown;

    fn new_experience(capacity: u32) -> NewExperience {
        NewExperience {
            title: "Boat Cruise".into(),
            location: "Sunderban".into(),
            description: "River cruise".into(),
            full_description: "River cruise with a guide".into(),
            price: 999,
            image_url: "https://example.com/boat.jpg".into(),
            slots: vec![NewSlot {
                date: "2025-10-22".parse().unwrap(),
                time: "07:00 am".into(),
                total_capacity: capacity,
            }],
        }
    }

    fn draft(experience: &Experience, quantity: u32) -> ReservationDraft {
        ReservationDraft {
            booking_id: Uuid::new_v4(),
            experience_id: experience.id,
            slot_id: experience.slots[0].id,
            full_name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            quantity,
            promo_code: None,
            pricing: PriceBreakdown { subtotal: 999, discount: 0, taxes: 50, total: 1_049 },
            created_at: Utc::now(),
        }
    }

    async fn booked(store: &MemoryStore, experience: &Experience) -> u32 {
        store
            .get_experience(experience.id)
            .await
            .unwrap()
            .unwrap()
            .slots[0]
            .booked_count
    }

    #[tokio::test]
    async fn commit_increments_and_snapshots_slot() {
        let store = MemoryStore::default();
        let exp = store.insert_experience(new_experience(5)).await.unwrap();

        let outcome = store.commit_reservation(draft(&exp, 2)).await.unwrap();
        let CommitOutcome::Committed(booking) = outcome else {
            panic!("expected commit, got {outcome:?}");
        };

        assert_eq!(booking.date.to_string(), "2025-10-22");
        assert_eq!(booking.time, "07:00 am");
        assert_eq!(booked(&store, &exp).await, 2);
        assert_eq!(store.bookings_for_slot(exp.slots[0].id).len(), 1);
    }

    #[tokio::test]
    async fn commit_refuses_beyond_capacity() {
        let store = MemoryStore::default();
        let exp = store.insert_experience(new_experience(5)).await.unwrap();
        store.commit_reservation(draft(&exp, 3)).await.unwrap();

        let outcome = store.commit_reservation(draft(&exp, 3)).await.unwrap();

        assert_eq!(outcome, CommitOutcome::Insufficient { available: 2 });
        assert_eq!(booked(&store, &exp).await, 3);
        assert_eq!(store.booking_count(), 1);
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_the_increment() {
        let store = MemoryStore::default();
        let exp = store.insert_experience(new_experience(5)).await.unwrap();
        store.set_insert_failure(true);

        let err = store.commit_reservation(draft(&exp, 2)).await.unwrap_err();

        assert!(matches!(err, StoreError::InsertFailed(_)));
        assert_eq!(booked(&store, &exp).await, 0);
        assert_eq!(store.booking_count(), 0);
    }

    #[tokio::test]
    async fn unknown_slot_is_reported_as_missing() {
        let store = MemoryStore::default();
        let exp = store.insert_experience(new_experience(5)).await.unwrap();
        let mut d = draft(&exp, 1);
        d.slot_id = Uuid::new_v4();

        assert_eq!(
            store.commit_reservation(d).await.unwrap(),
            CommitOutcome::SlotMissing
        );
    }

    #[tokio::test]
    async fn listing_keeps_insertion_order() {
        let store = MemoryStore::default();
        let mut first = new_experience(1);
        first.title = "First".into();
        let mut second = new_experience(1);
        second.title = "Second".into();
        store.insert_experience(first).await.unwrap();
        store.insert_experience(second).await.unwrap();

        let titles: Vec<String> = store
            .list_experiences()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(store.count_experiences().await.unwrap(), 2);
    }
}
