//! Storage seam for the catalog and bookings.
//!
//! `commit_reservation` is the only write path for slot capacity. Every
//! backend must run its availability check, the `booked_count` increment and
//! the booking insert as one unit, serialized per slot, and leave nothing
//! behind when it returns an error. Backends bound their own waiting (lock
//! and statement timeouts); callers never cancel a commit half way.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Booking, BookingDetail, BookingStatus, Experience, ExperienceSummary, NewExperience,
};
use crate::services::pricing::PriceBreakdown;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("timed out waiting for slot {0}")]
    LockTimeout(Uuid),

    #[error("commit task did not complete: {0}")]
    Interrupted(String),

    #[error("booking insert failed: {0}")]
    InsertFailed(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Everything needed to write a booking except the slot snapshot, which the
/// store copies inside the commit.
#[derive(Debug, Clone)]
pub struct ReservationDraft {
    pub booking_id: Uuid,
    pub experience_id: Uuid,
    pub slot_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub quantity: u32,
    pub promo_code: Option<String>,
    pub pricing: PriceBreakdown,
    pub created_at: DateTime<Utc>,
}

impl ReservationDraft {
    pub fn into_booking(self, date: NaiveDate, time: String) -> Booking {
        Booking {
            id: self.booking_id,
            experience_id: self.experience_id,
            slot_id: self.slot_id,
            full_name: self.full_name,
            email: self.email,
            quantity: self.quantity,
            date,
            time,
            promo_code: self.promo_code,
            discount_amount: self.pricing.discount,
            subtotal: self.pricing.subtotal,
            taxes: self.pricing.taxes,
            total: self.pricing.total,
            status: BookingStatus::Confirmed,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(Booking),
    SlotMissing,
    Insufficient { available: u32 },
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Summaries in creation order.
    async fn list_experiences(&self) -> Result<Vec<ExperienceSummary>, StoreError>;

    async fn get_experience(&self, id: Uuid) -> Result<Option<Experience>, StoreError>;

    async fn count_experiences(&self) -> Result<u64, StoreError>;

    async fn insert_experience(&self, new: NewExperience) -> Result<Experience, StoreError>;

    async fn commit_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<CommitOutcome, StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<BookingDetail>, StoreError>;
}
