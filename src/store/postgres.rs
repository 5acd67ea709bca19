use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

use super::{CommitOutcome, ReservationDraft, Store, StoreError};
use crate::database::Database;
use crate::models::{
    Booking, BookingDetail, BookingStatus, Experience, ExperienceSummary, NewExperience, Slot,
};

/// PostgreSQL store. Slot counters are rows in `slots`; a reservation is a
/// single transaction around a conditional `UPDATE` (row lock) and the
/// booking `INSERT`. The transaction is bounded by transaction-local
/// `lock_timeout` and `statement_timeout`; either one aborts and rolls back.
#[derive(Clone)]
pub struct PgStore {
    db: Database,
    lock_timeout: Duration,
    statement_timeout: Duration,
}

#[derive(FromRow)]
struct ExperienceRow {
    id: Uuid,
    title: String,
    location: String,
    description: String,
    full_description: String,
    price: i64,
    image_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SlotRow {
    id: Uuid,
    date: NaiveDate,
    time: String,
    total_capacity: i32,
    booked_count: i32,
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    experience_id: Uuid,
    slot_id: Uuid,
    full_name: String,
    email: String,
    quantity: i32,
    date: NaiveDate,
    time: String,
    promo_code: Option<String>,
    discount_amount: i64,
    subtotal: i64,
    taxes: i64,
    total: i64,
    status: String,
    created_at: DateTime<Utc>,
    title: String,
    location: String,
}

fn to_count(value: i32, what: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {what}: {value}")))
}

fn to_db_count(value: u32, what: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{what} out of range: {value}")))
}

impl TryFrom<SlotRow> for Slot {
    type Error = StoreError;

    fn try_from(row: SlotRow) -> Result<Self, Self::Error> {
        Ok(Slot {
            id: row.id,
            date: row.date,
            time: row.time,
            total_capacity: to_count(row.total_capacity, "total_capacity")?,
            booked_count: to_count(row.booked_count, "booked_count")?,
        })
    }
}

impl TryFrom<BookingRow> for BookingDetail {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("booking {}: {e}", row.id)))?;

        Ok(BookingDetail {
            booking: Booking {
                id: row.id,
                experience_id: row.experience_id,
                slot_id: row.slot_id,
                full_name: row.full_name,
                email: row.email,
                quantity: to_count(row.quantity, "quantity")?,
                date: row.date,
                time: row.time,
                promo_code: row.promo_code,
                discount_amount: row.discount_amount,
                subtotal: row.subtotal,
                taxes: row.taxes,
                total: row.total,
                status,
                created_at: row.created_at,
            },
            title: row.title,
            location: row.location,
        })
    }
}

impl PgStore {
    pub fn new(db: Database, lock_timeout: Duration, statement_timeout: Duration) -> Self {
        Self {
            db,
            lock_timeout,
            statement_timeout,
        }
    }

    async fn load_slots(&self, experience_id: Uuid) -> Result<Vec<Slot>, StoreError> {
        sqlx::query_as::<_, SlotRow>(
            "SELECT id, date, time, total_capacity, booked_count
             FROM slots
             WHERE experience_id = $1
             ORDER BY position",
        )
        .bind(experience_id)
        .fetch_all(&self.db.pool)
        .await?
        .into_iter()
        .map(Slot::try_from)
        .collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_experiences(&self) -> Result<Vec<ExperienceSummary>, StoreError> {
        let rows = sqlx::query_as::<_, ExperienceSummary>(
            "SELECT id, title, location, description, price, image_url
             FROM experiences
             ORDER BY created_at, id",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }

    async fn get_experience(&self, id: Uuid) -> Result<Option<Experience>, StoreError> {
        let row = sqlx::query_as::<_, ExperienceRow>(
            "SELECT id, title, location, description, full_description, price, image_url,
                    created_at, updated_at
             FROM experiences
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let slots = self.load_slots(id).await?;

        Ok(Some(Experience {
            id: row.id,
            title: row.title,
            location: row.location,
            description: row.description,
            full_description: row.full_description,
            price: row.price,
            image_url: row.image_url,
            slots,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn count_experiences(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM experiences")
            .fetch_one(&self.db.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_experience(&self, new: NewExperience) -> Result<Experience, StoreError> {
        let id = Uuid::new_v4();
        let mut tx = self.db.pool.begin().await?;

        sqlx::query(
            "INSERT INTO experiences (id, title, location, description, full_description, price, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&new.title)
        .bind(&new.location)
        .bind(&new.description)
        .bind(&new.full_description)
        .bind(new.price)
        .bind(&new.image_url)
        .execute(&mut *tx)
        .await?;

        for (position, slot) in new.slots.iter().enumerate() {
            sqlx::query(
                "INSERT INTO slots (id, experience_id, position, date, time, total_capacity)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(position as i32)
            .bind(slot.date)
            .bind(&slot.time)
            .bind(to_db_count(slot.total_capacity, "total_capacity")?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_experience(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("experience {id} vanished after insert")))
    }

    async fn commit_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<CommitOutcome, StoreError> {
        let mut tx = self.db.pool.begin().await?;

        sqlx::query(
            "SELECT set_config('lock_timeout', $1, true),
                    set_config('statement_timeout', $2, true)",
        )
        .bind(format!("{}ms", self.lock_timeout.as_millis()))
        .bind(format!("{}ms", self.statement_timeout.as_millis()))
        .execute(&mut *tx)
        .await?;

        // A quantity beyond INTEGER range can never fit; skip straight to the
        // availability lookup.
        let updated: Option<(NaiveDate, String)> = match i32::try_from(draft.quantity) {
            Ok(quantity) => {
                sqlx::query_as(
                    "UPDATE slots
                     SET booked_count = booked_count + $3
                     WHERE experience_id = $1 AND id = $2
                       AND booked_count <= total_capacity - $3
                     RETURNING date, time",
                )
                .bind(draft.experience_id)
                .bind(draft.slot_id)
                .bind(quantity)
                .fetch_optional(&mut *tx)
                .await?
            }
            Err(_) => None,
        };

        let Some((date, time)) = updated else {
            let current: Option<(i32, i32)> = sqlx::query_as(
                "SELECT total_capacity, booked_count FROM slots
                 WHERE experience_id = $1 AND id = $2",
            )
            .bind(draft.experience_id)
            .bind(draft.slot_id)
            .fetch_optional(&mut *tx)
            .await?;
            tx.rollback().await?;

            return Ok(match current {
                None => CommitOutcome::SlotMissing,
                Some((total, booked)) => CommitOutcome::Insufficient {
                    available: to_count(total - booked, "available")?,
                },
            });
        };

        let booking = draft.into_booking(date, time);
        let inserted = sqlx::query(
            "INSERT INTO bookings (
                 id, experience_id, slot_id, full_name, email, quantity, date, time,
                 promo_code, discount_amount, subtotal, taxes, total, status, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(booking.id)
        .bind(booking.experience_id)
        .bind(booking.slot_id)
        .bind(&booking.full_name)
        .bind(&booking.email)
        .bind(to_db_count(booking.quantity, "quantity")?)
        .bind(booking.date)
        .bind(&booking.time)
        .bind(&booking.promo_code)
        .bind(booking.discount_amount)
        .bind(booking.subtotal)
        .bind(booking.taxes)
        .bind(booking.total)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            error!("booking insert failed for slot {}: {:?}", booking.slot_id, e);
            let _ = tx.rollback().await;
            return Err(e.into());
        }

        tx.commit().await?;
        debug!("booking {} committed on slot {}", booking.id, booking.slot_id);

        Ok(CommitOutcome::Committed(booking))
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<BookingDetail>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT b.id, b.experience_id, b.slot_id, b.full_name, b.email, b.quantity,
                   b.date, b.time, b.promo_code, b.discount_amount, b.subtotal, b.taxes,
                   b.total, b.status, b.created_at, e.title, e.location
            FROM bookings b
            JOIN experiences e ON e.id = b.experience_id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        row.map(BookingDetail::try_from).transpose()
    }
}
