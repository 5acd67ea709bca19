//! reservation.rs
//!
//! The reservation engine: the only component allowed to change slot
//! capacity.
//!
//! `reserve` checks its preconditions in a fixed order, each one
//! short-circuiting:
//! 1. request shape (quantity, name, email),
//! 2. the experience exists,
//! 3. the slot exists within that experience,
//! 4. the slot has enough units left.
//!
//! Check 4 is repeated inside `Store::commit_reservation`, where it runs in
//! the same atomic unit as the `booked_count` increment and the booking
//! insert. The early check only exists so obviously full slots never open a
//! transaction; availability never grows, so an early "no" is always final.
//!
//! Once handed to the store, a commit runs to completion on its own task.
//! An error from `reserve` therefore always means nothing was written.

use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{Booking, BookingDetail};
use crate::services::pricing::{PricingCalculator, PricingError, PromoOutcome};
use crate::store::{CommitOutcome, ReservationDraft, Store, StoreError};

/// What to do with a promo code that is not in the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoPolicy {
    /// Book without a discount and tell the caller.
    #[default]
    Ignore,
    /// Fail the whole request before touching the slot.
    Reject,
}

impl FromStr for PromoPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(PromoPolicy::Ignore),
            "reject" => Ok(PromoPolicy::Reject),
            other => Err(format!("expected ignore or reject, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub experience_id: Uuid,
    pub slot_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
    #[validate(custom(function = "validate_full_name"))]
    pub full_name: String,
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
    #[serde(default)]
    pub promo_code: Option<String>,
}

fn validate_full_name(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("full name is required".into());
        return Err(err);
    }
    Ok(())
}

/// `local@domain`: exactly one `@`, no whitespace, a non-empty local part,
/// and some dot in the domain with text on both sides of it. Trailing dots
/// are fine as long as an inner dot exists (`a@b.c.`).
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn validate_email_shape(value: &str) -> Result<(), ValidationError> {
    if is_valid_email(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("email");
    err.message = Some("invalid email format".into());
    Err(err)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

fn field_issues(errors: &ValidationErrors) -> Vec<FieldIssue> {
    let mut issues: Vec<FieldIssue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldIssue {
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    issues.sort_by(|a, b| a.field.cmp(&b.field));
    issues
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Experience,
    Slot,
    Booking,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Missing::Experience => "Experience",
            Missing::Slot => "Slot",
            Missing::Booking => "Booking",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldIssue>),

    #[error("{0} not found")]
    NotFound(Missing),

    #[error("insufficient availability: requested {requested}, available {available}")]
    InsufficientAvailability { available: u32, requested: u32 },

    #[error("invalid promo code {0}")]
    InvalidPromo(String),

    #[error("reservation commit failed: {0}")]
    CommitFailure(#[source] StoreError),

    #[error("storage unavailable: {0}")]
    Storage(#[source] StoreError),
}

impl ReservationError {
    /// Whether the whole `reserve` call may simply be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReservationError::CommitFailure(_) | ReservationError::Storage(_)
        )
    }

    fn single_issue(field: &str, message: impl Into<String>) -> Self {
        ReservationError::Validation(vec![FieldIssue {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

impl From<PricingError> for ReservationError {
    fn from(err: PricingError) -> Self {
        ReservationError::single_issue("quantity", err.to_string())
    }
}

/// A committed booking plus what happened to the requested promo code.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub booking: Booking,
    pub promo: PromoOutcome,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineSettings {
    pub promo_policy: PromoPolicy,
}

#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn Store>,
    pricing: PricingCalculator,
    settings: EngineSettings,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn Store>, pricing: PricingCalculator, settings: EngineSettings) -> Self {
        Self {
            store,
            pricing,
            settings,
        }
    }

    pub async fn reserve(
        &self,
        request: ReservationRequest,
    ) -> Result<Reservation, ReservationError> {
        request
            .validate()
            .map_err(|e| ReservationError::Validation(field_issues(&e)))?;
        let quantity = u32::try_from(request.quantity)
            .map_err(|_| ReservationError::single_issue("quantity", "quantity is too large"))?;

        let experience = self
            .store
            .get_experience(request.experience_id)
            .await
            .map_err(ReservationError::Storage)?
            .ok_or(ReservationError::NotFound(Missing::Experience))?;

        let slot = experience
            .slot(request.slot_id)
            .ok_or(ReservationError::NotFound(Missing::Slot))?;

        if slot.available() < quantity {
            return Err(ReservationError::InsufficientAvailability {
                available: slot.available(),
                requested: quantity,
            });
        }

        let quote = self
            .pricing
            .price(experience.price, quantity, request.promo_code.as_deref())?;

        if let Some(code) = quote.promo.invalid_code() {
            match self.settings.promo_policy {
                PromoPolicy::Reject => {
                    return Err(ReservationError::InvalidPromo(code.to_string()));
                }
                PromoPolicy::Ignore => {
                    warn!("Ignoring unknown promo code {} for slot {}", code, slot.id);
                }
            }
        }

        let draft = ReservationDraft {
            booking_id: Uuid::new_v4(),
            experience_id: experience.id,
            slot_id: slot.id,
            full_name: request.full_name.trim().to_string(),
            email: request.email.trim().to_string(),
            quantity,
            promo_code: quote.promo.applied_code().map(str::to_string),
            pricing: quote.breakdown,
            // TIMESTAMPTZ keeps microseconds
            created_at: Utc::now().trunc_subsecs(6),
        };

        // Detached: dropping this future must not cancel a commit in flight.
        let store = self.store.clone();
        let outcome = tokio::spawn(async move { store.commit_reservation(draft).await })
            .await
            .map_err(|e| ReservationError::CommitFailure(StoreError::Interrupted(e.to_string())))?
            .map_err(|e| {
                warn!("Reservation commit failed on slot {}: {}", slot.id, e);
                ReservationError::CommitFailure(e)
            })?;

        match outcome {
            CommitOutcome::Committed(booking) => {
                info!(
                    "Booking {} confirmed: {} x slot {} of experience {}, total {}",
                    booking.id, booking.quantity, booking.slot_id, booking.experience_id, booking.total
                );
                Ok(Reservation {
                    booking,
                    promo: quote.promo,
                })
            }
            CommitOutcome::SlotMissing => Err(ReservationError::NotFound(Missing::Slot)),
            CommitOutcome::Insufficient { available } => {
                info!(
                    "Slot {} lost a capacity race: requested {}, available {}",
                    slot.id, quantity, available
                );
                Err(ReservationError::InsufficientAvailability {
                    available,
                    requested: quantity,
                })
            }
        }
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<BookingDetail, ReservationError> {
        self.store
            .get_booking(id)
            .await
            .map_err(ReservationError::Storage)?
            .ok_or(ReservationError::NotFound(Missing::Booking))
    }
}
