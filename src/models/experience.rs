use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use uuid::Uuid;

/// A date/time instance of an experience with fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub total_capacity: u32,
    pub booked_count: u32,
}

impl Slot {
    pub fn available(&self) -> u32 {
        self.total_capacity.saturating_sub(self.booked_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub description: String,
    pub full_description: String,
    pub price: i64,
    pub image_url: String,
    pub slots: Vec<Slot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing projection: no slot detail.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceSummary {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub description: String,
    pub price: i64,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub available: u32,
    pub total_capacity: u32,
}

/// Detail view with live per-slot availability and the distinct slot dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceDetail {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub description: String,
    pub full_description: String,
    pub price: i64,
    pub image_url: String,
    pub dates: Vec<NaiveDate>,
    pub slots: Vec<SlotAvailability>,
}

impl Experience {
    pub fn slot(&self, slot_id: Uuid) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    pub fn summary(&self) -> ExperienceSummary {
        ExperienceSummary {
            id: self.id,
            title: self.title.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
        }
    }

    pub fn detail(&self) -> ExperienceDetail {
        // ISO dates order the same way as NaiveDate
        let dates: BTreeSet<NaiveDate> = self.slots.iter().map(|s| s.date).collect();

        ExperienceDetail {
            id: self.id,
            title: self.title.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            full_description: self.full_description.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
            dates: dates.into_iter().collect(),
            slots: self
                .slots
                .iter()
                .map(|s| SlotAvailability {
                    id: s.id,
                    date: s.date,
                    time: s.time.clone(),
                    available: s.available(),
                    total_capacity: s.total_capacity,
                })
                .collect(),
        }
    }
}

/// Catalog administration input (seeding).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExperience {
    pub title: String,
    pub location: String,
    pub description: String,
    pub full_description: String,
    pub price: i64,
    pub image_url: String,
    pub slots: Vec<NewSlot>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSlot {
    pub date: NaiveDate,
    pub time: String,
    pub total_capacity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(date: &str, time: &str, total: u32, booked: u32) -> Slot {
        Slot {
            id: Uuid::new_v4(),
            date: date.parse().unwrap(),
            time: time.to_string(),
            total_capacity: total,
            booked_count: booked,
        }
    }

    fn experience(slots: Vec<Slot>) -> Experience {
        Experience {
            id: Uuid::new_v4(),
            title: "Kayaking".into(),
            location: "Udupi".into(),
            description: "Small group".into(),
            full_description: "Small group, gear included".into(),
            price: 999,
            image_url: "https://example.com/k.jpg".into(),
            slots,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn detail_reports_availability_and_sorted_unique_dates() {
        let exp = experience(vec![
            slot("2025-10-24", "07:00 am", 6, 2),
            slot("2025-10-22", "07:00 am", 6, 0),
            slot("2025-10-24", "09:00 am", 4, 4),
            slot("2025-10-22", "09:00 am", 4, 1),
        ]);

        let detail = exp.detail();
        let dates: Vec<String> = detail.dates.iter().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2025-10-22", "2025-10-24"]);

        let available: Vec<u32> = detail.slots.iter().map(|s| s.available).collect();
        assert_eq!(available, vec![4, 6, 0, 3]);
    }

    #[test]
    fn detail_serializes_camel_case_with_iso_dates() {
        let exp = experience(vec![slot("2025-10-23", "11:00 am", 8, 3)]);
        let json = serde_json::to_value(exp.detail()).unwrap();

        assert_eq!(json["dates"][0], "2025-10-23");
        assert_eq!(json["slots"][0]["totalCapacity"], 8);
        assert_eq!(json["slots"][0]["available"], 5);
        assert_eq!(json["imageUrl"], "https://example.com/k.jpg");
        assert!(json.get("fullDescription").is_some());
    }

    #[test]
    fn slot_lookup_is_scoped_to_the_experience() {
        let exp = experience(vec![slot("2025-10-23", "11:00 am", 8, 0)]);
        let known = exp.slots[0].id;

        assert!(exp.slot(known).is_some());
        assert!(exp.slot(Uuid::new_v4()).is_none());
    }
}
