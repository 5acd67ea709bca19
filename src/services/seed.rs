//! Sample catalog for local runs and demos.

use chrono::{Days, NaiveDate};
use tracing::info;

use crate::models::{NewExperience, NewSlot};
use crate::store::{Store, StoreError};

const SUMMARY: &str =
    "Curated small-group experience. Certified guide. Safety first with gear included.";

// (time label, capacity)
static TIMES: [(&str, u32); 4] = [
    ("07:00 am", 6),
    ("09:00 am", 4),
    ("11:00 am", 8),
    ("01:00 pm", 5),
];

// (title, location, price, image, extra description)
static CATALOG: [(&str, &str, i64, &str, &str); 7] = [
    (
        "Kayaking",
        "Udupi",
        999,
        "https://images.unsplash.com/photo-1544551763-46a013bb70d5?w=800",
        " Helmet and Life jackets along with an expert will accompany in kayaking.",
    ),
    (
        "Nandi Hills Sunrise",
        "Bangalore",
        899,
        "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=800",
        "",
    ),
    (
        "Coffee Trail",
        "Coorg",
        1299,
        "https://images.unsplash.com/photo-1559827260-dc66d52bef19?w=800",
        "",
    ),
    (
        "Kayaking",
        "Udupi, Karnataka",
        999,
        "https://images.unsplash.com/photo-1502933691298-84fc14542831?w=800",
        "",
    ),
    (
        "Boat Cruise",
        "Sunderban",
        999,
        "https://images.unsplash.com/photo-1544551763-92f5f1b1b5d8?w=800",
        "",
    ),
    (
        "Bunjee Jumping",
        "Manali",
        999,
        "https://images.unsplash.com/photo-1519904981063-b0cf448d479e?w=800",
        "",
    ),
    (
        "Coffee Trail",
        "Coorg",
        1299,
        "https://images.unsplash.com/photo-1511593358241-7eea1f3c84e5?w=800",
        "",
    ),
];

/// Sample experiences, each with a date x time slot grid starting at
/// `first_date`. Grid size varies per experience: 3-5 dates, 2-3 times.
pub fn sample_catalog(first_date: NaiveDate) -> Vec<NewExperience> {
    CATALOG
        .iter()
        .enumerate()
        .map(|(index, (title, location, price, image, extra))| {
            let num_dates = 3 + index % 3;
            let num_times = 2 + index % 2;

            let slots = (0..num_dates)
                .filter_map(|d| first_date.checked_add_days(Days::new(d as u64)))
                .flat_map(|date| {
                    TIMES[..num_times].iter().map(move |(time, capacity)| NewSlot {
                        date,
                        time: time.to_string(),
                        total_capacity: *capacity,
                    })
                })
                .collect();

            NewExperience {
                title: title.to_string(),
                location: location.to_string(),
                description: SUMMARY.to_string(),
                full_description: format!("{SUMMARY}{extra}"),
                price: *price,
                image_url: image.to_string(),
                slots,
            }
        })
        .collect()
}

/// Inserts the sample catalog when the store is empty. Returns how many
/// experiences were added.
pub async fn seed_if_empty(store: &dyn Store, first_date: NaiveDate) -> Result<usize, StoreError> {
    if store.count_experiences().await? > 0 {
        info!("Catalog already contains data, skipping seed");
        return Ok(0);
    }

    let catalog = sample_catalog(first_date);
    let count = catalog.len();
    for experience in catalog {
        store.insert_experience(experience).await?;
    }

    info!("Catalog seeded with {} experiences", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn first_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 22).unwrap()
    }

    #[test]
    fn grid_is_deterministic() {
        let catalog = sample_catalog(first_date());

        assert_eq!(catalog.len(), 7);
        // index 0: 3 dates x 2 times, index 1: 4 x 3, index 2: 5 x 2
        assert_eq!(catalog[0].slots.len(), 6);
        assert_eq!(catalog[1].slots.len(), 12);
        assert_eq!(catalog[2].slots.len(), 10);
        assert_eq!(catalog[0].slots[0].time, "07:00 am");
        assert_eq!(catalog[0].slots[0].total_capacity, 6);
        assert_eq!(catalog[2].slots[9].date.to_string(), "2025-10-26");
    }

    #[tokio::test]
    async fn seeding_only_fills_an_empty_store() {
        let store = MemoryStore::default();

        assert_eq!(seed_if_empty(&store, first_date()).await.unwrap(), 7);
        assert_eq!(seed_if_empty(&store, first_date()).await.unwrap(), 0);
        assert_eq!(store.count_experiences().await.unwrap(), 7);
    }
}
