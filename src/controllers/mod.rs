pub mod bookings;
pub mod experiences;
pub mod promo;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(experiences::routes())
        .merge(bookings::routes())
        .merge(promo::routes())
}
