use axum::Router;

use crate::AppState;

mod accounts;
mod bookings;
mod hoardings;
mod reviews;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(accounts::routes())
        .merge(bookings::routes())
        .merge(hoardings::routes())
        .merge(reviews::routes())
}
