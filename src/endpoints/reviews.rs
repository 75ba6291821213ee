//! Reviews of completed bookings, with synchronous rating aggregation.

use anyhow::{anyhow, Context as _};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use metrics::counter;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    metrics as m,
    models::{Booking, BookingStatus, Review, Role},
    AppState, Db, Error, Result,
};

#[derive(Deserialize)]
struct CreateReview {
    booking_id: String,
    rating: i64,
    comment: Option<String>,
}

async fn create_review(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Json(input): Json<CreateReview>,
) -> Result<(StatusCode, Json<Review>)> {
    user.require_role(Role::Buyer)?;

    if !(1..=5).contains(&input.rating) {
        return Err(Error::validation(anyhow!("rating must be between 1 and 5")));
    }

    let mut tx = db.begin().await.context("failed to begin transaction")?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(&input.booking_id)
        .fetch_optional(&mut *tx)
        .await
        .context("failed to fetch booking")?
        .ok_or_else(|| Error::not_found(anyhow!("booking not found")))?;

    if booking.buyer_id != user.id() {
        return Err(Error::forbidden(anyhow!(
            "only the booking's buyer may review it"
        )));
    }
    if booking.status != BookingStatus::Completed {
        return Err(Error::validation(anyhow!(
            "only a completed booking can be reviewed"
        )));
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO reviews (id, hoarding_id, booking_id, buyer_id, rating, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&booking.hoarding_id)
    .bind(&booking.id)
    .bind(user.id())
    .bind(input.rating)
    .bind(&input.comment)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(|e| match &e {
        // The UNIQUE constraint on booking_id enforces one review per booking.
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::conflict(anyhow!("this booking has already been reviewed"))
        }
        _ => anyhow::Error::new(e).context("failed to create review").into(),
    })?;

    // Recompute the hoarding's derived aggregates in the same transaction,
    // keeping the data flow explicit rather than leaning on a trigger.
    sqlx::query(
        r#"
        UPDATE hoardings
            SET average_rating = COALESCE(
                    (SELECT AVG(rating) FROM reviews WHERE hoarding_id = ?), 0),
                review_count =
                    (SELECT COUNT(*) FROM reviews WHERE hoarding_id = ?)
            WHERE id = ?
        "#,
    )
    .bind(&booking.hoarding_id)
    .bind(&booking.hoarding_id)
    .bind(&booking.hoarding_id)
    .execute(&mut *tx)
    .await
    .context("failed to recompute hoarding rating")?;

    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = ?")
        .bind(&id)
        .fetch_one(&mut *tx)
        .await
        .context("failed to fetch created review")?;

    tx.commit().await.context("failed to commit transaction")?;

    counter!(m::REVIEWS_CREATED).increment(1);

    Ok((StatusCode::CREATED, Json(review)))
}

pub fn routes() -> Router<AppState> {
    // AP /reviews (buyer)
    Router::new().route("/reviews", post(create_review))
}
