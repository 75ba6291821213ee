//! Booking creation, lifecycle transitions and the sub-state endpoints.

use anyhow::{anyhow, Context as _};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    config::AppConfig,
    db, lifecycle,
    lifecycle::Denied,
    metrics as m,
    models::{Booking, BookingStatus, Hoarding, HoardingStatus, InstallationStatus, ProofImage, Role, VerificationStatus},
    pricing, storage, AppState, Db, Error, Result,
};

#[derive(Deserialize)]
struct CreateBooking {
    hoarding_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Deserialize)]
struct PageQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
struct StatusInput {
    status: String,
}

#[derive(Deserialize)]
struct InstallationInput {
    status: Option<String>,
    scheduled_date: Option<NaiveDate>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct VerificationInput {
    status: String,
    notes: Option<String>,
}

/// Date ranges occupied on a hoarding, for the public availability calendar.
#[derive(Serialize, sqlx::FromRow)]
struct BookedRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: BookingStatus,
}

/// Create a booking: admissibility check plus price snapshot, both inside
/// one transaction.
async fn create_booking(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Json(input): Json<CreateBooking>,
) -> Result<(StatusCode, Json<Booking>)> {
    user.require_role(Role::Buyer)?;

    if input.end_date <= input.start_date {
        return Err(Error::validation(anyhow!(
            "end_date must be strictly after start_date"
        )));
    }

    // The overlap check and the insert share a transaction on a single
    // SQLite pool, so two concurrent requests for the same dates cannot
    // both pass the check.
    let mut tx = db.begin().await.context("failed to begin transaction")?;

    let hoarding = sqlx::query_as::<_, Hoarding>("SELECT * FROM hoardings WHERE id = ?")
        .bind(&input.hoarding_id)
        .fetch_optional(&mut *tx)
        .await
        .context("failed to fetch hoarding")?;

    // An unapproved hoarding is not bookable and not distinguishable from a
    // missing one.
    let hoarding = match hoarding {
        Some(h) if h.status == HoardingStatus::Approved => h,
        _ => return Err(Error::not_found(anyhow!("hoarding not found"))),
    };

    if hoarding.base_price <= 0.0 {
        return Err(Error::validation(anyhow!(
            "hoarding has no usable pricing"
        )));
    }

    // Only pending and accepted bookings occupy dates; rejected, cancelled
    // and completed ones never block a new request.
    let conflicts: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM bookings
            WHERE hoarding_id = ?
            AND status IN ('pending', 'accepted')
            AND start_date <= ?
            AND end_date >= ?
        "#,
    )
    .bind(&hoarding.id)
    .bind(input.end_date)
    .bind(input.start_date)
    .fetch_one(&mut *tx)
    .await
    .context("failed to check availability")?;

    if conflicts > 0 {
        counter!(m::BOOKINGS_CONFLICT).increment(1);
        return Err(Error::conflict(anyhow!(
            "requested dates overlap an existing booking"
        )));
    }

    let total = pricing::quote(
        hoarding.base_price,
        hoarding.price_per,
        &hoarding.additional_costs.0,
        input.start_date,
        input.end_date,
    );

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO bookings
            (id, hoarding_id, buyer_id, vendor_id, start_date, end_date,
             status, base_price, price_per, additional_costs, total_price,
             created_at)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&hoarding.id)
    .bind(user.id())
    .bind(&hoarding.vendor_id)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(hoarding.base_price)
    .bind(hoarding.price_per)
    .bind(&hoarding.additional_costs)
    .bind(total)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .context("failed to create booking")?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(&id)
        .fetch_one(&mut *tx)
        .await
        .context("failed to fetch created booking")?;

    tx.commit().await.context("failed to commit transaction")?;

    counter!(m::BOOKINGS_CREATED).increment(1);
    info!(
        "booking {id}: hoarding {} for {}..={} at {total}",
        hoarding.id, input.start_date, input.end_date
    );

    Ok((StatusCode::CREATED, Json(booking)))
}

/// A buyer sees their own bookings; a vendor sees bookings on their
/// hoardings; an admin sees everything.
async fn list_my_bookings(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Booking>>> {
    let limit = db::page_limit(page.limit);
    let offset = page.offset.unwrap_or(0).max(0);

    let mut qb = QueryBuilder::new("SELECT * FROM bookings");
    match user.role() {
        Role::Buyer => {
            qb.push(" WHERE buyer_id = ").push_bind(user.id());
        }
        Role::Vendor => {
            qb.push(" WHERE vendor_id = ").push_bind(user.id());
        }
        Role::Admin => {}
    }
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let bookings = qb
        .build_query_as::<Booking>()
        .fetch_all(&db)
        .await
        .context("failed to list bookings")?;

    Ok(Json(bookings))
}

async fn get_booking(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Booking>> {
    let booking = fetch_booking(&db, &id).await?;

    let allowed = user.id() == booking.buyer_id
        || user.id() == booking.vendor_id
        || user.role() == Role::Admin;
    if !allowed {
        return Err(Error::forbidden(anyhow!("not a party to this booking")));
    }

    Ok(Json(booking))
}

/// Run a lifecycle transition. All gating lives in `lifecycle`.
async fn update_status(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<StatusInput>,
) -> Result<Json<Booking>> {
    let target: BookingStatus = input
        .status
        .parse()
        .map_err(|()| Error::validation(anyhow!("unknown booking status {:?}", input.status)))?;

    let booking = fetch_booking(&db, &id).await?;

    let proof_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM booking_proofs WHERE booking_id = ?")
            .bind(&id)
            .fetch_one(&db)
            .await
            .context("failed to count proof images")?;

    let actor = lifecycle::Actor {
        is_buyer: user.id() == booking.buyer_id,
        is_vendor: user.id() == booking.vendor_id,
    };
    if let Err(denial) = lifecycle::check_transition(actor, booking.status, target, proof_count) {
        return Err(match denial {
            Denied::Forbidden(_) => Error::forbidden(denial),
            Denied::Invalid(_) => Error::validation(denial),
        });
    }

    sqlx::query("UPDATE bookings SET status = ? WHERE id = ?")
        .bind(target)
        .bind(&id)
        .execute(&db)
        .await
        .context("failed to update booking status")?;

    counter!(m::BOOKING_TRANSITIONS).increment(1);
    info!("booking {id}: {:?} -> {target:?}", booking.status);

    let booking = fetch_booking(&db, &id).await?;
    Ok(Json(booking))
}

/// Append display-proof images (multipart file fields, plus an optional
/// `notes` text field). Never transitions the booking by itself; the
/// `completed` transition separately checks that this list is non-empty.
async fn upload_proof(
    user: AuthenticatedUser,
    State(db): State<Db>,
    State(config): State<AppConfig>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Vec<ProofImage>>> {
    let booking = fetch_booking(&db, &id).await?;
    if user.id() != booking.vendor_id {
        return Err(Error::forbidden(anyhow!(
            "only the booking's vendor may attach proof"
        )));
    }

    let mut stored = 0usize;
    let mut notes: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(anyhow!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("notes") {
            notes = Some(
                field
                    .text()
                    .await
                    .map_err(|e| Error::validation(anyhow!("malformed notes field: {e}")))?,
            );
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::validation(anyhow!("failed to read upload: {e}")))?;

        if data.is_empty() {
            continue;
        }
        if data.len() as u64 > config.blob.limit {
            return Err(Error::validation(anyhow!(
                "image exceeds the {} byte upload limit",
                config.blob.limit
            )));
        }

        let blob = storage::store(&config.blob, &data, &content_type).await?;
        sqlx::query(
            r#"
            INSERT INTO booking_proofs (id, booking_id, url, storage_key, uploaded_at)
                VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(&blob.url)
        .bind(&blob.key)
        .bind(Utc::now())
        .execute(&db)
        .await
        .context("failed to record proof image")?;

        counter!(m::PROOFS_UPLOADED).increment(1);
        stored += 1;
    }

    if let Some(notes) = &notes {
        sqlx::query("UPDATE bookings SET proof_notes = ? WHERE id = ?")
            .bind(notes)
            .bind(&id)
            .execute(&db)
            .await
            .context("failed to update proof notes")?;
    }

    if stored == 0 && notes.is_none() {
        return Err(Error::validation(anyhow!("no proof images provided")));
    }

    let proofs = sqlx::query_as::<_, ProofImage>(
        "SELECT * FROM booking_proofs WHERE booking_id = ? ORDER BY uploaded_at",
    )
    .bind(&id)
    .fetch_all(&db)
    .await
    .context("failed to list proof images")?;

    Ok(Json(proofs))
}

/// Update the installation sub-state. Deliberately unguarded against the
/// booking's own status (an installation can be edited on a rejected
/// booking); `completed_date` is stamped on the first completion only.
async fn update_installation(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<InstallationInput>,
) -> Result<Json<Booking>> {
    let booking = fetch_booking(&db, &id).await?;
    if user.id() != booking.vendor_id {
        return Err(Error::forbidden(anyhow!(
            "only the booking's vendor may update installation"
        )));
    }

    let status = match &input.status {
        Some(s) => s.parse::<InstallationStatus>().map_err(|()| {
            Error::validation(anyhow!("unknown installation status {s:?}"))
        })?,
        None => booking.installation_status,
    };

    let completed_date = if status == InstallationStatus::Completed
        && booking.installation_completed_date.is_none()
    {
        Some(Utc::now())
    } else {
        booking.installation_completed_date
    };

    sqlx::query(
        r#"
        UPDATE bookings
            SET installation_status = ?, installation_scheduled_date = ?,
                installation_completed_date = ?, installation_notes = ?
            WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(input.scheduled_date.or(booking.installation_scheduled_date))
    .bind(completed_date)
    .bind(input.notes.or(booking.installation_notes))
    .bind(&id)
    .execute(&db)
    .await
    .context("failed to update installation")?;

    let booking = fetch_booking(&db, &id).await?;
    Ok(Json(booking))
}

/// Admin sign-off on a booking's proof, recording who verified and when.
async fn update_verification(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<VerificationInput>,
) -> Result<Json<Booking>> {
    user.require_role(Role::Admin)?;

    let status = input.status.parse::<VerificationStatus>().map_err(|()| {
        Error::validation(anyhow!("unknown verification status {:?}", input.status))
    })?;

    fetch_booking(&db, &id).await?;

    sqlx::query(
        r#"
        UPDATE bookings
            SET verification_status = ?, verified_by = ?, verified_at = ?,
                verification_notes = ?
            WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(user.id())
    .bind(Utc::now())
    .bind(&input.notes)
    .bind(&id)
    .execute(&db)
    .await
    .context("failed to update verification")?;

    let booking = fetch_booking(&db, &id).await?;
    Ok(Json(booking))
}

/// Public availability calendar: the date ranges currently occupying a
/// hoarding.
async fn hoarding_calendar(
    State(db): State<Db>,
    Path(hoarding_id): Path<String>,
) -> Result<Json<Vec<BookedRange>>> {
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hoardings WHERE id = ?")
        .bind(&hoarding_id)
        .fetch_one(&db)
        .await
        .context("failed to fetch hoarding")?;
    if exists == 0 {
        return Err(Error::not_found(anyhow!("hoarding not found")));
    }

    let ranges = sqlx::query_as::<_, BookedRange>(
        r#"
        SELECT start_date, end_date, status FROM bookings
            WHERE hoarding_id = ?
            AND status IN ('pending', 'accepted')
            ORDER BY start_date
        "#,
    )
    .bind(&hoarding_id)
    .fetch_all(&db)
    .await
    .context("failed to list booked ranges")?;

    Ok(Json(ranges))
}

async fn fetch_booking(db: &Db, id: &str) -> Result<Booking> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch booking")?
        .ok_or_else(|| Error::not_found(anyhow!("booking not found")))
}

#[rustfmt::skip]
pub fn routes() -> Router<AppState> {
    // AP /bookings                          (buyer)
    // AG /bookings/me                       (buyer/vendor)
    // UG /bookings/hoarding/{hoarding_id}
    // AG /bookings/{id}                     (ownership-checked)
    // AP /bookings/{id}/status              (buyer/vendor per policy)
    // AP /bookings/{id}/proof               (vendor)
    // AP /bookings/{id}/installation        (vendor)
    // AP /bookings/{id}/verification        (admin)
    Router::new()
        .route("/bookings",                        post(create_booking))
        .route("/bookings/me",                     get(list_my_bookings))
        .route("/bookings/hoarding/{hoarding_id}", get(hoarding_calendar))
        .route("/bookings/{id}",                   get(get_booking))
        .route("/bookings/{id}/status",            patch(update_status))
        .route("/bookings/{id}/proof",             patch(upload_proof))
        .route("/bookings/{id}/installation",      patch(update_installation))
        .route("/bookings/{id}/verification",      patch(update_verification))
}
