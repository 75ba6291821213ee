//! Hoarding listings: vendor CRUD, public search and admin moderation.

use anyhow::{anyhow, Context as _};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{types::Json as SqlJson, QueryBuilder};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    db,
    models::{AdditionalCost, Hoarding, HoardingStatus, PricePer, Review, Role},
    AppState, Db, Error, Result,
};

#[derive(Deserialize)]
struct PricingInput {
    base_price: f64,
    per: PricePer,
    #[serde(default)]
    additional_costs: Vec<AdditionalCost>,
}

#[derive(Deserialize)]
struct CreateHoarding {
    name: String,
    kind: String,
    width_ft: f64,
    height_ft: f64,
    address: String,
    city: String,
    pricing: PricingInput,
}

#[derive(Deserialize)]
struct UpdateHoarding {
    name: Option<String>,
    kind: Option<String>,
    width_ft: Option<f64>,
    height_ft: Option<f64>,
    address: Option<String>,
    city: Option<String>,
    pricing: Option<PricingInput>,
}

#[derive(Deserialize)]
struct ListQuery {
    city: Option<String>,
    kind: Option<String>,
    q: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
struct ModerateInput {
    status: String,
}

async fn create_hoarding(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Json(input): Json<CreateHoarding>,
) -> Result<(StatusCode, Json<Hoarding>)> {
    user.require_role(Role::Vendor)?;

    if input.name.trim().is_empty() {
        return Err(Error::validation(anyhow!("name must not be empty")));
    }
    if input.pricing.base_price < 0.0 {
        return Err(Error::validation(anyhow!("base_price must be non-negative")));
    }
    if input.pricing.additional_costs.iter().any(|c| c.cost < 0.0) {
        return Err(Error::validation(anyhow!(
            "additional costs must be non-negative"
        )));
    }

    let id = Uuid::new_v4().to_string();

    // New listings always start out pending moderation.
    sqlx::query(
        r#"
        INSERT INTO hoardings
            (id, vendor_id, name, kind, width_ft, height_ft, address, city,
             base_price, price_per, additional_costs, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(&id)
    .bind(user.id())
    .bind(input.name.trim())
    .bind(&input.kind)
    .bind(input.width_ft)
    .bind(input.height_ft)
    .bind(&input.address)
    .bind(&input.city)
    .bind(input.pricing.base_price)
    .bind(input.pricing.per)
    .bind(SqlJson(&input.pricing.additional_costs))
    .bind(Utc::now())
    .execute(&db)
    .await
    .context("failed to create hoarding")?;

    let hoarding = fetch_hoarding(&db, &id).await?;
    Ok((StatusCode::CREATED, Json(hoarding)))
}

/// Public search over approved listings.
async fn list_hoardings(
    State(db): State<Db>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Hoarding>>> {
    let limit = db::page_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut qb = QueryBuilder::new("SELECT * FROM hoardings WHERE status = 'approved'");
    if let Some(city) = &query.city {
        qb.push(" AND city = ").push_bind(city);
    }
    if let Some(kind) = &query.kind {
        qb.push(" AND kind = ").push_bind(kind);
    }
    if let Some(q) = &query.q {
        let pattern = format!("%{q}%");
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR address LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let hoardings = qb
        .build_query_as::<Hoarding>()
        .fetch_all(&db)
        .await
        .context("failed to list hoardings")?;

    Ok(Json(hoardings))
}

async fn get_hoarding(
    user: Option<AuthenticatedUser>,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Hoarding>> {
    let hoarding = fetch_hoarding(&db, &id).await?;

    // Listings still under (or refused) moderation are only visible to the
    // owning vendor and admins; to everyone else they do not exist.
    if hoarding.status != HoardingStatus::Approved {
        let allowed = user
            .as_ref()
            .is_some_and(|u| u.id() == hoarding.vendor_id || u.role() == Role::Admin);
        if !allowed {
            return Err(Error::not_found(anyhow!("hoarding not found")));
        }
    }

    Ok(Json(hoarding))
}

async fn update_hoarding(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateHoarding>,
) -> Result<Json<Hoarding>> {
    let hoarding = fetch_hoarding(&db, &id).await?;
    if user.id() != hoarding.vendor_id {
        return Err(Error::forbidden(anyhow!(
            "only the owning vendor may edit a hoarding"
        )));
    }

    let (base_price, price_per, additional_costs) = match input.pricing {
        Some(p) => {
            if p.base_price < 0.0 {
                return Err(Error::validation(anyhow!("base_price must be non-negative")));
            }
            (p.base_price, p.per, SqlJson(p.additional_costs))
        }
        None => (
            hoarding.base_price,
            hoarding.price_per,
            SqlJson(hoarding.additional_costs.0.clone()),
        ),
    };

    sqlx::query(
        r#"
        UPDATE hoardings
            SET name = ?, kind = ?, width_ft = ?, height_ft = ?,
                address = ?, city = ?, base_price = ?, price_per = ?,
                additional_costs = ?
            WHERE id = ?
        "#,
    )
    .bind(input.name.unwrap_or(hoarding.name))
    .bind(input.kind.unwrap_or(hoarding.kind))
    .bind(input.width_ft.unwrap_or(hoarding.width_ft))
    .bind(input.height_ft.unwrap_or(hoarding.height_ft))
    .bind(input.address.unwrap_or(hoarding.address))
    .bind(input.city.unwrap_or(hoarding.city))
    .bind(base_price)
    .bind(price_per)
    .bind(additional_costs)
    .bind(&id)
    .execute(&db)
    .await
    .context("failed to update hoarding")?;

    let hoarding = fetch_hoarding(&db, &id).await?;
    Ok(Json(hoarding))
}

/// Admin moderation: approve or reject a listing.
async fn moderate_hoarding(
    user: AuthenticatedUser,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<ModerateInput>,
) -> Result<Json<Hoarding>> {
    user.require_role(Role::Admin)?;

    let status = match input.status.as_str() {
        "approved" => HoardingStatus::Approved,
        "rejected" => HoardingStatus::Rejected,
        other => {
            return Err(Error::validation(anyhow!(
                "moderation status must be approved or rejected, got {other:?}"
            )))
        }
    };

    // 404 before update so a bogus id doesn't report success.
    fetch_hoarding(&db, &id).await?;

    sqlx::query("UPDATE hoardings SET status = ? WHERE id = ?")
        .bind(status)
        .bind(&id)
        .execute(&db)
        .await
        .context("failed to moderate hoarding")?;

    let hoarding = fetch_hoarding(&db, &id).await?;
    Ok(Json(hoarding))
}

async fn list_reviews(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Vec<Review>>> {
    fetch_hoarding(&db, &id).await?;

    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE hoarding_id = ? ORDER BY created_at DESC",
    )
    .bind(&id)
    .fetch_all(&db)
    .await
    .context("failed to list reviews")?;

    Ok(Json(reviews))
}

async fn fetch_hoarding(db: &Db, id: &str) -> Result<Hoarding> {
    sqlx::query_as::<_, Hoarding>("SELECT * FROM hoardings WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch hoarding")?
        .ok_or_else(|| Error::not_found(anyhow!("hoarding not found")))
}

#[rustfmt::skip]
pub fn routes() -> Router<AppState> {
    // AP /hoardings                 (vendor)
    // UG /hoardings
    // UG /hoardings/{id}
    // AP /hoardings/{id}            (owning vendor)
    // AP /hoardings/{id}/status     (admin)
    // UG /hoardings/{id}/reviews
    Router::new()
        .route("/hoardings",               post(create_hoarding).get(list_hoardings))
        .route("/hoardings/{id}",          get(get_hoarding).patch(update_hoarding))
        .route("/hoardings/{id}/status",   patch(moderate_hoarding))
        .route("/hoardings/{id}/reviews",  get(list_reviews))
}
