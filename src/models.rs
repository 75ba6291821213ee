//! Entity types shared between the database layer and the HTTP surface.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// User role, fixed at registration. Gates every privileged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Vendor,
    Admin,
}

/// Moderation state of a hoarding listing. Only admins move it out of `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum HoardingStatus {
    Pending,
    Approved,
    Rejected,
}

/// Billing granularity for a hoarding's base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PricePer {
    Day,
    Week,
    Month,
    Slot,
}

/// Booking lifecycle state. See `lifecycle` for the transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl std::str::FromStr for BookingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(()),
        }
    }
}

/// Installation sub-state, tracked independently of the booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InstallationStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
}

impl std::str::FromStr for InstallationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(()),
        }
    }
}

/// Admin sign-off on a completed booking's display proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl std::str::FromStr for VerificationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            _ => Err(()),
        }
    }
}

/// A named extra charge on a hoarding (printing, mounting, lighting, ...).
/// Only costs with `included == true` contribute to a booking's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalCost {
    pub name: String,
    pub cost: f64,
    #[serde(default)]
    pub included: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// An outdoor ad-space listing. `average_rating` and `review_count` are
/// derived and recomputed whenever a review is written.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Hoarding {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub kind: String,
    pub width_ft: f64,
    pub height_ft: f64,
    pub address: String,
    pub city: String,
    pub base_price: f64,
    pub price_per: PricePer,
    pub additional_costs: Json<Vec<AdditionalCost>>,
    pub status: HoardingStatus,
    pub average_rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A reservation of one hoarding for one date range.
///
/// The `base_price` / `price_per` / `additional_costs` / `total_price`
/// columns are a snapshot taken at creation time; they never track later
/// edits to the hoarding's live pricing.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Booking {
    pub id: String,
    pub hoarding_id: String,
    pub buyer_id: String,
    pub vendor_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub base_price: f64,
    pub price_per: PricePer,
    pub additional_costs: Json<Vec<AdditionalCost>>,
    pub total_price: f64,
    pub verification_status: VerificationStatus,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub installation_status: InstallationStatus,
    pub installation_scheduled_date: Option<NaiveDate>,
    pub installation_completed_date: Option<DateTime<Utc>>,
    pub installation_notes: Option<String>,
    pub proof_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One uploaded display-proof image attached to a booking.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProofImage {
    pub id: String,
    pub booking_id: String,
    pub url: String,
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Review {
    pub id: String,
    pub hoarding_id: String,
    pub booking_id: String,
    pub buyer_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
