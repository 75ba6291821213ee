//! Booking lifecycle transition policy.
//!
//! All role and ownership gating for `PATCH /bookings/{id}/status` lives in
//! [`check_transition`] so the rules can be tested without a database or an
//! HTTP request in sight. The handler only gathers the inputs and maps a
//! denial to an HTTP error.

use thiserror::Error;

use crate::models::BookingStatus;

/// Why a requested transition was refused.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum Denied {
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Invalid(&'static str),
}

/// The caller's relationship to the booking, resolved server-side from the
/// authenticated user record. Admins go through the verification endpoint
/// and have no status-transition powers here.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    /// Caller is the booking's buyer.
    pub is_buyer: bool,
    /// Caller is the booking's vendor.
    pub is_vendor: bool,
}

/// Decide whether `actor` may move a booking from `current` to `target`.
///
/// The rules, exactly:
/// - buyer: `cancelled`, only while the booking is still `pending`;
/// - vendor: `accepted` (from `pending`), `rejected`, `cancelled`, and
///   `completed` provided at least one proof image is attached.
///
/// Everything else is refused. Note that a buyer cannot cancel an `accepted`
/// booking; only the vendor can back out at that point.
pub fn check_transition(
    actor: Actor,
    current: BookingStatus,
    target: BookingStatus,
    proof_count: i64,
) -> Result<(), Denied> {
    match target {
        BookingStatus::Pending => Err(Denied::Invalid("a booking cannot return to pending")),
        BookingStatus::Accepted => {
            if actor.is_vendor && current == BookingStatus::Pending {
                Ok(())
            } else if actor.is_vendor {
                Err(Denied::Invalid("only a pending booking can be accepted"))
            } else {
                Err(Denied::Forbidden("only the vendor may accept a booking"))
            }
        }
        BookingStatus::Rejected => {
            if actor.is_vendor {
                Ok(())
            } else {
                Err(Denied::Forbidden("only the vendor may reject a booking"))
            }
        }
        BookingStatus::Completed => {
            if !actor.is_vendor {
                Err(Denied::Forbidden("only the vendor may complete a booking"))
            } else if proof_count == 0 {
                Err(Denied::Invalid(
                    "at least one proof image is required before completion",
                ))
            } else {
                Ok(())
            }
        }
        BookingStatus::Cancelled => {
            if actor.is_vendor {
                Ok(())
            } else if actor.is_buyer && current == BookingStatus::Pending {
                Ok(())
            } else if actor.is_buyer {
                Err(Denied::Forbidden(
                    "a buyer may only cancel a booking while it is pending",
                ))
            } else {
                Err(Denied::Forbidden("not a party to this booking"))
            }
        }
    }
}
