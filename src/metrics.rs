//! Metric name constants.

use std::time::Duration;

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config;

pub const AUTH_FAILED: &str = "adspace.auth.failed"; // Counter.

pub const BOOKINGS_CREATED: &str = "adspace.bookings.created"; // Counter.
pub const BOOKINGS_CONFLICT: &str = "adspace.bookings.conflict"; // Counter.
pub const BOOKING_TRANSITIONS: &str = "adspace.bookings.transitions"; // Counter.

pub const PROOFS_UPLOADED: &str = "adspace.proofs.uploaded"; // Counter.
pub const REVIEWS_CREATED: &str = "adspace.reviews.created"; // Counter.

/// Must be ran exactly once on startup. This will declare all of the instruments for `metrics`.
pub fn setup(config: Option<&config::MetricConfig>) -> anyhow::Result<()> {
    describe_counter!(AUTH_FAILED, "The number of failed authentication attempts.");

    describe_counter!(BOOKINGS_CREATED, "The number of bookings admitted.");
    describe_counter!(
        BOOKINGS_CONFLICT,
        "The number of booking requests rejected for a date-range conflict."
    );
    describe_counter!(
        BOOKING_TRANSITIONS,
        "The number of booking status transitions applied."
    );

    describe_counter!(PROOFS_UPLOADED, "The count of uploaded proof images.");
    describe_counter!(REVIEWS_CREATED, "The count of created reviews.");

    if let Some(config) = config {
        match config {
            config::MetricConfig::PrometheusPush { url } => {
                PrometheusBuilder::new()
                    .with_push_gateway(url.clone(), Duration::from_secs(10), None, None)
                    .context("failed to set up push gateway")?
                    .install()
                    .context("failed to install metrics exporter")?;
            }
        }
    }

    Ok(())
}
