//! ords-validate
//!
//! Structural and referential checks on a decoded [`Order`] before it is
//! trusted by storage or the cache.
//!
//! Pure deterministic logic. No IO, no wall-clock: [`validate_order_at`] takes
//! `now` from the caller; [`validate_order`] is the convenience wrapper that
//! reads `Utc::now()`.
//!
//! Checks run in a fixed order (identifiers, timestamps, delivery, items,
//! payment, system fields) and the first violation wins.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use ords_schemas::{Item, Order};

mod error;

pub use error::{ItemViolation, ValidationError};

/// Validate against the current wall clock.
pub fn validate_order(order: &Order) -> Result<(), ValidationError> {
    validate_order_at(order, Utc::now())
}

/// Validate with an explicit `now` (used for the "not in the future" rule).
pub fn validate_order_at(order: &Order, now: DateTime<Utc>) -> Result<(), ValidationError> {
    // Identifiers.
    required("order_uid", &order.order_uid)?;
    required("track_number", &order.track_number)?;
    required("payment.transaction", &order.payment.transaction)?;

    // Timestamps.
    let created = match order.date_created {
        Some(ts) if !is_zero_time(ts) => ts,
        _ => return Err(ValidationError::MissingDateCreated),
    };
    if created > now {
        return Err(ValidationError::DateCreatedInFuture);
    }
    if order.payment.payment_dt <= 0 {
        return Err(ValidationError::NotPositive {
            field: "payment.payment_dt",
        });
    }

    // Delivery.
    required("delivery.name", &order.delivery.name)?;
    required("delivery.phone", &order.delivery.phone)?;
    required("delivery.address", &order.delivery.address)?;

    // Items.
    if order.items.is_empty() {
        return Err(ValidationError::NoItems);
    }
    let mut seen_chrt_ids: HashSet<i64> = HashSet::with_capacity(order.items.len());
    for (index, item) in order.items.iter().enumerate() {
        if let Err(violation) = validate_item(item, &order.track_number) {
            return Err(ValidationError::Item { index, violation });
        }
        if !seen_chrt_ids.insert(item.chrt_id) {
            return Err(ValidationError::DuplicateChrtId {
                index,
                chrt_id: item.chrt_id,
            });
        }
    }

    // Payment.
    if order.payment.amount <= 0 {
        return Err(ValidationError::NotPositive {
            field: "payment.amount",
        });
    }
    required("payment.currency", &order.payment.currency)?;
    required("payment.provider", &order.payment.provider)?;

    // System fields.
    required("customer_id", &order.customer_id)?;
    required("delivery_service", &order.delivery_service)?;

    Ok(())
}

fn validate_item(item: &Item, order_track_number: &str) -> Result<(), ItemViolation> {
    if item.track_number.is_empty() {
        return Err(ItemViolation::MissingTrackNumber);
    }
    if item.track_number != order_track_number {
        return Err(ItemViolation::TrackNumberMismatch);
    }
    if item.chrt_id == 0 {
        return Err(ItemViolation::ZeroChrtId);
    }
    Ok(())
}

/// `0001-01-01T00:00:00Z`, the value upstream producers serialize for an
/// unset timestamp.
const ZERO_TIME_UNIX_SECS: i64 = -62_135_596_800;

fn is_zero_time(ts: DateTime<Utc>) -> bool {
    ts.timestamp() == ZERO_TIME_UNIX_SECS && ts.timestamp_subsec_nanos() == 0
}

fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}
