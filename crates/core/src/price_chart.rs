//! Price chart entity, editable field set, and write-side validation.
//!
//! A price chart is a named, date-bounded price override for a package.
//! Validation lives here (not in the store adapters) so the edit session can
//! reject a bad draft before any store call is made.

use std::borrow::Cow;

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::CoreError;
use crate::types::{Date, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 100;

/// Maximum chart price (inclusive).
pub const MAX_PRICE: i64 = 100_000;

/// Number of decimals prices are stored and shown with.
pub const PRICE_DISPLAY_SCALE: i64 = 2;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A stored price chart. `id` and `package_id` are immutable once assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChart {
    pub id: DbId,
    pub package_id: DbId,
    pub title: String,
    pub start_date: Date,
    /// Exclusive upper bound.
    pub end_date: Date,
    pub price: BigDecimal,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PriceChart {
    /// Copy the editable fields into a fresh draft.
    pub fn to_draft(&self) -> ChartDraft {
        ChartDraft {
            title: self.title.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            price: self.price.clone(),
            is_active: self.is_active,
        }
    }
}

// ---------------------------------------------------------------------------
// Editable fields
// ---------------------------------------------------------------------------

/// The operator-editable fields of a chart, used for both create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_date_order"))]
pub struct ChartDraft {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    pub start_date: Date,
    pub end_date: Date,
    #[validate(custom(function = "validate_price"))]
    pub price: BigDecimal,
    pub is_active: bool,
}

impl ChartDraft {
    /// Validate the draft, flattening all failures into one message.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|errors| CoreError::Validation(describe(&errors)))
    }
}

/// Partial update payload. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChartPatch {
    pub title: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub price: Option<BigDecimal>,
    pub is_active: Option<bool>,
}

impl PriceChartPatch {
    /// Overlay this patch on `base`, producing the merged field set.
    pub fn apply_to(&self, base: ChartDraft) -> ChartDraft {
        ChartDraft {
            title: self.title.clone().unwrap_or(base.title),
            start_date: self.start_date.unwrap_or(base.start_date),
            end_date: self.end_date.unwrap_or(base.end_date),
            price: self.price.clone().unwrap_or(base.price),
            is_active: self.is_active.unwrap_or(base.is_active),
        }
    }

    /// A patch that overwrites every editable field with `draft`.
    pub fn from_draft(draft: &ChartDraft) -> Self {
        Self {
            title: Some(draft.title.clone()),
            start_date: Some(draft.start_date),
            end_date: Some(draft.end_date),
            price: Some(draft.price.clone()),
            is_active: Some(draft.is_active),
        }
    }
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

fn invalid(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(invalid("title_empty", "Title must not be empty".into()));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(invalid(
            "title_too_long",
            format!("Title must be at most {MAX_TITLE_LEN} characters, got {len}"),
        ));
    }
    Ok(())
}

fn validate_price(price: &BigDecimal) -> Result<(), ValidationError> {
    if *price < BigDecimal::from(0) {
        return Err(invalid(
            "price_negative",
            format!("Price must not be negative, got {price}"),
        ));
    }
    if *price > BigDecimal::from(MAX_PRICE) {
        return Err(invalid(
            "price_too_high",
            format!("Price must be at most {MAX_PRICE}, got {price}"),
        ));
    }
    if price.with_scale(PRICE_DISPLAY_SCALE) != *price {
        return Err(invalid(
            "price_precision",
            format!("Price must have at most {PRICE_DISPLAY_SCALE} decimals, got {price}"),
        ));
    }
    Ok(())
}

fn validate_date_order(draft: &ChartDraft) -> Result<(), ValidationError> {
    if draft.end_date <= draft.start_date {
        return Err(invalid(
            "date_order",
            format!(
                "End date ({}) must be after start date ({})",
                draft.end_date, draft.start_date
            ),
        ));
    }
    Ok(())
}

/// Render validation errors as a stable, `;`-separated message list.
fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Format a price with two decimals, rounding half up (`499` -> `"499.00"`).
pub fn format_price(price: &BigDecimal) -> String {
    price
        .with_scale_round(PRICE_DISPLAY_SCALE, RoundingMode::HalfUp)
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
