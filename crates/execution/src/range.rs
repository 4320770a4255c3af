//! Bin range selection around the active bin.
//!
//! Bin prices follow a geometric ladder with base 1.0001, so a target price
//! maps to a bin offset of `ln(target / current) / ln(1.0001)`. Offsets are
//! truncated toward zero and then pushed outward to at least one bin per
//! side, which keeps the active bin strictly inside every computed range.

use thiserror::Error;

/// Geometric base of the bin price ladder.
pub const BIN_STEP_BASE: f64 = 1.0001;

/// Half-width of the degraded fallback range, in bins.
pub const FALLBACK_RADIUS: i32 = 100;

/// Inclusive bin id range for a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    /// Lowest bin id of the range.
    pub min_bin_id: i32,
    /// Highest bin id of the range.
    pub max_bin_id: i32,
}

impl BinRange {
    /// Whether `other` lies entirely inside this range.
    #[must_use]
    pub fn contains(&self, other: &BinRange) -> bool {
        self.min_bin_id <= other.min_bin_id && other.max_bin_id <= self.max_bin_id
    }

    /// Number of bins covered, inclusive.
    #[must_use]
    pub fn bin_count(&self) -> u32 {
        (self.max_bin_id - self.min_bin_id).unsigned_abs() + 1
    }
}

/// Rejected inputs to range selection.
#[derive(Debug, Error, PartialEq)]
pub enum RangeError {
    /// Percentage must be in `(0, 100)`.
    #[error("range percentage must be in (0, 100), got {0}")]
    InvalidPercentage(f64),
    /// Price must be a positive finite value.
    #[error("current price must be positive, got {0}")]
    InvalidPrice(f64),
    /// Radius must cover at least one bin.
    #[error("bin radius must be at least 1, got {0}")]
    InvalidRadius(i32),
}

/// Bin range spanning `percentage` percent around the current price.
///
/// Both bounds derive from the price ladder, so equal percentages up and
/// down yield asymmetric bin counts.
pub fn range_for_percentage(
    active_bin_id: i32,
    current_price: f64,
    percentage: f64,
) -> Result<BinRange, RangeError> {
    if !(percentage > 0.0 && percentage < 100.0) {
        return Err(RangeError::InvalidPercentage(percentage));
    }
    if !(current_price > 0.0 && current_price.is_finite()) {
        return Err(RangeError::InvalidPrice(current_price));
    }

    let lower_offset = bin_offset(1.0 - percentage / 100.0).min(-1);
    let upper_offset = bin_offset(1.0 + percentage / 100.0).max(1);

    Ok(BinRange {
        min_bin_id: active_bin_id + lower_offset,
        max_bin_id: active_bin_id + upper_offset,
    })
}

/// Bin range of `radius` bins on each side of the active bin.
pub fn range_for_radius(active_bin_id: i32, radius: i32) -> Result<BinRange, RangeError> {
    if radius < 1 {
        return Err(RangeError::InvalidRadius(radius));
    }
    Ok(BinRange {
        min_bin_id: active_bin_id - radius,
        max_bin_id: active_bin_id + radius,
    })
}

/// Wide fallback range around the last known active bin, used when the
/// active bin cannot be fetched.
#[must_use]
pub fn fallback_range(last_known_bin_id: i32) -> BinRange {
    BinRange {
        min_bin_id: last_known_bin_id - FALLBACK_RADIUS,
        max_bin_id: last_known_bin_id + FALLBACK_RADIUS,
    }
}

/// Signed bin offset for a price ratio, truncated toward zero.
fn bin_offset(price_ratio: f64) -> i32 {
    (price_ratio.ln() / BIN_STEP_BASE.ln()) as i32
}
