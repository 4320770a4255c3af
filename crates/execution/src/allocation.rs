//! Deposit amount planning.
//!
//! Two planning surfaces: [`split_budget`] divides a quote-denominated budget
//! between the two pool tokens using liquidity-weighted pricing, and
//! [`plan_deposit`] sizes a deposit from the wallet's actual balances with a
//! buffer held back for fees and rescaling when the counterpart runs short.

use dlmm_lp_domain::BinLiquidity;
use thiserror::Error;
use tracing::debug;

/// Rejected inputs or unworkable balances.
#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    /// Price must be a positive finite value.
    #[error("current price must be positive, got {0}")]
    InvalidPrice(f64),
    /// Buffer ratio must be in `(0, 1]`.
    #[error("buffer ratio must be in (0, 1], got {0}")]
    InvalidBuffer(f64),
    /// The primary token balance buffers down to nothing.
    #[error("primary token balance too small to deposit")]
    InsufficientBalance,
}

/// Budget split between the two pool tokens, in minor units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenSplit {
    /// Token X amount.
    pub x_amount: u64,
    /// Token Y amount.
    pub y_amount: u64,
    /// Fraction of the budget assigned to token X.
    pub x_ratio: f64,
    /// Fraction of the budget assigned to token Y.
    pub y_ratio: f64,
}

/// Balance-driven deposit plan, in minor units of the respective tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositPlan {
    /// Token X amount.
    pub x_amount: u64,
    /// Token Y amount.
    pub y_amount: u64,
    /// Whether both legs were rescaled down to fit the counterpart balance.
    pub rescaled: bool,
}

/// Liquidity-weighted average price over a bin window.
///
/// Returns `None` when the window is empty or any supply fails to parse, in
/// which case callers fall back to the unweighted current price. A window
/// whose supplies are all zero carries no weighting information and yields
/// the current price unchanged.
#[must_use]
pub fn weighted_price(bins: &[BinLiquidity], current_price: f64) -> Option<f64> {
    if bins.is_empty() {
        return None;
    }
    let mut weighted_sum = 0.0;
    let mut total_supply = 0.0;
    for bin in bins {
        let supply = bin.supply.parse::<f64>().ok()?;
        weighted_sum += supply * bin.price_per_token;
        total_supply += supply;
    }
    if total_supply == 0.0 {
        Some(current_price)
    } else {
        Some(weighted_sum / total_supply)
    }
}

/// Budget fractions for the two tokens.
///
/// The ratio of the current price to the weighted price skews the split
/// toward the token the market is moving into; without usable bin data the
/// split is even.
#[must_use]
pub fn split_ratios(bins: Option<&[BinLiquidity]>, current_price: f64) -> (f64, f64) {
    let weighted = bins.and_then(|b| weighted_price(b, current_price));
    match weighted {
        Some(weighted) if weighted > 0.0 => {
            let ratio = current_price / weighted;
            let x_ratio = ratio / (1.0 + ratio);
            (x_ratio, 1.0 - x_ratio)
        }
        _ => {
            debug!("no usable bin data for weighting, splitting 50/50");
            (0.5, 0.5)
        }
    }
}

/// Splits a quote-denominated budget between the two pool tokens.
///
/// `total_budget` and `current_price` are in display units of token Y per
/// token X; the returned amounts are floored minor units.
pub fn split_budget(
    total_budget: f64,
    current_price: f64,
    bins: Option<&[BinLiquidity]>,
    decimals_x: u8,
    decimals_y: u8,
) -> Result<TokenSplit, AllocationError> {
    if !(current_price > 0.0 && current_price.is_finite()) {
        return Err(AllocationError::InvalidPrice(current_price));
    }
    let (x_ratio, y_ratio) = split_ratios(bins, current_price);
    let x_amount =
        (total_budget * x_ratio * 10f64.powi(i32::from(decimals_x)) / current_price).floor();
    let y_amount = (total_budget * y_ratio * 10f64.powi(i32::from(decimals_y))).floor();
    Ok(TokenSplit {
        x_amount: x_amount as u64,
        y_amount: y_amount as u64,
        x_ratio,
        y_ratio,
    })
}

/// Sizes a deposit from actual balances.
///
/// The buffered primary balance sets the primary leg; the counterpart leg is
/// its price-converted equivalent. When the counterpart balance cannot cover
/// that leg, both legs scale down by the coverage ratio and the buffer is
/// applied a second time.
pub fn plan_deposit(
    main_balance: u64,
    other_balance: u64,
    price_per_token: f64,
    main_is_x: bool,
    decimals_x: u8,
    decimals_y: u8,
    buffer_ratio: f64,
) -> Result<DepositPlan, AllocationError> {
    if !(price_per_token > 0.0 && price_per_token.is_finite()) {
        return Err(AllocationError::InvalidPrice(price_per_token));
    }
    if !(buffer_ratio > 0.0 && buffer_ratio <= 1.0) {
        return Err(AllocationError::InvalidBuffer(buffer_ratio));
    }

    let (main_decimals, other_decimals) = if main_is_x {
        (decimals_x, decimals_y)
    } else {
        (decimals_y, decimals_x)
    };

    let mut main_amount = (main_balance as f64 * buffer_ratio).floor() as u64;
    if main_amount == 0 {
        return Err(AllocationError::InsufficientBalance);
    }

    let main_display = main_amount as f64 / 10f64.powi(i32::from(main_decimals));
    let other_display = if main_is_x {
        main_display * price_per_token
    } else {
        main_display / price_per_token
    };
    let mut other_amount =
        (other_display * 10f64.powi(i32::from(other_decimals))).floor() as u64;

    let mut rescaled = false;
    if other_amount > other_balance {
        let coverage = other_balance as f64 / other_amount as f64;
        other_amount = (other_balance as f64 * buffer_ratio).floor() as u64;
        main_amount = (main_amount as f64 * coverage * buffer_ratio).floor() as u64;
        rescaled = true;
        if main_amount == 0 {
            return Err(AllocationError::InsufficientBalance);
        }
    }

    let (x_amount, y_amount) = if main_is_x {
        (main_amount, other_amount)
    } else {
        (other_amount, main_amount)
    };
    Ok(DepositPlan {
        x_amount,
        y_amount,
        rescaled,
    })
}
