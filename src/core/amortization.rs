use serde::Serialize;

use super::error::{ProjectionError, Result, ensure_finite, ensure_non_negative, ensure_range};

/// Rates below this are treated as zero so the annuity formula never divides by ~0.
const ZERO_RATE_EPS: f64 = 1e-12;

/// Longest loan term accepted, in months (50 years).
pub const MAX_TERM_MONTHS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    pub period: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeasePayment {
    pub capitalized_cost: f64,
    pub residual_value: f64,
    pub depreciation_charge: f64,
    pub finance_charge: f64,
    pub monthly: f64,
}

fn validate_loan(principal: f64, periodic_rate: f64, periods: u32) -> Result<()> {
    ensure_non_negative("principal", principal)?;
    ensure_non_negative("periodic_rate", periodic_rate)?;
    if periods == 0 || periods > MAX_TERM_MONTHS {
        return Err(ProjectionError::invalid(
            "periods",
            format!("must be between 1 and {MAX_TERM_MONTHS}"),
        ));
    }
    Ok(())
}

/// Present value of `remaining` payments, written with a negative exponent so
/// long terms and high rates underflow towards zero instead of overflowing.
fn annuity_factor(periodic_rate: f64, remaining: f64) -> f64 {
    (1.0 - (1.0 + periodic_rate).powf(-remaining)) / periodic_rate
}

/// Fixed payment that fully amortizes `principal` over `periods`.
pub fn monthly_payment(principal: f64, periodic_rate: f64, periods: u32) -> Result<f64> {
    validate_loan(principal, periodic_rate, periods)?;
    let n = periods as f64;
    if periodic_rate < ZERO_RATE_EPS {
        return Ok(principal / n);
    }
    let payment = principal / annuity_factor(periodic_rate, n);
    ensure_finite("payment", payment)?;
    Ok(payment)
}

/// Outstanding balance after `paid` scheduled payments.
pub fn remaining_balance(principal: f64, periodic_rate: f64, periods: u32, paid: u32) -> Result<f64> {
    let payment = monthly_payment(principal, periodic_rate, periods)?;
    if paid >= periods {
        return Ok(0.0);
    }
    let balance = if periodic_rate < ZERO_RATE_EPS {
        principal - payment * paid as f64
    } else {
        payment * annuity_factor(periodic_rate, (periods - paid) as f64)
    };
    Ok(balance.max(0.0))
}

pub fn amortization_schedule(
    principal: f64,
    periodic_rate: f64,
    periods: u32,
) -> Result<Vec<AmortizationRow>> {
    let payment = monthly_payment(principal, periodic_rate, periods)?;
    let mut rows = Vec::with_capacity(periods as usize);
    let mut balance = principal;
    for period in 1..=periods {
        let interest = balance * periodic_rate;
        // Last period absorbs rounding drift so the schedule closes at zero.
        let principal_part = if period == periods {
            balance
        } else {
            (payment - interest).min(balance)
        };
        balance = (balance - principal_part).max(0.0);
        rows.push(AmortizationRow {
            period,
            payment: principal_part + interest,
            interest,
            principal: principal_part,
            balance,
        });
    }
    Ok(rows)
}

pub fn total_interest(principal: f64, periodic_rate: f64, periods: u32) -> Result<f64> {
    let payment = monthly_payment(principal, periodic_rate, periods)?;
    Ok((payment * periods as f64 - principal).max(0.0))
}

pub fn lease_payment(
    price: f64,
    down_payment: f64,
    residual_fraction: f64,
    money_factor: f64,
    term_months: u32,
) -> Result<LeasePayment> {
    ensure_non_negative("price", price)?;
    ensure_non_negative("down_payment", down_payment)?;
    ensure_range("residual_fraction", residual_fraction, 0.0, 1.0)?;
    ensure_non_negative("money_factor", money_factor)?;
    if term_months == 0 {
        return Err(ProjectionError::invalid("term_months", "must be >= 1"));
    }

    let capitalized_cost = (price - down_payment).max(0.0);
    let residual_value = price * residual_fraction;
    let depreciation_charge = (capitalized_cost - residual_value).max(0.0) / term_months as f64;
    let finance_charge = (capitalized_cost + residual_value) * money_factor;
    Ok(LeasePayment {
        capitalized_cost,
        residual_value,
        depreciation_charge,
        finance_charge,
        monthly: depreciation_charge + finance_charge,
    })
}

/// Tiered APR adjustment by credit score, floored at zero.
pub fn credit_adjusted_apr(base_apr: f64, credit_score: u16) -> f64 {
    let adjustment = match credit_score {
        760.. => -0.005,
        700..=759 => 0.0,
        640..=699 => 0.015,
        580..=639 => 0.04,
        _ => 0.08,
    };
    (base_apr + adjustment).max(0.0)
}

/// Money factors scale with the same credit tiers, expressed as APR / 2400.
pub fn credit_adjusted_money_factor(base_money_factor: f64, credit_score: u16) -> f64 {
    let base_apr = base_money_factor * 2400.0 / 100.0;
    credit_adjusted_apr(base_apr, credit_score) * 100.0 / 2400.0
}
