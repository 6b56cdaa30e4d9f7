use log::debug;

use super::amortization::monthly_payment;
use super::config::ProjectionConfig;
use super::error::{ProjectionError, Result};
use super::rng::{Rng, derive_seed};
use super::types::{LoanRequest, PartyProfile, RateChoice, RatePoint, RateRecommendation};

const INDEX_STREAM: u32 = 4;

#[derive(Debug)]
struct LoanLeg {
    balance: f64,
    rate: f64,
    payment: f64,
    cumulative_interest: f64,
}

impl LoanLeg {
    fn pay_month(&mut self) {
        let interest = self.balance * self.rate / 12.0;
        let principal = (self.payment - interest).min(self.balance).max(0.0);
        self.balance = (self.balance - principal).max(0.0);
        self.cumulative_interest += interest;
    }
}

fn is_reset_month(month: u32, reset_months: u32) -> bool {
    month > 1 && (month - 1) % reset_months == 0
}

/// Month-by-month comparison of a fixed-rate loan against an index-linked one.
///
/// The variable rate starts at `index + margin`; at every reset the index moves
/// by the configured drift plus seeded noise and the payment is re-amortized
/// over the remaining term.
pub fn generate_rate_timeline(
    request: &LoanRequest,
    horizon_months: u32,
    config: &ProjectionConfig,
    seed: u64,
) -> Result<Vec<RatePoint>> {
    request.validate()?;
    config.validate()?;
    if horizon_months == 0 {
        return Err(ProjectionError::invalid("horizon_months", "must be >= 1"));
    }

    let rc = &config.rates;
    let months = horizon_months.min(request.term_months);
    let mut rng = Rng::new(derive_seed(seed, INDEX_STREAM));
    let clamp_rate = |rate: f64| rate.clamp(rc.rate_floor, rc.rate_cap);

    let fixed_payment = monthly_payment(request.principal, request.fixed_apr / 12.0, request.term_months)?;
    let mut fixed = LoanLeg {
        balance: request.principal,
        rate: request.fixed_apr,
        payment: fixed_payment,
        cumulative_interest: 0.0,
    };

    let mut index = request.index_rate;
    let variable_rate = clamp_rate(index + request.variable_margin);
    let mut variable = LoanLeg {
        balance: request.principal,
        rate: variable_rate,
        payment: monthly_payment(request.principal, variable_rate / 12.0, request.term_months)?,
        cumulative_interest: 0.0,
    };

    let step_years = request.reset_months as f64 / 12.0;
    let mut timeline = Vec::with_capacity(months as usize);
    for month in 1..=months {
        if is_reset_month(month, request.reset_months) {
            let shock = rc.index_volatility_annual * step_years.sqrt() * rng.standard_normal();
            index = (index + rc.index_drift_annual * step_years + shock).max(0.0);
            variable.rate = clamp_rate(index + request.variable_margin);
            let remaining = request.term_months - (month - 1);
            variable.payment = monthly_payment(variable.balance, variable.rate / 12.0, remaining)?;
            debug!(
                "rate reset at month {month}: index {index:.4}, variable rate {:.4}",
                variable.rate
            );
        }

        fixed.pay_month();
        variable.pay_month();
        timeline.push(RatePoint {
            month,
            fixed_rate: fixed.rate,
            variable_rate: variable.rate,
            fixed_payment: fixed.payment,
            variable_payment: variable.payment,
            fixed_balance: fixed.balance,
            variable_balance: variable.balance,
            cumulative_fixed_interest: fixed.cumulative_interest,
            cumulative_variable_interest: variable.cumulative_interest,
        });
    }
    Ok(timeline)
}

pub fn recommend_rate_choice(
    timeline: &[RatePoint],
    party: &PartyProfile,
    config: &ProjectionConfig,
) -> Result<RateRecommendation> {
    party.validate()?;
    config.validate()?;
    let first = timeline.first().ok_or(ProjectionError::EmptyJourney)?;
    let last = timeline.last().ok_or(ProjectionError::EmptyJourney)?;
    let rc = &config.rates;

    let fixed_total_interest = last.cumulative_fixed_interest;
    let variable_total_interest = last.cumulative_variable_interest;
    let peak_variable_payment = timeline
        .iter()
        .map(|p| p.variable_payment)
        .fold(f64::MIN, f64::max);

    let mut rationale = Vec::new();
    let interest_gap = fixed_total_interest - variable_total_interest;
    let savings_ratio = if fixed_total_interest > 1e-9 {
        interest_gap / fixed_total_interest
    } else {
        0.0
    };
    // Gaps that round to zero dollars are ties.
    if interest_gap.abs() < 0.5 {
        rationale.push(format!(
            "Fixed and variable rates cost the same in interest over {} months",
            last.month
        ));
    } else if interest_gap > 0.0 {
        rationale.push(format!(
            "Variable rate saves {:.0} in interest over {} months",
            interest_gap, last.month
        ));
    } else {
        rationale.push(format!(
            "Fixed rate saves {:.0} in interest over {} months",
            -interest_gap,
            last.month
        ));
    }

    let mut margin = savings_ratio;
    let payment_shock = if first.variable_payment > 0.0 {
        peak_variable_payment / first.variable_payment - 1.0
    } else {
        0.0
    };
    if payment_shock > rc.payment_shock_threshold {
        margin -= payment_shock - rc.payment_shock_threshold;
        rationale.push(format!(
            "Variable payments could rise {:.0}% above the starting payment",
            payment_shock * 100.0
        ));
    }
    if !party.lifestyle.stable_income {
        margin -= rc.unstable_income_fixed_bonus;
        rationale.push("Variable income favors a predictable fixed payment".to_string());
    }
    margin += rc.flexibility_variable_bonus * party.priorities.flexibility as f64;

    let choice = if margin > 0.0 {
        RateChoice::Variable
    } else {
        RateChoice::Fixed
    };
    let confidence = (0.5 + margin.abs() * 2.5).clamp(0.0, 1.0);

    Ok(RateRecommendation {
        choice,
        confidence,
        fixed_total_interest,
        variable_total_interest,
        peak_variable_payment,
        rationale,
    })
}
