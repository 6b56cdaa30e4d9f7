use log::debug;

use super::amortization::{
    credit_adjusted_apr, credit_adjusted_money_factor, lease_payment, monthly_payment,
    remaining_balance,
};
use super::config::ProjectionConfig;
use super::error::{ProjectionError, Result};
use super::events::{MonthEvents, TriggerContext, evaluate_rules};
use super::rng::{Rng, derive_seed};
use super::types::{
    AssetProfile, EconomicIndicators, Journey, LeaseStep, OwnStep, PartyProfile, PeriodSnapshot,
};

const EVENT_STREAM: u32 = 1;
const NOTE_STREAM: u32 = 2;
const RATE_STREAM: u32 = 3;

#[derive(Debug)]
struct OwnState {
    cumulative_cost: f64,
    satisfaction: f64,
}

#[derive(Debug)]
struct LeaseState {
    cumulative_cost: f64,
    satisfaction: f64,
    cycle: u32,
    cycle_start: u32,
    miles: f64,
    wear: f64,
    overage_miles: f64,
}

impl LeaseState {
    fn start_new_cycle(&mut self, month: u32) {
        self.cycle += 1;
        self.cycle_start = month;
        self.miles = 0.0;
        self.wear = 0.0;
        self.overage_miles = 0.0;
    }
}

#[derive(Debug, Clone, Copy)]
struct Terms {
    financed: f64,
    monthly_rate: f64,
    apr: f64,
    own_payment: f64,
    lease_payment: f64,
    monthly_miles: f64,
    base_maintenance: f64,
}

impl Terms {
    fn resolve(asset: &AssetProfile, party: &PartyProfile) -> Result<Self> {
        let apr = credit_adjusted_apr(asset.loan_apr, party.credit_score);
        let monthly_rate = apr / 12.0;
        let financed = asset.financed_amount();
        let own_payment = monthly_payment(financed, monthly_rate, asset.loan_term_months)?;
        let money_factor = credit_adjusted_money_factor(asset.money_factor, party.credit_score);
        let lease = lease_payment(
            asset.price,
            asset.down_payment,
            asset.lease_residual,
            money_factor,
            asset.lease_term_months,
        )?;
        Ok(Self {
            financed,
            monthly_rate,
            apr,
            own_payment,
            lease_payment: lease.monthly,
            monthly_miles: party.annual_miles / 12.0,
            base_maintenance: asset.price * asset.maintenance_rate / 12.0,
        })
    }
}

/// Builds the month-by-month own/lease projection.
///
/// Month 0 is signing: both scenarios pay the down payment and nothing else.
/// Asset value, loan balance and equity never depend on `seed`; only random
/// events, market notes and rate noise do.
pub fn generate_journey(
    asset: &AssetProfile,
    party: &PartyProfile,
    horizon_months: u32,
    config: &ProjectionConfig,
    seed: u64,
) -> Result<Journey> {
    asset.validate()?;
    party.validate()?;
    config.validate()?;
    if horizon_months == 0 {
        return Err(ProjectionError::invalid("horizon_months", "must be >= 1"));
    }

    let months = horizon_months.min(config.max_horizon_months);
    let terms = Terms::resolve(asset, party)?;
    debug!(
        "generating {months}-month journey for {} (seed {seed}, own payment {:.2}, lease payment {:.2})",
        asset.name, terms.own_payment, terms.lease_payment
    );

    let mut event_rng = Rng::new(derive_seed(seed, EVENT_STREAM));
    let mut note_rng = Rng::new(derive_seed(seed, NOTE_STREAM));
    let mut rate_rng = Rng::new(derive_seed(seed, RATE_STREAM));

    let mut own = OwnState {
        cumulative_cost: asset.down_payment,
        satisfaction: clamp_satisfaction(config.own_base_satisfaction, config),
    };
    let mut lease = LeaseState {
        cumulative_cost: asset.down_payment,
        satisfaction: clamp_satisfaction(config.lease_base_satisfaction, config),
        cycle: 1,
        cycle_start: 0,
        miles: 0.0,
        wear: 0.0,
        overage_miles: 0.0,
    };
    let mut market_shock = 1.0;
    let mut snapshots = Vec::with_capacity(months as usize);

    for month in 0..months {
        let events = if month == 0 {
            MonthEvents::default()
        } else {
            let ctx = TriggerContext {
                month,
                loan_term_months: asset.loan_term_months,
                lease_term_months: asset.lease_term_months,
            };
            evaluate_rules(&config.events, ctx, &mut event_rng)
        };
        market_shock *= 1.0 + events.value_shock;

        let age_years = month as f64 / 12.0;
        let market_trend = (1.0 + config.market_trend_annual).powf(age_years) * market_shock;
        let energy_price_index = (1.0 + config.energy_inflation_annual).powf(age_years);
        let energy = if month > 0 {
            terms.monthly_miles * asset.energy_cost_per_mile * energy_price_index
        } else {
            0.0
        };

        let own_step = own_month(
            asset,
            config,
            &terms,
            &mut own,
            &events,
            month,
            market_trend,
            energy,
        )?;
        let is_last = month + 1 == months;
        let lease_step = lease_month(
            asset,
            config,
            &terms,
            &mut lease,
            &events,
            month,
            market_trend,
            energy,
            is_last,
        );

        let noise = rate_rng.uniform(-config.rate_noise, config.rate_noise);
        let interest_rate = (terms.apr + config.rate_drift_annual * age_years + noise).max(0.0);
        let market_note = if note_rng.chance(config.market_note_probability) {
            note_rng.pick(&config.market_notes).cloned()
        } else {
            None
        };

        snapshots.push(PeriodSnapshot {
            month,
            own: own_step,
            lease: lease_step,
            economy: EconomicIndicators {
                market_trend,
                interest_rate,
                energy_price_index,
            },
            market_note,
        });
    }

    if let Some(last) = snapshots.last() {
        debug!(
            "journey done: own cumulative {:.2} (equity {:.2}), lease cumulative {:.2}",
            last.own.cumulative_cost, last.own.equity, last.lease.cumulative_cost
        );
    }

    Ok(Journey::new(
        seed,
        terms.own_payment,
        terms.lease_payment,
        snapshots,
    ))
}

#[allow(clippy::too_many_arguments)]
fn own_month(
    asset: &AssetProfile,
    config: &ProjectionConfig,
    terms: &Terms,
    state: &mut OwnState,
    events: &MonthEvents,
    month: u32,
    market_trend: f64,
    energy: f64,
) -> Result<OwnStep> {
    let age_years = month as f64 / 12.0;
    let asset_value = asset.price * (1.0 - asset.annual_depreciation).powf(age_years) * market_trend;
    let loan_balance = remaining_balance(
        terms.financed,
        terms.monthly_rate,
        asset.loan_term_months,
        month,
    )?;
    let equity = (asset_value - loan_balance).max(0.0);

    let payment = if (1..=asset.loan_term_months).contains(&month) {
        terms.own_payment
    } else {
        0.0
    };
    let running_cost = if month == 0 {
        0.0
    } else {
        let maintenance = terms.base_maintenance * (1.0 + config.maintenance_age_growth * age_years);
        maintenance + asset.insurance_monthly + energy + events.own_cost()
    };
    state.cumulative_cost += payment + running_cost;

    if month > 0 {
        state.satisfaction = clamp_satisfaction(
            state.satisfaction - config.own_satisfaction_decay_per_month + events.own_satisfaction(),
            config,
        );
    }
    let repair_risk = (config.repair_risk_base + config.repair_risk_growth_per_year * age_years)
        .clamp(0.0, config.repair_risk_cap);

    Ok(OwnStep {
        payment,
        running_cost,
        cumulative_cost: state.cumulative_cost,
        asset_value,
        loan_balance,
        equity,
        repair_risk,
        satisfaction: state.satisfaction,
        events: events.own.clone(),
    })
}

#[allow(clippy::too_many_arguments)]
fn lease_month(
    asset: &AssetProfile,
    config: &ProjectionConfig,
    terms: &Terms,
    state: &mut LeaseState,
    events: &MonthEvents,
    month: u32,
    market_trend: f64,
    energy: f64,
    is_last: bool,
) -> LeaseStep {
    let months_in_cycle = month - state.cycle_start;
    let payment = if month > 0 { terms.lease_payment } else { 0.0 };

    let previous_overage = state.overage_miles;
    if month > 0 {
        state.miles += terms.monthly_miles;
        state.wear += terms.monthly_miles * config.wear_per_mile;
    }
    let allowance_to_date = asset.lease_mileage_allowance * months_in_cycle as f64 / 12.0;
    state.overage_miles = (state.miles - allowance_to_date).max(0.0);
    let new_overage = (state.overage_miles - previous_overage).max(0.0);

    let running_cost = if month == 0 {
        0.0
    } else {
        terms.base_maintenance + asset.insurance_monthly + energy + events.lease_cost()
    };

    let turn_in = month > 0 && months_in_cycle == asset.lease_term_months;
    let accrued_charge = state.overage_miles * asset.overage_per_mile + state.wear;
    let (turn_in_charge, pending_turn_in_charge) = if turn_in {
        (accrued_charge, 0.0)
    } else {
        (0.0, accrued_charge)
    };
    let next_signing = if turn_in && !is_last {
        asset.down_payment
    } else {
        0.0
    };
    state.cumulative_cost += payment + running_cost + turn_in_charge + next_signing;

    if month > 0 {
        state.satisfaction = clamp_satisfaction(
            state.satisfaction - config.lease_satisfaction_decay_per_month
                - config.overage_satisfaction_penalty * new_overage
                + events.lease_satisfaction(),
            config,
        );
    }

    let vehicle_age_years = months_in_cycle as f64 / 12.0;
    let step = LeaseStep {
        payment,
        running_cost: running_cost + turn_in_charge + next_signing,
        cumulative_cost: state.cumulative_cost,
        asset_value: asset.price
            * (1.0 - asset.annual_depreciation).powf(vehicle_age_years)
            * market_trend,
        lease_cycle: state.cycle,
        miles_this_cycle: state.miles,
        overage_miles: state.overage_miles,
        wear_accrued: state.wear,
        turn_in_charge,
        pending_turn_in_charge,
        satisfaction: state.satisfaction,
        events: events.lease.clone(),
    };

    if turn_in {
        state.start_new_cycle(month);
    }
    step
}

fn clamp_satisfaction(value: f64, config: &ProjectionConfig) -> f64 {
    value.clamp(config.satisfaction_min, config.satisfaction_max)
}

/// Net cost of each path at the end of the journey: buying subtracts the
/// equity left in the vehicle, leasing adds what returning it would cost.
pub fn final_net_costs(journey: &Journey) -> Result<(f64, f64)> {
    let last = journey.last().ok_or(ProjectionError::EmptyJourney)?;
    Ok((
        last.own.cumulative_cost - last.own.equity,
        last.lease.cumulative_cost + last.lease.pending_turn_in_charge,
    ))
}
