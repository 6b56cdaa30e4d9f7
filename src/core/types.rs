use serde::{Deserialize, Serialize};

use super::amortization::MAX_TERM_MONTHS;
use super::error::{
    ProjectionError, Result, ensure_non_negative, ensure_positive, ensure_range,
};

pub const MIN_CREDIT_SCORE: u16 = 300;
pub const MAX_CREDIT_SCORE: u16 = 850;
pub const MAX_PRIORITY: u8 = 10;

/// Financing and running-cost terms of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProfile {
    pub name: String,
    pub price: f64,
    pub down_payment: f64,
    pub loan_apr: f64,
    pub loan_term_months: u32,
    pub annual_depreciation: f64,
    pub lease_residual: f64,
    pub money_factor: f64,
    pub lease_term_months: u32,
    pub lease_mileage_allowance: f64,
    pub overage_per_mile: f64,
    pub maintenance_rate: f64,
    pub insurance_monthly: f64,
    pub energy_cost_per_mile: f64,
}

impl AssetProfile {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ProjectionError::invalid("name", "must not be empty"));
        }
        ensure_positive("price", self.price)?;
        ensure_non_negative("down_payment", self.down_payment)?;
        if self.down_payment >= self.price {
            return Err(ProjectionError::invalid(
                "down_payment",
                "must be less than price",
            ));
        }
        ensure_range("loan_apr", self.loan_apr, 0.0, 1.0)?;
        if !(1..=120).contains(&self.loan_term_months) {
            return Err(ProjectionError::invalid(
                "loan_term_months",
                "must be between 1 and 120",
            ));
        }
        ensure_non_negative("annual_depreciation", self.annual_depreciation)?;
        if self.annual_depreciation >= 1.0 {
            return Err(ProjectionError::invalid(
                "annual_depreciation",
                "must be < 1",
            ));
        }
        ensure_positive("lease_residual", self.lease_residual)?;
        if self.lease_residual >= 1.0 {
            return Err(ProjectionError::invalid("lease_residual", "must be < 1"));
        }
        ensure_range("money_factor", self.money_factor, 0.0, 0.01)?;
        if !(1..=60).contains(&self.lease_term_months) {
            return Err(ProjectionError::invalid(
                "lease_term_months",
                "must be between 1 and 60",
            ));
        }
        ensure_positive("lease_mileage_allowance", self.lease_mileage_allowance)?;
        ensure_non_negative("overage_per_mile", self.overage_per_mile)?;
        ensure_non_negative("maintenance_rate", self.maintenance_rate)?;
        ensure_non_negative("insurance_monthly", self.insurance_monthly)?;
        ensure_non_negative("energy_cost_per_mile", self.energy_cost_per_mile)?;
        Ok(())
    }

    pub fn financed_amount(&self) -> f64 {
        (self.price - self.down_payment).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Priorities {
    pub low_monthly_cost: u8,
    pub long_term_value: u8,
    pub flexibility: u8,
    pub latest_technology: u8,
    pub low_maintenance: u8,
}

impl Priorities {
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("priorities.low_monthly_cost", self.low_monthly_cost),
            ("priorities.long_term_value", self.long_term_value),
            ("priorities.flexibility", self.flexibility),
            ("priorities.latest_technology", self.latest_technology),
            ("priorities.low_maintenance", self.low_maintenance),
        ];
        for (field, value) in named {
            if value > MAX_PRIORITY {
                return Err(ProjectionError::invalid(
                    field,
                    format!("must be between 0 and {MAX_PRIORITY}"),
                ));
            }
        }
        Ok(())
    }

    pub fn total(&self) -> u32 {
        self.low_monthly_cost as u32
            + self.long_term_value as u32
            + self.flexibility as u32
            + self.latest_technology as u32
            + self.low_maintenance as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Lifestyle {
    pub growing_family: bool,
    pub stable_income: bool,
    pub long_road_trips: bool,
    pub enjoys_new_vehicles: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyProfile {
    pub credit_score: u16,
    pub annual_income: f64,
    pub monthly_budget: f64,
    pub annual_miles: f64,
    #[serde(default)]
    pub priorities: Priorities,
    #[serde(default)]
    pub lifestyle: Lifestyle,
}

impl PartyProfile {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&self.credit_score) {
            return Err(ProjectionError::invalid(
                "credit_score",
                format!("must be between {MIN_CREDIT_SCORE} and {MAX_CREDIT_SCORE}"),
            ));
        }
        ensure_positive("annual_income", self.annual_income)?;
        ensure_positive("monthly_budget", self.monthly_budget)?;
        ensure_non_negative("annual_miles", self.annual_miles)?;
        self.priorities.validate()
    }

    pub fn monthly_income(&self) -> f64 {
        self.annual_income / 12.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedEvent {
    pub label: String,
    pub cost: f64,
    pub satisfaction_delta: f64,
    pub scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnStep {
    pub payment: f64,
    pub running_cost: f64,
    pub cumulative_cost: f64,
    pub asset_value: f64,
    pub loan_balance: f64,
    pub equity: f64,
    pub repair_risk: f64,
    pub satisfaction: f64,
    pub events: Vec<AppliedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseStep {
    pub payment: f64,
    pub running_cost: f64,
    pub cumulative_cost: f64,
    pub asset_value: f64,
    pub lease_cycle: u32,
    pub miles_this_cycle: f64,
    pub overage_miles: f64,
    pub wear_accrued: f64,
    pub turn_in_charge: f64,
    /// Overage and wear owed if the vehicle were returned at the end of this month.
    pub pending_turn_in_charge: f64,
    pub satisfaction: f64,
    pub events: Vec<AppliedEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicIndicators {
    pub market_trend: f64,
    pub interest_rate: f64,
    pub energy_price_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSnapshot {
    pub month: u32,
    pub own: OwnStep,
    pub lease: LeaseStep,
    pub economy: EconomicIndicators,
    pub market_note: Option<String>,
}

/// Generated monthly projection. Snapshots are fixed once built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub seed: u64,
    pub own_monthly_payment: f64,
    pub lease_monthly_payment: f64,
    snapshots: Vec<PeriodSnapshot>,
}

impl Journey {
    pub(crate) fn new(
        seed: u64,
        own_monthly_payment: f64,
        lease_monthly_payment: f64,
        snapshots: Vec<PeriodSnapshot>,
    ) -> Self {
        Self {
            seed,
            own_monthly_payment,
            lease_monthly_payment,
            snapshots,
        }
    }

    pub fn snapshots(&self) -> &[PeriodSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn last(&self) -> Option<&PeriodSnapshot> {
        self.snapshots.last()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Buy,
    Lease,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub name: String,
    pub severity: Severity,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub buy: Vec<Risk>,
    pub lease: Vec<Risk>,
    pub buy_score: f64,
    pub lease_score: f64,
    pub overall_score: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Best,
    Likely,
    Worst,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioProjection {
    pub kind: ScenarioKind,
    pub buy_net_cost: f64,
    pub lease_net_cost: f64,
    pub preferred: Decision,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSummary {
    pub choice: Decision,
    pub confidence: f64,
    pub buy_score: f64,
    pub lease_score: f64,
    pub buy_net_cost: f64,
    pub lease_net_cost: f64,
    pub monthly_savings: f64,
    pub risks: RiskAssessment,
    pub scenarios: Vec<ScenarioProjection>,
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequest {
    pub principal: f64,
    pub term_months: u32,
    pub fixed_apr: f64,
    pub index_rate: f64,
    pub variable_margin: f64,
    pub reset_months: u32,
}

impl LoanRequest {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("principal", self.principal)?;
        if !(1..=MAX_TERM_MONTHS).contains(&self.term_months) {
            return Err(ProjectionError::invalid(
                "term_months",
                format!("must be between 1 and {MAX_TERM_MONTHS}"),
            ));
        }
        ensure_range("fixed_apr", self.fixed_apr, 0.0, 1.0)?;
        ensure_range("index_rate", self.index_rate, 0.0, 1.0)?;
        ensure_range("variable_margin", self.variable_margin, 0.0, 1.0)?;
        if self.reset_months == 0 {
            return Err(ProjectionError::invalid("reset_months", "must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePoint {
    pub month: u32,
    pub fixed_rate: f64,
    pub variable_rate: f64,
    pub fixed_payment: f64,
    pub variable_payment: f64,
    pub fixed_balance: f64,
    pub variable_balance: f64,
    pub cumulative_fixed_interest: f64,
    pub cumulative_variable_interest: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateChoice {
    Fixed,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecommendation {
    pub choice: RateChoice,
    pub confidence: f64,
    pub fixed_total_interest: f64,
    pub variable_total_interest: f64,
    pub peak_variable_payment: f64,
    pub rationale: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{default_party, preset};

    #[test]
    fn preset_assets_and_default_party_validate() {
        for id in ["compact-ev", "midsize-sedan", "family-suv", "pickup"] {
            preset(id).expect("preset exists").validate().expect("valid");
        }
        default_party().validate().expect("valid party");
    }

    #[test]
    fn asset_rejects_down_payment_at_or_above_price() {
        let mut asset = preset("compact-ev").expect("preset");
        asset.down_payment = asset.price;
        let err = asset.validate().expect_err("must reject");
        assert!(matches!(
            err,
            ProjectionError::InvalidInput {
                field: "down_payment",
                ..
            }
        ));
    }

    #[test]
    fn asset_rejects_non_finite_price() {
        let mut asset = preset("compact-ev").expect("preset");
        asset.price = f64::NAN;
        assert!(asset.validate().is_err());
        asset.price = f64::INFINITY;
        assert!(asset.validate().is_err());
    }

    #[test]
    fn party_rejects_out_of_range_credit_score() {
        let mut party = default_party();
        party.credit_score = 299;
        assert!(party.validate().is_err());
        party.credit_score = 851;
        assert!(party.validate().is_err());
        party.credit_score = 850;
        assert!(party.validate().is_ok());
    }

    #[test]
    fn party_rejects_priority_above_ten() {
        let mut party = default_party();
        party.priorities.flexibility = 11;
        let err = party.validate().expect_err("must reject");
        assert!(err.to_string().contains("priorities.flexibility"));
    }

    #[test]
    fn party_rejects_negative_mileage() {
        let mut party = default_party();
        party.annual_miles = -1.0;
        assert!(party.validate().is_err());
    }

    #[test]
    fn loan_request_rejects_zero_reset_interval() {
        let request = LoanRequest {
            principal: 250_000.0,
            term_months: 360,
            fixed_apr: 0.065,
            index_rate: 0.05,
            variable_margin: 0.01,
            reset_months: 0,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn loan_request_rejects_term_beyond_fifty_years() {
        let mut request = LoanRequest {
            principal: 250_000.0,
            term_months: MAX_TERM_MONTHS,
            fixed_apr: 0.065,
            index_rate: 0.05,
            variable_margin: 0.01,
            reset_months: 12,
        };
        request.validate().expect("longest term is accepted");

        request.term_months = 100_000;
        let err = request.validate().expect_err("must reject");
        assert!(matches!(
            err,
            ProjectionError::InvalidInput {
                field: "term_months",
                ..
            }
        ));
    }
}
