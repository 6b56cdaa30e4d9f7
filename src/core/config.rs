use std::path::Path;

use serde::{Deserialize, Serialize};

use super::amortization::MAX_TERM_MONTHS;
use super::error::{ProjectionError, Result};
use super::events::{EventRule, default_event_rules};

/// How strongly each priority pulls toward buying vs leasing (each 0..=1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PriorityAffinity {
    pub buy: f64,
    pub lease: f64,
}

impl Default for PriorityAffinity {
    fn default() -> Self {
        Self {
            buy: 0.5,
            lease: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringWeights {
    /// Share of the final score taken by the cost comparison; the rest comes from priorities.
    pub financial_share: f64,
    pub low_monthly_cost: PriorityAffinity,
    pub long_term_value: PriorityAffinity,
    pub flexibility: PriorityAffinity,
    pub latest_technology: PriorityAffinity,
    pub low_maintenance: PriorityAffinity,
    pub growing_family_buy_bonus: f64,
    pub unstable_income_lease_penalty: f64,
    pub road_trip_lease_penalty: f64,
    pub new_vehicle_lease_bonus: f64,
    pub over_budget_penalty: f64,
    pub risk_penalty_share: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            financial_share: 0.55,
            low_monthly_cost: PriorityAffinity {
                buy: 0.35,
                lease: 0.85,
            },
            long_term_value: PriorityAffinity {
                buy: 0.95,
                lease: 0.2,
            },
            flexibility: PriorityAffinity {
                buy: 0.7,
                lease: 0.35,
            },
            latest_technology: PriorityAffinity {
                buy: 0.3,
                lease: 0.9,
            },
            low_maintenance: PriorityAffinity {
                buy: 0.4,
                lease: 0.85,
            },
            growing_family_buy_bonus: 5.0,
            unstable_income_lease_penalty: 6.0,
            road_trip_lease_penalty: 6.0,
            new_vehicle_lease_bonus: 5.0,
            over_budget_penalty: 12.0,
            risk_penalty_share: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateConfig {
    pub index_drift_annual: f64,
    pub index_volatility_annual: f64,
    pub rate_floor: f64,
    pub rate_cap: f64,
    pub unstable_income_fixed_bonus: f64,
    pub flexibility_variable_bonus: f64,
    pub payment_shock_threshold: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            index_drift_annual: 0.0025,
            index_volatility_annual: 0.0075,
            rate_floor: 0.02,
            rate_cap: 0.12,
            unstable_income_fixed_bonus: 0.05,
            flexibility_variable_bonus: 0.002,
            payment_shock_threshold: 0.15,
        }
    }
}

/// Tunable constants for journey generation, scoring and the rate navigator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionConfig {
    pub max_horizon_months: u32,
    pub satisfaction_min: f64,
    pub satisfaction_max: f64,
    pub repair_risk_cap: f64,
    pub repair_risk_base: f64,
    pub repair_risk_growth_per_year: f64,
    pub maintenance_age_growth: f64,
    pub own_base_satisfaction: f64,
    pub lease_base_satisfaction: f64,
    pub own_satisfaction_decay_per_month: f64,
    pub lease_satisfaction_decay_per_month: f64,
    pub overage_satisfaction_penalty: f64,
    pub wear_per_mile: f64,
    pub market_trend_annual: f64,
    pub energy_inflation_annual: f64,
    pub rate_drift_annual: f64,
    pub rate_noise: f64,
    pub market_note_probability: f64,
    pub market_notes: Vec<String>,
    pub events: Vec<EventRule>,
    pub scoring: ScoringWeights,
    pub payment_to_income_limit: f64,
    pub scenario_swing: f64,
    pub rates: RateConfig,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            max_horizon_months: 120,
            satisfaction_min: 0.0,
            satisfaction_max: 100.0,
            repair_risk_cap: 95.0,
            repair_risk_base: 5.0,
            repair_risk_growth_per_year: 9.0,
            maintenance_age_growth: 0.18,
            own_base_satisfaction: 85.0,
            lease_base_satisfaction: 88.0,
            own_satisfaction_decay_per_month: 0.12,
            lease_satisfaction_decay_per_month: 0.18,
            overage_satisfaction_penalty: 0.005,
            wear_per_mile: 0.015,
            market_trend_annual: 0.0,
            energy_inflation_annual: 0.03,
            rate_drift_annual: 0.001,
            rate_noise: 0.0015,
            market_note_probability: 0.15,
            market_notes: default_market_notes(),
            events: default_event_rules(),
            scoring: ScoringWeights::default(),
            payment_to_income_limit: 0.15,
            scenario_swing: 0.15,
            rates: RateConfig::default(),
        }
    }
}

fn default_market_notes() -> Vec<String> {
    [
        "Dealer incentives are running this month",
        "Used-vehicle prices are firming",
        "Energy prices spiked on supply news",
        "Inventory is tight on popular trims",
        "Lenders are easing approval standards",
        "Winter weather is raising repair demand",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl ProjectionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ProjectionError::InvalidConfig(format!("unreadable config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProjectionError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(ProjectionError::InvalidConfig(msg.to_string()));
        if !(1..=MAX_TERM_MONTHS).contains(&self.max_horizon_months) {
            return bad("maxHorizonMonths must be between 1 and 600");
        }
        let finite = [
            self.satisfaction_min,
            self.satisfaction_max,
            self.repair_risk_cap,
            self.repair_risk_base,
            self.repair_risk_growth_per_year,
            self.maintenance_age_growth,
            self.own_base_satisfaction,
            self.lease_base_satisfaction,
            self.own_satisfaction_decay_per_month,
            self.lease_satisfaction_decay_per_month,
            self.overage_satisfaction_penalty,
            self.wear_per_mile,
            self.market_trend_annual,
            self.energy_inflation_annual,
            self.rate_drift_annual,
            self.rate_noise,
            self.payment_to_income_limit,
            self.scenario_swing,
            self.rates.index_drift_annual,
            self.rates.index_volatility_annual,
            self.rates.rate_floor,
            self.rates.rate_cap,
            self.rates.unstable_income_fixed_bonus,
            self.rates.flexibility_variable_bonus,
            self.rates.payment_shock_threshold,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return bad("all numeric settings must be finite");
        }
        if self.satisfaction_min > self.satisfaction_max {
            return bad("satisfactionMin must be <= satisfactionMax");
        }
        if !(0.0..=100.0).contains(&self.repair_risk_cap) {
            return bad("repairRiskCap must be between 0 and 100");
        }
        if self.market_trend_annual <= -1.0 || self.energy_inflation_annual <= -1.0 {
            return bad("annual trends must be > -100%");
        }
        if self.wear_per_mile < 0.0 || self.rate_noise < 0.0 || self.maintenance_age_growth < 0.0 {
            return bad("wearPerMile, rateNoise and maintenanceAgeGrowth must be >= 0");
        }
        if !(0.0..=1.0).contains(&self.market_note_probability) {
            return bad("marketNoteProbability must be between 0 and 1");
        }
        if !(0.0..1.0).contains(&self.scenario_swing) {
            return bad("scenarioSwing must be in [0, 1)");
        }
        if !(0.0..=1.0).contains(&self.scoring.financial_share) {
            return bad("scoring.financialShare must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&self.scoring.risk_penalty_share) {
            return bad("scoring.riskPenaltyShare must be between 0 and 1");
        }
        let affinities = [
            self.scoring.low_monthly_cost,
            self.scoring.long_term_value,
            self.scoring.flexibility,
            self.scoring.latest_technology,
            self.scoring.low_maintenance,
        ];
        if affinities
            .iter()
            .any(|a| !(0.0..=1.0).contains(&a.buy) || !(0.0..=1.0).contains(&a.lease))
        {
            return bad("priority affinities must be between 0 and 1");
        }
        if self.rates.rate_floor < 0.0 || self.rates.rate_cap < self.rates.rate_floor {
            return bad("rates.rateFloor must be >= 0 and <= rates.rateCap");
        }
        if self.rates.index_volatility_annual < 0.0 {
            return bad("rates.indexVolatilityAnnual must be >= 0");
        }
        for rule in &self.events {
            rule.validate()?;
        }
        Ok(())
    }

    /// Same settings with every random event removed.
    pub fn without_random_events(&self) -> Self {
        let mut config = self.clone();
        config.events.retain(|rule| rule.trigger.is_scheduled());
        config.market_note_probability = 0.0;
        config.rate_noise = 0.0;
        config
    }
}
