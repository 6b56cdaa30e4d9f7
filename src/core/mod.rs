mod amortization;
mod catalog;
mod config;
mod engine;
mod error;
mod events;
mod rates;
mod recommendation;
mod risk;
mod rng;
mod solver;
mod types;

pub use amortization::{
    AmortizationRow, LeasePayment, MAX_TERM_MONTHS, amortization_schedule, credit_adjusted_apr,
    credit_adjusted_money_factor, lease_payment, monthly_payment, remaining_balance,
    total_interest,
};
pub use catalog::{PRESET_IDS, default_party, preset, presets};
pub use config::{PriorityAffinity, ProjectionConfig, RateConfig, ScoringWeights};
pub use engine::{final_net_costs, generate_journey};
pub use error::{ProjectionError, Result};
pub use events::{EventRule, EventScope, EventTrigger, default_event_rules};
pub use rates::{generate_rate_timeline, recommend_rate_choice};
pub use recommendation::recommend;
pub use risk::assess_risk;
pub use rng::{Rng, derive_seed};
pub use solver::{BreakEvenConfig, BreakEvenIteration, BreakEvenResult, solve_break_even_mileage};
pub use types::{
    AppliedEvent, AssetProfile, Decision, EconomicIndicators, Journey, LeaseStep, Lifestyle,
    LoanRequest, OwnStep, PartyProfile, PeriodSnapshot, Priorities, RateChoice, RatePoint,
    RateRecommendation, RecommendationSummary, Risk, RiskAssessment, ScenarioKind,
    ScenarioProjection, Severity,
};
