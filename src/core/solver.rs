use log::debug;
use serde::Serialize;

use super::config::ProjectionConfig;
use super::engine::{final_net_costs, generate_journey};
use super::error::{ProjectionError, Result, ensure_finite};
use super::types::{AssetProfile, PartyProfile};

const SOLVER_SEED: u64 = 0;
/// Bisection over f64 mileage bounds stops narrowing after about 60 halvings.
pub const MAX_ITERATIONS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvenConfig {
    pub horizon_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for BreakEvenConfig {
    fn default() -> Self {
        Self {
            horizon_months: 36,
            search_min: 0.0,
            search_max: 60_000.0,
            tolerance: 25.0,
            max_iterations: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvenIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_miles: f64,
    pub buy_net_cost: f64,
    pub lease_net_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvenResult {
    pub horizon_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    /// Lowest annual mileage at which buying is no more expensive than leasing.
    pub break_even_miles: Option<f64>,
    pub buy_net_cost: Option<f64>,
    pub lease_net_cost: Option<f64>,
    pub iterations: Vec<BreakEvenIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    buy_net_cost: f64,
    lease_net_cost: f64,
}

impl CandidateEval {
    fn buying_wins(self) -> bool {
        self.buy_net_cost <= self.lease_net_cost + 1e-9
    }
}

/// Finds the annual mileage where leasing stops being the cheaper path.
///
/// Random events are disabled while searching so the lease-minus-buy gap is
/// monotonic in mileage and the bisection is well defined.
pub fn solve_break_even_mileage(
    asset: &AssetProfile,
    party: &PartyProfile,
    projection: &ProjectionConfig,
    config: BreakEvenConfig,
) -> Result<BreakEvenResult> {
    validate_config(config)?;
    let projection = projection.without_random_events();

    let mut iterations = Vec::new();
    let low_eval = evaluate_candidate(asset, party, &projection, config, config.search_min)?;
    let high_eval = evaluate_candidate(asset, party, &projection, config, config.search_max)?;

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_eval.buying_wins() {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Buying is already cheaper at the lower mileage bound.".to_string();
    } else if !high_eval.buying_wins() {
        feasible = false;
        message = "Leasing stays cheaper across the whole mileage range.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let eval = evaluate_candidate(asset, party, &projection, config, mid)?;
            iterations.push(BreakEvenIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_miles: mid,
                buy_net_cost: eval.buy_net_cost,
                lease_net_cost: eval.lease_net_cost,
            });

            if eval.buying_wins() {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_value = Some(hi);
                break;
            }
        }
        if solved_value.is_none() {
            solved_value = Some(hi);
        }
        feasible = true;
        message = if converged {
            "Solved break-even annual mileage.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let mut buy_net_cost = None;
    let mut lease_net_cost = None;
    if let Some(miles) = solved_value {
        let eval = evaluate_candidate(asset, party, &projection, config, miles)?;
        buy_net_cost = Some(eval.buy_net_cost);
        lease_net_cost = Some(eval.lease_net_cost);
        debug!(
            "break-even for {} over {} months: {miles:.0} miles/yr after {} iterations",
            asset.name,
            config.horizon_months,
            iterations.len()
        );
    }

    Ok(BreakEvenResult {
        horizon_months: config.horizon_months,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        break_even_miles: solved_value,
        buy_net_cost,
        lease_net_cost,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn evaluate_candidate(
    asset: &AssetProfile,
    base_party: &PartyProfile,
    projection: &ProjectionConfig,
    config: BreakEvenConfig,
    annual_miles: f64,
) -> Result<CandidateEval> {
    let mut party = base_party.clone();
    party.annual_miles = annual_miles.max(0.0);
    let journey = generate_journey(asset, &party, config.horizon_months, projection, SOLVER_SEED)?;
    let (buy_net_cost, lease_net_cost) = final_net_costs(&journey)?;
    Ok(CandidateEval {
        buy_net_cost,
        lease_net_cost,
    })
}

fn validate_config(config: BreakEvenConfig) -> Result<()> {
    if config.horizon_months == 0 {
        return Err(ProjectionError::invalid("horizon_months", "must be >= 1"));
    }
    ensure_finite("search_min", config.search_min)?;
    ensure_finite("search_max", config.search_max)?;
    if config.search_min < 0.0 {
        return Err(ProjectionError::invalid("search_min", "must be >= 0"));
    }
    if config.search_max <= config.search_min {
        return Err(ProjectionError::invalid(
            "search_max",
            "must be greater than search_min",
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(ProjectionError::invalid("tolerance", "must be > 0"));
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_ITERATIONS {
        return Err(ProjectionError::invalid(
            "max_iterations",
            format!("must be between 1 and {MAX_ITERATIONS}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{default_party, preset};

    fn gap_at(asset: &AssetProfile, miles: f64, horizon: u32) -> f64 {
        let config = BreakEvenConfig {
            horizon_months: horizon,
            ..BreakEvenConfig::default()
        };
        let eval = evaluate_candidate(
            asset,
            &default_party(),
            &ProjectionConfig::default().without_random_events(),
            config,
            miles,
        )
        .expect("valid candidate");
        eval.lease_net_cost - eval.buy_net_cost
    }

    #[test]
    fn finds_mileage_where_leasing_stops_paying_off() {
        let asset = preset("compact-ev").expect("preset");
        let config = BreakEvenConfig::default();
        let result = solve_break_even_mileage(
            &asset,
            &default_party(),
            &ProjectionConfig::default(),
            config,
        )
        .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        assert!(!result.iterations.is_empty());
        let miles = result.break_even_miles.expect("miles expected");
        assert!(miles > asset.lease_mileage_allowance && miles < config.search_max);
        assert!(gap_at(&asset, miles, config.horizon_months) >= -1e-6);
        assert!(gap_at(&asset, miles - 2.0 * config.tolerance, config.horizon_months) < 0.0);
        let buy = result.buy_net_cost.expect("buy cost");
        let lease = result.lease_net_cost.expect("lease cost");
        assert!(buy <= lease + 1e-6);
    }

    #[test]
    fn iterations_narrow_the_bracket() {
        let asset = preset("compact-ev").expect("preset");
        let result = solve_break_even_mileage(
            &asset,
            &default_party(),
            &ProjectionConfig::default(),
            BreakEvenConfig::default(),
        )
        .expect("must solve");
        for pair in result.iterations.windows(2) {
            let before = pair[0].upper_bound - pair[0].lower_bound;
            let after = pair[1].upper_bound - pair[1].lower_bound;
            assert!(after < before);
        }
    }

    #[test]
    fn reports_infeasible_when_bounds_stay_within_allowance() {
        let asset = preset("compact-ev").expect("preset");
        let config = BreakEvenConfig {
            search_max: 10_000.0,
            ..BreakEvenConfig::default()
        };
        let result = solve_break_even_mileage(
            &asset,
            &default_party(),
            &ProjectionConfig::default(),
            config,
        )
        .expect("must return result");
        assert!(!result.feasible);
        assert!(result.break_even_miles.is_none());
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn lower_bound_already_favoring_buy_short_circuits() {
        let asset = preset("compact-ev").expect("preset");
        let config = BreakEvenConfig {
            search_min: 50_000.0,
            search_max: 60_000.0,
            ..BreakEvenConfig::default()
        };
        let result = solve_break_even_mileage(
            &asset,
            &default_party(),
            &ProjectionConfig::default(),
            config,
        )
        .expect("must solve");
        assert!(result.feasible);
        assert_eq!(result.break_even_miles, Some(50_000.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn non_converging_search_returns_best_estimate() {
        let asset = preset("compact-ev").expect("preset");
        let config = BreakEvenConfig {
            tolerance: 1e-6,
            max_iterations: 3,
            ..BreakEvenConfig::default()
        };
        let result = solve_break_even_mileage(
            &asset,
            &default_party(),
            &ProjectionConfig::default(),
            config,
        )
        .expect("must return result");
        assert!(result.feasible);
        assert!(!result.converged);
        assert_eq!(result.iterations.len(), 3);
        assert!(result.break_even_miles.is_some());
    }

    #[test]
    fn invalid_search_config_is_rejected() {
        let asset = preset("compact-ev").expect("preset");
        let party = default_party();
        let projection = ProjectionConfig::default();
        let bad = [
            BreakEvenConfig {
                search_max: 0.0,
                ..BreakEvenConfig::default()
            },
            BreakEvenConfig {
                tolerance: 0.0,
                ..BreakEvenConfig::default()
            },
            BreakEvenConfig {
                max_iterations: 0,
                ..BreakEvenConfig::default()
            },
            BreakEvenConfig {
                horizon_months: 0,
                ..BreakEvenConfig::default()
            },
            BreakEvenConfig {
                max_iterations: MAX_ITERATIONS + 1,
                ..BreakEvenConfig::default()
            },
        ];
        for config in bad {
            assert!(solve_break_even_mileage(&asset, &party, &projection, config).is_err());
        }
    }

    #[test]
    fn oversized_iteration_budget_is_rejected_without_allocating() {
        let asset = preset("compact-ev").expect("preset");
        let config = BreakEvenConfig {
            max_iterations: u32::MAX,
            ..BreakEvenConfig::default()
        };
        let err = solve_break_even_mileage(
            &asset,
            &default_party(),
            &ProjectionConfig::default(),
            config,
        )
        .expect_err("must reject");
        assert!(matches!(
            err,
            ProjectionError::InvalidInput {
                field: "max_iterations",
                ..
            }
        ));

        let config = BreakEvenConfig {
            max_iterations: MAX_ITERATIONS,
            tolerance: 1e-9,
            ..BreakEvenConfig::default()
        };
        let result = solve_break_even_mileage(
            &asset,
            &default_party(),
            &ProjectionConfig::default(),
            config,
        )
        .expect("largest budget is accepted");
        assert!(result.iterations.len() <= MAX_ITERATIONS as usize);
    }
}
