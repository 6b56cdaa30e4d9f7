use log::debug;

use super::config::{PriorityAffinity, ProjectionConfig};
use super::engine::final_net_costs;
use super::error::{ProjectionError, Result};
use super::risk::assess_risk;
use super::types::{
    AssetProfile, Decision, Journey, PartyProfile, RecommendationSummary, ScenarioKind,
    ScenarioProjection,
};

#[derive(Debug, Clone, Copy)]
struct PathScores {
    buy: f64,
    lease: f64,
}

fn financial_scores(buy_net: f64, lease_net: f64) -> PathScores {
    let buy = buy_net.max(0.0);
    let lease = lease_net.max(0.0);
    let total = buy + lease;
    if total <= 1e-9 {
        return PathScores {
            buy: 50.0,
            lease: 50.0,
        };
    }
    PathScores {
        buy: 100.0 * lease / total,
        lease: 100.0 * buy / total,
    }
}

fn priority_scores(party: &PartyProfile, config: &ProjectionConfig) -> PathScores {
    let p = party.priorities;
    let w = &config.scoring;
    let weighted: [(u8, PriorityAffinity); 5] = [
        (p.low_monthly_cost, w.low_monthly_cost),
        (p.long_term_value, w.long_term_value),
        (p.flexibility, w.flexibility),
        (p.latest_technology, w.latest_technology),
        (p.low_maintenance, w.low_maintenance),
    ];
    let total = p.total() as f64;
    if total == 0.0 {
        return PathScores {
            buy: 50.0,
            lease: 50.0,
        };
    }
    let (buy, lease) = weighted
        .iter()
        .fold((0.0, 0.0), |(buy, lease), (weight, affinity)| {
            let weight = *weight as f64;
            (buy + weight * affinity.buy, lease + weight * affinity.lease)
        });
    PathScores {
        buy: 100.0 * buy / total,
        lease: 100.0 * lease / total,
    }
}

fn top_priority(party: &PartyProfile) -> Option<&'static str> {
    let p = party.priorities;
    [
        (p.low_monthly_cost, "a low monthly cost"),
        (p.long_term_value, "long-term value"),
        (p.flexibility, "flexibility"),
        (p.latest_technology, "the latest technology"),
        (p.low_maintenance, "low maintenance"),
    ]
    .into_iter()
    .filter(|(weight, _)| *weight > 0)
    .max_by_key(|(weight, _)| *weight)
    .map(|(_, label)| label)
}

fn scenario(
    kind: ScenarioKind,
    journey: &Journey,
    swing: f64,
) -> Result<ScenarioProjection> {
    let steps = journey.snapshots();
    let last = steps.last().ok_or(ProjectionError::EmptyJourney)?;
    let direction = match kind {
        ScenarioKind::Best => -1.0,
        ScenarioKind::Likely => 0.0,
        ScenarioKind::Worst => 1.0,
    };
    let own_running: f64 = steps.iter().map(|s| s.own.running_cost).sum();
    let lease_running: f64 = steps.iter().map(|s| s.lease.running_cost).sum();

    let terminal_value = last.own.asset_value * (1.0 - direction * swing);
    let equity = (terminal_value - last.own.loan_balance).max(0.0);
    let buy_net_cost = last.own.cumulative_cost + direction * swing * own_running - equity;
    let lease_net_cost = last.lease.cumulative_cost
        + last.lease.pending_turn_in_charge
        + direction * swing * lease_running;
    let preferred = if buy_net_cost <= lease_net_cost {
        Decision::Buy
    } else {
        Decision::Lease
    };
    Ok(ScenarioProjection {
        kind,
        buy_net_cost,
        lease_net_cost,
        preferred,
    })
}

/// Scores buying against leasing for one generated journey.
///
/// The coefficients live in [`ProjectionConfig::scoring`]; they are tuning,
/// not a financial model.
pub fn recommend(
    journey: &Journey,
    asset: &AssetProfile,
    party: &PartyProfile,
    config: &ProjectionConfig,
) -> Result<RecommendationSummary> {
    party.validate()?;
    config.validate()?;
    let (buy_net_cost, lease_net_cost) = final_net_costs(journey)?;
    let risks = assess_risk(journey, asset, party, config)?;
    let w = &config.scoring;

    let financial = financial_scores(buy_net_cost, lease_net_cost);
    let priorities = priority_scores(party, config);
    let mut buy = w.financial_share * financial.buy + (1.0 - w.financial_share) * priorities.buy;
    let mut lease =
        w.financial_share * financial.lease + (1.0 - w.financial_share) * priorities.lease;

    let mut rationale = Vec::new();
    let months = journey.len();
    let (cheaper, cheaper_cost, dearer_cost) = if buy_net_cost <= lease_net_cost {
        ("Buying", buy_net_cost, lease_net_cost)
    } else {
        ("Leasing", lease_net_cost, buy_net_cost)
    };
    rationale.push(format!(
        "{cheaper} costs {:.0} less over {months} months after accounting for equity",
        dearer_cost - cheaper_cost
    ));
    if let Some(label) = top_priority(party) {
        rationale.push(format!("Your top priority is {label}"));
    }

    let lifestyle = party.lifestyle;
    if lifestyle.growing_family {
        buy += w.growing_family_buy_bonus;
        rationale.push("A growing family favors keeping a vehicle long term".to_string());
    }
    if !lifestyle.stable_income {
        lease -= w.unstable_income_lease_penalty;
        rationale.push("Variable income makes a lease contract harder to exit".to_string());
    }
    if lifestyle.long_road_trips {
        lease -= w.road_trip_lease_penalty;
        rationale.push("Long road trips eat into lease mileage allowances".to_string());
    }
    if lifestyle.enjoys_new_vehicles {
        lease += w.new_vehicle_lease_bonus;
        rationale.push("Leasing puts you in a new vehicle every cycle".to_string());
    }
    if journey.own_monthly_payment > party.monthly_budget {
        buy -= w.over_budget_penalty;
    }
    if journey.lease_monthly_payment > party.monthly_budget {
        lease -= w.over_budget_penalty;
    }
    buy -= w.risk_penalty_share * risks.buy_score;
    lease -= w.risk_penalty_share * risks.lease_score;

    let buy_score = buy.clamp(0.0, 100.0);
    let lease_score = lease.clamp(0.0, 100.0);
    let choice = if buy_score >= lease_score {
        Decision::Buy
    } else {
        Decision::Lease
    };
    let confidence = (0.5 + (buy_score - lease_score).abs() / 100.0).clamp(0.0, 1.0);

    let loser_risks = match choice {
        Decision::Buy => &risks.lease,
        Decision::Lease => &risks.buy,
    };
    if let Some(worst) = loser_risks.iter().max_by_key(|r| r.severity) {
        rationale.push(format!("The alternative carries {}: {}", worst.name.to_lowercase(), worst.detail));
    }

    let scenarios = [ScenarioKind::Best, ScenarioKind::Likely, ScenarioKind::Worst]
        .into_iter()
        .map(|kind| scenario(kind, journey, config.scenario_swing))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "recommendation for {}: buy {buy_score:.1} vs lease {lease_score:.1} -> {choice:?} ({confidence:.2})",
        asset.name
    );

    Ok(RecommendationSummary {
        choice,
        confidence,
        buy_score,
        lease_score,
        buy_net_cost,
        lease_net_cost,
        monthly_savings: (buy_net_cost - lease_net_cost).abs() / months.max(1) as f64,
        risks,
        scenarios,
        rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{default_party, preset};
    use crate::core::engine::generate_journey;
    use crate::core::types::Priorities;
    use proptest::prelude::{any, prop_assert, proptest};

    fn quiet() -> ProjectionConfig {
        ProjectionConfig::default().without_random_events()
    }

    fn summary_for(
        asset: &AssetProfile,
        party: &PartyProfile,
        months: u32,
        config: &ProjectionConfig,
    ) -> RecommendationSummary {
        let journey = generate_journey(asset, party, months, config, 1).expect("valid journey");
        recommend(&journey, asset, party, config).expect("valid summary")
    }

    #[test]
    fn long_horizon_value_seeker_should_buy() {
        let asset = preset("midsize-sedan").expect("preset");
        let mut party = default_party();
        party.priorities = Priorities {
            low_monthly_cost: 0,
            long_term_value: 10,
            flexibility: 6,
            latest_technology: 0,
            low_maintenance: 0,
        };
        party.lifestyle.growing_family = true;
        let summary = summary_for(&asset, &party, 120, &quiet());
        assert_eq!(summary.choice, Decision::Buy);
        assert!(summary.buy_net_cost < summary.lease_net_cost);
        assert!(summary.confidence > 0.5);
    }

    #[test]
    fn tech_seeker_on_short_horizon_should_lease() {
        let asset = preset("compact-ev").expect("preset");
        let mut party = default_party();
        party.annual_miles = 9_000.0;
        party.priorities = Priorities {
            low_monthly_cost: 10,
            long_term_value: 0,
            flexibility: 0,
            latest_technology: 10,
            low_maintenance: 8,
        };
        party.lifestyle.enjoys_new_vehicles = true;
        let summary = summary_for(&asset, &party, 36, &quiet());
        assert_eq!(summary.choice, Decision::Lease);
    }

    #[test]
    fn scenarios_are_ordered_best_likely_worst() {
        let asset = preset("family-suv").expect("preset");
        let summary = summary_for(&asset, &default_party(), 84, &quiet());
        let kinds: Vec<ScenarioKind> = summary.scenarios.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ScenarioKind::Best, ScenarioKind::Likely, ScenarioKind::Worst]
        );
        let [best, likely, worst] = [
            &summary.scenarios[0],
            &summary.scenarios[1],
            &summary.scenarios[2],
        ];
        assert!(best.buy_net_cost <= likely.buy_net_cost);
        assert!(likely.buy_net_cost <= worst.buy_net_cost);
        assert!(best.lease_net_cost <= likely.lease_net_cost);
        assert!(likely.lease_net_cost <= worst.lease_net_cost);
        assert!((likely.buy_net_cost - summary.buy_net_cost).abs() < 1e-6);
        assert!((likely.lease_net_cost - summary.lease_net_cost).abs() < 1e-6);
    }

    #[test]
    fn rationale_mentions_cost_and_priority() {
        let summary = summary_for(
            &preset("compact-ev").expect("preset"),
            &default_party(),
            60,
            &quiet(),
        );
        assert!(summary.rationale[0].contains("over 60 months"));
        assert!(
            summary
                .rationale
                .iter()
                .any(|line| line.contains("a low monthly cost"))
        );
    }

    #[test]
    fn zero_priorities_fall_back_to_neutral_weighting() {
        let mut party = default_party();
        party.priorities = Priorities::default();
        let scores = priority_scores(&party, &ProjectionConfig::default());
        assert_eq!(scores.buy, 50.0);
        assert_eq!(scores.lease, 50.0);
        assert!(top_priority(&party).is_none());
    }

    #[test]
    fn financial_scores_favor_cheaper_path() {
        let scores = financial_scores(10_000.0, 30_000.0);
        assert!((scores.buy - 75.0).abs() < 1e-9);
        assert!((scores.lease - 25.0).abs() < 1e-9);
        let neutral = financial_scores(0.0, 0.0);
        assert_eq!(neutral.buy, 50.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_confidence_and_scores_are_bounded(
            seed in any::<u64>(),
            horizon in 1u32..121,
            credit in 300u16..851,
            annual_miles in 0u32..35_000,
            cost in 0u8..11,
            value in 0u8..11,
            tech in 0u8..11,
            family in any::<bool>(),
            stable in any::<bool>()
        ) {
            let asset = preset("family-suv").expect("preset");
            let mut party = default_party();
            party.credit_score = credit;
            party.annual_miles = annual_miles as f64;
            party.priorities.low_monthly_cost = cost;
            party.priorities.long_term_value = value;
            party.priorities.latest_technology = tech;
            party.lifestyle.growing_family = family;
            party.lifestyle.stable_income = stable;
            let config = ProjectionConfig::default();

            let journey = generate_journey(&asset, &party, horizon, &config, seed).expect("valid");
            let summary = recommend(&journey, &asset, &party, &config).expect("valid");
            prop_assert!((0.0..=1.0).contains(&summary.confidence));
            prop_assert!((0.0..=100.0).contains(&summary.buy_score));
            prop_assert!((0.0..=100.0).contains(&summary.lease_score));
            prop_assert!(summary.scenarios.len() == 3);
            prop_assert!(!summary.rationale.is_empty());
        }
    }
}
