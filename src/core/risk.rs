use super::config::ProjectionConfig;
use super::error::{ProjectionError, Result};
use super::types::{AssetProfile, Journey, PartyProfile, Risk, RiskAssessment, Severity};

fn severity_points(severity: Severity) -> f64 {
    match severity {
        Severity::Low => 10.0,
        Severity::Medium => 25.0,
        Severity::High => 40.0,
    }
}

fn score(risks: &[Risk]) -> f64 {
    risks
        .iter()
        .map(|r| severity_points(r.severity))
        .sum::<f64>()
        .min(100.0)
}

fn risk(name: &str, severity: Severity, detail: String) -> Risk {
    Risk {
        name: name.to_string(),
        severity,
        detail,
    }
}

fn budget_risk(payment: f64, budget: f64) -> Option<Risk> {
    if payment <= budget {
        return None;
    }
    let severity = if payment > budget * 1.25 {
        Severity::High
    } else {
        Severity::Medium
    };
    Some(risk(
        "Over budget",
        severity,
        format!("Monthly payment {payment:.0} exceeds the {budget:.0} budget"),
    ))
}

pub fn assess_risk(
    journey: &Journey,
    asset: &AssetProfile,
    party: &PartyProfile,
    config: &ProjectionConfig,
) -> Result<RiskAssessment> {
    let steps = journey.snapshots();
    let last = steps.last().ok_or(ProjectionError::EmptyJourney)?;

    let mut buy = Vec::new();
    let underwater = steps
        .iter()
        .filter(|s| s.own.asset_value + 1e-9 < s.own.loan_balance)
        .count();
    if underwater > 0 {
        let severity = match underwater {
            25.. => Severity::High,
            7..=24 => Severity::Medium,
            _ => Severity::Low,
        };
        buy.push(risk(
            "Negative equity",
            severity,
            format!(
                "Loan balance exceeds vehicle value for {underwater} of {} months",
                steps.len()
            ),
        ));
    }

    let payment_ratio = journey.own_monthly_payment / party.monthly_income();
    if payment_ratio > config.payment_to_income_limit {
        let severity = if payment_ratio > config.payment_to_income_limit * 1.5 {
            Severity::High
        } else {
            Severity::Medium
        };
        buy.push(risk(
            "Payment strain",
            severity,
            format!(
                "Loan payment takes {:.1}% of monthly income",
                payment_ratio * 100.0
            ),
        ));
    }
    buy.extend(budget_risk(journey.own_monthly_payment, party.monthly_budget));

    if last.own.repair_risk >= 50.0 {
        let severity = if last.own.repair_risk >= 75.0 {
            Severity::High
        } else {
            Severity::Medium
        };
        buy.push(risk(
            "Late repair exposure",
            severity,
            format!(
                "Repair risk reaches {:.0} by month {}",
                last.own.repair_risk, last.month
            ),
        ));
    }

    let mut lease = Vec::new();
    let mileage_ratio = party.annual_miles / asset.lease_mileage_allowance;
    if mileage_ratio > 1.0 {
        let severity = if mileage_ratio > 1.25 {
            Severity::High
        } else {
            Severity::Medium
        };
        lease.push(risk(
            "Mileage overage",
            severity,
            format!(
                "Driving {:.0} miles a year against a {:.0} allowance",
                party.annual_miles, asset.lease_mileage_allowance
            ),
        ));
    }

    let turn_in_total: f64 = steps.iter().map(|s| s.lease.turn_in_charge).sum();
    if turn_in_total > 0.0 {
        let severity = if turn_in_total > 5_000.0 {
            Severity::High
        } else if turn_in_total > 2_000.0 {
            Severity::Medium
        } else {
            Severity::Low
        };
        lease.push(risk(
            "Turn-in charges",
            severity,
            format!("Overage and wear charges total {turn_in_total:.0}"),
        ));
    }

    if party.credit_score < 700 {
        let severity = if party.credit_score < 640 {
            Severity::High
        } else {
            Severity::Medium
        };
        lease.push(risk(
            "Credit-tier pricing",
            severity,
            format!(
                "A credit score of {} raises the money factor",
                party.credit_score
            ),
        ));
    }
    lease.extend(budget_risk(
        journey.lease_monthly_payment,
        party.monthly_budget,
    ));
    lease.push(risk(
        "No equity",
        Severity::Low,
        "Lease payments never end and build no ownership".to_string(),
    ));

    let buy_score = score(&buy);
    let lease_score = score(&lease);
    Ok(RiskAssessment {
        buy,
        lease,
        buy_score,
        lease_score,
        overall_score: (buy_score + lease_score) / 2.0,
    })
}
