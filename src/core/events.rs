use serde::{Deserialize, Serialize};

use super::error::{ProjectionError, Result};
use super::rng::Rng;
use super::types::AppliedEvent;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventScope {
    Own,
    Lease,
    Both,
}

impl EventScope {
    pub fn touches_own(self) -> bool {
        matches!(self, EventScope::Own | EventScope::Both)
    }

    pub fn touches_lease(self) -> bool {
        matches!(self, EventScope::Lease | EventScope::Both)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventTrigger {
    AtMonth { month: u32 },
    #[serde(rename_all = "camelCase")]
    Every { months: u32, offset: u32 },
    LoanPayoff,
    LeaseTurnIn,
    Random { probability: f64 },
}

impl EventTrigger {
    pub fn is_scheduled(&self) -> bool {
        !matches!(self, EventTrigger::Random { .. })
    }
}

/// One declarative (trigger, effect) pair. `value_shock` moves the shared
/// market multiplier from the firing month onward; `scope` only routes cost
/// and satisfaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRule {
    pub label: String,
    pub scope: EventScope,
    pub trigger: EventTrigger,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub satisfaction_delta: f64,
    #[serde(default)]
    pub value_shock: f64,
}

#[derive(Copy, Clone, Debug)]
pub struct TriggerContext {
    pub month: u32,
    pub loan_term_months: u32,
    pub lease_term_months: u32,
}

impl TriggerContext {
    pub fn is_lease_turn_in(&self) -> bool {
        self.month > 0 && self.month % self.lease_term_months.max(1) == 0
    }
}

impl EventRule {
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(ProjectionError::InvalidConfig(format!(
                "event '{}': {reason}",
                self.label
            )))
        };
        if self.label.trim().is_empty() {
            return Err(ProjectionError::InvalidConfig(
                "event label must not be empty".to_string(),
            ));
        }
        if !self.cost.is_finite() || !self.satisfaction_delta.is_finite() {
            return fail("cost and satisfaction delta must be finite");
        }
        if !self.value_shock.is_finite() || self.value_shock <= -1.0 {
            return fail("value shock must be finite and > -1");
        }
        match self.trigger {
            EventTrigger::Every { months: 0, .. } => fail("repeat interval must be >= 1"),
            EventTrigger::Random { probability } if !(0.0..=1.0).contains(&probability) => {
                fail("probability must be between 0 and 1")
            }
            EventTrigger::Random { .. } if self.value_shock != 0.0 => {
                fail("random events cannot move asset values")
            }
            _ => Ok(()),
        }
    }

    /// Random triggers consume exactly one draw per call whether or not they fire.
    pub fn fires(&self, ctx: TriggerContext, rng: &mut Rng) -> bool {
        match self.trigger {
            EventTrigger::AtMonth { month } => ctx.month == month,
            EventTrigger::Every { months, offset } => {
                ctx.month > 0
                    && ctx.month >= offset
                    && (ctx.month - offset) % months.max(1) == 0
            }
            EventTrigger::LoanPayoff => ctx.month == ctx.loan_term_months,
            EventTrigger::LeaseTurnIn => ctx.is_lease_turn_in(),
            EventTrigger::Random { probability } => rng.chance(probability),
        }
    }

    pub fn applied(&self) -> AppliedEvent {
        AppliedEvent {
            label: self.label.clone(),
            cost: self.cost,
            satisfaction_delta: self.satisfaction_delta,
            scheduled: self.trigger.is_scheduled(),
        }
    }
}

/// Events that fired in one month, already split by scenario.
#[derive(Debug, Default)]
pub struct MonthEvents {
    pub own: Vec<AppliedEvent>,
    pub lease: Vec<AppliedEvent>,
    pub value_shock: f64,
}

impl MonthEvents {
    pub fn own_cost(&self) -> f64 {
        self.own.iter().map(|e| e.cost).sum()
    }

    pub fn lease_cost(&self) -> f64 {
        self.lease.iter().map(|e| e.cost).sum()
    }

    pub fn own_satisfaction(&self) -> f64 {
        self.own.iter().map(|e| e.satisfaction_delta).sum()
    }

    pub fn lease_satisfaction(&self) -> f64 {
        self.lease.iter().map(|e| e.satisfaction_delta).sum()
    }
}

pub fn evaluate_rules(rules: &[EventRule], ctx: TriggerContext, rng: &mut Rng) -> MonthEvents {
    let mut out = MonthEvents::default();
    let mut shock_factor = 1.0;
    for rule in rules {
        if !rule.fires(ctx, rng) {
            continue;
        }
        if rule.scope.touches_own() {
            out.own.push(rule.applied());
        }
        if rule.scope.touches_lease() {
            out.lease.push(rule.applied());
        }
        shock_factor *= 1.0 + rule.value_shock;
    }
    out.value_shock = shock_factor - 1.0;
    out
}

pub fn default_event_rules() -> Vec<EventRule> {
    vec![
        EventRule {
            label: "First annual service".to_string(),
            scope: EventScope::Own,
            trigger: EventTrigger::AtMonth { month: 12 },
            cost: 250.0,
            satisfaction_delta: 0.0,
            value_shock: 0.0,
        },
        EventRule {
            label: "Tire replacement".to_string(),
            scope: EventScope::Own,
            trigger: EventTrigger::Every {
                months: 40,
                offset: 40,
            },
            cost: 900.0,
            satisfaction_delta: -2.0,
            value_shock: 0.0,
        },
        EventRule {
            label: "Major service interval".to_string(),
            scope: EventScope::Own,
            trigger: EventTrigger::Every {
                months: 36,
                offset: 36,
            },
            cost: 1_200.0,
            satisfaction_delta: -3.0,
            value_shock: 0.0,
        },
        EventRule {
            label: "Used-vehicle market correction".to_string(),
            scope: EventScope::Both,
            trigger: EventTrigger::AtMonth { month: 30 },
            cost: 0.0,
            satisfaction_delta: 0.0,
            value_shock: -0.04,
        },
        EventRule {
            label: "Loan paid off".to_string(),
            scope: EventScope::Own,
            trigger: EventTrigger::LoanPayoff,
            cost: 0.0,
            satisfaction_delta: 12.0,
            value_shock: 0.0,
        },
        EventRule {
            label: "Lease turn-in and new vehicle".to_string(),
            scope: EventScope::Lease,
            trigger: EventTrigger::LeaseTurnIn,
            cost: 695.0,
            satisfaction_delta: 10.0,
            value_shock: 0.0,
        },
        EventRule {
            label: "Minor parking scrape".to_string(),
            scope: EventScope::Both,
            trigger: EventTrigger::Random { probability: 0.02 },
            cost: 350.0,
            satisfaction_delta: -4.0,
            value_shock: 0.0,
        },
        EventRule {
            label: "Windshield chip repair".to_string(),
            scope: EventScope::Own,
            trigger: EventTrigger::Random { probability: 0.015 },
            cost: 120.0,
            satisfaction_delta: -1.0,
            value_shock: 0.0,
        },
        EventRule {
            label: "Memorable road trip".to_string(),
            scope: EventScope::Both,
            trigger: EventTrigger::Random { probability: 0.04 },
            cost: 0.0,
            satisfaction_delta: 3.0,
            value_shock: 0.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(month: u32) -> TriggerContext {
        TriggerContext {
            month,
            loan_term_months: 60,
            lease_term_months: 36,
        }
    }

    fn rule(trigger: EventTrigger) -> EventRule {
        EventRule {
            label: "test".to_string(),
            scope: EventScope::Both,
            trigger,
            cost: 10.0,
            satisfaction_delta: 1.0,
            value_shock: 0.0,
        }
    }

    #[test]
    fn default_rules_validate() {
        for rule in default_event_rules() {
            rule.validate().expect("default rule must validate");
        }
    }

    #[test]
    fn at_month_fires_once() {
        let mut rng = Rng::new(1);
        let r = rule(EventTrigger::AtMonth { month: 12 });
        let fired: Vec<u32> = (0..60).filter(|&m| r.fires(ctx(m), &mut rng)).collect();
        assert_eq!(fired, vec![12]);
    }

    #[test]
    fn every_fires_on_interval_after_offset() {
        let mut rng = Rng::new(1);
        let r = rule(EventTrigger::Every {
            months: 12,
            offset: 6,
        });
        let fired: Vec<u32> = (0..40).filter(|&m| r.fires(ctx(m), &mut rng)).collect();
        assert_eq!(fired, vec![6, 18, 30]);
    }

    #[test]
    fn payoff_and_turn_in_follow_terms() {
        let mut rng = Rng::new(1);
        let payoff = rule(EventTrigger::LoanPayoff);
        let turn_in = rule(EventTrigger::LeaseTurnIn);
        let payoff_months: Vec<u32> = (0..=120)
            .filter(|&m| payoff.fires(ctx(m), &mut rng))
            .collect();
        let turn_in_months: Vec<u32> = (0..=120)
            .filter(|&m| turn_in.fires(ctx(m), &mut rng))
            .collect();
        assert_eq!(payoff_months, vec![60]);
        assert_eq!(turn_in_months, vec![36, 72, 108]);
    }

    #[test]
    fn random_rules_cannot_shock_values() {
        let mut r = rule(EventTrigger::Random { probability: 0.5 });
        r.value_shock = -0.1;
        assert!(matches!(r.validate(), Err(ProjectionError::InvalidConfig(_))));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let r = rule(EventTrigger::Every {
            months: 0,
            offset: 0,
        });
        assert!(r.validate().is_err());
    }

    #[test]
    fn evaluate_routes_by_scope_and_compounds_shocks() {
        let mut rng = Rng::new(9);
        let mut own_only = rule(EventTrigger::AtMonth { month: 3 });
        own_only.scope = EventScope::Own;
        own_only.value_shock = -0.1;
        let mut lease_only = rule(EventTrigger::AtMonth { month: 3 });
        lease_only.scope = EventScope::Lease;
        lease_only.value_shock = -0.1;

        let events = evaluate_rules(&[own_only, lease_only], ctx(3), &mut rng);
        assert_eq!(events.own.len(), 1);
        assert_eq!(events.lease.len(), 1);
        assert!((events.value_shock - (0.9 * 0.9 - 1.0)).abs() < 1e-12);
        assert!((events.own_cost() - 10.0).abs() < 1e-12);
        assert!(events.own.iter().all(|e| e.scheduled));
    }

    #[test]
    fn rules_deserialize_from_tagged_json() {
        let json = r#"[
            {"label": "Recall fix", "scope": "own", "trigger": {"kind": "atMonth", "month": 18}, "satisfactionDelta": -5},
            {"label": "Hail", "scope": "both", "trigger": {"kind": "random", "probability": 0.01}, "cost": 500}
        ]"#;
        let rules: Vec<EventRule> = serde_json::from_str(json).expect("valid json");
        assert_eq!(rules[0].trigger, EventTrigger::AtMonth { month: 18 });
        assert_eq!(rules[0].cost, 0.0);
        assert_eq!(rules[1].scope, EventScope::Both);
        assert!(!rules[1].trigger.is_scheduled());
    }
}
