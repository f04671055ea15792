//! Running cost accumulation by day and month, with optional budget status.
//!
//! Keyed by calendar day/month (`chrono`, already in the pack's LLM-adjacent
//! repos for this kind of bucketing) rather than a fixed-size ring: cost
//! totals need to reset at calendar boundaries, not after N samples.

use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct CostBudget {
    pub daily_budget_usd: Option<f64>,
    pub monthly_budget_usd: Option<f64>,
}

#[derive(Debug, Default)]
pub struct CostTracker {
    total_usd: f64,
    by_day: HashMap<String, f64>,
    by_month: HashMap<String, f64>,
    budget: CostBudget,
}

fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// Fields persisted to disk. `CostBudget` is deliberately excluded — it is
/// reloaded fresh from config on every restart.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCost {
    pub total_usd: f64,
    pub by_day: HashMap<String, f64>,
    pub by_month: HashMap<String, f64>,
}

impl CostTracker {
    pub fn new(budget: CostBudget) -> Self {
        Self {
            budget,
            ..Default::default()
        }
    }

    pub fn restore(persisted: PersistedCost, budget: CostBudget) -> Self {
        Self {
            total_usd: persisted.total_usd,
            by_day: persisted.by_day,
            by_month: persisted.by_month,
            budget,
        }
    }

    pub fn to_persisted(&self) -> PersistedCost {
        PersistedCost {
            total_usd: self.total_usd,
            by_day: self.by_day.clone(),
            by_month: self.by_month.clone(),
        }
    }

    pub fn record(&mut self, amount_usd: f64, at: DateTime<Utc>) {
        self.total_usd += amount_usd;
        *self.by_day.entry(day_key(at)).or_insert(0.0) += amount_usd;
        *self.by_month.entry(month_key(at)).or_insert(0.0) += amount_usd;
    }

    pub fn snapshot(&self, at: DateTime<Utc>) -> CostSnapshot {
        let today = self.by_day.get(&day_key(at)).copied().unwrap_or(0.0);
        let this_month = self.by_month.get(&month_key(at)).copied().unwrap_or(0.0);

        let seconds_into_day = (at.num_seconds_from_midnight()) as f64;
        let day_fraction_elapsed = (seconds_into_day / 86_400.0).clamp(1e-6, 1.0);
        let projected_daily = today / day_fraction_elapsed;

        let budget = if self.budget.daily_budget_usd.is_some() || self.budget.monthly_budget_usd.is_some() {
            Some(BudgetStatus {
                daily_remaining_usd: self.budget.daily_budget_usd.map(|b| (b - today).max(0.0)),
                monthly_remaining_usd: self.budget.monthly_budget_usd.map(|b| (b - this_month).max(0.0)),
                over_budget: self.budget.daily_budget_usd.is_some_and(|b| today > b)
                    || self.budget.monthly_budget_usd.is_some_and(|b| this_month > b),
            })
        } else {
            None
        };

        CostSnapshot {
            cost_usd: self.total_usd,
            daily_projected_usd: projected_daily,
            monthly_current_usd: this_month,
            budget,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub daily_remaining_usd: Option<f64>,
    pub monthly_remaining_usd: Option<f64>,
    pub over_budget: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSnapshot {
    pub cost_usd: f64,
    pub daily_projected_usd: f64,
    pub monthly_current_usd: f64,
    pub budget: Option<BudgetStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn accumulates_cost_into_the_right_day_and_month() {
        let mut tracker = CostTracker::new(CostBudget::default());
        tracker.record(1.5, at(0));
        tracker.record(2.5, at(12));
        let snap = tracker.snapshot(at(23));
        assert_eq!(snap.cost_usd, 4.0);
        assert_eq!(snap.monthly_current_usd, 4.0);
    }

    #[test]
    fn projects_daily_cost_from_elapsed_fraction() {
        let mut tracker = CostTracker::new(CostBudget::default());
        tracker.record(6.0, at(0));
        let snap = tracker.snapshot(at(6)); // quarter of the day elapsed
        assert!((snap.daily_projected_usd - 24.0).abs() < 0.5);
    }

    #[test]
    fn flags_over_budget_once_daily_spend_exceeds_it() {
        let mut tracker = CostTracker::new(CostBudget {
            daily_budget_usd: Some(5.0),
            monthly_budget_usd: None,
        });
        tracker.record(6.0, at(0));
        let snap = tracker.snapshot(at(1));
        assert!(snap.budget.unwrap().over_budget);
    }
}
