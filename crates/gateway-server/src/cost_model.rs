//! A minimal per-model cost-per-token table.
//!
//! Spec §1 explicitly puts "the static pricing tables" out of scope as an
//! external, dashboard-adjacent concern; this is just enough to turn a
//! `usage` object into the `cost` field §3 calls "derived", not that
//! subsystem. Rates are illustrative list prices, not kept in sync with any
//! upstream's actual billing.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct ModelRate {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

pub struct CostModel {
    rates: HashMap<&'static str, ModelRate>,
    default_rate: ModelRate,
}

impl Default for CostModel {
    fn default() -> Self {
        let mut rates = HashMap::new();
        rates.insert("claude-opus-4", ModelRate { input_per_million: 15.0, output_per_million: 75.0 });
        rates.insert("claude-sonnet-4-5", ModelRate { input_per_million: 3.0, output_per_million: 15.0 });
        rates.insert("claude-haiku", ModelRate { input_per_million: 0.8, output_per_million: 4.0 });
        rates.insert("gpt-4o", ModelRate { input_per_million: 2.5, output_per_million: 10.0 });
        rates.insert("gpt-4o-mini", ModelRate { input_per_million: 0.15, output_per_million: 0.6 });
        Self {
            rates,
            default_rate: ModelRate { input_per_million: 3.0, output_per_million: 15.0 },
        }
    }
}

impl CostModel {
    pub fn estimate(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let rate = self.rates.get(model).copied().unwrap_or(self.default_rate);
        let input_cost = input_tokens as f64 / 1_000_000.0 * rate.input_per_million;
        let output_cost = output_tokens as f64 / 1_000_000.0 * rate.output_per_million;
        input_cost + output_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_uses_its_own_rate() {
        let model = CostModel::default();
        let cost = model.estimate("claude-sonnet-4-5", 10, 5);
        assert!(cost > 0.0);
    }

    #[test]
    fn unknown_model_falls_back_to_the_default_rate() {
        let model = CostModel::default();
        let cost = model.estimate("some-unlisted-model", 1_000_000, 0);
        assert_eq!(cost, 3.0);
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        let model = CostModel::default();
        assert_eq!(model.estimate("claude-haiku", 0, 0), 0.0);
    }
}
