//! Per-session token accounting.
//!
//! One [`SessionAccounting`] is shared by every model call in a top-level
//! invocation and flushed once when the invocation ends.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::pricing::PricingTable;

/// Accumulated usage for one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub calls: u64,
}

impl ModelUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Cost breakdown for a single model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCost {
    pub model: String,
    pub usage: ModelUsage,
    pub cost_usd: f64,
}

/// What a flush produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostReport {
    pub by_model: Vec<ModelCost>,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
}

#[derive(Debug, Default)]
pub struct SessionAccounting {
    usage: Mutex<BTreeMap<String, ModelUsage>>,
}

impl SessionAccounting {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ModelUsage>> {
        self.usage.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one model call.
    pub fn record(&self, model: &str, input_tokens: u64, output_tokens: u64) {
        let mut usage = self.lock();
        let entry = usage.entry(model.to_string()).or_default();
        entry.input_tokens += input_tokens;
        entry.output_tokens += output_tokens;
        entry.calls += 1;
        tracing::debug!(model = %model, input_tokens, output_tokens, "Usage recorded");
    }

    pub fn total_tokens(&self) -> u64 {
        self.lock().values().map(ModelUsage::total_tokens).sum()
    }

    pub fn usage_by_model(&self) -> Vec<(String, ModelUsage)> {
        self.lock().iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    pub fn model_costs(&self, pricing: &PricingTable) -> Vec<ModelCost> {
        self.lock()
            .iter()
            .map(|(model, usage)| ModelCost {
                model: model.clone(),
                usage: *usage,
                cost_usd: pricing.compute_cost(model, usage.input_tokens, usage.output_tokens),
            })
            .collect()
    }

    pub fn total_cost(&self, pricing: &PricingTable) -> f64 {
        self.model_costs(pricing).iter().map(|c| c.cost_usd).sum()
    }

    /// Price and log the accumulated usage, then reset it.
    pub fn flush(&self, pricing: &PricingTable) -> CostReport {
        let by_model = self.model_costs(pricing);
        self.lock().clear();

        for cost in &by_model {
            info!(
                model = %cost.model,
                calls = cost.usage.calls,
                input_tokens = cost.usage.input_tokens,
                output_tokens = cost.usage.output_tokens,
                cost_usd = cost.cost_usd,
                "Model usage"
            );
        }
        let report = CostReport {
            total_tokens: by_model.iter().map(|c| c.usage.total_tokens()).sum(),
            total_cost_usd: by_model.iter().map(|c| c.cost_usd).sum(),
            by_model,
        };
        info!(
            total_tokens = report.total_tokens,
            total_cost_usd = report.total_cost_usd,
            "Session cost"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::ModelPricing;

    #[test]
    fn records_accumulate_per_model() {
        let acct = SessionAccounting::new();
        acct.record("claude-sonnet-4-20250514", 100, 20);
        acct.record("claude-sonnet-4-20250514", 50, 10);
        acct.record("claude-3-5-haiku-latest", 7, 3);

        assert_eq!(acct.total_tokens(), 190);
        let by_model = acct.usage_by_model();
        assert_eq!(by_model.len(), 2);
        let sonnet = by_model
            .iter()
            .find(|(m, _)| m == "claude-sonnet-4-20250514")
            .unwrap();
        assert_eq!(sonnet.1.calls, 2);
        assert_eq!(sonnet.1.input_tokens, 150);
    }

    #[test]
    fn total_cost_is_sum_of_per_call_formula() {
        let mut pricing = PricingTable::empty(ModelPricing::new(3.0, 15.0));
        pricing.set("cheap", ModelPricing::new(1.0, 2.0));
        let acct = SessionAccounting::new();
        let calls = [("cheap", 1200u64, 300u64), ("cheap", 800, 700), ("other", 5000, 100)];
        for (m, i, o) in calls {
            acct.record(m, i, o);
        }

        let expected: f64 = calls
            .iter()
            .map(|(m, i, o)| pricing.compute_cost(m, *i, *o))
            .sum();
        assert!((acct.total_cost(&pricing) - expected).abs() < 1e-12);
    }

    #[test]
    fn flush_reports_and_resets() {
        let pricing = PricingTable::with_defaults();
        let acct = SessionAccounting::new();
        acct.record("claude-sonnet-4-20250514", 1_000_000, 0);

        let report = acct.flush(&pricing);
        assert_eq!(report.total_tokens, 1_000_000);
        assert!((report.total_cost_usd - 3.0).abs() < 1e-10);
        assert_eq!(report.by_model.len(), 1);

        assert_eq!(acct.total_tokens(), 0);
        assert_eq!(acct.flush(&pricing), CostReport::default());
    }
}
