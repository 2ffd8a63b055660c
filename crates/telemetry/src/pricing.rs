//! Pricing table for Anthropic models.
//!
//! Prices are in USD per 1 million tokens. Custom prices from the
//! `[pricing.<model>]` config sections override or extend the built-ins.

use serde::{Deserialize, Serialize};
use shellpilot_config::AppConfig;
use std::collections::HashMap;

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_m: f64,
    pub output_per_m: f64,
}

impl ModelPricing {
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Cost in USD for the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1_000_000.0 * self.input_per_m
            + output_tokens as f64 / 1_000_000.0 * self.output_per_m
    }
}

/// Model prices plus the fallback used for anything unrecognised.
#[derive(Debug, Clone)]
pub struct PricingTable {
    prices: HashMap<String, ModelPricing>,
    fallback: ModelPricing,
}

impl PricingTable {
    /// Built-in Anthropic prices with a $3/$15 fallback.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();
        prices.insert("anthropic/claude-opus-4".into(), ModelPricing::new(15.0, 75.0));
        prices.insert("anthropic/claude-sonnet-4".into(), ModelPricing::new(3.0, 15.0));
        prices.insert("anthropic/claude-3-7-sonnet".into(), ModelPricing::new(3.0, 15.0));
        prices.insert("anthropic/claude-3-5-sonnet".into(), ModelPricing::new(3.0, 15.0));
        prices.insert("anthropic/claude-3-5-haiku".into(), ModelPricing::new(1.0, 5.0));
        prices.insert("anthropic/claude-3-opus".into(), ModelPricing::new(15.0, 75.0));
        prices.insert("anthropic/claude-3-haiku".into(), ModelPricing::new(0.25, 1.25));

        Self {
            prices,
            fallback: ModelPricing::new(3.0, 15.0),
        }
    }

    /// Built-ins plus any `[pricing.<model>]` entries from config.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut table = Self::with_defaults();
        for (model, price) in &config.pricing {
            table.set(model.clone(), ModelPricing::new(price.input_per_m, price.output_per_m));
        }
        table
    }

    pub fn empty(fallback: ModelPricing) -> Self {
        Self {
            prices: HashMap::new(),
            fallback,
        }
    }

    pub fn set(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.prices.insert(model.into(), pricing);
    }

    pub fn fallback(&self) -> ModelPricing {
        self.fallback
    }

    /// Look up pricing for a model, without falling back.
    ///
    /// Tries an exact match, then the `anthropic/` prefixed name, then the
    /// longest key whose bare name prefixes the model
    /// (`claude-sonnet-4-20250514` matches `claude-sonnet-4`).
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        if let Some(p) = self.prices.get(model) {
            return Some(*p);
        }
        if let Some(p) = self.prices.get(&format!("anthropic/{model}")) {
            return Some(*p);
        }

        let model_lower = model.to_lowercase();
        let bare_model = model_lower.rsplit('/').next().unwrap_or(&model_lower);

        self.prices
            .iter()
            .filter_map(|(key, pricing)| {
                let bare_key = key.rsplit('/').next().unwrap_or(key).to_lowercase();
                bare_model
                    .starts_with(&bare_key)
                    .then_some((bare_key.len(), *pricing))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, p)| p)
    }

    /// Pricing for a model, or the fallback.
    pub fn pricing_for(&self, model: &str) -> ModelPricing {
        self.get(model).unwrap_or_else(|| {
            tracing::debug!(model = %model, "No price for model; using fallback");
            self.fallback
        })
    }

    pub fn compute_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        self.pricing_for(model).cost(input_tokens, output_tokens)
    }

    /// All known models with their prices, sorted by name.
    pub fn entries(&self) -> Vec<(String, ModelPricing)> {
        let mut entries: Vec<_> = self.prices.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
