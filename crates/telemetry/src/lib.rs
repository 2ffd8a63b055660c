//! Token accounting and cost estimation for shellpilot.
//!
//! Every model call records its usage into a [`SessionAccounting`]; at the
//! end of a top-level invocation the session flushes it against a
//! [`PricingTable`] to produce a [`CostReport`].

pub mod accounting;
pub mod pricing;

pub use accounting::{CostReport, ModelCost, ModelUsage, SessionAccounting};
pub use pricing::{ModelPricing, PricingTable};
