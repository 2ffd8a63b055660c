//! Plan types produced by the planner and consumed by the step executor.

use serde::{Deserialize, Serialize};

/// One unit of work in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based ordinal
    pub step: u32,

    /// Natural-language description of what to do
    pub action: String,

    /// Tool names this step may use (besides the always-available ones)
    #[serde(default)]
    pub tools: Vec<String>,
}

impl PlanStep {
    pub fn new(step: u32, action: impl Into<String>) -> Self {
        Self {
            step,
            action: action.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Reassign ordinals 1..=n in current order.
    pub fn renumber(&mut self) {
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.step = i as u32 + 1;
        }
    }

    /// Numbered listing, one step per line.
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{}. {}", s.step, s.action))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumber_makes_ordinals_contiguous() {
        let mut plan = Plan::new(vec![
            PlanStep::new(3, "c"),
            PlanStep::new(1, "a"),
            PlanStep::new(1, "b"),
        ]);
        plan.renumber();
        let ordinals: Vec<u32> = plan.steps.iter().map(|s| s.step).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert_eq!(plan.render(), "1. c\n2. a\n3. b");
    }

    #[test]
    fn tools_default_to_empty() {
        let step: PlanStep = serde_json::from_str(r#"{"step": 1, "action": "x"}"#).unwrap();
        assert!(step.tools.is_empty());
    }
}
