use sleep_core::{
    IdSequence, Priority, Recommendation, RecommendationCategory, SessionMetrics,
};
use std::fmt;

/// Sleep efficiency strictly below this value triggers the environment advice.
pub const LOW_EFFICIENCY_LIMIT: f64 = 80.0;

/// A single advice rule: a predicate over session metrics plus the advice text.
#[derive(Clone)]
pub struct RecommendationRule {
    pub applies: fn(&SessionMetrics) -> bool,
    pub category: RecommendationCategory,
    pub priority: Priority,
    pub title: &'static str,
    pub description: &'static str,
    pub impact: &'static str,
}

impl fmt::Debug for RecommendationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommendationRule")
            .field("category", &self.category)
            .field("priority", &self.priority)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl RecommendationRule {
    pub fn low_efficiency() -> Self {
        Self {
            applies: |m| m.sleep_efficiency < LOW_EFFICIENCY_LIMIT,
            category: RecommendationCategory::Environment,
            priority: Priority::High,
            title: "Improve bedroom environment",
            description: "Adjust the temperature and reduce noise",
            impact: "+15 score points",
        }
    }

    fn build(&self, id: u64) -> Recommendation {
        Recommendation {
            id,
            category: self.category,
            priority: self.priority,
            title: self.title.to_string(),
            description: self.description.to_string(),
            impact: self.impact.to_string(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecommendationGenerator {
    rules: Vec<RecommendationRule>,
}

impl Default for RecommendationGenerator {
    fn default() -> Self {
        Self {
            rules: vec![RecommendationRule::low_efficiency()],
        }
    }
}

impl RecommendationGenerator {
    pub fn with_rules(rules: Vec<RecommendationRule>) -> Self {
        Self { rules }
    }

    pub fn push_rule(&mut self, rule: RecommendationRule) {
        self.rules.push(rule);
    }

    /// Pure apart from id allocation: one recommendation per matching rule.
    pub fn generate(&self, metrics: &SessionMetrics, ids: &mut IdSequence) -> Vec<Recommendation> {
        self.rules
            .iter()
            .filter(|rule| (rule.applies)(metrics))
            .map(|rule| rule.build(ids.next_id()))
            .collect()
    }
}
