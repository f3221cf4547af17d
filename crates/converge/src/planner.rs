//! Execution planner - the ordered list of named stages

use crate::context::ApplyContext;
use crate::error::Result;

/// A stage body: converges one area of the machine using the run's config
pub type StageFn<C> = fn(&ApplyContext<'_>, &C) -> Result<()>;

/// One named stage of a plan
pub struct Stage<C> {
    /// Short key used by `--only` / `--skip`
    pub key: &'static str,
    /// Title shown in "Ensuring {title} setup..."
    pub title: &'static str,
    pub run: StageFn<C>,
}

impl<C> Stage<C> {
    pub fn new(key: &'static str, title: &'static str, run: StageFn<C>) -> Self {
        Self { key, title, run }
    }
}

/// An ordered plan: an optional guard and preflight followed by stages
///
/// Stages run strictly in the order they were added; later stages may assume
/// the earlier ones succeeded.
pub struct ExecutionPlan<C> {
    /// Refuses the run before any step is opened
    pub guard: Option<StageFn<C>>,
    /// Runs before any stage and is never filtered out
    pub preflight: Option<Stage<C>>,
    pub stages: Vec<Stage<C>>,
}

impl<C> ExecutionPlan<C> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            guard: None,
            preflight: None,
            stages: Vec::new(),
        }
    }

    pub fn with_guard(mut self, guard: StageFn<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_preflight(mut self, stage: Stage<C>) -> Self {
        self.preflight = Some(stage);
        self
    }

    pub fn stage(mut self, key: &'static str, title: &'static str, run: StageFn<C>) -> Self {
        self.stages.push(Stage::new(key, title, run));
        self
    }

    /// Keep only the stages selected by `only` (all when empty) and not in `skip`
    ///
    /// Declared order is preserved whatever the order of the filters.
    pub fn filter_by_keys(self, only: &[String], skip: &[String]) -> Self {
        let stages = self
            .stages
            .into_iter()
            .filter(|s| only.is_empty() || only.iter().any(|k| k == s.key))
            .filter(|s| !skip.iter().any(|k| k == s.key))
            .collect();
        Self {
            guard: self.guard,
            preflight: self.preflight,
            stages,
        }
    }

    /// Keys among `requested` that name no stage of this plan
    pub fn unknown_keys<'k>(&self, requested: &'k [String]) -> Vec<&'k str> {
        requested
            .iter()
            .filter(|k| !self.stages.iter().any(|s| s.key == k.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.key).collect()
    }

    /// Number of stages, preflight excluded
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<C> Default for ExecutionPlan<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nothing(_: &ApplyContext<'_>, _: &()) -> Result<()> {
        Ok(())
    }

    fn plan() -> ExecutionPlan<()> {
        ExecutionPlan::new()
            .stage("firewall", "Firewall", nothing)
            .stage("users", "Linux users", nothing)
            .stage("base", "Base software", nothing)
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_no_filter_keeps_everything() {
        let plan = plan().filter_by_keys(&[], &[]);
        assert_eq!(plan.keys(), vec!["firewall", "users", "base"]);
    }

    #[test]
    fn test_only_preserves_declared_order() {
        let plan = plan().filter_by_keys(&keys(&["base", "firewall"]), &[]);
        assert_eq!(plan.keys(), vec!["firewall", "base"]);
    }

    #[test]
    fn test_skip() {
        let plan = plan().filter_by_keys(&[], &keys(&["users"]));
        assert_eq!(plan.keys(), vec!["firewall", "base"]);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_unknown_keys() {
        let requested = keys(&["users", "dns"]);
        assert_eq!(plan().unknown_keys(&requested), vec!["dns"]);
    }

    #[test]
    fn test_preflight_survives_filtering() {
        let plan = plan()
            .with_guard(nothing)
            .with_preflight(Stage::new("preflight", "Linux distribution", nothing))
            .filter_by_keys(&keys(&["users"]), &[]);
        assert!(plan.guard.is_some());
        assert!(plan.preflight.is_some());
        assert!(!plan.is_empty());
    }
}
