use typed_builder::TypedBuilder;

/// Tunables for one verification run.
///
/// Passed into the checker at verification start; never process-global.
#[derive(Debug, Clone, TypedBuilder)]
pub struct CheckerConfig {
    /// Merge all write-write and induced anti-dependency edges between one
    /// conflicting pair into a single constraint.
    #[builder(default = true)]
    pub coalesce_constraints: bool,
    /// Discharge constraints by reachability before solving.
    #[builder(default = true)]
    pub enable_pruning: bool,
    /// Stop pruning when a round discharges less than this fraction of the
    /// initial constraint count, or when fewer than that fraction remain.
    #[builder(default = 0.01)]
    pub stop_threshold: f64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CheckerConfig::default();
        assert!(config.coalesce_constraints);
        assert!(config.enable_pruning);
        assert!((config.stop_threshold - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn builder_overrides() {
        let config = CheckerConfig::builder()
            .enable_pruning(false)
            .stop_threshold(0.5)
            .build();
        assert!(config.coalesce_constraints);
        assert!(!config.enable_pruning);
        assert!((config.stop_threshold - 0.5).abs() < f64::EPSILON);
    }
}
