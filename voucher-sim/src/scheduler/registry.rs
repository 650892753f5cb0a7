use std::collections::BTreeMap;
use std::sync::Arc;

use super::{FifoStrategy, HybridStrategy, LotteryStrategy, PriorityStrategy, Strategy};

/// Name-to-strategy lookup, built once and shared by reference.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<&'static str, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `fifo`, `priority`, `lottery` and `hybrid`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FifoStrategy));
        registry.register(Arc::new(PriorityStrategy));
        registry.register(Arc::new(LotteryStrategy));
        registry.register(Arc::new(HybridStrategy::default()));
        registry
    }

    /// Registers `strategy` under its own name, replacing any previous entry.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.name(), strategy);
    }

    /// Looks up a strategy by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(name).cloned()
    }

    /// Whether a strategy is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use voucher_core::domain::{Decision, Request};

    use super::*;

    struct ReverseStrategy;

    impl Strategy for ReverseStrategy {
        fn name(&self) -> &'static str {
            "reverse"
        }

        fn schedule(&self, _requests: &[Request], _seed: u64) -> Vec<Decision> {
            Vec::new()
        }
    }

    #[test]
    fn test_builtin_names_sorted() {
        let registry = StrategyRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["fifo", "hybrid", "lottery", "priority"]);
    }

    #[test]
    fn test_lookup() {
        let registry = StrategyRegistry::with_builtin();

        assert_eq!(registry.get("hybrid").map(|s| s.name()), Some("hybrid"));
        assert!(registry.get("HYBRID").is_none());
        assert!(registry.get("round_robin").is_none());
        assert!(registry.contains("lottery"));
    }

    #[test]
    fn test_register_custom() {
        let mut registry = StrategyRegistry::new();
        assert!(registry.names().is_empty());

        registry.register(Arc::new(ReverseStrategy));
        assert!(registry.contains("reverse"));
        assert_eq!(format!("{registry:?}"), r#"StrategyRegistry { strategies: ["reverse"] }"#);
    }
}
