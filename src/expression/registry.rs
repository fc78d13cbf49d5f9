//! Function registry

use crate::expression::functions::{
    Alias, Difference, Divide, HighestCurrent, HighestMax, Identity, MovingAverage, Multiply,
    Scale, SumSeries,
};
use crate::expression::Expression;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps function names to implementations
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Expression>>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registry holding every built-in function
    pub fn with_builtins() -> Self {
        let sum: Arc<dyn Expression> = Arc::new(SumSeries);
        let mut registry = Self::empty();
        registry.register("id", Arc::new(Identity));
        registry.register("alias", Arc::new(Alias));
        registry.register("scale", Arc::new(Scale));
        registry.register("sumSeries", Arc::clone(&sum));
        registry.register("sum", sum);
        registry.register("difference", Arc::new(Difference));
        registry.register("multiply", Arc::new(Multiply));
        registry.register("divide", Arc::new(Divide));
        registry.register("movingAverage", Arc::new(MovingAverage));
        registry.register("highestCurrent", Arc::new(HighestCurrent));
        registry.register("highestMax", Arc::new(HighestMax));
        registry
    }

    /// Add or replace a function
    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn Expression>) {
        self.functions.insert(name.into(), function);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Expression>> {
        self.functions.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
