//! Parsed expression call tree

use crate::expression::Expression;
use std::sync::Arc;

/// A series-producing argument of a call
#[derive(Debug, Clone)]
pub enum Operand {
    /// Nested function call
    Expression(ExpressionTree),
    /// Index into the expression's metric query list
    Metric(usize),
}

/// One function call with its operands and literal parameters
#[derive(Clone)]
pub struct ExpressionTree {
    name: String,
    function: Arc<dyn Expression>,
    operands: Vec<Operand>,
    params: Vec<String>,
}

impl ExpressionTree {
    pub fn new(name: impl Into<String>, function: Arc<dyn Expression>) -> Self {
        Self {
            name: name.into(),
            function,
            operands: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Builder method: append a series operand
    pub fn operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    /// Builder method: append a literal parameter
    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Name the function was called by
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self) -> &Arc<dyn Expression> {
        &self.function
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Number of calls in the tree, this one included
    pub fn depth_first_count(&self) -> usize {
        1 + self
            .operands
            .iter()
            .map(|op| match op {
                Operand::Expression(sub) => sub.depth_first_count(),
                Operand::Metric(_) => 0,
            })
            .sum::<usize>()
    }

    /// Render back to expression text, resolving metric indexes
    /// against `metric_queries`
    pub fn render(&self, metric_queries: &[String]) -> String {
        let inner: Vec<String> = self
            .operands
            .iter()
            .map(|op| match op {
                Operand::Expression(sub) => sub.render(metric_queries),
                Operand::Metric(i) => metric_queries.get(*i).cloned().unwrap_or_default(),
            })
            .collect();
        self.function.write_string_field(&self.params, &inner.join(",,"))
    }
}

impl std::fmt::Debug for ExpressionTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionTree")
            .field("name", &self.name)
            .field("operands", &self.operands)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::functions::{Scale, SumSeries};

    #[test]
    fn test_render_nested() {
        let inner = ExpressionTree::new("sum", Arc::new(SumSeries))
            .operand(Operand::Metric(0))
            .operand(Operand::Metric(1));
        let tree = ExpressionTree::new("scale", Arc::new(Scale))
            .operand(Operand::Expression(inner))
            .param("2");

        let queries = vec!["sum:a".to_string(), "sum:b".to_string()];
        assert_eq!(tree.render(&queries), "scale(sumSeries(sum:a,,sum:b),,2)");
        assert_eq!(tree.depth_first_count(), 2);
        assert_eq!(tree.name(), "scale");
    }
}
