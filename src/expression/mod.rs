//! Series expressions
//!
//! - **functions**: the built-in function library
//! - **registry**: name → function lookup
//! - **parser**: `name(param,,subexpr(...),,metric:query)` strings → [`ExpressionTree`]
//! - **tree**: the parsed call tree
//! - **evaluator**: post-order evaluation against a [`QuerySplicer`](crate::splice::QuerySplicer)

pub mod functions;
mod evaluator;
mod parser;
mod registry;
mod tree;

pub use evaluator::ExpressionEvaluator;
pub use parser::{parse_expression, ParsedExpression};
pub use registry::FunctionRegistry;
pub use tree::{ExpressionTree, Operand};

use crate::query::{QueryResult, TimeRange};
use crate::series::Series;

/// A named function over groups of series
///
/// `results` holds one group per child of the call, in call order. `params`
/// are the literal (non-series) arguments.
pub trait Expression: Send + Sync {
    /// Canonical function name
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        range: &TimeRange,
        results: &[Vec<Series>],
        params: &[String],
    ) -> QueryResult<Vec<Series>>;

    /// Render a call of this function around an already-rendered argument list
    fn write_string_field(&self, params: &[String], inner: &str) -> String {
        let mut args: Vec<&str> = Vec::with_capacity(params.len() + 1);
        if !inner.is_empty() {
            args.push(inner);
        }
        args.extend(params.iter().map(String::as_str));
        format!("{}({})", self.name(), args.join(",,"))
    }
}
