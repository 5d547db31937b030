//! Context values and path resolution
//!
//! A render call carries an ordered stack of scope values; variable paths
//! resolve against it innermost-first with a distinct "not found anywhere"
//! failure that the engine routes through the missing-variable handler.

mod resolver;
mod value;

pub use resolver::{deep_get, get, get_from_stack, ResolveError};
pub use value::{BoxError, ContextObject, LambdaFn, LambdaResult, Value};
