//! The evaluation engine: contexts, axes, operators, the tree-walking
//! interpreter, and the built-in function library.

pub mod axes;
pub mod collation;
pub mod evaluator;
pub mod functions;
pub mod ops;
pub mod runtime;
