//! Reusable rewrite passes.
//!
//! Each plugin is a factory for a fresh [`crate::traverse::Visitor`], so
//! visitor state never outlives one walk over one program.

mod calls;
mod declarations;
mod division;
mod index_calls;
mod loops;
mod mutating;
mod ops;
mod static_eval;
mod temp_vars;

pub use calls::UseUfcs;
pub use declarations::AddVarDeclarations;
pub use division::{DivToTruncDiv, ModToRem, UseUnsignedDivision};
pub use index_calls::UseIndexCalls;
pub use loops::{ForRangeToForCLike, UseInclusiveForRange};
pub use mutating::{AddMutatingBinaryOp, RemoveMutatingBinaryOp};
pub use ops::{MapOps, map_ops};
pub use static_eval::{EvalStaticExpr, GolfStringListLiteral};
pub use temp_vars::TempVarToMultipleAssignment;
