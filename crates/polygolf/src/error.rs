//! Compilation errors.

use crate::ir::OpCode;

/// Error raised while compiling one concrete program.
///
/// Everything except [`CompileError::AllVariantsFailed`] and
/// [`CompileError::VariantBudget`] is local to a single variant; variant
/// selection tallies them instead of aborting sibling variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("Undeclared variable {0}")]
    UndeclaredVariable(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Unknown opcode {0}")]
    UnknownOpcode(String),

    #[error("Unsupported operator {0}")]
    UnsupportedOperator(OpCode),

    #[error("Operator {op} takes {arity} operands and cannot be spelled as a token")]
    OperatorArity { op: OpCode, arity: usize },

    #[error("Programming error. Incomplete identifier map: {0}")]
    IncompleteIdentifierMap(String),

    #[error("Programming error. Unlowered {0} node reached emission")]
    UnloweredNode(String),

    #[error("{language} cannot express {kind}")]
    UnsupportedNode { language: String, kind: String },

    #[error("{}{message}", all_failed_prefix(.attempts))]
    AllVariantsFailed { message: String, attempts: usize },

    #[error("Program expands to {count} variants, more than the limit of {limit}")]
    VariantBudget { count: usize, limit: usize },
}

fn all_failed_prefix(attempts: &usize) -> &'static str {
    if *attempts > 1 {
        "No variant could be compiled. Most common error follows. "
    } else {
        ""
    }
}

impl CompileError {
    /// Errors that indicate a bug in a plugin, target or the pipeline itself
    /// rather than a problem with the input program.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CompileError::IncompleteIdentifierMap(_) | CompileError::UnloweredNode(_)
        )
    }

    pub(crate) fn type_mismatch(expected: &str, got: &crate::ir::ValueType) -> Self {
        CompileError::TypeMismatch(format!("expected {expected}, got {got}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_tally_messages() {
        assert_eq!(
            CompileError::UnsupportedOperator(OpCode::BitXor).to_string(),
            "Unsupported operator bit_xor"
        );
        assert_eq!(
            CompileError::UndeclaredVariable("x".into()).to_string(),
            "Undeclared variable x"
        );
    }

    #[test]
    fn test_all_variants_failed_prefix_only_for_many_attempts() {
        let single = CompileError::AllVariantsFailed {
            message: "Undeclared variable x".into(),
            attempts: 1,
        };
        assert_eq!(single.to_string(), "Undeclared variable x");

        let many = CompileError::AllVariantsFailed {
            message: "Undeclared variable x".into(),
            attempts: 6,
        };
        assert_eq!(
            many.to_string(),
            "No variant could be compiled. Most common error follows. Undeclared variable x"
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(CompileError::IncompleteIdentifierMap("a".into()).is_internal());
        assert!(CompileError::UnloweredNode("Op".into()).is_internal());
        assert!(!CompileError::TypeMismatch("x".into()).is_internal());
    }
}
