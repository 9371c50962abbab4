//! Abstract opcodes.
//!
//! An opcode names an operation (`add`, `text_concat`, `print`, ...) without
//! binding it to any target's syntax. Targets decide how each opcode is
//! spelled through their op map (see [`crate::target::OpMap`]).

use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! opcodes {
    ($($variant:ident => $name:literal / $arity:literal,)*) => {
        /// An operation not yet bound to any target's concrete syntax.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum OpCode {
            $(
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl OpCode {
            /// Every opcode, in declaration order.
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant),*];

            /// Canonical snake_case name (`text_concat`).
            pub fn as_str(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name,)*
                }
            }

            /// Number of operands the opcode takes.
            pub fn arity(self) -> usize {
                match self {
                    $(OpCode::$variant => $arity,)*
                }
            }
        }
    };
}

opcodes! {
    // (int, int) => int
    Add => "add" / 2,
    Sub => "sub" / 2,
    Mul => "mul" / 2,
    Div => "div" / 2,
    TruncDiv => "trunc_div" / 2,
    Exp => "exp" / 2,
    Mod => "mod" / 2,
    Rem => "rem" / 2,
    BitAnd => "bit_and" / 2,
    BitOr => "bit_or" / 2,
    BitXor => "bit_xor" / 2,
    Gcd => "gcd" / 2,
    Min => "min" / 2,
    Max => "max" / 2,
    // (int, int) => bool
    Lt => "lt" / 2,
    Leq => "leq" / 2,
    Eq => "eq" / 2,
    Neq => "neq" / 2,
    Geq => "geq" / 2,
    Gt => "gt" / 2,
    // (bool, bool) => bool
    Or => "or" / 2,
    And => "and" / 2,
    // membership
    ArrayContains => "array_contains" / 2,
    ListContains => "list_contains" / 2,
    TableContainsKey => "table_contains_key" / 2,
    SetContains => "set_contains" / 2,
    // collection get
    ArrayGet => "array_get" / 2,
    ListGet => "list_get" / 2,
    TableGet => "table_get" / 2,
    TextGetByte => "text_get_byte" / 2,
    // other binary
    ListPush => "list_push" / 2,
    TextConcat => "text_concat" / 2,
    Repeat => "repeat" / 2,
    TextContains => "text_contains" / 2,
    TextFind => "text_find" / 2,
    TextSplit => "text_split" / 2,
    TextGetChar => "text_get_char" / 2,
    JoinUsing => "join_using" / 2,
    RightAlign => "right_align" / 2,
    IntToBinAligned => "int_to_bin_aligned" / 2,
    IntToHexAligned => "int_to_hex_aligned" / 2,
    SimplifyFraction => "simplify_fraction" / 2,
    // unary
    ArgvGet => "argv_get" / 1,
    Abs => "abs" / 1,
    BitNot => "bit_not" / 1,
    Neg => "neg" / 1,
    Not => "not" / 1,
    IntToText => "int_to_text" / 1,
    IntToBin => "int_to_bin" / 1,
    IntToHex => "int_to_hex" / 1,
    TextToInt => "text_to_int" / 1,
    BoolToInt => "bool_to_int" / 1,
    ByteToChar => "byte_to_char" / 1,
    Cardinality => "cardinality" / 1,
    TextLength => "text_length" / 1,
    TextSplitWhitespace => "text_split_whitespace" / 1,
    Sorted => "sorted" / 1,
    Join => "join" / 1,
    TextReversed => "text_reversed" / 1,
    // the rest
    True => "true" / 0,
    False => "false" / 0,
    Argv => "argv" / 0,
    Print => "print" / 1,
    Println => "println" / 1,
    TextReplace => "text_replace" / 3,
    TextGetSlice => "text_get_slice" / 3,
    // collection set
    ArraySet => "array_set" / 3,
    ListSet => "list_set" / 3,
    TableSet => "table_set" / 3,
}

impl OpCode {
    /// Opcodes that read naturally as infix operators.
    pub fn is_binary(self) -> bool {
        self.arity() == 2 && !matches!(self, OpCode::Print | OpCode::Println)
    }

    /// Opcodes that read naturally as prefix operators.
    pub fn is_unary(self) -> bool {
        self.arity() == 1 && !matches!(self, OpCode::Print | OpCode::Println)
    }

    /// Precedence used for parenthesization when a target does not override it.
    pub fn default_precedence(self) -> i32 {
        match self {
            OpCode::Exp => 130,
            OpCode::Neg | OpCode::BitNot => 120,
            OpCode::Repeat | OpCode::Mul | OpCode::Div | OpCode::TruncDiv => 110,
            OpCode::Mod | OpCode::Rem => 110,
            OpCode::Add | OpCode::Sub => 100,
            OpCode::BitAnd => 80,
            OpCode::BitXor => 70,
            OpCode::BitOr => 60,
            OpCode::TextConcat => 50,
            OpCode::Lt
            | OpCode::Gt
            | OpCode::Leq
            | OpCode::Geq
            | OpCode::Eq
            | OpCode::Neq
            | OpCode::ArrayContains
            | OpCode::SetContains
            | OpCode::ListContains
            | OpCode::TableContainsKey => 40,
            OpCode::Not => 30,
            OpCode::And => 20,
            OpCode::Or => 10,
            _ => 0,
        }
    }

    /// Opcode giving the same result with the operands swapped, if any.
    pub fn flip(self) -> Option<OpCode> {
        match self {
            OpCode::Add
            | OpCode::Mul
            | OpCode::Eq
            | OpCode::Neq
            | OpCode::BitAnd
            | OpCode::BitOr
            | OpCode::BitXor
            | OpCode::Min
            | OpCode::Max
            | OpCode::Gcd => Some(self),
            OpCode::Lt => Some(OpCode::Gt),
            OpCode::Gt => Some(OpCode::Lt),
            OpCode::Leq => Some(OpCode::Geq),
            OpCode::Geq => Some(OpCode::Leq),
            _ => None,
        }
    }

    /// Comparison computing the boolean negation of `self`, if any.
    pub fn boolean_not(self) -> Option<OpCode> {
        match self {
            OpCode::Lt => Some(OpCode::Geq),
            OpCode::Gt => Some(OpCode::Leq),
            OpCode::Leq => Some(OpCode::Gt),
            OpCode::Geq => Some(OpCode::Lt),
            OpCode::Eq => Some(OpCode::Neq),
            OpCode::Neq => Some(OpCode::Eq),
            _ => None,
        }
    }

    /// Whether `a op b op c` groups to the right.
    pub fn is_right_associative(self) -> bool {
        matches!(self, OpCode::Exp)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpCode {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpCode::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CompileError::UnknownOpcode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for op in OpCode::ALL {
            assert_eq!(op.as_str().parse::<OpCode>().unwrap(), *op);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = "frobnicate".parse::<OpCode>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown opcode frobnicate");
    }

    #[test]
    fn test_arity_classification() {
        assert!(OpCode::Add.is_binary());
        assert!(OpCode::Neg.is_unary());
        assert!(!OpCode::Println.is_unary());
        assert!(!OpCode::TextReplace.is_binary());
        assert_eq!(OpCode::True.arity(), 0);
        assert_eq!(OpCode::TableSet.arity(), 3);
    }

    #[test]
    fn test_flip_and_negate() {
        assert_eq!(OpCode::Lt.flip(), Some(OpCode::Gt));
        assert_eq!(OpCode::Sub.flip(), None);
        assert_eq!(OpCode::Leq.boolean_not(), Some(OpCode::Gt));
        assert_eq!(OpCode::Add.boolean_not(), None);
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&OpCode::TextConcat).unwrap();
        assert_eq!(json, "\"text_concat\"");
        let op: OpCode = serde_json::from_str("\"bit_xor\"").unwrap();
        assert_eq!(op, OpCode::BitXor);
    }
}
