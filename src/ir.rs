//! Three-address intermediate representation: the output of lowering and
//! the input to assembly generation.

use std::fmt;

use crate::token::SourceLocation;

/// A variable in the IR: either a fresh temporary (`x1`, `x2`, ...) or a
/// well-known name such as a function parameter or a reserved slot like
/// the function's return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IRVar(pub String);

impl fmt::Display for IRVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub String);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    LoadIntConst {
        value: i64,
        dest: IRVar,
        location: SourceLocation,
    },
    LoadBoolConst {
        value: bool,
        dest: IRVar,
        location: SourceLocation,
    },
    Copy {
        source: IRVar,
        dest: IRVar,
        location: SourceLocation,
    },
    Call {
        fun: IRVar,
        args: Vec<IRVar>,
        dest: IRVar,
        location: SourceLocation,
    },
    Jump {
        label: Label,
        location: SourceLocation,
    },
    CondJump {
        cond: IRVar,
        then_label: Label,
        else_label: Label,
        location: SourceLocation,
    },
    Label {
        label: Label,
        location: SourceLocation,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LoadIntConst { value, dest, .. } => write!(f, "LoadIntConst({value}, {dest})"),
            Instruction::LoadBoolConst { value, dest, .. } => {
                write!(f, "LoadBoolConst({value}, {dest})")
            }
            Instruction::Copy { source, dest, .. } => write!(f, "Copy({source}, {dest})"),
            Instruction::Call {
                fun, args, dest, ..
            } => {
                let args_str = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Call({fun}, [{args_str}], {dest})")
            }
            Instruction::Jump { label, .. } => write!(f, "Jump({label})"),
            Instruction::CondJump {
                cond,
                then_label,
                else_label,
                ..
            } => write!(f, "CondJump({cond}, {then_label}, {else_label})"),
            Instruction::Label { label, .. } => write!(f, "Label({label})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let loc = SourceLocation::synthetic();
        let i = Instruction::LoadIntConst {
            value: 7,
            dest: IRVar("x1".into()),
            location: loc,
        };
        assert_eq!(i.to_string(), "LoadIntConst(7, x1)");
    }

    #[test]
    fn test_display_call() {
        let loc = SourceLocation::synthetic();
        let i = Instruction::Call {
            fun: IRVar("+".into()),
            args: vec![IRVar("x1".into()), IRVar("x2".into())],
            dest: IRVar("x3".into()),
            location: loc,
        };
        assert_eq!(i.to_string(), "Call(+, [x1, x2], x3)");
    }
}
