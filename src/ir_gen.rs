//! Lowers a type-checked AST into per-function three-address IR.
//!
//! Each function gets its own [`IrContext`]: fresh-name counters for
//! temporaries and labels are never shared across functions, so the
//! numbering restarts at every function boundary (invariant: IR variable
//! and label names are unique only within one function's instruction
//! list).

use std::collections::HashMap;

use crate::ast::{Expr, ExprKind, FunctionDefinition, Module};
use crate::ir::{IRVar, Instruction, Label};
use crate::token::SourceLocation;

pub struct IrFunction {
    pub name: String,
    pub params: Vec<String>,
    pub instructions: Vec<Instruction>,
}

/// Per-function lowering state, threaded explicitly through the
/// recursive `lower_*` methods rather than kept as ambient/global state.
struct IrContext {
    var_counter: usize,
    label_counter: usize,
    scopes: Vec<HashMap<String, IRVar>>,
    loop_cond_labels: Vec<Label>,
    loop_end_labels: Vec<Label>,
    return_var: IRVar,
    return_label: Label,
}

impl IrContext {
    fn new() -> Self {
        IrContext {
            var_counter: 0,
            label_counter: 0,
            scopes: vec![HashMap::new()],
            loop_cond_labels: Vec::new(),
            loop_end_labels: Vec::new(),
            return_var: IRVar("return_slot".into()),
            return_label: Label("function_end".into()),
        }
    }

    fn new_var(&mut self) -> IRVar {
        self.var_counter += 1;
        IRVar(format!("x{}", self.var_counter))
    }

    fn new_label(&mut self, prefix: &str) -> Label {
        self.label_counter += 1;
        Label(format!("{prefix}{}", self.label_counter))
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, var: IRVar) {
        self.scopes
            .last_mut()
            .expect("IrContext always has at least one scope")
            .insert(name.to_string(), var);
    }

    fn lookup(&self, name: &str) -> IRVar {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.get(name))
            .cloned()
            .unwrap_or_else(|| IRVar(name.to_string()))
    }
}

/// Lowers every function definition plus a synthesized `main` wrapping
/// the module's top-level expression.
pub fn lower_module(module: &Module) -> Vec<IrFunction> {
    let mut functions: Vec<IrFunction> = module
        .functions
        .iter()
        .map(lower_function)
        .collect();
    functions.push(lower_main(module));
    functions
}

fn lower_function(f: &FunctionDefinition) -> IrFunction {
    let mut ctx = IrContext::new();
    for p in &f.params {
        ctx.declare(&p.name, IRVar(p.name.clone()));
    }
    let mut instructions = Vec::new();
    let result = lower_expr(&f.body, &mut ctx, &mut instructions);
    instructions.push(Instruction::Copy {
        source: result,
        dest: ctx.return_var.clone(),
        location: f.location,
    });
    instructions.push(Instruction::Label {
        label: ctx.return_label.clone(),
        location: f.location,
    });
    IrFunction {
        name: f.name.clone(),
        params: f.params.iter().map(|p| p.name.clone()).collect(),
        instructions,
    }
}

/// The implicit entry point. Its body is the module's top-level
/// expression; if that expression's type is `Int` or `Bool` its value is
/// auto-printed via `print_int`/`print_bool` before the function
/// returns.
fn lower_main(module: &Module) -> IrFunction {
    let mut ctx = IrContext::new();
    let mut instructions = Vec::new();
    let result = lower_expr(&module.top_level, &mut ctx, &mut instructions);
    let loc = module.top_level.location;
    match module.top_level.inferred_type {
        Some(crate::types::Type::Int) => {
            let dest = ctx.new_var();
            instructions.push(Instruction::Call {
                fun: IRVar("print_int".into()),
                args: vec![result],
                dest,
                location: loc,
            });
        }
        Some(crate::types::Type::Bool) => {
            let dest = ctx.new_var();
            instructions.push(Instruction::Call {
                fun: IRVar("print_bool".into()),
                args: vec![result],
                dest,
                location: loc,
            });
        }
        _ => {}
    }
    instructions.push(Instruction::Label {
        label: ctx.return_label.clone(),
        location: loc,
    });
    IrFunction {
        name: "main".to_string(),
        params: Vec::new(),
        instructions,
    }
}

fn lower_expr(expr: &Expr, ctx: &mut IrContext, out: &mut Vec<Instruction>) -> IRVar {
    let loc = expr.location;
    match &expr.kind {
        ExprKind::IntLiteral(v) => {
            let dest = ctx.new_var();
            out.push(Instruction::LoadIntConst {
                value: *v,
                dest: dest.clone(),
                location: loc,
            });
            dest
        }
        ExprKind::BoolLiteral(v) => {
            let dest = ctx.new_var();
            out.push(Instruction::LoadBoolConst {
                value: *v,
                dest: dest.clone(),
                location: loc,
            });
            dest
        }
        ExprKind::UnitLiteral => ctx.new_var(),
        ExprKind::Identifier(name) => ctx.lookup(name),
        ExprKind::UnaryOp { op, operand } => {
            let operand_var = lower_expr(operand, ctx, out);
            let dest = ctx.new_var();
            out.push(Instruction::Call {
                fun: IRVar(op.clone()),
                args: vec![operand_var],
                dest: dest.clone(),
                location: loc,
            });
            dest
        }
        ExprKind::BinaryOp { op, left, right } if op == "and" || op == "or" => {
            lower_short_circuit(op, left, right, loc, ctx, out)
        }
        ExprKind::BinaryOp { op, left, right } if op == "=" => {
            let rhs_var = lower_expr(right, ctx, out);
            let ExprKind::Identifier(name) = &left.kind else {
                panic!("type checker guarantees the left-hand side of '=' is an identifier");
            };
            let lhs_var = ctx.lookup(name);
            out.push(Instruction::Copy {
                source: rhs_var,
                dest: lhs_var.clone(),
                location: loc,
            });
            lhs_var
        }
        ExprKind::BinaryOp { op, left, right } => {
            let left_var = lower_expr(left, ctx, out);
            let right_var = lower_expr(right, ctx, out);
            let dest = ctx.new_var();
            out.push(Instruction::Call {
                fun: IRVar(op.clone()),
                args: vec![left_var, right_var],
                dest: dest.clone(),
                location: loc,
            });
            dest
        }
        ExprKind::IfExpression {
            condition,
            then_branch,
            else_branch,
        } => lower_if(condition, then_branch, else_branch.as_deref(), loc, ctx, out),
        ExprKind::WhileLoop { condition, body } => lower_while(condition, body, loc, ctx, out),
        ExprKind::Block { statements, result } => {
            ctx.push_scope();
            for stmt in statements {
                lower_expr(stmt, ctx, out);
            }
            let dest = lower_expr(result, ctx, out);
            ctx.pop_scope();
            dest
        }
        ExprKind::VarDeclaration { name, value, .. } => {
            let value_var = lower_expr(value, ctx, out);
            let dest = ctx.new_var();
            out.push(Instruction::Copy {
                source: value_var,
                dest: dest.clone(),
                location: loc,
            });
            ctx.declare(name, dest);
            ctx.new_var() // Unit result, never read
        }
        ExprKind::FunctionCall { name, args } => {
            let arg_vars: Vec<IRVar> = args.iter().map(|a| lower_expr(a, ctx, out)).collect();
            let dest = ctx.new_var();
            out.push(Instruction::Call {
                fun: IRVar(name.clone()),
                args: arg_vars,
                dest: dest.clone(),
                location: loc,
            });
            dest
        }
        ExprKind::BreakStatement => {
            let label = ctx
                .loop_end_labels
                .last()
                .cloned()
                .expect("type checker guarantees break only occurs inside a loop");
            out.push(Instruction::Jump {
                label,
                location: loc,
            });
            ctx.new_var()
        }
        ExprKind::ContinueStatement => {
            let label = ctx
                .loop_cond_labels
                .last()
                .cloned()
                .expect("type checker guarantees continue only occurs inside a loop");
            out.push(Instruction::Jump {
                label,
                location: loc,
            });
            ctx.new_var()
        }
        ExprKind::ReturnStatement { value } => {
            let result = match value {
                Some(v) => lower_expr(v, ctx, out),
                None => ctx.new_var(),
            };
            out.push(Instruction::Copy {
                source: result,
                dest: ctx.return_var.clone(),
                location: loc,
            });
            out.push(Instruction::Jump {
                label: ctx.return_label.clone(),
                location: loc,
            });
            ctx.new_var()
        }
    }
}

/// `and`/`or` short-circuit: the right operand is only evaluated when its
/// value can still change the result, lowered as an explicit
/// conditional jump rather than treated like an ordinary binary call.
fn lower_short_circuit(
    op: &str,
    left: &Expr,
    right: &Expr,
    loc: SourceLocation,
    ctx: &mut IrContext,
    out: &mut Vec<Instruction>,
) -> IRVar {
    let left_var = lower_expr(left, ctx, out);
    let result = ctx.new_var();
    let right_label = ctx.new_label("and_or_right");
    let skip_label = ctx.new_label("and_or_skip");
    let end_label = ctx.new_label("and_or_end");

    if op == "and" {
        out.push(Instruction::CondJump {
            cond: left_var,
            then_label: right_label.clone(),
            else_label: skip_label.clone(),
            location: loc,
        });
    } else {
        out.push(Instruction::CondJump {
            cond: left_var,
            then_label: skip_label.clone(),
            else_label: right_label.clone(),
            location: loc,
        });
    }

    out.push(Instruction::Label {
        label: right_label,
        location: loc,
    });
    let right_var = lower_expr(right, ctx, out);
    out.push(Instruction::Copy {
        source: right_var,
        dest: result.clone(),
        location: loc,
    });
    out.push(Instruction::Jump {
        label: end_label.clone(),
        location: loc,
    });

    out.push(Instruction::Label {
        label: skip_label,
        location: loc,
    });
    let short_circuit_dest = ctx.new_var();
    out.push(Instruction::LoadBoolConst {
        value: op == "or",
        dest: short_circuit_dest.clone(),
        location: loc,
    });
    out.push(Instruction::Copy {
        source: short_circuit_dest,
        dest: result.clone(),
        location: loc,
    });

    out.push(Instruction::Label {
        label: end_label,
        location: loc,
    });
    result
}

fn lower_if(
    condition: &Expr,
    then_branch: &Expr,
    else_branch: Option<&Expr>,
    loc: SourceLocation,
    ctx: &mut IrContext,
    out: &mut Vec<Instruction>,
) -> IRVar {
    let cond_var = lower_expr(condition, ctx, out);
    let then_label = ctx.new_label("if_then");
    let end_label = ctx.new_label("if_end");
    let result = ctx.new_var();

    match else_branch {
        Some(else_expr) => {
            let else_label = ctx.new_label("if_else");
            out.push(Instruction::CondJump {
                cond: cond_var,
                then_label: then_label.clone(),
                else_label: else_label.clone(),
                location: loc,
            });
            out.push(Instruction::Label {
                label: then_label,
                location: loc,
            });
            let then_var = lower_expr(then_branch, ctx, out);
            out.push(Instruction::Copy {
                source: then_var,
                dest: result.clone(),
                location: loc,
            });
            out.push(Instruction::Jump {
                label: end_label.clone(),
                location: loc,
            });
            out.push(Instruction::Label {
                label: else_label,
                location: loc,
            });
            let else_var = lower_expr(else_expr, ctx, out);
            out.push(Instruction::Copy {
                source: else_var,
                dest: result.clone(),
                location: loc,
            });
            out.push(Instruction::Jump {
                label: end_label.clone(),
                location: loc,
            });
        }
        None => {
            out.push(Instruction::CondJump {
                cond: cond_var,
                then_label: then_label.clone(),
                else_label: end_label.clone(),
                location: loc,
            });
            out.push(Instruction::Label {
                label: then_label,
                location: loc,
            });
            lower_expr(then_branch, ctx, out);
            out.push(Instruction::Jump {
                label: end_label.clone(),
                location: loc,
            });
        }
    }
    out.push(Instruction::Label {
        label: end_label,
        location: loc,
    });
    result
}

fn lower_while(
    condition: &Expr,
    body: &Expr,
    loc: SourceLocation,
    ctx: &mut IrContext,
    out: &mut Vec<Instruction>,
) -> IRVar {
    let cond_label = ctx.new_label("while_cond");
    let body_label = ctx.new_label("while_body");
    let end_label = ctx.new_label("while_end");

    out.push(Instruction::Label {
        label: cond_label.clone(),
        location: loc,
    });
    let cond_var = lower_expr(condition, ctx, out);
    out.push(Instruction::CondJump {
        cond: cond_var,
        then_label: body_label.clone(),
        else_label: end_label.clone(),
        location: loc,
    });
    out.push(Instruction::Label {
        label: body_label,
        location: loc,
    });
    ctx.loop_cond_labels.push(cond_label.clone());
    ctx.loop_end_labels.push(end_label.clone());
    lower_expr(body, ctx, out);
    ctx.loop_cond_labels.pop();
    ctx.loop_end_labels.pop();
    out.push(Instruction::Jump {
        label: cond_label,
        location: loc,
    });
    out.push(Instruction::Label {
        label: end_label,
        location: loc,
    });
    ctx.new_var()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::token::tokenize;
    use crate::typechecker::check_module;

    fn lower_src(src: &str) -> Vec<IrFunction> {
        let mut m = parse(tokenize(src).unwrap()).unwrap();
        check_module(&mut m).unwrap();
        lower_module(&m)
    }

    fn render(f: &IrFunction) -> String {
        f.instructions
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_literal_lowers_to_load_const() {
        let funcs = lower_src("1 + 2");
        let main = funcs.iter().find(|f| f.name == "main").unwrap();
        let text = render(main);
        assert!(text.contains("LoadIntConst(1"));
        assert!(text.contains("LoadIntConst(2"));
        assert!(text.contains("Call(+"));
    }

    #[test]
    fn test_top_level_int_is_auto_printed() {
        let funcs = lower_src("1 + 2");
        let main = funcs.iter().find(|f| f.name == "main").unwrap();
        assert!(render(main).contains("Call(print_int"));
    }

    #[test]
    fn test_top_level_unit_is_not_printed() {
        let funcs = lower_src("{ var x = 1; }");
        let main = funcs.iter().find(|f| f.name == "main").unwrap();
        let text = render(main);
        assert!(!text.contains("print_int"));
        assert!(!text.contains("print_bool"));
    }

    #[test]
    fn test_assignment_lowers_to_copy_not_call() {
        let funcs = lower_src("{ var x = 1; x = 2; }");
        let main = funcs.iter().find(|f| f.name == "main").unwrap();
        let text = render(main);
        assert!(!text.contains("Call(="));
    }

    #[test]
    fn test_and_short_circuits() {
        let funcs = lower_src("false and true");
        let main = funcs.iter().find(|f| f.name == "main").unwrap();
        let text = render(main);
        assert!(text.contains("CondJump"));
    }

    #[test]
    fn test_while_loop_has_three_labels() {
        let funcs = lower_src("while true do { break; }");
        let main = funcs.iter().find(|f| f.name == "main").unwrap();
        let label_count = main
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Label { .. }))
            .count();
        assert!(label_count >= 3);
    }

    #[test]
    fn test_function_lowers_with_its_own_counters() {
        let funcs = lower_src("fun f(a: Int): Int { a + 1 } f(1)");
        let f = funcs.iter().find(|f| f.name == "f").unwrap();
        assert_eq!(f.params, vec!["a".to_string()]);
        assert!(render(f).contains("Call(+"));
    }
}
