// AST -> Opcode compiler, plus the identifier classification tables that
// decide whether a name loads from the local (mascot) or external (global)
// symbol table (spec §4.C).

use crate::ast::{BinOp, Expr, UnOp};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Opcode {
    Err,
    Ret,
    // Stack section. Indices are resolved against Program::local_vars /
    // global_vars / functions at compile time; the immediate here is
    // already the table index, not a name.
    LoadLocal(u8),
    LoadExternal(u8),
    Store(f64),
    // Arithmetic section.
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // Bitwise section.
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Lshift,
    Rshift,
    // Comparison section.
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    // Logical section.
    LAnd,
    LOr,
    LNot,
    // Control section. The immediate is an instruction-count offset (how
    // many instructions to skip), not a byte offset — `crate::serializer`
    // converts counts to byte widths when it emits hex.
    Bqz(u16),
    Bnz(u16),
    Jmp(u16),
    Call(u8),
}

/// Identifiers that always resolve against the external (global) table,
/// regardless of how they're written in the expression. Ported verbatim
/// from the original compiler's `FORCED_EXTERNAL`.
pub const FORCED_EXTERNAL: &[&str] = &["mascot.anchor", "mascot.totalcount", "mascot.count"];

/// Identifiers that always resolve against the local (mascot) table.
/// `LookRight` appears twice in the source table this is ported from;
/// that duplication is preserved rather than silently deduplicated (spec
/// §9 flags it as an intentional ambiguity, not a bug to fix).
pub const FORCED_LOCAL: &[&str] = &[
    "Name",
    "Type",
    "Class",
    "Embedded",
    "Move",
    "Stay",
    "Animate",
    "Sequence",
    "Select",
    "BorderType",
    "Ceiling",
    "Wall",
    "Floor",
    "TargetX",
    "TargetY",
    "VelocityX",
    "VelocityY",
    "VelocityParam",
    "InitialVX",
    "InitialVY",
    "Gravity",
    "RegistanceX",
    "RegistanceY",
    "LookRight",
    "IeOffsetX",
    "IeOffsetY",
    "X",
    "Y",
    "BornX",
    "BornY",
    "BornBehaviour",
    "BornMascot",
    "BornInterval",
    "BornTransient",
    "BornCount",
    "TransformBehaviour",
    "TransformMascot",
    "Affordance",
    "Behaviour",
    "TargetBehaviour",
    "Loop",
    "Animation",
    "Condition",
    "Image",
    "ImageRight",
    "ImageAnchor",
    "Velocity",
    "Duration",
    "Draggable",
    "Sound",
    "Volume",
    "BehaviourList",
    "ChaseMouse",
    "Frequency",
    "Hidden",
    "NextBehaviourList",
    "Add",
    "BehaviourReference",
    "Fall",
    "Dragged",
    "Thrown",
    "FootX",
    "FootDX",
    "OffsetX",
    "OffsetY",
    "Pose",
    "Hotspot",
    "Shape",
    "Origin",
    "Size",
    "Constant",
    "Value",
    "IsTurn",
    "TargetLook",
    "Information",
    "PreviewImage",
    "SplashImage",
    "Artist",
    "Scripter",
    "URL",
    "Commissioner",
    "Support",
    "Toggleable",
    "Count",
    "LookRight",
    "Gap",
];

fn symname_remap() -> HashMap<String, String> {
    let mut map = HashMap::new();
    for name in FORCED_LOCAL {
        let mut chars = name.chars();
        let canonical = match chars.next() {
            Some(first) => format!("mascot.{}{}", first.to_ascii_lowercase(), chars.as_str()),
            None => String::new(),
        };
        map.insert(name.to_lowercase(), canonical);
    }
    map
}

#[derive(Debug, Error, PartialEq)]
pub enum EmitError {
    #[error("unexpected member access depth in {0:?}")]
    MalformedMemberAccess(String),
}

/// A compiled expression: its instruction stream plus the three symbol
/// tables instruction operands index into.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub instructions: Vec<Opcode>,
    pub local_vars: Vec<String>,
    pub global_vars: Vec<String>,
    pub functions: Vec<String>,
    pub evaluate_once: bool,
}

impl Program {
    pub fn new() -> Program {
        Program {
            instructions: Vec::new(),
            local_vars: Vec::new(),
            global_vars: Vec::new(),
            functions: Vec::new(),
            evaluate_once: true,
        }
    }

    pub fn from_ast(
        ast: &Expr,
        local_vars: Vec<String>,
        global_vars: Vec<String>,
        functions: Vec<String>,
    ) -> Result<Program, EmitError> {
        let mut program = Program {
            instructions: Vec::new(),
            local_vars,
            global_vars,
            functions,
            evaluate_once: true,
        };
        program.compile(ast)?;
        program.instructions.push(Opcode::Ret);
        Ok(program)
    }

    fn index_of(table: &mut Vec<String>, name: &str) -> u8 {
        if let Some(pos) = table.iter().position(|existing| existing == name) {
            pos as u8
        } else {
            table.push(name.to_string());
            (table.len() - 1) as u8
        }
    }

    /// Flatten a `MemberAccess` chain into its dotted string form, e.g.
    /// `Expr::member(Expr::Variable("mascot"), "x")` -> `"mascot.x"`.
    fn member_chain_name(expr: &Expr) -> Option<String> {
        match expr {
            Expr::Variable(name) => Some(name.clone()),
            Expr::MemberAccess(base, member) => {
                Self::member_chain_name(base).map(|prefix| format!("{}.{}", prefix, member))
            }
            _ => None,
        }
    }

    fn compile(&mut self, node: &Expr) -> Result<(), EmitError> {
        let remap = symname_remap();
        match node {
            Expr::Literal(value) => {
                self.instructions.push(Opcode::Store(*value));
            }
            Expr::Variable(raw_name) => {
                let is_forced_external = FORCED_EXTERNAL.contains(&raw_name.to_lowercase().as_str());
                let canonical = remap
                    .get(&raw_name.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| raw_name.clone());
                if is_forced_external {
                    let idx = Self::index_of(&mut self.global_vars, &canonical);
                    self.instructions.push(Opcode::LoadExternal(idx));
                } else {
                    let idx = Self::index_of(&mut self.local_vars, &canonical);
                    self.instructions.push(Opcode::LoadLocal(idx));
                }
            }
            Expr::MemberAccess(_, _) => {
                let raw_name = Self::member_chain_name(node)
                    .ok_or_else(|| EmitError::MalformedMemberAccess(format!("{:?}", node)))?;
                let canonical = remap.get(&raw_name.to_lowercase()).cloned().unwrap_or(raw_name.clone());

                let dot_count = canonical.matches('.').count();
                let forced_external_not_local = FORCED_EXTERNAL.contains(&canonical.to_lowercase().as_str())
                    && !FORCED_LOCAL.contains(&canonical.as_str());

                if dot_count != 1 || forced_external_not_local {
                    let idx = Self::index_of(&mut self.global_vars, &canonical);
                    self.instructions.push(Opcode::LoadExternal(idx));
                } else {
                    // Preserve the original's double-emit: a name starting
                    // with "mascot." or in FORCED_LOCAL loads local, and a
                    // name starting with "math." or in FORCED_EXTERNAL
                    // loads external — both can fire for the same node, in
                    // which case two LOAD instructions are emitted back to
                    // back. That is a known ambiguity in the source this
                    // was ported from, not a bug to silently fix (spec §9).
                    if canonical.starts_with("mascot.") || FORCED_LOCAL.contains(&canonical.as_str()) {
                        let idx = Self::index_of(&mut self.local_vars, &canonical);
                        self.instructions.push(Opcode::LoadLocal(idx));
                    }
                    if canonical.starts_with("math.") || FORCED_EXTERNAL.contains(&canonical.as_str()) {
                        let idx = Self::index_of(&mut self.global_vars, &canonical);
                        self.instructions.push(Opcode::LoadExternal(idx));
                    }
                }
            }
            Expr::UnaryOp(op, operand) => match op {
                UnOp::Not => {
                    self.compile(operand)?;
                    self.instructions.push(Opcode::LNot);
                }
                UnOp::Neg => {
                    self.instructions.push(Opcode::Store(0.0));
                    self.compile(operand)?;
                    self.instructions.push(Opcode::Sub);
                }
                UnOp::BitNot => {
                    self.compile(operand)?;
                    self.instructions.push(Opcode::BitNot);
                }
                UnOp::Plus => {
                    self.compile(operand)?;
                }
            },
            Expr::BinaryOp(left, op, right) => {
                self.compile(left)?;
                self.compile(right)?;
                self.instructions.push(match op {
                    BinOp::Add => Opcode::Add,
                    BinOp::Sub => Opcode::Sub,
                    BinOp::Mul => Opcode::Mul,
                    BinOp::Div => Opcode::Div,
                    BinOp::Mod => Opcode::Mod,
                    BinOp::Pow => Opcode::Pow,
                    BinOp::BitAnd => Opcode::BitAnd,
                    BinOp::BitOr => Opcode::BitOr,
                    BinOp::BitXor => Opcode::BitXor,
                    BinOp::Shl => Opcode::Lshift,
                    BinOp::Shr => Opcode::Rshift,
                    BinOp::Lt => Opcode::Lt,
                    BinOp::Le => Opcode::Le,
                    BinOp::Gt => Opcode::Gt,
                    BinOp::Ge => Opcode::Ge,
                    BinOp::Eq => Opcode::Eq,
                    BinOp::Ne => Opcode::Ne,
                    BinOp::And => Opcode::LAnd,
                    BinOp::Or => Opcode::LOr,
                });
            }
            Expr::Ternary(cond, then, else_) => {
                self.compile(cond)?;
                let branch_instr = self.instructions.len();
                self.instructions.push(Opcode::Bqz(0));
                self.compile(then)?;
                let jump_instr = self.instructions.len();
                self.instructions.push(Opcode::Jmp(0));
                self.instructions[branch_instr] =
                    Opcode::Bqz((self.instructions.len() - branch_instr) as u16);
                self.compile(else_)?;
                self.instructions[jump_instr] = Opcode::Jmp((self.instructions.len() - jump_instr) as u16);
            }
            Expr::Call(callee, args) => {
                let name = Self::member_chain_name(callee).unwrap_or_else(|| format!("{:?}", callee));
                for arg in args {
                    self.compile(arg)?;
                }
                let idx = Self::index_of(&mut self.functions, &name);
                self.instructions.push(Opcode::Call(idx));
            }
        }
        Ok(())
    }
}

/// Compile a single expression string end to end: tokenize, parse (falling
/// back to a literal `0` program with a logged warning on parse failure,
/// matching the original compiler's forgiving behavior), then emit
/// bytecode. `evaluate_once` is derived from the `#{...}` wrapper.
pub fn compile(
    expression: &str,
    locals: Vec<String>,
    globals: Vec<String>,
    functions: Vec<String>,
) -> Result<Program, EmitError> {
    let prepared = crate::token::prepare(expression);
    let tokens = crate::token::tokenize(&prepared);
    let ast = match crate::parser::parse(&tokens) {
        Ok(ast) => ast,
        Err(err) => {
            log::warn!(
                "unable to compile expression {:?}: {}; assuming it always evaluates to 0",
                expression,
                err
            );
            Expr::Literal(0.0)
        }
    };
    let mut program = Program::from_ast(&ast, locals, globals, functions)?;
    program.evaluate_once = !expression.starts_with("#{");
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ast(text: &str) -> Program {
        let prepared = crate::token::prepare(text);
        let tokens = crate::token::tokenize(&prepared);
        let ast = crate::parser::parse(&tokens).unwrap();
        Program::from_ast(&ast, Vec::new(), Vec::new(), Vec::new()).unwrap()
    }

    #[test]
    fn literal_emits_store_then_ret() {
        let program = compile_ast("42");
        assert_eq!(program.instructions, vec![Opcode::Store(42.0), Opcode::Ret]);
    }

    #[test]
    fn forced_external_name_loads_from_global_table() {
        let program = compile_ast("mascot.anchor");
        assert_eq!(program.global_vars, vec!["mascot.anchor".to_string()]);
        assert!(matches!(program.instructions[0], Opcode::LoadExternal(0)));
    }

    #[test]
    fn forced_local_name_is_canonicalized_and_loads_from_local_table() {
        let program = compile_ast("x");
        assert_eq!(program.local_vars, vec!["mascot.x".to_string()]);
        assert!(matches!(program.instructions[0], Opcode::LoadLocal(0)));
    }

    #[test]
    fn math_dot_call_loads_external() {
        let program = compile_ast("math.random()");
        assert!(program.functions.contains(&"math.random".to_string()));
    }

    #[test]
    fn ternary_backpatches_branch_offsets_by_instruction_count() {
        let program = compile_ast("a ? 1 : 2");
        match program.instructions[1] {
            Opcode::Bqz(offset) => assert!(offset > 0),
            other => panic!("expected Bqz, got {:?}", other),
        }
    }

    #[test]
    fn unary_plus_is_a_no_op_in_bytecode() {
        let program = compile_ast("+1");
        assert_eq!(program.instructions, vec![Opcode::Store(1.0), Opcode::Ret]);
    }

    #[test]
    fn evaluate_once_is_false_for_hash_wrapped_expressions() {
        let program = compile("#{math.random() * 2}", Vec::new(), Vec::new(), Vec::new()).unwrap();
        assert!(!program.evaluate_once);
    }

    #[test]
    fn evaluate_once_is_true_by_default() {
        let program = compile("${1 + 1}", Vec::new(), Vec::new(), Vec::new()).unwrap();
        assert!(program.evaluate_once);
    }

    #[test]
    fn unparsable_expression_falls_back_to_literal_zero() {
        let program = compile("${(1 +}", Vec::new(), Vec::new(), Vec::new()).unwrap();
        assert_eq!(program.instructions, vec![Opcode::Store(0.0), Opcode::Ret]);
    }
}
