use std::collections::HashMap;
use std::mem;

use memory::{BaseType, DebugSymbols, Program, Value};
use tracing::{debug, trace};
use vm::{Overload, Registry};

use crate::config::CompilerConfig;
use crate::control_flow::{ControlFlowCompiler, Guard, LabelState};
use crate::error::{CompileError, CompileErrorKind};
use crate::interner::LiteralInterner;
use crate::lexer::{tokenize, Token};
use crate::symbols::{PatchSite, SymbolTable};

/// Where an operation argument comes from.
enum Source {
    Ident(String),
    Literal(Value),
    Label(String),
}

struct Arg {
    ty: BaseType,
    source: Source,
}

/// Single-pass compiler from source lines to a [`Program`].
///
/// Lines are fed in order through [`Compiler::compile_line`]; a line either
/// fails with no effect on the symbol table or stream, or is fully applied.
/// [`Compiler::finish`] runs the end-of-input checks and hands out the
/// program.
pub struct Compiler<'r> {
    registry: &'r Registry,
    config: CompilerConfig,
    pub(crate) program: Program,
    pub(crate) symbols: SymbolTable,
    interner: LiteralInterner,
    pub(crate) labels: HashMap<String, LabelState>,
    /// Open `if` guards, outermost first
    pub(crate) guards: Vec<Guard>,
    /// The line being compiled sits under an `if`
    guarded: bool,
    params_line: Option<usize>,
    /// Line currently (or last) compiled
    pub(crate) line: usize,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry, config: CompilerConfig) -> Self {
        Self {
            registry,
            config,
            program: Program::new(),
            symbols: SymbolTable::new(),
            interner: LiteralInterner::new(),
            labels: HashMap::new(),
            guards: Vec::new(),
            guarded: false,
            params_line: None,
            line: 0,
        }
    }

    pub fn compile(mut self, source: &str) -> Result<Program, CompileError> {
        self.compile_lines(source)?;
        self.finish()
    }

    /// Like [`Compiler::compile`], also returning the identifier bindings.
    pub fn compile_with_symbols(
        mut self,
        source: &str,
    ) -> Result<(Program, DebugSymbols), CompileError> {
        self.compile_lines(source)?;
        let symbols = self.symbols.debug_symbols();
        Ok((self.finish()?, symbols))
    }

    fn compile_lines(&mut self, source: &str) -> Result<(), CompileError> {
        for (i, text) in source.lines().enumerate() {
            self.compile_line(i + 1, text)?;
        }
        Ok(())
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn compile_line(&mut self, line: usize, text: &str) -> Result<(), CompileError> {
        self.line = line;
        let at = |kind| CompileError::new(line, kind);

        if line > self.config.max_lines {
            return Err(at(CompileErrorKind::TooManyLines {
                max: self.config.max_lines,
            }));
        }
        if text.len() > self.config.max_line_len {
            return Err(at(CompileErrorKind::LineTooLong {
                len: text.len(),
                max: self.config.max_line_len,
            }));
        }

        let tokens = tokenize(text, self.registry).map_err(at)?;
        if tokens.is_empty() {
            return Ok(());
        }
        trace!(line, tokens = tokens.len(), "compiling line");

        let mut pending = mem::take(&mut self.guards);
        self.guarded = !pending.is_empty();
        let start = self.program.op_addrs.len();
        if let Err(kind) = self.statement(tokens) {
            self.guards = pending;
            return Err(at(kind));
        }
        if !self.guards.is_empty() {
            // an `if` guarding an `if`: both end after the innermost statement
            pending.append(&mut self.guards);
            self.guards = pending;
            return Ok(());
        }
        self.close_guards(pending, start).map_err(at)
    }

    /// End-of-input checks; yields the finished program.
    pub fn finish(mut self) -> Result<Program, CompileError> {
        self.check_control_flow()?;

        if let Some(id) = self.symbols.undecided().first() {
            let line = self.params_line.unwrap_or(self.line);
            return Err(CompileError::new(
                line,
                CompileErrorKind::UnresolvedType(id.to_string()),
            ));
        }
        if let Some(pos) = self.program.op_addrs.iter().position(|&w| w < 0) {
            return Err(CompileError::new(
                self.line,
                CompileErrorKind::UnresolvedType(format!("operand at offset {}", pos)),
            ));
        }

        debug!(
            words = self.program.op_addrs.len(),
            ints = self.program.ints.len(),
            strs = self.program.strs.len(),
            bools = self.program.bools.len(),
            "compilation finished"
        );
        Ok(mem::take(&mut self.program))
    }

    fn statement(&mut self, tokens: Vec<Token>) -> Result<(), CompileErrorKind> {
        if let Token::Label(name) = &tokens[0] {
            if tokens.len() > 1 {
                return Err(CompileErrorKind::MisplacedLabel(name.clone()));
            }
            if self.guarded {
                return Err(CompileErrorKind::EmptyGuard);
            }
            return self.define_label(name);
        }

        let mut ops = tokens.iter().enumerate().filter(|(_, t)| matches!(t, Token::Op(_)));
        let op_pos = ops.next().map(|(i, _)| i);
        if ops.next().is_some() {
            return Err(CompileErrorKind::MultipleOperations);
        }

        let mut assigns = tokens.iter().enumerate().filter(|(_, t)| **t == Token::Assign);
        let assign_pos = assigns.next().map(|(i, _)| i);
        if assigns.next().is_some() {
            return Err(CompileErrorKind::MalformedAssignment("more than one '='"));
        }

        let (lhs, rhs) = match assign_pos {
            Some(i) => (&tokens[..i], &tokens[i + 1..]),
            None => (&tokens[..0], &tokens[..]),
        };
        if assign_pos.is_some() && lhs.is_empty() {
            return Err(CompileErrorKind::MalformedAssignment(
                "expected one or more identifiers to the left of '='",
            ));
        }
        let mut targets = Vec::with_capacity(lhs.len());
        for token in lhs {
            match token {
                Token::Ident(id) if targets.contains(id) => {
                    return Err(CompileErrorKind::MalformedAssignment(
                        "identifier assigned twice",
                    ))
                }
                Token::Ident(id) => targets.push(id.clone()),
                Token::Op(_) => {
                    return Err(CompileErrorKind::MalformedAssignment(
                        "operation on the left of '='",
                    ))
                }
                _ => {
                    return Err(CompileErrorKind::MalformedAssignment(
                        "assignment targets must be identifiers",
                    ))
                }
            }
        }

        if let Some(i) = op_pos {
            let name = match &tokens[i] {
                Token::Op(name) => name.clone(),
                _ => unreachable!(),
            };
            let args = rhs.iter().filter(|t| !matches!(t, Token::Op(_)));
            return self.operation(&name, &targets, args);
        }

        if assign_pos.is_some() {
            if targets.len() != 1 || rhs.len() != 1 {
                return Err(CompileErrorKind::MalformedAssignment(
                    "can only assign one value to one identifier",
                ));
            }
            return self.copy(&targets[0], &rhs[0]);
        }

        if let Some(Token::Label(name)) = tokens.iter().find(|t| matches!(t, Token::Label(_))) {
            return Err(CompileErrorKind::MisplacedLabel(name.clone()));
        }
        let ids: Option<Vec<&str>> = tokens
            .iter()
            .map(|t| match t {
                Token::Ident(id) => Some(id.as_str()),
                _ => None,
            })
            .collect();
        match ids {
            Some(ids) => self.declare_params(&ids),
            None => Err(CompileErrorKind::ExpectedStatement),
        }
    }

    fn declare_params(&mut self, ids: &[&str]) -> Result<(), CompileErrorKind> {
        if self.params_line.is_some() {
            return Err(CompileErrorKind::DuplicateParams);
        }
        if self.guarded {
            return Err(CompileErrorKind::EmptyGuard);
        }
        for (i, id) in ids.iter().enumerate() {
            if self.symbols.contains(id) || ids[..i].contains(id) {
                return Err(CompileErrorKind::ParamRedeclared(id.to_string()));
            }
        }
        for id in ids {
            self.symbols.declare_param(&mut self.program, id);
        }
        self.params_line = Some(self.line);
        debug!(count = ids.len(), "input parameters declared");
        Ok(())
    }

    /// `target = source` with no operation.
    fn copy(&mut self, target: &str, source: &Token) -> Result<(), CompileErrorKind> {
        match source {
            Token::Ident(src) => self.copy_ident(target, src),
            Token::Literal(value) => self.copy_literal(target, value.clone()),
            Token::Label(name) => Err(CompileErrorKind::MisplacedLabel(name.clone())),
            Token::Op(_) | Token::Assign => Err(CompileErrorKind::ExpectedStatement),
        }
    }

    fn copy_ident(&mut self, target: &str, src: &str) -> Result<(), CompileErrorKind> {
        let (src_ty, _) = self
            .symbols
            .lookup(src)
            .ok_or_else(|| CompileErrorKind::UninitializedIdentifier(src.to_string()))?;
        let undecided = BaseType::Undecided;

        match self.symbols.lookup(target) {
            Some((target_ty, _)) if target_ty == src_ty => {}
            Some((target_ty, _)) if target_ty == undecided && src_ty.is_concrete() => {
                self.symbols.decide(&mut self.program, target, src_ty)?;
            }
            Some((target_ty, _)) if src_ty == undecided && target_ty.is_concrete() => {
                self.symbols.decide(&mut self.program, src, target_ty)?;
            }
            Some((target_ty, _)) => {
                return Err(CompileErrorKind::TypeMismatch {
                    target: target.to_string(),
                    expected: target_ty,
                    found: src_ty,
                })
            }
            None if src_ty == undecided => {
                self.symbols.declare_undecided(target);
            }
            None => {
                self.symbols.allocate(&mut self.program, target, src_ty);
            }
        }

        let (ty, src_addr) = self.symbols.lookup(src).unwrap_or((undecided, -1));
        let (_, target_addr) = self.symbols.lookup(target).unwrap_or((undecided, -1));
        let at = self.program.op_addrs.len();
        match Registry::copy_opcode(ty) {
            Some(op) => self.program.op_addrs.extend([op, src_addr, target_addr]),
            None => {
                self.symbols.link(target, src);
                self.program.op_addrs.extend([src_addr, src_addr, target_addr]);
                self.symbols.record_use(src, PatchSite::CopyOpcode(at));
                self.symbols.record_use(src, PatchSite::Operand(at + 1));
                self.symbols.record_use(target, PatchSite::Operand(at + 2));
            }
        }
        Ok(())
    }

    fn copy_literal(&mut self, target: &str, value: Value) -> Result<(), CompileErrorKind> {
        let literal_ty = value.base_type();
        let target_ty = match self.symbols.lookup(target) {
            Some((ty, _)) => ty,
            // guarded lines must emit
            None if self.guarded => {
                self.symbols.allocate(&mut self.program, target, literal_ty);
                literal_ty
            }
            None => {
                let addr = self
                    .symbols
                    .allocate_and_initialize(&mut self.program, target, value);
                trace!(id = target, ty = %literal_ty, addr, "bound literal");
                return Ok(());
            }
        };

        if target_ty == BaseType::Undecided {
            self.symbols.decide(&mut self.program, target, literal_ty)?;
        } else if target_ty != literal_ty {
            return Err(CompileErrorKind::TypeMismatch {
                target: target.to_string(),
                expected: target_ty,
                found: literal_ty,
            });
        }

        let src = self.interner.intern(&mut self.program, value);
        let (_, target_addr) = self.symbols.lookup(target).unwrap_or((target_ty, -1));
        if let Some(op) = Registry::copy_opcode(literal_ty) {
            self.program.op_addrs.extend([op, src, target_addr]);
        }
        Ok(())
    }

    fn operation<'t>(
        &mut self,
        name: &str,
        targets: &[String],
        tokens: impl Iterator<Item = &'t Token>,
    ) -> Result<(), CompileErrorKind> {
        let mut args = Vec::new();
        for token in tokens {
            let arg = match token {
                Token::Ident(id) => {
                    let (ty, _) = self
                        .symbols
                        .lookup(id)
                        .ok_or_else(|| CompileErrorKind::UninitializedIdentifier(id.clone()))?;
                    Arg {
                        ty,
                        source: Source::Ident(id.clone()),
                    }
                }
                Token::Literal(value) => Arg {
                    ty: value.base_type(),
                    source: Source::Literal(value.clone()),
                },
                Token::Label(label) => Arg {
                    ty: BaseType::Addr,
                    source: Source::Label(label.clone()),
                },
                Token::Op(_) | Token::Assign => return Err(CompileErrorKind::ExpectedStatement),
            };
            args.push(arg);
        }
        let target_types: Vec<BaseType> = targets
            .iter()
            .map(|t| self.symbols.lookup(t).map_or(BaseType::Any, |(ty, _)| ty))
            .collect();

        let registry = self.registry;
        let overloads = registry.overloads(name).unwrap_or_default();
        let Some((overload, decisions)) = overloads
            .iter()
            .find_map(|ov| self.match_overload(ov, &args, targets, &target_types))
        else {
            return Err(CompileErrorKind::NoMatchingOverload {
                op: name.to_string(),
                args: args.iter().map(|a| a.ty).collect(),
                targets: target_types,
            });
        };
        let overload = overload.clone();

        for (id, ty) in decisions {
            self.symbols.decide(&mut self.program, &id, ty)?;
        }

        let at = self.program.op_addrs.len();
        let mut words = Vec::with_capacity(1 + args.len() + targets.len() + 1);
        words.push(overload.opcode);
        for arg in args {
            let addr = match arg.source {
                Source::Ident(id) => {
                    let (ty, addr) = self.symbols.lookup(&id).unwrap_or((arg.ty, -1));
                    if ty == BaseType::Undecided {
                        self.symbols
                            .record_use(&id, PatchSite::Operand(at + words.len()));
                    }
                    addr
                }
                Source::Literal(value) => self.interner.intern(&mut self.program, value),
                Source::Label(label) => self.label_slot(&label),
            };
            words.push(addr);
        }
        for (target, &out) in targets.iter().zip(&overload.outputs) {
            let addr = match self.symbols.lookup(target) {
                Some((_, addr)) => addr,
                None => self
                    .symbols
                    .allocate(&mut self.program, target, out)
                    .unwrap_or(-1),
            };
            words.push(addr);
        }
        if overload.has_jump_slot() {
            words.push(-1);
            self.open_guard(at + words.len() - 1);
        }

        trace!(op = name, opcode = overload.opcode, at, "emit");
        self.program.op_addrs.extend(words);
        Ok(())
    }

    /// Check `ov` against the resolved arguments and targets without touching
    /// any state. On success, returns the type decisions it implies, one per
    /// undecided component.
    fn match_overload<'o>(
        &self,
        ov: &'o Overload,
        args: &[Arg],
        targets: &[String],
        target_types: &[BaseType],
    ) -> Option<(&'o Overload, Vec<(String, BaseType)>)> {
        if ov.inputs.len() != args.len() || ov.outputs.len() != targets.len() {
            return None;
        }
        let mut decisions: Vec<(String, BaseType)> = Vec::new();
        let mut decide = |id: &str, want: BaseType| -> bool {
            if !want.is_concrete() {
                return false;
            }
            let Some(root) = self.symbols.root(id) else {
                return false;
            };
            match decisions.iter().find(|(r, _)| *r == root) {
                Some((_, ty)) => *ty == want,
                None => {
                    decisions.push((root, want));
                    true
                }
            }
        };

        for (input, arg) in ov.inputs.iter().zip(args) {
            let ok = match (input, arg.ty, &arg.source) {
                (BaseType::Any | BaseType::Undecided, _, _) => true,
                (want, BaseType::Undecided, Source::Ident(id)) => decide(id, *want),
                (want, ty, _) => *want == ty,
            };
            if !ok {
                return None;
            }
        }
        for ((output, target), ty) in ov.outputs.iter().zip(targets).zip(target_types) {
            let ok = match ty {
                BaseType::Any => true,
                BaseType::Undecided => decide(target, *output),
                ty => ty == output,
            };
            if !ok {
                return None;
            }
        }
        Some((ov, decisions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::builtin().unwrap()
    }

    #[test]
    fn test_literal_into_new_target_emits_nothing() {
        let registry = registry();
        let mut c = Compiler::new(&registry, CompilerConfig::default());
        c.compile_line(1, "x = 5").unwrap();
        assert!(c.program().op_addrs.is_empty());
        assert_eq!(c.program().ints, vec![5]);
        assert_eq!(c.symbols().lookup("x"), Some((BaseType::Int, 0)));
    }

    #[test]
    fn test_literal_into_existing_target_copies_constant() {
        let registry = registry();
        let mut c = Compiler::new(&registry, CompilerConfig::default());
        c.compile_line(1, "x = 5").unwrap();
        c.compile_line(2, "x = 6").unwrap();
        c.compile_line(3, "x = 6").unwrap();
        assert_eq!(c.program().ints, vec![5, 6]);
        assert_eq!(c.program().op_addrs, vec![0, 1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_failed_line_leaves_state_untouched() {
        let registry = registry();
        let mut c = Compiler::new(&registry, CompilerConfig::default());
        c.compile_line(1, "n = 1").unwrap();
        c.compile_line(2, "m = n + 2").unwrap();
        let before = c.program().clone();
        let symbols_before = c.symbols().debug_symbols();

        let err = c.compile_line(3, "n = 'text'").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(matches!(err.kind, CompileErrorKind::TypeMismatch { .. }));

        let err = c.compile_line(4, "k = n + 'x'").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::NoMatchingOverload { .. }));

        assert_eq!(c.program(), &before);
        assert_eq!(c.symbols().debug_symbols(), symbols_before);
    }

    #[test]
    fn test_param_line_rules() {
        let registry = registry();
        let mut c = Compiler::new(&registry, CompilerConfig::default());
        c.compile_line(1, "a b").unwrap();
        assert_eq!(
            c.compile_line(2, "c").unwrap_err().kind,
            CompileErrorKind::DuplicateParams
        );

        let mut c = Compiler::new(&registry, CompilerConfig::default());
        c.compile_line(1, "x = 1").unwrap();
        assert_eq!(
            c.compile_line(2, "y x").unwrap_err().kind,
            CompileErrorKind::ParamRedeclared("x".into())
        );
        assert_eq!(
            c.compile_line(3, "y y").unwrap_err().kind,
            CompileErrorKind::ParamRedeclared("y".into())
        );
    }

    #[test]
    fn test_malformed_lines() {
        let registry = registry();
        let check = |line: &str| {
            let mut c = Compiler::new(&registry, CompilerConfig::default());
            c.compile_line(1, "a = 1").unwrap();
            c.compile_line(2, line).unwrap_err().kind
        };
        assert!(matches!(check("= 3"), CompileErrorKind::MalformedAssignment(_)));
        assert!(matches!(check("a = 1 2"), CompileErrorKind::MalformedAssignment(_)));
        assert!(matches!(check("a b = a"), CompileErrorKind::MalformedAssignment(_)));
        assert!(matches!(check("a = = 1"), CompileErrorKind::MalformedAssignment(_)));
        assert!(matches!(check("5 = a"), CompileErrorKind::MalformedAssignment(_)));
        assert_eq!(check("a = a + a - a"), CompileErrorKind::MultipleOperations);
        assert_eq!(check("b = c"), CompileErrorKind::UninitializedIdentifier("c".into()));
        assert_eq!(check("5"), CompileErrorKind::ExpectedStatement);
        assert_eq!(check("goto ~x ~y"), CompileErrorKind::NoMatchingOverload {
            op: "goto".into(),
            args: vec![BaseType::Addr, BaseType::Addr],
            targets: vec![],
        });
        assert_eq!(check("~top a"), CompileErrorKind::MisplacedLabel("top".into()));
        assert_eq!(check("a = ~top"), CompileErrorKind::MisplacedLabel("top".into()));
    }

    #[test]
    fn test_limits() {
        let registry = registry();
        let config = CompilerConfig {
            max_line_len: 8,
            max_lines: 2,
        };
        let mut c = Compiler::new(&registry, config);
        assert_eq!(
            c.compile_line(1, "abc = 12345").unwrap_err().kind,
            CompileErrorKind::LineTooLong { len: 11, max: 8 }
        );
        c.compile_line(2, "a = 1").unwrap();
        assert_eq!(
            c.compile_line(3, "").unwrap_err().kind,
            CompileErrorKind::TooManyLines { max: 2 }
        );
    }

    #[test]
    fn test_undecided_copy_is_patched() {
        let registry = registry();
        let mut c = Compiler::new(&registry, CompilerConfig::default());
        c.compile_line(1, "p").unwrap();
        c.compile_line(2, "q = p").unwrap();
        assert!(c.program().op_addrs.iter().all(|&w| w < 0));
        c.compile_line(3, "r = q + 1").unwrap();
        let program = c.finish().unwrap();
        assert_eq!(program.op_addrs[0], Registry::copy_opcode(BaseType::Int).unwrap());
        assert!(program.op_addrs.iter().all(|&w| w >= 0));
        assert_eq!(program.params[0].ty, BaseType::Int);
    }

    #[test]
    fn test_unused_param_is_unresolved() {
        let registry = registry();
        let mut c = Compiler::new(&registry, CompilerConfig::default());
        c.compile_line(1, "p").unwrap();
        c.compile_line(2, "x = 1").unwrap();
        let err = c.finish().unwrap_err();
        assert_eq!(err, CompileError::new(1, CompileErrorKind::UnresolvedType("p".into())));
    }
}
