use memory::BaseType;
use tracing::debug;

use crate::codegen::Compiler;
use crate::error::{CompileError, CompileErrorKind};

/// Symbol-table key of a label. Identifiers cannot start with `~`, so labels
/// and identifiers never collide.
pub(crate) fn label_key(name: &str) -> String {
    format!("~{}", name)
}

#[derive(Debug, Clone, Copy)]
pub struct LabelState {
    pub defined: bool,
    /// Line of the first reference or of the definition
    pub line: usize,
}

/// An `if` whose target slot is still unpatched.
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    /// Stream offset of the jump target slot
    pub slot: usize,
    pub line: usize,
}

pub trait ControlFlowCompiler {
    fn define_label(&mut self, name: &str) -> Result<(), CompileErrorKind>;
    /// Int slot holding the label's offset; creates a forward reference if
    /// the label is not known yet.
    fn label_slot(&mut self, name: &str) -> i64;

    fn open_guard(&mut self, slot: usize);
    fn close_guards(&mut self, guards: Vec<Guard>, start: usize) -> Result<(), CompileErrorKind>;

    fn check_control_flow(&mut self) -> Result<(), CompileError>;
}

impl ControlFlowCompiler for Compiler<'_> {
    fn define_label(&mut self, name: &str) -> Result<(), CompileErrorKind> {
        let key = label_key(name);
        let offset = self.program.op_addrs.len() as i64;

        match self.labels.get_mut(name) {
            Some(state) if state.defined => {
                return Err(CompileErrorKind::DuplicateLabel(name.to_string()))
            }
            Some(state) => {
                state.defined = true;
                state.line = self.line;
                if let Some((_, addr)) = self.symbols.lookup(&key) {
                    if let Some(slot) = usize::try_from(addr)
                        .ok()
                        .and_then(|i| self.program.ints.get_mut(i))
                    {
                        *slot = offset;
                    }
                }
            }
            None => {
                self.symbols.allocate(&mut self.program, &key, BaseType::Addr);
                self.labels.insert(
                    name.to_string(),
                    LabelState {
                        defined: true,
                        line: self.line,
                    },
                );
            }
        }
        debug!(label = name, offset, "label defined");
        Ok(())
    }

    fn label_slot(&mut self, name: &str) -> i64 {
        let key = label_key(name);
        if let Some((_, addr)) = self.symbols.lookup(&key) {
            return addr;
        }
        let addr = self
            .symbols
            .allocate(&mut self.program, &key, BaseType::Addr)
            .unwrap_or(-1);
        self.labels.insert(
            name.to_string(),
            LabelState {
                defined: false,
                line: self.line,
            },
        );
        debug!(label = name, "forward reference");
        addr
    }

    fn open_guard(&mut self, slot: usize) {
        self.guards.push(Guard {
            slot,
            line: self.line,
        });
    }

    /// Patch every guard in `guards` to jump past the statement that began
    /// at `start`.
    fn close_guards(&mut self, guards: Vec<Guard>, start: usize) -> Result<(), CompileErrorKind> {
        if guards.is_empty() {
            return Ok(());
        }
        let end = self.program.op_addrs.len();
        if end == start {
            return Err(CompileErrorKind::EmptyGuard);
        }
        for guard in guards {
            self.program.op_addrs[guard.slot] = end as i64;
            debug!(slot = guard.slot, target = end, "patched if");
        }
        Ok(())
    }

    fn check_control_flow(&mut self) -> Result<(), CompileError> {
        if let Some(guard) = self.guards.pop() {
            return Err(CompileError::new(guard.line, CompileErrorKind::DanglingIf));
        }
        let mut undefined: Vec<(usize, &String)> = self
            .labels
            .iter()
            .filter(|(_, state)| !state.defined)
            .map(|(name, state)| (state.line, name))
            .collect();
        undefined.sort_unstable();
        if let Some((line, name)) = undefined.first() {
            return Err(CompileError::new(
                *line,
                CompileErrorKind::UndefinedLabel(name.to_string()),
            ));
        }
        Ok(())
    }
}
