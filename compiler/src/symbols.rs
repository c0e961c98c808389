//! Symbol table and deferred type resolution.
//!
//! An identifier may be bound before its type is known (input parameters, and
//! copies of them). Such a binding gets a negative placeholder address, and
//! every stream slot that mentions it is recorded as a patch site. Once a use
//! fixes the type, [`SymbolTable::decide`] allocates real storage and rewrites
//! those sites. Identifiers copied into one another are linked: a copy needs
//! both sides to share one type, so deciding one decides its whole component.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use memory::{BaseType, DebugSymbols, Param, Program, Slot, Value};
use tracing::debug;
use vm::Registry;

use crate::error::CompileErrorKind;

/// A stream slot waiting on an undecided identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSite {
    /// Operand slot: receives the real address.
    Operand(usize),
    /// Opcode slot of a copy: receives the typed copy opcode.
    CopyOpcode(usize),
}

#[derive(Debug, Clone)]
struct Entry {
    ty: BaseType,
    addr: i64,
    sites: Vec<PatchSite>,
    links: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: HashMap<String, Entry>,
    next_placeholder: i64,
    /// Identifier → parameter position
    params: HashMap<String, usize>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_placeholder: -1,
            params: HashMap::new(),
        }
    }

    /// Type and address of `id`, if bound.
    pub fn lookup(&self, id: &str) -> Option<(BaseType, i64)> {
        self.entries.get(id).map(|e| (e.ty, e.addr))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn bind(&mut self, id: &str, ty: BaseType, addr: i64) {
        self.entries.insert(
            id.to_string(),
            Entry {
                ty,
                addr,
                sites: Vec::new(),
                links: BTreeSet::new(),
            },
        );
    }

    /// Bind `id` to a fresh zero-valued slot of type `ty`. An `Addr` slot is
    /// an int holding the current stream offset.
    ///
    /// Returns `None` for types without storage.
    pub fn allocate(&mut self, program: &mut Program, id: &str, ty: BaseType) -> Option<i64> {
        let addr = match ty {
            BaseType::Addr => program.alloc_int(program.op_addrs.len() as i64).raw(),
            _ => program.alloc_default(ty)?,
        };
        self.bind(id, ty, addr);
        Some(addr)
    }

    /// Bind `id` to a fresh slot holding `value`.
    pub fn allocate_and_initialize(&mut self, program: &mut Program, id: &str, value: Value) -> i64 {
        let ty = value.base_type();
        let addr = program.alloc_value(value);
        self.bind(id, ty, addr);
        addr
    }

    /// Bind `id` with an undecided type and a fresh placeholder address.
    pub fn declare_undecided(&mut self, id: &str) -> i64 {
        let addr = self.next_placeholder;
        self.next_placeholder -= 1;
        self.bind(id, BaseType::Undecided, addr);
        addr
    }

    /// Declare `id` as the next input parameter.
    pub fn declare_param(&mut self, program: &mut Program, id: &str) -> i64 {
        let addr = self.declare_undecided(id);
        let position = program.params.len();
        program.params.push(Param {
            position,
            ty: BaseType::Undecided,
            address: addr,
        });
        self.params.insert(id.to_string(), position);
        addr
    }

    pub fn record_use(&mut self, id: &str, site: PatchSite) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.sites.push(site);
        }
    }

    pub fn link(&mut self, a: &str, b: &str) {
        if a == b || !self.contains(a) || !self.contains(b) {
            return;
        }
        if let Some(entry) = self.entries.get_mut(a) {
            entry.links.insert(b.to_string());
        }
        if let Some(entry) = self.entries.get_mut(b) {
            entry.links.insert(a.to_string());
        }
    }

    /// Every undecided identifier reachable from `id` through links, `id`
    /// included, in name order.
    pub fn component(&self, id: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([id.to_string()]);
        while let Some(next) = queue.pop_front() {
            let Some(entry) = self.entries.get(&next) else {
                continue;
            };
            if entry.ty != BaseType::Undecided || !seen.insert(next) {
                continue;
            }
            queue.extend(entry.links.iter().cloned());
        }
        seen.into_iter().collect()
    }

    /// Canonical member of `id`'s undecided component.
    pub fn root(&self, id: &str) -> Option<String> {
        self.component(id).into_iter().next()
    }

    /// Fix the type of `id` and of everything linked to it, allocating real
    /// storage and patching every recorded site.
    pub fn decide(
        &mut self,
        program: &mut Program,
        id: &str,
        ty: BaseType,
    ) -> Result<(), CompileErrorKind> {
        let current = self
            .lookup(id)
            .map(|(t, _)| t)
            .ok_or_else(|| CompileErrorKind::UninitializedIdentifier(id.to_string()))?;
        if current == ty {
            return Ok(());
        }
        if current != BaseType::Undecided || !ty.is_concrete() {
            return Err(CompileErrorKind::TypeMismatch {
                target: id.to_string(),
                expected: current,
                found: ty,
            });
        }

        for name in self.component(id) {
            let Some(addr) = program.alloc_default(ty) else {
                continue;
            };
            let Some(entry) = self.entries.get_mut(&name) else {
                continue;
            };
            entry.ty = ty;
            entry.addr = addr;
            entry.links.clear();
            for site in entry.sites.drain(..) {
                match site {
                    PatchSite::Operand(at) => program.op_addrs[at] = addr,
                    PatchSite::CopyOpcode(at) => {
                        if let Some(op) = Registry::copy_opcode(ty) {
                            program.op_addrs[at] = op;
                        }
                    }
                }
            }
            if let Some(&position) = self.params.get(&name) {
                program.params[position].ty = ty;
                program.params[position].address = addr;
            }
            debug!(id = %name, ty = %ty, addr, "decided type");
        }
        Ok(())
    }

    /// Identifiers whose type was never decided, in name order.
    pub fn undecided(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, e)| e.ty == BaseType::Undecided)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn debug_symbols(&self) -> DebugSymbols {
        self.entries
            .iter()
            .map(|(name, e)| {
                (
                    name.clone(),
                    Slot {
                        ty: e.ty,
                        addr: e.addr,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_decrease() {
        let mut table = SymbolTable::new();
        assert_eq!(table.declare_undecided("a"), -1);
        assert_eq!(table.declare_undecided("b"), -2);
        assert_eq!(table.lookup("a"), Some((BaseType::Undecided, -1)));
    }

    #[test]
    fn test_allocate_addr_holds_offset() {
        let mut program = Program::new();
        program.op_addrs = vec![0, 0, 0];
        let mut table = SymbolTable::new();
        let addr = table.allocate(&mut program, "~top", BaseType::Addr).unwrap();
        assert_eq!(program.ints[addr as usize], 3);
        assert_eq!(table.allocate(&mut program, "x", BaseType::Any), None);
    }

    #[test]
    fn test_decide_patches_sites_and_param() {
        let mut program = Program::new();
        let mut table = SymbolTable::new();
        let placeholder = table.declare_param(&mut program, "n");
        program.op_addrs = vec![placeholder, placeholder, 7];
        table.record_use("n", PatchSite::CopyOpcode(0));
        table.record_use("n", PatchSite::Operand(1));

        table.decide(&mut program, "n", BaseType::Str).unwrap();
        assert_eq!(program.op_addrs, vec![Registry::copy_opcode(BaseType::Str).unwrap(), 0, 7]);
        assert_eq!(program.params[0].ty, BaseType::Str);
        assert_eq!(program.params[0].address, 0);
        assert_eq!(table.lookup("n"), Some((BaseType::Str, 0)));
    }

    #[test]
    fn test_decide_propagates_over_links() {
        let mut program = Program::new();
        let mut table = SymbolTable::new();
        table.declare_undecided("a");
        table.declare_undecided("b");
        table.declare_undecided("c");
        table.link("a", "b");
        table.link("b", "c");
        assert_eq!(table.component("c"), vec!["a", "b", "c"]);
        assert_eq!(table.root("c").as_deref(), Some("a"));

        table.decide(&mut program, "c", BaseType::Int).unwrap();
        assert!(table.undecided().is_empty());
        assert_eq!(program.ints.len(), 3);
        for id in ["a", "b", "c"] {
            assert_eq!(table.lookup(id).map(|(t, _)| t), Some(BaseType::Int));
        }
    }

    #[test]
    fn test_decide_rejects_conflicts() {
        let mut program = Program::new();
        let mut table = SymbolTable::new();
        table.allocate(&mut program, "x", BaseType::Int);
        assert!(table.decide(&mut program, "x", BaseType::Int).is_ok());
        assert!(matches!(
            table.decide(&mut program, "x", BaseType::Bool),
            Err(CompileErrorKind::TypeMismatch { .. })
        ));
        table.declare_undecided("u");
        assert!(table.decide(&mut program, "u", BaseType::Addr).is_err());
    }
}
