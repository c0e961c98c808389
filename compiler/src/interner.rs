use std::collections::HashMap;

use memory::{Program, Value};

/// Constant pool for literals used as operands.
///
/// Each distinct literal value gets one read-only slot in its typed array;
/// later uses share it. Slots bound to identifiers never go through here, so
/// the VM never writes an interned slot.
pub struct LiteralInterner {
    cache: HashMap<Value, i64>,
}

impl Default for LiteralInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl LiteralInterner {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn get(&self, value: &Value) -> Option<i64> {
        self.cache.get(value).copied()
    }

    pub fn intern(&mut self, program: &mut Program, value: Value) -> i64 {
        if let Some(&addr) = self.cache.get(&value) {
            return addr;
        }
        let addr = program.alloc_value(value.clone());
        self.cache.insert(value, addr);
        addr
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
