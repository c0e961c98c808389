//! Property-based tests for deferred typing.
//!
//! Random chains of parameters copied into one another, with the deciding
//! use placed anywhere in the chain, must always compile to a stream with
//! no placeholder left and must run with every copy holding the bound value.

use compiler::{Compiler, CompilerConfig};
use memory::{BaseType, Value};
use proptest::prelude::*;
use vm::{Registry, VM};

// ============================================================================
// Helpers
// ============================================================================

const TYPES: [BaseType; 3] = [BaseType::Int, BaseType::Str, BaseType::Bool];

/// A line that fixes `id` to `ty`.
fn decider(index: usize, id: &str, ty: BaseType) -> String {
    match ty {
        BaseType::Int => format!("d{} = {} + 1", index, id),
        BaseType::Str => format!("d{} = {} + 'z'", index, id),
        _ => format!("d{} = {} && True", index, id),
    }
}

fn sample(ty: BaseType) -> Value {
    match ty {
        BaseType::Int => Value::Int(7),
        BaseType::Str => Value::Str("v".into()),
        _ => Value::Bool(true),
    }
}

/// Params `p0..`, copies `c0..` whose sources are picked from everything
/// bound before them, and one decider per param inserted before copy
/// `positions[i]`.
fn chain_source(params: usize, sources: &[usize], positions: &[usize], ty: BaseType) -> String {
    let name = |j: usize| {
        if j < params {
            format!("p{}", j)
        } else {
            format!("c{}", j - params)
        }
    };
    let mut lines = vec![(0..params).map(name).collect::<Vec<_>>().join(" ")];
    for k in 0..=sources.len() {
        for (i, &pos) in positions.iter().enumerate() {
            if pos % (sources.len() + 1) == k {
                lines.push(decider(i, &name(i), ty));
            }
        }
        if let Some(&src) = sources.get(k) {
            lines.push(format!("c{} = {}", k, name(src % (params + k))));
        }
    }
    lines.join("\n")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_copy_chains_are_fully_patched(
        params in 1usize..4,
        sources in prop::collection::vec(any::<usize>(), 0..6),
        positions in prop::collection::vec(any::<usize>(), 3),
        ty_index in 0usize..3,
    ) {
        let ty = TYPES[ty_index];
        let source = chain_source(params, &sources, &positions[..params], ty);
        let registry = Registry::builtin().unwrap();
        let (mut program, symbols) = Compiler::new(&registry, CompilerConfig::default())
            .compile_with_symbols(&source)
            .unwrap();

        prop_assert!(program.op_addrs.iter().all(|&w| w >= 0), "{}", source);
        prop_assert_eq!(program.params.len(), params);
        for param in &program.params {
            prop_assert_eq!(param.ty, ty);
        }

        let args = vec![sample(ty); params];
        program.bind_params(&args).unwrap();
        let mut vm = VM::with_output(&registry, Vec::new());
        vm.interpret(&mut program).unwrap();

        for k in 0..sources.len() {
            let slot = symbols[&format!("c{}", k)];
            prop_assert_eq!(slot.ty, ty);
            prop_assert_eq!(program.read(slot), Some(sample(ty)));
        }
    }
}
