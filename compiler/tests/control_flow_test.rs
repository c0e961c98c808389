use compiler::{compile, CompileErrorKind};
use vm::{OpCode, Registry};

#[test]
fn test_if_target_skips_guarded_line() {
    let registry = Registry::builtin().unwrap();
    let program = compile("c = True\nif c\nprint 'yes'\nprint 'after'", &registry).unwrap();
    let code = &program.op_addrs;

    assert_eq!(registry.opcode(code[0]), Some(OpCode::If));
    // if(3) + print(2): target is the start of the second print
    assert_eq!(code[2], 5);
    assert_eq!(registry.opcode(code[5]), Some(OpCode::PrintStr));
}

#[test]
fn test_if_skips_blank_and_comment_lines() {
    let registry = Registry::builtin().unwrap();
    let program = compile("c = True\nif c\n\n# note\nprint c", &registry).unwrap();
    assert_eq!(program.op_addrs[2], 5);
}

#[test]
fn test_chained_ifs_skip_the_same_statement() {
    let registry = Registry::builtin().unwrap();
    let program = compile("a = True\nif a\nif a\nprint a\nprint 'end'", &registry).unwrap();
    // if(3) + if(3) + print(2): both targets land on the second print
    assert_eq!(program.op_addrs[2], 8);
    assert_eq!(program.op_addrs[5], 8);
    assert_eq!(registry.opcode(program.op_addrs[8]), Some(OpCode::PrintStr));
}

#[test]
fn test_dangling_chained_if() {
    let registry = Registry::builtin().unwrap();
    let err = compile("c = True\nif c\nif c\n", &registry).unwrap_err();
    assert_eq!(err.line, 3);
    assert_eq!(err.kind, CompileErrorKind::DanglingIf);
}

#[test]
fn test_label_holds_following_offset() {
    let registry = Registry::builtin().unwrap();
    let (program, symbols) = compiler::Compiler::new(&registry, Default::default())
        .compile_with_symbols("i = 0\ni = i + 1\n~again\nprint i\ngoto ~again")
        .unwrap();
    let slot = symbols["~again"].addr as usize;
    assert_eq!(program.ints[slot], 4);
}

#[test]
fn test_forward_goto_is_resolved() {
    let registry = Registry::builtin().unwrap();
    let (program, symbols) = compiler::Compiler::new(&registry, Default::default())
        .compile_with_symbols("goto ~end\nprint 'skipped'\n~end\nprint 'done'")
        .unwrap();
    let slot = symbols["~end"].addr as usize;
    assert_eq!(program.ints[slot], 4);
    assert_eq!(program.op_addrs[1] as usize, slot);
}

#[test]
fn test_undefined_label() {
    let registry = Registry::builtin().unwrap();
    let err = compile("x = 1\ngoto ~nowhere", &registry).unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.kind, CompileErrorKind::UndefinedLabel("nowhere".into()));
}

#[test]
fn test_duplicate_label() {
    let registry = Registry::builtin().unwrap();
    let err = compile("~a\nprint 1\n~a", &registry).unwrap_err();
    assert_eq!(err.line, 3);
    assert_eq!(err.kind, CompileErrorKind::DuplicateLabel("a".into()));
}

#[test]
fn test_dangling_if() {
    let registry = Registry::builtin().unwrap();
    let err = compile("c = False\nif c\n\n", &registry).unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.kind, CompileErrorKind::DanglingIf);
}

#[test]
fn test_guarded_line_must_emit() {
    let registry = Registry::builtin().unwrap();
    let err = compile("c = False\nif c\np q", &registry).unwrap_err();
    assert_eq!(err.line, 3);
    assert_eq!(err.kind, CompileErrorKind::EmptyGuard);

    let err = compile("c = False\nif c\n~here\nprint c", &registry).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::EmptyGuard);
}

#[test]
fn test_guarded_literal_binding_emits_copy() {
    let registry = Registry::builtin().unwrap();
    let program = compile("c = False\nif c\nx = 5\nprint x", &registry).unwrap();
    // if(3) + copy(3)
    assert_eq!(program.op_addrs[2], 6);
    assert_eq!(registry.opcode(program.op_addrs[3]), Some(OpCode::IntCopy));
}

#[test]
fn test_if_requires_bool() {
    let registry = Registry::builtin().unwrap();
    let err = compile("n = 1\nif n\nprint n", &registry).unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, CompileErrorKind::NoMatchingOverload { .. }));
}

#[test]
fn test_goto_requires_label() {
    let registry = Registry::builtin().unwrap();
    let err = compile("n = 1\ngoto n", &registry).unwrap_err();
    assert!(matches!(err.kind, CompileErrorKind::NoMatchingOverload { .. }));
}
