use compiler::{compile, Compiler, CompilerConfig};
use memory::{Program, Value};
use vm::{Registry, VM};

fn build(source: &str) -> (Registry, Program) {
    let registry = Registry::builtin().unwrap();
    let program = compile(source, &registry).expect("Compilation failed");
    (registry, program)
}

/// Run and return everything `print` wrote.
fn run(source: &str) -> String {
    let (registry, mut program) = build(source);
    let mut vm = VM::with_output(&registry, Vec::new());
    vm.interpret(&mut program).expect("Runtime error");
    String::from_utf8(vm.into_output()).unwrap()
}

#[test]
fn test_hello_world() {
    assert_eq!(
        run("x = 'hello'\ny = x + ' world'\nprint y"),
        "hello world\n"
    );
}

#[test]
fn test_print_each_type() {
    assert_eq!(run("print 'a b'\nprint -3\nprint True\nprint False"), "a b\n-3\ntrue\nfalse\n");
}

#[test]
fn test_countdown_loop_runs_exact_iterations() {
    let source = "\
n = 5
count = 0
~loop
  count = count + 1
  n = n - 1
  more = n > 0
  if more
  goto ~loop
print count
";
    assert_eq!(run(source), "5\n");
}

#[test]
fn test_if_false_skips_statement() {
    let source = "\
c = False
if c
print 'skipped'
print 'end'
";
    assert_eq!(run(source), "end\n");
}

#[test]
fn test_guarded_binding_keeps_zero_when_skipped() {
    assert_eq!(run("c = False\nif c\nx = 7\nprint x"), "0\n");
    assert_eq!(run("c = True\nif c\nx = 7\nprint x"), "7\n");
}

#[test]
fn test_chained_if_requires_every_condition() {
    let body = "if a\nif b\nprint 'inner'\nprint 'end'";
    let case = |a: &str, b: &str| run(&format!("a = {}\nb = {}\n{}", a, b, body));
    assert_eq!(case("False", "True"), "end\n");
    assert_eq!(case("True", "False"), "end\n");
    assert_eq!(case("False", "False"), "end\n");
    assert_eq!(case("True", "True"), "inner\nend\n");
}

#[test]
fn test_forward_goto() {
    assert_eq!(run("goto ~end\nprint 'skipped'\n~end\nprint 'done'"), "done\n");
}

#[test]
fn test_fizzbuzz_style_branching() {
    let source = "\
i = 0
~top
  i = i + 1
  r = i % 3
  fizz = r == 0
  if fizz
  print 'fizz'
  notfizz = r != 0
  if notfizz
  print i
  again = i < 4
  if again
  goto ~top
";
    assert_eq!(run(source), "1\n2\nfizz\n4\n");
}

#[test]
fn test_rerun_clone_is_deterministic() {
    let (registry, program) = build("a = 2\nb = a * 10\nc = b + a\ns = 'x'\nt = s + s");
    let mut first = program.clone();
    let mut second = program.clone();
    let mut vm = VM::with_output(&registry, Vec::new());
    vm.interpret(&mut first).unwrap();
    vm.interpret(&mut second).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.op_addrs, program.op_addrs);
}

#[test]
fn test_rerun_same_program_resets_position() {
    let (registry, mut program) = build("a = 1\nprint a");
    let mut vm = VM::with_output(&registry, Vec::new());
    vm.interpret(&mut program).unwrap();
    vm.interpret(&mut program).unwrap();
    assert_eq!(vm.output().as_slice(), b"1\n1\n");
    assert_eq!(vm.steps(), 1);
}

#[test]
fn test_params_are_bound_before_run() {
    let registry = Registry::builtin().unwrap();
    let (mut program, symbols) = Compiler::new(&registry, CompilerConfig::default())
        .compile_with_symbols("n name\ngreeting = 'hi ' + name\ndouble = n * 2\nprint greeting")
        .unwrap();

    let args = program.parse_params(&["21", "bob"]).unwrap();
    program.bind_params(&args).unwrap();

    let mut vm = VM::with_output(&registry, Vec::new());
    vm.interpret(&mut program).unwrap();
    assert_eq!(vm.output().as_slice(), b"hi bob\n");
    assert_eq!(program.read(symbols["double"]), Some(Value::Int(42)));
}

#[test]
fn test_json_roundtrip_runs_identically() {
    let (registry, program) = build("a = 3\nb = a * a\nprint b");
    let json = program.to_json().unwrap();
    let mut loaded = vm::load_json(&json, &registry).unwrap();
    let mut vm = VM::with_output(&registry, Vec::new());
    vm.interpret(&mut loaded).unwrap();
    assert_eq!(vm.output().as_slice(), b"9\n");
}

#[test]
fn test_binary_roundtrip_runs_identically() {
    let (registry, program) = build("s = 'ok'\nprint s");
    let mut bytes = Vec::new();
    vm::write_program(&mut bytes, &program).unwrap();
    let mut loaded = vm::load_executable(&mut bytes.as_slice(), &registry).unwrap();
    let mut vm = VM::with_output(&registry, Vec::new());
    vm.interpret(&mut loaded).unwrap();
    assert_eq!(vm.output().as_slice(), b"ok\n");
}
