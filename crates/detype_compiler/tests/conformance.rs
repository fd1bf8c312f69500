//! Conformance tests for the documented compiler behavior: the concrete
//! input/output scenarios and the pipeline-level invariants.

use detype_compiler::{compile, CompileOptions};

fn compile_default(source: &str) -> detype_compiler::CompileResult {
    compile(source, &CompileOptions::default())
}

fn output_of(source: &str) -> String {
    let result = compile_default(source);
    assert!(
        result.success,
        "expected success, got: {:?}",
        result.errors
    );
    result.output.unwrap()
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn scenario_annotated_variable() {
    assert_eq!(output_of("let x: number = 42;").trim_end(), "let x = 42;");
}

#[test]
fn scenario_annotation_mismatch() {
    let result = compile_default("let x: number = \"hello\";");
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("not assignable"));
}

#[test]
fn scenario_interface_erasure_and_structural_return() {
    let source = "interface Person { name: string; age: number; }\n\
                  function createPerson(name: string, age: number): Person { return { name: name, age: age }; }\n\
                  let alice: Person = createPerson(\"Alice\", 30);";
    let output = output_of(source);
    assert!(output.contains("// interface Person removed"));
    assert!(output.contains("function createPerson(name, age)"));
    assert!(output.contains("let alice = createPerson(\"Alice\", 30);"));
}

#[test]
fn scenario_enum_lowering() {
    let output = output_of("enum Color { Red, Green, Blue }");
    assert!(output.contains("var Color;"));
    assert!(output.contains("Color[Color[\"Red\"] = 0] = \"Red\";"));
    assert!(output.contains("Color[Color[\"Green\"] = 1] = \"Green\";"));
    assert!(output.contains("Color[Color[\"Blue\"] = 2] = \"Blue\";"));
}

#[test]
fn scenario_wrong_argument_count() {
    let result = compile_default(
        "function add(a: number, b: number): number { return a + b; }\nadd(1);",
    );
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("arguments, but got 1"));
}

#[test]
fn scenario_duplicate_declaration() {
    let result = compile_default("let x: number = 1; let x: number = 2;");
    assert!(!result.success);
    assert!(result.errors[0].message.contains("already declared"));
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn invariant_token_stream_terminates() {
    let sources = [
        "",
        "let x = 1;",
        "enum E { A, B }",
        "`template ${with} parts`;",
        "function f(a: number): void {}",
    ];
    for source in sources {
        let options = CompileOptions {
            include_tokens: true,
            skip_type_check: true,
            ..Default::default()
        };
        let result = compile(source, &options);
        let tokens = result.tokens.expect("tokens requested");
        assert!(tokens.last().unwrap().is_eof(), "source: {}", source);
        let eof_count = tokens.iter().filter(|t| t.is_eof()).count();
        assert_eq!(eof_count, 1, "source: {}", source);
    }
}

#[test]
fn invariant_output_reparses() {
    let sources = [
        "let x: number = 42;",
        "function add(a: number, b: number): number { return a + b; }",
        "enum Color { Red, Green = 10, Blue, Name = \"n\" }",
        "class Point { x: number = 0; y: number = 0; constructor(x: number) { this.x = x; } len(): number { return this.x; } }",
        "if (1) { foo(); } else if (2) { bar(); } else { baz(); }",
        "for (let i = 0; i < 10; i++) { i; }",
        "for (const x of [1, 2]) { x; }",
        "switch (x) { case 1: a(); break; default: b(); }",
        "try { risky(); } catch (e) { log(e); } finally { done(); }",
        "let s = `a${1 + 2}b`;",
        "let f = (a: number, b: number): number => a + b;",
        "abstract class S { abstract area(r: number): number; }",
        "import { a, b as c } from \"mod\";\nexport { a };",
    ];
    let skip = CompileOptions {
        skip_type_check: true,
        ..Default::default()
    };
    for source in sources {
        let first = compile(source, &skip);
        assert!(first.success, "source failed to compile: {}", source);
        let output = first.output.unwrap();
        let second = compile(&output, &skip);
        assert!(
            second.success,
            "emitted output failed to reparse: {}\n---\n{}",
            source, output
        );
    }
}

#[test]
fn invariant_erasure_preserves_value_expressions() {
    // Stripping annotations from declarations leaves identical output.
    let annotated = "let x: number = 1 + 2 * 3;\nfunction f(a: number, b: string): void { a; b; }";
    let bare = "let x = 1 + 2 * 3;\nfunction f(a, b) { a; b; }";
    let skip = CompileOptions {
        skip_type_check: true,
        ..Default::default()
    };
    assert_eq!(
        compile(annotated, &skip).output.unwrap(),
        compile(bare, &skip).output.unwrap()
    );
}

#[test]
fn invariant_enum_lowering_is_self_consistent() {
    let output = output_of("enum E { A, B = 7, C, S = \"s\" }");
    // Numeric members produce the reverse mapping; string members do not.
    assert!(output.contains("E[E[\"A\"] = 0] = \"A\";"));
    assert!(output.contains("E[E[\"B\"] = 7] = \"B\";"));
    assert!(output.contains("E[E[\"C\"] = 8] = \"C\";"));
    assert!(output.contains("E[\"S\"] = \"s\";"));
    assert!(!output.contains("E[E[\"S\"]"));
}

#[test]
fn invariant_diagnostics_in_line_order() {
    let source = "let a: number = \"x\";\nunknown;\nlet b: string = 3;";
    let result = compile_default(source);
    assert!(!result.success);
    assert!(result.errors.len() >= 2);
    let lines: Vec<u32> = result.errors.iter().map(|d| d.line).collect();
    assert!(lines.windows(2).all(|w| w[0] <= w[1]), "{:?}", lines);
}

#[test]
fn invariant_skip_type_check_always_succeeds_on_parsable_input() {
    let sources = [
        "let x: number = \"not a number\";",
        "unknownName(1, 2);",
        "let a: number = 1; let a: number = 2;",
    ];
    for source in sources {
        let result = compile(
            source,
            &CompileOptions {
                skip_type_check: true,
                ..Default::default()
            },
        );
        assert!(result.success, "source: {}", source);
        assert!(result.errors.is_empty());
    }
}

#[test]
fn invariant_structural_self_assignment() {
    let source = "interface Box { items: number[]; tag: string; }\n\
                  let a: Box = { items: [1, 2], tag: \"b\" };\n\
                  let b: Box = a;";
    assert!(compile_default(source).success);
}

#[test]
fn warnings_do_not_fail_compilation() {
    let result = compile_default("const enum Level { Low }\nlet l = Level.Low;");
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.errors.len(), 1);
    assert!(!result.errors[0].is_error());
    assert!(result.output.unwrap().contains("// const enum Level - inlined"));
}
