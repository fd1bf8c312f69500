//! Checker integration tests.
//!
//! Runs the full lex -> parse -> check pipeline and verifies diagnostics.

use bumpalo::Bump;
use detype_checker::{check, Checker, CheckerOptions};
use detype_lexer::tokenize;
use detype_parser::parse;

/// Helper: run the pipeline and return the diagnostic messages in order.
fn check_source(source: &str) -> Vec<String> {
    let arena = Bump::new();
    let tokens = tokenize(source).expect("lex error in test source");
    let program = parse(&arena, tokens).expect("parse error in test source");
    check(&program).into_iter().map(|d| d.message).collect()
}

fn diagnostic_count(source: &str) -> usize {
    check_source(source).len()
}

// ============================================================================
// Valid code
// ============================================================================

#[test]
fn test_valid_variable_declarations() {
    assert_eq!(diagnostic_count("let x: number = 42;"), 0);
    assert_eq!(diagnostic_count("const s: string = \"hi\";"), 0);
    assert_eq!(diagnostic_count("let b: boolean = true;"), 0);
    assert_eq!(diagnostic_count("let u = undefined;"), 0);
}

#[test]
fn test_valid_function_declaration() {
    assert_eq!(
        diagnostic_count("function add(a: number, b: number): number { return a + b; }"),
        0
    );
}

#[test]
fn test_valid_interface_and_object_literal() {
    let src = r#"
interface Person { name: string; age: number; }
let alice: Person = { name: "Alice", age: 30 };
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_valid_type_alias() {
    assert_eq!(
        diagnostic_count("type Name = string;\nlet n: Name = \"x\";"),
        0
    );
}

#[test]
fn test_valid_enum() {
    assert_eq!(
        diagnostic_count("enum Color { Red, Green, Blue }\nlet c: number = Color.Red;"),
        0
    );
}

#[test]
fn test_valid_class_with_inheritance() {
    let src = r#"
class Animal {
  name: string;
  constructor(name: string) {
    this.name = name;
  }
  speak(): string {
    return this.name;
  }
}
class Dog extends Animal {
  bark(): string {
    return "woof";
  }
}
let d: Dog = new Dog("Rex");
d.speak();
d.bark();
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_class_satisfies_interface_structurally() {
    let src = r#"
interface Shape { area(): number; }
class Circle {
  radius: number;
  constructor(radius: number) {
    this.radius = radius;
  }
  area(): number {
    return 3.14 * this.radius * this.radius;
  }
}
const s: Shape = new Circle(2);
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_forward_reference_between_declarations() {
    // The two-pass collection makes call-before-declaration work.
    let src = r#"
let r: number = twice(4);
function twice(n: number): number { return n * 2; }
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_for_of_element_type() {
    let src = r#"
let total: number = 0;
for (const n of [1, 2, 3]) {
  total = total + n;
}
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_for_in_key_is_string() {
    let src = r#"
let keys: string = "";
for (const k in { a: 1 }) {
  keys = keys + k;
}
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_string_flows_into_string_literal_union() {
    let src = r#"
type Direction = "up" | "down";
function go(d: Direction): void {}
let anywhere: string = "left";
go(anywhere);
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_optional_parameters_and_rest() {
    let src = r#"
function greet(name: string, punctuation?: string): string { return name; }
greet("a");
greet("a", "!");
function gather(first: number, ...rest: number[]): number { return first; }
gather(1);
gather(1, 2, 3, 4);
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_array_methods_and_length() {
    let src = r#"
let xs: number[] = [1, 2, 3];
let n: number = xs.length;
xs.push(4);
let s: string = "hello";
let m: number = s.length;
s.toUpperCase();
"#;
    assert_eq!(diagnostic_count(src), 0);
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_type_mismatch_on_declaration() {
    let messages = check_source("let x: number = \"hello\";");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("not assignable"), "{}", messages[0]);
}

#[test]
fn test_duplicate_declaration() {
    let messages = check_source("let x: number = 1; let x: number = 2;");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("already declared"), "{}", messages[0]);
}

#[test]
fn test_cannot_find_name() {
    let messages = check_source("mystery;");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Cannot find name 'mystery'"));
}

#[test]
fn test_too_few_arguments() {
    let messages =
        check_source("function add(a: number, b: number): number { return a + b; }\nadd(1);");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("arguments, but got 1"), "{}", messages[0]);
    assert!(messages[0].contains("at least 2"));
}

#[test]
fn test_too_many_arguments() {
    let messages = check_source("function one(a: number): void {}\none(1, 2, 3);");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("at most 1"), "{}", messages[0]);
    assert!(messages[0].contains("but got 3"));
}

#[test]
fn test_argument_type_mismatch() {
    let messages = check_source("function f(n: number): void {}\nf(\"no\");");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Argument of type"), "{}", messages[0]);
}

#[test]
fn test_missing_interface_member() {
    let src = r#"
interface Person { name: string; age: number; }
let p: Person = { name: "solo" };
"#;
    let messages = check_source(src);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("not assignable"));
}

#[test]
fn test_arithmetic_operand_not_number() {
    let messages = check_source("let x = \"a\" - 1;");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("arithmetic"), "{}", messages[0]);
}

#[test]
fn test_plus_concatenates_strings() {
    assert_eq!(diagnostic_count("let s = \"a\" + 1;"), 0);
    assert_eq!(diagnostic_count("let n = 1 + 2;"), 0);
}

#[test]
fn test_return_outside_function() {
    let messages = check_source("return 1;");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("'return' statement"), "{}", messages[0]);
}

#[test]
fn test_return_type_mismatch() {
    let messages = check_source("function f(): number { return \"no\"; }");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("not assignable"));
}

#[test]
fn test_update_on_non_number() {
    let messages = check_source("let s = \"a\"; s++;");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("increment or decrement"), "{}", messages[0]);
}

#[test]
fn test_member_does_not_exist() {
    let src = r#"
interface Point { x: number; y: number; }
let p: Point = { x: 1, y: 2 };
p.z;
"#;
    let messages = check_source(src);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Property 'z' does not exist"));
}

#[test]
fn test_assign_to_const() {
    let messages = check_source("const c = 1; c = 2;");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("constant"), "{}", messages[0]);
}

#[test]
fn test_assign_to_readonly_member() {
    let src = r#"
interface Config { readonly port: number; }
let cfg: Config = { port: 80 };
cfg.port = 8080;
"#;
    let messages = check_source(src);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("read-only"), "{}", messages[0]);
}

#[test]
fn test_not_callable() {
    let messages = check_source("let n = 1; n();");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("not callable"), "{}", messages[0]);
}

#[test]
fn test_const_enum_member_access_warns() {
    let messages = check_source("const enum Level { Low, High }\nlet l = Level.Low;");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("not inlined"), "{}", messages[0]);
}

// ============================================================================
// Scope discipline
// ============================================================================

#[test]
fn test_block_scoping() {
    let src = r#"
let x: number = 1;
{
  let x: string = "shadowed";
}
"#;
    assert_eq!(diagnostic_count(src), 0);
}

#[test]
fn test_function_bodies_reparent_to_global_scope() {
    // The historical behavior: inner function bodies see the global scope,
    // not the enclosing function's locals.
    let src = r#"
function outer(): void {
  let local: number = 1;
  function inner(): number { return local; }
}
"#;
    let messages = check_source(src);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Cannot find name 'local'"));
}

#[test]
fn test_lexical_function_scopes_option() {
    let src = r#"
function outer(): void {
  let local: number = 1;
  function inner(): number { return local; }
}
"#;
    let arena = Bump::new();
    let tokens = tokenize(src).unwrap();
    let program = parse(&arena, tokens).unwrap();
    let mut checker = Checker::new(CheckerOptions {
        lexical_function_scopes: true,
    });
    checker.check_program(&program);
    assert_eq!(checker.into_diagnostics().len(), 0);
}

#[test]
fn test_catch_parameter_is_scoped() {
    let src = r#"
try {
  throw "boom";
} catch (e) {
  e;
}
"#;
    assert_eq!(diagnostic_count(src), 0);
}

// ============================================================================
// Assignability
// ============================================================================

#[test]
fn test_assignability_is_reflexive() {
    // Every type the checker produced while checking a representative
    // program is assignable to itself.
    let src = r#"
interface Person { name: string; friends: Person[]; }
enum Color { Red, Green }
type Mixed = string | number | [boolean, Person];
class Node { value: number = 0; next(): Node { return this; } }
let f = (p: Person): string => p.name;
let xs = [1, "two", true];
"#;
    let arena = Bump::new();
    let tokens = tokenize(src).unwrap();
    let program = parse(&arena, tokens).unwrap();
    let mut checker = Checker::new(CheckerOptions::default());
    checker.check_program(&program);
    for i in 0..checker.type_table.len() {
        let id = detype_ast::types::TypeId(i as u32);
        assert!(
            checker.is_assignable(id, id),
            "type {} is not assignable to itself",
            checker.type_to_string(id)
        );
    }
}

// ============================================================================
// Diagnostic ordering
// ============================================================================

#[test]
fn test_diagnostics_in_line_order() {
    let src = "let a: number = \"one\";\nlet b: number = \"two\";\nlet c: number = \"three\";\n";
    let arena = Bump::new();
    let tokens = tokenize(src).unwrap();
    let program = parse(&arena, tokens).unwrap();
    let diagnostics = check(&program);
    assert_eq!(diagnostics.len(), 3);
    let lines: Vec<u32> = diagnostics.iter().map(|d| d.line).collect();
    assert!(lines.windows(2).all(|w| w[0] <= w[1]), "{:?}", lines);
}
