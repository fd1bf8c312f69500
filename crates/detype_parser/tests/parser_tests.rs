//! Parser integration tests.
//!
//! Verifies statement dispatch, the expression precedence ladder, the type
//! grammar, and the three speculation points.

use bumpalo::Bump;
use detype_ast::node::*;
use detype_lexer::tokenize;
use detype_parser::parse;

/// Helper: parse and return the number of top-level statements.
fn statement_count(source: &str) -> usize {
    let arena = Bump::new();
    let tokens = tokenize(source).expect("lex error in test source");
    let program = parse(&arena, tokens).expect("parse error in test source");
    program.statements.len()
}

fn parse_ok(source: &str) {
    statement_count(source);
}

fn parse_fails(source: &str) {
    let arena = Bump::new();
    let tokens = tokenize(source).expect("lex error in test source");
    assert!(
        parse(&arena, tokens).is_err(),
        "expected parse failure: {}",
        source
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_variable_statements() {
    assert_eq!(statement_count("var a = 1; let b = 2; const c = 3;"), 3);
    parse_ok("let x: number;");
    parse_ok("let m: Map<string, number> = make();");
}

#[test]
fn test_function_declarations() {
    parse_ok("function f() {}");
    parse_ok("function f(a: number, b?: string, ...rest: number[]): void {}");
    parse_ok("function id<T>(x: T): T { return x; }");
    parse_ok("async function g(): void { await f(); }");
    parse_ok("function* gen(): number { yield 1; yield* other(); }");
}

#[test]
fn test_interface_declarations() {
    parse_ok("interface Empty {}");
    parse_ok("interface P { x: number; y?: string; readonly z: boolean; }");
    parse_ok("interface F { call(a: number): string; }");
    parse_ok("interface D { [key: string]: number; }");
    parse_ok("interface E extends A, B { own: number; }");
}

#[test]
fn test_type_alias_declarations() {
    parse_ok("type N = number;");
    parse_ok("type Pair = [number, string];");
    parse_ok("type Cb = (a: number, b: string) => void;");
    parse_ok("type U = string | number | boolean;");
    parse_ok("type I = A & B;");
    parse_ok("type L = \"on\" | \"off\" | 1 | true;");
    parse_ok("type Cond<T> = T extends string ? number : boolean;");
    parse_ok("type El = Items[number];");
    parse_ok("type K = keyof Shape;");
    parse_ok("type Q = typeof globalThing;");
    parse_ok("type M<T> = { [K in T]?: number };");
    parse_ok("type R<T> = T extends Array<infer E> ? E : never;");
}

#[test]
fn test_class_declarations() {
    parse_ok("class Empty {}");
    parse_ok("class C { x: number = 1; static y: string; constructor(a: number) {} m(): void {} }");
    parse_ok("class D extends Base implements I1, I2 { private secret: number; protected p(): void {} }");
    parse_ok("abstract class S { abstract area(): number; }");
    parse_ok("class G<T> extends Box<T> { static make(): void {} }");
    parse_ok("class A { async fetch(): void {} }");
}

#[test]
fn test_enum_declarations() {
    parse_ok("enum E { A, B, C }");
    parse_ok("enum E { A = 1, B = 2 }");
    parse_ok("enum E { A = \"a\", B = \"b\" }");
    parse_ok("const enum E { A }");
}

#[test]
fn test_control_flow_statements() {
    parse_ok("if (a) b(); else c();");
    parse_ok("while (ready()) { step(); }");
    parse_ok("do { step(); } while (more());");
    parse_ok("for (let i = 0; i < 10; i++) { use(i); }");
    parse_ok("for (;;) { break; }");
    parse_ok("for (const x of items) { use(x); }");
    parse_ok("for (const k in table) { use(k); }");
    parse_ok("switch (x) { case 1: a(); break; case 2: b(); break; default: c(); }");
    parse_ok("try { risky(); } catch (e) { log(e); } finally { done(); }");
    parse_ok("try { risky(); } catch { recover(); }");
    parse_ok("throw new Error(\"boom\");");
}

#[test]
fn test_import_export_forms() {
    parse_ok("import \"side-effect\";");
    parse_ok("import def from \"mod\";");
    parse_ok("import * as ns from \"mod\";");
    parse_ok("import { a, b as c } from \"mod\";");
    parse_ok("import def, { a } from \"mod\";");
    parse_ok("export const x = 1;");
    parse_ok("export function f(): void {}");
    parse_ok("export interface I { a: number; }");
    parse_ok("export { a, b as c };");
    parse_ok("export default compute();");
}

#[test]
fn test_decorators_only_before_classes() {
    parse_ok("@sealed class C {}");
    parse_ok("@injectable()\n@scoped\nclass S {}");
    parse_ok("@dec export class E {}");
    parse_ok("class M { @logged m(): void {} @tracked p: number = 1; }");
    parse_fails("@dec let x = 1;");
    parse_fails("@dec function f() {}");
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_precedence_ladder_parses() {
    parse_ok("x = a ? b : c;");
    parse_ok("let v = a ?? b || c && d | e ^ f & g;");
    parse_ok("let w = a === b !== c < d >> e + f * g ** h;");
    parse_ok("let u = !a + -b - ~c;");
    parse_ok("let t = typeof a + delete b.c;");
    parse_ok("let p = a++ + --b;");
    parse_ok("let q = a instanceof B && \"k\" in c;");
}

#[test]
fn test_exponentiation_is_right_associative() {
    let arena = Bump::new();
    let tokens = tokenize("let x = 2 ** 3 ** 4;").unwrap();
    let program = parse(&arena, tokens).unwrap();
    let Statement::Variable(decl) = &program.statements[0] else {
        panic!("expected variable statement");
    };
    let Some(Expression::Binary(outer)) = decl.initializer else {
        panic!("expected binary initializer");
    };
    // 2 ** (3 ** 4): the right operand is itself a `**` node.
    assert!(matches!(outer.left, Expression::NumericLiteral(_)));
    assert!(matches!(outer.right, Expression::Binary(_)));
}

#[test]
fn test_call_member_chains() {
    parse_ok("a.b.c();");
    parse_ok("a[0][key];");
    parse_ok("a?.b?.[0]?.();");
    parse_ok("obj.method(1, 2)(3).field;");
    parse_ok("new Foo(1).bar();");
    parse_ok("new ns.Type();");
    parse_ok("f(...args, 1);");
}

#[test]
fn test_literals_and_builders() {
    parse_ok("let o = { a: 1, \"b c\": 2, d };");
    parse_ok("let a = [1, \"two\", [3], ...rest];");
    parse_ok("let t = `sum: ${a + b}!`;");
    parse_ok("let tagged = html`<p>${name}</p>`;");
    parse_ok("let big = 10n;");
    parse_ok("let f = function named(a: number): number { return a; };");
    parse_ok("let c = class Inner extends Base {};");
}

#[test]
fn test_arrow_functions() {
    parse_ok("let f = x => x + 1;");
    parse_ok("let g = (a, b) => a + b;");
    parse_ok("let h = (a: number, b: number): number => a * b;");
    parse_ok("let k = () => { return 1; };");
    parse_ok("let m = async x => await x;");
    parse_ok("let n = async (a, b) => a;");
}

#[test]
fn test_arrow_vs_parenthesized_ambiguity() {
    // Both interpretations of a leading `(` must resolve.
    parse_ok("let a = (x);");
    parse_ok("let b = (x) => x;");
    parse_ok("let c = (x + y) * z;");
    parse_ok("let d = (a = 1) => a;");
    parse_ok("let e = ({ k: 1 });");
}

#[test]
fn test_type_arguments_vs_comparison_ambiguity() {
    parse_ok("pick<number>(xs);");
    parse_ok("let cmp = a < b;");
    parse_ok("let chain = a < b > c;");
    parse_ok("make<Map<string, number>>(0);");
    parse_ok("let assertion = <string>value;");
}

#[test]
fn test_assignment_operators() {
    parse_ok("a = 1; a += 1; a -= 1; a *= 2; a /= 2; a %= 2; a **= 2;");
    parse_ok("a <<= 1; a >>= 1; a >>>= 1; a &= 1; a |= 1; a ^= 1;");
    parse_ok("a &&= b; a ||= b; a ??= b;");
}

#[test]
fn test_as_and_non_null_postfix() {
    parse_ok("let a = value as string;");
    parse_ok("let b = maybe!;");
    parse_ok("let c = (value as Item[])[0]!;");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_semicolon_is_an_error() {
    parse_fails("foo()");
    parse_fails("let x = 1 let y = 2;");
}

#[test]
fn test_unbalanced_constructs_fail() {
    parse_fails("function f( {}");
    parse_fails("if (x { }");
    parse_fails("class C extends { }");
    parse_fails("let x = ;");
}

#[test]
fn test_error_carries_line_and_lexeme() {
    let arena = Bump::new();
    let tokens = tokenize("let ok = 1;\nlet = 2;").unwrap();
    let error = parse(&arena, tokens).unwrap_err();
    let message = error.to_string();
    assert!(message.contains("line 2"), "{}", message);
    assert!(message.contains("'='"), "{}", message);
}
