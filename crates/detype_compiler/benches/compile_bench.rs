//! End-to-end compilation benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use detype_compiler::{compile, CompileOptions};

const SMALL_PROGRAM: &str = r#"
interface Point { x: number; y: number; }
function dot(a: Point, b: Point): number {
  return a.x * b.x + a.y * b.y;
}
let p: Point = { x: 1, y: 2 };
let q: Point = { x: 3, y: 4 };
let d: number = dot(p, q);
"#;

fn large_program() -> String {
    let mut source = String::new();
    for i in 0..300 {
        source.push_str(&format!(
            "function f{}(a: number, b: number): number {{ return a * b + {}; }}\n",
            i, i
        ));
        source.push_str(&format!("let r{}: number = f{}({}, {});\n", i, i, i, i + 1));
    }
    source
}

fn bench_compile(c: &mut Criterion) {
    let options = CompileOptions::default();
    c.bench_function("compile_small", |b| {
        b.iter(|| compile(black_box(SMALL_PROGRAM), &options))
    });

    let large = large_program();
    c.bench_function("compile_large", |b| {
        b.iter(|| compile(black_box(&large), &options))
    });

    let skip = CompileOptions {
        skip_type_check: true,
        ..Default::default()
    };
    c.bench_function("compile_large_skip_check", |b| {
        b.iter(|| compile(black_box(&large), &skip))
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
