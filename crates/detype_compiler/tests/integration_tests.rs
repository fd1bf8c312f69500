//! Compiler integration tests.
//!
//! End-to-end runs of the full pipeline on larger and generated inputs.

use detype_compiler::{compile, CompileOptions};

fn error_count(source: &str) -> usize {
    compile(source, &CompileOptions::default())
        .errors
        .iter()
        .filter(|d| d.is_error())
        .count()
}

#[test]
fn test_compile_empty_file() {
    let result = compile("", &CompileOptions::default());
    assert!(result.success);
    assert_eq!(result.output.unwrap(), "");
}

#[test]
fn test_compile_simple_program() {
    assert_eq!(error_count("const x = 42;"), 0);
}

#[test]
fn test_compile_realistic_program() {
    let source = r#"
interface Task {
  title: string;
  done: boolean;
}

enum Priority { Low, Medium, High }

class TaskList {
  tasks: Task[] = [];

  add(task: Task): void {
    this.tasks.push(task);
  }

  count(): number {
    return this.tasks.length;
  }
}

function describe(task: Task): string {
  if (task.done) {
    return task.title + " (done)";
  } else {
    return task.title;
  }
}

const list: TaskList = new TaskList();
list.add({ title: "write tests", done: false });
let summary: string = describe({ title: "ship", done: true });
let p: number = Priority.High;
"#;
    let result = compile(source, &CompileOptions::default());
    assert!(result.success, "{:?}", result.errors);
    let output = result.output.unwrap();
    assert!(output.contains("// interface Task removed"));
    assert!(output.contains("var Priority;"));
    assert!(output.contains("class TaskList {"));
}

#[test]
fn test_compile_many_declarations() {
    let mut source = String::new();
    for i in 0..200 {
        source.push_str(&format!("const v{}: number = {};\n", i, i));
    }
    for i in 0..50 {
        source.push_str(&format!(
            "function f{}(x: number): number {{ return x + {}; }}\n",
            i, i
        ));
    }
    for i in 0..20 {
        source.push_str(&format!("interface I{} {{ p{}: string; }}\n", i, i));
    }
    assert_eq!(error_count(&source), 0);
}

#[test]
fn test_compile_nested_calls() {
    let mut source = String::from("function f(x: number): number { return x; }\nlet x = ");
    for _ in 0..20 {
        source.push_str("f(");
    }
    source.push('1');
    for _ in 0..20 {
        source.push(')');
    }
    source.push(';');
    assert_eq!(error_count(&source), 0);
}

#[test]
fn test_diagnostics_accumulate_without_aborting() {
    let source = "let a: number = \"x\";\nlet b: string = 1;\nlet c: boolean = 0;\n";
    let result = compile(source, &CompileOptions::default());
    assert!(!result.success);
    assert_eq!(result.errors.len(), 3);
}

#[test]
fn test_fatal_parse_error_yields_single_diagnostic() {
    let result = compile("function (((", &CompileOptions::default());
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
}
