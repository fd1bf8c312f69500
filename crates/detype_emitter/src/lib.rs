//! detype_emitter: Tree to output text.
//!
//! A deterministic printer that erases the type surface (annotations,
//! generic parameters, `implements` clauses, assertions) and lowers
//! enumerations to their runtime object shape. Interface and type-alias
//! declarations leave a one-line comment carrying the name; everything
//! executable is preserved. Statements inside blocks print one per line
//! with two-space indentation, and `else if` chains stay on the closing
//! brace's line.

use detype_ast::node::*;
use detype_ast::types::ModifierFlags;
use detype_ast::TokenKind;

/// Options for the emitter.
pub struct EmitterOptions {
    /// Indentation unit.
    pub indent: String,
    /// Line terminator.
    pub newline: String,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            newline: "\n".to_string(),
        }
    }
}

/// Emit a program with default options.
pub fn emit(program: &Program<'_>) -> String {
    Emitter::new().emit_program(program)
}

/// The emitter serializes a tree to the output dialect.
pub struct Emitter {
    output: String,
    indent_level: u32,
    options: EmitterOptions,
}

impl Emitter {
    pub fn new() -> Self {
        Self::with_options(EmitterOptions::default())
    }

    pub fn with_options(options: EmitterOptions) -> Self {
        Self {
            output: String::with_capacity(4096),
            indent_level: 0,
            options,
        }
    }

    /// Print a program to a string.
    pub fn emit_program(&mut self, program: &Program<'_>) -> String {
        self.output.clear();
        for statement in program.statements {
            self.write_indent();
            self.emit_statement(statement);
            self.write_newline();
        }
        std::mem::take(&mut self.output)
    }

    // ========================================================================
    // Output helpers
    // ========================================================================

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn write_newline(&mut self) {
        self.output.push_str(&self.options.newline);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(&self.options.indent);
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn emit_statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::Variable(decl) => self.emit_variable_declaration(decl),
            Statement::Function(decl) => self.emit_function_declaration(decl),
            Statement::Interface(decl) => {
                self.write(&format!("// interface {} removed", decl.name));
            }
            Statement::TypeAlias(decl) => {
                self.write(&format!("// type {} removed", decl.name));
            }
            Statement::Class(decl) => self.emit_class(decl),
            Statement::Enum(decl) => self.emit_enum_declaration(decl),
            Statement::Return(ret) => {
                self.write("return");
                if let Some(expression) = ret.expression {
                    self.write(" ");
                    self.emit_expression(expression);
                }
                self.write(";");
            }
            Statement::If(stmt) => self.emit_if_statement(stmt),
            Statement::While(stmt) => {
                self.write("while (");
                self.emit_expression(stmt.condition);
                self.write(") ");
                self.emit_statement(stmt.body);
            }
            Statement::For(stmt) => self.emit_for_statement(stmt),
            Statement::ForOf(stmt) => {
                self.write(&format!("for ({} {} of ", stmt.keyword.text(), stmt.binding));
                self.emit_expression(stmt.iterable);
                self.write(") ");
                self.emit_statement(stmt.body);
            }
            Statement::ForIn(stmt) => {
                self.write(&format!("for ({} {} in ", stmt.keyword.text(), stmt.binding));
                self.emit_expression(stmt.object);
                self.write(") ");
                self.emit_statement(stmt.body);
            }
            Statement::DoWhile(stmt) => {
                self.write("do ");
                self.emit_statement(stmt.body);
                self.write(" while (");
                self.emit_expression(stmt.condition);
                self.write(");");
            }
            Statement::Switch(stmt) => self.emit_switch_statement(stmt),
            Statement::Break(_) => self.write("break;"),
            Statement::Continue(_) => self.write("continue;"),
            Statement::Throw(stmt) => {
                self.write("throw ");
                self.emit_expression(stmt.expression);
                self.write(";");
            }
            Statement::Try(stmt) => self.emit_try_statement(stmt),
            Statement::Expression(stmt) => {
                self.emit_expression(stmt.expression);
                self.write(";");
            }
            Statement::Block(block) => self.emit_block(block),
            Statement::Import(import) => self.emit_import_declaration(import),
            Statement::Export(export) => self.emit_export_declaration(export),
            Statement::Empty(_) => self.write(";"),
        }
    }

    fn emit_variable_declaration(&mut self, decl: &VariableDeclaration<'_>) {
        self.write(decl.keyword.text());
        self.write(" ");
        self.write(&decl.name);
        if let Some(initializer) = decl.initializer {
            self.write(" = ");
            self.emit_expression(initializer);
        }
        self.write(";");
    }

    fn emit_function_declaration(&mut self, decl: &FunctionDeclaration<'_>) {
        if decl.is_async {
            self.write("async ");
        }
        self.write("function");
        if decl.is_generator {
            self.write("*");
        }
        self.write(" ");
        self.write(&decl.name);
        self.emit_parameter_list(decl.parameters);
        self.write(" ");
        self.emit_block(&decl.body);
    }

    fn emit_parameter_list(&mut self, parameters: &[Parameter<'_>]) {
        self.write("(");
        for (i, parameter) in parameters.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if parameter.is_rest {
                self.write("...");
            }
            self.write(&parameter.name);
            if let Some(initializer) = parameter.initializer {
                self.write(" = ");
                self.emit_expression(initializer);
            }
        }
        self.write(")");
    }

    fn emit_block(&mut self, block: &Block<'_>) {
        self.write("{");
        if !block.statements.is_empty() {
            self.indent_level += 1;
            for statement in block.statements {
                self.write_newline();
                self.write_indent();
                self.emit_statement(statement);
            }
            self.indent_level -= 1;
            self.write_newline();
            self.write_indent();
        }
        self.write("}");
    }

    fn emit_if_statement(&mut self, stmt: &IfStatement<'_>) {
        self.write("if (");
        self.emit_expression(stmt.condition);
        self.write(") ");
        self.emit_statement(stmt.then_branch);
        if let Some(else_branch) = stmt.else_branch {
            // An `else if` continues on the closing brace's line.
            self.write(" else ");
            self.emit_statement(else_branch);
        }
    }

    fn emit_for_statement(&mut self, stmt: &ForStatement<'_>) {
        self.write("for (");
        match &stmt.initializer {
            Some(ForInit::Variable(decl)) => {
                self.write(decl.keyword.text());
                self.write(" ");
                self.write(&decl.name);
                if let Some(initializer) = decl.initializer {
                    self.write(" = ");
                    self.emit_expression(initializer);
                }
            }
            Some(ForInit::Expression(expression)) => self.emit_expression(expression),
            None => {}
        }
        self.write("; ");
        if let Some(condition) = stmt.condition {
            self.emit_expression(condition);
        }
        self.write("; ");
        if let Some(update) = stmt.update {
            self.emit_expression(update);
        }
        self.write(") ");
        self.emit_statement(stmt.body);
    }

    fn emit_switch_statement(&mut self, stmt: &SwitchStatement<'_>) {
        self.write("switch (");
        self.emit_expression(stmt.discriminant);
        self.write(") {");
        self.indent_level += 1;
        for case in stmt.cases {
            self.write_newline();
            self.write_indent();
            match case.test {
                Some(test) => {
                    self.write("case ");
                    self.emit_expression(test);
                    self.write(":");
                }
                None => self.write("default:"),
            }
            self.indent_level += 1;
            for inner in case.statements {
                self.write_newline();
                self.write_indent();
                self.emit_statement(inner);
            }
            self.indent_level -= 1;
        }
        self.indent_level -= 1;
        self.write_newline();
        self.write_indent();
        self.write("}");
    }

    fn emit_try_statement(&mut self, stmt: &TryStatement<'_>) {
        self.write("try ");
        self.emit_block(&stmt.block);
        if let Some(catch) = &stmt.catch {
            self.write(" catch ");
            if let Some(parameter) = &catch.parameter {
                self.write(&format!("({}) ", parameter));
            }
            self.emit_block(&catch.body);
        }
        if let Some(finally) = &stmt.finally {
            self.write(" finally ");
            self.emit_block(finally);
        }
    }

    fn emit_import_declaration(&mut self, import: &ImportDeclaration<'_>) {
        self.write("import ");
        let mut wrote_clause = false;
        if let Some(name) = &import.default_import {
            self.write(name);
            wrote_clause = true;
        }
        if let Some(name) = &import.namespace_import {
            if wrote_clause {
                self.write(", ");
            }
            self.write(&format!("* as {}", name));
            wrote_clause = true;
        }
        if !import.named_imports.is_empty() {
            if wrote_clause {
                self.write(", ");
            }
            self.write("{ ");
            for (i, specifier) in import.named_imports.iter().enumerate() {
                if i > 0 {
                    self.write(", ");
                }
                self.write(&specifier.name);
                if let Some(alias) = &specifier.alias {
                    self.write(&format!(" as {}", alias));
                }
            }
            self.write(" }");
            wrote_clause = true;
        }
        if wrote_clause {
            self.write(" from ");
        }
        self.write(&format!("\"{}\";", import.module_specifier));
    }

    fn emit_export_declaration(&mut self, export: &ExportDeclaration<'_>) {
        match &export.kind {
            ExportKind::Declaration(declaration) => {
                // Type-only declarations lower to their comment; an `export`
                // prefix would not be executable.
                match declaration {
                    Statement::Interface(_) | Statement::TypeAlias(_) => {
                        self.emit_statement(declaration)
                    }
                    Statement::Enum(decl) if decl.is_const => self.emit_statement(declaration),
                    _ => {
                        self.write("export ");
                        self.emit_statement(declaration);
                    }
                }
            }
            ExportKind::Named(specifiers) => {
                self.write("export { ");
                for (i, specifier) in specifiers.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write(&specifier.name);
                    if let Some(alias) = &specifier.alias {
                        self.write(&format!(" as {}", alias));
                    }
                }
                self.write(" };");
            }
            ExportKind::Default(expression) => {
                self.write("export default ");
                self.emit_expression(expression);
                self.write(";");
            }
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    fn emit_class(&mut self, decl: &ClassDeclaration<'_>) {
        for decorator in decl.decorators {
            self.write("@");
            self.emit_expression(decorator.expression);
            self.write_newline();
            self.write_indent();
        }
        self.write("class");
        if !decl.name.is_empty() {
            self.write(" ");
            self.write(&decl.name);
        }
        if let Some(heritage) = &decl.superclass {
            self.write(" extends ");
            self.write(&heritage.name);
        }
        self.write(" {");
        self.indent_level += 1;
        for member in decl.members {
            if let Some(rendered) = self.render_class_member_prefix(member) {
                self.write_newline();
                self.write_indent();
                self.write(&rendered);
                continue;
            }
            self.write_newline();
            self.write_indent();
            self.emit_class_member(member);
        }
        self.indent_level -= 1;
        self.write_newline();
        self.write_indent();
        self.write("}");
    }

    /// Members that lower to a comment line: abstract methods keep their
    /// name and parameter list for readability.
    fn render_class_member_prefix(&self, member: &ClassMember<'_>) -> Option<String> {
        match member {
            ClassMember::Method(m) if m.body.is_none() => {
                let params: Vec<&str> = m.parameters.iter().map(|p| p.name.as_str()).collect();
                Some(format!("// abstract {}({})", m.name, params.join(", ")))
            }
            _ => None,
        }
    }

    fn emit_class_member(&mut self, member: &ClassMember<'_>) {
        match member {
            ClassMember::Property(p) => {
                for decorator in p.decorators {
                    self.write("@");
                    self.emit_expression(decorator.expression);
                    self.write_newline();
                    self.write_indent();
                }
                if p.modifiers.contains(ModifierFlags::STATIC) {
                    self.write("static ");
                }
                self.write(&p.name);
                if let Some(initializer) = p.initializer {
                    self.write(" = ");
                    self.emit_expression(initializer);
                }
                self.write(";");
            }
            ClassMember::Method(m) => {
                for decorator in m.decorators {
                    self.write("@");
                    self.emit_expression(decorator.expression);
                    self.write_newline();
                    self.write_indent();
                }
                if m.modifiers.contains(ModifierFlags::STATIC) {
                    self.write("static ");
                }
                if m.is_async {
                    self.write("async ");
                }
                self.write(&m.name);
                self.emit_parameter_list(m.parameters);
                self.write(" ");
                if let Some(body) = &m.body {
                    self.emit_block(body);
                }
            }
            ClassMember::Constructor(c) => {
                self.write("constructor");
                self.emit_parameter_list(c.parameters);
                self.write(" ");
                self.emit_block(&c.body);
            }
        }
    }

    // ========================================================================
    // Enumerations
    // ========================================================================

    /// Lower `enum E { … }` to a declaration plus an applied function that
    /// assigns each member. Numeric members get the two-way mapping.
    fn emit_enum_declaration(&mut self, decl: &EnumDeclaration<'_>) {
        if decl.is_const {
            self.write(&format!("// const enum {} - inlined", decl.name));
            return;
        }
        let name = &decl.name;
        self.write(&format!("var {};", name));
        self.write_newline();
        self.write_indent();
        self.write(&format!("(function({}) {{", name));
        self.indent_level += 1;

        let mut next_value: i64 = 0;
        for member in decl.members {
            self.write_newline();
            self.write_indent();
            match member.initializer {
                Some(Expression::StringLiteral(s)) => {
                    self.write(&format!(
                        "{}[\"{}\"] = \"{}\";",
                        name,
                        member.name,
                        escape_string(&s.value)
                    ));
                }
                Some(Expression::NumericLiteral(n)) => {
                    let value = n.value as i64;
                    next_value = value + 1;
                    self.write(&format!(
                        "{}[{}[\"{}\"] = {}] = \"{}\";",
                        name, name, member.name, value, member.name
                    ));
                }
                Some(Expression::Unary(u))
                    if u.operator == TokenKind::MinusToken
                        && matches!(u.operand, Expression::NumericLiteral(_)) =>
                {
                    let Expression::NumericLiteral(n) = u.operand else {
                        unreachable!()
                    };
                    let value = -(n.value as i64);
                    next_value = value + 1;
                    self.write(&format!(
                        "{}[{}[\"{}\"] = {}] = \"{}\";",
                        name, name, member.name, value, member.name
                    ));
                }
                Some(other) => {
                    // Non-literal initializers are emitted verbatim.
                    self.write(&format!("{}[{}[\"{}\"] = ", name, name, member.name));
                    self.emit_expression(other);
                    self.write(&format!("] = \"{}\";", member.name));
                    next_value += 1;
                }
                None => {
                    let value = next_value;
                    next_value += 1;
                    self.write(&format!(
                        "{}[{}[\"{}\"] = {}] = \"{}\";",
                        name, name, member.name, value, member.name
                    ));
                }
            }
        }

        self.indent_level -= 1;
        self.write_newline();
        self.write_indent();
        self.write(&format!("}})({} || ({} = {{}}));", name, name));
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn emit_expression(&mut self, expression: &Expression<'_>) {
        match expression {
            Expression::NumericLiteral(n) => self.write(&n.raw),
            Expression::BigIntLiteral(n) => self.write(&n.raw),
            Expression::StringLiteral(s) => {
                self.write(&format!("\"{}\"", escape_string(&s.value)));
            }
            Expression::BooleanLiteral(b) => {
                self.write(if b.value { "true" } else { "false" })
            }
            Expression::NullLiteral(_) => self.write("null"),
            Expression::UndefinedLiteral(_) => self.write("undefined"),
            Expression::Identifier(id) => self.write(&id.name),
            Expression::This(_) => self.write("this"),
            Expression::Super(_) => self.write("super"),
            Expression::Binary(b) => {
                self.emit_expression(b.left);
                self.write(&format!(" {} ", b.operator.text().unwrap_or("?")));
                self.emit_expression(b.right);
            }
            Expression::Logical(l) => {
                self.emit_expression(l.left);
                self.write(&format!(" {} ", l.operator.text().unwrap_or("?")));
                self.emit_expression(l.right);
            }
            Expression::Unary(u) => {
                let op = u.operator.text().unwrap_or("");
                self.write(op);
                if u.operator == TokenKind::TypeOfKeyword || u.operator == TokenKind::DeleteKeyword
                {
                    self.write(" ");
                }
                self.emit_expression(u.operand);
            }
            Expression::Update(u) => {
                if u.prefix {
                    self.write(u.operator.text().unwrap_or(""));
                    self.emit_expression(u.operand);
                } else {
                    self.emit_expression(u.operand);
                    self.write(u.operator.text().unwrap_or(""));
                }
            }
            Expression::Call(call) => {
                self.emit_expression(call.callee);
                if call.optional {
                    self.write("?.");
                }
                self.emit_argument_list(call.arguments);
            }
            Expression::New(new) => {
                self.write("new ");
                self.emit_expression(new.callee);
                self.emit_argument_list(new.arguments);
            }
            Expression::Member(member) => {
                self.emit_expression(member.object);
                self.write(if member.optional { "?." } else { "." });
                self.write(&member.property);
            }
            Expression::Index(index) => {
                self.emit_expression(index.object);
                self.write(if index.optional { "?.[" } else { "[" });
                self.emit_expression(index.index);
                self.write("]");
            }
            Expression::ObjectLiteral(object) => self.emit_object_literal(object),
            Expression::ArrayLiteral(array) => {
                self.write("[");
                for (i, element) in array.elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_expression(element);
                }
                self.write("]");
            }
            Expression::Arrow(arrow) => {
                if arrow.is_async {
                    self.write("async ");
                }
                self.emit_parameter_list(arrow.parameters);
                self.write(" => ");
                match &arrow.body {
                    ArrowBody::Expression(body) => self.emit_expression(body),
                    ArrowBody::Block(body) => self.emit_block(body),
                }
            }
            Expression::FunctionExpr(func) => {
                if func.is_async {
                    self.write("async ");
                }
                self.write("function");
                if func.is_generator {
                    self.write("*");
                }
                if let Some(name) = &func.name {
                    self.write(" ");
                    self.write(name);
                }
                self.emit_parameter_list(func.parameters);
                self.write(" ");
                self.emit_block(&func.body);
            }
            Expression::Conditional(cond) => {
                self.emit_expression(cond.condition);
                self.write(" ? ");
                self.emit_expression(cond.when_true);
                self.write(" : ");
                self.emit_expression(cond.when_false);
            }
            Expression::Assignment(assignment) => {
                self.emit_expression(assignment.target);
                self.write(&format!(" {} ", assignment.operator.text().unwrap_or("=")));
                self.emit_expression(assignment.value);
            }
            Expression::Spread(spread) => {
                self.write("...");
                self.emit_expression(spread.expression);
            }
            Expression::Await(await_expr) => {
                self.write("await ");
                self.emit_expression(await_expr.expression);
            }
            Expression::Yield(yield_expr) => {
                self.write("yield");
                if yield_expr.delegate {
                    self.write("*");
                }
                if let Some(argument) = yield_expr.argument {
                    self.write(" ");
                    self.emit_expression(argument);
                }
            }
            Expression::Template(template) => self.emit_template_literal(template),
            Expression::TaggedTemplate(tagged) => {
                self.emit_expression(tagged.tag);
                self.emit_template_literal(&tagged.template);
            }
            // Assertion erasure preserves the expression value verbatim.
            Expression::TypeAssertion(assertion) => self.emit_expression(assertion.expression),
            Expression::As(as_expr) => self.emit_expression(as_expr.expression),
            Expression::NonNull(non_null) => self.emit_expression(non_null.expression),
            Expression::ClassExpr(class_expr) => self.emit_class(class_expr.declaration),
            Expression::Parenthesized(paren) => {
                self.write("(");
                self.emit_expression(paren.expression);
                self.write(")");
            }
        }
    }

    fn emit_argument_list(&mut self, arguments: &[Expression<'_>]) {
        self.write("(");
        for (i, argument) in arguments.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expression(argument);
        }
        self.write(")");
    }

    fn emit_object_literal(&mut self, object: &ObjectLiteral<'_>) {
        if object.properties.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{ ");
        for (i, property) in object.properties.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if is_valid_identifier(&property.key) {
                self.write(&property.key);
            } else {
                self.write(&format!("\"{}\"", escape_string(&property.key)));
            }
            if let Some(value) = property.value {
                self.write(": ");
                self.emit_expression(value);
            }
        }
        self.write(" }");
    }

    fn emit_template_literal(&mut self, template: &TemplateLiteral<'_>) {
        self.write("`");
        for (i, quasi) in template.quasis.iter().enumerate() {
            self.write(&escape_template(quasi));
            if let Some(expression) = template.expressions.get(i) {
                self.write("${");
                self.emit_expression(expression);
                self.write("}");
            }
        }
        self.write("`");
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a cooked string value for double-quoted output.
fn escape_string(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '\0' => result.push_str("\\0"),
            _ => result.push(ch),
        }
    }
    result
}

/// Escape a cooked template fragment for backtick output.
fn escape_template(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '`' => result.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => result.push_str("\\$"),
            _ => result.push(ch),
        }
    }
    result
}

fn is_valid_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c == '_' || c == '$' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use detype_lexer::tokenize;
    use detype_parser::parse;
    use pretty_assertions::assert_eq;

    fn emit_source(source: &str) -> String {
        let arena = Bump::new();
        let tokens = tokenize(source).unwrap();
        let program = parse(&arena, tokens).unwrap();
        emit(&program)
    }

    #[test]
    fn test_variable_annotation_is_stripped() {
        assert_eq!(emit_source("let x: number = 42;"), "let x = 42;\n");
    }

    #[test]
    fn test_interface_lowers_to_comment() {
        assert_eq!(
            emit_source("interface Person { name: string; }"),
            "// interface Person removed\n"
        );
    }

    #[test]
    fn test_type_alias_lowers_to_comment() {
        assert_eq!(emit_source("type Name = string;"), "// type Name removed\n");
    }

    #[test]
    fn test_const_enum_lowers_to_comment() {
        assert_eq!(
            emit_source("const enum Level { Low }"),
            "// const enum Level - inlined\n"
        );
    }

    #[test]
    fn test_function_signature_erasure() {
        assert_eq!(
            emit_source("function add(a: number, b: number): number { return a + b; }"),
            "function add(a, b) {\n  return a + b;\n}\n"
        );
    }

    #[test]
    fn test_enum_lowering() {
        let output = emit_source("enum Color { Red, Green, Blue }");
        let expected = "var Color;\n\
                        (function(Color) {\n  \
                        Color[Color[\"Red\"] = 0] = \"Red\";\n  \
                        Color[Color[\"Green\"] = 1] = \"Green\";\n  \
                        Color[Color[\"Blue\"] = 2] = \"Blue\";\n\
                        })(Color || (Color = {}));\n";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_enum_with_string_and_numeric_members() {
        let output = emit_source("enum Mixed { A = 5, B, S = \"text\" }");
        assert!(output.contains("Mixed[Mixed[\"A\"] = 5] = \"A\";"));
        assert!(output.contains("Mixed[Mixed[\"B\"] = 6] = \"B\";"));
        assert!(output.contains("Mixed[\"S\"] = \"text\";"));
        assert!(!output.contains("Mixed[Mixed[\"S\"]"));
    }

    #[test]
    fn test_else_if_chain_stays_on_brace_line() {
        let output = emit_source(
            "if (a) { b(); } else if (c) { d(); } else { e(); }",
        );
        assert_eq!(
            output,
            "if (a) {\n  b();\n} else if (c) {\n  d();\n} else {\n  e();\n}\n"
        );
    }

    #[test]
    fn test_as_and_non_null_erasure_preserve_value() {
        assert_eq!(emit_source("let a = b as string;"), "let a = b;\n");
        assert_eq!(emit_source("let a = b!;"), "let a = b;\n");
        assert_eq!(emit_source("let a = <string>b;"), "let a = b;\n");
    }

    #[test]
    fn test_parenthesized_expressions_are_preserved() {
        assert_eq!(emit_source("let x = (1 + 2) * 3;"), "let x = (1 + 2) * 3;\n");
    }

    #[test]
    fn test_call_type_arguments_are_stripped() {
        assert_eq!(emit_source("first<number>(xs);"), "first(xs);\n");
    }

    #[test]
    fn test_abstract_method_lowers_to_comment() {
        let output = emit_source(
            "abstract class Shape { abstract area(scale: number): number; }",
        );
        assert!(output.contains("// abstract area(scale)"));
        assert!(output.starts_with("class Shape {"));
    }

    #[test]
    fn test_class_implements_clause_is_stripped() {
        let output = emit_source(
            "class Circle implements Shape { radius: number = 1; area(): number { return this.radius; } }",
        );
        assert_eq!(
            output,
            "class Circle {\n  radius = 1;\n  area() {\n    return this.radius;\n  }\n}\n"
        );
    }

    #[test]
    fn test_template_literal_round_trip() {
        assert_eq!(
            emit_source("let s = `a${x}b`;"),
            "let s = `a${x}b`;\n"
        );
    }

    #[test]
    fn test_import_export_reproduced() {
        assert_eq!(
            emit_source("import { a, b as c } from \"mod\";"),
            "import { a, b as c } from \"mod\";\n"
        );
        assert_eq!(
            emit_source("export { a, b as c };"),
            "export { a, b as c };\n"
        );
        assert_eq!(
            emit_source("export default 1;"),
            "export default 1;\n"
        );
    }

    #[test]
    fn test_exported_interface_keeps_only_comment() {
        assert_eq!(
            emit_source("export interface P { x: number; }"),
            "// interface P removed\n"
        );
    }

    #[test]
    fn test_optional_chaining_preserved() {
        assert_eq!(emit_source("a?.b?.();"), "a?.b?.();\n");
    }

    #[test]
    fn test_decorators_emitted_verbatim() {
        let output = emit_source("@sealed\nclass Box {}");
        assert_eq!(output, "@sealed\nclass Box {\n}\n");
    }

    #[test]
    fn test_switch_layout() {
        let output = emit_source(
            "switch (x) { case 1: a(); break; default: b(); }",
        );
        assert_eq!(
            output,
            "switch (x) {\n  case 1:\n    a();\n    break;\n  default:\n    b();\n}\n"
        );
    }
}
