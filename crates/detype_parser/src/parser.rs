//! The parser implementation.
//!
//! Holds a position cursor over the token vector (owned, consumed once) and
//! builds nodes in the caller's arena. Speculation snapshots the cursor as
//! an integer offset and restores it on mismatch; the token vector itself is
//! never mutated. Nested type-argument lists that end in `>>` or `>>>` are
//! closed by logically splitting the multi-greater-than token with a small
//! counter kept beside the cursor.

use bumpalo::Bump;
use detype_ast::node::*;
use detype_ast::types::ModifierFlags;
use detype_ast::TokenKind;
use detype_diagnostics::CompileError;
use detype_lexer::{numeric_value, Token};

use crate::precedence::{
    binary_operator_precedence, is_logical_operator, is_right_associative, OperatorPrecedence,
};

type ParseResult<T> = Result<T, CompileError>;

/// Parse a token stream into a program. The arena owns every node; the
/// returned tree borrows it.
pub fn parse<'a>(arena: &'a Bump, tokens: Vec<Token>) -> ParseResult<Program<'a>> {
    Parser::new(arena, tokens).parse_program()
}

/// The parser produces a [`Program`] from the lexer's token stream.
pub struct Parser<'a> {
    arena: &'a Bump,
    tokens: Vec<Token>,
    pos: usize,
    /// How many `>` characters have been logically consumed from the
    /// current multi-greater-than token while closing type-argument lists.
    split_greater: u8,
}

impl<'a> Parser<'a> {
    pub fn new(arena: &'a Bump, tokens: Vec<Token>) -> Self {
        debug_assert!(tokens.last().is_some_and(Token::is_eof));
        Self {
            arena,
            tokens,
            pos: 0,
            split_greater: 0,
        }
    }

    pub fn parse_program(mut self) -> ParseResult<Program<'a>> {
        let mut statements = Vec::new();
        while self.kind() != TokenKind::EndOfFileToken {
            statements.push(self.parse_statement()?);
        }
        Ok(Program {
            statements: self.alloc_slice(statements),
        })
    }

    // ========================================================================
    // Token management
    // ========================================================================

    #[inline]
    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// The current token kind, seen through any pending greater-than split.
    fn kind(&self) -> TokenKind {
        let kind = self.current().kind;
        if self.split_greater == 0 {
            return kind;
        }
        match (kind, self.split_greater) {
            (TokenKind::GreaterThanGreaterThanToken, _) => TokenKind::GreaterThanToken,
            (TokenKind::GreaterThanGreaterThanGreaterThanToken, 1) => {
                TokenKind::GreaterThanGreaterThanToken
            }
            (TokenKind::GreaterThanGreaterThanGreaterThanToken, _) => TokenKind::GreaterThanToken,
            _ => kind,
        }
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::EndOfFileToken)
    }

    #[inline]
    fn line(&self) -> u32 {
        self.current().line
    }

    fn advance(&mut self) {
        self.split_greater = 0;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            let text = kind.text().unwrap_or("token");
            Err(self.syntax_error(&format!("'{}'", text)))
        }
    }

    fn expect_semicolon(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::SemicolonToken)
    }

    /// Expect an identifier binding name and return its text.
    fn expect_identifier(&mut self) -> ParseResult<String> {
        if self.check(TokenKind::Identifier) {
            let name = self.current().lexeme.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.syntax_error("Identifier"))
        }
    }

    /// Expect a member or property name; keywords are valid names here
    /// (`point.type`, `config.from`).
    fn expect_identifier_name(&mut self) -> ParseResult<String> {
        let kind = self.kind();
        if kind == TokenKind::Identifier || kind.is_keyword() {
            let name = self.current().lexeme.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.syntax_error("Identifier"))
        }
    }

    fn syntax_error(&self, expected: &str) -> CompileError {
        let token = self.current();
        let found = if token.is_eof() {
            "end of file".to_string()
        } else if self.split_greater > 0 {
            ">".to_string()
        } else {
            token.lexeme.clone()
        };
        CompileError::Syntax {
            expected: expected.to_string(),
            found,
            line: token.line,
        }
    }

    /// Consume a single `>` closing a type-argument or type-parameter list,
    /// splitting `>>` / `>>>` logically without touching the token vector.
    fn expect_type_list_end(&mut self) -> ParseResult<()> {
        match self.kind() {
            TokenKind::GreaterThanToken => {
                self.advance();
                Ok(())
            }
            TokenKind::GreaterThanGreaterThanToken
            | TokenKind::GreaterThanGreaterThanGreaterThanToken => {
                self.split_greater += 1;
                Ok(())
            }
            _ => Err(self.syntax_error("'>'")),
        }
    }

    /// Bounded speculation: run `f`, restoring the cursor on failure.
    fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> Option<T> {
        let saved_pos = self.pos;
        let saved_split = self.split_greater;
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = saved_pos;
                self.split_greater = saved_split;
                None
            }
        }
    }

    // ========================================================================
    // Arena helpers
    // ========================================================================

    fn alloc<T>(&self, value: T) -> &'a T {
        self.arena.alloc(value)
    }

    fn alloc_slice<T>(&self, values: Vec<T>) -> &'a [T] {
        self.arena.alloc_slice_fill_iter(values)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> ParseResult<Statement<'a>> {
        match self.kind() {
            TokenKind::AtToken => self.parse_decorated_statement(),
            TokenKind::SemicolonToken => {
                let line = self.line();
                self.advance();
                Ok(Statement::Empty(EmptyStatement { line }))
            }
            TokenKind::OpenBraceToken => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::ConstKeyword if self.peek_kind(1) == TokenKind::EnumKeyword => {
                self.parse_enum_declaration()
            }
            TokenKind::VarKeyword | TokenKind::LetKeyword | TokenKind::ConstKeyword => {
                self.parse_variable_statement()
            }
            TokenKind::FunctionKeyword => self.parse_function_declaration(false),
            TokenKind::AbstractKeyword if self.peek_kind(1) == TokenKind::ClassKeyword => {
                self.parse_class_declaration(&[])
            }
            TokenKind::ClassKeyword => self.parse_class_declaration(&[]),
            TokenKind::InterfaceKeyword => self.parse_interface_declaration(),
            TokenKind::TypeKeyword => self.parse_type_alias_declaration(),
            TokenKind::EnumKeyword => self.parse_enum_declaration(),
            TokenKind::ReturnKeyword => self.parse_return_statement(),
            TokenKind::IfKeyword => self.parse_if_statement(),
            TokenKind::WhileKeyword => self.parse_while_statement(),
            TokenKind::ForKeyword => self.parse_for_statement(),
            TokenKind::DoKeyword => self.parse_do_while_statement(),
            TokenKind::SwitchKeyword => self.parse_switch_statement(),
            TokenKind::BreakKeyword => {
                let line = self.line();
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Break(BreakStatement { line }))
            }
            TokenKind::ContinueKeyword => {
                let line = self.line();
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Continue(ContinueStatement { line }))
            }
            TokenKind::ThrowKeyword => self.parse_throw_statement(),
            TokenKind::TryKeyword => self.parse_try_statement(),
            TokenKind::ImportKeyword => self.parse_import_declaration(),
            TokenKind::ExportKeyword => self.parse_export_declaration(),
            TokenKind::Identifier
                if self.current().lexeme == "async"
                    && self.peek_kind(1) == TokenKind::FunctionKeyword =>
            {
                self.advance();
                self.parse_function_declaration(true)
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// A leading `@` sequence is only legal immediately before a class
    /// declaration, possibly behind `export`.
    fn parse_decorated_statement(&mut self) -> ParseResult<Statement<'a>> {
        let decorators = self.parse_decorators()?;
        let decorators = self.alloc_slice(decorators);
        match self.kind() {
            TokenKind::ClassKeyword | TokenKind::AbstractKeyword => {
                self.parse_class_declaration(decorators)
            }
            TokenKind::ExportKeyword => {
                let line = self.line();
                self.advance();
                let class_decl = self.parse_class_declaration(decorators)?;
                let declaration = self.alloc(class_decl);
                Ok(Statement::Export(ExportDeclaration {
                    kind: ExportKind::Declaration(declaration),
                    line,
                }))
            }
            _ => Err(self.syntax_error("Class declaration after decorators")),
        }
    }

    fn parse_decorators(&mut self) -> ParseResult<Vec<Decorator<'a>>> {
        let mut decorators = Vec::new();
        while self.check(TokenKind::AtToken) {
            let line = self.line();
            self.advance();
            let expression = self.parse_left_hand_side_expression()?;
            let expression = self.alloc(expression);
            decorators.push(Decorator { expression, line });
        }
        Ok(decorators)
    }

    fn parse_block(&mut self) -> ParseResult<Block<'a>> {
        let line = self.line();
        self.expect(TokenKind::OpenBraceToken)?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::CloseBraceToken) && !self.check(TokenKind::EndOfFileToken) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::CloseBraceToken)?;
        Ok(Block {
            statements: self.alloc_slice(statements),
            line,
        })
    }

    fn parse_variable_statement(&mut self) -> ParseResult<Statement<'a>> {
        let declaration = self.parse_variable_declaration()?;
        self.expect_semicolon()?;
        Ok(Statement::Variable(declaration))
    }

    fn parse_variable_declaration(&mut self) -> ParseResult<VariableDeclaration<'a>> {
        let line = self.line();
        let keyword = match self.kind() {
            TokenKind::VarKeyword => VarKeyword::Var,
            TokenKind::LetKeyword => VarKeyword::Let,
            TokenKind::ConstKeyword => VarKeyword::Const,
            _ => return Err(self.syntax_error("'var', 'let' or 'const'")),
        };
        self.advance();
        let name = self.expect_identifier()?;
        let type_annotation = if self.eat(TokenKind::ColonToken) {
            Some(self.parse_type_and_alloc()?)
        } else {
            None
        };
        let initializer = if self.eat(TokenKind::EqualsToken) {
            Some(self.parse_assignment_expression_and_alloc()?)
        } else {
            None
        };
        Ok(VariableDeclaration {
            keyword,
            name,
            type_annotation,
            initializer,
            line,
        })
    }

    fn parse_function_declaration(&mut self, is_async: bool) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::FunctionKeyword)?;
        let is_generator = self.eat(TokenKind::AsteriskToken);
        let name = self.expect_identifier()?;
        let type_parameters = self.parse_optional_type_parameters()?;
        let parameters = self.parse_parameter_list()?;
        let return_type = if self.eat(TokenKind::ColonToken) {
            Some(self.parse_type_and_alloc()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Statement::Function(FunctionDeclaration {
            name,
            type_parameters,
            parameters,
            return_type,
            body,
            is_async,
            is_generator,
            line,
        }))
    }

    fn parse_parameter_list(&mut self) -> ParseResult<&'a [Parameter<'a>]> {
        self.expect(TokenKind::OpenParenToken)?;
        let mut parameters = Vec::new();
        while !self.check(TokenKind::CloseParenToken) {
            parameters.push(self.parse_parameter()?);
            if !self.eat(TokenKind::CommaToken) {
                break;
            }
        }
        self.expect(TokenKind::CloseParenToken)?;
        Ok(self.alloc_slice(parameters))
    }

    fn parse_parameter(&mut self) -> ParseResult<Parameter<'a>> {
        let line = self.line();
        let is_rest = self.eat(TokenKind::DotDotDotToken);
        let name = self.expect_identifier()?;
        let optional = self.eat(TokenKind::QuestionToken);
        let type_annotation = if self.eat(TokenKind::ColonToken) {
            Some(self.parse_type_and_alloc()?)
        } else {
            None
        };
        let initializer = if self.eat(TokenKind::EqualsToken) {
            Some(self.parse_assignment_expression_and_alloc()?)
        } else {
            None
        };
        Ok(Parameter {
            name,
            type_annotation,
            initializer,
            optional,
            is_rest,
            line,
        })
    }

    fn parse_optional_type_parameters(
        &mut self,
    ) -> ParseResult<Option<&'a [TypeParameter<'a>]>> {
        if !self.check(TokenKind::LessThanToken) {
            return Ok(None);
        }
        self.advance();
        let mut parameters = Vec::new();
        loop {
            let line = self.line();
            let name = self.expect_identifier()?;
            let constraint = if self.eat(TokenKind::ExtendsKeyword) {
                Some(self.parse_type_and_alloc()?)
            } else {
                None
            };
            let default = if self.eat(TokenKind::EqualsToken) {
                Some(self.parse_type_and_alloc()?)
            } else {
                None
            };
            parameters.push(TypeParameter {
                name,
                constraint,
                default,
                line,
            });
            if !self.eat(TokenKind::CommaToken) {
                break;
            }
        }
        self.expect_type_list_end()?;
        Ok(Some(self.alloc_slice(parameters)))
    }

    fn parse_interface_declaration(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::InterfaceKeyword)?;
        let name = self.expect_identifier()?;
        let type_parameters = self.parse_optional_type_parameters()?;
        let mut extends = Vec::new();
        if self.eat(TokenKind::ExtendsKeyword) {
            loop {
                extends.push(self.parse_type()?);
                if !self.eat(TokenKind::CommaToken) {
                    break;
                }
            }
        }
        self.expect(TokenKind::OpenBraceToken)?;
        let members = self.parse_type_member_list()?;
        self.expect(TokenKind::CloseBraceToken)?;
        Ok(Statement::Interface(InterfaceDeclaration {
            name,
            type_parameters,
            extends: self.alloc_slice(extends),
            members,
            line,
        }))
    }

    fn parse_type_member_list(&mut self) -> ParseResult<&'a [TypeMember<'a>]> {
        let mut members = Vec::new();
        while !self.check(TokenKind::CloseBraceToken) && !self.check(TokenKind::EndOfFileToken) {
            members.push(self.parse_type_member()?);
            // Members are separated by `;` or `,`, both optional before `}`.
            if !self.eat(TokenKind::SemicolonToken) {
                self.eat(TokenKind::CommaToken);
            }
        }
        Ok(self.alloc_slice(members))
    }

    fn parse_type_member(&mut self) -> ParseResult<TypeMember<'a>> {
        let line = self.line();

        if self.check(TokenKind::OpenBracketToken) {
            self.advance();
            let key_name = self.expect_identifier()?;
            self.expect(TokenKind::ColonToken)?;
            let key_type = self.parse_type_and_alloc()?;
            self.expect(TokenKind::CloseBracketToken)?;
            self.expect(TokenKind::ColonToken)?;
            let value_type = self.parse_type_and_alloc()?;
            return Ok(TypeMember::Index(IndexSignature {
                key_name,
                key_type,
                value_type,
                readonly: false,
                line,
            }));
        }

        let readonly =
            self.check(TokenKind::ReadonlyKeyword) && self.peek_kind(1) != TokenKind::ColonToken
                && self.peek_kind(1) != TokenKind::QuestionToken
                && self.peek_kind(1) != TokenKind::OpenParenToken;
        if readonly {
            self.advance();
        }

        if self.check(TokenKind::OpenBracketToken) {
            self.advance();
            let key_name = self.expect_identifier()?;
            self.expect(TokenKind::ColonToken)?;
            let key_type = self.parse_type_and_alloc()?;
            self.expect(TokenKind::CloseBracketToken)?;
            self.expect(TokenKind::ColonToken)?;
            let value_type = self.parse_type_and_alloc()?;
            return Ok(TypeMember::Index(IndexSignature {
                key_name,
                key_type,
                value_type,
                readonly: true,
                line,
            }));
        }

        let name = self.expect_identifier_name()?;
        let optional = self.eat(TokenKind::QuestionToken);

        if self.check(TokenKind::OpenParenToken) {
            let parameters = self.parse_parameter_list()?;
            let return_type = if self.eat(TokenKind::ColonToken) {
                Some(self.parse_type_and_alloc()?)
            } else {
                None
            };
            return Ok(TypeMember::Method(MethodSignature {
                name,
                parameters,
                return_type,
                optional,
                line,
            }));
        }

        let type_annotation = if self.eat(TokenKind::ColonToken) {
            Some(self.parse_type_and_alloc()?)
        } else {
            None
        };
        Ok(TypeMember::Property(PropertySignature {
            name,
            type_annotation,
            optional,
            readonly,
            line,
        }))
    }

    fn parse_type_alias_declaration(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::TypeKeyword)?;
        let name = self.expect_identifier()?;
        let type_parameters = self.parse_optional_type_parameters()?;
        self.expect(TokenKind::EqualsToken)?;
        let type_node = self.parse_type_and_alloc()?;
        self.expect_semicolon()?;
        Ok(Statement::TypeAlias(TypeAliasDeclaration {
            name,
            type_parameters,
            type_node,
            line,
        }))
    }

    fn parse_class_declaration(
        &mut self,
        decorators: &'a [Decorator<'a>],
    ) -> ParseResult<Statement<'a>> {
        let class_decl = self.parse_class(decorators, true)?;
        Ok(Statement::Class(class_decl))
    }

    fn parse_class(
        &mut self,
        decorators: &'a [Decorator<'a>],
        require_name: bool,
    ) -> ParseResult<ClassDeclaration<'a>> {
        let line = self.line();
        let is_abstract = self.eat(TokenKind::AbstractKeyword);
        self.expect(TokenKind::ClassKeyword)?;
        let name = if require_name || self.check(TokenKind::Identifier) {
            self.expect_identifier()?
        } else {
            String::new()
        };
        let type_parameters = self.parse_optional_type_parameters()?;

        let superclass = if self.eat(TokenKind::ExtendsKeyword) {
            let heritage_line = self.line();
            let super_name = self.expect_identifier()?;
            let type_arguments = if self.check(TokenKind::LessThanToken) {
                self.advance();
                Some(self.parse_type_argument_list()?)
            } else {
                None
            };
            Some(Heritage {
                name: super_name,
                type_arguments,
                line: heritage_line,
            })
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.eat(TokenKind::ImplementsKeyword) {
            loop {
                implements.push(self.parse_type()?);
                if !self.eat(TokenKind::CommaToken) {
                    break;
                }
            }
        }

        self.expect(TokenKind::OpenBraceToken)?;
        let mut members = Vec::new();
        while !self.check(TokenKind::CloseBraceToken) && !self.check(TokenKind::EndOfFileToken) {
            if self.eat(TokenKind::SemicolonToken) {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        self.expect(TokenKind::CloseBraceToken)?;

        Ok(ClassDeclaration {
            name,
            decorators,
            type_parameters,
            superclass,
            implements: self.alloc_slice(implements),
            members: self.alloc_slice(members),
            is_abstract,
            line,
        })
    }

    fn parse_class_member(&mut self) -> ParseResult<ClassMember<'a>> {
        let line = self.line();
        let decorators = self.parse_decorators()?;
        let decorators = self.alloc_slice(decorators);

        let mut modifiers = ModifierFlags::NONE;
        loop {
            let flag = match self.kind() {
                TokenKind::PublicKeyword => ModifierFlags::PUBLIC,
                TokenKind::PrivateKeyword => ModifierFlags::PRIVATE,
                TokenKind::ProtectedKeyword => ModifierFlags::PROTECTED,
                TokenKind::StaticKeyword => ModifierFlags::STATIC,
                TokenKind::ReadonlyKeyword => ModifierFlags::READONLY,
                TokenKind::AbstractKeyword => ModifierFlags::ABSTRACT,
                _ => break,
            };
            // A modifier keyword directly before `(`, `:`, `=` or `?` is a
            // member named by the keyword, not a modifier.
            if matches!(
                self.peek_kind(1),
                TokenKind::OpenParenToken
                    | TokenKind::ColonToken
                    | TokenKind::EqualsToken
                    | TokenKind::QuestionToken
                    | TokenKind::SemicolonToken
            ) {
                break;
            }
            modifiers |= flag;
            self.advance();
        }

        let is_async = self.check(TokenKind::Identifier)
            && self.current().lexeme == "async"
            && self.peek_kind(1) != TokenKind::OpenParenToken
            && self.peek_kind(1) != TokenKind::ColonToken
            && self.peek_kind(1) != TokenKind::EqualsToken;
        if is_async {
            self.advance();
        }

        let name = self.expect_identifier_name()?;

        if name == "constructor" && self.check(TokenKind::OpenParenToken) {
            let parameters = self.parse_parameter_list()?;
            let body = self.parse_block()?;
            return Ok(ClassMember::Constructor(ConstructorDeclaration {
                modifiers,
                parameters,
                body,
                line,
            }));
        }

        if self.check(TokenKind::OpenParenToken) || self.check(TokenKind::LessThanToken) {
            let type_parameters = self.parse_optional_type_parameters()?;
            let parameters = self.parse_parameter_list()?;
            let return_type = if self.eat(TokenKind::ColonToken) {
                Some(self.parse_type_and_alloc()?)
            } else {
                None
            };
            let body = if self.check(TokenKind::OpenBraceToken) {
                Some(self.parse_block()?)
            } else {
                self.expect_semicolon()?;
                None
            };
            return Ok(ClassMember::Method(MethodDeclaration {
                modifiers,
                decorators,
                name,
                type_parameters,
                parameters,
                return_type,
                body,
                is_async,
                line,
            }));
        }

        let optional = self.eat(TokenKind::QuestionToken);
        let type_annotation = if self.eat(TokenKind::ColonToken) {
            Some(self.parse_type_and_alloc()?)
        } else {
            None
        };
        let initializer = if self.eat(TokenKind::EqualsToken) {
            Some(self.parse_assignment_expression_and_alloc()?)
        } else {
            None
        };
        self.expect_semicolon()?;
        Ok(ClassMember::Property(PropertyDeclaration {
            modifiers,
            decorators,
            name,
            type_annotation,
            initializer,
            optional,
            line,
        }))
    }

    fn parse_enum_declaration(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        let is_const = self.eat(TokenKind::ConstKeyword);
        self.expect(TokenKind::EnumKeyword)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::OpenBraceToken)?;
        let mut members = Vec::new();
        while !self.check(TokenKind::CloseBraceToken) && !self.check(TokenKind::EndOfFileToken) {
            let member_line = self.line();
            let member_name = self.expect_identifier_name()?;
            let initializer = if self.eat(TokenKind::EqualsToken) {
                Some(self.parse_assignment_expression_and_alloc()?)
            } else {
                None
            };
            members.push(EnumMember {
                name: member_name,
                initializer,
                line: member_line,
            });
            if !self.eat(TokenKind::CommaToken) {
                break;
            }
        }
        self.expect(TokenKind::CloseBraceToken)?;
        Ok(Statement::Enum(EnumDeclaration {
            name,
            is_const,
            members: self.alloc_slice(members),
            line,
        }))
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::ReturnKeyword)?;
        let expression = if self.check(TokenKind::SemicolonToken)
            || self.check(TokenKind::CloseBraceToken)
            || self.check(TokenKind::EndOfFileToken)
        {
            None
        } else {
            Some(self.parse_expression_and_alloc()?)
        };
        self.expect_semicolon()?;
        Ok(Statement::Return(ReturnStatement { expression, line }))
    }

    fn parse_if_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::IfKeyword)?;
        self.expect(TokenKind::OpenParenToken)?;
        let condition = self.parse_expression_and_alloc()?;
        self.expect(TokenKind::CloseParenToken)?;
        let then_branch = self.parse_statement_and_alloc()?;
        let else_branch = if self.eat(TokenKind::ElseKeyword) {
            Some(self.parse_statement_and_alloc()?)
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            condition,
            then_branch,
            else_branch,
            line,
        }))
    }

    fn parse_while_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::WhileKeyword)?;
        self.expect(TokenKind::OpenParenToken)?;
        let condition = self.parse_expression_and_alloc()?;
        self.expect(TokenKind::CloseParenToken)?;
        let body = self.parse_statement_and_alloc()?;
        Ok(Statement::While(WhileStatement {
            condition,
            body,
            line,
        }))
    }

    fn parse_for_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::ForKeyword)?;
        self.expect(TokenKind::OpenParenToken)?;

        // Iteration-variable forms: `for (let x of …)`, `for (let k in …)`.
        if matches!(
            self.kind(),
            TokenKind::VarKeyword | TokenKind::LetKeyword | TokenKind::ConstKeyword
        ) {
            let keyword = match self.kind() {
                TokenKind::VarKeyword => VarKeyword::Var,
                TokenKind::LetKeyword => VarKeyword::Let,
                _ => VarKeyword::Const,
            };
            let decl_line = self.line();
            self.advance();
            let binding = self.expect_identifier()?;

            if self.eat(TokenKind::OfKeyword) {
                let iterable = self.parse_expression_and_alloc()?;
                self.expect(TokenKind::CloseParenToken)?;
                let body = self.parse_statement_and_alloc()?;
                return Ok(Statement::ForOf(ForOfStatement {
                    keyword,
                    binding,
                    iterable,
                    body,
                    line,
                }));
            }
            if self.eat(TokenKind::InKeyword) {
                let object = self.parse_expression_and_alloc()?;
                self.expect(TokenKind::CloseParenToken)?;
                let body = self.parse_statement_and_alloc()?;
                return Ok(Statement::ForIn(ForInStatement {
                    keyword,
                    binding,
                    object,
                    body,
                    line,
                }));
            }

            // Classic for with a declared iteration variable.
            let type_annotation = if self.eat(TokenKind::ColonToken) {
                Some(self.parse_type_and_alloc()?)
            } else {
                None
            };
            let initializer = if self.eat(TokenKind::EqualsToken) {
                Some(self.parse_assignment_expression_and_alloc()?)
            } else {
                None
            };
            let declaration = VariableDeclaration {
                keyword,
                name: binding,
                type_annotation,
                initializer,
                line: decl_line,
            };
            self.expect_semicolon()?;
            return self.parse_for_rest(Some(ForInit::Variable(declaration)), line);
        }

        if self.eat(TokenKind::SemicolonToken) {
            return self.parse_for_rest(None, line);
        }

        let init = self.parse_expression_and_alloc()?;
        self.expect_semicolon()?;
        self.parse_for_rest(Some(ForInit::Expression(init)), line)
    }

    fn parse_for_rest(
        &mut self,
        initializer: Option<ForInit<'a>>,
        line: u32,
    ) -> ParseResult<Statement<'a>> {
        let condition = if self.check(TokenKind::SemicolonToken) {
            None
        } else {
            Some(self.parse_expression_and_alloc()?)
        };
        self.expect_semicolon()?;
        let update = if self.check(TokenKind::CloseParenToken) {
            None
        } else {
            Some(self.parse_expression_and_alloc()?)
        };
        self.expect(TokenKind::CloseParenToken)?;
        let body = self.parse_statement_and_alloc()?;
        Ok(Statement::For(ForStatement {
            initializer,
            condition,
            update,
            body,
            line,
        }))
    }

    fn parse_do_while_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::DoKeyword)?;
        let body = self.parse_statement_and_alloc()?;
        self.expect(TokenKind::WhileKeyword)?;
        self.expect(TokenKind::OpenParenToken)?;
        let condition = self.parse_expression_and_alloc()?;
        self.expect(TokenKind::CloseParenToken)?;
        self.expect_semicolon()?;
        Ok(Statement::DoWhile(DoWhileStatement {
            body,
            condition,
            line,
        }))
    }

    fn parse_switch_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::SwitchKeyword)?;
        self.expect(TokenKind::OpenParenToken)?;
        let discriminant = self.parse_expression_and_alloc()?;
        self.expect(TokenKind::CloseParenToken)?;
        self.expect(TokenKind::OpenBraceToken)?;

        let mut cases = Vec::new();
        while !self.check(TokenKind::CloseBraceToken) && !self.check(TokenKind::EndOfFileToken) {
            let case_line = self.line();
            let test = if self.eat(TokenKind::CaseKeyword) {
                let test = self.parse_expression_and_alloc()?;
                Some(test)
            } else {
                self.expect(TokenKind::DefaultKeyword)?;
                None
            };
            self.expect(TokenKind::ColonToken)?;
            let mut statements = Vec::new();
            while !matches!(
                self.kind(),
                TokenKind::CaseKeyword
                    | TokenKind::DefaultKeyword
                    | TokenKind::CloseBraceToken
                    | TokenKind::EndOfFileToken
            ) {
                statements.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                statements: self.alloc_slice(statements),
                line: case_line,
            });
        }
        self.expect(TokenKind::CloseBraceToken)?;
        Ok(Statement::Switch(SwitchStatement {
            discriminant,
            cases: self.alloc_slice(cases),
            line,
        }))
    }

    fn parse_throw_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::ThrowKeyword)?;
        let expression = self.parse_expression_and_alloc()?;
        self.expect_semicolon()?;
        Ok(Statement::Throw(ThrowStatement { expression, line }))
    }

    fn parse_try_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::TryKeyword)?;
        let block = self.parse_block()?;

        let catch = if self.check(TokenKind::CatchKeyword) {
            let catch_line = self.line();
            self.advance();
            let parameter = if self.eat(TokenKind::OpenParenToken) {
                let name = self.expect_identifier()?;
                // A catch parameter may carry an annotation (`e: unknown`).
                if self.eat(TokenKind::ColonToken) {
                    self.parse_type()?;
                }
                self.expect(TokenKind::CloseParenToken)?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                parameter,
                body,
                line: catch_line,
            })
        } else {
            None
        };

        let finally = if self.eat(TokenKind::FinallyKeyword) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.syntax_error("'catch' or 'finally'"));
        }
        Ok(Statement::Try(TryStatement {
            block,
            catch,
            finally,
            line,
        }))
    }

    fn parse_import_declaration(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::ImportKeyword)?;

        // Bare import: `import "module";`
        if self.check(TokenKind::StringLiteral) {
            let module_specifier = self.current().lexeme.clone();
            self.advance();
            self.expect_semicolon()?;
            return Ok(Statement::Import(ImportDeclaration {
                default_import: None,
                namespace_import: None,
                named_imports: &[],
                module_specifier,
                line,
            }));
        }

        let mut default_import = None;
        let mut namespace_import = None;
        let mut named = Vec::new();

        if self.check(TokenKind::Identifier) {
            default_import = Some(self.expect_identifier()?);
            if self.eat(TokenKind::CommaToken) {
                self.parse_import_clause_rest(&mut namespace_import, &mut named)?;
            }
        } else {
            self.parse_import_clause_rest(&mut namespace_import, &mut named)?;
        }

        self.expect(TokenKind::FromKeyword)?;
        if !self.check(TokenKind::StringLiteral) {
            return Err(self.syntax_error("Module specifier string"));
        }
        let module_specifier = self.current().lexeme.clone();
        self.advance();
        self.expect_semicolon()?;

        Ok(Statement::Import(ImportDeclaration {
            default_import,
            namespace_import,
            named_imports: self.alloc_slice(named),
            module_specifier,
            line,
        }))
    }

    fn parse_import_clause_rest(
        &mut self,
        namespace_import: &mut Option<String>,
        named: &mut Vec<ImportSpecifier>,
    ) -> ParseResult<()> {
        if self.eat(TokenKind::AsteriskToken) {
            self.expect(TokenKind::AsKeyword)?;
            *namespace_import = Some(self.expect_identifier()?);
            return Ok(());
        }
        self.expect(TokenKind::OpenBraceToken)?;
        while !self.check(TokenKind::CloseBraceToken) {
            let name = self.expect_identifier_name()?;
            let alias = if self.eat(TokenKind::AsKeyword) {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            named.push(ImportSpecifier { name, alias });
            if !self.eat(TokenKind::CommaToken) {
                break;
            }
        }
        self.expect(TokenKind::CloseBraceToken)?;
        Ok(())
    }

    fn parse_export_declaration(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        self.expect(TokenKind::ExportKeyword)?;

        if self.eat(TokenKind::DefaultKeyword) {
            let expression = self.parse_assignment_expression_and_alloc()?;
            self.expect_semicolon()?;
            return Ok(Statement::Export(ExportDeclaration {
                kind: ExportKind::Default(expression),
                line,
            }));
        }

        if self.eat(TokenKind::OpenBraceToken) {
            let mut specifiers = Vec::new();
            while !self.check(TokenKind::CloseBraceToken) {
                let name = self.expect_identifier_name()?;
                let alias = if self.eat(TokenKind::AsKeyword) {
                    Some(self.expect_identifier_name()?)
                } else {
                    None
                };
                specifiers.push(ExportSpecifier { name, alias });
                if !self.eat(TokenKind::CommaToken) {
                    break;
                }
            }
            self.expect(TokenKind::CloseBraceToken)?;
            self.expect_semicolon()?;
            return Ok(Statement::Export(ExportDeclaration {
                kind: ExportKind::Named(self.alloc_slice(specifiers)),
                line,
            }));
        }

        let declaration = self.parse_statement()?;
        let declaration = self.alloc(declaration);
        Ok(Statement::Export(ExportDeclaration {
            kind: ExportKind::Declaration(declaration),
            line,
        }))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement<'a>> {
        let line = self.line();
        let expression = self.parse_expression_and_alloc()?;
        self.expect_semicolon()?;
        Ok(Statement::Expression(ExpressionStatement { expression, line }))
    }

    fn parse_statement_and_alloc(&mut self) -> ParseResult<&'a Statement<'a>> {
        let statement = self.parse_statement()?;
        Ok(self.alloc(statement))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression_and_alloc(&mut self) -> ParseResult<&'a Expression<'a>> {
        let expression = self.parse_expression()?;
        Ok(self.alloc(expression))
    }

    fn parse_assignment_expression_and_alloc(&mut self) -> ParseResult<&'a Expression<'a>> {
        let expression = self.parse_assignment_expression()?;
        Ok(self.alloc(expression))
    }

    fn parse_expression(&mut self) -> ParseResult<Expression<'a>> {
        self.parse_assignment_expression()
    }

    fn parse_assignment_expression(&mut self) -> ParseResult<Expression<'a>> {
        // Arrow functions first; `(` may instead open a parenthesized
        // expression, resolved by speculation.
        if self.check(TokenKind::Identifier)
            && self.current().lexeme == "async"
            && ((self.peek_kind(1) == TokenKind::Identifier
                && self.peek_kind(2) == TokenKind::EqualsGreaterThanToken)
                || self.peek_kind(1) == TokenKind::OpenParenToken)
        {
            if let Some(arrow) = self.try_parse(|p| {
                p.advance(); // async
                p.parse_arrow_function(true)
            }) {
                return Ok(arrow);
            }
        }
        if self.check(TokenKind::Identifier)
            && self.peek_kind(1) == TokenKind::EqualsGreaterThanToken
        {
            return self.parse_simple_arrow_function(false);
        }
        if self.check(TokenKind::OpenParenToken) {
            if let Some(arrow) = self.try_parse(|p| p.parse_arrow_function(false)) {
                return Ok(arrow);
            }
        }

        if self.check(TokenKind::YieldKeyword) {
            return self.parse_yield_expression();
        }

        let expression = self.parse_conditional_expression()?;

        if self.kind().is_assignment_operator() {
            let line = expression.line();
            let operator = self.kind();
            self.advance();
            let value = self.parse_assignment_expression()?;
            let target = self.alloc(expression);
            let value = self.alloc(value);
            return Ok(Expression::Assignment(AssignmentExpression {
                operator,
                target,
                value,
                line,
            }));
        }

        Ok(expression)
    }

    /// `x => body` — a single unparenthesized parameter.
    fn parse_simple_arrow_function(&mut self, is_async: bool) -> ParseResult<Expression<'a>> {
        let line = self.line();
        let param_line = self.line();
        let name = self.expect_identifier()?;
        let parameter = Parameter {
            name,
            type_annotation: None,
            initializer: None,
            optional: false,
            is_rest: false,
            line: param_line,
        };
        self.expect(TokenKind::EqualsGreaterThanToken)?;
        let body = self.parse_arrow_body()?;
        Ok(Expression::Arrow(ArrowFunction {
            parameters: self.alloc_slice(vec![parameter]),
            return_type: None,
            body,
            is_async,
            line,
        }))
    }

    /// `(params) [: type] => body`. Raises on mismatch so the caller's
    /// speculation can fall back to a parenthesized expression.
    fn parse_arrow_function(&mut self, is_async: bool) -> ParseResult<Expression<'a>> {
        let line = self.line();
        if self.check(TokenKind::Identifier) {
            return self.parse_simple_arrow_function(is_async);
        }
        let parameters = self.parse_parameter_list()?;
        let return_type = if self.eat(TokenKind::ColonToken) {
            Some(self.parse_type_and_alloc()?)
        } else {
            None
        };
        self.expect(TokenKind::EqualsGreaterThanToken)?;
        let body = self.parse_arrow_body()?;
        Ok(Expression::Arrow(ArrowFunction {
            parameters,
            return_type,
            body,
            is_async,
            line,
        }))
    }

    fn parse_arrow_body(&mut self) -> ParseResult<ArrowBody<'a>> {
        if self.check(TokenKind::OpenBraceToken) {
            Ok(ArrowBody::Block(self.parse_block()?))
        } else {
            Ok(ArrowBody::Expression(
                self.parse_assignment_expression_and_alloc()?,
            ))
        }
    }

    fn parse_yield_expression(&mut self) -> ParseResult<Expression<'a>> {
        let line = self.line();
        self.expect(TokenKind::YieldKeyword)?;
        let delegate = self.eat(TokenKind::AsteriskToken);
        let argument = if matches!(
            self.kind(),
            TokenKind::SemicolonToken
                | TokenKind::CloseParenToken
                | TokenKind::CloseBracketToken
                | TokenKind::CloseBraceToken
                | TokenKind::CommaToken
                | TokenKind::EndOfFileToken
        ) {
            None
        } else {
            Some(self.parse_assignment_expression_and_alloc()?)
        };
        Ok(Expression::Yield(YieldExpression {
            argument,
            delegate,
            line,
        }))
    }

    fn parse_conditional_expression(&mut self) -> ParseResult<Expression<'a>> {
        let condition = self.parse_binary_expression(OperatorPrecedence::LogicalOr as u8)?;
        if !self.check(TokenKind::QuestionToken) {
            return Ok(condition);
        }
        let line = condition.line();
        self.advance();
        let when_true = self.parse_assignment_expression_and_alloc()?;
        self.expect(TokenKind::ColonToken)?;
        let when_false = self.parse_assignment_expression_and_alloc()?;
        let condition = self.alloc(condition);
        Ok(Expression::Conditional(ConditionalExpression {
            condition,
            when_true,
            when_false,
            line,
        }))
    }

    fn parse_binary_expression(&mut self, min_precedence: u8) -> ParseResult<Expression<'a>> {
        let mut left = self.parse_unary_expression()?;
        loop {
            let operator = self.kind();
            let Some(precedence) = binary_operator_precedence(operator) else {
                break;
            };
            if (precedence as u8) < min_precedence {
                break;
            }
            self.advance();
            let next_min = if is_right_associative(operator) {
                precedence as u8
            } else {
                precedence as u8 + 1
            };
            let right = self.parse_binary_expression(next_min)?;
            let line = left.line();
            let left_ref = self.alloc(left);
            let right_ref = self.alloc(right);
            left = if is_logical_operator(operator) {
                Expression::Logical(LogicalExpression {
                    operator,
                    left: left_ref,
                    right: right_ref,
                    line,
                })
            } else {
                Expression::Binary(BinaryExpression {
                    operator,
                    left: left_ref,
                    right: right_ref,
                    line,
                })
            };
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression<'a>> {
        let line = self.line();
        match self.kind() {
            TokenKind::ExclamationToken
            | TokenKind::MinusToken
            | TokenKind::PlusToken
            | TokenKind::TildeToken
            | TokenKind::TypeOfKeyword
            | TokenKind::DeleteKeyword => {
                let operator = self.kind();
                self.advance();
                let operand = self.parse_unary_expression()?;
                let operand = self.alloc(operand);
                Ok(Expression::Unary(UnaryExpression {
                    operator,
                    operand,
                    line,
                }))
            }
            TokenKind::AwaitKeyword => {
                self.advance();
                let expression = self.parse_unary_expression()?;
                let expression = self.alloc(expression);
                Ok(Expression::Await(AwaitExpression { expression, line }))
            }
            TokenKind::PlusPlusToken | TokenKind::MinusMinusToken => {
                let operator = self.kind();
                self.advance();
                let operand = self.parse_unary_expression()?;
                let operand = self.alloc(operand);
                Ok(Expression::Update(UpdateExpression {
                    operator,
                    prefix: true,
                    operand,
                    line,
                }))
            }
            // Prefix type assertion `<T>expr`.
            TokenKind::LessThanToken => {
                self.advance();
                let type_node = self.parse_type_and_alloc()?;
                self.expect_type_list_end()?;
                let expression = self.parse_unary_expression()?;
                let expression = self.alloc(expression);
                Ok(Expression::TypeAssertion(TypeAssertion {
                    type_node,
                    expression,
                    line,
                }))
            }
            _ => self.parse_postfix_expression(),
        }
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<Expression<'a>> {
        let mut expression = self.parse_left_hand_side_expression()?;
        loop {
            match self.kind() {
                TokenKind::PlusPlusToken | TokenKind::MinusMinusToken => {
                    let operator = self.kind();
                    let line = expression.line();
                    self.advance();
                    let operand = self.alloc(expression);
                    expression = Expression::Update(UpdateExpression {
                        operator,
                        prefix: false,
                        operand,
                        line,
                    });
                }
                TokenKind::AsKeyword => {
                    let line = expression.line();
                    self.advance();
                    let type_node = self.parse_type_and_alloc()?;
                    let inner = self.alloc(expression);
                    expression = Expression::As(AsExpression {
                        expression: inner,
                        type_node,
                        line,
                    });
                }
                _ => break,
            }
        }
        Ok(expression)
    }

    fn parse_left_hand_side_expression(&mut self) -> ParseResult<Expression<'a>> {
        let base = if self.check(TokenKind::NewKeyword) {
            self.parse_new_expression()?
        } else {
            self.parse_primary_expression()?
        };
        self.parse_call_and_member_suffixes(base)
    }

    fn parse_new_expression(&mut self) -> ParseResult<Expression<'a>> {
        let line = self.line();
        self.expect(TokenKind::NewKeyword)?;
        let mut callee = self.parse_primary_expression()?;

        // Member chain of the constructed expression, but no call suffixes:
        // those belong to the `new` itself.
        loop {
            match self.kind() {
                TokenKind::DotToken => {
                    let member_line = callee.line();
                    self.advance();
                    let property = self.expect_identifier_name()?;
                    let object = self.alloc(callee);
                    callee = Expression::Member(MemberExpression {
                        object,
                        property,
                        optional: false,
                        line: member_line,
                    });
                }
                _ => break,
            }
        }

        let type_arguments = if self.check(TokenKind::LessThanToken) {
            self.try_parse(|p| {
                p.advance();
                let args = p.parse_type_argument_list()?;
                if !p.check(TokenKind::OpenParenToken) {
                    return Err(p.syntax_error("'('"));
                }
                Ok(args)
            })
        } else {
            None
        };

        let arguments = if self.check(TokenKind::OpenParenToken) {
            self.parse_argument_list()?
        } else {
            &[]
        };

        let callee = self.alloc(callee);
        Ok(Expression::New(NewExpression {
            callee,
            type_arguments,
            arguments,
            line,
        }))
    }

    fn parse_call_and_member_suffixes(
        &mut self,
        mut expression: Expression<'a>,
    ) -> ParseResult<Expression<'a>> {
        loop {
            match self.kind() {
                TokenKind::DotToken => {
                    let line = expression.line();
                    self.advance();
                    let property = self.expect_identifier_name()?;
                    let object = self.alloc(expression);
                    expression = Expression::Member(MemberExpression {
                        object,
                        property,
                        optional: false,
                        line,
                    });
                }
                TokenKind::QuestionDotToken => {
                    let line = expression.line();
                    self.advance();
                    if self.check(TokenKind::OpenParenToken) {
                        let arguments = self.parse_argument_list()?;
                        let callee = self.alloc(expression);
                        expression = Expression::Call(CallExpression {
                            callee,
                            type_arguments: None,
                            arguments,
                            optional: true,
                            line,
                        });
                    } else if self.eat(TokenKind::OpenBracketToken) {
                        let index = self.parse_expression_and_alloc()?;
                        self.expect(TokenKind::CloseBracketToken)?;
                        let object = self.alloc(expression);
                        expression = Expression::Index(IndexExpression {
                            object,
                            index,
                            optional: true,
                            line,
                        });
                    } else {
                        let property = self.expect_identifier_name()?;
                        let object = self.alloc(expression);
                        expression = Expression::Member(MemberExpression {
                            object,
                            property,
                            optional: true,
                            line,
                        });
                    }
                }
                TokenKind::OpenParenToken => {
                    let line = expression.line();
                    let arguments = self.parse_argument_list()?;
                    let callee = self.alloc(expression);
                    expression = Expression::Call(CallExpression {
                        callee,
                        type_arguments: None,
                        arguments,
                        optional: false,
                        line,
                    });
                }
                TokenKind::OpenBracketToken => {
                    let line = expression.line();
                    self.advance();
                    let index = self.parse_expression_and_alloc()?;
                    self.expect(TokenKind::CloseBracketToken)?;
                    let object = self.alloc(expression);
                    expression = Expression::Index(IndexExpression {
                        object,
                        index,
                        optional: false,
                        line,
                    });
                }
                TokenKind::ExclamationToken => {
                    let line = expression.line();
                    self.advance();
                    let inner = self.alloc(expression);
                    expression = Expression::NonNull(NonNullExpression {
                        expression: inner,
                        line,
                    });
                }
                // `<` after a callable may open a call-site type-argument
                // list or be the less-than operator; speculate.
                TokenKind::LessThanToken => {
                    let call = self.try_parse(|p| {
                        let line = p.line();
                        p.advance();
                        let type_arguments = p.parse_type_argument_list()?;
                        if !p.check(TokenKind::OpenParenToken) {
                            return Err(p.syntax_error("'('"));
                        }
                        let arguments = p.parse_argument_list()?;
                        Ok((type_arguments, arguments, line))
                    });
                    match call {
                        Some((type_arguments, arguments, line)) => {
                            let callee = self.alloc(expression);
                            expression = Expression::Call(CallExpression {
                                callee,
                                type_arguments: Some(type_arguments),
                                arguments,
                                optional: false,
                                line,
                            });
                        }
                        None => break,
                    }
                }
                TokenKind::TemplateLiteral | TokenKind::TemplateHead => {
                    let line = expression.line();
                    let template = self.parse_template_literal()?;
                    let tag = self.alloc(expression);
                    expression = Expression::TaggedTemplate(TaggedTemplate {
                        tag,
                        template,
                        line,
                    });
                }
                _ => break,
            }
        }
        Ok(expression)
    }

    fn parse_argument_list(&mut self) -> ParseResult<&'a [Expression<'a>]> {
        self.expect(TokenKind::OpenParenToken)?;
        let mut arguments = Vec::new();
        while !self.check(TokenKind::CloseParenToken) {
            if self.check(TokenKind::DotDotDotToken) {
                let line = self.line();
                self.advance();
                let inner = self.parse_assignment_expression_and_alloc()?;
                arguments.push(Expression::Spread(SpreadElement {
                    expression: inner,
                    line,
                }));
            } else {
                arguments.push(self.parse_assignment_expression()?);
            }
            if !self.eat(TokenKind::CommaToken) {
                break;
            }
        }
        self.expect(TokenKind::CloseParenToken)?;
        Ok(self.alloc_slice(arguments))
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expression<'a>> {
        let line = self.line();
        match self.kind() {
            TokenKind::NumericLiteral => {
                let raw = self.current().lexeme.clone();
                let value = numeric_value(&raw);
                self.advance();
                Ok(Expression::NumericLiteral(NumericLiteral { raw, value, line }))
            }
            TokenKind::BigIntLiteral => {
                let raw = self.current().lexeme.clone();
                self.advance();
                Ok(Expression::BigIntLiteral(BigIntLiteral { raw, line }))
            }
            TokenKind::StringLiteral => {
                let value = self.current().lexeme.clone();
                self.advance();
                Ok(Expression::StringLiteral(StringLiteral { value, line }))
            }
            TokenKind::TemplateLiteral | TokenKind::TemplateHead => {
                let template = self.parse_template_literal()?;
                Ok(Expression::Template(template))
            }
            TokenKind::TrueKeyword => {
                self.advance();
                Ok(Expression::BooleanLiteral(BooleanLiteral { value: true, line }))
            }
            TokenKind::FalseKeyword => {
                self.advance();
                Ok(Expression::BooleanLiteral(BooleanLiteral {
                    value: false,
                    line,
                }))
            }
            TokenKind::NullKeyword => {
                self.advance();
                Ok(Expression::NullLiteral(NullLiteral { line }))
            }
            TokenKind::UndefinedKeyword => {
                self.advance();
                Ok(Expression::UndefinedLiteral(UndefinedLiteral { line }))
            }
            TokenKind::ThisKeyword => {
                self.advance();
                Ok(Expression::This(ThisExpression { line }))
            }
            TokenKind::SuperKeyword => {
                self.advance();
                Ok(Expression::Super(SuperExpression { line }))
            }
            TokenKind::Identifier => {
                if self.current().lexeme == "async"
                    && self.peek_kind(1) == TokenKind::FunctionKeyword
                {
                    self.advance();
                    return self.parse_function_expression(true);
                }
                let name = self.current().lexeme.clone();
                self.advance();
                Ok(Expression::Identifier(Identifier { name, line }))
            }
            TokenKind::FunctionKeyword => self.parse_function_expression(false),
            TokenKind::ClassKeyword | TokenKind::AbstractKeyword => {
                let class_decl = self.parse_class(&[], false)?;
                let declaration = self.alloc(class_decl);
                Ok(Expression::ClassExpr(ClassExpression { declaration, line }))
            }
            TokenKind::OpenParenToken => {
                self.advance();
                let expression = self.parse_expression_and_alloc()?;
                self.expect(TokenKind::CloseParenToken)?;
                Ok(Expression::Parenthesized(ParenthesizedExpression {
                    expression,
                    line,
                }))
            }
            TokenKind::OpenBracketToken => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(TokenKind::CloseBracketToken) {
                    if self.check(TokenKind::DotDotDotToken) {
                        let spread_line = self.line();
                        self.advance();
                        let inner = self.parse_assignment_expression_and_alloc()?;
                        elements.push(Expression::Spread(SpreadElement {
                            expression: inner,
                            line: spread_line,
                        }));
                    } else {
                        elements.push(self.parse_assignment_expression()?);
                    }
                    if !self.eat(TokenKind::CommaToken) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseBracketToken)?;
                Ok(Expression::ArrayLiteral(ArrayLiteral {
                    elements: self.alloc_slice(elements),
                    line,
                }))
            }
            TokenKind::OpenBraceToken => self.parse_object_literal(),
            _ => Err(self.syntax_error("Expression")),
        }
    }

    fn parse_function_expression(&mut self, is_async: bool) -> ParseResult<Expression<'a>> {
        let line = self.line();
        self.expect(TokenKind::FunctionKeyword)?;
        let is_generator = self.eat(TokenKind::AsteriskToken);
        let name = if self.check(TokenKind::Identifier) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let parameters = self.parse_parameter_list()?;
        let return_type = if self.eat(TokenKind::ColonToken) {
            Some(self.parse_type_and_alloc()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Expression::FunctionExpr(FunctionExpression {
            name,
            parameters,
            return_type,
            body,
            is_async,
            is_generator,
            line,
        }))
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expression<'a>> {
        let line = self.line();
        self.expect(TokenKind::OpenBraceToken)?;
        let mut properties = Vec::new();
        while !self.check(TokenKind::CloseBraceToken) {
            let property_line = self.line();
            let key = match self.kind() {
                TokenKind::StringLiteral | TokenKind::NumericLiteral => {
                    let key = self.current().lexeme.clone();
                    self.advance();
                    key
                }
                _ => self.expect_identifier_name()?,
            };
            let value = if self.eat(TokenKind::ColonToken) {
                Some(self.parse_assignment_expression_and_alloc()?)
            } else {
                // Shorthand property `{ name }`.
                None
            };
            properties.push(ObjectProperty {
                key,
                value,
                line: property_line,
            });
            if !self.eat(TokenKind::CommaToken) {
                break;
            }
        }
        self.expect(TokenKind::CloseBraceToken)?;
        Ok(Expression::ObjectLiteral(ObjectLiteral {
            properties: self.alloc_slice(properties),
            line,
        }))
    }

    fn parse_template_literal(&mut self) -> ParseResult<TemplateLiteral<'a>> {
        let line = self.line();
        if self.check(TokenKind::TemplateLiteral) {
            let quasi = self.current().lexeme.clone();
            self.advance();
            return Ok(TemplateLiteral {
                quasis: self.alloc_slice(vec![quasi]),
                expressions: &[],
                line,
            });
        }

        if !self.check(TokenKind::TemplateHead) {
            return Err(self.syntax_error("Template literal"));
        }
        let mut quasis = vec![self.current().lexeme.clone()];
        let mut expressions = Vec::new();
        self.advance();

        loop {
            expressions.push(self.parse_expression()?);
            match self.kind() {
                TokenKind::TemplateMiddle => {
                    quasis.push(self.current().lexeme.clone());
                    self.advance();
                }
                TokenKind::TemplateTail => {
                    quasis.push(self.current().lexeme.clone());
                    self.advance();
                    break;
                }
                _ => return Err(self.syntax_error("'}' closing the template substitution")),
            }
        }

        Ok(TemplateLiteral {
            quasis: self.alloc_slice(quasis),
            expressions: self.alloc_slice(expressions),
            line,
        })
    }

    // ========================================================================
    // Type expressions
    // ========================================================================

    fn parse_type_and_alloc(&mut self) -> ParseResult<&'a TypeNode<'a>> {
        let type_node = self.parse_type()?;
        Ok(self.alloc(type_node))
    }

    /// Union (lowest) → intersection → postfix → primary; an `extends`
    /// after the parsed type begins a conditional type.
    fn parse_type(&mut self) -> ParseResult<TypeNode<'a>> {
        let checked = self.parse_union_type()?;
        if !self.check(TokenKind::ExtendsKeyword) {
            return Ok(checked);
        }
        let line = checked.line();
        self.advance();
        let extends_type = self.parse_union_type()?;
        self.expect(TokenKind::QuestionToken)?;
        let true_type = self.parse_type_and_alloc()?;
        self.expect(TokenKind::ColonToken)?;
        let false_type = self.parse_type_and_alloc()?;
        let check_type = self.alloc(checked);
        let extends_type = self.alloc(extends_type);
        Ok(TypeNode::Conditional(ConditionalType {
            check_type,
            extends_type,
            true_type,
            false_type,
            line,
        }))
    }

    fn parse_union_type(&mut self) -> ParseResult<TypeNode<'a>> {
        // A leading `|` is permitted before the first constituent.
        self.eat(TokenKind::BarToken);
        let first = self.parse_intersection_type()?;
        if !self.check(TokenKind::BarToken) {
            return Ok(first);
        }
        let line = first.line();
        let mut types = vec![first];
        while self.eat(TokenKind::BarToken) {
            types.push(self.parse_intersection_type()?);
        }
        Ok(TypeNode::Union(UnionType {
            types: self.alloc_slice(types),
            line,
        }))
    }

    fn parse_intersection_type(&mut self) -> ParseResult<TypeNode<'a>> {
        let first = self.parse_postfix_type()?;
        if !self.check(TokenKind::AmpersandToken) {
            return Ok(first);
        }
        let line = first.line();
        let mut types = vec![first];
        while self.eat(TokenKind::AmpersandToken) {
            types.push(self.parse_postfix_type()?);
        }
        Ok(TypeNode::Intersection(IntersectionType {
            types: self.alloc_slice(types),
            line,
        }))
    }

    /// `T[]` array shorthand and `T[K]` indexed access.
    fn parse_postfix_type(&mut self) -> ParseResult<TypeNode<'a>> {
        let mut type_node = self.parse_primary_type()?;
        while self.check(TokenKind::OpenBracketToken) {
            let line = type_node.line();
            self.advance();
            if self.eat(TokenKind::CloseBracketToken) {
                let element_type = self.alloc(type_node);
                type_node = TypeNode::Array(ArrayType { element_type, line });
            } else {
                let index_type = self.parse_type_and_alloc()?;
                self.expect(TokenKind::CloseBracketToken)?;
                let object_type = self.alloc(type_node);
                type_node = TypeNode::IndexedAccess(IndexedAccessType {
                    object_type,
                    index_type,
                    line,
                });
            }
        }
        Ok(type_node)
    }

    fn parse_primary_type(&mut self) -> ParseResult<TypeNode<'a>> {
        let line = self.line();
        match self.kind() {
            TokenKind::OpenParenToken => self.parse_parenthesized_or_function_type(),
            TokenKind::OpenBracketToken => self.parse_tuple_type(),
            TokenKind::OpenBraceToken => self.parse_object_or_mapped_type(),
            TokenKind::StringLiteral => {
                let value = self.current().lexeme.clone();
                self.advance();
                Ok(TypeNode::Literal(LiteralType {
                    value: LiteralValue::String(value),
                    line,
                }))
            }
            TokenKind::NumericLiteral => {
                let value = numeric_value(&self.current().lexeme);
                self.advance();
                Ok(TypeNode::Literal(LiteralType {
                    value: LiteralValue::Number(value),
                    line,
                }))
            }
            TokenKind::TrueKeyword | TokenKind::FalseKeyword => {
                let value = self.check(TokenKind::TrueKeyword);
                self.advance();
                Ok(TypeNode::Literal(LiteralType {
                    value: LiteralValue::Boolean(value),
                    line,
                }))
            }
            TokenKind::TypeOfKeyword => {
                self.advance();
                let name = self.expect_identifier()?;
                Ok(TypeNode::Query(TypeQuery { name, line }))
            }
            TokenKind::KeyOfKeyword => {
                self.advance();
                let type_node = self.parse_postfix_type()?;
                let type_node = self.alloc(type_node);
                Ok(TypeNode::Operator(TypeOperator {
                    operator: TokenKind::KeyOfKeyword,
                    type_node,
                    line,
                }))
            }
            TokenKind::InferKeyword => {
                self.advance();
                let name = self.expect_identifier()?;
                Ok(TypeNode::Infer(InferType { name, line }))
            }
            kind if kind.is_type_name() => {
                self.advance();
                Ok(TypeNode::Keyword(KeywordType { kind, line }))
            }
            TokenKind::Identifier => {
                let name = self.current().lexeme.clone();
                self.advance();
                let type_arguments = if self.check(TokenKind::LessThanToken) {
                    self.advance();
                    Some(self.parse_type_argument_list()?)
                } else {
                    None
                };
                Ok(TypeNode::Reference(TypeReference {
                    name,
                    type_arguments,
                    line,
                }))
            }
            _ => Err(self.syntax_error("Type")),
        }
    }

    /// Parse `T, U, …` then the closing `>` (splitting `>>` as needed).
    fn parse_type_argument_list(&mut self) -> ParseResult<&'a [TypeNode<'a>]> {
        let mut arguments = Vec::new();
        loop {
            arguments.push(self.parse_type()?);
            if !self.eat(TokenKind::CommaToken) {
                break;
            }
        }
        self.expect_type_list_end()?;
        Ok(self.alloc_slice(arguments))
    }

    /// `(` opens either a function type `(a: T) => R` or a parenthesized
    /// type `(T)`. Decided by scanning ahead in the read-only token vector
    /// for `=>` after the matching `)`.
    fn parse_parenthesized_or_function_type(&mut self) -> ParseResult<TypeNode<'a>> {
        let line = self.line();
        if self.is_function_type_start() {
            let parameters = self.parse_parameter_list()?;
            self.expect(TokenKind::EqualsGreaterThanToken)?;
            let return_type = self.parse_type_and_alloc()?;
            return Ok(TypeNode::Function(FunctionType {
                parameters,
                return_type,
                line,
            }));
        }
        self.expect(TokenKind::OpenParenToken)?;
        let type_node = self.parse_type_and_alloc()?;
        self.expect(TokenKind::CloseParenToken)?;
        Ok(TypeNode::Parenthesized(ParenthesizedType { type_node, line }))
    }

    /// Whether the `(` at the cursor opens a function type: scan to the
    /// matching `)` and look for `=>`. A rest parameter decides immediately.
    fn is_function_type_start(&self) -> bool {
        if self.peek_kind(1) == TokenKind::DotDotDotToken {
            return true;
        }
        let mut depth = 1usize;
        let mut offset = 1usize;
        loop {
            match self.peek_kind(offset) {
                TokenKind::OpenParenToken => depth += 1,
                TokenKind::CloseParenToken => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_kind(offset + 1) == TokenKind::EqualsGreaterThanToken;
                    }
                }
                TokenKind::EndOfFileToken => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    fn parse_tuple_type(&mut self) -> ParseResult<TypeNode<'a>> {
        let line = self.line();
        self.expect(TokenKind::OpenBracketToken)?;
        let mut elements = Vec::new();
        while !self.check(TokenKind::CloseBracketToken) {
            let element_line = self.line();
            if self.eat(TokenKind::DotDotDotToken) {
                let type_node = self.parse_type_and_alloc()?;
                elements.push(TypeNode::Rest(RestType {
                    type_node,
                    line: element_line,
                }));
            } else {
                let element = self.parse_type()?;
                if self.eat(TokenKind::QuestionToken) {
                    let type_node = self.alloc(element);
                    elements.push(TypeNode::Optional(OptionalType {
                        type_node,
                        line: element_line,
                    }));
                } else {
                    elements.push(element);
                }
            }
            if !self.eat(TokenKind::CommaToken) {
                break;
            }
        }
        self.expect(TokenKind::CloseBracketToken)?;
        Ok(TypeNode::Tuple(TupleType {
            elements: self.alloc_slice(elements),
            line,
        }))
    }

    fn parse_object_or_mapped_type(&mut self) -> ParseResult<TypeNode<'a>> {
        let line = self.line();
        self.expect(TokenKind::OpenBraceToken)?;

        if self.is_mapped_type_start() {
            let readonly = self.eat(TokenKind::ReadonlyKeyword);
            self.expect(TokenKind::OpenBracketToken)?;
            let parameter = self.expect_identifier()?;
            self.expect(TokenKind::InKeyword)?;
            let constraint = self.parse_type_and_alloc()?;
            self.expect(TokenKind::CloseBracketToken)?;
            let optional = self.eat(TokenKind::QuestionToken);
            let value_type = if self.eat(TokenKind::ColonToken) {
                Some(self.parse_type_and_alloc()?)
            } else {
                None
            };
            self.eat(TokenKind::SemicolonToken);
            self.expect(TokenKind::CloseBraceToken)?;
            return Ok(TypeNode::Mapped(MappedType {
                parameter,
                constraint,
                value_type,
                optional,
                readonly,
                line,
            }));
        }

        let members = self.parse_type_member_list()?;
        self.expect(TokenKind::CloseBraceToken)?;
        Ok(TypeNode::Object(ObjectType { members, line }))
    }

    /// After `{`: `[K in …` or `readonly [K in …` begins a mapped type.
    fn is_mapped_type_start(&self) -> bool {
        let offset = if self.check(TokenKind::ReadonlyKeyword) { 1 } else { 0 };
        self.peek_kind(offset) == TokenKind::OpenBracketToken
            && self.peek_kind(offset + 1) == TokenKind::Identifier
            && self.peek_kind(offset + 2) == TokenKind::InKeyword
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detype_lexer::tokenize;

    fn parse_source(source: &str) -> usize {
        let arena = Bump::new();
        let tokens = tokenize(source).unwrap();
        let program = parse(&arena, tokens).unwrap();
        program.statements.len()
    }

    fn parse_err(source: &str) -> CompileError {
        let arena = Bump::new();
        let tokens = tokenize(source).unwrap();
        parse(&arena, tokens).unwrap_err()
    }

    #[test]
    fn test_parse_variable_statement() {
        assert_eq!(parse_source("let x: number = 42;"), 1);
    }

    #[test]
    fn test_parse_arrow_vs_parenthesized() {
        assert_eq!(parse_source("let f = (a, b) => a + b;"), 1);
        assert_eq!(parse_source("let v = (a);"), 1);
        assert_eq!(parse_source("let g = () => 1;"), 1);
    }

    #[test]
    fn test_parse_type_argument_call_vs_less_than() {
        assert_eq!(parse_source("foo<number>(1);"), 1);
        assert_eq!(parse_source("let r = a < b;"), 1);
    }

    #[test]
    fn test_nested_generic_close() {
        assert_eq!(parse_source("let m: Map<string, Array<number>> = x;"), 1);
    }

    #[test]
    fn test_expression_statement_requires_semicolon() {
        let err = parse_err("foo()");
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn test_decorator_before_non_class_is_error() {
        let err = parse_err("@dec function f() {}");
        assert!(matches!(err, CompileError::Syntax { .. }));
    }
}
