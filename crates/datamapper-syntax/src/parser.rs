//! Recursive-descent parser.
//!
//! Covers the module-level declarations a data mapping function depends on
//! (imports, type definitions, enums, module variables, functions) and the
//! full expression language of expression-bodied functions, including query
//! expressions. Statement blocks are skipped as opaque bodies.

use crate::kind::{BinaryOp, LiteralKind, SyntaxKind, Token, TypeDescKind};
use crate::lexer::{Lexeme, LexemeKind, Lexer};
use crate::position::TextSpan;
use crate::tree::{SyntaxNodeId, SyntaxTree, SyntaxTreeBuilder};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {}", span.start)]
pub struct ParseError {
    pub message: String,
    pub span: TextSpan,
}

const BUILTIN_TYPES: &[&str] = &[
    "string", "int", "float", "decimal", "boolean", "byte", "json", "xml", "anydata", "any",
    "error", "readonly", "never",
];

/// Words that end an expression instead of starting a name reference.
const EXPRESSION_STOP_WORDS: &[&str] = &[
    "from", "let", "in", "select", "collect", "where", "join", "on", "equals", "limit", "order",
    "by",
];

/// Parse a complete source file.
pub fn parse(source: &str) -> Result<SyntaxTree, ParseError> {
    let lexemes = Lexer::new(source).tokenize();
    let mut parser = Parser {
        lexemes,
        pos: 0,
        builder: SyntaxTree::builder(source),
        len: source.len() as u32,
    };
    let root = parser.source_file()?;
    Ok(parser.builder.finish(root))
}

type ParseResult<T> = Result<T, ParseError>;

struct Parser<'a> {
    lexemes: Vec<Lexeme<'a>>,
    pos: usize,
    builder: SyntaxTreeBuilder,
    len: u32,
}

impl<'a> Parser<'a> {
    // ========================================================================
    // Cursor
    // ========================================================================

    fn peek(&self) -> Lexeme<'a> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Lexeme<'a> {
        let last = self.lexemes.len() - 1;
        self.lexemes[(self.pos + n).min(last)]
    }

    fn bump(&mut self) -> Lexeme<'a> {
        let lexeme = self.peek();
        if lexeme.kind != LexemeKind::Eof {
            self.pos += 1;
        }
        lexeme
    }

    fn at(&self, text: &str) -> bool {
        let lexeme = self.peek();
        matches!(lexeme.kind, LexemeKind::Punct | LexemeKind::Ident) && lexeme.text == text
    }

    fn nth_at(&self, n: usize, text: &str) -> bool {
        let lexeme = self.peek_nth(n);
        matches!(lexeme.kind, LexemeKind::Punct | LexemeKind::Ident) && lexeme.text == text
    }

    fn eat(&mut self, text: &str) -> Option<Lexeme<'a>> {
        self.at(text).then(|| self.bump())
    }

    fn expect(&mut self, text: &str) -> ParseResult<Lexeme<'a>> {
        self.eat(text)
            .ok_or_else(|| self.error(format!("expected `{text}`")))
    }

    fn expect_ident(&mut self) -> ParseResult<Token> {
        let lexeme = self.peek();
        if lexeme.kind != LexemeKind::Ident {
            return Err(self.error("expected identifier"));
        }
        self.bump();
        Ok(token(lexeme))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let lexeme = self.peek();
        let found = if lexeme.kind == LexemeKind::Eof {
            "end of input".to_string()
        } else {
            format!("`{}`", lexeme.text)
        };
        ParseError {
            message: format!("{}, found {found}", message.into()),
            span: lexeme.span,
        }
    }

    fn start(&self) -> u32 {
        self.peek().span.start
    }

    /// End of the last consumed lexeme.
    fn prev_end(&self) -> u32 {
        match self.pos.checked_sub(1) {
            Some(prev) => self.lexemes[prev].span.end,
            None => 0,
        }
    }

    fn finish(&mut self, kind: SyntaxKind, start: u32) -> SyntaxNodeId {
        let span = TextSpan::new(start, self.prev_end().max(start));
        self.builder.alloc(kind, span)
    }

    // ========================================================================
    // Module level
    // ========================================================================

    fn source_file(&mut self) -> ParseResult<SyntaxNodeId> {
        let mut imports = Vec::new();
        while self.at("import") {
            imports.push(self.import_declaration()?);
        }
        let mut members = Vec::new();
        while self.peek().kind != LexemeKind::Eof {
            members.push(self.module_member()?);
        }
        let span = TextSpan::new(0, self.len);
        Ok(self
            .builder
            .alloc(SyntaxKind::SourceFile { imports, members }, span))
    }

    fn import_declaration(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        self.expect("import")?;
        let first = self.expect_ident()?.text;
        let (org, mut module) = if self.eat("/").is_some() {
            (Some(first), vec![self.expect_ident()?.text])
        } else {
            (None, vec![first])
        };
        while self.eat(".").is_some() {
            module.push(self.expect_ident()?.text);
        }
        let prefix = match self.eat("as") {
            Some(_) => Some(self.expect_ident()?.text),
            None => None,
        };
        self.expect(";")?;
        Ok(self.finish(
            SyntaxKind::ImportDeclaration {
                org,
                module,
                prefix,
            },
            start,
        ))
    }

    fn module_member(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        while self.at("public")
            || self.at("isolated")
            || self.at("configurable")
            || self.at("final")
        {
            self.bump();
        }
        if self.at("type") {
            self.bump();
            let name = self.expect_ident()?;
            let descriptor = self.type_desc()?;
            self.expect(";")?;
            return Ok(self.finish(SyntaxKind::TypeDefinition { name, descriptor }, start));
        }
        if self.at("enum") {
            return self.enum_declaration(start);
        }
        if self.at("function") {
            return self.function_definition(start);
        }
        let ty = self.type_desc()?;
        let name = self.expect_ident()?;
        let init = match self.eat("=") {
            Some(_) => Some(self.expression()?),
            None => None,
        };
        self.expect(";")?;
        Ok(self.finish(SyntaxKind::ModuleVarDecl { ty, name, init }, start))
    }

    fn enum_declaration(&mut self, start: u32) -> ParseResult<SyntaxNodeId> {
        self.expect("enum")?;
        let name = self.expect_ident()?;
        self.expect("{")?;
        let mut members = Vec::new();
        while !self.at("}") {
            members.push(self.expect_ident()?);
            if self.eat(",").is_none() {
                break;
            }
        }
        self.expect("}")?;
        self.eat(";");
        Ok(self.finish(SyntaxKind::EnumDeclaration { name, members }, start))
    }

    fn function_definition(&mut self, start: u32) -> ParseResult<SyntaxNodeId> {
        self.expect("function")?;
        let name = self.expect_ident()?;
        self.expect("(")?;
        let mut params = Vec::new();
        while !self.at(")") {
            let param_start = self.start();
            let ty = self.type_desc()?;
            let param_name = self.expect_ident()?;
            params.push(self.finish(
                SyntaxKind::RequiredParam {
                    ty,
                    name: param_name,
                },
                param_start,
            ));
            if self.eat(",").is_none() {
                break;
            }
        }
        self.expect(")")?;
        let return_type = match self.eat("returns") {
            Some(_) => Some(self.type_desc()?),
            None => None,
        };
        let body = self.function_body()?;
        Ok(self.finish(
            SyntaxKind::FunctionDefinition {
                name,
                params,
                return_type,
                body,
            },
            start,
        ))
    }

    fn function_body(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        if self.eat("=>").is_some() {
            let expression = self.expression()?;
            self.expect(";")?;
            return Ok(self.finish(SyntaxKind::ExpressionFunctionBody { expression }, start));
        }
        self.expect("{")?;
        let mut depth = 1usize;
        while depth > 0 {
            let lexeme = self.bump();
            match (lexeme.kind, lexeme.text) {
                (LexemeKind::Eof, _) => return Err(self.error("unterminated function body")),
                (LexemeKind::Punct, "{" | "{|") => depth += 1,
                (LexemeKind::Punct, "}" | "|}") => depth -= 1,
                _ => {}
            }
        }
        Ok(self.finish(SyntaxKind::BlockFunctionBody, start))
    }

    // ========================================================================
    // Type descriptors
    // ========================================================================

    fn type_desc(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let first = self.intersection_type()?;
        if !self.at("|") {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat("|").is_some() {
            members.push(self.intersection_type()?);
        }
        Ok(self.finish(SyntaxKind::TypeDescriptor(TypeDescKind::Union(members)), start))
    }

    fn intersection_type(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let first = self.postfix_type()?;
        if !self.at("&") {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat("&").is_some() {
            members.push(self.postfix_type()?);
        }
        Ok(self.finish(
            SyntaxKind::TypeDescriptor(TypeDescKind::Intersection(members)),
            start,
        ))
    }

    fn postfix_type(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let mut ty = self.primary_type()?;
        loop {
            if self.at("[") && self.nth_at(1, "]") {
                self.bump();
                self.bump();
                ty = self.finish(SyntaxKind::TypeDescriptor(TypeDescKind::Array(ty)), start);
            } else if self.at("?") {
                self.bump();
                ty = self.finish(SyntaxKind::TypeDescriptor(TypeDescKind::Optional(ty)), start);
            } else {
                return Ok(ty);
            }
        }
    }

    fn primary_type(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        if self.at("(") {
            self.bump();
            if self.eat(")").is_some() {
                return Ok(self.finish(
                    SyntaxKind::TypeDescriptor(TypeDescKind::Builtin("()".to_string())),
                    start,
                ));
            }
            let inner = self.type_desc()?;
            self.expect(")")?;
            return Ok(inner);
        }
        if self.at("record") {
            return self.record_type(start);
        }
        if self.at("map") {
            self.bump();
            let constraint = if self.eat("<").is_some() {
                let c = self.type_desc()?;
                self.expect(">")?;
                Some(c)
            } else {
                None
            };
            return Ok(self.finish(
                SyntaxKind::TypeDescriptor(TypeDescKind::Map(constraint)),
                start,
            ));
        }
        let name = self.expect_ident()?;
        let kind = if name.text == "var" {
            TypeDescKind::Var
        } else if BUILTIN_TYPES.contains(&name.text.as_str()) {
            TypeDescKind::Builtin(name.text)
        } else if self.at(":") && self.peek_nth(1).kind == LexemeKind::Ident {
            self.bump();
            let local = self.expect_ident()?;
            TypeDescKind::Named {
                module: Some(name.text),
                name: local.text,
            }
        } else {
            TypeDescKind::Named {
                module: None,
                name: name.text,
            }
        };
        Ok(self.finish(SyntaxKind::TypeDescriptor(kind), start))
    }

    fn record_type(&mut self, start: u32) -> ParseResult<SyntaxNodeId> {
        self.expect("record")?;
        let closed = if self.eat("{|").is_some() {
            true
        } else {
            self.expect("{")?;
            false
        };
        let close = if closed { "|}" } else { "}" };
        let mut fields = Vec::new();
        while !self.at(close) {
            let field_start = self.start();
            let ty = self.type_desc()?;
            let name = self.expect_ident()?;
            let optional = self.eat("?").is_some();
            if self.eat("=").is_some() {
                self.expression()?;
            }
            self.expect(";")?;
            let field = SyntaxKind::RecordFieldDesc { ty, name, optional };
            fields.push(self.finish(field, field_start));
        }
        self.expect(close)?;
        Ok(self.finish(
            SyntaxKind::TypeDescriptor(TypeDescKind::Record { fields, closed }),
            start,
        ))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> ParseResult<SyntaxNodeId> {
        if self.at("let") {
            return self.let_expression();
        }
        if self.at("from") {
            return self.query_expression();
        }
        self.conditional()
    }

    fn conditional(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let condition = self.elvis()?;
        if self.eat("?").is_none() {
            return Ok(condition);
        }
        let then_expr = self.expression()?;
        self.expect(":")?;
        let else_expr = self.expression()?;
        Ok(self.finish(
            SyntaxKind::ConditionalExpression {
                condition,
                then_expr,
                else_expr,
            },
            start,
        ))
    }

    fn elvis(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let lhs = self.binary(0)?;
        if self.eat("?:").is_none() {
            return Ok(lhs);
        }
        let rhs = self.elvis()?;
        Ok(self.finish(SyntaxKind::ElvisExpression { lhs, rhs }, start))
    }

    fn binary(&mut self, min_precedence: u8) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let mut lhs = self.unary()?;
        loop {
            let lexeme = self.peek();
            if lexeme.kind != LexemeKind::Punct {
                return Ok(lhs);
            }
            let Some(op) = BinaryOp::from_token(lexeme.text) else {
                return Ok(lhs);
            };
            if op.precedence() < min_precedence {
                return Ok(lhs);
            }
            let operator = token(self.bump());
            let rhs = self.binary(op.precedence() + 1)?;
            lhs = self.finish(
                SyntaxKind::BinaryExpression {
                    lhs,
                    op,
                    operator,
                    rhs,
                },
                start,
            );
        }
    }

    fn unary(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        if self.at("!") || self.at("-") {
            let operator = token(self.bump());
            let expression = self.unary()?;
            return Ok(self.finish(
                SyntaxKind::UnaryExpression {
                    operator,
                    expression,
                },
                start,
            ));
        }
        if self.at("<") {
            self.bump();
            let ty = self.type_desc()?;
            self.expect(">")?;
            let expression = self.unary()?;
            return Ok(self.finish(SyntaxKind::TypeCast { ty, expression }, start));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let mut expr = self.primary()?;
        loop {
            if self.at(".") || self.at("?.") {
                let optional = self.bump().text == "?.";
                let field = self.expect_ident()?;
                if !optional && self.at("(") {
                    let (args, commas) = self.arguments()?;
                    expr = self.finish(
                        SyntaxKind::MethodCall {
                            expression: expr,
                            name: field,
                            args,
                            commas,
                        },
                        start,
                    );
                } else {
                    expr = self.finish(
                        SyntaxKind::FieldAccess {
                            expression: expr,
                            field,
                            optional,
                        },
                        start,
                    );
                }
            } else if self.at("[") {
                self.bump();
                let key = self.expression()?;
                self.expect("]")?;
                expr = self.finish(
                    SyntaxKind::IndexedExpression {
                        container: expr,
                        key,
                    },
                    start,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let lexeme = self.peek();
        match lexeme.kind {
            LexemeKind::String | LexemeKind::Template => {
                self.bump();
                Ok(self.finish(SyntaxKind::Literal(LiteralKind::String), start))
            }
            LexemeKind::Int => {
                self.bump();
                Ok(self.finish(SyntaxKind::Literal(LiteralKind::Int), start))
            }
            LexemeKind::Float => {
                self.bump();
                Ok(self.finish(SyntaxKind::Literal(LiteralKind::Float), start))
            }
            LexemeKind::QualifiedIdent => {
                self.bump();
                let (module, name) = lexeme.text.split_once(':').unwrap_or(("", lexeme.text));
                let name_start = lexeme.span.start + module.len() as u32 + 1;
                let name = Token::new(name, TextSpan::new(name_start, lexeme.span.end));
                let (args, commas) = self.arguments()?;
                Ok(self.finish(
                    SyntaxKind::FunctionCall {
                        module: Some(module.to_string()),
                        name,
                        args,
                        commas,
                    },
                    start,
                ))
            }
            LexemeKind::Punct => match lexeme.text {
                "{" => self.mapping_constructor(),
                "[" => self.list_constructor(),
                "(" => {
                    self.bump();
                    if self.eat(")").is_some() {
                        return Ok(self.finish(SyntaxKind::Literal(LiteralKind::Nil), start));
                    }
                    let expression = self.expression()?;
                    self.expect(")")?;
                    Ok(self.finish(SyntaxKind::BracedExpression { expression }, start))
                }
                _ => Err(self.error("expected expression")),
            },
            LexemeKind::Ident => self.name_or_call(start, lexeme),
            LexemeKind::Unknown | LexemeKind::Eof => Err(self.error("expected expression")),
        }
    }

    fn name_or_call(&mut self, start: u32, lexeme: Lexeme<'a>) -> ParseResult<SyntaxNodeId> {
        match lexeme.text {
            "true" | "false" => {
                self.bump();
                return Ok(self.finish(SyntaxKind::Literal(LiteralKind::Boolean), start));
            }
            "null" => {
                self.bump();
                return Ok(self.finish(SyntaxKind::Literal(LiteralKind::Nil), start));
            }
            "xml" if self.peek_nth(1).kind == LexemeKind::Template => {
                self.bump();
                self.bump();
                return Ok(self.finish(SyntaxKind::Literal(LiteralKind::String), start));
            }
            "from" => return self.query_expression(),
            "let" => return self.let_expression(),
            text if EXPRESSION_STOP_WORDS.contains(&text) => {
                return Err(self.error("expected expression"));
            }
            _ => {}
        }
        let name = self.expect_ident()?;
        if self.at("(") {
            let (args, commas) = self.arguments()?;
            return Ok(self.finish(
                SyntaxKind::FunctionCall {
                    module: None,
                    name,
                    args,
                    commas,
                },
                start,
            ));
        }
        Ok(self.finish(SyntaxKind::SimpleNameReference { name }, start))
    }

    fn arguments(&mut self) -> ParseResult<(Vec<SyntaxNodeId>, Vec<Token>)> {
        self.expect("(")?;
        let mut args = Vec::new();
        let mut commas = Vec::new();
        while !self.at(")") {
            args.push(self.expression()?);
            match self.eat(",") {
                Some(comma) => commas.push(token(comma)),
                None => break,
            }
        }
        self.expect(")")?;
        Ok((args, commas))
    }

    fn mapping_constructor(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let open_brace = token(self.expect("{")?);
        let mut fields = Vec::new();
        let mut commas = Vec::new();
        while !self.at("}") {
            fields.push(self.specific_field()?);
            match self.eat(",") {
                Some(comma) => commas.push(token(comma)),
                None => break,
            }
        }
        let close_brace = token(self.expect("}")?);
        Ok(self.finish(
            SyntaxKind::MappingConstructor {
                open_brace,
                fields,
                commas,
                close_brace,
            },
            start,
        ))
    }

    fn specific_field(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let lexeme = self.peek();
        if !matches!(lexeme.kind, LexemeKind::Ident | LexemeKind::String) {
            return Err(self.error("expected field name"));
        }
        let name = token(self.bump());
        let Some(colon) = self.eat(":").map(token) else {
            return Ok(self.finish(
                SyntaxKind::SpecificField {
                    name,
                    colon: None,
                    value: None,
                },
                start,
            ));
        };
        let value = if self.at(",") || self.at("}") {
            self.builder
                .alloc(SyntaxKind::Missing, TextSpan::empty(colon.span.end))
        } else {
            self.expression()?
        };
        Ok(self.finish(
            SyntaxKind::SpecificField {
                name,
                colon: Some(colon),
                value: Some(value),
            },
            start,
        ))
    }

    fn list_constructor(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let open_bracket = token(self.expect("[")?);
        let mut elements = Vec::new();
        let mut commas = Vec::new();
        while !self.at("]") {
            elements.push(self.expression()?);
            match self.eat(",") {
                Some(comma) => commas.push(token(comma)),
                None => break,
            }
        }
        let close_bracket = token(self.expect("]")?);
        Ok(self.finish(
            SyntaxKind::ListConstructor {
                open_bracket,
                elements,
                commas,
                close_bracket,
            },
            start,
        ))
    }

    fn let_expression(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        self.expect("let")?;
        let declarations = self.let_var_decls()?;
        self.expect("in")?;
        let body = self.expression()?;
        Ok(self.finish(SyntaxKind::LetExpression { declarations, body }, start))
    }

    fn let_var_decls(&mut self) -> ParseResult<Vec<SyntaxNodeId>> {
        let mut declarations = Vec::new();
        loop {
            let start = self.start();
            let ty = self.type_desc()?;
            let pattern = self.binding_pattern()?;
            self.expect("=")?;
            let init = self.expression()?;
            declarations.push(self.finish(SyntaxKind::LetVarDecl { ty, pattern, init }, start));
            if self.eat(",").is_none() {
                return Ok(declarations);
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn query_expression(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        let from = self.from_clause()?;
        let mut clauses = Vec::new();
        loop {
            let clause_start = self.start();
            if self.eat("join").is_some() {
                let ty = self.type_desc()?;
                let pattern = self.binding_pattern()?;
                self.expect("in")?;
                let expression = self.conditional()?;
                self.expect("on")?;
                let on_lhs = self.conditional()?;
                self.expect("equals")?;
                let on_rhs = self.conditional()?;
                clauses.push(self.finish(
                    SyntaxKind::JoinClause {
                        ty,
                        pattern,
                        expression,
                        on_lhs,
                        on_rhs,
                    },
                    clause_start,
                ));
            } else if self.eat("let").is_some() {
                let declarations = self.let_var_decls()?;
                clauses.push(self.finish(SyntaxKind::LetClause { declarations }, clause_start));
            } else if self.eat("where").is_some() {
                let expression = self.conditional()?;
                clauses.push(self.finish(SyntaxKind::WhereClause { expression }, clause_start));
            } else if self.eat("limit").is_some() {
                let expression = self.conditional()?;
                clauses.push(self.finish(SyntaxKind::LimitClause { expression }, clause_start));
            } else {
                break;
            }
        }
        let result_start = self.start();
        let result = if self.eat("select").is_some() {
            let expression = self.expression()?;
            self.finish(SyntaxKind::SelectClause { expression }, result_start)
        } else if self.eat("collect").is_some() {
            let expression = self.expression()?;
            self.finish(SyntaxKind::CollectClause { expression }, result_start)
        } else {
            return Err(self.error("expected `select` or `collect`"));
        };
        Ok(self.finish(
            SyntaxKind::QueryExpression {
                from,
                clauses,
                result,
            },
            start,
        ))
    }

    fn from_clause(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        self.expect("from")?;
        let ty = self.type_desc()?;
        let pattern = self.binding_pattern()?;
        self.expect("in")?;
        let expression = self.conditional()?;
        Ok(self.finish(
            SyntaxKind::FromClause {
                ty,
                pattern,
                expression,
            },
            start,
        ))
    }

    fn binding_pattern(&mut self) -> ParseResult<SyntaxNodeId> {
        let start = self.start();
        if self.eat("{").is_some() {
            let mut fields = Vec::new();
            while !self.at("}") {
                let field_start = self.start();
                let name = self.expect_ident()?;
                let pattern = match self.eat(":") {
                    Some(_) => Some(self.binding_pattern()?),
                    None => None,
                };
                let field = SyntaxKind::FieldBindingPattern { name, pattern };
                fields.push(self.finish(field, field_start));
                if self.eat(",").is_none() {
                    break;
                }
            }
            self.expect("}")?;
            return Ok(self.finish(SyntaxKind::MappingBindingPattern { fields }, start));
        }
        if self.eat("[").is_some() {
            let mut elements = Vec::new();
            while !self.at("]") {
                elements.push(self.binding_pattern()?);
                if self.eat(",").is_none() {
                    break;
                }
            }
            self.expect("]")?;
            return Ok(self.finish(SyntaxKind::ListBindingPattern { elements }, start));
        }
        if self.eat("_").is_some() {
            return Ok(self.finish(SyntaxKind::WildcardBindingPattern, start));
        }
        let name = self.expect_ident()?;
        Ok(self.finish(SyntaxKind::CaptureBindingPattern { name }, start))
    }
}

fn token(lexeme: Lexeme<'_>) -> Token {
    Token::new(lexeme.text, lexeme.span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_expression(tree: &SyntaxTree) -> SyntaxNodeId {
        tree.descendants(tree.root())
            .into_iter()
            .find_map(|id| match tree.kind(id) {
                SyntaxKind::ExpressionFunctionBody { expression } => Some(*expression),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_parse_function_with_mapping() {
        let source = r#"
type Person record {| string name; int age?; |};

function transform(Person person) returns record {| string name; |} => {name: person.name};
"#;
        let tree = parse(source).unwrap();
        let body = body_expression(&tree);
        assert_eq!(tree.text(body), "{name: person.name}");
        let SyntaxKind::MappingConstructor { fields, .. } = tree.kind(body) else {
            panic!("expected mapping constructor");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(tree.text(fields[0]), "name: person.name");
        assert_eq!(tree.parent(fields[0]), Some(body));
    }

    #[test]
    fn test_parse_missing_value() {
        let tree = parse("function f() returns R => {a: , b: x};").unwrap();
        let body = body_expression(&tree);
        let SyntaxKind::MappingConstructor { fields, .. } = tree.kind(body) else {
            panic!("expected mapping constructor");
        };
        let SyntaxKind::SpecificField { value: Some(value), .. } = tree.kind(fields[0]) else {
            panic!("expected specific field");
        };
        assert_eq!(tree.kind(*value), &SyntaxKind::Missing);
        assert!(tree.position(*value).is_empty());
    }

    #[test]
    fn test_parse_query_expression() {
        let source = "function f(Person[] people) returns R[] => \
                      from var p in people where p.age > 18 select {name: p.name};";
        let tree = parse(source).unwrap();
        let body = body_expression(&tree);
        let SyntaxKind::QueryExpression { clauses, result, .. } = tree.kind(body) else {
            panic!("expected query");
        };
        assert_eq!(clauses.len(), 1);
        assert_eq!(tree.text(*result), "select {name: p.name}");
    }

    #[test]
    fn test_parse_cast_let_and_calls() {
        let source = "function f(json j) returns Dog => \
                      let int n = 1 in <Dog>value:mergeJson(j, {breed: string:trim(j.b)});";
        let tree = parse(source).unwrap();
        let body = body_expression(&tree);
        let SyntaxKind::LetExpression { body: inner, .. } = tree.kind(body) else {
            panic!("expected let");
        };
        let SyntaxKind::TypeCast { expression, .. } = tree.kind(*inner) else {
            panic!("expected cast");
        };
        let SyntaxKind::FunctionCall { module, name, args, .. } = tree.kind(*expression) else {
            panic!("expected call");
        };
        assert_eq!(module.as_deref(), Some("value"));
        assert_eq!(name.text, "mergeJson");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_parse_types_and_imports() {
        let source = r#"
import ballerina/lang.value as v;
enum Color { RED, GREEN }
configurable string prefix = "x";
type Shape Circle|Square?|map<int[]>;
function f() { int x = 1; if x > 0 { x = 2; } }
"#;
        let tree = parse(source).unwrap();
        let SyntaxKind::SourceFile { imports, members } = tree.kind(tree.root()) else {
            panic!("expected source file");
        };
        assert_eq!(imports.len(), 1);
        assert_eq!(members.len(), 4);
        let SyntaxKind::ImportDeclaration { org, module, prefix } = tree.kind(imports[0]) else {
            panic!("expected import");
        };
        assert_eq!(org.as_deref(), Some("ballerina"));
        assert_eq!(module, &vec!["lang".to_string(), "value".to_string()]);
        assert_eq!(prefix.as_deref(), Some("v"));
    }

    #[test]
    fn test_parse_error_reports_location() {
        let err = parse("function f() => {a: b c};").unwrap_err();
        assert_eq!(err.message, "expected `}`, found `c`");
        assert_eq!(err.span, TextSpan::new(22, 23));

        let err = parse("function f() => (1;").unwrap_err();
        assert_eq!(err.message, "expected `)`, found `;`");
    }
}
