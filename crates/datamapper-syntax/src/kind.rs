//! Node kinds.
//!
//! Every node kind the engine inspects is a variant of [`SyntaxKind`]; child
//! nodes are referenced by [`SyntaxNodeId`] into the owning tree.

use crate::position::TextSpan;
use crate::tree::SyntaxNodeId;

/// A token kept on a node because its exact location matters for editing
/// (braces, commas, colons, operators, names).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub span: TextSpan,
}

impl Token {
    pub fn new(text: impl Into<String>, span: TextSpan) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Int,
    Float,
    Boolean,
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_token(text: &str) -> Option<Self> {
        let op = match text {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::LtEq,
            ">=" => BinaryOp::GtEq,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Binding power for precedence climbing. Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

/// Type descriptor syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescKind {
    /// `int`, `string`, `json`, `()`...
    Builtin(String),
    /// `Person` or `types:Person`.
    Named {
        module: Option<String>,
        name: String,
    },
    /// `var` in binding positions.
    Var,
    Array(SyntaxNodeId),
    /// `T?`
    Optional(SyntaxNodeId),
    Union(Vec<SyntaxNodeId>),
    Intersection(Vec<SyntaxNodeId>),
    Map(Option<SyntaxNodeId>),
    /// `record { ... }` or `record {| ... |}`; fields are `RecordFieldDesc` nodes.
    Record {
        fields: Vec<SyntaxNodeId>,
        closed: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxKind {
    // === Module level ===
    SourceFile {
        imports: Vec<SyntaxNodeId>,
        members: Vec<SyntaxNodeId>,
    },
    /// `import org/module.sub as prefix;`
    ImportDeclaration {
        org: Option<String>,
        module: Vec<String>,
        prefix: Option<String>,
    },
    /// `type Name descriptor;`
    TypeDefinition {
        name: Token,
        descriptor: SyntaxNodeId,
    },
    /// `Type name = init;` at module level.
    ModuleVarDecl {
        ty: SyntaxNodeId,
        name: Token,
        init: Option<SyntaxNodeId>,
    },
    EnumDeclaration {
        name: Token,
        members: Vec<Token>,
    },
    FunctionDefinition {
        name: Token,
        params: Vec<SyntaxNodeId>,
        return_type: Option<SyntaxNodeId>,
        body: SyntaxNodeId,
    },
    RequiredParam {
        ty: SyntaxNodeId,
        name: Token,
    },
    /// `=> expression;`
    ExpressionFunctionBody {
        expression: SyntaxNodeId,
    },
    /// `{ ... }` statement block. Kept opaque; only expression bodies are mapped.
    BlockFunctionBody,
    TypeDescriptor(TypeDescKind),
    /// `Type name?;` inside a record descriptor.
    RecordFieldDesc {
        ty: SyntaxNodeId,
        name: Token,
        optional: bool,
    },

    // === Constructors ===
    MappingConstructor {
        open_brace: Token,
        fields: Vec<SyntaxNodeId>,
        commas: Vec<Token>,
        close_brace: Token,
    },
    /// `name: value`. The value is a `Missing` node when nothing follows the colon.
    SpecificField {
        name: Token,
        colon: Option<Token>,
        value: Option<SyntaxNodeId>,
    },
    ListConstructor {
        open_bracket: Token,
        elements: Vec<SyntaxNodeId>,
        commas: Vec<Token>,
        close_bracket: Token,
    },

    // === Expressions ===
    SimpleNameReference {
        name: Token,
    },
    FieldAccess {
        expression: SyntaxNodeId,
        field: Token,
        optional: bool,
    },
    Literal(LiteralKind),
    TypeCast {
        ty: SyntaxNodeId,
        expression: SyntaxNodeId,
    },
    LetExpression {
        declarations: Vec<SyntaxNodeId>,
        body: SyntaxNodeId,
    },
    /// `Type pattern = init` inside `let`.
    LetVarDecl {
        ty: SyntaxNodeId,
        pattern: SyntaxNodeId,
        init: SyntaxNodeId,
    },
    BinaryExpression {
        lhs: SyntaxNodeId,
        op: BinaryOp,
        operator: Token,
        rhs: SyntaxNodeId,
    },
    UnaryExpression {
        operator: Token,
        expression: SyntaxNodeId,
    },
    ConditionalExpression {
        condition: SyntaxNodeId,
        then_expr: SyntaxNodeId,
        else_expr: SyntaxNodeId,
    },
    /// `lhs ?: rhs`
    ElvisExpression {
        lhs: SyntaxNodeId,
        rhs: SyntaxNodeId,
    },
    FunctionCall {
        module: Option<String>,
        name: Token,
        args: Vec<SyntaxNodeId>,
        commas: Vec<Token>,
    },
    MethodCall {
        expression: SyntaxNodeId,
        name: Token,
        args: Vec<SyntaxNodeId>,
        commas: Vec<Token>,
    },
    IndexedExpression {
        container: SyntaxNodeId,
        key: SyntaxNodeId,
    },
    BracedExpression {
        expression: SyntaxNodeId,
    },
    /// Placeholder for an expression the source does not contain yet.
    Missing,

    // === Query ===
    QueryExpression {
        from: SyntaxNodeId,
        clauses: Vec<SyntaxNodeId>,
        result: SyntaxNodeId,
    },
    FromClause {
        ty: SyntaxNodeId,
        pattern: SyntaxNodeId,
        expression: SyntaxNodeId,
    },
    JoinClause {
        ty: SyntaxNodeId,
        pattern: SyntaxNodeId,
        expression: SyntaxNodeId,
        on_lhs: SyntaxNodeId,
        on_rhs: SyntaxNodeId,
    },
    LetClause {
        declarations: Vec<SyntaxNodeId>,
    },
    WhereClause {
        expression: SyntaxNodeId,
    },
    LimitClause {
        expression: SyntaxNodeId,
    },
    SelectClause {
        expression: SyntaxNodeId,
    },
    CollectClause {
        expression: SyntaxNodeId,
    },

    // === Binding patterns ===
    CaptureBindingPattern {
        name: Token,
    },
    /// `{name, address: {city}}`
    MappingBindingPattern {
        fields: Vec<SyntaxNodeId>,
    },
    FieldBindingPattern {
        name: Token,
        pattern: Option<SyntaxNodeId>,
    },
    ListBindingPattern {
        elements: Vec<SyntaxNodeId>,
    },
    WildcardBindingPattern,
}

impl SyntaxKind {
    /// Child nodes in source order.
    pub fn children(&self) -> Vec<SyntaxNodeId> {
        match self {
            SyntaxKind::SourceFile { imports, members } => {
                imports.iter().chain(members).copied().collect()
            }
            SyntaxKind::TypeDefinition { descriptor, .. } => vec![*descriptor],
            SyntaxKind::ModuleVarDecl { ty, init, .. } => {
                std::iter::once(*ty).chain(init.iter().copied()).collect()
            }
            SyntaxKind::FunctionDefinition {
                params,
                return_type,
                body,
                ..
            } => params
                .iter()
                .copied()
                .chain(return_type.iter().copied())
                .chain(std::iter::once(*body))
                .collect(),
            SyntaxKind::RequiredParam { ty, .. } => vec![*ty],
            SyntaxKind::ExpressionFunctionBody { expression } => vec![*expression],
            SyntaxKind::TypeDescriptor(desc) => match desc {
                TypeDescKind::Array(inner) | TypeDescKind::Optional(inner) => vec![*inner],
                TypeDescKind::Union(members) | TypeDescKind::Intersection(members) => {
                    members.clone()
                }
                TypeDescKind::Map(constraint) => constraint.iter().copied().collect(),
                TypeDescKind::Record { fields, .. } => fields.clone(),
                TypeDescKind::Builtin(_) | TypeDescKind::Named { .. } | TypeDescKind::Var => {
                    Vec::new()
                }
            },
            SyntaxKind::RecordFieldDesc { ty, .. } => vec![*ty],
            SyntaxKind::MappingConstructor { fields, .. } => fields.clone(),
            SyntaxKind::SpecificField { value, .. } => value.iter().copied().collect(),
            SyntaxKind::ListConstructor { elements, .. } => elements.clone(),
            SyntaxKind::FieldAccess { expression, .. } => vec![*expression],
            SyntaxKind::TypeCast { ty, expression } => vec![*ty, *expression],
            SyntaxKind::LetExpression { declarations, body } => declarations
                .iter()
                .copied()
                .chain(std::iter::once(*body))
                .collect(),
            SyntaxKind::LetVarDecl { ty, pattern, init } => vec![*ty, *pattern, *init],
            SyntaxKind::BinaryExpression { lhs, rhs, .. } => vec![*lhs, *rhs],
            SyntaxKind::UnaryExpression { expression, .. } => vec![*expression],
            SyntaxKind::ConditionalExpression {
                condition,
                then_expr,
                else_expr,
            } => vec![*condition, *then_expr, *else_expr],
            SyntaxKind::ElvisExpression { lhs, rhs } => vec![*lhs, *rhs],
            SyntaxKind::FunctionCall { args, .. } => args.clone(),
            SyntaxKind::MethodCall {
                expression, args, ..
            } => std::iter::once(*expression).chain(args.iter().copied()).collect(),
            SyntaxKind::IndexedExpression { container, key } => vec![*container, *key],
            SyntaxKind::BracedExpression { expression } => vec![*expression],
            SyntaxKind::QueryExpression {
                from,
                clauses,
                result,
            } => std::iter::once(*from)
                .chain(clauses.iter().copied())
                .chain(std::iter::once(*result))
                .collect(),
            SyntaxKind::FromClause {
                ty,
                pattern,
                expression,
            } => vec![*ty, *pattern, *expression],
            SyntaxKind::JoinClause {
                ty,
                pattern,
                expression,
                on_lhs,
                on_rhs,
            } => vec![*ty, *pattern, *expression, *on_lhs, *on_rhs],
            SyntaxKind::LetClause { declarations } => declarations.clone(),
            SyntaxKind::WhereClause { expression }
            | SyntaxKind::LimitClause { expression }
            | SyntaxKind::SelectClause { expression }
            | SyntaxKind::CollectClause { expression } => vec![*expression],
            SyntaxKind::MappingBindingPattern { fields } => fields.clone(),
            SyntaxKind::FieldBindingPattern { pattern, .. } => pattern.iter().copied().collect(),
            SyntaxKind::ListBindingPattern { elements } => elements.clone(),
            SyntaxKind::ImportDeclaration { .. }
            | SyntaxKind::EnumDeclaration { .. }
            | SyntaxKind::BlockFunctionBody
            | SyntaxKind::SimpleNameReference { .. }
            | SyntaxKind::Literal(_)
            | SyntaxKind::Missing
            | SyntaxKind::CaptureBindingPattern { .. }
            | SyntaxKind::WildcardBindingPattern => Vec::new(),
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            SyntaxKind::MappingConstructor { .. }
                | SyntaxKind::ListConstructor { .. }
                | SyntaxKind::SimpleNameReference { .. }
                | SyntaxKind::FieldAccess { .. }
                | SyntaxKind::Literal(_)
                | SyntaxKind::TypeCast { .. }
                | SyntaxKind::LetExpression { .. }
                | SyntaxKind::BinaryExpression { .. }
                | SyntaxKind::UnaryExpression { .. }
                | SyntaxKind::ConditionalExpression { .. }
                | SyntaxKind::ElvisExpression { .. }
                | SyntaxKind::FunctionCall { .. }
                | SyntaxKind::MethodCall { .. }
                | SyntaxKind::IndexedExpression { .. }
                | SyntaxKind::BracedExpression { .. }
                | SyntaxKind::QueryExpression { .. }
                | SyntaxKind::Missing
        )
    }

    pub fn is_mapping_constructor(&self) -> bool {
        matches!(self, SyntaxKind::MappingConstructor { .. })
    }

    pub fn is_list_constructor(&self) -> bool {
        matches!(self, SyntaxKind::ListConstructor { .. })
    }

    pub fn is_query(&self) -> bool {
        matches!(self, SyntaxKind::QueryExpression { .. })
    }
}
