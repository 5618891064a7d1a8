//! The statement IR produced by the parser and consumed once by the lowering
//! engine. Ownership is tree-shaped; nothing here is mutated after parsing.

#[derive(PartialEq, Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    With(WithStatement),
}

#[derive(PartialEq, Debug, Clone)]
pub struct WithStatement {
    pub ctes: Vec<CommonTableExpr>,
    pub body: Box<Statement>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CommonTableExpr {
    pub name: String,
    pub columns: Option<Vec<String>>,
    pub query: SelectStatement,
    pub recursive: bool,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct SelectStatement {
    pub distinct: bool,
    pub projections: Vec<Projection>,
    pub from: Option<TableRef>,
    pub joins: Vec<JoinOp>,
    pub where_clause: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<SortSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Projection {
    pub expr: Expression,
    pub alias: Option<String>,
}

#[derive(PartialEq, Debug, Clone)]
pub enum TableRef {
    Collection { name: String, alias: Option<String> },
    Derived { query: Box<SelectStatement>, alias: String },
}

impl TableRef {
    /// The name other clauses may use to qualify columns from this source.
    pub fn binding_name(&self) -> &str {
        match self {
            TableRef::Collection { name, alias } => alias.as_deref().unwrap_or(name),
            TableRef::Derived { alias, .. } => alias,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct JoinOp {
    pub kind: JoinKind,
    pub target: TableRef,
    pub on: Option<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SortSpec {
    pub key: SortKey,
    pub asc: bool,
}

#[derive(PartialEq, Debug, Clone)]
pub enum SortKey {
    Expr(Expression),
    /// `ORDER BY 2` — 1-based position into the projection list.
    Positional(u32),
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub qualifier: Option<String>,
}

impl Identifier {
    pub fn simple<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            qualifier: None,
        }
    }

    pub fn qualified<Q: Into<String>, S: Into<String>>(qualifier: Q, name: S) -> Self {
        Self {
            name: name.into(),
            qualifier: Some(qualifier.into()),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// `DATE '2024-01-01'` / `TIMESTAMP '...'` typed literals.
    Date(String),
    /// `INTERVAL 5 DAY`; only meaningful as a date-arithmetic argument.
    Interval { amount: i64, unit: IntervalUnit },
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum IntervalUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Microsecond,
}

impl IntervalUnit {
    /// The unit name MongoDB's `$dateAdd`/`$dateDiff` expect.
    pub fn as_mongo_unit(&self) -> &'static str {
        use IntervalUnit::*;
        match self {
            Year => "year",
            Quarter => "quarter",
            Month => "month",
            Week => "week",
            Day => "day",
            Hour => "hour",
            Minute => "minute",
            Second => "second",
            Microsecond => "millisecond",
        }
    }
}

impl TryFrom<&str> for IntervalUnit {
    type Error = String;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        use IntervalUnit::*;
        match name.to_uppercase().as_str() {
            "YEAR" => Ok(Year),
            "QUARTER" => Ok(Quarter),
            "MONTH" => Ok(Month),
            "WEEK" => Ok(Week),
            "DAY" => Ok(Day),
            "HOUR" => Ok(Hour),
            "MINUTE" => Ok(Minute),
            "SECOND" => Ok(Second),
            "MICROSECOND" => Ok(Microsecond),
            _ => Err(format!("unknown interval unit {name}")),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    IsNull,
    IsNotNull,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Like,
    NotLike,
    In,
    NotIn,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Regexp,
    NotRegexp,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;
        matches!(self, Eq | Neq | Lt | Lte | Gt | Gte)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expression {
    Column(Identifier),
    Literal(Literal),
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    FunctionCall(FunctionExpr),
    Case(CaseExpr),
    /// `x [NOT] IN (a, b, c)` with a scalar list; subquery `IN` uses
    /// `Binary { op: In, right: Subquery }`.
    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    Subquery(SubqueryExpr),
    Cast {
        expr: Box<Expression>,
        to: TypeName,
    },
    Extract {
        unit: IntervalUnit,
        expr: Box<Expression>,
    },
    /// Full-text `MATCH (col, ...) AGAINST ('terms' [mode])`.
    Match(MatchExpr),
    /// Row constructor `(a, b)`; only valid against a row subquery.
    Tuple(Vec<Expression>),
    Star,
    QualifiedStar(String),
}

impl Expression {
    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expression) -> Self {
        Expression::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// True if this expression or any sub-expression satisfies `pred`.
    pub fn any(&self, pred: &mut dyn FnMut(&Expression) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Expression::Unary { expr, .. }
            | Expression::Cast { expr, .. }
            | Expression::Extract { expr, .. } => expr.any(pred),
            Expression::Binary { left, right, .. } => left.any(pred) || right.any(pred),
            Expression::FunctionCall(f) => f.args.iter().any(|a| a.any(pred)),
            Expression::Case(c) => {
                c.operand.as_ref().is_some_and(|o| o.any(pred))
                    || c.branches
                        .iter()
                        .any(|b| b.when.any(pred) || b.then.any(pred))
                    || c.else_branch.as_ref().is_some_and(|e| e.any(pred))
            }
            Expression::InList { expr, list, .. } => {
                expr.any(pred) || list.iter().any(|e| e.any(pred))
            }
            Expression::Tuple(items) => items.iter().any(|e| e.any(pred)),
            Expression::Column(_)
            | Expression::Literal(_)
            | Expression::Subquery(_)
            | Expression::Match(_)
            | Expression::Star
            | Expression::QualifiedStar(_) => false,
        }
    }

    pub fn contains_subquery(&self) -> bool {
        self.any(&mut |e| matches!(e, Expression::Subquery(_)))
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct FunctionExpr {
    /// Uppercased at parse time; catalogue lookup is by this name.
    pub name: String,
    pub args: Vec<Expression>,
    pub distinct: bool,
    pub over: Option<WindowSpec>,
    /// `GROUP_CONCAT(... SEPARATOR 'x')`
    pub separator: Option<String>,
    /// `GROUP_CONCAT(... ORDER BY ...)`
    pub order_by: Vec<SortSpec>,
}

impl FunctionExpr {
    pub fn new<S: Into<String>>(name: S, args: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            args,
            distinct: false,
            over: None,
            separator: None,
            order_by: vec![],
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct WindowSpec {
    pub partition_by: Vec<Expression>,
    pub order_by: Vec<SortSpec>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CaseExpr {
    pub operand: Option<Box<Expression>>,
    pub branches: Vec<WhenBranch>,
    pub else_branch: Option<Box<Expression>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct WhenBranch {
    pub when: Expression,
    pub then: Expression,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SubqueryKind {
    Scalar,
    In,
    NotIn,
    Exists,
    NotExists,
    Row,
    Derived,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SubqueryExpr {
    pub query: Box<SelectStatement>,
    pub kind: SubqueryKind,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum FulltextMode {
    NaturalLanguage,
    Boolean,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MatchExpr {
    pub columns: Vec<Identifier>,
    pub query: String,
    pub mode: Option<FulltextMode>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TypeName {
    Binary,
    Char,
    Date,
    Datetime,
    Decimal,
    Double,
    Float,
    Signed,
    Time,
    Unsigned,
    Json,
}

impl TryFrom<&str> for TypeName {
    type Error = String;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        use TypeName::*;
        match name.to_uppercase().as_str() {
            "BINARY" => Ok(Binary),
            "CHAR" => Ok(Char),
            "DATE" => Ok(Date),
            "DATETIME" => Ok(Datetime),
            "DEC" | "DECIMAL" => Ok(Decimal),
            "DOUBLE" => Ok(Double),
            "FLOAT" => Ok(Float),
            "SIGNED" | "INT" | "INTEGER" => Ok(Signed),
            "TIME" => Ok(Time),
            "UNSIGNED" => Ok(Unsigned),
            "JSON" => Ok(Json),
            _ => Err(format!("unknown cast target type {name}")),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Expression>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expression>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Assignment {
    pub column: String,
    pub expr: Expression,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DeleteStatement {
    pub table: String,
    pub where_clause: Option<Expression>,
}
