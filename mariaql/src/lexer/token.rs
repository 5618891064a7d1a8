use lazy_static::lazy_static;
use std::collections::HashSet;

/// Byte range of a token in the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A word from the closed reserved set, stored uppercased.
    Keyword(String),
    /// An unquoted identifier, case preserved.
    Name(String),
    /// A backtick-quoted identifier, content verbatim.
    QuotedName(String),
    Integer(i64),
    Float(f64),
    String(String),

    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Comma,
    LeftParen,
    RightParen,
    Dot,
    Semicolon,
    Question,
    /// `||`
    Concat,
    /// `:=`
    Assign,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    ShiftLeft,
    ShiftRight,

    /// A malformed token. The parser reports these as syntax errors.
    Error(String),
    Eof,
}

impl TokenKind {
    /// Human-readable rendering for error messages.
    pub fn describe(&self) -> String {
        use TokenKind::*;
        match self {
            Keyword(k) => k.clone(),
            Name(n) => format!("identifier `{n}`"),
            QuotedName(n) => format!("identifier `{n}`"),
            Integer(i) => i.to_string(),
            Float(f) => f.to_string(),
            String(s) => format!("'{s}'"),
            Eq => "=".into(),
            Neq => "<>".into(),
            Lt => "<".into(),
            Lte => "<=".into(),
            Gt => ">".into(),
            Gte => ">=".into(),
            Plus => "+".into(),
            Minus => "-".into(),
            Star => "*".into(),
            Slash => "/".into(),
            Percent => "%".into(),
            Comma => ",".into(),
            LeftParen => "(".into(),
            RightParen => ")".into(),
            Dot => ".".into(),
            Semicolon => ";".into(),
            Question => "?".into(),
            Concat => "||".into(),
            Assign => ":=".into(),
            Ampersand => "&".into(),
            Pipe => "|".into(),
            Caret => "^".into(),
            Tilde => "~".into(),
            ShiftLeft => "<<".into(),
            ShiftRight => ">>".into(),
            Error(m) => format!("invalid token ({m})"),
            Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: u32,
    pub col: u32,
}

impl Token {
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Keyword(k) if k == word)
    }

    /// The identifier content of a Name or QuotedName token.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Name(n) | TokenKind::QuotedName(n) => Some(n),
            _ => None,
        }
    }
}

/// Which reserved-word set identifiers are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservedWordDialect {
    #[default]
    MariaDb,
    /// MariaDB running with SQL_MODE=ORACLE, which reserves a few more words.
    MariaDbOracle,
}

impl ReservedWordDialect {
    pub fn is_reserved(&self, word_upper: &str) -> bool {
        match self {
            ReservedWordDialect::MariaDb => MARIADB_RESERVED.contains(word_upper),
            ReservedWordDialect::MariaDbOracle => {
                MARIADB_RESERVED.contains(word_upper) || ORACLE_MODE_RESERVED.contains(word_upper)
            }
        }
    }
}

lazy_static! {
    /// The MariaDB reserved-word list. Words outside this set lex as plain
    /// identifiers even when the parser treats them contextually (e.g. AGAINST).
    static ref MARIADB_RESERVED: HashSet<&'static str> = [
        "ACCESSIBLE", "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC",
        "ASENSITIVE", "BEFORE", "BETWEEN", "BIGINT", "BINARY", "BLOB", "BOTH",
        "BY", "CALL", "CASCADE", "CASE", "CHANGE", "CHAR", "CHARACTER",
        "CHECK", "COLLATE", "COLUMN", "CONDITION", "CONSTRAINT", "CONTINUE",
        "CONVERT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_ROLE",
        "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR",
        "DATABASE", "DATABASES", "DAY_HOUR", "DAY_MICROSECOND", "DAY_MINUTE",
        "DAY_SECOND", "DEC", "DECIMAL", "DECLARE", "DEFAULT", "DELAYED",
        "DELETE", "DELETE_DOMAIN_ID", "DESC", "DESCRIBE", "DETERMINISTIC",
        "DISTINCT", "DISTINCTROW", "DIV", "DO_DOMAIN_IDS", "DOUBLE", "DROP",
        "DUAL", "EACH", "ELSE", "ELSEIF", "ENCLOSED", "ESCAPED", "EXCEPT",
        "EXISTS", "EXIT", "EXPLAIN", "FALSE", "FETCH", "FLOAT", "FLOAT4",
        "FLOAT8", "FOR", "FORCE", "FOREIGN", "FROM", "FULLTEXT", "GENERAL",
        "GRANT", "GROUP", "HAVING", "HIGH_PRIORITY", "HOUR_MICROSECOND",
        "HOUR_MINUTE", "HOUR_SECOND", "IF", "IGNORE", "IGNORE_DOMAIN_IDS",
        "IGNORE_SERVER_IDS", "IN", "INDEX", "INFILE", "INNER", "INOUT",
        "INSENSITIVE", "INSERT", "INT", "INT1", "INT2", "INT3", "INT4",
        "INT8", "INTEGER", "INTERSECT", "INTERVAL", "INTO", "IS", "ITERATE",
        "JOIN", "KEY", "KEYS", "KILL", "LEADING", "LEAVE", "LEFT", "LIKE",
        "LIMIT", "LINEAR", "LINES", "LOAD", "LOCALTIME", "LOCALTIMESTAMP",
        "LOCK", "LONG", "LONGBLOB", "LONGTEXT", "LOOP", "LOW_PRIORITY",
        "MASTER_HEARTBEAT_PERIOD", "MASTER_SSL_VERIFY_SERVER_CERT", "MATCH",
        "MAXVALUE", "MEDIUMBLOB", "MEDIUMINT", "MEDIUMTEXT", "MIDDLEINT",
        "MINUTE_MICROSECOND", "MINUTE_SECOND", "MOD", "MODIFIES", "NATURAL",
        "NOT", "NO_WRITE_TO_BINLOG", "NULL", "NUMERIC", "OFFSET", "ON",
        "OPTIMIZE", "OPTION", "OPTIONALLY", "OR", "ORDER", "OUT", "OUTER",
        "OUTFILE", "OVER", "PAGE_CHECKSUM", "PARSE_VCOL_EXPR", "PARTITION",
        "POSITION", "PRECISION", "PRIMARY", "PROCEDURE", "PURGE", "RANGE",
        "READ", "READS", "READ_WRITE", "REAL", "RECURSIVE", "REF_SYSTEM_ID",
        "REFERENCES", "REGEXP", "RELEASE", "RENAME", "REPEAT", "REPLACE",
        "REQUIRE", "RESIGNAL", "RESTRICT", "RETURN", "RETURNING", "REVOKE",
        "RIGHT", "RLIKE", "ROW_NUMBER", "ROWS", "SCHEMA", "SCHEMAS",
        "SECOND_MICROSECOND", "SELECT", "SENSITIVE", "SEPARATOR", "SET",
        "SHOW", "SIGNAL", "SLOW", "SMALLINT", "SPATIAL", "SPECIFIC", "SQL",
        "SQLEXCEPTION", "SQLSTATE", "SQLWARNING", "SQL_BIG_RESULT",
        "SQL_CALC_FOUND_ROWS", "SQL_SMALL_RESULT", "SSL", "STARTING",
        "STATS_AUTO_RECALC", "STATS_PERSISTENT", "STATS_SAMPLE_PAGES",
        "STRAIGHT_JOIN", "TABLE", "TERMINATED", "THEN", "TINYBLOB",
        "TINYINT", "TINYTEXT", "TO", "TRAILING", "TRIGGER", "TRUE", "UNDO",
        "UNION", "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE", "USAGE", "USE",
        "USING", "UTC_DATE", "UTC_TIME", "UTC_TIMESTAMP", "VALUES",
        "VARBINARY", "VARCHAR", "VARCHARACTER", "VARYING", "WHEN", "WHERE",
        "WHILE", "WINDOW", "WITH", "WRITE", "XOR", "YEAR_MONTH", "ZEROFILL",
    ]
    .into_iter()
    .collect();

    /// Additional words reserved only under SQL_MODE=ORACLE.
    static ref ORACLE_MODE_RESERVED: HashSet<&'static str> = [
        "BODY", "ELSIF", "GOTO", "HISTORY", "OTHERS", "PACKAGE", "PERIOD",
        "RAISE", "ROWNUM", "ROWTYPE", "SYSDATE", "SYSTEM_TIME", "VERSIONING",
        "WITHOUT",
    ]
    .into_iter()
    .collect();
}
