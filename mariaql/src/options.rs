use crate::lexer::ReservedWordDialect;
use bson::{doc, Document};

/// Options passed in for translation, used throughout the lowering engine.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Attached to find/aggregate invocations that sort over columns or
    /// compare case-insensitively. The default matches the
    /// `utf8mb4_unicode_ci` behaviour of the reference server.
    pub collation: Document,
    /// Append an implicit `$sort` on `_id` when a statement has LIMIT but
    /// no ORDER BY, so results are stable across backends.
    pub implicit_order_on_limit: bool,
    /// Which reserved-word set identifiers are checked against.
    pub reserved_words: ReservedWordDialect,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            collation: doc! {
                "locale": "en",
                "caseLevel": false,
                "strength": 1,
                "numericOrdering": false,
            },
            implicit_order_on_limit: true,
            reserved_words: ReservedWordDialect::default(),
        }
    }
}
