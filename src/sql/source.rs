//! Definition text preparation and parsing.
//!
//! Catalog definitions arrive as raw module text: comments, `GO` batch
//! separators and a `CREATE PROCEDURE` header around the statements we care
//! about. Parsing tries the full text first, then the bare procedure body,
//! then each body statement on its own, with T-SQL control flow (`IF`,
//! `ELSE`, `WHILE`, `BEGIN … END`, `BEGIN TRY … END CATCH`) peeled away.

use std::sync::LazyLock;

use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::Dialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

use super::error::{SqlExtractError, SqlExtractResult};

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--[^\n]*").unwrap());

static BATCH_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*GO\s*;?\s*$").unwrap());

static PROCEDURE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*(?:CREATE|ALTER)(?:\s+OR\s+ALTER)?\s+PROC(?:EDURE)?\b.*?\bAS\b").unwrap()
});

static OUTER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*BEGIN\b(.*)\bEND\s*;?\s*$").unwrap());

/// Strip block comments, line comments and `GO` separators.
pub fn clean_sql(sql: &str) -> String {
    let sql = BLOCK_COMMENT.replace_all(sql, " ");
    let sql = LINE_COMMENT.replace_all(&sql, "");
    let sql = BATCH_SEPARATOR.replace_all(&sql, "");
    sql.trim().to_string()
}

/// The statements of a procedure definition, without the `CREATE PROCEDURE … AS`
/// header and without one enclosing `BEGIN … END` block.
///
/// Returns `None` when the text is not a procedure definition.
pub fn procedure_body(definition: &str) -> Option<String> {
    let header = PROCEDURE_HEADER.find(definition)?;
    let body = &definition[header.end()..];

    if let Some(caps) = OUTER_BLOCK.captures(body) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let opens_transaction = inner
            .trim_start()
            .get(..4)
            .is_some_and(|word| word.eq_ignore_ascii_case("TRAN"));
        if !opens_transaction {
            return Some(inner.trim().to_string());
        }
    }
    Some(body.trim().to_string())
}

/// Statements parsed from one definition, plus the messages of the body
/// statements that could not be parsed.
#[derive(Debug, Default)]
pub(crate) struct ParsedDefinition {
    pub statements: Vec<Statement>,
    pub failures: Vec<String>,
}

/// Parse one object definition into statements.
pub(crate) fn parse_definition(
    dialect: &dyn Dialect,
    object: &str,
    definition: &str,
) -> SqlExtractResult<ParsedDefinition> {
    let first_error = match Parser::parse_sql(dialect, definition) {
        Ok(statements) => {
            return Ok(ParsedDefinition {
                statements,
                failures: Vec::new(),
            })
        }
        Err(e) => e,
    };

    if let Some(body) = procedure_body(definition) {
        if let Ok(statements) = Parser::parse_sql(dialect, &body) {
            return Ok(ParsedDefinition {
                statements,
                failures: Vec::new(),
            });
        }
        let parsed = parse_each(dialect, object, &body);
        if !parsed.statements.is_empty() {
            return Ok(parsed);
        }
    }

    Err(SqlExtractError::Parse {
        object: object.to_string(),
        message: first_error.to_string(),
    })
}

/// Parse body statements independently, dropping the ones that fail.
fn parse_each(dialect: &dyn Dialect, object: &str, body: &str) -> ParsedDefinition {
    let mut parsed = ParsedDefinition::default();
    for chunk in statement_chunks(dialect, body) {
        match Parser::parse_sql(dialect, &chunk) {
            Ok(statements) => parsed.statements.extend(statements),
            Err(e) => {
                tracing::debug!(object, error = %e, "skipping unparseable statement");
                parsed.failures.push(e.to_string());
            }
        }
    }
    parsed
}

// =============================================================================
// Control flow
// =============================================================================

/// Words that start a statement, ending an `IF`/`WHILE` condition.
const STATEMENT_START: &[&str] = &[
    "BEGIN", "DECLARE", "DELETE", "EXEC", "EXECUTE", "INSERT", "MERGE", "PRINT", "RAISERROR",
    "RETURN", "SELECT", "SET", "THROW", "TRUNCATE", "UPDATE", "WITH",
];

/// Words after `BEGIN` that open a transaction rather than a block.
const TRANSACTION_WORDS: &[&str] = &["TRAN", "TRANSACTION", "DISTRIBUTED"];

/// Split a procedure body into standalone statements.
///
/// Chunks end at top-level `;` and at control-flow words. `IF`/`WHILE`
/// conditions are dropped up to the statement they guard, and block markers
/// (`BEGIN`, `END`, `ELSE`, `BEGIN TRY`, `END CATCH`, …) are dropped. `CASE …
/// END` and parenthesized text are left intact. Text the tokenizer rejects
/// falls back to a plain `;` split.
fn statement_chunks(dialect: &dyn Dialect, body: &str) -> Vec<String> {
    let tokens = match Tokenizer::new(dialect, body).tokenize() {
        Ok(tokens) => tokens,
        Err(_) => {
            return body
                .split(';')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        }
    };

    let mut splitter = ChunkSplitter::default();
    for (index, token) in tokens.iter().enumerate() {
        let next_word = tokens[index + 1..]
            .iter()
            .find(|t| !matches!(t, Token::Whitespace(_)))
            .and_then(bare_word);
        splitter.push(token, next_word.as_deref());
    }
    splitter.flush();
    splitter.chunks
}

/// Upper-cased text of an unquoted word token.
fn bare_word(token: &Token) -> Option<String> {
    match token {
        Token::Word(word) if word.quote_style.is_none() => Some(word.value.to_uppercase()),
        _ => None,
    }
}

#[derive(Default)]
struct ChunkSplitter {
    chunks: Vec<String>,
    current: String,
    /// Open parentheses.
    depth: usize,
    /// Open `CASE` expressions at the top level.
    case_depth: usize,
    /// Inside an `IF`/`WHILE` condition.
    condition: bool,
    /// Drop a `TRY`/`CATCH` word right after `BEGIN`/`END`.
    block_suffix: bool,
}

impl ChunkSplitter {
    fn push(&mut self, token: &Token, next_word: Option<&str>) {
        let word = bare_word(token);
        let block_suffix = match token {
            Token::Whitespace(_) => self.block_suffix,
            _ => std::mem::take(&mut self.block_suffix),
        };

        if self.condition {
            match token {
                Token::LParen => self.depth += 1,
                Token::RParen => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            let starts_statement = self.depth == 0
                && word
                    .as_deref()
                    .is_some_and(|w| STATEMENT_START.contains(&w));
            if !starts_statement {
                return;
            }
            self.condition = false;
        }

        match token {
            Token::LParen => self.depth += 1,
            Token::RParen => self.depth = self.depth.saturating_sub(1),
            Token::SemiColon if self.depth == 0 => {
                self.flush();
                return;
            }
            _ => {}
        }

        if self.depth == 0 {
            match word.as_deref() {
                Some("TRY" | "CATCH") if block_suffix => return,
                Some("CASE") => self.case_depth += 1,
                Some("END") if self.case_depth > 0 => self.case_depth -= 1,
                Some("END") => {
                    self.flush();
                    self.block_suffix = true;
                    return;
                }
                Some("ELSE") if self.case_depth == 0 => {
                    self.flush();
                    return;
                }
                Some("IF" | "WHILE") => {
                    self.flush();
                    self.condition = true;
                    return;
                }
                Some("BEGIN") if !next_word.is_some_and(|w| TRANSACTION_WORDS.contains(&w)) => {
                    self.flush();
                    self.block_suffix = true;
                    return;
                }
                _ => {}
            }
        }

        self.current.push_str(&token.to_string());
    }

    fn flush(&mut self) {
        let chunk = self.current.trim();
        if !chunk.is_empty() {
            self.chunks.push(chunk.to_string());
        }
        self.current.clear();
    }
}
