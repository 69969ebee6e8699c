//! Parsing of uploaded SQL scripts into restorable statements.
//!
//! Only what the exporter itself produces is accepted: single-table INSERTs
//! whose VALUES are tuples of literals, and the `PRAGMA foreign_keys` pair. Anything else rejects the whole script
//! before a single statement touches the database.

use std::iter::Peekable;
use std::str::Chars;

use crate::constants::sql::PRIMARY_SCHEMA;
use crate::database::quote_identifier;
use crate::errors::BackupError;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(InsertStatement),
    ForeignKeys(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    /// Everything after `VALUES`, verbatim
    pub values: String,
}

impl InsertStatement {
    pub fn schema_or_default(&self) -> &str {
        self.schema.as_deref().unwrap_or(PRIMARY_SCHEMA)
    }

    pub fn target(&self) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{}.{}",
                quote_identifier(schema),
                quote_identifier(&self.table)
            ),
            None => quote_identifier(&self.table),
        }
    }

    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Split and classify a script. Statement numbers in errors are 1-based.
pub fn parse_script(sql: &str) -> Result<Vec<Statement>, BackupError> {
    let raw = split_statements(sql)?;
    if raw.is_empty() {
        return Err(BackupError::InvalidPayload {
            reason: "backup file contains no SQL statements".to_string(),
        });
    }

    raw.iter()
        .enumerate()
        .map(|(i, statement)| {
            parse_statement(statement).ok_or_else(|| BackupError::InvalidPayload {
                reason: format!(
                    "unsupported statement {}: {}",
                    i + 1,
                    preview(statement)
                ),
            })
        })
        .collect()
}

fn preview(statement: &str) -> String {
    const MAX: usize = 80;
    let flat = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > MAX {
        format!("{}...", flat.chars().take(MAX).collect::<String>())
    } else {
        flat
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Lexer {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// Split on `;` outside of string literals, quoted identifiers and comments.
/// Comments are dropped; a trailing statement without `;` is kept.
pub fn split_statements(sql: &str) -> Result<Vec<String>, BackupError> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut state = Lexer::Normal;

    while let Some(c) = chars.next() {
        match state {
            Lexer::Normal => match c {
                '\'' => {
                    current.push(c);
                    state = Lexer::SingleQuoted;
                }
                '"' => {
                    current.push(c);
                    state = Lexer::DoubleQuoted;
                }
                '-' if chars.next_if_eq(&'-').is_some() => state = Lexer::LineComment,
                '/' if chars.next_if_eq(&'*').is_some() => state = Lexer::BlockComment,
                ';' => flush(&mut current, &mut statements),
                _ => current.push(c),
            },
            Lexer::SingleQuoted => {
                current.push(c);
                if c == '\'' && !take_doubled(&mut chars, '\'', &mut current) {
                    state = Lexer::Normal;
                }
            }
            Lexer::DoubleQuoted => {
                current.push(c);
                if c == '"' && !take_doubled(&mut chars, '"', &mut current) {
                    state = Lexer::Normal;
                }
            }
            Lexer::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = Lexer::Normal;
                }
            }
            Lexer::BlockComment => {
                if c == '*' && chars.next_if_eq(&'/').is_some() {
                    current.push(' ');
                    state = Lexer::Normal;
                }
            }
        }
    }

    match state {
        Lexer::SingleQuoted => Err(BackupError::InvalidPayload {
            reason: "unterminated string literal".to_string(),
        }),
        Lexer::DoubleQuoted => Err(BackupError::InvalidPayload {
            reason: "unterminated quoted identifier".to_string(),
        }),
        _ => {
            flush(&mut current, &mut statements);
            Ok(statements)
        }
    }
}

fn take_doubled(chars: &mut Peekable<Chars<'_>>, quote: char, current: &mut String) -> bool {
    match chars.next_if_eq(&quote) {
        Some(escaped) => {
            current.push(escaped);
            true
        }
        None => false,
    }
}

fn flush(current: &mut String, statements: &mut Vec<String>) {
    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    current.clear();
}

fn parse_statement(statement: &str) -> Option<Statement> {
    let mut cursor = Cursor::new(statement);
    if cursor.keyword("INSERT") {
        return parse_insert(&mut cursor).map(Statement::Insert);
    }
    if cursor.keyword("PRAGMA") {
        return parse_foreign_keys(&mut cursor).map(Statement::ForeignKeys);
    }
    None
}

fn parse_insert(cursor: &mut Cursor<'_>) -> Option<InsertStatement> {
    if !cursor.keyword("INTO") {
        return None;
    }

    let first = cursor.identifier()?;
    let (schema, table) = if cursor.symbol('.') {
        (Some(first), cursor.identifier()?)
    } else {
        (None, first)
    };

    if !cursor.symbol('(') {
        return None;
    }
    let mut columns = Vec::new();
    loop {
        columns.push(cursor.identifier()?);
        if cursor.symbol(',') {
            continue;
        }
        if cursor.symbol(')') {
            break;
        }
        return None;
    }

    if !cursor.keyword("VALUES") {
        return None;
    }
    let values = cursor.rest().trim();
    if !is_literal_tuples(values) {
        return None;
    }

    Some(InsertStatement {
        schema,
        table,
        columns,
        values: values.to_string(),
    })
}

/// `(…), (…)` where each tuple holds literals only: no nested parentheses,
/// so no subqueries or function calls, and nothing after the last tuple.
fn is_literal_tuples(values: &str) -> bool {
    let mut in_tuple = false;
    let mut in_string = false;
    let mut expect_tuple = true;
    let mut chars = values.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            if c == '\'' && chars.next_if_eq(&'\'').is_none() {
                in_string = false;
            }
            continue;
        }
        if in_tuple {
            match c {
                '\'' => in_string = true,
                '(' | '"' => return false,
                ')' => in_tuple = false,
                _ => {}
            }
            continue;
        }
        match c {
            c if c.is_whitespace() => {}
            '(' if expect_tuple => {
                in_tuple = true;
                expect_tuple = false;
            }
            ',' if !expect_tuple => expect_tuple = true,
            _ => return false,
        }
    }

    !in_tuple && !in_string && !expect_tuple
}

fn parse_foreign_keys(cursor: &mut Cursor<'_>) -> Option<bool> {
    if !cursor.keyword("foreign_keys") || !cursor.symbol('=') {
        return None;
    }
    let value = cursor.rest().trim().to_ascii_uppercase();
    match value.as_str() {
        "ON" | "1" | "TRUE" | "YES" => Some(true),
        "OFF" | "0" | "FALSE" | "NO" => Some(false),
        _ => None,
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Case-insensitive keyword followed by a non-identifier character
    fn keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        let Some(head) = rest.get(..keyword.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(keyword) {
            return false;
        }
        if rest[keyword.len()..]
            .chars()
            .next()
            .is_some_and(is_identifier_char)
        {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn symbol(&mut self, symbol: char) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(symbol) {
            self.pos += symbol.len_utf8();
            true
        } else {
            false
        }
    }

    /// Bare identifier, or a double-quoted one with `""` escapes
    fn identifier(&mut self) -> Option<String> {
        self.skip_whitespace();
        let rest = self.rest();

        if let Some(quoted) = rest.strip_prefix('"') {
            let mut name = String::new();
            let mut chars = quoted.char_indices().peekable();
            while let Some((i, c)) = chars.next() {
                if c != '"' {
                    name.push(c);
                    continue;
                }
                if chars.next_if(|&(_, next)| next == '"').is_some() {
                    name.push('"');
                    continue;
                }
                self.pos += 1 + i + 1;
                return Some(name);
            }
            return None;
        }

        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_identifier_char(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(rest[..len].to_string())
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_respects_quotes_and_comments() {
        let sql = "-- header; with semicolon\n\
                   PRAGMA foreign_keys = OFF;\n\
                   /* block; comment */\n\
                   INSERT INTO \"main\".\"notes\" (\"id\", \"body\") VALUES (1, 'a;b -- not a comment');\n\
                   INSERT INTO notes (id, body) VALUES (2, 'it''s')";

        let statements = split_statements(sql).unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], "PRAGMA foreign_keys = OFF");
        assert!(statements[1].ends_with("VALUES (1, 'a;b -- not a comment')"));
        assert!(statements[2].ends_with("VALUES (2, 'it''s')"));
    }

    #[test]
    fn test_split_keeps_newlines_inside_strings() {
        let statements =
            split_statements("INSERT INTO t (a) VALUES ('line one;\nline two');").unwrap();
        assert_eq!(statements, vec!["INSERT INTO t (a) VALUES ('line one;\nline two')"]);
    }

    #[test]
    fn test_unterminated_string_is_rejected() {
        let result = split_statements("INSERT INTO t (a) VALUES ('oops);");
        assert!(matches!(result, Err(BackupError::InvalidPayload { .. })));
    }

    #[test]
    fn test_parse_qualified_insert() {
        let statements = parse_script(
            r#"INSERT INTO "main"."odd""name" ("id", "first name") VALUES (1, 'O''Brien');"#,
        )
        .unwrap();

        let Statement::Insert(insert) = &statements[0] else {
            panic!("expected insert, got {:?}", statements[0]);
        };
        assert_eq!(insert.schema.as_deref(), Some("main"));
        assert_eq!(insert.table, "odd\"name");
        assert_eq!(insert.columns, vec!["id", "first name"]);
        assert_eq!(insert.values, "(1, 'O''Brien')");
        assert_eq!(insert.target(), r#""main"."odd""name""#);
        assert_eq!(insert.column_list(), r#""id", "first name""#);
    }

    #[test]
    fn test_parse_unqualified_insert_defaults_schema() {
        let statements = parse_script("insert into visits (id) values (3)").unwrap();
        let Statement::Insert(insert) = &statements[0] else {
            panic!("expected insert");
        };
        assert_eq!(insert.schema, None);
        assert_eq!(insert.schema_or_default(), "main");
        assert_eq!(insert.target(), "\"visits\"");
    }

    #[test]
    fn test_parse_pragmas() {
        let statements =
            parse_script("PRAGMA foreign_keys = OFF; pragma FOREIGN_KEYS = on;").unwrap();
        assert_eq!(
            statements,
            vec![Statement::ForeignKeys(false), Statement::ForeignKeys(true)]
        );
    }

    #[test]
    fn test_other_statements_are_rejected() {
        let err = parse_script("PRAGMA foreign_keys = OFF;\nDROP TABLE patients;").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid backup payload: unsupported statement 2: DROP TABLE patients"
        );

        assert!(parse_script("INSERT OR IGNORE INTO t (a) VALUES (1);").is_err());
        assert!(parse_script("INSERT INTO t SELECT * FROM u;").is_err());
    }

    #[test]
    fn test_values_must_be_literal_tuples() {
        assert!(parse_script("INSERT INTO t (a) VALUES (1), (-9e999), ('x(y)');").is_ok());
        assert!(parse_script("INSERT INTO t (a, b) VALUES (X'CAFE', 'it''s, (fine)');").is_ok());

        assert!(parse_script("INSERT INTO t (a) VALUES (1) RETURNING (a);").is_err());
        assert!(parse_script("INSERT INTO t (a) VALUES ((SELECT max(a) FROM t));").is_err());
        assert!(parse_script("INSERT INTO t (a) VALUES (abs(-1));").is_err());
        assert!(parse_script("INSERT INTO t (a) VALUES (1),;").is_err());
        assert!(parse_script("INSERT INTO t (a) VALUES (1) (2);").is_err());
    }

    #[test]
    fn test_comment_only_script_is_rejected() {
        let err = parse_script("-- Database backup\n-- Total tables: 0\n").unwrap_err();
        assert!(err.to_string().contains("no SQL statements"));
    }
}
