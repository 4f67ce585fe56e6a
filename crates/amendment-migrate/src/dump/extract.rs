//! Locating `INSERT ... VALUES` statements for one table in dump text.
//!
//! This is deliberately a best-effort regex scan, not a SQL grammar. It
//! understands:
//!
//! - `INSERT INTO Amendments ...`, `INSERT INTO [Amendments] ...`,
//!   `INSERT INTO [dbo].[Amendments] ...` and `dbo.Amendments`
//! - statements spanning lines, ending at the first `;` after `VALUES`
//! - multi-row `VALUES (...), (...)` lists
//!
//! A `)` or `;` inside a string literal is not handled specially.

use std::sync::OnceLock;

use regex::Regex;

use super::tokenize::tokenize;
use crate::error::{MigrateError, Result};

/// One row's raw tokens, positionally aligned to the legacy column order.
pub type RawRow = Vec<String>;

/// One matched INSERT statement and the rows it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement<'a> {
    /// The full statement text, including the trailing `;`.
    pub text: &'a str,
    pub rows: Vec<RawRow>,
}

fn values_keyword_re() -> &'static Regex {
    static VALUES_RE: OnceLock<Regex> = OnceLock::new();
    VALUES_RE.get_or_init(|| Regex::new(r"(?i)\bVALUES\b").expect("valid VALUES regex"))
}

fn row_tuple_re() -> &'static Regex {
    static ROW_RE: OnceLock<Regex> = OnceLock::new();
    ROW_RE.get_or_init(|| Regex::new(r"\(([^)]+)\)").expect("valid row tuple regex"))
}

fn insert_target_re() -> &'static Regex {
    static TARGET_RE: OnceLock<Regex> = OnceLock::new();
    TARGET_RE.get_or_init(|| {
        Regex::new(r"(?i)INSERT\s+INTO\s+((?:\[?\w+\]?\.)?\[?\w+\]?)")
            .expect("valid insert target regex")
    })
}

/// Scanner for INSERT statements targeting a single table.
#[derive(Debug, Clone)]
pub struct StatementExtractor {
    table: String,
    statement_re: Regex,
}

impl StatementExtractor {
    /// Build an extractor for `table` (unqualified, without brackets).
    pub fn new(table: &str) -> Result<Self> {
        let table = table.trim();
        if table.is_empty() {
            return Err(MigrateError::Config("target table name is empty".into()));
        }

        let pattern = format!(
            r"(?is)INSERT\s+INTO\s+(?:\[?\w+\]?\.)?\[?{}\]?[\s(].*?\bVALUES\b.+?;",
            regex::escape(table)
        );
        let statement_re = Regex::new(&pattern)
            .map_err(|e| MigrateError::Config(format!("invalid table pattern: {}", e)))?;

        Ok(Self {
            table: table.to_string(),
            statement_re,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Every matching statement in `dump`, in file order.
    ///
    /// An empty result means the table does not appear, not a parse failure.
    pub fn extract<'a>(&self, dump: &'a str) -> Vec<RawStatement<'a>> {
        self.statement_re
            .find_iter(dump)
            .map(|m| {
                let text = m.as_str();
                RawStatement {
                    text,
                    rows: parse_rows(text),
                }
            })
            .collect()
    }
}

/// Convenience wrapper around [`StatementExtractor`].
pub fn extract_statements<'a>(dump: &'a str, table: &str) -> Result<Vec<RawStatement<'a>>> {
    Ok(StatementExtractor::new(table)?.extract(dump))
}

/// Split the VALUES list of one statement into tokenized rows.
pub fn parse_rows(statement: &str) -> Vec<RawRow> {
    let Some(keyword) = values_keyword_re().find(statement) else {
        return Vec::new();
    };

    let region = statement[keyword.end()..].trim();
    let region = region.strip_suffix(';').unwrap_or(region);

    row_tuple_re()
        .captures_iter(region)
        .filter_map(|caps| caps.get(1))
        .map(|inner| tokenize(inner.as_str()))
        .collect()
}

/// Distinct INSERT target names in order of first appearance, at most `limit`.
///
/// Used to tell an operator what the dump actually contains when the
/// expected table is missing.
pub fn scan_table_names(dump: &str, limit: usize) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in insert_target_re().captures_iter(dump) {
        if names.len() >= limit {
            break;
        }
        if let Some(name) = caps.get(1) {
            let name = name.as_str();
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
SET IDENTITY_INSERT [dbo].[Amendments] ON
GO
INSERT INTO [dbo].[Amendments] ([Id], [Type], [Description])
VALUES (1, 'Bug', 'Crash on save'), (2, 'Feature', 'Export, to CSV');
INSERT INTO [dbo].[Users] ([Id], [Name]) VALUES (1, 'admin');
insert into Amendments values (3, NULL, 'lower case');
INSERT INTO [dbo].[AmendmentsArchive] ([Id]) VALUES (99);
";

    #[test]
    fn test_extracts_matching_statements_only() {
        let statements = extract_statements(DUMP, "Amendments").unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].rows.len(), 2);
        assert_eq!(statements[0].rows[1], vec!["2", "'Feature'", "'Export, to CSV'"]);
        assert_eq!(statements[1].rows, vec![vec!["3", "NULL", "'lower case'"]]);
    }

    #[test]
    fn test_statement_text_ends_at_semicolon() {
        let statements = extract_statements(DUMP, "Users").unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].text.ends_with("(1, 'admin');"));
    }

    #[test]
    fn test_unknown_table_yields_nothing() {
        let statements = extract_statements(DUMP, "Changes").unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_table_name_is_escaped() {
        let statements = extract_statements("INSERT INTO axb VALUES (1);", "a.b").unwrap();
        assert!(statements.is_empty());
        assert!(StatementExtractor::new("Amend(ments").is_ok());
    }

    #[test]
    fn test_empty_table_name_rejected() {
        assert!(StatementExtractor::new("  ").is_err());
    }

    #[test]
    fn test_parse_rows_without_values() {
        assert!(parse_rows("INSERT INTO t SELECT 1;").is_empty());
    }

    #[test]
    fn test_scan_table_names_distinct_in_order() {
        let names = scan_table_names(DUMP, 50);
        assert_eq!(
            names,
            vec![
                "[dbo].[Amendments]",
                "[dbo].[Users]",
                "Amendments",
                "[dbo].[AmendmentsArchive]"
            ]
        );
    }

    #[test]
    fn test_scan_table_names_bounded() {
        let names = scan_table_names(DUMP, 2);
        assert_eq!(names.len(), 2);
    }
}
