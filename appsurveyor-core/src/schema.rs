//! Schema description parsing.
//!
//! Turns a DBML-style text description into a de-duplicated list of
//! [`Table`]s. Parsing is tolerant: a malformed block is skipped and never
//! prevents extraction of the well-formed blocks around it. Only a
//! description that yields no tables at all is an error.

use crate::{
    Result,
    error::AppSurveyorError,
    models::{Column, Table},
};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Default block-opening marker.
pub const DEFAULT_MARKER: &str = "Table";

/// Artifact characters stripped from raw table names.
const NAME_ARTIFACTS: [char; 2] = ['%', '"'];

/// Extracts tables from a schema description.
#[derive(Debug, Clone)]
pub struct SchemaParser {
    markers: Vec<String>,
}

impl Default for SchemaParser {
    fn default() -> Self {
        Self {
            markers: vec![DEFAULT_MARKER.to_string()],
        }
    }
}

impl SchemaParser {
    /// Creates a parser recognizing `Table` blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser recognizing the given block-opening markers.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::Configuration` if no usable marker is given.
    pub fn with_markers<S: AsRef<str>>(markers: &[S]) -> Result<Self> {
        let markers: Vec<String> = markers
            .iter()
            .map(|m| m.as_ref().trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if markers.is_empty() {
            return Err(AppSurveyorError::configuration(
                "At least one table marker is required",
            ));
        }
        let parser = Self { markers };
        parser.opening_regex()?;
        Ok(parser)
    }

    /// Block-opening markers this parser recognizes.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    fn opening_regex(&self) -> Result<Regex> {
        let alternatives: Vec<String> = self.markers.iter().map(|m| regex::escape(m)).collect();
        let pattern = format!(
            r#"\b(?:{})\s+(?:"([^"]*)"|(%?\w+))\s*\{{"#,
            alternatives.join("|")
        );
        Regex::new(&pattern).map_err(|e| {
            AppSurveyorError::configuration(format!("Invalid table marker pattern: {}", e))
        })
    }

    /// Parses a schema description into tables.
    ///
    /// Tables are returned in order of first appearance. Blocks naming the
    /// same cleaned identifier collapse into one table with merged columns.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::SchemaParse` if no table could be extracted.
    ///
    /// # Example
    /// ```rust
    /// use appsurveyor_core::schema::SchemaParser;
    ///
    /// let dbml = r#"
    /// Table "user" {
    ///   email text
    /// }
    /// Table %order_item {
    ///   total number
    /// }
    /// "#;
    /// let tables = SchemaParser::new().parse(dbml)?;
    /// assert_eq!(tables.len(), 2);
    /// assert_eq!(tables[1].id, "order_item");
    /// assert_eq!(tables[1].display_name, "Order item");
    /// # Ok::<(), appsurveyor_core::AppSurveyorError>(())
    /// ```
    pub fn parse(&self, description: &str) -> Result<Vec<Table>> {
        let opening = self.opening_regex()?;
        let openings: Vec<(usize, usize, String)> = opening
            .captures_iter(description)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let raw = caps.get(1).or_else(|| caps.get(2))?;
                Some((whole.start(), whole.end(), raw.as_str().to_string()))
            })
            .collect();

        let mut tables: Vec<Table> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut skipped = 0usize;

        for (index, (_, body_start, raw_name)) in openings.iter().enumerate() {
            let region_end = openings
                .get(index.saturating_add(1))
                .map_or(description.len(), |(next_start, _, _)| *next_start);
            let region = &description[*body_start..region_end];

            let id = clean_identifier(raw_name);
            if id.is_empty() {
                skipped = skipped.saturating_add(1);
                continue;
            }

            let Some(body) = block_body(region) else {
                debug!("Skipping unterminated schema block '{}'", id);
                skipped = skipped.saturating_add(1);
                continue;
            };

            let columns = parse_columns(body);
            match positions.get(&id) {
                Some(&position) => {
                    for column in columns {
                        tables[position].push_column(column);
                    }
                }
                None => {
                    positions.insert(id.clone(), tables.len());
                    tables.push(Table::new(id).with_columns(columns));
                }
            }
        }

        if tables.is_empty() {
            return Err(AppSurveyorError::schema_parse(format!(
                "No tables found in schema description ({} malformed blocks skipped)",
                skipped
            )));
        }

        debug!(
            "Parsed {} tables from schema description ({} malformed blocks skipped)",
            tables.len(),
            skipped
        );
        Ok(tables)
    }
}

/// Strips artifact characters from a raw table name.
pub fn clean_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !NAME_ARTIFACTS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Returns the block body up to its matching closing brace.
///
/// Braces inside quoted strings do not count. Quotes never span lines.
fn block_body(region: &str) -> Option<&str> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (offset, ch) in region.char_indices() {
        match (quote, ch) {
            (_, '\n') => quote = None,
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '{') => depth = depth.saturating_add(1),
            (None, '}') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&region[..offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Counts the opening and closing braces of a line outside quoted strings.
fn structural_braces(line: &str) -> (usize, usize) {
    let mut quote: Option<char> = None;
    let (mut opens, mut closes) = (0usize, 0usize);
    for ch in line.chars() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '{') => opens = opens.saturating_add(1),
            (None, '}') => closes = closes.saturating_add(1),
            _ => {}
        }
    }
    (opens, closes)
}

/// Parses top-level `name type` column lines of a block body.
fn parse_columns(body: &str) -> Vec<Column> {
    let mut columns = Vec::new();
    let mut depth = 0usize;

    for line in body.lines() {
        let trimmed = line.trim();
        let (opens, closes) = structural_braces(trimmed);

        if depth == 0 && opens == 0 && !is_non_column_line(trimmed) {
            if let Some(column) = parse_column_line(trimmed) {
                columns.push(column);
            }
        }

        depth = depth.saturating_add(opens).saturating_sub(closes);
    }

    columns
}

fn is_non_column_line(line: &str) -> bool {
    if line.is_empty() || line.starts_with("//") || line.starts_with('}') {
        return true;
    }
    let lower = line.to_ascii_lowercase();
    lower.starts_with("note:") || lower.starts_with("note ") || lower == "note"
}

fn parse_column_line(line: &str) -> Option<Column> {
    let (name, rest) = if let Some(quoted) = line.strip_prefix('"') {
        let end = quoted.find('"')?;
        (&quoted[..end], &quoted[end.saturating_add(1)..])
    } else {
        let end = line.find(char::is_whitespace).unwrap_or(line.len());
        (&line[..end], &line[end..])
    };

    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let column_type = rest
        .split_whitespace()
        .next()
        .map(|t| t.trim_matches('"'))
        .filter(|t| !t.is_empty() && !t.starts_with('['))
        .unwrap_or("unknown");

    Some(Column::new(name, column_type))
}
