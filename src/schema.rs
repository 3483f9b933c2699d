// src/schema.rs

//! Column types, constraints, and schema parsing
//!
//! A table's schema is the first line of its decrypted plaintext: one
//! comma-separated spec per column, each of the form
//! `name(TYPE)(CONSTRAINT1)(CONSTRAINT2)...`. A `DEFAULT` constraint embeds
//! its literal as `DEFAULT#<literal>`.

use crate::error::{Error, Result};
use std::str::FromStr;

/// Canonical absent-value marker used throughout the engine.
///
/// On disk a null cell serializes as the empty string; in memory it is this
/// literal. The two are interchangeable at every boundary.
pub const NULL_MARKER: &str = "null";

/// Name of the primary-key column synthesized when a schema declares none
pub const SYNTHETIC_PK: &str = "self_pk";

/// The closed set of column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    BigInt,
    Double,
    BigDouble,
    Char,
    Varchar,
    Date,
    Bool,
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::BigDouble => "BIGDOUBLE",
            ColumnType::Char => "CHAR",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Date => "DATE",
            ColumnType::Bool => "BOOL",
        }
    }

    /// Whether values of this type participate in LIKE prefix matching
    pub fn is_text(&self) -> bool {
        matches!(self, ColumnType::Char | ColumnType::Varchar)
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "INT" => Ok(ColumnType::Int),
            "BIGINT" => Ok(ColumnType::BigInt),
            "DOUBLE" => Ok(ColumnType::Double),
            "BIGDOUBLE" => Ok(ColumnType::BigDouble),
            "CHAR" => Ok(ColumnType::Char),
            "VARCHAR" | "STRING" => Ok(ColumnType::Varchar),
            "DATE" => Ok(ColumnType::Date),
            "BOOL" => Ok(ColumnType::Bool),
            _ => Err(format!("Invalid data type: {}", s)),
        }
    }
}

/// The closed set of column constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Primary,
    NotNull,
    Unique,
    AutoIncrement,
    /// Substituted for null on insert; the literal is validated against the
    /// column's type at creation time
    Default(String),
}

impl Constraint {
    /// Render in the on-disk header form
    pub fn as_header(&self) -> String {
        match self {
            Constraint::Primary => "PRIMARY".to_string(),
            Constraint::NotNull => "NOT_NULL".to_string(),
            Constraint::Unique => "UNIQUE".to_string(),
            Constraint::AutoIncrement => "AUTO_INCREMENT".to_string(),
            Constraint::Default(literal) => format!("DEFAULT#{}", literal),
        }
    }

    /// Stable name used for duplicate detection, ignoring any DEFAULT literal
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Primary => "PRIMARY",
            Constraint::NotNull => "NOT_NULL",
            Constraint::Unique => "UNIQUE",
            Constraint::AutoIncrement => "AUTO_INCREMENT",
            Constraint::Default(_) => "DEFAULT",
        }
    }
}

impl FromStr for Constraint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(literal) = s.strip_prefix("DEFAULT#") {
            return Ok(Constraint::Default(literal.to_string()));
        }
        match s {
            "PRIMARY" => Ok(Constraint::Primary),
            "NOT_NULL" => Ok(Constraint::NotNull),
            "UNIQUE" => Ok(Constraint::Unique),
            "AUTO_INCREMENT" => Ok(Constraint::AutoIncrement),
            _ => Err(format!("Invalid constraint: {}", s)),
        }
    }
}

/// One typed, constrained column
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub constraints: Vec<Constraint>,
}

impl Column {
    pub fn new(name: String, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            constraints: Vec::new(),
        }
    }

    pub fn is_primary(&self) -> bool {
        self.constraints.contains(&Constraint::Primary)
    }

    pub fn is_not_null(&self) -> bool {
        self.constraints.contains(&Constraint::NotNull)
    }

    pub fn is_unique(&self) -> bool {
        self.constraints.contains(&Constraint::Unique)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.constraints.contains(&Constraint::AutoIncrement)
    }

    /// The DEFAULT literal, if the column carries one
    pub fn default_value(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Default(literal) => Some(literal.as_str()),
            _ => None,
        })
    }

    /// Render this column's header spec, e.g. `id(INT)(PRIMARY)`
    pub fn as_header(&self) -> String {
        let mut spec = format!("{}({})", self.name, self.ty.as_str());
        for constraint in &self.constraints {
            spec.push('(');
            spec.push_str(&constraint.as_header());
            spec.push(')');
        }
        spec
    }
}

/// The ordered, validated column list of one table
#[derive(Debug, Clone)]
pub struct Schema {
    pub columns: Vec<Column>,
    pub primary_key_index: usize,
}

impl Schema {
    /// Column names in schema order
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Render the on-disk schema row
    pub fn render_header(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.as_header())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse the schema row of a stored table
    ///
    /// Inverse of [`Schema::render_header`]. A stored table always carries
    /// exactly one PRIMARY column; its absence means the file is corrupt.
    pub fn parse_header(line: &str) -> Result<Schema> {
        let mut columns = Vec::new();
        let mut primary_key_index = None;

        for (index, spec) in line.split(',').enumerate() {
            let spec = spec.trim();
            let open = spec
                .find('(')
                .ok_or_else(|| Error::Program(format!("malformed column spec \"{}\"", spec)))?;
            let close = spec[open..]
                .find(')')
                .map(|i| open + i)
                .ok_or_else(|| Error::Program(format!("malformed column spec \"{}\"", spec)))?;

            let name = spec[..open].trim().to_string();
            let ty: ColumnType = spec[open + 1..close]
                .trim()
                .parse()
                .map_err(Error::Program)?;

            let mut column = Column::new(name, ty);
            let mut rest = &spec[close + 1..];
            while let Some(open) = rest.find('(') {
                let close = rest[open..]
                    .find(')')
                    .map(|i| open + i)
                    .ok_or_else(|| Error::Program(format!("malformed column spec \"{}\"", spec)))?;
                let constraint: Constraint =
                    rest[open + 1..close].trim().parse().map_err(Error::Program)?;
                if constraint == Constraint::Primary {
                    primary_key_index = Some(index);
                }
                column.constraints.push(constraint);
                rest = &rest[close + 1..];
            }
            columns.push(column);
        }

        let primary_key_index = primary_key_index
            .ok_or_else(|| Error::Program("table header has no PRIMARY column".to_string()))?;
        Ok(Schema {
            columns,
            primary_key_index,
        })
    }

    /// Parse and validate a creation-time schema definition
    ///
    /// The input is the interior of the `make` value list, e.g.
    /// `id INT PRIMARY, name VARCHAR NOT_NULL, score DOUBLE DEFAULT 0.5`.
    ///
    /// Validation rules:
    /// - every column needs at least a name and a known type
    /// - constraints must be recognized and unique per column
    /// - at most one PRIMARY across the schema, typed INT or BIGINT;
    ///   if absent, a `self_pk INT PRIMARY` column is prepended
    /// - a DEFAULT literal must validate against the column's type
    pub fn parse_definition(definition: &str) -> Result<Schema> {
        let definition = definition.trim();
        if definition.is_empty() {
            return Err(Error::Syntax("Empty column definitions.".to_string()));
        }

        let mut columns = Vec::new();
        let mut primary_key_index = None;

        for def in definition.split(',') {
            let def = def.trim();
            if def.is_empty() {
                continue;
            }
            let tokens = tokenize_column_def(def);
            if tokens.len() < 2 {
                return Err(Error::InvalidArgument(format!(
                    "Column must have a name and datatype: \"{}\".",
                    def
                )));
            }

            let name = tokens[0].clone();
            let ty: ColumnType = tokens[1]
                .to_uppercase()
                .parse()
                .map_err(|_| {
                    Error::InvalidArgument(format!(
                        "Invalid data type for column \"{}\": {}",
                        name, tokens[1]
                    ))
                })?;
            let mut column = Column::new(name, ty);

            let mut i = 2;
            while i < tokens.len() {
                let word = tokens[i].to_uppercase();
                let constraint = if word == "DEFAULT" {
                    i += 1;
                    let literal = tokens
                        .get(i)
                        .ok_or_else(|| {
                            Error::InvalidArgument("No default value mentioned.".to_string())
                        })?
                        .clone();
                    if !validate_value(&literal, ty) {
                        return Err(Error::Mismatch(format!(
                            "{} doesn't match {} datatype.",
                            literal, column.name
                        )));
                    }
                    Constraint::Default(literal)
                } else {
                    // DEFAULT#<literal> is the on-disk spelling only; at
                    // creation time the literal is a separate token.
                    if word.starts_with("DEFAULT#") {
                        return Err(Error::InvalidArgument(format!(
                            "Invalid constraint for column \"{}\": {}",
                            column.name, tokens[i]
                        )));
                    }
                    word.parse::<Constraint>().map_err(|_| {
                        Error::InvalidArgument(format!(
                            "Invalid constraint for column \"{}\": {}",
                            column.name, tokens[i]
                        ))
                    })?
                };

                if column.constraints.iter().any(|c| c.kind() == constraint.kind()) {
                    return Err(Error::InvalidArgument(format!(
                        "Multiple {} definitions found.",
                        constraint.kind()
                    )));
                }
                if constraint == Constraint::Primary {
                    if primary_key_index.is_some() {
                        return Err(Error::InvalidArgument(
                            "Multiple PRIMARY definitions found. Only one PRIMARY is allowed."
                                .to_string(),
                        ));
                    }
                    if !matches!(ty, ColumnType::Int | ColumnType::BigInt) {
                        return Err(Error::InvalidArgument(format!(
                            "Only INT/BIGINT columns can be defined as PRIMARY. Column \"{}\" has type {}.",
                            column.name,
                            ty.as_str()
                        )));
                    }
                    primary_key_index = Some(columns.len());
                }
                column.constraints.push(constraint);
                i += 1;
            }
            columns.push(column);
        }

        if columns.is_empty() {
            return Err(Error::Syntax("Empty column definitions.".to_string()));
        }

        // Without a user-declared PRIMARY, prepend the synthetic key column.
        let primary_key_index = match primary_key_index {
            Some(index) => index,
            None => {
                let mut pk = Column::new(SYNTHETIC_PK.to_string(), ColumnType::Int);
                pk.constraints.push(Constraint::Primary);
                columns.insert(0, pk);
                0
            }
        };

        Ok(Schema {
            columns,
            primary_key_index,
        })
    }
}

/// Tokenize one column definition by whitespace, preserving quoted substrings
fn tokenize_column_def(def: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in def.chars() {
        match ch {
            '"' | '\'' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Check a textual value against a column type
///
/// The null marker is always valid here; NOT_NULL is enforced separately.
/// Numeric types must parse in their entirety. DATE expects `YYYY-MM-DD`
/// with a real month and day; February is fixed at 28 days.
pub fn validate_value(value: &str, ty: ColumnType) -> bool {
    if value == NULL_MARKER {
        return true;
    }
    match ty {
        ColumnType::Int => value.parse::<i32>().is_ok(),
        ColumnType::BigInt => value.parse::<i64>().is_ok(),
        ColumnType::Double | ColumnType::BigDouble => value.parse::<f64>().is_ok(),
        ColumnType::Char => value.chars().count() == 1,
        ColumnType::Varchar => !value.is_empty(),
        ColumnType::Date => is_valid_date(value),
        ColumnType::Bool => {
            let lower = value.to_lowercase();
            matches!(lower.as_str(), "true" | "false" | "1" | "0")
        }
    }
}

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// `YYYY-MM-DD` with month 1..=12 and day within the month's length
fn is_valid_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return false;
    }
    let month: u32 = match value[5..7].parse() {
        Ok(m) => m,
        Err(_) => return false,
    };
    let day: u32 = match value[8..10].parse() {
        Ok(d) => d,
        Err(_) => return false,
    };
    if !(1..=12).contains(&month) {
        return false;
    }
    (1..=DAYS_IN_MONTH[(month - 1) as usize]).contains(&day)
}
