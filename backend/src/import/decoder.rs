//! Turns an uploaded workbook or CSV file into ordered rows of `column -> raw text`.
//!
//! Only the first worksheet is read and its first row is the header. Header cells are
//! trimmed, case-folded according to [`ColumnCasing`], then renamed through the entity's
//! aliases (matched ignoring case) before the required columns are checked. Required columns come out of the decoder
//! under their canonical names whatever spelling the file used.

use super::entity::EntitySpec;
use super::error::ImportError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;

/// One data row of the sheet. `line` is the 1-based row number in the file (the header is 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub line: usize,
    pub cells: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    /// xlsx, xlsm, xlsb, xls or ods; detected from the payload.
    Workbook,
    Csv,
}

impl SheetFormat {
    pub fn from_filename(filename: &str) -> SheetFormat {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            SheetFormat::Csv
        } else {
            SheetFormat::Workbook
        }
    }
}

/// How header names are folded before they are compared with the required columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnCasing {
    /// Headers must match the canonical names exactly.
    Preserve,
    #[default]
    Lower,
    Upper,
}

impl ColumnCasing {
    pub fn fold(&self, name: &str) -> String {
        match self {
            ColumnCasing::Preserve => name.to_string(),
            ColumnCasing::Lower => name.to_lowercase(),
            ColumnCasing::Upper => name.to_uppercase(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnPolicy {
    pub casing: ColumnCasing,
    /// `(alias, column)` pairs; applied after folding, before the required-column check. Aliases
    /// match whatever the casing.
    pub renames: Vec<(String, String)>,
}

impl ColumnPolicy {
    pub fn for_entity(spec: &EntitySpec, casing: ColumnCasing) -> Self {
        Self {
            casing,
            renames: spec
                .aliases
                .iter()
                .map(|(alias, column)| (alias.to_string(), column.to_string()))
                .collect(),
        }
    }
}

/// Decodes `payload` and checks that every column in `required` is present.
pub fn decode(
    payload: &[u8],
    format: SheetFormat,
    required: &[&str],
    policy: &ColumnPolicy,
) -> Result<Vec<RawRow>, ImportError> {
    let grid = match format {
        SheetFormat::Workbook => read_workbook(payload)?,
        SheetFormat::Csv => read_csv(payload)?,
    };

    let mut lines = grid.into_iter();
    let header = lines.next().unwrap_or_default();
    let columns = resolve_header(&header, required, policy)?;

    let rows = lines
        .enumerate()
        .map(|(idx, cells)| RawRow {
            line: idx + 2,
            cells: columns
                .iter()
                .enumerate()
                .filter_map(|(col_idx, name)| {
                    let name = name.as_ref()?;
                    let value = cells.get(col_idx).cloned().unwrap_or_default();
                    Some((name.clone(), value))
                })
                .collect(),
        })
        .collect();

    Ok(rows)
}

/// Maps each header cell to the name its values are stored under, or `None` to ignore the
/// column (blank header, a repeated name, or an alias whose canonical column is also present).
fn resolve_header(
    header: &[String],
    required: &[&str],
    policy: &ColumnPolicy,
) -> Result<Vec<Option<String>>, ImportError> {
    let canonical: HashMap<String, &str> = required
        .iter()
        .map(|column| (policy.casing.fold(column), *column))
        .collect();
    // Aliases match case-insensitively under every policy.
    let renames: HashMap<String, String> = policy
        .renames
        .iter()
        .map(|(alias, column)| (alias.to_lowercase(), policy.casing.fold(column)))
        .collect();

    let folded: Vec<String> = header
        .iter()
        .map(|cell| policy.casing.fold(cell.trim()))
        .collect();

    let mut found = Vec::with_capacity(folded.len());
    let mut columns = Vec::with_capacity(folded.len());
    for name in &folded {
        if name.is_empty() {
            columns.push(None);
            continue;
        }
        let name = match renames.get(&name.to_lowercase()) {
            Some(target) if !folded.contains(target) => target.clone(),
            Some(_) => {
                log::debug!("ignoring alias column '{name}': its canonical column is present");
                columns.push(None);
                continue;
            }
            None => name.clone(),
        };
        let stored = canonical
            .get(&name)
            .map(|column| column.to_string())
            .unwrap_or_else(|| name.clone());
        if found.contains(&name) {
            columns.push(None);
            continue;
        }
        found.push(name);
        columns.push(Some(stored));
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|column| !found.contains(&policy.casing.fold(column)))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::Schema { missing, found });
    }

    Ok(columns)
}

fn read_workbook(payload: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(payload.to_vec()))
        .map_err(|e| ImportError::Decode(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Decode("workbook has no worksheet".to_string()))?
        .map_err(|e| ImportError::Decode(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn read_csv(payload: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(payload);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::Decode(e.to_string()))?;
        grid.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    if let Some(first) = grid.first_mut().and_then(|header| header.first_mut()) {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }
    Ok(grid)
}

pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => v.to_string(),
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}
