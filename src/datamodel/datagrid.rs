use crate::error::{KpiError, Result};

/// A CSV file read as text, header row split off.
#[derive(Debug, Clone, PartialEq)]
pub struct StringDataGrid {
    pub column_names: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StringDataGrid {
    pub fn new(column_names: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        // Check that all rows have the same length
        let row_length = column_names.len();
        if let Some(row) = rows.iter().find(|row| row.len() != row_length) {
            return Err(KpiError::invalid_data_format(
                "all rows must have the same length as the header",
                &row.join(","),
            ));
        }
        Ok(Self { column_names, rows })
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|column| column == name)
    }

    pub fn column(&self, position: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[position].as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Numeric cell: empty, `NaN` and non-numeric text are missing.
pub fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|value| !value.is_nan())
}

/// Numeric cell of a collector export: empty and `NaN` are missing, any
/// other text is an error.
pub fn parse_numeric_cell(cell: &str, context: &str) -> Result<Option<f64>> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(|value| (!value.is_nan()).then_some(value))
        .map_err(|_| KpiError::invalid_data_format(&format!("non-numeric value {:?}", cell), context))
}
