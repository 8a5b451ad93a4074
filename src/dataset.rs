//! Training CSV loading and cleaning.
//!
//! The dataset is small enough to hold fully in memory as an
//! all-numeric table. Cells that fail to parse abort the run; this is an
//! offline batch job and partial results are worse than no results.

use std::io::Read;
use std::path::Path;

use ndarray::{Array1, Array2};
use thiserror::Error;

use crate::columns;
use crate::features::{FEATURES, FEATURE_COUNT, LABEL_COLUMN};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    BadCell {
        row: usize,
        column: String,
        value: String,
    },
    #[error("required column '{0}' not found in the dataset")]
    MissingColumn(String),
    #[error("no complete rows left after dropping missing values")]
    Empty,
}

/// An in-memory table of named numeric columns. `None` marks a missing cell.
#[derive(Debug, Clone)]
pub struct ClinicalTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

fn parse_cell(raw: &str, row: usize, column: &str) -> Result<Option<f64>, DatasetError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") || trimmed.eq_ignore_ascii_case("nan")
    {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| DatasetError::BadCell {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

impl ClinicalTable {
    /// Read a CSV file and normalize its header row.
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, DatasetError> {
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let columns = columns::normalize_columns(&headers);

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = record
                .iter()
                .enumerate()
                .map(|(j, cell)| {
                    let column = columns.get(j).map(String::as_str).unwrap_or("");
                    parse_cell(cell, i, column)
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    fn column_index(&self, name: &str) -> Result<usize, DatasetError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    /// Drop every row containing a missing value.
    pub fn drop_incomplete(mut self) -> Self {
        self.rows.retain(|row| row.iter().all(Option::is_some));
        self
    }

    /// Recompute BMI from weight and height, replacing any existing BMI
    /// column. Height is stored in centimeters; BMI = kg / m².
    pub fn derive_bmi(&mut self) -> Result<(), DatasetError> {
        let weight_idx = self.column_index("Weight (Kg)")?;
        let height_idx = self.column_index("Height(Cm)")?;
        let bmi_idx = match self.columns.iter().position(|c| c == "BMI") {
            Some(idx) => idx,
            None => {
                self.columns.push("BMI".to_string());
                for row in &mut self.rows {
                    row.push(None);
                }
                self.columns.len() - 1
            }
        };

        for row in &mut self.rows {
            row[bmi_idx] = match (row[weight_idx], row[height_idx]) {
                (Some(weight), Some(height)) => {
                    let height_m = height / 100.0;
                    Some(weight / (height_m * height_m))
                }
                _ => None,
            };
        }
        Ok(())
    }

    /// Select the 17 model features (in fit order) and the label column.
    ///
    /// Expects a complete table; call [`drop_incomplete`](Self::drop_incomplete)
    /// first. A PCOS label of 1 is the positive class.
    pub fn into_features(self) -> Result<(Array2<f64>, Array1<bool>), DatasetError> {
        if self.rows.is_empty() {
            return Err(DatasetError::Empty);
        }
        let feature_indices = FEATURES
            .iter()
            .map(|f| self.column_index(f.name))
            .collect::<Result<Vec<_>, _>>()?;
        let label_idx = self.column_index(LABEL_COLUMN)?;

        let mut records = Array2::zeros((self.rows.len(), FEATURE_COUNT));
        let mut targets = Array1::from_elem(self.rows.len(), false);
        for (i, row) in self.rows.iter().enumerate() {
            for (j, &idx) in feature_indices.iter().enumerate() {
                records[[i, j]] = row[idx].unwrap_or(f64::NAN);
            }
            targets[i] = row[label_idx].unwrap_or(0.0) == 1.0;
        }
        Ok((records, targets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
 Age (yrs),Weight (Kg),Height(Cm) ,PCOS (Y/N)
28,65,160,0
31,80,,1
25,55,150,1
";

    #[test]
    fn normalizes_headers_on_load() {
        let table = ClinicalTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(
            table.columns,
            vec!["Age (yrs)", "Weight (Kg)", "Height(Cm)", "PCOS (Y/N)"]
        );
    }

    #[test]
    fn drops_rows_with_missing_values() {
        let table = ClinicalTable::from_reader(CSV.as_bytes())
            .unwrap()
            .drop_incomplete();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn derives_bmi_from_weight_and_height() {
        let mut table = ClinicalTable::from_reader(CSV.as_bytes())
            .unwrap()
            .drop_incomplete();
        table.derive_bmi().unwrap();
        assert_eq!(table.columns.last().map(String::as_str), Some("BMI"));
        let bmi = table.rows[0].last().copied().flatten().unwrap();
        assert!((bmi - 65.0 / (1.6 * 1.6)).abs() < 1e-9);
    }

    #[test]
    fn bad_cell_aborts_the_load() {
        let csv = "Age (yrs),PCOS (Y/N)\ntwenty,1\n";
        let err = ClinicalTable::from_reader(csv.as_bytes()).unwrap_err();
        match err {
            DatasetError::BadCell { column, value, .. } => {
                assert_eq!(column, "Age (yrs)");
                assert_eq!(value, "twenty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_feature_column_is_reported() {
        let csv = "Age (yrs),PCOS (Y/N)\n28,1\n";
        let table = ClinicalTable::from_reader(csv.as_bytes()).unwrap();
        let err = table.into_features().unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(_)));
    }
}
