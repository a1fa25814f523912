use std::collections::BTreeMap;
use std::fmt::Write as _;

use rp_core::Error;
use serde::{Deserialize, Serialize};

pub const SOURCE_X: &str = "sourceX";
pub const SOURCE_Y: &str = "sourceY";
pub const TARGET_X: &str = "targetX";
pub const TARGET_Y: &str = "targetY";

/// Column-oriented table of optional numbers, one row per landmark.
///
/// Every column holds exactly `row_count` cells; a missing value is `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkTable {
    row_count: usize,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl LandmarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table with the four landmark columns.
    pub fn with_landmark_columns(row_count: usize) -> Self {
        let mut table = Self::new();
        table.set_row_count(row_count);
        for name in [SOURCE_X, SOURCE_Y, TARGET_X, TARGET_Y] {
            table.column_mut(name);
        }
        table
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Grows or shrinks every column; new cells are missing.
    pub fn set_row_count(&mut self, row_count: usize) {
        self.row_count = row_count;
        for cells in self.columns.values_mut() {
            cells.resize(row_count, None);
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Column `name`, created empty if absent.
    pub fn column_mut(&mut self, name: &str) -> &mut [Option<f64>] {
        let rows = self.row_count;
        self.columns
            .entry(name.to_owned())
            .or_insert_with(|| vec![None; rows])
    }

    pub fn get(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name)?.get(row).copied().flatten()
    }

    /// Stores `value`, growing the table when `row` is past the end.
    pub fn set(&mut self, name: &str, row: usize, value: f64) {
        if row >= self.row_count {
            self.set_row_count(row + 1);
        }
        self.column_mut(name)[row] = Some(value);
    }

    /// Comma-separated text with a header row; missing cells are empty.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let names: Vec<&str> = self.column_names().collect();
        out.push_str(&names.join(","));
        out.push('\n');
        for row in 0..self.row_count {
            for (i, name) in names.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if let Some(v) = self.get(name, row) {
                    let _ = write!(out, "{v}");
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn from_csv(text: &str) -> Result<Self, Error> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let Some((_, header)) = lines.next() else {
            return Ok(Self::new());
        };
        let names: Vec<String> = header.split(',').map(|h| h.trim().to_owned()).collect();

        let mut table = Self::new();
        for name in &names {
            if table.columns.contains_key(name) {
                return Err(Error::MalformedTable {
                    line: 1,
                    reason: format!("duplicate column '{name}'"),
                });
            }
            table.column_mut(name);
        }

        for (row, (idx, line)) in lines.enumerate() {
            let cells: Vec<&str> = line.split(',').collect();
            if cells.len() != names.len() {
                return Err(Error::MalformedTable {
                    line: idx + 1,
                    reason: format!("expected {} cells, found {}", names.len(), cells.len()),
                });
            }
            table.set_row_count(row + 1);
            for (name, cell) in names.iter().zip(cells) {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                let value = cell.parse::<f64>().map_err(|e| Error::MalformedTable {
                    line: idx + 1,
                    reason: format!("column '{name}': {e}"),
                })?;
                table.set(name, row, value);
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use rp_core::Error;

    use super::{LandmarkTable, SOURCE_X, TARGET_Y};

    #[test]
    fn row_count_resizes_columns() {
        let mut table = LandmarkTable::with_landmark_columns(2);
        table.set(SOURCE_X, 1, 4.5);
        table.set_row_count(3);
        assert_eq!(table.column(SOURCE_X), Some(&[None, Some(4.5), None][..]));
        table.set_row_count(1);
        assert_eq!(table.column(TARGET_Y), Some(&[None][..]));
    }

    #[test]
    fn csv_keeps_missing_cells() {
        let text = "sourceX,sourceY\n1.5,2\n,-3\n";
        let table = LandmarkTable::from_csv(text).expect("valid csv");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get("sourceX", 0), Some(1.5));
        assert_eq!(table.get("sourceX", 1), None);
        assert_eq!(table.get("sourceY", 1), Some(-3.0));

        let back = LandmarkTable::from_csv(&table.to_csv()).expect("valid csv");
        assert_eq!(back, table);
    }

    #[test]
    fn csv_rejects_ragged_rows() {
        let err = LandmarkTable::from_csv("a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, Error::MalformedTable { line: 3, .. }));

        let err = LandmarkTable::from_csv("a\nnope\n").unwrap_err();
        assert!(matches!(err, Error::MalformedTable { line: 2, .. }));
    }
}
