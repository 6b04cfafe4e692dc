//! Append-only spreadsheet store for parsed records.

mod lock;
mod sheet;

pub use lock::StoreLock;
pub use sheet::{Cell, Sheet, Workbook};

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::config::StoreConfig;
use crate::models::record::{Field, LicenseRecord, HEADERS};

/// Text shown in the View Image column.
pub const VIEW_IMAGE_TEXT: &str = "View Image";

/// What `ensure_schema` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    /// The workbook did not exist and was created.
    Created,
    /// The sheet had no data and was reset to the header.
    Reset,
    /// Row 1 (or the sheet name) was rewritten; data rows were kept.
    Repaired,
    /// Nothing to do.
    Unchanged,
}

/// Workbook holding one row per processed image.
///
/// Rows are only ever appended into the first fully blank row; existing rows
/// are never modified. Writers are serialized with a [`StoreLock`].
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    sheet_name: String,
    lock_timeout: Duration,
}

impl RecordStore {
    /// Store at `path` using sheet `Sheet1`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from_config(&StoreConfig {
            path: path.into(),
            ..StoreConfig::default()
        })
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            path: config.path.clone(),
            sheet_name: config.sheet_name.clone(),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        }
    }

    /// Set how long to wait for other writers.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Workbook path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure row 1 is the canonical header, without touching data rows.
    pub fn ensure_schema(&self) -> Result<SchemaAction, StoreError> {
        let _lock = StoreLock::acquire(&self.path, self.lock_timeout)?;
        self.load_with_schema().map(|(_, _, action)| action)
    }

    /// Write the record into the first blank row, with a View Image link to
    /// `source`. Returns the 1-based row number written.
    pub fn append(&self, record: &LicenseRecord, source: &str) -> Result<usize, StoreError> {
        let _lock = StoreLock::acquire(&self.path, self.lock_timeout)?;
        let (mut book, index, _) = self.load_with_schema()?;
        let sheet = &mut book.sheets[index];

        let row = first_blank_row(sheet);
        for (field, value) in record.values() {
            let cell = if value.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(value.to_string())
            };
            sheet.set(row, field.column(), cell);
        }
        sheet.set(
            row,
            Field::ViewImage.column(),
            Cell::Link {
                target: source.to_string(),
                text: VIEW_IMAGE_TEXT.to_string(),
            },
        );
        self.save(&book)?;

        info!("Appended row {} to {}", row + 1, self.path.display());
        Ok(row + 1)
    }

    /// All rows of the sheet, header first. Empty if the workbook does not exist.
    pub fn rows(&self) -> Result<Vec<Vec<Cell>>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Sheet::read(&self.path, &self.sheet_name).map(|s| s.rows)
    }

    fn save(&self, book: &Workbook) -> Result<(), StoreError> {
        book.write_with_header(&self.path, Some(&self.sheet_name))
    }

    /// Load the workbook and the index of the record sheet, repairing the
    /// header on disk if needed. Other sheets are carried along untouched.
    /// Caller holds the lock.
    fn load_with_schema(&self) -> Result<(Workbook, usize, SchemaAction), StoreError> {
        if !self.path.exists() {
            let book = Workbook {
                sheets: vec![header_only(&self.sheet_name)],
            };
            self.save(&book)?;
            info!("Created workbook {}", self.path.display());
            return Ok((book, 0, SchemaAction::Created));
        }

        let mut book = Workbook::read(&self.path)?;
        let Some(index) = book.sheet_index(&self.sheet_name) else {
            book.sheets.push(header_only(&self.sheet_name));
            self.save(&book)?;
            debug!("Added sheet {} to {}", self.sheet_name, self.path.display());
            return Ok((book, 0, SchemaAction::Reset));
        };
        let sheet = &mut book.sheets[index];

        if !sheet.has_data() {
            *sheet = header_only(&self.sheet_name);
            self.save(&book)?;
            debug!("Reset blank sheet in {}", self.path.display());
            return Ok((book, index, SchemaAction::Reset));
        }

        let header_ok = header_matches(sheet);
        let name_ok = sheet.name == self.sheet_name;
        if header_ok && name_ok {
            return Ok((book, index, SchemaAction::Unchanged));
        }

        if !header_ok {
            if sheet.rows.is_empty() {
                sheet.rows.push(Vec::new());
            }
            sheet.rows[0] = header_row();
        }
        sheet.name = self.sheet_name.clone();
        self.save(&book)?;
        info!("Repaired header of {}", self.path.display());
        Ok((book, index, SchemaAction::Repaired))
    }
}

fn header_row() -> Vec<Cell> {
    HEADERS.iter().map(|h| Cell::Text(h.to_string())).collect()
}

fn header_only(name: &str) -> Sheet {
    Sheet {
        name: name.to_string(),
        rows: vec![header_row()],
    }
}

fn header_matches(sheet: &Sheet) -> bool {
    let mut texts: Vec<String> = sheet
        .rows
        .first()
        .map(|row| row.iter().map(Cell::text).collect())
        .unwrap_or_default();
    while texts.last().is_some_and(|t| t.is_empty()) {
        texts.pop();
    }
    texts == HEADERS
}

/// First data row (index 1 and up) blank across all columns in use.
fn first_blank_row(sheet: &Sheet) -> usize {
    let columns = sheet.width().max(HEADERS.len());
    (1..)
        .find(|&r| sheet.row_is_blank(r, columns))
        .unwrap_or(sheet.rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::{ExcelDateTime, Format, Formula};

    fn record(first: &str, last: &str) -> LicenseRecord {
        let mut r = LicenseRecord::new(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
        r.set(Field::FirstName, first);
        r.set(Field::LastName, last);
        r
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn write_sheet(path: &Path, sheet: Sheet) {
        Workbook {
            sheets: vec![sheet],
        }
        .write(path)
        .unwrap();
    }

    fn header_texts(rows: &[Vec<Cell>]) -> Vec<String> {
        rows[0].iter().map(Cell::text).collect()
    }

    #[test]
    fn test_ensure_schema_creates_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("data.xlsx"));

        assert_eq!(store.ensure_schema().unwrap(), SchemaAction::Created);
        assert_eq!(store.ensure_schema().unwrap(), SchemaAction::Unchanged);

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(header_texts(&rows), HEADERS.to_vec());
    }

    #[test]
    fn test_append_uses_next_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("data.xlsx"));
        store.ensure_schema().unwrap();

        assert_eq!(store.append(&record("John", "Smith"), "/scans/a.png").unwrap(), 2);
        assert_eq!(store.append(&record("Jane", "Doe"), "/scans/b.png").unwrap(), 3);

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][Field::LastName.column()], text("Smith"));
        assert_eq!(rows[1][Field::Date.column()], text("05/20/2024"));
        assert_eq!(rows[2][Field::FirstName.column()], text("Jane"));
        assert_eq!(
            rows[1][Field::ViewImage.column()],
            Cell::Link {
                target: "/scans/a.png".to_string(),
                text: VIEW_IMAGE_TEXT.to_string(),
            }
        );
        assert_eq!(
            rows[2][Field::ViewImage.column()],
            Cell::Link {
                target: "/scans/b.png".to_string(),
                text: VIEW_IMAGE_TEXT.to_string(),
            }
        );
    }

    #[test]
    fn test_append_creates_missing_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("data.xlsx"));
        assert_eq!(store.append(&record("John", "Smith"), "a.png").unwrap(), 2);
    }

    #[test]
    fn test_append_fills_gap_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut sheet = header_only("Sheet1");
        sheet.set(1, 0, text("555-000-0001"));
        sheet.set(3, 20, text("note far right"));
        write_sheet(&path, sheet);

        let store = RecordStore::new(&path);
        assert_eq!(store.append(&record("Ann", "Lee"), "c.png").unwrap(), 3);
        assert_eq!(store.append(&record("Bo", "Kim"), "d.png").unwrap(), 5);

        let rows = store.rows().unwrap();
        assert_eq!(rows[1][0], text("555-000-0001"));
        assert_eq!(rows[3][20], text("note far right"));
        assert_eq!(rows[2][Field::LastName.column()], text("Lee"));
        assert_eq!(rows[4][Field::LastName.column()], text("Kim"));
    }

    #[test]
    fn test_repairs_wrong_header_keeping_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut sheet = Sheet::new("Sheet1");
        sheet.set(0, 0, text("Telephone"));
        sheet.set(0, 1, text("When"));
        sheet.set(0, 18, text("Extra"));
        sheet.set(1, 0, text("555-123-4567"));
        sheet.set(1, 1, Cell::Number(7.0));
        write_sheet(&path, sheet);

        let store = RecordStore::new(&path);
        assert_eq!(store.ensure_schema().unwrap(), SchemaAction::Repaired);

        let rows = store.rows().unwrap();
        let mut header = header_texts(&rows);
        while header.last().is_some_and(|t| t.is_empty()) {
            header.pop();
        }
        assert_eq!(header, HEADERS.to_vec());
        assert_eq!(rows[1][0], text("555-123-4567"));
        assert_eq!(rows[1][1], Cell::Number(7.0));

        assert_eq!(store.append(&record("John", "Smith"), "a.png").unwrap(), 3);
    }

    #[test]
    fn test_repairs_blank_header_keeping_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut sheet = Sheet::new("Sheet1");
        sheet.set(1, Field::LastName.column(), text("Doe"));
        write_sheet(&path, sheet);

        let store = RecordStore::new(&path);
        assert_eq!(store.ensure_schema().unwrap(), SchemaAction::Repaired);

        let rows = store.rows().unwrap();
        assert_eq!(header_texts(&rows), HEADERS.to_vec());
        assert_eq!(rows[1][Field::LastName.column()], text("Doe"));
    }

    #[test]
    fn test_resets_sheet_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        write_sheet(&path, Sheet::new("Sheet1"));

        let store = RecordStore::new(&path);
        assert_eq!(store.ensure_schema().unwrap(), SchemaAction::Reset);
        assert_eq!(store.rows().unwrap().len(), 1);
    }

    #[test]
    fn test_renames_foreign_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        let mut sheet = header_only("Intake");
        sheet.set(1, 0, text("555-123-4567"));
        write_sheet(&path, sheet);

        let store = RecordStore::new(&path);
        assert_eq!(store.ensure_schema().unwrap(), SchemaAction::Repaired);
        let read = Sheet::read(&path, "Sheet1").unwrap();
        assert_eq!(read.name, "Sheet1");
        assert_eq!(read.cell(1, 0), &text("555-123-4567"));
    }

    #[test]
    fn test_locked_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        let store = RecordStore::new(&path).with_lock_timeout(Duration::from_millis(100));

        let _held = StoreLock::acquire(&path, Duration::ZERO).unwrap();
        assert!(matches!(
            store.append(&record("John", "Smith"), "a.png"),
            Err(StoreError::Locked(_))
        ));
    }

    #[test]
    fn test_append_keeps_other_sheets_dates_and_formulas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let intake = workbook.add_worksheet();
        intake.set_name("Sheet1").unwrap();
        for (col, header) in HEADERS.iter().enumerate() {
            intake.write_string(0, col as u16, *header).unwrap();
        }
        intake.write_string(1, 0, "555-123-4567").unwrap();
        intake
            .write_datetime_with_format(
                1,
                1,
                &ExcelDateTime::from_ymd(2024, 5, 20).unwrap(),
                &Format::new().set_num_format("yyyy-mm-dd"),
            )
            .unwrap();
        intake.write_number(1, 13, 10).unwrap();
        intake.write_number(2, 13, 5).unwrap();
        intake
            .write_formula(3, 14, Formula::new("SUM(N2:N3)").set_result("15"))
            .unwrap();
        let summary = workbook.add_worksheet();
        summary.set_name("Summary").unwrap();
        summary.write_string(0, 0, "Scans this week").unwrap();
        summary.write_number(0, 1, 2).unwrap();
        workbook.save(&path).unwrap();

        let store = RecordStore::new(&path);
        assert_eq!(store.append(&record("John", "Smith"), "/scans/a.png").unwrap(), 5);

        let mut xlsx: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(xlsx.sheet_names(), vec!["Sheet1".to_string(), "Summary".to_string()]);

        let values = xlsx.worksheet_range("Sheet1").unwrap();
        assert!(matches!(values.get_value((1, 1)), Some(Data::DateTime(_))));
        assert_eq!(values.get_value((1, 0)), Some(&Data::String("555-123-4567".to_string())));
        let last_name = Field::LastName.column() as u32;
        assert_eq!(values.get_value((4, last_name)), Some(&Data::String("Smith".to_string())));

        let formulas = xlsx.worksheet_formula("Sheet1").unwrap();
        assert_eq!(formulas.get_value((3, 14)).map(String::as_str), Some("SUM(N2:N3)"));

        let summary = xlsx.worksheet_range("Summary").unwrap();
        assert_eq!(summary.get_value((0, 0)), Some(&Data::String("Scans this week".to_string())));
        assert_eq!(summary.get_value((0, 1)), Some(&Data::Float(2.0)));
    }

    #[test]
    fn test_concurrent_appends_get_distinct_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("data.xlsx"))
            .with_lock_timeout(Duration::from_secs(60));

        let mut written: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = store.clone();
                    s.spawn(move || {
                        store
                            .append(&record("Writer", &format!("No{i}")), &format!("/scans/{i}.png"))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        written.sort_unstable();
        assert_eq!(written, (2..=9).collect::<Vec<_>>());

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 9);
        let mut last_names: Vec<String> = rows[1..]
            .iter()
            .map(|r| r[Field::LastName.column()].text())
            .collect();
        last_names.sort();
        assert_eq!(last_names, (0..8).map(|i| format!("No{i}")).collect::<Vec<_>>());
    }
}
