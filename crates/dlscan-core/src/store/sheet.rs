//! In-memory copy of a workbook, read with calamine and written back with
//! rust_xlsxwriter.
//!
//! Every sheet is carried through a rewrite. Dates stay dates and formulas
//! stay formulas, with their cached results.

use std::io::Write;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use lazy_static::lazy_static;
use regex::Regex;
use rust_xlsxwriter::{Color, Format, FormatUnderline, Formula, Worksheet};

use crate::error::StoreError;

lazy_static! {
    static ref HYPERLINK_FORMULA: Regex = Regex::new(
        r#"(?i)^=?HYPERLINK\(\s*"((?:[^"]|"")*)"\s*,\s*"((?:[^"]|"")*)"\s*\)$"#
    ).unwrap();
}

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";
const HEADER_COLUMN_WIDTH: f64 = 18.0;

/// One cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date or date-time as an Excel serial number.
    DateTime(f64),
    /// Time span as a fraction of days.
    Duration(f64),
    /// Any formula other than a hyperlink, with its last computed value.
    Formula { formula: String, result: String },
    /// Hyperlink-styled cell showing `text` and pointing at `target`.
    Link { target: String, text: String },
}

impl Cell {
    /// No value, or an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Display text of the cell.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) | Cell::DateTime(n) | Cell::Duration(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Formula { result, .. } => result.clone(),
            Cell::Link { text, .. } => text.clone(),
        }
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) if dt.is_duration() => Cell::Duration(dt.as_f64()),
            Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
            other => Cell::Text(other.to_string()),
        }
    }

    fn from_formula(formula: &str, cached: Option<&Data>) -> Self {
        if let Some(link) = parse_hyperlink(formula) {
            return link;
        }
        Cell::Formula {
            formula: formula.to_string(),
            result: cached.map(|d| d.to_string()).unwrap_or_default(),
        }
    }
}

/// Parse a `HYPERLINK("target","text")` formula.
fn parse_hyperlink(formula: &str) -> Option<Cell> {
    let caps = HYPERLINK_FORMULA.captures(formula.trim())?;
    Some(Cell::Link {
        target: caps[1].replace("\"\"", "\""),
        text: caps[2].replace("\"\"", "\""),
    })
}

fn hyperlink_formula(target: &str, text: &str) -> String {
    format!(
        "HYPERLINK(\"{}\",\"{}\")",
        target.replace('"', "\"\""),
        text.replace('"', "\"\"")
    )
}

/// A worksheet as a dense grid of cells, row 0 being the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// An empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Read `sheet_name`, or the first sheet if there is no sheet with that name.
    pub fn read(path: &Path, sheet_name: &str) -> Result<Self, StoreError> {
        let book = Workbook::read(path)?;
        let index = book.sheet_index(sheet_name).ok_or_else(|| StoreError::Read {
            path: path.to_path_buf(),
            reason: "workbook has no sheets".to_string(),
        })?;
        let mut sheets = book.sheets;
        Ok(sheets.swap_remove(index))
    }

    fn from_ranges(name: String, values: &Range<Data>, formulas: Option<&Range<String>>) -> Self {
        let extent = |end: Option<(u32, u32)>| {
            end.map_or((0, 0), |(r, c)| (r as usize + 1, c as usize + 1))
        };
        let (mut height, mut width) = extent(values.end());
        if let Some(f) = formulas {
            let (h, w) = extent(f.end());
            height = height.max(h);
            width = width.max(w);
        }

        let mut rows = Vec::with_capacity(height);
        for r in 0..height {
            let mut row = Vec::with_capacity(width);
            for c in 0..width {
                let pos = (r as u32, c as u32);
                let value = values.get_value(pos);
                let cell = match formulas.and_then(|f| f.get_value(pos)) {
                    Some(formula) if !formula.is_empty() => Cell::from_formula(formula, value),
                    _ => value.map_or(Cell::Empty, Cell::from_data),
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Self { name, rows }
    }

    fn write_to(
        &self,
        worksheet: &mut Worksheet,
        formats: &Formats,
        header: bool,
    ) -> Result<(), StoreError> {
        worksheet.set_name(&self.name)?;
        if header {
            for c in 0..self.width() {
                worksheet.set_column_width(c as u16, HEADER_COLUMN_WIDTH)?;
            }
        }

        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) if header && r == 0 => {
                        worksheet.write_string_with_format(r, c, s, &formats.header)?;
                    }
                    Cell::Text(s) => {
                        worksheet.write_string(r, c, s)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r, c, *n)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(r, c, *b)?;
                    }
                    Cell::DateTime(serial) => {
                        let format = if serial.fract() == 0.0 {
                            &formats.date
                        } else {
                            &formats.datetime
                        };
                        worksheet.write_number_with_format(r, c, *serial, format)?;
                    }
                    Cell::Duration(days) => {
                        worksheet.write_number_with_format(r, c, *days, &formats.duration)?;
                    }
                    Cell::Formula { formula, result } => {
                        worksheet
                            .write_formula(r, c, Formula::new(formula.as_str()).set_result(result.as_str()))?;
                    }
                    Cell::Link { target, text } => {
                        let formula =
                            Formula::new(hyperlink_formula(target, text)).set_result(text.as_str());
                        worksheet.write_formula_with_format(r, c, formula, &formats.link)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of columns of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at `(row, col)`, `Empty` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    /// Set a cell, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = cell;
    }

    /// Whether the row is blank across the first `columns` columns.
    pub fn row_is_blank(&self, row: usize, columns: usize) -> bool {
        (0..columns).all(|c| self.cell(row, c).is_blank())
    }

    /// Whether any cell holds a value.
    pub fn has_data(&self) -> bool {
        self.rows.iter().flatten().any(|c| !c.is_blank())
    }
}

struct Formats {
    header: Format,
    date: Format,
    datetime: Format,
    duration: Format,
    link: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format(DATE_FORMAT),
            datetime: Format::new().set_num_format(DATETIME_FORMAT),
            duration: Format::new().set_num_format(DURATION_FORMAT),
            link: Format::new()
                .set_font_color(Color::Blue)
                .set_underline(FormatUnderline::Single),
        }
    }
}

/// All sheets of a workbook, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Read every sheet of the workbook at `path`.
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        let read_error = |reason: String| StoreError::Read {
            path: path.to_path_buf(),
            reason,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| read_error(e.to_string()))?;
        let names = workbook.sheet_names().to_vec();

        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let values = workbook
                .worksheet_range(&name)
                .map_err(|e| read_error(e.to_string()))?;
            let formulas = workbook.worksheet_formula(&name).ok();
            sheets.push(Sheet::from_ranges(name, &values, formulas.as_ref()));
        }

        Ok(Self { sheets })
    }

    /// Index of the sheet called `name`, else of the first sheet.
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name == name)
            .or(if self.sheets.is_empty() { None } else { Some(0) })
    }

    /// Write all sheets, replacing `path` atomically.
    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        self.write_with_header(path, None)
    }

    /// Like [`Workbook::write`], giving the sheet named `header_sheet` a bold
    /// first row and wider columns.
    pub fn write_with_header(&self, path: &Path, header_sheet: Option<&str>) -> Result<(), StoreError> {
        let formats = Formats::new();
        let mut workbook = rust_xlsxwriter::Workbook::new();
        for sheet in &self.sheets {
            let header = header_sheet == Some(sheet.name.as_str());
            sheet.write_to(workbook.add_worksheet(), &formats, header)?;
        }
        let buffer = workbook.save_to_buffer()?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&buffer)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::ExcelDateTime;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn book(sheets: Vec<Sheet>) -> Workbook {
        Workbook { sheets }
    }

    #[test]
    fn test_hyperlink_formula_round_trip() {
        let formula = hyperlink_formula("/scans/say \"hi\".png", "View Image");
        assert_eq!(formula, r#"HYPERLINK("/scans/say ""hi"".png","View Image")"#);
        assert_eq!(
            parse_hyperlink(&format!("={formula}")),
            Some(Cell::Link {
                target: "/scans/say \"hi\".png".to_string(),
                text: "View Image".to_string(),
            })
        );
        assert_eq!(parse_hyperlink("SUM(A1:A3)"), None);
    }

    #[test]
    fn test_set_grows_grid() {
        let mut sheet = Sheet::new("Sheet1");
        sheet.set(2, 3, text("x"));
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.width(), 4);
        assert_eq!(sheet.cell(2, 3), &text("x"));
        assert_eq!(sheet.cell(9, 9), &Cell::Empty);
        assert!(sheet.row_is_blank(1, 16));
        assert!(!sheet.row_is_blank(2, 16));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut sheet = Sheet::new("Sheet1");
        sheet.set(0, 0, text("Phone"));
        sheet.set(1, 0, text("555-123-4567"));
        sheet.set(1, 1, Cell::Number(42.0));
        sheet.set(
            1,
            2,
            Cell::Link {
                target: "/scans/a.png".to_string(),
                text: "View Image".to_string(),
            },
        );
        sheet.set(1, 3, Cell::DateTime(45432.0));
        book(vec![sheet]).write(&path).unwrap();

        let read = Sheet::read(&path, "Sheet1").unwrap();
        assert_eq!(read.name, "Sheet1");
        assert_eq!(read.cell(0, 0), &text("Phone"));
        assert_eq!(read.cell(1, 0), &text("555-123-4567"));
        assert_eq!(read.cell(1, 1), &Cell::Number(42.0));
        assert_eq!(
            read.cell(1, 2),
            &Cell::Link {
                target: "/scans/a.png".to_string(),
                text: "View Image".to_string(),
            }
        );
        assert_eq!(read.cell(1, 3), &Cell::DateTime(45432.0));
    }

    #[test]
    fn test_rewrite_keeps_sheets_dates_and_formulas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let date_format = Format::new().set_num_format("mm/dd/yyyy");
        let intake = workbook.add_worksheet();
        intake.set_name("Sheet1").unwrap();
        intake.write_string(0, 0, "Phone").unwrap();
        intake
            .write_datetime_with_format(1, 1, &ExcelDateTime::from_ymd(2024, 5, 20).unwrap(), &date_format)
            .unwrap();
        intake.write_number(1, 13, 10).unwrap();
        intake.write_number(2, 13, 5).unwrap();
        intake
            .write_formula(3, 14, Formula::new("SUM(N2:N3)").set_result("15"))
            .unwrap();
        let summary = workbook.add_worksheet();
        summary.set_name("Summary").unwrap();
        summary.write_string(0, 0, "Totals").unwrap();
        workbook.save(&path).unwrap();

        Workbook::read(&path).unwrap().write(&path).unwrap();
        let read = Workbook::read(&path).unwrap();

        let names: Vec<&str> = read.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sheet1", "Summary"]);
        let intake = &read.sheets[0];
        assert_eq!(intake.cell(1, 1), &Cell::DateTime(45432.0));
        assert_eq!(
            intake.cell(3, 14),
            &Cell::Formula {
                formula: "SUM(N2:N3)".to_string(),
                result: "15".to_string(),
            }
        );
        assert_eq!(read.sheets[1].cell(0, 0), &text("Totals"));
    }

    #[test]
    fn test_read_falls_back_to_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        let mut sheet = Sheet::new("Intake");
        sheet.set(0, 0, text("Phone"));
        book(vec![sheet]).write(&path).unwrap();

        let read = Sheet::read(&path, "Sheet1").unwrap();
        assert_eq!(read.name, "Intake");
        assert!(read.has_data());
    }

    #[test]
    fn test_read_missing_file() {
        let err = Workbook::read(Path::new("/no/such/data.xlsx")).unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
    }
}
