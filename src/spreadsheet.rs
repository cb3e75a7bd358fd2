//! Reading and writing `.xlsx` workbooks for the club dashboard.

use std::io::Cursor;

use actix_web::http::header;
use actix_web::HttpResponse;
use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;

use crate::errors::ServiceError;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A value written to a single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

/// The used area of a sheet. Leading empty rows are not part of `rows`,
/// `first_row` is the zero based sheet row of `rows[0]`.
#[derive(Debug, Default)]
pub struct Sheet {
    pub first_row: usize,
    pub rows: Vec<Vec<Data>>,
}

/// the first sheet, header row included
pub fn read_first_sheet(bytes: &[u8]) -> Result<Sheet, ServiceError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => bad_request!("the spreadsheet has no sheets"),
    };

    Ok(Sheet {
        first_row: range.start().map_or(0, |(row, _)| row as usize),
        rows: range.rows().map(|row| row.to_vec()).collect(),
    })
}

/// the index of the column with this name, ignoring case and whitespace
pub fn column_index(header: &[Data], name: &str) -> Option<usize> {
    header.iter().position(|cell| match cell {
        Data::String(value) => value.trim().eq_ignore_ascii_case(name),
        _ => false,
    })
}

/// the cell as text, None for empty cells
pub fn cell_string(row: &[Data], column: Option<usize>) -> Option<String> {
    let value = match row.get(column?)? {
        Data::String(value) => value.trim().to_string(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 => format!("{}", *value as i64),
        Data::Float(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        _ => return None,
    };

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// a whole number, errors when the cell holds something else
pub fn cell_integer(row: &[Data], column: Option<usize>) -> Result<Option<i64>, String> {
    let cell = match column.and_then(|column| row.get(column)) {
        Some(cell) => cell,
        None => return Ok(None),
    };

    match cell {
        Data::Empty => Ok(None),
        Data::Int(value) => Ok(Some(*value)),
        Data::Float(value) if value.fract() == 0.0 => Ok(Some(*value as i64)),
        Data::String(value) if value.trim().is_empty() => Ok(None),
        Data::String(value) => value
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("\"{}\" is not a whole number", value.trim())),
        other => Err(format!("\"{}\" is not a whole number", other)),
    }
}

/// An amount like `12.5` in the sheet is stored as 1250 cents
pub fn cell_cents(row: &[Data], column: Option<usize>) -> Result<Option<i64>, String> {
    let cell = match column.and_then(|column| row.get(column)) {
        Some(cell) => cell,
        None => return Ok(None),
    };

    let amount = match cell {
        Data::Empty => return Ok(None),
        Data::Int(value) => *value as f64,
        Data::Float(value) => *value,
        Data::String(value) if value.trim().is_empty() => return Ok(None),
        Data::String(value) => value
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| format!("\"{}\" is not an amount", value.trim()))?,
        other => return Err(format!("\"{}\" is not an amount", other)),
    };

    Ok(Some(to_cents(amount)))
}

pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Writes a single sheet workbook and returns the file contents.
pub fn write_workbook(
    sheet_name: &str,
    header: &[&str],
    rows: &[Vec<Cell>],
) -> Result<Vec<u8>, ServiceError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (column, name) in header.iter().enumerate() {
        worksheet.write_string(0, column as u16, *name)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let row_number = (index + 1) as u32;

        for (column, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string(row_number, column as u16, value)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(row_number, column as u16, *value)?;
                }
                Cell::Empty => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// answers with the workbook as a file download
pub fn download(filename: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let header = vec![
            Data::String(String::from(" Code ")),
            Data::String(String::from("NAME")),
            Data::Empty,
        ];

        assert_eq!(column_index(&header, "code"), Some(0));
        assert_eq!(column_index(&header, "name"), Some(1));
        assert_eq!(column_index(&header, "price"), None);
    }

    #[test]
    fn cells_as_text() {
        let row = vec![
            Data::String(String::from("  racket ")),
            Data::Float(42.0),
            Data::String(String::from("   ")),
        ];

        assert_eq!(cell_string(&row, Some(0)), Some(String::from("racket")));
        assert_eq!(cell_string(&row, Some(1)), Some(String::from("42")));
        assert_eq!(cell_string(&row, Some(2)), None);
        assert_eq!(cell_string(&row, Some(7)), None);
        assert_eq!(cell_string(&row, None), None);
    }

    #[test]
    fn whole_numbers() {
        let row = vec![
            Data::Int(3),
            Data::Float(4.0),
            Data::String(String::from("12")),
            Data::Float(1.5),
            Data::String(String::from("many")),
        ];

        assert_eq!(cell_integer(&row, Some(0)), Ok(Some(3)));
        assert_eq!(cell_integer(&row, Some(1)), Ok(Some(4)));
        assert_eq!(cell_integer(&row, Some(2)), Ok(Some(12)));
        assert!(cell_integer(&row, Some(3)).is_err());
        assert!(cell_integer(&row, Some(4)).is_err());
    }

    #[test]
    fn amounts_in_cents() {
        let row = vec![
            Data::Float(12.5),
            Data::String(String::from("3,20")),
            Data::Int(7),
        ];

        assert_eq!(cell_cents(&row, Some(0)), Ok(Some(1250)));
        assert_eq!(cell_cents(&row, Some(1)), Ok(Some(320)));
        assert_eq!(cell_cents(&row, Some(2)), Ok(Some(700)));
        assert_eq!(from_cents(1250), 12.5);
    }

    #[test]
    fn written_workbooks_can_be_read() {
        let rows = vec![vec![
            Cell::Text(String::from("B-01")),
            Cell::Number(2.5),
            Cell::Empty,
        ]];

        let bytes = write_workbook("inventory", &["code", "price", "category"], &rows).unwrap();
        let sheet = read_first_sheet(&bytes).unwrap();
        let read = sheet.rows;

        assert_eq!(sheet.first_row, 0);
        assert_eq!(read.len(), 2);
        assert_eq!(column_index(&read[0], "price"), Some(1));
        assert_eq!(cell_string(&read[1], Some(0)), Some(String::from("B-01")));
        assert_eq!(cell_cents(&read[1], Some(1)), Ok(Some(250)));
    }

    #[test]
    fn leading_empty_rows_are_counted() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(2, 0, "code").unwrap();
        worksheet.write_string(2, 1, "name").unwrap();
        worksheet.write_string(3, 0, "B-01").unwrap();
        worksheet.write_string(3, 1, "Balls").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sheet = read_first_sheet(&bytes).unwrap();

        assert_eq!(sheet.first_row, 2);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(column_index(&sheet.rows[0], "name"), Some(1));
    }

    #[test]
    fn garbage_is_rejected() {
        let result = read_first_sheet(b"definitely not a zip file");

        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }
}
