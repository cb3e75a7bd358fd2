use std::collections::HashMap;
use std::convert::TryFrom;

use calamine::Data;

use crate::errors::ServiceError;
use crate::spreadsheet::{self, Cell};

pub const HEADER: [&str; 5] = ["code", "name", "category", "quantity", "price"];

/// A valid spreadsheet row, ready to be upserted
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRow {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
    pub price: i64,
}

/// A row that was skipped, `row` is the row number as shown in the sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// **POST /api/inventory/import**
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<RowError>,
}

/// The valid rows of a sheet, deduplicated on code, plus the rejected ones.
#[derive(Debug, Default)]
pub struct ParsedSheet {
    pub rows: Vec<ArticleRow>,
    pub errors: Vec<RowError>,
}

/// Parses the rows of the first sheet, header included. `first_row` is the
/// zero based sheet row of the header, used for the reported row numbers.
///
/// Rows without a code are skipped silently. When a code shows up more
/// than once, the last row wins but keeps the position of the first.
pub fn parse_rows(sheet: &[Vec<Data>], first_row: usize) -> Result<ParsedSheet, ServiceError> {
    let header = match sheet.first() {
        Some(header) => header,
        None => bad_request!("the spreadsheet is empty"),
    };

    let code = spreadsheet::column_index(header, "code");
    let name = spreadsheet::column_index(header, "name");
    let category = spreadsheet::column_index(header, "category");
    let quantity = spreadsheet::column_index(header, "quantity");
    let price = spreadsheet::column_index(header, "price");

    if code.is_none() || name.is_none() {
        bad_request!("the spreadsheet needs a \"code\" and a \"name\" column");
    }

    let mut parsed = ParsedSheet::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, row) in sheet.iter().enumerate().skip(1) {
        let row_number = first_row + index + 1;

        let code = match spreadsheet::cell_string(row, code) {
            Some(code) => code,
            None => continue,
        };

        let article = match parse_row(row, code, name, category, quantity, price) {
            Ok(article) => article,
            Err(message) => {
                parsed.errors.push(RowError {
                    row: row_number,
                    message,
                });
                continue;
            }
        };

        match positions.get(&article.code) {
            Some(position) => parsed.rows[*position] = article,
            None => {
                positions.insert(article.code.clone(), parsed.rows.len());
                parsed.rows.push(article);
            }
        }
    }

    Ok(parsed)
}

fn parse_row(
    row: &[Data],
    code: String,
    name: Option<usize>,
    category: Option<usize>,
    quantity: Option<usize>,
    price: Option<usize>,
) -> Result<ArticleRow, String> {
    let name = spreadsheet::cell_string(row, name).ok_or_else(|| String::from("missing name"))?;

    let quantity = spreadsheet::cell_integer(row, quantity)?.unwrap_or(0);
    let quantity = i32::try_from(quantity).map_err(|_| String::from("quantity is too large"))?;
    if quantity < 0 {
        return Err(String::from("quantity can't be negative"));
    }

    let price = spreadsheet::cell_cents(row, price)?.unwrap_or(0);
    if price < 0 {
        return Err(String::from("price can't be negative"));
    }

    Ok(ArticleRow {
        code,
        name,
        category: spreadsheet::cell_string(row, category),
        quantity,
        price,
    })
}

/// the export rows, prices in units instead of cents
pub fn export_rows(articles: &[crate::inventory::Article]) -> Vec<Vec<Cell>> {
    articles
        .iter()
        .map(|article| {
            vec![
                Cell::Text(article.code.clone()),
                Cell::Text(article.name.clone()),
                article
                    .category
                    .clone()
                    .map_or(Cell::Empty, Cell::Text),
                Cell::Number(f64::from(article.quantity)),
                Cell::Number(spreadsheet::from_cents(article.price)),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Data {
        Data::String(String::from(value))
    }

    fn header() -> Vec<Data> {
        vec![text("Code"), text("Name"), text("Category"), text("Quantity"), text("Price")]
    }

    #[test]
    fn valid_rows() {
        let sheet = vec![
            header(),
            vec![text("BALL-3"), text("Balls"), text("balls"), Data::Int(24), Data::Float(6.5)],
            vec![text("GRIP"), text("Overgrip"), Data::Empty, Data::Float(10.0), text("2,5")],
        ];

        let parsed = parse_rows(&sheet, 0).unwrap();

        assert!(parsed.errors.is_empty());
        assert_eq!(
            parsed.rows,
            vec![
                ArticleRow {
                    code: String::from("BALL-3"),
                    name: String::from("Balls"),
                    category: Some(String::from("balls")),
                    quantity: 24,
                    price: 650,
                },
                ArticleRow {
                    code: String::from("GRIP"),
                    name: String::from("Overgrip"),
                    category: None,
                    quantity: 10,
                    price: 250,
                },
            ]
        );
    }

    #[test]
    fn later_rows_with_the_same_code_win() {
        let sheet = vec![
            header(),
            vec![text("BALL-3"), text("Balls"), Data::Empty, Data::Int(24), Data::Int(6)],
            vec![text("GRIP"), text("Overgrip"), Data::Empty, Data::Int(10), Data::Int(2)],
            vec![text("BALL-3"), text("Balls (new)"), Data::Empty, Data::Int(30), Data::Int(7)],
        ];

        let parsed = parse_rows(&sheet, 0).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].name, "Balls (new)");
        assert_eq!(parsed.rows[0].quantity, 30);
        assert_eq!(parsed.rows[1].code, "GRIP");
    }

    #[test]
    fn rows_without_code_are_skipped() {
        let sheet = vec![
            header(),
            vec![Data::Empty, text("Mystery"), Data::Empty, Data::Int(1), Data::Int(1)],
            vec![text("  "), text("Blank"), Data::Empty, Data::Int(1), Data::Int(1)],
        ];

        let parsed = parse_rows(&sheet, 0).unwrap();

        assert!(parsed.rows.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn invalid_rows_are_reported_with_their_row_number() {
        let sheet = vec![
            header(),
            vec![text("A"), Data::Empty, Data::Empty, Data::Int(1), Data::Int(1)],
            vec![text("B"), text("Racket"), Data::Empty, text("lots"), Data::Int(1)],
            vec![text("C"), text("Towel"), Data::Empty, Data::Int(-2), Data::Int(1)],
            vec![text("D"), text("Cap"), Data::Empty, Data::Int(2), Data::Int(15)],
        ];

        let parsed = parse_rows(&sheet, 0).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].code, "D");
        assert_eq!(
            parsed.errors.iter().map(|error| error.row).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert_eq!(parsed.errors[0].message, "missing name");
    }

    #[test]
    fn missing_columns_reject_the_file() {
        let sheet = vec![vec![text("code"), text("quantity")]];

        assert!(matches!(parse_rows(&sheet, 0), Err(ServiceError::BadRequest(_))));
        assert!(matches!(parse_rows(&[], 0), Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn optional_columns_default_to_zero() {
        let sheet = vec![vec![text("name"), text("code")], vec![text("Water"), text("H2O")]];

        let parsed = parse_rows(&sheet, 0).unwrap();

        assert_eq!(parsed.rows[0].quantity, 0);
        assert_eq!(parsed.rows[0].price, 0);
        assert_eq!(parsed.rows[0].category, None);
    }

    #[test]
    fn row_numbers_follow_the_sheet_offset() {
        let sheet = vec![
            header(),
            vec![text("A"), Data::Empty, Data::Empty, Data::Int(1), Data::Int(1)],
            vec![text("B"), text("Racket"), Data::Empty, Data::Int(1), Data::Int(1)],
            vec![text("C"), text("Towel"), Data::Empty, Data::Int(-2), Data::Int(1)],
        ];

        let parsed = parse_rows(&sheet, 2).unwrap();

        assert_eq!(
            parsed.errors.iter().map(|error| error.row).collect::<Vec<_>>(),
            vec![4, 6]
        );
    }
}
