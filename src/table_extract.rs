use scraper::{Html, Selector};

use crate::record::Record;
use crate::text_manipulators::{clean_cell, extract_text};

/// Extract every `<table>` in a rendered document into row-oriented records.
///
/// The first non-empty row of each table is that table's header row; every
/// later non-empty row is zipped positionally against it, truncated to the
/// shorter side. Tables are processed independently (header detection
/// restarts per table) and their records concatenate in table order then
/// row order. No tables means no records, not an error.
pub fn extract_tables(html: &str) -> Vec<Record> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("th, td").unwrap();

    let mut records = Vec::new();
    for table in document.select(&table_selector) {
        let mut headers: Option<Vec<String>> = None;
        for row in table.select(&row_selector) {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|cell| clean_cell(&extract_text(cell)))
                .collect();
            if cells.is_empty() {
                continue;
            }
            match &headers {
                None => headers = Some(cells),
                Some(header_row) => {
                    let record = Record::from_zipped(header_row, &cells);
                    if !record.is_empty() {
                        records.push(record);
                    }
                }
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_records_from_every_table() {
        let html = r#"
            <html><body>
              <table>
                <tr><th>A</th><th>B</th></tr>
                <tr><td>1</td><td>2</td></tr>
              </table>
              <table>
                <tr><th>X</th></tr>
                <tr><td>9</td></tr>
              </table>
            </body></html>"#;
        let records = extract_tables(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("A"), Some("1"));
        assert_eq!(records[0].get("B"), Some("2"));
        assert_eq!(records[0].len(), 2);
        assert_eq!(records[1].get("X"), Some("9"));
        assert_eq!(records[1].len(), 1);
    }

    #[test]
    fn rows_are_zipped_truncated_to_the_shorter_side() {
        let html = r#"
            <table>
              <tr><th>A</th><th>B</th></tr>
              <tr><td>1</td><td>2</td><td>3</td></tr>
              <tr><td>only</td></tr>
            </table>"#;
        let records = extract_tables(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 2);
        assert_eq!(records[0].get("B"), Some("2"));
        assert_eq!(records[1].len(), 1);
        assert_eq!(records[1].get("A"), Some("only"));
        assert_eq!(records[1].get("B"), None);
    }

    #[test]
    fn cell_text_is_cleaned() {
        let html = r#"
            <table>
              <tr><th> Metric&nbsp;</th></tr>
              <tr><td>&nbsp;42 </td></tr>
            </table>"#;
        let records = extract_tables(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Metric"), Some("42"));
    }

    #[test]
    fn empty_header_cells_are_legal_field_names() {
        let html = r#"
            <table>
              <tr><th></th><th>Jan 2024</th></tr>
              <tr><td>Revenue</td><td>10</td></tr>
            </table>"#;
        let records = extract_tables(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(""), Some("Revenue"));
        assert_eq!(records[0].get("Jan 2024"), Some("10"));
    }

    #[test]
    fn no_tables_yields_no_records() {
        assert!(extract_tables("<html><body><div>nothing here</div></body></html>").is_empty());
        assert!(extract_tables("").is_empty());
    }

    #[test]
    fn header_only_tables_yield_no_records() {
        let html = "<table><tr><th>A</th><th>B</th></tr></table>";
        assert!(extract_tables(html).is_empty());
    }
}
