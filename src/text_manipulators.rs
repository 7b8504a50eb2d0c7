use scraper::ElementRef;

pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>()
}

/// Collapse non-breaking spaces and trim the ends of a table cell.
pub fn clean_cell(raw: &str) -> String {
    raw.replace('\u{a0}', " ").trim().to_string()
}
