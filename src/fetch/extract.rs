// src/fetch/extract.rs
// =============================================================================
// Pulls the structured content out of rendered HTML.
//
// Extracted, all in document order and whitespace-trimmed:
// - title: text of the first <title>, None if there is none
// - h1 / h2 / h3: text of every heading of that level
// - paragraphs: text of every <p>
// - tables (optional): every <table> as rows of <td>/<th> cell texts
// - html (optional): the rendered document, unchanged
//
// scraper::Html is not Send, so this stays a plain sync function that is
// called after the browser work is finished.
// =============================================================================

use scraper::{ElementRef, Html, Selector};

use crate::config::ExtractOptions;
use crate::record::{PageContent, Table};

// Extracts a PageContent from an HTML document
//
// Parameters:
//   html: the rendered document
//   options: which optional outputs to include
pub fn extract_page(html: &str, options: ExtractOptions) -> PageContent {
    let document = Html::parse_document(html);

    let title = select(&document, "title").first().map(element_text);

    let tables = if options.tables {
        Some(extract_tables(&document))
    } else {
        None
    };

    PageContent {
        title,
        h1: texts(&document, "h1"),
        h2: texts(&document, "h2"),
        h3: texts(&document, "h3"),
        paragraphs: texts(&document, "p"),
        tables,
        html: options.html.then(|| html.to_string()),
    }
}

fn extract_tables(document: &Html) -> Vec<Table> {
    let (Ok(row_selector), Ok(cell_selector)) = (Selector::parse("tr"), Selector::parse("td, th"))
    else {
        return Vec::new();
    };

    select(document, "table")
        .into_iter()
        .map(|table| {
            table
                .select(&row_selector)
                .map(|row| row.select(&cell_selector).map(|cell| element_text(&cell)).collect())
                .collect()
        })
        .collect()
}

// All elements matching a CSS selector, in document order
//
// The selectors used here are constants, so a parse failure can only be a
// programming error; it yields no elements instead of panicking.
fn select<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn texts(document: &Html, css: &str) -> Vec<String> {
    select(document, css).iter().map(element_text).collect()
}

// Concatenated text of an element and its descendants, trimmed
fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html>
  <head><title>  Acme Widgets </title></head>
  <body>
    <nav><p>Home | Products | Contact</p></nav>
    <h1>Widgets</h1>
    <h2>Blue</h2>
    <p>Our blue widget is <b>great</b>.</p>
    <h2>Red</h2>
    <h3>Specs</h3>
    <p>
        Red widgets ship in May.
    </p>
    <table>
      <tr><th>Size</th><th>Price</th></tr>
      <tr><td> S </td><td>$5</td></tr>
    </table>
  </body>
</html>"#;

    #[test]
    fn test_extracts_title_headings_and_paragraphs_in_order() {
        let content = extract_page(PAGE, ExtractOptions::default());

        assert_eq!(content.title.as_deref(), Some("Acme Widgets"));
        assert_eq!(content.h1, vec!["Widgets"]);
        assert_eq!(content.h2, vec!["Blue", "Red"]);
        assert_eq!(content.h3, vec!["Specs"]);
        assert_eq!(
            content.paragraphs,
            vec![
                "Home | Products | Contact",
                "Our blue widget is great.",
                "Red widgets ship in May."
            ]
        );
        assert!(content.tables.is_none());
        assert!(content.html.is_none());
    }

    #[test]
    fn test_extracts_tables_when_enabled() {
        let content = extract_page(PAGE, ExtractOptions { tables: true, html: false });
        let tables = content.tables.unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0],
            vec![vec!["Size", "Price"], vec!["S", "$5"]]
        );
    }

    #[test]
    fn test_missing_title_is_none() {
        let content = extract_page("<html><body><p>Only text</p></body></html>", ExtractOptions::default());
        assert!(content.title.is_none());
        assert_eq!(content.paragraphs, vec!["Only text"]);
        assert!(content.h1.is_empty());
    }

    #[test]
    fn test_raw_html_included_when_enabled() {
        let html = "<html><head><title>Raw</title></head><body><p>x</p></body></html>";
        let content = extract_page(html, ExtractOptions { tables: false, html: true });

        assert_eq!(content.html.as_deref(), Some(html));
        assert_eq!(content.title.as_deref(), Some("Raw"));
        assert!(content.tables.is_none());
    }
}
