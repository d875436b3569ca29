//! Grid flattening: markup tables → rectangular grids → records → markdown.
//!
//! Storage-format tables declare `rowspan`/`colspan` on cells, so raw rows
//! have unequal cell counts. [`flatten_table`] reconstructs the logical grid
//! in a single forward pass, [`grid_to_records`] keys data rows by a
//! deduplicated header row, and [`records_to_markdown`] renders the records
//! as a pipe table.

use std::collections::HashMap;

use scraper::{ElementRef, Selector};
use tracing::trace;

use confex_shared::TableRecord;

/// A rectangular 2-D array of cell text: every row has the same length.
pub type LogicalGrid = Vec<Vec<String>>;

/// Pending carry-over for a cell whose rowspan extends into later rows.
struct RowspanCarry {
    remaining: usize,
    text: String,
}

/// Flatten a `<table>` element into a rectangular grid of cell text.
///
/// Spans are resolved left-to-right, top-to-bottom: a cell with
/// `colspan = M` emits its text at M positions in its own row, and a cell
/// with `rowspan = N` registers a carry at each of those column positions
/// for the next N−1 rows. Carries are keyed by absolute column index, so a
/// cell that is both wide and tall covers its full N×M rectangle.
///
/// Malformed markup is not rejected: unparseable span attributes fall back
/// to 1, overlapping declared spans let the later registration win, and
/// short rows are padded with empty strings so the grid stays rectangular.
pub fn flatten_table(table: &ElementRef) -> LogicalGrid {
    let tr_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("th, td").unwrap();

    let rows: Vec<ElementRef> = table.select(&tr_sel).collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let mut grid: LogicalGrid = Vec::with_capacity(rows.len());
    let mut carries: HashMap<usize, RowspanCarry> = HashMap::new();

    for tr in &rows {
        let mut row: Vec<String> = Vec::new();
        let mut col = 0usize;
        let mut cells = tr.select(&cell_sel);

        loop {
            // A carry at this column consumes the position without
            // consuming a cell from the current row.
            let carried = match carries.get_mut(&col) {
                Some(carry) => {
                    carry.remaining -= 1;
                    Some((carry.text.clone(), carry.remaining == 0))
                }
                None => None,
            };
            if let Some((text, exhausted)) = carried {
                if exhausted {
                    carries.remove(&col);
                }
                row.push(text);
                col += 1;
                continue;
            }

            let Some(cell) = cells.next() else { break };

            let text = cell_text(&cell);
            let rowspan = span_attr(&cell, "rowspan");
            let colspan = span_attr(&cell, "colspan");

            for _ in 0..colspan {
                row.push(text.clone());
            }
            if rowspan > 1 {
                for c in 0..colspan {
                    carries.insert(
                        col + c,
                        RowspanCarry {
                            remaining: rowspan - 1,
                            text: text.clone(),
                        },
                    );
                }
            }
            col += colspan;
        }

        grid.push(row);
    }

    // Pad short rows so every row has the maximum observed length.
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut grid {
        row.resize(width, String::new());
    }

    trace!(rows = grid.len(), width, "flattened table");
    grid
}

/// Index of the header row: the first row containing a header-marked cell,
/// falling back to row 0 when no row is marked.
///
/// The fallback is a known heuristic limitation — a table with no `<th>`
/// cells gets its first data row promoted to headers.
pub fn header_row_index(table: &ElementRef) -> usize {
    let tr_sel = Selector::parse("tr").unwrap();
    let th_sel = Selector::parse("th").unwrap();

    table
        .select(&tr_sel)
        .position(|tr| tr.select(&th_sel).next().is_some())
        .unwrap_or(0)
}

/// Convert a flattened grid into header-keyed records.
///
/// Header names are deduplicated: a blank header cell becomes `col_<index>`,
/// and a repeated name gets an `_<n>` suffix from its second occurrence
/// (`["a", "a", "a"]` → `["a", "a_2", "a_3"]`). Rows strictly after the
/// header row become records; a row whose values are all empty is skipped.
pub fn grid_to_records(grid: &[Vec<String>], header_row: usize) -> Vec<TableRecord> {
    let Some(header) = grid.get(header_row) else {
        return Vec::new();
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (i, raw) in header.iter().enumerate() {
        let trimmed = raw.trim();
        let base = if trimmed.is_empty() {
            format!("col_{i}")
        } else {
            trimmed.to_string()
        };
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            names.push(format!("{base}_{count}"));
        } else {
            names.push(base);
        }
    }

    let mut records: Vec<TableRecord> = Vec::new();
    for row in grid.iter().skip(header_row + 1) {
        let mut record = TableRecord::new();
        for (name, value) in names.iter().zip(row) {
            let value = value.trim();
            if !value.is_empty() {
                record.insert(name.clone(), value);
            }
        }
        if !record.is_empty() {
            records.push(record);
        }
    }
    records
}

/// Render records as a markdown pipe table.
///
/// Column order follows the first record's key order; a record missing a
/// key renders an empty cell. Returns the empty string for no records.
pub fn records_to_markdown(records: &[TableRecord]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let headers: Vec<&str> = first.keys().collect();
    let mut lines: Vec<String> = Vec::with_capacity(records.len() + 2);

    lines.push(format!("| {} |", headers.join(" | ")));
    lines.push(format!("| {} |", vec!["---"; headers.len()].join(" | ")));

    for record in records {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| escape_cell(record.get(h).unwrap_or("")))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    lines.join("\n")
}

/// Full pipeline for one table element: flatten, detect headers, build records.
pub fn extract_records(table: &ElementRef) -> Vec<TableRecord> {
    let grid = flatten_table(table);
    grid_to_records(&grid, header_row_index(table))
}

/// Whitespace-collapsed text content of a cell.
fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read a span attribute, defaulting to 1 when absent or unparseable.
fn span_attr(cell: &ElementRef, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
}

/// Keep cell values from breaking the pipe table.
fn escape_cell(value: &str) -> String {
    value.replace('\n', " ").replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    /// Parse an HTML snippet and run `f` with its first `<table>` element.
    fn with_table<T>(html: &str, f: impl FnOnce(&ElementRef) -> T) -> T {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("table").unwrap();
        let table = doc.select(&sel).next().expect("fixture has a table");
        f(&table)
    }

    #[test]
    fn spanless_table_is_identity() {
        let html = "<table>\
            <tr><th>a</th><th>b</th></tr>\
            <tr><td>1</td><td>2</td></tr>\
            <tr><td>3</td><td>4</td></tr>\
        </table>";
        let grid = with_table(html, flatten_table);
        assert_eq!(
            grid,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), "4".to_string()],
            ]
        );
    }

    #[test]
    fn empty_table_yields_empty_grid() {
        let grid = with_table("<table></table>", flatten_table);
        assert!(grid.is_empty());
    }

    #[test]
    fn colspan_repeats_text_across_columns() {
        let html = "<table>\
            <tr><td colspan=\"2\">wide</td><td>x</td></tr>\
            <tr><td>a</td><td>b</td><td>c</td></tr>\
        </table>";
        let grid = with_table(html, flatten_table);
        assert_eq!(grid[0], vec!["wide", "wide", "x"]);
        assert_eq!(grid[1], vec!["a", "b", "c"]);
    }

    #[test]
    fn rowspan_carries_text_into_later_rows() {
        let html = "<table>\
            <tr><td rowspan=\"3\">tall</td><td>r0</td></tr>\
            <tr><td>r1</td></tr>\
            <tr><td>r2</td></tr>\
        </table>";
        let grid = with_table(html, flatten_table);
        assert_eq!(grid[0], vec!["tall", "r0"]);
        assert_eq!(grid[1], vec!["tall", "r1"]);
        assert_eq!(grid[2], vec!["tall", "r2"]);
    }

    #[test]
    fn combined_spans_cover_full_rectangle() {
        // A 2×2 cell must appear at all four grid positions and no others.
        let html = "<table>\
            <tr><td rowspan=\"2\" colspan=\"2\">block</td><td>a</td></tr>\
            <tr><td>b</td></tr>\
            <tr><td>x</td><td>y</td><td>z</td></tr>\
        </table>";
        let grid = with_table(html, flatten_table);
        assert_eq!(grid[0], vec!["block", "block", "a"]);
        assert_eq!(grid[1], vec!["block", "block", "b"]);
        assert_eq!(grid[2], vec!["x", "y", "z"]);
    }

    #[test]
    fn overlong_colspan_still_rectangular() {
        // A row claiming more columns than the table has must not break
        // rectangularity.
        let html = "<table>\
            <tr><td>a</td><td>b</td></tr>\
            <tr><td colspan=\"5\">stretch</td></tr>\
        </table>";
        let grid = with_table(html, flatten_table);
        let width = grid[0].len();
        assert!(grid.iter().all(|row| row.len() == width));
        assert_eq!(width, 5);
        assert_eq!(grid[0][2], "");
    }

    #[test]
    fn unparseable_span_defaults_to_one() {
        let html = "<table>\
            <tr><td rowspan=\"lots\" colspan=\"\">a</td><td>b</td></tr>\
            <tr><td>c</td><td>d</td></tr>\
        </table>";
        let grid = with_table(html, flatten_table);
        assert_eq!(grid[0], vec!["a", "b"]);
        assert_eq!(grid[1], vec!["c", "d"]);
    }

    #[test]
    fn cell_text_is_whitespace_collapsed() {
        let html = "<table><tr><td>  hello\n   <b>bold</b>   world </td></tr></table>";
        let grid = with_table(html, flatten_table);
        assert_eq!(grid[0][0], "hello bold world");
    }

    #[test]
    fn header_row_is_first_th_row() {
        let html = "<table>\
            <tr><td>caption-ish</td></tr>\
            <tr><th>name</th></tr>\
            <tr><td>alpha</td></tr>\
        </table>";
        assert_eq!(with_table(html, header_row_index), 1);
    }

    #[test]
    fn header_row_defaults_to_zero() {
        let html = "<table><tr><td>a</td></tr><tr><td>b</td></tr></table>";
        assert_eq!(with_table(html, header_row_index), 0);
    }

    #[test]
    fn records_keyed_by_header() {
        let grid: LogicalGrid = vec![
            vec!["name".into(), "role".into()],
            vec!["alpha".into(), "backend".into()],
            vec!["beta".into(), "".into()],
        ];
        let records = grid_to_records(&grid, 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), Some("alpha"));
        assert_eq!(records[0].get("role"), Some("backend"));
        // Empty values are omitted from the record entirely.
        assert_eq!(records[1].get("role"), None);
    }

    #[test]
    fn duplicate_headers_get_numbered_suffixes() {
        let grid: LogicalGrid = vec![
            vec!["a".into(), "a".into(), "a".into()],
            vec!["1".into(), "2".into(), "3".into()],
        ];
        let records = grid_to_records(&grid, 0);
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["a", "a_2", "a_3"]);
    }

    #[test]
    fn blank_headers_get_positional_names() {
        let grid: LogicalGrid = vec![
            vec!["".into(), "  ".into(), "name".into()],
            vec!["x".into(), "y".into(), "z".into()],
        ];
        let records = grid_to_records(&grid, 0);
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["col_0", "col_1", "name"]);
    }

    #[test]
    fn all_empty_row_emits_no_record() {
        let grid: LogicalGrid = vec![
            vec!["a".into(), "b".into()],
            vec!["  ".into(), "".into()],
            vec!["1".into(), "2".into()],
        ];
        let records = grid_to_records(&grid, 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("a"), Some("1"));
    }

    #[test]
    fn header_row_beyond_grid_yields_nothing() {
        let grid: LogicalGrid = vec![vec!["a".into()]];
        assert!(grid_to_records(&grid, 5).is_empty());
    }

    #[test]
    fn markdown_of_no_records_is_empty() {
        assert_eq!(records_to_markdown(&[]), "");
    }

    #[test]
    fn markdown_shape_matches_records() {
        let records: Vec<TableRecord> = vec![
            [
                ("name".to_string(), "alpha".to_string()),
                ("role".to_string(), "backend".to_string()),
            ]
            .into_iter()
            .collect(),
            [("name".to_string(), "beta".to_string())].into_iter().collect(),
        ];
        let md = records_to_markdown(&records);
        let lines: Vec<&str> = md.lines().collect();

        assert_eq!(lines.len(), 2 + records.len());
        assert_eq!(lines[0], "| name | role |");
        assert_eq!(lines[1], "| --- | --- |");
        // Missing keys render as empty cells, field count stays constant.
        assert_eq!(lines[3], "| beta |  |");
        for line in &lines[2..] {
            assert_eq!(line.matches('|').count(), 3);
        }
    }

    #[test]
    fn markdown_escapes_pipes_and_newlines() {
        let records: Vec<TableRecord> = vec![
            [("cmd".to_string(), "a|b\nc".to_string())].into_iter().collect(),
        ];
        let md = records_to_markdown(&records);
        assert!(md.contains("a\\|b c"));
    }

    #[test]
    fn full_pipeline_on_spanned_table() {
        let html = "<table>\
            <tr><th>team</th><th>name</th><th>role</th></tr>\
            <tr><td rowspan=\"2\">infra</td><td>alpha</td><td>backend</td></tr>\
            <tr><td>beta</td><td>sre</td></tr>\
        </table>";
        let records = with_table(html, extract_records);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("team"), Some("infra"));
        assert_eq!(records[1].get("team"), Some("infra"));
        assert_eq!(records[1].get("name"), Some("beta"));
        assert_eq!(records[1].get("role"), Some("sre"));
    }
}
