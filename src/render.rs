/*!
 * Plain-text rendering of query results: an aligned table and a horizontal
 * bar chart.
 */

use crate::database::SqlValue;
use crate::translation::QueryResult;

const BAR_CHAR: char = '█';

fn display_width(text: &str) -> usize {
    text.chars().count()
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(fill))
}

/// Format a result as an aligned text table
pub fn format_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return format!("Statement executed, {} row(s) affected.", result.rows_affected);
    }
    if result.rows.is_empty() {
        return "No results found.".to_string();
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(SqlValue::to_string).collect())
        .collect();

    let mut col_widths: Vec<usize> = result.columns.iter().map(|c| display_width(c)).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate().take(col_widths.len()) {
            col_widths[i] = col_widths[i].max(display_width(cell));
        }
    }

    let mut output = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .zip(&col_widths)
        .map(|(col, width)| pad(col, *width))
        .collect();
    output.push_str(header.join(" | ").trim_end());
    output.push('\n');

    let separator: Vec<String> = col_widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&col_widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect();
        output.push_str(line.join(" | ").trim_end());
        output.push('\n');
    }

    output.push_str(&format!("\n{} row(s) returned", result.rows.len()));
    output
}

/// Format a horizontal bar chart of one numeric column.
///
/// Labels come from the first column that is not the value column; the value
/// column is the first one whose values are all numeric. Returns `None` when
/// the result has no numeric column to plot.
pub fn format_bar_chart(result: &QueryResult, max_bar_width: usize) -> Option<String> {
    let value_col = numeric_column(result)?;
    let label_col = (0..result.columns.len()).find(|i| *i != value_col);

    let points: Vec<(String, f64)> = result
        .rows
        .iter()
        .enumerate()
        .filter_map(|(n, row)| {
            let value = row.get(value_col)?.as_f64()?;
            let label = match label_col.and_then(|i| row.get(i)) {
                Some(cell) => cell.to_string(),
                None => format!("#{}", n + 1),
            };
            Some((label, value))
        })
        .collect();

    let max_value = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let label_width = points.iter().map(|(l, _)| display_width(l)).max().unwrap_or(0);

    let mut output = format!("{}\n", result.columns[value_col]);
    for (label, value) in &points {
        let bar_len = if max_value > 0.0 && *value > 0.0 {
            ((value / max_value) * max_bar_width as f64).round() as usize
        } else {
            0
        };
        output.push_str(&format!(
            "{} | {} {}\n",
            pad(label, label_width),
            BAR_CHAR.to_string().repeat(bar_len),
            SqlValue::Real(*value)
        ));
    }
    Some(output)
}

fn numeric_column(result: &QueryResult) -> Option<usize> {
    if result.rows.is_empty() {
        return None;
    }
    (0..result.columns.len()).find(|&i| {
        result.rows.iter().all(|row| {
            matches!(row.get(i), Some(SqlValue::Integer(_)) | Some(SqlValue::Real(_)))
        })
    })
}
