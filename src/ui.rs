//! Terminal UI utilities.
//!
//! ## Components
//!
//! - `Table` - Box-drawn table that shrinks its widest columns to fit the
//!   terminal
//! - `success`, `warning`, `failure`, `note` - one-line status messages
//!
//! ## Example
//!
//! ```rust
//! use cbproject::ui::Table;
//!
//! let mut table = Table::new(&["Target", "Type"]);
//! table.add_row(vec!["Debug".to_string(), "Console application".to_string()]);
//! table.print();
//! ```

use colored::*;
use console::{Term, measure_text_width, truncate_str};

const MIN_COLUMN: usize = 8;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are ignored.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| measure_text_width(h)).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(measure_text_width(&flatten(cell)));
            }
        }

        // Two spaces of indent, a border per column plus one, padding.
        let overhead = 3 + 3 * widths.len();
        let budget = max_width.saturating_sub(overhead);
        while widths.iter().sum::<usize>() > budget {
            let Some((i, &w)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if w <= MIN_COLUMN {
                break;
            }
            widths[i] -= 1;
        }
        widths
    }

    /// Renders the table to a string sized for `max_width` columns.
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.widths(max_width);
        let rule = |left: &str, mid: &str, right: &str| {
            let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {left}{}{right}\n", inner.join(mid))
        };
        let line = |cells: &[String], bold: bool| {
            let mut out = String::from("  │");
            for (cell, &w) in cells.iter().zip(&widths) {
                let text = truncate_str(&flatten(cell), w, "...").to_string();
                let pad = w.saturating_sub(measure_text_width(&text));
                let text = if bold { text.bold().to_string() } else { text };
                out.push_str(&format!(" {}{} │", text, " ".repeat(pad)));
            }
            out.push('\n');
            out
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers, true));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row, false));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }

    pub fn print(&self) {
        let (_, cols) = Term::stdout().size();
        print!("{}", self.render(cols as usize));
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

pub fn success(msg: impl std::fmt::Display) {
    println!("{} {}", "✓".green(), msg);
}

pub fn note(msg: impl std::fmt::Display) {
    println!("{} {}", "ℹ".blue(), msg);
}

pub fn warning(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn failure(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "x".red(), msg);
}

/// Bold header with an underline, as the command handlers print them.
pub fn heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "─".repeat(measure_text_width(title).max(20)).dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fits_columns() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Name", "Value"]);
        table.add_row(vec!["title".into(), "demo".into()]);
        table.add_row(vec!["ignored".into()]);
        let out = table.render(80);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "  │ Name  │ Value │");
        assert_eq!(lines[3], "  │ title │ demo  │");
    }

    #[test]
    fn test_render_shrinks_wide_columns() {
        colored::control::set_override(false);
        let mut table = Table::new(&["File"]);
        table.add_row(vec!["a".repeat(100)]);
        let out = table.render(40);
        assert!(out.lines().all(|l| measure_text_width(l) <= 40));
        assert!(out.contains("..."));
    }
}
