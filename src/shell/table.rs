//! Fixed-width text tables for list output.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A bordered text table with optional per-column width caps.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    caps: Vec<Option<usize>>,
    right_aligned: Vec<bool>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. Cells wider than `cap` are truncated with `...`.
    pub fn column(mut self, header: impl Into<String>, cap: Option<usize>, right_aligned: bool) -> Self {
        self.headers.push(header.into());
        self.caps.push(cap);
        self.right_aligned.push(right_aligned);
        self
    }

    /// Add a row; missing cells render empty, extra cells are ignored.
    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render with `+---+` borders, one line per row.
    pub fn render(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                (0..self.headers.len())
                    .map(|c| {
                        let text = clean_cell(row.get(c).map_or("", String::as_str));
                        match self.caps[c] {
                            Some(cap) => truncate_str(&text, cap),
                            None => text,
                        }
                    })
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(c, h)| {
                cells
                    .iter()
                    .map(|row| UnicodeWidthStr::width(row[c].as_str()))
                    .chain(std::iter::once(UnicodeWidthStr::width(h.as_str())))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
        let border = format!("+{}+\n", dashes.join("+"));
        let separator = format!("|{}|\n", dashes.join("+"));

        let mut out = String::new();
        out.push_str(&border);
        out.push_str(&self.render_line(&self.headers, &widths));
        out.push_str(&separator);
        for row in &cells {
            out.push_str(&self.render_line(row, &widths));
        }
        out.push_str(&border);
        out
    }

    fn render_line(&self, cells: &[String], widths: &[usize]) -> String {
        let parts: Vec<String> = cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(c, (text, &w))| {
                if self.right_aligned[c] {
                    pad_left(text, w)
                } else {
                    pad_right(text, w)
                }
            })
            .collect();
        format!("| {} |\n", parts.join(" | "))
    }
}

/// Collapse control characters and line breaks into single spaces.
fn clean_cell(s: &str) -> String {
    s.split(|c: char| c.is_control())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn pad_right(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(UnicodeWidthStr::width(s));
    format!("{s}{}", " ".repeat(pad))
}

fn pad_left(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(UnicodeWidthStr::width(s));
    format!("{}{s}", " ".repeat(pad))
}

/// Truncate a string to fit within `max_width` columns, adding "..." if needed.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    let width = UnicodeWidthStr::width(s);
    if width <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let mut result = String::new();
        let mut current_width = 0;
        for ch in s.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if current_width + ch_width + 3 > max_width {
                break;
            }
            result.push(ch);
            current_width += ch_width;
        }
        result.push_str("...");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a longer subject", 10), "a longe...");
        assert_eq!(truncate_str("日本語のメール", 9), "日本語...");
        assert_eq!(truncate_str("abcdef", 2), "ab");
    }

    #[test]
    fn test_render_table() {
        let mut table = Table::new()
            .column("#", None, true)
            .column("subject", Some(8), false);
        table.row(vec!["0".into(), "hello".into()]);
        table.row(vec!["12".into(), "a very long line".into()]);
        let expected = "\
+----+----------+
|  # | subject  |
|----+----------|
|  0 | hello    |
| 12 | a ver... |
+----+----------+
";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn test_cells_are_single_line() {
        let mut table = Table::new().column("from", None, false);
        table.row(vec!["a\r\nb\tc".into()]);
        assert!(table.render().contains("| a b c |"));
    }
}
