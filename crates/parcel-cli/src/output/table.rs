//! Table formatting for CLI output.

/// Table rendering style
#[derive(Debug, Clone, Copy, Default)]
pub enum TableStyle {
    #[default]
    Plain,
    Markdown,
}

/// Column alignment
#[derive(Debug, Clone, Copy, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Table column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub max_width: Option<usize>,
}

impl Column {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            alignment: Alignment::Left,
            max_width: None,
        }
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }
}

/// Table structure
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    style: TableStyle,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            style: TableStyle::default(),
        }
    }

    pub fn style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    pub fn add_row(&mut self, row: Vec<impl Into<String>>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn calculate_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| c.header.chars().count())
            .collect();

        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        for (width, col) in widths.iter_mut().zip(&self.columns) {
            if let Some(max) = col.max_width {
                *width = (*width).min(max);
            }
        }

        widths
    }

    /// Render the table to a string
    pub fn render(&self) -> String {
        let widths = self.calculate_widths();
        let mut output = String::new();

        match self.style {
            TableStyle::Plain => self.render_plain(&mut output, &widths),
            TableStyle::Markdown => self.render_markdown(&mut output, &widths),
        }

        output
    }

    fn render_plain(&self, output: &mut String, widths: &[usize]) {
        let header: Vec<_> = self
            .columns
            .iter()
            .zip(widths)
            .map(|(col, &w)| format_cell(&col.header, w, col.alignment))
            .collect();
        output.push_str(header.join("   ").trim_end());
        output.push('\n');

        let sep: Vec<_> = widths.iter().map(|&w| "-".repeat(w)).collect();
        output.push_str(&sep.join("   "));
        output.push('\n');

        for row in &self.rows {
            let cells: Vec<_> = row
                .iter()
                .zip(&self.columns)
                .zip(widths)
                .map(|((cell, col), &w)| format_cell(cell, w, col.alignment))
                .collect();
            output.push_str(cells.join("   ").trim_end());
            output.push('\n');
        }
    }

    fn render_markdown(&self, output: &mut String, widths: &[usize]) {
        output.push('|');
        for (col, &w) in self.columns.iter().zip(widths) {
            output.push_str(&format!(" {} |", format_cell(&col.header, w, col.alignment)));
        }
        output.push('\n');

        output.push('|');
        for (col, &w) in self.columns.iter().zip(widths) {
            let sep = match col.alignment {
                Alignment::Left => format!(":{}", "-".repeat(w)),
                Alignment::Right => format!("{}:", "-".repeat(w)),
            };
            output.push_str(&format!(" {sep} |"));
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for ((cell, col), &w) in row.iter().zip(&self.columns).zip(widths) {
                output.push_str(&format!(" {} |", format_cell(cell, w, col.alignment)));
            }
            output.push('\n');
        }
    }
}

fn format_cell(content: &str, width: usize, alignment: Alignment) -> String {
    let content = if content.chars().count() > width {
        let kept: String = content.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        content.to_string()
    };

    match alignment {
        Alignment::Left => format!("{content:<width$}"),
        Alignment::Right => format!("{content:>width$}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_plain() {
        let mut table = Table::new(vec![
            Column::new("Action"),
            Column::new("Count").align(Alignment::Right),
        ]);
        table.add_row(vec!["USER_SIGNIN", "12"]);
        table.add_row(vec!["LAND_CREATE", "3"]);

        let output = table.render();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Action"));
        assert!(lines[1].starts_with("-----------"));
        assert!(lines[3].ends_with("    3"));
    }

    #[test]
    fn test_table_markdown() {
        let mut table = Table::new(vec![Column::new("A"), Column::new("B")]).style(TableStyle::Markdown);
        table.add_row(vec!["1", "2"]);

        let output = table.render();
        assert!(output.starts_with("| A | B |"));
        assert!(output.contains(":-"));
    }

    #[test]
    fn test_max_width_truncates() {
        let mut table = Table::new(vec![Column::new("Endpoint").max_width(10)]);
        table.add_row(vec!["/api/listings/12345/approve"]);

        let output = table.render();
        assert!(output.contains("/api/li..."));
        assert!(!output.contains("approve"));
    }
}
