use serde::Serialize;

/// One line of `refresh show`.
#[derive(Debug, Clone, Serialize)]
pub struct IntervalRow {
    pub task: String,
    pub interval_ms: u64,
    /// "default" or "stored".
    pub source: &'static str,
    pub tab_sensitive: bool,
}

pub struct TableFormatter {
    task_width: usize,
    interval_width: usize,
    source_width: usize,
    sensitive_width: usize,
}

impl TableFormatter {
    pub fn new(rows: &[IntervalRow]) -> Self {
        let task_width = rows
            .iter()
            .map(|r| r.task.len())
            .max()
            .unwrap_or(17)
            .clamp(4, 40);

        Self {
            task_width,
            interval_width: 10,
            source_width: 7,
            sensitive_width: 11,
        }
    }

    pub fn print_table(&self, rows: &[IntervalRow]) {
        println!("{}", self.border('┌', '┬', '┐'));
        println!("{}", self.header_row());
        println!("{}", self.border('├', '┼', '┤'));
        for row in rows {
            println!("{}", self.format_row(row));
        }
        println!("{}", self.border('└', '┴', '┘'));
    }

    fn format_row(&self, row: &IntervalRow) -> String {
        format!(
            "│ {:<width_task$} │ {:>width_interval$} │ {:<width_source$} │ {:<width_sensitive$} │",
            truncate(&row.task, self.task_width),
            format_interval(row.interval_ms),
            row.source,
            if row.tab_sensitive { "yes" } else { "no" },
            width_task = self.task_width,
            width_interval = self.interval_width,
            width_source = self.source_width,
            width_sensitive = self.sensitive_width,
        )
    }

    fn header_row(&self) -> String {
        format!(
            "│ {:<width_task$} │ {:>width_interval$} │ {:<width_source$} │ {:<width_sensitive$} │",
            "Task",
            "Interval",
            "Source",
            "Pause@hide",
            width_task = self.task_width,
            width_interval = self.interval_width,
            width_source = self.source_width,
            width_sensitive = self.sensitive_width,
        )
    }

    fn border(&self, left: char, middle: char, right: char) -> String {
        let widths = [
            self.task_width,
            self.interval_width,
            self.source_width,
            self.sensitive_width,
        ];
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!(
            "{}{}{}",
            left,
            segments.join(&middle.to_string()),
            right
        )
    }
}

/// Render milliseconds with the largest unit that divides evenly.
pub fn format_interval(ms: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(3_600_000, "h"), (60_000, "m"), (1_000, "s"), (1, "ms")];
    for (size, suffix) in UNITS {
        if ms >= size && ms % size == 0 {
            return format!("{}{}", ms / size, suffix);
        }
    }
    format!("{}ms", ms)
}

/// Truncate a string to a maximum display width, adding "..." if truncated.
///
/// Counts characters, not bytes.
pub fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        format!("{:<width$}", s, width = max_len)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_len)
    }
}
