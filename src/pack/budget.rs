/// Line appended when content was dropped to honour the byte budget.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Append-only line accumulator bounded by a byte budget.
///
/// Each line costs its UTF-8 length plus one byte for the newline. The first
/// line that does not fit marks the document truncated, and every later line
/// is rejected, so only a suffix is ever cut.
#[derive(Debug)]
pub struct BudgetedLines {
    max_bytes: usize,
    used: usize,
    lines: Vec<String>,
    truncated: bool,
}

impl BudgetedLines {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            used: 0,
            lines: Vec::new(),
            truncated: false,
        }
    }

    /// Append `line` if it fits. Returns false once the budget is exhausted.
    pub fn push(&mut self, line: impl Into<String>) -> bool {
        if self.truncated {
            return false;
        }
        let line = line.into();
        let cost = line.len() + 1;
        if self.used + cost > self.max_bytes {
            self.truncated = true;
            return false;
        }
        self.used += cost;
        self.lines.push(line);
        true
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Join the accepted lines, appending the truncation marker when it fits.
    ///
    /// Trailing whitespace is trimmed and exactly one newline terminates the
    /// text, except under a zero budget, which yields nothing at all.
    pub fn finish(mut self) -> String {
        if self.max_bytes == 0 {
            return String::new();
        }
        if self.truncated {
            let marker_cost = TRUNCATION_MARKER.len() + 2;
            if self.used + marker_cost <= self.max_bytes {
                self.lines.push(TRUNCATION_MARKER.to_string());
            }
        }
        let mut text = self.lines.join("\n").trim_end().to_string();
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_within_budget_are_kept() {
        let mut doc = BudgetedLines::new(64);
        assert!(doc.push("alpha"));
        assert!(doc.push(""));
        assert!(doc.push("beta"));
        assert_eq!(doc.used(), 12);
        assert!(!doc.is_truncated());
        assert_eq!(doc.finish(), "alpha\n\nbeta\n");
    }

    #[test]
    fn test_rejection_is_permanent() {
        let mut doc = BudgetedLines::new(10);
        assert!(doc.push("12345"));
        assert!(!doc.push("too long line"));
        assert!(!doc.push("x"), "a short line after a rejection must also be dropped");
        assert!(doc.is_truncated());
        // Marker (17 bytes) does not fit in the remaining 4 bytes.
        assert_eq!(doc.finish(), "12345\n");
    }

    #[test]
    fn test_marker_appended_when_it_fits() {
        let mut doc = BudgetedLines::new(40);
        assert!(doc.push("header"));
        assert!(!doc.push("x".repeat(64)));
        let text = doc.finish();
        assert_eq!(text, format!("header\n{TRUNCATION_MARKER}\n"));
        assert!(text.len() <= 40);
    }

    #[test]
    fn test_multibyte_lines_are_measured_in_bytes() {
        let mut doc = BudgetedLines::new(8);
        // "héllo" is 6 bytes; with the newline, 7.
        assert!(doc.push("héllo"));
        assert!(!doc.push("é"), "2 bytes + newline exceeds the single byte left");
    }

    #[test]
    fn test_empty_document_is_single_newline() {
        let mut doc = BudgetedLines::new(4);
        assert!(!doc.push("too long"));
        assert_eq!(doc.finish(), "\n");
    }

    #[test]
    fn test_zero_budget_yields_empty_text() {
        let mut doc = BudgetedLines::new(0);
        assert!(!doc.push(""));
        assert!(doc.is_truncated());
        assert_eq!(doc.finish(), "");
    }
}
