use std::collections::HashMap;

use vela_source::{FileId, Span};

use crate::code::DiagCode;
use crate::diagnostic::Diagnostic;

/// Append-only diagnostic collection.
///
/// Reports are deduplicated by `(code, span)`: the first report at a key
/// becomes the primary and later duplicates contribute only their notes
/// (this is how instantiation stacks collapse into a single report).
///
/// The sink also carries the cooperative cancellation flag; long-running
/// traversals check `is_poisoned` at their step increments.
#[derive(Debug, Default)]
pub struct Diagnostics {
    diags: Vec<Diagnostic>,
    index: HashMap<(DiagCode, Span), usize>,
    errors: usize,
    poisoned: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic, collapsing duplicates by `(code, span)`.
    /// Returns a mutable reference to the primary report for the key so
    /// callers can attach notes.
    pub fn add(&mut self, diag: Diagnostic) -> &mut Diagnostic {
        let key = (diag.code, diag.span);
        if let Some(&slot) = self.index.get(&key) {
            let primary = &mut self.diags[slot];
            for note in diag.notes {
                primary.notes.push(note);
            }
            return &mut self.diags[slot];
        }
        if diag.is_error() {
            self.errors += 1;
        }
        let slot = self.diags.len();
        self.index.insert(key, slot);
        self.diags.push(diag);
        &mut self.diags[slot]
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        for diag in diags {
            self.add(diag);
        }
    }

    /// Number of distinct error reports.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    /// Cooperatively abort in-flight traversals.
    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    /// The emission ordering contract: within one source buffer,
    /// diagnostics come out in offset order; buffers themselves appear
    /// in the order they first produced a diagnostic.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut file_rank: HashMap<FileId, usize> = HashMap::new();
        for diag in &self.diags {
            let next = file_rank.len();
            file_rank.entry(diag.span.file).or_insert(next);
        }
        let mut out = self.diags.clone();
        out.sort_by_key(|d| {
            let (_, start, end) = d.span.sort_key();
            (file_rank[&d.span.file], start, end)
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use vela_source::{FileId, TextRange};

    use super::*;

    fn span(file: u32, start: u32) -> Span {
        Span::new(
            FileId(file),
            TextRange::new(start.into(), (start + 1).into()),
        )
    }

    #[test]
    fn duplicate_reports_collapse() {
        let mut sink = Diagnostics::new();
        sink.add(Diagnostic::error(
            DiagCode::DIVIDE_BY_ZERO,
            span(0, 4),
            "division by zero",
        ));
        sink.add(
            Diagnostic::error(DiagCode::DIVIDE_BY_ZERO, span(0, 4), "division by zero")
                .with_note("from instance top.m2", None),
        );
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.iter().next().unwrap().notes.len(), 1);
    }

    #[test]
    fn distinct_spans_stay_distinct() {
        let mut sink = Diagnostics::new();
        sink.add(Diagnostic::error(DiagCode::DIVIDE_BY_ZERO, span(0, 4), "a"));
        sink.add(Diagnostic::error(DiagCode::DIVIDE_BY_ZERO, span(0, 9), "b"));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.error_count(), 2);
    }

    #[test]
    fn sorted_orders_by_offset_within_file() {
        let mut sink = Diagnostics::new();
        sink.add(Diagnostic::error(DiagCode::UNDECLARED_IDENTIFIER, span(0, 9), "later"));
        sink.add(Diagnostic::error(DiagCode::UNDECLARED_IDENTIFIER, span(0, 2), "earlier"));
        let sorted = sink.sorted();
        assert_eq!(sorted[0].message, "earlier");
        assert_eq!(sorted[1].message, "later");
    }

    #[test]
    fn sorted_keeps_buffers_in_first_seen_order() {
        let mut sink = Diagnostics::new();
        sink.add(Diagnostic::error(DiagCode::UNDECLARED_IDENTIFIER, span(7, 0), "file7"));
        sink.add(Diagnostic::error(DiagCode::UNDECLARED_IDENTIFIER, span(3, 0), "file3"));
        let sorted = sink.sorted();
        assert_eq!(sorted[0].message, "file7");
        assert_eq!(sorted[1].message, "file3");
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut sink = Diagnostics::new();
        sink.add(Diagnostic::warning(
            DiagCode::WIDTH_TRUNCATION,
            span(0, 0),
            "implicit truncation",
        ));
        assert_eq!(sink.error_count(), 0);
    }

    #[test]
    fn poison_flag_round_trips() {
        let mut sink = Diagnostics::new();
        assert!(!sink.is_poisoned());
        sink.poison();
        assert!(sink.is_poisoned());
    }
}
