use serde::{Deserialize, Serialize};

/// Marker prefix of failed evaluations.
pub const ERROR_PREFIX: &str = "Error:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Log,
    Error,
}

impl OutputKind {
    pub fn classify(text: &str) -> Self {
        if text.starts_with(ERROR_PREFIX) {
            OutputKind::Error
        } else {
            OutputKind::Log
        }
    }
}

/// One recorded output. `input` holds the typed expression for console
/// entries and is `None` for program runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub seq: u64,
    pub timestamp_ms: u64,
    pub kind: OutputKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// History view filter. `kind: None` shows everything; `search` is a
/// case-insensitive substring match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFilter {
    pub kind: Option<OutputKind>,
    pub search: Option<String>,
}

impl OutputFilter {
    pub fn matches(&self, entry: &OutputEntry) -> bool {
        if self.kind.is_some_and(|kind| kind != entry.kind) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                entry.text.to_lowercase().contains(&term.to_lowercase())
            }
            _ => true,
        }
    }
}

/// Append-only history of run outputs.
/// （執行輸出的歷史紀錄。）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLog {
    entries: Vec<OutputEntry>,
    next_seq: u64,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `text` unless it is empty. Returns the sequence id assigned.
    pub fn record(&mut self, text: impl Into<String>, timestamp_ms: u64) -> Option<u64> {
        let text = text.into();
        if text.is_empty() {
            return None;
        }
        let kind = OutputKind::classify(&text);
        Some(self.push(kind, text, None, timestamp_ms))
    }

    /// Records the result of a console expression. Unlike program runs the
    /// entry is kept even when the result text is empty.
    /// 記錄主控台輸入的運算結果。
    pub fn record_console(
        &mut self,
        input: impl Into<String>,
        result: Result<String, String>,
        timestamp_ms: u64,
    ) -> u64 {
        let (kind, text) = match result {
            Ok(text) => (OutputKind::Log, text),
            Err(message) => (OutputKind::Error, message),
        };
        self.push(kind, text, Some(input.into()), timestamp_ms)
    }

    fn push(
        &mut self,
        kind: OutputKind,
        text: String,
        input: Option<String>,
        timestamp_ms: u64,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(OutputEntry {
            seq,
            timestamp_ms,
            kind,
            text,
            input,
        });
        seq
    }

    pub fn entries(&self) -> &[OutputEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&OutputEntry> {
        self.entries.last()
    }

    pub fn filtered<'a>(&'a self, filter: &'a OutputFilter) -> impl Iterator<Item = &'a OutputEntry> {
        self.entries.iter().filter(move |entry| filter.matches(entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries; sequence ids keep counting up.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_and_skips_empty_output() {
        let mut log = OutputLog::new();
        assert_eq!(log.record("", 1), None);
        assert_eq!(log.record("hello", 2), Some(0));
        assert_eq!(log.record("Error: nope", 3), Some(1));
        assert_eq!(log.entries()[0].kind, OutputKind::Log);
        assert_eq!(log.latest().map(|entry| entry.kind), Some(OutputKind::Error));
    }

    #[test]
    fn filter_by_kind_and_search_term() {
        let mut log = OutputLog::new();
        log.record("Total: 3", 1);
        log.record("Error: Boom", 2);
        log.record("total: 4", 3);

        let search = OutputFilter {
            kind: None,
            search: Some("TOTAL".into()),
        };
        let hits: Vec<_> = log.filtered(&search).map(|entry| entry.seq).collect();
        assert_eq!(hits, vec![0, 2]);

        let errors = OutputFilter {
            kind: Some(OutputKind::Error),
            search: Some("  ".into()),
        };
        assert_eq!(log.filtered(&errors).count(), 1);
    }

    #[test]
    fn console_entries_keep_their_input() {
        let mut log = OutputLog::new();
        log.record("run output", 1);
        let ok = log.record_console("1 + 1", Ok("2".into()), 2);
        let failed = log.record_console("nope()", Err("nope is not defined".into()), 3);
        assert_eq!((ok, failed), (1, 2));

        let entries = log.entries();
        assert_eq!(entries[0].input, None);
        assert_eq!(entries[1].input.as_deref(), Some("1 + 1"));
        assert_eq!(entries[1].kind, OutputKind::Log);
        assert_eq!(entries[2].kind, OutputKind::Error);
        assert_eq!(entries[2].text, "nope is not defined");

        let errors = OutputFilter {
            kind: Some(OutputKind::Error),
            search: None,
        };
        assert_eq!(log.filtered(&errors).count(), 1);
    }

    #[test]
    fn clear_keeps_sequence_monotonic() {
        let mut log = OutputLog::new();
        log.record("a", 1);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.record("b", 2), Some(1));
    }
}
