//! Identifier generation and collision-safe naming policy.
//! 節點識別碼產生與命名規則（預設副檔名、複本命名）。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extension appended to file names that carry none.
pub const DEFAULT_EXTENSION: &str = "js";

const COPY_MARKER: &str = "_copy";

/// Opaque identifier of a tree node; also the identifier of its editing tab.
/// 樹狀節點的不透明識別碼，同時也是對應分頁的識別碼。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Generates a fresh identifier (time-ordered prefix, random suffix).
    /// 產生新的識別碼（時間前綴加隨機尾碼）。
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether an entry is a file or a folder.
/// 節點種類：檔案或資料夾。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// Range of the tree consulted when numbering a duplicate.
/// 計算複本編號時要掃描的範圍。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateScope {
    /// Every node in the tree.
    #[default]
    Tree,
    /// Only the siblings of the node being duplicated.
    Siblings,
}

/// Returns `true` when the name is empty or whitespace only.
pub fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

/// Applies the default-extension policy to a proposed name.
///
/// Files without a `.` get [`DEFAULT_EXTENSION`]; folders are kept verbatim.
/// Blank names resolve to `None`.
/// 套用預設副檔名規則；空白名稱回傳 `None`。
pub fn resolve_create_name(kind: EntryKind, proposed: &str) -> Option<String> {
    if is_blank(proposed) {
        return None;
    }
    match kind {
        EntryKind::File if !proposed.contains('.') => {
            Some(format!("{proposed}.{DEFAULT_EXTENSION}"))
        }
        _ => Some(proposed.to_string()),
    }
}

/// A name split into its copy-numbering parts: `base[_copyN][.ext]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyName<'a> {
    pub base: &'a str,
    pub copy: Option<u64>,
    pub extension: Option<&'a str>,
}

impl<'a> CopyName<'a> {
    /// Splits `name`; only files with a `.` carry an extension part.
    pub fn parse(kind: EntryKind, name: &'a str) -> Self {
        let (stem, extension) = match (kind, name.rsplit_once('.')) {
            (EntryKind::File, Some((stem, ext))) => (stem, Some(ext)),
            _ => (name, None),
        };
        let (base, copy) = split_copy_suffix(stem);
        Self {
            base,
            copy,
            extension,
        }
    }

    fn render(&self, number: u64) -> String {
        match self.extension {
            Some(ext) => format!("{}{COPY_MARKER}{number}.{ext}", self.base),
            None => format!("{}{COPY_MARKER}{number}", self.base),
        }
    }

    /// Returns `K` when `candidate` reads exactly `base_copyK[.ext]` with `K > 0`.
    fn copy_number_of(&self, candidate: &str) -> Option<u64> {
        let rest = candidate.strip_prefix(self.base)?.strip_prefix(COPY_MARKER)?;
        let digits = match self.extension {
            Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
            None => rest,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u64>().ok().filter(|number| *number > 0)
    }
}

fn split_copy_suffix(stem: &str) -> (&str, Option<u64>) {
    let digits_start = stem.trim_end_matches(|ch: char| ch.is_ascii_digit()).len();
    if digits_start == stem.len() {
        return (stem, None);
    }
    match stem[..digits_start].strip_suffix(COPY_MARKER) {
        Some(base) => (base, stem[digits_start..].parse().ok()),
        None => (stem, None),
    }
}

/// Picks the collision-safe name for a duplicate of `original`.
///
/// Scans `existing` for `base_copyK[.ext]` names and returns the next number
/// after the highest one found (or `_copy1`).
/// 掃描既有名稱，回傳下一個可用的 `_copyN` 名稱。
pub fn resolve_duplicate_name<'a, I>(existing: I, kind: EntryKind, original: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let parsed = CopyName::parse(kind, original);
    let next = existing
        .into_iter()
        .filter_map(|candidate| parsed.copy_number_of(candidate))
        .max()
        .map(|highest| highest + 1)
        .unwrap_or(1);
    parsed.render(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn create_name_appends_default_extension_for_files() {
        assert_eq!(
            resolve_create_name(EntryKind::File, "index").as_deref(),
            Some("index.js")
        );
        assert_eq!(
            resolve_create_name(EntryKind::File, "style.css").as_deref(),
            Some("style.css")
        );
        assert_eq!(
            resolve_create_name(EntryKind::Folder, "lib").as_deref(),
            Some("lib")
        );
        assert_eq!(resolve_create_name(EntryKind::File, "   "), None);
    }

    #[test]
    fn parse_strips_existing_copy_suffix() {
        let parsed = CopyName::parse(EntryKind::File, "app_copy3.js");
        assert_eq!(parsed.base, "app");
        assert_eq!(parsed.copy, Some(3));
        assert_eq!(parsed.extension, Some("js"));

        let folder = CopyName::parse(EntryKind::Folder, "v1.2");
        assert_eq!(folder.base, "v1.2");
        assert_eq!(folder.extension, None);

        let plain = CopyName::parse(EntryKind::Folder, "build2");
        assert_eq!(plain.base, "build2");
        assert_eq!(plain.copy, None);
    }

    #[test]
    fn duplicate_name_starts_at_one() {
        let name = resolve_duplicate_name(["app.js", "main.js"], EntryKind::File, "app.js");
        assert_eq!(name, "app_copy1.js");
    }

    #[test]
    fn duplicate_name_continues_after_highest_copy() {
        let existing = ["app.js", "app_copy1.js", "app_copy4.js", "app_copy2.css"];
        let name = resolve_duplicate_name(existing, EntryKind::File, "app_copy1.js");
        assert_eq!(name, "app_copy5.js");
    }

    #[test]
    fn duplicate_name_for_folders_has_no_extension() {
        let existing = ["src", "src_copy1", "src_copy1.js"];
        assert_eq!(
            resolve_duplicate_name(existing, EntryKind::Folder, "src"),
            "src_copy2"
        );
    }

    #[test]
    fn zero_and_malformed_copy_numbers_are_ignored() {
        let existing = ["a_copy0.js", "a_copyX.js", "a_copy.js"];
        assert_eq!(
            resolve_duplicate_name(existing, EntryKind::File, "a.js"),
            "a_copy1.js"
        );
    }
}
