//! Packaging of export listings into downloadable archives.
//! 將匯出清單封裝為可下載的封存檔。

use std::io::{self, Cursor, Write};

use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::export::ArchiveEntry;

/// Errors produced while packaging an export listing.
/// 封裝匯出清單時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive IO error: {0}")]
    Io(#[from] io::Error),
    #[error("zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Packages export entries into a downloadable container.
/// 將匯出清單封裝為可下載的封存格式。
pub trait ArchiveWriter {
    fn write_archive(&mut self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError>;
}

/// Zip container writer.
#[derive(Debug, Clone, Copy)]
pub struct ZipArchiveWriter {
    compression: CompressionMethod,
}

impl Default for ZipArchiveWriter {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }
}

impl ZipArchiveWriter {
    pub fn stored() -> Self {
        Self {
            compression: CompressionMethod::Stored,
        }
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn write_archive(&mut self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in entries {
            writer.start_file(
                entry.path.as_str(),
                SimpleFileOptions::default().compression_method(self.compression),
            )?;
            writer.write_all(entry.content.as_bytes())?;
        }
        let bytes = writer.finish()?.into_inner();
        debug!(entries = entries.len(), bytes = bytes.len(), "packaged zip archive");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn zip_contains_every_entry() {
        let entries = vec![
            ArchiveEntry {
                path: "app.js".into(),
                content: "// app".into(),
            },
            ArchiveEntry {
                path: "src/utils.js".into(),
                content: "// utils".into(),
            },
        ];
        let bytes = ZipArchiveWriter::default()
            .write_archive(&entries)
            .expect("zip should encode");

        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("zip should be readable");
        assert_eq!(archive.len(), 2);
        let mut text = String::new();
        archive
            .by_name("src/utils.js")
            .expect("nested entry present")
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "// utils");
    }

    #[test]
    fn empty_listing_still_produces_archive() {
        let bytes = ZipArchiveWriter::stored().write_archive(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
