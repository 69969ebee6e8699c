use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::constants::archive::{
    COMPRESSION_LEVEL, FILENAME_TIME_FORMAT, SQL_ENTRY_NAME, TEMP_FILE_PREFIX,
};
use crate::errors::BackupError;

/// Destination for the SQL text produced by an export
pub trait SqlSink {
    fn write_sql(&mut self, sql: &str) -> Result<(), BackupError>;
}

impl SqlSink for String {
    fn write_sql(&mut self, sql: &str) -> Result<(), BackupError> {
        self.push_str(sql);
        Ok(())
    }
}

/// Zip archive with a single deflated SQL entry, written section by section
/// into a temporary file.
///
/// The temporary file is removed when the builder is finished or dropped,
/// so an aborted export leaves nothing behind.
pub struct ArchiveBuilder {
    temp_file: NamedTempFile,
    writer: ZipWriter<File>,
    sql_bytes: u64,
}

impl ArchiveBuilder {
    pub fn create(temp_dir: Option<&Path>) -> Result<Self, BackupError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX).suffix(".zip");
        let temp_file = match temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let handle = temp_file.as_file().try_clone()?;
        let mut writer = ZipWriter::new(handle);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL));
        writer.start_file(SQL_ENTRY_NAME, options)?;

        debug!("Writing backup archive to {}", temp_file.path().display());

        Ok(Self {
            temp_file,
            writer,
            sql_bytes: 0,
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_file.path()
    }

    /// Uncompressed size of the SQL written so far
    pub fn sql_bytes(&self) -> u64 {
        self.sql_bytes
    }

    /// Close the archive and return its bytes. The temporary file is gone
    /// once this returns, whatever the outcome.
    pub fn finish(self) -> Result<Vec<u8>, BackupError> {
        let ArchiveBuilder {
            temp_file, writer, ..
        } = self;

        let mut file = writer.finish()?;
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        drop(file);

        let path = temp_file.path().to_path_buf();
        if let Err(e) = temp_file.close() {
            warn!(
                "Failed to remove temporary archive {}: {}",
                path.display(),
                e
            );
        }

        Ok(bytes)
    }
}

impl SqlSink for ArchiveBuilder {
    fn write_sql(&mut self, sql: &str) -> Result<(), BackupError> {
        self.writer.write_all(sql.as_bytes())?;
        self.sql_bytes += sql.len() as u64;
        Ok(())
    }
}

/// Attachment filename for an archive generated at `generated_at`
pub fn archive_filename(generated_at: DateTime<Utc>) -> String {
    format!("backup-{}.zip", generated_at.format(FILENAME_TIME_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_archive_contains_single_sql_entry() {
        let dir = TempDir::new().unwrap();
        let mut archive = ArchiveBuilder::create(Some(dir.path())).unwrap();
        let temp_path = archive.temp_path().to_path_buf();
        assert!(temp_path.exists());

        archive.write_sql("-- Database backup\n").unwrap();
        archive.write_sql("PRAGMA foreign_keys = OFF;\n").unwrap();
        assert_eq!(archive.sql_bytes(), 46);

        let bytes = archive.finish().unwrap();
        assert!(!temp_path.exists());

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 1);
        let mut entry = zip.by_name(SQL_ENTRY_NAME).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut sql = String::new();
        entry.read_to_string(&mut sql).unwrap();
        assert_eq!(sql, "-- Database backup\nPRAGMA foreign_keys = OFF;\n");
    }

    #[test]
    fn test_dropped_builder_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let mut archive = ArchiveBuilder::create(Some(dir.path())).unwrap();
        let temp_path = archive.temp_path().to_path_buf();
        archive.write_sql("INSERT INTO t VALUES (1);\n").unwrap();

        drop(archive);
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_missing_temp_dir_is_archive_error() {
        let result = ArchiveBuilder::create(Some(Path::new("/nonexistent/backup/dir")));
        assert!(matches!(result, Err(BackupError::ArchiveWrite { .. })));
    }

    #[test]
    fn test_archive_filename() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 15).unwrap();
        assert_eq!(archive_filename(ts), "backup-2024-01-05T10-30-15.zip");
    }
}
