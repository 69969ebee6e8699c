//! Database snapshot export and restore
//!
//! # Export
//!
//! 1. Enumerate the base tables of the primary schema
//! 2. Serialize each table's rows into INSERT statements, one table at a time
//! 3. Stream the SQL into a single deflated zip entry (`database_backup.sql`)
//!    staged in a temporary file that is removed once the bytes are read
//!
//! A table that cannot be read is recorded as an inline error comment and
//! the export carries on with the next table.
//!
//! # Restore
//!
//! 1. Decode the upload (raw SQL, or an exported zip)
//! 2. Parse every statement up front, rejecting anything the exporter does
//!    not produce
//! 3. Replay the statements on one connection with the selected
//!    [`RestoreMode`] deciding what happens on key conflicts

pub mod archive;
pub mod exporter;
pub mod manifest;
pub mod restore;
pub mod serializer;
pub mod statements;

pub use archive::{archive_filename, ArchiveBuilder, SqlSink};
pub use exporter::{BackupExporter, ExportedArchive};
pub use manifest::{ExportManifest, TableRecordCount};
pub use restore::{decode_payload, RestoreMode, RestoreSummary, Restorer};
