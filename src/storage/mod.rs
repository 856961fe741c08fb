pub mod export_writer;
pub mod storage_manager;

pub use export_writer::{ExportManifest, ExportWriter};
