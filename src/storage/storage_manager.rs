use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct StorageManager;

impl StorageManager {
    /// `<root>/presentation_data/YYYY/MM/DD/<uuid>`, unique per export.
    pub fn generate_export_dir(root: &Path) -> PathBuf {
        let date = Utc::now().format("%Y/%m/%d").to_string();
        let export_id = Uuid::new_v4();
        root.join("presentation_data")
            .join(date)
            .join(export_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_dirs_are_unique() {
        let root = Path::new("exports");
        let first = StorageManager::generate_export_dir(root);
        let second = StorageManager::generate_export_dir(root);

        assert!(first.starts_with("exports/presentation_data"));
        assert_ne!(first, second);
    }
}
