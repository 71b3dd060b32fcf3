//! Local file catalog backed by the host file index.

use std::sync::Arc;

use hostprint_core::{catalog, IndexEntry, LocalFileRecord};
use tracing::{debug, warn};

use crate::error::LauncherResult;

/// Host file index collaborator.
pub trait FileIndex: Send + Sync {
    /// Lists every local entry, recursively, folders included.
    fn list_local(&self) -> LauncherResult<Vec<IndexEntry>>;
}

/// Newest-first view over the host file index.
///
/// Every query re-reads the index; nothing is cached.
#[derive(Clone)]
pub struct LocalCatalog {
    index: Arc<dyn FileIndex>,
}

impl LocalCatalog {
    /// Creates a catalog over `index`.
    pub fn new(index: Arc<dyn FileIndex>) -> Self {
        LocalCatalog { index }
    }

    /// Machine-code files, newest first, optionally truncated.
    ///
    /// Index failures are logged and yield an empty list.
    pub fn latest_files(&self, limit: Option<usize>) -> Vec<LocalFileRecord> {
        match self.index.list_local() {
            Ok(entries) => {
                let files = catalog::latest_files(entries, limit);
                debug!(count = files.len(), ?limit, "Catalog queried");
                files
            }
            Err(e) => {
                warn!(error = %e, "Host file index query failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LauncherError;
    use chrono::{TimeZone, Utc};

    struct Fixed(Vec<IndexEntry>);

    impl FileIndex for Fixed {
        fn list_local(&self) -> LauncherResult<Vec<IndexEntry>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl FileIndex for Broken {
        fn list_local(&self) -> LauncherResult<Vec<IndexEntry>> {
            Err(LauncherError::IndexUnavailable("storage offline".into()))
        }
    }

    fn entry(hour: u32, path: &str) -> IndexEntry {
        IndexEntry {
            date: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            path: path.into(),
            name: path.into(),
            display: path.into(),
            type_path: vec!["machinecode".into(), "gcode".into()],
        }
    }

    #[test]
    fn test_latest_files_queries_index() {
        let catalog = LocalCatalog::new(Arc::new(Fixed(vec![
            entry(1, "old.gcode"),
            entry(9, "new.gcode"),
        ])));
        let files = catalog.latest_files(Some(1));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "new.gcode");
    }

    #[test]
    fn test_index_failure_yields_empty() {
        let catalog = LocalCatalog::new(Arc::new(Broken));
        assert!(catalog.latest_files(None).is_empty());
    }
}
