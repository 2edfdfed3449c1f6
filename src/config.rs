//! On-disk data layout.
//!
//! ```text
//! <data-dir>/
//!   catalog.json            optional, overrides the built-in catalog
//!   groups/<group>.json     one file per group
//!   indicators/<CODE>_<group>.json
//! ```

use crate::catalog::IndicatorCatalog;
use crate::membership::GroupMembership;
use anyhow::Result;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "cache";
pub const DATA_DIR_ENV: &str = "WBI_AGG_DATA_DIR";
pub const CATALOG_ENV: &str = "WBI_AGG_CATALOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub root: PathBuf,
    /// Explicit catalog file; `None` means `<root>/catalog.json` if present, else built-in.
    pub catalog: Option<PathBuf>,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

impl DataLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            catalog: None,
        }
    }

    pub fn with_catalog<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.catalog = path.map(Into::into);
        self
    }

    pub fn groups_dir(&self) -> PathBuf {
        self.root.join("groups")
    }

    pub fn indicators_dir(&self) -> PathBuf {
        self.root.join("indicators")
    }

    /// Catalog file to read, if any.
    pub fn catalog_path(&self) -> Option<PathBuf> {
        match &self.catalog {
            Some(p) => Some(p.clone()),
            None => Some(self.root.join("catalog.json")).filter(|p| p.exists()),
        }
    }

    pub fn load_catalog(&self) -> Result<IndicatorCatalog> {
        match self.catalog_path() {
            Some(path) => {
                log::debug!("using catalog {}", path.display());
                IndicatorCatalog::from_path(path)
            }
            None => Ok(IndicatorCatalog::builtin()?),
        }
    }

    pub fn load_membership(&self) -> Result<GroupMembership> {
        GroupMembership::from_dir(self.groups_dir())
    }
}
