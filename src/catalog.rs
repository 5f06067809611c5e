//! Blob catalog: selection and listing of stored datasets
//!
//! Every pipeline starts from a [`Selection`]. The catalog scans the blob
//! store's metadata index, keeps names matching the pattern (and optionally
//! only non-empty datasets), sorts them and applies the limit.
//!
//! The catalog also hosts the two destructive operations that act on a
//! selection: [`Catalog::delete`] for viewer collections and [`Catalog::drop`]
//! for the blobs themselves.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{TransferError, TransferResult};
use crate::store::{BlobStore, DocumentStore};

/// Sort direction over dataset names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(TransferError::Configuration(format!(
                "Unknown sort order '{}'. Expected asc or desc",
                s
            ))),
        }
    }
}

/// Which datasets an operation applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Regular expression searched in each dataset name
    pub pattern: String,
    /// Only keep datasets whose recorded row count is greater than zero
    pub non_empty_only: bool,
    pub sort: SortOrder,
    /// Cap on the number of names returned, applied after sorting
    pub limit: Option<usize>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            pattern: ".*".to_string(),
            non_empty_only: false,
            sort: SortOrder::Asc,
            limit: None,
        }
    }
}

impl Selection {
    /// Select every dataset whose name matches `pattern`
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn non_empty_only(mut self, non_empty_only: bool) -> Self {
        self.non_empty_only = non_empty_only;
        self
    }

    fn compile(&self) -> TransferResult<Regex> {
        Regex::new(&self.pattern).map_err(|e| TransferError::InvalidPattern {
            pattern: self.pattern.clone(),
            error: e.to_string(),
        })
    }
}

/// Listing and removal of stored datasets
pub struct Catalog<'a> {
    blobs: &'a dyn BlobStore,
    documents: &'a dyn DocumentStore,
}

impl<'a> Catalog<'a> {
    pub fn new(blobs: &'a dyn BlobStore, documents: &'a dyn DocumentStore) -> Self {
        Self { blobs, documents }
    }

    /// Names of the selected datasets, sorted and limited
    pub fn list(&self, selection: &Selection) -> TransferResult<Vec<String>> {
        let pattern = selection.compile()?;

        let mut names: Vec<String> = self
            .blobs
            .list_files()?
            .into_iter()
            .filter(|record| !selection.non_empty_only || record.rows.is_some_and(|r| r > 0))
            .map(|record| record.name().to_string())
            .filter(|name| pattern.is_match(name))
            .collect();

        names.sort();
        if selection.sort == SortOrder::Desc {
            names.reverse();
        }
        if let Some(limit) = selection.limit {
            names.truncate(limit);
        }

        tracing::debug!(
            pattern = %selection.pattern,
            count = names.len(),
            "Listed datasets"
        );
        Ok(names)
    }

    /// Drop the viewer collection of every selected dataset that has one
    ///
    /// Returns the names of the dropped collections in selection order.
    pub fn delete(&self, selection: &Selection) -> TransferResult<Vec<String>> {
        let names = self.list(selection)?;
        let collections = self.documents.list_collections()?;

        let mut dropped = Vec::new();
        for name in names {
            if collections.contains(&name) {
                self.documents.drop_collection(&name)?;
                tracing::info!("Dropped viewer collection {}", name);
                dropped.push(name);
            }
        }
        Ok(dropped)
    }

    /// Permanently delete every selected blob
    ///
    /// Returns the dropped names in selection order.
    pub fn drop(&self, selection: &Selection) -> TransferResult<Vec<String>> {
        let names = self.list(selection)?;
        for name in &names {
            self.blobs.delete(name)?;
            tracing::info!("Dropped dataset {}", name);
        }
        Ok(names)
    }
}
