// Name filters - include/exclude glob patterns per entity class
//
// A name passes a filter when the include list is empty or one of its
// patterns matches, and no exclude pattern matches. Filters are immutable
// values built once from the configuration.

use glob::Pattern;
use thiserror::Error;

use crate::collector::CollectorKind;

/// A glob pattern from the configuration could not be compiled
#[derive(Error, Debug)]
#[error("invalid filter pattern '{pattern}': {source}")]
pub struct FilterConfigError {
    pub pattern: String,
    #[source]
    pub source: glob::PatternError,
}

/// Include/exclude glob filter over entity names
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl NameFilter {
    /// Compiles the include and exclude pattern lists
    ///
    /// # Errors
    /// Returns `FilterConfigError` for the first pattern that is not a valid glob
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, FilterConfigError> {
        Ok(NameFilter {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|pattern| pattern.matches(name));
        included && !self.exclude.iter().any(|pattern| pattern.matches(name))
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, FilterConfigError> {
    patterns
        .iter()
        .map(|raw| {
            Pattern::new(raw.as_ref()).map_err(|source| FilterConfigError {
                pattern: raw.as_ref().to_string(),
                source,
            })
        })
        .collect()
}

/// Name filters applied by the collector, one per filtered entity class
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    pub clusters: NameFilter,
    pub hosts: NameFilter,
    pub vms: NameFilter,
}

/// Which entity collectors run on each cycle
///
/// The API summary is not part of the selection: it always runs.
#[derive(Debug, Clone)]
pub struct CollectorSelection {
    enabled: Vec<CollectorKind>,
}

impl CollectorSelection {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, FilterConfigError> {
        let filter = NameFilter::new(include, exclude)?;
        let enabled = CollectorKind::ALL
            .iter()
            .copied()
            .filter(|kind| filter.matches(kind.name()))
            .collect();
        Ok(CollectorSelection { enabled })
    }

    pub fn all() -> Self {
        CollectorSelection {
            enabled: CollectorKind::ALL.to_vec(),
        }
    }

    pub fn is_enabled(&self, kind: CollectorKind) -> bool {
        self.enabled.contains(&kind)
    }
}

impl Default for CollectorSelection {
    fn default() -> Self {
        Self::all()
    }
}
