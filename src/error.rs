// Error taxonomy for a collection cycle
//
// Class-level errors (session, connection, fetch, empty result) abort the
// collection of one entity class. MissingField errors concern a single entity
// and are reported out-of-band through the accumulator while the class goes on.

use thiserror::Error;

use crate::ovirt::ApiError;

/// Errors raised while collecting oVirt entities
#[derive(Error, Debug)]
pub enum CollectError {
    /// No engine session has been opened; the caller must reopen it
    #[error("no oVirt connection has been opened")]
    NoSession,

    /// Opening (or re-opening) the engine session failed
    #[error("failed to open connection with {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: ApiError,
    },

    /// Informational: the session probe failed and a new session is opened
    #[error("oVirt session not active, re-authenticating")]
    Reauthenticating,

    /// A class-level list fetch failed
    #[error("could not get {class} list: {source}")]
    Fetch {
        class: &'static str,
        #[source]
        source: ApiError,
    },

    /// The engine answered with something that is not a list document
    #[error("could not get {class} list or it is empty")]
    EmptyResult { class: &'static str },

    /// A single entity lacks a required attribute
    #[error("found a {entity}{} without {field}, skipping", entity_label(.name))]
    MissingField {
        entity: &'static str,
        field: &'static str,
        name: Option<String>,
    },

    /// The cycle deadline passed or shutdown was requested
    #[error("collection cancelled")]
    Cancelled,

    /// A class collection aborted; wraps the error that stopped it
    #[error("could not collect {class}: {source}")]
    Class {
        class: &'static str,
        #[source]
        source: Box<CollectError>,
    },
}

impl CollectError {
    pub fn missing(entity: &'static str, field: &'static str, name: Option<&str>) -> Self {
        CollectError::MissingField {
            entity,
            field,
            name: name.map(str::to_string),
        }
    }

    /// Wraps an error with the class whose collection it aborted
    pub fn in_class(self, class: &'static str) -> Self {
        match self {
            CollectError::Cancelled => CollectError::Cancelled,
            other => CollectError::Class {
                class,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, looking through class wrappers
    pub fn root(&self) -> &CollectError {
        match self {
            CollectError::Class { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), CollectError::Cancelled)
    }
}

fn entity_label(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" '{}'", name),
        None => String::new(),
    }
}
