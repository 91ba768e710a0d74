//! Error and navigation-failure types
//!
//! Two families live here:
//! - [`RouterError`] for fallible table, pattern and matching operations
//! - [`NavigationFailure`] for every way a navigation can end without committing

use thiserror::Error;

/// Errors raised while compiling patterns, filling params or matching locations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// A required param was absent while filling a pattern
    #[error("missing param \"{param}\" for path \"{path}\"")]
    MissingParam { param: String, path: String },

    /// A param value does not satisfy its capture pattern
    #[error("param \"{param}\" with value \"{value}\" does not match \"{pattern}\" in path \"{path}\"")]
    InvalidParam {
        param: String,
        value: String,
        pattern: String,
        path: String,
    },

    /// A path pattern could not be compiled
    #[error("invalid route pattern \"{path}\": {reason}")]
    InvalidPattern { path: String, reason: String },

    /// Redirect or alias indirection exceeded the depth limit
    #[error("redirect chain starting at \"{from}\" exceeded {limit} hops")]
    RedirectLoop { from: String, limit: usize },

    /// A route manifest entry could not be turned into a route config
    #[error("invalid route manifest entry \"{path}\": {reason}")]
    Manifest { path: String, reason: String },
}

/// Discriminant of a [`NavigationFailure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationFailureKind {
    Duplicated,
    Cancelled,
    Redirected,
    Aborted,
    Guard,
    Match,
}

/// Outcome of a navigation that did not commit
///
/// `Duplicated`, `Cancelled`, `Redirected` and `Aborted` are expected outcomes.
/// `Guard` carries an error raised by a guard or a lazy component loader and is
/// additionally broadcast to the router's error listeners.
#[derive(Debug, Error)]
pub enum NavigationFailure {
    #[error("avoided redundant navigation to current location: \"{to}\"")]
    Duplicated { from: String, to: String },

    #[error("navigation cancelled from \"{from}\" to \"{to}\" with a new navigation")]
    Cancelled { from: String, to: String },

    #[error("redirected when going from \"{from}\" to \"{to}\" via a navigation guard")]
    Redirected { from: String, to: String },

    #[error("navigation aborted from \"{from}\" to \"{to}\" via a navigation guard")]
    Aborted { from: String, to: String },

    #[error("uncaught error during route navigation: {0:#}")]
    Guard(anyhow::Error),

    #[error(transparent)]
    Match(#[from] RouterError),
}

impl NavigationFailure {
    /// Returns the failure discriminant
    pub fn kind(&self) -> NavigationFailureKind {
        match self {
            NavigationFailure::Duplicated { .. } => NavigationFailureKind::Duplicated,
            NavigationFailure::Cancelled { .. } => NavigationFailureKind::Cancelled,
            NavigationFailure::Redirected { .. } => NavigationFailureKind::Redirected,
            NavigationFailure::Aborted { .. } => NavigationFailureKind::Aborted,
            NavigationFailure::Guard(_) => NavigationFailureKind::Guard,
            NavigationFailure::Match(_) => NavigationFailureKind::Match,
        }
    }

    /// True for the router's own expected outcomes (not user errors)
    pub fn is_expected(&self) -> bool {
        matches!(
            self.kind(),
            NavigationFailureKind::Duplicated
                | NavigationFailureKind::Cancelled
                | NavigationFailureKind::Redirected
                | NavigationFailureKind::Aborted
        )
    }

    /// Checks the failure against a specific kind
    pub fn is(&self, kind: NavigationFailureKind) -> bool {
        self.kind() == kind
    }
}
