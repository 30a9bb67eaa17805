//! Observable events for obsmeta
//!
//! Events are explicit and typed. Each one maps to a stable upper-case name
//! that appears as the `event` key of a log line.

use std::fmt;

/// Observable events emitted by validation, caching and the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Registry
    /// Metadata documents scanned from the data directory
    RegistryLoaded,
    /// Registry explicitly reloaded
    RegistryReloaded,

    // Validation
    /// Validation pass started for one dataset
    ValidationStart,
    /// Validation problem (hard failure signal)
    ValidationProblem,
    /// Validation warning (operator review)
    ValidationWarning,
    /// Informational classification notice
    ValidationMessage,
    /// Validation pass finished
    ValidationComplete,

    // Persistence
    /// Document content hash unchanged, nothing written
    DocumentUnchanged,
    /// Updated document written back
    DocumentRewritten,
    /// Previous document preserved under a backup name
    BackupCreated,

    // Cache
    /// Cached value served
    CacheHit,
    /// No cached value, computation executed
    CacheMiss,
    /// Forced recomputation
    CacheRefresh,
    /// Entry removed
    CacheInvalidated,
}

impl Event {
    /// Returns the string representation used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::RegistryLoaded => "REGISTRY_LOADED",
            Event::RegistryReloaded => "REGISTRY_RELOADED",
            Event::ValidationStart => "VALIDATION_START",
            Event::ValidationProblem => "VALIDATION_PROBLEM",
            Event::ValidationWarning => "VALIDATION_WARNING",
            Event::ValidationMessage => "VALIDATION_MESSAGE",
            Event::ValidationComplete => "VALIDATION_COMPLETE",
            Event::DocumentUnchanged => "DOCUMENT_UNCHANGED",
            Event::DocumentRewritten => "DOCUMENT_REWRITTEN",
            Event::BackupCreated => "BACKUP_CREATED",
            Event::CacheHit => "CACHE_HIT",
            Event::CacheMiss => "CACHE_MISS",
            Event::CacheRefresh => "CACHE_REFRESH",
            Event::CacheInvalidated => "CACHE_INVALIDATED",
        }
    }

    /// Problems are the only events that signal failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Event::ValidationProblem)
    }

    /// Events worth an operator's attention but not a failure.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::ValidationWarning | Event::DocumentRewritten | Event::BackupCreated
        )
    }

    /// High-volume events that only matter when debugging.
    pub fn is_trace(&self) -> bool {
        matches!(
            self,
            Event::ValidationMessage | Event::CacheHit | Event::CacheMiss
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake() {
        let events = [
            Event::ConfigLoaded,
            Event::RegistryLoaded,
            Event::ValidationProblem,
            Event::BackupCreated,
            Event::CacheMiss,
        ];
        for event in events {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_severity_classes_are_disjoint() {
        assert!(Event::ValidationProblem.is_error());
        assert!(!Event::ValidationProblem.is_warning());
        assert!(Event::ValidationWarning.is_warning());
        assert!(Event::CacheHit.is_trace());
        assert!(!Event::CacheHit.is_warning());
    }
}
