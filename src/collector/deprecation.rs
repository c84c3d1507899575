//! Deprecation warnings for collector names.

/// Log a one-line warning that `collector` is deprecated.
pub fn warn_deprecated(collector: &str) {
    tracing::warn!(
        collector = %collector,
        "The {} collector is deprecated and will be removed in the future!",
        collector
    );
}
