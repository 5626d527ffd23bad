//! Core trait definitions shared across corescope crates.

/// A type that carries a user-visible name.
pub trait Annotated {
    /// A human-readable name or identifier.
    fn name(&self) -> &str;

    /// An optional description.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// A type that can produce a summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display or logging.
    fn summary(&self) -> String;
}
