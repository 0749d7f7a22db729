// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hostname Value Object with Publish Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hostname validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("Invalid domain: expected 2 or 3 labels, got {0}")]
    LabelCount(usize),

    #[error("Invalid domain: empty label")]
    EmptyLabel,

    #[error("Invalid domain: each part must only contain A-Z, a-z, 0-9, and hyphens: {0}")]
    InvalidCharacter(String),
}

/// Site hostname as published by a client
///
/// A hostname is an ordered list of 2 or 3 labels (`["sub", "domain", "tld"]`
/// or `["domain", "tld"]`). Invariants:
/// - Label count is 2 or 3
/// - Every label is non-empty
/// - Labels contain only `[A-Za-z0-9-]`
///
/// Two projections are derived and must not be mixed up:
/// - [`Hostname::dotted`] (`sub.domain.tld`) for DNS and URLs
/// - [`Hostname::dir_name`] (`sub_domain_tld`) for the staged directory
///
/// # Examples
///
/// ```rust
/// use lizcel_host::domain::Hostname;
///
/// let host = Hostname::new(["abc", "example", "com"]).unwrap();
/// assert_eq!(host.dotted(), "abc.example.com");
/// assert_eq!(host.dir_name(), "abc_example_com");
/// assert_eq!(host.zone_name(), "example.com");
///
/// assert!(Hostname::new(["com"]).is_err());
/// assert!(Hostname::new(["a.b", "com"]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Hostname(Vec<String>);

impl Hostname {
    /// Minimum label count (`domain.tld`)
    pub const MIN_LABELS: usize = 2;

    /// Maximum label count (`sub.domain.tld`)
    pub const MAX_LABELS: usize = 3;

    /// Create a new hostname with validation
    pub fn new<I, S>(labels: I) -> Result<Self, HostnameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if !(Self::MIN_LABELS..=Self::MAX_LABELS).contains(&labels.len()) {
            return Err(HostnameError::LabelCount(labels.len()));
        }

        for label in &labels {
            Self::validate_label(label)?;
        }

        Ok(Self(labels))
    }

    fn validate_label(label: &str) -> Result<(), HostnameError> {
        if label.is_empty() {
            return Err(HostnameError::EmptyLabel);
        }

        if !label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
            return Err(HostnameError::InvalidCharacter(label.to_string()));
        }

        Ok(())
    }

    /// Labels in order
    pub fn labels(&self) -> &[String] {
        &self.0
    }

    /// Dotted form, e.g. `sub.domain.tld`
    pub fn dotted(&self) -> String {
        self.0.join(".")
    }

    /// Underscore-joined form used as the staged directory name
    pub fn dir_name(&self) -> String {
        self.0.join("_")
    }

    /// The registrable zone: the last two labels, dot-joined
    pub fn zone_name(&self) -> String {
        self.0[self.0.len() - Self::MIN_LABELS..].join(".")
    }

    /// Public URL the site is served from once the proxy route is active
    pub fn url(&self) -> String {
        format!("https://{}", self.dotted())
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

impl TryFrom<Vec<String>> for Hostname {
    type Error = HostnameError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hostname> for Vec<String> {
    fn from(value: Hostname) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(&["abc", "example", "com"] ; "three labels")]
    #[test_case(&["example", "com"] ; "two labels")]
    #[test_case(&["my-site", "ex4mple", "io"] ; "hyphens and digits")]
    #[test_case(&["ABC", "Example", "COM"] ; "uppercase kept")]
    fn test_valid_hostnames(labels: &[&str]) {
        assert!(Hostname::new(labels.iter().copied()).is_ok());
    }

    #[test_case(&["com"], HostnameError::LabelCount(1) ; "one label")]
    #[test_case(&["a", "b", "example", "com"], HostnameError::LabelCount(4) ; "four labels")]
    #[test_case(&[], HostnameError::LabelCount(0) ; "no labels")]
    #[test_case(&["", "com"], HostnameError::EmptyLabel ; "empty label")]
    #[test_case(&["a.b", "com"], HostnameError::InvalidCharacter("a.b".into()) ; "dot inside label")]
    #[test_case(&["a_b", "com"], HostnameError::InvalidCharacter("a_b".into()) ; "underscore")]
    #[test_case(&["../x", "com"], HostnameError::InvalidCharacter("../x".into()) ; "path traversal")]
    #[test_case(&["caf\u{e9}", "com"], HostnameError::InvalidCharacter("caf\u{e9}".into()) ; "non ascii")]
    fn test_invalid_hostnames(labels: &[&str], expected: HostnameError) {
        assert_eq!(Hostname::new(labels.iter().copied()), Err(expected));
    }

    #[test]
    fn test_projections() {
        let host = Hostname::new(["abc", "example", "com"]).unwrap();
        assert_eq!(host.dotted(), "abc.example.com");
        assert_eq!(host.dir_name(), "abc_example_com");
        assert_eq!(host.zone_name(), "example.com");
        assert_eq!(host.url(), "https://abc.example.com");
        assert_eq!(format!("{}", host), "abc.example.com");
    }

    #[test]
    fn test_apex_zone_is_whole_hostname() {
        let host = Hostname::new(["example", "com"]).unwrap();
        assert_eq!(host.zone_name(), "example.com");
        assert_eq!(host.dotted(), host.zone_name());
    }

    #[test]
    fn test_serde_rejects_invalid_labels() {
        let ok: Hostname = serde_json::from_str(r#"["abc","example","com"]"#).unwrap();
        assert_eq!(ok.labels().len(), 3);

        assert!(serde_json::from_str::<Hostname>(r#"["com"]"#).is_err());
        assert!(serde_json::from_str::<Hostname>(r#"["a b","com"]"#).is_err());
    }

    proptest! {
        #[test]
        fn prop_projections_never_mix(labels in prop::collection::vec("[A-Za-z0-9-]{1,12}", 2..=3)) {
            let host = Hostname::new(labels.clone()).unwrap();
            prop_assert!(!host.dir_name().contains('.'));
            prop_assert!(!host.dotted().contains('_'));
            prop_assert_eq!(host.dotted().split('.').count(), labels.len());
            prop_assert!(host.dotted().ends_with(&host.zone_name()));
        }

        #[test]
        fn prop_wrong_label_count_rejected(labels in prop::collection::vec("[a-z]{1,8}", 4..8)) {
            prop_assert!(Hostname::new(labels).is_err());
        }
    }
}
