//! Declared external locations.

/// The set of declared/recommended external locations, as path prefixes.
///
/// Consumed from the external-location service. The classifier uses
/// [`covers`](ExternalLocations::covers) to decide whether an external
/// table's storage can be linked in place under the target catalog.
#[derive(Debug, Clone, Default)]
pub struct ExternalLocations {
    prefixes: Vec<String>,
}

impl ExternalLocations {
    /// Build a location set from path prefixes.
    ///
    /// Prefixes are normalized by stripping trailing slashes; empty entries
    /// are ignored.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|p| normalize(&p.into()))
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    /// An empty location set: nothing is covered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `path` sits at or under one of the declared prefixes.
    ///
    /// Matching is segment-aware: `/mnt/sales` covers `/mnt/sales/orders`
    /// but not `/mnt/sales_archive`.
    pub fn covers(&self, path: &str) -> bool {
        let path = normalize(path);
        if path.is_empty() {
            return false;
        }
        self.prefixes.iter().any(|prefix| {
            path == *prefix
                || (path.len() > prefix.len()
                    && path.starts_with(prefix.as_str())
                    && path.as_bytes()[prefix.len()] == b'/')
        })
    }

    /// The normalized prefixes, for persistence and display.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Number of declared prefixes.
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether no prefixes are declared.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

fn normalize(path: &str) -> String {
    path.trim().trim_end_matches('/').to_string()
}
