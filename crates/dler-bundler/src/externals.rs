//! Externals inference and matching.
//!
//! The externals set decides which specifiers the bundle backend leaves as
//! runtime imports. Entries are exact strings or anchored regexes, kept in
//! separate deduplicated collections so a string and a regex with the same
//! text never collapse into one.

use dler_config::{ExternalPattern, PackageManifest};
use indexmap::IndexSet;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde_json::Value;

/// Deduplicated externals.
#[derive(Debug, Clone, Default)]
pub struct ExternalsSet {
    exact: IndexSet<String>,
    patterns: Vec<Regex>,
    pattern_sources: FxHashSet<String>,
}

impl ExternalsSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; returns `false` when it was already present.
    pub fn insert(&mut self, external: ExternalPattern) -> bool {
        match external {
            ExternalPattern::Exact(value) => self.exact.insert(value),
            ExternalPattern::Pattern(regex) => {
                if self.pattern_sources.insert(regex.as_str().to_string()) {
                    self.patterns.push(regex);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Exact equality or a regex test. Never substring containment.
    pub fn matches(&self, specifier: &str) -> bool {
        self.exact.contains(specifier) || self.patterns.iter().any(|re| re.is_match(specifier))
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact entries in insertion order, then regexes in insertion order.
    pub fn to_patterns(&self) -> Vec<ExternalPattern> {
        self.exact
            .iter()
            .cloned()
            .map(ExternalPattern::Exact)
            .chain(self.patterns.iter().cloned().map(ExternalPattern::Pattern))
            .collect()
    }

    /// Sorted exact strings and regex sources, for order-independent
    /// comparisons.
    pub fn fingerprint(&self) -> (Vec<String>, Vec<String>) {
        let mut exact: Vec<_> = self.exact.iter().cloned().collect();
        let mut patterns: Vec<_> = self.pattern_sources.iter().cloned().collect();
        exact.sort();
        patterns.sort();
        (exact, patterns)
    }
}

impl FromIterator<ExternalPattern> for ExternalsSet {
    fn from_iter<I: IntoIterator<Item = ExternalPattern>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<ExternalPattern> for ExternalsSet {
    fn extend<I: IntoIterator<Item = ExternalPattern>>(&mut self, iter: I) {
        for external in iter {
            self.insert(external);
        }
    }
}

/// Turns a subpath with `*` wildcards into an anchored regex.
///
/// Every regex metacharacter in the literal parts is escaped and each `*`
/// becomes `.*`. Paths without a wildcard stay exact.
pub fn path_to_regex(path: &str) -> ExternalPattern {
    if !path.contains('*') {
        return ExternalPattern::exact(path);
    }

    let body = path
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    let source = format!("^{body}$");

    match Regex::new(&source) {
        Ok(regex) => ExternalPattern::Pattern(regex),
        Err(_) => ExternalPattern::exact(path),
    }
}

/// Externals implied by the manifest, in this order: dependencies, peer
/// dependencies, `@types/*` dev dependencies, optional dependencies, the
/// package's own name, its subpath exports and its `#` subpath imports.
pub fn infer_pkg_externals(pkg: &PackageManifest) -> Vec<ExternalPattern> {
    let mut externals: Vec<ExternalPattern> = pkg
        .dependencies
        .keys()
        .chain(pkg.peer_dependencies.keys())
        .chain(
            pkg.dev_dependencies
                .keys()
                .filter(|name| name.starts_with("@types/")),
        )
        .chain(pkg.optional_dependencies.keys())
        .cloned()
        .map(ExternalPattern::Exact)
        .collect();

    if let Some(name) = pkg.name.as_deref().filter(|name| !name.is_empty()) {
        externals.push(ExternalPattern::exact(name));

        if let Some(Value::Object(exports)) = &pkg.exports {
            externals.extend(
                exports
                    .keys()
                    .filter_map(|subpath| subpath.strip_prefix("./"))
                    .map(|subpath| path_to_regex(&format!("{name}/{subpath}"))),
            );
        }
    }

    if let Some(imports) = &pkg.imports {
        externals.extend(
            imports
                .keys()
                .filter(|key| key.starts_with('#'))
                .map(|key| path_to_regex(key)),
        );
    }

    externals
}

/// Configured externals plus everything the manifest implies.
pub fn compute_externals(configured: &[ExternalPattern], pkg: &PackageManifest) -> ExternalsSet {
    configured
        .iter()
        .cloned()
        .chain(infer_pkg_externals(pkg))
        .collect()
}
