//! Pool configuration: which kinds exist, what they are cloned from and how
//! their pools behave.
use crate::error::{CatalogError, CatalogIssue};
use core::{fmt::Debug, hash::Hash};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

/// Identifier of a class of poolable objects, usually a fieldless enum.
pub trait PoolKey: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T: Copy + Eq + Hash + Debug + Send + Sync + 'static> PoolKey for T {}

fn default_true() -> bool {
    true
}

/// Configuration of a single pooled kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry<K, T> {
    /// The kind this entry configures.
    #[serde(rename = "type")]
    pub kind: K,
    /// The prototype instances are cloned from. An entry without one cannot
    /// be pooled.
    pub template: Option<T>,
    /// Minimum number of instances created up front.
    #[serde(default)]
    pub min_count: usize,
    /// Whether the pool may create instances past the pre-warmed set.
    #[serde(default = "default_true")]
    pub allow_grow: bool,
    /// Whether instances carry the auto-destroy marker.
    #[serde(default = "default_true")]
    pub auto_destroy: bool,
}

impl<K, T> SourceEntry<K, T> {
    /// Creates an entry with no minimum count, growth allowed and the
    /// auto-destroy marker on.
    pub fn new(kind: K, template: T) -> Self {
        SourceEntry {
            kind,
            template: Some(template),
            min_count: 0,
            allow_grow: true,
            auto_destroy: true,
        }
    }

    /// Sets the minimum pre-warmed count.
    pub fn min_count(mut self, min_count: usize) -> Self {
        self.min_count = min_count;
        self
    }

    /// Sets the growth policy.
    pub fn allow_grow(mut self, allow_grow: bool) -> Self {
        self.allow_grow = allow_grow;
        self
    }

    /// Sets whether instances carry the auto-destroy marker.
    pub fn auto_destroy(mut self, auto_destroy: bool) -> Self {
        self.auto_destroy = auto_destroy;
        self
    }
}

/// A named group of entries, e.g. "Characters" or "UI".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category<K, T> {
    /// Category name.
    pub name: String,
    /// Entries declared in this category.
    #[serde(default = "Vec::new")]
    pub entries: Vec<SourceEntry<K, T>>,
}

impl<K, T> Category<K, T> {
    /// Creates a category from its entries.
    pub fn new(name: impl Into<String>, entries: Vec<SourceEntry<K, T>>) -> Self {
        Category {
            name: name.into(),
            entries,
        }
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "K: DeserializeOwned, T: DeserializeOwned"))]
struct CatalogFile<K, T> {
    #[serde(default = "Vec::new")]
    categories: Vec<Category<K, T>>,
}

/// Indexed pool configuration.
///
/// Entries without a template and repeated kinds are reported when the
/// catalog is built and left out of the kind index; the first declaration of a
/// kind wins.
#[derive(Debug, Clone)]
pub struct Catalog<K, T> {
    categories: Vec<Category<K, T>>,
    by_category: HashMap<String, usize>,
    by_kind: HashMap<K, (usize, usize)>,
}

impl<K: PoolKey, T> Catalog<K, T> {
    /// Builds the category and kind indices from `categories`.
    pub fn new(categories: Vec<Category<K, T>>) -> Self {
        let mut by_category = HashMap::with_capacity(categories.len());
        let mut by_kind = HashMap::new();

        for (c, category) in categories.iter().enumerate() {
            by_category.entry(category.name.clone()).or_insert(c);

            for (e, entry) in category.entries.iter().enumerate() {
                if entry.template.is_none() {
                    tracing::error!(
                        kind = ?entry.kind,
                        category = %category.name,
                        "null template found in pool catalog"
                    );
                    continue;
                }
                if by_kind.contains_key(&entry.kind) {
                    tracing::error!(
                        kind = ?entry.kind,
                        category = %category.name,
                        "duplicate pool object type ignored"
                    );
                    continue;
                }
                by_kind.insert(entry.kind, (c, e));
            }
        }

        Catalog {
            categories,
            by_category,
            by_kind,
        }
    }

    /// Looks up the entry registered for `kind`.
    ///
    /// Returns `None` for kinds that were never declared or only declared
    /// without a template.
    pub fn source_entry(&self, kind: K) -> Option<&SourceEntry<K, T>> {
        let &(c, e) = self.by_kind.get(&kind)?;
        self.categories.get(c)?.entries.get(e)
    }

    /// Gets the entries declared under the category called `name`.
    pub fn entries_by_category(&self, name: &str) -> Option<&[SourceEntry<K, T>]> {
        let &c = self.by_category.get(name)?;
        self.categories.get(c).map(|category| category.entries.as_slice())
    }

    /// All categories, in declaration order.
    pub fn categories(&self) -> &[Category<K, T>] {
        &self.categories
    }

    /// Number of kinds that can be pooled.
    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    /// Whether no kind can be pooled.
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    /// Walks every declared entry and reports configuration problems.
    ///
    /// This is a diagnostic pass meant for authoring time. Each issue is also
    /// logged; nothing is rejected.
    pub fn validate(&self) -> Vec<CatalogIssue<K>> {
        let mut seen = HashSet::new();
        let mut issues = Vec::new();

        for category in &self.categories {
            for entry in &category.entries {
                if !seen.insert(entry.kind) {
                    issues.push(CatalogIssue::DuplicateKind {
                        kind: entry.kind,
                        category: category.name.clone(),
                    });
                }
                if entry.template.is_none() {
                    issues.push(CatalogIssue::MissingTemplate {
                        kind: entry.kind,
                        category: category.name.clone(),
                    });
                }
            }
        }

        for issue in &issues {
            tracing::error!(kind = ?issue.kind(), "{issue}");
        }
        issues
    }
}

impl<K: PoolKey + DeserializeOwned, T: DeserializeOwned> Catalog<K, T> {
    /// Parses a catalog from TOML.
    ///
    /// ```toml
    /// [[categories]]
    /// name = "UI"
    ///
    /// [[categories.entries]]
    /// type = "QuestItem"
    /// template = "prefabs/quest_item"
    /// min_count = 4
    /// allow_grow = false
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile<K, T> = toml::from_str(source)?;
        Ok(Self::new(file.categories))
    }

    /// Reads and parses a TOML catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

impl<K: PoolKey, T> Default for Catalog<K, T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<K: PoolKey, T> FromIterator<Category<K, T>> for Catalog<K, T> {
    fn from_iter<I: IntoIterator<Item = Category<K, T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
