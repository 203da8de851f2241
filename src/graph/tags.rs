//! Parameter tags and tag-based filtering

use super::expr::Param;
use std::collections::BTreeSet;

/// Set of string labels attached to one parameter
pub type TagSet = BTreeSet<String>;

/// Tag carried by every parameter an optimizer may update
pub const TRAINABLE: &str = "trainable";

/// Tag carried by parameters subject to weight decay
pub const REGULARIZABLE: &str = "regularizable";

/// A parameter together with the tags its owning layer assigned
#[derive(Debug, Clone)]
pub struct TaggedParam {
    pub param: Param,
    pub tags: TagSet,
}

impl TaggedParam {
    pub fn new<I, S>(param: Param, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            param,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Predicate over tag sets
///
/// `require("t")` keeps parameters tagged `t`, `exclude("t")` keeps those
/// that are not. An empty filter matches everything.
///
/// # Example
///
/// ```
/// use concarne::graph::TagFilter;
///
/// let filter = TagFilter::new().require("trainable").exclude("phi");
/// assert!(!filter.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    required: BTreeSet<String>,
    excluded: BTreeSet<String>,
}

impl TagFilter {
    /// Filter that matches every parameter
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, tag: impl Into<String>) -> Self {
        self.required.insert(tag.into());
        self
    }

    pub fn exclude(mut self, tag: impl Into<String>) -> Self {
        self.excluded.insert(tag.into());
        self
    }

    /// `with("t", true)` is `require("t")`, `with("t", false)` is `exclude("t")`
    pub fn with(self, tag: impl Into<String>, present: bool) -> Self {
        if present {
            self.require(tag)
        } else {
            self.exclude(tag)
        }
    }

    pub fn matches(&self, tags: &TagSet) -> bool {
        self.required.iter().all(|t| tags.contains(t))
            && self.excluded.iter().all(|t| !tags.contains(t))
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }
}
