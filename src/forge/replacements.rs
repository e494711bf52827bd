//! Ordered literal substitution table.
//!
//! Pairs are applied one after another over the whole text, so a pattern
//! that is a substring of a later pattern would rewrite part of that later
//! token before it gets a chance to match. [`ReplacementTable::check_order`]
//! enforces that no pattern occurs inside any pattern that follows it.

use std::fmt;

use crate::core::fields::{names, DEFAULT_DESCRIPTION};
use crate::core::FieldSet;

/// Placeholder tokens used by the bundled plugin template.
pub mod placeholders {
    pub const NAMESPACE_PAIR: &str = "Pluginboilerplatevendor\\Pluginboilerplate";
    pub const DESCRIPTION: &str = "Pluginboilerplate__description";
    pub const VENDOR_NAMESPACE: &str = "Pluginboilerplatevendor";
    pub const PLUGIN_NAMESPACE: &str = "Pluginboilerplate";
    pub const PACKAGE: &str = "pluginboilerplatevendor/pluginboilerplate";
    pub const VENDOR_SLUG: &str = "pluginboilerplatevendor";
    pub const SCRIPT_VARS: &str = "pluginboilerplate_vars";
    pub const PLUGIN_SLUG: &str = "pluginboilerplate";

    /// Every token, for residue checks.
    pub const ALL: [&str; 8] = [
        NAMESPACE_PAIR,
        DESCRIPTION,
        VENDOR_NAMESPACE,
        PLUGIN_NAMESPACE,
        PACKAGE,
        VENDOR_SLUG,
        SCRIPT_VARS,
        PLUGIN_SLUG,
    ];
}

/// One literal search/replace pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacement {
    pub search: String,
    pub replace: String,
}

/// Why a table was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplacementError {
    /// A search pattern is empty.
    EmptyPattern { index: usize },
    /// `earlier` occurs inside `later` and would corrupt it.
    Shadowed {
        earlier: String,
        earlier_index: usize,
        later: String,
        later_index: usize,
    },
}

impl fmt::Display for ReplacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementError::EmptyPattern { index } => {
                write!(f, "replacement #{} has an empty search pattern", index)
            }
            ReplacementError::Shadowed {
                earlier,
                earlier_index,
                later,
                later_index,
            } => write!(
                f,
                "pattern #{} '{}' is contained in later pattern #{} '{}'",
                earlier_index, earlier, later_index, later
            ),
        }
    }
}

impl std::error::Error for ReplacementError {}

/// Ordered list of replacements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplacementTable {
    pairs: Vec<Replacement>,
}

impl ReplacementTable {
    /// Build a table, rejecting empty patterns and bad ordering.
    pub fn new<S, R>(pairs: impl IntoIterator<Item = (S, R)>) -> Result<Self, ReplacementError>
    where
        S: Into<String>,
        R: Into<String>,
    {
        let table = Self {
            pairs: pairs
                .into_iter()
                .map(|(search, replace)| Replacement {
                    search: search.into(),
                    replace: replace.into(),
                })
                .collect(),
        };
        table.check_order()?;
        Ok(table)
    }

    /// Table for the bundled template, derived from sanitized fields.
    pub fn from_fields(fields: &FieldSet) -> Self {
        let slug = fields.value(names::PLUGIN_SLUG);
        let plugin_ns = fields.value(names::PLUGIN_NAMESPACE);
        let vendor_ns = fields.value(names::VENDOR_NAMESPACE);
        let vendor_slug = vendor_ns.to_lowercase();
        let slug_underscore = slug.replace('-', "_");
        let description = match fields.value(names::PLUGIN_DESCRIPTION) {
            "" => DEFAULT_DESCRIPTION,
            d => d,
        };

        // The description token starts with the plugin namespace token, so
        // it has to go first.
        let pairs = vec![
            Replacement {
                search: placeholders::NAMESPACE_PAIR.to_string(),
                replace: format!("{}\\{}", vendor_ns, plugin_ns),
            },
            Replacement {
                search: placeholders::DESCRIPTION.to_string(),
                replace: description.to_string(),
            },
            Replacement {
                search: placeholders::VENDOR_NAMESPACE.to_string(),
                replace: vendor_ns.to_string(),
            },
            Replacement {
                search: placeholders::PLUGIN_NAMESPACE.to_string(),
                replace: plugin_ns.to_string(),
            },
            Replacement {
                search: placeholders::PACKAGE.to_string(),
                replace: format!("{}/{}", vendor_slug, slug),
            },
            Replacement {
                search: placeholders::VENDOR_SLUG.to_string(),
                replace: vendor_slug.clone(),
            },
            Replacement {
                search: placeholders::SCRIPT_VARS.to_string(),
                replace: format!("{}_vars", slug_underscore),
            },
            Replacement {
                search: placeholders::PLUGIN_SLUG.to_string(),
                replace: slug.to_string(),
            },
        ];

        let table = Self { pairs };
        debug_assert!(table.check_order().is_ok());
        table
    }

    /// Verify that no pattern is contained in a later one.
    pub fn check_order(&self) -> Result<(), ReplacementError> {
        for (i, earlier) in self.pairs.iter().enumerate() {
            if earlier.search.is_empty() {
                return Err(ReplacementError::EmptyPattern { index: i });
            }
            for (j, later) in self.pairs.iter().enumerate().skip(i + 1) {
                if later.search.contains(earlier.search.as_str()) {
                    return Err(ReplacementError::Shadowed {
                        earlier: earlier.search.clone(),
                        earlier_index: i,
                        later: later.search.clone(),
                        later_index: j,
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply every pair in order as a global literal substitution.
    pub fn apply(&self, content: &str) -> String {
        self.pairs
            .iter()
            .fold(content.to_string(), |acc, pair| {
                if acc.contains(pair.search.as_str()) {
                    acc.replace(pair.search.as_str(), &pair.replace)
                } else {
                    acc
                }
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Replacement> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
