//! Submitted form fields.

/// Field names understood by the validator and generator.
pub mod names {
    pub const PLUGIN_NAME: &str = "plugin_name";
    pub const PLUGIN_SLUG: &str = "plugin_slug";
    pub const TEXT_DOMAIN: &str = "text_domain";
    pub const PLUGIN_NAMESPACE: &str = "plugin_namespace";
    pub const VENDOR_NAMESPACE: &str = "vendor_namespace";
    pub const PLUGIN_DESCRIPTION: &str = "plugin_description";
    pub const AUTHOR_NAME: &str = "author_name";
    pub const AUTHOR_URI: &str = "author_uri";
    pub const PLUGIN_URI: &str = "plugin_uri";
    pub const VERSION: &str = "version";
    pub const REQUIRES_PHP: &str = "requires_php";
}

pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_REQUIRES_PHP: &str = "8.1";
pub const DEFAULT_DESCRIPTION: &str = "Plugin description";

/// Ordered field name -> value map.
///
/// Keeps submission order; setting an existing key replaces its value in
/// place, so the last submitted duplicate wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: Vec<(String, String)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `key`, or the empty string.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// True when `key` is absent or holds only whitespace.
    pub fn is_blank(&self, key: &str) -> bool {
        self.value(key).trim().is_empty()
    }

    /// Insert or replace a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`FieldSet::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FieldSet::new();
        for (k, v) in iter {
            fields.set(k, v);
        }
        fields
    }
}
