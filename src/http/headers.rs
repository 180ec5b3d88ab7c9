//! HTTP header map with case-insensitive name lookup.

/// An order-preserving, case-insensitive HTTP header map.
///
/// Multiple values per name are allowed on [`append`](Self::append); [`set`](Self::set)
/// replaces every existing value for the name.
///
/// # Examples
///
/// ```
/// use pulse::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.append("Content-Type", "text/plain");
/// headers.set("content-type", "application/json");
///
/// assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
/// assert_eq!(headers.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Appends a header entry, keeping any existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Replaces all values for `name` with a single `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.inner.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.inner.push((name, value.into()));
    }

    /// Returns the first value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the total number of entries (not unique names).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut h = Headers::new();
        h.append("Connection", "close");
        assert_eq!(h.get("connection"), Some("close"));
        assert!(h.contains("CONNECTION"));
        assert!(!h.contains("x-missing"));
    }

    #[test]
    fn append_keeps_both_values() {
        let mut h = Headers::new();
        h.append("Vary", "Origin");
        h.append("vary", "Accept");
        assert_eq!(h.len(), 2);
        assert_eq!(h.get("vary"), Some("Origin"));
    }

    #[test]
    fn set_replaces_every_value() {
        let mut h = Headers::new();
        h.append("Vary", "Origin");
        h.append("vary", "Accept");
        h.set("VARY", "*");
        assert_eq!(h.len(), 1);
        assert_eq!(h.get("vary"), Some("*"));
    }
}
