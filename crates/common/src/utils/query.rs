//! Ordered query parameters and query-string helpers

use std::collections::BTreeMap;
use std::fmt::Display;

use url::form_urlencoded;
use url::Url;

/// Ordered list of query parameters whose values may be absent.
///
/// Absent values are kept so that a caller can build params from optional
/// fields without branching; they are skipped when the params are rendered.
///
/// ```rust
/// use castkit_common::utils::QueryParams;
///
/// let params = QueryParams::new()
///     .with("a", 1)
///     .with_opt("b", None::<u32>)
///     .with("c", "x");
///
/// assert_eq!(castkit_common::utils::to_query_string(&params), "a=1&c=x");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Option<String>)>,
}

impl QueryParams {
    /// Empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a present value, stringified with `Display`.
    #[must_use]
    pub fn with<K: Into<String>, V: Display>(mut self, key: K, value: V) -> Self {
        self.push(key, Some(value));
        self
    }

    /// Append a value that may be absent.
    #[must_use]
    pub fn with_opt<K: Into<String>, V: Display>(mut self, key: K, value: Option<V>) -> Self {
        self.push(key, value);
        self
    }

    /// Append in place.
    pub fn push<K: Into<String>, V: Display>(&mut self, key: K, value: Option<V>) {
        self.entries.push((key.into(), value.map(|v| v.to_string())));
    }

    /// Present entries, in insertion order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
    }

    /// True when no entry has a value.
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Append the present entries to `url`'s query.
    ///
    /// Leaves the URL untouched when there is nothing to add, so no dangling
    /// `?` is produced.
    pub fn append_to(&self, url: &mut Url) {
        if self.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        for (key, value) in self.present() {
            pairs.append_pair(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for QueryParams
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.push(key, value);
        }
        params
    }
}

/// Render present params as a form-urlencoded query string (no leading `?`).
pub fn to_query_string(params: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.present() {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Parse a query string into a map. A leading `?` is ignored and the last
/// occurrence of a repeated key wins.
pub fn parse_query_string(query: &str) -> BTreeMap<String, String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}
