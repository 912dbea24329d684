/// Ordered query-string parameters with `URLSearchParams`-like semantics.
///
/// `set` replaces the first occurrence in place (dropping later duplicates) or appends, so
/// unrelated keys keep their position when the viewer rewrites the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse `location.search`, with or without the leading `?`.
    pub fn parse(search: &str) -> Self {
        let query = search.strip_prefix('?').unwrap_or(search);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let mut found = false;
        self.pairs.retain_mut(|(k, v)| {
            if k != key {
                return true;
            }
            if found {
                return false;
            }
            found = true;
            *v = value.clone();
            true
        });
        if !found {
            self.pairs.push((key.to_string(), value));
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialized form without the leading `?`.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }

    /// Serialized form suitable for `history.replaceState`.
    pub fn to_search(&self) -> String {
        format!("?{}", self.to_query_string())
    }
}

#[cfg(test)]
mod tests {
    use super::QueryParams;

    #[test]
    fn parses_with_or_without_question_mark() {
        let a = QueryParams::parse("?x=1&path=a%2Fb");
        let b = QueryParams::parse("x=1&path=a%2Fb");
        assert_eq!(a, b);
        assert_eq!(a.get("path"), Some("a/b"));
        assert_eq!(a.get("missing"), None);
    }

    #[test]
    fn set_replaces_in_place_and_drops_duplicates() {
        let mut q = QueryParams::parse("?a=1&x=2&b=3&x=4");
        q.set("x", "9");
        assert_eq!(q.to_query_string(), "a=1&x=9&b=3");
        q.set("z", "0.5");
        assert_eq!(q.to_search(), "?a=1&x=9&b=3&z=0.5");
    }

    #[test]
    fn remove_drops_every_occurrence() {
        let mut q = QueryParams::parse("x=1&y=2&x=3");
        q.remove("x");
        assert_eq!(q.to_query_string(), "y=2");
    }

    #[test]
    fn empty_search_is_empty() {
        assert!(QueryParams::parse("").is_empty());
        assert!(QueryParams::parse("?").is_empty());
    }
}
