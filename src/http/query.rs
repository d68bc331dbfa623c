//! Query-string and form values.
//!
//! HTML forms may submit the same field several times, so a name binds to
//! one or more values. Values stay strings until the application asks for a
//! typed view through [`QueryValue::parse`].

use std::str::FromStr;

use serde::Serialize;
use url::form_urlencoded;

/// A field name bound to one or more values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryValue {
    name: String,
    values: Vec<String>,
}

impl QueryValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First submitted value.
    pub fn value(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or_default()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn push(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// Coerce the first value into `T`.
    pub fn parse<T: FromStr>(&self) -> Result<T, T::Err> {
        self.value().parse()
    }

    /// Coerce every value into `T`, failing on the first bad one.
    pub fn parse_all<T: FromStr>(&self) -> Result<Vec<T>, T::Err> {
        self.values.iter().map(|v| v.parse()).collect()
    }
}

/// Ordered collection of [`QueryValue`]s keyed by exact name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryValueCollection {
    items: Vec<QueryValue>,
}

impl QueryValueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` string.
    ///
    /// Both sides of `key=val` are decoded; a bare `key` binds `"true"`.
    /// Repeated keys accumulate.
    pub fn parse(input: &str) -> Self {
        let mut collection = Self::new();
        for pair in input.split('&').filter(|p| !p.is_empty()) {
            let Some((key, value)) = form_urlencoded::parse(pair.as_bytes()).next() else {
                continue;
            };
            if pair.contains('=') {
                collection.insert(key, value);
            } else {
                collection.insert(key, "true");
            }
        }
        collection
    }

    /// Bind `value` to `name`, appending if the name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.items.iter_mut().find(|item| item.name == name) {
            Some(item) => item.push(value),
            None => self.items.push(QueryValue::new(name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.items.iter().find(|item| item.name == name)
    }

    /// First value bound to `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(QueryValue::value)
    }

    /// Typed view of the first value bound to `name`.
    pub fn parse_value<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(QueryValue::parse)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryValue> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_accumulate() {
        let query = QueryValueCollection::parse("a=1&b=2&b=3");
        assert_eq!(query.get("a").unwrap().values(), ["1"]);
        assert_eq!(query.get("b").unwrap().values(), ["2", "3"]);
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn bare_key_binds_true() {
        let query = QueryValueCollection::parse("debug&x=");
        assert_eq!(query.value("debug"), Some("true"));
        assert_eq!(query.value("x"), Some(""));
        assert_eq!(query.parse_value::<bool>("debug"), Some(Ok(true)));
    }

    #[test]
    fn both_sides_are_decoded() {
        let query = QueryValueCollection::parse("first%20name=J%C3%BCrgen+K&q=a%26b");
        assert_eq!(query.value("first name"), Some("Jürgen K"));
        assert_eq!(query.value("q"), Some("a&b"));
    }

    #[test]
    fn typed_coercion() {
        let query = QueryValueCollection::parse("id=42&ids=1&ids=2&ids=x");
        assert_eq!(query.parse_value::<u32>("id"), Some(Ok(42)));
        assert!(query.get("ids").unwrap().parse_all::<u32>().is_err());
        assert_eq!(query.parse_value::<u32>("missing"), None);
    }

    #[test]
    fn empty_pairs_are_skipped() {
        let query = QueryValueCollection::parse("&&a=1&");
        assert_eq!(query.len(), 1);
    }
}
