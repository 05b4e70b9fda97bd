use serde::ser::{Serialize, SerializeMap, Serializer};

/// One row as an ordered header → value mapping.
///
/// Order is the column order of the file the row came from. Header names are
/// unique once a row leaves the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `headers` with `values` by position. Missing values become `""`,
    /// surplus values are ignored.
    pub fn from_positional(headers: &[String], values: &[String]) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), values.get(i).cloned().unwrap_or_default()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    /// Set `name`, replacing an existing value in place or appending.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values laid out in `columns` order; absent columns yield `""`.
    pub fn project<'a>(&'a self, columns: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        columns.iter().map(move |c| self.get(c).unwrap_or(""))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_pairs_pad_and_truncate() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let short = Record::from_positional(&headers, &["1".to_string()]);
        assert_eq!(short.get("b"), Some(""));
        let long = Record::from_positional(
            &headers,
            &["1".to_string(), "2".to_string(), "3".to_string()],
        );
        assert_eq!(long.len(), 2);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut r: Record = [("a", "1"), ("b", "2")].into_iter().collect();
        r.insert("a", "9");
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![("a", "9"), ("b", "2")]);
    }

    #[test]
    fn projects_onto_foreign_column_order() {
        let r: Record = [("a", "1"), ("b", "2")].into_iter().collect();
        let cols = vec!["b".to_string(), "z".to_string(), "a".to_string()];
        assert_eq!(r.project(&cols).collect::<Vec<_>>(), vec!["2", "", "1"]);
    }

    #[test]
    fn serializes_as_ordered_map() {
        let r: Record = [("z", "1"), ("a", "2")].into_iter().collect();
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"z":"1","a":"2"}"#);
    }
}
