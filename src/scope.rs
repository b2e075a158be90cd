use std::collections::BTreeMap;

use crate::value::Value;

/// A single layer of named values.
///
/// Renders receive an ordered list of scopes, innermost first; lookups scan
/// that list front to back.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scope {
    data: BTreeMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: AsRef<str>, V: Into<Value>>(&mut self, name: T, value: V) -> &mut Self {
        self.data.insert(name.as_ref().to_string(), value.into());
        self
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<&Value> {
        self.data.get(name.as_ref())
    }

    pub fn contains<T: AsRef<str>>(&self, name: T) -> bool {
        self.data.contains_key(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }
}

impl From<BTreeMap<String, Value>> for Scope {
    fn from(data: BTreeMap<String, Value>) -> Self {
        Self { data }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Look `name` up in `scopes`, innermost first.
pub fn lookup<'a>(scopes: &[&'a Scope], name: &str) -> Option<&'a Value> {
    scopes.iter().find_map(|scope| scope.get(name))
}

/// Read an option from the outermost scope.
pub fn option<'a>(scopes: &[&'a Scope], name: &str) -> Option<&'a Value> {
    scopes.last().and_then(|scope| scope.get(name))
}
