//! Performance oriented JSON manipulation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
pub use serde_json_bytes::ByteString;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = serde_json_bytes::Map<ByteString, Value>;

/// A path element in a JSON response.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

/// A path into the result document.
///
/// This can be composed of strings and numbers.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Default::default())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }
}

impl<T> From<T> for Path
where
    T: AsRef<str>,
{
    fn from(s: T) -> Self {
        Self(
            s.as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.parse::<usize>() {
                    Ok(index) => PathElement::Index(index),
                    Err(_) => PathElement::Key(s.to_string()),
                })
                .collect(),
        )
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/")?;
            match element {
                PathElement::Index(index) => write!(f, "{index}")?,
                PathElement::Key(key) => write!(f, "{key}")?,
            }
        }
        Ok(())
    }
}

/// Describes the JSON type of a value, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_round_trips_through_display() {
        let path = Path::from("/hero/friends/0/name");
        assert_eq!(
            path.0,
            vec![
                PathElement::Key("hero".to_string()),
                PathElement::Key("friends".to_string()),
                PathElement::Index(0),
                PathElement::Key("name".to_string()),
            ]
        );
        assert_eq!(path.to_string(), "/hero/friends/0/name");
    }

    #[test]
    fn empty_path_displays_as_nothing() {
        assert_eq!(Path::empty().to_string(), "");
    }
}
