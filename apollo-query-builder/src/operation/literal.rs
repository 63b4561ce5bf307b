use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Object;
use crate::json_ext::Value;

/// A constant GraphQL input value, as written inline in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<Literal>),
    Object(IndexMap<String, Literal>),
}

impl Literal {
    pub fn enum_value(name: impl Into<String>) -> Self {
        Literal::Enum(name.into())
    }

    /// The JSON form of this value, as a server would echo it in variables.
    pub fn to_json(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Int(int) => Value::from(*int),
            Literal::Float(float) => Value::from(*float),
            Literal::String(string) | Literal::Enum(string) => Value::from(string.as_str()),
            Literal::Boolean(boolean) => Value::Bool(*boolean),
            Literal::List(items) => Value::Array(items.iter().map(Literal::to_json).collect()),
            Literal::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.as_str().into(), value.to_json()))
                    .collect::<Object>(),
            ),
        }
    }
}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Null => {}
            Literal::Int(int) => int.hash(state),
            Literal::Float(float) => float.to_bits().hash(state),
            Literal::String(string) | Literal::Enum(string) => string.hash(state),
            Literal::Boolean(boolean) => boolean.hash(state),
            Literal::List(items) => items.hash(state),
            Literal::Object(fields) => {
                fields.len().hash(state);
                for (name, value) in fields {
                    name.hash(state);
                    value.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Int(int) => write!(f, "{int}"),
            Literal::Float(float) => write!(f, "{float:?}"),
            // GraphQL string escapes are a subset of JSON's
            Literal::String(string) => {
                write!(f, "{}", serde_json::Value::from(string.as_str()))
            }
            Literal::Boolean(boolean) => write!(f, "{boolean}"),
            Literal::Enum(name) => write!(f, "{name}"),
            Literal::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Literal::Object(fields) => {
                write!(f, "{{")?;
                for (index, (name, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(value: Vec<T>) -> Self {
        Literal::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Literal::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn renders_graphql_syntax() {
        assert_eq!(Literal::enum_value("JEDI").to_string(), "JEDI");
        assert_eq!(Literal::from("say \"hi\"\n").to_string(), r#""say \"hi\"\n""#);
        assert_eq!(Literal::from(1.0).to_string(), "1.0");
        assert_eq!(Literal::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Literal::from(None::<bool>).to_string(), "null");

        let review = Literal::Object(IndexMap::from([
            ("stars".to_string(), Literal::from(5)),
            ("commentary".to_string(), Literal::from("great")),
        ]));
        assert_eq!(review.to_string(), r#"{stars: 5, commentary: "great"}"#);
        assert_eq!(review.to_json(), json!({"stars": 5, "commentary": "great"}));
    }
}
