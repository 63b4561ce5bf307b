//! Types related to GraphQL requests and responses exchanged with a [`Transport`](crate::Transport).

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;

/// A GraphQL request: document text, operation name and variable values.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Request {
    /// The GraphQL document.
    pub query: String,

    /// The operation name, when the operation has one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub operation_name: Option<String>,

    /// Variable values, keyed by document variable name.
    #[serde(
        skip_serializing_if = "Object::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub variables: Object,
}

impl Request {
    pub fn new(query: impl Into<String>, operation_name: Option<String>, variables: Object) -> Self {
        Self {
            query: query.into(),
            operation_name,
            variables,
        }
    }
}

fn deserialize_null_default<'de, D, T: Default + Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    <Option<T>>::deserialize(deserializer).map(|x| x.unwrap_or_default())
}

/// A GraphQL response.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    /// The optional graphql errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The optional graphql extensions.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

impl Response {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn from_errors(errors: Vec<Error>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }

    /// Whether the server returned no data at all, `null` included.
    pub fn has_no_data(&self) -> bool {
        matches!(self.data, None | Some(Value::Null))
    }
}

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL [`Response`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The locations of the error in the GraphQL document of the originating request.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Location>,

    /// If this is a field error, the JSON path to that field in [`Response::data`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    /// The optional GraphQL extensions for this error.
    #[serde(default, skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<Path>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A line and column in a GraphQL document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}
