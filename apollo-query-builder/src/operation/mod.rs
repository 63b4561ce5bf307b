//! The canonical selection-set model produced by the [`analyzer`](crate::analyzer).
//!
//! Later stages only rewrite this tree: the fragment extractor turns [`ReusableFragment`]s
//! into spreads, the variable lifter turns [`ArgumentValue::Parameter`]s into variables.

mod literal;

use std::fmt;

pub use literal::Literal;
use serde::Deserialize;
use serde::Serialize;

use crate::schema::FieldType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Query => write!(f, "query"),
            OperationType::Mutation => write!(f, "mutation"),
        }
    }
}

/// The root of one operation.
#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct SelectionSet {
    pub operation_type: OperationType,
    pub operation_name: Option<String>,
    pub root_type: String,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub enum Selection {
    Field(Field),
    /// A reference to a [`FragmentDefinition`] of the document.
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
    /// A caller-marked fragment, not yet extracted.
    ReusableFragment(ReusableFragment),
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub alias: Option<String>,
    /// The type the field was resolved on.
    pub parent_type: String,
    pub field_type: FieldType,
    /// One entry per declared argument, in declaration order.
    pub arguments: Vec<FieldArgument>,
    /// Empty for leaves.
    pub selections: Vec<Selection>,
    /// Added by the analyzer rather than requested: sent, but left out of materialized results.
    pub injected: bool,
}

impl Field {
    /// The key this field's value has in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn coordinate(&self) -> String {
        format!("{}.{}", self.parent_type, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct FieldArgument {
    pub name: String,
    /// The declared type of the argument.
    pub ty: FieldType,
    pub value: ArgumentValue,
    pub declared_default: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub enum ArgumentValue {
    /// A constant, rendered inline.
    Literal(Literal),
    /// Bound to an operation parameter, waiting to be lifted.
    Parameter(String),
    /// Lifted to the document variable of that name.
    Variable(String),
    /// Omitted by the caller: the server applies the declared default. Not rendered.
    Default,
    Unbound,
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct FragmentSpread {
    pub fragment_name: String,
    pub type_condition: String,
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct InlineFragment {
    pub type_condition: String,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct ReusableFragment {
    /// The caller-supplied name. A name is derived from the content otherwise.
    pub name: Option<String>,
    pub type_condition: String,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub selections: Vec<Selection>,
}

/// A variable of a compiled document and the operation parameter supplying its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub ty: FieldType,
    pub parameter: String,
}

/// GraphQL names match `/[_A-Za-z][_0-9A-Za-z]*/`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
