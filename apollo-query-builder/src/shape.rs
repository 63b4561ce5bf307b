//! Builders describing what an operation selects.
//!
//! A shape is the static half of a call: fields, aliases, arguments and fragment markers,
//! with operation parameters standing in for the runtime values.
//!
//! ```ignore
//! let friends = fragment("Character", selection().field(field("id")).field(field("name")));
//! let shape = OperationShape::query()
//!     .name("HeroAndFriends")
//!     .parameter("id")
//!     .select(
//!         selection()
//!             .field(field("hero").fragment(friends.clone()))
//!             .field(field("human").argument("id", parameter("id")).fragment(friends)),
//!     );
//! ```

use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::operation::Literal;
use crate::operation::OperationType;

/// A whole operation: kind, optional name, declared parameters and the root selection.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct OperationShape {
    pub(crate) kind: OperationType,
    pub(crate) name: Option<String>,
    pub(crate) parameters: Vec<String>,
    pub(crate) selection: SelectionShape,
}

#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct SelectionShape {
    pub(crate) members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub(crate) enum Member {
    Field(FieldShape),
    Spread(Arc<FragmentShape>),
    On {
        type_condition: String,
        selection: SelectionShape,
    },
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub struct FieldShape {
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
    pub(crate) positional: Vec<ArgumentInput>,
    pub(crate) named: Vec<(String, ArgumentInput)>,
    pub(crate) selection: Option<SubSelection>,
}

#[derive(Debug, Clone, PartialEq, Hash)]
pub(crate) enum SubSelection {
    Inline(SelectionShape),
    Fragment(Arc<FragmentShape>),
}

/// A sub-selection explicitly marked as reusable.
///
/// Identical markers used from two or more places are extracted into one named fragment.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct FragmentShape {
    pub(crate) name: Option<String>,
    pub(crate) on_type: String,
    pub(crate) selection: SelectionShape,
}

/// The value supplied for a field argument.
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum ArgumentInput {
    /// A constant, embedded in the document.
    Literal(Literal),
    /// An operation parameter, lifted to a document variable.
    Parameter(String),
}

impl From<Literal> for ArgumentInput {
    fn from(value: Literal) -> Self {
        ArgumentInput::Literal(value)
    }
}

macro_rules! literal_argument_input {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ArgumentInput {
                fn from(value: $ty) -> Self {
                    ArgumentInput::Literal(value.into())
                }
            }
        )*
    };
}

literal_argument_input!(i32, i64, f64, bool, &str, String);

pub fn selection() -> SelectionShape {
    SelectionShape::default()
}

pub fn field(name: impl Into<String>) -> FieldShape {
    FieldShape {
        name: name.into(),
        alias: None,
        positional: Vec::new(),
        named: Vec::new(),
        selection: None,
    }
}

/// References an operation parameter from an argument.
pub fn parameter(name: impl Into<String>) -> ArgumentInput {
    ArgumentInput::Parameter(name.into())
}

/// An anonymous reusable fragment on `on_type`.
pub fn fragment(on_type: impl Into<String>, selection: SelectionShape) -> Arc<FragmentShape> {
    Arc::new(FragmentShape {
        name: None,
        on_type: on_type.into(),
        selection,
    })
}

/// A reusable fragment with a caller-chosen name. It is always extracted.
pub fn named_fragment(
    name: impl Into<String>,
    on_type: impl Into<String>,
    selection: SelectionShape,
) -> Arc<FragmentShape> {
    Arc::new(FragmentShape {
        name: Some(name.into()),
        on_type: on_type.into(),
        selection,
    })
}

impl SelectionShape {
    pub fn field(mut self, field: FieldShape) -> Self {
        self.members.push(Member::Field(field));
        self
    }

    /// Spreads a reusable fragment next to the other members.
    pub fn spread(mut self, fragment: Arc<FragmentShape>) -> Self {
        self.members.push(Member::Spread(fragment));
        self
    }

    /// Members that only apply when the value is of `type_condition`.
    pub fn on(mut self, type_condition: impl Into<String>, selection: SelectionShape) -> Self {
        self.members.push(Member::On {
            type_condition: type_condition.into(),
            selection,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FieldShape {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Binds the next declared argument, in schema declaration order.
    pub fn positional(mut self, value: impl Into<ArgumentInput>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Binds an argument by name.
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<ArgumentInput>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }

    pub fn select(mut self, selection: SelectionShape) -> Self {
        self.selection = Some(SubSelection::Inline(selection));
        self
    }

    /// Uses a reusable fragment as this field's whole sub-selection.
    pub fn fragment(mut self, fragment: Arc<FragmentShape>) -> Self {
        self.selection = Some(SubSelection::Fragment(fragment));
        self
    }
}

impl OperationShape {
    pub fn query() -> Self {
        Self::new(OperationType::Query)
    }

    pub fn mutation() -> Self {
        Self::new(OperationType::Mutation)
    }

    fn new(kind: OperationType) -> Self {
        Self {
            kind,
            name: None,
            parameters: Vec::new(),
            selection: SelectionShape::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declares a parameter whose runtime value is supplied at execution.
    pub fn parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    pub fn select(mut self, selection: SelectionShape) -> Self {
        self.selection = selection;
        self
    }

    pub fn kind(&self) -> OperationType {
        self.kind
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Identifies the static structure of this shape.
    ///
    /// Two shapes built the same way share a key no matter where they were built. Runtime
    /// parameter values are not part of a shape, so they never change it.
    pub fn shape_key(&self) -> ShapeKey {
        let mut hasher = StructHasher::new();
        "^shape".hash(&mut hasher);
        self.hash(&mut hasher);
        ShapeKey(hasher.finalize())
    }
}

/// Digest of an [`OperationShape`], used as the compilation cache key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeKey(#[serde(with = "hex")] Vec<u8>);

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeKey({self})")
    }
}

/// A [`Hasher`] feeding a SHA-256 digest, for stable keys derived from `Hash` impls.
pub(crate) struct StructHasher {
    hasher: Sha256,
}

impl StructHasher {
    pub(crate) fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    pub(crate) fn finalize(self) -> Vec<u8> {
        self.hasher.finalize().as_slice().into()
    }
}

impl Hasher for StructHasher {
    fn finish(&self) -> u64 {
        let digest = self.hasher.clone().finalize();
        let mut bytes = [0; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update([0xFF]);
        self.hasher.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero(episode: &str) -> OperationShape {
        OperationShape::query().select(
            selection().field(
                field("hero")
                    .argument("episode", Literal::enum_value(episode))
                    .select(selection().field(field("name"))),
            ),
        )
    }

    #[test]
    fn same_structure_same_key() {
        assert_eq!(hero("JEDI").shape_key(), hero("JEDI").shape_key());
        assert_ne!(hero("JEDI").shape_key(), hero("EMPIRE").shape_key());
    }

    #[test]
    fn aliases_and_names_change_the_key() {
        let plain = OperationShape::query().select(selection().field(field("hero")));
        let aliased = OperationShape::query().select(selection().field(field("hero").alias("h")));
        let named = plain.clone().name("Hero");
        assert_ne!(plain.shape_key(), aliased.shape_key());
        assert_ne!(plain.shape_key(), named.shape_key());
    }

    #[test]
    fn fragment_markers_change_the_key() {
        let members = || selection().field(field("id"));
        let inline = OperationShape::query().select(selection().field(field("hero").select(members())));
        let marked = OperationShape::query()
            .select(selection().field(field("hero").fragment(fragment("Character", members()))));
        assert_ne!(inline.shape_key(), marked.shape_key());
    }

    #[test]
    fn key_displays_as_hex() {
        let key = hero("JEDI").shape_key();
        assert_eq!(key.to_string().len(), 64);
        assert!(key.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
