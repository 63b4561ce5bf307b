//! Query builder errors.
use std::sync::Arc;

use displaydoc::Display;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::graphql;
use crate::json_ext::Path;

/// Boxed error type used at the transport boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building a [`Schema`](crate::Schema) descriptor.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SchemaError {
    /// type '{name}' referenced by '{referenced_by}' is not defined
    UnknownType {
        /// The missing type.
        name: String,
        /// The type or field referencing it.
        referenced_by: String,
    },

    /// the query root type '{name}' is not an object type
    MissingQueryType {
        /// The configured query root name.
        name: String,
    },

    /// type '{name}' is defined more than once
    DuplicateType {
        /// The duplicated type name.
        name: String,
    },

    /// could not parse schema: {0}
    Parse(String),

    /// invalid schema: {0}
    Validation(String),
}

/// Errors raised while compiling a selection shape into a document.
///
/// Every variant is terminal for the compilation that produced it and is never cached.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CompileError {
    /// missing value for required argument '{argument}' of field '{field}'
    MissingArgument {
        /// Coordinate of the field, as `Type.field`.
        field: String,
        /// The required argument.
        argument: String,
    },

    /// response key '{response_key}' is selected more than once on '{parent_type}', an alias is required
    AmbiguousSelection {
        /// The colliding response key.
        response_key: String,
        /// The type owning the selection set.
        parent_type: String,
    },

    /// argument '{argument}' of field '{field}' reached document synthesis without a value
    UnresolvedArgument {
        /// Coordinate of the field, as `Type.field`.
        field: String,
        /// The unresolved argument.
        argument: String,
    },

    /// unknown type '{name}'
    UnknownType {
        /// The type name.
        name: String,
    },

    /// cannot query field '{field}' on type '{parent_type}'
    UnknownField {
        /// The requested field.
        field: String,
        /// The type it was requested on.
        parent_type: String,
    },

    /// field '{field}' has no argument named '{argument}'
    UnknownArgument {
        /// Coordinate of the field, as `Type.field`.
        field: String,
        /// The supplied argument name.
        argument: String,
    },

    /// value for argument '{argument}' of field '{field}' is not a valid '{ty}'
    InvalidArgumentValue {
        /// Coordinate of the field, as `Type.field`.
        field: String,
        /// The argument.
        argument: String,
        /// The declared argument type.
        ty: String,
    },

    /// argument '{argument}' of field '{field}' is supplied more than once
    DuplicateArgument {
        /// Coordinate of the field, as `Type.field`.
        field: String,
        /// The argument bound twice.
        argument: String,
    },

    /// field '{field}' takes {expected} arguments but {found} positional values were supplied
    TooManyArguments {
        /// Coordinate of the field, as `Type.field`.
        field: String,
        /// Number of declared arguments.
        expected: usize,
        /// Number of positional values.
        found: usize,
    },

    /// parameter '{parameter}' is not declared by the operation
    UnknownParameter {
        /// The parameter name.
        parameter: String,
    },

    /// parameter '{parameter}' is declared more than once
    DuplicateParameter {
        /// The parameter name.
        parameter: String,
    },

    /// field '{field}' of type '{ty}' must have a selection of subfields
    MissingSubselection {
        /// Coordinate of the field, as `Type.field`.
        field: String,
        /// The field type.
        ty: String,
    },

    /// field '{field}' of type '{ty}' is a leaf and cannot have a selection of subfields
    SubselectionNotAllowed {
        /// Coordinate of the field, as `Type.field`.
        field: String,
        /// The field type.
        ty: String,
    },

    /// fragment on '{fragment_type}' cannot be used as the selection of '{target_type}'
    InvalidFragmentTarget {
        /// The fragment type condition.
        fragment_type: String,
        /// The type of the selected field.
        target_type: String,
    },

    /// type condition '{type_condition}' can never apply to '{parent_type}'
    InvalidTypeCondition {
        /// The inline fragment type condition.
        type_condition: String,
        /// The type owning the selection set.
        parent_type: String,
    },

    /// fragment name '{name}' is used for different selections
    FragmentNameConflict {
        /// The conflicting fragment name.
        name: String,
    },

    /// a reusable fragment on '{type_condition}' reached document synthesis without being extracted
    UnresolvedFragment {
        /// The fragment type condition.
        type_condition: String,
    },

    /// '{name}' is not a valid GraphQL name
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// the schema does not define a root type for {operation} operations
    UnsupportedOperation {
        /// The operation kind.
        operation: String,
    },

    /// selection nesting exceeds the recursion limit of {limit}
    RecursionLimitExceeded {
        /// The configured limit.
        limit: usize,
    },
}

impl CompileError {
    /// A stable, machine readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::MissingArgument { .. } => "MISSING_ARGUMENT",
            CompileError::AmbiguousSelection { .. } => "AMBIGUOUS_SELECTION",
            CompileError::UnresolvedArgument { .. } => "UNRESOLVED_ARGUMENT",
            CompileError::UnknownType { .. } => "UNKNOWN_TYPE",
            CompileError::UnknownField { .. } => "UNKNOWN_FIELD",
            CompileError::UnknownArgument { .. } => "UNKNOWN_ARGUMENT",
            CompileError::InvalidArgumentValue { .. } => "INVALID_ARGUMENT_VALUE",
            CompileError::DuplicateArgument { .. } => "DUPLICATE_ARGUMENT",
            CompileError::TooManyArguments { .. } => "TOO_MANY_ARGUMENTS",
            CompileError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            CompileError::DuplicateParameter { .. } => "DUPLICATE_PARAMETER",
            CompileError::MissingSubselection { .. } => "MISSING_SUBSELECTION",
            CompileError::SubselectionNotAllowed { .. } => "SUBSELECTION_NOT_ALLOWED",
            CompileError::InvalidFragmentTarget { .. } => "INVALID_FRAGMENT_TARGET",
            CompileError::InvalidTypeCondition { .. } => "INVALID_TYPE_CONDITION",
            CompileError::FragmentNameConflict { .. } => "FRAGMENT_NAME_CONFLICT",
            CompileError::UnresolvedFragment { .. } => "UNRESOLVED_FRAGMENT",
            CompileError::InvalidName { .. } => "INVALID_NAME",
            CompileError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            CompileError::RecursionLimitExceeded { .. } => "RECURSION_LIMIT_EXCEEDED",
        }
    }
}

/// Opaque failure reported by a [`Transport`](crate::Transport).
///
/// It is propagated unchanged and never retried.
#[derive(Error, Debug, Clone)]
#[error(transparent)]
pub struct TransportError(Arc<dyn std::error::Error + Send + Sync>);

impl TransportError {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(Arc::from(error.into()))
    }
}

/// Errors raised while executing a compiled query.
#[derive(Error, Display, Debug, Clone)]
#[non_exhaustive]
pub enum ExecutionError {
    /// no value supplied for variable '${variable}' (bound to parameter '{parameter}')
    MissingVariableValue {
        /// The document variable.
        variable: String,
        /// The operation parameter it is bound to.
        parameter: String,
    },

    /// invalid value for variable '${variable}' of type '{ty}'
    InvalidVariableValue {
        /// The document variable.
        variable: String,
        /// The declared GraphQL type.
        ty: String,
    },

    /// transport failure: {0}
    Transport(#[from] TransportError),
}

/// Errors raised while materializing a response into the declared shape.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MaterializeError {
    /// non-nullable field '{field}' is missing from the response at '{path}'
    MissingResponseField {
        /// Location of the missing key.
        path: Path,
        /// Coordinate of the field, as `Type.field`.
        field: String,
    },

    /// cannot return null for non-nullable type '{ty}' at '{path}'
    NonNullViolation {
        /// Location of the null value.
        path: Path,
        /// The declared type.
        ty: String,
    },

    /// expected {expected} at '{path}' but the response holds {found}
    ScalarCoercion {
        /// Location of the value.
        path: Path,
        /// The declared kind.
        expected: String,
        /// The JSON kind found.
        found: String,
    },

    /// response was malformed: {reason}
    MalformedResponse {
        /// The reason.
        reason: String,
    },

    /// materialized data does not fit the requested type: {reason}
    Deserialization {
        /// The serde error.
        reason: String,
    },
}

impl MaterializeError {
    /// A stable, machine readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            MaterializeError::MissingResponseField { .. } => "MISSING_RESPONSE_FIELD",
            MaterializeError::NonNullViolation { .. } => "NON_NULL_VIOLATION",
            MaterializeError::ScalarCoercion { .. } => "SCALAR_COERCION_ERROR",
            MaterializeError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            MaterializeError::Deserialization { .. } => "DESERIALIZATION_ERROR",
        }
    }
}

/// Any error a [`Client`](crate::Client) call can end with.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum QueryError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error("the server returned no data: {}", .0.iter().map(|error| error.message.as_str()).collect::<Vec<_>>().join(", "))]
    GraphQL(Vec<graphql::Error>),
}

impl From<TransportError> for QueryError {
    fn from(error: TransportError) -> Self {
        QueryError::Execution(error.into())
    }
}
