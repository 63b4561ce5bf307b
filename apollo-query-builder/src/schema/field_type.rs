use apollo_compiler::ast;
use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Value;
use crate::operation::Literal;
use crate::operation::is_valid_name;
use crate::schema::Schema;
use crate::schema::TypeDefinition;

#[derive(Debug)]
pub(crate) struct InvalidValue;

// Primitives are taken from scalars: https://spec.graphql.org/draft/#sec-Scalars
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Named type {0}
    Named(String),
    /// List type {0}
    List(Box<FieldType>),
    /// Non null type {0}
    NonNull(Box<FieldType>),
    /// String
    String,
    /// Int
    Int,
    /// Float
    Float,
    /// Id
    Id,
    /// Boolean
    Boolean,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Named(ty) => write!(f, "{ty}"),
            FieldType::List(ty) => write!(f, "[{ty}]"),
            FieldType::NonNull(ty) => write!(f, "{ty}!"),
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Id => write!(f, "ID"),
            FieldType::Boolean => write!(f, "Boolean"),
        }
    }
}

impl FieldType {
    /// A named type, mapping the built-in scalar names to their variants.
    pub fn named(name: impl AsRef<str>) -> Self {
        match name.as_ref() {
            "String" => Self::String,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "ID" => Self::Id,
            "Boolean" => Self::Boolean,
            other => Self::Named(other.to_string()),
        }
    }

    /// Wraps this type as non-null. Already non-null types are returned unchanged.
    pub fn non_null(self) -> Self {
        match self {
            FieldType::NonNull(_) => self,
            other => FieldType::NonNull(Box::new(other)),
        }
    }

    /// Wraps this type in a list.
    pub fn list(self) -> Self {
        FieldType::List(Box::new(self))
    }

    // This function validates input values according to the graphql specification.
    // Each of the values are validated against the "input coercion" rules.
    pub(crate) fn validate_input_value(
        &self,
        value: &Value,
        schema: &Schema,
    ) -> Result<(), InvalidValue> {
        match (self, value) {
            (FieldType::String, Value::String(_)) => Ok(()),
            // Spec: https://spec.graphql.org/June2018/#sec-Int
            (FieldType::Int, maybe_int) => {
                if maybe_int == &Value::Null || is_valid_int_input(maybe_int) {
                    Ok(())
                } else {
                    Err(InvalidValue)
                }
            }
            // Spec: https://spec.graphql.org/draft/#sec-Float.Input-Coercion
            (FieldType::Float, maybe_float) => {
                if maybe_float == &Value::Null || maybe_float.as_f64().is_some() {
                    Ok(())
                } else {
                    Err(InvalidValue)
                }
            }
            // "The ID scalar type represents a unique identifier, often used to refetch an object
            // or as the key for a cache. The ID type is serialized in the same way as a String;
            // however, it is not intended to be human-readable. While it is often numeric, it
            // should always serialize as a String."
            //
            // In practice it seems Int works too
            (FieldType::Id, Value::String(_)) => Ok(()),
            (FieldType::Id, maybe_int) => {
                if maybe_int == &Value::Null || is_valid_int_input(maybe_int) {
                    Ok(())
                } else {
                    Err(InvalidValue)
                }
            }
            (FieldType::Boolean, Value::Bool(_)) => Ok(()),
            (FieldType::List(inner_ty), Value::Array(vec)) => vec
                .iter()
                .try_for_each(|x| inner_ty.validate_input_value(x, schema)),
            // For coercion from single value to list
            (FieldType::List(inner_ty), val) if val != &Value::Null => {
                inner_ty.validate_input_value(val, schema)
            }
            (FieldType::NonNull(inner_ty), value) => {
                if value.is_null() {
                    Err(InvalidValue)
                } else {
                    inner_ty.validate_input_value(value, schema)
                }
            }
            // NOTE: graphql's types are all optional by default
            (_, Value::Null) => Ok(()),
            (FieldType::Named(name), value) => match schema.type_definition(name) {
                Some(TypeDefinition::Scalar(_)) => Ok(()),
                Some(TypeDefinition::Enum(enum_type)) => match value.as_str() {
                    Some(s) if enum_type.values.contains(s) => Ok(()),
                    _ => Err(InvalidValue),
                },
                Some(TypeDefinition::InputObject(input_type)) => match value.as_object() {
                    Some(object) => input_type.fields.iter().try_for_each(|field| {
                        match object.get(field.name.as_str()) {
                            Some(value) => field.ty.validate_input_value(value, schema),
                            None if field.is_required() => Err(InvalidValue),
                            None => Ok(()),
                        }
                    }),
                    None => Err(InvalidValue),
                },
                _ => Err(InvalidValue),
            },
            _ => Err(InvalidValue),
        }
    }

    /// Validates a constant written inline in a document, with the same coercion rules as
    /// [`FieldType::validate_input_value`]. Enum values and input object keys must be declared,
    /// floats must be finite.
    pub(crate) fn validate_literal(
        &self,
        literal: &Literal,
        schema: &Schema,
    ) -> Result<(), InvalidValue> {
        match (self, literal) {
            (FieldType::NonNull(_), Literal::Null) => Err(InvalidValue),
            (FieldType::NonNull(inner_ty), literal) => inner_ty.validate_literal(literal, schema),
            (_, Literal::Null) => Ok(()),
            (FieldType::String, Literal::String(_)) => Ok(()),
            (FieldType::Int, Literal::Int(int)) if i32::try_from(*int).is_ok() => Ok(()),
            (FieldType::Float, Literal::Int(_)) => Ok(()),
            (FieldType::Float, Literal::Float(float)) if float.is_finite() => Ok(()),
            (FieldType::Id, Literal::String(_) | Literal::Int(_)) => Ok(()),
            (FieldType::Boolean, Literal::Boolean(_)) => Ok(()),
            (FieldType::List(inner_ty), Literal::List(items)) => items
                .iter()
                .try_for_each(|item| inner_ty.validate_literal(item, schema)),
            // For coercion from single value to list
            (FieldType::List(inner_ty), literal) => inner_ty.validate_literal(literal, schema),
            (FieldType::Named(name), literal) => match schema.type_definition(name) {
                // we cannot know about the expected format of custom scalars
                Some(TypeDefinition::Scalar(_)) => well_formed(literal),
                Some(TypeDefinition::Enum(enum_type)) => match literal {
                    Literal::Enum(value) if enum_type.values.contains(value) => Ok(()),
                    _ => Err(InvalidValue),
                },
                Some(TypeDefinition::InputObject(input_type)) => match literal {
                    Literal::Object(fields) => {
                        if fields
                            .keys()
                            .any(|key| input_type.fields.iter().all(|field| &field.name != key))
                        {
                            return Err(InvalidValue);
                        }
                        input_type.fields.iter().try_for_each(|field| {
                            match fields.get(&field.name) {
                                Some(value) => field.ty.validate_literal(value, schema),
                                None if field.is_required() => Err(InvalidValue),
                                None => Ok(()),
                            }
                        })
                    }
                    _ => Err(InvalidValue),
                },
                _ => Err(InvalidValue),
            },
            _ => Err(InvalidValue),
        }
    }

    /// return the name of the type on which selections happen
    ///
    /// Example if we get the field `list: [User!]!`, it will return "User"
    pub fn inner_type_name(&self) -> &str {
        match self {
            FieldType::Named(name) => name.as_str(),
            FieldType::List(inner) | FieldType::NonNull(inner) => inner.inner_type_name(),
            FieldType::String => "String",
            FieldType::Int => "Int",
            FieldType::Float => "Float",
            FieldType::Id => "ID",
            FieldType::Boolean => "Boolean",
        }
    }

    pub fn is_builtin_scalar(&self) -> bool {
        match self {
            FieldType::Named(_) | FieldType::List(_) | FieldType::NonNull(_) => false,
            FieldType::String
            | FieldType::Int
            | FieldType::Float
            | FieldType::Id
            | FieldType::Boolean => true,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, FieldType::NonNull(_))
    }

    /// Whether values of this type are lists, ignoring the outer non-null wrapper.
    pub fn is_list(&self) -> bool {
        match self {
            FieldType::NonNull(inner) => inner.is_list(),
            FieldType::List(_) => true,
            _ => false,
        }
    }
}

fn is_valid_int_input(value: &Value) -> bool {
    // A value is a valid input int if it can be represented as a 32 bit signed integer.
    value
        .as_i64()
        .and_then(|x| i32::try_from(x).ok())
        .is_some()
}

/// Any literal that can be written as GraphQL syntax.
fn well_formed(literal: &Literal) -> Result<(), InvalidValue> {
    match literal {
        Literal::Float(float) if !float.is_finite() => Err(InvalidValue),
        Literal::Enum(name) if !is_valid_name(name) => Err(InvalidValue),
        Literal::List(items) => items.iter().try_for_each(well_formed),
        Literal::Object(fields) => fields.iter().try_for_each(|(name, value)| {
            if is_valid_name(name) {
                well_formed(value)
            } else {
                Err(InvalidValue)
            }
        }),
        _ => Ok(()),
    }
}

impl From<&'_ ast::Type> for FieldType {
    fn from(ty: &'_ ast::Type) -> Self {
        match ty {
            ast::Type::Named(name) => Self::named(name.as_str()),
            ast::Type::NonNullNamed(name) => Self::NonNull(Box::new(Self::named(name.as_str()))),
            ast::Type::List(inner) => Self::List(Box::new((&**inner).into())),
            ast::Type::NonNullList(inner) => {
                Self::NonNull(Box::new(Self::List(Box::new((&**inner).into()))))
            }
        }
    }
}
