//! Loading a [`Schema`] descriptor from SDL text.

use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InputValueDefinition;

use super::ArgumentDefinition;
use super::EnumType;
use super::FieldDefinition;
use super::InputObjectType;
use super::ObjectType;
use super::ScalarType;
use super::Schema;
use super::TypeDefinition;
use super::UnionType;
use crate::error::SchemaError;
use crate::operation::Literal;

impl Schema {
    /// Parses and validates SDL, then builds the descriptor from it.
    ///
    /// Built-in scalars and introspection types are left out, the builder adds the scalars back.
    pub fn parse(sdl: &str) -> Result<Schema, SchemaError> {
        let schema = apollo_compiler::Schema::parse(sdl, "schema.graphql")
            .map_err(|invalid| SchemaError::Parse(invalid.errors.to_string()))?
            .validate()
            .map_err(|invalid| SchemaError::Validation(invalid.errors.to_string()))?;

        let mut builder = Schema::builder();
        if let Some(query) = &schema.schema_definition.query {
            builder = builder.query_type(query.name.as_str());
        }
        if let Some(mutation) = &schema.schema_definition.mutation {
            builder = builder.mutation_type(mutation.name.as_str());
        }

        for (name, ty) in &schema.types {
            if ty.is_built_in() {
                continue;
            }
            let definition = match ty {
                ExtendedType::Object(object) => TypeDefinition::Object(ObjectType {
                    name: name.to_string(),
                    implements: object
                        .implements_interfaces
                        .iter()
                        .map(|interface| interface.name.to_string())
                        .collect(),
                    fields: object
                        .fields
                        .iter()
                        .map(|(name, field)| (name.to_string(), field_definition(field)))
                        .collect(),
                }),
                ExtendedType::Interface(interface) => TypeDefinition::Interface(ObjectType {
                    name: name.to_string(),
                    implements: interface
                        .implements_interfaces
                        .iter()
                        .map(|interface| interface.name.to_string())
                        .collect(),
                    fields: interface
                        .fields
                        .iter()
                        .map(|(name, field)| (name.to_string(), field_definition(field)))
                        .collect(),
                }),
                ExtendedType::Union(union) => TypeDefinition::Union(UnionType::new(
                    name.as_str(),
                    union.members.iter().map(|member| member.name.as_str()),
                )),
                ExtendedType::Enum(enum_type) => TypeDefinition::Enum(EnumType::new(
                    name.as_str(),
                    enum_type.values.keys().map(|value| value.as_str()),
                )),
                ExtendedType::InputObject(input) => TypeDefinition::InputObject(InputObjectType {
                    name: name.to_string(),
                    fields: input
                        .fields
                        .values()
                        .map(|field| argument_definition(field))
                        .collect(),
                }),
                ExtendedType::Scalar(_) => TypeDefinition::Scalar(ScalarType {
                    name: name.to_string(),
                }),
            };
            builder = builder.definition(definition);
        }
        builder.build()
    }
}

fn field_definition(field: &ast::FieldDefinition) -> FieldDefinition {
    FieldDefinition {
        name: field.name.to_string(),
        ty: (&field.ty).into(),
        arguments: field
            .arguments
            .iter()
            .map(|argument| argument_definition(argument))
            .collect(),
    }
}

fn argument_definition(argument: &InputValueDefinition) -> ArgumentDefinition {
    ArgumentDefinition {
        name: argument.name.to_string(),
        ty: (&*argument.ty).into(),
        default_value: argument
            .default_value
            .as_ref()
            .map(|value| literal(value)),
    }
}

/// Converts a constant SDL value. Variables cannot appear in SDL and are read as null.
fn literal(value: &ast::Value) -> Literal {
    match value {
        ast::Value::Null | ast::Value::Variable(_) => Literal::Null,
        ast::Value::Enum(name) => Literal::Enum(name.to_string()),
        ast::Value::String(string) => Literal::String(string.clone()),
        ast::Value::Boolean(boolean) => Literal::Boolean(*boolean),
        ast::Value::Int(int) => match int.as_str().parse::<i64>() {
            Ok(int) => Literal::Int(int),
            Err(_) => Literal::Float(int.as_str().parse().unwrap_or(f64::INFINITY)),
        },
        ast::Value::Float(float) => Literal::Float(float.as_str().parse().unwrap_or(f64::INFINITY)),
        ast::Value::List(items) => Literal::List(items.iter().map(|item| literal(item)).collect()),
        ast::Value::Object(fields) => Literal::Object(
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), literal(value)))
                .collect(),
        ),
    }
}
