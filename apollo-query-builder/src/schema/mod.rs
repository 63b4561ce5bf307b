//! GraphQL schema descriptor.
//!
//! A static, load-once description of the types a [`QueryCompiler`](crate::QueryCompiler)
//! compiles against. The descriptor is assumed to describe a valid schema: [`SchemaBuilder::build`]
//! only checks that every referenced type exists.

mod field_type;
mod sdl;

use std::collections::HashSet;

pub use field_type::FieldType;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Deserialize;
use serde::Serialize;

use crate::error::SchemaError;
use crate::operation::Literal;
use crate::operation::OperationType;

pub(crate) const TYPENAME: &str = "__typename";

const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// A GraphQL schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    query_type: String,
    mutation_type: Option<String>,
    types: IndexMap<String, TypeDefinition>,
}

/// A named type of the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDefinition {
    Object(ObjectType),
    Interface(ObjectType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
    Scalar(ScalarType),
}

/// An object or interface type: something fields can be selected on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: String,
    pub implements: Vec<String>,
    pub fields: IndexMap<String, FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: FieldType,
    /// Arguments, in declaration order.
    pub arguments: Vec<ArgumentDefinition>,
}

/// An argument of a field, or a field of an input object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    pub name: String,
    pub ty: FieldType,
    pub default_value: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub values: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputObjectType {
    pub name: String,
    pub fields: Vec<ArgumentDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarType {
    pub name: String,
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Object(ty) | TypeDefinition::Interface(ty) => &ty.name,
            TypeDefinition::Union(ty) => &ty.name,
            TypeDefinition::Enum(ty) => &ty.name,
            TypeDefinition::InputObject(ty) => &ty.name,
            TypeDefinition::Scalar(ty) => &ty.name,
        }
    }

    /// Object, interface and union types carry selection sets.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Object(_) | TypeDefinition::Interface(_) | TypeDefinition::Union(_)
        )
    }

    fn is_abstract(&self) -> bool {
        matches!(self, TypeDefinition::Interface(_) | TypeDefinition::Union(_))
    }
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implements: Vec::new(),
            fields: IndexMap::new(),
        }
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: Vec::new(),
        }
    }

    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn argument_by_name(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    pub fn default_value(mut self, value: impl Into<Literal>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// An argument must be supplied when it is non-null and has no default.
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

impl UnionType {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: ArgumentDefinition) -> Self {
        self.fields.push(field);
        self
    }
}

/// Builds a [`Schema`] from type definitions.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    query_type: String,
    mutation_type: Option<String>,
    types: Vec<TypeDefinition>,
}

impl SchemaBuilder {
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.query_type = name.into();
        self
    }

    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    pub fn object(mut self, ty: ObjectType) -> Self {
        self.types.push(TypeDefinition::Object(ty));
        self
    }

    pub fn interface(mut self, ty: ObjectType) -> Self {
        self.types.push(TypeDefinition::Interface(ty));
        self
    }

    pub fn union(mut self, ty: UnionType) -> Self {
        self.types.push(TypeDefinition::Union(ty));
        self
    }

    pub fn enumeration(mut self, ty: EnumType) -> Self {
        self.types.push(TypeDefinition::Enum(ty));
        self
    }

    pub fn input_object(mut self, ty: InputObjectType) -> Self {
        self.types.push(TypeDefinition::InputObject(ty));
        self
    }

    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.types
            .push(TypeDefinition::Scalar(ScalarType { name: name.into() }));
        self
    }

    pub(crate) fn definition(mut self, definition: TypeDefinition) -> Self {
        self.types.push(definition);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut types = IndexMap::new();
        for name in BUILTIN_SCALARS {
            types.insert(
                name.to_string(),
                TypeDefinition::Scalar(ScalarType {
                    name: name.to_string(),
                }),
            );
        }
        for definition in self.types {
            let name = definition.name().to_string();
            let is_builtin = BUILTIN_SCALARS.contains(&name.as_str());
            if types.insert(name.clone(), definition).is_some() && !is_builtin {
                return Err(SchemaError::DuplicateType { name });
            }
        }

        let schema = Schema {
            query_type: self.query_type,
            mutation_type: self.mutation_type,
            types,
        };
        schema.check_references()?;
        Ok(schema)
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            query_type: "Query".to_string(),
            mutation_type: None,
            types: Vec::new(),
        }
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    /// The root type selections of an operation of that kind start from.
    pub fn root_type(&self, operation_type: OperationType) -> Option<&str> {
        match operation_type {
            OperationType::Query => Some(self.query_type()),
            OperationType::Mutation => self.mutation_type(),
        }
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Looks up a field on an object or interface type.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        match self.types.get(type_name)? {
            TypeDefinition::Object(ty) | TypeDefinition::Interface(ty) => ty.fields.get(field_name),
            _ => None,
        }
    }

    pub fn is_composite(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .map(TypeDefinition::is_composite)
            .unwrap_or_default()
    }

    /// Whether `maybe_subtype` is a member of the union or an implementation of the
    /// interface `abstract_type`.
    pub fn is_subtype(&self, abstract_type: &str, maybe_subtype: &str) -> bool {
        self.is_subtype_inner(abstract_type, maybe_subtype, &mut HashSet::new())
    }

    fn is_subtype_inner<'a>(
        &'a self,
        abstract_type: &str,
        maybe_subtype: &'a str,
        visited: &mut HashSet<&'a str>,
    ) -> bool {
        if !visited.insert(maybe_subtype) {
            return false;
        }
        if let Some(TypeDefinition::Union(union)) = self.types.get(abstract_type) {
            if union.members.iter().any(|member| member == maybe_subtype) {
                return true;
            }
        }
        match self.types.get(maybe_subtype) {
            Some(TypeDefinition::Object(ty)) | Some(TypeDefinition::Interface(ty)) => {
                ty.implements.iter().any(|interface| {
                    interface == abstract_type
                        || self.is_subtype_inner(abstract_type, interface, visited)
                })
            }
            _ => false,
        }
    }

    /// The object types a value of the given composite type can have at runtime.
    pub fn possible_types(&self, type_name: &str) -> IndexSet<&str> {
        match self.types.get(type_name) {
            Some(TypeDefinition::Object(ty)) => IndexSet::from([ty.name.as_str()]),
            Some(definition) if definition.is_abstract() => self
                .types
                .values()
                .filter_map(|candidate| match candidate {
                    TypeDefinition::Object(ty) if self.is_subtype(type_name, &ty.name) => {
                        Some(ty.name.as_str())
                    }
                    _ => None,
                })
                .collect(),
            _ => IndexSet::new(),
        }
    }

    /// Whether a selection on `type_condition` can ever apply to a value of `parent_type`.
    pub(crate) fn types_overlap(&self, parent_type: &str, type_condition: &str) -> bool {
        if parent_type == type_condition {
            return true;
        }
        let parent = self.possible_types(parent_type);
        self.possible_types(type_condition)
            .iter()
            .any(|ty| parent.contains(ty))
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        match self.types.get(&self.query_type) {
            Some(TypeDefinition::Object(_)) => {}
            _ => {
                return Err(SchemaError::MissingQueryType {
                    name: self.query_type.clone(),
                });
            }
        }
        if let Some(mutation_type) = &self.mutation_type {
            self.check_type(mutation_type, "schema")?;
        }

        for definition in self.types.values() {
            match definition {
                TypeDefinition::Object(ty) | TypeDefinition::Interface(ty) => {
                    for interface in &ty.implements {
                        self.check_type(interface, &ty.name)?;
                    }
                    for field in ty.fields.values() {
                        let coordinate = format!("{}.{}", ty.name, field.name);
                        self.check_type(field.ty.inner_type_name(), &coordinate)?;
                        for argument in &field.arguments {
                            self.check_type(
                                argument.ty.inner_type_name(),
                                &format!("{coordinate}({}:)", argument.name),
                            )?;
                        }
                    }
                }
                TypeDefinition::Union(ty) => {
                    for member in &ty.members {
                        self.check_type(member, &ty.name)?;
                    }
                }
                TypeDefinition::InputObject(ty) => {
                    for field in &ty.fields {
                        self.check_type(
                            field.ty.inner_type_name(),
                            &format!("{}.{}", ty.name, field.name),
                        )?;
                    }
                }
                TypeDefinition::Enum(_) | TypeDefinition::Scalar(_) => {}
            }
        }
        Ok(())
    }

    fn check_type(&self, name: &str, referenced_by: &str) -> Result<(), SchemaError> {
        if self.types.contains_key(name) {
            Ok(())
        } else {
            Err(SchemaError::UnknownType {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
        }
    }
}
