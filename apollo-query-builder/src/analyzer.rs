//! Resolves an [`OperationShape`] against a [`Schema`] into a [`SelectionSet`].
//!
//! Analysis is purely structural: every field is looked up on its parent type, every argument
//! is bound to its declaration, and reusable fragments are kept as markers for the
//! [`fragments`](crate::fragments) extractor. Nothing is decided about variables yet.

use std::collections::HashSet;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::CompileError;
use crate::operation::ArgumentValue;
use crate::operation::Field;
use crate::operation::FieldArgument;
use crate::operation::InlineFragment;
use crate::operation::ReusableFragment;
use crate::operation::Selection;
use crate::operation::SelectionSet;
use crate::operation::is_valid_name;
use crate::schema::FieldDefinition;
use crate::schema::FieldType;
use crate::schema::Schema;
use crate::schema::TYPENAME;
use crate::shape::ArgumentInput;
use crate::shape::FieldShape;
use crate::shape::FragmentShape;
use crate::shape::Member;
use crate::shape::OperationShape;
use crate::shape::SelectionShape;
use crate::shape::SubSelection;

/// Analyzes `shape`, refusing selection sets nested deeper than `recursion_limit`.
pub fn analyze(
    schema: &Schema,
    shape: &OperationShape,
    recursion_limit: usize,
) -> Result<SelectionSet, CompileError> {
    let root_type =
        schema
            .root_type(shape.kind)
            .ok_or_else(|| CompileError::UnsupportedOperation {
                operation: shape.kind.to_string(),
            })?;
    if let Some(name) = &shape.name {
        check_name(name)?;
    }
    let mut parameters = HashSet::new();
    for parameter in &shape.parameters {
        check_name(parameter)?;
        if !parameters.insert(parameter.as_str()) {
            return Err(CompileError::DuplicateParameter {
                parameter: parameter.clone(),
            });
        }
    }

    let analyzer = Analyzer {
        schema,
        parameters,
        recursion_limit,
    };
    if shape.selection.is_empty() {
        return Err(CompileError::MissingSubselection {
            field: shape.kind.to_string(),
            ty: root_type.to_string(),
        });
    }
    let selections = analyzer.selections(root_type, &shape.selection, 0)?;
    check_response_keys(root_type, &selections.iter().collect::<Vec<_>>())?;

    Ok(SelectionSet {
        operation_type: shape.kind,
        operation_name: shape.name.clone(),
        root_type: root_type.to_string(),
        selections,
    })
}

struct Analyzer<'a> {
    schema: &'a Schema,
    parameters: HashSet<&'a str>,
    recursion_limit: usize,
}

impl Analyzer<'_> {
    fn selections(
        &self,
        parent_type: &str,
        shape: &SelectionShape,
        depth: usize,
    ) -> Result<Vec<Selection>, CompileError> {
        if depth > self.recursion_limit {
            tracing::error!(
                limit = self.recursion_limit,
                parent_type,
                "selection recursion limit exceeded"
            );
            return Err(CompileError::RecursionLimitExceeded {
                limit: self.recursion_limit,
            });
        }

        let mut selections = Vec::with_capacity(shape.members.len());
        let mut response_keys = HashSet::new();
        let mut needs_typename = false;
        for member in &shape.members {
            match member {
                Member::Field(field_shape) => {
                    let field = self.field(parent_type, field_shape, depth)?;
                    if !response_keys.insert(field.response_key().to_string()) {
                        return Err(CompileError::AmbiguousSelection {
                            response_key: field.response_key().to_string(),
                            parent_type: parent_type.to_string(),
                        });
                    }
                    selections.push(Selection::Field(field));
                }
                Member::Spread(fragment) => {
                    let fragment = self.fragment(parent_type, fragment, depth)?;
                    needs_typename |= fragment.type_condition != parent_type;
                    selections.push(Selection::ReusableFragment(fragment));
                }
                Member::On {
                    type_condition,
                    selection,
                } => {
                    self.check_type_condition(parent_type, type_condition)?;
                    if selection.is_empty() {
                        return Err(CompileError::MissingSubselection {
                            field: format!("... on {type_condition}"),
                            ty: type_condition.clone(),
                        });
                    }
                    needs_typename |= type_condition != parent_type;
                    selections.push(Selection::InlineFragment(InlineFragment {
                        type_condition: type_condition.clone(),
                        selections: self.selections(type_condition, selection, depth + 1)?,
                    }));
                }
            }
        }

        // narrowed selections are only applied once the concrete type is known
        if needs_typename && !response_keys.contains(TYPENAME) {
            selections.push(injected_typename(parent_type));
        }
        Ok(selections)
    }

    fn field(
        &self,
        parent_type: &str,
        shape: &FieldShape,
        depth: usize,
    ) -> Result<Field, CompileError> {
        if let Some(alias) = &shape.alias {
            check_name(alias)?;
        }

        if shape.name == TYPENAME {
            if shape.selection.is_some() {
                return Err(CompileError::SubselectionNotAllowed {
                    field: format!("{parent_type}.{TYPENAME}"),
                    ty: "String!".to_string(),
                });
            }
            if let Some((argument, _)) = shape.named.first() {
                return Err(CompileError::UnknownArgument {
                    field: format!("{parent_type}.{TYPENAME}"),
                    argument: argument.clone(),
                });
            }
            if !shape.positional.is_empty() {
                return Err(CompileError::TooManyArguments {
                    field: format!("{parent_type}.{TYPENAME}"),
                    expected: 0,
                    found: shape.positional.len(),
                });
            }
            return Ok(Field {
                name: TYPENAME.to_string(),
                alias: shape.alias.clone(),
                parent_type: parent_type.to_string(),
                field_type: FieldType::String.non_null(),
                arguments: Vec::new(),
                selections: Vec::new(),
                injected: false,
            });
        }

        let definition = self.schema.field(parent_type, &shape.name).ok_or_else(|| {
            CompileError::UnknownField {
                field: shape.name.clone(),
                parent_type: parent_type.to_string(),
            }
        })?;
        let coordinate = format!("{parent_type}.{}", definition.name);
        let arguments = self.bind_arguments(&coordinate, definition, shape)?;

        let field_type = definition.ty.inner_type_name();
        let selections = match (&shape.selection, self.schema.is_composite(field_type)) {
            (None, false) => Vec::new(),
            (None, true) => {
                return Err(CompileError::MissingSubselection {
                    field: coordinate,
                    ty: definition.ty.to_string(),
                });
            }
            (Some(_), false) => {
                return Err(CompileError::SubselectionNotAllowed {
                    field: coordinate,
                    ty: definition.ty.to_string(),
                });
            }
            (Some(SubSelection::Inline(selection)), true) => {
                if selection.is_empty() {
                    return Err(CompileError::MissingSubselection {
                        field: coordinate,
                        ty: definition.ty.to_string(),
                    });
                }
                self.selections(field_type, selection, depth + 1)?
            }
            (Some(SubSelection::Fragment(fragment)), true) => {
                let fragment = self.fragment(field_type, fragment, depth + 1)?;
                if fragment.type_condition == field_type {
                    vec![Selection::ReusableFragment(fragment)]
                } else {
                    vec![
                        Selection::ReusableFragment(fragment),
                        injected_typename(field_type),
                    ]
                }
            }
        };

        Ok(Field {
            name: definition.name.clone(),
            alias: shape.alias.clone(),
            parent_type: parent_type.to_string(),
            field_type: definition.ty.clone(),
            arguments,
            selections,
            injected: false,
        })
    }

    /// Binds positional values in declaration order, then named values by name. Omitted
    /// arguments fall back to the server side default, or fail when required.
    fn bind_arguments(
        &self,
        coordinate: &str,
        definition: &FieldDefinition,
        shape: &FieldShape,
    ) -> Result<Vec<FieldArgument>, CompileError> {
        if shape.positional.len() > definition.arguments.len() {
            return Err(CompileError::TooManyArguments {
                field: coordinate.to_string(),
                expected: definition.arguments.len(),
                found: shape.positional.len(),
            });
        }

        let mut supplied: IndexMap<&str, &ArgumentInput> = definition
            .arguments
            .iter()
            .zip(&shape.positional)
            .map(|(argument, value)| (argument.name.as_str(), value))
            .collect();
        for (name, value) in &shape.named {
            if definition.argument_by_name(name).is_none() {
                return Err(CompileError::UnknownArgument {
                    field: coordinate.to_string(),
                    argument: name.clone(),
                });
            }
            match supplied.entry(name.as_str()) {
                Entry::Occupied(_) => {
                    return Err(CompileError::DuplicateArgument {
                        field: coordinate.to_string(),
                        argument: name.clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }

        definition
            .arguments
            .iter()
            .map(|argument| {
                let value = match supplied.get(argument.name.as_str()) {
                    Some(ArgumentInput::Literal(literal)) => {
                        argument
                            .ty
                            .validate_literal(literal, self.schema)
                            .map_err(|_| CompileError::InvalidArgumentValue {
                                field: coordinate.to_string(),
                                argument: argument.name.clone(),
                                ty: argument.ty.to_string(),
                            })?;
                        ArgumentValue::Literal(literal.clone())
                    }
                    Some(ArgumentInput::Parameter(parameter)) => {
                        if !self.parameters.contains(parameter.as_str()) {
                            return Err(CompileError::UnknownParameter {
                                parameter: parameter.clone(),
                            });
                        }
                        ArgumentValue::Parameter(parameter.clone())
                    }
                    None if argument.is_required() => {
                        return Err(CompileError::MissingArgument {
                            field: coordinate.to_string(),
                            argument: argument.name.clone(),
                        });
                    }
                    None => ArgumentValue::Default,
                };
                Ok(FieldArgument {
                    name: argument.name.clone(),
                    ty: argument.ty.clone(),
                    value,
                    declared_default: argument.default_value.clone(),
                })
            })
            .collect()
    }

    fn fragment(
        &self,
        target_type: &str,
        fragment: &FragmentShape,
        depth: usize,
    ) -> Result<ReusableFragment, CompileError> {
        if let Some(name) = &fragment.name {
            check_name(name)?;
        }
        if !self.schema.is_composite(&fragment.on_type) {
            return Err(CompileError::UnknownType {
                name: fragment.on_type.clone(),
            });
        }
        if fragment.selection.is_empty() {
            return Err(CompileError::MissingSubselection {
                field: fragment.name.clone().unwrap_or_default(),
                ty: fragment.on_type.clone(),
            });
        }
        if !self.schema.types_overlap(target_type, &fragment.on_type) {
            return Err(CompileError::InvalidFragmentTarget {
                fragment_type: fragment.on_type.clone(),
                target_type: target_type.to_string(),
            });
        }
        Ok(ReusableFragment {
            name: fragment.name.clone(),
            type_condition: fragment.on_type.clone(),
            selections: self.selections(&fragment.on_type, &fragment.selection, depth + 1)?,
        })
    }

    fn check_type_condition(
        &self,
        parent_type: &str,
        type_condition: &str,
    ) -> Result<(), CompileError> {
        if !self.schema.is_composite(type_condition) {
            return Err(CompileError::UnknownType {
                name: type_condition.to_string(),
            });
        }
        if !self.schema.types_overlap(parent_type, type_condition) {
            return Err(CompileError::InvalidTypeCondition {
                type_condition: type_condition.to_string(),
                parent_type: parent_type.to_string(),
            });
        }
        Ok(())
    }
}

/// Fields sharing a response key, fragment members included, must be the same field with the
/// same arguments so the server can merge them. Their sub-selections are then checked together.
fn check_response_keys(parent_type: &str, selections: &[&Selection]) -> Result<(), CompileError> {
    let mut fields_by_key: IndexMap<&str, Vec<&Field>> = IndexMap::new();
    collect_fields(selections.iter().copied(), &mut fields_by_key);
    for (response_key, fields) in &fields_by_key {
        let Some((first, others)) = fields.split_first() else {
            continue;
        };
        if others
            .iter()
            .any(|field| field.name != first.name || field.arguments != first.arguments)
        {
            return Err(CompileError::AmbiguousSelection {
                response_key: response_key.to_string(),
                parent_type: parent_type.to_string(),
            });
        }
        let merged: Vec<&Selection> = fields
            .iter()
            .flat_map(|field| field.selections.iter())
            .collect();
        if !merged.is_empty() {
            check_response_keys(first.field_type.inner_type_name(), &merged)?;
        }
    }
    Ok(())
}

fn collect_fields<'a>(
    selections: impl IntoIterator<Item = &'a Selection>,
    fields_by_key: &mut IndexMap<&'a str, Vec<&'a Field>>,
) {
    for selection in selections {
        match selection {
            Selection::Field(field) => fields_by_key
                .entry(field.response_key())
                .or_default()
                .push(field),
            Selection::InlineFragment(InlineFragment { selections, .. })
            | Selection::ReusableFragment(ReusableFragment { selections, .. }) => {
                collect_fields(selections, fields_by_key)
            }
            Selection::FragmentSpread(_) => {}
        }
    }
}

fn injected_typename(parent_type: &str) -> Selection {
    Selection::Field(Field {
        name: TYPENAME.to_string(),
        alias: None,
        parent_type: parent_type.to_string(),
        field_type: FieldType::String.non_null(),
        arguments: Vec::new(),
        selections: Vec::new(),
        injected: true,
    })
}

pub(crate) fn check_name(name: &str) -> Result<(), CompileError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(CompileError::InvalidName {
            name: name.to_string(),
        })
    }
}
