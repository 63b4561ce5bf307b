//! Rebuilds the declared shape from a response.
//!
//! The response is walked in lock-step with the selection set that produced the document.
//! Values are looked up by response key, so response key order does not matter, and the
//! output follows the order of the selections. Fragment fields are siblings of the fields
//! around the spread.

use serde::de::DeserializeOwned;

use crate::error::MaterializeError;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::json_ext::kind_of;
use crate::operation::FragmentDefinition;
use crate::operation::FragmentSpread;
use crate::operation::InlineFragment;
use crate::operation::ReusableFragment;
use crate::operation::Selection;
use crate::operation::SelectionSet;
use crate::schema::FieldType;
use crate::schema::Schema;
use crate::schema::TYPENAME;
use crate::schema::TypeDefinition;

/// Materializes the `data` of a response.
///
/// A missing key is an error for a non-null field and null otherwise. Scalars are checked
/// against their declared kind. IDs sent as integers come back as strings.
pub fn materialize(
    schema: &Schema,
    selection_set: &SelectionSet,
    fragments: &[FragmentDefinition],
    data: &Value,
) -> Result<Value, MaterializeError> {
    let input = data
        .as_object()
        .ok_or_else(|| MaterializeError::MalformedResponse {
            reason: format!("expected data to be an object, found {}", kind_of(data)),
        })?;
    let mut output = Object::new();
    Materializer { schema, fragments }.apply_selection_set(
        &selection_set.selections,
        input,
        &mut output,
        &mut Path::empty(),
        &selection_set.root_type,
    )?;
    Ok(Value::Object(output))
}

/// Materializes the `data` of a response into `T`, whose fields mirror the selection.
pub fn materialize_as<T: DeserializeOwned>(
    schema: &Schema,
    selection_set: &SelectionSet,
    fragments: &[FragmentDefinition],
    data: &Value,
) -> Result<T, MaterializeError> {
    let value = materialize(schema, selection_set, fragments, data)?;
    serde_json_bytes::from_value(value).map_err(|error| MaterializeError::Deserialization {
        reason: error.to_string(),
    })
}

struct Materializer<'a> {
    schema: &'a Schema,
    fragments: &'a [FragmentDefinition],
}

impl Materializer<'_> {
    fn apply_selection_set(
        &self,
        selections: &[Selection],
        input: &Object,
        output: &mut Object,
        path: &mut Path,
        parent_type: &str,
    ) -> Result<(), MaterializeError> {
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    let response_key = field.response_key();
                    match input.get(response_key) {
                        None => {
                            if field.field_type.is_non_null() {
                                let mut path = path.clone();
                                path.push(PathElement::Key(response_key.to_string()));
                                return Err(MaterializeError::MissingResponseField {
                                    path,
                                    field: field.coordinate(),
                                });
                            }
                            if !field.injected && !output.contains_key(response_key) {
                                output.insert(response_key, Value::Null);
                            }
                        }
                        // only used to match type conditions
                        Some(_) if field.injected => {}
                        Some(input_value) => {
                            path.push(PathElement::Key(response_key.to_string()));
                            let output_value = output.entry(response_key).or_insert(Value::Null);
                            self.format_value(
                                &field.field_type,
                                input_value,
                                output_value,
                                path,
                                &field.selections,
                            )?;
                            path.pop();
                        }
                    }
                }
                Selection::InlineFragment(InlineFragment {
                    type_condition,
                    selections,
                })
                | Selection::ReusableFragment(ReusableFragment {
                    type_condition,
                    selections,
                    ..
                }) => {
                    if self.applies(type_condition, parent_type, input) {
                        self.apply_selection_set(selections, input, output, path, type_condition)?;
                    }
                }
                Selection::FragmentSpread(FragmentSpread {
                    fragment_name,
                    type_condition,
                }) => {
                    let fragment = self
                        .fragments
                        .iter()
                        .find(|fragment| &fragment.name == fragment_name)
                        .ok_or_else(|| MaterializeError::MalformedResponse {
                            reason: format!("fragment '{fragment_name}' is not defined"),
                        })?;
                    if self.applies(type_condition, parent_type, input) {
                        self.apply_selection_set(
                            &fragment.selections,
                            input,
                            output,
                            path,
                            type_condition,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether selections conditioned on `type_condition` apply to `input`.
    fn applies(&self, type_condition: &str, parent_type: &str, input: &Object) -> bool {
        // check if the fragment matches the input type directly, and if not, check if the
        // input type is a subtype of the fragment's type condition (interface, union)
        let known_type = input
            .get(TYPENAME)
            .and_then(|typename| typename.as_str())
            .unwrap_or(parent_type);
        known_type == type_condition || self.schema.is_subtype(type_condition, known_type)
    }

    fn format_value(
        &self,
        field_type: &FieldType,
        input: &Value,
        output: &mut Value,
        path: &mut Path,
        selections: &[Selection],
    ) -> Result<(), MaterializeError> {
        let coercion_error = |expected: &str| MaterializeError::ScalarCoercion {
            path: path.clone(),
            expected: expected.to_string(),
            found: kind_of(input).to_string(),
        };

        match field_type {
            FieldType::NonNull(inner_type) => {
                if input.is_null() {
                    return Err(MaterializeError::NonNullViolation {
                        path: path.clone(),
                        ty: field_type.to_string(),
                    });
                }
                self.format_value(inner_type, input, output, path, selections)
            }
            _ if input.is_null() => {
                *output = Value::Null;
                Ok(())
            }
            FieldType::List(inner_type) => {
                let input_array = input.as_array().ok_or_else(|| coercion_error("list"))?;
                let reuse = output
                    .as_array()
                    .is_some_and(|output_array| output_array.len() == input_array.len());
                if !reuse {
                    *output = Value::Array(vec![Value::Null; input_array.len()]);
                }
                let Value::Array(output_array) = output else {
                    return Ok(());
                };
                for (index, (element, output_element)) in
                    input_array.iter().zip(output_array.iter_mut()).enumerate()
                {
                    path.push(PathElement::Index(index));
                    self.format_value(inner_type, element, output_element, path, selections)?;
                    path.pop();
                }
                Ok(())
            }
            FieldType::Int => {
                match input.as_i64().and_then(|int| i32::try_from(int).ok()) {
                    Some(_) => *output = input.clone(),
                    None => return Err(coercion_error("Int")),
                }
                Ok(())
            }
            FieldType::Float => {
                match input.as_f64() {
                    Some(_) => *output = input.clone(),
                    None => return Err(coercion_error("Float")),
                }
                Ok(())
            }
            FieldType::Boolean => {
                match input {
                    Value::Bool(_) => *output = input.clone(),
                    _ => return Err(coercion_error("Boolean")),
                }
                Ok(())
            }
            FieldType::String => {
                match input {
                    Value::String(_) => *output = input.clone(),
                    _ => return Err(coercion_error("String")),
                }
                Ok(())
            }
            FieldType::Id => {
                match input {
                    Value::String(_) => *output = input.clone(),
                    Value::Number(number) if !number.is_f64() => {
                        *output = Value::String(number.to_string().into())
                    }
                    _ => return Err(coercion_error("ID")),
                }
                Ok(())
            }
            FieldType::Named(type_name) => match self.schema.type_definition(type_name) {
                Some(TypeDefinition::Enum(enum_type)) => {
                    match input.as_str() {
                        Some(value) if enum_type.values.contains(value) => *output = input.clone(),
                        _ => return Err(coercion_error(type_name)),
                    }
                    Ok(())
                }
                // we cannot know about the expected format of custom scalars
                Some(TypeDefinition::Scalar(_)) => {
                    *output = input.clone();
                    Ok(())
                }
                Some(definition) if definition.is_composite() => {
                    let input_object = input.as_object().ok_or_else(|| coercion_error("object"))?;
                    if !output.is_object() {
                        *output = Value::Object(Object::new());
                    }
                    let Value::Object(output_object) = output else {
                        return Ok(());
                    };
                    self.apply_selection_set(
                        selections,
                        input_object,
                        output_object,
                        path,
                        type_name,
                    )
                }
                _ => Err(MaterializeError::MalformedResponse {
                    reason: format!("type '{type_name}' cannot appear in a response"),
                }),
            },
        }
    }
}
