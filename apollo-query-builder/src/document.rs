//! Renders an extracted, lifted operation as GraphQL document text.
//!
//! Selections keep the order they were declared in, arguments keep schema declaration order
//! and omitted arguments are left out. Fragment definitions follow the operation, once each.

use std::fmt;
use std::fmt::Write;

use crate::display_helpers::DisplayParenthesized;
use crate::display_helpers::State;
use crate::display_helpers::write_indented_lines;
use crate::error::CompileError;
use crate::operation::ArgumentValue;
use crate::operation::Field;
use crate::operation::FieldArgument;
use crate::operation::FragmentDefinition;
use crate::operation::FragmentSpread;
use crate::operation::InlineFragment;
use crate::operation::Selection;
use crate::operation::SelectionSet;
use crate::operation::VariableDeclaration;

/// Renders the document text.
///
/// Fails when a reusable fragment was not extracted, a spread points at no definition, or an
/// argument is still bound to a parameter or unbound: each is a defect of an earlier stage.
pub fn synthesize(
    selection_set: &SelectionSet,
    fragments: &[FragmentDefinition],
    variables: &[VariableDeclaration],
    pretty: bool,
) -> Result<String, CompileError> {
    check_resolved(&selection_set.selections, fragments)?;
    for fragment in fragments {
        check_resolved(&fragment.selections, fragments)?;
    }

    let document = Document {
        selection_set,
        fragments,
        variables,
        pretty,
    };
    let mut text = String::new();
    write!(text, "{document}").map_err(|_| CompileError::UnresolvedFragment {
        type_condition: selection_set.root_type.clone(),
    })?;
    Ok(text)
}

fn check_resolved(
    selections: &[Selection],
    fragments: &[FragmentDefinition],
) -> Result<(), CompileError> {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                for argument in &field.arguments {
                    if matches!(
                        argument.value,
                        ArgumentValue::Unbound | ArgumentValue::Parameter(_)
                    ) {
                        return Err(CompileError::UnresolvedArgument {
                            field: field.coordinate(),
                            argument: argument.name.clone(),
                        });
                    }
                }
                check_resolved(&field.selections, fragments)?;
            }
            Selection::InlineFragment(inline) => check_resolved(&inline.selections, fragments)?,
            Selection::FragmentSpread(spread) => {
                if !fragments
                    .iter()
                    .any(|fragment| fragment.name == spread.fragment_name)
                {
                    return Err(CompileError::UnresolvedFragment {
                        type_condition: spread.type_condition.clone(),
                    });
                }
            }
            Selection::ReusableFragment(fragment) => {
                return Err(CompileError::UnresolvedFragment {
                    type_condition: fragment.type_condition.clone(),
                });
            }
        }
    }
    Ok(())
}

struct Document<'a> {
    selection_set: &'a SelectionSet,
    fragments: &'a [FragmentDefinition],
    variables: &'a [VariableDeclaration],
    pretty: bool,
}

impl fmt::Display for Document<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = State::new(f, self.pretty);
        state.write(self.selection_set.operation_type)?;
        if let Some(name) = &self.selection_set.operation_name {
            write!(state, " {name}")?;
        }
        let variables: Vec<_> = self
            .variables
            .iter()
            .map(|variable| format!("${}: {}", variable.name, variable.ty))
            .collect();
        write!(state, "{} ", DisplayParenthesized(&variables))?;
        write_selections(&mut state, &self.selection_set.selections)?;

        for fragment in self.fragments {
            state.blank_line()?;
            write!(
                state,
                "fragment {} on {} ",
                fragment.name, fragment.type_condition
            )?;
            write_selections(&mut state, &fragment.selections)?;
        }
        Ok(())
    }
}

fn write_selections(state: &mut State<'_, '_>, selections: &[Selection]) -> fmt::Result {
    state.write("{")?;
    write_indented_lines(state, selections, write_selection)?;
    state.write("}")
}

fn write_selection(state: &mut State<'_, '_>, selection: &Selection) -> fmt::Result {
    match selection {
        Selection::Field(field) => write_field(state, field),
        Selection::FragmentSpread(FragmentSpread { fragment_name, .. }) => {
            write!(state, "...{fragment_name}")
        }
        Selection::InlineFragment(InlineFragment {
            type_condition,
            selections,
        }) => {
            write!(state, "... on {type_condition} ")?;
            write_selections(state, selections)
        }
        Selection::ReusableFragment(_) => Err(fmt::Error),
    }
}

fn write_field(state: &mut State<'_, '_>, field: &Field) -> fmt::Result {
    if let Some(alias) = &field.alias {
        write!(state, "{alias}: ")?;
    }
    let arguments = field
        .arguments
        .iter()
        .filter_map(argument)
        .collect::<Result<Vec<_>, _>>()?;
    write!(state, "{}{}", field.name, DisplayParenthesized(&arguments))?;
    if !field.selections.is_empty() {
        state.write(" ")?;
        write_selections(state, &field.selections)?;
    }
    Ok(())
}

fn argument(argument: &FieldArgument) -> Option<Result<String, fmt::Error>> {
    match &argument.value {
        ArgumentValue::Literal(literal) => Some(Ok(format!("{}: {literal}", argument.name))),
        ArgumentValue::Variable(variable) => Some(Ok(format!("{}: ${variable}", argument.name))),
        ArgumentValue::Default => None,
        ArgumentValue::Parameter(_) | ArgumentValue::Unbound => Some(Err(fmt::Error)),
    }
}
