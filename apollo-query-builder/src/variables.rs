//! Replaces parameter-bound arguments with document variables.
//!
//! Variables are named after the response path of their field and the argument,
//! `<path>_<argument>`, with `_2`, `_3`... appended on collision. Inside a fragment definition
//! the path starts at the fragment name. The variable type is the argument's declared type.

use std::collections::HashSet;

use crate::operation::ArgumentValue;
use crate::operation::FragmentDefinition;
use crate::operation::InlineFragment;
use crate::operation::ReusableFragment;
use crate::operation::Selection;
use crate::operation::SelectionSet;
use crate::operation::VariableDeclaration;

/// Lifts every [`ArgumentValue::Parameter`] of the operation and its fragments, returning the
/// variable declarations in order of appearance.
pub fn lift(
    selection_set: &mut SelectionSet,
    fragments: &mut [FragmentDefinition],
) -> Vec<VariableDeclaration> {
    let mut lifter = Lifter::default();
    let mut path = Vec::new();
    lifter.selections(&mut selection_set.selections, &mut path);
    for fragment in fragments {
        let mut path = vec![fragment.name.clone()];
        lifter.selections(&mut fragment.selections, &mut path);
    }
    lifter.declarations
}

#[derive(Default)]
struct Lifter {
    names: HashSet<String>,
    declarations: Vec<VariableDeclaration>,
}

impl Lifter {
    fn selections(&mut self, selections: &mut [Selection], path: &mut Vec<String>) {
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    path.push(field.response_key().to_string());
                    for argument in &mut field.arguments {
                        if let ArgumentValue::Parameter(parameter) = &argument.value {
                            let name = self
                                .unique_name(format!("{}_{}", path.join("_"), argument.name));
                            self.declarations.push(VariableDeclaration {
                                name: name.clone(),
                                ty: argument.ty.clone(),
                                parameter: parameter.clone(),
                            });
                            argument.value = ArgumentValue::Variable(name);
                        }
                    }
                    self.selections(&mut field.selections, path);
                    path.pop();
                }
                Selection::InlineFragment(InlineFragment { selections, .. })
                | Selection::ReusableFragment(ReusableFragment { selections, .. }) => {
                    self.selections(selections, path)
                }
                Selection::FragmentSpread(_) => {}
            }
        }
    }

    fn unique_name(&mut self, base: String) -> String {
        let mut name = base.clone();
        let mut index = 2;
        while !self.names.insert(name.clone()) {
            name = format!("{base}_{index}");
            index += 1;
        }
        name
    }
}
