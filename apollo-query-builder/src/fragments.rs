//! Lifts caller-marked reusable fragments into named fragment definitions.
//!
//! A marker becomes a fragment when its content is used from two or more places, or when the
//! caller named it. Every other marker is put back inline: spliced into the parent when it
//! targets the parent type, kept as an inline fragment otherwise. Unmarked duplication is
//! never lifted.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::CompileError;
use crate::operation::Field;
use crate::operation::FragmentDefinition;
use crate::operation::FragmentSpread;
use crate::operation::InlineFragment;
use crate::operation::ReusableFragment;
use crate::operation::Selection;
use crate::operation::SelectionSet;
use crate::shape::StructHasher;

/// Markers with the same explicit name and the same content.
type GroupKey = (Option<String>, Vec<u8>);

struct Group {
    type_condition: String,
    occurrences: usize,
}

/// Replaces extracted markers with spreads and returns the fragment definitions, in order of
/// first use, outer fragments first.
pub fn extract(
    mut selection_set: SelectionSet,
) -> Result<(SelectionSet, Vec<FragmentDefinition>), CompileError> {
    let mut groups = IndexMap::new();
    count(&selection_set.selections, &mut groups);

    let mut names = HashMap::new();
    let mut lifted = HashMap::new();
    for ((explicit_name, hash), group) in &groups {
        if explicit_name.is_none() && group.occurrences < 2 {
            continue;
        }
        let name = explicit_name
            .clone()
            .unwrap_or_else(|| derived_name(&group.type_condition, hash));
        if names.insert(name.clone(), hash.clone()).is_some() {
            return Err(CompileError::FragmentNameConflict { name });
        }
        lifted.insert((explicit_name.clone(), hash.clone()), name);
    }
    if !lifted.is_empty() {
        tracing::trace!(fragments = lifted.len(), "extracting fragments");
    }

    let mut extractor = Extractor {
        lifted,
        definitions: IndexMap::new(),
    };
    let selections = std::mem::take(&mut selection_set.selections);
    let root_type = selection_set.root_type.clone();
    selection_set.selections = extractor.rewrite(selections, &root_type);

    let fragments = extractor.definitions.into_values().flatten().collect();
    Ok((selection_set, fragments))
}

fn fragment_hash(fragment: &ReusableFragment) -> Vec<u8> {
    let mut hasher = StructHasher::new();
    fragment.type_condition.hash(&mut hasher);
    fragment.selections.hash(&mut hasher);
    hasher.finalize()
}

fn derived_name(type_condition: &str, hash: &[u8]) -> String {
    format!("{type_condition}Fragment_{}", hex::encode(&hash[..4]))
}

/// Counts marker occurrences. A marker repeating a group already seen is not descended into,
/// its content will only be written once.
fn count(selections: &[Selection], groups: &mut IndexMap<GroupKey, Group>) {
    for selection in selections {
        match selection {
            Selection::Field(Field { selections, .. })
            | Selection::InlineFragment(InlineFragment { selections, .. }) => {
                count(selections, groups)
            }
            Selection::FragmentSpread(_) => {}
            Selection::ReusableFragment(fragment) => {
                let key = (fragment.name.clone(), fragment_hash(fragment));
                let group = groups.entry(key).or_insert_with(|| Group {
                    type_condition: fragment.type_condition.clone(),
                    occurrences: 0,
                });
                group.occurrences += 1;
                if group.occurrences == 1 {
                    count(&fragment.selections, groups);
                }
            }
        }
    }
}

struct Extractor {
    lifted: HashMap<GroupKey, String>,
    /// Reserved on first use so outer fragments come before the ones they contain.
    definitions: IndexMap<String, Option<FragmentDefinition>>,
}

impl Extractor {
    fn rewrite(&mut self, selections: Vec<Selection>, parent_type: &str) -> Vec<Selection> {
        let mut rewritten = Vec::with_capacity(selections.len());
        for selection in selections {
            match selection {
                Selection::Field(mut field) => {
                    let selections = std::mem::take(&mut field.selections);
                    field.selections =
                        self.rewrite(selections, &field.field_type.inner_type_name().to_string());
                    rewritten.push(Selection::Field(field));
                }
                Selection::InlineFragment(InlineFragment {
                    type_condition,
                    selections,
                }) => {
                    let selections = self.rewrite(selections, &type_condition);
                    rewritten.push(Selection::InlineFragment(InlineFragment {
                        type_condition,
                        selections,
                    }));
                }
                Selection::FragmentSpread(spread) => {
                    rewritten.push(Selection::FragmentSpread(spread))
                }
                Selection::ReusableFragment(fragment) => {
                    let key = (fragment.name.clone(), fragment_hash(&fragment));
                    match self.lifted.get(&key).cloned() {
                        Some(name) => {
                            if !self.definitions.contains_key(&name) {
                                self.definitions.insert(name.clone(), None);
                                let selections =
                                    self.rewrite(fragment.selections, &fragment.type_condition);
                                self.definitions.insert(
                                    name.clone(),
                                    Some(FragmentDefinition {
                                        name: name.clone(),
                                        type_condition: fragment.type_condition.clone(),
                                        selections,
                                    }),
                                );
                            }
                            rewritten.push(Selection::FragmentSpread(FragmentSpread {
                                fragment_name: name,
                                type_condition: fragment.type_condition,
                            }));
                        }
                        None => {
                            let selections =
                                self.rewrite(fragment.selections, &fragment.type_condition);
                            if fragment.type_condition == parent_type {
                                rewritten.extend(selections);
                            } else {
                                rewritten.push(Selection::InlineFragment(InlineFragment {
                                    type_condition: fragment.type_condition,
                                    selections,
                                }));
                            }
                        }
                    }
                }
            }
        }
        rewritten
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::analyzer::analyze;
    use crate::shape::FragmentShape;
    use crate::shape::OperationShape;
    use crate::shape::SelectionShape;
    use crate::shape::field;
    use crate::shape::fragment;
    use crate::shape::named_fragment;
    use crate::shape::selection;
    use crate::test_fixtures::star_wars_schema;

    fn id_and_name() -> SelectionShape {
        selection().field(field("id")).field(field("name"))
    }

    fn heroes(
        empire: std::sync::Arc<FragmentShape>,
        jedi: std::sync::Arc<FragmentShape>,
    ) -> (SelectionSet, Vec<FragmentDefinition>) {
        let shape = OperationShape::query().select(
            selection()
                .field(
                    field("hero")
                        .alias("empireHero")
                        .argument("episode", crate::operation::Literal::enum_value("EMPIRE"))
                        .fragment(empire),
                )
                .field(
                    field("hero")
                        .alias("jediHero")
                        .argument("episode", crate::operation::Literal::enum_value("JEDI"))
                        .fragment(jedi),
                ),
        );
        extract(analyze(&star_wars_schema(), &shape, 512).unwrap()).unwrap()
    }

    fn spreads(selection_set: &SelectionSet) -> Vec<String> {
        let mut names = Vec::new();
        for selection in &selection_set.selections {
            if let Selection::Field(field) = selection {
                for selection in &field.selections {
                    if let Selection::FragmentSpread(spread) = selection {
                        names.push(spread.fragment_name.clone());
                    }
                }
            }
        }
        names
    }

    #[test]
    fn identical_markers_share_one_definition() {
        // two markers built separately, with identical content
        let (selection_set, fragments) = heroes(
            fragment("Character", id_and_name()),
            fragment("Character", id_and_name()),
        );
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].name.starts_with("CharacterFragment_"));
        assert_eq!(fragments[0].name.len(), "CharacterFragment_".len() + 8);
        assert_eq!(
            spreads(&selection_set),
            vec![fragments[0].name.clone(), fragments[0].name.clone()]
        );
    }

    #[test]
    fn single_anonymous_marker_is_inlined() {
        let (selection_set, fragments) = heroes(
            fragment("Character", id_and_name()),
            fragment("Character", selection().field(field("name"))),
        );
        assert!(fragments.is_empty());
        let Selection::Field(empire) = &selection_set.selections[0] else {
            panic!("expected a field");
        };
        let keys: Vec<_> = empire
            .selections
            .iter()
            .map(|selection| match selection {
                Selection::Field(field) => field.response_key().to_string(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(keys, ["id", "name"]);
    }

    #[test]
    fn named_markers_are_always_extracted() {
        let (selection_set, fragments) = heroes(
            named_fragment("comparisonFields", "Character", id_and_name()),
            fragment("Character", selection().field(field("name"))),
        );
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].name, "comparisonFields");
        assert_eq!(spreads(&selection_set), vec!["comparisonFields".to_string()]);
    }

    #[test]
    fn conflicting_names_are_rejected() {
        let error = extract(
            analyze(
                &star_wars_schema(),
                &OperationShape::query().select(
                    selection()
                        .field(
                            field("hero")
                                .fragment(named_fragment("heroFields", "Character", id_and_name())),
                        )
                        .field(field("hero").alias("other").fragment(named_fragment(
                            "heroFields",
                            "Character",
                            selection().field(field("name")),
                        ))),
                ),
                512,
            )
            .unwrap(),
        )
        .unwrap_err();
        assert_eq!(
            error,
            CompileError::FragmentNameConflict {
                name: "heroFields".to_string()
            }
        );
    }

    #[test]
    fn outer_fragments_are_defined_first() {
        let inner = named_fragment("friendFields", "Character", selection().field(field("name")));
        let outer = named_fragment(
            "heroFields",
            "Character",
            selection()
                .field(field("id"))
                .field(field("friends").fragment(inner)),
        );
        let (_, fragments) = heroes(outer.clone(), outer);
        let names: Vec<_> = fragments.iter().map(|fragment| fragment.name.as_str()).collect();
        assert_eq!(names, ["heroFields", "friendFields"]);
    }

    #[test]
    fn narrowing_marker_stays_conditional() {
        let shape = OperationShape::query().select(selection().field(
            field("hero").select(
                selection()
                    .field(field("name"))
                    .spread(fragment("Droid", selection().field(field("primaryFunction")))),
            ),
        ));
        let (selection_set, fragments) =
            extract(analyze(&star_wars_schema(), &shape, 512).unwrap()).unwrap();
        assert!(fragments.is_empty());
        let Selection::Field(hero) = &selection_set.selections[0] else {
            panic!("expected a field");
        };
        assert!(matches!(
            &hero.selections[1],
            Selection::InlineFragment(InlineFragment { type_condition, .. }) if type_condition == "Droid"
        ));
    }
}
