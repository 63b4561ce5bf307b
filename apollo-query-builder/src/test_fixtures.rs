use apollo_compiler::ExecutableDocument;
use apollo_compiler::validation::Valid;

use crate::operation::Literal;
use crate::schema::ArgumentDefinition;
use crate::schema::EnumType;
use crate::schema::FieldDefinition;
use crate::schema::FieldType;
use crate::schema::InputObjectType;
use crate::schema::ObjectType;
use crate::schema::Schema;
use crate::schema::UnionType;

pub(crate) const STAR_WARS_SDL: &str = include_str!("../tests/fixtures/starwars.graphql");

fn unit() -> ArgumentDefinition {
    ArgumentDefinition::new("unit", FieldType::named("LengthUnit"))
        .default_value(Literal::enum_value("METER"))
}

fn id(name: &str) -> ArgumentDefinition {
    ArgumentDefinition::new(name, FieldType::Id.non_null())
}

fn character(name: &str) -> ObjectType {
    ObjectType::new(name)
        .field(FieldDefinition::new("id", FieldType::Id.non_null()))
        .field(FieldDefinition::new("name", FieldType::String.non_null()))
        .field(FieldDefinition::new("height", FieldType::Float).argument(unit()))
        .field(FieldDefinition::new(
            "friends",
            FieldType::named("Character").list(),
        ))
        .field(FieldDefinition::new(
            "appearsIn",
            FieldType::named("Episode").list().non_null(),
        ))
}

/// The Star Wars schema of `tests/fixtures/starwars.graphql`, built in code.
pub(crate) fn star_wars_schema() -> Schema {
    Schema::builder()
        .query_type("Query")
        .mutation_type("Mutation")
        .object(
            ObjectType::new("Query")
                .field(
                    FieldDefinition::new("hero", FieldType::named("Character")).argument(
                        ArgumentDefinition::new("episode", FieldType::named("Episode"))
                            .default_value(Literal::enum_value("NEWHOPE")),
                    ),
                )
                .field(FieldDefinition::new("human", FieldType::named("Human")).argument(id("id")))
                .field(FieldDefinition::new("droid", FieldType::named("Droid")).argument(id("id")))
                .field(
                    FieldDefinition::new("starship", FieldType::named("Starship"))
                        .argument(id("id")),
                )
                .field(
                    FieldDefinition::new("search", FieldType::named("SearchResult").list())
                        .argument(ArgumentDefinition::new("text", FieldType::String.non_null())),
                ),
        )
        .object(
            ObjectType::new("Mutation").field(
                FieldDefinition::new("createReview", FieldType::named("Review"))
                    .argument(ArgumentDefinition::new(
                        "episode",
                        FieldType::named("Episode"),
                    ))
                    .argument(ArgumentDefinition::new(
                        "review",
                        FieldType::named("ReviewInput").non_null(),
                    )),
            ),
        )
        .interface(character("Character"))
        .object(
            character("Human")
                .implements("Character")
                .field(FieldDefinition::new("homePlanet", FieldType::String))
                .field(FieldDefinition::new(
                    "starships",
                    FieldType::named("Starship").list(),
                ))
                .field(FieldDefinition::new("totalCredits", FieldType::Int)),
        )
        .object(
            character("Droid")
                .implements("Character")
                .field(FieldDefinition::new("primaryFunction", FieldType::String)),
        )
        .object(
            ObjectType::new("Starship")
                .field(FieldDefinition::new("id", FieldType::Id.non_null()))
                .field(FieldDefinition::new("name", FieldType::String.non_null()))
                .field(FieldDefinition::new("length", FieldType::Float).argument(unit())),
        )
        .object(
            ObjectType::new("Review")
                .field(FieldDefinition::new("episode", FieldType::named("Episode")))
                .field(FieldDefinition::new("stars", FieldType::Int.non_null()))
                .field(FieldDefinition::new("commentary", FieldType::String)),
        )
        .union(UnionType::new(
            "SearchResult",
            ["Human", "Droid", "Starship"],
        ))
        .input_object(
            InputObjectType::new("ReviewInput")
                .field(ArgumentDefinition::new("stars", FieldType::Int.non_null()))
                .field(ArgumentDefinition::new("commentary", FieldType::String)),
        )
        .enumeration(EnumType::new("Episode", ["NEWHOPE", "EMPIRE", "JEDI"]))
        .enumeration(EnumType::new("LengthUnit", ["METER", "FOOT"]))
        .build()
        .expect("the star wars schema is valid")
}

/// Validates a synthesized document against the Star Wars SDL.
pub(crate) fn assert_valid_document(document: &str) -> Valid<ExecutableDocument> {
    let schema = apollo_compiler::Schema::parse_and_validate(STAR_WARS_SDL, "schema.graphql")
        .expect("the star wars SDL is valid");
    match ExecutableDocument::parse_and_validate(&schema, document, "query.graphql") {
        Ok(document) => document,
        Err(invalid) => panic!("invalid document:\n{document}\n{}", invalid.errors),
    }
}
