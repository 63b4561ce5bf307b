use std::sync::Arc;

use apollo_query_builder::Client;
use apollo_query_builder::CompileError;
use apollo_query_builder::Configuration;
use apollo_query_builder::MaterializeError;
use apollo_query_builder::QueryCompiler;
use apollo_query_builder::QueryError;
use apollo_query_builder::Schema;
use apollo_query_builder::Transport;
use apollo_query_builder::TransportError;
use apollo_query_builder::graphql;
use apollo_query_builder::json_ext::Object;
use apollo_query_builder::operation::Literal;
use apollo_query_builder::shape::OperationShape;
use apollo_query_builder::shape::field;
use apollo_query_builder::shape::fragment;
use apollo_query_builder::shape::named_fragment;
use apollo_query_builder::shape::parameter;
use apollo_query_builder::shape::selection;
use async_trait::async_trait;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json_bytes::Value;
use serde_json_bytes::json;
use test_log::test;

mockall::mock! {
    Server {}

    #[async_trait]
    impl Transport for Server {
        async fn send(
            &self,
            request: graphql::Request,
        ) -> Result<graphql::Response, TransportError>;
    }
}

fn schema() -> Arc<Schema> {
    Arc::new(Schema::parse(include_str!("fixtures/starwars.graphql")).unwrap())
}

fn compiler() -> Arc<QueryCompiler> {
    Arc::new(QueryCompiler::new(schema(), Configuration::default()))
}

/// A server that answers every request with the same data.
fn replying(data: Value) -> Client {
    let mut server = MockServer::new();
    server
        .expect_send()
        .returning(move |_| Ok(graphql::Response::from_data(data.clone())));
    Client::new(schema(), Arc::new(server), Configuration::default())
}

fn hero_shape() -> OperationShape {
    OperationShape::query().name("Heroes").select(
        selection()
            .field(
                field("hero").select(
                    selection()
                        .field(field("id"))
                        .field(field("name"))
                        .field(field("appearsIn"))
                        .field(field("friends").select(selection().field(field("name"))))
                        .on("Droid", selection().field(field("primaryFunction")))
                        .on(
                            "Human",
                            selection()
                                .field(field("height").argument("unit", Literal::enum_value("FOOT")))
                                .field(field("starships").select(selection().field(field("name")))),
                        ),
                ),
            )
            .field(
                field("hero")
                    .alias("empireHero")
                    .positional(Literal::enum_value("EMPIRE"))
                    .select(selection().field(field("name"))),
            ),
    )
}

#[test(tokio::test)]
async fn response_round_trips_into_the_declared_shape() {
    let response = json!({
        "empireHero": {"name": "Luke Skywalker"},
        "hero": {
            "__typename": "Droid",
            "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"],
            "friends": [{"name": "Luke Skywalker"}, {"name": "Han Solo"}],
            "id": "2001",
            "name": "R2-D2",
            "primaryFunction": "Astromech",
        },
    });
    let client = replying(response);

    let materialized = client
        .query_value(&hero_shape(), &Object::new())
        .await
        .unwrap();
    assert_eq!(
        materialized.data,
        json!({
            "hero": {
                "id": "2001",
                "name": "R2-D2",
                "appearsIn": ["NEWHOPE", "EMPIRE", "JEDI"],
                "friends": [{"name": "Luke Skywalker"}, {"name": "Han Solo"}],
                "primaryFunction": "Astromech",
            },
            "empireHero": {"name": "Luke Skywalker"},
        })
    );
}

#[test(tokio::test)]
async fn typed_round_trip() {
    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Friend {
        name: String,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Hero {
        id: String,
        name: String,
        appears_in: Vec<Option<String>>,
        friends: Option<Vec<Option<Friend>>>,
        height: Option<f64>,
        starships: Option<Vec<Option<Friend>>>,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Data {
        hero: Option<Hero>,
        empire_hero: Option<Friend>,
    }

    let client = replying(json!({
        "hero": {
            "__typename": "Human",
            "id": 1000,
            "name": "Luke Skywalker",
            "appearsIn": ["NEWHOPE"],
            "friends": null,
            "height": 5.6,
            "starships": [{"name": "X-Wing"}, null],
        },
        "empireHero": null,
    }));

    let response = client
        .query::<Data>(&hero_shape(), &Object::new())
        .await
        .unwrap();
    assert_eq!(
        response.data,
        Data {
            hero: Some(Hero {
                id: "1000".to_string(),
                name: "Luke Skywalker".to_string(),
                appears_in: vec![Some("NEWHOPE".to_string())],
                friends: None,
                height: Some(5.6),
                starships: Some(vec![
                    Some(Friend {
                        name: "X-Wing".to_string()
                    }),
                    None
                ]),
            }),
            empire_hero: None,
        }
    );
}

#[test(tokio::test)]
async fn same_shape_compiles_once() {
    let compiler = compiler();
    let first = compiler.compile(&hero_shape()).await.unwrap();
    let second = compiler.compile(&hero_shape()).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(compiler.compilation_count(), 1);

    let uncached = compiler.compile_uncached(&hero_shape()).unwrap();
    assert_eq!(uncached.document, first.document);
    assert_eq!(uncached.shape_key, first.shape_key);
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_first_compilations_are_single_flight() {
    let compiler = compiler();
    let start = Arc::new(tokio::sync::Barrier::new(16));
    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let compiler = compiler.clone();
            let start = start.clone();
            tokio::spawn(async move {
                start.wait().await;
                compiler.compile(&hero_shape()).await.unwrap()
            })
        })
        .collect();
    let mut documents = Vec::new();
    for task in tasks {
        documents.push(task.await.unwrap().document.clone());
    }
    assert_eq!(compiler.compilation_count(), 1);
    assert!(documents.iter().all(|document| document == &documents[0]));
}

#[test(tokio::test)]
async fn aliases_keep_results_apart() {
    let shape = |alias: Option<&str>| {
        let jedi = field("hero")
            .argument("episode", Literal::enum_value("JEDI"))
            .select(selection().field(field("name")));
        OperationShape::query().select(
            selection()
                .field(field("hero").select(selection().field(field("name"))))
                .field(match alias {
                    Some(alias) => jedi.alias(alias),
                    None => jedi,
                }),
        )
    };

    let compiler = compiler();
    let compiled = compiler.compile(&shape(Some("jediHero"))).await.unwrap();
    assert!(compiled.document.contains("jediHero: hero(episode: JEDI)"));

    let client = replying(json!({
        "jediHero": {"name": "Luke Skywalker"},
        "hero": {"name": "R2-D2"},
    }));
    let response = client
        .query_value(&shape(Some("jediHero")), &Object::new())
        .await
        .unwrap();
    assert_eq!(
        response.data,
        json!({"hero": {"name": "R2-D2"}, "jediHero": {"name": "Luke Skywalker"}})
    );

    assert_eq!(
        compiler.compile(&shape(None)).await.unwrap_err(),
        CompileError::AmbiguousSelection {
            response_key: "hero".to_string(),
            parent_type: "Query".to_string(),
        }
    );
}

#[test(tokio::test)]
async fn defaults_are_left_to_the_server() {
    let compiler = compiler();
    let hero = |episode: Option<&str>| {
        let hero = field("hero").select(selection().field(field("name")));
        OperationShape::query().select(selection().field(match episode {
            Some(episode) => hero.positional(Literal::enum_value(episode)),
            None => hero,
        }))
    };

    let default = compiler.compile(&hero(None)).await.unwrap();
    assert!(default.document.contains("hero {"));
    assert!(!default.document.contains("episode"));

    let jedi = compiler.compile(&hero(Some("JEDI"))).await.unwrap();
    assert!(jedi.document.contains("hero(episode: JEDI)"));
}

#[test(tokio::test)]
async fn shared_fragment_is_defined_once() {
    let compiler = compiler();
    let character = named_fragment(
        "CharacterFields",
        "Character",
        selection().field(field("id")).field(field("name")),
    );
    let shape = OperationShape::query().select(
        selection()
            .field(field("hero").fragment(character.clone()))
            .field(
                field("hero")
                    .alias("jedi")
                    .argument("episode", Literal::enum_value("JEDI"))
                    .fragment(character),
            ),
    );

    let compiled = compiler.compile(&shape).await.unwrap();
    assert_eq!(compiled.document.matches("fragment ").count(), 1);
    assert_eq!(compiled.document.matches("...CharacterFields").count(), 2);
    assert_snapshot!(compiled.document, @r###"
    query {
      hero {
        ...CharacterFields
      }
      jedi: hero(episode: JEDI) {
        ...CharacterFields
      }
    }

    fragment CharacterFields on Character {
      id
      name
    }
    "###);

    let client = replying(json!({
        "hero": {"id": "2001", "name": "R2-D2"},
        "jedi": {"id": "1000", "name": "Luke Skywalker"},
    }));
    let response = client.query_value(&shape, &Object::new()).await.unwrap();
    assert_eq!(
        response.data,
        json!({
            "hero": {"id": "2001", "name": "R2-D2"},
            "jedi": {"id": "1000", "name": "Luke Skywalker"},
        })
    );
}

#[test(tokio::test)]
async fn anonymous_fragment_used_twice_is_extracted() {
    let compiler = compiler();
    let character = fragment("Character", selection().field(field("name")));
    let shape = OperationShape::query().select(
        selection()
            .field(field("hero").fragment(character.clone()))
            .field(
                field("hero")
                    .alias("empire")
                    .positional(Literal::enum_value("EMPIRE"))
                    .fragment(character),
            ),
    );
    let compiled = compiler.compile(&shape).await.unwrap();
    assert_eq!(compiled.fragments.len(), 1);
    assert_eq!(compiled.document.matches("...CharacterFragment_").count(), 2);
}

#[test(tokio::test)]
async fn parameters_become_typed_variables() {
    let shape = OperationShape::query().name("Search").parameter("text").select(
        selection().field(
            field("search")
                .argument("text", parameter("text"))
                .select(selection().field(field("__typename"))),
        ),
    );

    let mut server = MockServer::new();
    server
        .expect_send()
        .times(1)
        .withf(|request| {
            request.operation_name.as_deref() == Some("Search")
                && request.variables.get("search_text") == Some(&json!("wing"))
        })
        .returning(|_| {
            Ok(graphql::Response::from_data(json!({
                "search": [{"__typename": "Starship"}, {"__typename": "Human"}],
            })))
        });
    let client = Client::new(schema(), Arc::new(server), Configuration::default());

    let compiled = client.compiler().compile(&shape).await.unwrap();
    assert!(compiled.document.starts_with("query Search($search_text: String!) {"));
    assert!(compiled.document.contains("search(text: $search_text)"));
    assert_eq!(compiled.variables.len(), 1);
    assert_eq!(compiled.variables[0].name, "search_text");
    assert_eq!(compiled.variables[0].ty.to_string(), "String!");

    let mut parameters = Object::new();
    parameters.insert("text", json!("wing"));
    let response = client.query_value(&shape, &parameters).await.unwrap();
    assert_eq!(
        response.data,
        json!({"search": [{"__typename": "Starship"}, {"__typename": "Human"}]})
    );
}

#[test(tokio::test)]
async fn missing_parameter_values_never_reach_the_server() {
    let shape = OperationShape::query().parameter("id").select(
        selection().field(
            field("droid")
                .argument("id", parameter("id"))
                .select(selection().field(field("name"))),
        ),
    );
    let mut server = MockServer::new();
    server.expect_send().never();
    let client = Client::new(schema(), Arc::new(server), Configuration::default());

    let error = client
        .query_value(&shape, &Object::new())
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "no value supplied for variable '$droid_id' (bound to parameter 'id')"
    );
}

#[test(tokio::test)]
async fn missing_non_null_field_fails_but_null_nullable_field_succeeds() {
    let shape = OperationShape::query().select(
        selection().field(
            field("hero").select(selection().field(field("name")).field(field("height"))),
        ),
    );

    let client = replying(json!({"hero": {"height": 1.72}}));
    let error = client
        .query_value(&shape, &Object::new())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        QueryError::Materialize(MaterializeError::MissingResponseField { ref field, ref path })
            if field == "Character.name" && path.to_string() == "/hero/name"
    ));

    let client = replying(json!({"hero": {"name": "Luke Skywalker", "height": null}}));
    let response = client.query_value(&shape, &Object::new()).await.unwrap();
    assert_eq!(
        response.data,
        json!({"hero": {"name": "Luke Skywalker", "height": null}})
    );
}

#[test(tokio::test)]
async fn mutations_render_input_objects_inline() {
    let compiler = compiler();
    let shape = OperationShape::mutation().select(
        selection().field(
            field("createReview")
                .argument("episode", Literal::enum_value("JEDI"))
                .argument(
                    "review",
                    Literal::Object(
                        [
                            ("stars".to_string(), Literal::from(5)),
                            ("commentary".to_string(), Literal::from("great")),
                        ]
                        .into_iter()
                        .collect(),
                    ),
                )
                .select(selection().field(field("stars"))),
        ),
    );
    let compiled = compiler.compile(&shape).await.unwrap();
    assert!(compiled.document.starts_with("mutation {"));
    assert!(
        compiled
            .document
            .contains(r#"createReview(episode: JEDI, review: {stars: 5, commentary: "great"})"#)
    );
}

#[test(tokio::test)]
async fn transport_failures_are_propagated() {
    let mut server = MockServer::new();
    server
        .expect_send()
        .times(1)
        .returning(|_| Err(TransportError::new("connection refused")));
    let client = Client::new(schema(), Arc::new(server), Configuration::default());

    let error = client
        .query_value(&hero_shape(), &Object::new())
        .await
        .unwrap_err();
    assert!(matches!(error, QueryError::Execution(_)));
    assert_eq!(error.to_string(), "transport failure: connection refused");
}
