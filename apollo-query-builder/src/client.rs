use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::compiler::CompiledQuery;
use crate::compiler::QueryCompiler;
use crate::configuration::Configuration;
use crate::error::MaterializeError;
use crate::error::QueryError;
use crate::executor::Executor;
use crate::executor::Transport;
use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::materializer::materialize;
use crate::materializer::materialize_as;
use crate::schema::Schema;
use crate::shape::OperationShape;

/// Data materialized into the declared shape, with the errors the server reported next to it.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct TypedResponse<T> {
    pub data: T,
    /// Field errors that came with partial data.
    pub errors: Vec<graphql::Error>,
}

/// Compiles, executes and materializes operations against one schema.
#[derive(Clone)]
pub struct Client {
    compiler: Arc<QueryCompiler>,
    executor: Executor,
}

impl Client {
    pub fn new(
        schema: Arc<Schema>,
        transport: Arc<dyn Transport>,
        configuration: Configuration,
    ) -> Self {
        Self {
            compiler: Arc::new(QueryCompiler::new(schema.clone(), configuration)),
            executor: Executor::new(schema, transport),
        }
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Runs the operation and deserializes the materialized data into `T`.
    ///
    /// `parameters` are keyed by operation parameter name.
    pub async fn query<T: DeserializeOwned>(
        &self,
        shape: &OperationShape,
        parameters: &Object,
    ) -> Result<TypedResponse<T>, QueryError> {
        let compiled = self.compiler.compile(shape).await?;
        self.run(&compiled, parameters, |schema, data| {
            materialize_as(schema, &compiled.selection_set, &compiled.fragments, data)
        })
        .await
    }

    /// Same as [`Client::query`], but compiles the shape again on every call.
    pub async fn query_uncached<T: DeserializeOwned>(
        &self,
        shape: &OperationShape,
        parameters: &Object,
    ) -> Result<TypedResponse<T>, QueryError> {
        let compiled = self.compiler.compile_uncached(shape)?;
        self.run(&compiled, parameters, |schema, data| {
            materialize_as(schema, &compiled.selection_set, &compiled.fragments, data)
        })
        .await
    }

    /// Runs the operation and returns the materialized data as JSON.
    pub async fn query_value(
        &self,
        shape: &OperationShape,
        parameters: &Object,
    ) -> Result<TypedResponse<Value>, QueryError> {
        let compiled = self.compiler.compile(shape).await?;
        self.run(&compiled, parameters, |schema, data| {
            materialize(schema, &compiled.selection_set, &compiled.fragments, data)
        })
        .await
    }

    async fn run<T>(
        &self,
        compiled: &CompiledQuery,
        parameters: &Object,
        materialize: impl FnOnce(&Schema, &Value) -> Result<T, MaterializeError>,
    ) -> Result<TypedResponse<T>, QueryError> {
        let response = self.executor.execute(compiled, parameters).await?;
        if response.has_no_data() {
            let errors = if response.errors.is_empty() {
                vec![graphql::Error::new(
                    "response contains neither data nor errors",
                )]
            } else {
                response.errors
            };
            return Err(QueryError::GraphQL(errors));
        }
        let data = response.data.unwrap_or_default();
        if !response.errors.is_empty() {
            tracing::warn!(
                operation = compiled.operation_name.as_deref(),
                errors = response.errors.len(),
                "partial data returned with errors"
            );
        }
        Ok(TypedResponse {
            data: materialize(self.compiler.schema().as_ref(), &data)?,
            errors: response.errors,
        })
    }
}
