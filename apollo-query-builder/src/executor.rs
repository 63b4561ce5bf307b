use std::sync::Arc;

use async_trait::async_trait;

use crate::compiler::CompiledQuery;
use crate::error::ExecutionError;
use crate::error::TransportError;
use crate::graphql;
use crate::json_ext::Object;
use crate::schema::Schema;

/// Sends a GraphQL request to a server.
///
/// Retries, backoff, connection pooling and cancellation all belong to implementations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: graphql::Request) -> Result<graphql::Response, TransportError>;
}

/// Attaches parameter values to a [`CompiledQuery`] and hands it to a [`Transport`].
#[derive(Clone)]
pub struct Executor {
    schema: Arc<Schema>,
    transport: Arc<dyn Transport>,
}

impl Executor {
    pub fn new(schema: Arc<Schema>, transport: Arc<dyn Transport>) -> Self {
        Self { schema, transport }
    }

    /// Maps parameter values, keyed by parameter name, to the document variables they supply.
    ///
    /// Every declared variable needs a value, and the value must be valid for the variable
    /// type.
    pub fn bind_variables(
        &self,
        query: &CompiledQuery,
        parameters: &Object,
    ) -> Result<Object, ExecutionError> {
        let mut variables = Object::with_capacity(query.variables.len());
        for declaration in &query.variables {
            let value = parameters
                .get(declaration.parameter.as_str())
                .ok_or_else(|| ExecutionError::MissingVariableValue {
                    variable: declaration.name.clone(),
                    parameter: declaration.parameter.clone(),
                })?;
            declaration
                .ty
                .validate_input_value(value, &self.schema)
                .map_err(|_| ExecutionError::InvalidVariableValue {
                    variable: declaration.name.clone(),
                    ty: declaration.ty.to_string(),
                })?;
            variables.insert(declaration.name.as_str(), value.clone());
        }
        Ok(variables)
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(operation = query.operation_name.as_deref())
    )]
    pub async fn execute(
        &self,
        query: &CompiledQuery,
        parameters: &Object,
    ) -> Result<graphql::Response, ExecutionError> {
        let variables = self.bind_variables(query, parameters)?;
        let request = graphql::Request::new(
            query.document.clone(),
            query.operation_name.clone(),
            variables,
        );
        let response = self.transport.send(request).await?;
        if !response.errors.is_empty() {
            tracing::debug!(errors = response.errors.len(), "response carries errors");
        }
        Ok(response)
    }
}
