use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Instant;

use serde::Serialize;

use crate::analyzer::analyze;
use crate::cache::DeduplicatingCache;
use crate::cache::WaitError;
use crate::configuration::Configuration;
use crate::document::synthesize;
use crate::error::CompileError;
use crate::fragments::extract;
use crate::operation::FragmentDefinition;
use crate::operation::SelectionSet;
use crate::operation::VariableDeclaration;
use crate::schema::Schema;
use crate::shape::OperationShape;
use crate::shape::ShapeKey;
use crate::variables::lift;

/// The immutable result of compiling one shape.
///
/// It is reused for every call with that shape, only the variable values change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct CompiledQuery {
    /// The GraphQL document text.
    pub document: String,
    pub operation_name: Option<String>,
    /// Variables in declaration order, each tied to the operation parameter supplying it.
    pub variables: Vec<VariableDeclaration>,
    /// The selections the response is materialized against.
    pub selection_set: SelectionSet,
    pub fragments: Vec<FragmentDefinition>,
    pub shape_key: ShapeKey,
}

/// Compiles [`OperationShape`]s into [`CompiledQuery`]s, once per distinct shape.
pub struct QueryCompiler {
    schema: Arc<Schema>,
    configuration: Configuration,
    cache: DeduplicatingCache<ShapeKey, Arc<CompiledQuery>, CompileError>,
    compilations: AtomicUsize,
}

impl QueryCompiler {
    pub fn new(schema: Arc<Schema>, configuration: Configuration) -> Self {
        Self {
            schema,
            configuration,
            cache: DeduplicatingCache::new(),
            compilations: AtomicUsize::new(0),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the compiled query for this shape, compiling it on first use.
    ///
    /// Concurrent first uses of one shape share a single compilation. Failed compilations are
    /// not cached. With the cache disabled every call compiles.
    #[tracing::instrument(skip_all, level = "debug", fields(operation = shape.operation_name()))]
    pub async fn compile(&self, shape: &OperationShape) -> Result<Arc<CompiledQuery>, CompileError> {
        if !self.configuration.cache.enabled {
            return self.compile_uncached(shape).map(Arc::new);
        }

        let key = shape.shape_key();
        loop {
            let entry = self.cache.get(&key);
            if entry.is_first() {
                tracing::debug!(%key, "compilation cache miss");
                return match self.compile_uncached(shape) {
                    Ok(compiled) => {
                        let compiled = Arc::new(compiled);
                        entry.insert(compiled.clone());
                        Ok(compiled)
                    }
                    Err(error) => {
                        entry.error(error.clone());
                        Err(error)
                    }
                };
            }

            match entry.get().await {
                Ok(compiled) => {
                    tracing::debug!(%key, "compilation cache hit");
                    return Ok(compiled);
                }
                Err(WaitError::Failed(error)) => return Err(error),
                Err(WaitError::Abandoned) => {
                    tracing::debug!(%key, "in flight compilation was abandoned, retrying");
                }
            }
        }
    }

    /// Runs every compilation stage, bypassing the cache.
    pub fn compile_uncached(&self, shape: &OperationShape) -> Result<CompiledQuery, CompileError> {
        self.compilations.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let selection_set = analyze(&self.schema, shape, self.configuration.recursion_limit)?;
        let (mut selection_set, mut fragments) = extract(selection_set)?;
        let variables = lift(&mut selection_set, &mut fragments);
        let document = synthesize(
            &selection_set,
            &fragments,
            &variables,
            self.configuration.document.pretty,
        )?;

        tracing::trace!(
            elapsed = ?start.elapsed(),
            fragments = fragments.len(),
            variables = variables.len(),
            "compiled operation"
        );
        Ok(CompiledQuery {
            document,
            operation_name: selection_set.operation_name.clone(),
            variables,
            selection_set,
            fragments,
            shape_key: shape.shape_key(),
        })
    }

    /// How many times the compilation stages ran.
    pub fn compilation_count(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// How many distinct shapes are cached.
    pub fn cached_shapes(&self) -> usize {
        self.cache.len()
    }
}
