use chronicle_facts::{Fact, FactHash, FactReference, Scalar};
use chronicle_spec::Specification;

use crate::error::QueryError;
use crate::evaluator::Evaluator;
use crate::store::Store;

/// A handle to a nested `Specification` projection, bound to one row's
/// outer labels (spec §4.3, "lazy child handle"). Evaluating it runs the
/// same read the observer would perform when it recurses into a child
/// collection.
#[derive(Clone)]
pub struct LazyCollection<S: Store + Clone> {
    pub specification: Specification,
    pub given: Vec<FactReference>,
    pub(crate) evaluator: Evaluator<S>,
}

impl<S: Store + Clone> LazyCollection<S> {
    /// Evaluate the nested specification now.
    pub async fn evaluate(&self) -> Result<Vec<ProjectedRow<S>>, QueryError<S::Error>> {
        self.evaluator.read(&self.given, &self.specification).await
    }
}

/// One shaped output value of a [`Specification`]'s projection (spec §3).
pub enum ProjectedValue<S: Store + Clone> {
    Fact(Fact),
    Field(Scalar),
    Hash(FactHash),
    Composite(Vec<(String, ProjectedValue<S>)>),
    Collection(LazyCollection<S>),
}

/// One surviving binding, realized into its projection plus the identity
/// key the observer uses to track it (spec §3, "Observer result tree").
pub struct ProjectedRow<S: Store + Clone> {
    /// Hashes of the bound `Match` unknowns, in declared order.
    pub identity: Vec<FactHash>,
    /// The shaped output.
    pub value: ProjectedValue<S>,
}

impl<S: Store + Clone> Clone for ProjectedValue<S> {
    fn clone(&self) -> Self {
        match self {
            ProjectedValue::Fact(fact) => ProjectedValue::Fact(fact.clone()),
            ProjectedValue::Field(scalar) => ProjectedValue::Field(scalar.clone()),
            ProjectedValue::Hash(hash) => ProjectedValue::Hash(*hash),
            ProjectedValue::Composite(fields) => ProjectedValue::Composite(fields.clone()),
            ProjectedValue::Collection(collection) => ProjectedValue::Collection(collection.clone()),
        }
    }
}

impl<S: Store + Clone> Clone for ProjectedRow<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            value: self.value.clone(),
        }
    }
}
