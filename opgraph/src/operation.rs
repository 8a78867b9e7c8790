use std::fmt::Debug;
use std::sync::Arc;

use common::id_type;

id_type!(OperationId);

/// The graph node that produces value nodes as outputs.
pub trait Operation: Debug + Send + Sync {
    fn id(&self) -> OperationId;
    fn type_name(&self) -> &str;

    /// Number of outputs, when the operation already knows it.
    /// Roles are often bound before the output list is filled in.
    fn output_arity(&self) -> Option<usize> {
        None
    }
}

pub type OperationRef = Arc<dyn Operation>;

/// Binds a value node as the `index`-th output of `owner`.
#[derive(Clone, Debug)]
pub struct Role {
    pub owner: OperationRef,
    pub index: usize,
}

impl Role {
    pub fn new(owner: OperationRef, index: usize) -> Self {
        Role { owner, index }
    }

    pub fn owner_id(&self) -> OperationId {
        self.owner.id()
    }

    /// Same owner (by id) and same index.
    pub fn same_binding(&self, other: &Role) -> bool {
        self.owner.id() == other.owner.id() && self.index == other.index
    }
}
