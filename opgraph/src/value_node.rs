use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::trace;
use strum_macros::Display as StrumDisplay;

use crate::error::{RoleConflict, ValueError, ValueResult};
use crate::host::HostValue;
use crate::kind::ValueKind;
use crate::operation::{OperationId, OperationRef, Role};
use common::id_type;

id_type!(ValueId);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, StrumDisplay)]
pub enum ValueState {
    /// No meaningful data present.
    #[default]
    Empty,
    /// Native storage reserved by the executor; contents are not the owner's output.
    Allocated,
    /// Data slot holds the owner's validated output.
    Computed,
}

/// One piece of data flowing between operations.
///
/// Equality and hashing use the node's identity only, so nodes key maps by
/// graph position. The type is deliberately not `Clone`; see [`ValueNode::clone_unbound`].
pub struct ValueNode {
    id: ValueId,
    kind: Arc<dyn ValueKind>,
    role: Option<Role>,
    data: Option<HostValue>,
    state: ValueState,
    name: Option<String>,
}

impl ValueNode {
    pub fn new(
        kind: Arc<dyn ValueKind>,
        role: Option<Role>,
        name: Option<String>,
    ) -> ValueResult<ValueNode> {
        let mut node = ValueNode {
            id: ValueId::unique(),
            kind,
            role: None,
            data: None,
            state: ValueState::Empty,
            name: None,
        };
        if let Some(role) = role {
            node.set_role(role.owner, role.index)?;
        }
        node.set_name(name)?;

        Ok(node)
    }

    pub fn id(&self) -> ValueId {
        self.id
    }

    pub fn kind(&self) -> &dyn ValueKind {
        self.kind.as_ref()
    }

    pub fn kind_arc(&self) -> &Arc<dyn ValueKind> {
        &self.kind
    }

    pub fn state(&self) -> ValueState {
        self.state
    }

    // role

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    /// Binds this node as output `index` of `owner`.
    ///
    /// Rebinding to the same owner and index is a no-op; anything else once
    /// bound is an `OwnershipConflict`.
    pub fn set_role(&mut self, owner: OperationRef, index: usize) -> ValueResult<()> {
        let requested = Role::new(owner, index);

        if let Some(existing) = &self.role {
            if existing.same_binding(&requested) {
                return Ok(());
            }
            let conflict = if existing.owner_id() != requested.owner_id() {
                RoleConflict::DifferentOwner {
                    existing: existing.owner_id(),
                    requested: requested.owner_id(),
                }
            } else {
                RoleConflict::DifferentIndex {
                    existing: existing.index,
                    requested: index,
                }
            };
            return Err(ValueError::OwnershipConflict {
                value: self.name(),
                conflict,
            });
        }

        if let Some(arity) = requested.owner.output_arity() {
            if index >= arity {
                return Err(ValueError::InvalidArgument(format!(
                    "output index {index} is out of range for {} with {arity} outputs",
                    requested.owner.type_name()
                )));
            }
        }

        trace!(
            "Value {} bound as output {} of {} {}",
            self.id,
            index,
            requested.owner.type_name(),
            requested.owner_id()
        );
        self.role = Some(requested);

        Ok(())
    }

    pub fn owner(&self) -> Option<&OperationRef> {
        self.role.as_ref().map(|role| &role.owner)
    }

    pub fn owner_id(&self) -> Option<OperationId> {
        self.role.as_ref().map(Role::owner_id)
    }

    pub fn index(&self) -> Option<usize> {
        self.role.as_ref().map(|role| role.index)
    }

    // data

    pub fn data(&self) -> Option<&HostValue> {
        self.data.as_ref()
    }

    /// Stores `value` after running it through the kind's filter.
    ///
    /// `None` empties the slot. Storing the object already held does nothing.
    /// Kinds without a filter accept data unchanged. A rejected value leaves
    /// the node untouched.
    pub fn set_data(&mut self, value: Option<HostValue>) -> ValueResult<()> {
        let Some(value) = value else {
            self.data = None;
            self.state = ValueState::Empty;
            return Ok(());
        };

        if self
            .data
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&value))
        {
            return Ok(());
        }

        let value = match self.kind.filter(value.clone()) {
            Ok(filtered) => filtered,
            Err(ValueError::UnsupportedCapability { .. }) => value,
            Err(err) => return Err(err),
        };

        self.data = Some(value);
        self.state = ValueState::Computed;

        Ok(())
    }

    /// Narrow interface for the executor that reserves native storage.
    pub fn storage(&mut self) -> StorageHandle<'_> {
        StorageHandle { node: self }
    }

    // name

    /// The explicit name, or `<owner-type>.<index>` when bound, or `anonymous`.
    pub fn name(&self) -> String {
        match (&self.name, &self.role) {
            (Some(name), _) => name.clone(),
            (None, Some(role)) => format!("{}.{}", role.owner.type_name(), role.index),
            (None, None) => "anonymous".to_string(),
        }
    }

    pub fn explicit_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) -> ValueResult<()> {
        if let Some(name) = &name {
            if name.is_empty() {
                return Err(ValueError::InvalidArgument(
                    "value name must not be empty".to_string(),
                ));
            }
            if name.chars().any(char::is_control) {
                return Err(ValueError::InvalidArgument(format!(
                    "value name {name:?} contains control characters"
                )));
            }
        }
        self.name = name;

        Ok(())
    }

    // structure

    /// Compares configuration with `other`, ignoring identity, role and data.
    pub fn same_properties(&self, other: &ValueNode) -> ValueResult<bool> {
        self.kind.same_properties(other.kind.as_ref())
    }

    /// A new node of the same kind and name with no role and its own copy of the data.
    pub fn clone_unbound(&self) -> ValueResult<ValueNode> {
        let data = self.kind.clone_data(self.data.as_ref())?;
        let mut node = ValueNode::new(Arc::clone(&self.kind), None, self.name.clone())?;
        node.set_data(data)?;

        Ok(node)
    }
}

/// Lets the executor mark storage as reserved without going through `set_data`.
pub struct StorageHandle<'a> {
    node: &'a mut ValueNode,
}

impl StorageHandle<'_> {
    /// `Empty` becomes `Allocated`; already allocated is a no-op.
    /// Computed data would be silently invalidated, so that is an error.
    pub fn mark_allocated(self) -> ValueResult<()> {
        match self.node.state {
            ValueState::Empty => {
                self.node.state = ValueState::Allocated;
                Ok(())
            }
            ValueState::Allocated => Ok(()),
            ValueState::Computed => Err(ValueError::InvalidState {
                value: self.node.name(),
                state: ValueState::Computed,
                operation: "mark storage allocated",
            }),
        }
    }

    /// Drops an allocation that never received data.
    pub fn release(self) {
        if self.node.state == ValueState::Allocated {
            self.node.state = ValueState::Empty;
        }
    }
}

impl PartialEq for ValueNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueNode {}

impl Hash for ValueNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for ValueNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.data, self.state) {
            (Some(data), ValueState::Computed) => write!(f, "{}:{:?}", self.name(), data),
            _ => f.write_str(&self.name()),
        }
    }
}

impl Debug for ValueNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueNode")
            .field("id", &self.id)
            .field("kind", &self.kind.type_name())
            .field("name", &self.name())
            .field("state", &self.state)
            .field("owner", &self.owner_id())
            .field("index", &self.index())
            .finish()
    }
}
