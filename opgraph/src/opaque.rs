use std::any::Any;
use std::sync::Arc;

use crate::error::ValueResult;
use crate::host::HostValue;
use crate::kind::ValueKind;
use crate::native::{Label, NativeBinding, NativeBlock, NativeType, Stmt};
use crate::operation::Role;
use crate::value_node::ValueNode;

/// Any host object, opaque to the compiler.
///
/// Generated code only holds a handle and keeps the host reference count
/// balanced; no type-specific marshalling happens.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpaqueHostValue;

impl OpaqueHostValue {
    pub const TYPE_NAME: &'static str = "opaque_host_value";

    pub fn node(role: Option<Role>, name: Option<String>) -> ValueResult<ValueNode> {
        ValueNode::new(Arc::new(OpaqueHostValue), role, name)
    }

    /// An unbound opaque node already holding `data`.
    pub fn with_data(data: HostValue, name: Option<String>) -> ValueResult<ValueNode> {
        let mut node = Self::node(None, name)?;
        node.set_data(Some(data))?;
        Ok(node)
    }
}

impl ValueKind for OpaqueHostValue {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn filter(&self, value: HostValue) -> ValueResult<HostValue> {
        Ok(value)
    }

    fn same_properties(&self, _other: &dyn ValueKind) -> ValueResult<bool> {
        Ok(false)
    }

    fn clone_data(&self, data: Option<&HostValue>) -> ValueResult<Option<HostValue>> {
        Ok(data.map(HostValue::duplicate))
    }

    fn declare(&self, binding: &NativeBinding) -> ValueResult<NativeBlock> {
        Ok(NativeBlock::from(vec![Stmt::Declare {
            var: binding.to_string(),
            ty: NativeType::Handle,
        }]))
    }

    fn extract(&self, binding: &NativeBinding, _fail: &Label) -> ValueResult<NativeBlock> {
        Ok(NativeBlock::from(vec![
            Stmt::XIncRef(binding.host()),
            Stmt::Assign {
                dst: binding.native(),
                src: binding.host(),
            },
        ]))
    }

    fn cleanup(&self, binding: &NativeBinding) -> ValueResult<NativeBlock> {
        Ok(NativeBlock::from(vec![Stmt::XDecRef(binding.native())]))
    }

    fn sync(&self, binding: &NativeBinding, _fail: &Label) -> ValueResult<NativeBlock> {
        // the host slot takes over the reference held by the native handle
        Ok(NativeBlock::from(vec![
            Stmt::XDecRef(binding.host()),
            Stmt::Assign {
                dst: binding.host(),
                src: binding.native(),
            },
            Stmt::Clear(binding.native()),
        ]))
    }
}
