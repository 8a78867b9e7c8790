use std::any::Any;
use std::fmt::Debug;

use crate::error::{CapabilityKind, ValueError, ValueResult};
use crate::host::HostValue;
use crate::native::{Label, NativeBinding, NativeBlock, NativeLiteral};

/// Behavior shared by every node of one value type.
///
/// Every hook is optional. The defaults report `UnsupportedCapability`, which
/// callers treat as "this type cannot do that" (for codegen hooks: fall back to
/// interpreted execution), never as a fatal error. See
/// [`CapabilityResultExt::supported`](crate::error::CapabilityResultExt::supported).
pub trait ValueKind: Debug + Send + Sync + 'static {
    /// Distinguishes kinds when build requirements are collected per type.
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    /// Validates or coerces data before a node stores it.
    fn filter(&self, _value: HostValue) -> ValueResult<HostValue> {
        Err(self.unsupported(CapabilityKind::Filter))
    }

    /// Compares configuration only. Identity, role and data are ignored.
    fn same_properties(&self, _other: &dyn ValueKind) -> ValueResult<bool> {
        Err(self.unsupported(CapabilityKind::SameProperties))
    }

    /// Independent copy of a datum for an unbound clone of the node.
    fn clone_data(&self, _data: Option<&HostValue>) -> ValueResult<Option<HostValue>> {
        Err(self.unsupported(CapabilityKind::Clone))
    }

    /// Primitive or small fixed-size native representation.
    fn is_trivial_native_type(&self) -> bool {
        false
    }

    fn literal_encoding(&self, _data: Option<&HostValue>) -> ValueResult<NativeLiteral> {
        Err(self.unsupported(CapabilityKind::LiteralEncoding))
    }

    /// Declares the native variables `extract` fills in.
    fn declare(&self, _binding: &NativeBinding) -> ValueResult<NativeBlock> {
        Err(self.unsupported(CapabilityKind::Declare))
    }

    /// Reads the host slot of `binding` into the declared variables.
    /// Invalid data is reported through the host error channel followed by a jump to `fail`.
    fn extract(&self, _binding: &NativeBinding, _fail: &Label) -> ValueResult<NativeBlock> {
        Err(self.unsupported(CapabilityKind::Extract))
    }

    /// Releases what `extract` acquired. Never touches the host slot's own reference.
    fn cleanup(&self, _binding: &NativeBinding) -> ValueResult<NativeBlock> {
        Err(self.unsupported(CapabilityKind::Cleanup))
    }

    /// Publishes the native value into the host slot with balanced reference counts.
    /// Terminal for the binding: `cleanup` must not follow on the same path,
    /// so a failing sync jumps to `fail`, which skips this binding's cleanup.
    fn sync(&self, _binding: &NativeBinding, _fail: &Label) -> ValueResult<NativeBlock> {
        Err(self.unsupported(CapabilityKind::Sync))
    }

    fn compile_dependencies(&self) -> ValueResult<Vec<String>> {
        Err(self.unsupported(CapabilityKind::CompileDependencies))
    }

    fn headers(&self) -> ValueResult<Vec<String>> {
        Err(self.unsupported(CapabilityKind::Headers))
    }

    fn libraries(&self) -> ValueResult<Vec<String>> {
        Err(self.unsupported(CapabilityKind::Libraries))
    }

    fn support_code(&self) -> ValueResult<String> {
        Err(self.unsupported(CapabilityKind::SupportCode))
    }

    fn unsupported(&self, capability: CapabilityKind) -> ValueError {
        ValueError::unsupported(self.type_name(), capability)
    }
}
