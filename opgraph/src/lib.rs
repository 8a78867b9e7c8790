pub mod abi;
pub mod error;
pub mod fragment;
pub mod host;
pub mod kind;
pub mod native;
pub mod opaque;
pub mod operation;
pub mod scalar;
pub mod value_node;

#[cfg(test)]
pub(crate) mod mock_host;

pub mod prelude {
    pub use crate::abi::HostAbi;
    pub use crate::error::{CapabilityKind, CapabilityResultExt, ValueError, ValueResult};
    pub use crate::fragment::{BuildRequirements, Region, RegionBuilder, Terminal, ValueFragment};
    pub use crate::host::{HostObject, HostValue};
    pub use crate::kind::ValueKind;
    pub use crate::native::{Label, NativeBinding, NativeBlock, NativeCode, ScalarType};
    pub use crate::opaque::OpaqueHostValue;
    pub use crate::operation::{Operation, OperationId, OperationRef, Role};
    pub use crate::scalar::ScalarValue;
    pub use crate::value_node::{StorageHandle, ValueId, ValueNode, ValueState};
}
