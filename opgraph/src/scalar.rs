use std::any::Any;
use std::sync::Arc;

use crate::error::{ValueError, ValueResult};
use crate::host::HostValue;
use crate::kind::ValueKind;
use crate::native::{Label, NativeBinding, NativeBlock, NativeLiteral, NativeType, ScalarType, Stmt};
use crate::operation::Role;
use crate::value_node::ValueNode;

/// A primitive value unboxed into a native scalar variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarValue {
    pub ty: ScalarType,
}

impl ScalarValue {
    pub const TYPE_NAME: &'static str = "scalar_value";

    pub fn new(ty: ScalarType) -> Self {
        ScalarValue { ty }
    }

    pub fn node(ty: ScalarType, role: Option<Role>, name: Option<String>) -> ValueResult<ValueNode> {
        ValueNode::new(Arc::new(ScalarValue::new(ty)), role, name)
    }

    fn literal_of(&self, value: &HostValue) -> Option<NativeLiteral> {
        match self.ty {
            ScalarType::Int64 => value.downcast_ref::<i64>().copied().map(NativeLiteral::Int),
            ScalarType::Float64 => value
                .downcast_ref::<f64>()
                .copied()
                .map(NativeLiteral::Float),
            ScalarType::Bool => value.downcast_ref::<bool>().copied().map(NativeLiteral::Bool),
        }
    }
}

fn widen_exact(int: i64) -> Option<f64> {
    let widened = int as f64;
    // 2^63 rounds back to i64::MAX through the saturating cast
    (widened < 9_223_372_036_854_775_808.0 && widened as i64 == int).then_some(widened)
}

impl ValueKind for ScalarValue {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    /// Integers are widened for `Float64` when the conversion is exact;
    /// anything else must already match.
    fn filter(&self, value: HostValue) -> ValueResult<HostValue> {
        if self.literal_of(&value).is_some() {
            return Ok(value);
        }
        if self.ty == ScalarType::Float64 {
            if let Some(&int) = value.downcast_ref::<i64>() {
                return widen_exact(int).map(HostValue::new).ok_or_else(|| {
                    ValueError::validation(
                        self.type_name(),
                        format!("{int} has no exact float64 representation"),
                    )
                });
            }
        }
        Err(ValueError::validation(
            self.type_name(),
            format!("expected {}, got {:?}", self.ty, value),
        ))
    }

    fn same_properties(&self, other: &dyn ValueKind) -> ValueResult<bool> {
        Ok(other
            .as_any()
            .downcast_ref::<ScalarValue>()
            .is_some_and(|other| other.ty == self.ty))
    }

    fn clone_data(&self, data: Option<&HostValue>) -> ValueResult<Option<HostValue>> {
        Ok(data.map(HostValue::duplicate))
    }

    fn is_trivial_native_type(&self) -> bool {
        true
    }

    fn literal_encoding(&self, data: Option<&HostValue>) -> ValueResult<NativeLiteral> {
        let data = data.ok_or_else(|| {
            ValueError::validation(self.type_name(), "no data to encode as a literal")
        })?;
        self.literal_of(data).ok_or_else(|| {
            ValueError::validation(
                self.type_name(),
                format!("{data:?} is not a {} literal", self.ty),
            )
        })
    }

    fn declare(&self, binding: &NativeBinding) -> ValueResult<NativeBlock> {
        Ok(NativeBlock::from(vec![Stmt::Declare {
            var: binding.to_string(),
            ty: NativeType::Scalar(self.ty),
        }]))
    }

    fn extract(&self, binding: &NativeBinding, fail: &Label) -> ValueResult<NativeBlock> {
        Ok(NativeBlock::from(vec![Stmt::Unbox {
            dst: binding.to_string(),
            src: binding.host(),
            ty: self.ty,
            fail: fail.clone(),
        }]))
    }

    fn cleanup(&self, _binding: &NativeBinding) -> ValueResult<NativeBlock> {
        // unboxing holds no host reference
        Ok(NativeBlock::new())
    }

    fn sync(&self, binding: &NativeBinding, fail: &Label) -> ValueResult<NativeBlock> {
        // a failed box leaves the slot null, never pointing at the released object
        Ok(NativeBlock::from(vec![
            Stmt::XDecRef(binding.host()),
            Stmt::Box {
                dst: binding.host(),
                src: binding.to_string(),
                ty: self.ty,
            },
            Stmt::GotoIfNull {
                place: binding.host(),
                target: fail.clone(),
            },
        ]))
    }

    fn headers(&self) -> ValueResult<Vec<String>> {
        Ok(vec!["stdint.h".to_string(), "stdbool.h".to_string(), "math.h".to_string()])
    }

    /// Same for every scalar type so requirements can be collected once per kind.
    fn libraries(&self) -> ValueResult<Vec<String>> {
        Ok(vec!["m".to_string()])
    }
}
