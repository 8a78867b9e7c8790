use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// An object owned by the managed host environment.
pub trait HostObject: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// A copy of the object with no storage shared with `self`.
    fn duplicate(&self) -> Arc<dyn HostObject>;
}

impl<T> HostObject for T
where
    T: Any + Clone + Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn duplicate(&self) -> Arc<dyn HostObject> {
        Arc::new(self.clone())
    }
}

/// Shared handle to a host object. Identity is the allocation, not the content.
///
/// Methods deref the inner `Arc` explicitly: `Arc<dyn HostObject>` is itself a
/// `HostObject` through the blanket impl.
#[derive(Clone)]
pub struct HostValue(Arc<dyn HostObject>);

impl HostValue {
    pub fn new<T: HostObject>(value: T) -> Self {
        HostValue(Arc::new(value))
    }

    pub fn ptr_eq(&self, other: &HostValue) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.0).as_any().is::<T>()
    }

    pub fn duplicate(&self) -> HostValue {
        HostValue((*self.0).duplicate())
    }
}

impl Debug for HostValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}
