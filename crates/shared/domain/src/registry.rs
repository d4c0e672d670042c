//! Type-erased registry entries for initialized feature slices.

use std::any::{Any, TypeId};
use std::fmt::Debug;

/// State owned by one feature, shareable across handler tasks.
pub trait FeatureSlice: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// A slice boxed together with the `TypeId` it is looked up by.
#[derive(Debug)]
pub struct InitializedSlice {
    pub id: TypeId,
    pub state: Box<dyn FeatureSlice>,
}

impl InitializedSlice {
    pub fn new<T: FeatureSlice>(state: T) -> Self {
        Self { id: TypeId::of::<T>(), state: Box::new(state) }
    }

    /// Downcasts to the concrete slice type.
    #[must_use]
    pub fn downcast<T: FeatureSlice>(&self) -> Option<&T> {
        self.state.as_any().downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter(u32);

    impl FeatureSlice for Counter {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_slice_downcasts_to_its_own_type_only() {
        let slice = InitializedSlice::new(Counter(3));
        assert_eq!(slice.id, TypeId::of::<Counter>());
        assert_eq!(slice.downcast::<Counter>().map(|c| c.0), Some(3));

        #[derive(Debug)]
        struct Other;
        impl FeatureSlice for Other {
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
        assert!(slice.downcast::<Other>().is_none());
    }
}
