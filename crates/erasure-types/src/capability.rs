//! Type capability model.
//!
//! [`TypeCapability`] is the minimal surface the comparators need from "a
//! type": equality and assignability within one type system. Relating
//! capabilities of two different systems is an error, never a silent `false`.

use crate::error::TypeError;
use crate::intern::TypeInterner;
use crate::relations::is_assignable;
use crate::types::TypeId;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub trait TypeCapability: Send + Sync {
    /// Identity of the type system the type belongs to.
    fn system_id(&self) -> u64;

    fn display_name(&self) -> String;

    fn as_any(&self) -> &dyn Any;

    fn equals(&self, other: &dyn TypeCapability) -> Result<bool, TypeError>;

    fn is_assignable_to(&self, other: &dyn TypeCapability) -> Result<bool, TypeError>;
}

/// A type of a [`TypeInterner`].
#[derive(Clone)]
pub struct HostType {
    interner: Arc<TypeInterner>,
    ty: TypeId,
}

impl HostType {
    pub fn new(interner: Arc<TypeInterner>, ty: TypeId) -> Self {
        HostType { interner, ty }
    }

    pub fn id(&self) -> TypeId {
        self.ty
    }

    pub fn interner(&self) -> &TypeInterner {
        &self.interner
    }

    /// Downcast `other` to a type of the same interner.
    fn same_system<'o>(&self, other: &'o dyn TypeCapability) -> Result<&'o HostType, TypeError> {
        other
            .as_any()
            .downcast_ref::<HostType>()
            .filter(|host| host.interner.system_id() == self.interner.system_id())
            .ok_or_else(|| TypeError::CrossSystem {
                left: self.display_name(),
                right: other.display_name(),
            })
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostType")
            .field("system", &self.interner.system_id())
            .field("ty", &self.interner.type_name(self.ty))
            .finish()
    }
}

impl TypeCapability for HostType {
    fn system_id(&self) -> u64 {
        self.interner.system_id()
    }

    fn display_name(&self) -> String {
        self.interner.type_name(self.ty)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equals(&self, other: &dyn TypeCapability) -> Result<bool, TypeError> {
        Ok(self.same_system(other)?.ty == self.ty)
    }

    fn is_assignable_to(&self, other: &dyn TypeCapability) -> Result<bool, TypeError> {
        let other = self.same_system(other)?;
        Ok(is_assignable(&self.interner, self.ty, other.ty))
    }
}

#[cfg(test)]
#[path = "../tests/capability_tests.rs"]
mod tests;
