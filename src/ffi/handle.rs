//! Opaque engine handles / 引擎句柄
//!
//! The engine hands out untyped pointers for databases, conditions and
//! documents. Each kind gets its own newtype so one can never be passed
//! where another is expected.

use std::os::raw::c_void;
use std::ptr;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(*mut c_void);

        impl $name {
            /// Null sentinel / 空句柄
            pub const NULL: Self = Self(ptr::null_mut());

            pub fn from_raw(ptr: *mut c_void) -> Self {
                Self(ptr)
            }

            pub fn as_ptr(self) -> *mut c_void {
                self.0
            }

            pub fn is_null(self) -> bool {
                self.0.is_null()
            }
        }
    };
}

native_handle!(
    /// `ESTDB *`
    DbHandle
);
native_handle!(
    /// `ESTCOND *`
    CondHandle
);
native_handle!(
    /// `ESTDOC *`, null means "no such document" / 空值表示文档不存在
    DocHandle
);
