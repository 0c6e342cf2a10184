//! Native call surface of the engine / 引擎原生调用接口
//!
//! [`NativeApi`] mirrors the C entry points one-to-one. Everything above this
//! module talks to the engine only through the trait, so the real library
//! ([`EstraierLibrary`]) and the in-memory fake used by the tests are
//! interchangeable.

pub mod handle;
pub mod library;

#[cfg(test)]
pub(crate) mod mock;

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};

pub use handle::{CondHandle, DbHandle, DocHandle};
pub use library::EstraierLibrary;

/// Engine entry points / 引擎入口函数
///
/// # Safety
///
/// Methods marked `unsafe` take handles that must have been returned by the
/// same implementation and not yet released. Pointers returned by
/// [`doc_attr`](Self::doc_attr) are valid until the document is deleted;
/// pointers returned by [`err_msg`](Self::err_msg) are static.
pub trait NativeApi: Send + Sync {
    /// `est_db_open`; writes the status into `ecp`
    fn db_open(&self, name: &CStr, omode: c_int, ecp: &mut c_int) -> DbHandle;

    /// `est_db_close`; writes the status into `ecp`
    unsafe fn db_close(&self, db: DbHandle, ecp: &mut c_int) -> bool;

    /// `est_db_error`: last status recorded on the database
    unsafe fn db_error(&self, db: DbHandle) -> c_int;

    /// `est_cond_new`
    fn cond_new(&self) -> CondHandle;

    unsafe fn cond_set_phrase(&self, cond: CondHandle, phrase: &CStr);

    unsafe fn cond_set_options(&self, cond: CondHandle, options: c_int);

    unsafe fn cond_delete(&self, cond: CondHandle);

    /// `est_db_search`: returns a heap array owned by the caller, count in `nump`
    unsafe fn db_search(&self, db: DbHandle, cond: CondHandle, nump: &mut c_int) -> *mut c_int;

    /// `est_db_get_doc`: null when the id does not exist
    unsafe fn db_get_doc(&self, db: DbHandle, id: c_int, options: c_int) -> DocHandle;

    unsafe fn doc_delete(&self, doc: DocHandle);

    /// `est_doc_attr`: null when the attribute is absent
    unsafe fn doc_attr(&self, doc: DocHandle, name: &CStr) -> *const c_char;

    /// `est_err_msg`: pure lookup, may return null for unknown codes
    fn err_msg(&self, ecode: c_int) -> *const c_char;

    /// Release a buffer the engine allocated with `malloc`
    unsafe fn free(&self, ptr: *mut c_void);
}

/// Decode a NUL-terminated engine string; null decodes to "" / 解码 C 字符串
///
/// Invalid UTF-8 is replaced rather than rejected.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer that stays alive
/// for the duration of the call.
pub unsafe fn cstr_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}
