//! Search session over an open index / 搜索会话
//!
//! Primitive operations only / 仅提供原语操作：
//! - open / close: acquire and release the database handle
//! - search: run one condition, decode the id array / 执行搜索并解码结果
//! - get_doc: fetch one document by id / 按 id 获取文档
//!
//! A `Database` is not synchronised. Use one per thread, or wrap it in a
//! mutex when searches must share a handle.

use std::ffi::CString;
use std::fmt;
use std::ops::BitOr;
use std::os::raw::c_int;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::condition::{Clause, Condition};
use crate::document::Document;
use crate::error::{check, engine_error, ErrorCode, Result};
use crate::ffi::{DbHandle, NativeApi};

/// Document identifier within one database / 文档 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DocId(pub i32);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Open mode bits (`ESTDB*`) / 打开模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenMode(c_int);

impl OpenMode {
    /// Open as a reader / 只读
    pub const READER: Self = Self(1 << 0);
    /// Open without file locking / 不加锁
    pub const NO_LOCK: Self = Self(1 << 4);
    /// Fail instead of waiting for the lock / 非阻塞加锁
    pub const LOCK_NONBLOCKING: Self = Self(1 << 5);

    pub const fn bits(self) -> c_int {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        Self::READER
    }
}

impl BitOr for OpenMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Engine path argument; raw bytes on Unix so non-UTF-8 names survive
#[cfg(unix)]
fn path_to_cstring(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;
    Ok(CString::new(path.as_os_str().as_bytes())?)
}

#[cfg(not(unix))]
fn path_to_cstring(path: &Path) -> Result<CString> {
    Ok(CString::new(path.to_string_lossy().as_bytes())?)
}

/// Result array handed over by `est_db_search` / 搜索返回的原生结果数组
///
/// Owns the engine allocation. It is consumed by [`copy_out`](Self::copy_out)
/// and freed exactly once when dropped, whether or not it was read.
pub(crate) struct ResultBuffer<'a> {
    api: &'a dyn NativeApi,
    ptr: NonNull<c_int>,
    len: usize,
}

impl<'a> ResultBuffer<'a> {
    /// Take ownership of a search result; `None` for a null pointer
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to `count` initialised ints allocated by
    /// the engine and not owned by anyone else.
    pub(crate) unsafe fn from_raw(api: &'a dyn NativeApi, ptr: *mut c_int, count: c_int) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        Some(Self {
            api,
            ptr,
            len: usize::try_from(count).unwrap_or(0),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Copy the ids into an owned vector and release the native array
    pub(crate) fn copy_out(self) -> Vec<DocId> {
        let mut ids: Vec<DocId> = Vec::with_capacity(self.len);
        if self.len > 0 {
            // SAFETY: `from_raw` guarantees `len` readable ints; DocId is a
            // transparent i32 and `ids` has room for `len` elements
            unsafe {
                ptr::copy_nonoverlapping(self.ptr.as_ptr().cast::<DocId>(), ids.as_mut_ptr(), self.len);
                ids.set_len(self.len);
            }
        }
        ids
        // `self` drops here and frees the array
    }
}

impl Drop for ResultBuffer<'_> {
    fn drop(&mut self) {
        // SAFETY: the engine allocated the array and ownership was passed to us
        unsafe { self.api.free(self.ptr.as_ptr().cast()) };
    }
}

/// Open search index / 已打开的搜索索引
pub struct Database {
    api: Arc<dyn NativeApi>,
    handle: DbHandle,
}

impl Database {
    /// Open the index at `path` read-only / 以只读方式打开索引
    pub fn open(api: Arc<dyn NativeApi>, path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(api, path, OpenMode::READER)
    }

    /// Open with extra mode flags; READER is always set / 指定打开模式
    pub fn open_with(api: Arc<dyn NativeApi>, path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let name = path_to_cstring(path)?;
        let mode = mode | OpenMode::READER;

        let mut ecode = ErrorCode::Misc.as_raw();
        let handle = api.db_open(&name, mode.bits(), &mut ecode);
        let status = check(api.as_ref(), ecode);

        match (handle.is_null(), status) {
            (false, Ok(())) => {
                tracing::debug!("Opened database {:?} (mode {:#x})", path, mode.bits());
                Ok(Self { api, handle })
            }
            (true, Ok(())) => Err(engine_error(api.as_ref(), ecode)),
            (true, Err(e)) => {
                tracing::debug!("Failed to open database {:?}: {}", path, e);
                Err(e)
            }
            (false, Err(e)) => {
                // Handle came back alongside a failure status; give it back
                let mut ecode = ErrorCode::Misc.as_raw();
                // SAFETY: handle was just returned by db_open
                unsafe { api.db_close(handle, &mut ecode) };
                if let Err(close_err) = check(api.as_ref(), ecode) {
                    tracing::warn!("Failed to close database {:?} after open error: {}", path, close_err);
                }
                Err(e)
            }
        }
    }

    /// Close the database and report the engine status / 关闭数据库
    pub fn close(mut self) -> Result<()> {
        let handle = std::mem::replace(&mut self.handle, DbHandle::NULL);
        self.release(handle)
    }

    fn release(&self, handle: DbHandle) -> Result<()> {
        let mut ecode = ErrorCode::Misc.as_raw();
        // SAFETY: handle came from db_open and the caller nulled its copy
        unsafe { self.api.db_close(handle, &mut ecode) };
        tracing::debug!("Closed database handle {:?}", handle.as_ptr());
        check(self.api.as_ref(), ecode)
    }

    /// Run a search built from `clauses`, in order / 执行搜索
    ///
    /// No clauses is legal: the engine's default matching applies. A search
    /// that matches nothing returns an empty vector.
    pub fn search(&self, clauses: &[Clause]) -> Result<Vec<DocId>> {
        let api = self.api.as_ref();
        let cond = Condition::new(api)?;
        for clause in clauses {
            clause.apply(&cond)?;
        }

        let mut count: c_int = 0;
        // SAFETY: both handles are live for the duration of the call
        let raw = unsafe { api.db_search(self.handle, cond.handle(), &mut count) };

        // SAFETY: est_db_search returns `count` ints owned by the caller
        let Some(buffer) = (unsafe { ResultBuffer::from_raw(api, raw, count) }) else {
            // SAFETY: handle is live
            let status = unsafe { api.db_error(self.handle) };
            check(api, status)?;
            tracing::debug!("Search returned no result array");
            return Ok(Vec::new());
        };

        tracing::debug!("Search matched {} documents", buffer.len());
        Ok(buffer.copy_out())
    }

    /// Search and collect the URI of every hit that still exists / 搜索并返回 URI
    pub fn search_uris(&self, clauses: &[Clause]) -> Result<Vec<String>> {
        let ids = self.search(clauses)?;
        let mut uris = Vec::with_capacity(ids.len());
        for id in ids {
            let doc = self.get_doc(id);
            if doc.exists() {
                uris.push(doc.uri());
            }
        }
        Ok(uris)
    }

    /// Fetch a document; a missing id yields the null document / 获取文档
    pub fn get_doc(&self, id: DocId) -> Document<'_> {
        // SAFETY: handle is live; no retrieval options
        let handle = unsafe { self.api.db_get_doc(self.handle, id.0, 0) };
        if handle.is_null() {
            tracing::debug!("Document {} not found", id);
        }
        Document::new(self, handle)
    }

    pub(crate) fn api(&self) -> &dyn NativeApi {
        self.api.as_ref()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        let handle = std::mem::replace(&mut self.handle, DbHandle::NULL);
        if let Err(e) = self.release(handle) {
            tracing::warn!("Failed to close database on drop: {}", e);
        }
    }
}
