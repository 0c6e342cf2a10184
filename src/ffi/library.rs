//! Dynamic binding to the engine library / 引擎动态库绑定
//!
//! The library is opened with `libloading` and every entry point is resolved
//! once at load time, so a missing symbol fails fast instead of on first use.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use once_cell::sync::OnceCell;

use super::handle::{CondHandle, DbHandle, DocHandle};
use super::NativeApi;
use crate::error::{Error, Result};

type DbOpenFn = unsafe extern "C" fn(*const c_char, c_int, *mut c_int) -> *mut c_void;
type DbCloseFn = unsafe extern "C" fn(*mut c_void, *mut c_int) -> c_int;
type DbErrorFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type CondNewFn = unsafe extern "C" fn() -> *mut c_void;
type CondSetPhraseFn = unsafe extern "C" fn(*mut c_void, *const c_char);
type CondSetOptionsFn = unsafe extern "C" fn(*mut c_void, c_int);
type CondDeleteFn = unsafe extern "C" fn(*mut c_void);
type DbSearchFn = unsafe extern "C" fn(*mut c_void, *mut c_void, *mut c_int, *mut c_void) -> *mut c_int;
type DbGetDocFn = unsafe extern "C" fn(*mut c_void, c_int, c_int) -> *mut c_void;
type DocDeleteFn = unsafe extern "C" fn(*mut c_void);
type DocAttrFn = unsafe extern "C" fn(*mut c_void, *const c_char) -> *const c_char;
type ErrMsgFn = unsafe extern "C" fn(c_int) -> *const c_char;
type FreeFn = unsafe extern "C" fn(*mut c_void);

/// Process-wide default library instance / 进程级默认库实例
static SHARED: OnceCell<Arc<EstraierLibrary>> = OnceCell::new();

/// Platform file name of the engine library / 平台默认库文件名
pub fn default_library_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "estraier.dll"
    } else if cfg!(target_os = "macos") {
        "libestraier.dylib"
    } else {
        "libestraier.so"
    }
}

/// C runtime whose heap the engine allocates from / 引擎所用 C 运行时
///
/// On Windows the engine DLL is linked against `msvcrt.dll` while Rust links
/// against the UCRT, so result arrays must go back to `msvcrt`'s own `free`.
/// Elsewhere there is a single C heap and `None` is returned.
pub fn default_crt_library() -> Option<&'static str> {
    if cfg!(target_os = "windows") {
        Some("msvcrt.dll")
    } else {
        None
    }
}

/// `free` from the engine's C runtime / 引擎运行时的 free
struct CrtFree {
    free: FreeFn,
    // Set when `free` was resolved from a separately loaded runtime
    _library: Option<Library>,
}

impl CrtFree {
    fn resolve(crt: Option<&Path>) -> Result<Self> {
        let Some(path) = crt else {
            return Ok(Self {
                free: libc::free,
                _library: None,
            });
        };

        // SAFETY: a C runtime has no initialisers with caller preconditions
        let library = unsafe { Library::new(path) }.map_err(|source| Error::Library {
            path: path.to_path_buf(),
            source,
        })?;
        // SAFETY: `free` has the standard C prototype in every runtime
        let free = unsafe { symbol::<FreeFn>(&library, "free")? };

        tracing::debug!("Resolved free from C runtime {:?}", path);
        Ok(Self {
            free,
            _library: Some(library),
        })
    }
}

/// Resolved entry points; valid while the owning `Library` is loaded
struct EntryPoints {
    db_open: DbOpenFn,
    db_close: DbCloseFn,
    db_error: DbErrorFn,
    cond_new: CondNewFn,
    cond_set_phrase: CondSetPhraseFn,
    cond_set_options: CondSetOptionsFn,
    cond_delete: CondDeleteFn,
    db_search: DbSearchFn,
    db_get_doc: DbGetDocFn,
    doc_delete: DocDeleteFn,
    doc_attr: DocAttrFn,
    err_msg: ErrMsgFn,
}

/// Loaded engine library / 已加载的引擎库
pub struct EstraierLibrary {
    path: PathBuf,
    entry: EntryPoints,
    crt: CrtFree,
    // Keeps the code behind `entry` mapped
    _library: Library,
}

unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    let sym = library
        .get::<T>(name.as_bytes())
        .map_err(|source| Error::Symbol { name, source })?;
    Ok(*sym)
}

impl EstraierLibrary {
    /// Load the library and resolve all entry points / 加载动态库并解析入口
    ///
    /// Result arrays are freed through [`default_crt_library`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_crt(path, default_crt_library().map(Path::new))
    }

    /// Load the library, taking `free` from the C runtime at `crt` / 指定 C 运行时加载
    ///
    /// `None` frees through the runtime this program is linked against.
    pub fn load_with_crt(path: impl AsRef<Path>, crt: Option<&Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: loading runs the library's initialisers; the engine has none
        // with preconditions beyond being the expected library
        let library = unsafe { Library::new(&path) }.map_err(|source| Error::Library {
            path: path.clone(),
            source,
        })?;

        // SAFETY: the declared signatures match the engine's C prototypes
        let entry = unsafe {
            EntryPoints {
                db_open: symbol(&library, "est_db_open")?,
                db_close: symbol(&library, "est_db_close")?,
                db_error: symbol(&library, "est_db_error")?,
                cond_new: symbol(&library, "est_cond_new")?,
                cond_set_phrase: symbol(&library, "est_cond_set_phrase")?,
                cond_set_options: symbol(&library, "est_cond_set_options")?,
                cond_delete: symbol(&library, "est_cond_delete")?,
                db_search: symbol(&library, "est_db_search")?,
                db_get_doc: symbol(&library, "est_db_get_doc")?,
                doc_delete: symbol(&library, "est_doc_delete")?,
                doc_attr: symbol(&library, "est_doc_attr")?,
                err_msg: symbol(&library, "est_err_msg")?,
            }
        };

        let crt = CrtFree::resolve(crt)?;

        tracing::info!("Loaded engine library: {:?}", path);
        Ok(Self {
            path,
            entry,
            crt,
            _library: library,
        })
    }

    /// Lazily load the platform default library once per process / 懒加载默认库
    pub fn shared() -> Result<Arc<Self>> {
        SHARED
            .get_or_try_init(|| Self::load(default_library_name()).map(Arc::new))
            .cloned()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NativeApi for EstraierLibrary {
    fn db_open(&self, name: &CStr, omode: c_int, ecp: &mut c_int) -> DbHandle {
        // SAFETY: `name` is NUL-terminated and `ecp` is a valid out-pointer
        DbHandle::from_raw(unsafe { (self.entry.db_open)(name.as_ptr(), omode, ecp) })
    }

    unsafe fn db_close(&self, db: DbHandle, ecp: &mut c_int) -> bool {
        (self.entry.db_close)(db.as_ptr(), ecp) != 0
    }

    unsafe fn db_error(&self, db: DbHandle) -> c_int {
        (self.entry.db_error)(db.as_ptr())
    }

    fn cond_new(&self) -> CondHandle {
        // SAFETY: no arguments
        CondHandle::from_raw(unsafe { (self.entry.cond_new)() })
    }

    unsafe fn cond_set_phrase(&self, cond: CondHandle, phrase: &CStr) {
        (self.entry.cond_set_phrase)(cond.as_ptr(), phrase.as_ptr())
    }

    unsafe fn cond_set_options(&self, cond: CondHandle, options: c_int) {
        (self.entry.cond_set_options)(cond.as_ptr(), options)
    }

    unsafe fn cond_delete(&self, cond: CondHandle) {
        (self.entry.cond_delete)(cond.as_ptr())
    }

    unsafe fn db_search(&self, db: DbHandle, cond: CondHandle, nump: &mut c_int) -> *mut c_int {
        // No score hints map requested
        (self.entry.db_search)(db.as_ptr(), cond.as_ptr(), nump, std::ptr::null_mut())
    }

    unsafe fn db_get_doc(&self, db: DbHandle, id: c_int, options: c_int) -> DocHandle {
        DocHandle::from_raw((self.entry.db_get_doc)(db.as_ptr(), id, options))
    }

    unsafe fn doc_delete(&self, doc: DocHandle) {
        (self.entry.doc_delete)(doc.as_ptr())
    }

    unsafe fn doc_attr(&self, doc: DocHandle, name: &CStr) -> *const c_char {
        (self.entry.doc_attr)(doc.as_ptr(), name.as_ptr())
    }

    fn err_msg(&self, ecode: c_int) -> *const c_char {
        // SAFETY: pure table lookup on the engine side
        unsafe { (self.entry.err_msg)(ecode) }
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        // Same runtime that malloc'd the array inside the engine
        (self.crt.free)(ptr)
    }
}
