//! In-memory fake engine for tests / 测试用内存引擎
//!
//! Handles are small integers cast to pointers; they are never dereferenced.
//! Every acquire and release is counted so tests can assert that each
//! resource is released exactly once.

use std::collections::{BTreeMap, HashMap};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};

use parking_lot::Mutex;

use super::handle::{CondHandle, DbHandle, DocHandle};
use super::NativeApi;
use crate::condition::SearchOptions;
use crate::error::ErrorCode;

#[derive(Debug, Clone)]
struct MockDoc {
    uri: CString,
    words: Vec<String>,
}

#[derive(Debug, Default)]
struct MockCond {
    phrase: Option<String>,
    options: c_int,
}

#[derive(Default)]
struct State {
    next_handle: usize,
    databases: Vec<String>,
    docs: BTreeMap<c_int, MockDoc>,
    open_dbs: HashMap<usize, c_int>,
    conds: HashMap<usize, MockCond>,
    open_docs: HashMap<usize, c_int>,
    // Live result buffers: address -> boxed storage
    buffers: HashMap<usize, Box<[c_int]>>,
    log: Vec<&'static str>,
    null_messages: bool,
    leave_ecode_untouched: bool,
    search_failure: Option<ErrorCode>,
    close_failure: Option<ErrorCode>,
    open_failure: Option<ErrorCode>,
    last_open_mode: Option<c_int>,
    last_cond: Option<(Option<String>, c_int)>,
}

pub(crate) struct MockEngine {
    state: Mutex<State>,
}

fn raw(id: usize) -> *mut c_void {
    id as *mut c_void
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_handle: 0x100,
                ..State::default()
            }),
        }
    }

    /// Register a database path that `db_open` will accept
    pub fn with_database(self, path: &str) -> Self {
        self.state.lock().databases.push(path.to_string());
        self
    }

    pub fn with_doc(self, id: c_int, uri: &str, text: &str) -> Self {
        let doc = MockDoc {
            uri: CString::new(uri).expect("uri without NUL"),
            words: text.split_whitespace().map(str::to_lowercase).collect(),
        };
        self.state.lock().docs.insert(id, doc);
        self
    }

    pub fn set_null_messages(&self, on: bool) {
        self.state.lock().null_messages = on;
    }

    /// Simulate an entry point that never writes its status out-parameter
    pub fn set_leave_ecode_untouched(&self, on: bool) {
        self.state.lock().leave_ecode_untouched = on;
    }

    /// Make `db_search` return null and record `code` on the database
    pub fn fail_search(&self, code: ErrorCode) {
        self.state.lock().search_failure = Some(code);
    }

    /// Make `db_open` hand back a live handle together with `code`
    pub fn fail_open_with_handle(&self, code: ErrorCode) {
        self.state.lock().open_failure = Some(code);
    }

    pub fn fail_close(&self, code: ErrorCode) {
        self.state.lock().close_failure = Some(code);
    }

    /// Number of calls made to one entry point
    pub fn calls(&self, name: &str) -> usize {
        self.state.lock().log.iter().filter(|n| **n == name).count()
    }

    /// Entry point names in call order
    pub fn log(&self) -> Vec<&'static str> {
        self.state.lock().log.clone()
    }

    /// Mode bits passed to the most recent `db_open`
    pub fn last_open_mode(&self) -> Option<c_int> {
        self.state.lock().last_open_mode
    }

    /// Phrase and options of the most recently created condition
    pub fn last_condition(&self) -> Option<(Option<String>, c_int)> {
        self.state.lock().last_cond.clone()
    }

    /// Allocate a result array the way `db_search` would
    pub fn alloc_buffer(&self, ids: &[c_int]) -> *mut c_int {
        let mut storage = ids.to_vec().into_boxed_slice();
        let ptr = storage.as_mut_ptr();
        self.state.lock().buffers.insert(ptr as usize, storage);
        ptr
    }

    /// Panics if any handle or buffer is still outstanding
    pub fn assert_all_released(&self) {
        let state = self.state.lock();
        assert!(state.open_dbs.is_empty(), "databases still open: {}", state.open_dbs.len());
        assert!(state.conds.is_empty(), "conditions not deleted: {}", state.conds.len());
        assert!(state.open_docs.is_empty(), "documents not deleted: {}", state.open_docs.len());
        assert!(state.buffers.is_empty(), "result buffers not freed: {}", state.buffers.len());
    }

    fn allocate(state: &mut State) -> usize {
        state.next_handle += 0x10;
        state.next_handle
    }
}

impl State {
    fn matches(&self, cond: &MockCond, doc: &MockDoc) -> bool {
        let Some(phrase) = cond.phrase.as_deref() else {
            return false;
        };
        let terms: Vec<String> = phrase
            .split_whitespace()
            .filter(|t| !t.eq_ignore_ascii_case("AND") && !t.eq_ignore_ascii_case("OR"))
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return false;
        }
        let union = cond.options & SearchOptions::UNION.bits() != 0
            && cond.options & SearchOptions::ISECT.bits() == 0;
        if union {
            terms.iter().any(|t| doc.words.contains(t))
        } else {
            terms.iter().all(|t| doc.words.contains(t))
        }
    }

    fn remember(&mut self, cond: &MockCond) {
        self.last_cond = Some((cond.phrase.clone(), cond.options));
    }
}

impl NativeApi for MockEngine {
    fn db_open(&self, name: &CStr, omode: c_int, ecp: &mut c_int) -> DbHandle {
        let mut state = self.state.lock();
        state.log.push("db_open");
        state.last_open_mode = Some(omode);
        let name = name.to_string_lossy();
        if !state.databases.iter().any(|d| *d == name) {
            if !state.leave_ecode_untouched {
                *ecp = ErrorCode::Io.as_raw();
            }
            return DbHandle::NULL;
        }
        let id = MockEngine::allocate(&mut state);
        state.open_dbs.insert(id, ErrorCode::NoError.as_raw());
        if !state.leave_ecode_untouched {
            *ecp = state.open_failure.unwrap_or(ErrorCode::NoError).as_raw();
        }
        DbHandle::from_raw(raw(id))
    }

    unsafe fn db_close(&self, db: DbHandle, ecp: &mut c_int) -> bool {
        let mut state = self.state.lock();
        state.log.push("db_close");
        assert!(
            state.open_dbs.remove(&(db.as_ptr() as usize)).is_some(),
            "db_close on a handle that is not open"
        );
        match state.close_failure {
            Some(code) => {
                *ecp = code.as_raw();
                false
            }
            None => {
                *ecp = ErrorCode::NoError.as_raw();
                true
            }
        }
    }

    unsafe fn db_error(&self, db: DbHandle) -> c_int {
        let mut state = self.state.lock();
        state.log.push("db_error");
        *state
            .open_dbs
            .get(&(db.as_ptr() as usize))
            .expect("db_error on a handle that is not open")
    }

    fn cond_new(&self) -> CondHandle {
        let mut state = self.state.lock();
        state.log.push("cond_new");
        let id = MockEngine::allocate(&mut state);
        state.conds.insert(id, MockCond::default());
        CondHandle::from_raw(raw(id))
    }

    unsafe fn cond_set_phrase(&self, cond: CondHandle, phrase: &CStr) {
        let mut state = self.state.lock();
        state.log.push("cond_set_phrase");
        let entry = state
            .conds
            .get_mut(&(cond.as_ptr() as usize))
            .expect("cond_set_phrase on a deleted condition");
        entry.phrase = Some(phrase.to_string_lossy().into_owned());
    }

    unsafe fn cond_set_options(&self, cond: CondHandle, options: c_int) {
        let mut state = self.state.lock();
        state.log.push("cond_set_options");
        let entry = state
            .conds
            .get_mut(&(cond.as_ptr() as usize))
            .expect("cond_set_options on a deleted condition");
        // est_cond_set_options accumulates bits
        entry.options |= options;
    }

    unsafe fn cond_delete(&self, cond: CondHandle) {
        let mut state = self.state.lock();
        state.log.push("cond_delete");
        let removed = state
            .conds
            .remove(&(cond.as_ptr() as usize))
            .expect("cond_delete on a deleted condition");
        state.remember(&removed);
    }

    unsafe fn db_search(&self, db: DbHandle, cond: CondHandle, nump: &mut c_int) -> *mut c_int {
        let mut state = self.state.lock();
        state.log.push("db_search");
        let db_id = db.as_ptr() as usize;
        assert!(state.open_dbs.contains_key(&db_id), "db_search on a closed database");

        let failure = state.search_failure;
        if let Some(code) = failure {
            state.open_dbs.insert(db_id, code.as_raw());
            *nump = 0;
            return std::ptr::null_mut();
        }

        let cond = state
            .conds
            .get(&(cond.as_ptr() as usize))
            .expect("db_search with a deleted condition");
        let hits: Vec<c_int> = state
            .docs
            .iter()
            .filter(|(_, doc)| state.matches(cond, doc))
            .map(|(id, _)| *id)
            .collect();

        *nump = hits.len() as c_int;
        // Never zero-sized so every buffer has a distinct address
        let mut storage = vec![0; hits.len().max(1)].into_boxed_slice();
        storage[..hits.len()].copy_from_slice(&hits);
        let ptr = storage.as_mut_ptr();
        state.buffers.insert(ptr as usize, storage);
        ptr
    }

    unsafe fn db_get_doc(&self, db: DbHandle, id: c_int, _options: c_int) -> DocHandle {
        let mut state = self.state.lock();
        state.log.push("db_get_doc");
        assert!(state.open_dbs.contains_key(&(db.as_ptr() as usize)), "db_get_doc on a closed database");
        if !state.docs.contains_key(&id) {
            return DocHandle::NULL;
        }
        let handle = MockEngine::allocate(&mut state);
        state.open_docs.insert(handle, id);
        DocHandle::from_raw(raw(handle))
    }

    unsafe fn doc_delete(&self, doc: DocHandle) {
        let mut state = self.state.lock();
        state.log.push("doc_delete");
        assert!(
            state.open_docs.remove(&(doc.as_ptr() as usize)).is_some(),
            "doc_delete on a handle that is not open"
        );
    }

    unsafe fn doc_attr(&self, doc: DocHandle, name: &CStr) -> *const c_char {
        let mut state = self.state.lock();
        state.log.push("doc_attr");
        let id = *state
            .open_docs
            .get(&(doc.as_ptr() as usize))
            .expect("doc_attr on a deleted document");
        match name.to_bytes() {
            // CString storage lives in `docs`, which outlives every open document
            b"@uri" => state.docs[&id].uri.as_ptr(),
            _ => std::ptr::null(),
        }
    }

    fn err_msg(&self, ecode: c_int) -> *const c_char {
        let mut state = self.state.lock();
        state.log.push("err_msg");
        if state.null_messages {
            return std::ptr::null();
        }
        let text: &'static [u8] = match ErrorCode::from_raw(ecode) {
            ErrorCode::NoError => b"no error\0",
            ErrorCode::InvalidArgument => b"invalid argument\0",
            ErrorCode::AccessForbidden => b"access forbidden\0",
            ErrorCode::LockFailure => b"lock failure\0",
            ErrorCode::Database => b"database problem\0",
            ErrorCode::Io => b"I/O problem\0",
            ErrorCode::NoItem => b"no item\0",
            ErrorCode::Misc => b"miscellaneous\0",
        };
        text.as_ptr() as *const c_char
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        let mut state = self.state.lock();
        state.log.push("free");
        assert!(
            state.buffers.remove(&(ptr as usize)).is_some(),
            "free on a buffer that is not live"
        );
    }
}
