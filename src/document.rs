//! Retrieved documents / 检索到的文档
//!
//! A [`Document`] may be the null document (id not found). Every accessor on
//! it returns an empty value without calling into the engine.

use std::ffi::CString;

use crate::database::Database;
use crate::ffi::{cstr_to_string, DocHandle};

/// System attribute names defined by the engine / 引擎内置属性名
pub mod attrs {
    pub const URI: &str = "@uri";
    pub const ID: &str = "@id";
    pub const DIGEST: &str = "@digest";
    pub const CDATE: &str = "@cdate";
    pub const MDATE: &str = "@mdate";
    pub const TITLE: &str = "@title";
    pub const AUTHOR: &str = "@author";
    pub const SIZE: &str = "@size";
}

/// Document handle borrowed from an open database / 文档句柄
pub struct Document<'db> {
    db: &'db Database,
    handle: DocHandle,
}

impl<'db> Document<'db> {
    pub(crate) fn new(db: &'db Database, handle: DocHandle) -> Self {
        Self { db, handle }
    }

    /// Whether the id existed / 文档是否存在
    pub fn exists(&self) -> bool {
        !self.handle.is_null()
    }

    pub fn handle(&self) -> DocHandle {
        self.handle
    }

    /// Attribute value; empty when absent or the document is null / 获取属性值
    pub fn attr(&self, name: &str) -> String {
        if self.handle.is_null() {
            return String::new();
        }
        let Ok(name) = CString::new(name) else {
            // No attribute name can contain NUL
            return String::new();
        };

        let api = self.db.api();
        // SAFETY: handle is live until drop and the returned string is owned
        // by the document, so it is decoded before anything can delete it
        unsafe { cstr_to_string(api.doc_attr(self.handle, &name)) }
    }

    /// Canonical location, `@uri` / 文档 URI
    pub fn uri(&self) -> String {
        self.attr(attrs::URI)
    }

    pub fn title(&self) -> String {
        self.attr(attrs::TITLE)
    }

    /// Release the document now; same as dropping it / 释放文档
    pub fn close(self) {}
}

impl Drop for Document<'_> {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        // SAFETY: handle came from db_get_doc and is deleted only here
        unsafe { self.db.api().doc_delete(self.handle) };
    }
}
