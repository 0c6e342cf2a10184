//! Search conditions / 搜索条件
//!
//! A search is described by an ordered list of [`Clause`]s. Each clause is
//! applied onto a freshly allocated engine condition right before the
//! search runs, in the order given.

use std::ffi::CString;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::os::raw::c_int;
use std::str::FromStr;

use crate::error::{engine_error, ErrorCode, Result};
use crate::ffi::{CondHandle, NativeApi};

/// Search option bits (`ESTCOND*`); positions are fixed by the engine / 搜索选项位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SearchOptions(c_int);

impl SearchOptions {
    /// Check every N-gram key / 检查所有 N-gram 键
    pub const SURE: Self = Self(1 << 0);
    /// Check N-gram keys skipping by one
    pub const USUAL: Self = Self(1 << 1);
    /// Check N-gram keys skipping by two
    pub const FAST: Self = Self(1 << 2);
    /// Check N-gram keys skipping by three
    pub const AGITO: Self = Self(1 << 3);
    /// Without TF-IDF tuning / 不使用 TF-IDF
    pub const NO_IDF: Self = Self(1 << 4);
    /// Simplified phrase syntax / 简化短语
    pub const SIMPLE: Self = Self(1 << 10);
    /// Rough phrase syntax
    pub const ROUGH: Self = Self(1 << 11);
    /// Union phrase: any word matches / 并集
    pub const UNION: Self = Self(1 << 15);
    /// Intersection phrase: every word matches / 交集
    pub const ISECT: Self = Self(1 << 16);
    /// Feed back scores (debug)
    pub const SCFB: Self = Self(1 << 30);

    const NAMED: [(&'static str, Self); 10] = [
        ("sure", Self::SURE),
        ("usual", Self::USUAL),
        ("fast", Self::FAST),
        ("agito", Self::AGITO),
        ("noidf", Self::NO_IDF),
        ("simple", Self::SIMPLE),
        ("rough", Self::ROUGH),
        ("union", Self::UNION),
        ("isect", Self::ISECT),
        ("scfb", Self::SCFB),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw mask as passed to the engine / 原始位掩码
    pub const fn bits(self) -> c_int {
        self.0
    }

    pub const fn from_bits(bits: c_int) -> Self {
        Self(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parse and OR together a list of option names / 解析选项名列表
    pub fn parse_list<I, S>(names: I) -> std::result::Result<Self, UnknownOption>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .try_fold(Self::empty(), |acc, name| Ok(acc | name.as_ref().parse::<SearchOptions>()?))
    }
}

impl BitOr for SearchOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SearchOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Option name not in the engine's vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown search option `{0}`")]
pub struct UnknownOption(pub String);

impl FromStr for SearchOptions {
    type Err = UnknownOption;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, opt)| *opt)
            .ok_or_else(|| UnknownOption(s.to_string()))
    }
}

impl fmt::Display for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, opt) in Self::NAMED {
            if self.contains(opt) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// One contribution to a search condition / 搜索条件的组成部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Free-text search phrase / 搜索短语
    Phrase(String),
    /// Option mask, passed through unchanged / 选项掩码
    Options(SearchOptions),
}

impl Clause {
    pub fn phrase(text: impl Into<String>) -> Self {
        Self::Phrase(text.into())
    }

    /// Apply onto a condition / 应用到条件上
    pub(crate) fn apply(&self, cond: &Condition<'_>) -> Result<()> {
        match self {
            Self::Phrase(text) => cond.set_phrase(text),
            Self::Options(options) => {
                cond.set_options(*options);
                Ok(())
            }
        }
    }
}

impl From<SearchOptions> for Clause {
    fn from(options: SearchOptions) -> Self {
        Self::Options(options)
    }
}

impl From<&str> for Clause {
    fn from(text: &str) -> Self {
        Self::Phrase(text.to_string())
    }
}

impl From<String> for Clause {
    fn from(text: String) -> Self {
        Self::Phrase(text)
    }
}

/// Engine condition, deleted when dropped / 引擎条件对象，离开作用域时释放
pub(crate) struct Condition<'a> {
    api: &'a dyn NativeApi,
    handle: CondHandle,
}

impl<'a> Condition<'a> {
    pub(crate) fn new(api: &'a dyn NativeApi) -> Result<Self> {
        let handle = api.cond_new();
        if handle.is_null() {
            return Err(engine_error(api, ErrorCode::Misc.as_raw()));
        }
        Ok(Self { api, handle })
    }

    pub(crate) fn handle(&self) -> CondHandle {
        self.handle
    }

    fn set_phrase(&self, phrase: &str) -> Result<()> {
        let phrase = CString::new(phrase)?;
        // SAFETY: handle is live until drop; the engine copies the phrase
        unsafe { self.api.cond_set_phrase(self.handle, &phrase) };
        Ok(())
    }

    fn set_options(&self, options: SearchOptions) {
        // SAFETY: handle is live until drop
        unsafe { self.api.cond_set_options(self.handle, options.bits()) };
    }
}

impl Drop for Condition<'_> {
    fn drop(&mut self) {
        // SAFETY: created by cond_new and deleted only here
        unsafe { self.api.cond_delete(self.handle) };
    }
}
