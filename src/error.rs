//! Error types and status translation / 错误类型与状态码转换
//!
//! Every fallible engine call reports through an `int *ecp` out-parameter.
//! The call wrappers pre-set it to [`ErrorCode::Misc`] so an entry point that
//! never writes it still reads back as a failure, then pass it to [`check`].

use std::ffi::NulError;
use std::fmt;
use std::os::raw::c_int;
use std::path::PathBuf;

use thiserror::Error;

use crate::ffi::{cstr_to_string, NativeApi};

/// Fallback text when the engine has no message for a code / 引擎未提供错误信息时的默认文本
const GENERIC_MESSAGE: &str = "unknown engine error";

/// Engine status codes (values are fixed by the engine ABI) / 引擎状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    NoError = 0,
    InvalidArgument = 1,
    AccessForbidden = 2,
    LockFailure = 3,
    Database = 4,
    Io = 5,
    NoItem = 6,
    Misc = 9999,
}

impl ErrorCode {
    /// Decode a raw status; anything unrecognised is `Misc` / 解码原始状态码
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            0 => Self::NoError,
            1 => Self::InvalidArgument,
            2 => Self::AccessForbidden,
            3 => Self::LockFailure,
            4 => Self::Database,
            5 => Self::Io,
            6 => Self::NoItem,
            _ => Self::Misc,
        }
    }

    pub fn as_raw(self) -> c_int {
        self as c_int
    }

    pub fn is_ok(self) -> bool {
        self == Self::NoError
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "no error",
            Self::InvalidArgument => "invalid argument",
            Self::AccessForbidden => "access forbidden",
            Self::LockFailure => "lock failure",
            Self::Database => "database problem",
            Self::Io => "I/O problem",
            Self::NoItem => "no item",
            Self::Misc => "miscellaneous",
        };
        f.write_str(name)
    }
}

/// Main error type / 主错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// Status code reported by the engine / 引擎返回的错误
    #[error("engine error ({code}): {message}")]
    Engine { code: ErrorCode, message: String },

    /// The engine dynamic library could not be opened / 动态库加载失败
    #[error("failed to load engine library {path:?}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// An entry point is missing from the library / 缺少入口函数
    #[error("engine library has no symbol `{name}`: {source}")]
    Symbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// A string with an interior NUL cannot cross the C boundary
    #[error("string contains an interior NUL byte: {0}")]
    Nul(#[from] NulError),

    #[error("invalid configuration {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Engine status code carried by this error, if any / 获取引擎状态码
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias / 结果类型别名
pub type Result<T> = std::result::Result<T, Error>;

/// Translate a raw status code into `Ok` or a structured error / 将状态码转换为错误
///
/// The message comes from the engine's `est_err_msg`; a null or empty reply
/// still yields a non-empty message.
pub fn check(api: &dyn NativeApi, raw: c_int) -> Result<()> {
    if ErrorCode::from_raw(raw).is_ok() {
        return Ok(());
    }
    Err(engine_error(api, raw))
}

/// Build the error for a status already known to be a failure / 构造引擎错误
///
/// A "no error" status passed here is reported as `Misc`, since the caller
/// has independent evidence that the call failed (e.g. a null handle).
pub(crate) fn engine_error(api: &dyn NativeApi, raw: c_int) -> Error {
    let code = match ErrorCode::from_raw(raw) {
        ErrorCode::NoError => ErrorCode::Misc,
        code => code,
    };

    // SAFETY: est_err_msg returns null or a static string
    let mut message = unsafe { cstr_to_string(api.err_msg(code.as_raw())) };
    if message.is_empty() {
        message = GENERIC_MESSAGE.to_string();
    }
    Error::Engine { code, message }
}
