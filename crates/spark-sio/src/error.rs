//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为缓冲流栈的每一层提供统一的错误域，调用方只需面对一个 [`SioError`]；
//! - 将错误按“非法参数 / 不支持的操作 / 解码失败 / 内部不变量破坏 / 底层 IO”归类，便于上层决策。
//!
//! ## 设计要求（What）
//! - 底层 OS 错误通过 [`SioError::Io`] 原样透传，任何一层都不得包装或吞掉；
//! - 流结束（EOF）永远不是错误：读操作以短读/空读表达；
//! - 每个变体都有稳定错误码（`spark.sio.*`），与日志、指标聚合口径保持一致。

use std::io;

use thiserror::Error;

/// 统一的结果别名。
pub type Result<T, E = SioError> = core::result::Result<T, E>;

/// 稳定错误码常量。
///
/// 命名遵循 `spark.<crate>.<reason>`，新增变体时只允许追加，不允许改名。
pub mod codes {
    pub const IO: &str = "spark.sio.io";
    pub const INVALID_WHENCE: &str = "spark.sio.invalid_whence";
    pub const INVALID_MODE: &str = "spark.sio.invalid_mode";
    pub const CANNOT_SEEK_BACK: &str = "spark.sio.cannot_seek_back";
    pub const NEGATIVE_POSITION: &str = "spark.sio.negative_position";
    pub const UNSUPPORTED: &str = "spark.sio.unsupported";
    pub const DECODE: &str = "spark.sio.decode_failed";
    pub const ENCODE: &str = "spark.sio.encode_failed";
    pub const NON_ASCII_BYTES: &str = "spark.sio.non_ascii_bytes";
    pub const INVARIANT: &str = "spark.sio.invariant_violation";
    pub const CONFIG: &str = "spark.sio.invalid_config";
}

/// 错误分类，对应错误处理设计中的五类语义（外加配置错误）。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// 参数非法：`whence`、打开模式、无法满足的回退 seek 等。
    InvalidArgument,
    /// 当前流栈不具备该能力（例如对不可 seek 的基础流调用 `tell`）。
    Unsupported,
    /// 文本解码在有限次重试后仍失败，或编码失败。
    Decode,
    /// 内部簿记被破坏，属于致命错误，调用方不应尝试恢复。
    Invariant,
    /// 底层 OS 错误。
    Io,
    /// 配置值非法。
    Config,
}

/// 缓冲流栈的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：各层（基础流、过滤流、缓冲流）共享同一错误类型，
///   使 `?` 可以跨层传播而无需逐层转换；
/// - **契约 (What)**：
///   - [`SioError::Io`] 为透明变体，`Display` 与 `source` 均直接来自原始 `io::Error`；
///   - 其余变体都携带足够的上下文（操作名、偏移量、编码名）用于排障；
/// - **执行 (How)**：[`SioError::kind`] 给出分类，[`SioError::code`] 给出稳定错误码。
#[derive(Debug, Error)]
pub enum SioError {
    /// 底层 IO 失败，原样透传。
    #[error(transparent)]
    Io(#[from] io::Error),

    /// `whence` 只允许 0、1、2。
    #[error("whence should be 0, 1 or 2, got {whence}")]
    InvalidWhence { whence: i32 },

    /// 无法识别的打开模式字符串。
    #[error("invalid mode `{mode}`: expected one of r, rb, rU, U, w, wb, a, ab, r+, rb+, r+b, w+, wb+, w+b, a+, ab+, a+b")]
    InvalidMode { mode: String },

    /// 基础流不支持 seek 时，从尾部回退的距离超过了已保留的数据量。
    #[error("cannot seek back {requested} bytes from end: only {retained} bytes remain ahead of the cursor")]
    CannotSeekBack { requested: u64, retained: u64 },

    /// seek 目标落在文件开头之前。
    #[error("seek target {target} is before the start of the stream")]
    NegativePosition { target: i64 },

    /// 当前流栈不具备该能力。
    #[error("operation `{operation}` is not supported by this stream")]
    Unsupported { operation: &'static str },

    /// 文本解码失败。
    #[error("cannot decode input with codec `{codec}`: {detail}")]
    Decode { codec: &'static str, detail: String },

    /// 文本编码失败。
    #[error("cannot encode text with codec `{codec}`: {detail}")]
    Encode { codec: &'static str, detail: String },

    /// 原始字节写入编码过滤器时必须是 ASCII。
    #[error("raw bytes passed to an encoding filter must be ASCII (byte {byte:#04x} at offset {offset})")]
    NonAsciiBytes { offset: usize, byte: u8 },

    /// 缓冲簿记被破坏。
    #[error("buffer accounting corrupted: base position {base_position} is behind {buffered} buffered bytes")]
    InvariantViolation { base_position: u64, buffered: u64 },

    /// 配置值非法。
    #[error("invalid stream configuration: {detail}")]
    Config { detail: String },
}

impl SioError {
    /// 构造“不支持的操作”错误。
    pub fn unsupported(operation: &'static str) -> Self {
        SioError::Unsupported { operation }
    }

    /// 返回错误分类。
    pub fn kind(&self) -> ErrorKind {
        match self {
            SioError::Io(_) => ErrorKind::Io,
            SioError::InvalidWhence { .. }
            | SioError::InvalidMode { .. }
            | SioError::CannotSeekBack { .. }
            | SioError::NegativePosition { .. }
            | SioError::NonAsciiBytes { .. } => ErrorKind::InvalidArgument,
            SioError::Unsupported { .. } => ErrorKind::Unsupported,
            SioError::Decode { .. } | SioError::Encode { .. } => ErrorKind::Decode,
            SioError::InvariantViolation { .. } => ErrorKind::Invariant,
            SioError::Config { .. } => ErrorKind::Config,
        }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            SioError::Io(_) => codes::IO,
            SioError::InvalidWhence { .. } => codes::INVALID_WHENCE,
            SioError::InvalidMode { .. } => codes::INVALID_MODE,
            SioError::CannotSeekBack { .. } => codes::CANNOT_SEEK_BACK,
            SioError::NegativePosition { .. } => codes::NEGATIVE_POSITION,
            SioError::Unsupported { .. } => codes::UNSUPPORTED,
            SioError::Decode { .. } => codes::DECODE,
            SioError::Encode { .. } => codes::ENCODE,
            SioError::NonAsciiBytes { .. } => codes::NON_ASCII_BYTES,
            SioError::InvariantViolation { .. } => codes::INVARIANT,
            SioError::Config { .. } => codes::CONFIG,
        }
    }

    /// 若为底层 IO 错误，返回其 `io::ErrorKind`。
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            SioError::Io(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// 对已关闭的基础流继续操作时返回的错误。
pub(crate) fn closed_stream() -> SioError {
    SioError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "I/O operation on closed stream",
    ))
}
