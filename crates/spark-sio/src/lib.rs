//! # spark-sio
//!
//! ## 模块定位（Why）
//! - 在原始文件原语（文件描述符、内存映射）之上，提供缓冲读写、逐行迭代、通用换行翻译
//!   与文本编解码，且每一层都可以单独替换或省略；
//! - 缓冲区与行边界的簿记、跨缓冲状态的定位语义集中在本 crate，调用方只面对统一的能力契约。
//!
//! ## 结构说明（How）
//! - [`basis`]：基础流，[`DiskFile`]、[`MMapFile`]（feature `mmap`）与 [`MemoryFile`]；
//! - [`filter`]：过滤流，换行归一/展开与字节↔文本编解码；
//! - [`buffering`]：缓冲流，读、写（含行缓冲）与双向三种；
//! - [`open`]：由路径与模式字符串一次性构造完整流栈。
//!
//! 写入自上而下（缓冲层 → 过滤层 → 基础流 → OS），读取自下而上。
//!
//! ## 契约说明（What）
//! - 所有层实现同一组能力 trait（[`Stream`]、[`Readable`]、[`Writable`]、[`Seekable`]、[`Truncatable`]），
//!   不支持的能力通过 [`Stream::as_seekable`]/[`Stream::as_truncatable`] 回答 `None`；
//! - 单线程、同步、阻塞；一个流栈独占其下层资源，跨线程访问需调用方自行同步；
//! - 流结束以短读/空读表达，从不作为错误；OS 错误经 [`SioError::Io`] 原样上抛。
//!
//! ## 风险提示（Trade-offs）
//! - 缓冲输出流析构时不会刷写，调用方必须显式 `flush`/`close`；
//! - 下层不可定位时，相对末尾的定位需要把剩余数据整体读入内存。

pub mod basis;
pub mod buffering;
pub mod config;
pub mod error;
pub mod filter;
pub mod open;
pub mod stream;

pub use crate::basis::{DiskFile, MemoryFile, OpenMode};
#[cfg(feature = "mmap")]
pub use crate::basis::MMapFile;
pub use crate::buffering::{
    BufferingInputOutputStream, BufferingInputStream, BufferingOutputStream,
    LineBufferingOutputStream, Lines,
};
pub use crate::config::{LineSeparator, StreamConfig};
pub use crate::error::{ErrorKind, Result, SioError, codes};
pub use crate::filter::{
    AsciiCodec, CRLFFilter, DecodeFailure, DecodingInputFilter, EncodeFailure,
    EncodingOutputFilter, Latin1Codec, SeenNewlines, TextCRLFFilter, TextCodec, TextInputFilter,
    TextOutputFilter, Utf8Codec,
};
pub use crate::open::{Buffering, OpenedStream, construct_stream_tower, fdopen_as_stream, open_file_as_stream};
pub use crate::stream::{
    Readable, Seekable, Stream, TextReadable, TextWritable, Truncatable, Whence, Writable,
};
