//! 由路径（或已打开的文件）与模式字符串构造完整流栈。
//!
//! # 结构说明（How）
//! - 只读模式：`DiskFile → [TextInputFilter 或 TextCRLFFilter] → BufferingInputStream`，
//!   通用换行取前者，非二进制模式且分隔符为 `\r\n` 时取后者；
//! - 只写模式：`DiskFile → [TextCRLFFilter，条件同上] → 缓冲层`，
//!   缓冲层按 [`Buffering`] 取 `BufferingOutputStream`、`LineBufferingOutputStream` 或不缓冲；
//! - `+` 模式：`DiskFile → BufferingInputOutputStream`。
//!
//! # 契约说明（What）
//! - 读方向总会保留一层 `BufferingInputStream`，逐行读取依赖它；
//!   [`Buffering::Unbuffered`] 时其补读粒度为 1 字节，不产生超出请求的预读；
//! - 双向流不叠加换行过滤器，[`Buffering::Line`] 对其按默认粒度缓冲。

use std::fs::File;
use std::path::Path;

use crate::basis::{DiskFile, OpenMode};
use crate::buffering::{
    BufferingInputOutputStream, BufferingInputStream, BufferingOutputStream,
    LineBufferingOutputStream,
};
use crate::config::{LineSeparator, StreamConfig};
use crate::error::Result;
use crate::filter::{TextCRLFFilter, TextInputFilter};
use crate::stream::{Readable, Seekable, Stream, Truncatable, Writable};

/// 缓冲策略。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Buffering {
    /// 不缓冲写入；读取不做预读。
    Unbuffered,
    /// 写入按行刷写。
    Line,
    /// 全缓冲；`None` 表示使用配置中的 `bufsize`。
    Full(Option<usize>),
}

impl Default for Buffering {
    fn default() -> Self {
        Buffering::Full(None)
    }
}

impl Buffering {
    fn bufsize(self, config: &StreamConfig) -> usize {
        match self {
            Buffering::Unbuffered => 1,
            Buffering::Full(Some(bufsize)) => bufsize,
            Buffering::Full(None) | Buffering::Line => config.bufsize,
        }
    }
}

/// 构造完成的流栈。
pub enum OpenedStream {
    Reader(BufferingInputStream<Box<dyn Readable>>),
    Writer(Box<dyn Writable>),
    Duplex(BufferingInputOutputStream<DiskFile>),
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            OpenedStream::Reader(_) => "Reader",
            OpenedStream::Writer(_) => "Writer",
            OpenedStream::Duplex(_) => "Duplex",
        };
        f.debug_tuple("OpenedStream").field(&kind).finish()
    }
}

impl OpenedStream {
    pub fn into_reader(self) -> Option<BufferingInputStream<Box<dyn Readable>>> {
        match self {
            OpenedStream::Reader(reader) => Some(reader),
            _ => None,
        }
    }

    pub fn into_writer(self) -> Option<Box<dyn Writable>> {
        match self {
            OpenedStream::Writer(writer) => Some(writer),
            _ => None,
        }
    }

    pub fn into_duplex(self) -> Option<BufferingInputOutputStream<DiskFile>> {
        match self {
            OpenedStream::Duplex(duplex) => Some(duplex),
            _ => None,
        }
    }
}

impl Stream for OpenedStream {
    fn close(&mut self) -> Result<()> {
        match self {
            OpenedStream::Reader(reader) => reader.close(),
            OpenedStream::Writer(writer) => writer.close(),
            OpenedStream::Duplex(duplex) => duplex.close(),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            OpenedStream::Reader(reader) => reader.flush(),
            OpenedStream::Writer(writer) => writer.flush(),
            OpenedStream::Duplex(duplex) => duplex.flush(),
        }
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        match self {
            OpenedStream::Reader(reader) => reader.as_seekable(),
            OpenedStream::Writer(writer) => writer.as_seekable(),
            OpenedStream::Duplex(duplex) => duplex.as_seekable(),
        }
    }

    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        match self {
            OpenedStream::Reader(reader) => reader.as_truncatable(),
            OpenedStream::Writer(writer) => writer.as_truncatable(),
            OpenedStream::Duplex(duplex) => duplex.as_truncatable(),
        }
    }
}

/// 按路径与模式字符串打开文件并构造流栈，使用默认配置。
pub fn open_file_as_stream(
    path: impl AsRef<Path>,
    mode: &str,
    buffering: Buffering,
) -> Result<OpenedStream> {
    let mode = OpenMode::parse(mode)?;
    let disk = DiskFile::open_with(path.as_ref(), &mode)?;
    construct_stream_tower(disk, &mode, buffering, &StreamConfig::default())
}

/// 在已打开的文件上构造流栈；模式只决定流栈形状，不会重新打开文件。
pub fn fdopen_as_stream(file: File, mode: &str, buffering: Buffering) -> Result<OpenedStream> {
    let mode = OpenMode::parse(mode)?;
    construct_stream_tower(
        DiskFile::from_file(file),
        &mode,
        buffering,
        &StreamConfig::default(),
    )
}

/// 在基础流之上按模式与缓冲策略叠加过滤层与缓冲层。
pub fn construct_stream_tower(
    disk: DiskFile,
    mode: &OpenMode,
    buffering: Buffering,
    config: &StreamConfig,
) -> Result<OpenedStream> {
    config.validate()?;
    let bufsize = buffering.bufsize(config);
    let tuned = config
        .clone()
        .with_bufsize(bufsize)
        .with_bigsize(config.bigsize.max(bufsize));

    if mode.is_duplex() {
        return Ok(OpenedStream::Duplex(BufferingInputOutputStream::with_config(
            disk, &tuned,
        )?));
    }

    let crlf_text = !mode.binary && config.line_separator == LineSeparator::CrLf;
    if mode.reading {
        let base: Box<dyn Readable> = if mode.universal {
            Box::new(TextInputFilter::new(disk))
        } else if crlf_text {
            Box::new(TextCRLFFilter::new(disk))
        } else {
            Box::new(disk)
        };
        return Ok(OpenedStream::Reader(BufferingInputStream::with_config(
            base, &tuned,
        )?));
    }

    let base: Box<dyn Writable> = if crlf_text {
        Box::new(TextCRLFFilter::new(disk))
    } else {
        Box::new(disk)
    };
    let writer: Box<dyn Writable> = match buffering {
        Buffering::Unbuffered => base,
        Buffering::Line => Box::new(LineBufferingOutputStream::with_config(base, &tuned)?),
        Buffering::Full(_) => {
            Box::new(BufferingOutputStream::with_config(base, &tuned)?)
        }
    };
    Ok(OpenedStream::Writer(writer))
}
