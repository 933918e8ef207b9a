//! 流能力契约。
//!
//! # 模块定位（Why）
//! - 流栈的每一层（基础流、过滤流、缓冲流）都实现同一组小能力面，层与层之间才能透明组合；
//! - 能力是可选的：不支持 seek 的层不会“假装”实现它，而是在 [`Stream::as_seekable`] 上回答 `None`。
//!
//! # 结构说明（How）
//! - [`Stream`]：所有层共有的关闭/刷新入口，以及 seek、truncate 两项能力查询；
//! - [`Readable`] / [`Writable`]：字节读写；
//! - [`Seekable`] / [`Truncatable`]：定位与截断，作为 trait object 通过能力查询取得；
//! - [`TextReadable`] / [`TextWritable`]：编解码过滤器暴露的文本层能力。
//!
//! # 契约说明（What）
//! - `read(n)` 可以短读，返回空 [`Bytes`] 表示流结束，这不是错误；
//! - `seek` 的 `whence` 仅接受 [`Whence`] 三个取值，原始整数经 [`Whence::try_from`] 校验；
//! - `Box<T>` 透传全部能力，方便构造类型擦除后的流栈。

use bytes::{Bytes, BytesMut};

use crate::config::{DEFAULT_BIGSIZE, DEFAULT_BUFSIZE};
use crate::error::{Result, SioError};

/// seek 的参照点。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Whence {
    /// 0：相对流起点。
    Start,
    /// 1：相对当前位置。
    Current,
    /// 2：相对流末尾。
    End,
}

impl Whence {
    /// 原始整数形式。
    pub const fn as_raw(self) -> i32 {
        match self {
            Whence::Start => 0,
            Whence::Current => 1,
            Whence::End => 2,
        }
    }
}

impl TryFrom<i32> for Whence {
    type Error = SioError;

    fn try_from(whence: i32) -> Result<Self> {
        match whence {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            whence => Err(SioError::InvalidWhence { whence }),
        }
    }
}

/// 所有流层共有的能力面。
pub trait Stream {
    /// 关闭本层；过滤层与缓冲层在完成自身收尾后委托给下层。
    fn close(&mut self) -> Result<()>;

    /// 将本层持有的待写数据推向下层。
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// 查询定位能力，不支持时返回 `None`。
    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        None
    }

    /// 查询截断能力，不支持时返回 `None`。
    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        None
    }
}

/// 字节读取能力。
pub trait Readable: Stream {
    /// 读取至多 `n` 字节；返回空缓冲表示流结束。
    fn read(&mut self, n: usize) -> Result<Bytes>;

    /// 读到流结束，分块大小从 8 KiB 起翻倍增长，直至 512 KiB。
    fn read_all(&mut self) -> Result<Bytes> {
        let mut bufsize = DEFAULT_BUFSIZE;
        let mut collected = BytesMut::new();
        loop {
            let data = self.read(bufsize)?;
            if data.is_empty() {
                break;
            }
            collected.extend_from_slice(&data);
            bufsize = (bufsize << 1).min(DEFAULT_BIGSIZE);
        }
        Ok(collected.freeze())
    }

    /// 以有符号长度读取：`n < 0` 表示读到流结束。
    fn read_signed(&mut self, n: isize) -> Result<Bytes> {
        match usize::try_from(n) {
            Ok(n) => self.read(n),
            Err(_) => self.read_all(),
        }
    }
}

/// 字节写入能力。
pub trait Writable: Stream {
    /// 写入全部 `data`。
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// 依次写入每个片段。
    fn write_lines<I, T>(&mut self, lines: I) -> Result<()>
    where
        Self: Sized,
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for line in lines {
            self.write(line.as_ref())?;
        }
        Ok(())
    }
}

/// 定位能力。
pub trait Seekable {
    /// 移动到 `whence` 参照点加 `offset` 的位置。
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()>;

    /// 返回当前逻辑位置。
    fn tell(&mut self) -> Result<u64>;

    /// 以原始整数 `whence` 定位；0、1、2 以外的取值返回 [`SioError::InvalidWhence`]。
    fn seek_raw(&mut self, offset: i64, whence: i32) -> Result<()> {
        self.seek(offset, Whence::try_from(whence)?)
    }
}

/// 截断能力。
pub trait Truncatable {
    /// 截断（或扩展）到 `size` 字节；`None` 表示截断到当前位置。
    fn truncate(&mut self, size: Option<u64>) -> Result<()>;
}

/// 文本读取能力，由解码过滤器提供。
pub trait TextReadable: Stream {
    /// 读取大约 `n` 字节并解码，返回空串表示流结束。
    fn read_text(&mut self, n: usize) -> Result<String>;
}

/// 文本写入能力，由编码过滤器提供。
pub trait TextWritable: Stream {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// 取出定位能力，不支持时返回 [`SioError::Unsupported`]。
pub(crate) fn require_seekable<'a, S>(
    stream: &'a mut S,
    operation: &'static str,
) -> Result<&'a mut dyn Seekable>
where
    S: Stream + ?Sized,
{
    stream
        .as_seekable()
        .ok_or_else(|| SioError::unsupported(operation))
}

/// 取出截断能力，不支持时返回 [`SioError::Unsupported`]。
pub(crate) fn require_truncatable<S>(stream: &mut S) -> Result<&mut dyn Truncatable>
where
    S: Stream + ?Sized,
{
    stream
        .as_truncatable()
        .ok_or_else(|| SioError::unsupported("truncate"))
}

impl<T: Stream + ?Sized> Stream for Box<T> {
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        (**self).as_seekable()
    }

    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        (**self).as_truncatable()
    }
}

impl<T: Readable + ?Sized> Readable for Box<T> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        (**self).read(n)
    }

    fn read_all(&mut self) -> Result<Bytes> {
        (**self).read_all()
    }
}

impl<T: Writable + ?Sized> Writable for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }
}
