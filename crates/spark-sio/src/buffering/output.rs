//! 缓冲输出流及其行缓冲变体。
//!
//! # 契约说明（What）
//! - 写入先累积在固定容量的缓冲中；累积量达到 `bufsize` 时立即把整块写给下层，剩余部分继续累积；
//! - `pos` 独立于下层维护，恒等于“下层真实位置 + 未刷写字节数”，`tell` 不触发系统调用；
//! - `flush`/`close`/`truncate`/`seek` 均先刷写缓冲，保证下层看到一致的视图；
//! - 丢弃流之前应显式 `flush` 或 `close`，析构不会刷写。

use bytes::BytesMut;
use tracing::trace;

use crate::config::{LineSeparator, StreamConfig};
use crate::error::Result;
use crate::stream::{Seekable, Stream, Truncatable, Whence, Writable, require_seekable, require_truncatable};

/// 缓冲输出流。
#[derive(Debug)]
pub struct BufferingOutputStream<B> {
    base: B,
    bufsize: usize,
    buf: BytesMut,
    pos: u64,
}

impl<B: Writable> BufferingOutputStream<B> {
    /// 使用默认 8 KiB 缓冲包装 `base`；下层可定位时以其 `tell()` 作为初始位置，否则从 0 起算。
    pub fn new(base: B) -> Result<Self> {
        Self::with_config(base, &StreamConfig::default())
    }

    pub fn with_bufsize(base: B, bufsize: usize) -> Result<Self> {
        let defaults = StreamConfig::default();
        let bigsize = defaults.bigsize.max(bufsize);
        Self::with_config(base, &defaults.with_bufsize(bufsize).with_bigsize(bigsize))
    }

    pub fn with_config(mut base: B, config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        let pos = match base.as_seekable() {
            Some(seekable) => seekable.tell()?,
            None => 0,
        };
        Ok(Self::from_validated(base, config, pos))
    }

    /// 以已校验的配置与已知的初始位置构造。
    pub(crate) fn from_validated(base: B, config: &StreamConfig, pos: u64) -> Self {
        Self {
            base,
            bufsize: config.bufsize,
            buf: BytesMut::with_capacity(config.bufsize),
            pos,
        }
    }

    pub fn get_ref(&self) -> &B {
        &self.base
    }

    /// 尚未刷写的字节数。
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// 刷写缓冲后取回下层流。
    pub fn into_inner(mut self) -> Result<B> {
        self.flush_buffer()?;
        Ok(self.base)
    }

    /// 依次写入每个片段。
    pub fn writelines<I, T>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.write_lines(lines)
    }

    /// 直接取回下层流；调用方负责先刷写缓冲。
    pub(crate) fn into_base(self) -> B {
        self.base
    }

    /// 把缓冲写给下层，但不调用下层的 `flush`。
    pub(crate) fn flush_buffer(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        trace!(target: "spark_sio", bytes = self.buf.len(), "flush");
        self.base.write(&self.buf)?;
        self.buf.clear();
        Ok(())
    }
}

impl<B: Writable> Stream for BufferingOutputStream<B> {
    fn close(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.base.close()
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.base.flush()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        if self.base.as_seekable().is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        if self.base.as_truncatable().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl<B: Writable> Writable for BufferingOutputStream<B> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut rest = data;
        while !rest.is_empty() {
            if self.buf.len() + rest.len() < self.bufsize {
                self.buf.extend_from_slice(rest);
                self.pos += rest.len() as u64;
                return Ok(());
            }
            let (head, tail) = rest.split_at(self.bufsize - self.buf.len());
            self.buf.extend_from_slice(head);
            self.pos += head.len() as u64;
            self.flush_buffer()?;
            rest = tail;
        }
        Ok(())
    }
}

impl<B: Writable> Seekable for BufferingOutputStream<B> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        self.flush_buffer()?;
        let seekable = require_seekable(&mut self.base, "seek")?;
        seekable.seek(offset, whence)?;
        self.pos = seekable.tell()?;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos)
    }
}

impl<B: Writable> Truncatable for BufferingOutputStream<B> {
    fn truncate(&mut self, size: Option<u64>) -> Result<()> {
        self.flush_buffer()?;
        require_truncatable(&mut self.base)?.truncate(size)
    }
}

/// 行缓冲输出流：每凑齐一行（含分隔符）立即写给下层，只有末尾不完整的片段留在缓冲中。
///
/// 单行超过 `bufsize` 时仍按缓冲粒度分块写出。
#[derive(Debug)]
pub struct LineBufferingOutputStream<B> {
    inner: BufferingOutputStream<B>,
    separator: LineSeparator,
}

impl<B: Writable> LineBufferingOutputStream<B> {
    /// 默认配置，分隔符取平台约定。
    pub fn new(base: B) -> Result<Self> {
        Self::with_config(base, &StreamConfig::default())
    }

    pub fn with_config(base: B, config: &StreamConfig) -> Result<Self> {
        Ok(Self {
            inner: BufferingOutputStream::with_config(base, config)?,
            separator: config.line_separator,
        })
    }

    pub fn separator(&self) -> LineSeparator {
        self.separator
    }

    pub fn get_ref(&self) -> &B {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> Result<B> {
        self.inner.into_inner()
    }
}

impl<B: Writable> Stream for LineBufferingOutputStream<B> {
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        self.inner.as_seekable()
    }

    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        self.inner.as_truncatable()
    }
}

impl<B: Writable> Writable for LineBufferingOutputStream<B> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let separator = self.separator.as_bytes();
        let mut rest = data;
        while let Some(idx) = rest
            .windows(separator.len())
            .position(|window| window == separator)
        {
            let (line, tail) = rest.split_at(idx + separator.len());
            self.inner.write(line)?;
            self.inner.flush_buffer()?;
            rest = tail;
        }
        self.inner.write(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::MemoryFile;

    #[test]
    fn flushes_happen_on_full_buffers() {
        let mut stream = BufferingOutputStream::with_bufsize(MemoryFile::new(), 4).unwrap();
        stream.write(b"123").unwrap();
        assert_eq!(stream.get_ref().contents(), b"");
        assert_eq!(stream.tell().unwrap(), 3);
        stream.write(b"456").unwrap();
        assert_eq!(stream.get_ref().contents(), b"1234");
        stream.write(b"789ABCDEF").unwrap();
        assert_eq!(stream.get_ref().contents(), b"123456789ABC");
        stream.write(b"0123").unwrap();
        assert_eq!(stream.get_ref().contents(), b"123456789ABCDEF0");
        assert_eq!(stream.tell().unwrap(), 19);
        let base = stream.into_inner().unwrap();
        assert_eq!(base.contents(), b"123456789ABCDEF0123");
    }

    #[test]
    fn seek_flushes_and_resyncs_position() {
        let mut stream = BufferingOutputStream::with_bufsize(MemoryFile::new(), 4).unwrap();
        stream.write(b"x".repeat(6).as_slice()).unwrap();
        stream.seek(3, Whence::Start).unwrap();
        assert_eq!(stream.tell().unwrap(), 3);
        stream.write(b"yy").unwrap();
        assert_eq!(stream.into_inner().unwrap().contents(), b"xxxyyx");
    }

    #[test]
    fn seek_beyond_end_zero_fills() {
        let mut stream = BufferingOutputStream::with_bufsize(MemoryFile::new(), 4).unwrap();
        stream.write(b"1234567890").unwrap();
        stream.seek(9, Whence::Start).unwrap();
        stream.write(b"x").unwrap();
        stream.seek(12, Whence::Start).unwrap();
        stream.write(b"y").unwrap();
        stream.close().unwrap();
        // close 后内存文件不再可读写，只检查内容
        assert_eq!(stream.get_ref().contents(), b"123456789x\0\0y");
    }

    #[test]
    fn truncate_flushes_first() {
        let mut stream = BufferingOutputStream::with_bufsize(MemoryFile::new(), 16).unwrap();
        stream.write(b"abcdef").unwrap();
        stream.truncate(Some(4)).unwrap();
        assert_eq!(stream.get_ref().contents(), b"abcd");
    }

    #[test]
    fn initial_position_comes_from_the_base() {
        let mut base = MemoryFile::with_contents(b"existing".to_vec());
        base.seek(0, Whence::End).unwrap();
        let mut stream = BufferingOutputStream::new(base).unwrap();
        assert_eq!(stream.tell().unwrap(), 8);
        stream.writelines(["a", "b"]).unwrap();
        assert_eq!(stream.into_inner().unwrap().contents(), b"existingab");
    }

    #[test]
    fn complete_lines_reach_the_base_at_once() {
        let config = StreamConfig::default()
            .with_bufsize(4)
            .with_line_separator(LineSeparator::Lf);
        let mut stream = LineBufferingOutputStream::with_config(MemoryFile::new(), &config).unwrap();
        stream.write(b"123").unwrap();
        assert_eq!(stream.get_ref().contents(), b"");
        stream.write(b"456").unwrap();
        assert_eq!(stream.get_ref().contents(), b"1234");
        stream.write(b"789ABCDEF\n").unwrap();
        assert_eq!(stream.get_ref().contents(), b"123456789ABCDEF\n");
        stream.write(b"0123").unwrap();
        assert_eq!(stream.get_ref().contents(), b"123456789ABCDEF\n0123");
        assert_eq!(stream.as_seekable().unwrap().tell().unwrap(), 20);
    }

    #[test]
    fn crlf_lines_flush_on_the_full_separator() {
        let config = StreamConfig::default().with_line_separator(LineSeparator::CrLf);
        let mut stream = LineBufferingOutputStream::with_config(MemoryFile::new(), &config).unwrap();
        stream.write(b"a\nb\r").unwrap();
        assert_eq!(stream.get_ref().contents(), b"");
        stream.write(b"\nc\r\nd").unwrap();
        assert_eq!(stream.get_ref().contents(), b"a\nb\r\nc\r\n");
        assert_eq!(stream.into_inner().unwrap().contents(), b"a\nb\r\nc\r\nd");
    }
}
