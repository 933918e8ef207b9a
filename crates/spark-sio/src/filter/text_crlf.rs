//! 文本模式的 `\r\n` ⇄ `\n` 双向翻译层。
//!
//! # 模块定位（How）
//! - 读方向把 `\r\n` 折叠为 `\n`，孤立的 `\r` 原样保留；写方向把每个 `\n` 展开为 `\r\n`；
//! - 读到以 `\r` 结尾的块时额外向下层取 1 字节判断是否成对；取到却不属于本块的字节
//!   记在 `lfbuffer` 中，下次读取时先交付。
//!
//! # 契约说明（What）
//! - `tell` 扣除 `lfbuffer` 的长度，`seek(Current)` 同理修正偏移；
//! - `flush`、`write`、`truncate` 之前先把 `lfbuffer` 通过相对定位还给下层；
//!   下层不可定位时前瞻字节保留在本层，仍按序交付。

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::stream::{
    Readable, Seekable, Stream, Truncatable, Whence, Writable, require_seekable,
    require_truncatable,
};

/// 文本模式换行翻译过滤器。
#[derive(Debug)]
pub struct TextCRLFFilter<B> {
    base: B,
    lfbuffer: Bytes,
}

impl<B> TextCRLFFilter<B> {
    pub fn new(base: B) -> Self {
        Self {
            base,
            lfbuffer: Bytes::new(),
        }
    }

    pub fn get_ref(&self) -> &B {
        &self.base
    }

    pub fn get_mut(&mut self) -> &mut B {
        &mut self.base
    }

    pub fn into_inner(self) -> B {
        self.base
    }
}

impl<B: Stream> TextCRLFFilter<B> {
    fn give_back_lookahead(&mut self) -> Result<()> {
        if self.lfbuffer.is_empty() {
            return Ok(());
        }
        let Some(seekable) = self.base.as_seekable() else {
            return Ok(());
        };
        let len = i64::try_from(self.lfbuffer.len()).unwrap_or(i64::MAX);
        seekable.seek(-len, Whence::Current)?;
        self.lfbuffer.clear();
        Ok(())
    }
}

fn collapse_crlf(data: Bytes) -> Bytes {
    if !data.windows(2).any(|pair| pair == b"\r\n") {
        return data;
    }
    let mut out = BytesMut::with_capacity(data.len());
    let mut iter = data.iter().copied().peekable();
    while let Some(byte) = iter.next() {
        if byte == b'\r' && iter.peek() == Some(&b'\n') {
            continue;
        }
        out.put_u8(byte);
    }
    out.freeze()
}

fn expand_lf(data: &[u8]) -> BytesMut {
    let extra = data.iter().filter(|&&byte| byte == b'\n').count();
    let mut out = BytesMut::with_capacity(data.len() + extra);
    for chunk in data.split_inclusive(|&byte| byte == b'\n') {
        match chunk.split_last() {
            Some((b'\n', head)) => {
                out.put_slice(head);
                out.put_slice(b"\r\n");
            }
            _ => out.put_slice(chunk),
        }
    }
    out
}

impl<B: Stream> Stream for TextCRLFFilter<B> {
    fn close(&mut self) -> Result<()> {
        self.lfbuffer.clear();
        self.base.close()
    }

    fn flush(&mut self) -> Result<()> {
        self.give_back_lookahead()?;
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

impl<B: Readable> Readable for TextCRLFFilter<B> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        if n == 0 {
            return Ok(Bytes::new());
        }
        let fresh = self.base.read(n)?;
        let mut data = match std::mem::take(&mut self.lfbuffer) {
            pending if pending.is_empty() => fresh,
            pending => {
                let mut joined = BytesMut::from(&pending[..]);
                joined.put_slice(&fresh);
                joined.freeze()
            }
        };
        if data.last() == Some(&b'\r') {
            let next = match self.base.read(1) {
                Ok(next) => next,
                Err(err) => {
                    self.lfbuffer = data;
                    return Err(err);
                }
            };
            if next.first() == Some(&b'\n') {
                let mut joined = BytesMut::from(&data[..]);
                joined.put_u8(b'\n');
                data = joined.freeze();
                self.lfbuffer = next.slice(1..);
            } else {
                self.lfbuffer = next;
            }
        }
        Ok(collapse_crlf(data))
    }
}

impl<B: Writable> Writable for TextCRLFFilter<B> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let expanded = expand_lf(data);
        self.give_back_lookahead()?;
        self.base.write(&expanded)
    }
}

impl<B: Stream> Seekable for TextCRLFFilter<B> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        let offset = match whence {
            Whence::Current => {
                let pending = i64::try_from(self.lfbuffer.len()).unwrap_or(i64::MAX);
                offset.saturating_sub(pending)
            }
            Whence::Start | Whence::End => offset,
        };
        require_seekable(&mut self.base, "seek")?.seek(offset, whence)?;
        self.lfbuffer.clear();
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        let position = require_seekable(&mut self.base, "tell")?.tell()?;
        Ok(position.saturating_sub(self.lfbuffer.len() as u64))
    }
}

impl<B: Stream> Truncatable for TextCRLFFilter<B> {
    fn truncate(&mut self, size: Option<u64>) -> Result<()> {
        self.give_back_lookahead()?;
        require_truncatable(&mut self.base)?.truncate(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::MemoryFile;

    /// 按固定分片吐数据、忽略请求长度的读源。
    struct Packets(std::collections::VecDeque<&'static [u8]>);

    impl Stream for Packets {
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    impl Readable for Packets {
        fn read(&mut self, _n: usize) -> Result<Bytes> {
            Ok(self.0.pop_front().map(Bytes::from_static).unwrap_or_default())
        }
    }

    #[test]
    fn cr_at_a_chunk_boundary_pairs_with_the_next_chunk() {
        let mut filter = TextCRLFFilter::new(Packets([&b"ab\r"[..], b"\ncd\r", b"x"].into()));
        assert_eq!(&filter.read(100).unwrap()[..], b"ab\n");
        // 孤立的 \r 不是换行
        assert_eq!(&filter.read(100).unwrap()[..], b"cd\rx");
        assert!(filter.read(100).unwrap().is_empty());
        assert!(filter.as_seekable().is_none());
    }

    #[test]
    fn tell_and_relative_seek_account_for_the_lookahead() {
        let mut filter = TextCRLFFilter::new(MemoryFile::with_contents(b"ab\rcd".to_vec()));
        assert_eq!(&filter.read(3).unwrap()[..], b"ab\r");
        assert_eq!(filter.get_mut().tell().unwrap(), 4);
        assert_eq!(filter.tell().unwrap(), 3);
        filter.seek(1, Whence::Current).unwrap();
        assert_eq!(filter.tell().unwrap(), 4);
        assert_eq!(&filter.read(10).unwrap()[..], b"d");

        filter.seek(0, Whence::Start).unwrap();
        assert_eq!(&filter.read(3).unwrap()[..], b"ab\r");
        filter.flush().unwrap();
        assert_eq!(filter.get_mut().tell().unwrap(), 3);
        assert_eq!(&filter.read(10).unwrap()[..], b"cd");
    }

    #[test]
    fn writes_expand_newlines_after_returning_the_lookahead() {
        let mut filter = TextCRLFFilter::new(MemoryFile::new());
        filter.write(b"a\nb\n").unwrap();
        assert_eq!(filter.get_ref().contents(), b"a\r\nb\r\n");

        let mut filter = TextCRLFFilter::new(MemoryFile::with_contents(b"ab\rcd".to_vec()));
        assert_eq!(&filter.read(3).unwrap()[..], b"ab\r");
        filter.write(b"X\n").unwrap();
        assert_eq!(filter.get_ref().contents(), b"ab\rX\r\n");

        filter.seek(0, Whence::Start).unwrap();
        assert_eq!(&filter.read(3).unwrap()[..], b"ab\r");
        filter.truncate(None).unwrap();
        assert_eq!(filter.into_inner().into_contents(), b"ab\r");
    }
}
