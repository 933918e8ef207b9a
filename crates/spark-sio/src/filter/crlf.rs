use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::filter::translate_newlines;
use crate::stream::{Readable, Seekable, Stream, Whence, require_seekable};

/// 只做 `\r`/`\r\n` → `\n` 翻译的快速路径过滤器，不记录见过哪些换行约定。
///
/// 唯一的状态 `atcr` 记录上一块是否以孤立 `\r` 结尾：若下一块以 `\n` 开头，
/// 这个 `\n` 属于被块边界拆开的 `\r\n`，直接丢弃。
#[derive(Debug)]
pub struct CRLFFilter<B> {
    base: B,
    atcr: bool,
}

impl<B> CRLFFilter<B> {
    pub fn new(base: B) -> Self {
        Self { base, atcr: false }
    }

    pub fn get_ref(&self) -> &B {
        &self.base
    }

    pub fn into_inner(self) -> B {
        self.base
    }
}

impl<B: Readable> Stream for CRLFFilter<B> {
    fn close(&mut self) -> Result<()> {
        self.base.close()
    }

    fn flush(&mut self) -> Result<()> {
        self.base.flush()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        if self.base.as_seekable().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl<B: Readable> Readable for CRLFFilter<B> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        let mut data = self.base.read(n)?;
        if self.atcr {
            if data.first() == Some(&b'\n') {
                data.advance(1);
                if data.is_empty() {
                    data = self.base.read(n)?;
                }
            }
            self.atcr = false;
        }
        self.atcr = data.last() == Some(&b'\r');
        Ok(translate_newlines(data))
    }
}

impl<B: Readable> Seekable for CRLFFilter<B> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        require_seekable(&mut self.base, "seek")?.seek(offset, whence)?;
        self.atcr = false;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        require_seekable(&mut self.base, "tell")?.tell()
    }
}
