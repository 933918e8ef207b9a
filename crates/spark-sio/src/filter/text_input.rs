//! 通用换行输入过滤器。
//!
//! # 设计概要
//! - 与 [`CRLFFilter`](super::CRLFFilter) 相同的 `\r`/`\r\n` 归一；
//! - 额外把每个换行归入 CR、LF、CRLF 之一并永久记录；
//! - 块末孤立的 `\r` 在看到下一个字节之前无法归类，由 `atcr` 暂存；
//!   `tell()` 需要给出精确位置，因此会主动预读一个字节，结果放在单字节缓冲 `lookahead` 中。

use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::filter::translate_newlines;
use crate::stream::{Readable, Seekable, Stream, Whence, require_seekable};

/// 已观测到的换行约定，按种类置位，只增不减。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct SeenNewlines {
    pub cr: bool,
    pub lf: bool,
    pub crlf: bool,
}

impl SeenNewlines {
    pub fn is_empty(&self) -> bool {
        !(self.cr || self.lf || self.crlf)
    }

    /// 以分隔符字符串形式列出，顺序固定为 CR、LF、CRLF；一种也没见过时返回 `None`。
    pub fn as_strs(&self) -> Option<Vec<&'static str>> {
        if self.is_empty() {
            return None;
        }
        let kinds = [(self.cr, "\r"), (self.lf, "\n"), (self.crlf, "\r\n")];
        Some(
            kinds
                .into_iter()
                .filter_map(|(seen, sep)| seen.then_some(sep))
                .collect(),
        )
    }
}

/// 通用换行输入过滤器。
#[derive(Debug)]
pub struct TextInputFilter<B> {
    base: B,
    atcr: bool,
    lookahead: Bytes,
    seen: SeenNewlines,
}

impl<B> TextInputFilter<B> {
    pub fn new(base: B) -> Self {
        Self {
            base,
            atcr: false,
            lookahead: Bytes::new(),
            seen: SeenNewlines::default(),
        }
    }

    /// 迄今观测到的换行约定。
    pub fn newlines(&self) -> SeenNewlines {
        self.seen
    }

    pub fn get_ref(&self) -> &B {
        &self.base
    }

    pub fn into_inner(self) -> B {
        self.base
    }

    /// 归类本块中的换行并完成翻译；调用前 `atcr` 已被消解。
    fn classify_and_translate(&mut self, data: Bytes) -> Bytes {
        for (idx, &byte) in data.iter().enumerate() {
            match byte {
                b'\n' if idx > 0 && data[idx - 1] == b'\r' => self.seen.crlf = true,
                b'\n' => self.seen.lf = true,
                b'\r' if data.get(idx + 1).is_some_and(|&next| next != b'\n') => {
                    self.seen.cr = true;
                }
                _ => {}
            }
        }
        self.atcr = data.last() == Some(&b'\r');
        translate_newlines(data)
    }
}

impl<B: Readable> Stream for TextInputFilter<B> {
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

impl<B: Readable> Readable for TextInputFilter<B> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        if n == 0 {
            return Ok(Bytes::new());
        }
        if !self.lookahead.is_empty() {
            debug_assert!(!self.atcr, "tell() 预读后 atcr 必然已消解");
            let data = std::mem::take(&mut self.lookahead);
            return Ok(self.classify_and_translate(data));
        }
        let mut data = self.base.read(n)?;
        if self.atcr {
            if data.first() == Some(&b'\n') {
                data.advance(1);
                self.seen.crlf = true;
                if data.is_empty() {
                    data = self.base.read(n)?;
                }
            } else {
                self.seen.cr = true;
            }
            self.atcr = false;
        }
        Ok(self.classify_and_translate(data))
    }
}

impl<B: Readable> Seekable for TextInputFilter<B> {
    /// 定位后无法再对跨越跳转的换行做推断，预读与 `atcr` 一并丢弃。
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        require_seekable(&mut self.base, "seek")?.seek(offset, whence)?;
        self.atcr = false;
        self.lookahead = Bytes::new();
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        let mut pos = require_seekable(&mut self.base, "tell")?.tell()?;
        if self.atcr {
            debug_assert!(self.lookahead.is_empty());
            let next = self.base.read(1)?;
            pos += 1;
            self.atcr = false;
            match next.first() {
                Some(b'\n') => self.seen.crlf = true,
                Some(_) => {
                    self.seen.cr = true;
                    self.lookahead = next;
                }
                None => {
                    self.seen.cr = true;
                    pos -= 1;
                }
            }
        }
        Ok(pos - self.lookahead.len() as u64)
    }
}
