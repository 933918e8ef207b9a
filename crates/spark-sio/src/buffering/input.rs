//! 缓冲输入流。
//!
//! # 模块定位（Why）
//! - 在任意 [`Readable`] 之上提供经典的 `read`/`readline`/逐行迭代/`seek` 接口，并尽量减少系统调用；
//! - 位于流栈顶层，是行迭代的唯一实现点。
//!
//! # 结构说明（How）
//! - 预读数据分两段保存：`lines` 是已经切好的完整行（每行以 `\n` 结尾，均为原始块的零拷贝切片），
//!   `buf` 是尚未切分、可能内含 `\n` 的尾部数据；
//! - 不变量：`lines` 按序拼接后再接上 `buf`，恰好等于“已从下层取出但尚未交付”的字节；
//! - `read(n)` 分三级：先只用 `lines`，再加上 `buf`，仍不足才向下层补读，多读的部分留在 `buf`。
//!
//! # 契约说明（What）
//! - 下层不可定位时仍声明 [`Seekable`]：向前的相对定位与相对末尾定位通过读取完成，
//!   `tell` 与绝对定位返回 [`SioError::Unsupported`]；
//! - 流结束以空读表达；逐行迭代以 `None` 结束。

use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, error, trace};

use crate::config::StreamConfig;
use crate::error::{Result, SioError};
use crate::stream::{Readable, Seekable, Stream, Whence, require_seekable};

/// 缓冲输入流。
#[derive(Debug)]
pub struct BufferingInputStream<B> {
    base: B,
    bufsize: usize,
    bigsize: usize,
    lines: VecDeque<Bytes>,
    buf: Bytes,
}

/// 拼接若干片段；只有一个片段时不发生拷贝。
#[derive(Default)]
struct Gather {
    first: Bytes,
    rest: Option<BytesMut>,
}

impl Gather {
    fn push(&mut self, piece: Bytes) {
        if piece.is_empty() {
            return;
        }
        match &mut self.rest {
            Some(joined) => joined.extend_from_slice(&piece),
            None if self.first.is_empty() => self.first = piece,
            None => {
                let mut joined = BytesMut::with_capacity(self.first.len() + piece.len());
                joined.extend_from_slice(&self.first);
                joined.extend_from_slice(&piece);
                self.rest = Some(joined);
            }
        }
    }

    fn finish(self) -> Bytes {
        match self.rest {
            Some(joined) => joined.freeze(),
            None => self.first,
        }
    }
}

impl<B: Readable> BufferingInputStream<B> {
    /// 使用默认配置（8 KiB 粒度）包装 `base`。
    pub fn new(base: B) -> Self {
        Self::from_validated(base, &StreamConfig::default())
    }

    /// 以给定补读粒度包装 `base`；`bufsize` 为 0 时返回配置错误。
    pub fn with_bufsize(base: B, bufsize: usize) -> Result<Self> {
        let defaults = StreamConfig::default();
        let bigsize = defaults.bigsize.max(bufsize);
        Self::with_config(base, &defaults.with_bufsize(bufsize).with_bigsize(bigsize))
    }

    pub fn with_config(base: B, config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(base, config))
    }

    /// 以已校验的配置构造。
    pub(crate) fn from_validated(base: B, config: &StreamConfig) -> Self {
        Self {
            base,
            bufsize: config.bufsize,
            bigsize: config.bigsize,
            lines: VecDeque::new(),
            buf: Bytes::new(),
        }
    }

    pub fn bufsize(&self) -> usize {
        self.bufsize
    }

    pub fn get_ref(&self) -> &B {
        &self.base
    }

    /// 取回下层流，丢弃所有预读数据；需要保持位置时先调用 `seek(tell, Start)`。
    pub fn into_inner(self) -> B {
        self.base
    }

    /// 当前预读但尚未交付的字节数。
    pub fn buffered_len(&self) -> usize {
        self.lines.iter().map(Bytes::len).sum::<usize>() + self.buf.len()
    }

    /// 预读但尚未交付的字节（拷贝）。
    pub fn buffer(&self) -> Bytes {
        let mut gather = Gather::default();
        for line in &self.lines {
            gather.push(line.clone());
        }
        gather.push(self.buf.clone());
        gather.finish()
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.buf = Bytes::new();
    }

    /// 把 `buf` 中完整的行移入 `lines`，剩余的不完整尾部留在 `buf`。
    fn split_buf(&mut self) {
        while let Some(idx) = self.buf.iter().position(|&byte| byte == b'\n') {
            let line = self.buf.split_to(idx + 1);
            self.lines.push_back(line);
        }
    }

    /// 读取下一行（含 `\n`）；流结束且没有剩余数据时返回 `None`。
    ///
    /// 末行没有换行符时按原样交付。
    pub fn next_line(&mut self) -> Result<Option<Bytes>> {
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }
        self.split_buf();
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }

        let mut head = BytesMut::new();
        head.extend_from_slice(&std::mem::take(&mut self.buf));
        loop {
            let mut chunk = match self.base.read(self.bufsize) {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.buf = head.freeze();
                    return Err(err);
                }
            };
            trace!(target: "spark_sio", got = chunk.len(), "line refill");
            if chunk.is_empty() {
                return Ok((!head.is_empty()).then(|| head.freeze()));
            }
            let Some(idx) = chunk.iter().position(|&byte| byte == b'\n') else {
                head.extend_from_slice(&chunk);
                continue;
            };
            let first = chunk.split_to(idx + 1);
            self.buf = chunk;
            self.split_buf();
            if head.is_empty() {
                return Ok(Some(first));
            }
            head.extend_from_slice(&first);
            return Ok(Some(head.freeze()));
        }
    }

    /// 读取一行；流结束时返回空缓冲。
    pub fn readline(&mut self) -> Result<Bytes> {
        Ok(self.next_line()?.unwrap_or_default())
    }

    /// 逐行迭代器，遇到错误时产出 `Err` 后由调用方决定是否继续。
    pub fn lines(&mut self) -> Lines<'_, B> {
        Lines { stream: self }
    }

    /// 读取剩余的全部行。
    pub fn readlines(&mut self) -> Result<Vec<Bytes>> {
        self.lines().collect()
    }

    fn seek_forward(&mut self, offset: usize) -> Result<()> {
        let mut remaining = offset;
        while remaining > 0 {
            let Some(front) = self.lines.front_mut() else {
                break;
            };
            if front.len() > remaining {
                front.advance(remaining);
                return Ok(());
            }
            remaining -= front.len();
            self.lines.pop_front();
        }
        let take = remaining.min(self.buf.len());
        self.buf.advance(take);
        remaining -= take;
        if remaining == 0 {
            return Ok(());
        }

        if let Some(seekable) = self.base.as_seekable() {
            return seekable.seek(i64::try_from(remaining).unwrap_or(i64::MAX), Whence::Current);
        }
        debug!(target: "spark_sio", skip = remaining, "forward seek on non-seekable base, reading through");
        while remaining > 0 {
            let chunk = self.base.read(remaining.min(self.bigsize))?;
            if chunk.is_empty() {
                break;
            }
            remaining -= chunk.len().min(remaining);
        }
        Ok(())
    }

    /// 下层不可定位时的相对末尾定位：读完剩余数据，只保留满足 `offset` 所需的尾部窗口。
    fn seek_end_by_scanning(&mut self, offset: i64) -> Result<()> {
        let keep = if offset >= 0 {
            0
        } else {
            usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX)
        };
        let mut window: VecDeque<Bytes> = self.lines.drain(..).collect();
        window.push_back(std::mem::take(&mut self.buf));
        let mut total: usize = window.iter().map(Bytes::len).sum();
        debug!(target: "spark_sio", keep, "end-relative seek on non-seekable base, scanning to EOF");

        loop {
            let chunk = match self.base.read(self.bufsize) {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.buf = join(window);
                    return Err(err);
                }
            };
            if chunk.is_empty() {
                break;
            }
            total += chunk.len();
            window.push_back(chunk);
            while let Some(front) = window.front() {
                if total - front.len() < keep {
                    break;
                }
                total -= front.len();
                window.pop_front();
            }
        }

        // 丢弃只在 total 减去队首后仍不少于 keep 时发生，所以 total < keep 意味着窗口即全部扫描数据。
        if total < keep {
            self.buf = join(window);
            return Err(SioError::CannotSeekBack {
                requested: keep as u64,
                retained: total as u64,
            });
        }
        let mut cutoff = total - keep;
        while cutoff > 0 {
            let Some(front) = window.front_mut() else {
                break;
            };
            if front.len() > cutoff {
                front.advance(cutoff);
                break;
            }
            cutoff -= front.len();
            window.pop_front();
        }
        self.buf = join(window);
        Ok(())
    }
}

fn join(pieces: impl IntoIterator<Item = Bytes>) -> Bytes {
    let mut gather = Gather::default();
    for piece in pieces {
        gather.push(piece);
    }
    gather.finish()
}

impl<B: Readable> Stream for BufferingInputStream<B> {
    fn close(&mut self) -> Result<()> {
        self.clear();
        self.base.close()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        Some(self)
    }
}

impl<B: Readable> Readable for BufferingInputStream<B> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        if n == 0 {
            return Ok(Bytes::new());
        }
        let mut out = Gather::default();
        let mut remaining = n;

        while remaining > 0 {
            let Some(front) = self.lines.front_mut() else {
                break;
            };
            if front.len() > remaining {
                out.push(front.split_to(remaining));
                return Ok(out.finish());
            }
            remaining -= front.len();
            out.push(self.lines.pop_front().unwrap_or_default());
        }
        if remaining == 0 {
            return Ok(out.finish());
        }

        if self.buf.len() >= remaining {
            out.push(self.buf.split_to(remaining));
            return Ok(out.finish());
        }
        remaining -= self.buf.len();
        out.push(std::mem::take(&mut self.buf));

        while remaining > 0 {
            let mut chunk = match self.base.read(remaining.max(self.bufsize)) {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.buf = out.finish();
                    return Err(err);
                }
            };
            trace!(target: "spark_sio", requested = remaining, got = chunk.len(), "refill");
            if chunk.is_empty() {
                break;
            }
            if chunk.len() > remaining {
                self.buf = chunk.split_off(remaining);
            }
            remaining -= chunk.len();
            out.push(chunk);
        }
        Ok(out.finish())
    }

    fn read_all(&mut self) -> Result<Bytes> {
        let mut out = Gather::default();
        for line in self.lines.drain(..) {
            out.push(line);
        }
        out.push(std::mem::take(&mut self.buf));
        let mut chunk_size = self.bufsize;
        loop {
            let chunk = match self.base.read(chunk_size) {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.buf = out.finish();
                    return Err(err);
                }
            };
            if chunk.is_empty() {
                break;
            }
            out.push(chunk);
            chunk_size = chunk_size.saturating_mul(2).min(self.bigsize).max(self.bufsize);
        }
        Ok(out.finish())
    }
}

impl<B: Readable> Seekable for BufferingInputStream<B> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        match whence {
            Whence::Start => {
                require_seekable(&mut self.base, "seek")?.seek(offset, Whence::Start)?;
                self.clear();
                Ok(())
            }
            Whence::End => match self.base.as_seekable() {
                Some(seekable) => {
                    seekable.seek(offset, Whence::End)?;
                    self.clear();
                    Ok(())
                }
                None => self.seek_end_by_scanning(offset),
            },
            Whence::Current if offset < 0 => {
                let current = i64::try_from(self.tell()?).unwrap_or(i64::MAX);
                let target = current.saturating_add(offset);
                if target < 0 {
                    return Err(SioError::NegativePosition { target });
                }
                self.seek(target, Whence::Start)
            }
            Whence::Current => self.seek_forward(usize::try_from(offset).unwrap_or(usize::MAX)),
        }
    }

    fn tell(&mut self) -> Result<u64> {
        let base_position = require_seekable(&mut self.base, "tell")?.tell()?;
        let buffered = self.buffered_len() as u64;
        base_position.checked_sub(buffered).ok_or_else(|| {
            error!(
                target: "spark_sio",
                base_position,
                buffered,
                "buffered input accounting corrupted"
            );
            SioError::InvariantViolation {
                base_position,
                buffered,
            }
        })
    }
}

/// [`BufferingInputStream::lines`] 返回的逐行迭代器。
pub struct Lines<'a, B> {
    stream: &'a mut BufferingInputStream<B>,
}

impl<B: Readable> Iterator for Lines<'_, B> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.next_line().transpose()
    }
}
