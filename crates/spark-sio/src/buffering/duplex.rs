//! 双向缓冲流。
//!
//! # 设计概要
//! - 同一时刻只有一侧处于活动状态：空闲、读（内部 [`BufferingInputStream`]）、写（内部 [`BufferingOutputStream`]）；
//! - 下层流由状态独占持有，方向切换时在两侧之间移交；
//! - 读 → 写：先把下层定位回读侧的逻辑位置 `tell()`，归还读侧的预读；
//! - 写 → 读：先刷写写侧缓冲，读侧在第一次读取时才构造。
//!
//! 切换失败时状态保持不变，错误原样上抛。

use std::mem;

use bytes::Bytes;
use tracing::debug;

use crate::buffering::{BufferingInputStream, BufferingOutputStream};
use crate::config::StreamConfig;
use crate::error::{Result, SioError};
use crate::stream::{Readable, Seekable, Stream, Truncatable, Whence, Writable, require_seekable};

#[derive(Debug)]
enum State<B> {
    Idle(B),
    Reading(BufferingInputStream<B>),
    Writing(BufferingOutputStream<B>),
    /// 仅在切换过程中发生 panic 时残留。
    Poisoned,
}

/// 双向缓冲流。
#[derive(Debug)]
pub struct BufferingInputOutputStream<B> {
    state: State<B>,
    config: StreamConfig,
}

fn poisoned() -> SioError {
    SioError::unsupported("I/O on a stream left inconsistent by an interrupted direction switch")
}

impl<B: Readable + Writable> BufferingInputOutputStream<B> {
    pub fn new(base: B) -> Self {
        Self {
            state: State::Idle(base),
            config: StreamConfig::default(),
        }
    }

    pub fn with_bufsize(base: B, bufsize: usize) -> Result<Self> {
        let defaults = StreamConfig::default();
        let bigsize = defaults.bigsize.max(bufsize);
        Self::with_config(base, &defaults.with_bufsize(bufsize).with_bigsize(bigsize))
    }

    pub fn with_config(base: B, config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: State::Idle(base),
            config: config.clone(),
        })
    }

    pub fn is_reading(&self) -> bool {
        matches!(self.state, State::Reading(_))
    }

    pub fn is_writing(&self) -> bool {
        matches!(self.state, State::Writing(_))
    }

    /// 切换到读方向，返回读侧。
    fn reader(&mut self) -> Result<&mut BufferingInputStream<B>> {
        let base = match mem::replace(&mut self.state, State::Poisoned) {
            State::Reading(reader) => {
                self.state = State::Reading(reader);
                None
            }
            State::Idle(base) => Some(base),
            State::Writing(mut writer) => {
                if let Err(err) = writer.flush_buffer() {
                    self.state = State::Writing(writer);
                    return Err(err);
                }
                debug!(target: "spark_sio", "duplex stream switched from writing to reading");
                Some(writer.into_base())
            }
            State::Poisoned => return Err(poisoned()),
        };
        if let Some(base) = base {
            self.state = State::Reading(BufferingInputStream::from_validated(base, &self.config));
        }
        match &mut self.state {
            State::Reading(reader) => Ok(reader),
            _ => Err(poisoned()),
        }
    }

    /// 切换到写方向，返回写侧。
    fn writer(&mut self) -> Result<&mut BufferingOutputStream<B>> {
        let base = match mem::replace(&mut self.state, State::Poisoned) {
            State::Writing(writer) => {
                self.state = State::Writing(writer);
                None
            }
            State::Idle(base) => Some(base),
            State::Reading(mut reader) => {
                let realigned = reader.tell().and_then(|pos| {
                    reader.seek(i64::try_from(pos).unwrap_or(i64::MAX), Whence::Start)
                });
                if let Err(err) = realigned {
                    self.state = State::Reading(reader);
                    return Err(err);
                }
                debug!(target: "spark_sio", "duplex stream switched from reading to writing");
                Some(reader.into_inner())
            }
            State::Poisoned => return Err(poisoned()),
        };
        if let Some(mut base) = base {
            let pos = base.as_seekable().map(|seekable| seekable.tell()).transpose();
            match pos {
                Ok(pos) => {
                    let writer =
                        BufferingOutputStream::from_validated(base, &self.config, pos.unwrap_or(0));
                    self.state = State::Writing(writer);
                }
                Err(err) => {
                    self.state = State::Idle(base);
                    return Err(err);
                }
            }
        }
        match &mut self.state {
            State::Writing(writer) => Ok(writer),
            _ => Err(poisoned()),
        }
    }

    /// 当前活动侧的定位能力；空闲时默认构造读侧。
    fn active_seekable(&mut self) -> Result<&mut dyn Seekable> {
        if matches!(self.state, State::Idle(_)) {
            self.reader()?;
        }
        match &mut self.state {
            State::Reading(reader) => Ok(reader),
            State::Writing(writer) => require_seekable(writer, "seek"),
            _ => Err(poisoned()),
        }
    }

    /// 读取一行；流结束时返回空缓冲。
    pub fn readline(&mut self) -> Result<Bytes> {
        self.reader()?.readline()
    }

    pub fn next_line(&mut self) -> Result<Option<Bytes>> {
        self.reader()?.next_line()
    }

    pub fn readlines(&mut self) -> Result<Vec<Bytes>> {
        self.reader()?.readlines()
    }

    /// 交出下层流：写侧先刷写，读侧先归还预读。
    pub fn into_inner(mut self) -> Result<B> {
        if self.is_reading() {
            self.writer()?;
        }
        match self.state {
            State::Idle(base) => Ok(base),
            State::Writing(writer) => writer.into_inner(),
            _ => Err(poisoned()),
        }
    }
}

impl<B: Readable + Writable> Stream for BufferingInputOutputStream<B> {
    fn close(&mut self) -> Result<()> {
        match &mut self.state {
            State::Idle(base) => base.close(),
            State::Reading(reader) => reader.close(),
            State::Writing(writer) => writer.close(),
            State::Poisoned => Err(poisoned()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match &mut self.state {
            State::Writing(writer) => writer.flush(),
            _ => Ok(()),
        }
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        Some(self)
    }

    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        Some(self)
    }
}

impl<B: Readable + Writable> Readable for BufferingInputOutputStream<B> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        self.reader()?.read(n)
    }

    fn read_all(&mut self) -> Result<Bytes> {
        self.reader()?.read_all()
    }
}

impl<B: Readable + Writable> Writable for BufferingInputOutputStream<B> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer()?.write(data)
    }
}

impl<B: Readable + Writable> Seekable for BufferingInputOutputStream<B> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        self.active_seekable()?.seek(offset, whence)
    }

    fn tell(&mut self) -> Result<u64> {
        self.active_seekable()?.tell()
    }
}

impl<B: Readable + Writable> Truncatable for BufferingInputOutputStream<B> {
    fn truncate(&mut self, size: Option<u64>) -> Result<()> {
        self.writer()?.truncate(size)
    }
}
