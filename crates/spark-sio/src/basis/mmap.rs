//! 基于内存映射的基础流。
//!
//! # 设计概要
//! - 逻辑游标 `pos` 与映射分离维护，映射只是“当前看得到的文件范围”；
//! - 读、按行扫描或写入越过映射边界时，重新按文件真实大小映射一次，
//!   以覆盖其它句柄在映射建立后追加了数据的情况；
//! - 写入优先原地存储，越界时先扩展文件、重映射，然后只重试一次。

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use bytes::Bytes;
use memmap2::{Mmap, MmapMut};
use tracing::debug;

use crate::error::{Result, SioError, closed_stream};
use crate::stream::{Readable, Seekable, Stream, Whence, Writable};

/// 当前映射。长度为 0 的文件无法映射，以 `Empty` 表示。
enum Mapping {
    Empty,
    Read(Mmap),
    Write(MmapMut),
}

impl Mapping {
    fn as_slice(&self) -> &[u8] {
        match self {
            Mapping::Empty => &[],
            Mapping::Read(map) => map,
            Mapping::Write(map) => map,
        }
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

/// 内存映射文件流，支持 `r`（只读）、`w`（读写并按需创建）与 `a`（读写）三种模式。
pub struct MMapFile {
    file: Option<File>,
    writable: bool,
    map: Mapping,
    pos: usize,
}

impl std::fmt::Debug for MMapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MMapFile")
            .field("writable", &self.writable)
            .field("mapped", &self.map.len())
            .field("pos", &self.pos)
            .field("closed", &self.file.is_none())
            .finish()
    }
}

impl MMapFile {
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let mut options = OpenOptions::new();
        let writable = match mode {
            "r" => {
                options.read(true);
                false
            }
            "w" => {
                options.read(true).write(true).create(true);
                true
            }
            "a" => {
                options.read(true).write(true);
                true
            }
            other => {
                return Err(SioError::InvalidMode {
                    mode: other.to_owned(),
                });
            }
        };
        let file = options.open(path)?;
        let mut stream = Self {
            file: Some(file),
            writable,
            map: Mapping::Empty,
            pos: 0,
        };
        stream.remap()?;
        Ok(stream)
    }

    /// 当前映射覆盖的字节数。
    pub fn mapped_len(&self) -> usize {
        self.map.len()
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or_else(closed_stream)
    }

    fn file_len(&self) -> Result<usize> {
        let len = self.file()?.metadata()?.len();
        usize::try_from(len).map_err(|_| SioError::unsupported("mapping files larger than the address space"))
    }

    /// 按文件当前大小重新建立映射。
    fn remap(&mut self) -> Result<()> {
        let len = self.file_len()?;
        let file = self.file()?;
        // SAFETY: 映射的生命周期受本流约束；并发截断文件属于调用方违约，与 `Mmap::map` 的前提一致。
        let map = match (len, self.writable) {
            (0, _) => Mapping::Empty,
            (_, true) => Mapping::Write(unsafe { MmapMut::map_mut(file)? }),
            (_, false) => Mapping::Read(unsafe { Mmap::map(file)? }),
        };
        self.map = map;
        debug!(target: "spark_sio", mapped = len, pos = self.pos, "mmap remapped");
        Ok(())
    }

    /// 文件在映射之后变大时重映射。
    fn remap_if_grown(&mut self) -> Result<()> {
        if self.file_len()? > self.map.len() {
            self.remap()?;
        }
        Ok(())
    }

    /// 读取一行（含 `\n`）；到达末尾时返回剩余部分，末尾之后返回空。
    pub fn readline(&mut self) -> Result<Bytes> {
        self.file()?;
        let found = match self.find_newline() {
            Some(end) => Some(end),
            None => {
                self.remap_if_grown()?;
                self.find_newline()
            }
        };
        let end = found.unwrap_or_else(|| self.map.len().max(self.pos));
        Ok(self.take_until(end))
    }

    fn find_newline(&self) -> Option<usize> {
        let data = self.map.as_slice();
        let tail = data.get(self.pos..)?;
        tail.iter()
            .position(|&byte| byte == b'\n')
            .map(|idx| self.pos + idx + 1)
    }

    fn take_until(&mut self, end: usize) -> Bytes {
        let end = end.min(self.map.len());
        if self.pos >= end {
            return Bytes::new();
        }
        let chunk = Bytes::copy_from_slice(&self.map.as_slice()[self.pos..end]);
        self.pos = end;
        chunk
    }
}

impl Stream for MMapFile {
    fn close(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        let flushed = self.flush();
        self.map = Mapping::Empty;
        self.file = None;
        flushed
    }

    fn flush(&mut self) -> Result<()> {
        if let Mapping::Write(map) = &self.map {
            map.flush()?;
        }
        Ok(())
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        Some(self)
    }
}

impl Readable for MMapFile {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        self.file()?;
        let end = self.pos.saturating_add(n);
        if end > self.map.len() {
            self.remap_if_grown()?;
        }
        Ok(self.take_until(end))
    }

    fn read_all(&mut self) -> Result<Bytes> {
        self.file()?;
        self.remap_if_grown()?;
        let end = self.map.len();
        Ok(self.take_until(end))
    }
}

impl Writable for MMapFile {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file()?;
        if !self.writable {
            return Err(SioError::unsupported("write to a read-only mapping"));
        }
        if data.is_empty() {
            return Ok(());
        }
        let end = self.pos.saturating_add(data.len());
        if end > self.map.len() {
            if self.file_len()? < end {
                self.file()?.set_len(end as u64)?;
            }
            self.remap()?;
        }
        let Mapping::Write(map) = &mut self.map else {
            return Err(SioError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                "mapping is still too small after resize",
            )));
        };
        let Some(target) = map.get_mut(self.pos..end) else {
            return Err(SioError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                "mapping is still too small after resize",
            )));
        };
        target.copy_from_slice(data);
        self.pos = end;
        Ok(())
    }
}

impl Seekable for MMapFile {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        let origin = match whence {
            Whence::Start => 0,
            Whence::Current => i64::try_from(self.pos).unwrap_or(i64::MAX),
            Whence::End => i64::try_from(self.file_len()?).unwrap_or(i64::MAX),
        };
        let target = origin.saturating_add(offset).max(0);
        self.pos = usize::try_from(target).unwrap_or(usize::MAX);
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        self.file()?;
        Ok(self.pos as u64)
    }
}
