use std::io;

use bytes::Bytes;

use crate::error::{Result, SioError, closed_stream};
use crate::stream::{Readable, Seekable, Stream, Truncatable, Whence, Writable};

/// 完全驻留内存的可读写基础流。
///
/// 行为与普通文件对齐：越过末尾 seek 后写入会以 `\0` 填补空洞，截断到更大尺寸同理。
#[derive(Clone, Debug, Default)]
pub struct MemoryFile {
    data: Vec<u8>,
    pos: usize,
    closed: bool,
}

impl MemoryFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以初始内容创建，游标位于开头。
    pub fn with_contents(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            closed: false,
        }
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn into_contents(self) -> Vec<u8> {
        self.data
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(closed_stream());
        }
        Ok(())
    }
}

impl Stream for MemoryFile {
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        Some(self)
    }

    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        Some(self)
    }
}

impl Readable for MemoryFile {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        self.ensure_open()?;
        let start = self.pos.min(self.data.len());
        let end = start.saturating_add(n).min(self.data.len());
        self.pos = self.pos.max(end);
        Ok(Bytes::copy_from_slice(&self.data[start..end]))
    }
}

impl Writable for MemoryFile {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let end = self
            .pos
            .checked_add(data.len())
            .ok_or_else(|| SioError::unsupported("write beyond the address space"))?;
        if self.data.len() < end {
            self.data
                .try_reserve(end - self.data.len())
                .map_err(|err| SioError::Io(io::Error::new(io::ErrorKind::OutOfMemory, err)))?;
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }
}

impl Seekable for MemoryFile {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        self.ensure_open()?;
        let origin = match whence {
            Whence::Start => 0,
            Whence::Current => self.pos,
            Whence::End => self.data.len(),
        };
        let target = i64::try_from(origin)
            .unwrap_or(i64::MAX)
            .saturating_add(offset);
        self.pos = usize::try_from(target).map_err(|_| SioError::NegativePosition { target })?;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.pos as u64)
    }
}

impl Truncatable for MemoryFile {
    fn truncate(&mut self, size: Option<u64>) -> Result<()> {
        self.ensure_open()?;
        let size = match size {
            Some(size) => usize::try_from(size)
                .map_err(|_| SioError::unsupported("truncate beyond the address space"))?,
            None => self.pos,
        };
        self.data.resize(size, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn behaves_like_a_sparse_file() {
        let mut file = MemoryFile::with_contents(b"abc".to_vec());
        file.seek(5, Whence::Start).unwrap();
        file.write(b"z").unwrap();
        assert_eq!(file.contents(), b"abc\0\0z");
        assert_eq!(file.tell().unwrap(), 6);

        file.seek(1, Whence::Start).unwrap();
        assert_eq!(&file.read(2).unwrap()[..], b"bc");
        file.truncate(None).unwrap();
        assert_eq!(file.contents(), b"abc");
        file.truncate(Some(4)).unwrap();
        assert_eq!(file.contents(), b"abc\0");
    }

    #[test]
    fn negative_targets_and_closed_streams_fail() {
        let mut file = MemoryFile::with_contents(b"abc".to_vec());
        let err = file.seek(-4, Whence::End).unwrap_err();
        assert!(matches!(err, SioError::NegativePosition { target: -1 }));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        file.close().unwrap();
        assert!(file.read(1).is_err());
        assert!(file.write(b"x").is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn writes_far_past_the_end_fail_without_growing() {
        let mut file = MemoryFile::with_contents(b"abc".to_vec());
        file.seek(i64::MAX, Whence::Start).unwrap();
        let err = file.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(file.contents(), b"abc");
    }

    #[test]
    fn reads_past_end_are_empty() {
        let mut file = MemoryFile::with_contents(b"ab".to_vec());
        file.seek(10, Whence::Start).unwrap();
        assert!(file.read(3).unwrap().is_empty());
        assert_eq!(file.tell().unwrap(), 10);
    }
}
