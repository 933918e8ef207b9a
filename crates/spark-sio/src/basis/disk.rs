use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::{Bytes, BytesMut};

use crate::basis::mode::OpenMode;
use crate::error::{Result, SioError, closed_stream};
use crate::stream::{Readable, Seekable, Stream, Truncatable, Whence, Writable};

/// 单次 `read` 系统调用申请的缓冲上限；超过时短读，由上层继续补读。
const MAX_READ_CHUNK: usize = 1 << 24;

/// 基于文件描述符的基础流。
///
/// # 教案式说明
/// - **意图 (Why)**：流栈最底层直接面向 OS，`read`/`write`/`seek` 各对应一次（或一组）系统调用；
/// - **契约 (What)**：
///   - `read(n)` 与 `os.read` 同义，可能短读，返回空表示 EOF；
///   - `write` 循环直到全部字节写出；
///   - `truncate`/`isatty` 仅在 POSIX 平台可用，其它平台返回 [`SioError::Unsupported`]；
///   - `close` 之后的任何操作都返回 `NotConnected` 类 IO 错误，重复 `close` 无副作用；
/// - **执行 (How)**：包装 `std::fs::File`，POSIX 下 `close` 通过 `libc::close` 显式关闭，
///   从而把关闭失败原样上抛，而不是在 `Drop` 中静默丢弃。
#[derive(Debug)]
pub struct DiskFile {
    file: Option<File>,
}

impl DiskFile {
    /// 以模式字符串打开文件。
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let mode = OpenMode::parse(mode)?;
        Self::open_with(path.as_ref(), &mode)
    }

    /// 以解析后的模式打开文件。
    ///
    /// `a` 系列模式以独占创建打开；若文件已存在，则去掉创建语义重新打开并定位到末尾。
    pub fn open_with(path: &Path, mode: &OpenMode) -> Result<Self> {
        let file = match mode.open_options().open(path) {
            Ok(file) => file,
            Err(err) if mode.exclusive && err.kind() == io::ErrorKind::AlreadyExists => {
                mode.reopen_options().open(path)?
            }
            Err(err) => return Err(err.into()),
        };
        let mut disk = Self::from_file(file);
        if mode.append {
            disk.seek(0, Whence::End)?;
        }
        Ok(disk)
    }

    /// 接管一个已打开的文件。
    pub fn from_file(file: File) -> Self {
        Self { file: Some(file) }
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// 返回底层描述符。
    #[cfg(unix)]
    pub fn fileno(&self) -> Result<std::os::fd::RawFd> {
        use std::os::fd::AsRawFd;

        self.file
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(closed_stream)
    }

    /// 描述符是否指向终端。
    #[cfg(unix)]
    pub fn isatty(&self) -> Result<bool> {
        let fd = self.fileno()?;
        // SAFETY: `fd` 由仍然存活的 `File` 持有。
        Ok(unsafe { libc::isatty(fd) } == 1)
    }

    #[cfg(not(unix))]
    pub fn isatty(&self) -> Result<bool> {
        Err(SioError::unsupported("isatty"))
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or_else(closed_stream)
    }
}

impl Stream for DiskFile {
    fn close(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        close_file(file)
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        Some(self)
    }

    #[cfg(unix)]
    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        Some(self)
    }
}

#[cfg(unix)]
fn close_file(file: File) -> Result<()> {
    use std::os::fd::IntoRawFd;

    let fd = file.into_raw_fd();
    // SAFETY: `into_raw_fd` 转移了所有权，此处是该描述符唯一一次关闭。
    if unsafe { libc::close(fd) } != 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(())
}

#[cfg(not(unix))]
fn close_file(file: File) -> Result<()> {
    drop(file);
    Ok(())
}

impl Readable for DiskFile {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        let file = self.file()?;
        let mut buf = BytesMut::zeroed(n.min(MAX_READ_CHUNK));
        let got = file.read(&mut buf)?;
        buf.truncate(got);
        Ok(buf.freeze())
    }
}

impl Writable for DiskFile {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file()?.write_all(data)?;
        Ok(())
    }
}

impl Seekable for DiskFile {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        let target = match whence {
            Whence::Start => SeekFrom::Start(
                u64::try_from(offset).map_err(|_| SioError::NegativePosition { target: offset })?,
            ),
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        self.file()?.seek(target)?;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.file()?.stream_position()?)
    }
}

impl Truncatable for DiskFile {
    #[cfg(unix)]
    fn truncate(&mut self, size: Option<u64>) -> Result<()> {
        let size = match size {
            Some(size) => size,
            None => self.tell()?,
        };
        self.file()?.set_len(size)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn truncate(&mut self, _size: Option<u64>) -> Result<()> {
        Err(SioError::unsupported("truncate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn scratch(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("创建临时目录");
        let path = dir.path().join("disk.bin");
        std::fs::write(&path, contents).expect("写入初始内容");
        (dir, path)
    }

    #[test]
    fn read_seek_tell_follow_the_descriptor() {
        let (_dir, path) = scratch(b"0123456789");
        let mut disk = DiskFile::open(&path, "r").unwrap();
        assert_eq!(&disk.read(4).unwrap()[..], b"0123");
        assert_eq!(disk.tell().unwrap(), 4);
        disk.seek(-2, Whence::End).unwrap();
        assert_eq!(&disk.read(10).unwrap()[..], b"89");
        assert!(disk.read(10).unwrap().is_empty(), "EOF 以空读表示");
        disk.seek_raw(1, 0).unwrap();
        assert_eq!(&disk.read(1).unwrap()[..], b"1");
        assert_eq!(disk.seek_raw(0, 5).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn append_mode_reopens_existing_file_at_end() {
        let (_dir, path) = scratch(b"head");
        let mut disk = DiskFile::open(&path, "a").unwrap();
        assert_eq!(disk.tell().unwrap(), 4);
        disk.write(b"-tail").unwrap();
        disk.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"head-tail");
    }

    #[test]
    fn write_mode_truncates_and_creates() {
        let (dir, path) = scratch(b"old contents");
        let mut disk = DiskFile::open(&path, "w").unwrap();
        disk.write(b"new").unwrap();
        disk.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        let fresh = dir.path().join("fresh.bin");
        let mut disk = DiskFile::open(&fresh, "wb+").unwrap();
        disk.write(b"abc").unwrap();
        disk.seek(0, Whence::Start).unwrap();
        assert_eq!(&disk.read(3).unwrap()[..], b"abc");
    }

    #[cfg(unix)]
    #[test]
    fn truncate_defaults_to_current_position() {
        let (_dir, path) = scratch(b"0123456789");
        let mut disk = DiskFile::open(&path, "r+").unwrap();
        disk.seek(3, Whence::Start).unwrap();
        disk.truncate(None).unwrap();
        disk.truncate(Some(5)).unwrap();
        disk.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"012\0\0");
    }

    #[cfg(unix)]
    #[test]
    fn regular_files_are_not_terminals() {
        let (_dir, path) = scratch(b"");
        let disk = DiskFile::open(&path, "r").unwrap();
        assert!(!disk.isatty().unwrap());
        assert!(disk.fileno().unwrap() >= 0);
    }

    #[test]
    fn operations_after_close_fail_and_close_is_idempotent() {
        let (_dir, path) = scratch(b"data");
        let mut disk = DiskFile::open(&path, "r").unwrap();
        disk.close().unwrap();
        disk.close().unwrap();
        assert!(disk.is_closed());
        let err = disk.read(1).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotConnected));
    }

    #[test]
    fn missing_file_surfaces_os_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DiskFile::open(dir.path().join("absent"), "r").unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
        let err = DiskFile::open(dir.path().join("absent"), "rw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
