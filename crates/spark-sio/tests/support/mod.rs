//! 集成测试共用的流替身。

#![allow(dead_code)]

use std::collections::VecDeque;

use bytes::Bytes;
use spark_sio::{Readable, Result, Seekable, SioError, Stream, Whence, Writable};

/// 按预设分片吐出数据的读源，可选地支持 seek。
///
/// 每次 `read(n)` 最多返回当前分片的前 `n` 字节，不跨分片拼接，
/// 以模拟管道、套接字一类“有多少给多少”的下层。
#[derive(Debug)]
pub struct PacketSource {
    data: Vec<u8>,
    boundaries: VecDeque<usize>,
    pos: usize,
    seekable: bool,
    pub reads: Vec<usize>,
}

impl PacketSource {
    pub fn new(packets: &[&[u8]]) -> Self {
        let mut data = Vec::new();
        let mut boundaries = VecDeque::new();
        for packet in packets {
            data.extend_from_slice(packet);
            boundaries.push_back(data.len());
        }
        Self {
            data,
            boundaries,
            pos: 0,
            seekable: false,
            reads: Vec::new(),
        }
    }

    pub fn seekable(mut self) -> Self {
        self.seekable = true;
        self
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn packet_end(&mut self) -> usize {
        while let Some(&end) = self.boundaries.front() {
            if end > self.pos {
                return end;
            }
            self.boundaries.pop_front();
        }
        self.data.len()
    }
}

impl Stream for PacketSource {
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        if self.seekable { Some(self) } else { None }
    }
}

impl Readable for PacketSource {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        self.reads.push(n);
        let end = self.packet_end().min(self.pos + n);
        let chunk = Bytes::copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(chunk)
    }
}

impl Seekable for PacketSource {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        let anchor = match whence {
            Whence::Start => 0,
            Whence::Current => self.pos as i64,
            Whence::End => self.data.len() as i64,
        };
        let target = anchor + offset;
        if target < 0 {
            return Err(SioError::NegativePosition { target });
        }
        self.pos = (target as usize).min(self.data.len());
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }
}

/// 记录每一次 `write` 调用的写端，不支持 seek。
#[derive(Debug, Default)]
pub struct RecordingWriter {
    pub writes: Vec<Vec<u8>>,
    pub flushes: usize,
    pub closed: bool,
}

impl RecordingWriter {
    pub fn contents(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl Stream for RecordingWriter {
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

impl Writable for RecordingWriter {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writes.push(data.to_vec());
        Ok(())
    }
}
