use bytes::Bytes;

use crate::config::LineSeparator;
use crate::error::Result;
use crate::stream::{Readable, Seekable, Stream, Truncatable, Writable};

/// 换行输出过滤器：把写入数据中的每个 `\n` 展开为配置的物理分隔符。
///
/// 分隔符本身就是 `\n` 时写入原样透传。定位、截断与读取能力直接取自下层，
/// 所以位置以物理字节计。
#[derive(Debug)]
pub struct TextOutputFilter<B> {
    base: B,
    separator: LineSeparator,
}

impl<B> TextOutputFilter<B> {
    pub fn new(base: B, separator: LineSeparator) -> Self {
        Self { base, separator }
    }

    /// 使用平台换行约定。
    pub fn with_platform_separator(base: B) -> Self {
        Self::new(base, LineSeparator::platform())
    }

    pub fn separator(&self) -> LineSeparator {
        self.separator
    }

    pub fn get_ref(&self) -> &B {
        &self.base
    }

    pub fn into_inner(self) -> B {
        self.base
    }
}

impl<B: Stream> Stream for TextOutputFilter<B> {
    fn close(&mut self) -> Result<()> {
        self.base.close()
    }

    fn flush(&mut self) -> Result<()> {
        self.base.flush()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        self.base.as_seekable()
    }

    fn as_truncatable(&mut self) -> Option<&mut dyn Truncatable> {
        self.base.as_truncatable()
    }
}

impl<B: Writable> Writable for TextOutputFilter<B> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.separator.is_lf() || !data.contains(&b'\n') {
            return self.base.write(data);
        }
        let separator = self.separator.as_bytes();
        let mut expanded = Vec::with_capacity(data.len() + data.len() / 8);
        for &byte in data {
            if byte == b'\n' {
                expanded.extend_from_slice(separator);
            } else {
                expanded.push(byte);
            }
        }
        self.base.write(&expanded)
    }
}

impl<B: Readable> Readable for TextOutputFilter<B> {
    fn read(&mut self, n: usize) -> Result<Bytes> {
        self.base.read(n)
    }
}
