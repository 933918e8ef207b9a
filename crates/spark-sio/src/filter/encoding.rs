use crate::error::{Result, SioError};
use crate::filter::codec::{TextCodec, Utf8Codec};
use crate::stream::{Seekable, Stream, TextWritable, Truncatable, Writable};

/// 编码输出过滤器：文本按 `codec` 编码后写入下层。
///
/// 也接受原始字节，但只限 ASCII；非 ASCII 的原始字节无法确定其编码，属于调用方错误，
/// 以 [`SioError::NonAsciiBytes`] 拒绝。
#[derive(Debug)]
pub struct EncodingOutputFilter<B, C = Utf8Codec> {
    base: B,
    codec: C,
}

impl<B> EncodingOutputFilter<B> {
    pub fn new(base: B) -> Self {
        Self::with_codec(base, Utf8Codec)
    }
}

impl<B, C: TextCodec> EncodingOutputFilter<B, C> {
    pub fn with_codec(base: B, codec: C) -> Self {
        Self { base, codec }
    }

    pub fn get_ref(&self) -> &B {
        &self.base
    }

    pub fn into_inner(self) -> B {
        self.base
    }
}

impl<B: Writable, C: TextCodec> Stream for EncodingOutputFilter<B, C> {
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

impl<B: Writable, C: TextCodec> TextWritable for EncodingOutputFilter<B, C> {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let encoded = self.codec.encode(text).map_err(|failure| SioError::Encode {
            codec: self.codec.name(),
            detail: failure.to_string(),
        })?;
        self.base.write(&encoded)
    }
}

impl<B: Writable, C: TextCodec> Writable for EncodingOutputFilter<B, C> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if let Some(offset) = data.iter().position(|byte| !byte.is_ascii()) {
            return Err(SioError::NonAsciiBytes {
                offset,
                byte: data[offset],
            });
        }
        let text: String = data.iter().map(|&byte| char::from(byte)).collect();
        self.write_text(&text)
    }
}
