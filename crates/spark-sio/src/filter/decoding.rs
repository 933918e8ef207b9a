use tracing::trace;

use crate::config::StreamConfig;
use crate::error::{Result, SioError};
use crate::filter::codec::{TextCodec, Utf8Codec};
use crate::stream::{Readable, Seekable, Stream, TextReadable};

/// 解码输入过滤器：读取约 `n` 字节并按 `codec` 解码为文本。
///
/// # 教案式说明
/// - **意图 (Why)**：`read(n)` 的块边界可能恰好切开一个多字节字符；
/// - **契约 (What)**：
///   - 解码失败且仅因输入被截断时，每次向下层补读 1 字节再尝试，最多 `decode_retries` 次；
///   - 输入本身非法，或补读遇到 EOF，或次数用尽，都以 [`SioError::Decode`] 上抛；
///   - 返回的文本长度可能超过 `n`；换行不做翻译，需要时在下层叠加 [`TextInputFilter`](super::TextInputFilter)；
/// - **执行 (How)**：定位能力直接取自下层，位置以编码后的字节计。
#[derive(Debug)]
pub struct DecodingInputFilter<B, C = Utf8Codec> {
    base: B,
    codec: C,
    retries: usize,
}

impl<B> DecodingInputFilter<B> {
    /// UTF-8 解码。
    pub fn new(base: B) -> Self {
        Self::with_codec(base, Utf8Codec)
    }
}

impl<B, C: TextCodec> DecodingInputFilter<B, C> {
    pub fn with_codec(base: B, codec: C) -> Self {
        Self::with_config(base, codec, &StreamConfig::default())
    }

    pub fn with_config(base: B, codec: C, config: &StreamConfig) -> Self {
        Self {
            base,
            codec,
            retries: config.decode_retries,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn into_inner(self) -> B {
        self.base
    }
}

impl<B: Readable, C: TextCodec> Stream for DecodingInputFilter<B, C> {
    fn close(&mut self) -> Result<()> {
        self.base.close()
    }

    fn as_seekable(&mut self) -> Option<&mut dyn Seekable> {
        self.base.as_seekable()
    }
}

impl<B: Readable, C: TextCodec> TextReadable for DecodingInputFilter<B, C> {
    fn read_text(&mut self, n: usize) -> Result<String> {
        let mut pending = self.base.read(n)?.to_vec();
        let mut failure = match self.codec.decode(&pending) {
            Ok(text) => return Ok(text),
            Err(failure) => failure,
        };
        for attempt in 1..=self.retries {
            if !failure.incomplete {
                break;
            }
            let more = self.base.read(1)?;
            if more.is_empty() {
                break;
            }
            pending.extend_from_slice(&more);
            trace!(target: "spark_sio", attempt, pending = pending.len(), "decode retry");
            failure = match self.codec.decode(&pending) {
                Ok(text) => return Ok(text),
                Err(failure) => failure,
            };
        }
        Err(SioError::Decode {
            codec: self.codec.name(),
            detail: failure.detail,
        })
    }
}
