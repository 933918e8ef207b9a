//! 可插拔的文本编解码能力。
//!
//! 编解码过滤器只依赖 [`TextCodec`]；内置 UTF-8、ASCII 与 Latin-1 三种实现，
//! 其它编码由调用方自行实现该 trait 接入。

use std::fmt;

/// 解码失败。
///
/// `incomplete` 为真表示输入只是在多字节序列中间被截断，补读后可能成功；
/// 为假表示输入本身非法，补读无济于事。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodeFailure {
    pub incomplete: bool,
    pub detail: String,
}

impl DecodeFailure {
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self {
            incomplete: false,
            detail: detail.into(),
        }
    }

    pub fn truncated(detail: impl Into<String>) -> Self {
        Self {
            incomplete: true,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// 编码失败：文本中存在目标编码无法表示的字符。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodeFailure {
    pub position: usize,
    pub ch: char,
}

impl fmt::Display for EncodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "character {:?} (U+{:04X}) at position {} is not representable",
            self.ch, self.ch as u32, self.position
        )
    }
}

/// 文本编解码能力。
pub trait TextCodec {
    /// 编码名，用于错误上下文。
    fn name(&self) -> &'static str;

    fn decode(&self, data: &[u8]) -> Result<String, DecodeFailure>;

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeFailure>;
}

/// UTF-8（默认编码）。
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Codec;

impl TextCodec for Utf8Codec {
    fn name(&self) -> &'static str {
        "utf-8"
    }

    fn decode(&self, data: &[u8]) -> Result<String, DecodeFailure> {
        match std::str::from_utf8(data) {
            Ok(text) => Ok(text.to_owned()),
            Err(err) if err.error_len().is_none() => Err(DecodeFailure::truncated(err.to_string())),
            Err(err) => Err(DecodeFailure::invalid(err.to_string())),
        }
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeFailure> {
        Ok(text.as_bytes().to_vec())
    }
}

/// 严格 7 位 ASCII。
#[derive(Clone, Copy, Debug, Default)]
pub struct AsciiCodec;

impl TextCodec for AsciiCodec {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn decode(&self, data: &[u8]) -> Result<String, DecodeFailure> {
        match data.iter().position(|byte| !byte.is_ascii()) {
            Some(offset) => Err(DecodeFailure::invalid(format!(
                "byte {:#04x} at offset {offset} is not ASCII",
                data[offset]
            ))),
            None => Ok(data.iter().map(|&byte| char::from(byte)).collect()),
        }
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeFailure> {
        encode_below(text, 0x80)
    }
}

/// ISO-8859-1：每个字节直接对应 U+0000..=U+00FF。
#[derive(Clone, Copy, Debug, Default)]
pub struct Latin1Codec;

impl TextCodec for Latin1Codec {
    fn name(&self) -> &'static str {
        "latin-1"
    }

    fn decode(&self, data: &[u8]) -> Result<String, DecodeFailure> {
        Ok(data.iter().map(|&byte| char::from(byte)).collect())
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeFailure> {
        encode_below(text, 0x100)
    }
}

fn encode_below(text: &str, limit: u32) -> Result<Vec<u8>, EncodeFailure> {
    text.chars()
        .enumerate()
        .map(|(position, ch)| {
            u8::try_from(ch as u32)
                .ok()
                .filter(|_| (ch as u32) < limit)
                .ok_or(EncodeFailure { position, ch })
        })
        .collect()
}
