//! 过滤流：叠加在基础流或其它过滤流之上的单一职责变换。
//!
//! # 模块定位（Why）
//! - 换行归一、换行展开与字节/文本编解码彼此独立，拆成可自由堆叠的薄层；
//! - 过滤层自身不做缓冲，只保留完成变换所必需的最小状态（例如一个 `\r` 标志位）。
//!
//! # 能力透传（What）
//! - 过滤层未改变语义的能力（seek、truncate、flush、close）显式转发给下层；
//! - 下层不具备的能力，过滤层同样不声明。

pub mod codec;
pub mod crlf;
pub mod decoding;
pub mod encoding;
pub mod text_crlf;
pub mod text_input;
pub mod text_output;

pub use codec::{AsciiCodec, DecodeFailure, EncodeFailure, Latin1Codec, TextCodec, Utf8Codec};
pub use crlf::CRLFFilter;
pub use decoding::DecodingInputFilter;
pub use encoding::EncodingOutputFilter;
pub use text_crlf::TextCRLFFilter;
pub use text_input::{SeenNewlines, TextInputFilter};
pub use text_output::TextOutputFilter;

use bytes::{BufMut, Bytes, BytesMut};

/// 将 `\r\n` 与孤立的 `\r` 统一替换为 `\n`。
///
/// 先折叠 `\r\n` 再替换剩余 `\r`，单次扫描完成；不含 `\r` 的块原样返回，不发生拷贝。
pub(crate) fn translate_newlines(data: Bytes) -> Bytes {
    if !data.contains(&b'\r') {
        return data;
    }
    let mut out = BytesMut::with_capacity(data.len());
    let mut iter = data.iter().copied().peekable();
    while let Some(byte) = iter.next() {
        if byte == b'\r' {
            iter.next_if_eq(&b'\n');
            out.put_u8(b'\n');
        } else {
            out.put_u8(byte);
        }
    }
    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_collapses_before_lone_cr() {
        let cases: [(&[u8], &[u8]); 5] = [
            (b"plain\n", b"plain\n"),
            (b"a\r\nb", b"a\nb"),
            (b"a\rb\r", b"a\nb\n"),
            (b"\r\r\n\n", b"\n\n\n"),
            (b"", b""),
        ];
        for (input, expected) in cases {
            let output = translate_newlines(Bytes::copy_from_slice(input));
            assert_eq!(&output[..], expected, "输入 {input:?}");
        }
    }
}
