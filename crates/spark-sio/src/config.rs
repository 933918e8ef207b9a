//! 流栈调优参数。
//!
//! # 设计概要
//! - [`StreamConfig`] 汇总缓冲粒度、整读上限、换行约定与解码重试次数；
//! - 可在代码中通过 `with_*` 链式构造，也可从 TOML 片段加载（缺省字段沿用默认值）；
//! - 构造缓冲流时调用 [`StreamConfig::validate`]，非法组合以 [`SioError::Config`] 拒绝。

use serde::{Deserialize, Serialize};

use crate::error::{Result, SioError};

/// 默认缓冲粒度：8 KiB。
pub const DEFAULT_BUFSIZE: usize = 1 << 13;
/// `read_all` 几何增长的上限：512 KiB。
pub const DEFAULT_BIGSIZE: usize = 1 << 19;
/// 解码过滤器在截断时最多补读的字节数。
pub const DEFAULT_DECODE_RETRIES: usize = 9;

/// 行分隔符约定。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSeparator {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
    /// `\r`
    Cr,
}

impl LineSeparator {
    /// 当前平台的换行约定。
    pub const fn platform() -> Self {
        if cfg!(windows) {
            LineSeparator::CrLf
        } else {
            LineSeparator::Lf
        }
    }

    /// 分隔符的字节形式。
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            LineSeparator::Lf => b"\n",
            LineSeparator::CrLf => b"\r\n",
            LineSeparator::Cr => b"\r",
        }
    }

    /// 是否与逻辑换行 `\n` 相同（此时输出过滤器无需改写）。
    pub const fn is_lf(self) -> bool {
        matches!(self, LineSeparator::Lf)
    }
}

impl Default for LineSeparator {
    fn default() -> Self {
        Self::platform()
    }
}

/// 缓冲流与过滤流共享的调优参数。
///
/// # 契约说明（What）
/// - `bufsize`：每次向下层补读/刷写的粒度提示，必须大于 0；
/// - `bigsize`：`read_all` 分块的增长上限，不得小于 `bufsize`；
/// - `line_separator`：行缓冲输出与换行输出过滤器使用的物理分隔符；
/// - `decode_retries`：解码过滤器遇到截断的多字节序列时，逐字节补读的最大次数。
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub bufsize: usize,
    pub bigsize: usize,
    pub line_separator: LineSeparator,
    pub decode_retries: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            bufsize: DEFAULT_BUFSIZE,
            bigsize: DEFAULT_BIGSIZE,
            line_separator: LineSeparator::platform(),
            decode_retries: DEFAULT_DECODE_RETRIES,
        }
    }
}

impl StreamConfig {
    /// 使用默认值创建配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 TOML 片段解析配置，并立即校验。
    ///
    /// ```
    /// use spark_sio::StreamConfig;
    ///
    /// let config = StreamConfig::from_toml_str("bufsize = 4096\nline_separator = \"crlf\"").unwrap();
    /// assert_eq!(config.bufsize, 4096);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: StreamConfig = toml::from_str(source).map_err(|err| SioError::Config {
            detail: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_bufsize(mut self, bufsize: usize) -> Self {
        self.bufsize = bufsize;
        self
    }

    pub fn with_bigsize(mut self, bigsize: usize) -> Self {
        self.bigsize = bigsize;
        self
    }

    pub fn with_line_separator(mut self, line_separator: LineSeparator) -> Self {
        self.line_separator = line_separator;
        self
    }

    pub fn with_decode_retries(mut self, decode_retries: usize) -> Self {
        self.decode_retries = decode_retries;
        self
    }

    /// 校验参数组合。
    pub fn validate(&self) -> Result<()> {
        if self.bufsize == 0 {
            return Err(SioError::Config {
                detail: "bufsize must be greater than zero".to_owned(),
            });
        }
        if self.bigsize < self.bufsize {
            return Err(SioError::Config {
                detail: format!(
                    "bigsize {} must not be smaller than bufsize {}",
                    self.bigsize, self.bufsize
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_match_documented_values() {
        let config = StreamConfig::default();
        assert_eq!(config.bufsize, 8192);
        assert_eq!(config.bigsize, 512 * 1024);
        assert_eq!(config.decode_retries, 9);
        assert_eq!(config.line_separator, LineSeparator::platform());
        config.validate().expect("默认配置必须合法");
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = StreamConfig::from_toml_str("bufsize = 16\nline_separator = \"cr\"")
            .expect("合法 TOML 应解析成功");
        assert_eq!(config.bufsize, 16);
        assert_eq!(config.bigsize, DEFAULT_BIGSIZE);
        assert_eq!(config.line_separator, LineSeparator::Cr);
    }

    #[test]
    fn invalid_combinations_are_rejected() {
        let err = StreamConfig::new().with_bufsize(0).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = StreamConfig::from_toml_str("bufsize = 64\nbigsize = 32").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = StreamConfig::from_toml_str("buffer = 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config, "未知字段应被拒绝");
    }

    #[test]
    fn separator_bytes() {
        assert_eq!(LineSeparator::Lf.as_bytes(), b"\n");
        assert_eq!(LineSeparator::CrLf.as_bytes(), b"\r\n");
        assert_eq!(LineSeparator::Cr.as_bytes(), b"\r");
        assert!(LineSeparator::Lf.is_lf());
        assert!(!LineSeparator::Cr.is_lf());
    }
}
