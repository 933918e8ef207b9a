//! 打开模式字符串到打开标志的固定映射。

use std::fs::OpenOptions;

use crate::error::{Result, SioError};

/// 解析后的打开模式。
///
/// - `reading`/`writing`：访问方向；
/// - `create`/`truncate`/`exclusive`：创建语义，`exclusive` 对应 `O_EXCL`；
/// - `append`：打开后定位到文件末尾（`a` 系列）；
/// - `universal`：请求通用换行（`U` 前缀或 `rU`）；
/// - `binary`：请求二进制模式；非二进制模式在分隔符为 `\r\n` 时叠加 `TextCRLFFilter`。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OpenMode {
    pub reading: bool,
    pub writing: bool,
    pub create: bool,
    pub truncate: bool,
    pub exclusive: bool,
    pub append: bool,
    pub universal: bool,
    pub binary: bool,
}

const READ_ONLY: OpenMode = OpenMode {
    reading: true,
    writing: false,
    create: false,
    truncate: false,
    exclusive: false,
    append: false,
    universal: false,
    binary: false,
};

const WRITE_TRUNCATE: OpenMode = OpenMode {
    reading: false,
    writing: true,
    create: true,
    truncate: true,
    ..READ_ONLY
};

const APPEND: OpenMode = OpenMode {
    reading: false,
    writing: true,
    create: true,
    exclusive: true,
    append: true,
    ..READ_ONLY
};

const READ_WRITE: OpenMode = OpenMode {
    writing: true,
    ..READ_ONLY
};

impl OpenMode {
    /// 解析模式字符串。
    ///
    /// 仅接受 `r, rb, rU, U, w, wb, a, ab, r+, rb+, r+b, w+, wb+, w+b, a+, ab+, a+b`，
    /// 其余一律返回 [`SioError::InvalidMode`]。
    pub fn parse(mode: &str) -> Result<Self> {
        let parsed = match mode {
            "r" => READ_ONLY,
            "rb" => OpenMode { binary: true, ..READ_ONLY },
            "rU" | "U" => OpenMode { universal: true, ..READ_ONLY },
            "w" => WRITE_TRUNCATE,
            "wb" => OpenMode { binary: true, ..WRITE_TRUNCATE },
            "a" => APPEND,
            "ab" => OpenMode { binary: true, ..APPEND },
            "r+" => READ_WRITE,
            "rb+" | "r+b" => OpenMode { binary: true, ..READ_WRITE },
            "w+" => OpenMode { reading: true, ..WRITE_TRUNCATE },
            "wb+" | "w+b" => OpenMode {
                reading: true,
                binary: true,
                ..WRITE_TRUNCATE
            },
            "a+" => OpenMode { reading: true, ..APPEND },
            "ab+" | "a+b" => OpenMode {
                reading: true,
                binary: true,
                ..APPEND
            },
            other => {
                return Err(SioError::InvalidMode {
                    mode: other.to_owned(),
                });
            }
        };
        Ok(parsed)
    }

    /// 按本模式构造 `OpenOptions`。
    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.reading).write(self.writing);
        if self.exclusive {
            options.create_new(true);
        } else {
            options.create(self.create).truncate(self.truncate);
        }
        options
    }

    /// 独占创建失败（文件已存在）后的回退选项：保留读写方向，去掉创建语义。
    pub(crate) fn reopen_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.reading).write(self.writing);
        options
    }

    /// 读写双向。
    pub fn is_duplex(&self) -> bool {
        self.reading && self.writing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn every_documented_mode_parses() {
        let modes = [
            "r", "rb", "rU", "U", "w", "wb", "a", "ab", "r+", "rb+", "r+b", "w+", "wb+", "w+b",
            "a+", "ab+", "a+b",
        ];
        for mode in modes {
            let parsed = OpenMode::parse(mode).unwrap_or_else(|err| panic!("{mode}: {err}"));
            assert!(parsed.reading || parsed.writing, "{mode} 至少有一个访问方向");
        }
    }

    #[test]
    fn flags_follow_the_table() {
        let r = OpenMode::parse("r").unwrap();
        assert!(r.reading && !r.writing && !r.create);

        let u = OpenMode::parse("U").unwrap();
        assert!(u.reading && u.universal);

        let w = OpenMode::parse("w").unwrap();
        assert!(!w.reading && w.writing && w.create && w.truncate && !w.exclusive);

        let a = OpenMode::parse("a").unwrap();
        assert!(a.writing && a.create && a.exclusive && a.append && !a.truncate);

        let rw = OpenMode::parse("r+b").unwrap();
        assert!(rw.is_duplex() && rw.binary && !rw.create);

        let wp = OpenMode::parse("w+").unwrap();
        assert!(wp.is_duplex() && wp.truncate);

        let ap = OpenMode::parse("a+b").unwrap();
        assert!(ap.is_duplex() && ap.exclusive && ap.binary);
    }

    #[test]
    fn unknown_modes_are_invalid_arguments() {
        for mode in ["", "x", "rw", "r++", "br", "w+a"] {
            let err = OpenMode::parse(mode).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "模式 `{mode}`");
        }
    }
}
