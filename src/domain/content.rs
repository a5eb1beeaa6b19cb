use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 非文本控制字符占比超过该值即视为二进制
const BINARY_CONTROL_RATIO: f64 = 0.3;

/// 无法按 UTF-8 严格解码时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// 非法 UTF-8 记为该文件的错误，不做内容匹配
    Strict,
    /// 以替换字符解码，不产生错误
    Lossy,
}

/// 单个文件的读取错误，只影响该文件
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("无权限读取文件: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("文件在扫描过程中消失: {}", path.display())]
    Vanished { path: PathBuf },

    #[error("读取文件失败: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("文件不是有效的 UTF-8 文本 (字节偏移 {offset}): {}", path.display())]
    Decode { path: PathBuf, offset: usize },
}

impl ReadError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::PermissionDenied => ReadError::PermissionDenied { path },
            io::ErrorKind::NotFound => ReadError::Vanished { path },
            _ => ReadError::Io { path, source: err },
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ReadError::Decode { .. })
    }
}

/// 读取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// 解码后的文本；`truncated` 表示文件超出字节预算，只读取了前缀
    Text { text: String, truncated: bool },
    /// 判定为二进制，跳过内容检查
    Binary,
}

/// 文件内容读取器
#[derive(Debug, Clone)]
pub struct ContentReader {
    max_bytes: u64,
    probe_bytes: usize,
    policy: DecodePolicy,
}

impl ContentReader {
    pub fn new(max_bytes: u64, probe_bytes: usize, policy: DecodePolicy) -> Self {
        Self {
            max_bytes,
            probe_bytes,
            policy,
        }
    }

    /// 读取文件最多 `max_bytes` 字节，判断是否为二进制并解码
    pub fn read_for_scan(&self, path: &Path) -> Result<FileContent, ReadError> {
        let file = File::open(path).map_err(|err| ReadError::from_io(path, err))?;

        // 多读一个字节用于判断是否超出预算
        let mut buf = Vec::new();
        file.take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut buf)
            .map_err(|err| ReadError::from_io(path, err))?;

        let truncated = buf.len() as u64 > self.max_bytes;
        if truncated {
            buf.truncate(self.max_bytes as usize);
        }

        if looks_binary(&buf[..buf.len().min(self.probe_bytes)]) {
            return Ok(FileContent::Binary);
        }

        let bytes = buf.strip_prefix(UTF8_BOM).unwrap_or(&buf[..]);
        let text = self.decode(path, bytes, truncated)?;

        Ok(FileContent::Text { text, truncated })
    }

    fn decode(&self, path: &Path, bytes: &[u8], truncated: bool) -> Result<String, ReadError> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_string()),
            // 截断位置恰好落在多字节字符中间，丢掉不完整的尾部
            Err(err) if truncated && err.error_len().is_none() => {
                Ok(String::from_utf8_lossy(&bytes[..err.valid_up_to()]).into_owned())
            }
            Err(err) => match self.policy {
                DecodePolicy::Strict => Err(ReadError::Decode {
                    path: path.to_path_buf(),
                    offset: err.valid_up_to(),
                }),
                DecodePolicy::Lossy => Ok(bytes.to_str_lossy().into_owned()),
            },
        }
    }
}

/// 二进制判定：探测区内出现 NUL 字节，或非文本控制字符占比过高
pub fn looks_binary(probe: &[u8]) -> bool {
    if probe.is_empty() {
        return false;
    }
    if probe.find_byte(0).is_some() {
        return true;
    }

    let control = probe
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B))
        .count();

    control as f64 / probe.len() as f64 > BINARY_CONTROL_RATIO
}
