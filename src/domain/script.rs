use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;

/// 中文字符的码位范围：CJK 统一表意文字及其扩展 A 区
///
/// 名称检测和内容检测都只认这一份定义。
pub const CHINESE_RANGES: [RangeInclusive<char>; 2] = [
    '\u{4E00}'..='\u{9FFF}',
    '\u{3400}'..='\u{4DBF}',
];

/// 判断单个字符是否为中文字符
pub fn is_chinese_char(c: char) -> bool {
    CHINESE_RANGES.iter().any(|range| range.contains(&c))
}

/// 由 `CHINESE_RANGES` 生成的字符类正则
fn chinese_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let class = CHINESE_RANGES
            .iter()
            .map(|r| format!(r"\x{{{:X}}}-\x{{{:X}}}", *r.start() as u32, *r.end() as u32))
            .collect::<String>();
        Regex::new(&format!("[{}]", class)).expect("无效的中文字符类")
    })
}

/// 中文字符检测器（无状态）
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptDetector;

impl ScriptDetector {
    /// 文本中是否包含至少一个中文字符
    pub fn contains_chinese_script(text: &str) -> bool {
        text.chars().any(is_chinese_char)
    }

    /// 第一个中文字符所在的字节偏移
    pub fn first_match(text: &str) -> Option<usize> {
        chinese_regex().find(text).map(|m| m.start())
    }

    /// 截取第一个匹配附近的文本片段
    ///
    /// 片段不跨行，且匹配点前后各最多保留 `window` 个字符，首尾空白会被去掉。
    pub fn first_match_excerpt(text: &str, window: usize) -> Option<String> {
        let start = Self::first_match(text)?;

        let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = text[start..].find('\n').map_or(text.len(), |i| start + i);

        let before = &text[line_start..start];
        let after = &text[start..line_end];

        // 向前保留 window 个字符
        let skip = before.chars().count().saturating_sub(window);
        let head: String = before.chars().skip(skip).collect();
        // 匹配字符本身加上其后 window 个字符
        let tail: String = after.chars().take(window + 1).collect();

        let excerpt = format!("{}{}", head, tail);
        Some(excerpt.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_boundaries() {
        assert!(is_chinese_char('\u{4E00}'));
        assert!(is_chinese_char('\u{9FFF}'));
        assert!(is_chinese_char('\u{3400}'));
        assert!(is_chinese_char('\u{4DBF}'));
        assert!(!is_chinese_char('\u{4DC0}'));
        assert!(!is_chinese_char('\u{A000}'));
        assert!(!is_chinese_char('\u{33FF}'));
    }

    #[test]
    fn test_contains_chinese_script() {
        assert!(ScriptDetector::contains_chinese_script("测试.txt"));
        assert!(ScriptDetector::contains_chinese_script("report_㐀.md"));
        assert!(!ScriptDetector::contains_chinese_script("notes.txt"));
        // 日文假名与全角标点不算
        assert!(!ScriptDetector::contains_chinese_script("ひらがな。"));
        assert!(!ScriptDetector::contains_chinese_script(""));
    }

    #[test]
    fn test_regex_agrees_with_char_check() {
        for text in ["abc", "a中b", "㐀", "\u{4DC0}\u{A000}", "x\u{9FFF}"] {
            assert_eq!(
                ScriptDetector::first_match(text).is_some(),
                ScriptDetector::contains_chinese_script(text),
                "不一致: {:?}",
                text
            );
        }
    }

    #[test]
    fn test_excerpt_whole_line() {
        let text = "hello\n  你好世界  \nbye";
        assert_eq!(
            ScriptDetector::first_match_excerpt(text, 40).as_deref(),
            Some("你好世界")
        );
    }

    #[test]
    fn test_excerpt_window() {
        let text = format!("{}中{}", "a".repeat(100), "b".repeat(100));
        let excerpt = ScriptDetector::first_match_excerpt(&text, 3).unwrap();
        assert_eq!(excerpt, "aaa中bbb");
    }

    #[test]
    fn test_excerpt_none() {
        assert!(ScriptDetector::first_match_excerpt("plain ascii\ntext", 10).is_none());
    }
}
