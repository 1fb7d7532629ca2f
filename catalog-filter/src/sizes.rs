use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

use crate::collate;

/// 字母码的规范顺序，从最小码到最大码
pub const LETTER_ORDER: [&str; 11] = [
    "XXXXS", "XXXS", "XXS", "XS", "S", "M", "L", "XL", "XXL", "XXXL", "XXXXL",
];

static LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+$").unwrap());
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").unwrap());

/// 尺码分档 - 显式标注一个尺码标签落在哪一档
///
/// 档位顺序: 规范字母码 < 其它纯字母码 < 数字码 < 其余自由文本。
#[derive(Debug, Clone, PartialEq)]
pub enum SizeClass {
    /// 规范字母码，携带其在 [`LETTER_ORDER`] 中的位置
    KnownLetter(usize),
    /// 规范序列之外的纯字母标签（区分大小写，"m" 不算规范码）
    OtherLetter,
    /// 纯数字标签，允许一位小数点
    Numeric(f64),
    /// 其余自由文本
    Other,
}

/// 对尺码标签分档
pub fn classify(label: &str) -> SizeClass {
    if LETTER_RE.is_match(label) {
        return match LETTER_ORDER.iter().position(|s| *s == label) {
            Some(rank) => SizeClass::KnownLetter(rank),
            None => SizeClass::OtherLetter,
        };
    }
    if NUMERIC_RE.is_match(label) {
        // 正则已保证可解析
        return SizeClass::Numeric(label.parse().unwrap_or(0.0));
    }
    SizeClass::Other
}

/// 尺码标签的全序比较
///
/// 同档之内: 规范码按序列位置，其它字母码按字典序，数字码按数值，
/// 自由文本按俄语字典序；并列一律回退到原文比较，保证重复渲染稳定。
pub fn compare(a: &str, b: &str) -> Ordering {
    use SizeClass::*;

    match (classify(a), classify(b)) {
        (KnownLetter(x), KnownLetter(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (KnownLetter(_), _) => Ordering::Less,
        (_, KnownLetter(_)) => Ordering::Greater,

        (OtherLetter, OtherLetter) => collate(a, b),
        (OtherLetter, _) => Ordering::Less,
        (_, OtherLetter) => Ordering::Greater,

        (Numeric(x), Numeric(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Numeric(_), Other) => Ordering::Less,
        (Other, Numeric(_)) => Ordering::Greater,

        (Other, Other) => collate(a, b),
    }
}
