use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 中性款商品的性别标记，筛选 M/F 时同样命中
pub const GENDER_UNISEX: &str = "U";

/// 商品变体 - 后端商品列表接口返回的单条记录（一个尺码/颜色组合）
///
/// 所有字符串字段都带 default：某个字段缺失时按空字符串处理，
/// 不会导致整份商品列表解析失败。
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProductVariant {
    /// 变体唯一标识符
    #[serde(default)]
    pub variant_sku: String,
    /// 款式标识符（同一款式的所有变体共享）
    #[serde(default)]
    pub sku: String,
    /// 颜色组标识符（同一款式同一颜色的所有尺码共享）
    #[serde(default)]
    pub color_sku: String,
    /// 商品大类
    #[serde(default)]
    pub category: String,
    /// 商品子类
    #[serde(default)]
    pub subcategory: String,
    /// 性别: "M"、"F" 或 "U"（中性）
    #[serde(default)]
    pub gender: String,
    /// 品牌
    #[serde(default)]
    pub brand: String,
    /// 颜色名称
    #[serde(default)]
    pub color: String,
    /// 尺码标签（字母码、数字码或自由文本）
    #[serde(default)]
    pub size_label: String,
    /// 价格
    #[serde(default)]
    pub price: f64,
    /// 上架时间（后端序列化为定宽 ISO 8601 字符串，排序时按字符串比较）
    #[serde(default)]
    pub created_at: String,
    /// 累计销量（后端可能不返回该字段，缺失按 0 处理）
    #[serde(default)]
    pub count_sales: u64,
}

/// 目录统计信息 - 一次索引构建的概要
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CatalogStats {
    /// 参与构建的变体数量
    pub variant_count: usize,
    /// 颜色组数量（不同 color_sku 的数量）
    pub group_count: usize,
    /// 不同品牌数量
    pub brand_count: usize,
    /// 缺失 color_sku 的变体数量
    pub malformed_count: usize,
    /// created_at 无法按 RFC 3339 解析的变体数量
    pub bad_date_count: usize,
    /// 构建时间
    pub built_at: DateTime<Utc>,
    /// 构建器版本
    pub version: String,
}
