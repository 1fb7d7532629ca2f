use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io;
use utils_common::models::{CatalogStats, ProductVariant};

/// 颜色组 - 同一款式同一颜色的全部变体（按尺码区分）
///
/// 成员顺序保持源列表中的首次出现顺序。
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColorGroup {
    /// 颜色组标识符
    pub color_sku: String,
    /// 组内变体，按源顺序排列
    pub variants: Vec<ProductVariant>,
}

/// 建立倒排索引的字段 - 封闭枚举，避免以字符串传递字段名
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexedField {
    Category,
    Subcategory,
    Gender,
    Brand,
    Color,
    Size,
}

impl IndexedField {
    /// 全部索引字段，按固定顺序
    pub const ALL: [IndexedField; 6] = [
        IndexedField::Category,
        IndexedField::Subcategory,
        IndexedField::Gender,
        IndexedField::Brand,
        IndexedField::Color,
        IndexedField::Size,
    ];

    /// 取出变体在该字段上的取值
    pub fn value_of(self, variant: &ProductVariant) -> &str {
        match self {
            IndexedField::Category => &variant.category,
            IndexedField::Subcategory => &variant.subcategory,
            IndexedField::Gender => &variant.gender,
            IndexedField::Brand => &variant.brand,
            IndexedField::Color => &variant.color,
            IndexedField::Size => &variant.size_label,
        }
    }
}

/// 六个字段的倒排索引: 字段取值 -> 含有该取值的颜色组位置集合
///
/// 一个颜色组的成员在某字段上取值不一致时（例如同组内既有 M 又有 F），
/// 该组会同时出现在这个字段的多个桶里。空字符串是合法的桶键，
/// 代表"该字段未填写"的商品。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FieldIndexes {
    tables: [HashMap<String, HashSet<usize>>; 6],
}

impl FieldIndexes {
    /// 把颜色组登记到某字段某取值的桶里
    pub fn add(&mut self, field: IndexedField, value: &str, group_pos: usize) {
        self.tables[field as usize]
            .entry(value.to_string())
            .or_default()
            .insert(group_pos);
    }

    /// 某字段某取值的桶，不存在时返回 None
    pub fn bucket(&self, field: IndexedField, value: &str) -> Option<&HashSet<usize>> {
        self.tables[field as usize].get(value)
    }

    /// 某字段出现过的全部取值
    pub fn values(&self, field: IndexedField) -> impl Iterator<Item = &String> {
        self.tables[field as usize].keys()
    }

    /// 某字段的取值数量
    pub fn value_count(&self, field: IndexedField) -> usize {
        self.tables[field as usize].len()
    }
}

/// 目录索引 - 颜色组集合、倒排索引和构建统计
///
/// 每次商品列表重新拉取后整体重建，从不增量修改。
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CatalogIndex {
    /// 全部颜色组，按首次出现顺序
    pub groups: Vec<ColorGroup>,
    /// 六个字段的倒排索引
    pub indexes: FieldIndexes,
    /// 构建统计
    pub stats: CatalogStats,
}

impl CatalogIndex {
    /// 空目录 - 商品列表为空时的合法稳态
    pub fn empty() -> Self {
        CatalogIndex {
            groups: Vec::new(),
            indexes: FieldIndexes::default(),
            stats: CatalogStats {
                variant_count: 0,
                group_count: 0,
                brand_count: 0,
                malformed_count: 0,
                bad_date_count: 0,
                built_at: Utc::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// 从压缩的二进制快照恢复索引
    pub fn from_compressed(data: &[u8]) -> Result<Self, io::Error> {
        utils_common::compression::from_compressed(data)
    }
}

/// 筛选参数 - 前端传入的筛选与排序条件，字段名与 SPA 保持一致
///
/// 空字符串与缺省等价，均表示该条件未启用。
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct FilterParams {
    /// 大类（未选时不限制）
    #[serde(rename = "selectedCategory")]
    pub selected_category: Option<String>,
    /// 子类
    #[serde(rename = "filterSubcat")]
    pub filter_subcat: Option<String>,
    /// 性别: "M" 或 "F"，其它值不限制；选中时中性款同样命中
    #[serde(rename = "filterGender")]
    pub filter_gender: Option<String>,
    /// 品牌多选（空列表不限制）
    #[serde(rename = "filterBrands")]
    pub filter_brands: Vec<String>,
    /// 颜色多选
    #[serde(rename = "filterColors")]
    pub filter_colors: Vec<String>,
    /// 尺码多选
    #[serde(rename = "filterSizes")]
    pub filter_sizes: Vec<String>,
    /// 最低价（组内任一变体达到即保留）
    #[serde(rename = "filterPriceMin")]
    pub filter_price_min: Option<f64>,
    /// 最高价
    #[serde(rename = "filterPriceMax")]
    pub filter_price_max: Option<f64>,
    /// 排序字段: "date"、"price" 或 "sales"，其它值按 "date" 处理
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    /// 排序方向: "asc" 或 "desc"，默认 "desc"
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

impl FilterParams {
    /// 启用中的大类条件
    pub fn category(&self) -> Option<&str> {
        active(&self.selected_category)
    }

    /// 启用中的子类条件
    pub fn subcat(&self) -> Option<&str> {
        active(&self.filter_subcat)
    }

    /// 启用中的性别条件，只认 "M" 和 "F"
    pub fn gender(&self) -> Option<&str> {
        active(&self.filter_gender).filter(|g| *g == "M" || *g == "F")
    }
}

/// 空字符串与 None 都视为条件未启用
fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// 颜色组视图 - 返回给前端展示层的单个条目
///
/// 派生字段的拼写沿用 SPA 的约定。
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProductView {
    /// 颜色组标识符
    pub color_sku: String,
    /// 组内全部变体
    pub variants: Vec<ProductVariant>,
    /// 组内最低价
    #[serde(rename = "minPrice")]
    pub min_price: f64,
    /// 组内最早上架时间（字符串比较意义下的最小值）
    #[serde(rename = "minDate")]
    pub min_date: String,
    /// 组内累计销量
    #[serde(rename = "totalSales")]
    pub total_sales: u64,
    /// 最低价对应的变体，作为组的代表展示
    #[serde(rename = "minPriceVariant")]
    pub min_price_variant: ProductVariant,
}

/// 筛选结果 - 返回给前端的已排序列表
#[derive(Serialize, Debug)]
pub struct FilterOutcome {
    /// 满足全部条件的颜色组，已按排序参数排好
    pub products: Vec<ProductView>,
    /// 结果总数
    pub total: usize,
}
