use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;

use crate::models::{CatalogIndex, ColorGroup, FieldIndexes, IndexedField};
use utils_common::compression::{to_compressed, CATALOG_INDEX_VERSION};
use utils_common::models::{CatalogStats, ProductVariant};

/// 目录索引构建器
///
/// 接收后端商品列表的原始变体记录，产出颜色组集合和六个字段的
/// 倒排索引。构建总是从头开始，产出的索引整体替换旧索引。
pub struct CatalogBuilder {
    variants: Vec<ProductVariant>,
}

impl CatalogBuilder {
    /// 创建新的目录索引构建器
    pub fn new() -> Self {
        CatalogBuilder {
            variants: Vec::new(),
        }
    }

    /// 从现成的变体列表创建构建器
    pub fn from_variants(variants: Vec<ProductVariant>) -> Self {
        CatalogBuilder { variants }
    }

    /// 添加一条变体记录
    pub fn add_variant(&mut self, variant: ProductVariant) {
        self.variants.push(variant);
    }

    /// 批量添加变体记录
    pub fn add_variants(&mut self, variants: impl IntoIterator<Item = ProductVariant>) {
        self.variants.extend(variants);
    }

    /// 已收集的变体数量
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// 构建目录索引
    ///
    /// 空列表产出空索引，这是合法稳态而不是错误。字段缺失的变体
    /// 以空字符串参与索引，只计数不报错。
    pub fn build_catalog_index(&self) -> CatalogIndex {
        // 按 color_sku 分组，组和组内变体都保持首次出现顺序
        let mut groups: Vec<ColorGroup> = Vec::new();
        let mut pos_by_key: HashMap<&str, usize> = HashMap::new();
        let mut malformed_count = 0usize;
        let mut bad_date_count = 0usize;

        for variant in &self.variants {
            if variant.color_sku.is_empty() {
                malformed_count += 1;
            }
            if DateTime::parse_from_rfc3339(&variant.created_at).is_err() {
                bad_date_count += 1;
            }

            let pos = match pos_by_key.get(variant.color_sku.as_str()).copied() {
                Some(pos) => pos,
                None => {
                    groups.push(ColorGroup {
                        color_sku: variant.color_sku.clone(),
                        variants: Vec::new(),
                    });
                    pos_by_key.insert(&variant.color_sku, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[pos].variants.push(variant.clone());
        }

        // 倒排索引: 组在某字段上的每个不同取值各登记一次
        let mut indexes = FieldIndexes::default();
        for (pos, group) in groups.iter().enumerate() {
            for field in IndexedField::ALL {
                let distinct: HashSet<&str> =
                    group.variants.iter().map(|v| field.value_of(v)).collect();
                for value in distinct {
                    indexes.add(field, value, pos);
                }
            }
        }

        let stats = CatalogStats {
            variant_count: self.variants.len(),
            group_count: groups.len(),
            brand_count: indexes.value_count(IndexedField::Brand),
            malformed_count,
            bad_date_count,
            built_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        CatalogIndex {
            groups,
            indexes,
            stats,
        }
    }

    /// 构建索引并保存为压缩的二进制快照
    pub fn save_catalog_index(&self, path: &str) -> Result<CatalogStats, String> {
        let index = self.build_catalog_index();
        let stats = index.stats.clone();

        let data = to_compressed(&index, CATALOG_INDEX_VERSION)
            .map_err(|e| format!("压缩目录索引失败: {}", e))?;

        let mut file = File::create(path).map_err(|e| format!("无法创建索引文件 {}: {}", path, e))?;
        file.write_all(&data)
            .map_err(|e| format!("写入索引文件 {} 失败: {}", path, e))?;

        println!(
            "目录索引已写入 {}，变体 {} 条，颜色组 {} 个，大小 {} 字节",
            path, stats.variant_count, stats.group_count, data.len()
        );

        Ok(stats)
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        CatalogBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(color_sku: &str, gender: &str, size: &str) -> ProductVariant {
        ProductVariant {
            variant_sku: format!("{}-{}", color_sku, size),
            sku: color_sku.split('-').next().unwrap_or("").to_string(),
            color_sku: color_sku.to_string(),
            category: "Одежда".to_string(),
            subcategory: "Футболки".to_string(),
            gender: gender.to_string(),
            brand: "Stone Island".to_string(),
            color: "Чёрный".to_string(),
            size_label: size.to_string(),
            price: 4990.0,
            created_at: "2025-02-10T09:30:00.000000Z".to_string(),
            count_sales: 1,
        }
    }

    #[test]
    fn every_variant_lands_in_exactly_one_group() {
        let builder = CatalogBuilder::from_variants(vec![
            variant("TS-BLK", "M", "S"),
            variant("TS-WHT", "M", "S"),
            variant("TS-BLK", "M", "M"),
            variant("TS-BLK", "F", "L"),
        ]);
        let index = builder.build_catalog_index();

        // 组数等于不同 color_sku 的数量，组顺序是首次出现顺序
        assert_eq!(index.groups.len(), 2);
        assert_eq!(index.groups[0].color_sku, "TS-BLK");
        assert_eq!(index.groups[1].color_sku, "TS-WHT");

        let total: usize = index.groups.iter().map(|g| g.variants.len()).sum();
        assert_eq!(total, 4);
        // 组内顺序是源顺序
        let sizes: Vec<&str> = index.groups[0]
            .variants
            .iter()
            .map(|v| v.size_label.as_str())
            .collect();
        assert_eq!(sizes, vec!["S", "M", "L"]);
    }

    #[test]
    fn group_registers_under_every_distinct_value() {
        let builder = CatalogBuilder::from_variants(vec![
            variant("TS-BLK", "M", "S"),
            variant("TS-BLK", "F", "M"),
        ]);
        let index = builder.build_catalog_index();

        // 成员性别不一致的组同时出现在两个桶里
        let m_bucket = index.indexes.bucket(IndexedField::Gender, "M").unwrap();
        let f_bucket = index.indexes.bucket(IndexedField::Gender, "F").unwrap();
        assert!(m_bucket.contains(&0));
        assert!(f_bucket.contains(&0));

        // 桶里的每个组都确实有成员取那个值
        for field in IndexedField::ALL {
            let values: Vec<String> = index.indexes.values(field).cloned().collect();
            for value in values {
                for &pos in index.indexes.bucket(field, &value).unwrap() {
                    assert!(index.groups[pos]
                        .variants
                        .iter()
                        .any(|v| field.value_of(v) == value));
                }
            }
        }
    }

    #[test]
    fn missing_fields_index_under_empty_string() {
        let mut stray = variant("TS-GRY", "M", "S");
        stray.brand = String::new();
        let index = CatalogBuilder::from_variants(vec![stray]).build_catalog_index();

        // 未填写品牌的商品可以作为独立的空品牌桶被筛到
        assert!(index.indexes.bucket(IndexedField::Brand, "").is_some());
    }

    #[test]
    fn counters_track_malformed_input() {
        let mut no_group = variant("TS-BLK", "M", "S");
        no_group.color_sku = String::new();
        let mut bad_date = variant("TS-WHT", "M", "S");
        bad_date.created_at = "вчера".to_string();

        let index = CatalogBuilder::from_variants(vec![no_group, bad_date]).build_catalog_index();
        assert_eq!(index.stats.malformed_count, 1);
        assert_eq!(index.stats.bad_date_count, 1);
        // 缺失 color_sku 的变体仍然进组（空键组）
        assert_eq!(index.stats.group_count, 2);
    }

    #[test]
    fn empty_input_builds_empty_index() {
        let index = CatalogBuilder::new().build_catalog_index();
        assert!(index.groups.is_empty());
        for field in IndexedField::ALL {
            assert_eq!(index.indexes.value_count(field), 0);
        }
        assert_eq!(index.stats.variant_count, 0);
    }
}
