use once_cell::sync::OnceCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use wasm_bindgen::prelude::*;
use web_sys::console;

use utils_common::models::{CatalogStats, ProductVariant, GENDER_UNISEX};

// 导出模块
pub mod builder;
pub mod models;
pub mod sizes;
pub mod store;

use models::{CatalogIndex, ColorGroup, FilterOutcome, FilterParams, IndexedField, ProductView};
use store::{CatalogStore, FetchTicket};

// 全局目录状态
static STORE: OnceCell<Mutex<CatalogStore>> = OnceCell::new();

fn store_cell() -> &'static Mutex<CatalogStore> {
    STORE.get_or_init(|| Mutex::new(CatalogStore::new()))
}

fn lock_store() -> Result<MutexGuard<'static, CatalogStore>, String> {
    store_cell().lock().map_err(|_| "获取目录状态锁失败".to_string())
}

/// 初始化函数 - 设置错误处理
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// 版本信息
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// 俄语排序键 - 大小写不敏感，ё 并入 е
pub fn collation_key(s: &str) -> String {
    s.to_lowercase().replace('ё', "е")
}

/// 俄语字典序比较，键相同时回退到原文比较保证确定性
pub fn collate(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// 目录筛选器 - 处理目录的加载、筛选与排序逻辑
pub struct CatalogFilter;

impl CatalogFilter {
    //===== 全局状态操作 =====

    /// 加载预编译的压缩索引快照
    pub fn load_index(data: &[u8]) -> Result<(), String> {
        let index = CatalogIndex::from_compressed(data).map_err(|e| format!("解析索引失败: {}", e))?;
        let mut store = lock_store()?;
        store.install_index(index);
        Ok(())
    }

    /// 声明开始一次商品列表拉取；已有拉取在途时返回 None
    pub fn begin_fetch() -> Result<Option<FetchTicket>, String> {
        Ok(lock_store()?.begin_fetch())
    }

    /// 用拉取到的商品列表 JSON 整体重建索引
    ///
    /// 凭据已被 reset 作废时丢弃数据并返回 false。
    pub fn complete_fetch(ticket: FetchTicket, products_json: &str) -> Result<bool, String> {
        let variants: Vec<ProductVariant> =
            serde_json::from_str(products_json).map_err(|e| format!("解析商品列表失败: {}", e))?;
        Ok(lock_store()?.complete_fetch(ticket, variants))
    }

    /// 拉取失败，保留上一份索引
    pub fn fail_fetch(ticket: FetchTicket) -> Result<(), String> {
        lock_store()?.fail_fetch(ticket);
        Ok(())
    }

    /// 清空索引并作废在途拉取（切换大类时调用）
    pub fn reset() -> Result<(), String> {
        lock_store()?.reset();
        Ok(())
    }

    /// 按当前筛选参数产出已排序的展示列表
    pub fn filter_products(params: &FilterParams) -> Result<FilterOutcome, String> {
        let store = lock_store()?;
        let products = Self::filter_catalog(store.index(), params);
        Ok(FilterOutcome {
            total: products.len(),
            products,
        })
    }

    /// 品牌筛选项清单
    pub fn distinct_brands() -> Result<Vec<String>, String> {
        Ok(Self::brands_of(lock_store()?.index()))
    }

    /// 颜色筛选项清单
    pub fn distinct_colors() -> Result<Vec<String>, String> {
        Ok(Self::colors_of(lock_store()?.index()))
    }

    /// 尺码筛选项清单
    pub fn distinct_sizes() -> Result<Vec<String>, String> {
        Ok(Self::sizes_of(lock_store()?.index()))
    }

    /// 某大类下可选的子类清单
    pub fn subcategories(category: &str, gender: Option<&str>) -> Result<Vec<String>, String> {
        Ok(Self::subcategories_for(
            lock_store()?.index(),
            category,
            gender,
        ))
    }

    /// 当前索引的构建统计
    pub fn stats() -> Result<CatalogStats, String> {
        Ok(lock_store()?.index().stats.clone())
    }

    //===== 纯计算部分 =====

    /// 筛选并排序: 交并集筛选、派生统计、稳定排序
    ///
    /// 每次调用都从全集重新计算，筛选条件可以任意增减。
    pub fn filter_catalog(index: &CatalogIndex, params: &FilterParams) -> Vec<ProductView> {
        let mut views: Vec<ProductView> = Self::select_groups(index, params)
            .into_iter()
            .filter_map(|pos| Self::make_view(&index.groups[pos]))
            .collect();
        Self::sort_views(&mut views, params);
        views
    }

    /// 应用全部筛选条件，返回存活的颜色组位置（按原始顺序）
    fn select_groups(index: &CatalogIndex, params: &FilterParams) -> Vec<usize> {
        // 初始候选集为全部颜色组
        let mut candidates: HashSet<usize> = (0..index.groups.len()).collect();

        if let Some(category) = params.category() {
            Self::intersect_bucket(&mut candidates, index, IndexedField::Category, category);
        }
        if let Some(subcat) = params.subcat() {
            Self::intersect_bucket(&mut candidates, index, IndexedField::Subcategory, subcat);
        }

        if let Some(gender) = params.gender() {
            // 选中 M 或 F 时，中性款一并保留
            let mut allowed: HashSet<usize> = index
                .indexes
                .bucket(IndexedField::Gender, gender)
                .cloned()
                .unwrap_or_default();
            if let Some(unisex) = index.indexes.bucket(IndexedField::Gender, GENDER_UNISEX) {
                allowed.extend(unisex);
            }
            candidates.retain(|pos| allowed.contains(pos));
        }

        // 多选条件: 同一字段内取并集，字段之间取交集
        let multi = [
            (IndexedField::Brand, &params.filter_brands),
            (IndexedField::Color, &params.filter_colors),
            (IndexedField::Size, &params.filter_sizes),
        ];
        for (field, selected) in multi {
            if selected.is_empty() {
                continue;
            }
            let mut union: HashSet<usize> = HashSet::new();
            for value in selected {
                if let Some(bucket) = index.indexes.bucket(field, value) {
                    union.extend(bucket);
                }
            }
            candidates.retain(|pos| union.contains(pos));
        }

        // 价格区间扫描当前工作集: 组内任一变体落进区间即保留
        if let Some(min) = params.filter_price_min {
            candidates.retain(|&pos| index.groups[pos].variants.iter().any(|v| v.price >= min));
        }
        if let Some(max) = params.filter_price_max {
            candidates.retain(|&pos| index.groups[pos].variants.iter().any(|v| v.price <= max));
        }

        // 按颜色组的原始顺序物化，保证排序前的相对顺序是确定的
        let mut survivors: Vec<usize> = candidates.into_iter().collect();
        survivors.sort_unstable();
        survivors
    }

    /// 候选集与某字段某取值的桶求交；桶不存在得到空集，不是错误
    fn intersect_bucket(
        candidates: &mut HashSet<usize>,
        index: &CatalogIndex,
        field: IndexedField,
        value: &str,
    ) {
        match index.indexes.bucket(field, value) {
            Some(bucket) => candidates.retain(|pos| bucket.contains(pos)),
            None => candidates.clear(),
        }
    }

    /// 计算颜色组的派生统计并生成视图
    ///
    /// 最低价与最早日期并列时保留先出现的变体；日期比较是
    /// 字符串字典序，依赖后端的定宽 ISO 序列化格式。
    fn make_view(group: &ColorGroup) -> Option<ProductView> {
        let first = group.variants.first()?;
        let mut min_price_variant = first;
        let mut min_date_variant = first;
        let mut total_sales: u64 = 0;

        for variant in &group.variants {
            if variant.price < min_price_variant.price {
                min_price_variant = variant;
            }
            if variant.created_at < min_date_variant.created_at {
                min_date_variant = variant;
            }
            total_sales += variant.count_sales;
        }

        Some(ProductView {
            color_sku: group.color_sku.clone(),
            variants: group.variants.clone(),
            min_price: min_price_variant.price,
            min_date: min_date_variant.created_at.clone(),
            total_sales,
            min_price_variant: min_price_variant.clone(),
        })
    }

    /// 按排序参数排列视图
    ///
    /// sort_by 为未知取值时按日期处理；方向统一通过反转比较结果实现，
    /// 排序是稳定的，同序条目保持筛选后的相对顺序。
    fn sort_views(views: &mut [ProductView], params: &FilterParams) {
        let descending = !matches!(params.sort_order.as_deref(), Some("asc"));

        views.sort_by(|a, b| {
            let ord = match params.sort_by.as_deref() {
                Some("price") => a
                    .min_price
                    .partial_cmp(&b.min_price)
                    .unwrap_or(Ordering::Equal),
                Some("sales") => a.total_sales.cmp(&b.total_sales).then_with(|| {
                    a.min_price
                        .partial_cmp(&b.min_price)
                        .unwrap_or(Ordering::Equal)
                }),
                _ => a.min_date.cmp(&b.min_date),
            };
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    /// 品牌清单，俄语字典序
    pub fn brands_of(index: &CatalogIndex) -> Vec<String> {
        Self::sorted_values(index, IndexedField::Brand)
    }

    /// 颜色清单，俄语字典序
    pub fn colors_of(index: &CatalogIndex) -> Vec<String> {
        Self::sorted_values(index, IndexedField::Color)
    }

    /// 尺码清单，按尺码分档全序
    pub fn sizes_of(index: &CatalogIndex) -> Vec<String> {
        let mut values: Vec<String> = index.indexes.values(IndexedField::Size).cloned().collect();
        values.sort_by(|a, b| sizes::compare(a, b));
        values
    }

    fn sorted_values(index: &CatalogIndex, field: IndexedField) -> Vec<String> {
        let mut values: Vec<String> = index.indexes.values(field).cloned().collect();
        values.sort_by(|a, b| collate(a, b));
        values
    }

    /// 某大类下可选的子类清单，受性别条件约束（中性款一并计入）
    pub fn subcategories_for(
        index: &CatalogIndex,
        category: &str,
        gender: Option<&str>,
    ) -> Vec<String> {
        let mut subcats: HashSet<&str> = HashSet::new();
        for group in &index.groups {
            for variant in &group.variants {
                if variant.category != category {
                    continue;
                }
                if let Some(gender) = gender {
                    if variant.gender != gender && variant.gender != GENDER_UNISEX {
                        continue;
                    }
                }
                subcats.insert(variant.subcategory.as_str());
            }
        }
        let mut list: Vec<String> = subcats.into_iter().map(String::from).collect();
        list.sort();
        list
    }
}

/// 目录筛选器 JS 接口 - 提供给前端使用的筛选 API
#[wasm_bindgen]
pub struct CatalogFilterJS;

#[wasm_bindgen]
impl CatalogFilterJS {
    /// 初始化并加载预编译的压缩索引
    #[wasm_bindgen]
    pub fn init(index_data: &[u8]) -> Result<(), JsValue> {
        console_error_panic_hook::set_once();

        CatalogFilter::load_index(index_data).map_err(|e| {
            console::log_1(&JsValue::from_str(&format!("初始化目录失败: {}", e)));
            JsValue::from_str(&e)
        })
    }

    /// 声明开始一次商品列表拉取；已有拉取在途时返回 undefined
    #[wasm_bindgen]
    pub fn begin_fetch() -> Result<Option<u32>, JsValue> {
        CatalogFilter::begin_fetch()
            .map(|ticket| ticket.map(FetchTicket::raw))
            .map_err(|e| JsValue::from_str(&e))
    }

    /// 用拉取到的商品列表 JSON 重建索引；凭据过期时返回 false
    #[wasm_bindgen]
    pub fn complete_fetch(ticket: u32, products_json: &str) -> Result<bool, JsValue> {
        CatalogFilter::complete_fetch(FetchTicket::from_raw(ticket), products_json).map_err(|e| {
            console::log_1(&JsValue::from_str(&format!("重建目录索引失败: {}", e)));
            JsValue::from_str(&e)
        })
    }

    /// 拉取失败，保留现有索引
    #[wasm_bindgen]
    pub fn fail_fetch(ticket: u32) -> Result<(), JsValue> {
        CatalogFilter::fail_fetch(FetchTicket::from_raw(ticket)).map_err(|e| JsValue::from_str(&e))
    }

    /// 切换大类时清空索引并作废在途拉取
    #[wasm_bindgen]
    pub fn reset() -> Result<(), JsValue> {
        CatalogFilter::reset().map_err(|e| JsValue::from_str(&e))
    }

    /// 筛选商品
    #[wasm_bindgen]
    pub fn filter_products(params_json: &str) -> Result<JsValue, JsValue> {
        // 解析参数
        let params: FilterParams = serde_json::from_str(params_json)
            .map_err(|e| JsValue::from_str(&format!("解析筛选参数失败: {}", e)))?;

        // 筛选商品
        let outcome = CatalogFilter::filter_products(&params).map_err(|e| JsValue::from_str(&e))?;

        // 序列化结果
        serde_wasm_bindgen::to_value(&outcome)
            .map_err(|e| JsValue::from_str(&format!("序列化筛选结果失败: {}", e)))
    }

    /// 获取全部品牌
    #[wasm_bindgen]
    pub fn get_distinct_brands() -> Result<JsValue, JsValue> {
        let brands = CatalogFilter::distinct_brands().map_err(|e| JsValue::from_str(&e))?;
        serde_wasm_bindgen::to_value(&brands)
            .map_err(|e| JsValue::from_str(&format!("序列化品牌清单失败: {}", e)))
    }

    /// 获取全部颜色
    #[wasm_bindgen]
    pub fn get_distinct_colors() -> Result<JsValue, JsValue> {
        let colors = CatalogFilter::distinct_colors().map_err(|e| JsValue::from_str(&e))?;
        serde_wasm_bindgen::to_value(&colors)
            .map_err(|e| JsValue::from_str(&format!("序列化颜色清单失败: {}", e)))
    }

    /// 获取全部尺码（按尺码分档排好）
    #[wasm_bindgen]
    pub fn get_distinct_sizes() -> Result<JsValue, JsValue> {
        let sizes = CatalogFilter::distinct_sizes().map_err(|e| JsValue::from_str(&e))?;
        serde_wasm_bindgen::to_value(&sizes)
            .map_err(|e| JsValue::from_str(&format!("序列化尺码清单失败: {}", e)))
    }

    /// 获取某大类下的子类清单
    #[wasm_bindgen]
    pub fn get_subcategories(category: &str, gender: Option<String>) -> Result<JsValue, JsValue> {
        let subcats = CatalogFilter::subcategories(category, gender.as_deref())
            .map_err(|e| JsValue::from_str(&e))?;
        serde_wasm_bindgen::to_value(&subcats)
            .map_err(|e| JsValue::from_str(&format!("序列化子类清单失败: {}", e)))
    }

    /// 获取当前索引的统计信息
    #[wasm_bindgen]
    pub fn get_stats() -> Result<JsValue, JsValue> {
        let stats = CatalogFilter::stats().map_err(|e| JsValue::from_str(&e))?;
        serde_wasm_bindgen::to_value(&stats)
            .map_err(|e| JsValue::from_str(&format!("序列化统计信息失败: {}", e)))
    }
}
