use crate::builder::CatalogBuilder;
use crate::models::CatalogIndex;
use utils_common::models::ProductVariant;

/// 拉取凭据 - 一次商品列表拉取的编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u32);

impl FetchTicket {
    /// 凭据的原始编号，用于跨 JS 边界传递
    pub fn raw(self) -> u32 {
        self.0
    }

    /// 从原始编号恢复凭据
    pub fn from_raw(raw: u32) -> Self {
        FetchTicket(raw)
    }
}

/// 目录状态容器 - 持有当前索引和拉取状态
///
/// 索引的重建只能由 complete_fetch 显式触发，并且总是整体替换。
/// begin_fetch 实现单飞: 已有拉取在途时后来的调用直接被忽略。
/// reset 通过递增编号作废在途拉取，迟到的旧响应不会覆盖新数据。
#[derive(Debug)]
pub struct CatalogStore {
    index: CatalogIndex,
    /// 已发出的最新拉取编号
    generation: u32,
    in_flight: bool,
}

impl CatalogStore {
    pub fn new() -> Self {
        CatalogStore {
            index: CatalogIndex::empty(),
            generation: 0,
            in_flight: false,
        }
    }

    /// 当前索引
    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    /// 直接替换索引，加载预编译快照时使用
    pub fn install_index(&mut self, index: CatalogIndex) {
        self.index = index;
    }

    /// 声明开始一次拉取；已有拉取在途时返回 None，调用方直接放弃
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        self.generation += 1;
        Some(FetchTicket(self.generation))
    }

    /// 拉取成功，用商品列表整体重建索引
    ///
    /// 凭据已被 reset 作废时直接丢弃数据并返回 false。
    pub fn complete_fetch(&mut self, ticket: FetchTicket, variants: Vec<ProductVariant>) -> bool {
        if ticket.0 != self.generation {
            return false;
        }
        self.in_flight = false;
        self.index = CatalogBuilder::from_variants(variants).build_catalog_index();
        true
    }

    /// 拉取失败，清除在途标记并保留上一份索引
    pub fn fail_fetch(&mut self, ticket: FetchTicket) {
        if ticket.0 == self.generation {
            self.in_flight = false;
        }
    }

    /// 清空索引并作废在途拉取（切换大类时调用）
    pub fn reset(&mut self) {
        self.generation += 1;
        self.in_flight = false;
        self.index = CatalogIndex::empty();
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        CatalogStore::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(color_sku: &str) -> ProductVariant {
        ProductVariant {
            variant_sku: format!("{}-42", color_sku),
            sku: "SKU".to_string(),
            color_sku: color_sku.to_string(),
            category: "Обувь".to_string(),
            subcategory: "Кроссовки".to_string(),
            gender: "U".to_string(),
            brand: "Nike".to_string(),
            color: "Белый".to_string(),
            size_label: "42".to_string(),
            price: 9990.0,
            created_at: "2025-01-01T00:00:00.000000Z".to_string(),
            count_sales: 0,
        }
    }

    #[test]
    fn second_fetch_is_ignored_while_in_flight() {
        let mut store = CatalogStore::new();
        let ticket = store.begin_fetch().unwrap();
        assert!(store.begin_fetch().is_none());

        assert!(store.complete_fetch(ticket, vec![variant("A")]));
        assert_eq!(store.index().groups.len(), 1);

        // 结束后可以再次拉取
        assert!(store.begin_fetch().is_some());
    }

    #[test]
    fn stale_completion_is_dropped_after_reset() {
        let mut store = CatalogStore::new();
        let stale = store.begin_fetch().unwrap();
        store.reset();

        let fresh = store.begin_fetch().unwrap();
        assert!(store.complete_fetch(fresh, vec![variant("B")]));

        // 迟到的旧响应不得覆盖新索引
        assert!(!store.complete_fetch(stale, vec![variant("A")]));
        assert_eq!(store.index().groups.len(), 1);
        assert_eq!(store.index().groups[0].color_sku, "B");
    }

    #[test]
    fn failed_fetch_keeps_last_index() {
        let mut store = CatalogStore::new();
        let ticket = store.begin_fetch().unwrap();
        assert!(store.complete_fetch(ticket, vec![variant("A")]));

        let ticket = store.begin_fetch().unwrap();
        store.fail_fetch(ticket);
        assert_eq!(store.index().groups.len(), 1);
        // 失败后在途标记被清除
        assert!(store.begin_fetch().is_some());
    }

    #[test]
    fn stale_failure_does_not_clear_new_flight() {
        let mut store = CatalogStore::new();
        let stale = store.begin_fetch().unwrap();
        store.reset();

        let _fresh = store.begin_fetch().unwrap();
        store.fail_fetch(stale);
        // 新的拉取仍在途
        assert!(store.begin_fetch().is_none());
    }

    #[test]
    fn reset_clears_index() {
        let mut store = CatalogStore::new();
        let ticket = store.begin_fetch().unwrap();
        assert!(store.complete_fetch(ticket, vec![variant("A")]));
        store.reset();
        assert!(store.index().groups.is_empty());
    }
}
