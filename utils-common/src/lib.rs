pub mod compression;
pub mod models;

// 重新导出常用模块和函数，方便直接使用
pub use compression::{
    from_compressed, to_binary, to_compressed, read_header, CATALOG_INDEX_VERSION,
};
pub use models::{CatalogStats, ProductVariant, GENDER_UNISEX};
