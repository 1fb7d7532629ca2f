use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{self, Read, Write};

/// 魔数常量 - 目录索引文件的格式标识
pub const MAGIC_BYTES: &[u8] = b"CATLG";

/// 当前写出的索引格式版本
pub const CATALOG_INDEX_VERSION: [u8; 2] = [1, 0];

/// 读取端默认接受的最大主版本号
pub const MAX_SUPPORTED_VERSION: u8 = 1;

/// 文件头长度: 魔数 + 2 字节版本 + 4 字节原始数据大小
const HEADER_LEN: usize = MAGIC_BYTES.len() + 2 + 4;

/// 索引文件头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    /// 格式版本 [主版本, 次版本]
    pub version: [u8; 2],
    /// 压缩前的数据大小
    pub raw_size: u32,
}

/// 将对象序列化为二进制格式
pub fn to_binary<T: serde::Serialize>(obj: &T) -> Result<Vec<u8>, io::Error> {
    bincode::serde::encode_to_vec(obj, bincode::config::standard())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("二进制编码失败: {}", e)))
}

/// 从二进制格式反序列化对象
pub fn from_binary<T: for<'a> serde::de::Deserialize<'a>>(data: &[u8]) -> Result<T, io::Error> {
    bincode::serde::decode_from_slice(data, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("二进制解码失败: {}", e)))
}

/// 将对象写成带文件头的压缩二进制格式
pub fn to_compressed<T: serde::Serialize>(obj: &T, version: [u8; 2]) -> Result<Vec<u8>, io::Error> {
    let binary = to_binary(obj)?;

    let mut output = Vec::with_capacity(HEADER_LEN + binary.len() / 2);
    output.extend_from_slice(MAGIC_BYTES);
    output.extend_from_slice(&version);
    output.extend_from_slice(&(binary.len() as u32).to_le_bytes());

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&binary)?;
    output.extend_from_slice(&encoder.finish()?);

    Ok(output)
}

/// 解析并校验文件头，不触碰压缩数据本身
pub fn read_header(data: &[u8], max_version: u8) -> Result<IndexHeader, io::Error> {
    if data.len() < HEADER_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("数据不足 {} 字节，不是有效的索引文件", HEADER_LEN),
        ));
    }

    if &data[..MAGIC_BYTES.len()] != MAGIC_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "文件格式不正确: 魔数不匹配",
        ));
    }

    let version_offset = MAGIC_BYTES.len();
    let version = [data[version_offset], data[version_offset + 1]];
    if version[0] > max_version {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("索引版本 {}.{} 高于支持的最大版本 {}", version[0], version[1], max_version),
        ));
    }

    let mut size_bytes = [0u8; 4];
    size_bytes.copy_from_slice(&data[version_offset + 2..HEADER_LEN]);

    Ok(IndexHeader {
        version,
        raw_size: u32::from_le_bytes(size_bytes),
    })
}

/// 从压缩的二进制格式反序列化对象，使用默认的最大版本
pub fn from_compressed<T: for<'a> serde::de::Deserialize<'a>>(data: &[u8]) -> Result<T, io::Error> {
    from_compressed_with_max_version(data, MAX_SUPPORTED_VERSION)
}

/// 从压缩的二进制格式反序列化对象，允许指定接受的最大版本
pub fn from_compressed_with_max_version<T: for<'a> serde::de::Deserialize<'a>>(
    data: &[u8],
    max_version: u8,
) -> Result<T, io::Error> {
    let header = read_header(data, max_version)?;

    let mut decoder = GzDecoder::new(&data[HEADER_LEN..]);
    let mut decompressed = Vec::with_capacity(header.raw_size as usize);
    decoder.read_to_end(&mut decompressed)?;

    if decompressed.len() != header.raw_size as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "解压后大小不符: 文件头声明 {} 字节，实际 {} 字节",
                header.raw_size,
                decompressed.len()
            ),
        ));
    }

    from_binary(&decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductVariant;

    fn variant() -> ProductVariant {
        ProductVariant {
            variant_sku: "NK-AF1-W-42".to_string(),
            sku: "NK-AF1".to_string(),
            color_sku: "NK-AF1-W".to_string(),
            category: "Обувь".to_string(),
            subcategory: "Кроссовки".to_string(),
            gender: "U".to_string(),
            brand: "Nike".to_string(),
            color: "Белый".to_string(),
            size_label: "42".to_string(),
            price: 12990.0,
            created_at: "2025-03-01T10:00:00.000000Z".to_string(),
            count_sales: 7,
        }
    }

    #[test]
    fn compressed_payload_survives_decode() {
        let data = to_compressed(&vec![variant()], CATALOG_INDEX_VERSION).unwrap();
        let decoded: Vec<ProductVariant> = from_compressed(&data).unwrap();
        assert_eq!(decoded, vec![variant()]);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut data = to_compressed(&vec![variant()], CATALOG_INDEX_VERSION).unwrap();
        data[0] = b'X';
        let err = from_compressed::<Vec<ProductVariant>>(&data).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_future_major_version() {
        let data = to_compressed(&vec![variant()], [MAX_SUPPORTED_VERSION + 1, 0]).unwrap();
        assert!(from_compressed::<Vec<ProductVariant>>(&data).is_err());
        // 显式放宽最大版本后应当能读
        assert!(
            from_compressed_with_max_version::<Vec<ProductVariant>>(&data, MAX_SUPPORTED_VERSION + 1)
                .is_ok()
        );
    }

    #[test]
    fn rejects_truncated_input() {
        let err = read_header(b"CAT", MAX_SUPPORTED_VERSION).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
