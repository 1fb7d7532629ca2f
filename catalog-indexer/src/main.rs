use std::fs;
use std::path::Path;

use chrono::Local;
use clap::{Arg, ArgAction, Command};
use walkdir::WalkDir;

use catalog_filter::builder::CatalogBuilder;
use utils_common::ProductVariant;

// 主函数
fn main() {
    // 设置命令行参数
    let matches = Command::new("目录索引生成器")
        .version(env!("CARGO_PKG_VERSION"))
        .about("从后端导出的商品列表 JSON 生成压缩的目录索引")
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("SOURCE")
                .help("商品列表 JSON 文件或其所在目录")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("索引输出目录路径")
                .required(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("显示详细信息")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("任何一份商品列表解析失败时立即退出")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // 获取参数值
    let source = matches.get_one::<String>("source").unwrap();
    let output_dir = matches.get_one::<String>("output").unwrap();
    let verbose = matches.get_flag("verbose");
    let strict = matches.get_flag("strict");

    // 检查源路径
    let source_path = Path::new(source);
    if !source_path.exists() {
        eprintln!("错误: 源路径不存在 '{}'", source);
        std::process::exit(1);
    }

    // 创建输出目录
    let output_path = Path::new(output_dir);
    if !output_path.exists() {
        if let Err(e) = fs::create_dir_all(output_path) {
            eprintln!("错误: 无法创建输出目录 '{}': {}", output_dir, e);
            std::process::exit(1);
        }
    }

    println!("开始生成目录索引...");
    println!("源路径: {}", source);
    println!("输出目录: {}", output_dir);
    println!("启动时间: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    match generate_index(source_path, output_dir, verbose, strict) {
        Ok(_) => println!("目录索引生成成功！"),
        Err(e) => {
            eprintln!("错误: 目录索引生成失败: {}", e);
            std::process::exit(1);
        }
    }
}

// 生成索引的主函数
fn generate_index(
    source_path: &Path,
    output_dir: &str,
    verbose: bool,
    strict: bool,
) -> Result<(), String> {
    // 记录开始时间
    let start_time = std::time::Instant::now();

    // 收集商品变体
    println!("读取商品列表...");
    let (variants, file_count, failed_count) = collect_variants(source_path, verbose, strict)?;

    println!(
        "读取完成。文件 {} 份（失败 {} 份），变体 {} 条。",
        file_count,
        failed_count,
        variants.len()
    );

    if variants.is_empty() {
        return Err("没有找到有效的商品数据".to_string());
    }

    // 构建并保存索引
    let mut builder = CatalogBuilder::new();
    builder.add_variants(variants);

    let index_path = format!("{}/catalog_index.bin", output_dir);
    println!("正在生成和保存索引...");
    let stats = builder.save_catalog_index(&index_path)?;

    // 打印统计
    println!(
        "颜色组 {} 个，品牌 {} 个",
        stats.group_count, stats.brand_count
    );
    if stats.malformed_count > 0 {
        eprintln!("警告: {} 条变体缺失 color_sku", stats.malformed_count);
    }
    if stats.bad_date_count > 0 {
        eprintln!(
            "警告: {} 条变体的 created_at 不是 RFC 3339 格式，按日期排序会不可靠",
            stats.bad_date_count
        );
    }

    // 计算耗时
    let elapsed = start_time.elapsed();
    println!("索引生成完成！耗时: {:.2}秒", elapsed.as_secs_f32());

    Ok(())
}

// 从文件或目录收集商品变体
fn collect_variants(
    source_path: &Path,
    verbose: bool,
    strict: bool,
) -> Result<(Vec<ProductVariant>, usize, usize), String> {
    let mut variants = Vec::new();
    let mut file_count = 0usize;
    let mut failed_count = 0usize;

    if source_path.is_file() {
        file_count = 1;
        match read_feed_file(source_path) {
            Ok(mut list) => variants.append(&mut list),
            Err(e) => return Err(e),
        }
        return Ok((variants, file_count, failed_count));
    }

    // 递归遍历目录，只处理 JSON 文件
    for entry in WalkDir::new(source_path) {
        let entry = entry.map_err(|e| format!("遍历目录时出错: {}", e))?;
        if !entry.file_type().is_file()
            || !entry
                .path()
                .extension()
                .map_or(false, |ext| ext == "json")
        {
            continue;
        }

        file_count += 1;
        match read_feed_file(entry.path()) {
            Ok(mut list) => {
                if verbose {
                    println!("{}: 变体 {} 条", entry.path().display(), list.len());
                }
                variants.append(&mut list);
            }
            Err(e) => {
                if strict {
                    return Err(e);
                }
                failed_count += 1;
                if verbose {
                    eprintln!("跳过 {}: {}", entry.path().display(), e);
                }
            }
        }
    }

    Ok((variants, file_count, failed_count))
}

// 读取一份商品列表 JSON 文件
fn read_feed_file(path: &Path) -> Result<Vec<ProductVariant>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("无法读取文件 {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("解析商品列表 {} 失败: {}", path.display(), e))
}
