//! 影像分析流水线命令行入口

use anyhow::{bail, Context, Result};
use clap::Parser;
use radflow_core::RawStudy;
use radflow_detection::StaticDetector;
use radflow_pipeline::{Pipeline, PipelineConfig, PipelineResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 按位图处理的文件扩展名
const RASTER_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "radflow")]
#[command(about = "胸部影像分析流水线：读取检查、检测异常并生成报告")]
struct Args {
    /// 输入文件 (DICOM或位图)
    input: PathBuf,

    /// 结果输出目录
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// 强制按位图读取输入
    #[arg(long)]
    raster: bool,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 预置检测结果 (JSON)
    #[arg(short, long)]
    detections: Option<PathBuf>,

    /// 检测置信度阈值，覆盖配置文件
    #[arg(short, long)]
    threshold: Option<f64>,

    /// 检测推理超时（毫秒），覆盖配置文件
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    info!("启动影像分析流水线...");

    let mut config = PipelineConfig::load(args.config.as_deref()).context("加载配置失败")?;
    if let Some(threshold) = args.threshold {
        config.confidence_threshold = threshold;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.inference_timeout_ms = Some(timeout_ms);
    }
    config.validate().context("配置无效")?;

    info!("流水线配置:");
    info!("  置信度阈值: {}", config.confidence_threshold);
    info!("  推理超时: {:?}", config.inference_timeout());
    info!("  输出目录: {}", args.output.display());

    let detector = match &args.detections {
        Some(path) => StaticDetector::from_json_file(path)
            .await
            .with_context(|| format!("无法加载检测结果: {}", path.display()))?,
        None => {
            warn!("未提供检测结果，所有检查都将按无异常处理");
            StaticDetector::default()
        }
    };

    let pipeline = Pipeline::from_config(Arc::new(detector), config)
        .await
        .context("创建流水线失败")?;

    let study = if args.raster || is_raster_path(&args.input) {
        RawStudy::raster_file(&args.input)
    } else {
        RawStudy::dicom_file(&args.input)
    };

    let result = pipeline.process(study, &args.output).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    match &result {
        PipelineResult::Completed(success) => {
            info!("报告已写入 {}", success.output_files.report_text.display());
            Ok(())
        }
        PipelineResult::Failed(failure) => {
            error!("处理失败: {}", failure.message);
            bail!("{:?}: {}", failure.reason, failure.message)
        }
    }
}

fn is_raster_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RASTER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
