//! Carelink服务器主程序

use carelink_core::config::CarelinkConfig;
use carelink_database::{
    create_tables, DatabasePool, PgNotificationStore, PgReportStore, PgSuggestionStore,
};
use carelink_inference::HttpInferenceClient;
use carelink_notify::NotificationService;
use carelink_pipeline::{IngestPolicy, ReportCoordinator};
use carelink_storage::{LocalObjectStore, StagingArea, UrlSigner};
use carelink_web::{AppState, WebServer};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

/// Carelink服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "carelink-server")]
#[command(about = "Carelink 医疗协作平台报告服务")]
struct Args {
    /// 监听主机
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// 服务端口
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// 上传文件存储目录
    #[arg(short, long)]
    storage_dir: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(args.log_level.as_str())
        .init();

    info!("启动Carelink报告服务...");

    // 加载并校验配置，缺失必填项直接失败
    let mut config = CarelinkConfig::load(args.config.as_deref())?;
    config.server.host = args.host.clone();
    config.server.port = args.port;
    if let Some(storage_dir) = args.storage_dir {
        config.storage.root = storage_dir;
    }
    config.validate()?;

    info!("Carelink服务配置:");
    info!("  监听地址: {}:{}", config.server.host, config.server.port);
    info!("  存储目录: {}", config.storage.root);
    info!("  推理服务: {}", config.inference.url);

    // 建立数据库连接并准备表结构
    let pool = DatabasePool::connect(&config.database).await?;
    create_tables(&pool).await?;

    // 组装依赖
    let signer = UrlSigner::new(&config.storage.signing_secret);
    let objects = Arc::new(LocalObjectStore::new(&config.storage.root, signer.clone()));
    let inference = Arc::new(HttpInferenceClient::new(
        &config.inference.url,
        config.inference.timeout_secs,
    )?);
    let reports = Arc::new(PgReportStore::new(pool.clone()));
    let suggestions = Arc::new(PgSuggestionStore::new(pool.clone()));
    let notifications =
        NotificationService::new(Arc::new(PgNotificationStore::new(pool.clone())));

    let policy = if config.pipeline.tolerant_ingest {
        IngestPolicy::Tolerant
    } else {
        IngestPolicy::Strict
    };

    let coordinator = Arc::new(ReportCoordinator::new(
        reports.clone(),
        suggestions,
        objects,
        inference,
        notifications.clone(),
        StagingArea::new(&config.storage.staging_dir),
        policy,
    ));

    let state = AppState {
        coordinator,
        notifications,
        reports,
        signer: Arc::new(signer),
        url_ttl_secs: config.storage.url_ttl_secs,
    };

    // 启动HTTP服务
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let server = WebServer::new(state);
    if let Err(e) = server.run(&addr).await {
        error!("服务器启动失败: {}", e);
        return Err(e);
    }

    Ok(())
}
