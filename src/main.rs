use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use serde_json::json;
use syncer_config::{LogFormat, SyncerConfig};
use syncer_dispatcher::SyncClient;
use syncer_domain::{ExternalService, SyncerError};
use syncer_testing_utils::{BadService, CoolService, RandomService};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("syncer")
        .version("1.0.0")
        .about("自适应批量同步器演示")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时依次查找 config/syncer.toml 和 syncer.toml"),
        )
        .arg(
            Arg::new("service")
                .short('s')
                .long("service")
                .value_name("SERVICE")
                .help("模拟的外部服务")
                .value_parser(["cool", "bad", "random"])
                .default_value("cool"),
        )
        .arg(
            Arg::new("items")
                .short('n')
                .long("items")
                .value_name("COUNT")
                .help("投递的条目数量")
                .value_parser(clap::value_parser!(u64))
                .default_value("100"),
        )
        .arg(
            Arg::new("batch-size")
                .short('b')
                .long("batch-size")
                .value_name("SIZE")
                .help("模拟服务报告的批次大小")
                .value_parser(clap::value_parser!(u64))
                .default_value("5"),
        )
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .value_name("SECONDS")
                .help("运行时长，未指定时运行到收到关闭信号")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .arg(
            Arg::new("print-config")
                .long("print-config")
                .help("打印生效的配置后退出")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let mut config = SyncerConfig::load(config_path.map(String::as_str))
        .with_context(|| format!("加载配置失败: {config_path:?}"))?;

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.observability.log_format = format.parse().map_err(anyhow::Error::msg)?;
    }

    if matches.get_flag("print-config") {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config.observability.log_level, config.observability.log_format)?;

    let service_name = matches
        .get_one::<String>("service")
        .map(String::as_str)
        .unwrap_or("cool");
    let items = matches.get_one::<u64>("items").copied().unwrap_or(100);
    let batch_size = matches.get_one::<u64>("batch-size").copied().unwrap_or(5);
    let duration = matches.get_one::<u64>("duration").copied();

    info!("启动自适应批量同步器");
    info!("模拟外部服务: {service_name}，批次大小: {batch_size}");

    let service = build_service(service_name, batch_size)?;
    let client = SyncClient::<u64>::builder(config.client.clone())
        .service(service)
        .on_exception(|e| warn!("外部服务异常: {e}"))
        .build()
        .map_err(|e| report_client_error("创建同步客户端失败", e))?;
    let client = Arc::new(client);
    client
        .run()
        .await
        .map_err(|e| report_client_error("启动同步客户端失败", e))?;

    let producer = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            for item in 0..items {
                if let Err(e) = client.add_new_item(item).await {
                    if e.is_fatal() {
                        error!("停止投递条目: {e}");
                    } else {
                        warn!("停止投递条目: {}", e.user_message());
                    }
                    return;
                }
            }
            info!("已投递全部 {items} 个条目");
        })
    };

    let reporter = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(2));
            loop {
                ticker.tick().await;
                let chans = client.get_chan_stats();
                let stats = client.get_stats();
                info!(
                    "通道积压 输入: {}，回流: {}，待发送: {}；成功: {}，拒绝: {}，丢弃: {}",
                    chans.input,
                    chans.resort,
                    chans.batch,
                    stats.success,
                    stats.exceptions,
                    stats.discarded
                );
            }
        })
    };

    match duration {
        Some(seconds) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {
                    info!("运行时长已到: {seconds}s");
                }
                _ = wait_for_shutdown_signal() => {}
            }
        }
        None => wait_for_shutdown_signal().await,
    }

    info!("开始关闭同步器...");
    reporter.abort();
    producer.abort();

    if let Err(e) = client.shutdown().await {
        error!("同步器关闭失败: {e}");
    }

    let report = json!({
        "channels": client.get_chan_stats(),
        "stats": client.get_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("自适应批量同步器已退出");
    Ok(())
}

/// 记录客户端错误并转换为进程退出错误
fn report_client_error(action: &str, err: SyncerError) -> anyhow::Error {
    if err.is_fatal() {
        error!("{action}: {}（{err}）", err.user_message());
    } else {
        warn!("{action}: {}", err.user_message());
    }
    anyhow::Error::new(err).context(action.to_string())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
    }

    Ok(())
}

/// 按名称创建模拟外部服务
fn build_service(name: &str, batch_size: u64) -> Result<Arc<dyn ExternalService<u64>>> {
    let duration = Duration::from_secs(1);
    let service: Arc<dyn ExternalService<u64>> = match name {
        "cool" => Arc::new(CoolService::new(batch_size, duration)),
        "bad" => Arc::new(BadService::new(batch_size, duration)),
        "random" => Arc::new(RandomService::new(batch_size, duration)),
        _ => return Err(anyhow::anyhow!("不支持的模拟服务: {name}")),
    };
    Ok(service)
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
