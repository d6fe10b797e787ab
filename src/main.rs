use anyhow::Result;
use check::ProxyChecker;
use clap::Parser;
use config::{Config, ProbeStrategy};
use std::path::Path;
use telegram::{TelegramError, TelegramPublisher};
use ui::progress::ProgressTracker;

mod check;
mod config;
mod fetch;
mod proxy;
mod rank;
mod telegram;
mod ui;

/// MTProto 代理检测与发布工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径
    #[arg(short = 'f', long, default_value = "config/config.yaml")]
    config: String,

    /// 代理列表地址
    #[arg(short = 'u', long)]
    list_url: Option<String>,

    /// 建连超时（毫秒）
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// 握手读超时（毫秒）
    #[arg(long)]
    read_timeout: Option<u64>,

    /// 最多检测多少个节点
    #[arg(long)]
    max_check: Option<usize>,

    /// 最多发布多少个节点
    #[arg(long)]
    max_send: Option<usize>,

    /// 探测策略：connect 或 handshake
    #[arg(long)]
    strategy: Option<String>,

    /// 是否显示进度条
    #[arg(long)]
    progress: Option<bool>,

    /// 只检测不发布
    #[arg(long)]
    dry_run: bool,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 详细输出
    #[arg(short, long)]
    verbose: bool,
}

fn print_ranked(ranked: &[check::ProbeResult]) {
    println!("\n发布名单:");
    println!("{:=<80}", "");
    for (i, result) in ranked.iter().enumerate() {
        println!(
            "{}. {}:{} 延迟: {:.0}ms",
            i + 1,
            result.resolved_host,
            result.descriptor.port,
            result.latency_ms
        );
    }
    println!("{:-<80}", "");
}

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 设置日志级别
    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &args.log_level);
    }
    env_logger::init();

    println!("🚀 MTProto 代理检测工具 v{}", env!("CARGO_PKG_VERSION"));
    println!("{:=<80}", "");

    // 尝试加载配置文件
    let mut config = if Path::new(&args.config).exists() {
        println!("📁 从配置文件加载设置: {}", args.config);
        match Config::load_from_file(&args.config) {
            Ok(config) => {
                println!("✅ 配置文件加载成功");
                config
            }
            Err(e) => {
                println!("⚠️  配置文件加载失败: {}", e);
                println!("📝 使用默认配置");
                Config::default()
            }
        }
    } else {
        println!("📝 使用默认配置 (配置文件不存在: {})", args.config);
        Config::default()
    };

    // 覆盖命令行参数
    if let Some(list_url) = args.list_url {
        config.proxy_list_url = list_url;
    }
    if let Some(connect_timeout) = args.connect_timeout {
        config.connect_timeout = connect_timeout;
    }
    if let Some(read_timeout) = args.read_timeout {
        config.read_timeout = read_timeout;
    }
    if let Some(max_check) = args.max_check {
        config.max_check = max_check;
    }
    if let Some(max_send) = args.max_send {
        config.max_send = max_send;
    }
    if let Some(strategy) = args.strategy {
        match ProbeStrategy::from_name(&strategy) {
            Some(strategy) => config.probe_strategy = strategy,
            None => println!("⚠️  未知的探测策略: {}，继续使用配置值", strategy),
        }
    }
    if let Some(progress) = args.progress {
        config.print_progress = progress;
    }

    // 打印配置信息
    println!("\n⚙️  当前配置:");
    println!("  列表地址: {}", config.proxy_list_url);
    println!("  建连超时: {}ms", config.connect_timeout);
    println!("  读超时: {}ms", config.read_timeout);
    println!("  检测上限: {}", config.max_check);
    println!("  发布上限: {}", config.max_send);
    println!("  探测策略: {:?}", config.probe_strategy);

    // 拉取代理列表
    println!("\n📡 获取代理链接...");
    let lines =
        fetch::fetch_proxy_list(&config.proxy_list_url, config.fetch_timeout_duration()).await;
    println!("✅ 获取到 {} 条链接", lines.len());

    // 解析链接，格式不对的直接丢弃
    let descriptors: Vec<_> = lines
        .iter()
        .filter_map(|line| proxy::parse_proxy_link(line))
        .collect();
    println!("✅ 解析出 {} 个有效节点", descriptors.len());

    // 创建进度跟踪器
    let progress_tracker = ProgressTracker::new(&config);
    progress_tracker.set_total_nodes(descriptors.len().min(config.max_check) as u64);

    // 执行探测
    println!("\n🔍 开始探测代理节点...");
    println!("{:=<80}", "");

    let checker = ProxyChecker::new(config.clone());
    let results = checker.check_proxies(descriptors, &progress_tracker).await;

    if config.print_progress {
        progress_tracker.finalize();
    }

    // 打印统计信息
    checker.print_stats();

    // 去重、排序、截断
    let ranked = rank::rank_results(&results, config.max_send);

    if ranked.is_empty() {
        println!("\n😔 没有可用的代理节点，本次不更新频道");
        return Ok(());
    }

    print_ranked(&ranked);

    // 渲染并发布
    let message = telegram::render_message(&ranked);
    println!("\n生成的消息:\n{}", message);

    if args.dry_run {
        println!("🧪 dry-run 模式，跳过发布");
        return Ok(());
    }

    match TelegramPublisher::from_env(&config) {
        Ok(publisher) => match publisher.edit_eternal_post(&message).await {
            Ok(()) => println!("\n🎉 永久帖更新完成!"),
            // 发布失败只记录，不影响退出码
            Err(e) => println!("\n⚠️  发布失败: {}", e),
        },
        Err(TelegramError::MissingToken) => {
            println!("\n⚠️  未设置 BOT_TOKEN，跳过发布");
        }
        Err(e) => {
            println!("\n⚠️  发布器初始化失败: {}", e);
        }
    }

    Ok(())
}
