use crate::config::{Config, ProbeStrategy};
use crate::proxy::ProxyDescriptor;
use crate::ui::progress::ProgressTracker;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task;
use tokio::time::timeout;

/// 启发式握手写入的随机载荷长度
const HANDSHAKE_PAYLOAD_LEN: usize = 64;

/// 单次探测的结果，生成后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub descriptor: ProxyDescriptor,
    pub reachable: bool,
    pub latency_ms: f64,
    /// 去重用的主机名，直接取自链接里的 server 参数
    pub resolved_host: String,
}

pub struct Stats {
    pub total_nodes: AtomicU64,
    pub checked_nodes: AtomicU64,
    pub reachable_nodes: AtomicU64,
    pub rejected_nodes: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_nodes: AtomicU64::new(0),
            checked_nodes: AtomicU64::new(0),
            reachable_nodes: AtomicU64::new(0),
            rejected_nodes: AtomicU64::new(0),
        }
    }

    pub fn increment_reachable(&self) {
        self.reachable_nodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.rejected_nodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_checked(&self) {
        self.checked_nodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_success_rate(&self) -> f64 {
        let total = self.total_nodes.load(Ordering::Relaxed);
        let reachable = self.reachable_nodes.load(Ordering::Relaxed);

        if total > 0 {
            (reachable as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ProxyChecker {
    config: Config,
    stats: Arc<Stats>,
}

impl ProxyChecker {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stats: Arc::new(Stats::new()),
        }
    }

    /// 并发探测全部候选节点
    ///
    /// 每个节点一个任务，结果通过通道汇总。这里刻意等所有任务跑完再返回，
    /// 不做"凑够 N 个成功就收工"的提前退出，排序去重都在之后统一处理。
    pub async fn check_proxies(
        &self,
        descriptors: Vec<ProxyDescriptor>,
        progress: &ProgressTracker,
    ) -> Vec<ProbeResult> {
        let mut descriptors = descriptors;
        if descriptors.len() > self.config.max_check {
            descriptors.truncate(self.config.max_check);
        }

        let stats = self.stats.clone();
        stats
            .total_nodes
            .store(descriptors.len() as u64, Ordering::Relaxed);

        let (tx, mut rx) = mpsc::channel(100);
        let mut tasks = Vec::new();

        for descriptor in descriptors {
            let tx = tx.clone();
            let config = self.config.clone();
            let stats = stats.clone();

            let task = task::spawn(async move {
                let result = probe_proxy(descriptor, &config).await;

                if result.reachable {
                    stats.increment_reachable();
                } else {
                    stats.increment_rejected();
                }
                stats.increment_checked();

                let _ = tx.send(result).await;
            });

            tasks.push(task);
        }

        // 关闭发送端，收完所有消息后通道自然结束
        drop(tx);

        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            progress.increment_probe(result.reachable);
            results.push(result);
        }

        // 等待所有任务完成
        for task in tasks {
            let _ = task.await;
        }

        results
    }

    pub fn print_stats(&self) {
        let total = self.stats.total_nodes.load(Ordering::Relaxed);
        let checked = self.stats.checked_nodes.load(Ordering::Relaxed);
        let reachable = self.stats.reachable_nodes.load(Ordering::Relaxed);
        let rejected = self.stats.rejected_nodes.load(Ordering::Relaxed);

        println!("检测统计:");
        println!("  总节点数: {}", total);
        println!("  已检测数: {}", checked);
        println!("  可达节点: {}", reachable);
        println!("  不可达节点: {}", rejected);

        if total > 0 {
            println!("  可达率: {:.2}%", self.stats.get_success_rate());
        }
    }

    pub fn get_stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }
}

/// 探测单个代理端点
///
/// 不做完整的 MTProto 握手。"可达"只代表对端没有明确拒绝：
/// 建连成功、且（握手策略下）写入随机载荷后对端要么回了数据、
/// 要么保持连接静默等待更多数据。主动断开和建连失败都算不可达。
pub async fn probe_proxy(descriptor: ProxyDescriptor, config: &Config) -> ProbeResult {
    let resolved_host = descriptor.host.clone();
    let addr = descriptor.socket_addr();

    let start = Instant::now();
    let stream = match timeout(config.connect_timeout_duration(), TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => stream,
        // 建连超时或被拒绝，延迟记 0
        _ => return failed_result(descriptor, resolved_host),
    };
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

    let reachable = match config.probe_strategy {
        ProbeStrategy::Connect => true,
        ProbeStrategy::Handshake => handshake_probe(stream, config).await,
    };

    ProbeResult {
        descriptor,
        reachable,
        latency_ms: if reachable { latency_ms } else { 0.0 },
        resolved_host,
    }
}

fn failed_result(descriptor: ProxyDescriptor, resolved_host: String) -> ProbeResult {
    ProbeResult {
        descriptor,
        reachable: false,
        latency_ms: 0.0,
        resolved_host,
    }
}

/// 启发式握手：写 64 字节随机数据，再给对端一个短暂的"拒绝窗口"
///
/// 读到 0 字节说明对端主动断开，判为不可达；读超时说明对端还在等
/// 后续握手数据，判为可达；读到任何数据同样判为可达。
async fn handshake_probe(mut stream: TcpStream, config: &Config) -> bool {
    let payload = random_payload();

    if stream.write_all(&payload).await.is_err() {
        return false;
    }

    let mut buf = [0u8; 1];
    match timeout(config.read_timeout_duration(), stream.read(&mut buf)).await {
        // 超时反而是好信号：连接还开着，对端在等合法握手
        Err(_) => true,
        Ok(Ok(0)) => false,
        Ok(Ok(_)) => true,
        Ok(Err(_)) => false,
    }
}

fn random_payload() -> [u8; HANDSHAKE_PAYLOAD_LEN] {
    let mut payload = [0u8; HANDSHAKE_PAYLOAD_LEN];
    rand::thread_rng().fill(&mut payload[..]);
    payload
}
