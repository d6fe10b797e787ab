use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 探测策略
///
/// 两种策略来自脚本时代的两个版本：只建连、或者建连后发 64 字节随机数据
/// 做启发式握手。保留成可配置项，不替用户拍板。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStrategy {
    /// 只测 TCP 建连
    Connect,
    /// 建连后写入随机载荷，观察对端是否主动拒绝
    Handshake,
}

impl ProbeStrategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "connect" => Some(Self::Connect),
            "handshake" => Some(Self::Handshake),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 代理列表来源
    pub proxy_list_url: String,

    // 检测参数
    pub connect_timeout: u64,
    pub read_timeout: u64,
    pub fetch_timeout: u64,
    pub max_check: usize,
    pub max_send: usize,
    pub probe_strategy: ProbeStrategy,

    // 进度显示
    pub print_progress: bool,

    // 发布目标（固定频道 + 固定消息，即"永久帖"）
    pub chat_id: String,
    pub message_id: i64,

    // 日志配置
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_list_url:
                "https://raw.githubusercontent.com/Argh94/Proxy-List/main/MTProto.txt"
                    .to_string(),
            connect_timeout: 10000,
            read_timeout: 2000,
            fetch_timeout: 15000,
            max_check: 1000,
            max_send: 5,
            probe_strategy: ProbeStrategy::Handshake,
            print_progress: true,
            chat_id: "@i9006ii".to_string(),
            message_id: 2,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.connect_timeout)
    }

    pub fn read_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.read_timeout)
    }

    pub fn fetch_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connect_timeout, 10000);
        assert_eq!(config.read_timeout, 2000);
        assert_eq!(config.max_check, 1000);
        assert_eq!(config.max_send, 5);
        assert_eq!(config.probe_strategy, ProbeStrategy::Handshake);
        assert_eq!(config.message_id, 2);
    }

    #[test]
    fn test_strategy_from_name() {
        assert_eq!(
            ProbeStrategy::from_name("connect"),
            Some(ProbeStrategy::Connect)
        );
        assert_eq!(
            ProbeStrategy::from_name("Handshake"),
            Some(ProbeStrategy::Handshake)
        );
        assert_eq!(ProbeStrategy::from_name("tls"), None);
    }

    #[test]
    fn test_config_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.max_check = 200;
        config.connect_timeout = 2000;
        config.probe_strategy = ProbeStrategy::Connect;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.max_check, 200);
        assert_eq!(loaded.connect_timeout, 2000);
        assert_eq!(loaded.probe_strategy, ProbeStrategy::Connect);
        assert_eq!(loaded.proxy_list_url, config.proxy_list_url);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load_from_file("definitely/not/here.yaml").is_err());
    }
}
