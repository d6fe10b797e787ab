use crate::check::ProbeResult;
use crate::config::Config;
use chrono::{FixedOffset, Utc};
use log::info;
use reqwest::Client;
use serde_json::json;

/// Telegram Bot API 地址，测试时可替换
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// 频道时间戳用莫斯科时间（UTC+3，无夏令时）
const MSK_OFFSET_SECS: i32 = 3 * 3600;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// BOT_TOKEN 缺失时发布功能整体停用，探测照常
    #[error("BOT_TOKEN not set")]
    MissingToken,
    #[error("Telegram API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// 渲染频道消息
///
/// 固定的 HTML 模版：标题、使用说明、MSK 本地化时间戳，
/// 然后每个节点一行编号链接。链接就是原始 tg:// 字符串，不做任何转义。
pub fn render_message(ranked: &[ProbeResult]) -> String {
    let msk = FixedOffset::east_opt(MSK_OFFSET_SECS).unwrap();
    let now = Utc::now().with_timezone(&msk);
    let updated_at = now.format("%d.%m.%Y в %H:%M по МСК");

    let mut message = String::new();
    message.push_str("📱 <b>Для стабильной загрузки фото и видео в Telegram</b>\n\n");
    message.push_str("Если настройки сбились — нужно выбрать следующую ссылку из списка.\n\n");
    message.push_str("Настройки обновляются автоматически каждые 3 часа.\n\n");
    message.push_str(&format!("Последнее обновление: {}\n\n", updated_at));

    for (i, result) in ranked.iter().enumerate() {
        message.push_str(&format!(
            "🔗 <a href='{}'>Применить настройки #{}</a>\n",
            result.descriptor.raw,
            i + 1
        ));
    }

    message
}

/// 负责改写频道里的"永久帖"
///
/// 用 editMessageText 反复覆盖同一条消息，订阅者手里的链接永远有效。
pub struct TelegramPublisher {
    token: String,
    chat_id: String,
    message_id: i64,
    api_base: String,
}

impl TelegramPublisher {
    pub fn new(token: String, chat_id: String, message_id: i64) -> Self {
        Self {
            token,
            chat_id,
            message_id,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// 从环境变量组装发布器
    ///
    /// BOT_TOKEN 必须有；CHAT_ID 可选，缺省用配置里的频道。
    pub fn from_env(config: &Config) -> Result<Self, TelegramError> {
        let token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(TelegramError::MissingToken)?;

        let chat_id = std::env::var("CHAT_ID")
            .ok()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| config.chat_id.clone());

        Ok(Self::new(token, chat_id, config.message_id))
    }

    /// 测试用：把 API 指到本地桩服务
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    pub async fn edit_eternal_post(&self, text: &str) -> Result<(), TelegramError> {
        let url = format!("{}/bot{}/editMessageText", self.api_base, self.token);

        let payload = json!({
            "chat_id": self.chat_id,
            "message_id": self.message_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let response = Client::new().post(&url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelegramError::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!("永久帖 (ID {}) 更新成功", self.message_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ProxyDescriptor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn ranked_sample(n: usize) -> Vec<ProbeResult> {
        (0..n)
            .map(|i| {
                let host = format!("10.0.0.{}", i);
                let raw = format!("tg://proxy?server={}&port=443&secret=ee00", host);
                ProbeResult {
                    descriptor: ProxyDescriptor::new(raw, host.clone(), 443, "ee00".to_string()),
                    reachable: true,
                    latency_ms: 10.0 * (i + 1) as f64,
                    resolved_host: host,
                }
            })
            .collect()
    }

    async fn spawn_one_shot_http(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_render_message_layout() {
        let message = render_message(&ranked_sample(3));

        assert!(message.contains("<b>Для стабильной загрузки фото и видео в Telegram</b>"));
        assert!(message.contains("Последнее обновление:"));
        assert!(message.contains("по МСК"));
        assert!(message.contains("Применить настройки #1"));
        assert!(message.contains("Применить настройки #3"));
        assert!(!message.contains("Применить настройки #4"));
        // 链接原样输出
        assert!(message.contains("href='tg://proxy?server=10.0.0.0&port=443&secret=ee00'"));
    }

    #[test]
    fn test_render_message_line_count() {
        let message = render_message(&ranked_sample(5));
        let link_lines = message.lines().filter(|l| l.starts_with("🔗")).count();
        assert_eq!(link_lines, 5);
    }

    #[test]
    fn test_render_empty_set_has_no_links() {
        let message = render_message(&[]);
        assert!(message.contains("Последнее обновление:"));
        assert_eq!(message.lines().filter(|l| l.starts_with("🔗")).count(), 0);
    }

    #[tokio::test]
    async fn test_publish_success() {
        let base = spawn_one_shot_http("HTTP/1.1 200 OK", r#"{"ok":true}"#).await;
        let publisher =
            TelegramPublisher::new("token".to_string(), "@chan".to_string(), 2).with_api_base(&base);

        assert!(publisher.edit_eternal_post("hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_api_error_is_reported_not_fatal() {
        let base = spawn_one_shot_http(
            "HTTP/1.1 400 Bad Request",
            r#"{"ok":false,"description":"Bad Request: message is not modified"}"#,
        )
        .await;
        let publisher =
            TelegramPublisher::new("token".to_string(), "@chan".to_string(), 2).with_api_base(&base);

        match publisher.edit_eternal_post("hello").await {
            Err(TelegramError::Api { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("not modified"));
            }
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_from_env_requires_token() {
        std::env::remove_var("BOT_TOKEN");
        let config = Config::default();
        assert!(matches!(
            TelegramPublisher::from_env(&config),
            Err(TelegramError::MissingToken)
        ));

        std::env::set_var("BOT_TOKEN", "123:abc");
        let publisher = TelegramPublisher::from_env(&config).unwrap();
        assert_eq!(publisher.chat_id, config.chat_id);
        assert_eq!(publisher.message_id, 2);
        std::env::remove_var("BOT_TOKEN");
    }
}
