use serde::{Deserialize, Serialize};
use url::Url;

/// MTProto 代理链接前缀
pub const PROXY_LINK_SCHEME: &str = "tg://";

/// 从 tg:// 链接解析出的代理描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    /// 原始链接（发布时原样作为超链接目标）
    pub raw: String,
    pub host: String,
    pub port: u16,
    /// 混淆密钥，不做校验，原样保留
    pub secret: String,
}

impl ProxyDescriptor {
    pub fn new(raw: String, host: String, port: u16, secret: String) -> Self {
        Self {
            raw,
            host,
            port,
            secret,
        }
    }

    /// 探测时的连接目标
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 解析单条 tg://proxy 链接
///
/// server、port、secret 三个参数必须全部存在且非空，port 必须是合法端口号。
/// 格式不正确的链接一律返回 None，绝不向调用方抛错。
pub fn parse_proxy_link(link: &str) -> Option<ProxyDescriptor> {
    let link = link.trim();
    if !link.starts_with(PROXY_LINK_SCHEME) {
        return None;
    }

    let parsed = Url::parse(link).ok()?;

    let mut server = None;
    let mut port = None;
    let mut secret = None;

    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "server" => server = Some(value.to_string()),
            "port" => port = Some(value.to_string()),
            "secret" => secret = Some(value.to_string()),
            _ => {}
        }
    }

    let server = server.filter(|s| !s.is_empty())?;
    let port: u16 = port.filter(|p| !p.is_empty())?.parse().ok()?;
    if port == 0 {
        return None;
    }
    let secret = secret.filter(|s| !s.is_empty())?;

    Some(ProxyDescriptor::new(link.to_string(), server, port, secret))
}
