use log::{info, warn};
use std::time::Duration;

/// 拉取换行分隔的代理列表
///
/// 任何网络错误或非 2xx 状态都在这里消化掉，返回空列表，调用方只会看到
/// "没有候选节点"。按照定时任务的定位，不做重试。
pub async fn fetch_proxy_list(url: &str, timeout: Duration) -> Vec<String> {
    info!("正在拉取代理列表: {}", url);

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("创建 HTTP 客户端失败: {}", e);
            return vec![];
        }
    };

    let response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            warn!("拉取代理列表失败: {}", e);
            return vec![];
        }
    };

    if !response.status().is_success() {
        warn!("代理列表源返回异常状态: {}", response.status());
        return vec![];
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!("读取代理列表响应失败: {}", e);
            return vec![];
        }
    };

    let lines = split_proxy_lines(&body);
    info!("获取到 {} 条候选链接", lines.len());
    lines
}

/// 按行切分列表正文，去掉首尾空白和空行，保持原始顺序
pub fn split_proxy_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
