use crate::check::ProbeResult;
use std::collections::HashSet;

/// 从全部探测结果里选出要发布的节点
///
/// 只留可达的，按主机去重（同一主机保留最先完成探测的那条），
/// 再按延迟升序稳定排序，最后截断到 max_send。延迟相同的保持原有相对顺序。
pub fn rank_results(results: &[ProbeResult], max_send: usize) -> Vec<ProbeResult> {
    let mut seen_hosts = HashSet::new();
    let mut ranked: Vec<ProbeResult> = results
        .iter()
        .filter(|r| r.reachable)
        .filter(|r| seen_hosts.insert(r.resolved_host.clone()))
        .cloned()
        .collect();

    // sort_by 是稳定排序，延迟打平时不重排
    ranked.sort_by(|a, b| {
        a.latency_ms
            .partial_cmp(&b.latency_ms)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ranked.truncate(max_send);
    ranked
}
