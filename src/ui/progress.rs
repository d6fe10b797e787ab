use crate::config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 探测阶段的进度显示
#[derive(Clone)]
pub struct ProgressTracker {
    probe_progress: Option<ProgressBar>,
    total_nodes: Arc<AtomicU64>,
    reachable_nodes: Arc<AtomicU64>,
    checked_nodes: Arc<AtomicU64>,
}

impl ProgressTracker {
    pub fn new(config: &Config) -> Self {
        if !config.print_progress {
            return Self::disabled();
        }

        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap()
        .progress_chars("#>-");

        let probe_progress = ProgressBar::new(0);
        probe_progress.set_style(style);

        Self {
            probe_progress: Some(probe_progress),
            total_nodes: Arc::new(AtomicU64::new(0)),
            reachable_nodes: Arc::new(AtomicU64::new(0)),
            checked_nodes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 关闭显示的跟踪器，测试和静默模式用
    pub fn disabled() -> Self {
        Self {
            probe_progress: None,
            total_nodes: Arc::new(AtomicU64::new(0)),
            reachable_nodes: Arc::new(AtomicU64::new(0)),
            checked_nodes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn set_total_nodes(&self, total: u64) {
        self.total_nodes.store(total, Ordering::Relaxed);

        if let Some(pb) = &self.probe_progress {
            pb.set_length(total);
            pb.set_position(0);
        }
    }

    pub fn increment_probe(&self, reachable: bool) {
        self.checked_nodes.fetch_add(1, Ordering::Relaxed);
        if reachable {
            self.reachable_nodes.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(pb) = &self.probe_progress {
            pb.inc(1);
            if reachable {
                pb.set_message("✅");
            } else {
                pb.set_message("❌");
            }
        }
    }

    pub fn finalize(&self) {
        if let Some(pb) = &self.probe_progress {
            pb.finish_with_message("检测完成");
        }
    }

    pub fn get_stats(&self) -> ProgressStats {
        ProgressStats {
            total: self.total_nodes.load(Ordering::Relaxed),
            reachable: self.reachable_nodes.load(Ordering::Relaxed),
            checked: self.checked_nodes.load(Ordering::Relaxed),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.probe_progress.is_some()
    }
}

pub struct ProgressStats {
    pub total: u64,
    pub reachable: u64,
    pub checked: u64,
}

impl ProgressStats {
    pub fn success_rate(&self) -> f64 {
        if self.total > 0 {
            (self.reachable as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_tracker_counts() {
        let tracker = ProgressTracker::disabled();
        assert!(!tracker.is_enabled());

        tracker.set_total_nodes(4);
        tracker.increment_probe(true);
        tracker.increment_probe(false);

        let stats = tracker.get_stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.checked, 2);
        assert_eq!(stats.reachable, 1);
        assert_eq!(stats.success_rate(), 25.0);
    }

    #[test]
    fn test_success_rate_empty() {
        let stats = ProgressStats {
            total: 0,
            reachable: 0,
            checked: 0,
        };
        assert_eq!(stats.success_rate(), 0.0);
    }
}
