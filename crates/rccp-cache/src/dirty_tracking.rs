//! 髒標記追蹤

use std::collections::BTreeSet;

/// 髒標記追蹤器（以工作中心代碼為鍵）
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_work_centers: BTreeSet<String>,
}

impl DirtyTracker {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 標記工作中心為髒
    pub fn mark_dirty(&mut self, work_center: &str) {
        self.dirty_work_centers.insert(work_center.to_string());
    }

    /// 檢查工作中心是否為髒
    pub fn is_dirty(&self, work_center: &str) -> bool {
        self.dirty_work_centers.contains(work_center)
    }

    /// 清除單一工作中心的髒標記
    pub fn clear_one(&mut self, work_center: &str) -> bool {
        self.dirty_work_centers.remove(work_center)
    }

    /// 清除所有髒標記
    pub fn clear(&mut self) {
        self.dirty_work_centers.clear();
    }

    /// 獲取所有髒工作中心（排序）
    pub fn dirty_work_centers(&self) -> Vec<String> {
        self.dirty_work_centers.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_clear() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty("WC-B");
        tracker.mark_dirty("WC-A");
        tracker.mark_dirty("WC-A");

        assert!(tracker.is_dirty("WC-A"));
        assert_eq!(tracker.dirty_work_centers(), vec!["WC-A".to_string(), "WC-B".to_string()]);

        assert!(tracker.clear_one("WC-A"));
        assert!(!tracker.is_dirty("WC-A"));

        tracker.clear();
        assert!(tracker.dirty_work_centers().is_empty());
    }
}
