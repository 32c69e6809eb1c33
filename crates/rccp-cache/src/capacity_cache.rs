//! 可用產能快取

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rccp_calc::{CapacityModel, CapacityProvider};
use rccp_core::{PlanningPeriod, WorkCenter};
use rust_decimal::Decimal;

use crate::dirty_tracking::DirtyTracker;

/// 快取統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<(String, PlanningPeriod), Decimal>,
    dirty: DirtyTracker,
    hits: u64,
    misses: u64,
}

impl CacheState {
    /// 丟棄髒工作中心的快取項目
    fn purge_if_dirty(&mut self, work_center: &str) {
        if self.dirty.clear_one(work_center) {
            self.entries.retain(|(code, _), _| code != work_center);
            tracing::debug!("工作中心 {} 配置已變更，清除產能快取", work_center);
        }
    }
}

/// 可用產能快取
///
/// 以（工作中心代碼，期間）為鍵記憶 `CapacityModel` 的結果；
/// 配置更新後呼叫 `invalidate`，下一次查詢即重新計算。
#[derive(Debug, Default)]
pub struct CapacityCache {
    state: Mutex<CacheState>,
}

impl CapacityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 標記工作中心配置已變更
    pub fn invalidate(&self, work_center: &str) {
        self.lock().dirty.mark_dirty(work_center);
    }

    /// 清除所有快取
    pub fn invalidate_all(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.dirty.clear();
    }

    /// 只保留指定計劃期間的快取項目，回傳移除筆數
    pub fn retain_horizon(&self, horizon: &[PlanningPeriod]) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|(_, period), _| horizon.contains(period));
        let evicted = before - state.entries.len();
        if evicted > 0 {
            tracing::debug!("移除計劃期間外的產能快取 {} 筆", evicted);
        }
        evicted
    }

    /// 等待重算的工作中心
    pub fn dirty_work_centers(&self) -> Vec<String> {
        self.lock().dirty.dirty_work_centers()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.entries.len(),
        }
    }
}

impl CapacityProvider for CapacityCache {
    fn available_hours(
        &self,
        work_center: &WorkCenter,
        period: &PlanningPeriod,
    ) -> rccp_core::Result<Decimal> {
        let mut state = self.lock();
        state.purge_if_dirty(&work_center.code);

        let key = (work_center.code.clone(), period.clone());
        if let Some(hours) = state.entries.get(&key).copied() {
            state.hits += 1;
            return Ok(hours);
        }

        // 錯誤不快取
        let hours = CapacityModel::compute_available_capacity(work_center, period)?;
        state.misses += 1;
        state.entries.insert(key, hours);
        Ok(hours)
    }
}
