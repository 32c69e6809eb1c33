//! 期間負荷模型與負荷快照

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::demand::DemandSource;
use crate::period::PlanningPeriod;

/// 負荷狀態分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStatus {
    /// 正常（< 95%）
    Ok,
    /// 緊繃（95% - 100%）
    Tight,
    /// 中度超載（100% - 115%）
    ModerateOverload,
    /// 嚴重超載（≥ 115%）
    SevereOverload,
    /// 可用產能為零，無法分類
    InvalidCapacity,
}

impl LoadStatus {
    /// 是否為超載狀態
    pub fn is_overloaded(&self) -> bool {
        matches!(self, LoadStatus::ModerateOverload | LoadStatus::SevereOverload)
    }

    /// 是否需要處理（高於正常）
    pub fn needs_attention(&self) -> bool {
        !matches!(self, LoadStatus::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Ok => "ok",
            LoadStatus::Tight => "tight",
            LoadStatus::ModerateOverload => "moderate-overload",
            LoadStatus::SevereOverload => "severe-overload",
            LoadStatus::InvalidCapacity => "invalid-capacity",
        }
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 期間負荷（每個工作中心 × 每個期間一筆）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPeriod {
    /// 工作中心代碼
    pub work_center: String,

    /// 計劃期間
    pub period: PlanningPeriod,

    /// 可用產能工時
    pub available_hours: Decimal,

    /// 需求工時
    pub required_hours: Decimal,

    /// 利用率（%）；可用產能為零時為 None
    pub utilization: Option<Decimal>,

    /// 差異（可用 − 需求）
    pub variance: Decimal,

    /// 狀態
    pub status: LoadStatus,

    /// 已分配加班工時
    pub overtime_hours: Decimal,

    /// 需求來源 → 在本期間貢獻的工時
    pub demand_sources: BTreeMap<String, Decimal>,
}

impl LoadPeriod {
    /// 期間ID
    pub fn period_id(&self) -> &str {
        &self.period.id
    }

    /// 產能缺口：max(0, 需求 − 可用)
    pub fn shortfall(&self) -> Decimal {
        (self.required_hours - self.available_hours).max(Decimal::ZERO)
    }

    /// 扣除已分配加班後仍未解決的缺口
    pub fn residual_shortfall(&self) -> Decimal {
        (self.shortfall() - self.overtime_hours).max(Decimal::ZERO)
    }

    /// 是否超載
    pub fn is_overloaded(&self) -> bool {
        self.status.is_overloaded()
    }

    /// 至指定利用率門檻（%）為止的剩餘空間工時
    pub fn headroom_to(&self, threshold_pct: Decimal) -> Decimal {
        let ceiling = self.available_hours * threshold_pct / Decimal::ONE_HUNDRED;
        (ceiling - self.required_hours).max(Decimal::ZERO)
    }

    /// 貢獻本期間負荷的需求ID
    pub fn demand_ids(&self) -> impl Iterator<Item = &str> {
        self.demand_sources.keys().map(String::as_str)
    }
}

/// 負荷快照：一次計劃運算的完整結果
///
/// 只能整批重算，或透過明確的平衡/加班操作修改。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadSnapshot {
    /// 版本號（每次修改遞增）
    pub revision: u64,

    /// 計劃期間（依開始日期排序）
    pub horizon: Vec<PlanningPeriod>,

    /// 期間負荷（依工作中心、期間開始日期排序）
    pub periods: Vec<LoadPeriod>,

    /// 參與本次運算的需求來源
    pub demands: BTreeMap<String, DemandSource>,
}

impl LoadSnapshot {
    /// 創建快照
    pub fn new(
        horizon: Vec<PlanningPeriod>,
        mut periods: Vec<LoadPeriod>,
        demands: BTreeMap<String, DemandSource>,
    ) -> Self {
        periods.sort_by(|a, b| {
            a.work_center
                .cmp(&b.work_center)
                .then(a.period.start.cmp(&b.period.start))
                .then(a.period.id.cmp(&b.period.id))
        });

        Self {
            revision: 0,
            horizon,
            periods,
            demands,
        }
    }

    /// 建構器模式：設置版本號
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// 快照中的工作中心代碼（排序、去重）
    pub fn work_centers(&self) -> Vec<String> {
        self.periods
            .iter()
            .map(|p| p.work_center.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 指定工作中心的期間負荷
    pub fn periods_for<'a>(&'a self, work_center: &'a str) -> impl Iterator<Item = &'a LoadPeriod> + 'a {
        self.periods
            .iter()
            .filter(move |p| p.work_center == work_center)
    }

    /// 查找期間負荷
    pub fn find(&self, work_center: &str, period_id: &str) -> Option<&LoadPeriod> {
        self.periods
            .iter()
            .find(|p| p.work_center == work_center && p.period.id == period_id)
    }

    /// 查找期間負荷（可變）
    pub fn find_mut(&mut self, work_center: &str, period_id: &str) -> Option<&mut LoadPeriod> {
        self.periods
            .iter_mut()
            .find(|p| p.work_center == work_center && p.period.id == period_id)
    }

    /// 指定需求在所有期間的工時合計
    pub fn hours_for_demand(&self, demand_id: &str) -> Decimal {
        self.periods
            .iter()
            .filter_map(|p| p.demand_sources.get(demand_id))
            .sum()
    }

    /// 峰值利用率；`work_center` 為 None 時涵蓋所有工作中心
    pub fn peak_utilization(&self, work_center: Option<&str>) -> Option<Decimal> {
        self.periods
            .iter()
            .filter(|p| work_center.map_or(true, |wc| p.work_center == wc))
            .filter_map(|p| p.utilization)
            .max()
    }

    /// 平均利用率（只計入可分類的期間）
    pub fn average_utilization(&self) -> Option<Decimal> {
        let values: Vec<Decimal> = self.periods.iter().filter_map(|p| p.utilization).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<Decimal>() / Decimal::from(values.len()))
        }
    }

    /// 所有期間需求工時合計
    pub fn total_required_hours(&self) -> Decimal {
        self.periods.iter().map(|p| p.required_hours).sum()
    }

    /// 匯出為 JSON（報表/儀表板使用）
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn load(wc: &str, pid: &str, day: u32, available: i64, required: i64) -> LoadPeriod {
        let start = NaiveDate::from_ymd_opt(2025, 11, day).unwrap();
        let available = Decimal::from(available);
        let required = Decimal::from(required);
        LoadPeriod {
            work_center: wc.to_string(),
            period: PlanningPeriod::new(pid.to_string(), start, start + chrono::Duration::days(6)),
            available_hours: available,
            required_hours: required,
            utilization: Some(required / available * Decimal::ONE_HUNDRED),
            variance: available - required,
            status: LoadStatus::Ok,
            overtime_hours: Decimal::ZERO,
            demand_sources: BTreeMap::from([("WO-1".to_string(), required)]),
        }
    }

    #[test]
    fn test_shortfall_and_headroom() {
        let mut period = load("WC-A", "P01", 3, 100, 120);

        assert_eq!(period.shortfall(), Decimal::from(20));
        assert_eq!(period.headroom_to(Decimal::ONE_HUNDRED), Decimal::ZERO);

        period.overtime_hours = Decimal::from(15);
        assert_eq!(period.residual_shortfall(), Decimal::from(5));

        let light = load("WC-A", "P02", 10, 100, 80);
        assert_eq!(light.headroom_to(Decimal::ONE_HUNDRED), Decimal::from(20));
        assert_eq!(light.shortfall(), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_ordering_and_lookup() {
        let snapshot = LoadSnapshot::new(
            Vec::new(),
            vec![
                load("WC-B", "P02", 10, 100, 50),
                load("WC-A", "P02", 10, 100, 90),
                load("WC-A", "P01", 3, 100, 110),
            ],
            BTreeMap::new(),
        );

        assert_eq!(snapshot.work_centers(), vec!["WC-A".to_string(), "WC-B".to_string()]);
        assert_eq!(snapshot.periods[0].period.id, "P01");
        assert_eq!(snapshot.periods_for("WC-A").count(), 2);
        assert!(snapshot.find("WC-B", "P02").is_some());
        assert!(snapshot.find("WC-B", "P01").is_none());
        assert_eq!(snapshot.peak_utilization(Some("WC-A")), Some(Decimal::from(110)));
        assert_eq!(snapshot.hours_for_demand("WO-1"), Decimal::from(250));
        assert_eq!(snapshot.average_utilization(), Some(Decimal::from(250) / Decimal::from(3)));
    }

    #[test]
    fn test_status_flags() {
        assert!(LoadStatus::SevereOverload.is_overloaded());
        assert!(!LoadStatus::Tight.is_overloaded());
        assert!(LoadStatus::Tight.needs_attention());
        assert_eq!(LoadStatus::ModerateOverload.to_string(), "moderate-overload");
    }

    #[test]
    fn test_snapshot_json_export() {
        let snapshot = LoadSnapshot::new(Vec::new(), vec![load("WC-A", "P01", 3, 100, 96)], BTreeMap::new());
        let json = snapshot.to_json().unwrap();

        assert!(json.contains("\"work_center\":\"WC-A\""));
        let restored: LoadSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
    }
}
