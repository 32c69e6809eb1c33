//! 產能計劃主計算器

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use rccp_core::{
    CapacityError, DemandSource, LoadPeriod, LoadSnapshot, LoadStatus, PlanningPeriod,
    PlanningPolicy, WorkCenter,
};
use rust_decimal::Decimal;

use crate::aggregation::{LoadAggregator, PeriodLoad};
use crate::bottleneck::BottleneckDetector;
use crate::capacity::{CapacityModel, CapacityProvider};
use crate::split::{MachineLaborSplitAnalyzer, SplitAnalysis};
use crate::utilization::UtilizationClassifier;
use crate::{CapacitySummary, PlanningIssue, PlanningRun};

/// 產能計劃計算器
///
/// 持有工作中心配置與計劃政策，每次 `run` 以整批需求重算完整負荷快照。
pub struct CapacityPlanner {
    /// 工作中心配置（依代碼）
    work_centers: BTreeMap<String, WorkCenter>,

    /// 計劃政策
    policy: PlanningPolicy,

    /// 利用率分類器
    classifier: UtilizationClassifier,
}

impl CapacityPlanner {
    /// 創建新的計算器
    pub fn new(
        work_centers: impl IntoIterator<Item = WorkCenter>,
        policy: PlanningPolicy,
    ) -> rccp_core::Result<Self> {
        policy.validate()?;

        let work_centers = work_centers
            .into_iter()
            .map(|wc| (wc.code.clone(), wc))
            .collect();

        Ok(Self {
            work_centers,
            classifier: UtilizationClassifier::new(policy.thresholds.clone()),
            policy,
        })
    }

    pub fn work_centers(&self) -> &BTreeMap<String, WorkCenter> {
        &self.work_centers
    }

    pub fn policy(&self) -> &PlanningPolicy {
        &self.policy
    }

    pub fn classifier(&self) -> &UtilizationClassifier {
        &self.classifier
    }

    /// 以純計算產能模型執行計劃運算
    pub fn run(
        &self,
        horizon: Vec<PlanningPeriod>,
        demands: &[DemandSource],
    ) -> rccp_core::Result<PlanningRun> {
        self.run_with(&CapacityModel, horizon, demands)
    }

    /// 主計算入口
    ///
    /// 無效的工作中心配置或需求記錄不會中止運算，而是記錄為問題並排除；
    /// 只有計劃期間本身無效時才回傳錯誤。
    pub fn run_with<P: CapacityProvider + ?Sized>(
        &self,
        provider: &P,
        mut horizon: Vec<PlanningPeriod>,
        demands: &[DemandSource],
    ) -> rccp_core::Result<PlanningRun> {
        tracing::info!(
            "開始產能計劃運算：工作中心 {} 個，期間 {} 個，需求 {} 筆",
            self.work_centers.len(),
            horizon.len(),
            demands.len()
        );

        let start_time = std::time::Instant::now();
        let mut issues = Vec::new();

        // Step 1: 驗證計劃期間
        tracing::debug!("Step 1: 驗證計劃期間");
        Self::validate_horizon(&mut horizon)?;

        // Step 2: 篩選可計算的工作中心
        tracing::debug!("Step 2: 驗證工作中心配置");
        let active = self.active_work_centers(&mut issues);
        tracing::debug!("可計算工作中心: {} 個", active.len());

        // Step 3: 篩選需求並分配到期間
        tracing::debug!("Step 3: 需求分桶");
        let accepted = self.accept_demands(demands, &active, &mut issues);
        let buckets = Self::bucket_demands(&accepted, &horizon, &mut issues);

        // Step 4: 逐工作中心計算產能與利用率（平行）
        tracing::debug!("Step 4: 計算產能與利用率");
        let per_work_center: Vec<(Vec<LoadPeriod>, Vec<PlanningIssue>)> = active
            .par_iter()
            .map(|code| {
                let work_center = &self.work_centers[code.as_str()];
                let empty = Vec::new();
                let loads = buckets.get(code.as_str()).unwrap_or(&empty);
                self.calculate_work_center(provider, work_center, &horizon, loads)
            })
            .collect();

        let mut periods = Vec::with_capacity(active.len() * horizon.len());
        for (wc_periods, wc_issues) in per_work_center {
            periods.extend(wc_periods);
            issues.extend(wc_issues);
        }

        let demand_map: BTreeMap<String, DemandSource> = accepted
            .into_iter()
            .map(|d| (d.id.clone(), d.clone()))
            .collect();
        let snapshot = LoadSnapshot::new(horizon, periods, demand_map);

        // Step 5: 瓶頸偵測
        tracing::debug!("Step 5: 瓶頸偵測");
        let bottlenecks =
            BottleneckDetector::new(&self.work_centers, &self.policy).detect_bottlenecks(&snapshot.periods);

        let summary = CapacitySummary::from_snapshot(&snapshot);
        let elapsed = start_time.elapsed();

        tracing::info!("產能計劃運算完成，耗時 {:?}", elapsed);
        tracing::info!(
            "期間負荷 {} 筆，瓶頸 {} 個，問題 {} 筆",
            snapshot.periods.len(),
            bottlenecks.len(),
            issues.len()
        );

        Ok(PlanningRun {
            snapshot,
            bottlenecks,
            issues,
            summary,
            calculation_time_ms: Some(elapsed.as_millis()),
        })
    }

    /// 以快照中的期間負荷進行機台/人力拆分分析
    pub fn split_analysis(
        &self,
        snapshot: &LoadSnapshot,
        work_center: &str,
        period_id: &str,
    ) -> rccp_core::Result<SplitAnalysis> {
        let config = self
            .work_centers
            .get(work_center)
            .ok_or_else(|| CapacityError::UnknownWorkCenter(work_center.to_string()))?;
        let load = snapshot.find(work_center, period_id).ok_or_else(|| {
            CapacityError::NotFound(format!("期間負荷 {}/{}", work_center, period_id))
        })?;

        MachineLaborSplitAnalyzer::split_analysis(config, load)
    }

    /// 驗證期間並依開始日期排序；期間ID不可重複
    fn validate_horizon(horizon: &mut [PlanningPeriod]) -> rccp_core::Result<()> {
        let mut ids = BTreeSet::new();
        for period in horizon.iter() {
            period.validate()?;
            if !ids.insert(period.id.as_str()) {
                return Err(CapacityError::InvalidConfiguration(format!(
                    "期間ID重複: {}",
                    period.id
                )));
            }
        }
        horizon.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
        Ok(())
    }

    /// 有效且啟用的工作中心代碼
    fn active_work_centers(&self, issues: &mut Vec<PlanningIssue>) -> Vec<String> {
        let mut active = Vec::new();

        for (code, work_center) in &self.work_centers {
            if let Err(e) = work_center.validate() {
                tracing::warn!("工作中心 {} 配置無效，跳過: {}", code, e);
                issues.push(PlanningIssue::from_error(code, &e));
                continue;
            }
            if !work_center.is_active() {
                tracing::debug!("工作中心 {} 非啟用狀態，不產生期間負荷", code);
                issues.push(PlanningIssue::info(
                    code.clone(),
                    "InactiveWorkCenter",
                    format!("工作中心 {} 狀態為 {:?}，不參與本次運算", code, work_center.status),
                ));
                continue;
            }
            active.push(code.clone());
        }

        active
    }

    /// 驗證需求；無效、重複或指向不可計算工作中心的需求記錄為問題並排除
    fn accept_demands<'d>(
        &self,
        demands: &'d [DemandSource],
        active: &[String],
        issues: &mut Vec<PlanningIssue>,
    ) -> Vec<&'d DemandSource> {
        let mut seen = BTreeSet::new();
        let mut accepted = Vec::new();

        for demand in demands {
            if let Err(e) = demand.validate() {
                tracing::warn!("需求 {} 無效，跳過: {}", demand.id, e);
                issues.push(PlanningIssue::from_error(&demand.id, &e));
                continue;
            }

            if !self.work_centers.contains_key(&demand.work_center) {
                tracing::warn!("需求 {} 引用未配置的工作中心 {}", demand.id, demand.work_center);
                let error = CapacityError::UnknownWorkCenter(demand.work_center.clone());
                issues.push(PlanningIssue::from_error(&demand.id, &error));
                continue;
            }

            if !active.iter().any(|code| *code == demand.work_center) {
                issues.push(PlanningIssue::warning(
                    demand.id.clone(),
                    "InactiveWorkCenter",
                    format!("需求 {} 所屬工作中心 {} 未啟用或配置無效，已排除", demand.id, demand.work_center),
                ));
                continue;
            }

            if !seen.insert(demand.id.as_str()) {
                issues.push(PlanningIssue::error(
                    demand.id.clone(),
                    "InvalidConfiguration",
                    format!("需求ID重複: {}", demand.id),
                ));
                continue;
            }

            accepted.push(demand);
        }

        accepted
    }

    /// 依工作中心將需求分配到期間桶
    fn bucket_demands<'d>(
        demands: &[&'d DemandSource],
        horizon: &[PlanningPeriod],
        issues: &mut Vec<PlanningIssue>,
    ) -> BTreeMap<&'d str, Vec<PeriodLoad>> {
        let mut buckets: BTreeMap<&str, Vec<PeriodLoad>> = BTreeMap::new();

        for demand in demands {
            let shares = LoadAggregator::distribute(demand, horizon);
            let placed: Decimal = shares.iter().map(|(_, hours)| *hours).sum();

            let loads = buckets
                .entry(demand.work_center.as_str())
                .or_insert_with(|| vec![PeriodLoad::default(); horizon.len()]);
            for (idx, hours) in shares {
                loads[idx].add(&demand.id, hours);
            }

            if placed < demand.required_hours {
                issues.push(PlanningIssue::info(
                    demand.id.clone(),
                    "OutsideHorizon",
                    format!(
                        "需求 {} 有 {} 小時落在計劃期間之外",
                        demand.id,
                        demand.required_hours - placed
                    ),
                ));
            }
        }

        buckets
    }

    /// 單一工作中心的期間負荷
    fn calculate_work_center<P: CapacityProvider + ?Sized>(
        &self,
        provider: &P,
        work_center: &WorkCenter,
        horizon: &[PlanningPeriod],
        loads: &[PeriodLoad],
    ) -> (Vec<LoadPeriod>, Vec<PlanningIssue>) {
        let mut periods = Vec::with_capacity(horizon.len());
        let mut issues = Vec::new();

        for (idx, period) in horizon.iter().enumerate() {
            let available_hours = match provider.available_hours(work_center, period) {
                Ok(hours) => hours,
                Err(e) => {
                    issues.push(PlanningIssue::from_error(&work_center.code, &e));
                    Decimal::ZERO
                }
            };
            let load = loads.get(idx).cloned().unwrap_or_default();

            let mut load_period = LoadPeriod {
                work_center: work_center.code.clone(),
                period: period.clone(),
                available_hours,
                required_hours: load.required_hours,
                utilization: None,
                variance: Decimal::ZERO,
                status: LoadStatus::Ok,
                overtime_hours: Decimal::ZERO,
                demand_sources: load.contributions,
            };
            self.classifier.reclassify(&mut load_period);

            if load_period.utilization.is_none() {
                let error = CapacityError::InvalidCapacity {
                    work_center: work_center.code.clone(),
                    period_id: period.id.clone(),
                };
                tracing::warn!("{}", error);
                issues.push(PlanningIssue::from_error(&work_center.code, &error));
            }

            periods.push(load_period);
        }

        (periods, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IssueSeverity;
    use chrono::NaiveDate;
    use rccp_core::WorkCenterStatus;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn cnc() -> WorkCenter {
        WorkCenter::new("WC-CNC".to_string(), "CNC".to_string(), "機加".to_string())
            .with_machines(4)
            .with_shifts_per_day(2)
            .with_hours_per_shift(Decimal::from(8))
            .with_working_days_per_week(Decimal::from(6))
            .with_efficiency_factor(Decimal::new(85, 2))
    }

    fn assembly() -> WorkCenter {
        WorkCenter::new("WC-ASM".to_string(), "組裝線".to_string(), "組裝".to_string())
            .with_machines(2)
            .with_hours_per_shift(Decimal::from(8))
    }

    fn demand(id: &str, wc: &str, hours: i64, start: u32, end: u32) -> DemandSource {
        DemandSource::new(id.to_string(), wc.to_string(), Decimal::from(hours), date(start), date(end))
    }

    fn planner() -> CapacityPlanner {
        CapacityPlanner::new(vec![cnc(), assembly()], PlanningPolicy::default()).unwrap()
    }

    #[test]
    fn test_run_builds_full_grid() {
        let demands = vec![
            demand("WO-1", "WC-CNC", 300, 3, 7),
            demand("WO-2", "WC-CNC", 100, 10, 14),
            demand("WO-3", "WC-ASM", 40, 3, 7),
        ];

        let run = planner().run(PlanningPeriod::weekly_horizon(date(3), 2), &demands).unwrap();

        assert_eq!(run.snapshot.periods.len(), 4);
        assert!(run.issues.is_empty());

        let p1 = run.snapshot.find("WC-CNC", "P01").unwrap();
        assert_eq!(p1.available_hours, Decimal::new(3264, 1));
        assert_eq!(p1.required_hours, Decimal::from(300));
        assert_eq!(p1.status, LoadStatus::Ok);

        // 組裝線：2 × 1 × 8 × 5 × 1 = 80
        let asm = run.snapshot.find("WC-ASM", "P01").unwrap();
        assert_eq!(asm.available_hours, Decimal::from(80));
        assert_eq!(asm.utilization, Some(Decimal::from(50)));

        assert_eq!(run.summary.total_required_hours, Decimal::from(440));
        assert_eq!(run.snapshot.demands.len(), 3);
    }

    #[test]
    fn test_unknown_and_invalid_demands_become_issues() {
        let mut negative = demand("WO-NEG", "WC-CNC", 10, 3, 4);
        negative.required_hours = Decimal::from(-5);

        let demands = vec![
            demand("WO-1", "WC-CNC", 100, 3, 7),
            demand("WO-GHOST", "WC-NOPE", 10, 3, 4),
            negative,
        ];

        let run = planner().run(PlanningPeriod::weekly_horizon(date(3), 1), &demands).unwrap();

        assert_eq!(run.snapshot.demands.len(), 1);
        assert_eq!(run.issues.len(), 2);
        assert!(run
            .issues
            .iter()
            .any(|i| i.record_id == "WO-GHOST" && i.kind == "UnknownWorkCenter"));
        assert!(run
            .issues
            .iter()
            .all(|i| i.severity == IssueSeverity::Error));
    }

    #[test]
    fn test_inactive_work_center_excluded() {
        let planner = CapacityPlanner::new(
            vec![cnc(), assembly().with_status(WorkCenterStatus::Maintenance)],
            PlanningPolicy::default(),
        )
        .unwrap();
        let demands = vec![demand("WO-3", "WC-ASM", 40, 3, 7)];

        let run = planner.run(PlanningPeriod::weekly_horizon(date(3), 1), &demands).unwrap();

        assert!(run.snapshot.find("WC-ASM", "P01").is_none());
        assert!(run
            .issues
            .iter()
            .any(|i| i.record_id == "WO-3" && i.severity == IssueSeverity::Warning));
    }

    #[test]
    fn test_zero_working_days_marks_invalid_capacity() {
        let start = date(3);
        let horizon = vec![
            PlanningPeriod::new("SHUT".to_string(), start, start + chrono::Duration::days(6))
                .with_working_days(Decimal::ZERO),
        ];
        let demands = vec![demand("WO-1", "WC-CNC", 10, 3, 4)];

        let run = planner().run(horizon, &demands).unwrap();
        let period = run.snapshot.find("WC-CNC", "SHUT").unwrap();

        assert_eq!(period.status, LoadStatus::InvalidCapacity);
        assert!(run.issues.iter().any(|i| i.kind == "InvalidCapacity"));
        assert!(run.bottlenecks.iter().any(|b| b.work_center == "WC-CNC" && b.is_critical()));
    }

    #[test]
    fn test_duplicate_period_ids_rejected() {
        let mut horizon = PlanningPeriod::weekly_horizon(date(3), 2);
        horizon[1].id = horizon[0].id.clone();

        let result = planner().run(horizon, &[]);
        assert!(matches!(result, Err(CapacityError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_demand_outside_horizon_reported() {
        let demands = vec![demand("WO-LATE", "WC-CNC", 100, 20, 29)];
        let run = planner().run(PlanningPeriod::weekly_horizon(date(3), 1), &demands).unwrap();

        assert_eq!(run.issues.len(), 1);
        assert_eq!(run.issues[0].kind, "OutsideHorizon");
        assert_eq!(run.issues[0].severity, IssueSeverity::Info);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let demands = vec![
            demand("WO-1", "WC-CNC", 380, 3, 7),
            demand("WO-2", "WC-CNC", 70, 6, 12),
        ];
        let planner = planner();

        let first = planner.run(PlanningPeriod::weekly_horizon(date(3), 3), &demands).unwrap();
        let second = planner.run(PlanningPeriod::weekly_horizon(date(3), 3), &demands).unwrap();

        assert_eq!(first.snapshot, second.snapshot);
        assert_eq!(first.bottlenecks, second.bottlenecks);
    }
}
