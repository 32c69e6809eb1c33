//! 負荷彙總（需求工時分桶）

use std::collections::{BTreeMap, BTreeSet};

use rccp_core::{CapacityError, DemandSource, PlanningPeriod};
use rust_decimal::Decimal;

/// 單一期間的彙總負荷
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodLoad {
    /// 需求工時合計
    pub required_hours: Decimal,

    /// 需求ID → 貢獻工時
    pub contributions: BTreeMap<String, Decimal>,
}

impl PeriodLoad {
    /// 加入需求貢獻
    pub fn add(&mut self, demand_id: &str, hours: Decimal) {
        *self
            .contributions
            .entry(demand_id.to_string())
            .or_insert(Decimal::ZERO) += hours;
        self.required_hours += hours;
    }
}

/// 負荷彙總器
pub struct LoadAggregator;

impl LoadAggregator {
    /// 彙總某工作中心於期間內的需求工時
    ///
    /// 跨多期間的需求依日期重疊天數按比例拆分。
    /// 任一需求引用未配置的工作中心時回傳 `UnknownWorkCenter`。
    pub fn aggregate_load(
        work_center: &str,
        period: &PlanningPeriod,
        demands: &[DemandSource],
        known_work_centers: &BTreeSet<String>,
    ) -> rccp_core::Result<PeriodLoad> {
        if let Some(unknown) = demands
            .iter()
            .find(|d| !known_work_centers.contains(&d.work_center))
        {
            return Err(CapacityError::UnknownWorkCenter(format!(
                "{} (需求 {})",
                unknown.work_center, unknown.id
            )));
        }

        let mut load = PeriodLoad::default();
        for demand in demands.iter().filter(|d| d.work_center == work_center) {
            for (_, hours) in Self::distribute(demand, std::slice::from_ref(period)) {
                load.add(&demand.id, hours);
            }
        }

        Ok(load)
    }

    /// 將單一需求分配到計劃期間
    ///
    /// 回傳 `(期間索引, 工時)`，只包含有重疊的期間。
    /// 需求日期完全落在期間內時，最後一個重疊期間承接餘數，確保總工時守恆。
    pub fn distribute(demand: &DemandSource, horizon: &[PlanningPeriod]) -> Vec<(usize, Decimal)> {
        let total_days = demand.active_days();
        if total_days <= 0 {
            return Vec::new();
        }

        let overlaps: Vec<(usize, i64)> = horizon
            .iter()
            .enumerate()
            .map(|(idx, period)| (idx, period.overlap_days(demand.start, demand.end)))
            .filter(|(_, days)| *days > 0)
            .collect();

        let covered: i64 = overlaps.iter().map(|(_, days)| days).sum();
        let total = Decimal::from(total_days);

        let mut shares: Vec<(usize, Decimal)> = overlaps
            .iter()
            .map(|(idx, days)| (*idx, demand.required_hours * Decimal::from(*days) / total))
            .collect();

        if covered == total_days {
            if let Some((last, rest)) = shares.split_last_mut() {
                let allotted: Decimal = rest.iter().map(|(_, hours)| *hours).sum();
                last.1 = demand.required_hours - allotted;
            }
        }

        shares
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    fn horizon() -> Vec<PlanningPeriod> {
        PlanningPeriod::weekly_horizon(date(3), 3)
    }

    fn known() -> BTreeSet<String> {
        BTreeSet::from(["WC-CNC".to_string(), "WC-ASM".to_string()])
    }

    fn demand(id: &str, wc: &str, hours: i64, start: u32, end: u32) -> DemandSource {
        DemandSource::new(id.to_string(), wc.to_string(), Decimal::from(hours), date(start), date(end))
    }

    #[test]
    fn test_aggregate_single_period() {
        let demands = vec![
            demand("WO-1", "WC-CNC", 40, 3, 5),
            demand("WO-2", "WC-CNC", 25, 6, 7),
            demand("WO-3", "WC-ASM", 99, 3, 5),
        ];

        let load = LoadAggregator::aggregate_load("WC-CNC", &horizon()[0], &demands, &known()).unwrap();

        assert_eq!(load.required_hours, Decimal::from(65));
        assert_eq!(load.contributions.len(), 2);
        assert_eq!(load.contributions["WO-1"], Decimal::from(40));
    }

    #[test]
    fn test_pro_rata_split_across_periods() {
        // 11/6 - 11/12 共 7 天：第一週 4 天，第二週 3 天
        let wo = demand("WO-SPAN", "WC-CNC", 70, 6, 12);
        let shares = LoadAggregator::distribute(&wo, &horizon());

        assert_eq!(shares, vec![(0, Decimal::from(40)), (1, Decimal::from(30))]);
    }

    #[test]
    fn test_split_conserves_hours_with_repeating_fraction() {
        // 10 小時跨 3 天，每天 1/3
        let wo = demand("WO-THIRDS", "WC-CNC", 10, 9, 11);
        let shares = LoadAggregator::distribute(&wo, &horizon());

        let total: Decimal = shares.iter().map(|(_, h)| *h).sum();
        assert_eq!(total, Decimal::from(10));
        assert_eq!(shares.len(), 2);
    }

    #[test]
    fn test_demand_outside_horizon_partially_counted() {
        // 11/20 - 11/29：只有 11/20 - 11/23 在第三週內
        let wo = demand("WO-LATE", "WC-CNC", 100, 20, 29);
        let shares = LoadAggregator::distribute(&wo, &horizon());

        assert_eq!(shares, vec![(2, Decimal::from(40))]);
    }

    #[test]
    fn test_unknown_work_center() {
        let demands = vec![demand("WO-X", "WC-GHOST", 10, 3, 3)];

        let result = LoadAggregator::aggregate_load("WC-CNC", &horizon()[0], &demands, &known());
        assert!(matches!(result, Err(CapacityError::UnknownWorkCenter(_))));
    }
}
