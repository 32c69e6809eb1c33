//! 機台/人力產能拆分分析

use rccp_core::{CapacityError, LoadPeriod, WorkCenter};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::capacity::CapacityModel;

/// 機台與人力產能拆分結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitAnalysis {
    pub work_center: String,
    pub period_id: String,

    /// 機台產能工時
    pub machine_capacity: Decimal,

    /// 人力產能工時
    pub labor_capacity: Decimal,

    /// 機台利用率（%）
    pub machine_utilization: Option<Decimal>,

    /// 人力利用率（%）
    pub labor_utilization: Option<Decimal>,

    /// 需求人力工時
    pub required_labor_hours: Decimal,

    pub operators_required: u32,
    pub operators_available: u32,

    /// 一人多機比率（人力產能 / 機台產能）；機台數多於操作員時才有值
    pub multi_machine_ratio: Option<Decimal>,

    /// 人力不足
    pub labor_shortfall: bool,
}

/// 機台/人力拆分分析器
pub struct MachineLaborSplitAnalyzer;

impl MachineLaborSplitAnalyzer {
    /// 分析工作中心於期間的機台與人力產能
    ///
    /// 工作中心未配置人力資料時回傳 `InvalidConfiguration`。
    pub fn split_analysis(
        work_center: &WorkCenter,
        load: &LoadPeriod,
    ) -> rccp_core::Result<SplitAnalysis> {
        let labor = work_center.labor.as_ref().ok_or_else(|| {
            CapacityError::InvalidConfiguration(format!(
                "{}: 未配置人力資料，無法進行機台/人力拆分",
                work_center.code
            ))
        })?;

        let machine_capacity = CapacityModel::compute_available_capacity(work_center, &load.period)?;
        let days = load
            .period
            .working_days_for(work_center.working_days_per_week);

        // 單一操作員於期間內的有效工時
        let per_operator = work_center.hours_per_shift
            * Decimal::from(work_center.shifts_per_day)
            * days
            * labor.labor_efficiency;
        let labor_capacity = Decimal::from(labor.operators_available) * per_operator;
        let required_labor_hours = load.required_hours * labor.labor_hours_per_machine_hour;

        let operators_required = if per_operator > Decimal::ZERO {
            (required_labor_hours / per_operator)
                .ceil()
                .to_u32()
                .unwrap_or(u32::MAX)
        } else {
            0
        };

        let multi_machine_ratio = if work_center.machines > labor.operators_available
            && machine_capacity > Decimal::ZERO
        {
            Some(labor_capacity / machine_capacity)
        } else {
            None
        };

        let labor_shortfall = operators_required > labor.operators_available
            || (per_operator <= Decimal::ZERO && required_labor_hours > Decimal::ZERO);

        if labor_shortfall {
            tracing::debug!(
                "{} {} 人力不足：需要 {} 人，可用 {} 人",
                work_center.code,
                load.period.id,
                operators_required,
                labor.operators_available
            );
        }

        Ok(SplitAnalysis {
            work_center: work_center.code.clone(),
            period_id: load.period.id.clone(),
            machine_capacity,
            labor_capacity,
            machine_utilization: percent(load.required_hours, machine_capacity),
            labor_utilization: percent(required_labor_hours, labor_capacity),
            required_labor_hours,
            operators_required,
            operators_available: labor.operators_available,
            multi_machine_ratio,
            labor_shortfall,
        })
    }
}

fn percent(required: Decimal, capacity: Decimal) -> Option<Decimal> {
    (capacity > Decimal::ZERO).then(|| required / capacity * Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rccp_core::{LaborProfile, LoadStatus, PlanningPeriod};
    use std::collections::BTreeMap;

    fn cnc(labor: Option<LaborProfile>) -> WorkCenter {
        let wc = WorkCenter::new("WC-CNC".to_string(), "CNC".to_string(), "機加".to_string())
            .with_machines(4)
            .with_shifts_per_day(2)
            .with_hours_per_shift(Decimal::from(8))
            .with_working_days_per_week(Decimal::from(6))
            .with_efficiency_factor(Decimal::new(85, 2));
        match labor {
            Some(labor) => wc.with_labor(labor),
            None => wc,
        }
    }

    fn load(required: Decimal) -> LoadPeriod {
        let start = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        LoadPeriod {
            work_center: "WC-CNC".to_string(),
            period: PlanningPeriod::new("P01".to_string(), start, start + chrono::Duration::days(6)),
            available_hours: Decimal::new(3264, 1),
            required_hours: required,
            utilization: None,
            variance: Decimal::ZERO,
            status: LoadStatus::Ok,
            overtime_hours: Decimal::ZERO,
            demand_sources: BTreeMap::new(),
        }
    }

    #[test]
    fn test_one_operator_per_two_machines() {
        // 2 人 × 2 班 × 8 小時 × 6 天 × 0.9 = 172.8
        let wc = cnc(Some(LaborProfile::new(2, Decimal::new(9, 1))));
        let result = MachineLaborSplitAnalyzer::split_analysis(&wc, &load(Decimal::from(200))).unwrap();

        assert_eq!(result.machine_capacity, Decimal::new(3264, 1));
        assert_eq!(result.labor_capacity, Decimal::new(1728, 1));
        // 200 / 86.4 = 2.31 → 3 人
        assert_eq!(result.operators_required, 3);
        assert!(result.labor_shortfall);
        assert_eq!(
            result.multi_machine_ratio,
            Some(Decimal::new(1728, 1) / Decimal::new(3264, 1))
        );
    }

    #[test]
    fn test_labor_ratio_scales_required_hours() {
        let profile = LaborProfile::new(4, Decimal::ONE)
            .with_labor_hours_per_machine_hour(Decimal::new(5, 1));
        let wc = cnc(Some(profile));
        let result = MachineLaborSplitAnalyzer::split_analysis(&wc, &load(Decimal::from(192))).unwrap();

        assert_eq!(result.required_labor_hours, Decimal::from(96));
        assert_eq!(result.operators_required, 1);
        assert!(!result.labor_shortfall);
        assert_eq!(result.multi_machine_ratio, None);
        assert_eq!(result.labor_utilization, Some(Decimal::from(25)));
    }

    #[test]
    fn test_missing_labor_profile() {
        let result = MachineLaborSplitAnalyzer::split_analysis(&cnc(None), &load(Decimal::from(10)));
        assert!(matches!(result, Err(CapacityError::InvalidConfiguration(_))));
    }
}
