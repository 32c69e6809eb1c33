//! 可用產能計算

use rccp_core::{PlanningPeriod, WorkCenter};
use rust_decimal::Decimal;

/// 可用產能來源
///
/// 純計算模型與帶快取的實作都經由此介面提供給計劃運算。
pub trait CapacityProvider: Sync {
    /// 工作中心於期間內的可用產能工時
    fn available_hours(
        &self,
        work_center: &WorkCenter,
        period: &PlanningPeriod,
    ) -> rccp_core::Result<Decimal>;
}

/// 產能模型（純函數，不快取）
#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityModel;

impl CapacityModel {
    /// 計算可用產能
    ///
    /// `機台數 × 每日班次 × 每班工時 × 期間工作日 × 效率係數`
    pub fn compute_available_capacity(
        work_center: &WorkCenter,
        period: &PlanningPeriod,
    ) -> rccp_core::Result<Decimal> {
        work_center.validate()?;
        period.validate()?;

        let days = period.working_days_for(work_center.working_days_per_week);
        Ok(Decimal::from(work_center.machines)
            * Decimal::from(work_center.shifts_per_day)
            * work_center.hours_per_shift
            * days
            * work_center.efficiency_factor)
    }

    /// 每週可用產能（以配置的每週工作日計）
    pub fn weekly_capacity(work_center: &WorkCenter) -> rccp_core::Result<Decimal> {
        work_center.validate()?;

        Ok(Decimal::from(work_center.machines)
            * Decimal::from(work_center.shifts_per_day)
            * work_center.hours_per_shift
            * work_center.working_days_per_week
            * work_center.efficiency_factor)
    }

    /// 每增加一班的期間產能：`機台數 × 每班工時 × 期間工作日 × 效率係數`
    pub fn shift_capacity(work_center: &WorkCenter, period: &PlanningPeriod) -> Decimal {
        let days = period.working_days_for(work_center.working_days_per_week);
        Decimal::from(work_center.machines)
            * work_center.hours_per_shift
            * days
            * work_center.efficiency_factor
    }

    /// 每增加一台機台的期間產能：`每日班次 × 每班工時 × 期間工作日 × 效率係數`
    pub fn machine_capacity(work_center: &WorkCenter, period: &PlanningPeriod) -> Decimal {
        let days = period.working_days_for(work_center.working_days_per_week);
        Decimal::from(work_center.shifts_per_day)
            * work_center.hours_per_shift
            * days
            * work_center.efficiency_factor
    }
}

impl CapacityProvider for CapacityModel {
    fn available_hours(
        &self,
        work_center: &WorkCenter,
        period: &PlanningPeriod,
    ) -> rccp_core::Result<Decimal> {
        Self::compute_available_capacity(work_center, period)
    }
}
