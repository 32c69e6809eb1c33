//! 瓶頸偵測與緩解建議

use std::collections::{BTreeMap, BTreeSet};

use rccp_core::{
    Bottleneck, BottleneckSeverity, LoadPeriod, LoadStatus, MitigationAction, MitigationKind,
    PlanningPolicy, WorkCenter,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::capacity::CapacityModel;

/// 瓶頸偵測器
pub struct BottleneckDetector<'a> {
    work_centers: &'a BTreeMap<String, WorkCenter>,
    policy: &'a PlanningPolicy,
}

impl<'a> BottleneckDetector<'a> {
    /// 創建偵測器
    pub fn new(work_centers: &'a BTreeMap<String, WorkCenter>, policy: &'a PlanningPolicy) -> Self {
        Self {
            work_centers,
            policy,
        }
    }

    /// 偵測瓶頸
    ///
    /// 每個有超載（或產能無效）期間的工作中心產生一筆摘要，
    /// 依嚴重程度、最大利用率排序。
    pub fn detect_bottlenecks(&self, periods: &[LoadPeriod]) -> Vec<Bottleneck> {
        let mut grouped: BTreeMap<&str, Vec<&LoadPeriod>> = BTreeMap::new();
        for period in periods {
            grouped
                .entry(period.work_center.as_str())
                .or_default()
                .push(period);
        }

        let mut bottlenecks: Vec<Bottleneck> = grouped
            .into_iter()
            .filter_map(|(code, wc_periods)| self.summarize(code, &wc_periods))
            .collect();

        bottlenecks.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.max_utilization.cmp(&a.max_utilization))
                .then(a.work_center.cmp(&b.work_center))
        });

        tracing::debug!("偵測到瓶頸工作中心 {} 個", bottlenecks.len());
        bottlenecks
    }

    /// 嚴重程度判定
    pub fn severity(
        horizon_len: usize,
        overloaded: usize,
        severe: usize,
        invalid: usize,
    ) -> BottleneckSeverity {
        if invalid > 0 || severe > 0 || overloaded * 2 > horizon_len {
            BottleneckSeverity::Critical
        } else if overloaded == 1 {
            BottleneckSeverity::Medium
        } else {
            BottleneckSeverity::High
        }
    }

    fn summarize(&self, code: &str, periods: &[&LoadPeriod]) -> Option<Bottleneck> {
        let overloaded: Vec<&LoadPeriod> = periods
            .iter()
            .copied()
            .filter(|p| p.is_overloaded() || p.status == LoadStatus::InvalidCapacity)
            .collect();

        if overloaded.is_empty() {
            return None;
        }

        let severe = periods
            .iter()
            .filter(|p| p.status == LoadStatus::SevereOverload)
            .count();
        let invalid = periods
            .iter()
            .filter(|p| p.status == LoadStatus::InvalidCapacity)
            .count();
        let overloaded_count = overloaded.len() - invalid;

        let utilizations: Vec<Decimal> = periods.iter().filter_map(|p| p.utilization).collect();
        let avg_utilization = if utilizations.is_empty() {
            Decimal::ZERO
        } else {
            utilizations.iter().sum::<Decimal>() / Decimal::from(utilizations.len())
        };
        let max_utilization = utilizations.iter().copied().max().unwrap_or(Decimal::ZERO);

        let total_overload_hours: Decimal = overloaded.iter().map(|p| p.shortfall()).sum();

        let impacted_demands: Vec<String> = overloaded
            .iter()
            .flat_map(|p| p.demand_ids())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let severity = Self::severity(periods.len(), overloaded_count, severe, invalid);
        let suggested_actions = self.suggest(code, periods, &overloaded, severity);

        Some(Bottleneck {
            work_center: code.to_string(),
            avg_utilization,
            max_utilization,
            overloaded_periods: overloaded_count,
            invalid_capacity_periods: invalid,
            total_overload_hours,
            impacted_demands,
            severity,
            suggested_actions,
        })
    }

    /// 依固定順序評估緩解範本：加班、增班、外包、重排、資本投資
    fn suggest(
        &self,
        code: &str,
        periods: &[&LoadPeriod],
        overloaded: &[&LoadPeriod],
        severity: BottleneckSeverity,
    ) -> Vec<MitigationAction> {
        let mut actions = Vec::new();

        let shortfall: Decimal = overloaded.iter().map(|p| p.shortfall()).sum();
        if shortfall <= Decimal::ZERO {
            return actions;
        }

        let Some(worst) = overloaded.iter().max_by_key(|p| p.shortfall()) else {
            return actions;
        };
        let worst_shortfall = worst.shortfall();
        let work_center = self.work_centers.get(code);

        // 1. 加班（受政策上限限制）
        let overtime_cap: Decimal = overloaded
            .iter()
            .map(|p| p.available_hours * self.policy.max_overtime_fraction)
            .sum();
        let overtime_hours = shortfall.min(overtime_cap);
        if let Some(wc) = work_center {
            if overtime_hours > Decimal::ZERO {
                let rate = wc.overtime_rate(self.policy.overtime_premium);
                let shifts = ceil_count(overtime_hours, wc.hours_per_shift);
                let mut description = format!(
                    "安排加班 {} 小時（約 {} 個加班班次）",
                    overtime_hours.round_dp(1),
                    shifts
                );
                if overtime_hours < shortfall {
                    description.push_str(&format!(
                        "，受加班上限限制仍缺 {} 小時",
                        (shortfall - overtime_hours).round_dp(1)
                    ));
                }
                actions.push(MitigationAction {
                    kind: MitigationKind::Overtime,
                    description,
                    hours: overtime_hours,
                    estimated_cost: overtime_hours * rate,
                });
            }
        }

        // 2. 增加班次
        if let Some(wc) = work_center {
            let per_shift = CapacityModel::shift_capacity(wc, &worst.period);
            let spare_shifts = 3u32.saturating_sub(wc.shifts_per_day);
            if per_shift > Decimal::ZERO && spare_shifts > 0 {
                let needed = ceil_count(worst_shortfall, per_shift);
                if needed <= spare_shifts {
                    let hours = per_shift * Decimal::from(needed);
                    actions.push(MitigationAction {
                        kind: MitigationKind::AddShift,
                        description: format!(
                            "超載期間增加 {} 個班次，每期增加 {} 小時產能",
                            needed,
                            hours.round_dp(1)
                        ),
                        hours,
                        estimated_cost: hours * wc.cost_per_hour,
                    });
                }
            }
        }

        // 3. 外包
        actions.push(MitigationAction {
            kind: MitigationKind::Outsource,
            description: format!(
                "外包 {} 小時，費率 {}/小時",
                shortfall.round_dp(1),
                self.policy.outsourcing_rate
            ),
            hours: shortfall,
            estimated_cost: shortfall * self.policy.outsourcing_rate,
        });

        // 4. 重新排程至其他期間的剩餘產能（填到緊繃下界為止）
        let headroom: Decimal = periods
            .iter()
            .filter(|p| !p.is_overloaded() && p.status != LoadStatus::InvalidCapacity)
            .map(|p| p.headroom_to(self.policy.thresholds.tight))
            .sum();
        let reschedulable = headroom.min(shortfall);
        if reschedulable > Decimal::ZERO {
            actions.push(MitigationAction {
                kind: MitigationKind::Reschedule,
                description: format!(
                    "將 {} 小時移至其他期間的剩餘產能",
                    reschedulable.round_dp(1)
                ),
                hours: reschedulable,
                estimated_cost: Decimal::ZERO,
            });
        }

        // 5. 資本投資：持續性瓶頸或加班不足以彌補時
        if let Some(wc) = work_center {
            let per_machine = CapacityModel::machine_capacity(wc, &worst.period);
            let persistent =
                severity == BottleneckSeverity::Critical || overtime_hours < shortfall;
            if persistent && per_machine > Decimal::ZERO {
                let machines = ceil_count(worst_shortfall, per_machine);
                let cost = Decimal::from(machines) * self.policy.machine_capital_cost;
                actions.push(MitigationAction {
                    kind: MitigationKind::CapitalInvestment,
                    description: format!(
                        "增購 {} 台機台，每期增加 {} 小時產能，資本支出 {}",
                        machines,
                        (per_machine * Decimal::from(machines)).round_dp(1),
                        cost
                    ),
                    hours: per_machine * Decimal::from(machines),
                    estimated_cost: cost,
                });
            }
        }

        actions
    }
}

/// 向上取整的數量：ceil(amount / unit)
fn ceil_count(amount: Decimal, unit: Decimal) -> u32 {
    if unit <= Decimal::ZERO {
        return 0;
    }
    (amount / unit).ceil().to_u32().unwrap_or(u32::MAX)
}
