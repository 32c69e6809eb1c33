//! 假設情境評估

use std::collections::{BTreeMap, BTreeSet};

use rccp_calc::{BottleneckDetector, CapacityModel, UtilizationClassifier};
use rccp_core::{
    Bottleneck, BottleneckSeverity, CapacityChange, CapacityError, ChangeKind, Feasibility,
    LoadSnapshot, PlanningPolicy, Scenario, ScenarioImpact, ScenarioRequest, WorkCenter,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// 單一變更的影響
#[derive(Debug, Clone, Copy, Default)]
struct ChangeEffect {
    weekly_capacity: Decimal,
    horizon_capacity: Decimal,
    cost: Decimal,
}

/// 情境評估器
///
/// 在基準快照與工作中心配置的私有副本上套用變更，不修改任何輸入。
pub struct ScenarioEvaluator<'a> {
    work_centers: &'a BTreeMap<String, WorkCenter>,
    policy: &'a PlanningPolicy,
    classifier: UtilizationClassifier,
}

impl<'a> ScenarioEvaluator<'a> {
    pub fn new(work_centers: &'a BTreeMap<String, WorkCenter>, policy: &'a PlanningPolicy) -> Self {
        Self {
            work_centers,
            policy,
            classifier: UtilizationClassifier::new(policy.thresholds.clone()),
        }
    }

    /// 評估情境
    pub fn evaluate_scenario(
        &self,
        request: &ScenarioRequest,
        baseline: &LoadSnapshot,
    ) -> rccp_core::Result<Scenario> {
        tracing::info!(
            "評估情境「{}」：變更 {} 項，基準版本 {}",
            request.name,
            request.changes.len(),
            baseline.revision
        );

        let mut configs = self.work_centers.clone();
        let mut copy = baseline.clone();
        let mut total = ChangeEffect::default();

        for change in &request.changes {
            let effect = self.apply_change(change, &mut configs, &mut copy)?;
            tracing::debug!(
                "{} 變更：每週產能 +{}，成本 +{}",
                change.work_center,
                effect.weekly_capacity,
                effect.cost
            );
            total.weekly_capacity += effect.weekly_capacity;
            total.horizon_capacity += effect.horizon_capacity;
            total.cost += effect.cost;
        }

        for period in copy.periods.iter_mut() {
            self.classifier.reclassify(period);
        }

        let before = BottleneckDetector::new(self.work_centers, self.policy)
            .detect_bottlenecks(&baseline.periods);
        let after = BottleneckDetector::new(&configs, self.policy).detect_bottlenecks(&copy.periods);

        let before_codes: BTreeSet<&str> = before.iter().map(|b| b.work_center.as_str()).collect();
        let after_codes: BTreeSet<&str> = after.iter().map(|b| b.work_center.as_str()).collect();

        let bottlenecks_resolved = before_codes.difference(&after_codes).count();
        let new: Vec<&Bottleneck> = after
            .iter()
            .filter(|b| !before_codes.contains(b.work_center.as_str()))
            .collect();

        let utilization_change = copy.average_utilization().unwrap_or(Decimal::ZERO)
            - baseline.average_utilization().unwrap_or(Decimal::ZERO);

        let feasibility = self.feasibility(total.cost, &new);

        let impact = ScenarioImpact {
            capacity_increase: total.weekly_capacity,
            horizon_capacity_increase: total.horizon_capacity,
            cost_increase: total.cost,
            utilization_change,
            bottlenecks_resolved,
            new_bottlenecks: new.iter().map(|b| b.work_center.clone()).collect(),
        };

        tracing::info!(
            "情境「{}」評估完成：解除瓶頸 {} 個，新瓶頸 {} 個，可行性 {:?}",
            request.name,
            impact.bottlenecks_resolved,
            impact.new_bottlenecks.len(),
            feasibility
        );

        Ok(Scenario {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            description: request.description.clone(),
            changes: request.changes.clone(),
            baseline_revision: baseline.revision,
            impact,
            feasibility,
        })
    }

    /// 可行性評級
    ///
    /// 高：成本低於高可行門檻且無新瓶頸；中：成本低於中可行門檻且新瓶頸皆為中度；其餘為低。
    pub fn feasibility(&self, cost: Decimal, new_bottlenecks: &[&Bottleneck]) -> Feasibility {
        let thresholds = &self.policy.feasibility;
        let minor = new_bottlenecks
            .iter()
            .all(|b| b.severity == BottleneckSeverity::Medium);

        if cost < thresholds.high_max_cost && new_bottlenecks.is_empty() {
            Feasibility::High
        } else if cost < thresholds.medium_max_cost && minor {
            Feasibility::Medium
        } else {
            Feasibility::Low
        }
    }

    fn apply_change(
        &self,
        change: &CapacityChange,
        configs: &mut BTreeMap<String, WorkCenter>,
        copy: &mut LoadSnapshot,
    ) -> rccp_core::Result<ChangeEffect> {
        let work_center = configs
            .get_mut(&change.work_center)
            .ok_or_else(|| CapacityError::UnknownWorkCenter(change.work_center.clone()))?;
        work_center.validate()?;
        if copy.periods_for(&change.work_center).next().is_none() {
            return Err(CapacityError::UnknownWorkCenter(format!(
                "{}（不在基準快照中）",
                change.work_center
            )));
        }

        let effect = match &change.change {
            ChangeKind::AddShift {
                shifts,
                labor_cost_per_shift,
            } => {
                let updated = work_center
                    .shifts_per_day
                    .checked_add(*shifts)
                    .filter(|n| *shifts > 0 && *n <= 3)
                    .ok_or_else(|| {
                        CapacityError::InvalidConfiguration(format!(
                            "{}: 目前每日 {} 班，增加 {} 班後超出 1-3",
                            change.work_center, work_center.shifts_per_day, shifts
                        ))
                    })?;
                let count = Decimal::from(*shifts);
                let weekly = Decimal::from(work_center.machines)
                    * work_center.hours_per_shift
                    * work_center.working_days_per_week
                    * work_center.efficiency_factor
                    * count;
                let horizon = add_capacity(copy, work_center, |wc, period| {
                    CapacityModel::shift_capacity(wc, period) * count
                });
                work_center.shifts_per_day = updated;

                ChangeEffect {
                    weekly_capacity: weekly,
                    horizon_capacity: horizon,
                    cost: count * *labor_cost_per_shift,
                }
            }
            ChangeKind::AddMachine {
                machines,
                capital_cost_per_machine,
                amortization_periods,
            } => {
                if *machines == 0 {
                    return Err(CapacityError::InvalidConfiguration(format!(
                        "{}: 增購機台數必須為正整數",
                        change.work_center
                    )));
                }
                let updated = work_center.machines.checked_add(*machines).ok_or_else(|| {
                    CapacityError::InvalidConfiguration(format!(
                        "{}: 增購 {} 台後機台數溢位",
                        change.work_center, machines
                    ))
                })?;
                let count = Decimal::from(*machines);
                let weekly = Decimal::from(work_center.shifts_per_day)
                    * work_center.hours_per_shift
                    * work_center.working_days_per_week
                    * work_center.efficiency_factor
                    * count;
                let horizon = add_capacity(copy, work_center, |wc, period| {
                    CapacityModel::machine_capacity(wc, period) * count
                });
                work_center.machines = updated;

                let capital = count * *capital_cost_per_machine;
                let cost = match amortization_periods {
                    Some(0) => {
                        return Err(CapacityError::InvalidConfiguration(format!(
                            "{}: 攤提期數必須為正整數",
                            change.work_center
                        )))
                    }
                    Some(periods) => {
                        let charged = copy.horizon.len().min(*periods as usize);
                        capital / Decimal::from(*periods) * Decimal::from(charged)
                    }
                    None => capital,
                };

                ChangeEffect {
                    weekly_capacity: weekly,
                    horizon_capacity: horizon,
                    cost,
                }
            }
            ChangeKind::Efficiency { new_factor } => {
                let old = work_center.efficiency_factor;
                if *new_factor <= Decimal::ZERO || *new_factor > Decimal::ONE {
                    return Err(CapacityError::InvalidConfiguration(format!(
                        "{}: 效率係數必須介於 (0, 1]，實際 {}",
                        change.work_center, new_factor
                    )));
                }
                let gain = *new_factor - old;
                let weekly = CapacityModel::weekly_capacity(work_center)? * gain / old;
                let mut horizon = Decimal::ZERO;
                for period in copy
                    .periods
                    .iter_mut()
                    .filter(|p| p.work_center == change.work_center)
                {
                    let delta = period.available_hours * gain / old;
                    period.available_hours += delta;
                    horizon += delta;
                }
                work_center.efficiency_factor = *new_factor;

                ChangeEffect {
                    weekly_capacity: weekly,
                    horizon_capacity: horizon,
                    cost: Decimal::ZERO,
                }
            }
            ChangeKind::Outsource { hours, rate } => {
                if *hours < Decimal::ZERO {
                    return Err(CapacityError::InvalidConfiguration(format!(
                        "{}: 外包工時不可為負",
                        change.work_center
                    )));
                }
                let moved = outsource(copy, &change.work_center, *hours);
                let rate = rate.unwrap_or(self.policy.outsourcing_rate);

                ChangeEffect {
                    weekly_capacity: moved,
                    horizon_capacity: moved,
                    cost: moved * rate,
                }
            }
        };

        Ok(effect)
    }
}

/// 依每期增量增加工作中心的可用產能，回傳整個期間的增量合計
fn add_capacity(
    copy: &mut LoadSnapshot,
    work_center: &WorkCenter,
    increment: impl Fn(&WorkCenter, &rccp_core::PlanningPeriod) -> Decimal,
) -> Decimal {
    let mut total = Decimal::ZERO;
    for period in copy
        .periods
        .iter_mut()
        .filter(|p| p.work_center == work_center.code)
    {
        let added = increment(work_center, &period.period);
        period.available_hours += added;
        total += added;
    }
    total
}

/// 將工時轉出工作中心：先削減超載部分（利用率高者優先），再從負荷最高的期間轉出
fn outsource(copy: &mut LoadSnapshot, work_center: &str, hours: Decimal) -> Decimal {
    let mut remaining = hours;
    let mut indices: Vec<usize> = copy
        .periods
        .iter()
        .enumerate()
        .filter(|(_, p)| p.work_center == work_center)
        .map(|(idx, _)| idx)
        .collect();
    indices.sort_by(|a, b| {
        let (pa, pb) = (&copy.periods[*a], &copy.periods[*b]);
        pb.utilization
            .cmp(&pa.utilization)
            .then(pa.period.start.cmp(&pb.period.start))
    });

    // 第一輪：只削減超過可用產能的部分
    for idx in &indices {
        if remaining <= Decimal::ZERO {
            break;
        }
        let period = &mut copy.periods[*idx];
        let take = period.shortfall().min(remaining);
        period.required_hours -= take;
        remaining -= take;
    }

    // 第二輪：從剩餘負荷最高的期間繼續轉出
    for idx in &indices {
        if remaining <= Decimal::ZERO {
            break;
        }
        let period = &mut copy.periods[*idx];
        let take = period.required_hours.min(remaining);
        period.required_hours -= take;
        remaining -= take;
    }

    hours - remaining
}
