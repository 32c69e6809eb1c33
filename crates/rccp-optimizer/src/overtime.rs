//! 加班計劃

use std::collections::BTreeMap;

use rccp_calc::PlanningIssue;
use rccp_core::{
    ApprovalStatus, CapacityError, LoadPeriod, LoadSnapshot, LoadStatus, OvertimePlan,
    PlanningPolicy, WorkCenter,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// 加班計劃器
pub struct OvertimePlanner<'a> {
    policy: &'a PlanningPolicy,
}

impl<'a> OvertimePlanner<'a> {
    pub fn new(policy: &'a PlanningPolicy) -> Self {
        Self { policy }
    }

    /// 為仍有缺口的期間產生加班計劃
    ///
    /// 加班工時 = 扣除已分配加班後的缺口，受 `可用產能 × 加班上限比例` 限制；
    /// 超出上限的部分記錄為 `residual_shortfall`。無缺口時回傳 `None`。
    pub fn plan_overtime(
        &self,
        load: &LoadPeriod,
        work_center: &WorkCenter,
    ) -> rccp_core::Result<Option<OvertimePlan>> {
        if load.work_center != work_center.code {
            return Err(CapacityError::InvalidConfiguration(format!(
                "期間負荷屬於 {}，工作中心配置為 {}",
                load.work_center, work_center.code
            )));
        }
        if load.status == LoadStatus::InvalidCapacity {
            return Err(CapacityError::InvalidCapacity {
                work_center: load.work_center.clone(),
                period_id: load.period.id.clone(),
            });
        }

        let shortfall = load.residual_shortfall();
        if shortfall <= Decimal::ZERO {
            return Ok(None);
        }

        let cap = (load.available_hours * self.policy.max_overtime_fraction - load.overtime_hours)
            .max(Decimal::ZERO);
        let overtime_hours = shortfall.min(cap);
        let residual_shortfall = shortfall - overtime_hours;
        let rate = work_center.overtime_rate(self.policy.overtime_premium);

        let mut justification = format!(
            "{} {} 利用率 {}%，缺口 {} 小時，安排加班 {} 小時",
            load.work_center,
            load.period.id,
            load.utilization.unwrap_or(Decimal::ZERO).round_dp(1),
            shortfall.round_dp(1),
            overtime_hours.round_dp(1)
        );
        if residual_shortfall > Decimal::ZERO {
            justification.push_str(&format!(
                "；超過加班上限，仍有 {} 小時未解決",
                residual_shortfall.round_dp(1)
            ));
            tracing::warn!(
                "{} {} 加班需求 {} 小時超過上限 {} 小時",
                load.work_center,
                load.period.id,
                shortfall,
                cap
            );
        }

        Ok(Some(OvertimePlan {
            id: Uuid::new_v4(),
            work_center: load.work_center.clone(),
            period_id: load.period.id.clone(),
            regular_hours: load.available_hours,
            overtime_hours,
            overtime_cost: overtime_hours * rate,
            residual_shortfall,
            justification,
            status: ApprovalStatus::Planned,
            approver: None,
            decided_at: None,
        }))
    }

    /// 加班是否完整涵蓋缺口；被上限截斷時回傳 `OvertimeCapExceeded`
    pub fn check_cap(plan: &OvertimePlan) -> rccp_core::Result<()> {
        if plan.is_capped() {
            return Err(CapacityError::OvertimeCapExceeded {
                work_center: plan.work_center.clone(),
                period_id: plan.period_id.clone(),
                requested: plan.overtime_hours + plan.residual_shortfall,
                cap: plan.overtime_hours,
            });
        }
        Ok(())
    }

    /// 為快照中所有超載期間產生加班計劃
    ///
    /// 被上限截斷的計劃仍會產生，並附帶 `OvertimeCapExceeded` 問題。
    pub fn plan_for_snapshot(
        &self,
        snapshot: &LoadSnapshot,
        work_centers: &BTreeMap<String, WorkCenter>,
    ) -> (Vec<OvertimePlan>, Vec<PlanningIssue>) {
        let mut plans = Vec::new();
        let mut issues = Vec::new();

        for load in snapshot.periods.iter().filter(|p| p.status.needs_attention()) {
            let Some(work_center) = work_centers.get(&load.work_center) else {
                let error = CapacityError::UnknownWorkCenter(load.work_center.clone());
                issues.push(PlanningIssue::from_error(&load.work_center, &error));
                continue;
            };

            match self.plan_overtime(load, work_center) {
                Ok(Some(plan)) => {
                    if let Err(e) = Self::check_cap(&plan) {
                        issues.push(PlanningIssue::from_error(&plan.work_center, &e));
                    }
                    plans.push(plan);
                }
                Ok(None) => {}
                Err(e) => issues.push(PlanningIssue::from_error(&load.work_center, &e)),
            }
        }

        tracing::info!("產生加班計劃 {} 筆，問題 {} 筆", plans.len(), issues.len());
        (plans, issues)
    }

    /// 將計劃的加班工時分配到期間負荷
    pub fn allocate(snapshot: &mut LoadSnapshot, plan: &OvertimePlan) -> rccp_core::Result<()> {
        let load = snapshot
            .find_mut(&plan.work_center, &plan.period_id)
            .ok_or_else(|| not_found(plan))?;
        load.overtime_hours += plan.overtime_hours;
        Ok(())
    }

    /// 釋放計劃佔用的加班工時（駁回時）
    pub fn release(snapshot: &mut LoadSnapshot, plan: &OvertimePlan) -> rccp_core::Result<()> {
        let load = snapshot
            .find_mut(&plan.work_center, &plan.period_id)
            .ok_or_else(|| not_found(plan))?;
        load.overtime_hours = (load.overtime_hours - plan.overtime_hours).max(Decimal::ZERO);
        Ok(())
    }
}

fn not_found(plan: &OvertimePlan) -> CapacityError {
    CapacityError::NotFound(format!(
        "加班計劃 {} 的期間負荷 {}/{}",
        plan.id, plan.work_center, plan.period_id
    ))
}
