//! 負荷平衡（資源平準化）

use std::collections::{BTreeMap, BTreeSet};

use rccp_calc::UtilizationClassifier;
use rccp_core::{
    CapacityError, LevelingConstraints, LevelingPlan, LevelingPlanState, LoadMove, LoadPeriod,
    LoadSnapshot, LoadStatus,
};
use rust_decimal::Decimal;

/// 資源平準化優化器
///
/// `propose_leveling` 與 `apply_leveling` 都不修改傳入的快照，
/// 套用成功時回傳新的快照。
pub struct ResourceLevelingOptimizer<'a> {
    classifier: &'a UtilizationClassifier,
    constraints: &'a LevelingConstraints,
}

impl<'a> ResourceLevelingOptimizer<'a> {
    pub fn new(classifier: &'a UtilizationClassifier, constraints: &'a LevelingConstraints) -> Self {
        Self {
            classifier,
            constraints,
        }
    }

    /// 為所有有超載期間的工作中心產生平衡計劃
    pub fn propose_leveling(&self, snapshot: &LoadSnapshot) -> rccp_core::Result<LevelingPlan> {
        let targets: Vec<String> = snapshot
            .work_centers()
            .into_iter()
            .filter(|wc| snapshot.periods_for(wc).any(LoadPeriod::is_overloaded))
            .collect();

        self.propose_for(snapshot, &targets)
    }

    /// 為指定工作中心產生平衡計劃
    ///
    /// 反覆選取利用率最高的超載期間，移出交期最寬裕的可移動需求，
    /// 放入負荷最低且符合日期窗的期間，直到沒有可改善的移動或預算用盡。
    pub fn propose_for(
        &self,
        snapshot: &LoadSnapshot,
        work_centers: &[String],
    ) -> rccp_core::Result<LevelingPlan> {
        tracing::info!(
            "開始負荷平衡：工作中心 {} 個，快照版本 {}",
            work_centers.len(),
            snapshot.revision
        );

        let mut working = snapshot.clone();
        let mut moves: Vec<LoadMove> = Vec::new();
        let mut iterations = 0usize;

        for work_center in work_centers {
            let Some(pre_max) = snapshot.peak_utilization(Some(work_center.as_str())) else {
                continue;
            };
            let mut exhausted: BTreeSet<String> = BTreeSet::new();

            loop {
                if iterations >= self.constraints.max_iterations {
                    tracing::warn!("負荷平衡達到迭代上限 {}", self.constraints.max_iterations);
                    break;
                }
                if moves.len() >= self.constraints.max_moves {
                    tracing::debug!("負荷平衡達到移動筆數上限 {}", self.constraints.max_moves);
                    break;
                }
                iterations += 1;

                let Some(source_id) = Self::most_overloaded(&working, work_center, &exhausted) else {
                    break;
                };

                match self.best_move(&working, work_center, &source_id, pre_max) {
                    Some(found) => {
                        tracing::debug!(
                            "移動 {} 的 {} 小時：{} → {}",
                            found.demand_id,
                            found.hours,
                            found.from_period,
                            found.to_period
                        );
                        self.move_hours(&mut working, &found)?;
                        merge_move(&mut moves, found);
                    }
                    None => {
                        exhausted.insert(source_id);
                    }
                }
            }
        }

        if moves.is_empty() {
            let reason = format!("工作中心 {} 沒有可改善峰值的移動", work_centers.join(", "));
            tracing::warn!("{}", reason);
            return Err(CapacityError::Infeasible(reason));
        }

        let mut plan = LevelingPlan::proposed(snapshot.revision, moves);
        Self::score(&mut plan, snapshot, &working, work_centers);

        tracing::info!(
            "負荷平衡完成：移動 {} 筆，共 {} 小時，峰值 {}% → {}%",
            plan.moves.len(),
            plan.total_hours_moved(),
            plan.peak_before.round_dp(2),
            plan.peak_after.round_dp(2)
        );

        Ok(plan)
    }

    /// 套用平衡計劃
    ///
    /// 全部移動成功才回傳新快照（版本遞增）；任何一筆不一致即整批失敗，
    /// 傳入的快照保持不變。
    pub fn apply_leveling(
        &self,
        plan: &mut LevelingPlan,
        snapshot: &LoadSnapshot,
    ) -> rccp_core::Result<LoadSnapshot> {
        if plan.state != LevelingPlanState::Proposed {
            return Err(CapacityError::InvalidTransition {
                from: "applied".to_string(),
                to: "applied".to_string(),
            });
        }
        if plan.base_revision != snapshot.revision {
            tracing::warn!(
                "平衡計劃 {} 版本衝突：計劃 {}，快照 {}",
                plan.id,
                plan.base_revision,
                snapshot.revision
            );
            return Err(CapacityError::VersionConflict {
                expected: plan.base_revision,
                actual: snapshot.revision,
            });
        }

        let mut working = snapshot.clone();
        let mut touched: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for load_move in &plan.moves {
            self.validate_move(&working, load_move)?;
            self.move_hours(&mut working, load_move)?;
            touched
                .entry(load_move.work_center.clone())
                .or_default()
                .insert(load_move.to_period.clone());
        }

        // 需求工時守恆
        let demand_ids: BTreeSet<&str> = plan.moves.iter().map(|m| m.demand_id.as_str()).collect();
        for demand_id in demand_ids {
            let before = snapshot.hours_for_demand(demand_id);
            let after = working.hours_for_demand(demand_id);
            if before != after {
                return Err(CapacityError::ConstraintViolation(format!(
                    "需求 {} 工時不守恆：{} → {}",
                    demand_id, before, after
                )));
            }
        }

        // 目的期間不得超過移動前的峰值，也不得由未超載變為超載
        for (work_center, destinations) in &touched {
            let pre_max = snapshot
                .peak_utilization(Some(work_center.as_str()))
                .unwrap_or(Decimal::ZERO);
            for period_id in destinations {
                let moved = working.find(work_center, period_id);
                let was_overloaded = snapshot
                    .find(work_center, period_id)
                    .is_some_and(LoadPeriod::is_overloaded);
                if !was_overloaded && moved.is_some_and(LoadPeriod::is_overloaded) {
                    return Err(CapacityError::ConstraintViolation(format!(
                        "{} {} 移動後成為超載期間",
                        work_center, period_id
                    )));
                }

                let utilization = moved.and_then(|p| p.utilization).unwrap_or(Decimal::ZERO);
                if utilization > pre_max {
                    return Err(CapacityError::ConstraintViolation(format!(
                        "{} {} 移動後利用率 {}% 超過移動前峰值 {}%",
                        work_center,
                        period_id,
                        utilization.round_dp(2),
                        pre_max.round_dp(2)
                    )));
                }
            }
        }

        working.revision = snapshot.revision + 1;
        plan.state = LevelingPlanState::Applied;

        tracing::info!(
            "平衡計劃 {} 已套用，快照版本 {} → {}",
            plan.id,
            snapshot.revision,
            working.revision
        );

        Ok(working)
    }

    /// 尚未耗盡的最高利用率超載期間
    fn most_overloaded(
        snapshot: &LoadSnapshot,
        work_center: &str,
        exhausted: &BTreeSet<String>,
    ) -> Option<String> {
        snapshot
            .periods_for(work_center)
            .filter(|p| p.is_overloaded() && !exhausted.contains(&p.period.id))
            .max_by(|a, b| {
                a.utilization
                    .cmp(&b.utilization)
                    .then(b.period.start.cmp(&a.period.start))
            })
            .map(|p| p.period.id.clone())
    }

    /// 依交期寬裕度挑選需求，放入負荷最低的可行期間
    fn best_move(
        &self,
        snapshot: &LoadSnapshot,
        work_center: &str,
        source_id: &str,
        pre_max: Decimal,
    ) -> Option<LoadMove> {
        let source = snapshot.find(work_center, source_id)?;
        let threshold = self.classifier.thresholds().overload;
        let tight = self.classifier.thresholds().tight;
        let excess = source.required_hours - source.available_hours * threshold / Decimal::ONE_HUNDRED;
        if excess <= Decimal::ZERO {
            return None;
        }

        let mut candidates: Vec<(&str, Decimal, i64)> = source
            .demand_sources
            .iter()
            .filter_map(|(id, hours)| {
                let demand = snapshot.demands.get(id)?;
                if !demand.movable || *hours < self.constraints.min_move_hours {
                    return None;
                }
                let slack = demand.slack_days(source.period.start).unwrap_or(i64::MAX);
                Some((id.as_str(), *hours, slack))
            })
            .collect();
        candidates.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(b.0)));

        for (demand_id, contribution, _) in candidates {
            let demand = snapshot.demands.get(demand_id)?;

            let mut destinations: Vec<&LoadPeriod> = snapshot
                .periods_for(work_center)
                .filter(|p| p.period.id != source_id)
                .filter(|p| p.utilization.is_some())
                .filter(|p| demand.allows_period(p.period.start, p.period.end))
                .collect();
            destinations.sort_by(|a, b| {
                a.utilization
                    .cmp(&b.utilization)
                    .then(a.period.start.cmp(&b.period.start))
            });

            for destination in destinations {
                if destination.is_overloaded() {
                    continue;
                }

                let mut amount = contribution
                    .min(destination.headroom_to(threshold))
                    .min(excess);
                // 填到超載下界即成為超載期間，退回緊繃下界
                if self.lands_overloaded(destination, amount) {
                    amount = amount.min(destination.headroom_to(tight));
                }
                if amount <= Decimal::ZERO
                    || amount < self.constraints.min_move_hours
                    || self.lands_overloaded(destination, amount)
                {
                    continue;
                }

                let after = (destination.required_hours + amount) / destination.available_hours
                    * Decimal::ONE_HUNDRED;
                if after > pre_max {
                    continue;
                }

                return Some(LoadMove {
                    demand_id: demand_id.to_string(),
                    work_center: work_center.to_string(),
                    from_period: source_id.to_string(),
                    to_period: destination.period.id.clone(),
                    hours: amount,
                });
            }
        }

        None
    }

    /// 目的期間加入指定工時後是否落入超載
    fn lands_overloaded(&self, destination: &LoadPeriod, hours: Decimal) -> bool {
        self.classifier
            .status_for(
                (destination.required_hours + hours) / destination.available_hours
                    * Decimal::ONE_HUNDRED,
            )
            .is_overloaded()
    }

    /// 套用前檢查單筆移動：需求存在且可移動、來源工時足夠、目的期間在日期窗內
    fn validate_move(&self, snapshot: &LoadSnapshot, load_move: &LoadMove) -> rccp_core::Result<()> {
        let violation = |reason: String| -> rccp_core::Result<()> {
            Err(CapacityError::ConstraintViolation(format!(
                "{} {} → {}: {}",
                load_move.demand_id, load_move.from_period, load_move.to_period, reason
            )))
        };

        if load_move.hours <= Decimal::ZERO {
            return violation("移動工時必須為正數".to_string());
        }
        if load_move.from_period == load_move.to_period {
            return violation("來源與目的期間相同".to_string());
        }

        let Some(demand) = snapshot.demands.get(&load_move.demand_id) else {
            return violation("需求不存在".to_string());
        };
        if !demand.movable {
            return violation("需求為固定排程，不可移動".to_string());
        }
        if demand.work_center != load_move.work_center {
            return violation(format!("需求屬於工作中心 {}", demand.work_center));
        }

        let Some(source) = snapshot.find(&load_move.work_center, &load_move.from_period) else {
            return violation("來源期間不存在".to_string());
        };
        let contribution = source
            .demand_sources
            .get(&load_move.demand_id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if contribution < load_move.hours {
            return violation(format!(
                "來源期間只有 {} 小時，無法移出 {} 小時",
                contribution, load_move.hours
            ));
        }

        let Some(destination) = snapshot.find(&load_move.work_center, &load_move.to_period) else {
            return violation("目的期間不存在".to_string());
        };
        if destination.status == LoadStatus::InvalidCapacity {
            return violation("目的期間可用產能為零".to_string());
        }
        if !demand.allows_period(destination.period.start, destination.period.end) {
            return violation("目的期間超出需求的最早開工日或交期".to_string());
        }

        Ok(())
    }

    /// 在快照上執行單筆移動並重新分類兩端期間
    fn move_hours(&self, snapshot: &mut LoadSnapshot, load_move: &LoadMove) -> rccp_core::Result<()> {
        let missing = |period_id: &str| {
            CapacityError::NotFound(format!("期間負荷 {}/{}", load_move.work_center, period_id))
        };

        let source = snapshot
            .find_mut(&load_move.work_center, &load_move.from_period)
            .ok_or_else(|| missing(&load_move.from_period))?;
        let remaining = source
            .demand_sources
            .get(&load_move.demand_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
            - load_move.hours;
        if remaining > Decimal::ZERO {
            source
                .demand_sources
                .insert(load_move.demand_id.clone(), remaining);
        } else {
            source.demand_sources.remove(&load_move.demand_id);
        }
        source.required_hours -= load_move.hours;
        self.classifier.reclassify(source);

        let destination = snapshot
            .find_mut(&load_move.work_center, &load_move.to_period)
            .ok_or_else(|| missing(&load_move.to_period))?;
        *destination
            .demand_sources
            .entry(load_move.demand_id.clone())
            .or_insert(Decimal::ZERO) += load_move.hours;
        destination.required_hours += load_move.hours;
        self.classifier.reclassify(destination);

        Ok(())
    }

    /// 計算優化分數與改善說明
    fn score(plan: &mut LevelingPlan, before: &LoadSnapshot, after: &LoadSnapshot, work_centers: &[String]) {
        let scoped = |snapshot: &LoadSnapshot| -> Vec<LoadPeriod> {
            snapshot
                .periods
                .iter()
                .filter(|p| work_centers.contains(&p.work_center))
                .cloned()
                .collect()
        };
        let before_periods = scoped(before);
        let after_periods = scoped(after);

        let peak = |periods: &[LoadPeriod]| {
            periods
                .iter()
                .filter_map(|p| p.utilization)
                .max()
                .unwrap_or(Decimal::ZERO)
        };
        let severe = |periods: &[LoadPeriod]| {
            periods
                .iter()
                .filter(|p| p.status == LoadStatus::SevereOverload)
                .count()
        };
        let overloaded = |periods: &[LoadPeriod]| periods.iter().filter(|p| p.is_overloaded()).count();

        plan.peak_before = peak(&before_periods);
        plan.peak_after = peak(&after_periods);
        if plan.peak_before > Decimal::ZERO {
            plan.optimization_score = ((plan.peak_before - plan.peak_after) / plan.peak_before
                * Decimal::ONE_HUNDRED)
                .round_dp(2);
        }

        plan.improvements.push(format!(
            "峰值利用率 {}% → {}%",
            plan.peak_before.round_dp(1),
            plan.peak_after.round_dp(1)
        ));

        let (severe_before, severe_after) = (severe(&before_periods), severe(&after_periods));
        if severe_after < severe_before {
            plan.improvements.push(format!(
                "嚴重超載期間 {} → {}",
                severe_before, severe_after
            ));
        }

        let (overloaded_before, overloaded_after) =
            (overloaded(&before_periods), overloaded(&after_periods));
        if overloaded_after < overloaded_before {
            plan.improvements.push(format!(
                "超載期間 {} → {}",
                overloaded_before, overloaded_after
            ));
        }

        plan.improvements.push(format!(
            "負荷變異 {} → {}",
            utilization_variance(&before_periods).round_dp(1),
            utilization_variance(&after_periods).round_dp(1)
        ));
        plan.improvements.push(format!(
            "移動 {} 筆，共 {} 小時",
            plan.moves.len(),
            plan.total_hours_moved().round_dp(1)
        ));
    }
}

/// 同一需求、同一來源與目的期間的移動合併為一筆
fn merge_move(moves: &mut Vec<LoadMove>, load_move: LoadMove) {
    match moves.iter_mut().find(|m| {
        m.demand_id == load_move.demand_id
            && m.work_center == load_move.work_center
            && m.from_period == load_move.from_period
            && m.to_period == load_move.to_period
    }) {
        Some(existing) => existing.hours += load_move.hours,
        None => moves.push(load_move),
    }
}

/// 利用率母體變異數
fn utilization_variance(periods: &[LoadPeriod]) -> Decimal {
    let values: Vec<Decimal> = periods.iter().filter_map(|p| p.utilization).collect();
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let n = Decimal::from(values.len());
    let mean = values.iter().sum::<Decimal>() / n;
    values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / n
}
