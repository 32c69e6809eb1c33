//! 計劃狀態儲存（快照、版本、加班審批）

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rccp_calc::{
    BottleneckDetector, CapacityPlanner, MachineLaborSplitAnalyzer, PlanningRun, SplitAnalysis,
    UtilizationClassifier,
};
use rccp_core::{
    Bottleneck, CapacityError, DemandSource, LevelingPlan, LoadSnapshot, OvertimePlan,
    PlanningPeriod, PlanningPolicy, Scenario, ScenarioRequest, WorkCenter, WorkCenterStatus,
};
use rccp_optimizer::{OvertimePlanner, ResourceLevelingOptimizer, ScenarioEvaluator};
use uuid::Uuid;

use crate::capacity_cache::{CacheStats, CapacityCache};

struct StoreState {
    work_centers: BTreeMap<String, WorkCenter>,
    policy: PlanningPolicy,
    classifier: UtilizationClassifier,
    cache: CapacityCache,
    snapshot: Arc<LoadSnapshot>,
}

impl StoreState {
    /// 以新快照取代目前快照，版本遞增
    fn replace_snapshot(&mut self, mut snapshot: LoadSnapshot) -> Arc<LoadSnapshot> {
        snapshot.revision = self.snapshot.revision + 1;
        self.snapshot = Arc::new(snapshot);
        Arc::clone(&self.snapshot)
    }
}

/// 計劃狀態儲存
///
/// 工作中心配置與目前快照由 `RwLock` 保護，快照以 `Arc` 交出作為一致的時間點檢視；
/// 每次修改都會遞增快照版本。加班審批為單筆記錄的比較後交換。
///
/// 鎖定順序固定為先 `state` 後 `overtime`。
pub struct PlanningStore {
    state: RwLock<StoreState>,
    overtime: Mutex<BTreeMap<Uuid, OvertimePlan>>,
}

impl PlanningStore {
    /// 創建空的儲存
    pub fn new(policy: PlanningPolicy) -> rccp_core::Result<Self> {
        policy.validate()?;

        Ok(Self {
            state: RwLock::new(StoreState {
                work_centers: BTreeMap::new(),
                classifier: UtilizationClassifier::new(policy.thresholds.clone()),
                policy,
                cache: CapacityCache::new(),
                snapshot: Arc::new(LoadSnapshot::default()),
            }),
            overtime: Mutex::new(BTreeMap::new()),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn overtime(&self) -> MutexGuard<'_, BTreeMap<Uuid, OvertimePlan>> {
        self.overtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 新增或更新工作中心配置；無效配置直接拒絕
    pub fn upsert_work_center(&self, work_center: WorkCenter) -> rccp_core::Result<()> {
        work_center.validate()?;

        let mut state = self.write();
        state.cache.invalidate(&work_center.code);
        tracing::info!("更新工作中心配置: {}", work_center.code);
        state.work_centers.insert(work_center.code.clone(), work_center);
        Ok(())
    }

    /// 變更工作中心狀態（停用、保養、啟用）
    pub fn set_status(&self, code: &str, status: WorkCenterStatus) -> rccp_core::Result<()> {
        let mut state = self.write();
        let work_center = state
            .work_centers
            .get_mut(code)
            .ok_or_else(|| CapacityError::UnknownWorkCenter(code.to_string()))?;
        work_center.status = status;
        state.cache.invalidate(code);
        tracing::info!("工作中心 {} 狀態變更為 {:?}", code, status);
        Ok(())
    }

    /// 工作中心配置
    pub fn work_center(&self, code: &str) -> Option<WorkCenter> {
        self.read().work_centers.get(code).cloned()
    }

    pub fn policy(&self) -> PlanningPolicy {
        self.read().policy.clone()
    }

    /// 整批重算並取代目前快照
    ///
    /// 未被駁回的加班計劃會重新分配到新快照的對應期間。
    pub fn recompute(
        &self,
        horizon: Vec<PlanningPeriod>,
        demands: &[DemandSource],
    ) -> rccp_core::Result<PlanningRun> {
        let mut state = self.write();
        state.cache.retain_horizon(&horizon);

        let planner = CapacityPlanner::new(state.work_centers.values().cloned(), state.policy.clone())?;
        let mut run = planner.run_with(&state.cache, horizon, demands)?;

        let mut snapshot = run.snapshot.clone();
        for plan in self.overtime().values().filter(|p| p.allocates_hours()) {
            if snapshot.find(&plan.work_center, &plan.period_id).is_some() {
                OvertimePlanner::allocate(&mut snapshot, plan)?;
            }
        }

        let current = state.replace_snapshot(snapshot);
        run.snapshot = (*current).clone();

        tracing::info!("快照已更新至版本 {}", current.revision);
        Ok(run)
    }

    /// 產能快取統計
    pub fn cache_stats(&self) -> CacheStats {
        self.read().cache.stats()
    }

    /// 目前快照（一致的時間點檢視）
    pub fn snapshot(&self) -> Arc<LoadSnapshot> {
        Arc::clone(&self.read().snapshot)
    }

    /// 目前快照的瓶頸摘要
    pub fn bottlenecks(&self) -> Vec<Bottleneck> {
        let state = self.read();
        BottleneckDetector::new(&state.work_centers, &state.policy)
            .detect_bottlenecks(&state.snapshot.periods)
    }

    /// 依目前快照產生平衡計劃（不修改狀態）
    pub fn propose_leveling(&self) -> rccp_core::Result<LevelingPlan> {
        let (snapshot, classifier, constraints) = {
            let state = self.read();
            (
                Arc::clone(&state.snapshot),
                state.classifier.clone(),
                state.policy.leveling.clone(),
            )
        };

        ResourceLevelingOptimizer::new(&classifier, &constraints).propose_leveling(&snapshot)
    }

    /// 套用平衡計劃
    ///
    /// 在寫鎖下重新檢查計劃的基準版本；版本不符或任何移動不一致時整批失敗。
    pub fn apply_leveling(&self, plan: &mut LevelingPlan) -> rccp_core::Result<Arc<LoadSnapshot>> {
        let mut state = self.write();

        let applied = ResourceLevelingOptimizer::new(&state.classifier, &state.policy.leveling)
            .apply_leveling(plan, &state.snapshot)?;

        Ok(state.replace_snapshot(applied))
    }

    /// 為指定期間建立加班計劃並分配工時
    ///
    /// 期間沒有缺口時回傳 `None`。
    pub fn plan_overtime(
        &self,
        work_center: &str,
        period_id: &str,
    ) -> rccp_core::Result<Option<OvertimePlan>> {
        let mut state = self.write();

        let config = state
            .work_centers
            .get(work_center)
            .ok_or_else(|| CapacityError::UnknownWorkCenter(work_center.to_string()))?;
        let load = state.snapshot.find(work_center, period_id).ok_or_else(|| {
            CapacityError::NotFound(format!("期間負荷 {}/{}", work_center, period_id))
        })?;

        let Some(plan) = OvertimePlanner::new(&state.policy).plan_overtime(load, config)? else {
            return Ok(None);
        };

        let mut snapshot = (*state.snapshot).clone();
        OvertimePlanner::allocate(&mut snapshot, &plan)?;
        state.replace_snapshot(snapshot);

        self.overtime().insert(plan.id, plan.clone());
        tracing::info!(
            "建立加班計劃 {}：{} {} 加班 {} 小時",
            plan.id,
            plan.work_center,
            plan.period_id,
            plan.overtime_hours
        );

        Ok(Some(plan))
    }

    /// 核准加班計劃
    pub fn approve_overtime(&self, id: Uuid, approver: &str) -> rccp_core::Result<OvertimePlan> {
        let mut registry = self.overtime();
        let plan = registry
            .get_mut(&id)
            .ok_or_else(|| CapacityError::NotFound(format!("加班計劃 {}", id)))?;

        plan.approve(approver, Utc::now())?;
        tracing::info!("加班計劃 {} 已由 {} 核准", id, approver);
        Ok(plan.clone())
    }

    /// 駁回加班計劃並釋放其加班工時
    pub fn reject_overtime(&self, id: Uuid, approver: &str) -> rccp_core::Result<OvertimePlan> {
        let mut state = self.write();
        let mut registry = self.overtime();
        let plan = registry
            .get_mut(&id)
            .ok_or_else(|| CapacityError::NotFound(format!("加班計劃 {}", id)))?;

        plan.reject(approver, Utc::now())?;

        if state.snapshot.find(&plan.work_center, &plan.period_id).is_some() {
            let mut snapshot = (*state.snapshot).clone();
            OvertimePlanner::release(&mut snapshot, plan)?;
            state.replace_snapshot(snapshot);
        }

        tracing::info!("加班計劃 {} 已由 {} 駁回", id, approver);
        Ok(plan.clone())
    }

    /// 查詢加班計劃
    pub fn overtime_plan(&self, id: Uuid) -> Option<OvertimePlan> {
        self.overtime().get(&id).cloned()
    }

    /// 所有加班計劃
    pub fn overtime_plans(&self) -> Vec<OvertimePlan> {
        self.overtime().values().cloned().collect()
    }

    /// 以目前快照評估假設情境（不修改狀態）
    pub fn evaluate_scenario(&self, request: &ScenarioRequest) -> rccp_core::Result<Scenario> {
        let (snapshot, work_centers, policy) = {
            let state = self.read();
            (
                Arc::clone(&state.snapshot),
                state.work_centers.clone(),
                state.policy.clone(),
            )
        };

        ScenarioEvaluator::new(&work_centers, &policy).evaluate_scenario(request, &snapshot)
    }

    /// 機台/人力拆分分析
    pub fn split_analysis(&self, work_center: &str, period_id: &str) -> rccp_core::Result<SplitAnalysis> {
        let state = self.read();
        let config = state
            .work_centers
            .get(work_center)
            .ok_or_else(|| CapacityError::UnknownWorkCenter(work_center.to_string()))?;
        let load = state.snapshot.find(work_center, period_id).ok_or_else(|| {
            CapacityError::NotFound(format!("期間負荷 {}/{}", work_center, period_id))
        })?;

        MachineLaborSplitAnalyzer::split_analysis(config, load)
    }
}
