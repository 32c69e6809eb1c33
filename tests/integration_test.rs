//! 集成測試

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use rccp_cache::PlanningStore;
use rccp_calc::{CapacityPlanner, IssueSeverity};
use rccp_core::*;
use rust_decimal::Decimal;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

fn horizon() -> Vec<PlanningPeriod> {
    PlanningPeriod::weekly_horizon(date(3), 2)
}

/// CNC：4 台 × 2 班 × 8 小時 × 6 天 × 0.85 = 326.4 小時/週
fn cnc() -> WorkCenter {
    WorkCenter::new("WC-CNC".to_string(), "CNC 加工".to_string(), "機加".to_string())
        .with_machines(4)
        .with_shifts_per_day(2)
        .with_hours_per_shift(Decimal::from(8))
        .with_working_days_per_week(Decimal::from(6))
        .with_efficiency_factor(Decimal::new(85, 2))
        .with_cost_per_hour(Decimal::from(80))
        .with_labor(LaborProfile::new(3, Decimal::new(9, 1)))
}

/// 組裝：2 台 × 1 班 × 8 小時 × 5 天 = 80 小時/週
fn assembly() -> WorkCenter {
    WorkCenter::new("WC-ASM".to_string(), "組裝線".to_string(), "組裝".to_string())
        .with_machines(2)
        .with_shifts_per_day(1)
        .with_hours_per_shift(Decimal::from(8))
        .with_working_days_per_week(Decimal::from(5))
        .with_efficiency_factor(Decimal::ONE)
        .with_cost_per_hour(Decimal::from(60))
}

fn demands() -> Vec<DemandSource> {
    vec![
        DemandSource::new("WO-1".to_string(), "WC-CNC".to_string(), Decimal::new(3494, 1), date(3), date(7))
            .as_firm(),
        DemandSource::new("WO-2".to_string(), "WC-CNC".to_string(), Decimal::from(40), date(3), date(7))
            .with_due_date(date(16)),
        DemandSource::new("WO-3".to_string(), "WC-CNC".to_string(), Decimal::new(2853, 1), date(10), date(14))
            .as_firm(),
        DemandSource::new("WO-4".to_string(), "WC-ASM".to_string(), Decimal::from(40), date(3), date(7)),
    ]
}

fn store() -> PlanningStore {
    let store = PlanningStore::new(PlanningPolicy::default()).unwrap();
    store.upsert_work_center(cnc()).unwrap();
    store.upsert_work_center(assembly()).unwrap();
    store.recompute(horizon(), &demands()).unwrap();
    store
}

#[test]
fn test_full_planning_run() {
    rccp::logging::init_test();

    let planner = CapacityPlanner::new(vec![cnc(), assembly()], PlanningPolicy::default()).unwrap();
    let run = planner.run(horizon(), &demands()).unwrap();

    // 2 個工作中心 × 2 週
    assert_eq!(run.snapshot.periods.len(), 4);
    assert!(run.issues.is_empty());

    let asm = run.snapshot.find("WC-ASM", "P01").unwrap();
    assert_eq!(asm.available_hours, Decimal::from(80));
    assert_eq!(asm.utilization, Some(Decimal::from(50)));
    assert_eq!(asm.status, LoadStatus::Ok);

    let cnc_p01 = run.snapshot.find("WC-CNC", "P01").unwrap();
    assert_eq!(cnc_p01.required_hours, Decimal::new(3894, 1));
    assert_eq!(cnc_p01.utilization.unwrap().round_dp(1), Decimal::new(1193, 1));
    assert_eq!(cnc_p01.status, LoadStatus::SevereOverload);

    let cnc_p02 = run.snapshot.find("WC-CNC", "P02").unwrap();
    assert_eq!(cnc_p02.utilization.unwrap().round_dp(1), Decimal::new(874, 1));

    // 一個瓶頸：CNC 單一期間嚴重超載
    assert_eq!(run.bottlenecks.len(), 1);
    assert_eq!(run.bottlenecks[0].work_center, "WC-CNC");
    assert_eq!(run.bottlenecks[0].severity, BottleneckSeverity::Critical);

    assert_eq!(run.summary.work_centers, 2);
    assert_eq!(run.summary.severe_overload_periods, 1);
    assert_eq!(run.summary.overloaded_periods(), 1);
    assert_eq!(run.snapshot.total_required_hours(), Decimal::new(7147, 1));
}

#[test]
fn test_recompute_is_idempotent() {
    let planner = CapacityPlanner::new(vec![cnc(), assembly()], PlanningPolicy::default()).unwrap();

    let first = planner.run(horizon(), &demands()).unwrap();
    let second = planner.run(horizon(), &demands()).unwrap();

    assert_eq!(first.snapshot, second.snapshot);
    assert_eq!(first.bottlenecks, second.bottlenecks);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn test_invalid_records_reported_not_fatal() {
    let mut demands = demands();
    demands.push(DemandSource::new(
        "WO-X".to_string(),
        "WC-NOPE".to_string(),
        Decimal::from(10),
        date(3),
        date(7),
    ));

    let planner = CapacityPlanner::new(vec![cnc(), assembly()], PlanningPolicy::default()).unwrap();
    let run = planner.run(horizon(), &demands).unwrap();

    assert!(run.has_errors());
    let errors: Vec<_> = run.issues_with(IssueSeverity::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].record_id, "WO-X");
    assert_eq!(errors[0].kind, "UnknownWorkCenter");

    // 其他需求仍正常計算
    assert_eq!(run.snapshot.periods.len(), 4);
    assert_eq!(run.snapshot.hours_for_demand("WO-X"), Decimal::ZERO);
}

#[test]
fn test_leveling_through_store() {
    let store = store();
    let before = store.snapshot();
    let total_before = before.total_required_hours();

    let mut plan = store.propose_leveling().unwrap();
    assert_eq!(plan.base_revision, before.revision);
    assert_eq!(plan.moves.len(), 1);
    assert_eq!(plan.moves[0].demand_id, "WO-2");
    assert_eq!(plan.moves[0].from_period, "P01");
    assert_eq!(plan.moves[0].to_period, "P02");
    assert_eq!(plan.moves[0].hours, Decimal::from(40));
    assert!(plan.peak_after < plan.peak_before);

    // 建議不修改狀態
    assert_eq!(store.snapshot().revision, before.revision);

    let applied = store.apply_leveling(&mut plan).unwrap();
    assert_eq!(applied.revision, before.revision + 1);
    assert_eq!(applied.total_required_hours(), total_before);
    assert_eq!(applied.find("WC-CNC", "P02").unwrap().required_hours, Decimal::new(3253, 1));
    assert!(applied.find("WC-CNC", "P02").unwrap().utilization.unwrap() < Decimal::ONE_HUNDRED);
}

#[test]
fn test_apply_is_all_or_nothing() {
    let store = store();
    let before = store.snapshot();

    let mut plan = store.propose_leveling().unwrap();
    // 追加一筆不一致的移動（超出需求在來源期間的工時）
    plan.moves.push(LoadMove {
        demand_id: "WO-4".to_string(),
        work_center: "WC-ASM".to_string(),
        from_period: "P01".to_string(),
        to_period: "P02".to_string(),
        hours: Decimal::from(400),
    });

    assert!(store.apply_leveling(&mut plan).is_err());
    assert!(!plan.is_applied());
    assert_eq!(*store.snapshot(), *before);
}

#[test]
fn test_concurrent_apply_only_one_wins() {
    let store = Arc::new(store());
    let plans = vec![store.propose_leveling().unwrap(), store.propose_leveling().unwrap()];
    let barrier = Arc::new(Barrier::new(plans.len()));

    let handles: Vec<_> = plans
        .into_iter()
        .map(|mut plan| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.apply_leveling(&mut plan).map(|s| s.revision)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(CapacityError::VersionConflict { expected: 1, actual: 2 }))));
    assert_eq!(store.snapshot().revision, 2);
}

#[test]
fn test_scenario_leaves_store_untouched() {
    let store = store();
    let before = store.snapshot();

    let request = ScenarioRequest::new("CNC 加開夜班".to_string()).with_change(CapacityChange::new(
        "WC-CNC".to_string(),
        ChangeKind::AddShift {
            shifts: 1,
            labor_cost_per_shift: Decimal::from(12_000),
        },
    ));
    let scenario = store.evaluate_scenario(&request).unwrap();

    assert_eq!(scenario.impact.capacity_increase, Decimal::new(1632, 1));
    assert_eq!(scenario.impact.cost_increase, Decimal::from(12_000));
    assert_eq!(scenario.impact.bottlenecks_resolved, 1);
    assert!(scenario.impact.new_bottlenecks.is_empty());
    assert_eq!(scenario.feasibility, Feasibility::High);

    assert_eq!(*store.snapshot(), *before);
    assert_eq!(store.work_center("WC-CNC").unwrap().shifts_per_day, 2);
    assert_eq!(store.bottlenecks().len(), 1);
}

#[test]
fn test_overtime_lifecycle_through_store() {
    let store = store();

    let plan = store.plan_overtime("WC-CNC", "P01").unwrap().unwrap();
    assert_eq!(plan.overtime_hours, Decimal::from(63));
    assert_eq!(plan.status, ApprovalStatus::Planned);
    assert!(!plan.is_capped());

    let approved = store.approve_overtime(plan.id, "生管主管").unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert!(approved.decided_at.is_some());

    // 核准後不可再駁回
    assert!(matches!(
        store.reject_overtime(plan.id, "生管主管"),
        Err(CapacityError::InvalidTransition { .. })
    ));

    // 重算後加班工時仍在
    store.recompute(horizon(), &demands()).unwrap();
    let period = store.snapshot().find("WC-CNC", "P01").cloned().unwrap();
    assert_eq!(period.overtime_hours, Decimal::from(63));
    assert_eq!(period.residual_shortfall(), Decimal::ZERO);

    assert!(matches!(
        store.approve_overtime(uuid::Uuid::new_v4(), "生管主管"),
        Err(CapacityError::NotFound(_))
    ));
}

#[test]
fn test_maintenance_removes_work_center_from_run() {
    let store = store();
    store.set_status("WC-ASM", WorkCenterStatus::Maintenance).unwrap();

    let run = store.recompute(horizon(), &demands()).unwrap();

    assert!(run.snapshot.periods_for("WC-ASM").next().is_none());
    assert!(run
        .issues_with(IssueSeverity::Warning)
        .any(|i| i.record_id == "WO-4" && i.kind == "InactiveWorkCenter"));
}

#[test]
fn test_snapshot_serializes_to_json() {
    let store = store();
    let json = store.snapshot().to_json().unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["revision"], 1);
    assert_eq!(parsed["periods"].as_array().unwrap().len(), 4);
    assert_eq!(parsed["periods"][2]["status"], "severe-overload");
}
