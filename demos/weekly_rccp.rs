//! 週別粗略產能規劃示例
//!
//! 執行：`RUST_LOG=debug cargo run --example weekly_rccp`

use anyhow::Context;
use chrono::NaiveDate;
use rccp::PlanningStore;
use rccp_core::{
    CapacityChange, ChangeKind, DemandSource, LaborProfile, PlanningPeriod, PlanningPolicy,
    WorkCenter,
};
use rust_decimal::Decimal;

fn date(day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 11, day).context("無效日期")
}

fn main() -> anyhow::Result<()> {
    rccp::logging::init();

    println!("=== 週別粗略產能規劃示例 ===\n");

    let store = PlanningStore::new(PlanningPolicy::default())?;

    // 1. 工作中心
    store.upsert_work_center(
        WorkCenter::new("WC-CNC".to_string(), "CNC 加工".to_string(), "機加".to_string())
            .with_machines(4)
            .with_shifts_per_day(2)
            .with_hours_per_shift(Decimal::from(8))
            .with_working_days_per_week(Decimal::from(6))
            .with_efficiency_factor(Decimal::new(85, 2))
            .with_cost_per_hour(Decimal::from(80))
            .with_labor(LaborProfile::new(3, Decimal::new(9, 1))),
    )?;
    store.upsert_work_center(
        WorkCenter::new("WC-ASM".to_string(), "組裝線".to_string(), "組裝".to_string())
            .with_machines(2)
            .with_shifts_per_day(1)
            .with_hours_per_shift(Decimal::from(8))
            .with_working_days_per_week(Decimal::from(5))
            .with_efficiency_factor(Decimal::ONE),
    )?;

    // 2. 需求
    let demands = vec![
        DemandSource::new("WO-1001".to_string(), "WC-CNC".to_string(), Decimal::new(3494, 1), date(3)?, date(7)?)
            .as_firm(),
        DemandSource::new("WO-1002".to_string(), "WC-CNC".to_string(), Decimal::from(40), date(3)?, date(7)?)
            .with_due_date(date(16)?),
        DemandSource::new("WO-1003".to_string(), "WC-CNC".to_string(), Decimal::new(2853, 1), date(10)?, date(14)?)
            .as_firm(),
        DemandSource::new("WO-2001".to_string(), "WC-ASM".to_string(), Decimal::from(40), date(3)?, date(7)?),
    ];

    // 3. 整批重算
    let run = store.recompute(PlanningPeriod::weekly_horizon(date(3)?, 2), &demands)?;

    println!("負荷表:");
    for period in &run.snapshot.periods {
        println!(
            "  {} {} 可用 {:>7} 需求 {:>7} 利用率 {:>7}% {}",
            period.work_center,
            period.period_id(),
            period.available_hours.round_dp(1),
            period.required_hours.round_dp(1),
            period
                .utilization
                .map(|u| u.round_dp(1).to_string())
                .unwrap_or_else(|| "-".to_string()),
            period.status
        );
    }

    println!("\n瓶頸:");
    for bottleneck in &run.bottlenecks {
        println!(
            "  {} 嚴重度 {:?}，超載期間數 {}",
            bottleneck.work_center, bottleneck.severity, bottleneck.overloaded_periods
        );
        for action in &bottleneck.suggested_actions {
            println!("    - {:?}: {}", action.kind, action.description);
        }
    }

    // 4. 負荷平衡
    match store.propose_leveling() {
        Ok(mut plan) => {
            println!("\n平衡建議（分數 {}）:", plan.optimization_score);
            for line in &plan.improvements {
                println!("  - {}", line);
            }
            let applied = store.apply_leveling(&mut plan)?;
            println!("  已套用，快照版本 {}", applied.revision);
        }
        Err(e) => println!("\n無平衡建議: {}", e),
    }

    // 5. 加班
    if let Some(plan) = store.plan_overtime("WC-CNC", "P01")? {
        println!("\n加班計劃: {} 小時，成本 {}", plan.overtime_hours, plan.overtime_cost);
        store.approve_overtime(plan.id, "生管主管")?;
    }

    // 6. 假設情境
    let scenario = store.evaluate_scenario(
        &rccp_core::ScenarioRequest::new("CNC 加開夜班".to_string()).with_change(CapacityChange::new(
            "WC-CNC".to_string(),
            ChangeKind::AddShift {
                shifts: 1,
                labor_cost_per_shift: Decimal::from(12_000),
            },
        )),
    )?;
    println!(
        "\n情境「{}」: 每週增加 {} 小時，成本 {}，解除瓶頸 {}，可行性 {:?}",
        scenario.name,
        scenario.impact.capacity_increase,
        scenario.impact.cost_increase,
        scenario.impact.bottlenecks_resolved,
        scenario.feasibility
    );

    Ok(())
}
