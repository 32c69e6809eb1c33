//! 工作中心配置模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CapacityError, Result};

/// 工作中心生命週期狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkCenterStatus {
    /// 啟用
    Active,
    /// 停用
    Inactive,
    /// 保養中
    Maintenance,
}

/// 人力配置（機台/人力拆分分析使用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborProfile {
    /// 每班可用操作員人數
    pub operators_available: u32,

    /// 人力效率（0 < 值 ≤ 1）
    pub labor_efficiency: Decimal,

    /// 每機台工時所需人力工時（預設 1）
    pub labor_hours_per_machine_hour: Decimal,
}

impl LaborProfile {
    /// 創建人力配置
    pub fn new(operators_available: u32, labor_efficiency: Decimal) -> Self {
        Self {
            operators_available,
            labor_efficiency,
            labor_hours_per_machine_hour: Decimal::ONE,
        }
    }

    /// 建構器模式：設置人機工時比
    pub fn with_labor_hours_per_machine_hour(mut self, ratio: Decimal) -> Self {
        self.labor_hours_per_machine_hour = ratio;
        self
    }
}

/// 工作中心
///
/// 可用產能永遠由配置推導，不獨立儲存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCenter {
    /// 工作中心代碼
    pub code: String,

    /// 名稱
    pub name: String,

    /// 部門
    pub department: String,

    /// 機台數（正整數）
    pub machines: u32,

    /// 每日班次（1-3）
    pub shifts_per_day: u32,

    /// 每班工時
    pub hours_per_shift: Decimal,

    /// 每週工作日（0 < 值 ≤ 7，可為小數）
    pub working_days_per_week: Decimal,

    /// 效率係數（0 < 值 ≤ 1）
    pub efficiency_factor: Decimal,

    /// 每小時成本
    pub cost_per_hour: Decimal,

    /// 加班每小時成本（未設定時依政策加成 cost_per_hour）
    pub overtime_cost_per_hour: Option<Decimal>,

    /// 生命週期狀態
    pub status: WorkCenterStatus,

    /// 人力配置
    pub labor: Option<LaborProfile>,
}

impl WorkCenter {
    /// 創建新的工作中心（單機、單班、每班 8 小時、每週 5 天、效率 1）
    pub fn new(code: String, name: String, department: String) -> Self {
        Self {
            code,
            name,
            department,
            machines: 1,
            shifts_per_day: 1,
            hours_per_shift: Decimal::from(8),
            working_days_per_week: Decimal::from(5),
            efficiency_factor: Decimal::ONE,
            cost_per_hour: Decimal::ZERO,
            overtime_cost_per_hour: None,
            status: WorkCenterStatus::Active,
            labor: None,
        }
    }

    /// 建構器模式：設置機台數
    pub fn with_machines(mut self, machines: u32) -> Self {
        self.machines = machines;
        self
    }

    /// 建構器模式：設置每日班次
    pub fn with_shifts_per_day(mut self, shifts: u32) -> Self {
        self.shifts_per_day = shifts;
        self
    }

    /// 建構器模式：設置每班工時
    pub fn with_hours_per_shift(mut self, hours: Decimal) -> Self {
        self.hours_per_shift = hours;
        self
    }

    /// 建構器模式：設置每週工作日
    pub fn with_working_days_per_week(mut self, days: Decimal) -> Self {
        self.working_days_per_week = days;
        self
    }

    /// 建構器模式：設置效率係數
    pub fn with_efficiency_factor(mut self, factor: Decimal) -> Self {
        self.efficiency_factor = factor;
        self
    }

    /// 建構器模式：設置每小時成本
    pub fn with_cost_per_hour(mut self, cost: Decimal) -> Self {
        self.cost_per_hour = cost;
        self
    }

    /// 建構器模式：設置加班每小時成本
    pub fn with_overtime_cost_per_hour(mut self, cost: Decimal) -> Self {
        self.overtime_cost_per_hour = Some(cost);
        self
    }

    /// 建構器模式：設置狀態
    pub fn with_status(mut self, status: WorkCenterStatus) -> Self {
        self.status = status;
        self
    }

    /// 建構器模式：設置人力配置
    pub fn with_labor(mut self, labor: LaborProfile) -> Self {
        self.labor = Some(labor);
        self
    }

    /// 是否為啟用狀態
    pub fn is_active(&self) -> bool {
        self.status == WorkCenterStatus::Active
    }

    /// 加班費率：優先使用工作中心設定，否則以政策加成
    pub fn overtime_rate(&self, premium: Decimal) -> Decimal {
        self.overtime_cost_per_hour
            .unwrap_or(self.cost_per_hour * premium)
    }

    /// 驗證產能配置
    ///
    /// 任何因子 ≤ 0 或效率 > 1 皆拒絕，不做截斷。
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| -> Result<()> {
            Err(CapacityError::InvalidConfiguration(format!(
                "{}: {}",
                self.code, reason
            )))
        };

        if self.code.trim().is_empty() {
            return Err(CapacityError::InvalidConfiguration(
                "工作中心代碼不可為空".to_string(),
            ));
        }
        if self.machines == 0 {
            return invalid("機台數必須為正整數".to_string());
        }
        if !(1..=3).contains(&self.shifts_per_day) {
            return invalid(format!("每日班次必須介於 1-3，實際 {}", self.shifts_per_day));
        }
        if self.hours_per_shift <= Decimal::ZERO {
            return invalid(format!("每班工時必須為正數，實際 {}", self.hours_per_shift));
        }
        if self.working_days_per_week <= Decimal::ZERO || self.working_days_per_week > Decimal::from(7) {
            return invalid(format!(
                "每週工作日必須介於 (0, 7]，實際 {}",
                self.working_days_per_week
            ));
        }
        if self.efficiency_factor <= Decimal::ZERO || self.efficiency_factor > Decimal::ONE {
            return invalid(format!(
                "效率係數必須介於 (0, 1]，實際 {}",
                self.efficiency_factor
            ));
        }
        if self.cost_per_hour < Decimal::ZERO {
            return invalid("每小時成本不可為負".to_string());
        }
        if let Some(rate) = self.overtime_cost_per_hour {
            if rate < Decimal::ZERO {
                return invalid("加班每小時成本不可為負".to_string());
            }
        }
        if let Some(labor) = &self.labor {
            if labor.labor_efficiency <= Decimal::ZERO || labor.labor_efficiency > Decimal::ONE {
                return invalid(format!(
                    "人力效率必須介於 (0, 1]，實際 {}",
                    labor.labor_efficiency
                ));
            }
            if labor.labor_hours_per_machine_hour <= Decimal::ZERO {
                return invalid("人機工時比必須為正數".to_string());
            }
        }

        Ok(())
    }
}
