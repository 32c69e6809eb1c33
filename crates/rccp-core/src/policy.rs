//! 計劃政策配置

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CapacityError, Result};

/// 利用率分類門檻（%，下界含）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationThresholds {
    /// 緊繃下界（預設 95）
    pub tight: Decimal,

    /// 中度超載下界（預設 100）
    pub overload: Decimal,

    /// 嚴重超載下界（預設 115）
    pub severe: Decimal,
}

impl Default for UtilizationThresholds {
    fn default() -> Self {
        Self {
            tight: Decimal::from(95),
            overload: Decimal::from(100),
            severe: Decimal::from(115),
        }
    }
}

impl UtilizationThresholds {
    /// 驗證門檻遞增
    pub fn validate(&self) -> Result<()> {
        if self.tight <= Decimal::ZERO || self.tight > self.overload || self.overload > self.severe {
            return Err(CapacityError::InvalidConfiguration(format!(
                "利用率門檻必須遞增: tight={} overload={} severe={}",
                self.tight, self.overload, self.severe
            )));
        }
        Ok(())
    }
}

/// 負荷平衡約束
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelingConstraints {
    /// 最大移動筆數
    pub max_moves: usize,

    /// 最大迭代次數（保證終止）
    pub max_iterations: usize,

    /// 單次移動最小工時
    pub min_move_hours: Decimal,
}

impl Default for LevelingConstraints {
    fn default() -> Self {
        Self {
            max_moves: 50,
            max_iterations: 500,
            min_move_hours: Decimal::new(5, 1),
        }
    }
}

impl LevelingConstraints {
    /// 建構器模式：設置最大移動筆數
    pub fn with_max_moves(mut self, max_moves: usize) -> Self {
        self.max_moves = max_moves;
        self
    }

    /// 建構器模式：設置最大迭代次數
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// 建構器模式：設置單次移動最小工時
    pub fn with_min_move_hours(mut self, hours: Decimal) -> Self {
        self.min_move_hours = hours;
        self
    }
}

/// 情境可行性成本門檻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityThresholds {
    /// 低於此成本且無新瓶頸 → 高可行性
    pub high_max_cost: Decimal,

    /// 低於此成本 → 中可行性
    pub medium_max_cost: Decimal,
}

impl Default for FeasibilityThresholds {
    fn default() -> Self {
        Self {
            high_max_cost: Decimal::from(50_000),
            medium_max_cost: Decimal::from(200_000),
        }
    }
}

/// 計劃政策
///
/// 同一次運算中所有工作中心套用同一份政策。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningPolicy {
    /// 利用率分類門檻
    pub thresholds: UtilizationThresholds,

    /// 加班上限（佔正常產能比例）
    pub max_overtime_fraction: Decimal,

    /// 加班費率加成（工作中心未設定加班費率時使用）
    pub overtime_premium: Decimal,

    /// 外包每小時費率
    pub outsourcing_rate: Decimal,

    /// 每台機台資本支出（瓶頸建議使用）
    pub machine_capital_cost: Decimal,

    /// 負荷平衡約束
    pub leveling: LevelingConstraints,

    /// 情境可行性門檻
    pub feasibility: FeasibilityThresholds,
}

impl Default for PlanningPolicy {
    fn default() -> Self {
        Self {
            thresholds: UtilizationThresholds::default(),
            max_overtime_fraction: Decimal::new(25, 2),
            overtime_premium: Decimal::new(15, 1),
            outsourcing_rate: Decimal::from(150),
            machine_capital_cost: Decimal::from(250_000),
            leveling: LevelingConstraints::default(),
            feasibility: FeasibilityThresholds::default(),
        }
    }
}

impl PlanningPolicy {
    /// 從 JSON 文件載入政策（未提供的欄位使用預設值）
    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)
            .map_err(|e| CapacityError::InvalidConfiguration(format!("政策解析失敗: {}", e)))?;
        policy.validate()?;
        Ok(policy)
    }

    /// 建構器模式：設置利用率門檻
    pub fn with_thresholds(mut self, thresholds: UtilizationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// 建構器模式：設置加班上限比例
    pub fn with_max_overtime_fraction(mut self, fraction: Decimal) -> Self {
        self.max_overtime_fraction = fraction;
        self
    }

    /// 建構器模式：設置加班費率加成
    pub fn with_overtime_premium(mut self, premium: Decimal) -> Self {
        self.overtime_premium = premium;
        self
    }

    /// 建構器模式：設置外包費率
    pub fn with_outsourcing_rate(mut self, rate: Decimal) -> Self {
        self.outsourcing_rate = rate;
        self
    }

    /// 建構器模式：設置機台資本支出
    pub fn with_machine_capital_cost(mut self, cost: Decimal) -> Self {
        self.machine_capital_cost = cost;
        self
    }

    /// 建構器模式：設置負荷平衡約束
    pub fn with_leveling(mut self, leveling: LevelingConstraints) -> Self {
        self.leveling = leveling;
        self
    }

    /// 建構器模式：設置可行性門檻
    pub fn with_feasibility(mut self, feasibility: FeasibilityThresholds) -> Self {
        self.feasibility = feasibility;
        self
    }

    /// 驗證政策
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        if self.max_overtime_fraction < Decimal::ZERO {
            return Err(CapacityError::InvalidConfiguration(
                "加班上限比例不可為負".to_string(),
            ));
        }
        if self.overtime_premium < Decimal::ONE {
            return Err(CapacityError::InvalidConfiguration(format!(
                "加班費率加成不可低於 1，實際 {}",
                self.overtime_premium
            )));
        }
        if self.outsourcing_rate < Decimal::ZERO || self.machine_capital_cost < Decimal::ZERO {
            return Err(CapacityError::InvalidConfiguration(
                "費率與資本支出不可為負".to_string(),
            ));
        }
        if self.leveling.max_iterations == 0 {
            return Err(CapacityError::InvalidConfiguration(
                "平衡迭代上限必須大於 0".to_string(),
            ));
        }
        if self.leveling.min_move_hours <= Decimal::ZERO {
            return Err(CapacityError::InvalidConfiguration(format!(
                "單次移動最小工時必須大於 0，實際 {}",
                self.leveling.min_move_hours
            )));
        }
        if self.feasibility.high_max_cost > self.feasibility.medium_max_cost {
            return Err(CapacityError::InvalidConfiguration(
                "高可行性成本門檻不可高於中可行性門檻".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PlanningPolicy::default();

        assert_eq!(policy.thresholds.tight, Decimal::from(95));
        assert_eq!(policy.thresholds.overload, Decimal::from(100));
        assert_eq!(policy.thresholds.severe, Decimal::from(115));
        assert_eq!(policy.max_overtime_fraction, Decimal::new(25, 2));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_builder() {
        let policy = PlanningPolicy::default()
            .with_max_overtime_fraction(Decimal::new(2, 1))
            .with_outsourcing_rate(Decimal::from(120))
            .with_leveling(LevelingConstraints::default().with_max_moves(5));

        assert_eq!(policy.max_overtime_fraction, Decimal::new(2, 1));
        assert_eq!(policy.outsourcing_rate, Decimal::from(120));
        assert_eq!(policy.leveling.max_moves, 5);
    }

    #[test]
    fn test_from_json_partial() {
        let policy = PlanningPolicy::from_json_str(
            r#"{ "max_overtime_fraction": "0.3", "thresholds": { "tight": "90", "overload": "100", "severe": "120" } }"#,
        )
        .unwrap();

        assert_eq!(policy.max_overtime_fraction, Decimal::new(3, 1));
        assert_eq!(policy.thresholds.tight, Decimal::from(90));
        // 未提供的欄位使用預設值
        assert_eq!(policy.overtime_premium, Decimal::new(15, 1));
    }

    #[test]
    fn test_reject_non_monotonic_thresholds() {
        let result = PlanningPolicy::from_json_str(
            r#"{ "thresholds": { "tight": "101", "overload": "100", "severe": "115" } }"#,
        );

        assert!(matches!(result, Err(CapacityError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_reject_non_positive_min_move_hours() {
        let zero = PlanningPolicy::default()
            .with_leveling(LevelingConstraints::default().with_min_move_hours(Decimal::ZERO));
        assert!(matches!(zero.validate(), Err(CapacityError::InvalidConfiguration(_))));

        let result = PlanningPolicy::from_json_str(
            r#"{ "leveling": { "max_moves": 10, "max_iterations": 100, "min_move_hours": "-1" } }"#,
        );
        assert!(matches!(result, Err(CapacityError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_reject_malformed_json() {
        assert!(PlanningPolicy::from_json_str("{ not json").is_err());
    }
}
