//! 利用率分類

use rccp_core::{LoadPeriod, LoadStatus, UtilizationThresholds};
use rust_decimal::Decimal;

/// 分類結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// 利用率（%）；可用產能為零時為 None
    pub utilization: Option<Decimal>,

    /// 差異（可用 − 需求）
    pub variance: Decimal,

    /// 狀態
    pub status: LoadStatus,
}

/// 利用率分類器
#[derive(Debug, Clone, Default)]
pub struct UtilizationClassifier {
    thresholds: UtilizationThresholds,
}

impl UtilizationClassifier {
    /// 以指定門檻創建分類器
    pub fn new(thresholds: UtilizationThresholds) -> Self {
        Self { thresholds }
    }

    /// 門檻
    pub fn thresholds(&self) -> &UtilizationThresholds {
        &self.thresholds
    }

    /// 分類
    ///
    /// `utilization = required / available × 100`；可用產能為零時標記為 `InvalidCapacity`。
    pub fn classify(&self, available: Decimal, required: Decimal) -> Classification {
        let variance = available - required;

        if available <= Decimal::ZERO {
            return Classification {
                utilization: None,
                variance,
                status: LoadStatus::InvalidCapacity,
            };
        }

        let utilization = required / available * Decimal::ONE_HUNDRED;
        Classification {
            utilization: Some(utilization),
            variance,
            status: self.status_for(utilization),
        }
    }

    /// 依利用率決定狀態（下界含）
    pub fn status_for(&self, utilization: Decimal) -> LoadStatus {
        if utilization >= self.thresholds.severe {
            LoadStatus::SevereOverload
        } else if utilization >= self.thresholds.overload {
            LoadStatus::ModerateOverload
        } else if utilization >= self.thresholds.tight {
            LoadStatus::Tight
        } else {
            LoadStatus::Ok
        }
    }

    /// 依目前的可用/需求工時重新分類期間負荷
    pub fn reclassify(&self, period: &mut LoadPeriod) {
        let classification = self.classify(period.available_hours, period.required_hours);
        period.utilization = classification.utilization;
        period.variance = classification.variance;
        period.status = classification.status;
    }
}
