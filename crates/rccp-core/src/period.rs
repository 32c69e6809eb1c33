//! 計劃期間模型

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::{CapacityError, Result};

/// 計劃期間（時間桶）
///
/// 期間長度與工作日數由呼叫端提供，不假設為一週。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanningPeriod {
    /// 期間ID（如 2025-W45）
    pub id: String,

    /// 開始日期
    pub start: NaiveDate,

    /// 結束日期（含）
    pub end: NaiveDate,

    /// 期間內工作日數；未提供時依工作中心每週工作日按比例換算
    pub working_days: Option<Decimal>,
}

impl PlanningPeriod {
    /// 創建新的計劃期間
    pub fn new(id: String, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id,
            start,
            end,
            working_days: None,
        }
    }

    /// 建構器模式：設置期間工作日數
    pub fn with_working_days(mut self, days: Decimal) -> Self {
        self.working_days = Some(days);
        self
    }

    /// 依工作日曆建立期間（工作日數由日曆計算）
    pub fn from_calendar(
        id: String,
        start: NaiveDate,
        end: NaiveDate,
        calendar: &WorkCalendar,
    ) -> Self {
        let days = calendar.working_days_in(start, end);
        Self::new(id, start, end).with_working_days(Decimal::from(days))
    }

    /// 產生連續的週期間（每期 7 天）
    pub fn weekly_horizon(start: NaiveDate, weeks: u32) -> Vec<Self> {
        (0..weeks)
            .map(|i| {
                let period_start = start + Duration::weeks(i64::from(i));
                let period_end = period_start + Duration::days(6);
                Self::new(format!("P{:02}", i + 1), period_start, period_end)
            })
            .collect()
    }

    /// 期間日曆天數（含首尾）
    pub fn calendar_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// 期間工作日數
    ///
    /// 有明確工作日數時直接採用；否則以 `每週工作日 × 日曆天數 / 7` 換算。
    pub fn working_days_for(&self, working_days_per_week: Decimal) -> Decimal {
        match self.working_days {
            Some(days) => days,
            None => {
                let days = Decimal::from(self.calendar_days().max(0));
                if days == Decimal::from(7) {
                    working_days_per_week
                } else {
                    working_days_per_week * days / Decimal::from(7)
                }
            }
        }
    }

    /// 是否包含指定日期
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 與日期區間（含首尾）重疊的天數
    pub fn overlap_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let from = self.start.max(start);
        let to = self.end.min(end);
        if to < from {
            0
        } else {
            (to - from).num_days() + 1
        }
    }

    /// 驗證期間
    pub fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(CapacityError::InvalidConfiguration(format!(
                "期間 {} 結束日期 {} 早於開始日期 {}",
                self.id, self.end, self.start
            )));
        }
        if let Some(days) = self.working_days {
            if days < Decimal::ZERO {
                return Err(CapacityError::InvalidConfiguration(format!(
                    "期間 {} 工作日數不可為負",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekly_horizon() {
        let horizon = PlanningPeriod::weekly_horizon(date(2025, 11, 3), 4);

        assert_eq!(horizon.len(), 4);
        assert_eq!(horizon[0].id, "P01");
        assert_eq!(horizon[0].end, date(2025, 11, 9));
        assert_eq!(horizon[3].start, date(2025, 11, 24));
        assert!(horizon.iter().all(|p| p.calendar_days() == 7));
    }

    #[test]
    fn test_working_days_scaling() {
        let week = PlanningPeriod::new("W".to_string(), date(2025, 11, 3), date(2025, 11, 9));
        assert_eq!(week.working_days_for(Decimal::from(6)), Decimal::from(6));

        let fortnight =
            PlanningPeriod::new("F".to_string(), date(2025, 11, 3), date(2025, 11, 16));
        assert_eq!(fortnight.working_days_for(Decimal::from(5)), Decimal::from(10));

        let explicit = week.clone().with_working_days(Decimal::from(4));
        assert_eq!(explicit.working_days_for(Decimal::from(6)), Decimal::from(4));
    }

    #[test]
    fn test_from_calendar() {
        let calendar = WorkCalendar::new("TEST".to_string());
        let period = PlanningPeriod::from_calendar(
            "W45".to_string(),
            date(2025, 11, 3),
            date(2025, 11, 9),
            &calendar,
        );

        assert_eq!(period.working_days, Some(Decimal::from(5)));
    }

    #[test]
    fn test_overlap_days() {
        let period = PlanningPeriod::new("W".to_string(), date(2025, 11, 3), date(2025, 11, 9));

        assert_eq!(period.overlap_days(date(2025, 11, 1), date(2025, 11, 4)), 2);
        assert_eq!(period.overlap_days(date(2025, 11, 5), date(2025, 11, 5)), 1);
        assert_eq!(period.overlap_days(date(2025, 11, 10), date(2025, 11, 12)), 0);
        assert_eq!(period.overlap_days(date(2025, 10, 1), date(2025, 12, 1)), 7);
    }

    #[test]
    fn test_invalid_period() {
        let period = PlanningPeriod::new("BAD".to_string(), date(2025, 11, 9), date(2025, 11, 3));
        assert!(period.validate().is_err());
    }
}
