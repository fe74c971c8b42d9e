//! Contribution heatmap over the last year of local activity.

use crate::progress_store::LocalActivityRecord;
use crate::types::DateKey;
use chrono::Months;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub date: DateKey,
    pub level: u8,
}

/// 0 means no activity that day; 1..=4 scale with the score.
pub fn intensity_for_score(score: i64) -> u8 {
    match score {
        s if s >= 100 => 4,
        s if s >= 80 => 3,
        s if s >= 50 => 2,
        _ => 1,
    }
}

/// One cell per day from a year before `today` through `today`, oldest first.
pub fn build_heatmap(records: &[LocalActivityRecord], today: &DateKey) -> Vec<HeatmapCell> {
    let levels: BTreeMap<DateKey, u8> = records
        .iter()
        .map(|record| (record.date, intensity_for_score(record.score)))
        .collect();

    let end = today.naive();
    let start = end.checked_sub_months(Months::new(12)).unwrap_or(end);
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(DateKey::from_naive)
        .map(|date| HeatmapCell {
            date,
            level: levels.get(&date).copied().unwrap_or(0),
        })
        .collect()
}
