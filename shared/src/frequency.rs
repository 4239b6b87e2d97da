use serde::{Deserialize, Serialize};

use crate::SkillFrequency;

/// Optional inclusive bounds on how many users hold a skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyBounds {
    #[serde(default)]
    pub min_frequency: Option<i64>,
    #[serde(default)]
    pub max_frequency: Option<i64>,
}

impl FrequencyBounds {
    pub fn new(min_frequency: Option<i64>, max_frequency: Option<i64>) -> Self {
        Self { min_frequency, max_frequency }
    }

    pub fn contains(&self, frequency: i64) -> bool {
        self.min_frequency.map_or(true, |min| frequency >= min)
            && self.max_frequency.map_or(true, |max| frequency <= max)
    }

    pub fn retain(&self, rows: Vec<SkillFrequency>) -> Vec<SkillFrequency> {
        rows.into_iter().filter(|row| self.contains(row.frequency)).collect()
    }
}
