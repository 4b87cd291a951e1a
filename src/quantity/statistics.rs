//! An untyped key-value record updated once per step (§3 "Statistics").
//! Write-accessed by the solver and integrator, read-accessed by the log
//! writer and triggers.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticsId {
    RunTime,
    WallClock,
    Timestep,
    LimitingCriterion,
    NeighbourCountMin,
    NeighbourCountMax,
    NeighbourCountMean,
    ProgressFraction,
    CollisionCount,
    PhaseTimingSphEval,
    PhaseTimingGravityEval,
    PhaseTimingTreeBuild,
    StepIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Float(f64),
    Int(i64),
    Text(String),
    Duration(Duration),
}

impl StatValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            StatValue::Float(v) => Some(*v),
            StatValue::Int(v) => Some(*v as f64),
            StatValue::Duration(d) => Some(d.as_secs_f64()),
            StatValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Statistics {
    values: HashMap<StatisticsId, StatValue>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: StatisticsId, value: StatValue) {
        self.values.insert(id, value);
    }

    pub fn set_float(&mut self, id: StatisticsId, value: f64) {
        self.set(id, StatValue::Float(value));
    }

    pub fn set_int(&mut self, id: StatisticsId, value: i64) {
        self.set(id, StatValue::Int(value));
    }

    pub fn set_text(&mut self, id: StatisticsId, value: impl Into<String>) {
        self.set(id, StatValue::Text(value.into()));
    }

    pub fn set_duration(&mut self, id: StatisticsId, value: Duration) {
        self.set(id, StatValue::Duration(value));
    }

    pub fn get(&self, id: StatisticsId) -> Option<&StatValue> {
        self.values.get(&id)
    }

    pub fn get_float(&self, id: StatisticsId) -> Option<f64> {
        self.values.get(&id).and_then(StatValue::as_float)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StatisticsId, &StatValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_reads_typed_values() {
        let mut stats = Statistics::new();
        stats.set_float(StatisticsId::Timestep, 0.5);
        stats.set_int(StatisticsId::StepIndex, 3);
        assert_eq!(stats.get_float(StatisticsId::Timestep), Some(0.5));
        assert_eq!(stats.get_float(StatisticsId::StepIndex), Some(3.0));
        assert!(stats.get(StatisticsId::NeighbourCountMin).is_none());
    }
}
