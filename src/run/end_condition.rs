//! §4.8: a run ends when a wallclock budget or a step count is reached,
//! whichever comes first; either alone is also valid (the unset side never
//! triggers).

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct EndCondition {
    pub max_wallclock: Option<Duration>,
    pub max_steps: Option<usize>,
}

impl EndCondition {
    pub fn steps(max_steps: usize) -> Self {
        EndCondition { max_wallclock: None, max_steps: Some(max_steps) }
    }

    pub fn wallclock(max_wallclock: Duration) -> Self {
        EndCondition { max_wallclock: Some(max_wallclock), max_steps: None }
    }

    pub fn is_met(&self, started_at: Instant, step_index: usize) -> bool {
        if let Some(max_steps) = self.max_steps {
            if step_index >= max_steps {
                return true;
            }
        }
        if let Some(max_wallclock) = self.max_wallclock {
            if started_at.elapsed() >= max_wallclock {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_limit_triggers_once_reached() {
        let condition = EndCondition::steps(3);
        assert!(!condition.is_met(Instant::now(), 2));
        assert!(condition.is_met(Instant::now(), 3));
    }

    #[test]
    fn wallclock_limit_triggers_after_elapsed_duration() {
        let condition = EndCondition::wallclock(Duration::from_millis(1));
        let start = Instant::now() - Duration::from_millis(5);
        assert!(condition.is_met(start, 0));
    }
}
