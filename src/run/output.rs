//! Output cadence (§4.8): pluggable linear, logarithmic, or explicit-list
//! scheduling of dump times. Grounded on the teacher's
//! `io/output/timer.rs::Timer` (`next_output_time`, `snapshot_num`,
//! advanced by an `update_system` call after each dump) generalized from a
//! single fixed interval to the three cadences §4.8 names.

#[derive(Debug, Clone)]
pub enum OutputCadence {
    /// A dump every `delta` of simulation time.
    Linear { delta: f64 },
    /// Doubling intervals: first dump at `first`, then `first*factor`,
    /// `first*factor^2`, ...
    Logarithmic { first: f64, factor: f64 },
    /// Dump exactly at these times, in ascending order.
    Explicit { times: Vec<f64> },
}

/// Tracks the next due time and a zero-padded snapshot index, mirroring
/// the teacher's `Timer` resource.
#[derive(Debug, Clone)]
pub struct OutputTimer {
    cadence: OutputCadence,
    next_output_time: f64,
    snapshot_num: usize,
    interval: f64,
}

impl OutputTimer {
    pub fn new(cadence: OutputCadence, t_start: f64) -> Self {
        let (next_output_time, interval) = match &cadence {
            OutputCadence::Linear { delta } => (t_start, *delta),
            OutputCadence::Logarithmic { first, .. } => (t_start + first, *first),
            OutputCadence::Explicit { times } => (times.first().copied().unwrap_or(f64::INFINITY), 0.0),
        };
        OutputTimer { cadence, next_output_time, snapshot_num: 0, interval }
    }

    pub fn is_due(&self, t: f64) -> bool {
        t >= self.next_output_time
    }

    pub fn snapshot_num(&self) -> usize {
        self.snapshot_num
    }

    /// Advances past the dump just taken, the way the teacher's
    /// `update_system` bumps `snapshot_num` and `next_output_time` together.
    pub fn advance(&mut self) {
        self.snapshot_num += 1;
        match &mut self.cadence {
            OutputCadence::Linear { delta } => self.next_output_time += *delta,
            OutputCadence::Logarithmic { factor, .. } => {
                self.interval *= *factor;
                self.next_output_time += self.interval;
            }
            OutputCadence::Explicit { times } => {
                self.next_output_time = times.get(self.snapshot_num).copied().unwrap_or(f64::INFINITY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_cadence_fires_every_fixed_delta() {
        let mut timer = OutputTimer::new(OutputCadence::Linear { delta: 1.0 }, 0.0);
        assert!(timer.is_due(0.0));
        timer.advance();
        assert!(!timer.is_due(0.5));
        assert!(timer.is_due(1.0));
    }

    #[test]
    fn logarithmic_cadence_doubles_the_interval() {
        let mut timer = OutputTimer::new(OutputCadence::Logarithmic { first: 1.0, factor: 2.0 }, 0.0);
        assert!((timer.next_output_time - 1.0).abs() < 1e-12);
        timer.advance();
        assert!((timer.next_output_time - 3.0).abs() < 1e-12);
        timer.advance();
        assert!((timer.next_output_time - 7.0).abs() < 1e-12);
    }

    #[test]
    fn explicit_cadence_exhausts_after_its_list() {
        let mut timer = OutputTimer::new(OutputCadence::Explicit { times: vec![0.0, 2.0] }, 0.0);
        assert!(timer.is_due(0.0));
        timer.advance();
        assert!(timer.is_due(2.0));
        timer.advance();
        assert!(!timer.is_due(1000.0));
    }
}
