//! Command-line contract (§6): short/long option pairs for the parameters
//! a run is configured from. Grounded on the teacher's `clap` derive usage
//! in `command_line_options.rs`; the flag set itself is this spec's, not
//! the teacher's parameter-override syntax.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CommandLineOptions {
    /// Target body radius, in meters. Spec short form `-tr`; clap derive
    /// shorts are single-char, so this is long-form only here (the CLI
    /// surface itself is out of scope per §6, only its contract is not).
    #[clap(long = "target-radius")]
    pub target_radius: Option<f64>,

    /// Target body rotation period, in hours. Spec short form `-tp`.
    #[clap(long = "target-period")]
    pub target_period: Option<f64>,

    /// Impactor radius, in meters. Spec short form `-ir`.
    #[clap(long = "impactor-radius")]
    pub impactor_radius: Option<f64>,

    /// Impact energy as a fraction of the catastrophic disruption
    /// threshold (Q/Q*_D); requires `--target-radius` and `--impact-speed`.
    #[clap(short = 'q', long = "impact-energy")]
    pub impact_energy: Option<f64>,

    /// Impact speed, in km/s.
    #[clap(short = 'v', long = "impact-speed")]
    pub impact_speed: Option<f64>,

    /// Impact angle, in degrees (0 = head-on).
    #[clap(long = "impact-angle")]
    pub impact_angle: Option<f64>,

    /// Total particle count.
    #[clap(short = 'n', long = "particle-count")]
    pub particle_count: Option<usize>,

    /// Stabilization phase duration, in seconds.
    #[clap(long = "stabilization-time")]
    pub stabilization_time: Option<f64>,

    /// Fragmentation phase duration, in seconds.
    #[clap(long = "fragmentation-time")]
    pub fragmentation_time: Option<f64>,

    /// Reaccumulation phase duration, in seconds.
    #[clap(long = "reaccumulation-time")]
    pub reaccumulation_time: Option<f64>,

    /// Resume a run from an existing dump.
    #[clap(short = 'i', long = "resume-from")]
    pub resume_from: Option<PathBuf>,

    /// Output directory; config files and dumps are written here.
    #[clap(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Verbosity; repeat for more (`-V`, `-VV`, ...).
    #[clap(short = 'V', long = "verbose", parse(from_occurrences))]
    pub verbosity: u8,

    /// Worker thread count; omit for the process-wide default.
    #[clap(long = "num-worker-threads")]
    pub num_worker_threads: Option<usize>,
}

impl CommandLineOptions {
    /// Validates the cross-option constraint §6 names:
    /// `--impact-energy` requires both `--target-radius` and
    /// `--impact-speed`.
    pub fn validate(&self) -> Result<(), String> {
        if self.impact_energy.is_some() && (self.target_radius.is_none() || self.impact_speed.is_none()) {
            return Err("--impact-energy requires --target-radius and --impact-speed".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_energy_without_radius_and_speed_is_rejected() {
        let opts = CommandLineOptions {
            target_radius: None,
            target_period: None,
            impactor_radius: None,
            impact_energy: Some(1.5),
            impact_speed: None,
            impact_angle: None,
            particle_count: None,
            stabilization_time: None,
            fragmentation_time: None,
            reaccumulation_time: None,
            resume_from: None,
            output_dir: None,
            verbosity: 0,
            num_worker_threads: None,
        };
        assert!(opts.validate().is_err());
    }
}
