//! Report output port trait.

use crate::domain::backtest::Simulation;
use crate::domain::error::RotatorError;
use crate::domain::sweep::SweepEntry;
use crate::domain::window::WindowResult;

/// Port for writing evaluation results.
pub trait ReportPort {
    fn write_windows(&self, results: &[WindowResult], output_path: &str)
    -> Result<(), RotatorError>;

    fn write_history(&self, simulation: &Simulation, output_path: &str)
    -> Result<(), RotatorError>;

    fn write_sweep(&self, entries: &[SweepEntry], output_path: &str) -> Result<(), RotatorError>;
}
