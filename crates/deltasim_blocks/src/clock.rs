//! Free-running clock generator.

use deltasim_common::Frequency;
use deltasim_kernel::{Block, Process, Scope, SignalId, SimError, UsageError, Wait};

/// Timing of a generated clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    /// Time between toggles in femtoseconds.
    pub half_period_fs: u64,
    /// Full periods to generate; `None` runs forever.
    pub cycles: Option<u64>,
}

impl ClockConfig {
    /// An unbounded clock toggling every `half_period_fs`.
    pub fn new(half_period_fs: u64) -> Self {
        Self {
            half_period_fs,
            cycles: None,
        }
    }

    /// An unbounded clock at `freq`, or `None` if its period does not split
    /// into two whole femtosecond halves.
    pub fn from_frequency(freq: Frequency) -> Option<Self> {
        freq.half_period_fs().map(Self::new)
    }

    /// Stops the clock after `cycles` full periods.
    pub fn cycles(mut self, cycles: u64) -> Self {
        self.cycles = Some(cycles);
        self
    }
}

/// Drives `clk` with a square wave.
///
/// The first toggle happens at the current time, so a clock starting low
/// produces its first rising edge immediately. A bounded clock finishes one
/// half period after its last falling edge.
pub fn clock(scope: &mut Scope<'_>, clk: SignalId, config: ClockConfig) -> Result<Block, SimError> {
    if config.half_period_fs == 0 {
        return Err(UsageError::InvalidParameter {
            block: scope.path().to_string(),
            name: "half_period_fs",
            reason: "must be non-zero".to_string(),
        }
        .into());
    }

    let half = config.half_period_fs;
    let limit = config.cycles.map(|c| c.saturating_mul(2));
    let mut toggles = 0u64;

    let mut block = Block::new(scope, "clock");
    block.add(
        Process::instance("driver", move |ctx| {
            if limit.is_some_and(|l| toggles >= l) {
                return Ok(Wait::Done);
            }
            let level = ctx.read_bool(clk)?;
            ctx.write_bool(clk, !level)?;
            toggles += 1;
            Ok(Wait::delay(half))
        })
        .drives([clk]),
    );
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltasim_common::FS_PER_NS;
    use deltasim_kernel::{Edge, Simulation, StopReason};

    #[test]
    fn bounded_clock_produces_one_rising_edge_per_cycle() {
        let mut sim = Simulation::default();
        let clk = sim.bool_signal("clk", false).unwrap();
        let edges = sim.unsigned_signal("edges", 8, 0).unwrap();
        let block = clock(
            &mut sim.scope("gen"),
            clk,
            ClockConfig::new(5 * FS_PER_NS).cycles(3),
        )
        .unwrap();
        sim.add_block(block).unwrap();
        sim.add_process(
            Process::seq("count", clk, Edge::Pos, None, move |ctx| {
                let n = ctx.read_u64(edges)?;
                ctx.write_wrapped(edges, n + 1)
            })
            .drives([edges]),
        )
        .unwrap();

        let summary = sim.run().unwrap();
        assert_eq!(summary.reason, StopReason::Quiescent);
        assert_eq!(summary.final_time.fs, 30 * FS_PER_NS);
        assert_eq!(sim.value(edges).unwrap().to_u64(), Some(3));
        assert_eq!(sim.value(clk).unwrap().to_u64(), Some(0));
    }

    #[test]
    fn unbounded_clock_runs_to_the_time_limit() {
        let mut sim = Simulation::default();
        let clk = sim.bool_signal("clk", false).unwrap();
        let block = clock(&mut sim.scope("gen"), clk, ClockConfig::new(FS_PER_NS)).unwrap();
        sim.add_block(block).unwrap();
        let summary = sim.run_for(10 * FS_PER_NS).unwrap();
        assert_eq!(summary.reason, StopReason::TimeLimit);
        assert_eq!(summary.final_time.fs, 10 * FS_PER_NS);
    }

    #[test]
    fn zero_half_period_is_rejected() {
        let mut sim = Simulation::default();
        let clk = sim.bool_signal("clk", false).unwrap();
        let err = clock(&mut sim.scope("gen"), clk, ClockConfig::new(0)).unwrap_err();
        assert!(matches!(
            err.as_usage(),
            Some(UsageError::InvalidParameter { name: "half_period_fs", .. })
        ));
    }

    #[test]
    fn config_from_frequency() {
        let config = ClockConfig::from_frequency("100MHz".parse().unwrap()).unwrap();
        assert_eq!(config.half_period_fs, 5 * FS_PER_NS);
        assert!(ClockConfig::from_frequency(Frequency::from_hz(0)).is_none());
    }
}
