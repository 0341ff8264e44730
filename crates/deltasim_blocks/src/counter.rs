//! Edge-triggered up-counter.

use deltasim_kernel::{Block, Edge, Process, Scope, SignalId, SimError};

/// Counts rising edges of `clk` into a `width`-bit `count` register that
/// wraps on overflow. While `reset` is asserted the count returns to zero.
///
/// Returns the block and its `count` output.
pub fn counter(
    scope: &mut Scope<'_>,
    clk: SignalId,
    reset: Option<SignalId>,
    width: u32,
) -> Result<(Block, SignalId), SimError> {
    let count = scope.unsigned_signal("count", width, 0)?;
    let mut block = Block::new(scope, "counter");
    block.add(
        Process::seq("logic", clk, Edge::Pos, reset, move |ctx| {
            let n = ctx.read_u64(count)?;
            ctx.write_wrapped(count, n.wrapping_add(1))
        })
        .drives([count]),
    );
    Ok((block, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltasim_common::FS_PER_NS;
    use deltasim_kernel::{ResetSpec, Simulation, Wait};

    fn toggle(clk: SignalId, toggles: u32) -> Process {
        let mut done = 0;
        Process::instance("tb", move |ctx| {
            if done == toggles {
                return Ok(Wait::Done);
            }
            let level = ctx.read_bool(clk)?;
            ctx.write_bool(clk, !level)?;
            done += 1;
            Ok(Wait::delay(FS_PER_NS))
        })
        .drives([clk])
    }

    #[test]
    fn counts_and_wraps() {
        let mut sim = Simulation::default();
        let clk = sim.bool_signal("clk", false).unwrap();
        let (block, count) = counter(&mut sim.scope("cnt"), clk, None, 2).unwrap();
        sim.add_block(block).unwrap();
        sim.add_process(toggle(clk, 10)).unwrap();
        sim.run().unwrap();
        // Five rising edges on a 2-bit register.
        assert_eq!(sim.value(count).unwrap().to_u64(), Some(1));
        assert_eq!(sim.signal_name(count), Some("cnt.count"));
    }

    #[test]
    fn async_reset_clears_without_a_clock_edge() {
        let mut sim = Simulation::default();
        let clk = sim.bool_signal("clk", false).unwrap();
        let rst = sim
            .reset_signal("rst", false, ResetSpec::async_high())
            .unwrap();
        let (block, count) = counter(&mut sim.scope("cnt"), clk, Some(rst), 8).unwrap();
        sim.add_block(block).unwrap();
        sim.add_process(toggle(clk, 6)).unwrap();
        // Rising edges at 0, 2 and 4 ns; reset rises at 5.5 ns between edges.
        sim.schedule_write(5 * FS_PER_NS + 500_000, rst, true).unwrap();
        sim.run_for(5 * FS_PER_NS).unwrap();
        assert_eq!(sim.value(count).unwrap().to_u64(), Some(3));
        sim.run().unwrap();
        assert_eq!(sim.value(count).unwrap().to_u64(), Some(0));
    }
}
