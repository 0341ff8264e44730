//! Synchronous FIFO with registered read data.
//!
//! Storage is one signal per slot so every stored word shows up in
//! waveforms. A write while full and a read while empty are ignored; a
//! simultaneous read and write moves both pointers and keeps the count.

use deltasim_kernel::{Block, Edge, Process, Scope, SignalId, SimError, UsageError};
use tracing::trace;

/// Port signals of a FIFO instance.
#[derive(Clone, Debug)]
pub struct FifoPorts {
    /// Data read on the last accepted read.
    pub rd_data: SignalId,
    /// `true` when `depth` words are stored.
    pub full: SignalId,
    /// `true` when no word is stored.
    pub empty: SignalId,
    /// Number of stored words.
    pub count: SignalId,
    /// Storage slots, in address order.
    pub memory: Vec<SignalId>,
}

/// Inputs of a FIFO instance, all sampled on the rising clock edge.
#[derive(Clone, Copy, Debug)]
pub struct FifoInputs {
    /// Clock.
    pub clk: SignalId,
    /// Optional reset, clearing storage and pointers.
    pub reset: Option<SignalId>,
    /// Write strobe.
    pub wr_en: SignalId,
    /// Word to write; must be `width` bits wide.
    pub wr_data: SignalId,
    /// Read strobe.
    pub rd_en: SignalId,
}

fn bits_for(n: u64) -> u32 {
    (u64::BITS - n.leading_zeros()).max(1)
}

/// Builds a FIFO of `depth` words of `width` bits.
pub fn fifo(
    scope: &mut Scope<'_>,
    inputs: FifoInputs,
    depth: usize,
    width: u32,
) -> Result<(Block, FifoPorts), SimError> {
    if depth == 0 {
        return Err(UsageError::InvalidParameter {
            block: scope.path().to_string(),
            name: "depth",
            reason: "must be at least 1".to_string(),
        }
        .into());
    }
    let depth_u64 = depth as u64;

    let memory = (0..depth)
        .map(|i| scope.unsigned_signal(&format!("mem_{i}"), width, 0))
        .collect::<Result<Vec<_>, _>>()?;
    let ptr_width = bits_for(depth_u64 - 1);
    let wr_ptr = scope.unsigned_signal("wr_ptr", ptr_width, 0)?;
    let rd_ptr = scope.unsigned_signal("rd_ptr", ptr_width, 0)?;
    let count = scope.unsigned_signal("count", bits_for(depth_u64), 0)?;
    let rd_data = scope.unsigned_signal("rd_data", width, 0)?;
    let full = scope.bool_signal("full", false)?;
    let empty = scope.bool_signal("empty", true)?;

    let mut block = Block::new(scope, "fifo");

    let mem = memory.clone();
    let FifoInputs {
        clk,
        reset,
        wr_en,
        wr_data,
        rd_en,
    } = inputs;
    let mut registers = memory.clone();
    registers.extend([wr_ptr, rd_ptr, count, rd_data]);
    block.add(
        Process::seq("logic", clk, Edge::Pos, reset, move |ctx| {
            let stored = ctx.read_u64(count)?;
            let write = ctx.read_bool(wr_en)? && stored < depth_u64;
            let read = ctx.read_bool(rd_en)? && stored > 0;

            if write {
                let slot = ctx.read_u64(wr_ptr)?;
                let word = ctx.read(wr_data)?;
                ctx.write(mem[slot as usize], word)?;
                ctx.write_u64(wr_ptr, (slot + 1) % depth_u64)?;
            }
            if read {
                let slot = ctx.read_u64(rd_ptr)?;
                let word = ctx.read(mem[slot as usize])?;
                ctx.write(rd_data, word)?;
                ctx.write_u64(rd_ptr, (slot + 1) % depth_u64)?;
            }
            match (write, read) {
                (true, false) => ctx.write_u64(count, stored + 1)?,
                (false, true) => ctx.write_u64(count, stored - 1)?,
                _ => {}
            }
            trace!(process = ctx.name(), stored, write, read, "fifo edge");
            Ok(())
        })
        .drives(registers),
    );
    block.add(
        Process::comb("flags", [count], move |ctx| {
            let stored = ctx.read_u64(count)?;
            ctx.write_bool(full, stored == depth_u64)?;
            ctx.write_bool(empty, stored == 0)
        })
        .drives([full, empty]),
    );

    Ok((
        block,
        FifoPorts {
            rd_data,
            full,
            empty,
            count,
            memory,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltasim_common::FS_PER_NS;
    use deltasim_kernel::{ResetSpec, Simulation, Value};

    struct Bench {
        sim: Simulation,
        inputs: FifoInputs,
        ports: FifoPorts,
    }

    fn bench(depth: usize) -> Bench {
        let mut sim = Simulation::default();
        let clk = sim.bool_signal("clk", false).unwrap();
        let rst = sim
            .reset_signal("rst", false, ResetSpec::sync_high())
            .unwrap();
        let wr_en = sim.bool_signal("wr_en", false).unwrap();
        let wr_data = sim.unsigned_signal("wr_data", 8, 0).unwrap();
        let rd_en = sim.bool_signal("rd_en", false).unwrap();
        let inputs = FifoInputs {
            clk,
            reset: Some(rst),
            wr_en,
            wr_data,
            rd_en,
        };
        let (block, ports) = fifo(&mut sim.scope("q"), inputs, depth, 8).unwrap();
        sim.add_block(block).unwrap();
        Bench { sim, inputs, ports }
    }

    /// Drives one clock period with the given strobes. Inputs change on the
    /// falling edge and are sampled on the next rising edge.
    fn cycle(b: &mut Bench, n: u64, write: Option<u64>, read: bool) {
        let t = (2 * n + 1) * FS_PER_NS;
        let i = b.inputs;
        b.sim.schedule_write(t, i.wr_en, write.is_some()).unwrap();
        if let Some(word) = write {
            b.sim
                .schedule_write(t, i.wr_data, Value::unsigned(word, 8).unwrap())
                .unwrap();
        }
        b.sim.schedule_write(t, i.rd_en, read).unwrap();
        b.sim.schedule_write(t, i.clk, false).unwrap();
        b.sim.schedule_write(t + FS_PER_NS, i.clk, true).unwrap();
    }

    fn u(b: &Bench, s: SignalId) -> u64 {
        b.sim.value(s).unwrap().to_u64().unwrap()
    }

    #[test]
    fn words_come_out_in_order() {
        let mut b = bench(4);
        cycle(&mut b, 0, Some(0x11), false);
        cycle(&mut b, 1, Some(0x22), false);
        cycle(&mut b, 2, None, true);
        b.sim.run_for(6 * FS_PER_NS).unwrap();
        assert_eq!(u(&b, b.ports.rd_data), 0x11);
        assert_eq!(u(&b, b.ports.count), 1);

        cycle(&mut b, 3, None, true);
        b.sim.run().unwrap();
        assert_eq!(u(&b, b.ports.rd_data), 0x22);
        assert_eq!(u(&b, b.ports.count), 0);
        assert_eq!(b.sim.value(b.ports.empty).unwrap(), Value::Bool(true));
    }

    #[test]
    fn read_while_empty_is_ignored() {
        let mut b = bench(2);
        cycle(&mut b, 0, None, true);
        b.sim.run().unwrap();
        assert_eq!(u(&b, b.ports.count), 0);
        assert_eq!(u(&b, b.ports.rd_data), 0);
    }

    #[test]
    fn simultaneous_read_and_write_keep_the_count() {
        let mut b = bench(2);
        cycle(&mut b, 0, Some(1), false);
        cycle(&mut b, 1, Some(2), true);
        b.sim.run().unwrap();
        assert_eq!(u(&b, b.ports.count), 1);
        assert_eq!(u(&b, b.ports.rd_data), 1);
        assert_eq!(u(&b, b.ports.memory[1]), 2);
    }

    #[test]
    fn reset_clears_storage() {
        let mut b = bench(2);
        cycle(&mut b, 0, Some(7), false);
        let rst = b.inputs.reset.unwrap();
        b.sim.schedule_write(3 * FS_PER_NS, rst, true).unwrap();
        cycle(&mut b, 1, None, false);
        b.sim.run().unwrap();
        assert_eq!(u(&b, b.ports.count), 0);
        assert_eq!(u(&b, b.ports.memory[0]), 0);
        assert_eq!(b.sim.value(b.ports.empty).unwrap(), Value::Bool(true));
    }

    #[test]
    fn zero_depth_is_rejected() {
        let mut sim = Simulation::default();
        let clk = sim.bool_signal("clk", false).unwrap();
        let inputs = FifoInputs {
            clk,
            reset: None,
            wr_en: clk,
            wr_data: clk,
            rd_en: clk,
        };
        assert!(fifo(&mut sim.scope("q"), inputs, 0, 8).is_err());
    }

    #[test]
    fn pointer_widths() {
        assert_eq!(bits_for(0), 1);
        assert_eq!(bits_for(1), 1);
        assert_eq!(bits_for(3), 2);
        assert_eq!(bits_for(4), 3);
    }
}
