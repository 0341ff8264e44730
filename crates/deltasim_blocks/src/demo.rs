//! Ready-made designs runnable from the command line.
//!
//! Each design elaborates into a fresh [`Simulation`] under the root scope
//! `top` and brings its own stimulus, so a plain run ends quiescent.

use deltasim_common::FS_PER_NS;
use deltasim_kernel::{Block, ResetSpec, Simulation, SimError, Value};

use crate::clock::{clock, ClockConfig};
use crate::counter::counter;
use crate::fifo::{fifo, FifoInputs};
use crate::stimulus::Script;
use crate::transactor::{ack_responder, transactor, Handshake};

/// Parameters shared by all demo designs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemoParams {
    /// The `top.clk` generator.
    pub clock: ClockConfig,
}

impl Default for DemoParams {
    fn default() -> Self {
        Self {
            clock: ClockConfig::new(5 * FS_PER_NS).cycles(16),
        }
    }
}

/// A named design.
pub struct Design {
    /// Name used on the command line.
    pub name: &'static str,
    /// One-line summary.
    pub description: &'static str,
    build: fn(&mut Simulation, &DemoParams) -> Result<Block, SimError>,
}

impl Design {
    /// Creates the design's signals and adds its processes to `sim`.
    pub fn elaborate(&self, sim: &mut Simulation, params: &DemoParams) -> Result<(), SimError> {
        let block = (self.build)(sim, params)?;
        sim.add_block(block)
    }
}

impl std::fmt::Debug for Design {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Design").field("name", &self.name).finish()
    }
}

static DESIGNS: &[Design] = &[
    Design {
        name: "counter",
        description: "8-bit counter with a synchronous reset released after one cycle",
        build: counter_design,
    },
    Design {
        name: "fifo",
        description: "4-deep FIFO filled past full, then drained",
        build: fifo_design,
    },
    Design {
        name: "transactor",
        description: "request/acknowledge handshake answered after 3 edges",
        build: transactor_design,
    },
];

/// All demo designs.
pub fn designs() -> &'static [Design] {
    DESIGNS
}

/// Looks up a demo design by name.
pub fn find_design(name: &str) -> Option<&'static Design> {
    DESIGNS.iter().find(|d| d.name == name)
}

fn counter_design(sim: &mut Simulation, params: &DemoParams) -> Result<Block, SimError> {
    let mut top = sim.scope("top");
    let clk = top.bool_signal("clk", false)?;
    let rst = top.reset_signal("rst", true, ResetSpec::sync_high())?;

    let mut block = Block::new(&top, "counter_demo");
    block.add_child(clock(&mut top.child("clkgen"), clk, params.clock)?);
    let (cnt, _) = counter(&mut top.child("cnt"), clk, Some(rst), 8)?;
    block.add_child(cnt);
    block.add(
        Script::new()
            .negedge(clk)
            .write(rst, false)
            .into_process("stimulus"),
    );
    Ok(block)
}

fn fifo_design(sim: &mut Simulation, params: &DemoParams) -> Result<Block, SimError> {
    const DEPTH: u64 = 4;

    let mut top = sim.scope("top");
    let clk = top.bool_signal("clk", false)?;
    let wr_en = top.bool_signal("wr_en", false)?;
    let wr_data = top.unsigned_signal("wr_data", 8, 0)?;
    let rd_en = top.bool_signal("rd_en", false)?;

    let mut block = Block::new(&top, "fifo_demo");
    block.add_child(clock(&mut top.child("clkgen"), clk, params.clock)?);
    let inputs = FifoInputs {
        clk,
        reset: None,
        wr_en,
        wr_data,
        rd_en,
    };
    let (queue, ports) = fifo(&mut top.child("queue"), inputs, DEPTH as usize, 8)?;
    block.add_child(queue);

    // Inputs change on falling edges. The last write arrives while full.
    let mut script = Script::new();
    for word in 1..=DEPTH + 1 {
        script = script
            .negedge(clk)
            .write(wr_en, true)
            .write(wr_data, Value::unsigned(word * 0x11, 8)?);
    }
    script = script
        .negedge(clk)
        .write(wr_en, false)
        .expect(ports.full, true)
        .write(rd_en, true);
    for _ in 1..DEPTH {
        script = script.negedge(clk);
    }
    script = script
        .negedge(clk)
        .write(rd_en, false)
        .expect(ports.empty, true)
        .expect(ports.rd_data, Value::unsigned(DEPTH * 0x11, 8)?);
    block.add(script.into_process("stimulus"));
    Ok(block)
}

fn transactor_design(sim: &mut Simulation, params: &DemoParams) -> Result<Block, SimError> {
    let mut top = sim.scope("top");
    let clk = top.bool_signal("clk", false)?;
    let wires = Handshake::declare(&mut top)?;

    let mut block = Block::new(&top, "transactor_demo");
    block.add_child(clock(&mut top.child("clkgen"), clk, params.clock)?);
    let (init, _) = transactor(&mut top.child("init"), clk, wires, 8)?;
    block.add_child(init);
    block.add_child(ack_responder(&mut top.child("target"), clk, wires, 3)?);
    Ok(block)
}
