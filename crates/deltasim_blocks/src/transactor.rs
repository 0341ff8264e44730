//! Request/acknowledge handshake with a bounded wait.
//!
//! [`AckPoller`] raises a request and samples the acknowledge line on every
//! rising clock edge. If the acknowledge has not arrived after the edge
//! budget is spent, the process fails with [`SimError::Timeout`].
//! [`ack_responder`] is the matching target side with a fixed latency.

use deltasim_kernel::{
    Block, Edge, Process, ProcessBody, ProcessContext, ProcessKind, Scope, SignalId, SimError,
    UsageError, Wait,
};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PollState {
    Idle,
    Polling { edges: u64 },
    Finished,
}

/// Initiator side of a single handshake.
#[derive(Debug)]
pub struct AckPoller {
    clk: SignalId,
    req: SignalId,
    ack: SignalId,
    done: SignalId,
    budget: u64,
    state: PollState,
}

impl AckPoller {
    /// Polls `ack` for at most `budget` rising edges of `clk`.
    pub fn new(clk: SignalId, req: SignalId, ack: SignalId, done: SignalId, budget: u64) -> Self {
        Self {
            clk,
            req,
            ack,
            done,
            budget,
            state: PollState::Idle,
        }
    }

    /// Wraps the poller in a free-running process driving `req` and `done`.
    pub fn into_process(self, name: impl Into<String>) -> Process {
        let drives = [self.req, self.done];
        Process::with_kind(name, ProcessKind::FreeRunning, self).drives(drives)
    }
}

impl ProcessBody for AckPoller {
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        match self.state {
            PollState::Idle => {
                ctx.write_bool(self.req, true)?;
                self.state = PollState::Polling { edges: 0 };
                Ok(Wait::posedge(self.clk))
            }
            PollState::Polling { edges } => {
                let edges = edges + 1;
                if ctx.read_bool(self.ack)? {
                    debug!(process = ctx.name(), edges, "acknowledged");
                    ctx.write_bool(self.req, false)?;
                    ctx.write_bool(self.done, true)?;
                    self.state = PollState::Finished;
                    return Ok(Wait::Done);
                }
                if edges >= self.budget {
                    return Err(ctx.timeout("acknowledge", edges));
                }
                self.state = PollState::Polling { edges };
                Ok(Wait::posedge(self.clk))
            }
            PollState::Finished => Ok(Wait::Done),
        }
    }
}

/// The two wires of a request/acknowledge handshake, declared by the
/// parent so both sides can be built independently.
#[derive(Clone, Copy, Debug)]
pub struct Handshake {
    /// Driven by the initiator.
    pub req: SignalId,
    /// Driven by the target.
    pub ack: SignalId,
}

impl Handshake {
    /// Declares `req` and `ack` in `scope`.
    pub fn declare(scope: &mut Scope<'_>) -> Result<Self, SimError> {
        Ok(Self {
            req: scope.bool_signal("req", false)?,
            ack: scope.bool_signal("ack", false)?,
        })
    }
}

/// An initiator issuing one request and waiting up to `budget` clock edges
/// for the acknowledge. Returns the block and its `done` flag.
pub fn transactor(
    scope: &mut Scope<'_>,
    clk: SignalId,
    wires: Handshake,
    budget: u64,
) -> Result<(Block, SignalId), SimError> {
    if budget == 0 {
        return Err(UsageError::InvalidParameter {
            block: scope.path().to_string(),
            name: "budget",
            reason: "must be at least one edge".to_string(),
        }
        .into());
    }
    let done = scope.bool_signal("done", false)?;
    let mut block = Block::new(scope, "transactor");
    block.add(AckPoller::new(clk, wires.req, wires.ack, done, budget).into_process("poll"));
    Ok((block, done))
}

/// A target that raises `ack` once `req` has been high for `latency` rising
/// edges, and drops it when `req` falls.
pub fn ack_responder(
    scope: &mut Scope<'_>,
    clk: SignalId,
    wires: Handshake,
    latency: u64,
) -> Result<Block, SimError> {
    let Handshake { req, ack } = wires;
    let mut waited = 0u64;
    let mut block = Block::new(scope, "ack_responder");
    block.add(
        Process::seq("logic", clk, Edge::Pos, None, move |ctx| {
            if !ctx.read_bool(req)? {
                waited = 0;
                return ctx.write_bool(ack, false);
            }
            waited += 1;
            if waited >= latency {
                ctx.write_bool(ack, true)?;
            }
            Ok(())
        })
        .drives([ack]),
    );
    Ok(block)
}
