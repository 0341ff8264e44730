//! Blocks and instance hierarchy.
//!
//! A block is an ordinary function that takes a [`Scope`] plus its port
//! signals and returns a [`Block`]: the processes implementing it and the
//! blocks it instantiated. [`Simulation::add_block`] flattens the tree into
//! one scheduler, prefixing every process name with its instance path and
//! recording each instance in the run's [`Registry`].
//!
//! ```ignore
//! fn inverter(scope: &mut Scope<'_>, a: SignalId) -> Result<Block, SimError> {
//!     let y = scope.bool_signal("y", true)?;
//!     let mut block = Block::new(scope, "inverter");
//!     block.add(Process::comb("logic", [a], move |ctx| {
//!         let v = ctx.read_bool(a)?;
//!         ctx.write_bool(y, !v)
//!     }).drives([y]));
//!     Ok(block)
//! }
//! ```

use std::collections::BTreeSet;

use serde::Serialize;

use deltasim_common::{Value, ValueType};

use crate::error::{SimError, UsageError};
use crate::event::EventId;
use crate::kernel::Simulation;
use crate::process::Process;
use crate::signal::{ResetSpec, SignalId};

/// Creates hierarchically named signals and events under one instance path.
pub struct Scope<'a> {
    sim: &'a mut Simulation,
    path: String,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(sim: &'a mut Simulation, path: String) -> Self {
        Self { sim, path }
    }

    /// The instance path, e.g. `top.fifo`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `local` prefixed with this scope's path.
    pub fn qualify(&self, local: &str) -> String {
        if self.path.is_empty() {
            local.to_string()
        } else {
            format!("{}.{local}", self.path)
        }
    }

    /// A nested scope for a child instance.
    pub fn child(&mut self, name: &str) -> Scope<'_> {
        let path = self.qualify(name);
        Scope {
            sim: &mut *self.sim,
            path,
        }
    }

    /// Declares a signal in this scope.
    pub fn signal(&mut self, local: &str, ty: ValueType, init: Value) -> Result<SignalId, SimError> {
        let name = self.qualify(local);
        self.sim.signal(name, ty, init)
    }

    /// Declares a boolean signal in this scope.
    pub fn bool_signal(&mut self, local: &str, init: bool) -> Result<SignalId, SimError> {
        let name = self.qualify(local);
        self.sim.bool_signal(name, init)
    }

    /// Declares an unsigned vector signal in this scope.
    pub fn unsigned_signal(
        &mut self,
        local: &str,
        width: u32,
        init: u64,
    ) -> Result<SignalId, SimError> {
        let name = self.qualify(local);
        self.sim.unsigned_signal(name, width, init)
    }

    /// Declares a reset signal in this scope.
    pub fn reset_signal(
        &mut self,
        local: &str,
        init: bool,
        spec: ResetSpec,
    ) -> Result<SignalId, SimError> {
        let name = self.qualify(local);
        self.sim.reset_signal(name, init, spec)
    }

    /// Declares a wired-OR signal in this scope.
    pub fn wired_or_signal(
        &mut self,
        local: &str,
        ty: ValueType,
        init: Value,
    ) -> Result<SignalId, SimError> {
        let name = self.qualify(local);
        self.sim.wired_or_signal(name, ty, init)
    }

    /// Declares an event in this scope.
    pub fn event(&mut self, local: &str) -> EventId {
        let name = self.qualify(local);
        self.sim.event(name)
    }
}

/// The processes and sub-blocks of one instance.
#[derive(Debug)]
pub struct Block {
    pub(crate) kind: String,
    pub(crate) path: String,
    pub(crate) processes: Vec<Process>,
    pub(crate) children: Vec<Block>,
}

impl Block {
    /// An empty block of type `kind` at the scope's path.
    pub fn new(scope: &Scope<'_>, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            path: scope.path().to_string(),
            processes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a process; its name is relative to this block.
    pub fn add(&mut self, process: Process) {
        self.processes.push(process);
    }

    /// Adds an instantiated sub-block.
    pub fn add_child(&mut self, child: Block) {
        self.children.push(child);
    }

    /// The instance path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The block type name.
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

/// One flattened block instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InstanceRecord {
    /// Hierarchical instance path.
    pub path: String,
    /// Block type name.
    pub kind: String,
    /// Number of processes the instance contributed directly.
    pub processes: usize,
}

/// The instances of one simulation run.
#[derive(Debug, Default, Serialize)]
pub struct Registry {
    instances: Vec<InstanceRecord>,
    #[serde(skip)]
    paths: BTreeSet<String>,
}

impl Registry {
    pub(crate) fn register(&mut self, record: InstanceRecord) -> Result<(), UsageError> {
        if !self.paths.insert(record.path.clone()) {
            return Err(UsageError::DuplicateInstance { path: record.path });
        }
        self.instances.push(record);
        Ok(())
    }

    /// Instances in the order they were added.
    pub fn instances(&self) -> &[InstanceRecord] {
        &self.instances
    }

    /// Instances of block type `kind`.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a InstanceRecord> + 'a {
        self.instances.iter().filter(move |r| r.kind == kind)
    }

    /// Looks up an instance by path.
    pub fn get(&self, path: &str) -> Option<&InstanceRecord> {
        self.instances.iter().find(|r| r.path == path)
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// `true` if no instance was registered.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Wait;

    fn inverter(scope: &mut Scope<'_>, a: SignalId) -> Result<(Block, SignalId), SimError> {
        let y = scope.bool_signal("y", true)?;
        let mut block = Block::new(scope, "inverter");
        block.add(
            Process::comb("logic", [a], move |ctx| {
                let v = ctx.read_bool(a)?;
                ctx.write_bool(y, !v)
            })
            .drives([y]),
        );
        Ok((block, y))
    }

    fn double_inverter(scope: &mut Scope<'_>, a: SignalId) -> Result<(Block, SignalId), SimError> {
        let mut block = Block::new(scope, "buffer");
        let (first, mid) = inverter(&mut scope.child("inv0"), a)?;
        let (second, y) = inverter(&mut scope.child("inv1"), mid)?;
        block.add_child(first);
        block.add_child(second);
        Ok((block, y))
    }

    #[test]
    fn hierarchy_is_flattened_with_qualified_names() {
        let mut sim = Simulation::default();
        let a = sim.bool_signal("a", false).unwrap();
        let (block, y) = double_inverter(&mut sim.scope("top"), a).unwrap();
        sim.add_block(block).unwrap();
        sim.schedule_write(100, a, true).unwrap();
        sim.run().unwrap();

        assert_eq!(sim.value(y).unwrap(), Value::Bool(true));
        assert_eq!(sim.signal_name(y), Some("top.inv1.y"));
        assert!(sim.find_signal("top.inv0.y").is_some());

        let names: Vec<String> = sim.processes().map(|p| p.name).collect();
        assert_eq!(names, vec!["top.inv0.logic", "top.inv1.logic"]);

        let registry = sim.registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("top").map(|r| r.kind.as_str()), Some("buffer"));
        assert_eq!(registry.of_kind("inverter").count(), 2);
        assert_eq!(registry.get("top.inv1").map(|r| r.processes), Some(1));
    }

    #[test]
    fn duplicate_instance_paths_are_rejected() {
        let mut sim = Simulation::default();
        let first = Block::new(&sim.scope("top.u0"), "leaf");
        let second = Block::new(&sim.scope("top.u0"), "leaf");
        sim.add_block(first).unwrap();
        let err = sim.add_block(second).unwrap_err();
        assert_eq!(
            err.as_usage(),
            Some(&UsageError::DuplicateInstance {
                path: "top.u0".into()
            })
        );
    }

    #[test]
    fn registries_are_per_run() {
        for _ in 0..2 {
            let mut sim = Simulation::default();
            let mut block = Block::new(&sim.scope("dut"), "leaf");
            block.add(Process::instance("idle", |_| Ok(Wait::Done)));
            sim.add_block(block).unwrap();
            assert_eq!(sim.registry().len(), 1);
        }
    }

    #[test]
    fn empty_path_keeps_local_names() {
        let mut sim = Simulation::default();
        let mut scope = sim.scope("");
        assert_eq!(scope.qualify("x"), "x");
        assert_eq!(scope.child("u").path(), "u");
        let ev = scope.event("tick");
        assert_eq!(sim.fire_count(ev).unwrap(), 0);
    }
}
