//! Waveform recording for simulation output.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! implements the IEEE 1364 Value Change Dump (VCD) format, readable by
//! GTKWave, Surfer and similar viewers.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use deltasim_common::Value;

use crate::error::SimError;
use crate::signal::SignalId;

/// Receives the signal hierarchy once and then every committed change.
pub trait WaveformRecorder {
    /// Declares a signal in the current scope.
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a nested scope.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the innermost scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records the value of `id` at `time_fs`.
    fn record_change(&mut self, time_fs: u64, id: SignalId, value: &Value) -> Result<(), SimError>;

    /// Flushes buffered output. May be called after every run.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// IEEE 1364 VCD writer with a 1 fs timescale.
///
/// Identifier codes are printable ASCII starting from `!`.
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: HashMap<SignalId, (String, u32)>,
    header_written: bool,
    definitions_closed: bool,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: HashMap::new(),
            header_written: false,
            definitions_closed: false,
            current_time: None,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  deltasim {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    fn close_definitions(&mut self) -> Result<(), SimError> {
        if self.definitions_closed {
            return Ok(());
        }
        self.ensure_header()?;
        self.definitions_closed = true;
        writeln!(self.writer, "$enddefinitions $end")?;
        Ok(())
    }

    /// Identifier code for the `index`-th registered signal.
    fn id_code(index: usize) -> String {
        let mut code = String::new();
        let mut rest = index;
        loop {
            code.push((b'!' + (rest % 94) as u8) as char);
            rest /= 94;
            if rest == 0 {
                break;
            }
            rest -= 1;
        }
        code
    }

    fn format_value(value: &Value, width: u32) -> String {
        let bits = value.to_bits();
        if width == 1 {
            return if bits & 1 == 1 { "1" } else { "0" }.to_string();
        }
        let mut s = String::with_capacity(width as usize + 1);
        s.push('b');
        for i in (0..width).rev() {
            s.push(if value.bit(i) { '1' } else { '0' });
        }
        s
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.ensure_header()?;
        let code = Self::id_code(self.codes.len());
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.codes.insert(id, (code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(&mut self, time_fs: u64, id: SignalId, value: &Value) -> Result<(), SimError> {
        let first = !self.definitions_closed;
        self.close_definitions()?;
        if first {
            writeln!(self.writer, "$dumpvars")?;
        }
        if self.current_time != Some(time_fs) {
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }
        // Signals declared after the header are not part of the dump.
        let Some((code, width)) = self.codes.get(&id) else {
            return Ok(());
        };
        let text = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{text}{code}")?;
        } else {
            writeln!(self.writer, "{text} {code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        self.close_definitions()?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Default)]
struct ScopeNode<'a> {
    vars: Vec<(SignalId, &'a str, u32)>,
    children: BTreeMap<&'a str, ScopeNode<'a>>,
}

impl ScopeNode<'_> {
    fn emit(&self, recorder: &mut dyn WaveformRecorder) -> Result<(), SimError> {
        for (id, name, width) in &self.vars {
            recorder.register_signal(*id, name, *width)?;
        }
        for (name, child) in &self.children {
            recorder.begin_scope(name)?;
            child.emit(recorder)?;
            recorder.end_scope()?;
        }
        Ok(())
    }
}

/// Declares `signals` to `recorder`, nesting `$scope`s by the dot-separated
/// parts of each name under a root scope. A leading path segment equal to
/// `root` is not repeated.
pub fn declare_signals(
    recorder: &mut dyn WaveformRecorder,
    root: &str,
    signals: &[(SignalId, String, u32)],
) -> Result<(), SimError> {
    let mut tree = ScopeNode::default();
    for (id, name, width) in signals {
        let mut parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 1 && parts[0] == root {
            parts.remove(0);
        }
        let Some((leaf, scopes)) = parts.split_last() else {
            continue;
        };
        let mut node = &mut tree;
        for scope in scopes {
            node = node.children.entry(*scope).or_default();
        }
        node.vars.push((*id, *leaf, *width));
    }

    recorder.begin_scope(root)?;
    tree.emit(recorder)?;
    recorder.end_scope()
}
