//! First-receiver trace files.
//!
//! One line per packet this sink won the election for:
//!
//! ```text
//! <time> <send timestamp> <seq> <src> <dst> <role> <size>
//! ```

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use uwsink_stats::SeqNo;
use uwsink_store::NodeAddr;

use crate::error::{Error, Result};
use crate::packet::Packet;

/// Trace file name for a suffix.
pub fn trace_file_name(suffix: &str) -> String {
    format!("tracefile{}.txt", suffix)
}

/// One trace line.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub time: f64,
    pub timestamp: f64,
    pub seq: SeqNo,
    pub src: NodeAddr,
    pub dst: NodeAddr,
    pub role: u32,
    pub size: u32,
}

impl TraceRecord {
    pub fn of(packet: &Packet, now: f64) -> Self {
        Self {
            time: now,
            timestamp: packet.timestamp,
            seq: packet.seq,
            src: packet.src,
            dst: packet.dst,
            role: packet.role,
            size: packet.size,
        }
    }

    /// Render with `precision` digits after the decimal point for the two
    /// times, or shortest form when `None`.
    pub fn format(&self, precision: Option<usize>) -> String {
        match precision {
            Some(p) => format!(
                "{:.p$} {:.p$} {} {} {} {} {}",
                self.time, self.timestamp, self.seq, self.src, self.dst, self.role, self.size,
                p = p
            ),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.time, self.timestamp, self.seq, self.src, self.dst, self.role, self.size
        )
    }
}

impl FromStr for TraceRecord {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(Error::InvalidTrace(format!(
                "expected 7 fields, got {}",
                fields.len()
            )));
        }
        let bad = |field: &str| Error::InvalidTrace(format!("bad field {:?} in {:?}", field, line));
        Ok(Self {
            time: fields[0].parse().map_err(|_| bad(fields[0]))?,
            timestamp: fields[1].parse().map_err(|_| bad(fields[1]))?,
            seq: fields[2].parse().map_err(|_| bad(fields[2]))?,
            src: fields[3].parse().map_err(|_| bad(fields[3]))?,
            dst: fields[4].parse().map_err(|_| bad(fields[4]))?,
            role: fields[5].parse().map_err(|_| bad(fields[5]))?,
            size: fields[6].parse().map_err(|_| bad(fields[6]))?,
        })
    }
}

/// Line-oriented trace writer.
pub struct Tracer {
    out: Box<dyn Write + Send>,
    precision: Option<usize>,
    path: Option<PathBuf>,
}

impl Tracer {
    /// Open `dir/tracefile<suffix>.txt` for appending.
    pub fn open(dir: &Path, suffix: &str, precision: Option<usize>) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(trace_file_name(suffix));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), "Opened trace file");
        Ok(Self {
            out: Box::new(file),
            precision,
            path: Some(path),
        })
    }

    /// Trace into an arbitrary writer.
    pub fn from_writer<W: Write + Send + 'static>(out: W, precision: Option<usize>) -> Self {
        Self {
            out: Box::new(out),
            precision,
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write(&mut self, record: &TraceRecord) -> Result<()> {
        writeln!(self.out, "{}", record.format(self.precision))?;
        self.out.flush()?;
        Ok(())
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("path", &self.path)
            .field("precision", &self.precision)
            .finish()
    }
}
