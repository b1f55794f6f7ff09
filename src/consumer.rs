use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;
use anyhow::{Context, Result};
use log::debug;

use crate::frame::{Frame, FrameError};
use crate::sink::FrameSink;

/// One received datagram, borrowed from the receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct Datagram<'a> {
    pub payload: &'a [u8],
    pub src: SocketAddr,
}

/// What a consumer did with a datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Diagnostic output was written.
    Echoed,
    /// Not a telemetry line.
    Ignored,
    /// Telemetry line with at least one bad sample; nothing was applied.
    Dropped(FrameError),
    /// The sink was updated; the loop should yield for the given pause.
    Updated(Duration),
}

pub trait Consumer {
    fn consume(&mut self, datagram: &Datagram<'_>) -> Result<Outcome>;
}

/// Echoes the sender and the first bytes of every datagram.
pub struct DumpConsumer<W: Write> {
    out: W,
    preview_len: usize,
}

pub const DUMP_BANNER: &str = "Receiver started. Waiting for data...";

impl<W: Write> DumpConsumer<W> {
    pub fn new(out: W, preview_len: usize) -> Self {
        Self { out, preview_len }
    }

    /// Announce that the receiver is up, before the first datagram.
    pub fn start(&mut self) -> Result<()> {
        writeln!(self.out, "{}", DUMP_BANNER)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Consumer for DumpConsumer<W> {
    fn consume(&mut self, datagram: &Datagram<'_>) -> Result<Outcome> {
        let end = datagram.payload.len().min(self.preview_len);
        writeln!(
            self.out,
            "GOT DATA from {}: {}...",
            datagram.src,
            byte_literal(&datagram.payload[..end])
        )?;
        self.out.flush()?;
        Ok(Outcome::Echoed)
    }
}

/// Parses telemetry lines and pushes every valid frame to a sink.
pub struct PlotConsumer<S: FrameSink> {
    sink: S,
}

impl<S: FrameSink> PlotConsumer<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: FrameSink> Consumer for PlotConsumer<S> {
    fn consume(&mut self, datagram: &Datagram<'_>) -> Result<Outcome> {
        let line = std::str::from_utf8(datagram.payload)
            .with_context(|| format!("Datagram from {} is not valid UTF-8", datagram.src))?;

        match Frame::parse(line) {
            Ok(frame) => {
                self.sink.update(&frame).context("Failed to update plot")?;
                Ok(Outcome::Updated(self.sink.redraw_pause()))
            }
            Err(FrameError::MissingPrefix) => Ok(Outcome::Ignored),
            Err(e) => {
                debug!("Dropping frame from {}: {}", datagram.src, e);
                Ok(Outcome::Dropped(e))
            }
        }
    }
}

/// Format bytes as a `b'...'` literal, escaping anything that is not printable ASCII.
///
/// The quote is always `'` and an embedded `'` is escaped as `\'`; there is no
/// switch to `b"..."` when the payload contains a single quote. The sender is
/// printed by the caller as `ip:port`, not as an `('ip', port)` tuple.
pub fn byte_literal(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len() + 3);
    text.push_str("b'");
    for &b in bytes {
        match b {
            b'\\' => text.push_str("\\\\"),
            b'\'' => text.push_str("\\'"),
            b'\t' => text.push_str("\\t"),
            b'\n' => text.push_str("\\n"),
            b'\r' => text.push_str("\\r"),
            0x20..=0x7e => text.push(b as char),
            _ => text.push_str(&format!("\\x{:02x}", b)),
        }
    }
    text.push('\'');
    text
}
