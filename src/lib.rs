//! Receive radar telemetry over UDP and print or plot it.
//!
//! Telemetry arrives one frame per datagram as `DATA:v0,v1,...,vN`. The
//! [`receiver::Receiver`] hands every datagram to a [`consumer::Consumer`]:
//! either a diagnostic dump of the raw bytes or a parser that pushes each valid
//! [`frame::Frame`] into a [`sink::FrameSink`].

pub mod config;
pub mod consumer;
pub mod fmcw;
pub mod frame;
pub mod receiver;
pub mod sink;

