use std::fmt;
use std::ops::Range;

/// Marker that opens every telemetry line.
pub const DATA_PREFIX: &str = "DATA:";

/// One set of samples decoded from a single datagram. The sample index is the X axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    samples: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    MissingPrefix,
    InvalidSample { index: usize, token: String },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::MissingPrefix => write!(f, "line does not start with {:?}", DATA_PREFIX),
            FrameError::InvalidSample { index, token } => {
                write!(f, "sample {} is not a number: {:?}", index, token)
            }
        }
    }
}

impl std::error::Error for FrameError {}

impl Frame {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    /// Parse a `DATA:v0,v1,...` line. A single bad token rejects the whole line.
    ///
    /// Every `DATA:` marker in the line is removed, not just the leading one,
    /// so `DATA:1,DATA:2` reads as two samples.
    pub fn parse(line: &str) -> Result<Self, FrameError> {
        if !line.starts_with(DATA_PREFIX) {
            return Err(FrameError::MissingPrefix);
        }
        let body = line.replace(DATA_PREFIX, "");

        let samples = body
            .trim()
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                parse_sample(token).ok_or_else(|| FrameError::InvalidSample {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { samples })
    }

    /// Render back into wire format with a fixed number of decimals.
    pub fn encode(&self, precision: usize) -> String {
        let values: Vec<String> = self
            .samples
            .iter()
            .map(|v| format!("{:.*}", precision, v))
            .collect();
        format!("{}{}", DATA_PREFIX, values.join(","))
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn x_range(&self) -> Range<usize> {
        0..self.samples.len()
    }

    /// Strongest sample at or after `skip`. Bin 0 carries the DC leak, so callers
    /// locating a target usually pass `skip = 1`.
    pub fn peak(&self, skip: usize) -> Option<(usize, f64)> {
        self.samples
            .iter()
            .copied()
            .enumerate()
            .skip(skip)
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best, (i, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
    }
}

/// Decimal literal with optional surrounding whitespace. Single underscores
/// between digits are digit separators (`1_000.5`).
fn parse_sample(token: &str) -> Option<f64> {
    let token = token.trim();
    if !token.contains('_') {
        return token.parse().ok();
    }

    let bytes = token.as_bytes();
    let separators_ok = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
    });
    if !separators_ok {
        return None;
    }
    token.replace('_', "").parse().ok()
}
