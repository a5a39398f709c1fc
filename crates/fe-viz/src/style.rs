use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::VizError;

/// Arrow head drawn at one end of a line-style arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowHead {
    None,
    Open,
    Filled,
}

/// Shape of an arrow, written in matplotlib's `"Name, key=value, ..."` form.
///
/// Head and tail sizes are in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrowStyle {
    Simple {
        head_length: f64,
        head_width: f64,
        tail_width: f64,
    },
    Fancy {
        head_length: f64,
        head_width: f64,
        tail_width: f64,
    },
    Wedge {
        tail_width: f64,
        shrink_factor: f64,
    },
    /// `-`, `->`, `-|>`, `<-`, `<|-`, `<->`, `<|-|>`.
    Line {
        begin: ArrowHead,
        end: ArrowHead,
        head_length: f64,
        head_width: f64,
    },
}

impl ArrowStyle {
    /// Style applied when the caller does not choose one.
    pub const DEFAULT_SIMPLE: Self = Self::Simple {
        head_length: 8.0,
        head_width: 4.0,
        tail_width: 0.9,
    };

    #[must_use]
    pub fn heads(&self) -> (ArrowHead, ArrowHead) {
        match self {
            Self::Simple { .. } | Self::Fancy { .. } => (ArrowHead::None, ArrowHead::Filled),
            Self::Wedge { .. } => (ArrowHead::None, ArrowHead::None),
            Self::Line { begin, end, .. } => (*begin, *end),
        }
    }

    /// `(length, width)` of the arrow heads.
    #[must_use]
    pub fn head_size(&self) -> (f64, f64) {
        match self {
            Self::Simple {
                head_length,
                head_width,
                ..
            }
            | Self::Fancy {
                head_length,
                head_width,
                ..
            }
            | Self::Line {
                head_length,
                head_width,
                ..
            } => (*head_length, *head_width),
            Self::Wedge { tail_width, .. } => (0.0, *tail_width),
        }
    }

    fn line_name(begin: ArrowHead, end: ArrowHead) -> String {
        let left = match begin {
            ArrowHead::None => "",
            ArrowHead::Open => "<",
            ArrowHead::Filled => "<|",
        };
        let right = match end {
            ArrowHead::None => "",
            ArrowHead::Open => ">",
            ArrowHead::Filled => "|>",
        };
        format!("{left}-{right}")
    }

    fn line_heads(name: &str) -> Option<(ArrowHead, ArrowHead)> {
        let (left, right) = name.split_once('-')?;
        let begin = match left {
            "" => ArrowHead::None,
            "<" => ArrowHead::Open,
            "<|" => ArrowHead::Filled,
            _ => return None,
        };
        let end = match right {
            "" => ArrowHead::None,
            ">" => ArrowHead::Open,
            "|>" => ArrowHead::Filled,
            _ => return None,
        };
        Some((begin, end))
    }
}

fn parse_attrs(name: &str, raw: &[&str]) -> Result<Vec<(String, f64)>, VizError> {
    raw.iter()
        .map(|attr| {
            let (key, value) = attr.split_once('=').ok_or_else(|| {
                VizError::InvalidArgument(format!("arrow style {name:?}: expected key=value, got {attr:?}"))
            })?;
            let value = value.trim().parse::<f64>().map_err(|_| {
                VizError::InvalidArgument(format!(
                    "arrow style {name:?}: attribute {:?} is not a number",
                    key.trim()
                ))
            })?;
            Ok((key.trim().to_ascii_lowercase(), value))
        })
        .collect()
}

fn take_attr(attrs: &mut Vec<(String, f64)>, key: &str, default: f64) -> f64 {
    match attrs.iter().position(|(k, _)| k == key) {
        Some(pos) => attrs.remove(pos).1,
        None => default,
    }
}

impl FromStr for ArrowStyle {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim).filter(|part| !part.is_empty());
        let name = parts
            .next()
            .ok_or_else(|| VizError::InvalidArgument("empty arrow style".to_owned()))?;
        let raw = parts.collect::<Vec<_>>();
        let mut attrs = parse_attrs(name, &raw)?;

        let style = match name.to_ascii_lowercase().as_str() {
            "simple" => Self::Simple {
                head_length: take_attr(&mut attrs, "head_length", 0.5),
                head_width: take_attr(&mut attrs, "head_width", 0.5),
                tail_width: take_attr(&mut attrs, "tail_width", 0.2),
            },
            "fancy" => Self::Fancy {
                head_length: take_attr(&mut attrs, "head_length", 0.4),
                head_width: take_attr(&mut attrs, "head_width", 0.4),
                tail_width: take_attr(&mut attrs, "tail_width", 0.4),
            },
            "wedge" => Self::Wedge {
                tail_width: take_attr(&mut attrs, "tail_width", 0.3),
                shrink_factor: take_attr(&mut attrs, "shrink_factor", 0.5),
            },
            other => {
                let (begin, end) = Self::line_heads(other).ok_or_else(|| {
                    VizError::InvalidArgument(format!("unknown arrow style {name:?}"))
                })?;
                Self::Line {
                    begin,
                    end,
                    head_length: take_attr(&mut attrs, "head_length", 0.4),
                    head_width: take_attr(&mut attrs, "head_width", 0.2),
                }
            }
        };

        if let Some((key, _)) = attrs.first() {
            return Err(VizError::InvalidArgument(format!(
                "arrow style {name:?} has no attribute {key:?}"
            )));
        }
        Ok(style)
    }
}

impl fmt::Display for ArrowStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple {
                head_length,
                head_width,
                tail_width,
            } => write!(
                f,
                "Simple, tail_width={tail_width}, head_width={head_width}, head_length={head_length}"
            ),
            Self::Fancy {
                head_length,
                head_width,
                tail_width,
            } => write!(
                f,
                "Fancy, tail_width={tail_width}, head_width={head_width}, head_length={head_length}"
            ),
            Self::Wedge {
                tail_width,
                shrink_factor,
            } => write!(f, "Wedge, tail_width={tail_width}, shrink_factor={shrink_factor}"),
            Self::Line {
                begin,
                end,
                head_length,
                head_width,
            } => write!(
                f,
                "{}, head_length={head_length}, head_width={head_width}",
                Self::line_name(*begin, *end)
            ),
        }
    }
}

impl Serialize for ArrowStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArrowStyle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = String::deserialize(deserializer)?;
        spec.parse().map_err(serde::de::Error::custom)
    }
}

/// Path connecting the two ends of an arrow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionStyle {
    /// Quadratic curve whose control point sits `rad` times the chord length
    /// away from the chord midpoint. Positive `rad` bends clockwise when
    /// travelling from tail to head with y pointing up.
    Arc3 { rad: f64 },
}

impl ConnectionStyle {
    #[must_use]
    pub fn rad(&self) -> f64 {
        match self {
            Self::Arc3 { rad } => *rad,
        }
    }

    /// Bezier control point for a curve from `a` to `b`.
    #[must_use]
    pub fn control_point(&self, a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
        match self {
            Self::Arc3 { rad } => {
                let mid = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
                let (dx, dy) = (b.0 - a.0, b.1 - a.1);
                (mid.0 + rad * dy, mid.1 - rad * dx)
            }
        }
    }
}

impl fmt::Display for ConnectionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arc3 { rad } => write!(f, "arc3,rad={rad}"),
        }
    }
}

impl Serialize for ConnectionStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
