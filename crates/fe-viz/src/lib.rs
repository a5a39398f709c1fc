#![forbid(unsafe_code)]

//! Curved annotation arrows placed in figure coordinates.
//!
//! [`draw_arrow`] builds a [`FancyArrowPatch`] joining two points with an
//! `arc3` curve and appends it to a [`Figure`]'s patch list. Figures render
//! to SVG through [`Figure::to_svg`].

mod color;
mod figure;
mod style;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use color::Color;
pub use figure::Figure;
pub use style::{ArrowHead, ArrowStyle, ConnectionStyle};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VizError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coordinate system a patch's endpoints are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `(0, 0)` is the bottom-left corner of the figure, `(1, 1)` the top-right.
    #[default]
    Figure,
    /// Pixels from the bottom-left corner.
    Display,
}

/// Caller overrides for the patch's drawing properties.
///
/// Unset fields fall back to the arrow defaults; keys in `extra` are carried
/// through to the patch untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowKwargs {
    pub arrowstyle: Option<ArrowStyle>,
    pub color: Option<Color>,
    pub linewidth: Option<f64>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowOptions {
    /// Bend the other way.
    pub invert: bool,
    pub radius: f64,
    /// Arrow color unless `kw.color` is set.
    pub color: Color,
    pub kw: ArrowKwargs,
}

impl Default for ArrowOptions {
    fn default() -> Self {
        Self {
            invert: false,
            radius: 0.5,
            color: Color::rgb(0, 0, 0),
            kw: ArrowKwargs::default(),
        }
    }
}

pub const DEFAULT_LINEWIDTH: f64 = 0.5;

/// A styled arrow between two points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FancyArrowPatch {
    pub pos_a: (f64, f64),
    pub pos_b: (f64, f64),
    pub arrowstyle: ArrowStyle,
    pub connectionstyle: ConnectionStyle,
    pub transform: Transform,
    pub color: Color,
    pub linewidth: f64,
    pub extra: BTreeMap<String, String>,
}

impl FancyArrowPatch {
    /// Tail, curve control point and head, in the patch's own coordinates.
    #[must_use]
    pub fn control_points(&self) -> [(f64, f64); 3] {
        [
            self.pos_a,
            self.connectionstyle.control_point(self.pos_a, self.pos_b),
            self.pos_b,
        ]
    }

    /// Signed bend: positive when the control point lies left of the
    /// tail-to-head direction, negative when right, zero for a straight arrow.
    #[must_use]
    pub fn curvature(&self) -> f64 {
        let [a, c, b] = self.control_points();
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    }
}

fn point(name: &str, value: &[f64]) -> Result<(f64, f64), VizError> {
    match value {
        [x, y] => Ok((*x, *y)),
        _ => Err(VizError::InvalidArgument(format!(
            "{name} must be an (x, y) pair, got {} values",
            value.len()
        ))),
    }
}

/// Draw a curved arrow from `tail` to `head` in figure coordinates.
///
/// The patch is appended to `fig` and returned for further styling.
pub fn draw_arrow<'f>(
    tail: &[f64],
    head: &[f64],
    fig: &'f mut Figure,
    options: &ArrowOptions,
) -> Result<&'f mut FancyArrowPatch, VizError> {
    let pos_a = point("tail_position", tail)?;
    let pos_b = point("head_position", head)?;

    let rad = if options.invert {
        -options.radius
    } else {
        options.radius
    };
    let kw = &options.kw;
    let patch = FancyArrowPatch {
        pos_a,
        pos_b,
        arrowstyle: kw.arrowstyle.unwrap_or(ArrowStyle::DEFAULT_SIMPLE),
        connectionstyle: ConnectionStyle::Arc3 { rad },
        transform: Transform::Figure,
        color: kw.color.unwrap_or(options.color),
        linewidth: kw.linewidth.unwrap_or(DEFAULT_LINEWIDTH),
        extra: kw.extra.clone(),
    };
    log::debug!(
        "arrow {pos_a:?} -> {pos_b:?} ({}, {})",
        patch.connectionstyle,
        patch.arrowstyle
    );
    Ok(fig.add_patch(patch))
}
