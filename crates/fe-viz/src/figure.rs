use serde::Serialize;

use crate::{ArrowHead, ArrowStyle, FancyArrowPatch, Transform};

/// A drawing surface holding patches, `width` x `height` pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub width: f64,
    pub height: f64,
    patches: Vec<FancyArrowPatch>,
}

impl Figure {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            patches: Vec::new(),
        }
    }

    #[must_use]
    pub fn patches(&self) -> &[FancyArrowPatch] {
        &self.patches
    }

    /// Append `patch` and hand back the stored copy.
    pub fn add_patch(&mut self, patch: FancyArrowPatch) -> &mut FancyArrowPatch {
        let slot = self.patches.len();
        self.patches.push(patch);
        &mut self.patches[slot]
    }

    /// Map a patch point to SVG pixels (origin top-left, y down).
    fn to_pixels(&self, transform: Transform, (x, y): (f64, f64)) -> (f64, f64) {
        match transform {
            Transform::Figure => (x * self.width, (1.0 - y) * self.height),
            Transform::Display => (x, self.height - y),
        }
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        ));
        out.push('\n');
        out.push_str(&format!(
            r#"<rect width="{}" height="{}" fill="white" />"#,
            self.width, self.height
        ));
        out.push('\n');
        for patch in &self.patches {
            self.render_patch(&mut out, patch);
        }
        out.push_str("</svg>\n");
        out
    }

    fn render_patch(&self, out: &mut String, patch: &FancyArrowPatch) {
        let [a, c, b] = patch.control_points().map(|p| self.to_pixels(patch.transform, p));
        let color = patch.color.to_svg_fill();

        let stroke_width = match patch.arrowstyle {
            ArrowStyle::Simple { tail_width, .. } | ArrowStyle::Fancy { tail_width, .. } => {
                tail_width.max(patch.linewidth)
            }
            ArrowStyle::Wedge { tail_width, .. } => tail_width.max(patch.linewidth),
            ArrowStyle::Line { .. } => patch.linewidth,
        };
        out.push_str(&format!(
            r#"<path d="M{:.2},{:.2} Q{:.2},{:.2} {:.2},{:.2}" fill="none" stroke="{color}" stroke-width="{stroke_width:.2}" />"#,
            a.0, a.1, c.0, c.1, b.0, b.1
        ));
        out.push('\n');

        let (begin, end) = patch.arrowstyle.heads();
        let (length, width) = patch.arrowstyle.head_size();
        render_head(out, begin, a, c, length, width, &color, patch.linewidth);
        render_head(out, end, b, c, length, width, &color, patch.linewidth);
    }
}

/// Arrow head with its tip at `tip`, pointing away from `from`.
#[allow(clippy::too_many_arguments)]
fn render_head(
    out: &mut String,
    head: ArrowHead,
    tip: (f64, f64),
    from: (f64, f64),
    length: f64,
    width: f64,
    color: &str,
    linewidth: f64,
) {
    if head == ArrowHead::None {
        return;
    }
    let (dx, dy) = (tip.0 - from.0, tip.1 - from.1);
    let norm = dx.hypot(dy);
    if norm == 0.0 {
        return;
    }
    let (ux, uy) = (dx / norm, dy / norm);
    let base = (tip.0 - ux * length, tip.1 - uy * length);
    let half = width / 2.0;
    let left = (base.0 - uy * half, base.1 + ux * half);
    let right = (base.0 + uy * half, base.1 - ux * half);

    let points = format!(
        "{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
        left.0, left.1, tip.0, tip.1, right.0, right.1
    );
    match head {
        ArrowHead::Filled => out.push_str(&format!(
            r#"<polygon points="{points}" fill="{color}" stroke="{color}" stroke-width="{linewidth:.2}" />"#
        )),
        _ => out.push_str(&format!(
            r#"<polyline points="{points}" fill="none" stroke="{color}" stroke-width="{linewidth:.2}" />"#
        )),
    }
    out.push('\n');
}
