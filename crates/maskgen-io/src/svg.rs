//! Vector preview of a flattened pattern.
//!
//! The hierarchy below the chosen pattern is resolved into world-space
//! polygons, one `<path>` each with the even-odd rule so holes render as
//! holes. Layout +Y points up, so Y is negated on output.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use maskgen_core::{Layer, Library, PatternError, Point};

#[derive(Error, Debug)]
pub enum SvgError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("Pattern '{0}' has no geometry to preview")]
    Empty(String),
}

/// Preview rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvgOptions {
    /// Pixels per user unit for the `width`/`height` attributes.
    pub scaling: f64,
    /// Blank border around the layout, as a fraction of its larger side.
    pub margin: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            scaling: 10.0,
            margin: 0.02,
        }
    }
}

const PALETTE: [&str; 8] = [
    "#d62728", "#1f77b4", "#2ca02c", "#ff7f0e", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

fn layer_class(layer: Layer) -> String {
    format!("l{}d{}", layer.layer, layer.datatype)
}

fn layer_color(layer: Layer) -> &'static str {
    PALETTE[(layer.layer as usize * 3 + layer.datatype as usize) % PALETTE.len()]
}

/// Render the named pattern and its whole hierarchy as SVG.
pub fn render_svg(library: &Library, top: &str, options: &SvgOptions) -> Result<String, SvgError> {
    let flat = library.flatten(top)?;
    let bounds = flat
        .iter()
        .filter_map(|f| f.shape.bbox())
        .reduce(|a, b| a.union(&b))
        .ok_or_else(|| SvgError::Empty(top.to_string()))?;

    let view = bounds.expand(bounds.width().max(bounds.height()) * options.margin);
    let layers: BTreeSet<Layer> = flat.iter().map(|f| f.layer).collect();

    let mut svg = String::new();
    // writing into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{:.3}" height="{:.3}" viewBox="{} {} {} {}">"#,
        view.width() * options.scaling,
        view.height() * options.scaling,
        view.min.x,
        -view.max.y,
        view.width(),
        view.height()
    );
    let _ = writeln!(svg, "<style>");
    for layer in &layers {
        let _ = writeln!(
            svg,
            ".{} {{ stroke: {color}; fill: {color}; fill-opacity: 0.5; stroke-width: 0; }}",
            layer_class(*layer),
            color = layer_color(*layer)
        );
    }
    let _ = writeln!(svg, "</style>");
    let _ = writeln!(
        svg,
        r##"<rect x="{}" y="{}" width="{}" height="{}" fill="#ffffff"/>"##,
        view.min.x,
        -view.max.y,
        view.width(),
        view.height()
    );
    let _ = writeln!(svg, r#"<g id="{}">"#, escape(top));

    let mut paths = 0usize;
    for item in &flat {
        for polygon in item.shape.region().iter() {
            let mut d = String::new();
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                push_ring(&mut d, ring.coords().map(|c| Point::from(*c)));
            }
            if d.is_empty() {
                continue;
            }
            let _ = writeln!(
                svg,
                r#"<path class="{}" fill-rule="evenodd" d="{}"/>"#,
                layer_class(item.layer),
                d.trim_end()
            );
            paths += 1;
        }
    }

    let _ = writeln!(svg, "</g>\n</svg>");
    log::debug!("svg preview of '{}': {} paths", top, paths);
    Ok(svg)
}

/// Render and write the preview to `writer`.
pub fn write_svg<W: io::Write>(
    library: &Library,
    top: &str,
    options: &SvgOptions,
    mut writer: W,
) -> Result<(), SvgError> {
    let svg = render_svg(library, top, options)?;
    writer.write_all(svg.as_bytes())?;
    writer.flush()?;
    log::info!("wrote SVG preview of '{}'", top);
    Ok(())
}

fn push_ring(d: &mut String, points: impl Iterator<Item = Point>) {
    let mut first = true;
    for p in points {
        let cmd = if first { 'M' } else { 'L' };
        let _ = write!(d, "{cmd}{} {} ", p.x, -p.y);
        first = false;
    }
    if !first {
        d.push_str("Z ");
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
