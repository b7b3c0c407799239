//! SVG drawing surface
//!
//! Each `stroke` or `fill` turns the current path into one `<path>` element.
//! The document is regenerated from the element list on demand.

use crate::config::CanvasConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use trail_encoder::{Color, Surface};

pub struct SvgSurface {
    canvas: CanvasConfig,
    elements: Vec<String>,
    path: String,
    pointer: Option<(f64, f64)>,
}

/// Compact number formatting: at most 3 decimals, no trailing zeros
fn num(value: f64) -> String {
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

impl SvgSurface {
    pub fn new(canvas: CanvasConfig) -> Self {
        Self {
            canvas,
            elements: Vec::new(),
            path: String::new(),
            pointer: None,
        }
    }

    /// Place the virtual pointer (for probing)
    pub fn set_pointer(&mut self, x: f64, y: f64) {
        self.pointer = Some((x, y));
    }

    /// Number of painted elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Render the current drawing as a standalone SVG document
    pub fn to_document(&self) -> String {
        let (w, h) = (num(self.canvas.width), num(self.canvas.height));
        let mut doc = String::new();
        doc.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n"
        ));
        doc.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n",
            self.canvas.background
        ));
        for element in &self.elements {
            doc.push_str(element);
            doc.push('\n');
        }
        doc.push_str("</svg>\n");
        doc
    }

    /// Write the document, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
        fs::write(path, self.to_document())
            .with_context(|| format!("Failed to write SVG: {:?}", path))?;
        log::debug!("Wrote {} elements to {:?}", self.elements.len(), path);
        Ok(())
    }

    fn path_data(&self) -> Option<&str> {
        let data = self.path.trim_end();
        (!data.is_empty()).then_some(data)
    }
}

impl Surface for SvgSurface {
    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.push_str(&format!("M{} {} ", num(x), num(y)));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.path.push_str(&format!("L{} {} ", num(x), num(y)));
    }

    fn close_path(&mut self) {
        self.path.push_str("Z ");
    }

    fn stroke(&mut self) {
        if let Some(data) = self.path_data() {
            let element = format!(
                "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
                data,
                self.canvas.stroke,
                num(self.canvas.line_width)
            );
            self.elements.push(element);
        }
    }

    fn fill(&mut self, color: Color) {
        if let Some(data) = self.path_data() {
            let element = format!("<path d=\"{}\" fill=\"{}\"/>", data, color);
            self.elements.push(element);
        }
    }

    fn clear(&mut self) {
        self.elements.clear();
        self.path.clear();
    }

    fn pointer_position(&self) -> Option<(f64, f64)> {
        self.pointer
    }

    fn size(&self) -> (f64, f64) {
        (self.canvas.width, self.canvas.height)
    }
}
