//! Minimal PDF writer on top of lopdf: A4 pages, the standard Helvetica
//! faces, filled rectangles and embedded RGB images.

use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use thiserror::Error;

use super::text::{text_width, to_win_ansi, FontStyle};

const PT_PER_MM: f64 = 72.0 / 25.4;
const MEDIA_WIDTH: i64 = 595;
const MEDIA_HEIGHT: i64 = 842;
/// Horizontal padding inside a cell.
const CELL_PADDING: f64 = 1.0;

pub type Color = (u8, u8, u8);

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to encode content of page {page}: {source}")]
    Content {
        page: usize,
        #[source]
        source: lopdf::Error,
    },

    #[error("Failed to serialise document: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// A text box, positioned in millimetres from the page's top-left corner.
#[derive(Debug, Clone)]
pub struct Cell<'a> {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub text: &'a str,
    pub font: FontStyle,
    pub size: f64,
    pub color: Color,
    pub align: Align,
    pub fill: Option<Color>,
    pub border: Option<Color>,
}

struct EmbeddedImage {
    name: String,
    image: RgbImage,
}

/// Accumulates page content; [`PdfWriter::finish`] serialises it.
#[derive(Default)]
pub struct PdfWriter {
    pages: Vec<Vec<Operation>>,
    images: Vec<EmbeddedImage>,
}

fn num(value: f64) -> Object {
    Object::Real(((value * 100.0).round() / 100.0) as _)
}

fn x_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// PDF space grows upwards from the bottom edge.
fn y_pt(mm: f64) -> f64 {
    MEDIA_HEIGHT as f64 - mm * PT_PER_MM
}

fn color_operands(color: Color) -> Vec<Object> {
    [color.0, color.1, color.2]
        .iter()
        .map(|c| num(f64::from(*c) / 255.0))
        .collect()
}

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn add_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Rectangle with optional fill and outline.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: Option<Color>, stroke: Option<Color>) {
        let paint = match (fill, stroke) {
            (Some(_), Some(_)) => "B",
            (Some(_), None) => "f",
            (None, Some(_)) => "S",
            (None, None) => return,
        };
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        if let Some(color) = fill {
            ops.push(Operation::new("rg", color_operands(color)));
        }
        if let Some(color) = stroke {
            ops.push(Operation::new("RG", color_operands(color)));
            ops.push(Operation::new("w", vec![num(0.2 * PT_PER_MM)]));
        }
        ops.push(Operation::new(
            "re",
            vec![num(x_pt(x)), num(y_pt(y + h)), num(w * PT_PER_MM), num(h * PT_PER_MM)],
        ));
        ops.push(Operation::new(paint, vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Text with its baseline at `baseline` mm.
    pub fn text(&mut self, x: f64, baseline: f64, text: &str, font: FontStyle, size: f64, color: Color) {
        if text.is_empty() {
            return;
        }
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![font.resource().into(), num(size)]));
        ops.push(Operation::new("rg", color_operands(color)));
        ops.push(Operation::new("Td", vec![num(x_pt(x)), num(y_pt(baseline))]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(to_win_ansi(text))]));
        ops.push(Operation::new("ET", vec![]));
    }

    /// A text box: background, border, then the text vertically centred.
    pub fn cell(&mut self, cell: &Cell<'_>) {
        self.rect(cell.x, cell.y, cell.w, cell.h, cell.fill, cell.border);

        let width = text_width(cell.text, cell.font, cell.size);
        let x = match cell.align {
            Align::Left => cell.x + CELL_PADDING,
            Align::Center => cell.x + (cell.w - width) / 2.0,
            Align::Right => cell.x + cell.w - CELL_PADDING - width,
        };
        let baseline = cell.y + cell.h / 2.0 + 0.3 * cell.size / PT_PER_MM;
        self.text(x, baseline, cell.text, cell.font, cell.size, cell.color);
    }

    /// Place `image` stretched to `w` x `h` mm with its top-left corner at `(x, y)`.
    pub fn image(&mut self, image: RgbImage, x: f64, y: f64, w: f64, h: f64) {
        let name = format!("Im{}", self.images.len() + 1);
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                num(w * PT_PER_MM),
                num(0.0),
                num(0.0),
                num(h * PT_PER_MM),
                num(x_pt(x)),
                num(y_pt(y + h)),
            ],
        ));
        ops.push(Operation::new("Do", vec![name.as_str().into()]));
        ops.push(Operation::new("Q", vec![]));
        self.images.push(EmbeddedImage { name, image });
    }

    /// Serialise every page into a PDF document.
    pub fn finish(self) -> Result<Vec<u8>, PdfError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for style in FontStyle::ALL {
            let id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => style.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(style.resource(), id);
        }

        let mut xobjects = Dictionary::new();
        for embedded in self.images {
            let (width, height) = embedded.image.dimensions();
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(width),
                    "Height" => i64::from(height),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                embedded.image.into_raw(),
            );
            let id = doc.add_object(stream);
            xobjects.set(embedded.name, id);
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for (index, operations) in self.pages.into_iter().enumerate() {
            let content = Content { operations };
            let encoded = content.encode().map_err(|source| PdfError::Content {
                page: index + 1,
                source,
            })?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), MEDIA_WIDTH.into(), MEDIA_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}
