//! Raster rendering of the chart data.
//!
//! Charts are drawn onto plain RGB buffers. Text needs a TrueType font; when
//! none is available the shapes are still drawn and every label is skipped.

use std::f64::consts::TAU;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_polygon_mut, draw_text_mut, text_size,
};
use imageproc::point::Point;
use imageproc::rect::Rect;

use super::data::{CoOccurrenceData, FrequencyData, HeatmapData, PeakSeries, ShareSlice, TimelineData};

/// Brand colors, cycled by column position.
pub const PALETTE: [Rgb<u8>; 6] = [
    Rgb([0x2E, 0x86, 0xAB]),
    Rgb([0xA2, 0x3B, 0x72]),
    Rgb([0xF1, 0x8F, 0x01]),
    Rgb([0xC7, 0x3E, 0x1D]),
    Rgb([0x59, 0x3E, 0x2B]),
    Rgb([0x6A, 0x99, 0x4E]),
];

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT: Rgb<u8> = Rgb([33, 37, 41]);
const AXIS: Rgb<u8> = Rgb([90, 90, 90]);
const GRID: Rgb<u8> = Rgb([228, 228, 228]);
const PEAK_MARKER: Rgb<u8> = Rgb([220, 20, 60]);
const NOTE_FILL: Rgb<u8> = Rgb([255, 255, 153]);

const TITLE_SIZE: f32 = 30.0;
const LABEL_SIZE: f32 = 18.0;
const TICK_SIZE: f32 = 15.0;

pub fn brand_color(column: usize) -> Rgb<u8> {
    PALETTE[column % PALETTE.len()]
}

/// YlOrRd color ramp, `t` in `[0, 1]`.
pub fn ylorrd(t: f64) -> Rgb<u8> {
    const STOPS: [[u8; 3]; 9] = [
        [0xff, 0xff, 0xcc],
        [0xff, 0xed, 0xa0],
        [0xfe, 0xd9, 0x76],
        [0xfe, 0xb2, 0x4c],
        [0xfd, 0x8d, 0x3c],
        [0xfc, 0x4e, 0x2a],
        [0xe3, 0x1a, 0x1c],
        [0xbd, 0x00, 0x26],
        [0x80, 0x00, 0x26],
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (STOPS.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(STOPS.len() - 2);
    let frac = scaled - lo as f64;
    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let a = f64::from(STOPS[lo][c]);
        let b = f64::from(STOPS[lo + 1][c]);
        *slot = (a + (b - a) * frac).round() as u8;
    }
    Rgb(out)
}

/// Roughly `target` evenly spaced round values covering `[min, max]`.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    let span = (max - min).max(f64::EPSILON);
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);

    let mut ticks = Vec::new();
    let mut value = (min / step).ceil() * step;
    while value <= max + step * 1e-9 {
        ticks.push(value);
        value += step;
    }
    ticks
}

fn tick_label(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// An RGB buffer plus an optional font.
pub struct Canvas<'f> {
    image: RgbImage,
    font: Option<&'f FontVec>,
}

impl<'f> Canvas<'f> {
    pub fn new(width: u32, height: u32, font: Option<&'f FontVec>) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, WHITE),
            font,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn text_width(&self, size: f32, text: &str) -> u32 {
        match self.font {
            Some(font) if !text.is_empty() => text_size(PxScale::from(size), font, text).0,
            _ => 0,
        }
    }

    pub fn text(&mut self, x: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        if let Some(font) = self.font {
            if !text.is_empty() {
                draw_text_mut(&mut self.image, color, x, y, PxScale::from(size), font, text);
            }
        }
    }

    pub fn text_centered(&mut self, cx: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        let w = self.text_width(size, text) as i32;
        self.text(cx - w / 2, y, size, color, text);
    }

    pub fn text_right(&mut self, right: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        let w = self.text_width(size, text) as i32;
        self.text(right - w, y, size, color, text);
    }

    pub fn title(&mut self, text: &str) {
        let cx = self.width() as i32 / 2;
        self.text_centered(cx, 18, TITLE_SIZE, TEXT, text);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgb<u8>) {
        if w > 0 && h > 0 {
            draw_filled_rect_mut(&mut self.image, Rect::at(x, y).of_size(w, h), color);
        }
    }

    pub fn stroke_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgb<u8>) {
        if w > 0 && h > 0 {
            draw_hollow_rect_mut(&mut self.image, Rect::at(x, y).of_size(w, h), color);
        }
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
        draw_line_segment_mut(&mut self.image, from, to, color);
    }

    /// A line `width` pixels thick (drawn as vertically offset segments).
    pub fn thick_line(&mut self, from: (f32, f32), to: (f32, f32), width: u32, color: Rgb<u8>) {
        let half = width as f32 / 2.0;
        for i in 0..width.max(1) {
            let dy = i as f32 - half + 0.5;
            self.line((from.0, from.1 + dy), (to.0, to.1 + dy), color);
        }
    }

    pub fn dot(&mut self, center: (f32, f32), radius: i32, color: Rgb<u8>) {
        draw_filled_circle_mut(
            &mut self.image,
            (center.0.round() as i32, center.1.round() as i32),
            radius.max(1),
            color,
        );
    }

    /// Filled polygon; degenerate input is ignored.
    pub fn polygon(&mut self, points: &[Point<i32>], color: Rgb<u8>) {
        let mut points = points.to_vec();
        points.dedup();
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() >= 3 {
            draw_polygon_mut(&mut self.image, &points, color);
        }
    }

    /// Five-pointed star marker.
    pub fn star(&mut self, center: (f32, f32), radius: f32, color: Rgb<u8>) {
        let points: Vec<Point<i32>> = (0..10)
            .map(|i| {
                let r = if i % 2 == 0 { radius } else { radius * 0.45 };
                let angle = -TAU / 4.0 + TAU * i as f64 / 10.0;
                Point::new(
                    (center.0 as f64 + r as f64 * angle.cos()).round() as i32,
                    (center.1 as f64 + r as f64 * angle.sin()).round() as i32,
                )
            })
            .collect();
        self.polygon(&points, color);
    }

    /// Color swatches with labels, stacked downwards from `(x, y)`.
    pub fn legend(&mut self, x: i32, y: i32, entries: &[(String, Rgb<u8>)]) {
        if entries.is_empty() {
            return;
        }
        let width = entries
            .iter()
            .map(|(label, _)| self.text_width(TICK_SIZE, label))
            .max()
            .unwrap_or(0)
            + 44;
        let height = entries.len() as u32 * 24 + 12;
        self.fill_rect(x, y, width, height, WHITE);
        self.stroke_rect(x, y, width, height, GRID);
        for (i, (label, color)) in entries.iter().enumerate() {
            let row = y + 8 + i as i32 * 24;
            self.fill_rect(x + 8, row + 2, 20, 14, *color);
            self.text(x + 36, row, TICK_SIZE, TEXT, label);
        }
    }
}

/// Maps data coordinates into a pixel rectangle.
#[derive(Debug, Clone, Copy)]
pub struct Plot {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Plot {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        let widen = |(lo, hi): (f64, f64)| if hi > lo { (lo, hi) } else { (lo, lo + 1.0) };
        Self {
            left,
            top,
            right,
            bottom,
            x_range: widen(x_range),
            y_range: widen(y_range),
        }
    }

    pub fn x(&self, value: f64) -> f32 {
        let (lo, hi) = self.x_range;
        (self.left as f64 + (value - lo) / (hi - lo) * f64::from(self.right - self.left)) as f32
    }

    pub fn y(&self, value: f64) -> f32 {
        let (lo, hi) = self.y_range;
        (self.bottom as f64 - (value - lo) / (hi - lo) * f64::from(self.bottom - self.top)) as f32
    }

    /// Grid lines, tick labels and the two axes.
    pub fn axes(&self, canvas: &mut Canvas<'_>, x_ticks: &[f64], y_ticks: &[f64]) {
        for &t in x_ticks {
            let x = self.x(t);
            canvas.line((x, self.top as f32), (x, self.bottom as f32), GRID);
            canvas.text_centered(x as i32, self.bottom + 8, TICK_SIZE, AXIS, &tick_label(t));
        }
        for &t in y_ticks {
            let y = self.y(t);
            canvas.line((self.left as f32, y), (self.right as f32, y), GRID);
            canvas.text_right(self.left - 8, y as i32 - 8, TICK_SIZE, AXIS, &tick_label(t));
        }
        self.frame(canvas);
    }

    pub fn frame(&self, canvas: &mut Canvas<'_>) {
        let (l, t, r, b) = (self.left as f32, self.top as f32, self.right as f32, self.bottom as f32);
        canvas.line((l, b), (r, b), AXIS);
        canvas.line((l, t), (l, b), AXIS);
    }

    pub fn labels(&self, canvas: &mut Canvas<'_>, x_label: &str, y_label: &str) {
        let cx = (self.left + self.right) / 2;
        canvas.text_centered(cx, self.bottom + 34, LABEL_SIZE, TEXT, x_label);
        canvas.text(self.left, self.top - 28, LABEL_SIZE, TEXT, y_label);
    }
}

fn label_width(canvas: &Canvas<'_>, labels: &[String], size: f32) -> i32 {
    labels
        .iter()
        .map(|l| canvas.text_width(size, l))
        .max()
        .unwrap_or(0) as i32
}

/// Scatter of detections per brand lane; marker area grows with the count.
pub fn timeline(data: &TimelineData, font: Option<&FontVec>) -> RgbImage {
    let lanes = data.lanes.len().max(1);
    let height = 200 + 70 * lanes as u32;
    let mut canvas = Canvas::new(1600, height, font);
    canvas.title("Brand Detection Timeline");

    let left = (label_width(&canvas, &data.lanes, LABEL_SIZE) + 40).max(80);
    let x_max = data.max_time_secs.max(1.0);
    let plot = Plot::new(
        left,
        100,
        1560,
        height as i32 - 90,
        (0.0, x_max * 1.02),
        (-0.5, lanes as f64 - 0.5),
    );
    plot.axes(&mut canvas, &nice_ticks(0.0, x_max, 10), &[]);

    for (lane, name) in data.lanes.iter().enumerate() {
        let y = plot.y(lane as f64);
        canvas.line((plot.left as f32, y), (plot.right as f32, y), GRID);
        canvas.text_right(plot.left - 10, y as i32 - 9, LABEL_SIZE, TEXT, name);
    }
    for point in &data.points {
        let radius = (3.0 + 2.5 * f64::from(point.count).sqrt()).min(24.0) as i32;
        canvas.dot(
            (plot.x(point.time_secs), plot.y(point.lane as f64)),
            radius,
            brand_color(point.lane),
        );
    }
    plot.labels(&mut canvas, "Time (seconds)", "Brands");
    canvas.into_image()
}

/// Pie of brand totals with percentage labels.
pub fn market_share(slices: &[ShareSlice], font: Option<&FontVec>) -> RgbImage {
    let mut canvas = Canvas::new(1100, 900, font);
    canvas.title("Brand Visibility Share");

    let (cx, cy, radius) = (550.0_f64, 480.0_f64, 300.0_f64);
    let at = |angle: f64, r: f64| (cx + r * angle.cos(), cy + r * angle.sin());

    let mut start = -TAU / 4.0;
    for slice in slices {
        let sweep = slice.percent / 100.0 * TAU;
        let color = brand_color(slice.column);
        if slices.len() == 1 {
            canvas.dot((cx as f32, cy as f32), radius as i32, color);
        } else {
            let steps = ((sweep / TAU * 180.0).ceil() as usize).max(2);
            let mut points = vec![Point::new(cx as i32, cy as i32)];
            for i in 0..=steps {
                let (x, y) = at(start + sweep * i as f64 / steps as f64, radius);
                points.push(Point::new(x.round() as i32, y.round() as i32));
            }
            canvas.polygon(&points, color);
        }
        start += sweep;
    }

    // Slice borders and labels on a second pass so later wedges don't cover them
    let mut start = -TAU / 4.0;
    for slice in slices {
        let sweep = slice.percent / 100.0 * TAU;
        if slices.len() > 1 {
            let (x, y) = at(start, radius);
            canvas.thick_line((cx as f32, cy as f32), (x as f32, y as f32), 3, WHITE);
        }
        let mid = start + sweep / 2.0;
        let (lx, ly) = at(mid, radius * 1.13);
        canvas.text_centered(lx as i32, ly as i32 - 10, LABEL_SIZE, TEXT, &slice.brand);
        let (px, py) = at(mid, radius * 0.62);
        canvas.text_centered(
            px as i32,
            py as i32 - 9,
            LABEL_SIZE,
            WHITE,
            &format!("{:.1}%", slice.percent),
        );
        start += sweep;
    }
    canvas.into_image()
}

/// Brand x time-window grid with annotated cell counts.
pub fn heatmap(data: &HeatmapData, font: Option<&FontVec>) -> RgbImage {
    let rows = data.brands.len().max(1) as u32;
    let cols = data.windows.len().max(1) as u32;
    let cell_w = (1100 / cols).clamp(40, 140);
    let cell_h = 56;

    let probe = Canvas::new(1, 1, font);
    let left = (label_width(&probe, &data.brands, LABEL_SIZE) + 40).max(80);
    let top = 90;
    let width = left as u32 + cols * cell_w + 180;
    let height = top as u32 + rows * cell_h + 120;

    let mut canvas = Canvas::new(width, height, font);
    canvas.title("Brand Detection Intensity by Time Window");

    let max = data.max_cell().max(1) as f64;
    for (b, brand) in data.brands.iter().enumerate() {
        let y = top + b as i32 * cell_h as i32;
        canvas.text_right(left - 10, y + cell_h as i32 / 2 - 9, LABEL_SIZE, TEXT, brand);
        for (w, value) in data.cells[b].iter().enumerate() {
            let x = left + w as i32 * cell_w as i32;
            let t = *value as f64 / max;
            canvas.fill_rect(x, y, cell_w, cell_h, ylorrd(t));
            canvas.stroke_rect(x, y, cell_w, cell_h, WHITE);
            let ink = if t > 0.6 { WHITE } else { TEXT };
            canvas.text_centered(
                x + cell_w as i32 / 2,
                y + cell_h as i32 / 2 - 9,
                LABEL_SIZE,
                ink,
                &value.to_string(),
            );
        }
    }

    let grid_bottom = top + (rows * cell_h) as i32;
    for (w, window) in data.windows.iter().enumerate() {
        let cx = left + w as i32 * cell_w as i32 + cell_w as i32 / 2;
        canvas.text_centered(cx, grid_bottom + 8, TICK_SIZE, AXIS, &window.label());
    }
    let grid_right = left + (cols * cell_w) as i32;
    canvas.text_centered((left + grid_right) / 2, grid_bottom + 40, LABEL_SIZE, TEXT, "Time Windows");
    canvas.text(left, top - 30, LABEL_SIZE, TEXT, "Brands");

    // Color bar
    let bar_x = grid_right + 40;
    let bar_h = (rows * cell_h) as i32;
    for i in 0..bar_h {
        let t = 1.0 - i as f64 / (bar_h - 1).max(1) as f64;
        canvas.fill_rect(bar_x, top + i, 24, 1, ylorrd(t));
    }
    canvas.stroke_rect(bar_x, top, 24, bar_h as u32, AXIS);
    canvas.text(bar_x + 32, top - 8, TICK_SIZE, AXIS, &data.max_cell().to_string());
    canvas.text(bar_x + 32, top + bar_h - 10, TICK_SIZE, AXIS, "0");

    canvas.into_image()
}

struct Panel<'a> {
    left: i32,
    right: i32,
    title: &'a str,
    x_label: &'a str,
}

/// Two horizontal bar panels: totals and frames present.
pub fn frequency(data: &FrequencyData, font: Option<&FontVec>) -> RgbImage {
    let n = data.totals.len().max(1) as u32;
    let height = (190 + 52 * n).max(500);
    let mut canvas = Canvas::new(1800, height, font);

    let labels: Vec<String> = data.totals.iter().map(|b| b.brand.clone()).collect();
    let indent = (label_width(&canvas, &labels, TICK_SIZE) + 20).max(60);

    let panels = [
        (
            &data.totals,
            Panel {
                left: indent + 20,
                right: 860,
                title: "Total Brand Detections",
                x_label: "Total Detection Score",
            },
        ),
        (
            &data.presence,
            Panel {
                left: 900 + indent + 20,
                right: 1760,
                title: "Detection Consistency (Frames with Brand Present)",
                x_label: "Number of Frames",
            },
        ),
    ];

    for (bars, panel) in panels {
        let max = bars.iter().map(|b| b.value).max().unwrap_or(0).max(1) as f64;
        let plot = Plot::new(
            panel.left,
            80,
            panel.right - 50,
            height as i32 - 80,
            (0.0, max * 1.1),
            (-0.5, bars.len().max(1) as f64 - 0.5),
        );
        canvas.text_centered(
            (plot.left + plot.right) / 2,
            24,
            LABEL_SIZE + 2.0,
            TEXT,
            panel.title,
        );
        plot.axes(&mut canvas, &nice_ticks(0.0, max, 6), &[]);

        for (pos, bar) in bars.iter().enumerate() {
            let y = plot.y(pos as f64);
            let bar_h = 30u32;
            let x0 = plot.x(0.0) as i32;
            let x1 = plot.x(bar.value as f64) as i32;
            canvas.fill_rect(x0, y as i32 - bar_h as i32 / 2, (x1 - x0) as u32, bar_h, brand_color(bar.column));
            canvas.text_right(plot.left - 8, y as i32 - 8, TICK_SIZE, TEXT, &bar.brand);
            canvas.text(x1 + 6, y as i32 - 8, TICK_SIZE, TEXT, &bar.value.to_string());
        }
        let cx = (plot.left + plot.right) / 2;
        canvas.text_centered(cx, plot.bottom + 34, LABEL_SIZE, TEXT, panel.x_label);
    }
    canvas.into_image()
}

/// Count series per brand with peaks marked by stars.
pub fn peaks(series: &[PeakSeries], font: Option<&FontVec>) -> RgbImage {
    let mut canvas = Canvas::new(1500, 860, font);
    canvas.title("Brand Detection Peaks and Trends");

    let x_max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(t, _)| *t))
        .fold(0.0, f64::max)
        .max(1.0);
    let y_max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, c)| f64::from(*c)))
        .fold(0.0, f64::max)
        .max(1.0);

    let plot = Plot::new(90, 100, 1260, 770, (0.0, x_max * 1.02), (0.0, y_max * 1.1));
    plot.axes(&mut canvas, &nice_ticks(0.0, x_max, 10), &nice_ticks(0.0, y_max, 6));

    for s in series {
        let color = brand_color(s.column);
        let pixels: Vec<(f32, f32)> = s
            .points
            .iter()
            .map(|(t, c)| (plot.x(*t), plot.y(f64::from(*c))))
            .collect();
        for pair in pixels.windows(2) {
            canvas.thick_line(pair[0], pair[1], 3, color);
        }
        for p in &pixels {
            canvas.dot(*p, 3, color);
        }
        for &peak in &s.peaks {
            canvas.star(pixels[peak], 13.0, PEAK_MARKER);
        }
    }

    plot.labels(&mut canvas, "Time (seconds)", "Detection Score");
    let entries: Vec<(String, Rgb<u8>)> = series
        .iter()
        .map(|s| (s.brand.clone(), brand_color(s.column)))
        .collect();
    canvas.legend(1280, 100, &entries);
    canvas.into_image()
}

/// Brands present per frame, for frames showing more than one brand.
pub fn co_occurrence(data: &CoOccurrenceData, font: Option<&FontVec>) -> RgbImage {
    let mut canvas = Canvas::new(1500, 700, font);
    canvas.title("Brand Co-occurrence Timeline");

    if data.is_empty() {
        canvas.text_centered(750, 340, 26.0, AXIS, "No brand co-occurrences detected");
        return canvas.into_image();
    }

    let x_max = data.points.iter().map(|p| p.time_secs).fold(0.0, f64::max).max(1.0);
    let y_max = data.max_count as f64 + 1.0;
    let plot = Plot::new(90, 100, 1450, 600, (0.0, x_max * 1.02), (0.0, y_max));
    let y_ticks: Vec<f64> = (0..=data.max_count + 1).map(|v| v as f64).collect();
    plot.axes(&mut canvas, &nice_ticks(0.0, x_max, 10), &y_ticks);

    for point in &data.points {
        canvas.dot(
            (plot.x(point.time_secs), plot.y(point.count() as f64)),
            8,
            PALETTE[1],
        );
    }
    for &idx in &data.annotated {
        let point = &data.points[idx];
        let note = point.brands.join(", ");
        let (x, y) = (plot.x(point.time_secs) as i32, plot.y(point.count() as f64) as i32);
        let w = canvas.text_width(TICK_SIZE, &note) + 16;
        let bx = (x + 12).min(plot.right - w as i32).max(plot.left);
        let by = (y - 44).max(plot.top - 20);
        canvas.fill_rect(bx, by, w, 26, NOTE_FILL);
        canvas.stroke_rect(bx, by, w, 26, AXIS);
        canvas.text(bx + 8, by + 4, TICK_SIZE, TEXT, &note);
        canvas.line((x as f32, y as f32), (bx as f32, (by + 26) as f32), AXIS);
    }

    plot.labels(&mut canvas, "Time (seconds)", "Number of Brands Present");
    canvas.into_image()
}
