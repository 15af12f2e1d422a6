//! Price/volume panel rasteriser.
//!
//! Draws the same picture the model was trained on: adjusted close as a lime
//! line over a lime volume histogram, black background, faint dashed grid and
//! white left/bottom spines. The price axis takes three quarters of the plot
//! height and the volume axis the remaining quarter. Text is not drawn.

use std::io::Cursor;

use common::models::PriceBar;
use image::{ImageFormat, Rgb, RgbImage};

use crate::error::ChartError;

pub mod colors {
    use image::Rgb;

    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const LIME: Rgb<u8> = Rgb([0, 255, 0]);
    pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
}

const SECONDS_PER_DAY: f64 = 86_400.0;
/// Axis padding on each side, as a fraction of the data span.
const AXIS_MARGIN: f64 = 0.05;
const GRID_DIVISIONS: usize = 5;
const DASH_ON: i64 = 4;
const DASH_OFF: i64 = 3;

#[derive(Debug, Clone)]
pub struct PanelStyle {
    /// Side of the square canvas before it is scaled down to the model input.
    pub size: u32,
    pub background: Rgb<u8>,
    pub foreground: Rgb<u8>,
    pub axis_color: Rgb<u8>,
    pub grid_color: Rgb<u8>,
    pub grid_alpha: f64,
    pub volume_alpha: f64,
    /// Price line width in pixels.
    pub line_width: f64,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            size: 512,
            background: colors::BLACK,
            foreground: colors::LIME,
            axis_color: colors::WHITE,
            grid_color: colors::GRAY,
            grid_alpha: 0.2,
            volume_alpha: 0.7,
            line_width: 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Rect {
    fn x_at(&self, u: f64) -> f64 {
        self.x0 + u * (self.x1 - self.x0)
    }

    /// `v = 0` is the bottom edge.
    fn y_at(&self, v: f64) -> f64 {
        self.y1 - v * (self.y1 - self.y0)
    }

    fn width(&self) -> f64 {
        self.x1 - self.x0
    }
}

struct Layout {
    price: Rect,
    volume: Rect,
}

impl Layout {
    fn new(size: u32) -> Self {
        let s = size as f64;
        let (left, right, top, bottom, gap) = (0.10 * s, 0.04 * s, 0.06 * s, 0.08 * s, 0.06 * s);
        let plot_height = s - top - bottom - gap;
        let price_height = plot_height * 0.75;

        let price = Rect {
            x0: left,
            y0: top,
            x1: s - right,
            y1: top + price_height,
        };
        let volume = Rect {
            x0: left,
            y0: price.y1 + gap,
            x1: s - right,
            y1: s - bottom,
        };
        Self { price, volume }
    }
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    lo: f64,
    hi: f64,
}

impl Axis {
    fn padded(lo: f64, hi: f64) -> Self {
        let span = hi - lo;
        if span.abs() < f64::EPSILON {
            return Self {
                lo: lo - 1.0,
                hi: hi + 1.0,
            };
        }
        Self {
            lo: lo - span * AXIS_MARGIN,
            hi: hi + span * AXIS_MARGIN,
        }
    }

    fn unit(&self, value: f64) -> f64 {
        (value - self.lo) / (self.hi - self.lo)
    }

    fn span(&self) -> f64 {
        self.hi - self.lo
    }
}

pub fn blend(fg: Rgb<u8>, bg: Rgb<u8>, alpha: f64) -> Rgb<u8> {
    let a = alpha.clamp(0.0, 1.0);
    let mix = |f: u8, b: u8| (a * f as f64 + (1.0 - a) * b as f64).round() as u8;
    Rgb([mix(fg[0], bg[0]), mix(fg[1], bg[1]), mix(fg[2], bg[2])])
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_rect(img: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb<u8>) {
    let (xa, xb) = (x0.min(x1).round() as i64, x0.max(x1).round() as i64);
    let (ya, yb) = (y0.min(y1).round() as i64, y0.max(y1).round() as i64);
    for y in ya..=yb {
        for x in xa..=xb {
            put(img, x, y, color);
        }
    }
}

fn stamp_disc(img: &mut RgbImage, cx: f64, cy: f64, radius: f64, color: Rgb<u8>) {
    let r = radius.max(0.5);
    let (xa, xb) = ((cx - r).floor() as i64, (cx + r).ceil() as i64);
    let (ya, yb) = ((cy - r).floor() as i64, (cy + r).ceil() as i64);
    for y in ya..=yb {
        for x in xa..=xb {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            if dx * dx + dy * dy <= r * r {
                put(img, x, y, color);
            }
        }
    }
}

fn draw_thick_line(
    img: &mut RgbImage,
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    width: f64,
    color: Rgb<u8>,
) {
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        stamp_disc(img, x0 + t * (x1 - x0), y0 + t * (y1 - y0), width / 2.0, color);
    }
}

fn draw_dashed_hline(img: &mut RgbImage, y: f64, x0: f64, x1: f64, color: Rgb<u8>) {
    let y = y.round() as i64;
    for (i, x) in (x0.round() as i64..=x1.round() as i64).enumerate() {
        if (i as i64) % (DASH_ON + DASH_OFF) < DASH_ON {
            put(img, x, y, color);
        }
    }
}

fn draw_dashed_vline(img: &mut RgbImage, x: f64, y0: f64, y1: f64, color: Rgb<u8>) {
    let x = x.round() as i64;
    for (i, y) in (y0.round() as i64..=y1.round() as i64).enumerate() {
        if (i as i64) % (DASH_ON + DASH_OFF) < DASH_ON {
            put(img, x, y, color);
        }
    }
}

fn draw_grid(img: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    for k in 1..GRID_DIVISIONS {
        let f = k as f64 / GRID_DIVISIONS as f64;
        draw_dashed_hline(img, rect.y_at(f), rect.x0, rect.x1, color);
        draw_dashed_vline(img, rect.x_at(f), rect.y0, rect.y1, color);
    }
}

fn draw_spines(img: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    fill_rect(img, rect.x0, rect.y0, rect.x0, rect.y1, color);
    fill_rect(img, rect.x0, rect.y1, rect.x1, rect.y1, color);
}

/// Renders one chart snapshot of `bars` (oldest first).
pub fn render_panel(bars: &[PriceBar], style: &PanelStyle) -> Result<RgbImage, ChartError> {
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return Err(ChartError::EmptySeries);
    };

    let mut img = RgbImage::from_pixel(style.size, style.size, style.background);
    let layout = Layout::new(style.size);

    let day_of = |b: &PriceBar| b.timestamp.timestamp() as f64 / SECONDS_PER_DAY;
    let x_axis = Axis::padded(day_of(first), day_of(last));

    let (lo, hi) = bars.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
        (lo.min(b.adj_close), hi.max(b.adj_close))
    });
    let price_axis = Axis::padded(lo, hi);

    let max_volume = bars.iter().map(|b| b.volume).fold(0.0_f64, f64::max);
    let volume_axis = Axis {
        lo: 0.0,
        hi: if max_volume > 0.0 { max_volume * (1.0 + AXIS_MARGIN) } else { 1.0 },
    };

    let grid = blend(style.grid_color, style.background, style.grid_alpha);
    draw_grid(&mut img, layout.price, grid);
    draw_grid(&mut img, layout.volume, grid);

    // One bar per day, as wide as a calendar day on the x axis.
    let bar_color = blend(style.foreground, style.background, style.volume_alpha);
    let half_bar = (layout.volume.width() / x_axis.span()).max(1.0) / 2.0;
    for b in bars {
        let x = layout.volume.x_at(x_axis.unit(day_of(b)));
        let top = layout.volume.y_at(volume_axis.unit(b.volume.max(0.0)));
        fill_rect(
            &mut img,
            x - half_bar,
            top,
            x + half_bar - 1.0,
            layout.volume.y1,
            bar_color,
        );
    }

    let points: Vec<(f64, f64)> = bars
        .iter()
        .map(|b| {
            (
                layout.price.x_at(x_axis.unit(day_of(b))),
                layout.price.y_at(price_axis.unit(b.adj_close)),
            )
        })
        .collect();
    if let [(x, y)] = points.as_slice() {
        stamp_disc(&mut img, *x, *y, style.line_width / 2.0, style.foreground);
    }
    for pair in points.windows(2) {
        draw_thick_line(&mut img, pair[0], pair[1], style.line_width, style.foreground);
    }

    draw_spines(&mut img, layout.price, style.axis_color);
    draw_spines(&mut img, layout.volume, style.axis_color);

    Ok(img)
}

pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, ChartError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64]) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                timestamp: start + Duration::days(i as i64),
                close: c,
                adj_close: c,
                volume: 1_000.0 * (i + 1) as f64,
            })
            .collect()
    }

    fn small_style() -> PanelStyle {
        PanelStyle {
            size: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_series_is_rejected() {
        assert!(matches!(
            render_panel(&[], &small_style()),
            Err(ChartError::EmptySeries)
        ));
    }

    #[test]
    fn test_panel_dimensions_and_background() {
        let img = render_panel(&series(&[1.0, 2.0, 3.0]), &small_style()).unwrap();

        assert_eq!(img.dimensions(), (100, 100));
        assert_eq!(*img.get_pixel(0, 0), colors::BLACK);
        assert_eq!(*img.get_pixel(99, 99), colors::BLACK);
    }

    #[test]
    fn test_price_line_follows_trend() {
        let style = small_style();
        let img = render_panel(&series(&[1.0, 2.0, 3.0, 4.0, 5.0]), &style).unwrap();
        let layout = Layout::new(style.size);

        // Rising series: lime near the bottom-left and top-right of the price area.
        let price = layout.price;
        let start_x = price.x_at(AXIS_MARGIN / (1.0 + 2.0 * AXIS_MARGIN)).round() as u32;
        let end_x = price.x_at(1.0 - AXIS_MARGIN / (1.0 + 2.0 * AXIS_MARGIN)).round() as u32;
        let column_has_lime_in = |x: u32, y0: f64, y1: f64| {
            (y0.round() as u32..=y1.round() as u32).any(|y| *img.get_pixel(x, y) == colors::LIME)
        };
        let mid = (price.y0 + price.y1) / 2.0;

        assert!(column_has_lime_in(start_x, mid, price.y1));
        assert!(column_has_lime_in(end_x, price.y0, mid));
    }

    #[test]
    fn test_volume_bars_are_blended() {
        let style = small_style();
        let img = render_panel(&series(&[1.0, 1.5]), &style).unwrap();
        let bar_color = blend(style.foreground, style.background, style.volume_alpha);

        assert!(img.pixels().any(|p| *p == bar_color));
    }

    #[test]
    fn test_flat_and_single_bar_series_render() {
        assert!(render_panel(&series(&[5.0, 5.0, 5.0]), &small_style()).is_ok());

        let img = render_panel(&series(&[42.0]), &small_style()).unwrap();
        assert!(img.pixels().any(|p| *p == colors::LIME));
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(colors::LIME, colors::BLACK, 1.0), colors::LIME);
        assert_eq!(blend(colors::LIME, colors::BLACK, 0.0), colors::BLACK);
        assert_eq!(blend(colors::WHITE, colors::BLACK, 0.5), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_encode_png_signature() {
        let img = render_panel(&series(&[1.0, 2.0]), &small_style()).unwrap();
        let png = encode_png(&img).unwrap();

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
