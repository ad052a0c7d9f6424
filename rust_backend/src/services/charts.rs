//! Trend charts of the volumetric properties against bitumen content.
//!
//! Every render call allocates its own pixel buffer, draws into it through a
//! drawing area that lives only inside the call, and encodes the result as
//! PNG. Nothing is cached between calls, so the same data always produces
//! the same bytes.
//!
//! Text needs a system font. When the annotated chart cannot be drawn the
//! renderer falls back to a bare chart with markers, gridlines and trend
//! curve only.

use anyhow::Context;
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::io::Cursor;
use std::ops::Range;

use crate::algorithms::trend::{fit_polynomial, PolynomialFit};
use crate::algorithms::volumetrics::float_values;
use crate::config::{AnalysisConfig, ChartSettings, TrendSettings};
use crate::core::domain::{VolumetricProperty, BITUMEN_COL};
use crate::core::error::{MixError, MixResult};

const MARKER_SIZE: i32 = 5;
const GRID_LINES: usize = 10;
const OVERVIEW_TITLE: &str = "Volumetric Properties vs. Bitumen Content";

/// Marker glyph used for a data series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    Circle,
    Square,
    Triangle,
}

/// Fixed color and marker of one property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStyle {
    pub color: RGBColor,
    pub marker: MarkerShape,
}

/// Va blue circles, VMA green squares, VFB red triangles.
pub fn style_for(property: VolumetricProperty) -> SeriesStyle {
    match property {
        VolumetricProperty::AirVoids => SeriesStyle {
            color: RGBColor(0, 0, 255),
            marker: MarkerShape::Circle,
        },
        VolumetricProperty::Vma => SeriesStyle {
            color: RGBColor(0, 128, 0),
            marker: MarkerShape::Square,
        },
        VolumetricProperty::Vfb => SeriesStyle {
            color: RGBColor(255, 0, 0),
            marker: MarkerShape::Triangle,
        },
    }
}

/// One rendered chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartImage {
    /// `None` for the overview chart
    pub property: Option<VolumetricProperty>,
    pub title: String,
    #[serde(skip)]
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub has_trend: bool,
    /// `false` when the chart was drawn without text
    pub annotated: bool,
}

impl ChartImage {
    /// File name used when the chart is written to disk.
    pub fn file_name(&self) -> String {
        let stem = match self.property {
            Some(VolumetricProperty::AirVoids) => "air_voids",
            Some(VolumetricProperty::Vma) => "vma",
            Some(VolumetricProperty::Vfb) => "vfb",
            None => "overview",
        };
        format!("{}.png", stem)
    }
}

struct PlotSeries {
    label: String,
    style: SeriesStyle,
    points: Vec<(f64, f64)>,
    trend: Option<Vec<(f64, f64)>>,
}

struct PlotSpec {
    title: String,
    x_desc: String,
    y_desc: String,
    series: Vec<PlotSeries>,
}

impl PlotSpec {
    fn bounds(&self) -> (Range<f64>, Range<f64>) {
        let all_points = self.series.iter().flat_map(|s| {
            s.points
                .iter()
                .chain(s.trend.iter().flatten())
                .copied()
        });
        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for (x, y) in all_points {
            if plottable(x) && plottable(y) {
                x_min = x_min.min(x);
                x_max = x_max.max(x);
                y_min = y_min.min(y);
                y_max = y_max.max(y);
            }
        }
        (padded(x_min, x_max), padded(y_min, y_max))
    }
}

/// Largest magnitude drawn. Keeps every axis span and its padding finite.
const PLOT_LIMIT: f64 = f64::MAX / 4.0;

fn plottable(v: f64) -> bool {
    v.is_finite() && v.abs() <= PLOT_LIMIT
}

fn padded(min: f64, max: f64) -> Range<f64> {
    if !plottable(min) || !plottable(max) || min > max {
        return 0.0..1.0;
    }
    let magnitude = min.abs().max(max.abs()).max(1.0);
    let pad = if max - min <= f64::EPSILON * magnitude {
        (magnitude * 0.05).max(1.0)
    } else {
        (max - min) * 0.05
    };
    let (lo, hi) = (min - pad, max + pad);
    if lo.is_finite() && hi.is_finite() && lo < hi {
        lo..hi
    } else {
        0.0..1.0
    }
}

/// Renders property charts as PNG images.
#[derive(Debug, Clone)]
pub struct TrendRenderer {
    charts: ChartSettings,
    trend: TrendSettings,
}

impl TrendRenderer {
    pub fn new(charts: ChartSettings, trend: TrendSettings) -> Self {
        Self { charts, trend }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.charts.clone(), config.trend.clone())
    }

    /// Chart of one property column against bitumen content.
    pub fn render_property(
        &self,
        df: &DataFrame,
        property: VolumetricProperty,
    ) -> MixResult<ChartImage> {
        let xs = float_values(df, BITUMEN_COL)?;
        let ys = float_values(df, property.column_name())?;
        self.render_series(property, &xs, &ys)
    }

    /// Chart of one property from plain x/y values.
    ///
    /// Pairs where either value is not finite, or too large in magnitude
    /// to place on an axis, are left out of the plot.
    pub fn render_series(
        &self,
        property: VolumetricProperty,
        xs: &[f64],
        ys: &[f64],
    ) -> MixResult<ChartImage> {
        let series = self.plot_series(property, property.label(), xs, ys);
        let has_trend = series.trend.is_some();
        let spec = PlotSpec {
            title: property.chart_title().to_string(),
            x_desc: BITUMEN_COL.to_string(),
            y_desc: property.column_name().to_string(),
            series: vec![series],
        };
        self.render(spec, Some(property), has_trend)
    }

    /// All three properties on one chart.
    pub fn render_overview(&self, df: &DataFrame) -> MixResult<ChartImage> {
        let xs = float_values(df, BITUMEN_COL)?;
        let mut series = Vec::with_capacity(VolumetricProperty::ALL.len());
        for property in VolumetricProperty::ALL {
            let ys = float_values(df, property.column_name())?;
            series.push(self.plot_series(property, property.column_name(), &xs, &ys));
        }
        let has_trend = series.iter().any(|s| s.trend.is_some());
        let spec = PlotSpec {
            title: OVERVIEW_TITLE.to_string(),
            x_desc: BITUMEN_COL.to_string(),
            y_desc: "% Value".to_string(),
            series,
        };
        self.render(spec, None, has_trend)
    }

    /// One chart per property, plus the overview when enabled.
    ///
    /// A chart that fails to render is logged and left out.
    pub fn render_all(&self, df: &DataFrame) -> Vec<ChartImage> {
        let mut images = Vec::new();
        for property in VolumetricProperty::ALL {
            match self.render_property(df, property) {
                Ok(image) => images.push(image),
                Err(e) => log::warn!("Skipping {} chart: {}", property, e),
            }
        }
        if self.charts.overview {
            match self.render_overview(df) {
                Ok(image) => images.push(image),
                Err(e) => log::warn!("Skipping overview chart: {}", e),
            }
        }
        images
    }

    fn plot_series(
        &self,
        property: VolumetricProperty,
        label: &str,
        xs: &[f64],
        ys: &[f64],
    ) -> PlotSeries {
        let mut points: Vec<(f64, f64)> = xs
            .iter()
            .zip(ys)
            .filter(|(x, y)| plottable(**x) && plottable(**y))
            .map(|(x, y)| (*x, *y))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let trend = if self.trend.enabled {
            let (fit_xs, fit_ys): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
            fit_polynomial(&fit_xs, &fit_ys, self.trend.degree)
                .map(|fit: PolynomialFit| fit.sample(self.trend.samples))
                .map(|samples| {
                    samples
                        .into_iter()
                        .filter(|(x, y)| plottable(*x) && plottable(*y))
                        .collect::<Vec<_>>()
                })
                .filter(|samples| !samples.is_empty())
        } else {
            None
        };
        if self.trend.enabled && trend.is_none() {
            log::debug!(
                "Not enough points for a degree {} trend on {} ({} valid)",
                self.trend.degree,
                property,
                points.len()
            );
        }

        PlotSeries {
            label: label.to_string(),
            style: style_for(property),
            points,
            trend,
        }
    }

    fn render(
        &self,
        spec: PlotSpec,
        property: Option<VolumetricProperty>,
        has_trend: bool,
    ) -> MixResult<ChartImage> {
        let (width, height) = (self.charts.width, self.charts.height);

        let (png, annotated) = match draw_chart(&spec, width, height, true, self.charts.connect_points) {
            Ok(png) => (png, true),
            Err(e) => {
                log::warn!(
                    "Annotated rendering of '{}' failed ({}); drawing without text",
                    spec.title,
                    e
                );
                let png = draw_chart(&spec, width, height, false, self.charts.connect_points)
                    .map_err(|e| MixError::Chart(format!("{}: {:#}", spec.title, e)))?;
                (png, false)
            }
        };

        Ok(ChartImage {
            property,
            title: spec.title,
            png,
            width,
            height,
            has_trend,
            annotated,
        })
    }
}

type PlotChart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_chart(
    spec: &PlotSpec,
    width: u32,
    height: u32,
    annotated: bool,
    connect_points: bool,
) -> anyhow::Result<Vec<u8>> {
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    let (x_range, y_range) = spec.bounds();

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        if annotated {
            let mut chart = ChartBuilder::on(&root)
                .caption(&spec.title, ("sans-serif", 20))
                .margin(12)
                .x_label_area_size(40)
                .y_label_area_size(55)
                .build_cartesian_2d(x_range, y_range)?;
            chart
                .configure_mesh()
                .x_desc(spec.x_desc.as_str())
                .y_desc(spec.y_desc.as_str())
                .draw()?;
            draw_series(&mut chart, &spec.series, true, connect_points)?;
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()?;
        } else {
            let mut chart = ChartBuilder::on(&root)
                .margin(12)
                .build_cartesian_2d(x_range.clone(), y_range.clone())?;
            draw_grid(&mut chart, &x_range, &y_range)?;
            draw_series(&mut chart, &spec.series, false, connect_points)?;
        }

        root.present()?;
    }

    encode_png(pixels, width, height)
}

fn draw_grid(chart: &mut PlotChart<'_, '_>, x: &Range<f64>, y: &Range<f64>) -> anyhow::Result<()> {
    let grid = BLACK.mix(0.15);
    let x_step = (x.end - x.start) / GRID_LINES as f64;
    let y_step = (y.end - y.start) / GRID_LINES as f64;
    for i in 0..=GRID_LINES {
        let gx = x.start + x_step * i as f64;
        let gy = y.start + y_step * i as f64;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(gx, y.start), (gx, y.end)],
            grid,
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x.start, gy), (x.end, gy)],
            grid,
        )))?;
    }
    Ok(())
}

fn draw_series(
    chart: &mut PlotChart<'_, '_>,
    series: &[PlotSeries],
    with_legend: bool,
    connect_points: bool,
) -> anyhow::Result<()> {
    for s in series {
        let color = s.style.color;

        if connect_points && s.points.len() > 1 {
            chart.draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(1)))?;
        }

        let points = s.points.iter().copied();
        match s.style.marker {
            MarkerShape::Circle => {
                let mut anno = chart.draw_series(
                    points.map(|p| Circle::new(p, MARKER_SIZE, color.filled())),
                )?;
                if with_legend {
                    anno.label(s.label.as_str())
                        .legend(move |(x, y)| Circle::new((x, y), MARKER_SIZE, color.filled()));
                }
            }
            MarkerShape::Square => {
                let mut anno = chart.draw_series(points.map(|p| {
                    EmptyElement::at(p)
                        + Rectangle::new(
                            [(-MARKER_SIZE, -MARKER_SIZE), (MARKER_SIZE, MARKER_SIZE)],
                            color.filled(),
                        )
                }))?;
                if with_legend {
                    anno.label(s.label.as_str()).legend(move |(x, y)| {
                        Rectangle::new(
                            [(x - MARKER_SIZE, y - MARKER_SIZE), (x + MARKER_SIZE, y + MARKER_SIZE)],
                            color.filled(),
                        )
                    });
                }
            }
            MarkerShape::Triangle => {
                let mut anno = chart.draw_series(
                    points.map(|p| TriangleMarker::new(p, MARKER_SIZE + 1, color.filled())),
                )?;
                if with_legend {
                    anno.label(s.label.as_str()).legend(move |(x, y)| {
                        TriangleMarker::new((x, y), MARKER_SIZE + 1, color.filled())
                    });
                }
            }
        }

        if let Some(curve) = &s.trend {
            let mut anno = chart.draw_series(DashedLineSeries::new(
                curve.iter().copied(),
                6,
                4,
                color.mix(0.7).stroke_width(2),
            ))?;
            if with_legend {
                anno.label(format!("{} trend", s.label)).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.mix(0.7).stroke_width(2))
                });
            }
        }
    }
    Ok(())
}

fn encode_png(pixels: Vec<u8>, width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
    let image = RgbImage::from_raw(width, height, pixels)
        .context("Pixel buffer does not match chart dimensions")?;
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn renderer() -> TrendRenderer {
        TrendRenderer::from_config(&AnalysisConfig::default())
    }

    #[test]
    fn test_styles_are_fixed() {
        assert_eq!(style_for(VolumetricProperty::AirVoids).marker, MarkerShape::Circle);
        assert_eq!(style_for(VolumetricProperty::Vma).color, RGBColor(0, 128, 0));
        assert_eq!(style_for(VolumetricProperty::Vfb).marker, MarkerShape::Triangle);
    }

    #[test]
    fn test_render_series_produces_png() {
        let xs = [4.5, 5.0, 5.5, 6.0, 6.5];
        let ys = [6.1, 4.9, 4.0, 3.2, 2.8];
        let image = renderer()
            .render_series(VolumetricProperty::AirVoids, &xs, &ys)
            .unwrap();

        assert_eq!(&image.png[..8], &PNG_SIGNATURE);
        assert!(image.has_trend);
        assert_eq!(image.title, "Air Voids vs. Bitumen Content");
        assert_eq!(image.file_name(), "air_voids.png");
    }

    #[test]
    fn test_trend_omitted_with_too_few_points() {
        let xs = [4.5, 5.0, f64::NAN];
        let ys = [15.0, 15.5, 16.0];
        let image = renderer()
            .render_series(VolumetricProperty::Vma, &xs, &ys)
            .unwrap();

        assert!(!image.has_trend);
        assert!(!image.png.is_empty());
    }

    #[test]
    fn test_render_without_any_valid_points() {
        let image = renderer()
            .render_series(VolumetricProperty::Vfb, &[f64::NAN], &[f64::NAN])
            .unwrap();
        assert!(!image.has_trend);
        assert_eq!(&image.png[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_repeated_renders_are_identical() {
        let xs = [4.5, 5.0, 5.5, 6.0];
        let ys = [70.0, 74.0, 78.0, 81.0];
        let r = renderer();
        let first = r.render_series(VolumetricProperty::Vfb, &xs, &ys).unwrap();
        let second = r.render_series(VolumetricProperty::Vfb, &xs, &ys).unwrap();
        assert_eq!(first.png, second.png);
    }

    #[test]
    fn test_bare_chart_draws_without_text() {
        let spec = PlotSpec {
            title: "bare".to_string(),
            x_desc: String::new(),
            y_desc: String::new(),
            series: vec![PlotSeries {
                label: "Va".to_string(),
                style: style_for(VolumetricProperty::AirVoids),
                points: vec![(4.5, 4.0), (5.0, 3.5)],
                trend: None,
            }],
        };
        let png = draw_chart(&spec, 320, 240, false, true).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_padded_ranges() {
        assert_eq!(padded(f64::INFINITY, f64::NEG_INFINITY), 0.0..1.0);
        assert_eq!(padded(5.0, 5.0), 4.0..6.0);
        let r = padded(0.0, 10.0);
        assert!((r.start + 0.5).abs() < 1e-12 && (r.end - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_padded_ranges_stay_finite_at_extremes() {
        let r = padded(-PLOT_LIMIT, PLOT_LIMIT);
        assert!(r.start.is_finite() && r.end.is_finite());
        assert!(r.start < -PLOT_LIMIT && r.end > PLOT_LIMIT);
        assert!((r.end - r.start).is_finite());

        let r = padded(1e300, 1e300);
        assert!(r.start < 1e300 && r.end > 1e300);

        assert_eq!(padded(-1.7e308, 1.7e308), 0.0..1.0);
    }

    #[test]
    fn test_render_series_skips_values_too_large_to_plot() {
        let xs = [4.5, 5.0, 5.5];
        let ys = [-1.7e308, 4.0, 1.7e308];
        let image = renderer()
            .render_series(VolumetricProperty::AirVoids, &xs, &ys)
            .unwrap();
        assert_eq!(&image.png[..8], &PNG_SIGNATURE);
        assert!(!image.has_trend);

        let series = renderer().plot_series(VolumetricProperty::AirVoids, "Va", &xs, &ys);
        assert_eq!(series.points, vec![(5.0, 4.0)]);
    }
}
