//! Plotters-powered sales chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

pub(super) const RETAIL_RGB: RGBColor = RGBColor(0, 255, 255);
pub(super) const WAREHOUSE_RGB: RGBColor = RGBColor(255, 200, 0);

/// Terminal colour for a series, so the legend matches what Plotters draws.
pub(super) fn legend_color(c: RGBColor) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call (see
/// `tui::chart_series`), so `render()` only draws.
pub struct SalesPlottersChart<'a> {
    /// Retail sales per period, x = period index.
    pub retail: &'a [(f64, f64)],
    /// Warehouse sales per period, x = period index.
    pub warehouse: &'a [(f64, f64)],
    /// Period keys, indexed by x.
    pub labels: &'a [String],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl SalesPlottersChart<'_> {
    fn label_at(&self, x: f64) -> String {
        if x < -0.5 {
            return String::new();
        }
        let idx = x.round() as usize;
        self.labels.get(idx).cloned().unwrap_or_default()
    }
}

impl Widget for SalesPlottersChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let x_labels = self.labels.len().clamp(2, 6);

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(x_labels)
                .y_labels(5)
                .x_label_formatter(&|v| self.label_at(*v))
                .y_label_formatter(&|v| super::fmt_axis_amount(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            chart.draw_series(LineSeries::new(self.warehouse.iter().copied(), &WAREHOUSE_RGB))?;
            chart.draw_series(LineSeries::new(self.retail.iter().copied(), &RETAIL_RGB))?;

            // Plain pixels for the period markers; circle radii come out far
            // too large through the ratatui canvas backend.
            chart.draw_series(
                self.warehouse
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), WAREHOUSE_RGB)),
            )?;
            chart.draw_series(
                self.retail
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), RETAIL_RGB)),
            )?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
