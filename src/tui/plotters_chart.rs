//! Plotters-powered "incidents per date" chart widget for Ratatui.
//!
//! Plotters output is rendered into the Ratatui buffer with `plotters-ratatui-backend`.

use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::aggregate::DailyCount;

/// Render-only chart description. Series and bounds are computed by `from_series`.
pub struct DailyCountChart {
    /// `(day number, count)` points, ascending by day.
    pub points: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl DailyCountChart {
    /// Dates are placed on a day-number axis (days since 0001-01-01).
    pub fn from_series(series: &[DailyCount]) -> Option<Self> {
        let first = series.first()?;
        let last = series.last()?;

        let points: Vec<(f64, f64)> = series
            .iter()
            .map(|d| (day_number(d.date), d.count as f64))
            .collect();

        let (mut x0, mut x1) = (day_number(first.date), day_number(last.date));
        if x1 <= x0 {
            x0 -= 1.0;
            x1 += 1.0;
        }
        let y_max = series.iter().map(|d| d.count).max().unwrap_or(0) as f64;

        Some(Self {
            points,
            x_bounds: [x0, x1],
            y_bounds: [0.0, y_max + 1.0],
        })
    }
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn fmt_day(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%d/%m").to_string())
        .unwrap_or_default()
}

fn fmt_count(v: f64) -> String {
    format!("{v:.0}")
}

impl Widget for DailyCountChart {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters cannot lay out a chart in a tiny area.
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

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 4)
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(5)
                .y_labels(4)
                .x_label_formatter(&|v| fmt_day(*v))
                .y_label_formatter(&|v| fmt_count(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let line_color = RGBColor(0, 255, 255); // cyan
            let point_color = RGBColor(255, 255, 0); // yellow

            chart.draw_series(LineSeries::new(self.points.iter().copied(), &line_color))?;

            // `Circle` radii are mis-scaled by the ratatui backend; a pixel reads as a dot.
            chart.draw_series(self.points.iter().map(|&(x, y)| Pixel::new((x, y), point_color)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_day_gets_a_non_empty_range() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let chart = DailyCountChart::from_series(&[DailyCount { date, count: 3 }]).unwrap();
        assert!(chart.x_bounds[1] > chart.x_bounds[0]);
        assert_eq!(chart.y_bounds, [0.0, 4.0]);
        assert_eq!(fmt_day(chart.points[0].0), "05/01");
    }

    #[test]
    fn empty_series_has_no_chart() {
        assert!(DailyCountChart::from_series(&[]).is_none());
    }
}
