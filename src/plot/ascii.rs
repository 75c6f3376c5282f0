//! ASCII plotting for terminal output.
//!
//! Fixed-size grids with deterministic output (golden-tested):
//! - incidents per date: `o` points joined by `-`
//! - value histogram: `#` bars

use crate::aggregate::{DailyCount, HistogramBin};

const EMPTY_PLOT: &str = "Plot: (aucun incident)\n";

/// Incidents per date over `[first date, last date]`.
pub fn render_daily_plot(series: &[DailyCount], width: usize, height: usize) -> String {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return EMPTY_PLOT.to_string();
    };
    let width = width.max(10);
    let height = height.max(5);

    let span = (last.date - first.date).num_days() as f64;
    let max = series.iter().map(|d| d.count).max().unwrap_or(1) as f64;

    let points: Vec<(usize, usize)> = series
        .iter()
        .map(|d| {
            let x = if span > 0.0 {
                map_x((d.date - first.date).num_days() as f64, span, width)
            } else {
                0
            };
            (x, map_y(d.count as f64, max, height))
        })
        .collect();

    let mut grid = vec![vec![' '; width]; height];
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        draw_line(&mut grid, x0, y0, x1, y1, '-');
    }
    for &(x, y) in &points {
        grid[y][x] = 'o';
    }

    let mut out = format!(
        "Plot: dates=[{}, {}] | incidents/jour=[0, {max}]\n",
        first.date, last.date
    );
    push_grid(&mut out, grid);
    out
}

/// Vertical bars, one group of columns per bin.
pub fn render_histogram(bins: &[HistogramBin], width: usize, height: usize) -> String {
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        return EMPTY_PLOT.to_string();
    };
    let height = height.max(3);
    let col_w = (width / bins.len()).max(1);
    let max = bins.iter().map(|b| b.count).max().unwrap_or(0);
    let total: usize = bins.iter().map(|b| b.count).sum();

    // Non-empty bins always get at least one row.
    let bars: Vec<usize> = bins
        .iter()
        .map(|b| {
            if max == 0 {
                0
            } else {
                (b.count as f64 / max as f64 * height as f64).ceil() as usize
            }
        })
        .collect();

    let grid: Vec<Vec<char>> = (0..height)
        .map(|row| {
            let level = height - row;
            bars.iter()
                .flat_map(|&bar| std::iter::repeat_n(if bar >= level { '#' } else { ' ' }, col_w))
                .collect()
        })
        .collect();

    let mut out = format!(
        "Plot: prix=[{:.2}, {:.2}] $ | n={total} | max/bin={max}\n",
        first.lo, last.hi
    );
    push_grid(&mut out, grid);
    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn map_x(t: f64, t_max: f64, width: usize) -> usize {
    let u = (t / t_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

/// Row for `y` on a `[0, y_max]` axis; row 0 is the top.
fn map_y(y: f64, y_max: f64, height: usize) -> usize {
    let u = if y_max > 0.0 { (y / y_max).clamp(0.0, 1.0) } else { 0.0 };
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Only blank cells are painted.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
