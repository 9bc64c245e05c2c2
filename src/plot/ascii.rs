//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output:
//! - cross-validation curve: mean CV score against `ln λ`, with `M` marking
//!   `lambda.min` and `S` marking `lambda.1se`
//! - ROC curve: `*` for the curve, `.` for the chance diagonal

use crate::fit::CvFit;
use crate::metrics::{RocPoint, auc_from_roc};

/// Render the CV curve of a cross-validated path.
pub fn render_cv_plot(cv: &CvFit, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let points: Vec<(f64, f64)> = cv
        .lambdas
        .iter()
        .zip(&cv.cvm)
        .filter(|(_, m)| m.is_finite())
        .map(|(l, m)| (l.ln(), *m))
        .collect();

    let Some((x_min, x_max)) = range(points.iter().map(|p| p.0)) else {
        return "CV plot: not enough finite points\n".to_string();
    };
    let (y_min, y_max) = range(points.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    draw_curve(&mut grid, &points, (x_min, x_max), (y_min, y_max), '-');

    for (index, ch) in [(cv.index_1se, 'S'), (cv.index_min, 'M')] {
        let (l, m) = (cv.lambdas[index], cv.cvm[index]);
        if m.is_finite() {
            let x = map_x(l.ln(), x_min, x_max, width);
            let y = map_y(m, y_min, y_max, height);
            grid[y][x] = ch;
        }
    }

    let mut out = format!(
        "CV {}: ln(lambda)=[{x_min:.2}, {x_max:.2}] | {}=[{y_min:.4}, {y_max:.4}] | M=lambda.min S=lambda.1se\n",
        cv.measure.name(),
        cv.measure.name()
    );
    push_grid(&mut out, grid);
    out
}

/// Render an ROC curve on the unit square.
pub fn render_roc_plot(points: &[RocPoint], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some(auc) = auc_from_roc(points) else {
        return "ROC plot: both classes are required\n".to_string();
    };

    let unit = (0.0, 1.0);
    let curve: Vec<(f64, f64)> = points.iter().map(|p| (p.fpr, p.tpr)).collect();

    let mut grid = vec![vec![' '; width]; height];
    draw_curve(&mut grid, &curve, unit, unit, '*');
    draw_curve(&mut grid, &[(0.0, 0.0), (1.0, 1.0)], unit, unit, '.');

    let mut out = format!("ROC (AUC={auc:.4}) | x=false positive rate, y=true positive rate\n");
    push_grid(&mut out, grid);
    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else if min.is_finite() && max.is_finite() {
        Some((min - 0.5, max + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Connect consecutive points; only blank cells are written.
fn draw_curve(grid: &mut [Vec<char>], points: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64), ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in points {
        let cx = map_x(x, xr.0, xr.1, width);
        let cy = map_y(y, yr.0, yr.1, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, cx, cy, ch),
            None if grid[cy][cx] == ' ' => grid[cy][cx] = ch,
            None => {}
        }
        prev = Some((cx, cy));
    }
}

/// Integer line drawing (Bresenham-ish).
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Family, Measure};
    use crate::fit::PathFit;
    use crate::metrics::roc_curve;
    use nalgebra::DVector;

    #[test]
    fn roc_golden_snapshot_small() {
        let roc = roc_curve(&[0.9, 0.8, 0.2, 0.1], &[1.0, 1.0, 0.0, 0.0]);
        let txt = render_roc_plot(&roc, 10, 5);
        let expected = concat!(
            "ROC (AUC=1.0000) | x=false positive rate, y=true positive rate\n",
            "**********\n",
            "*     ..  \n",
            "*   ..    \n",
            "* ..      \n",
            "*.        \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn roc_without_both_classes_is_a_message() {
        let txt = render_roc_plot(&[], 10, 5);
        assert!(txt.starts_with("ROC plot"));
    }

    #[test]
    fn cv_plot_marks_selected_lambdas() {
        let lambdas = vec![1.0, 0.5, 0.25, 0.125];
        let cv = CvFit {
            measure: Measure::Mse,
            lambdas: lambdas.clone(),
            cvm: vec![4.0, 2.0, 1.0, 1.5],
            cvsd: vec![0.5; 4],
            nzero: vec![0, 1, 2, 2],
            index_min: 2,
            index_1se: 1,
            fold_sizes: vec![5, 5, 5],
            path: PathFit {
                family: Family::Gaussian,
                lambdas,
                intercepts: vec![0.0; 4],
                betas: vec![DVector::zeros(2); 4],
                converged: vec![true; 4],
            },
        };

        let txt = render_cv_plot(&cv, 20, 8);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("CV mse:"));
        assert_eq!(txt.matches('M').count() - lines[0].matches('M').count(), 1);
        assert_eq!(txt.matches('S').count() - lines[0].matches('S').count(), 1);
        // Largest λ has the worst score: top-right corner.
        assert_eq!(lines[1].chars().last(), Some('-'));
    }
}
