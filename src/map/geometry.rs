use crate::braille::BrailleCanvas;
use crate::color::Rgb;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.paint(x, y, color);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a filled circle (marker body)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32, color: Rgb) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.paint(cx + dx, cy + dy, color);
            }
        }
    }
}

/// Draw a circle outline with the midpoint algorithm (globe limb, inner glow)
pub fn draw_ring(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32, color: Rgb) {
    if radius <= 0 {
        canvas.paint(cx, cy, color);
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [
            (x, y), (y, x), (-y, x), (-x, y),
            (-x, -y), (-y, -x), (y, -x), (x, -y),
        ] {
            canvas.paint(cx + px, cy + py, color);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Fill a screen-space triangle with a bounding-box edge-function scan.
/// Used for highlighted country fills.
pub fn fill_triangle(canvas: &mut BrailleCanvas, a: (i32, i32), b: (i32, i32), c: (i32, i32), color: Rgb) {
    let min_x = a.0.min(b.0).min(c.0).max(0);
    let max_x = a.0.max(b.0).max(c.0).min(canvas.width() as i32 * 2 - 1);
    let min_y = a.1.min(b.1).min(c.1).max(0);
    let max_y = a.1.max(b.1).max(c.1).min(canvas.height() as i32 * 4 - 1);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let edge = |p: (i32, i32), q: (i32, i32), x: i32, y: i32| -> i64 {
        (q.0 - p.0) as i64 * (y - p.1) as i64 - (q.1 - p.1) as i64 * (x - p.0) as i64
    };
    let area = edge(a, b, c.0, c.1);
    if area == 0 {
        draw_line(canvas, a.0, a.1, b.0, b.1, color);
        draw_line(canvas, b.0, b.1, c.0, c.1, color);
        return;
    }

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let w0 = edge(b, c, x, y);
            let w1 = edge(c, a, x, y);
            let w2 = edge(a, b, x, y);
            let inside = if area > 0 {
                w0 >= 0 && w1 >= 0 && w2 >= 0
            } else {
                w0 <= 0 && w1 <= 0 && w2 <= 0
            };
            if inside {
                canvas.paint(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0, Rgb::WHITE);
        // Top dots of all five cells
        assert_eq!(canvas.to_string(), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7, Rgb::WHITE);
        assert_eq!(canvas.to_string(), "⡇\n⡇");
    }

    #[test]
    fn test_fill_triangle_winding_independent() {
        let mut cw = BrailleCanvas::new(4, 2);
        let mut ccw = BrailleCanvas::new(4, 2);
        fill_triangle(&mut cw, (0, 0), (7, 0), (0, 7), Rgb::WHITE);
        fill_triangle(&mut ccw, (0, 0), (0, 7), (7, 0), Rgb::WHITE);
        assert_eq!(cw.to_string(), ccw.to_string());
        assert!(!cw.is_blank());
    }

    #[test]
    fn test_ring_is_hollow() {
        let mut canvas = BrailleCanvas::new(10, 5);
        draw_ring(&mut canvas, 10, 10, 8, Rgb::WHITE);
        let centre = canvas.cells().find(|&(col, row, _, _)| col == 5 && row == 2);
        assert!(centre.is_none());
    }
}
