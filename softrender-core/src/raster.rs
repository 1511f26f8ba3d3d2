/// Line and triangle rasterization into a [`Framebuffer`]
use image::Rgb;
use nalgebra::{Point2, Vector3};

use crate::framebuffer::Framebuffer;
use crate::pipeline::ScreenVertex;

/// Triangles with less doubled screen area than this are treated as collinear.
const AREA_EPSILON: f32 = 1e-6;

/// Bresenham line between two window-space points, no depth test.
///
/// The segment is first clipped to the buffer rectangle, so an endpoint far
/// outside the viewport costs nothing extra. Pixels that still fall outside
/// are dropped by the framebuffer.
pub fn draw_line(fb: &mut Framebuffer, from: Point2<f32>, to: Point2<f32>, color: Rgb<u8>) {
    let finite = from.x.is_finite() && from.y.is_finite() && to.x.is_finite() && to.y.is_finite();
    if !finite {
        return;
    }
    let Some((from, to)) = clip_segment(from, to, fb.width() as f32, fb.height() as f32) else {
        return;
    };

    let (mut x0, mut y0) = (from.x.floor() as i64, from.y.floor() as i64);
    let (x1, y1) = (to.x.floor() as i64, to.y.floor() as i64);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        fb.put_color(x0, y0, color);
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

/// Liang–Barsky clip of a segment against `[0, width] x [0, height]`.
fn clip_segment(
    from: Point2<f32>,
    to: Point2<f32>,
    width: f32,
    height: f32,
) -> Option<(Point2<f32>, Point2<f32>)> {
    let delta = to - from;
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;
    let boundaries = [
        (-delta.x, from.x),
        (delta.x, width - from.x),
        (-delta.y, from.y),
        (delta.y, height - from.y),
    ];
    for (p, q) in boundaries {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t_exit {
                return None;
            }
            t_enter = t_enter.max(t);
        } else {
            if t < t_enter {
                return None;
            }
            t_exit = t_exit.min(t);
        }
    }
    Some((from + delta * t_enter, from + delta * t_exit))
}

/// Twice the signed area of `(a, b, p)`; positive when `p` is on the
/// interior side of `a -> b` for a triangle with positive area.
fn edge(a: &Point2<f32>, b: &Point2<f32>, p: &Point2<f32>) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Top-left ownership for an edge of a positively oriented triangle in
/// window space (y down): a top edge is horizontal and runs towards +x, a
/// left edge runs upwards.
fn is_top_left(a: &Point2<f32>, b: &Point2<f32>) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

fn color_to_vector(color: Rgb<u8>) -> Vector3<f32> {
    Vector3::new(
        f32::from(color.0[0]),
        f32::from(color.0[1]),
        f32::from(color.0[2]),
    )
}

fn vector_to_color(v: Vector3<f32>) -> Rgb<u8> {
    let channel = |c: f32| c.round().clamp(0.0, 255.0) as u8;
    Rgb([channel(v.x), channel(v.y), channel(v.z)])
}

/// Depth-tested fill of one projected triangle. Returns the number of
/// pixels written.
///
/// Pixel centers `(x + 0.5, y + 0.5)` are sampled. A center exactly on an
/// edge belongs to the triangle only if that edge is a top or left edge, so
/// triangles sharing an edge never both cover the same sample. Depth is
/// interpolated linearly in screen space; color is interpolated
/// perspective-correctly through each vertex's `1 / w`. Collinear triangles
/// write nothing. Both windings are filled.
pub fn fill_triangle(
    fb: &mut Framebuffer,
    vertices: [ScreenVertex; 3],
    colors: [Rgb<u8>; 3],
) -> usize {
    let [v0, mut v1, mut v2] = vertices;
    let [c0, mut c1, mut c2] = colors;
    let mut area = edge(&v0.position, &v1.position, &v2.position);
    if !(area.abs() >= AREA_EPSILON) {
        return 0;
    }
    if area < 0.0 {
        std::mem::swap(&mut v1, &mut v2);
        std::mem::swap(&mut c1, &mut c2);
        area = -area;
    }
    let (p0, p1, p2) = (v0.position, v1.position, v2.position);
    let min_x = (p0.x.min(p1.x).min(p2.x).floor() as i64).max(0);
    let max_x = (p0.x.max(p1.x).max(p2.x).ceil() as i64).min(i64::from(fb.width()) - 1);
    let min_y = (p0.y.min(p1.y).min(p2.y).floor() as i64).max(0);
    let max_y = (p0.y.max(p1.y).max(p2.y).ceil() as i64).min(i64::from(fb.height()) - 1);

    let owns = [is_top_left(&p1, &p2), is_top_left(&p2, &p0), is_top_left(&p0, &p1)];
    let colors = [color_to_vector(c0), color_to_vector(c1), color_to_vector(c2)];
    let inv_w = [v0.inv_w, v1.inv_w, v2.inv_w];
    let depths = [v0.depth, v1.depth, v2.depth];

    let mut written = 0;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let sample = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let weights = [
                edge(&p1, &p2, &sample),
                edge(&p2, &p0, &sample),
                edge(&p0, &p1, &sample),
            ];
            let inside = weights
                .iter()
                .zip(owns)
                .all(|(&w, owned)| w > 0.0 || (w == 0.0 && owned));
            if !inside {
                continue;
            }

            let bary = weights.map(|w| w / area);
            let depth = bary[0] * depths[0] + bary[1] * depths[1] + bary[2] * depths[2];

            let perspective = [bary[0] * inv_w[0], bary[1] * inv_w[1], bary[2] * inv_w[2]];
            let norm = perspective[0] + perspective[1] + perspective[2];
            let color = (colors[0] * perspective[0]
                + colors[1] * perspective[1]
                + colors[2] * perspective[2])
                / norm;

            if fb.test_and_set(x, y, depth, vector_to_color(color)) {
                written += 1;
            }
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::{DEFAULT_CLEAR_COLOR, DEPTH_SENTINEL};

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    fn screen(x: f32, y: f32, depth: f32) -> ScreenVertex {
        ScreenVertex {
            position: Point2::new(x, y),
            depth,
            inv_w: 1.0,
        }
    }

    fn covered(fb: &Framebuffer) -> Vec<(u32, u32)> {
        fb.depth()
            .enumerate_pixels()
            .filter(|(_, _, d)| d.0[0] != DEPTH_SENTINEL)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_horizontal_line() {
        let mut fb = Framebuffer::new(8, 4, DEFAULT_CLEAR_COLOR).unwrap();
        draw_line(&mut fb, Point2::new(1.5, 2.5), Point2::new(6.5, 2.5), RED);
        for x in 0..8 {
            let expected = if (1..=6).contains(&x) { RED } else { DEFAULT_CLEAR_COLOR };
            assert_eq!(*fb.color().get_pixel(x, 2), expected, "x = {x}");
        }
        // Lines never touch depth.
        assert!(covered(&fb).is_empty());
    }

    #[test]
    fn test_line_with_far_endpoint_is_clipped() {
        let mut fb = Framebuffer::new(10, 10, DEFAULT_CLEAR_COLOR).unwrap();
        draw_line(&mut fb, Point2::new(0.0, 0.0), Point2::new(1.0e9, 1.0e9), GREEN);
        assert_eq!(*fb.color().get_pixel(0, 0), GREEN);
        assert_eq!(*fb.color().get_pixel(9, 9), GREEN);
        assert_eq!(*fb.color().get_pixel(0, 9), DEFAULT_CLEAR_COLOR);
    }

    #[test]
    fn test_line_fully_outside_draws_nothing() {
        let mut fb = Framebuffer::new(10, 10, DEFAULT_CLEAR_COLOR).unwrap();
        draw_line(&mut fb, Point2::new(-5.0, -1.0), Point2::new(-1.0, 20.0), GREEN);
        draw_line(&mut fb, Point2::new(f32::NAN, 0.0), Point2::new(5.0, 5.0), GREEN);
        assert!(fb.color().pixels().all(|p| *p == DEFAULT_CLEAR_COLOR));
    }

    #[test]
    fn test_clip_segment() {
        let (a, b) = clip_segment(Point2::new(-10.0, 5.0), Point2::new(30.0, 5.0), 20.0, 10.0).unwrap();
        assert_eq!(a, Point2::new(0.0, 5.0));
        assert_eq!(b, Point2::new(20.0, 5.0));
        assert!(clip_segment(Point2::new(-10.0, -5.0), Point2::new(30.0, -5.0), 20.0, 10.0).is_none());
    }

    #[test]
    fn test_shared_edge_covered_once() {
        let size = 4;
        let mut upper = Framebuffer::new(size, size, DEFAULT_CLEAR_COLOR).unwrap();
        let mut lower = Framebuffer::new(size, size, DEFAULT_CLEAR_COLOR).unwrap();
        let a = screen(0.0, 0.0, 0.0);
        let b = screen(4.0, 0.0, 0.0);
        let c = screen(4.0, 4.0, 0.0);
        let d = screen(0.0, 4.0, 0.0);
        let upper_count = fill_triangle(&mut upper, [a, b, c], [RED; 3]);
        // Opposite winding on purpose.
        let lower_count = fill_triangle(&mut lower, [a, d, c], [RED; 3]);

        let upper_pixels = covered(&upper);
        let lower_pixels = covered(&lower);
        assert_eq!(upper_count, upper_pixels.len());
        assert_eq!(lower_count, lower_pixels.len());
        assert_eq!(upper_count + lower_count, (size * size) as usize);
        assert!(upper_pixels.iter().all(|p| !lower_pixels.contains(p)));
    }

    #[test]
    fn test_collinear_triangle_skipped() {
        let mut fb = Framebuffer::new(8, 8, DEFAULT_CLEAR_COLOR).unwrap();
        let written = fill_triangle(
            &mut fb,
            [screen(0.0, 0.0, 0.0), screen(4.0, 4.0, 0.0), screen(8.0, 8.0, 0.0)],
            [RED; 3],
        );
        assert_eq!(written, 0);
        assert!(covered(&fb).is_empty());
    }

    #[test]
    fn test_depth_interpolation_and_test() {
        let mut fb = Framebuffer::new(8, 8, DEFAULT_CLEAR_COLOR).unwrap();
        let near = [screen(0.0, 0.0, 0.2), screen(8.0, 0.0, 0.2), screen(0.0, 8.0, 0.2)];
        let far = [screen(0.0, 0.0, 0.6), screen(8.0, 0.0, 0.6), screen(0.0, 8.0, 0.6)];
        assert!(fill_triangle(&mut fb, near, [RED; 3]) > 0);
        assert_eq!(fill_triangle(&mut fb, far, [BLUE; 3]), 0);
        assert_eq!(*fb.color().get_pixel(1, 1), RED);
        assert!((fb.depth().get_pixel(1, 1).0[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_color_interpolation_is_perspective_correct() {
        let mut fb = Framebuffer::new(16, 1, DEFAULT_CLEAR_COLOR).unwrap();
        // Left vertex four times closer than the right ones.
        let left = ScreenVertex { position: Point2::new(0.0, -4.0), depth: 0.0, inv_w: 1.0 };
        let right_top = ScreenVertex { position: Point2::new(16.0, -4.0), depth: 0.0, inv_w: 0.25 };
        let right_bottom = ScreenVertex { position: Point2::new(16.0, 8.0), depth: 0.0, inv_w: 0.25 };
        fill_triangle(&mut fb, [left, right_top, right_bottom], [RED, BLUE, BLUE]);
        let middle = fb.color().get_pixel(8, 0);
        // Screen-linear would give an even mix; the near vertex dominates.
        assert!(middle.0[0] > middle.0[2], "{middle:?}");
    }
}
