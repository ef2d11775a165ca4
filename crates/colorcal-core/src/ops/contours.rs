//! Border following on binary images.

use super::to_luma;
use crate::contour::{from_points, Contour};
use crate::GrayImage;
use imageproc::contours::{self, BorderType};

/// Borders of the nonzero pixels of `src`: the outer border of every
/// 8-connected component, followed by the border around every enclosed hole.
/// Both kinds run over foreground pixels.
pub(crate) fn find_contours(src: &GrayImage) -> Vec<Contour> {
    let (outer, holes): (Vec<_>, Vec<_>) = contours::find_contours::<i32>(&to_luma(src))
        .into_iter()
        .partition(|c| matches!(c.border_type, BorderType::Outer));
    outer
        .into_iter()
        .chain(holes)
        .map(|c| from_points(&c.points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::{approx_polygon, arc_length, contour_area};
    use nalgebra::Point2;

    fn frame(img: &mut GrayImage, x0: usize, y0: usize, x1: usize, y1: usize) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                if x == x0 || x == x1 || y == y0 || y == y1 {
                    img.set(x, y, 255);
                }
            }
        }
    }

    #[test]
    fn traces_filled_rectangle() {
        let mut img = GrayImage::new(20, 20);
        for y in 4..10 {
            for x in 5..15 {
                img.set(x, y, 255);
            }
        }
        let contours = find_contours(&img);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        // Perimeter pixels of a 10x6 block.
        assert_eq!(c.len(), 2 * (10 + 6) - 4);
        assert_eq!(contour_area(c), 9.0 * 5.0);
    }

    #[test]
    fn frame_yields_outer_border_and_hole() {
        let mut img = GrayImage::new(30, 30);
        frame(&mut img, 5, 5, 24, 24);
        let contours = find_contours(&img);
        assert_eq!(contours.len(), 2);
        let hole = &contours[1];
        // Traced over the frame pixels that face the hole.
        let area = contour_area(hole);
        assert!(area > 17.0 * 17.0 && area <= 19.0 * 19.0, "hole area {area}");
        let quad = approx_polygon(hole, 0.08 * arc_length(hole));
        assert_eq!(quad.len(), 4);
    }

    #[test]
    fn single_pixel_and_line() {
        let mut img = GrayImage::new(8, 8);
        img.set(2, 2, 255);
        img.set(5, 5, 255);
        img.set(6, 5, 255);
        let contours = find_contours(&img);
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().any(|c| c == &vec![Point2::new(2, 2)]));
        let line = contours.iter().find(|c| c.len() > 1).unwrap();
        assert!(line.contains(&Point2::new(5, 5)) && line.contains(&Point2::new(6, 5)));
    }

    #[test]
    fn background_touching_edge_is_not_a_hole() {
        let mut img = GrayImage::new(10, 10);
        for y in 0..10 {
            img.set(4, y, 255);
        }
        assert_eq!(find_contours(&img).len(), 1);
    }
}
