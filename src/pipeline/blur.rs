//! Square box blur over the occlusion buffer.

use super::raster::Raster;

/// Largest blur radius; the kernel side is `2 * blur_size + 1`.
pub const MAX_BLUR_SIZE: u32 = 16;

/// Average over the `(2 * blur_size + 1)²` neighbourhood of every texel, with
/// clamp-to-edge reads past the border. `blur_size` 0 returns a copy.
pub fn box_blur(input: &Raster<f32>, blur_size: u32) -> Raster<f32> {
    let radius = blur_size.min(MAX_BLUR_SIZE) as i64;
    if radius == 0 {
        return input.clone();
    }

    let side = (2 * radius + 1) as f32;
    let norm = side * side;
    Raster::from_fn(input.width(), input.height(), |x, y| {
        let (cx, cy) = (x as i64, y as i64);
        let mut total = 0.0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                total += input.load_clamped(cx + dx, cy + dy);
            }
        }
        total / norm
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_identity() {
        let input = Raster::from_fn(5, 4, |x, y| (x * 7 + y * 3) as f32 / 40.0);
        assert_eq!(box_blur(&input, 0), input);
    }

    #[test]
    fn test_uniform_input_stays_uniform() {
        let input = Raster::new(9, 6, 0.5);
        let out = box_blur(&input, 3);
        assert!(out.as_slice().iter().all(|v| *v == 0.5));
    }

    #[test]
    fn test_single_spike_spreads_evenly() {
        let mut input = Raster::new(7, 7, 0.0);
        input.set(3, 3, 9.0);
        let out = box_blur(&input, 1);
        for y in 2..=4 {
            for x in 2..=4 {
                assert!((out.get(x, y).unwrap() - 1.0).abs() < 1e-6);
            }
        }
        assert_eq!(out.get(0, 0), Some(0.0));
    }

    #[test]
    fn test_edges_are_clamped() {
        // Left column 1, rest 0: the clamped border repeats the 1s
        let input = Raster::from_fn(4, 1, |x, _| if x == 0 { 1.0 } else { 0.0 });
        let out = box_blur(&input, 1);
        assert!((out.get(0, 0).unwrap() - 2.0 / 3.0).abs() < 1e-6);
        assert!((out.get(1, 0).unwrap() - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_size_is_capped() {
        let input = Raster::from_fn(40, 40, |x, y| ((x + y) % 5) as f32);
        assert_eq!(box_blur(&input, 100), box_blur(&input, MAX_BLUR_SIZE));
    }
}
