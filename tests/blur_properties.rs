//! Box blur properties

use glengine::pipeline::blur::{box_blur, MAX_BLUR_SIZE};
use glengine::pipeline::raster::Raster;
use proptest::prelude::*;

fn raster_strategy() -> impl Strategy<Value = Raster<f32>> {
    (1usize..12, 1usize..12).prop_flat_map(|(w, h)| {
        prop::collection::vec(0.0f32..=1.0, w * h)
            .prop_map(move |data| Raster::from_vec(w, h, data).unwrap())
    })
}

proptest! {
    #[test]
    fn zero_size_returns_input(input in raster_strategy()) {
        prop_assert_eq!(box_blur(&input, 0), input);
    }

    #[test]
    fn constant_image_stays_constant(w in 1usize..16, h in 1usize..16, value in 0.0f32..=1.0, size in 1u32..=8) {
        let out = box_blur(&Raster::new(w, h, value), size);
        prop_assert!(out.as_slice().iter().all(|v| (v - value).abs() < 1e-5));
    }

    #[test]
    fn output_stays_within_input_range(input in raster_strategy(), size in 0u32..=6) {
        let min = input.as_slice().iter().cloned().fold(f32::INFINITY, f32::min);
        let max = input.as_slice().iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let out = box_blur(&input, size);
        prop_assert_eq!((out.width(), out.height()), (input.width(), input.height()));
        for v in out.as_slice() {
            prop_assert!(*v >= min - 1e-5 && *v <= max + 1e-5);
        }
    }
}

#[test]
fn size_above_maximum_is_capped() {
    let input = Raster::from_fn(40, 3, |x, _| x as f32);
    assert_eq!(box_blur(&input, MAX_BLUR_SIZE + 10), box_blur(&input, MAX_BLUR_SIZE));
}
