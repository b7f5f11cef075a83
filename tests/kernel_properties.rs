//! SSAO kernel and noise tile properties

use glengine::pipeline::kernel::{kernel_scale, sample_rng, NoiseTile, OcclusionSampleKernel, MAX_KERNEL_SIZE};
use glengine::Error;
use proptest::prelude::*;

proptest! {
    #[test]
    fn kernel_has_requested_length_inside_unit_hemisphere(size in 0usize..=MAX_KERNEL_SIZE, seed in any::<u64>()) {
        let kernel = OcclusionSampleKernel::generate(size, &mut sample_rng(Some(seed))).unwrap();
        prop_assert_eq!(kernel.len(), size);
        for sample in kernel.samples() {
            prop_assert!(sample.length() <= 1.0 + 1e-6, "{sample}");
            prop_assert!(sample.z >= 0.0, "{sample}");
        }
    }

    #[test]
    fn scale_is_non_decreasing(size in 1usize..=MAX_KERNEL_SIZE) {
        let scales: Vec<f32> = (0..size).map(|i| kernel_scale(i, size)).collect();
        prop_assert!(scales.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(scales.iter().all(|s| (0.1..=1.0).contains(s)));
    }

    #[test]
    fn noise_texels_lie_in_tangent_plane(seed in any::<u64>()) {
        let tile = NoiseTile::generate(&mut sample_rng(Some(seed)));
        for t in tile.texels() {
            prop_assert_eq!(t.z, 0.0);
            prop_assert!(t.x.abs() <= 1.0 && t.y.abs() <= 1.0);
        }
    }
}

#[test]
fn oversized_kernel_is_rejected() {
    let err = OcclusionSampleKernel::generate(MAX_KERNEL_SIZE + 1, &mut sample_rng(Some(1))).unwrap_err();
    assert!(matches!(err, Error::KernelTooLarge { requested: 65, max: 64 }));
}

#[test]
fn same_seed_gives_same_kernel() {
    let a = OcclusionSampleKernel::with_seed(Some(99)).unwrap();
    let b = OcclusionSampleKernel::with_seed(Some(99)).unwrap();
    let c = OcclusionSampleKernel::with_seed(Some(100)).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn noise_wraps_every_four_texels() {
    let tile = NoiseTile::generate(&mut sample_rng(Some(5)));
    assert_eq!(tile.texel_wrapped(1, 2), tile.texel_wrapped(5, 6));
    assert_eq!(tile.texel_wrapped(-1, 0), tile.texel_wrapped(3, 0));
}
