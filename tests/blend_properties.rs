use crossfader::{Weights, blend, frame_weights};
use image::{Rgb, RgbImage};

/// Deterministic noise image; the same seed always gives the same pixels.
fn noise(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    RgbImage::from_fn(width, height, |_, _| {
        let mut px = [0u8; 3];
        for c in &mut px {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *c = (state >> 56) as u8;
        }
        Rgb(px)
    })
}

#[test]
fn output_channels_stay_between_inputs() {
    let a = noise(17, 9, 1);
    let b = noise(17, 9, 2);
    for n in [1u32, 2, 5, 14] {
        for i in 0..n {
            let w = frame_weights(i, n).unwrap();
            let out = blend(&a, &b, w).unwrap();
            assert_eq!(out.dimensions(), (17, 9));
            for ((pa, pb), po) in a.pixels().zip(b.pixels()).zip(out.pixels()) {
                for c in 0..3 {
                    let lo = pa[c].min(pb[c]);
                    let hi = pa[c].max(pb[c]);
                    assert!(
                        (lo..=hi).contains(&po[c]),
                        "channel {} out of [{lo}, {hi}] for weights {w:?}",
                        po[c]
                    );
                }
            }
        }
    }
}

#[test]
fn endpoint_weights_are_identities() {
    let a = noise(8, 5, 3);
    let b = noise(8, 5, 4);
    assert_eq!(blend(&a, &b, Weights::new(1.0, 0.0).unwrap()).unwrap(), a);
    assert_eq!(blend(&a, &b, Weights::new(0.0, 1.0).unwrap()).unwrap(), b);
}

#[test]
fn equal_weights_commute() {
    let a = noise(11, 7, 5);
    let b = noise(11, 7, 6);
    let half = Weights::new(0.5, 0.5).unwrap();
    assert_eq!(blend(&a, &b, half).unwrap(), blend(&b, &a, half).unwrap());
}

#[test]
fn blending_is_deterministic() {
    let a = noise(13, 13, 7);
    let b = noise(13, 13, 8);
    let w = frame_weights(2, 7).unwrap();
    let x = blend(&a, &b, w).unwrap();
    let y = blend(&a, &b, w).unwrap();
    assert_eq!(x.as_raw(), y.as_raw());
}

#[test]
fn frame_weights_strictly_increase_inside_open_interval() {
    for n in 1..=14u32 {
        let mut prev = 0.0;
        for i in 0..n {
            let w = frame_weights(i, n).unwrap();
            assert_eq!(w.first, f64::from(i + 1) / f64::from(n + 1));
            assert!(w.first > prev);
            assert!(w.first > 0.0 && w.first < 1.0);
            assert!(w.last > 0.0 && w.last < 1.0);
            assert!((w.first + w.last - 1.0).abs() < 1e-12);
            prev = w.first;
        }
    }
}

#[test]
fn black_to_white_single_frame_is_mid_gray() {
    let a = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
    let b = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
    let w = frame_weights(0, 1).unwrap();
    assert_eq!((w.first, w.last), (0.5, 0.5));
    let out = blend(&a, &b, w).unwrap();
    assert_eq!(out, RgbImage::from_pixel(2, 2, Rgb([128, 128, 128])));
}
