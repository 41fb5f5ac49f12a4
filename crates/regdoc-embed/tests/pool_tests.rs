#![cfg(feature = "candle")]

use candle_core::{DType, Device, Tensor};
use regdoc_embed::masked_mean_l2;

#[test]
fn padding_does_not_shift_the_mean() {
    let dev = Device::Cpu;
    // Row 0 averages two real tokens; row 1 has one real token then padding.
    let h = Tensor::from_slice(
        &[3.0f32, 0.0, 1.0, 0.0, 99.0, 99.0, 0.0, 2.0, -7.0, 5.0, 8.0, 8.0],
        (2, 3, 2),
        &dev,
    )
    .expect("hidden");
    let mask = Tensor::from_slice(&[1u32, 1, 0, 1, 0, 0], (2, 3), &dev).expect("mask");
    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).expect("pool").to_vec2().expect("vec");

    // mean [2, 0] and [0, 2] normalise to the unit axes
    let expected = [[1.0f32, 0.0], [0.0, 1.0]];
    for (row, want) in out.iter().zip(expected) {
        for (a, b) in row.iter().zip(want) {
            assert!((a - b).abs() < 1e-5, "got {row:?}, want {want:?}");
        }
    }
}

#[test]
fn fully_masked_row_stays_finite() {
    let dev = Device::Cpu;
    let h = Tensor::ones((2, 3, 4), DType::F32, &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 1, 0, 0, 0, 0], (2, 3), &dev).unwrap();
    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    assert!(out[1].iter().all(|x| x.is_finite()));
    assert!((out[0].iter().map(|x| x * x).sum::<f32>() - 1.0).abs() < 1e-5);
}
