#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::Rng;
use tracklib::Track;

/// Random planar walk of `n` points with unit-bounded steps.
pub fn random_walk(rng: &mut StdRng, n: usize) -> Track {
    let mut pts = Vec::with_capacity(n);
    let (mut x, mut y) = (0.0, 0.0);
    for _ in 0..n {
        x += rng.random_range(-1.0..1.0);
        y += rng.random_range(-1.0..1.0);
        pts.push((x, y));
    }
    Track::from_xy(&pts)
}

pub fn diamond(r: f64, bottom: f64) -> Track {
    Track::from_xy(&[(r, 0.0), (0.0, r), (-r, 0.0), (0.0, -bottom)])
}

pub fn assert_positions_close(actual: &Track, expected: &Track, epsilon: f64) {
    assert_eq!(actual.size(), expected.size());
    for (a, e) in actual.observations().iter().zip(expected.observations()) {
        assert_abs_diff_eq!(a.position.x(), e.position.x(), epsilon = epsilon);
        assert_abs_diff_eq!(a.position.y(), e.position.y(), epsilon = epsilon);
        assert_abs_diff_eq!(a.position.z(), e.position.z(), epsilon = epsilon);
    }
}
