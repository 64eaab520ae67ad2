mod common;

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::{diamond, random_walk};
use tracklib::comparison::{
    areal, central_track, discrete_frechet, dtw, dtw_matching, fast_dtw, frechet, hausdorff,
    pointwise, DtwParams, PointwiseNorm,
};
use tracklib::control::Monitor;
use tracklib::Track;

#[test]
fn test_hausdorff_diamonds_is_symmetric() {
    let a = diamond(1.0, 1.0);
    let b = diamond(2.0, 4.0);
    let ab = hausdorff(&a, &b).unwrap();
    assert_eq!(ab, hausdorff(&b, &a).unwrap());
    // (0, -4) to the line carrying the south-west edge of the inner diamond
    assert_abs_diff_eq!(ab, 2.12132, epsilon = 1e-3);
}

#[test]
fn test_dtw_equals_fast_dtw_with_wide_band() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..20 {
        let n = rng.random_range(2..=100);
        let m = rng.random_range(2..=100);
        let a = random_walk(&mut rng, n);
        let b = random_walk(&mut rng, m);
        let full = dtw(&a, &b, &DtwParams::default()).unwrap();
        let banded = fast_dtw(&a, &b, n.max(m), 2.0).unwrap();
        assert_eq!(full, banded);
    }
}

#[test]
fn test_dtw_matching_profile_covers_both_tracks() {
    let mut rng = StdRng::seed_from_u64(7);
    let a = random_walk(&mut rng, 30);
    let b = random_walk(&mut rng, 45);
    let params = DtwParams::builder().ends(true).build().unwrap();
    let profile = dtw_matching(&a, &b, &params, &mut Monitor::new()).unwrap();
    assert_abs_diff_eq!(profile.score, dtw(&a, &b, &params).unwrap(), epsilon = 1e-12);
    assert_eq!(profile.pairs.len(), a.size());
    assert!(profile.pairs.iter().all(|p| !p.is_empty()));
    assert_eq!(profile.pairs[0][0], 0);
    assert_eq!(*profile.pairs[a.size() - 1].last().unwrap(), b.size() - 1);
}

#[test]
fn test_areal_is_non_negative() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..25 {
        let a = random_walk(&mut rng, 15);
        let b = random_walk(&mut rng, 12);
        assert!(areal(&a, &b).unwrap() >= 0.0);
        assert_eq!(areal(&a, &a).unwrap(), 0.0);
    }
}

#[test]
fn test_frechet_bounds() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..10 {
        let a = random_walk(&mut rng, 12);
        let b = random_walk(&mut rng, 9);
        let continuous = frechet(&a, &b).unwrap();
        assert!(continuous >= hausdorff(&a, &b).unwrap() - 1e-6);
        assert!(continuous <= discrete_frechet(&a, &b).unwrap() + 1e-6);
    }
}

#[test]
fn test_pointwise_norms_are_ordered() {
    let a = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
    let longer = Track::from_xy(&[(0.0, 1.0), (1.0, 3.0), (2.0, 0.5), (3.0, 2.0), (9.0, 9.0)]);
    assert!(pointwise(&a, &longer, PointwiseNorm::L1).is_err());
    let b = longer.extract(0, a.size() - 1).unwrap();
    let l1 = pointwise(&a, &b, PointwiseNorm::L1).unwrap();
    let l2 = pointwise(&a, &b, PointwiseNorm::L2).unwrap();
    let linf = pointwise(&a, &b, PointwiseNorm::Linf).unwrap();
    assert_abs_diff_eq!(l1, 1.625, epsilon = 1e-12);
    assert!(l1 <= l2 && l2 <= linf);
    assert_eq!(linf, 3.0);
}

#[test]
fn test_central_track_of_shifted_copies() {
    let base: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, (i as f64 * 0.5).sin())).collect();
    let tracks: Vec<Track> = [-1.0, 0.0, 1.0]
        .iter()
        .map(|dy| {
            let mut t = Track::from_xy(&base);
            t.translate(0.0, *dy, 0.0);
            t
        })
        .collect();
    let central = central_track(&tracks, 1).unwrap();
    common::assert_positions_close(&central, &tracks[1], 1e-9);
}

#[test]
fn test_pointwise_on_offset_tracks() {
    let a = Track::from_xy(&(0..11).map(|i| (i as f64, 0.0)).collect::<Vec<_>>());
    let offsets = [
        (0.0, 3.0),
        (0.0, 4.0),
        (3.0, 4.0),
        (4.0, 0.0),
        (0.0, 3.0),
        (0.0, 4.0),
        (4.0, 3.0),
        (0.0, 4.0),
        (3.0, 0.0),
        (4.0, 0.0),
        (0.0, 4.0),
        (1.0, 1.0),
        (2.0, 2.0),
    ];
    let b = Track::from_xy(
        &offsets
            .iter()
            .enumerate()
            .map(|(i, (dx, dy))| (i as f64 + dx, *dy))
            .collect::<Vec<_>>(),
    );
    assert_eq!(b.size(), 13);
    assert!(pointwise(&a, &b, PointwiseNorm::L2).is_err());

    // distances 3 4 5 4 3 4 5 4 3 4 4
    let b = b.extract(0, 10).unwrap();
    assert_abs_diff_eq!(pointwise(&a, &b, PointwiseNorm::L1).unwrap(), 43.0 / 11.0, epsilon = 1e-12);
    assert_abs_diff_eq!(pointwise(&a, &b, PointwiseNorm::L2).unwrap(), (173.0f64 / 11.0).sqrt(), epsilon = 1e-12);
    assert_eq!(pointwise(&a, &b, PointwiseNorm::Linf).unwrap(), 5.0);
}

/// Track `a` pauses near `b[4]` while `b` doubles its second point.
fn pause_and_double() -> (Track, Track) {
    let a = Track::from_xy(&[
        (0.0, 0.0),
        (1.5, 0.2),
        (3.0, 0.1),
        (4.9, 0.3),
        (5.0, -0.2),
        (5.2, 0.1),
        (7.0, 0.0),
        (8.1, 0.4),
    ]);
    let b = Track::from_xy(&[
        (0.1, 0.3),
        (1.2, -0.1),
        (1.8, 0.2),
        (3.1, -0.3),
        (5.0, 0.0),
        (7.2, 0.3),
        (8.0, 0.0),
    ]);
    (a, b)
}

#[test]
fn test_dtw_matching_of_pause_and_double() {
    let (a, b) = pause_and_double();
    let params = DtwParams::builder().ends(true).build().unwrap();
    let m = dtw_matching(&a, &b, &params, &mut Monitor::new()).unwrap();
    let expected: Vec<Vec<usize>> = vec![
        vec![0],
        vec![1, 2],
        vec![3],
        vec![4],
        vec![4],
        vec![4],
        vec![5],
        vec![6],
    ];
    assert_eq!(m.pairs, expected);
    assert_abs_diff_eq!(m.score, 1.014889, epsilon = 1e-6);
    // (1.8, 0.2) is the closer of the two points matched to (1.5, 0.2)
    assert_eq!(m.profile.get_feature("pair").unwrap()[1], 2.0);
    assert_abs_diff_eq!(m.profile.get_feature("diff").unwrap()[1], 0.3, epsilon = 1e-12);

    let score = |p: f64| dtw(&a, &b, &DtwParams::builder().p(p).ends(true).build().unwrap()).unwrap();
    assert_abs_diff_eq!(score(1.0), 2.965503, epsilon = 1e-6);
    assert_abs_diff_eq!(score(f64::INFINITY), 0.18f64.sqrt(), epsilon = 1e-12);
}

#[test]
fn test_dtw_band_and_free_end() {
    let (a, b) = pause_and_double();
    let full = dtw(&a, &b, &DtwParams::builder().ends(true).build().unwrap()).unwrap();

    // a band of one cell forbids matching (1.5, 0.2) twice
    let narrow = DtwParams::builder().ends(true).band(1).build().unwrap();
    let m = dtw_matching(&a, &b, &narrow, &mut Monitor::new()).unwrap();
    assert_eq!(m.pairs[1], vec![1]);
    assert_eq!(m.pairs[2], vec![2]);
    assert_abs_diff_eq!(m.score, 2.391652, epsilon = 1e-6);
    assert!(m.score > full);
    assert_abs_diff_eq!(fast_dtw(&a, &b, 2, 2.0).unwrap(), full, epsilon = 1e-12);

    // extra points past the end of `a` only cost with a fixed end
    let mut pts: Vec<(f64, f64)> = b
        .observations()
        .iter()
        .map(|o| (o.position.x(), o.position.y()))
        .collect();
    pts.extend([(12.0, 0.0), (15.0, 1.0)]);
    let longer = Track::from_xy(&pts);
    let free = dtw_matching(&a, &longer, &DtwParams::default(), &mut Monitor::new()).unwrap();
    assert_abs_diff_eq!(free.score, full, epsilon = 1e-12);
    assert_eq!(free.pairs[7], vec![6]);
    let fixed = dtw(&a, &longer, &DtwParams::builder().ends(true).build().unwrap()).unwrap();
    assert_abs_diff_eq!(fixed, 8.023092, epsilon = 1e-6);
}
