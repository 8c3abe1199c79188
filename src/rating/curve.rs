/// PP awarded per star at the 95% reference accuracy.
pub const STAR_MULTIPLIER: f64 = 42.117208413;

// (accuracy fraction, multiplier), ascending. Linear interpolation between points.
const PP_CURVE: [(f64, f64); 37] = [
    (0.0, 0.0),
    (0.6, 0.18223233667439062),
    (0.65, 0.5866010012767576),
    (0.7, 0.6125565959114954),
    (0.75, 0.6451808210101443),
    (0.8, 0.6872268862950283),
    (0.825, 0.7150465663454271),
    (0.85, 0.7462290664143185),
    (0.875, 0.7816934560296046),
    (0.9, 0.825756123560842),
    (0.91, 0.8488375988124467),
    (0.92, 0.8728710341448851),
    (0.93, 0.9039994071865736),
    (0.94, 0.9417362980580238),
    (0.95, 1.0),
    (0.955, 1.0388633331418984),
    (0.96, 1.0871883573850478),
    (0.965, 1.1552120359501035),
    (0.97, 1.2485807759957321),
    (0.9725, 1.3090333065057616),
    (0.975, 1.3807102743105126),
    (0.9775, 1.4664726399289512),
    (0.98, 1.5702410055532239),
    (0.9825, 1.697536248647543),
    (0.985, 1.8563887693647105),
    (0.9875, 2.058947159052738),
    (0.99, 2.324506282149922),
    (0.99125, 2.4902905794106913),
    (0.9925, 2.685667856592722),
    (0.99375, 2.9190155639254955),
    (0.995, 3.2022017597337955),
    (0.99625, 3.5526145337555373),
    (0.9975, 3.996793606763322),
    (0.99825, 4.325027383589547),
    (0.999, 4.715470646416203),
    (0.9995, 5.019543595874787),
    (1.0, 5.367394282890631),
];

/// Performance points for a play at `accuracy` percent (0-100) on a map of `stars`.
///
/// Out-of-range accuracy is clamped, non-positive or non-finite stars yield 0.
pub fn get_pp(stars: f64, accuracy: f64) -> f64 {
    if !is_rated(stars) {
        return 0.0;
    }

    let fraction = clamp_accuracy(accuracy) / 100.0;
    stars * STAR_MULTIPLIER * curve_multiplier(fraction)
}

/// PP of a perfect play.
pub fn max_pp(stars: f64) -> f64 {
    get_pp(stars, 100.0)
}

/// Accuracy percent needed to reach `pp` on a map of `stars`.
///
/// `None` when the target is unreachable (above the 100% value) or the map is unrated.
pub fn accuracy_for_pp(stars: f64, pp: f64) -> Option<f64> {
    if !is_rated(stars) || !pp.is_finite() {
        return None;
    }
    if pp <= 0.0 {
        return Some(0.0);
    }

    let multiplier = pp / (stars * STAR_MULTIPLIER);
    invert_multiplier(multiplier).map(|fraction| fraction * 100.0)
}

fn is_rated(stars: f64) -> bool {
    stars.is_finite() && stars > 0.0
}

fn clamp_accuracy(accuracy: f64) -> f64 {
    if accuracy.is_nan() {
        return 0.0;
    }
    accuracy.clamp(0.0, 100.0)
}

fn curve_multiplier(fraction: f64) -> f64 {
    let upper = PP_CURVE
        .iter()
        .position(|&(acc, _)| acc >= fraction)
        .unwrap_or(PP_CURVE.len() - 1);

    if upper == 0 {
        return PP_CURVE[0].1;
    }

    let (acc_lo, mul_lo) = PP_CURVE[upper - 1];
    let (acc_hi, mul_hi) = PP_CURVE[upper];
    let t = (fraction - acc_lo) / (acc_hi - acc_lo);
    mul_lo + t * (mul_hi - mul_lo)
}

fn invert_multiplier(multiplier: f64) -> Option<f64> {
    let upper = PP_CURVE.iter().position(|&(_, mul)| mul >= multiplier)?;

    if upper == 0 {
        return Some(PP_CURVE[0].0);
    }

    let (acc_lo, mul_lo) = PP_CURVE[upper - 1];
    let (acc_hi, mul_hi) = PP_CURVE[upper];
    let t = (multiplier - mul_lo) / (mul_hi - mul_lo);
    Some(acc_lo + t * (acc_hi - acc_lo))
}
