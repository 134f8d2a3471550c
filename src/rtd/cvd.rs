//! Fixed-point Callendar-Van Dusen inversion for PT100 elements.
//!
//! IEC 60751:
//!
//! ```text
//! R(t) = R0 * (1 + A*t + B*t^2 + C*(t - 100)*t^3)
//! ```
//!
//! with `C = 0` for `t >= 0`. Both ranges are inverted with Newton-Raphson from
//! a linear first guess; the iteration counts are fixed so worst-case timing is
//! known on targets without an FPU.
//!
//! Internal units: `t` in 0.1 C, resistance in micro-ohms, slope in micro-ohms per C.

use num_traits::clamp;

use super::Resistance;

/// R0 = 100.00 ohm in micro-ohms.
const R0_MICRO: i64 = 100_000_000;

/// R0 * A = 0.39083 ohm/C = 39083 micro-ohm per 0.1 C.
const CVD_A: i64 = 39083;
/// R0 * B = -5.775e-5 ohm/C^2, scaled by 1e4 per (0.1 C)^2.
const CVD_B: i64 = -5775;
/// R0 * C = -4.183e-10 ohm/C^4, scaled by 1e11 per (0.1 C)^4.
const CVD_C: i64 = -4183;

/// Input window in hundredths of an ohm, keeps every i64 product in range.
const RESISTANCE_FLOOR: i64 = 0;
const RESISTANCE_CEILING: i64 = 1_000_000;

const T_MIN: i64 = -2000;
const T_MAX: i64 = 8500;

const POSITIVE_ITERATIONS: usize = 4;
const NEGATIVE_ITERATIONS: usize = 3;

/// Which half of the CVD equation is inverted for a given resistance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Branch {
    /// 0 C to 850 C, quadratic.
    Positive,
    /// -200 C to 0 C, quartic with the `C` term.
    Negative,
}

impl Branch {
    /// Select the branch for a resistance in hundredths of an ohm.
    pub fn select(hundredths: i32) -> Self {
        if hundredths >= Resistance::ICE_POINT.hundredths() {
            Branch::Positive
        } else {
            Branch::Negative
        }
    }

    fn solver(self) -> Newton {
        match self {
            Branch::Positive => Newton {
                poly: Polynomial {
                    a: CVD_A,
                    b: CVD_B,
                    c: 0,
                },
                iterations: POSITIVE_ITERATIONS,
                window: Some((0, T_MAX)),
            },
            Branch::Negative => Newton {
                poly: Polynomial {
                    a: CVD_A,
                    b: CVD_B,
                    c: CVD_C,
                },
                iterations: NEGATIVE_ITERATIONS,
                window: None,
            },
        }
    }
}

/// `R(t)` with scaled coefficients, see module docs.
#[derive(Clone, Copy, Debug)]
struct Polynomial {
    a: i64,
    b: i64,
    c: i64,
}

impl Polynomial {
    /// Resistance in micro-ohms at `t` tenths of a degree.
    fn value(&self, t: i64) -> i64 {
        let t2 = t * t;
        R0_MICRO + self.a * t + self.b * t2 / 10_000 + self.c * (t - 1000) * t2 * t / 100_000_000_000
    }

    /// dR/dt in micro-ohms per degree at `t` tenths of a degree.
    fn slope(&self, t: i64) -> i64 {
        let t2 = t * t;
        10 * self.a + 2 * self.b * t / 1_000 + self.c * (4 * t2 * t - 3000 * t2) / 10_000_000_000
    }

    /// First guess from the linear term only.
    fn linear_estimate(&self, target: i64) -> i64 {
        (target - R0_MICRO) / self.a
    }
}

struct Newton {
    poly: Polynomial,
    iterations: usize,
    /// Clamp applied to the first guess and after every step.
    window: Option<(i64, i64)>,
}

impl Newton {
    fn solve(&self, target: i64) -> i64 {
        let mut t = self.bound(self.poly.linear_estimate(target));
        for _ in 0..self.iterations {
            let slope = self.poly.slope(t);
            // a flat slope leaves t where it is for every later step as well
            if slope == 0 {
                break;
            }
            // slope is per degree, t is in tenths
            t -= div_round(10 * (self.poly.value(t) - target), slope);
            t = self.bound(t);
        }
        t
    }

    fn bound(&self, t: i64) -> i64 {
        match self.window {
            Some((lo, hi)) => clamp(t, lo, hi),
            None => t,
        }
    }
}

/// Division rounding half away from zero.
fn div_round(n: i64, d: i64) -> i64 {
    let half = d.abs() / 2;
    if n >= 0 {
        (n + half) / d
    } else {
        (n - half) / d
    }
}

/// Temperature in tenths of a degree for a resistance in hundredths of an ohm.
pub(super) fn temperature(hundredths: i32) -> i16 {
    let r = clamp(i64::from(hundredths), RESISTANCE_FLOOR, RESISTANCE_CEILING);
    let t = Branch::select(r as i32).solver().solve(r * 10_000);
    clamp(t, T_MIN, T_MAX) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Full IEC 60751 equation in floating point, rounded to 0.01 ohm.
    fn reference_resistance(tenths: i32) -> i32 {
        let t = tenths as f64 / 10.0;
        let (a, b, c) = (3.9083e-3, -5.775e-7, -4.183e-12);
        let mut r = 1.0 + a * t + b * t * t;
        if t < 0.0 {
            r += c * (t - 100.0) * t * t * t;
        }
        (r * 100.0 * 100.0).round() as i32
    }

    #[test]
    fn ice_point_is_zero() {
        assert_eq!(temperature(10000), 0);
        assert!(temperature(9999).abs() <= 1);
        assert!(temperature(10001).abs() <= 1);
    }

    #[test]
    fn known_points() {
        assert_eq!(temperature(13850), 1000);
        assert_eq!(temperature(17586), 2000);
        assert_eq!(temperature(3000), -1732);
        assert_eq!(temperature(39048), 8500);
    }

    #[test]
    fn lower_end_clamps() {
        assert_eq!(temperature(0), -2000);
        assert_eq!(temperature(1852), -2000);
        assert_eq!(temperature(500), -2000);
    }

    #[test]
    fn result_always_in_range() {
        let inputs = [i32::MIN, -1_000_000, -1, 0, 1, 9_999, 10_000, 42_598, 1_000_001, i32::MAX];
        for &r in inputs.iter() {
            let t = temperature(r);
            assert!((T_MIN as i16..=T_MAX as i16).contains(&t), "r = {} gave {}", r, t);
        }
        for r in (0..50_000).step_by(7) {
            let t = temperature(r);
            assert!((-2000..=8500).contains(&t), "r = {} gave {}", r, t);
        }
    }

    #[test]
    fn round_trip_full_range() {
        for tenths in -2000..=8500 {
            let r = reference_resistance(tenths);
            let t = temperature(r) as i32;
            assert!((t - tenths).abs() <= 2, "{} -> {} ohm/100 -> {}", tenths, r, t);
        }
    }

    #[test]
    fn conversion_is_monotonic() {
        let mut last = temperature(0);
        for r in 1..45_000 {
            let t = temperature(r);
            assert!(t >= last, "r = {}: {} < {}", r, t, last);
            last = t;
        }
    }

    #[test]
    fn branch_selection_is_monotonic() {
        assert_eq!(Branch::select(9_999), Branch::Negative);
        assert_eq!(Branch::select(10_000), Branch::Positive);
        assert_eq!(Branch::select(Resistance::ICE_POINT.hundredths()), Branch::Positive);

        let mut seen_positive = false;
        for r in (-100..40_000).step_by(3) {
            match Branch::select(r) {
                Branch::Positive => seen_positive = true,
                Branch::Negative => assert!(!seen_positive, "r = {} went back to negative", r),
            }
        }
    }

    #[test]
    fn polynomial_matches_reference_points() {
        let negative = Branch::Negative.solver().poly;
        let positive = Branch::Positive.solver().poly;
        assert_eq!(negative.value(0), R0_MICRO);
        assert_eq!(positive.value(0), R0_MICRO);
        // 138.5055 ohm at 100 C
        assert_eq!(positive.value(1000), 138_505_500);
        // 18.5201 ohm at -200 C
        assert!((negative.value(-2000) - 18_520_100).abs() < 100);
        assert!(negative.slope(-2000) > 0);
        assert!(positive.slope(T_MAX) > 0);
    }

    #[test]
    fn positive_steps_stay_in_window() {
        let solver = Branch::Positive.solver();
        assert_eq!(solver.solve(1_000_000 * 10_000), T_MAX);
        assert_eq!(solver.solve(R0_MICRO), 0);
    }

    #[test]
    fn flat_slope_stops_windowed_solver() {
        let degenerate = Newton {
            poly: Polynomial { a: 1, b: -5000, c: 0 },
            iterations: 3,
            window: Some((1, 1)),
        };
        // slope(1) = 10 - 10 = 0
        assert_eq!(degenerate.poly.slope(1), 0);
        assert_eq!(degenerate.solve(R0_MICRO + 7), 1);
    }

    #[test]
    fn flat_slope_skips_update_without_window() {
        let flat = Newton {
            poly: Polynomial { a: 2, b: -10_000, c: 0 },
            iterations: 3,
            window: None,
        };
        // first guess (3 / 2) = 1, where slope = 20 - 20 = 0 but value is still off target
        let target = R0_MICRO + 3;
        assert_eq!(flat.poly.linear_estimate(target), 1);
        assert_eq!(flat.poly.slope(1), 0);
        assert_ne!(flat.poly.value(1), target);
        assert_eq!(flat.solve(target), 1);
    }

    #[test]
    fn rounding_division() {
        assert_eq!(div_round(5, 2), 3);
        assert_eq!(div_round(-5, 2), -3);
        assert_eq!(div_round(4, 3), 1);
        assert_eq!(div_round(-4, -3), 1);
        assert_eq!(div_round(5, -2), -3);
        assert_eq!(div_round(-5, -2), 3);
        assert_eq!(div_round(-4, 3), -1);
        assert_eq!(div_round(0, -7), 0);
    }
}
