//! Normal (Gaussian) distribution.

use pm_core::{ensure, errors::Result, Real};
use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};

/// The standard normal probability density function.
///
/// `φ(x) = exp(-x²/2) / √(2π)`
#[inline]
pub fn normal_pdf(x: Real) -> Real {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// The standard normal cumulative distribution function Φ(x).
///
/// Evaluated through the complementary error function, which keeps full
/// relative accuracy in the lower tail.
#[inline]
pub fn normal_cdf(x: Real) -> Real {
    0.5 * erfc(-x / SQRT_2)
}

/// The inverse standard normal CDF (probit function).
///
/// Acklam's rational approximation followed by one Halley refinement step
/// against [`normal_cdf`], giving close to machine precision on `(0, 1)`.
pub fn normal_cdf_inverse(p: Real) -> Result<Real> {
    ensure!(p > 0.0 && p < 1.0, "probability must be in (0, 1), got {p}");
    let x = acklam_inverse(p);
    let e = normal_cdf(x) - p;
    let u = e * (2.0 * PI).sqrt() * (0.5 * x * x).exp();
    Ok(x - u / (1.0 + 0.5 * x * u))
}

/// Peter J. Acklam's rational approximation to the inverse normal CDF.
///
/// Maximum relative error < 1.15e-9.
fn acklam_inverse(p: Real) -> Real {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e+01,
        2.209_460_984_245_205e+02,
        -2.759_285_104_469_687e+02,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e+01,
        2.506_628_277_459_239e+00,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e+01,
        1.615_858_368_580_409e+02,
        -1.556_989_798_598_866e+02,
        6.680_131_188_771_972e+01,
        -1.328_068_155_288_572e+01,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-03,
        -3.223_964_580_411_365e-01,
        -2.400_758_277_161_838e+00,
        -2.549_732_539_343_734e+00,
        4.374_664_141_464_968e+00,
        2.938_163_982_698_783e+00,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-03,
        3.224_671_290_700_398e-01,
        2.445_134_137_142_996e+00,
        3.754_408_661_907_416e+00,
    ];

    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    let tail = |q: Real| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normal_pdf_at_zero() {
        let expected = 1.0 / (2.0 * PI).sqrt();
        assert_abs_diff_eq!(normal_pdf(0.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn normal_cdf_reference_points() {
        assert_abs_diff_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(normal_cdf(1.959_963_984_540_054), 0.975, epsilon = 1e-12);
        assert!(normal_cdf(-10.0) < 1e-20);
        assert_abs_diff_eq!(normal_cdf(10.0), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn inverse_cdf_roundtrip() {
        for p in [1e-10, 0.001, 0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99, 0.999] {
            let x = normal_cdf_inverse(p).unwrap();
            let p2 = normal_cdf(x);
            assert!(
                (p2 - p).abs() < 1e-12 * p.max(1e-3),
                "roundtrip failed for p={p}: got {p2}"
            );
        }
    }

    #[test]
    fn inverse_cdf_is_odd() {
        let lo = normal_cdf_inverse(0.1).unwrap();
        let hi = normal_cdf_inverse(0.9).unwrap();
        assert_abs_diff_eq!(lo, -hi, epsilon = 1e-12);
    }

    #[test]
    fn inverse_cdf_rejects_closed_endpoints() {
        assert!(normal_cdf_inverse(0.0).is_err());
        assert!(normal_cdf_inverse(1.0).is_err());
    }
}
