use std::f64::consts::PI;

use crate::utils::vectors::Vec4;

/// Wrap the difference `phi1 - phi2` into $`(-\pi, \pi]`$.
///
/// Non-finite inputs are returned unchanged (as a NaN or infinite difference) rather than
/// looping forever.
pub fn delta_phi_angles(phi1: f64, phi2: f64) -> f64 {
    let mut result = phi1 - phi2;
    if !result.is_finite() {
        return result;
    }
    if result.abs() > 2.0 * PI {
        result %= 2.0 * PI;
    }
    while result > PI {
        result -= 2.0 * PI;
    }
    while result <= -PI {
        result += 2.0 * PI;
    }
    result
}

/// Signed azimuthal separation $`\phi_a - \phi_b`$ in $`(-\pi, \pi]`$.
pub fn delta_phi(a: &Vec4, b: &Vec4) -> f64 {
    delta_phi_angles(a.phi(), b.phi())
}

/// Angular separation $`\Delta R = \sqrt{\Delta\eta^2 + \Delta\phi^2}`$.
pub fn delta_r(a: &Vec4, b: &Vec4) -> f64 {
    let deta = a.eta() - b.eta();
    let dphi = delta_phi(a, b);
    deta.hypot(dphi)
}

/// Transverse mass of a pair,
/// ```math
/// m_T = \sqrt{(E_{T,a} + E_{T,b})^2 - |\vec{p}_{T,a} + \vec{p}_{T,b}|^2}
/// ```
///
/// A negative radicand (which can only come from rounding or unphysical inputs) is clamped to
/// zero. NaN components propagate.
pub fn transverse_mass(a: &Vec4, b: &Vec4) -> f64 {
    let total_et = a.et() + b.et();
    let total_pt = (a + b).pt();
    let radicand = total_et * total_et - total_pt * total_pt;
    if radicand.is_nan() {
        return f64::NAN;
    }
    radicand.max(0.0).sqrt()
}

/// Element-wise sum of four-momenta; an empty input gives the zero vector.
pub fn sum_p4<'a, I>(p4s: I) -> Vec4
where
    I: IntoIterator<Item = &'a Vec4>,
{
    p4s.into_iter().sum()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_delta_phi_same_angle() {
        for k in -20..=20 {
            let phi = k as f64 * 0.157;
            assert_eq!(delta_phi_angles(phi, phi), 0.0);
        }
    }

    #[test]
    fn test_delta_phi_range() {
        for i in -40..=40 {
            for j in -40..=40 {
                let dphi = delta_phi_angles(i as f64 * 0.33, j as f64 * 0.21);
                assert!(dphi > -PI && dphi <= PI, "{dphi} out of range");
            }
        }
    }

    #[test]
    fn test_delta_phi_half_turn_is_positive() {
        assert_relative_eq!(delta_phi_angles(0.0, PI), PI);
        assert_relative_eq!(delta_phi_angles(PI, 0.0), PI);
        assert_relative_eq!(delta_phi_angles(3.0, -3.0), 6.0 - 2.0 * PI);
    }

    #[test]
    fn test_delta_phi_nan_propagates() {
        assert!(delta_phi_angles(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn test_delta_r() {
        let a = Vec4::from_pt_eta_phi_m(10.0, 0.5, 0.1, 0.0);
        let b = Vec4::from_pt_eta_phi_m(20.0, -0.5, -0.2, 0.0);
        assert_relative_eq!(delta_r(&a, &b), (1.0_f64 + 0.09).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(delta_r(&a, &a), 0.0);
    }

    #[test]
    fn test_transverse_mass_of_identical_massless_vectors() {
        let a = Vec4::new(3.0, 4.0, 0.0, 5.0);
        assert_relative_eq!(transverse_mass(&a, &a), 0.0);
    }

    #[test]
    fn test_transverse_mass_back_to_back() {
        let a = Vec4::new(40.0, 0.0, 10.0, 40.0_f64.hypot(10.0));
        let b = Vec4::new(-40.0, 0.0, 0.0, 40.0);
        assert_relative_eq!(transverse_mass(&a, &b), 80.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transverse_mass_clamps_to_zero() {
        // spacelike inputs give E_T sums smaller than the combined p_T
        let a = Vec4::new(10.0, 0.0, 0.0, 1.0);
        let b = Vec4::new(10.0, 0.0, 0.0, 1.0);
        assert_eq!(transverse_mass(&a, &b), 0.0);
        let nan = Vec4::new(f64::NAN, 0.0, 0.0, 1.0);
        assert!(transverse_mass(&nan, &b).is_nan());
    }

    #[test]
    fn test_sum_p4() {
        let parts = [Vec4::new(1.0, 2.0, 3.0, 4.0), Vec4::new(-1.0, 0.5, 0.0, 2.0)];
        assert_eq!(sum_p4(&parts), Vec4::new(0.0, 2.5, 3.0, 6.0));
        let empty: &[Vec4] = &[];
        assert_eq!(sum_p4(empty), Vec4::zero());
    }
}
