use std::{fmt::Display, iter::Sum};

use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use serde::{Deserialize, Serialize};

/// A three-vector with Cartesian components.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// The $`x`$-component.
    pub x: f64,
    /// The $`y`$-component.
    pub y: f64,
    /// The $`z`$-component.
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Promote to a four-momentum with the given mass.
    pub fn with_mass(&self, mass: f64) -> Vec4 {
        let e = (mass.powi(2) + self.mag2()).sqrt();
        Vec4::new(self.x, self.y, self.z, e)
    }

    /// Promote to a four-momentum with the given energy.
    pub fn with_energy(&self, energy: f64) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, energy)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }
    /// The magnitude of the component transverse to the $`z`$-axis.
    pub fn perp(&self) -> f64 {
        self.x.hypot(self.y)
    }
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }
}

impl_op_ex!(+ |a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z) });
impl_op_ex!(-|a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z) });
impl_op_ex!(-|a: &Vec3| -> Vec3 { Vec3::new(-a.x, -a.y, -a.z) });
impl_op_ex_commutative!(*|a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x * b, a.y * b, a.z * b) });

/// A four-momentum $`(p_x, p_y, p_z, E)`$.
///
/// The collider-style accessors ([`Vec4::pt`], [`Vec4::eta`], [`Vec4::phi`], [`Vec4::et`])
/// follow the usual convention that the beam runs along the $`z`$-axis.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    /// The $`x`$-component of the momentum.
    pub x: f64,
    /// The $`y`$-component of the momentum.
    pub y: f64,
    /// The $`z`$-component of the momentum.
    pub z: f64,
    /// The energy.
    pub t: f64,
}

impl Display for Vec4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_p4_string())
    }
}

impl Vec4 {
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self {
            x: px,
            y: py,
            z: pz,
            t: e,
        }
    }

    /// Build a four-momentum from transverse momentum, pseudorapidity, azimuth and mass.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        Vec3::new(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh()).with_mass(m)
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn px(&self) -> f64 {
        self.x
    }
    pub fn py(&self) -> f64 {
        self.y
    }
    pub fn pz(&self) -> f64 {
        self.z
    }
    pub fn e(&self) -> f64 {
        self.t
    }
    pub fn vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.vec3().perp()
    }
    /// Azimuthal angle in $`(-\pi, \pi]`$.
    pub fn phi(&self) -> f64 {
        self.vec3().phi()
    }
    /// Pseudorapidity. A vector with no momentum at all has $`\eta = 0`$; a vector along the
    /// beam axis has $`\eta = \pm\infty`$.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 {
            if self.z == 0.0 {
                return 0.0;
            }
            return f64::INFINITY.copysign(self.z);
        }
        (self.z / pt).asinh()
    }
    /// Transverse energy $`E \cdot p_T / |\vec{p}|`$.
    pub fn et(&self) -> f64 {
        let pt2 = self.x * self.x + self.y * self.y;
        if pt2 == 0.0 {
            return 0.0;
        }
        self.t * (pt2 / (pt2 + self.z * self.z)).sqrt()
    }
    pub fn m2(&self) -> f64 {
        self.t * self.t - self.vec3().mag2()
    }
    /// Invariant mass. Spacelike vectors return $`-\sqrt{-m^2}`$.
    pub fn m(&self) -> f64 {
        let m2 = self.m2();
        if m2 < 0.0 {
            -(-m2).sqrt()
        } else {
            m2.sqrt()
        }
    }
    pub fn to_p4_string(&self) -> String {
        format!(
            "[e = {:.5}; p = ({:.5}, {:.5}, {:.5}); m = {:.5}]",
            self.t,
            self.x,
            self.y,
            self.z,
            self.m()
        )
    }
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x + b.x, a.y + b.y, a.z + b.z, a.t + b.t) });
impl_op_ex!(-|a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x - b.x, a.y - b.y, a.z - b.z, a.t - b.t) });
impl_op_ex!(-|a: &Vec4| -> Vec4 { Vec4::new(-a.x, -a.y, -a.z, -a.t) });
impl_op_ex!(+= |a: &mut Vec4, b: &Vec4| { *a = *a + b; });

impl Sum for Vec4 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Vec4::zero(), |acc, p4| acc + p4)
    }
}

impl<'a> Sum<&'a Vec4> for Vec4 {
    fn sum<I: Iterator<Item = &'a Vec4>>(iter: I) -> Self {
        iter.fold(Vec4::zero(), |acc, p4| acc + p4)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_vec_sums() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        let res = a + b;
        assert_eq!(res.x, 5.0);
        assert_eq!(res.y, 7.0);
        assert_eq!(res.z, 9.0);
        let p = Vec4::new(1.0, 2.0, 3.0, 10.0) + Vec4::new(1.0, 1.0, 1.0, 5.0);
        assert_eq!(p, Vec4::new(2.0, 3.0, 4.0, 15.0));
    }

    #[test]
    fn test_three_to_four_momentum_conversion() {
        let p3 = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec4::new(1.0, 2.0, 3.0, 10.0);
        let from_mass = p3.with_mass(target.m());
        let from_energy = p3.with_energy(target.e());
        assert_relative_eq!(from_mass.e(), target.e());
        assert_relative_eq!(from_energy.e(), target.e());
        assert_eq!(from_mass.vec3(), target.vec3());
    }

    #[test]
    fn test_four_momentum_basics() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        assert_relative_eq!(p.pt(), 5.0);
        assert_relative_eq!(p.m2(), 50.0);
        assert_relative_eq!(p.m(), 50.0_f64.sqrt());
        assert_relative_eq!(p.phi(), 4.0_f64.atan2(3.0));
        assert_relative_eq!(p.eta(), 1.0_f64.asinh());
        assert_relative_eq!(p.et(), 10.0 * (25.0_f64 / 50.0).sqrt());
    }

    #[test]
    fn test_collider_coordinates() {
        let p = Vec4::from_pt_eta_phi_m(25.0, -1.2, 2.0, 0.105);
        assert_relative_eq!(p.pt(), 25.0, epsilon = 1e-12);
        assert_relative_eq!(p.eta(), -1.2, epsilon = 1e-12);
        assert_relative_eq!(p.phi(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.m(), 0.105, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_directions() {
        let at_rest = Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(at_rest.eta(), 0.0);
        assert_eq!(at_rest.et(), 0.0);
        let along_beam = Vec4::new(0.0, 0.0, -4.0, 4.0);
        assert_eq!(along_beam.eta(), f64::NEG_INFINITY);
        assert_relative_eq!(Vec4::new(-1.0, 0.0, 0.0, 1.0).phi(), PI);
    }

    #[test]
    fn test_massless_et_equals_pt() {
        let p = Vec4::new(3.0, -4.0, 12.0, 13.0);
        assert_relative_eq!(p.et(), p.pt());
    }

    #[test]
    fn test_p4_sum_iterator() {
        let parts = [
            Vec4::new(10.0, 0.0, 0.0, 10.0),
            Vec4::new(0.0, 10.0, 0.0, 10.0),
        ];
        let total: Vec4 = parts.iter().sum();
        assert_eq!(total, Vec4::new(10.0, 10.0, 0.0, 20.0));
        let empty: Vec4 = Vec::<Vec4>::new().into_iter().sum();
        assert_eq!(empty, Vec4::zero());
    }
}
