//! Projection of scattering patterns onto the Ewald sphere.
//!
//! A detector image in Saxs coordinates `s = (s1, s2)` (see
//! [`crate::reference`]) records the scattered beam `kout` where it hits the
//! (possibly rotated) detector plane. The Waxs projection `sp` re-expresses
//! the same beam on a plane perpendicular to the incident beam, such that
//! `|sp|` is the modulus of the scattering vector:
//!
//! ```text
//! kin  = -k e3
//! kout =  k (sin2θ cosα, sin2θ sinα, -cos2θ)
//! |sp| =  k sqrt(2 (1 - cos2θ))        sp = |sp| (cosα, sinα)
//! ```
//!
//! All lengths are in units of the Saxs reference system; `k` is the
//! wavenumber `λ₀/λ`.

mod range;
mod sym;

pub use range::{DetectorPair, Transform};

use geometry::{Coord, Rotation, Vector};
use units::Angle;

const EPS: f64 = 1e-30;

/// Why a single coordinate could not be transformed
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    #[error("no real solution")]
    NoSolution,
    #[error("scattered beam does not hit the detector")]
    BehindDetector,
    #[error("symmetry axis is parallel to the incident beam")]
    AxisAlongBeam,
}

pub type Outcome<T> = std::result::Result<T, Failure>;

/// Sample symmetry used by the Waxs projection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symmetry {
    #[default]
    Isotropic,
    /// Cylindrical symmetry about (the rotated) axis 1
    Axis1,
    /// Cylindrical symmetry about (the rotated) axis 2
    Axis2,
}

/// Direction of the scattered beam in the laboratory frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Direction {
    pub sin_2theta: f64,
    pub cos_2theta: f64,
    pub sin_alpha: f64,
    pub cos_alpha: f64,
}

impl Direction {
    /// `kout / k`
    pub fn unit(&self) -> Vector {
        Vector::new(self.sin_2theta * self.cos_alpha, self.sin_2theta * self.sin_alpha, -self.cos_2theta)
    }

    /// From a unit vector along the scattered beam
    pub fn from_unit(v: Vector) -> Self {
        let sin_2theta = v.x.hypot(v.y);
        let (cos_alpha, sin_alpha) = if sin_2theta.abs() > EPS {
            (v.x / sin_2theta, v.y / sin_2theta)
        } else { (0.0, 0.0) };
        Self { sin_2theta, cos_2theta: -v.z, sin_alpha, cos_alpha }
    }

    /// Scattering angle 2θ in radians
    pub fn two_theta(&self) -> f64 { self.sin_2theta.atan2(self.cos_2theta) }
}

/// Detector geometry of one image: wavenumber, detector rotation and sample
/// symmetry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaxsParams {
    k: f64,
    halfdk2: f64,
    rot: Rotation,
    inv_rot: Rotation,
    symmetry: Symmetry,
    sym_rot: Rotation,
    inv_sym_rot: Rotation,
}

impl WaxsParams {

    /// Detector rotated ccw about axes 1, 2 and 3 (applied in this order),
    /// isotropic sample
    pub fn new(k: f64, rot: [Angle; 3]) -> Self {
        Self {
            k,
            halfdk2: 0.5 / (k * k),
            rot: Rotation::detector(rot),
            inv_rot: Rotation::detector_inverse(rot),
            symmetry: Symmetry::Isotropic,
            sym_rot: Rotation::identity(),
            inv_sym_rot: Rotation::identity(),
        }
    }

    /// Unrotated detector
    pub fn unrotated(k: f64) -> Self {
        let zero = units::radian(0.0);
        Self::new(k, [zero; 3])
    }

    pub fn k(&self) -> f64 { self.k }
    pub fn symmetry(&self) -> Symmetry { self.symmetry }
    pub fn rotation(&self) -> Rotation { self.rot }

    /// Direction of the beam which reaches the Waxs projection at `sp`
    pub fn sp2kdir(&self, sp: Coord) -> Outcome<Direction> {
        let s2 = sp.s1 * sp.s1 + sp.s2 * sp.s2;
        let s = s2.sqrt();
        let s2d2k2 = s2 * self.halfdk2;
        let mut tmp = 2.0 * s2d2k2 - s2d2k2 * s2d2k2;
        if tmp < 0.0 {
            if tmp > -EPS { tmp = 0.0 } else { return Err(Failure::NoSolution) }
        }
        let (cos_alpha, sin_alpha) = if s > EPS { (sp.s1 / s, sp.s2 / s) } else { (0.0, 0.0) };
        Ok(Direction { sin_2theta: tmp.sqrt(), cos_2theta: 1.0 - s2d2k2, sin_alpha, cos_alpha })
    }

    /// Direction of the beam which hits the detector at Saxs coordinate `s`
    pub fn s2kdir(&self, s: Coord) -> Direction {
        let len = (s.s1 * s.s1 + s.s2 * s.s2 + self.k * self.k).sqrt();
        let kvec = Vector::new(s.s1 / len, s.s2 / len, -self.k / len);
        Direction::from_unit(self.rot * kvec)
    }

    /// Waxs projection of the beam `kdir`
    pub fn kdir2sp(&self, kdir: Direction) -> Coord {
        let s = (2.0 * (1.0 - kdir.cos_2theta)).sqrt() * self.k;
        Coord::new(s * kdir.cos_alpha, s * kdir.sin_alpha)
    }

    /// Saxs coordinate where the beam `kdir` hits the detector
    pub fn kdir2s(&self, kdir: Direction) -> Outcome<Coord> {
        let kvec = self.inv_rot * kdir.unit();
        if kvec.z > -EPS { return Err(Failure::BehindDetector) }
        Ok(Coord::new(-(kvec.x / kvec.z) * self.k, -(kvec.y / kvec.z) * self.k))
    }

    /// Scattering vector `k (kout^ - kin^)` of the beam `kdir`
    pub fn kdir2svec(&self, kdir: Direction) -> Vector {
        Vector::new(self.k * kdir.sin_2theta * kdir.cos_alpha,
                    self.k * kdir.sin_2theta * kdir.sin_alpha,
                    self.k * (1.0 - kdir.cos_2theta))
    }

    /// Direction from a projected coordinate, honouring the sample symmetry
    pub fn proj2kdir(&self, sp: Coord) -> Outcome<Direction> {
        match self.symmetry {
            Symmetry::Isotropic => self.sp2kdir(sp),
            _                   => self.ssym2kdir(sp),
        }
    }

    /// Projected coordinate of `kdir`, honouring the sample symmetry
    pub fn kdir2proj(&self, kdir: Direction) -> Coord {
        match self.symmetry {
            Symmetry::Isotropic => self.kdir2sp(kdir),
            _                   => self.kdir2ssym(kdir),
        }
    }

    /// Detector Saxs coordinate of the Waxs projection `sp`
    pub fn saxs(&self, sp: Coord) -> Outcome<Coord> { self.kdir2s(self.proj2kdir(sp)?) }

    /// Waxs projection of the detector Saxs coordinate `s`
    pub fn waxs(&self, s: Coord) -> Coord { self.kdir2proj(self.s2kdir(s)) }

    /// Scattering vector of the detector Saxs coordinate `s`
    pub fn saxs2vector(&self, s: Coord) -> Vector { self.kdir2svec(self.s2kdir(s)) }
}
