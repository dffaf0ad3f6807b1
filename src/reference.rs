//! Reference systems of a pixel array.
//!
//! A pixel with index `i` (starting at 0) covers `[i - 0.5, i + 0.5]` in pixel
//! coordinates relative to [`ARRAYSTART`]; in other words the lower edge of
//! pixel 0 sits at coordinate 0. All world coordinates are affine images of
//! the index,
//!
//! ```text
//! world = (index + Off) * Ps        index = world / Ps - Off
//! ```
//!
//! with a per-axis pair `(Off, Ps)` which depends on the reference system:
//!
//! | system  | world coordinate                                   |
//! |---------|----------------------------------------------------|
//! | Array   | pixel coordinate                                   |
//! | Image   | array + offset                                     |
//! | Center  | image - center                                     |
//! | Real    | image * pixel size                                 |
//! | Normal  | (image - center) * pixel size                      |
//! | Tangens | (image - center) * pixel size / distance           |
//! | Saxs    | (image - center) * pixel size / distance * λ₀ / λ  |
//!
//! All basic lengths (pixel size, distance, wavelength) are in meters.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lowest pixel index
pub const INDEXSTART: f64 = 0.0;
/// Pixel coordinate of the center of pixel [`INDEXSTART`]
pub const ARRAYSTART: f64 = 0.5;
/// Distance between a pixel center and its lower border
pub const LOWERBORDER: f64 = -0.5;
/// `ARRAYSTART - INDEXSTART`
pub const DAI: f64 = 0.5;

/// Reference wavelength of the Saxs system, in meters
pub const WAVELENGTH0: f64 = 1e-9;

/// Wavenumber as used for reference system coordinates, `λ₀ / λ`
pub fn wavenumber(wavelength: f64) -> f64 { WAVELENGTH0 / wavelength }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceSystem { Array, Image, Center, Region, Real, Normal, Tangens, Saxs }

impl ReferenceSystem {
    pub const ALL: [Self; 8] = {
        use ReferenceSystem::*;
        [Array, Image, Center, Region, Real, Normal, Tangens, Saxs]
    };

    pub fn name(self) -> &'static str {
        use ReferenceSystem::*;
        match self {
            Array   => "array",
            Image   => "image",
            Center  => "center",
            Region  => "region",
            Real    => "real",
            Normal  => "normal",
            Tangens => "tangens",
            Saxs    => "saxs",
        }
    }
}

impl fmt::Display for ReferenceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for ReferenceSystem {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter()
            .find(|r| r.name() == lower)
            .ok_or_else(|| Error::InvalidReferenceSystem(s.to_string()))
    }
}

/// Projection type of a detector image: flat detector (Saxs) or projection of
/// the Ewald sphere onto the plane perpendicular to the primary beam (Waxs)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection { #[default] Saxs, Waxs }

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Projection::Saxs => "saxs", Projection::Waxs => "waxs" })
    }
}

impl FromStr for Projection {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "saxs" => Ok(Projection::Saxs),
            "waxs" => Ok(Projection::Waxs),
            _ => Err(Error::InvalidParameter(format!("unknown projection `{s}`"))),
        }
    }
}

/// Basic geometry of one image axis. Offset and center are in pixel
/// coordinates, lengths in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisParams {
    pub offset: f64,
    pub pixel_size: f64,
    pub center: f64,
    pub distance: f64,
    pub wavelength: f64,
}

/// Affine map between index and world coordinate of one axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Axis {
    pub off: f64,
    pub ps: f64,
}

impl Axis {
    pub const fn new(off: f64, ps: f64) -> Self { Self { off, ps } }

    /// `(I + Off) * Ps`
    pub fn world(&self, index: f64) -> f64 { (index + self.off) * self.ps }

    /// `W / Ps - Off`
    pub fn index(&self, world: f64) -> f64 { world / self.ps - self.off }

    /// Move the world origin by `shift` pixels
    pub fn shifted(self, shift: f64) -> Self { Self { off: self.off - shift, ..self } }
}

impl AxisParams {

    /// `(Off, Ps)` of reference system `rsys`. The Region system has no
    /// affine map.
    pub fn axis(&self, rsys: ReferenceSystem) -> Result<Axis> {
        use ReferenceSystem::*;
        let &Self { offset: o, pixel_size: p, center: c, distance: s, wavelength: w } = self;
        Ok(match rsys {
            Array   => Axis::new(DAI, 1.0),
            Image   => Axis::new(o + DAI, 1.0),
            Center  => Axis::new(o - c + DAI, 1.0),
            Real    => Axis::new(o + DAI, p),
            Normal  => Axis::new(o - c + DAI, p),
            Tangens => Axis::new(o - c + DAI, p / s),
            Saxs    => Axis::new(o - c + DAI, p / s * wavenumber(w)),
            Region  => return Err(Error::InvalidReferenceSystem(rsys.to_string())),
        })
    }

    /// Direct index to world conversion, without going through `(Off, Ps)`
    pub fn index2world(&self, rsys: ReferenceSystem, i: f64) -> Result<f64> {
        use ReferenceSystem::*;
        let &Self { offset: o, pixel_size: p, center: c, distance: s, wavelength: w } = self;
        Ok(match rsys {
            Array   => i + DAI,
            Image   => i + o + DAI,
            Center  => i + (o - c) + DAI,
            Real    => (i + o + DAI) * p,
            Normal  => (i + (o - c) + DAI) * p,
            Tangens => (i + (o - c) + DAI) * (p / s),
            Saxs    => (i + (o - c) + DAI) * (p / s * wavenumber(w)),
            Region  => return Err(Error::InvalidReferenceSystem(rsys.to_string())),
        })
    }

    /// Direct world to index conversion
    pub fn world2index(&self, rsys: ReferenceSystem, x: f64) -> Result<f64> {
        use ReferenceSystem::*;
        let &Self { offset: o, pixel_size: p, center: c, distance: s, wavelength: w } = self;
        Ok(match rsys {
            Array   => x - DAI,
            Image   => x - o - DAI,
            Center  => x - (o - c) - DAI,
            Real    => x / p - o - DAI,
            Normal  => x / p - (o - c) - DAI,
            Tangens => x / (p / s) - (o - c) - DAI,
            Saxs    => x / (p / s * wavenumber(w)) - (o - c) - DAI,
            Region  => return Err(Error::InvalidReferenceSystem(rsys.to_string())),
        })
    }

    /// Offset of an axis whose lower edge lies at world coordinate `lower`.
    /// Not defined for Array and Region.
    pub fn offset_of_lower_edge(&self, rsys: ReferenceSystem, lower: f64) -> Result<f64> {
        use ReferenceSystem::*;
        let &Self { pixel_size: p, center: c, distance: s, wavelength: w, .. } = self;
        let edge = ARRAYSTART + LOWERBORDER;
        Ok(match rsys {
            Image   => lower - edge,
            Center  => lower + c - edge,
            Real    => lower / p - edge,
            Normal  => lower / p + c - edge,
            Tangens => lower / p * s + c - edge,
            Saxs    => lower / p * s / wavenumber(w) + c - edge,
            Array | Region => return Err(Error::InvalidReferenceSystem(rsys.to_string())),
        })
    }

    /// Pixel size whose step in world coordinates of `rsys` is `step`
    pub fn pixel_size_of_step(&self, rsys: ReferenceSystem, step: f64) -> Result<f64> {
        use ReferenceSystem::*;
        Ok(match rsys {
            Real | Normal => step,
            Tangens       => step * self.distance,
            Saxs          => step * self.distance / wavenumber(self.wavelength),
            _ => return Err(Error::InvalidReferenceSystem(rsys.to_string())),
        })
    }

    /// Step in world coordinates of `rsys` which corresponds to one pixel
    pub fn step_of_pixel_size(&self, rsys: ReferenceSystem) -> Result<f64> {
        use ReferenceSystem::*;
        let p = self.pixel_size;
        Ok(match rsys {
            Real | Normal => p,
            Tangens       => p / self.distance,
            Saxs          => p / self.distance * wavenumber(self.wavelength),
            _ => return Err(Error::InvalidReferenceSystem(rsys.to_string())),
        })
    }

    /// Parameters after binning by `bin` (values below 1 count as 1).
    /// `bsize` is the number of raw pixels per current pixel; it is
    /// multiplied by the binning factor and returned alongside.
    pub fn rebinned(&self, bsize: f64, bin: usize) -> (Self, f64) {
        let b = bin.max(1) as f64;
        let offset = ((ARRAYSTART + LOWERBORDER) * (1.0 - b) + self.offset) / b;
        (Self { offset, pixel_size: self.pixel_size * b, center: self.center / b, ..*self }, bsize * b)
    }

    pub fn with_default_center(self, dim: usize) -> Self { Self { center: default_center(dim), ..self } }
}

/// World coordinate of `rw` given in the reference system `r`, expressed in
/// the user system `u`
pub fn ref2user(rw: f64, r: Axis, u: Axis) -> f64 { u.world(r.index(rw)) }

pub fn user2ref(uw: f64, r: Axis, u: Axis) -> f64 { r.world(u.index(uw)) }

/// A distance in the reference system, expressed in the user system
pub fn dref2duser(d: f64, r: Axis, u: Axis) -> f64 { d * (u.ps / r.ps) }

pub fn duser2dref(d: f64, r: Axis, u: Axis) -> f64 { d * (r.ps / u.ps) }

/// Center in pixel coordinates from a Real coordinate
pub fn r2center(real: f64, pixel_size: f64) -> f64 { real / pixel_size }

pub fn center2r(center: f64, pixel_size: f64) -> f64 { center * pixel_size }

/// Outer dimension of a region: size of the unbinned raster with offset 0
/// that covers `dim` pixels of binning size `bsize` exactly
pub fn rasreg(bsize: f64, dim: usize) -> f64 { (INDEXSTART + LOWERBORDER + dim as f64 + DAI) * bsize }

/// Offset after swapping a region within a raster of outer size `rasreg`
pub fn oswap(rasreg: f64, bsize: f64, offset: f64, dim: usize) -> f64 {
    rasreg / bsize - (offset + dim as f64)
}

/// Center after swapping the array, such that it points to the same pixel.
/// `new_offset` is the offset after the swap.
pub fn cswap2(new_offset: f64, center: f64, offset: f64, dim: usize) -> f64 {
    new_offset + offset + dim as f64 - center
}

/// Like [`cswap2`], keeping the offset
pub fn cswap(center: f64, offset: f64, dim: usize) -> f64 { cswap2(offset, center, offset, dim) }

/// Normal to Saxs coordinate
pub fn n2s(normal: f64, distance: f64, wavelength: f64) -> f64 { normal / distance * wavenumber(wavelength) }

pub fn s2n(saxs: f64, distance: f64, wavelength: f64) -> f64 { saxs * distance / wavenumber(wavelength) }

/// Pixel coordinate of the middle of an axis with `dim` pixels
pub fn default_center(dim: usize) -> f64 { (dim as f64 - 1.0) * 0.5 + ARRAYSTART }

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use proptest::prelude::*;
    use rstest::rstest;
    use ReferenceSystem::*;

    const PARAMS: AxisParams = AxisParams {
        offset: 3.0, pixel_size: 1e-4, center: 512.3, distance: 2.0, wavelength: 0.1e-9,
    };

    #[rstest(/**/ rsys   , off              , ps,
             case(Array  , 0.5              , 1.0),
             case(Image  , 3.5              , 1.0),
             case(Center , 3.5 - 512.3      , 1.0),
             case(Real   , 3.5              , 1e-4),
             case(Normal , 3.5 - 512.3      , 1e-4),
             case(Tangens, 3.5 - 512.3      , 5e-5),
             case(Saxs   , 3.5 - 512.3      , 5e-4),
    )]
    fn reference_axis(rsys: ReferenceSystem, off: f64, ps: f64) {
        let axis = PARAMS.axis(rsys).unwrap();
        assert_float_eq!(axis.off, off, abs <= 1e-12);
        assert_float_eq!(axis.ps , ps , r2nd <= 1e-12);
    }

    #[test]
    fn region_has_no_affine_map() {
        assert!(matches!(PARAMS.axis(Region), Err(Error::InvalidReferenceSystem(_))));
    }

    #[test]
    fn parse_and_print_names() {
        for rsys in ReferenceSystem::ALL {
            assert_eq!(rsys.to_string().parse::<ReferenceSystem>().unwrap(), rsys);
        }
        assert_eq!("SAXS".parse::<ReferenceSystem>().unwrap(), Saxs);
        assert!("polar".parse::<ReferenceSystem>().is_err());
        assert_eq!("Waxs".parse::<Projection>().unwrap(), Projection::Waxs);
    }

    #[test]
    fn lower_edge_of_pixel_zero_is_world_zero_in_array_system() {
        let axis = PARAMS.axis(Array).unwrap();
        assert_eq!(axis.world(INDEXSTART + LOWERBORDER), 0.0);
        assert_eq!(axis.world(INDEXSTART), ARRAYSTART);
    }

    #[test]
    fn lower_edge_offset_recovers_offset() {
        for rsys in [Image, Center, Real, Normal, Tangens, Saxs] {
            let lower = PARAMS.index2world(rsys, INDEXSTART + LOWERBORDER).unwrap();
            let offset = PARAMS.offset_of_lower_edge(rsys, lower).unwrap();
            assert_float_eq!(offset, PARAMS.offset, abs <= 1e-9);
        }
        assert!(PARAMS.offset_of_lower_edge(Array, 0.0).is_err());
    }

    #[test]
    fn pixel_size_helpers_are_inverse() {
        for rsys in [Real, Normal, Tangens, Saxs] {
            let step = PARAMS.step_of_pixel_size(rsys).unwrap();
            assert_float_eq!(step, PARAMS.axis(rsys).unwrap().ps, r2nd <= 1e-12);
            assert_float_eq!(PARAMS.pixel_size_of_step(rsys, step).unwrap(), PARAMS.pixel_size, r2nd <= 1e-12);
        }
    }

    #[test]
    fn binning_keeps_world_coordinates_of_edges() {
        let (binned, bsize) = PARAMS.rebinned(1.0, 4);
        assert_eq!(bsize, 4.0);
        // lower edge of the first binned pixel coincides with the old one
        for rsys in [Image, Real, Normal, Saxs] {
            let old = PARAMS.axis(rsys).unwrap().world(LOWERBORDER) / PARAMS.axis(rsys).unwrap().ps;
            let new = binned.axis(rsys).unwrap().world(LOWERBORDER) / binned.axis(rsys).unwrap().ps * 4.0;
            assert_float_eq!(old, new, abs <= 1e-9);
        }
        assert_eq!(PARAMS.rebinned(1.0, 0).0, PARAMS);
    }

    #[test]
    fn swapping_twice_restores_center() {
        let c = cswap(PARAMS.center, PARAMS.offset, 1024);
        assert_float_eq!(cswap(c, PARAMS.offset, 1024), PARAMS.center, ulps <= 2);
        let reg = rasreg(1.0, 1024);
        assert_eq!(reg, 1024.0);
        assert_eq!(oswap(reg, 1.0, 0.0, 1024), 0.0);
    }

    #[test]
    fn user_and_reference_systems() {
        let r = PARAMS.axis(Saxs).unwrap();
        let u = PARAMS.axis(Image).unwrap();
        let image = 100.0;
        let saxs = user2ref(image, r, u);
        assert_float_eq!(saxs, PARAMS.index2world(Saxs, image - 3.5).unwrap(), r2nd <= 1e-12);
        assert_float_eq!(ref2user(saxs, r, u), image, r2nd <= 1e-12);
        assert_float_eq!(dref2duser(duser2dref(2.0, r, u), r, u), 2.0, ulps <= 2);
        assert_float_eq!(s2n(n2s(0.01, 2.0, 1e-10), 2.0, 1e-10), 0.01, r2nd <= 1e-12);
        assert_float_eq!(center2r(r2center(0.05, 1e-4), 1e-4), 0.05, r2nd <= 1e-12);
        assert_eq!(default_center(1024), 512.0);
    }

    proptest! {
        #[test]
        fn index_world_round_trip(
            index in -1e4..1e4_f64,
            offset in -100.0..100.0_f64,
            center in -1e3..1e3_f64,
            pixel_size in 1e-6..1e-3_f64,
            distance in 0.1..10.0_f64,
            wavelength in 1e-11..1e-9_f64,
        ) {
            let params = AxisParams { offset, pixel_size, center, distance, wavelength };
            for rsys in [Array, Image, Center, Real, Normal, Tangens, Saxs] {
                let axis = params.axis(rsys).unwrap();
                let w = axis.world(index);
                prop_assert!((axis.index(w) - index).abs() <= 1e-9 * (1.0 + index.abs()));
                let direct = params.index2world(rsys, index).unwrap();
                prop_assert!((direct - w).abs() <= 1e-9 * (1.0 + w.abs()));
                let back = params.world2index(rsys, w).unwrap();
                prop_assert!((back - index).abs() <= 1e-9 * (1.0 + index.abs()));
            }
        }
    }
}
