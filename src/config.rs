//! Regrouping jobs described in TOML.
//!
//! Quantities may be given as plain numbers (SI base units, radians) or as
//! strings, which are evaluated by the unit-aware expression evaluator:
//! `"100_um"`, `"0.15_nm"`, `"2*pi/360"`, `"90_deg"`.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use geometry::Coord;
use serde::{de, Deserialize, Deserializer};
use units::{expr, m_, parse_angle, parse_length, radian, radian_, Angle, Length};

use crate::error::{Error, Result};
use crate::image::Header;
use crate::ipol::{ddset, Dummy, IpolConfig};
use crate::polarization::{Beam, Polarization};
use crate::reference::{Projection, ReferenceSystem};
use crate::regroup::{Driver, Regroup};

// ----- Quantities ------------------------------------------------------------

/// Value which is either a number or an expression
#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Value(f64),
    Expr(String),
}

trait Quantity: Sized {
    fn from_number(x: f64) -> Self;
    fn evaluate(text: &str) -> std::result::Result<Self, expr::Error>;
}

impl Quantity for f64 {
    fn from_number(x: f64) -> Self { x }
    fn evaluate(text: &str) -> std::result::Result<Self, expr::Error> { expr::str2double(text) }
}

impl Quantity for Length {
    fn from_number(x: f64) -> Self { units::m(x) }
    fn evaluate(text: &str) -> std::result::Result<Self, expr::Error> { parse_length(text) }
}

impl Quantity for Angle {
    fn from_number(x: f64) -> Self { radian(x) }
    fn evaluate(text: &str) -> std::result::Result<Self, expr::Error> { parse_angle(text) }
}

impl Number {
    fn into_quantity<T: Quantity, E: de::Error>(self) -> std::result::Result<T, E> {
        match self {
            Number::Value(x) => Ok(T::from_number(x)),
            Number::Expr(text) => T::evaluate(&text).map_err(|e| E::custom(format!("`{text}`: {e}"))),
        }
    }
}

fn deserialize_quantity<'d, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'d>,
    T: Quantity,
{
    Number::deserialize(deserializer)?.into_quantity()
}

fn deserialize_quantity_opt<'d, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'d>,
    T: Quantity,
{
    Option::<Number>::deserialize(deserializer)?
        .map(Number::into_quantity)
        .transpose()
}

fn into_array<T, E, const N: usize>(numbers: Vec<Number>) -> std::result::Result<[T; N], E>
where
    T: Quantity,
    E: de::Error,
{
    let len = numbers.len();
    let values = numbers.into_iter()
        .map(Number::into_quantity)
        .collect::<std::result::Result<Vec<T>, E>>()?;
    values.try_into().map_err(|_| E::invalid_length(len, &format!("{N} values").as_str()))
}

fn deserialize_quantity_n<'d, D, T, const N: usize>(deserializer: D) -> std::result::Result<[T; N], D::Error>
where
    D: Deserializer<'d>,
    T: Quantity,
{
    into_array(Vec::<Number>::deserialize(deserializer)?)
}

fn deserialize_quantity_n_opt<'d, D, T, const N: usize>(deserializer: D) -> std::result::Result<Option<[T; N]>, D::Error>
where
    D: Deserializer<'d>,
    T: Quantity,
{
    Option::<Vec<Number>>::deserialize(deserializer)?
        .map(into_array)
        .transpose()
}

fn deserialize_from_str<'d, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    String::deserialize(deserializer)?
        .parse()
        .map_err(de::Error::custom)
}

// ----- Job description -------------------------------------------------------

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub driver: Driver,

    /// Reference system of radii (and arcs)
    #[serde(default = "default_rsys")]
    #[serde(deserialize_with = "deserialize_from_str")]
    pub rsys: ReferenceSystem,

    pub input: Input,

    pub output: Output,

    #[serde(default)]
    pub regroup: Params,

    #[serde(default)]
    pub ipol: IpolConfig,

    /// Divide the input by the polarization factor before regrouping
    pub polarization: Option<PolarizationParams>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Input {
    /// Raw little-endian `f32` data
    pub file: PathBuf,
    pub variance: Option<PathBuf>,
    pub dim: [usize; 2],
    #[serde(default)]
    pub offset: [f64; 2],
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_n_opt")]
    pub pixel_size: Option<[Length; 2]>,
    /// Point of normal incidence, in pixel coordinates
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_n_opt")]
    pub center: Option<[f64; 2]>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_opt")]
    pub distance: Option<Length>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_opt")]
    pub wavelength: Option<Length>,
    #[serde(default)]
    pub dummy: f32,
    pub ddummy: Option<f32>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_n_opt")]
    pub rotation: Option<[Angle; 3]>,
    #[serde(default)]
    pub projection: Projection,
    /// Raster orientation of the stored data
    #[serde(default = "default_orientation")]
    pub orientation: i64,
    /// Combine blocks of pixels before regrouping
    pub bin: Option<[usize; 2]>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Output {
    pub file: PathBuf,
    /// Written if the input has a variance
    pub variance: Option<PathBuf>,
    pub dim: [usize; 2],
    #[serde(default)]
    pub offset: [f64; 2],
    /// Radial and angular (or arc) pixel sizes, in meters or radians
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_n_opt")]
    pub pixel_size: Option<[f64; 2]>,
    /// Instead of `pixel_size`: the world step of one pixel along each axis,
    /// in the reference system of that axis
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_n_opt")]
    pub step: Option<[f64; 2]>,
    /// World coordinates of the lower edge of the first pixel. Replaces `offset`.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_n_opt")]
    pub lower: Option<[f64; 2]>,
    /// Pixel coordinates of radius zero and angle (or arc) zero
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_n_opt")]
    pub center: Option<[f64; 2]>,
    /// Defaults to the input distance
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_opt")]
    pub distance: Option<Length>,
    /// Defaults to the input wavelength
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_quantity_opt")]
    pub wavelength: Option<Length>,
    /// Defaults to the input dummy
    pub dummy: Option<f32>,
    #[serde(default)]
    pub projection: Projection,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Params {
    #[serde(deserialize_with = "deserialize_quantity")]
    pub angle_min: Angle,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub angle_max: Angle,
    /// Shift of the output origin, in output pixels
    pub shift: [f64; 2],
    /// Center of the `angle` driver, Normal world coordinates of the input
    #[serde(deserialize_with = "deserialize_quantity_n")]
    pub center: [Length; 2],
    pub vsum: bool,
    pub ave: bool,
}

impl Default for Params {
    fn default() -> Self {
        let r = Regroup::default();
        Self {
            angle_min: r.angle_min,
            angle_max: r.angle_max,
            shift: r.shift,
            center: [units::m(r.center.s1), units::m(r.center.s2)],
            vsum: r.vsum,
            ave: r.ave,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolarizationParams {
    /// Degree of polarization
    pub degree: f64,
    #[serde(default = "zero_angle")]
    #[serde(deserialize_with = "deserialize_quantity")]
    pub chi: Angle,
    #[serde(default = "zero_angle")]
    #[serde(deserialize_with = "deserialize_quantity")]
    pub psi: Angle,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default)]
    pub invert: bool,
}

fn default_rsys() -> ReferenceSystem { ReferenceSystem::Saxs }
fn default_orientation() -> i64 { 1 }
fn default_factor() -> f64 { 1.0 }
fn zero_angle() -> Angle { radian(0.0) }

pub fn read_config_file(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

impl Config {

    /// Geometry of the input file, as stored
    pub fn input_header(&self) -> Header {
        let i = &self.input;
        let dummy = Dummy::new(i.dummy, i.ddummy.unwrap_or_else(|| ddset(i.dummy)));
        Header {
            offset: i.offset,
            pixel_size: i.pixel_size.map_or([None; 2], |p| p.map(|l| Some(m_(l)))),
            center: i.center.map_or([None; 2], |c| c.map(Some)),
            distance: i.distance.map(m_),
            wavelength: i.wavelength.map(m_),
            dummy,
            rotation: i.rotation.unwrap_or([radian(0.0); 3]),
            projection: i.projection,
            orientation: i.orientation,
            ..Header::new(i.dim)
        }
    }

    /// Reference systems of the two output axes: radii in `rsys`, angles in
    /// radians, arcs in `rsys`
    pub fn output_systems(&self) -> [ReferenceSystem; 2] {
        match self.driver {
            Driver::Ang   => [self.rsys, ReferenceSystem::Normal],
            Driver::Arc   => [self.rsys, self.rsys],
            Driver::Angle => [ReferenceSystem::Normal; 2],
        }
    }

    /// Grid of the regrouped image. `input` is the input geometry after
    /// orientation and binning.
    pub fn output_header(&self, input: &Header) -> Result<Header> {
        let o = &self.output;
        let systems = self.output_systems();
        let mut header = Header {
            offset: o.offset,
            center: o.center.unwrap_or([0.0; 2]).map(Some),
            distance: o.distance.map(m_).or(input.distance),
            wavelength: o.wavelength.map(m_).or(input.wavelength),
            dummy: o.dummy.map_or(input.dummy, Dummy::with_default_tolerance),
            projection: o.projection,
            ..Header::new(o.dim)
        };
        header.pixel_size = match (o.pixel_size, o.step) {
            (Some(pixel_size), None) => pixel_size.map(Some),
            (None, Some(step)) => {
                // the pixel size itself does not enter the conversion
                let unit_sized = Header { pixel_size: [Some(1.0); 2], ..header.clone() };
                let size = |i: usize| unit_sized.axis_params(i, systems[i])?.pixel_size_of_step(systems[i], step[i]);
                [Some(size(0)?), Some(size(1)?)]
            }
            _ => return Err(Error::InvalidParameter("output needs either `pixel_size` or `step`".into())),
        };
        if let Some(lower) = o.lower {
            for i in 0..2 {
                header.offset[i] = header.axis_params(i, systems[i])?.offset_of_lower_edge(systems[i], lower[i])?;
            }
        }
        Ok(header)
    }

    /// World steps of one pixel of `output`, in [`Self::output_systems`]
    pub fn output_steps(&self, output: &Header) -> Result<[f64; 2]> {
        let systems = self.output_systems();
        let step = |i: usize| output.axis_params(i, systems[i])?.step_of_pixel_size(systems[i]);
        Ok([step(0)?, step(1)?])
    }

    pub fn regroup(&self) -> Regroup {
        let p = &self.regroup;
        Regroup {
            rsys: self.rsys,
            angle_min: p.angle_min,
            angle_max: p.angle_max,
            shift: p.shift,
            center: Coord::new(m_(p.center[0]), m_(p.center[1])),
            vsum: p.vsum,
            ave: p.ave,
            ipol: self.ipol,
        }
    }

    /// Polarization correction for an input with geometry `input`, if any
    pub fn polarization(&self, input: &Header) -> Result<Option<Polarization>> {
        let Some(p) = self.polarization else { return Ok(None) };
        let beam = Beam { degree: p.degree, chi: p.chi, psi: p.psi };
        let k = input.wavenumber()?;
        Polarization::new(input.orientation, k, input.rotation, beam, p.factor, p.invert).map(Some)
    }

    /// Human readable summary of the derived geometry
    pub fn describe(&self) -> String {
        let i = self.input_header();
        let r = self.regroup();
        let grid = match self.output_header(&i).and_then(|o| Ok((o.pixel_size, self.output_steps(&o)?))) {
            Ok((pixel_size, steps)) => format!("pixel size {pixel_size:?}, steps {steps:?} in {:?}", self.output_systems()),
            Err(e) => format!("undefined ({e})"),
        };
        format!(
            "driver {} in {} system\n\
             input  {:?} pixels, pixel size {:?} m, center {:?}, distance {:?} m, wavelength {:?} m, {} projection\n\
             output {:?} pixels, {}, {} projection\n\
             angles {:.6} .. {:.6} rad, shift {:?}, ave {}, vsum {}\n\
             interpolation {:?}",
            self.driver, self.rsys,
            i.dim, i.pixel_size, i.center, i.distance, i.wavelength, i.projection,
            self.output.dim, grid, self.output.projection,
            radian_(r.angle_min), radian_(r.angle_max), r.shift, r.ave, r.vsum,
            r.ipol,
        )
    }
}
