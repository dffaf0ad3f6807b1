//! Interpolation and area integration of image pixels.
//!
//! Pixel `i` of an axis covers the fractional index interval `[i-0.5, i+0.5]`.
//! The integrators take a rectangle in fractional indices and weight every
//! source pixel with the area it shares with the rectangle. Dummy pixels and
//! pixels outside the image do not contribute.
//!
//! Behaviour which used to be process-wide state (integration mode, weighting
//! and minimum coverage) is passed explicitly in an [`IpolConfig`].

mod bilinear;
mod isum;
mod rebin;

pub use rebin::rebin2;

use ndarray::ArrayView2;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Smallest tolerance used for dummy comparisons
pub const MIN_DDUMMY: f32 = 0.1;

/// Variance of a pixel whose variance is unknown
pub const VAR_DUMMY: f32 = -1.0;

/// Fractional remainders below this are treated as exact pixel positions
pub const IPOL_EPS: f64 = 1e-4;

/// Weights below this are treated as zero
pub const WEIGHT_EPS: f64 = 1e-32;

/// Default tolerance for the dummy value `value`
pub fn ddset(value: f32) -> f32 { MIN_DDUMMY.max(value.abs() * 1e-5) }

/// Marker value of invalid pixels, with its comparison tolerance
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Dummy {
    pub value: f32,
    pub tolerance: f32,
}

impl Dummy {
    pub const fn new(value: f32, tolerance: f32) -> Self { Self { value, tolerance } }

    pub fn with_default_tolerance(value: f32) -> Self { Self::new(value, ddset(value)) }

    /// No pixel is ever a dummy
    pub const fn none() -> Self { Self::new(0.0, 0.0) }

    fn tol(&self) -> f32 { self.tolerance.max(MIN_DDUMMY) }

    /// A dummy value close to zero cannot be distinguished from data
    pub fn is_defined(&self) -> bool { self.value.abs() > self.tol() }

    pub fn is_dummy(&self, v: f32) -> bool { self.is_defined() && (v - self.value).abs() <= self.tol() }

    /// Initialize a dummy destination with `v`, otherwise accumulate
    pub fn update(&self, dest: &mut f32, v: f32) {
        if self.is_dummy(*dest) { *dest = v } else { *dest += v }
    }
}

impl Default for Dummy {
    fn default() -> Self { Self::none() }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Integrate exactly over the requested rectangle
    #[default]
    Normal,
    /// Enlarge sub-pixel rectangles to unit width and rescale the result
    AntiAliased,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// All pixels weighted by their overlap area
    #[default]
    Equal,
    /// Overlap area divided by the pixel variance
    Variance,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IpolConfig {
    pub mode: Mode,
    pub weighting: Weighting,
    /// Minimum fraction of the requested area which must be covered by
    /// valid pixels
    pub min_coverage: f64,
}

impl Default for IpolConfig {
    fn default() -> Self { Self { mode: Mode::Normal, weighting: Weighting::Equal, min_coverage: 0.5 } }
}

impl IpolConfig {
    pub fn builder() -> IpolConfigBuilder { IpolConfigBuilder(Self::default()) }
}

#[derive(Clone, Copy, Debug)]
pub struct IpolConfigBuilder(IpolConfig);

impl IpolConfigBuilder {
    pub fn mode        (mut self, mode: Mode)           -> Self { self.0.mode = mode;                 self }
    pub fn weighting   (mut self, weighting: Weighting) -> Self { self.0.weighting = weighting;       self }
    pub fn min_coverage(mut self, minimum: f64)         -> Self { self.0.min_coverage = minimum;      self }
    pub fn anti_aliased(self) -> Self { self.mode(Mode::AntiAliased) }
    pub fn build(self) -> IpolConfig { self.0 }
}

/// Result of a successful integration or interpolation.
///
/// `sum` and `weight` carry the sign of the integration direction;
/// `varweight` is always `|weight|`. `varsum` is `None` when the variance
/// could not be determined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Integral {
    pub sum: f64,
    pub weight: f64,
    pub varsum: Option<f64>,
    pub varweight: f64,
    /// Number of distinct source pixels which contributed
    pub cnt: usize,
}

impl Integral {
    /// Average intensity of the covered pixels
    pub fn value(&self) -> f64 { self.sum / self.weight }

    /// Variance of [`Integral::value`]
    pub fn variance(&self) -> Option<f64> { self.varsum.map(|v| v / (self.varweight * self.varweight)) }
}

/// Why a sample produced no datum
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejected {
    #[error("sample lies outside the image")]
    OutsideImage,
    #[error("all source pixels are dummies")]
    DummySource,
    #[error("insufficient coverage")]
    InsufficientCoverage,
}

impl From<Rejected> for Error {
    fn from(r: Rejected) -> Self {
        match r {
            Rejected::DummySource => Error::DummySource,
            Rejected::OutsideImage | Rejected::InsufficientCoverage => Error::InsufficientCoverage,
        }
    }
}

/// Borrowed image data, with optional variance, read by the integrators.
/// Arrays have shape `(dim2, dim1)`: axis 1 runs fastest.
#[derive(Clone, Copy, Debug)]
pub struct Source<'a> {
    data: ArrayView2<'a, f32>,
    variance: Option<ArrayView2<'a, f32>>,
    dummy: Dummy,
}

impl<'a> Source<'a> {
    pub fn new(data: ArrayView2<'a, f32>, dummy: Dummy) -> Self { Self { data, variance: None, dummy } }

    pub fn with_variance(self, variance: ArrayView2<'a, f32>) -> Result<Self> {
        if variance.dim() != self.data.dim() {
            return Err(Error::Dimensions(format!(
                "variance {:?} does not match data {:?}", variance.dim(), self.data.dim())));
        }
        Ok(Self { variance: Some(variance), ..self })
    }

    pub fn without_variance(self) -> Self { Self { variance: None, ..self } }

    pub fn dim1(&self) -> usize { self.data.ncols() }
    pub fn dim2(&self) -> usize { self.data.nrows() }
    pub fn dummy(&self) -> Dummy { self.dummy }
    pub fn has_variance(&self) -> bool { self.variance.is_some() }

    /// Valid intensity of pixel `(i1, i2)`
    fn value(&self, i1: usize, i2: usize) -> Option<f64> {
        let v = self.data[[i2, i1]];
        (!self.dummy.is_dummy(v)).then_some(v as f64)
    }

    /// Variance of pixel `(i1, i2)`, zero without a variance array
    fn var(&self, i1: usize, i2: usize) -> f64 {
        self.variance.map_or(0.0, |var| var[[i2, i1]] as f64)
    }

    /// Average over the rectangle, or interpolated value, using the
    /// weighting selected in `cfg`
    pub fn average(&self, cfg: &IpolConfig, f1: geometry::Coord, f3: geometry::Coord) -> Option<f64> {
        self.isum2ldw_e(cfg, f1, f3).ok().map(|i| i.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(/**/ value, tolerance, v    , dummy,
             case(-1.0 , 0.1      , -1.0 , true ),
             case(-1.0 , 0.1      , -1.05, true ),
             case(-1.0 , 0.1      , -1.2 , false),
             case(-1.0 , 0.0      , -0.95, true ), // tolerance never below 0.1
             case( 0.0 , 0.1      ,  0.0 , false), // undefined dummy
             case( 0.05, 0.0      ,  0.05, false),
             case(1e6  , 10.0     , 1e6+5.0, true),
    )]
    fn dummy_comparison(value: f32, tolerance: f32, v: f32, dummy: bool) {
        assert_eq!(Dummy::new(value, tolerance).is_dummy(v), dummy);
    }

    #[test]
    fn default_tolerance() {
        assert_eq!(ddset(-1.0), 0.1);
        assert_eq!(ddset(1e7), 100.0);
    }

    #[test]
    fn update_initializes_dummies() {
        let d = Dummy::new(-1.0, 0.1);
        let mut x = -1.0;
        d.update(&mut x, 3.0);
        assert_eq!(x, 3.0);
        d.update(&mut x, 2.0);
        assert_eq!(x, 5.0);
    }

    #[test]
    fn builder() {
        let cfg = IpolConfig::builder().anti_aliased().weighting(Weighting::Variance).min_coverage(0.2).build();
        assert_eq!(cfg, IpolConfig { mode: Mode::AntiAliased, weighting: Weighting::Variance, min_coverage: 0.2 });
        assert_eq!(IpolConfig::builder().build(), IpolConfig::default());
    }

    #[test]
    fn variance_shape_mismatch() {
        let data = ndarray::Array2::<f32>::zeros((3, 4));
        let var = ndarray::Array2::<f32>::zeros((4, 3));
        assert!(Source::new(data.view(), Dummy::none()).with_variance(var.view()).is_err());
    }
}
