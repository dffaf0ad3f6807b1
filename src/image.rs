//! Two-dimensional detector images with their geometry.

use ndarray::{Array2, Zip};
use tracing::{debug, warn};
use units::{radian, Angle};

use crate::error::{Error, Result};
use crate::ipol::{rebin2, Dummy, Source, VAR_DUMMY};
use crate::polarization::Polarization;
use crate::raster::{normalize_in_place, Order};
use crate::reference::{Axis, AxisParams, Projection, ReferenceSystem};

/// Geometry and bookkeeping of an image.
///
/// Axis-specific values are indexed by `axis - 1`. Values which are not
/// needed by every reference system are optional; using a system which
/// needs a missing value is an [`Error::UninitializedGeometry`].
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub dim: [usize; 2],
    pub offset: [f64; 2],
    /// Pixel sizes in meters (radians for angular axes)
    pub pixel_size: [Option<f64>; 2],
    /// Point of normal incidence, in pixel coordinates
    pub center: [Option<f64>; 2],
    /// Sample to detector distance in meters
    pub distance: Option<f64>,
    /// Wavelength in meters
    pub wavelength: Option<f64>,
    pub dummy: Dummy,
    /// Detector rotation about axes 1, 2 and 3
    pub rotation: [Angle; 3],
    pub projection: Projection,
    /// Raster orientation of the stored data (1 is canonical)
    pub orientation: i64,
    /// Raw pixels per pixel, along each axis
    pub bsize: [f64; 2],
}

impl Header {
    pub fn new(dim: [usize; 2]) -> Self {
        Self {
            dim,
            offset: [0.0; 2],
            pixel_size: [None; 2],
            center: [None; 2],
            distance: None,
            wavelength: None,
            dummy: Dummy::none(),
            rotation: [radian(0.0); 3],
            projection: Projection::Saxs,
            orientation: 1,
            bsize: [1.0; 2],
        }
    }

    /// Number of pixels
    pub fn len(&self) -> usize { self.dim[0] * self.dim[1] }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Shape of the data array, `(dim2, dim1)`
    pub fn shape(&self) -> (usize, usize) { (self.dim[1], self.dim[0]) }

    /// Parameters of axis `i` (0 or 1), as far as `rsys` needs them. Values
    /// which `rsys` does not use are NaN when missing.
    pub fn axis_params(&self, i: usize, rsys: ReferenceSystem) -> Result<AxisParams> {
        use ReferenceSystem::*;
        let needs_pixel_size  = matches!(rsys, Real | Normal | Tangens | Saxs);
        let needs_center      = matches!(rsys, Center | Normal | Tangens | Saxs);
        let needs_distance    = matches!(rsys, Tangens | Saxs);
        let needs_wavelength  = matches!(rsys, Saxs);
        let get = |value: Option<f64>, needed: bool, name: &'static str| match (value, needed) {
            (Some(v), _)    => Ok(v),
            (None, false)   => Ok(f64::NAN),
            (None, true)    => Err(Error::UninitializedGeometry(name)),
        };
        let (pixel_size, center) = match i {
            0 => (get(self.pixel_size[0], needs_pixel_size, "pixel size 1")?, get(self.center[0], needs_center, "center 1")?),
            _ => (get(self.pixel_size[1], needs_pixel_size, "pixel size 2")?, get(self.center[1], needs_center, "center 2")?),
        };
        Ok(AxisParams {
            offset: self.offset[i.min(1)],
            pixel_size,
            center,
            distance: get(self.distance, needs_distance, "sample distance")?,
            wavelength: get(self.wavelength, needs_wavelength, "wavelength")?,
        })
    }

    /// `(Off, Ps)` of axis `i` in `rsys`
    pub fn axis(&self, i: usize, rsys: ReferenceSystem) -> Result<Axis> {
        self.axis_params(i, rsys)?.axis(rsys)
    }

    /// Wavenumber in units of the Saxs reference system
    pub fn wavenumber(&self) -> Result<f64> {
        self.wavelength
            .map(crate::reference::wavenumber)
            .ok_or(Error::UninitializedGeometry("wavelength"))
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation.iter().any(|r| units::radian_(*r) != 0.0)
    }

    /// Geometry after combining blocks of `bin` pixels
    pub fn rebinned(&self, bin: [usize; 2]) -> Self {
        let mut out = self.clone();
        for i in 0..2 {
            let params = AxisParams {
                offset: self.offset[i],
                pixel_size: self.pixel_size[i].unwrap_or(f64::NAN),
                center: self.center[i].unwrap_or(f64::NAN),
                distance: f64::NAN,
                wavelength: f64::NAN,
            };
            let (binned, bsize) = params.rebinned(self.bsize[i], bin[i]);
            out.dim[i] = self.dim[i] / bin[i].max(1);
            out.offset[i] = binned.offset;
            out.pixel_size[i] = self.pixel_size[i].map(|_| binned.pixel_size);
            out.center[i] = self.center[i].map(|_| binned.center);
            out.bsize[i] = bsize;
        }
        out
    }
}

/// Image data with optional variance. Arrays have shape `(dim2, dim1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub header: Header,
    pub data: Array2<f32>,
    pub variance: Option<Array2<f32>>,
}

impl Image {

    pub fn new(header: Header, data: Array2<f32>) -> Result<Self> {
        if data.dim() != header.shape() {
            return Err(Error::Dimensions(format!(
                "data has shape {:?}, header expects {:?}", data.dim(), header.shape())));
        }
        Ok(Self { header, data, variance: None })
    }

    pub fn with_variance(self, variance: Array2<f32>) -> Result<Self> {
        if variance.dim() != self.data.dim() {
            return Err(Error::Dimensions(format!(
                "variance has shape {:?}, data {:?}", variance.dim(), self.data.dim())));
        }
        Ok(Self { variance: Some(variance), ..self })
    }

    /// Image filled with its dummy value, and with a variance array filled
    /// with [`VAR_DUMMY`] if `variance` is set
    pub fn blank(header: Header, variance: bool) -> Self {
        let shape = header.shape();
        Self {
            data: Array2::from_elem(shape, header.dummy.value),
            variance: variance.then(|| Array2::from_elem(shape, VAR_DUMMY)),
            header,
        }
    }

    /// Read access for the integrators
    pub fn source(&self) -> Result<Source<'_>> {
        let source = Source::new(self.data.view(), self.header.dummy);
        match &self.variance {
            Some(var) => source.with_variance(var.view()),
            None      => Ok(source),
        }
    }

    /// Rearrange data stored in raster configuration `header.orientation`
    /// into configuration 1.
    ///
    /// `header.dim` holds the lengths of the image coordinates; the data is
    /// read in its memory order, whatever shape the array has. The header
    /// geometry is taken to be given for the canonical configuration already.
    pub fn normalize_orientation(&mut self) -> Result<()> {
        if self.header.orientation == 1 { return Ok(()) }
        let order = Order::from_number(2, self.header.orientation)?;
        let dim = [self.header.dim[0], self.header.dim[1]];
        let shape = self.header.shape();
        debug!(orientation = self.header.orientation, %order, "normalizing raster orientation");
        let reorder = |array: &Array2<f32>| -> Result<Array2<f32>> {
            let mut flat: Vec<f32> = array.iter().copied().collect();
            normalize_in_place(&mut flat, &dim, &order)?;
            Array2::from_shape_vec(shape, flat).map_err(|e| Error::Dimensions(e.to_string()))
        };
        self.data = reorder(&self.data)?;
        self.variance = self.variance.as_ref().map(reorder).transpose()?;
        self.header.orientation = 1;
        Ok(())
    }

    /// Combine blocks of `bin` pixels, averaging or summing them.
    ///
    /// Summed variances are the variances of the sums. Averaged variances
    /// would need the number of valid pixels per block, so averaging drops
    /// the variance.
    pub fn rebin(&self, bin: [usize; 2], average: bool) -> Self {
        let dummy = self.header.dummy;
        let var_dummy = Dummy::with_default_tolerance(VAR_DUMMY);
        let variance = match (&self.variance, average) {
            (Some(var), false) => Some(rebin2(var.view(), var_dummy, (bin[0], bin[1]), false)),
            (Some(_), true) => {
                warn!("variance dropped while averaging blocks of {bin:?} pixels");
                None
            }
            (None, _) => None,
        };
        Self {
            header: self.header.rebinned(bin),
            data: rebin2(self.data.view(), dummy, (bin[0], bin[1]), average),
            variance,
        }
    }

    /// Divide every valid pixel by the polarization factor at its Saxs
    /// coordinate. Pixels without a factor become dummies.
    pub fn correct_polarization(&mut self, polarization: &Polarization) -> Result<()> {
        let ax1 = self.header.axis(0, ReferenceSystem::Saxs)?;
        let ax2 = self.header.axis(1, ReferenceSystem::Saxs)?;
        let projection = self.header.projection;
        let mut factors = Array2::<f64>::zeros(self.data.dim());
        Zip::indexed(&mut factors).par_for_each(|(i2, i1), f| {
            let wc = geometry::Coord::new(ax1.world(i1 as f64), ax2.world(i2 as f64));
            *f = polarization.factor(wc, projection).unwrap_or(f64::NAN);
        });
        let dummy = self.header.dummy;
        let mut lost = 0_usize;
        Zip::from(&mut self.data).and(&factors).for_each(|v, &f| {
            if dummy.is_dummy(*v) { return }
            if f.is_nan() { *v = dummy.value; lost += 1 } else { *v = (*v as f64 / f) as f32 }
        });
        if let Some(var) = &mut self.variance {
            Zip::from(var).and(&factors).for_each(|v, &f| {
                if *v < 0.0 { return }
                *v = if f.is_nan() { VAR_DUMMY } else { (*v as f64 / (f * f)) as f32 };
            });
        }
        if lost > 0 { warn!(lost, "pixels without polarization factor set to dummy") }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polarization::Beam;
    use float_eq::assert_float_eq;
    use ndarray::arr2;
    use pretty_assertions::assert_eq;

    fn header() -> Header {
        Header {
            pixel_size: [Some(1e-4), Some(2e-4)],
            center: [Some(1.5), Some(0.5)],
            distance: Some(0.5),
            wavelength: Some(1e-10),
            dummy: Dummy::new(-1.0, 0.1),
            ..Header::new([3, 2])
        }
    }

    #[test]
    fn shape_is_checked() {
        assert!(Image::new(header(), Array2::zeros((2, 3))).is_ok());
        assert!(matches!(Image::new(header(), Array2::zeros((3, 2))), Err(Error::Dimensions(_))));
        let image = Image::new(header(), Array2::zeros((2, 3))).unwrap();
        assert!(image.with_variance(Array2::zeros((1, 3))).is_err());
    }

    #[test]
    fn missing_geometry() {
        let h = Header { distance: None, ..header() };
        assert!(h.axis(0, ReferenceSystem::Normal).is_ok());
        assert!(matches!(h.axis(0, ReferenceSystem::Saxs), Err(Error::UninitializedGeometry("sample distance"))));
        let h = Header::new([4, 4]);
        assert!(h.axis(1, ReferenceSystem::Image).is_ok());
        assert!(matches!(h.axis(1, ReferenceSystem::Real), Err(Error::UninitializedGeometry("pixel size 2"))));
        assert!(h.wavenumber().is_err());
    }

    #[test]
    fn blank_image() {
        let image = Image::blank(header(), true);
        assert!(image.data.iter().all(|&v| v == -1.0));
        assert!(image.variance.unwrap().iter().all(|&v| v == VAR_DUMMY));
        assert_eq!(Image::blank(header(), false).variance, None);
    }

    #[test]
    fn orientation_2_flips_axis_1() {
        let h = Header { orientation: 2, ..header() };
        let mut image = Image::new(h, arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])).unwrap();
        image.normalize_orientation().unwrap();
        assert_eq!(image.data, arr2(&[[3.0, 2.0, 1.0], [6.0, 5.0, 4.0]]));
        assert_eq!(image.header.orientation, 1);
    }

    #[test]
    fn orientation_5_swaps_axes() {
        // stored with axis 2 fastest: memory order is the transpose
        let h = Header { orientation: 5, ..header() };
        let stored = Array2::from_shape_vec((2, 3), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]).unwrap();
        let mut image = Image::new(h, stored).unwrap();
        image.normalize_orientation().unwrap();
        assert_eq!(image.data, arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
    }

    #[test]
    fn rebin_sums_variance() {
        let image = Image::new(Header { dim: [2, 2], ..header() }, arr2(&[[1.0, 2.0], [3.0, -1.0]])).unwrap()
            .with_variance(arr2(&[[0.5, 0.5], [1.0, 1.0]])).unwrap();
        let summed = image.rebin([2, 2], false);
        assert_eq!(summed.data, arr2(&[[6.0]]));
        assert_eq!(summed.variance, Some(arr2(&[[3.0]])));
        assert_eq!(summed.header.dim, [1, 1]);
        assert_eq!(summed.header.bsize, [2.0, 2.0]);
        let averaged = image.rebin([2, 2], true);
        assert_eq!(averaged.data, arr2(&[[2.0]]));
        assert_eq!(averaged.variance, None);
    }

    #[test]
    fn polarization_correction_at_center_is_identity() {
        // unpolarized beam: factor (1 + cos²2θ)/2, exactly 1 on the beam
        let h = Header { center: [Some(1.5), Some(0.5)], ..header() };
        let data = arr2(&[[2.0, 2.0, 2.0], [2.0, -1.0, 2.0]]);
        let mut image = Image::new(h, data).unwrap();
        let beam = Beam { degree: 0.0, chi: radian(0.0), psi: radian(0.0) };
        let k = image.header.wavenumber().unwrap();
        let pol = Polarization::new(1, k, [radian(0.0); 3], beam, 1.0, false).unwrap();
        image.correct_polarization(&pol).unwrap();
        // pixel (1, 0) lies on the beam, all others scatter
        assert!(image.data[[0, 1]] >= 2.0);
        assert_float_eq!(image.data[[0, 1]], 2.0, abs <= 1e-5);
        assert_eq!(image.data[[1, 1]], -1.0);
    }
}
