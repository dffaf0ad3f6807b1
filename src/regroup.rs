//! Regrouping of detector images onto polar grids.
//!
//! All drivers walk the pixels of an output image whose axis 1 is a radius
//! and whose axis 2 is an angle ([`Driver::Ang`], [`Driver::Angle`]) or an
//! arc length ([`Driver::Arc`]). Every output pixel is split into angular
//! sub-samples; each sub-sample is mapped onto the input detector and
//! integrated over one input pixel. Sub-samples without a geometric solution
//! or without valid input pixels are skipped; output pixels without any
//! sample keep their dummy value.
//!
//! Output rows are computed in parallel and written back in order, with the
//! accumulate-or-initialize rule of [`Dummy::update`].

mod ang;
mod angle;
mod arc;
mod limits;

pub use limits::{ang_limits, ang_range, angle_limits, world_extent, Limits};

use std::f64::consts::TAU;
use std::ops::Range;

use geometry::Coord;
use rayon::prelude::*;
use serde::Deserialize;
use units::{radian, radian_, Angle};

use crate::error::{Error, Result};
use crate::image::{Header, Image};
use crate::ipol::{Dummy, Integral, IpolConfig, Rejected, Source, VAR_DUMMY};
use crate::reference::{Axis, ReferenceSystem, INDEXSTART, LOWERBORDER};
use crate::waxs::{DetectorPair, Transform, WaxsParams};

/// Radii below this are treated as the center
const RADIUS_EPS: f64 = 1e-32;

/// Which polar grid the output has
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Radius and angle, Saxs or Normal reference system, any projection
    #[default]
    Ang,
    /// Radius and arc length
    Arc,
    /// Radius and angle around an arbitrary center, Normal reference system
    Angle,
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self { Driver::Ang => "ang", Driver::Arc => "arc", Driver::Angle => "angle" };
        write!(f, "{name}")
    }
}

/// Parameters of a regrouping, shared by all drivers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Regroup {
    /// Reference system of radii and arcs (Saxs or Normal)
    pub rsys: ReferenceSystem,
    /// Output angles covered, `[min, max]`; at most one turn is used
    pub angle_min: Angle,
    pub angle_max: Angle,
    /// Shift of the output origin, in output pixels
    pub shift: [f64; 2],
    /// Center of the polar grid in input world coordinates ([`Driver::Angle`] only)
    pub center: Coord,
    /// Multiply each output value by the covered area
    pub vsum: bool,
    /// Divide each output value by the covered area
    pub ave: bool,
    pub ipol: IpolConfig,
}

impl Default for Regroup {
    fn default() -> Self {
        Self {
            rsys: ReferenceSystem::Saxs,
            angle_min: radian(0.0),
            angle_max: radian(TAU),
            shift: [0.0; 2],
            center: Coord::new(0.0, 0.0),
            vsum: false,
            ave: true,
            ipol: IpolConfig::default(),
        }
    }
}

impl Regroup {

    /// Regroup `input` onto the grid described by `output`
    pub fn run(&self, driver: Driver, input: &Image, output: Header) -> Result<Image> {
        match driver {
            Driver::Ang   => self.ang_sum(input, output),
            Driver::Arc   => self.arc_sum(input, output),
            Driver::Angle => self.angle_sum(input, output),
        }
    }

    /// Requested angular range in radians. A maximum below the minimum
    /// continues through the next turn; at most one turn is used.
    fn angle_range(&self) -> (f64, f64) {
        let min = radian_(self.angle_min);
        let mut max = radian_(self.angle_max);
        if max < min { max += TAU }
        (min, max.min(min + TAU))
    }

    /// Parts of the requested angles which the input covers, with the input
    /// angles `limits.min_angle..limits.max_angle` taken in the turn of the
    /// requested minimum, the turn before and the turn after. Empty parts are
    /// dropped.
    fn angle_ranges(&self, limits: &Limits) -> Vec<(f64, f64)> {
        let (angle_min, angle_max) = self.angle_range();
        let turn = (angle_min / TAU).floor() * TAU;
        let (min_angle, max_angle) = (limits.min_angle + turn, limits.max_angle + turn);
        let fst0 = angle_min.max(min_angle);
        let lst0 = angle_max.min(max_angle);
        [
            (fst0, lst0),
            (angle_min, fst0.min(max_angle - TAU)),
            (lst0.max(min_angle + TAU), angle_max),
        ]
        .into_iter()
        .filter(|(fst, lst)| fst < lst)
        .collect()
    }

    /// Input and output axes for a radius/`rsys2` output grid, with the
    /// output shift applied
    fn axes(&self, input: &Header, output: &Header, rsys2: ReferenceSystem) -> Result<Axes> {
        let rsys = self.rsys;
        if !matches!(rsys, ReferenceSystem::Saxs | ReferenceSystem::Normal) {
            return Err(Error::InvalidReferenceSystem(rsys.to_string()));
        }
        Ok(Axes {
            in1: input.axis(0, rsys)?,
            in2: input.axis(1, rsys)?,
            out1: output.axis(0, rsys)?.shifted(self.shift[0]),
            out2: output.axis(1, rsys2)?.shifted(self.shift[1]),
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct Axes { in1: Axis, in2: Axis, out1: Axis, out2: Axis }

impl Axes {
    /// Fractional input pixel indices of the input world coordinate `w`
    fn input_index(&self, w: Coord) -> Coord { Coord::new(self.in1.index(w.s1), self.in2.index(w.s2)) }

    /// Output pixels `[first, last)` along axis 1 whose radius may lie in
    /// `[min, max]`, including a pixel centered exactly on `min`
    fn radius_pixels(&self, min: f64, max: f64, dim: usize) -> Range<usize> {
        pixels(self.out1.index(min) + 0.5, self.out1.index(max) + 0.5, dim)
    }

    /// World coordinates of the outer edges of the `dim` output pixels along
    /// axis 2, lowest first
    fn angle_extent(&self, dim: usize) -> (f64, f64) {
        let lower_edge = INDEXSTART + LOWERBORDER;
        let (a, b) = (self.out2.world(lower_edge), self.out2.world(lower_edge + dim as f64));
        (a.min(b), a.max(b))
    }

    /// Output pixels `[first, last)` along axis 2 touching `[fst, lst]`
    fn angle_pixels(&self, fst: f64, lst: f64, dim: usize) -> Range<usize> {
        pixels(self.out2.index(fst) + 0.5, self.out2.index(lst) + 0.5, dim)
    }
}

/// Pixels from `floor(first)` up to, excluding, `ceil(last)`, within `[0, dim)`
fn pixels(first: f64, last: f64, dim: usize) -> Range<usize> {
    let last = (last.ceil().max(0.0) as usize).min(dim);
    let first = (first.floor().max(0.0) as usize).min(last);
    first..last
}

/// Geometry linking output points to the input detector. Flat output
/// coordinates belong to an unrotated detector with the input wavenumber.
fn detector_pair(input: &Header, transform: Transform) -> Result<DetectorPair> {
    if transform == Transform::Identity {
        let any = WaxsParams::unrotated(1.0);
        return Ok(DetectorPair::new(any, any, transform));
    }
    let k = input.wavenumber()?;
    Ok(DetectorPair::new(WaxsParams::unrotated(k), WaxsParams::new(k, input.rotation), transform))
}

/// Integral over the input pixel centered at `f`
fn sample(source: &Source, cfg: &IpolConfig, f: Coord) -> std::result::Result<Integral, Rejected> {
    let half = Coord::new(0.5, 0.5);
    if source.has_variance() {
        source.isum2ldw_e(cfg, f - half, f + half)
    } else {
        source.isum2ldw(cfg, f - half, f + half)
    }
}

/// Value of one output pixel
#[derive(Clone, Copy, Debug, PartialEq)]
struct Pixel {
    value: f32,
    variance: Option<f32>,
}

/// Sums over the sub-samples of one output pixel
#[derive(Clone, Copy, Debug, Default)]
struct Accumulator {
    sum: f64,
    weight: f64,
    varsum: f64,
    varweight: f64,
    cnt: usize,
    varcnt: usize,
}

impl Accumulator {
    fn add(&mut self, integral: Integral) {
        self.sum += integral.sum;
        self.weight += integral.weight;
        if let Some(v) = integral.varsum.filter(|v| *v >= 0.0) {
            self.varsum += v;
            self.varweight += integral.varweight;
            self.varcnt += 1;
        }
        self.cnt += 1;
    }

    /// Scale the sums by the ratio `factor` of output to input pixel areas.
    /// With `ave` the value is the average, with `vsum` it is multiplied by
    /// the covered area. A variance is only given if every sample had one.
    fn finish(self, factor: f64, ave: bool, vsum: bool) -> Option<Pixel> {
        if self.cnt == 0 { return None }
        let (sum, weight) = (self.sum * factor, self.weight * factor);
        let (varsum, varweight) = (self.varsum * factor, self.varweight * factor);
        let mut value = if ave { sum / weight } else { sum };
        let mut variance = (self.varcnt == self.cnt)
            .then(|| if ave { varsum / (varweight * varweight) } else { varsum })
            .filter(|v| *v >= 0.0);
        if vsum {
            value *= weight;
            variance = variance.map(|v| v * weight * weight);
        }
        Some(Pixel { value: value as f32, variance: variance.map(|v| v as f32) })
    }
}

/// Evaluate `pixel(i1, i2)` over `rows x columns` in parallel, one task per
/// row, and merge the results into `output`.
fn regroup_rows<F>(output: &mut Image, columns: Range<usize>, rows: Range<usize>, pixel: F) -> usize
where
    F: Fn(usize, usize) -> Option<Pixel> + Sync,
{
    let computed: Vec<(usize, Vec<(usize, Pixel)>)> = rows
        .into_par_iter()
        .map(|i2| (i2, columns.clone().filter_map(|i1| pixel(i1, i2).map(|p| (i1, p))).collect()))
        .collect();
    let dummy = output.header.dummy;
    let var_dummy = Dummy::with_default_tolerance(VAR_DUMMY);
    let mut written = 0;
    for (i2, row) in computed {
        for (i1, p) in row {
            dummy.update(&mut output.data[[i2, i1]], p.value);
            if let (Some(var), Some(v)) = (output.variance.as_mut(), p.variance) {
                var_dummy.update(&mut var[[i2, i1]], v);
            }
            written += 1;
        }
    }
    written
}
