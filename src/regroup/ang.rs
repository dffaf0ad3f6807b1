use std::f64::consts::TAU;

use geometry::Coord;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::image::{Header, Image};
use crate::reference::ReferenceSystem;

use super::{ang_limits, ang_range, detector_pair, regroup_rows, sample, Accumulator, Regroup, RADIUS_EPS};

impl Regroup {

    /// Regroup `input` onto a grid of radius (axis 1) and angle (axis 2).
    ///
    /// Radii are in `self.rsys`; angles are plain radians (the Normal system
    /// of axis 2). With the Saxs system the output may be an Ewald sphere
    /// projection of a flat (or rotated) input, or the reverse. The
    /// requested angles wrap around, so a range starting anywhere is filled
    /// from every turn that the input covers.
    #[instrument(skip_all, fields(rsys = %self.rsys))]
    pub fn ang_sum(&self, input: &Image, output: Header) -> Result<Image> {
        let rsys2 = match self.rsys {
            ReferenceSystem::Saxs => ReferenceSystem::Normal,
            rsys => rsys,
        };
        let axes = self.axes(&input.header, &output, rsys2)?;
        let (wmin, wmax, transform) = ang_range(self.rsys, &input.header, output.projection)?;
        let limits = ang_limits(wmin, wmax);
        let pair = detector_pair(&input.header, transform)?;
        debug!(?transform, ?limits);

        let ranges = self.angle_ranges(&limits);

        let dd_angle = axes.out2.ps / axes.in1.ps.min(axes.in2.ps);
        let source = input.source()?;
        let cfg = &self.ipol;
        let mut out = Image::blank(output, input.variance.is_some());
        let [dim1, dim2] = out.header.dim;
        let columns = axes.radius_pixels(limits.min_radius, limits.max_radius, dim1);
        let (w2_min, w2_max) = axes.angle_extent(dim2);

        // every part lands on the output rows of each turn the rows cover
        let turns = ranges.iter().flat_map(|&(fst, lst)| {
            let first = ((w2_min - lst) / TAU).floor() as i64;
            let last = ((w2_max - fst) / TAU).ceil() as i64;
            (first..=last).map(move |k| (fst + k as f64 * TAU, lst + k as f64 * TAU))
        });
        for (fst, lst) in turns.filter(|&(fst, lst)| fst < w2_max && w2_min < lst) {
            let rows = axes.angle_pixels(fst, lst, dim2);
            debug!(fst, lst, ?columns, ?rows, "angular range");

            let written = regroup_rows(&mut out, columns.clone(), rows, |i1, i2| {
                let radius = axes.out1.world(i1 as f64);
                if radius > limits.max_radius || radius < limits.min_radius { return None }
                let n_angle = ((dd_angle * radius) as i64 + 1).max(1);
                let d_angle = axes.out2.ps / n_angle as f64;

                let lower = fst.max(axes.out2.world(i2 as f64 - 0.5));
                let upper = lst.min(axes.out2.world(i2 as f64 + 0.5));
                let n = ((upper - lower) / d_angle + 0.5).floor().max(0.0) as usize;

                let mut acc = Accumulator::default();
                for j in 0..n {
                    let angle = lower + d_angle * (j as f64 + 0.5);
                    if angle < lower || upper < angle { continue }
                    let w0 = Coord::new(radius * angle.cos(), radius * angle.sin());
                    let Ok(w1) = pair.to_input(w0) else { continue };
                    if let Ok(integral) = sample(&source, cfg, axes.input_index(w1)) {
                        acc.add(integral);
                    }
                }
                // rectangular input pixels onto a circular sector
                let factor = radius.max(RADIUS_EPS) * d_angle * axes.out1.ps / (axes.in1.ps * axes.in2.ps);
                acc.finish(factor, self.ave, self.vsum)
            });
            debug!(written, "pixels");
        }
        Ok(out)
    }
}
