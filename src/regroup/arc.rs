use geometry::Coord;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::image::{Header, Image};

use super::{ang_limits, ang_range, detector_pair, regroup_rows, sample, Accumulator, Regroup, RADIUS_EPS};

impl Regroup {

    /// Regroup `input` onto a grid of radius (axis 1) and arc length
    /// (axis 2), both in `self.rsys`. Arc length is measured ccw from
    /// axis 1, `radius * angle`.
    ///
    /// Every output pixel is sampled at a fixed number of arc steps. The
    /// requested angles are cut to one turn and a maximum below the minimum
    /// continues through zero. The pixel at radius zero, if any, takes the
    /// value at the origin in the row holding arc zero.
    #[instrument(skip_all, fields(rsys = %self.rsys))]
    pub fn arc_sum(&self, input: &Image, output: Header) -> Result<Image> {
        let axes = self.axes(&input.header, &output, self.rsys)?;
        let (wmin, wmax, transform) = ang_range(self.rsys, &input.header, output.projection)?;
        let limits = ang_limits(wmin, wmax);
        let pair = detector_pair(&input.header, transform)?;

        // arcs are not periodic: the parts keep their absolute angles
        let ranges = self.angle_ranges(&limits);
        debug!(?transform, ?limits, ?ranges);

        let source = input.source()?;
        let cfg = &self.ipol;
        let mut out = Image::blank(output, input.variance.is_some());
        if ranges.is_empty() { return Ok(out) }
        let [dim1, dim2] = out.header.dim;
        let origin_rows = axes.angle_pixels(0.0, 0.0, dim2);
        let covered = |angle: f64| ranges.iter().any(|&(fst, lst)| fst <= angle && angle <= lst);

        let n_arc = ((axes.out2.ps / axes.in1.ps.min(axes.in2.ps)) as i64 + 1).max(1);
        let d_arc = axes.out2.ps / n_arc as f64;
        let factor = d_arc * axes.out1.ps / (axes.in1.ps * axes.in2.ps);

        let written = regroup_rows(&mut out, 0..dim1, 0..dim2, |i1, i2| {
            let radius = axes.out1.world(i1 as f64);
            if radius > limits.max_radius || radius < limits.min_radius { return None }

            let mut acc = Accumulator::default();
            if radius.abs() < RADIUS_EPS {
                // a single sample at the origin, in the row holding arc zero
                if !origin_rows.contains(&i2) { return None }
                let Ok(w1) = pair.to_input(Coord::new(0.0, 0.0)) else { return None };
                if let Ok(integral) = sample(&source, cfg, axes.input_index(w1)) {
                    acc.add(integral);
                }
            } else {
                let arc0 = axes.out2.world(i2 as f64 - 0.5);
                for j in 0..n_arc {
                    let angle = (arc0 + d_arc * (j as f64 + 0.5)) / radius;
                    if !covered(angle) { continue }
                    let w0 = Coord::new(radius * angle.cos(), radius * angle.sin());
                    let Ok(w1) = pair.to_input(w0) else { continue };
                    if let Ok(integral) = sample(&source, cfg, axes.input_index(w1)) {
                        acc.add(integral);
                    }
                }
            }
            acc.finish(factor, self.ave, self.vsum)
        });
        debug!(written, "pixels");
        Ok(out)
    }
}
