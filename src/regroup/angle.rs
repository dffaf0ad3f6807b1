use std::f64::consts::TAU;

use geometry::Coord;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::image::{Header, Image};
use crate::reference::ReferenceSystem;

use super::{angle_limits, regroup_rows, sample, world_extent, Accumulator, Regroup};

impl Regroup {

    /// Azimuthal regrouping of `input` around `self.center`, radius along
    /// axis 1 and angle along axis 2, in the Normal reference system.
    ///
    /// Unlike [`Regroup::ang_sum`] there is no detector geometry involved
    /// and the requested angle range is ignored: every output angle is used
    /// if the input covers it.
    #[instrument(skip_all, fields(center = ?self.center))]
    pub fn angle_sum(&self, input: &Image, output: Header) -> Result<Image> {
        if self.rsys != ReferenceSystem::Normal {
            return Err(Error::InvalidReferenceSystem(self.rsys.to_string()));
        }
        let axes = self.axes(&input.header, &output, ReferenceSystem::Normal)?;
        let (min, max) = world_extent(&input.header, ReferenceSystem::Normal)?;
        let limits = angle_limits(min, max, self.center);
        debug!(?limits);

        let in_range = |angle: f64| {
            if (limits.min_angle..=limits.max_angle).contains(&angle) { return true }
            let norm = angle - (angle / TAU).floor() * TAU;
            if limits.min_angle <= limits.max_angle {
                (limits.min_angle..=limits.max_angle).contains(&norm)
            } else {
                // wrapped through zero
                !(limits.max_angle < norm && norm < limits.min_angle)
            }
        };

        let dd_angle = axes.out2.ps / axes.in1.ps.min(axes.in2.ps);
        let source = input.source()?;
        let cfg = &self.ipol;
        let center = self.center;
        let mut out = Image::blank(output, input.variance.is_some());
        let [dim1, dim2] = out.header.dim;

        let written = regroup_rows(&mut out, 0..dim1, 0..dim2, |i1, i2| {
            let radius = axes.out1.world(i1 as f64);
            if radius > limits.max_radius || radius < limits.min_radius { return None }
            let n_angle = ((dd_angle * radius) as i64 + 1).max(1);
            let d_angle = axes.out2.ps / n_angle as f64;

            let first = axes.out2.world(i2 as f64 - 0.5) + d_angle * 0.5;
            if !in_range(first) { return None }

            let mut acc = Accumulator::default();
            for j in 0..n_angle {
                let angle = first + d_angle * j as f64;
                let w = Coord::new(radius * angle.cos(), radius * angle.sin()) + center;
                let f = axes.input_index(w);
                let integral = if source.has_variance() { sample(&source, cfg, f) } else { source.ipol2ldw(cfg, f) };
                if let Ok(integral) = integral {
                    acc.add(integral);
                }
            }
            let factor = radius * d_angle * axes.out1.ps / (axes.in1.ps * axes.in2.ps);
            acc.finish(factor, self.ave, self.vsum)
        });
        debug!(written, "pixels");
        Ok(out)
    }
}
