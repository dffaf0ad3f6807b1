use geometry::Coord;

use super::{IpolConfig, Integral, Rejected, Source, IPOL_EPS};

/// Neighbours of fractional index `f` along one axis, with their linear
/// weights. An exact pixel position yields a single neighbour.
fn neighbours(f: f64, dim: usize) -> impl Iterator<Item = (usize, f64)> {
    let i = f.floor();
    let r = f - i;
    let pairs = if r < IPOL_EPS { [(i, 1.0), (i, 0.0)] } else { [(i, 1.0 - r), (i + 1.0, r)] };
    pairs.into_iter()
        .filter(move |&(j, w)| w > 0.0 && j >= 0.0 && j < dim as f64)
        .map(|(j, w)| (j as usize, w))
}

impl Source<'_> {

    /// Bilinear interpolation at fractional pixel index `f`, using the (up
    /// to) four surrounding pixels. Dummy pixels and pixels outside the image
    /// are skipped; `weight` reports the sum of the weights actually used.
    pub fn ipol2ldw(&self, cfg: &IpolConfig, f: Coord) -> Result<Integral, Rejected> {
        let (mut sum, mut weight, mut cnt, mut seen) = (0.0, 0.0, 0, 0);
        for (i2, w2) in neighbours(f.s2, self.dim2()) {
            for (i1, w1) in neighbours(f.s1, self.dim1()) {
                seen += 1;
                if let Some(v) = self.value(i1, i2) {
                    let w = w1 * w2;
                    cnt    += 1;
                    sum    += v * w;
                    weight += w;
                }
            }
        }
        if seen == 0 { return Err(Rejected::OutsideImage) }
        if cnt  == 0 { return Err(Rejected::DummySource) }
        if cfg.min_coverage > weight.abs() { return Err(Rejected::InsufficientCoverage) }
        Ok(Integral { sum, weight, varsum: None, varweight: weight.abs(), cnt })
    }

    /// Interpolated value at `f`, `None` where [`Source::ipol2ldw`] rejects
    pub fn ipol2ld(&self, cfg: &IpolConfig, f: Coord) -> Option<f64> {
        self.ipol2ldw(cfg, f).ok().map(|i| i.value())
    }
}
