use geometry::Coord;

use super::{IpolConfig, Integral, Mode, Rejected, Source, Weighting, WEIGHT_EPS};

/// Integration rectangle, reduced to the pixels it overlaps
struct Window {
    axis1: Vec<(usize, f64)>,
    axis2: Vec<(usize, f64)>,
    /// Direction of integration, times the anti-aliasing area ratio
    sign: f64,
    /// Anti-aliasing area ratio
    scale: f64,
    /// Requested area
    area: f64,
}

/// Overlap of `[lo, hi]` with the pixels `j` covering `[j, j+1]`, clipped
/// to `[0, dim]`
fn overlaps(lo: f64, hi: f64, dim: usize) -> Vec<(usize, f64)> {
    let (a, b) = (lo.max(0.0), hi.min(dim as f64));
    if a >= b { return vec![] }
    (a.floor() as usize..b.ceil() as usize)
        .map(|j| (j, b.min(j as f64 + 1.0) - a.max(j as f64)))
        .filter(|&(_, w)| w > 0.0)
        .collect()
}

impl Window {
    fn new(cfg: &IpolConfig, f1: Coord, f3: Coord, dims: [usize; 2]) -> Result<Self, Rejected> {
        let mut sign = 1.0;
        let mut area = 1.0;
        let mut enlarged = 1.0;
        let mut bounds = [(f1.s1, f3.s1), (f1.s2, f3.s2)];
        for (lo, hi) in bounds.iter_mut() {
            if *hi < *lo {
                std::mem::swap(lo, hi);
                sign = -sign;
            }
            let mut d = *hi - *lo;
            area *= d;
            if cfg.mode == Mode::AntiAliased && d <= 1.0 {
                let c = 0.5 * (*lo + *hi);
                (*lo, *hi) = (c - 0.5, c + 0.5);
                d = 1.0;
            }
            enlarged *= d;
        }
        let scale = if cfg.mode == Mode::AntiAliased {
            if enlarged == 0.0 { return Err(Rejected::InsufficientCoverage) }
            area / enlarged
        } else { 1.0 };

        // pixel edges on integers
        let [(lo1, hi1), (lo2, hi2)] = bounds.map(|(lo, hi)| (lo + 0.5, hi + 0.5));
        if lo1 >= dims[0] as f64 || lo2 >= dims[1] as f64 || hi1 <= 0.0 || hi2 <= 0.0 {
            return Err(Rejected::OutsideImage);
        }
        Ok(Self {
            axis1: overlaps(lo1, hi1, dims[0]),
            axis2: overlaps(lo2, hi2, dims[1]),
            sign: sign * scale,
            scale,
            area,
        })
    }

    fn pixels(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.axis2.iter().flat_map(move |&(i2, w2)| {
            self.axis1.iter().map(move |&(i1, w1)| (i1, i2, w1 * w2))
        })
    }

    /// Apply direction and scale, then reject insufficiently covered results
    fn finish(&self, cfg: &IpolConfig, sum: f64, weight: f64, varsum: Option<f64>, cnt: usize) -> Result<Integral, Rejected> {
        if cnt == 0 { return Err(Rejected::DummySource) }
        let sum    = sum    * self.sign;
        let weight = weight * self.sign;
        let varsum = varsum.map(|v| v * self.scale);
        if weight.abs() < WEIGHT_EPS || self.area.abs() * cfg.min_coverage > weight.abs() {
            return Err(Rejected::InsufficientCoverage);
        }
        Ok(Integral { sum, weight, varsum, varweight: weight.abs(), cnt })
    }
}

impl Source<'_> {

    /// Area integral over the rectangle with corners `f1` and `f3` in
    /// fractional pixel indices. The variance array, if any, is ignored.
    /// A unit rectangle is delegated to [`Source::ipol2ldw`] at its center.
    pub fn isum2ldw(&self, cfg: &IpolConfig, f1: Coord, f3: Coord) -> Result<Integral, Rejected> {
        let d = f3 - f1;
        if d.s1 == 1.0 && d.s2 == 1.0 {
            return self.ipol2ldw(cfg, f1 + Coord::new(0.5, 0.5));
        }
        self.without_variance().isum2ldw_ee(cfg, f1, f3)
    }

    /// Area integral with every pixel weighted by its overlap area.
    ///
    /// `varsum` is the overlap-weighted sum of the variances; it is `None`
    /// if any contributing pixel has a negative (unknown) variance.
    pub fn isum2ldw_ee(&self, cfg: &IpolConfig, f1: Coord, f3: Coord) -> Result<Integral, Rejected> {
        let window = Window::new(cfg, f1, f3, [self.dim1(), self.dim2()])?;
        let (mut sum, mut weight, mut varsum) = (0.0, 0.0, 0.0);
        let (mut cnt, mut varcnt, mut seen) = (0, 0, 0);
        for (i1, i2, w) in window.pixels() {
            seen += 1;
            let Some(v) = self.value(i1, i2) else { continue };
            cnt    += 1;
            sum    += v * w;
            weight += w;
            let var = self.var(i1, i2);
            if var >= 0.0 {
                varsum += var * w;
                varcnt += 1;
            }
        }
        if seen == 0 { return Err(Rejected::InsufficientCoverage) }
        let varsum = (varcnt == cnt).then_some(varsum);
        window.finish(cfg, sum, weight, varsum, cnt)
    }

    /// Area integral with every pixel weighted by overlap area over variance,
    /// renormalized by the mean inverse variance so that the result is on the
    /// scale of [`Source::isum2ldw_ee`].
    ///
    /// Pixels with zero variance are exact: if any of them is covered, only
    /// the exact pixels contribute (with equal weights) and the variance is
    /// unknown. Pixels with negative variance are ignored. Without a variance
    /// array this is the same as [`Source::isum2ldw_ee`].
    pub fn isum2ldw_ew(&self, cfg: &IpolConfig, f1: Coord, f3: Coord) -> Result<Integral, Rejected> {
        if !self.has_variance() { return self.isum2ldw_ee(cfg, f1, f3) }
        let window = Window::new(cfg, f1, f3, [self.dim1(), self.dim2()])?;

        #[derive(Default)]
        struct Exact { sum: f64, weight: f64, cnt: usize }
        #[derive(Default)]
        struct Weighted { sum: f64, weight: f64, varsum: f64, suminv: f64, cnt: usize }

        let (mut exact, mut weighted, mut seen) = (Exact::default(), Weighted::default(), 0);
        for (i1, i2, w) in window.pixels() {
            seen += 1;
            let Some(v) = self.value(i1, i2) else { continue };
            let var = self.var(i1, i2);
            if var == 0.0 {
                exact.cnt    += 1;
                exact.sum    += v * w;
                exact.weight += w;
            } else if var > 0.0 {
                let inv = 1.0 / var;
                weighted.cnt    += 1;
                weighted.sum    += v * w * inv;
                weighted.weight += w * inv;
                weighted.varsum += w;
                weighted.suminv += inv;
            }
        }
        if seen == 0 { return Err(Rejected::InsufficientCoverage) }
        if exact.cnt > 0 {
            window.finish(cfg, exact.sum, exact.weight, None, exact.cnt)
        } else if weighted.cnt > 0 {
            let mean = weighted.suminv / weighted.cnt as f64;
            window.finish(cfg, weighted.sum / mean, weighted.weight / mean, Some(weighted.varsum / mean), weighted.cnt)
        } else {
            Err(Rejected::DummySource)
        }
    }

    /// [`Source::isum2ldw_ee`] or [`Source::isum2ldw_ew`], as selected by
    /// `cfg.weighting`
    pub fn isum2ldw_e(&self, cfg: &IpolConfig, f1: Coord, f3: Coord) -> Result<Integral, Rejected> {
        match cfg.weighting {
            Weighting::Equal    => self.isum2ldw_ee(cfg, f1, f3),
            Weighting::Variance => self.isum2ldw_ew(cfg, f1, f3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipol::Dummy;
    use float_eq::assert_float_eq;
    use ndarray::Array2;
    use proptest::prelude::*;
    use rstest::rstest;

    fn c(s1: f64, s2: f64) -> Coord { Coord::new(s1, s2) }

    #[test]
    fn constant_block() {
        let data = Array2::from_elem((10, 10), 7.0_f32);
        let src = Source::new(data.view(), Dummy::new(-1.0, 0.1));
        let got = src.isum2ldw(&IpolConfig::default(), c(0.5, 0.5), c(3.5, 3.5)).unwrap();
        assert_eq!(got.cnt, 9);
        assert_float_eq!(got.sum, 63.0, abs <= 1e-9);
        assert_float_eq!(got.weight, 9.0, abs <= 1e-12);
    }

    // Corners at -0.5 and dim-0.5 are the outer edges of the image
    #[rstest(/**/ f1        , f3        , weight, cnt,
             case((-0.5,-0.5), ( 0.5, 0.5), 1.0 , 1  ),
             case((-1.5,-0.5), ( 0.5, 0.5), 1.0 , 1  ), // clipped below
             case(( 2.5, 2.5), ( 3.5, 3.5), 1.0 , 1  ),
             case(( 2.5, 2.5), ( 4.0, 3.5), 1.0 , 1  ), // clipped above
             case(( 0.0, 0.0), ( 1.0, 2.0), 2.0 , 6  ),
             case((-0.5,-0.5), ( 3.5, 3.5), 16.0, 16 ),
    )]
    fn clipping(f1: (f64, f64), f3: (f64, f64), weight: f64, cnt: usize) {
        let data = Array2::from_elem((4, 4), 2.0_f32);
        let src = Source::new(data.view(), Dummy::none());
        let got = src.isum2ldw_ee(&IpolConfig::builder().min_coverage(0.0).build(), f1.into(), f3.into()).unwrap();
        assert_eq!(got.cnt, cnt);
        assert_float_eq!(got.weight, weight, abs <= 1e-12);
        assert_float_eq!(got.sum, 2.0 * weight, abs <= 1e-12);
    }

    #[test]
    fn direction_of_integration() {
        let data = Array2::from_elem((4, 4), 1.0_f32);
        let src = Source::new(data.view(), Dummy::none());
        let cfg = IpolConfig::default();
        let fwd = src.isum2ldw_ee(&cfg, c(0.2, 0.2), c(2.2, 1.7)).unwrap();
        let rev = src.isum2ldw_ee(&cfg, c(2.2, 0.2), c(0.2, 1.7)).unwrap();
        assert_float_eq!(rev.weight, -fwd.weight, abs <= 1e-12);
        assert_float_eq!(rev.sum, -fwd.sum, abs <= 1e-12);
        assert_float_eq!(rev.varweight, fwd.varweight, abs <= 1e-12);
        assert_float_eq!(rev.value(), 1.0, abs <= 1e-12);
    }

    #[test]
    fn outside_and_dummies() {
        let mut data = Array2::from_elem((4, 4), 1.0_f32);
        let src = Source::new(data.view(), Dummy::new(-1.0, 0.1));
        let cfg = IpolConfig::default();
        assert_eq!(src.isum2ldw_ee(&cfg, c(4.0, 0.0), c(5.0, 1.0)), Err(Rejected::OutsideImage));
        assert_eq!(src.isum2ldw_ee(&cfg, c(-3.0, 0.0), c(-0.5, 1.0)), Err(Rejected::OutsideImage));
        // only a sliver inside the image
        assert_eq!(src.isum2ldw_ee(&cfg, c(3.2, 0.0), c(4.2, 1.0)), Err(Rejected::InsufficientCoverage));

        data.fill(-1.0);
        let src = Source::new(data.view(), Dummy::new(-1.0, 0.1));
        assert_eq!(src.isum2ldw_ee(&cfg, c(0.0, 0.0), c(1.0, 1.5)), Err(Rejected::DummySource));
    }

    #[test]
    fn anti_aliasing_keeps_density() {
        let data = Array2::from_elem((6, 6), 5.0_f32);
        let src = Source::new(data.view(), Dummy::none());
        let cfg = IpolConfig::builder().anti_aliased().build();
        let got = src.isum2ldw_ee(&cfg, c(2.1, 2.3), c(2.3, 2.4)).unwrap();
        assert_float_eq!(got.weight, 0.2 * 0.1, abs <= 1e-12);
        assert_float_eq!(got.value(), 5.0, abs <= 1e-9);
        assert_eq!(got.cnt, 4);
        // without anti-aliasing the weight is the same, but only one pixel contributes
        let plain = src.isum2ldw_ee(&IpolConfig::default(), c(2.1, 2.3), c(2.3, 2.4)).unwrap();
        assert_float_eq!(plain.weight, 0.02, abs <= 1e-12);
        assert_eq!(plain.cnt, 1);
    }

    #[test]
    fn variance_sums() {
        let data = Array2::from_elem((2, 2), 1.0_f32);
        let mut var = Array2::from_elem((2, 2), 4.0_f32);
        let cfg = IpolConfig::default();
        let all = (c(-0.5, -0.5), c(1.5, 1.5));

        let src = Source::new(data.view(), Dummy::none()).with_variance(var.view()).unwrap();
        let got = src.isum2ldw_ee(&cfg, all.0, all.1).unwrap();
        assert_float_eq!(got.varsum.unwrap(), 16.0, abs <= 1e-12);
        assert_float_eq!(got.variance().unwrap(), 1.0, abs <= 1e-12);

        var[[0, 1]] = -1.0;
        let src = Source::new(data.view(), Dummy::none()).with_variance(var.view()).unwrap();
        assert_eq!(src.isum2ldw_ee(&cfg, all.0, all.1).unwrap().varsum, None);
        // the no-variance integrator ignores the variance array
        assert_eq!(src.isum2ldw(&cfg, all.0, all.1).unwrap().varsum, Some(0.0));
    }

    #[test]
    fn inverse_variance_weighting() {
        // two pixels side by side, values 1 and 4, variances 1 and 4
        let data = ndarray::arr2(&[[1.0_f32, 4.0]]);
        let var  = ndarray::arr2(&[[1.0_f32, 4.0]]);
        let src = Source::new(data.view(), Dummy::none()).with_variance(var.view()).unwrap();
        let cfg = IpolConfig::builder().weighting(Weighting::Variance).build();
        let got = src.isum2ldw_e(&cfg, c(-0.5, -0.5), c(1.5, 0.5)).unwrap();
        // weights 1 and 1/4, mean inverse variance 5/8
        assert_eq!(got.cnt, 2);
        assert_float_eq!(got.value(), (1.0 + 1.0) / 1.25, abs <= 1e-12);
        assert_float_eq!(got.weight, 1.25 / 0.625, abs <= 1e-12);
        assert_float_eq!(got.varsum.unwrap(), 2.0 / 0.625, abs <= 1e-12);
    }

    #[test]
    fn exact_pixels_dominate_in_either_direction() {
        let data = ndarray::arr2(&[[1.0_f32, 4.0, 9.0]]);
        let var  = ndarray::arr2(&[[2.0_f32, 0.0, 3.0]]);
        let src = Source::new(data.view(), Dummy::none()).with_variance(var.view()).unwrap();
        let cfg = IpolConfig::builder().weighting(Weighting::Variance).min_coverage(0.0).build();
        let fwd = src.isum2ldw_ew(&cfg, c(-0.5, -0.5), c(2.5, 0.5)).unwrap();
        let rev = src.isum2ldw_ew(&cfg, c(2.5, -0.5), c(-0.5, 0.5)).unwrap();
        for got in [fwd, rev] {
            assert_eq!(got.cnt, 1);
            assert_float_eq!(got.value(), 4.0, abs <= 1e-12);
            assert_eq!(got.varsum, None);
        }
    }

    proptest! {
        #[test]
        fn weight_is_area(
            a1 in -0.5..1.5_f64, a2 in -0.5..1.5_f64,
            d1 in 0.1..2.0_f64, d2 in 0.1..2.0_f64,
        ) {
            let data = Array2::from_shape_fn((4, 4), |(j, i)| (i + 4 * j) as f32);
            let src = Source::new(data.view(), Dummy::none());
            let got = src.isum2ldw_ee(&IpolConfig::default(), c(a1, a2), c(a1 + d1, a2 + d2)).unwrap();
            assert_float_eq!(got.weight, d1 * d2, abs <= 1e-9);
        }
    }
}
