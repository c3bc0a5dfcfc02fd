/// Ordinal band scale over stage indices with pixel-rounded bands.
///
/// Band starts sit on a fixed step; each band is `round(step * (1 - gap))`
/// wide and the leftover space is split evenly on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale {
    starts: Vec<f64>,
    bandwidth: f64,
    step: f64,
}

impl BandScale {
    pub fn round_bands(count: usize, range: (f64, f64), gap: f64, outer_padding: f64) -> Self {
        if count == 0 {
            return Self {
                starts: Vec::new(),
                bandwidth: 0.0,
                step: 0.0,
            };
        }
        let start = range.0;
        let stop = range.1.max(start);
        let n = count as f64;
        let divisor = n - gap + 2.0 * outer_padding;
        let step = if divisor > 0.0 {
            ((stop - start) / divisor).floor()
        } else {
            0.0
        };
        let error = stop - start - (n - gap) * step;
        let origin = start + (error / 2.0).round();
        Self {
            starts: (0..count).map(|i| origin + step * i as f64).collect(),
            bandwidth: (step * (1.0 - gap)).round(),
            step,
        }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn starts(&self) -> &[f64] {
        &self.starts
    }

    pub fn start(&self, index: usize) -> Option<f64> {
        self.starts.get(index).copied()
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Pixel widths of the header/footer columns. Each column runs from its
    /// band start to the next band start; the last one runs to the container
    /// edge, so the columns tile `[start(0), container_width]`.
    pub fn column_widths(&self, container_width: f64) -> Vec<f64> {
        let rounded: Vec<f64> = self.starts.iter().map(|s| s.round()).collect();
        rounded
            .iter()
            .enumerate()
            .map(|(i, start)| match rounded.get(i + 1) {
                Some(next) => next - start,
                None => container_width.round() - start,
            })
            .collect()
    }
}

/// Linear map from a data domain to a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Extends the domain outward to multiples of a 1/2/5 step sized for
    /// roughly `count` ticks.
    pub fn nice(self, count: usize) -> Self {
        let (d0, d1) = self.domain;
        let span = d1 - d0;
        if !span.is_finite() || span <= 0.0 || count == 0 {
            return self;
        }
        let m = count as f64;
        let mut step = 10f64.powi((span / m).log10().floor() as i32);
        let err = m / span * step;
        if err <= 0.15 {
            step *= 10.0;
        } else if err <= 0.35 {
            step *= 5.0;
        } else if err <= 0.75 {
            step *= 2.0;
        }
        Self {
            domain: ((d0 / step).floor() * step, (d1 / step).ceil() * step),
            range: self.range,
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn scale(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (pixel - r0) / (r1 - r0) * (d1 - d0)
    }
}

/// `ticks + 1` evenly spaced positions from `0` to `extent`, top to bottom.
pub fn tick_positions(ticks: usize, extent: f64) -> Vec<f64> {
    if ticks == 0 {
        return vec![extent];
    }
    let step = extent / ticks as f64;
    (0..=ticks).map(|i| step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_bands_match_default_gaps() {
        let scale = BandScale::round_bands(3, (0.0, 780.0), 0.6, 0.5);
        // 780 / (3 - 0.6 + 1) = 229.4 -> 229
        assert_eq!(scale.step(), 229.0);
        assert_eq!(scale.bandwidth(), 92.0);
        // error = 780 - 2.4 * 229 = 230.4 -> origin 115
        assert_eq!(scale.starts(), &[115.0, 344.0, 573.0]);
        assert!(scale.starts()[2] + scale.bandwidth() <= 780.0);
    }

    #[test]
    fn bands_stay_in_range_and_do_not_overlap() {
        for width in [120.0, 400.0, 777.0, 800.0, 1920.0] {
            for count in 1..=9 {
                let scale = BandScale::round_bands(count, (0.0, width - 20.0), 0.6, 0.5);
                let starts = scale.starts();
                assert!(starts[0] >= 0.0, "width {width} count {count}");
                assert!(starts[count - 1] + scale.bandwidth() <= width - 20.0);
                for pair in starts.windows(2) {
                    assert!(pair[0] < pair[1]);
                    assert!(pair[0] + scale.bandwidth() <= pair[1]);
                }
            }
        }
    }

    #[test]
    fn column_widths_tile_to_the_container_edge() {
        let scale = BandScale::round_bands(4, (0.0, 780.0), 0.6, 0.5);
        let widths = scale.column_widths(800.0);
        assert_eq!(widths.len(), 4);
        let total: f64 = widths.iter().sum();
        assert_eq!(total + scale.starts()[0], 800.0);
        assert_eq!(widths[0], scale.step());
    }

    #[test]
    fn empty_band_scale() {
        let scale = BandScale::round_bands(0, (0.0, 500.0), 0.6, 0.5);
        assert!(scale.is_empty());
        assert!(scale.column_widths(500.0).is_empty());
        assert_eq!(scale.start(0), None);
    }

    #[test]
    fn nice_rounds_the_domain_outward() {
        let scale = LinearScale::new((0.0, 19485.0), (0.0, 200.0)).nice(10);
        assert_eq!(scale.domain(), (0.0, 20000.0));
        let scale = LinearScale::new((0.0, 768.0), (0.0, 200.0)).nice(10);
        assert_eq!(scale.domain(), (0.0, 800.0));
        let scale = LinearScale::new((0.0, 0.0), (0.0, 200.0)).nice(10);
        assert_eq!(scale.domain(), (0.0, 0.0));
    }

    #[test]
    fn scale_and_invert_agree() {
        let scale = LinearScale::new((0.0, 20000.0), (0.0, 200.0));
        assert_eq!(scale.scale(5000.0), 50.0);
        assert_eq!(scale.invert(150.0), 15000.0);
        let flat = LinearScale::new((0.0, 0.0), (0.0, 200.0));
        assert_eq!(flat.scale(10.0), 0.0);
        assert_eq!(flat.invert(100.0), 0.0);
    }

    #[test]
    fn tick_positions_cover_the_extent() {
        assert_eq!(tick_positions(4, 200.0), vec![0.0, 50.0, 100.0, 150.0, 200.0]);
        assert_eq!(tick_positions(0, 200.0), vec![200.0]);
    }
}
