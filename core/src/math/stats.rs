/// Range of valid samples in a band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStats {
    pub min: f32,
    pub max: f32,
}

pub struct StatsHelper;

impl StatsHelper {
    /// Min/max over samples that are neither NaN nor `nodata`. `None` when the
    /// band has no valid samples.
    pub fn band_stats<'a, I>(samples: I, nodata: Option<f32>) -> Option<BandStats>
    where
        I: IntoIterator<Item = &'a f32>,
    {
        samples
            .into_iter()
            .copied()
            .filter(|v| !v.is_nan() && Some(*v) != nodata)
            .fold(None, |acc, v| match acc {
                None => Some(BandStats { min: v, max: v }),
                Some(s) => Some(BandStats {
                    min: s.min.min(v),
                    max: s.max.max(v),
                }),
            })
    }

    /// Linear stretch of `value` from the band range onto 0..=255.
    pub fn stretch_to_u8(value: f32, stats: &BandStats) -> u8 {
        let span = stats.max - stats.min;
        if span <= 0.0 {
            return if value > 0.0 { 255 } else { 0 };
        }
        (((value - stats.min) / span) * 255.0).round().clamp(0.0, 255.0) as u8
    }
}
