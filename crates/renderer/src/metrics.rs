/// Exponential smoothing weight: the share of the previous smoothed value
/// kept when blending in a new raw sample. Close to 1 favours a stable
/// readout over responsiveness.
const SMOOTHING_ALPHA: f64 = 0.9;

/// Per-frame GPU render duration with an exponential moving average.
///
/// The raw nanosecond sample is transient; only the smoothed millisecond
/// value persists across frames. Seeded to the first sample so the readout
/// does not ramp up from zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderMetrics {
    smoothed_ms: Option<f64>,
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, raw_ns: u64) {
        let raw_ms = raw_ns as f64 / 1_000_000.0;
        self.smoothed_ms = Some(match self.smoothed_ms {
            Some(smoothed) => SMOOTHING_ALPHA * smoothed + (1.0 - SMOOTHING_ALPHA) * raw_ms,
            None => raw_ms,
        });
    }

    pub fn smoothed_ms(&self) -> Option<f64> {
        self.smoothed_ms
    }

    /// Overlay readout, three decimal milliseconds. Values below the display
    /// threshold collapse to `<0.01 ms`; `--.--- ms` means no sample yet.
    pub fn readout(&self) -> String {
        match self.smoothed_ms {
            Some(ms) if ms >= 0.01 => format!("{ms:.3} ms"),
            Some(_) => "<0.01 ms".to_string(),
            None => "--.--- ms".to_string(),
        }
    }
}
