/// How a surface should interpolate between two [`crate::NodeVisual`]s.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub duration_ms: u64,
    pub easing: Easing,
}

impl Transition {
    pub fn new(duration_ms: u64, easing: Easing) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
            easing,
        }
    }

    pub fn is_done(&self, elapsed_ms: u64) -> bool {
        elapsed_ms >= self.duration_ms
    }

    /// Eased progress in `0.0..=1.0` after `elapsed_ms`.
    pub fn progress(&self, elapsed_ms: u64) -> f32 {
        let t = (elapsed_ms as f32 / self.duration_ms as f32).clamp(0.0, 1.0);
        self.easing.sample(t)
    }

    pub fn interpolate(&self, from: f32, to: f32, elapsed_ms: u64) -> f32 {
        from + (to - from) * self.progress(elapsed_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Easing {
    Linear,
    SmoothStep,
    EaseInOutCubic,
}

impl Easing {
    pub fn sample(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - (u * u * u) / 2.0
                }
            }
        }
    }
}
