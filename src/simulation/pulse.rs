use serde::Deserialize;

use crate::config::AcquisitionConfig;

/// Single photo-electron pulse: linear rise then exponential decay
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct SiPMPulse {
    /// Peak amplitude (V)
    pub amplitude: f64,
    /// Peak time relative to the trigger (s)
    pub time: f64,
    /// Rise from zero to peak (s)
    #[serde(default = "default_rise_time")]
    pub rise_time: f64,
    /// Exponential decay constant after the peak (s)
    #[serde(default = "default_decay_time")]
    pub decay_time: f64,
}

fn default_rise_time() -> f64 {
    10e-9
}

fn default_decay_time() -> f64 {
    150e-9
}

impl SiPMPulse {
    pub fn new(amplitude: f64, time: f64) -> Self {
        Self {
            amplitude,
            time,
            rise_time: default_rise_time(),
            decay_time: default_decay_time(),
        }
    }

    pub fn with_shape(mut self, rise_time: f64, decay_time: f64) -> Self {
        self.rise_time = rise_time;
        self.decay_time = decay_time;
        self
    }

    /// Pulse value at time `t` relative to the trigger
    pub fn value_at(&self, t: f64) -> f64 {
        let dt = t - self.time;
        if dt >= 0.0 {
            self.amplitude * (-dt / self.decay_time).exp()
        } else if self.rise_time > 0.0 && dt > -self.rise_time {
            self.amplitude * (1.0 + dt / self.rise_time)
        } else {
            0.0
        }
    }

    /// Add the pulse to a capture laid out by `acquisition`
    pub fn render(&self, acquisition: &AcquisitionConfig, samples: &mut [f64]) {
        for (i, s) in samples.iter_mut().enumerate() {
            *s += self.value_at(acquisition.local_time(i));
        }
    }
}

/// Damped oscillation that swings well below zero
///
/// Used to produce the pathological captures that the perturbation check
/// rejects.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Ringing {
    /// Oscillation amplitude (V)
    pub amplitude: f64,
    pub frequency_hz: f64,
    /// Start time relative to the trigger (s)
    pub start: f64,
    /// Envelope decay constant (s)
    pub decay_time: f64,
}

impl Ringing {
    pub fn value_at(&self, t: f64) -> f64 {
        let dt = t - self.start;
        if dt < 0.0 {
            return 0.0;
        }
        let phase = 2.0 * std::f64::consts::PI * self.frequency_hz * dt;
        -self.amplitude * phase.sin() * (-dt / self.decay_time).exp()
    }

    pub fn render(&self, acquisition: &AcquisitionConfig, samples: &mut [f64]) {
        for (i, s) in samples.iter_mut().enumerate() {
            *s += self.value_at(acquisition.local_time(i));
        }
    }
}

/// Clamp every sample to the digitiser's full-scale level
pub fn clip(samples: &mut [f64], level: f64) {
    for s in samples.iter_mut() {
        *s = s.min(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_shape() {
        let pulse = SiPMPulse::new(0.05, 0.0).with_shape(10e-9, 100e-9);
        assert_eq!(pulse.value_at(0.0), 0.05);
        assert!((pulse.value_at(-5e-9) - 0.025).abs() < 1e-12);
        assert_eq!(pulse.value_at(-20e-9), 0.0);
        assert!((pulse.value_at(100e-9) - 0.05 / std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn test_render_peaks_at_pulse_time() {
        let acq = AcquisitionConfig::new(1e-6, 100);
        let mut samples = vec![0.0; 100];
        SiPMPulse::new(0.05, 0.0).render(&acq, &mut samples);
        let peak = samples
            .iter()
            .enumerate()
            .fold(0, |best, (i, &v)| if v > samples[best] { i } else { best });
        assert_eq!(peak, 50);
    }

    #[test]
    fn test_ringing_goes_negative_repeatedly() {
        let acq = AcquisitionConfig::new(2e-6, 400);
        let mut samples = vec![0.0; 400];
        Ringing {
            amplitude: 0.05,
            frequency_hz: 10e6,
            start: -0.5e-6,
            decay_time: 1e-6,
        }
        .render(&acq, &mut samples);

        let mut below = false;
        let mut dips = 0;
        for &s in &samples {
            if s < -0.01 && !below {
                dips += 1;
            }
            below = s < -0.01;
        }
        assert!(dips >= 3);
    }

    #[test]
    fn test_clip() {
        let mut samples = vec![0.1, 0.5, 1.2];
        clip(&mut samples, 1.0);
        assert_eq!(samples, vec![0.1, 0.5, 1.0]);
    }
}
