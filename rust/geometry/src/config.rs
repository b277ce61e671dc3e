// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tessellation settings

/// Knobs that control tessellation density and post-processing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MesherConfig {
    /// Angular steps across the profile cut of a curved outline
    pub profile_steps: usize,
    /// Largest twist angle covered by one path step, in degrees
    pub max_twist_step_degrees: f64,
    /// Path steps per full revolution of a revolved shape
    pub revolution_segments: usize,
    /// Upper bound of the sculpt grid on each axis
    pub sculpt_max_resolution: usize,
    /// Lower bound of the sculpt grid on each axis
    pub sculpt_min_resolution: usize,
    /// Weld duplicate vertices of generated meshes
    pub optimize: bool,
}

impl Default for MesherConfig {
    fn default() -> Self {
        Self {
            profile_steps: 60,
            max_twist_step_degrees: 5.0,
            revolution_segments: 24,
            sculpt_max_resolution: 32,
            sculpt_min_resolution: 4,
            optimize: true,
        }
    }
}

impl MesherConfig {
    /// Copy with every knob forced into a usable range
    pub fn sanitized(&self) -> Self {
        let sculpt_min = self.sculpt_min_resolution.clamp(1, 256);
        Self {
            profile_steps: self.profile_steps.clamp(3, 1024),
            max_twist_step_degrees: if self.max_twist_step_degrees.is_finite() {
                self.max_twist_step_degrees.clamp(0.5, 90.0)
            } else {
                5.0
            },
            revolution_segments: self.revolution_segments.clamp(3, 1024),
            sculpt_max_resolution: self.sculpt_max_resolution.clamp(sculpt_min, 256),
            sculpt_min_resolution: sculpt_min,
            optimize: self.optimize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_already_sane() {
        let config = MesherConfig::default();
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn test_sanitized_repairs_extremes() {
        let config = MesherConfig {
            profile_steps: 0,
            max_twist_step_degrees: f64::NAN,
            revolution_segments: 1_000_000,
            sculpt_max_resolution: 2,
            sculpt_min_resolution: 8,
            optimize: false,
        }
        .sanitized();
        assert_eq!(config.profile_steps, 3);
        assert_eq!(config.max_twist_step_degrees, 5.0);
        assert_eq!(config.revolution_segments, 1024);
        assert_eq!(config.sculpt_max_resolution, 8);
        assert!(!config.optimize);
    }
}
