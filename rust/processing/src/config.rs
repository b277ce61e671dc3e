// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration loaded from environment variables.

use prim_lite_geometry::MesherConfig;
use std::str::FromStr;

/// Batch pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingConfig {
    /// Number of worker threads for parallel meshing.
    pub worker_threads: usize,
    /// Weld duplicate vertices of every produced mesh.
    pub optimize: bool,
    /// Fill in vertex normals for meshes that arrive without them.
    pub compute_normals: bool,
    /// Maximum number of cached meshes; 0 disables the cache.
    pub cache_capacity: usize,
    /// Angular steps across the profile cut of a curved outline.
    pub profile_steps: usize,
    /// Sculpt grid ceiling per axis.
    pub sculpt_max_resolution: usize,
}

fn setting<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

impl ProcessingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mesher = MesherConfig::default();
        Self {
            worker_threads: setting(&lookup, "PRIM_LITE_WORKER_THREADS", num_cpus::get()).max(1),
            optimize: flag(&lookup, "PRIM_LITE_OPTIMIZE", mesher.optimize),
            compute_normals: flag(&lookup, "PRIM_LITE_COMPUTE_NORMALS", true),
            cache_capacity: setting(&lookup, "PRIM_LITE_CACHE_CAPACITY", 4096),
            profile_steps: setting(&lookup, "PRIM_LITE_PROFILE_STEPS", mesher.profile_steps),
            sculpt_max_resolution: setting(
                &lookup,
                "PRIM_LITE_SCULPT_MAX",
                mesher.sculpt_max_resolution,
            ),
        }
    }

    /// Tessellation settings for the mesher.
    pub fn mesher_config(&self) -> MesherConfig {
        MesherConfig {
            profile_steps: self.profile_steps,
            sculpt_max_resolution: self.sculpt_max_resolution,
            optimize: self.optimize,
            ..MesherConfig::default()
        }
        .sanitized()
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
