// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-LOD mesh asset decoding
//!
//! An asset starts with a binary LLSD map naming its segments. Each segment
//! entry holds an `offset` and `size` into the bytes that follow the header;
//! the addressed range is a gzip (or bare zlib) stream that inflates to
//! another LLSD document, an array of submeshes:
//!
//! ```text
//! <LLSD header map> | segment 0 | segment 1 | ...
//!   physics_mesh => { offset: 0, size: 812 }
//!   high_lod     => { offset: 812, size: 4411 }
//! ```
//!
//! Submesh positions and triangle indices are 16-bit little-endian
//! integers; positions are dequantized into the submesh's `PositionDomain`.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use flate2::read::{GzDecoder, ZlibDecoder};
use nalgebra::{Point2, Point3};
use prim_lite_core::{parse_binary, parse_binary_prefix, LlsdValue};
use std::io::Read;
use tracing::{debug, warn};

/// Segments tried by [`decode_mesh_asset`], in order
pub const SEGMENT_PRIORITY: [&str; 4] = ["physics_shape", "physics_mesh", "medium_lod", "high_lod"];

/// Every segment name the decoder understands
pub const KNOWN_SEGMENTS: [&str; 6] = [
    "physics_shape",
    "physics_mesh",
    "high_lod",
    "medium_lod",
    "low_lod",
    "lowest_lod",
];

/// Upper bound on one inflated segment
const MAX_INFLATED_SIZE: u64 = 256 * 1024 * 1024;

const QUANT_MAX: f64 = 65535.0;

/// Byte range of one segment, relative to the end of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRange {
    pub offset: usize,
    pub size: usize,
}

/// Parsed asset header
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAssetHeader {
    /// The header document itself
    pub header: LlsdValue,
    /// Position of the first byte after the header
    pub body_offset: usize,
}

impl MeshAssetHeader {
    /// Parse the leading LLSD map of an asset
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (header, body_offset) = parse_binary_prefix(bytes)?;
        if header.as_map().is_none() {
            return Err(Error::asset(format!(
                "header must be a map, found {}",
                header.type_name()
            )));
        }
        Ok(Self {
            header,
            body_offset,
        })
    }

    /// Range of a named segment, `None` when the header does not mention it
    pub fn segment(&self, name: &str) -> Result<Option<SegmentRange>> {
        let Some(entry) = self.header.get(name) else {
            return Ok(None);
        };
        if entry.as_map().is_none() {
            return Err(Error::asset(format!(
                "segment {name} must be a map, found {}",
                entry.type_name()
            )));
        }
        let field = |key: &str| -> Result<usize> {
            let value = entry
                .get(key)
                .and_then(LlsdValue::as_integer)
                .ok_or_else(|| Error::asset(format!("segment {name} has no integer {key}")))?;
            usize::try_from(value)
                .map_err(|_| Error::asset(format!("segment {name} has negative {key} {value}")))
        };
        Ok(Some(SegmentRange {
            offset: field("offset")?,
            size: field("size")?,
        }))
    }

    /// Known segments present in the header, in [`KNOWN_SEGMENTS`] order
    pub fn segments(&self) -> Vec<&'static str> {
        KNOWN_SEGMENTS
            .iter()
            .copied()
            .filter(|name| self.header.get(name).is_some())
            .collect()
    }

    /// The first segment of [`SEGMENT_PRIORITY`] the header carries
    pub fn preferred_segment(&self) -> Option<&'static str> {
        SEGMENT_PRIORITY
            .iter()
            .copied()
            .find(|name| self.header.get(name).is_some())
    }

    /// Compressed bytes of a segment, bounds-checked against `bytes`
    fn segment_bytes<'a>(&self, bytes: &'a [u8], name: &str) -> Result<&'a [u8]> {
        let range = self
            .segment(name)?
            .ok_or_else(|| Error::asset(format!("no {name} segment")))?;
        let start = self
            .body_offset
            .checked_add(range.offset)
            .ok_or_else(|| Error::asset(format!("segment {name} offset overflows")))?;
        let end = start
            .checked_add(range.size)
            .ok_or_else(|| Error::asset(format!("segment {name} size overflows")))?;
        bytes.get(start..end).ok_or_else(|| {
            Error::asset(format!(
                "segment {name} spans {start}..{end}, asset has {} bytes",
                bytes.len()
            ))
        })
    }
}

/// Names of the known segments an asset carries
pub fn list_segments(bytes: &[u8]) -> Result<Vec<&'static str>> {
    Ok(MeshAssetHeader::parse(bytes)?.segments())
}

/// Decode the highest-priority segment of an asset
///
/// Tries `physics_shape`, `physics_mesh`, `medium_lod` and `high_lod`;
/// an asset with none of them is rejected.
pub fn decode_mesh_asset(bytes: &[u8]) -> Result<Mesh> {
    let header = MeshAssetHeader::parse(bytes)?;
    let name = header.preferred_segment().ok_or_else(|| {
        Error::asset(format!(
            "none of {} present",
            SEGMENT_PRIORITY.join(", ")
        ))
    })?;
    decode_segment(&header, bytes, name)
}

/// Decode one named segment of an asset
pub fn decode_mesh_asset_segment(bytes: &[u8], name: &str) -> Result<Mesh> {
    if !KNOWN_SEGMENTS.contains(&name) {
        return Err(Error::asset(format!("unknown segment {name}")));
    }
    let header = MeshAssetHeader::parse(bytes)?;
    decode_segment(&header, bytes, name)
}

fn decode_segment(header: &MeshAssetHeader, bytes: &[u8], name: &str) -> Result<Mesh> {
    let compressed = header.segment_bytes(bytes, name)?;
    let inflated = inflate(compressed).map_err(|e| Error::asset(format!("segment {name}: {e}")))?;
    let payload = parse_binary(&inflated)?;

    let submeshes: Vec<&LlsdValue> = match &payload {
        LlsdValue::Array(items) => items.iter().collect(),
        LlsdValue::Map(_) => vec![&payload],
        other => {
            return Err(Error::asset(format!(
                "segment {name} must hold submeshes, found {}",
                other.type_name()
            )))
        }
    };

    let mut mesh = Mesh::new();
    let mut skipped = 0usize;
    for (index, submesh) in submeshes.iter().enumerate() {
        if submesh.as_map().is_none() {
            return Err(Error::asset(format!(
                "submesh {index} must be a map, found {}",
                submesh.type_name()
            )));
        }
        if submesh
            .get("NoGeometry")
            .is_some_and(|v| v.as_bool() != Some(false))
        {
            skipped += 1;
            continue;
        }
        let part = decode_submesh(submesh, index)?;
        mesh.merge(&part);
    }

    debug!(
        segment = name,
        compressed = compressed.len(),
        inflated = inflated.len(),
        submeshes = submeshes.len(),
        skipped,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "decoded mesh asset"
    );

    Ok(mesh)
}

fn inflate(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    if compressed.starts_with(&[0x1f, 0x8b]) {
        GzDecoder::new(compressed)
            .take(MAX_INFLATED_SIZE + 1)
            .read_to_end(&mut out)?;
    } else {
        ZlibDecoder::new(compressed)
            .take(MAX_INFLATED_SIZE + 1)
            .read_to_end(&mut out)?;
    }
    if out.len() as u64 > MAX_INFLATED_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("inflates past {MAX_INFLATED_SIZE} bytes"),
        ));
    }
    Ok(out)
}

/// Read a `{ Min: [x, y, z], Max: [x, y, z] }` style domain
fn read_domain<const N: usize>(
    submesh: &LlsdValue,
    key: &str,
    index: usize,
) -> Result<Option<([f64; N], [f64; N])>> {
    let Some(domain) = submesh.get(key) else {
        return Ok(None);
    };
    let corner = |name: &str| -> Result<[f64; N]> {
        let values = domain
            .get(name)
            .and_then(LlsdValue::as_array)
            .ok_or_else(|| Error::asset(format!("submesh {index} {key} has no {name} array")))?;
        if values.len() < N {
            return Err(Error::asset(format!(
                "submesh {index} {key}.{name} has {} components, need {N}",
                values.len()
            )));
        }
        let mut out = [0.0; N];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value.require_real()?;
        }
        Ok(out)
    };
    Ok(Some((corner("Min")?, corner("Max")?)))
}

#[inline]
fn dequantize(raw: u16, min: f64, max: f64) -> f64 {
    min + (max - min) * (raw as f64 / QUANT_MAX)
}

fn u16_le(bytes: &[u8]) -> impl Iterator<Item = u16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}

fn required_binary<'a>(submesh: &'a LlsdValue, key: &str, index: usize) -> Result<&'a [u8]> {
    let value = submesh
        .get(key)
        .ok_or_else(|| Error::asset(format!("submesh {index} has no {key}")))?;
    Ok(value.require_binary()?)
}

fn decode_submesh(submesh: &LlsdValue, index: usize) -> Result<Mesh> {
    let (min, max) = match read_domain::<3>(submesh, "PositionDomain", index)? {
        Some(domain) => domain,
        None => {
            warn!(submesh = index, "no PositionDomain, assuming unit cube");
            ([-0.5; 3], [0.5; 3])
        }
    };

    let positions = required_binary(submesh, "Position", index)?;
    if positions.len() % 6 != 0 {
        return Err(Error::asset(format!(
            "submesh {index} Position has {} bytes, not a multiple of 6",
            positions.len()
        )));
    }
    let vertex_count = positions.len() / 6;

    let triangles = required_binary(submesh, "TriangleList", index)?;
    if triangles.len() % 6 != 0 {
        return Err(Error::asset(format!(
            "submesh {index} TriangleList has {} bytes, not a multiple of 6",
            triangles.len()
        )));
    }

    let mut mesh = Mesh::with_capacity(vertex_count, triangles.len() / 6);
    let raw: Vec<u16> = u16_le(positions).collect();
    for q in raw.chunks_exact(3) {
        mesh.add_vertex(Point3::new(
            dequantize(q[0], min[0], max[0]),
            dequantize(q[1], min[1], max[1]),
            dequantize(q[2], min[2], max[2]),
        ));
    }

    let indices: Vec<u16> = u16_le(triangles).collect();
    for (t, corner) in indices.chunks_exact(3).enumerate() {
        if let Some(&bad) = corner.iter().find(|&&v| v as usize >= vertex_count) {
            return Err(Error::asset(format!(
                "submesh {index} triangle {t} references vertex {bad}, submesh has {vertex_count}"
            )));
        }
        mesh.add_triangle(corner[0] as u32, corner[1] as u32, corner[2] as u32);
    }

    if let Some(normals) = submesh.get("Normal") {
        let normals = normals.require_binary()?;
        if normals.len() != vertex_count * 6 {
            return Err(Error::asset(format!(
                "submesh {index} Normal has {} bytes, expected {}",
                normals.len(),
                vertex_count * 6
            )));
        }
        mesh.normals = u16_le(normals)
            .map(|raw| dequantize(raw, -1.0, 1.0) as f32)
            .collect();
    }

    if let Some(uvs) = submesh.get("TexCoord0") {
        let uvs = uvs.require_binary()?;
        if uvs.len() != vertex_count * 4 {
            return Err(Error::asset(format!(
                "submesh {index} TexCoord0 has {} bytes, expected {}",
                uvs.len(),
                vertex_count * 4
            )));
        }
        let (lo, hi) =
            read_domain::<2>(submesh, "TexCoord0Domain", index)?.unwrap_or(([0.0; 2], [1.0; 2]));
        let raw: Vec<u16> = u16_le(uvs).collect();
        mesh.uvs = Vec::with_capacity(raw.len());
        for q in raw.chunks_exact(2) {
            let uv = Point2::new(dequantize(q[0], lo[0], hi[0]), dequantize(q[1], lo[1], hi[1]));
            mesh.uvs.push(uv.x as f32);
            mesh.uvs.push(uv.y as f32);
        }
    }

    Ok(mesh)
}
