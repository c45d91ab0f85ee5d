//! Terrain system - height-field mesh, height sampling and crater deformation.
//!
//! The terrain is a grid of elevation samples turned into an indexed triangle
//! mesh centred on the origin. The mesh vertex buffer is the only store of
//! elevations: height queries read it, crater deformation writes it in place.
//!
//! Terrain-local coordinates are z-up: a sample at `(row, col)` sits at
//! `(col * scale - mid_x, mid_y - row * scale, elevation)`. World entities are
//! y-up, so a world position `(x, y, z)` is queried as `height_at(x, z)`.

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Errors raised while building or querying a height field.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("terrain has no samples")]
    Empty,
    #[error("row {row} has {found} samples, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("terrain needs at least 2x2 samples, got {rows}x{cols}")]
    TooSmall { rows: usize, cols: usize },
    #[error("a {rows}x{cols} grid exceeds the addressable mesh size")]
    TooLarge { rows: usize, cols: usize },
    #[error("cell scale must be positive and finite, got {0}")]
    InvalidScale(f32),
    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },
    #[error("could not parse token {token:?} at position {position}")]
    Parse { token: String, position: usize },
    #[error("point ({x}, {y}) lies outside the terrain")]
    OutOfBounds { x: f32, y: f32 },
    #[error("failed to read terrain file: {0}")]
    Io(#[from] std::io::Error),
}

/// A single mesh vertex (terrain-local, z-up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Indexed triangle mesh generated from the height samples.
///
/// One vertex per sample, row-major. Collaborators get read-only access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerrainMesh {
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
}

impl TerrainMesh {
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex indices of each triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }

    /// Expand into three vertices per triangle, for renderers that draw
    /// unindexed triangle lists.
    pub fn triangle_soup(&self) -> Vec<MeshVertex> {
        self.indices
            .iter()
            .map(|&i| self.vertices[i as usize])
            .collect()
    }
}

/// Which half of a grid cell a point falls in. The split runs along the
/// upper-left to lower-right diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTriangle {
    /// Corners: upper-left, lower-right, lower-left.
    LowerLeft,
    /// Corners: upper-left, lower-right, upper-right.
    UpperRight,
}

/// Pick the cell triangle for the fractional offsets inside a cell and return
/// the interpolation weights for its (upper-left, lower-right, third) corners.
pub fn barycentric(x_frac: f32, y_frac: f32) -> (CellTriangle, [f32; 3]) {
    if x_frac < y_frac {
        let alpha = y_frac;
        let beta = (1.0 - y_frac) * x_frac;
        (CellTriangle::LowerLeft, [alpha, beta, 1.0 - alpha - beta])
    } else {
        let alpha = 1.0 - y_frac;
        let beta = x_frac * y_frac;
        (CellTriangle::UpperRight, [alpha, beta, 1.0 - alpha - beta])
    }
}

/// Grid-based terrain heightmap with its triangle mesh.
#[derive(Debug, Clone)]
pub struct HeightField {
    rows: usize,
    cols: usize,
    cell_scale: f32,
    mid_x: f32,
    mid_y: f32,
    mesh: TerrainMesh,
}

/// Level 161x161 grid at 500 units per cell, centred on the origin.
impl Default for HeightField {
    fn default() -> Self {
        Self::build(161, 161, 500.0, vec![0.0; 161 * 161])
    }
}

impl HeightField {
    /// Build from nested rows of samples.
    pub fn load(samples: Vec<Vec<f32>>, cell_scale: f32) -> Result<Self, TerrainError> {
        let rows = samples.len();
        let cols = samples.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(TerrainError::Empty);
        }
        if let Some((row, values)) = samples
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != cols)
        {
            return Err(TerrainError::RaggedRow {
                row,
                expected: cols,
                found: values.len(),
            });
        }
        Self::validate(rows, cols, cell_scale)?;

        Ok(Self::build(
            rows,
            cols,
            cell_scale,
            samples.into_iter().flatten().collect(),
        ))
    }

    /// Build from a flat row-major slice of `rows * cols` samples.
    pub fn from_row_major(
        rows: usize,
        cols: usize,
        samples: Vec<f32>,
        cell_scale: f32,
    ) -> Result<Self, TerrainError> {
        if rows == 0 || cols == 0 || samples.is_empty() {
            return Err(TerrainError::Empty);
        }
        let expected = Self::sample_len(rows, cols)?;
        if samples.len() != expected {
            return Err(TerrainError::SampleCount {
                expected,
                found: samples.len(),
            });
        }
        Self::validate(rows, cols, cell_scale)?;
        Ok(Self::build(rows, cols, cell_scale, samples))
    }

    /// A level terrain at a constant elevation.
    pub fn flat(
        rows: usize,
        cols: usize,
        cell_scale: f32,
        elevation: f32,
    ) -> Result<Self, TerrainError> {
        let len = Self::sample_len(rows, cols)?;
        Self::from_row_major(rows, cols, vec![elevation; len], cell_scale)
    }

    /// Parse the DEM text format: `rows cols` followed by `rows * cols`
    /// whitespace separated elevations in row-major order.
    pub fn parse_dem(text: &str, cell_scale: f32) -> Result<Self, TerrainError> {
        let mut tokens = text.split_whitespace().enumerate();
        let rows: usize = next_token(&mut tokens)?;
        let cols: usize = next_token(&mut tokens)?;
        let samples = tokens
            .map(|(position, token)| parse_token(position, token))
            .collect::<Result<Vec<f32>, _>>()?;
        Self::from_row_major(rows, cols, samples, cell_scale)
    }

    /// Read and parse a DEM file.
    pub fn load_dem_file(path: impl AsRef<Path>, cell_scale: f32) -> Result<Self, TerrainError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let field = Self::parse_dem(&text, cell_scale)?;
        log::info!(
            "loaded {}x{} terrain from {} (scale {})",
            field.rows,
            field.cols,
            path.display(),
            cell_scale
        );
        Ok(field)
    }

    /// Number of samples in a `rows x cols` grid. Every sample must be
    /// addressable by a `u32` mesh index.
    fn sample_len(rows: usize, cols: usize) -> Result<usize, TerrainError> {
        rows.checked_mul(cols)
            .filter(|&len| u32::try_from(len).is_ok())
            .ok_or(TerrainError::TooLarge { rows, cols })
    }

    fn validate(rows: usize, cols: usize, cell_scale: f32) -> Result<(), TerrainError> {
        if rows < 2 || cols < 2 {
            return Err(TerrainError::TooSmall { rows, cols });
        }
        Self::sample_len(rows, cols)?;
        if !(cell_scale.is_finite() && cell_scale > 0.0) {
            return Err(TerrainError::InvalidScale(cell_scale));
        }
        Ok(())
    }

    fn build(rows: usize, cols: usize, cell_scale: f32, samples: Vec<f32>) -> Self {
        // Integer halves keep the sample grid centred the same way the DEM
        // data was authored.
        let mid_x = cell_scale * (cols / 2) as f32;
        let mid_y = cell_scale * (rows / 2) as f32;

        let vertices = samples
            .into_iter()
            .enumerate()
            .map(|(i, elevation)| {
                let (row, col) = (i / cols, i % cols);
                MeshVertex {
                    position: Vec3::new(
                        col as f32 * cell_scale - mid_x,
                        mid_y - row as f32 * cell_scale,
                        elevation,
                    ),
                    normal: Vec3::Z,
                }
            })
            .collect();

        let mut indices = Vec::with_capacity(6 * (rows - 1) * (cols - 1));
        for row in 0..rows - 1 {
            for col in 0..cols - 1 {
                let ul = (row * cols + col) as u32;
                let ur = ul + 1;
                let ll = ul + cols as u32;
                let lr = ll + 1;
                indices.extend_from_slice(&[ul, lr, ur, ul, ll, lr]);
            }
        }

        let mut field = Self {
            rows,
            cols,
            cell_scale,
            mid_x,
            mid_y,
            mesh: TerrainMesh { vertices, indices },
        };
        field.compute_normals();
        field
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_scale(&self) -> f32 {
        self.cell_scale
    }

    pub fn mesh(&self) -> &TerrainMesh {
        &self.mesh
    }

    /// Elevation of a sample, if the indices are on the grid.
    pub fn sample(&self, row: usize, col: usize) -> Option<f32> {
        (row < self.rows && col < self.cols).then(|| self.elevation(row, col))
    }

    /// All elevations, row-major.
    pub fn elevations(&self) -> Vec<f32> {
        self.mesh.vertices.iter().map(|v| v.position.z).collect()
    }

    fn elevation(&self, row: usize, col: usize) -> f32 {
        self.mesh.vertices[row * self.cols + col].position.z
    }

    /// Planar bounds `(min_x, min_y, max_x, max_y)` in terrain-local units.
    pub fn extent(&self) -> (f32, f32, f32, f32) {
        let max_x = (self.cols - 1) as f32 * self.cell_scale - self.mid_x;
        let min_y = self.mid_y - (self.rows - 1) as f32 * self.cell_scale;
        (-self.mid_x, min_y, max_x, self.mid_y)
    }

    /// Continuous (column, row) grid coordinates of a planar point.
    fn grid_coords(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x + self.mid_x) / self.cell_scale,
            (self.mid_y - y) / self.cell_scale,
        )
    }

    /// Whether a planar point lies on the grid (edges included).
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let (col_f, row_f) = self.grid_coords(x, y);
        (0.0..=(self.cols - 1) as f32).contains(&col_f)
            && (0.0..=(self.rows - 1) as f32).contains(&row_f)
    }

    /// Interpolated elevation at a planar point. Points beyond the grid are
    /// clamped to its nearest edge.
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        let (col_f, row_f) = self.grid_coords(x, y);
        let col_f = clamp_coord(col_f, (self.cols - 1) as f32);
        let row_f = clamp_coord(row_f, (self.rows - 1) as f32);
        self.interpolate(col_f, row_f)
    }

    /// Interpolated elevation, or `OutOfBounds` when the point is off the grid.
    pub fn try_height_at(&self, x: f32, y: f32) -> Result<f32, TerrainError> {
        if !self.contains(x, y) {
            return Err(TerrainError::OutOfBounds { x, y });
        }
        let (col_f, row_f) = self.grid_coords(x, y);
        Ok(self.interpolate(col_f, row_f))
    }

    fn interpolate(&self, col_f: f32, row_f: f32) -> f32 {
        // The last row/column has no cell of its own; it is the far edge of
        // the previous one.
        let col = (col_f.floor() as usize).min(self.cols - 2);
        let row = (row_f.floor() as usize).min(self.rows - 2);
        let x_frac = col_f - col as f32;
        let y_frac = row_f - row as f32;

        let (triangle, [alpha, beta, gamma]) = barycentric(x_frac, y_frac);
        let third = match triangle {
            CellTriangle::LowerLeft => self.elevation(row + 1, col),
            CellTriangle::UpperRight => self.elevation(row, col + 1),
        };
        alpha * self.elevation(row, col) + beta * self.elevation(row + 1, col + 1) + gamma * third
    }

    /// Raise every vertex near `impact` with a linear falloff.
    ///
    /// Planar distance is measured between the vertex `(x, y)` and the impact
    /// `(x, z)`. Vertices within `radius * force` rise by
    /// `((radius - d) / radius) * force`, never by a negative amount. Returns
    /// the number of vertices that moved. Normals are left stale; call
    /// [`HeightField::compute_normals`] afterwards.
    pub fn deform(&mut self, impact: Vec3, radius: f32, force: f32) -> usize {
        if !(radius > 0.0 && force > 0.0 && radius.is_finite() && force.is_finite())
            || !impact.is_finite()
        {
            return 0;
        }

        let reach = radius * force;
        let mut raised = 0;
        for vertex in &mut self.mesh.vertices {
            let dx = vertex.position.x - impact.x;
            let dy = vertex.position.y - impact.z;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist <= reach {
                let lift = ((radius - dist) / radius) * force;
                if lift > 0.0 {
                    vertex.position.z += lift;
                    raised += 1;
                }
            }
        }
        raised
    }

    /// Recompute per-vertex unit normals from the adjacent face normals.
    pub fn compute_normals(&mut self) {
        let face_normals = self.face_normals();
        let mut sums = vec![Vec3::ZERO; self.mesh.vertices.len()];
        for (triangle, normal) in self.mesh.indices.chunks_exact(3).zip(&face_normals) {
            for &i in triangle {
                sums[i as usize] += *normal;
            }
        }
        for (vertex, sum) in self.mesh.vertices.iter_mut().zip(sums) {
            vertex.normal = sum.try_normalize().unwrap_or(Vec3::Z);
        }
    }

    fn face_normals(&self) -> Vec<Vec3> {
        let vertices = &self.mesh.vertices;

        #[cfg(feature = "parallel")]
        let normals = self
            .mesh
            .indices
            .par_chunks_exact(3)
            .map(|triangle| face_normal(vertices, triangle))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let normals = self
            .mesh
            .indices
            .chunks_exact(3)
            .map(|triangle| face_normal(vertices, triangle))
            .collect();

        normals
    }
}

fn face_normal(vertices: &[MeshVertex], triangle: &[u32]) -> Vec3 {
    let a = vertices[triangle[0] as usize].position;
    let b = vertices[triangle[1] as usize].position;
    let c = vertices[triangle[2] as usize].position;
    (b - a).cross(c - a).normalize_or_zero()
}

fn clamp_coord(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

fn parse_token<T: FromStr>(position: usize, token: &str) -> Result<T, TerrainError> {
    token.parse().map_err(|_| TerrainError::Parse {
        token: token.to_string(),
        position,
    })
}

fn next_token<'a, T: FromStr>(
    tokens: &mut impl Iterator<Item = (usize, &'a str)>,
) -> Result<T, TerrainError> {
    let (position, token) = tokens.next().ok_or(TerrainError::Empty)?;
    parse_token(position, token)
}

/// A crater left by a projectile impact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Crater {
    /// World position X of the impact.
    pub x: f32,
    /// World position Z of the impact.
    pub z: f32,
    /// Terrain height under the impact.
    pub height: f32,
    pub radius: f32,
    pub force: f32,
    /// Number of vertices raised.
    pub raised: usize,
}

/// Resource wrapper for the height field shared by the frame systems.
///
/// All writes go through `ResMut`, so a frame's reads and writes are
/// serialized by the schedule.
#[derive(Resource, Debug, Clone)]
pub struct TerrainResource {
    pub field: HeightField,
    /// Craters created since the last snapshot.
    pub craters: Vec<Crater>,
    /// Set when the mesh changed and a renderer should re-upload it.
    pub dirty: bool,
}

impl TerrainResource {
    pub fn new(field: HeightField) -> Self {
        Self {
            field,
            craters: Vec::new(),
            dirty: true,
        }
    }

    /// Terrain height under a world position `(x, _, z)`.
    pub fn height_under(&self, position: Vec3) -> f32 {
        self.field.height_at(position.x, position.z)
    }

    /// Deform the terrain at a world impact point and record the crater.
    /// Normals are not refreshed here.
    pub fn apply_crater(&mut self, impact: Vec3, radius: f32, force: f32) -> usize {
        let raised = self.field.deform(impact, radius, force);
        if raised > 0 {
            self.dirty = true;
        }
        self.craters.push(Crater {
            x: impact.x,
            z: impact.z,
            height: impact.y,
            radius,
            force,
            raised,
        });
        raised
    }

    pub fn take_craters(&mut self) -> Vec<Crater> {
        std::mem::take(&mut self.craters)
    }
}

/// Snapshot of terrain for serialization to a renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub cell_scale: f32,
    /// Flattened elevations, row-major.
    pub heights: Vec<f32>,
    /// Craters not yet reported.
    pub craters: Vec<Crater>,
}

impl TerrainSnapshot {
    pub fn from_resource(terrain: &TerrainResource) -> Self {
        Self {
            rows: terrain.field.rows(),
            cols: terrain.field.cols(),
            cell_scale: terrain.field.cell_scale(),
            heights: terrain.field.elevations(),
            craters: terrain.craters.clone(),
        }
    }
}
