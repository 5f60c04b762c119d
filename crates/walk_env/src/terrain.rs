//! Terrain height lookup under arbitrary world points.

use serde::Deserialize;

use crate::error::EnvError;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Flat,
    /// Row-major height samples in integer units; `rows` along x, `cols`
    /// along y, starting `border_size` meters before the world origin.
    HeightField {
        heights: Vec<i16>,
        rows: usize,
        cols: usize,
        horizontal_scale: f32,
        vertical_scale: f32,
        border_size: f32,
    },
}

impl Terrain {
    /// Height of the terrain below `(x, y)`.
    ///
    /// Height fields return the lowest of the sample under the point and
    /// its +x and +y neighbours, so feet on an edge see the lower step.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        match self {
            Terrain::Flat => 0.0,
            Terrain::HeightField {
                heights,
                rows,
                cols,
                horizontal_scale,
                vertical_scale,
                border_size,
            } => {
                if *rows < 2 || *cols < 2 {
                    return 0.0;
                }
                let px = ((x + border_size) / horizontal_scale).floor();
                let py = ((y + border_size) / horizontal_scale).floor();
                let px = px.clamp(0.0, (*rows - 2) as f32) as usize;
                let py = py.clamp(0.0, (*cols - 2) as f32) as usize;
                let sample = |r: usize, c: usize| heights[r * cols + c];
                let h = sample(px, py).min(sample(px + 1, py)).min(sample(px, py + 1));
                f32::from(h) * vertical_scale
            }
        }
    }

    /// # Errors
    /// Returns [`EnvError::InvalidConfig`] when the sample count does not
    /// match `rows * cols` or the cell size is not positive.
    pub fn validate(&self) -> Result<(), EnvError> {
        match self {
            Terrain::Flat => Ok(()),
            Terrain::HeightField { heights, rows, cols, horizontal_scale, .. } => {
                if heights.len() != rows * cols {
                    return Err(EnvError::InvalidConfig(format!(
                        "height field has {} samples, expected {rows}x{cols}",
                        heights.len()
                    )));
                }
                if *horizontal_scale <= 0.0 {
                    return Err(EnvError::InvalidConfig(
                        "height field horizontal_scale must be positive".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}
