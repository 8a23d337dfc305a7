//! Pixel data as the browser engine hands it out.
//!
//! Offscreen paints arrive as BGRA with a top-left origin. Consumers pick the channel order and
//! row origin they need when copying the bytes out.

use crate::{
    foundation::{
        core::Rgba8,
        error::{BridgeError, BridgeResult},
    },
    surface::{PixelBuffer, PixelLayout},
};

/// Which element of the browser a paint belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintElementKind {
    View,
    Popup,
}

/// Channel order requested from [`PaintBuffer::to_bytes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintMode {
    Rgba,
    Bgra,
}

/// Row origin requested from [`PaintBuffer::to_bytes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintOrigin {
    TopLeft,
    BottomLeft,
}

/// Engine-owned BGRA frame, valid for the duration of one paint callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaintBuffer {
    width: u32,
    height: u32,
    bgra: Vec<u8>,
}

impl PaintBuffer {
    pub fn from_bgra(width: u32, height: u32, bgra: Vec<u8>) -> BridgeResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| BridgeError::validation("paint buffer size overflows usize"))?;
        if width == 0 || height == 0 || bgra.len() != expected {
            return Err(BridgeError::validation(format!(
                "paint buffer {width}x{height} needs {expected} BGRA bytes, got {}",
                bgra.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bgra,
        })
    }

    pub fn solid(width: u32, height: u32, color: Rgba8) -> BridgeResult<Self> {
        let px = [color.b, color.g, color.r, color.a];
        let count = (width as usize).saturating_mul(height as usize);
        Self::from_bgra(width, height, px.repeat(count))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn to_bytes(&self, mode: PaintMode, origin: PaintOrigin) -> Vec<u8> {
        let row_len = self.width as usize * 4;
        let mut out = Vec::with_capacity(self.bgra.len());
        let mut rows: Vec<&[u8]> = self.bgra.chunks_exact(row_len).collect();
        if origin == PaintOrigin::BottomLeft {
            rows.reverse();
        }
        for row in rows {
            match mode {
                PaintMode::Bgra => out.extend_from_slice(row),
                PaintMode::Rgba => {
                    for px in row.chunks_exact(4) {
                        out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                    }
                }
            }
        }
        out
    }

    /// RGBA, top-left copy ready for the surface converter.
    pub fn to_pixel_buffer(&self) -> BridgeResult<PixelBuffer> {
        PixelBuffer::new(
            self.width,
            self.height,
            PixelLayout::Rgba32,
            self.to_bytes(PaintMode::Rgba, PaintOrigin::TopLeft),
        )
    }
}
