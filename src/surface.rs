use std::str::FromStr;

use crate::foundation::{
    core::{ByteOrder, Rgba8},
    error::{BridgeError, BridgeResult},
};

/// Memory layout of one pixel in a [`PixelBuffer`].
///
/// Channel names follow memory order (byte 0 first), independent of host endianness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PixelLayout {
    /// 3x8-bit, 24bpp, no alpha.
    #[serde(rename = "RGB")]
    Rgb24,
    /// 4x8-bit, the fourth byte is padding.
    #[serde(rename = "RGBX")]
    Rgbx32,
    /// 4x8-bit with straight alpha.
    #[serde(rename = "RGBA")]
    Rgba32,
    /// Engine-native order; has to be swizzled before conversion.
    #[serde(rename = "BGRA")]
    Bgra32,
    /// 8-bit grayscale.
    #[serde(rename = "L")]
    Luma8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgbx32 | Self::Rgba32 | Self::Bgra32 => 4,
            Self::Luma8 => 1,
        }
    }

    pub fn mode(self) -> &'static str {
        match self {
            Self::Rgb24 => "RGB",
            Self::Rgbx32 => "RGBX",
            Self::Rgba32 => "RGBA",
            Self::Bgra32 => "BGRA",
            Self::Luma8 => "L",
        }
    }

    /// Slot in the mask table, `None` for layouts the converter does not accept.
    fn mask_slot(self) -> Option<usize> {
        match self {
            Self::Rgb24 => Some(0),
            Self::Rgbx32 => Some(1),
            Self::Rgba32 => Some(2),
            Self::Bgra32 | Self::Luma8 => None,
        }
    }
}

impl FromStr for PixelLayout {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RGB" => Ok(Self::Rgb24),
            "RGBX" => Ok(Self::Rgbx32),
            "RGBA" => Ok(Self::Rgba32),
            "BGRA" => Ok(Self::Bgra32),
            "L" => Ok(Self::Luma8),
            other => Err(BridgeError::validation(format!(
                "unknown pixel layout tag '{other}'"
            ))),
        }
    }
}

/// One rendered frame as raw bytes. Rows are tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> BridgeResult<Self> {
        if width == 0 || height == 0 {
            return Err(BridgeError::validation(format!(
                "pixel buffer extents must be > 0, got {width}x{height}"
            )));
        }
        let pitch = (width as usize)
            .checked_mul(layout.bytes_per_pixel())
            .ok_or_else(|| BridgeError::validation("pixel buffer pitch overflows usize"))?;
        let expected = pitch
            .checked_mul(height as usize)
            .ok_or_else(|| BridgeError::validation("pixel buffer size overflows usize"))?;
        if data.len() != expected {
            return Err(BridgeError::validation(format!(
                "pixel buffer for {width}x{height} {} must hold {expected} bytes, got {}",
                layout.mode(),
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Buffer filled with a single color, written in `layout` memory order.
    pub fn solid(width: u32, height: u32, layout: PixelLayout, color: Rgba8) -> BridgeResult<Self> {
        let px: Vec<u8> = match layout {
            PixelLayout::Rgb24 => vec![color.r, color.g, color.b],
            PixelLayout::Rgbx32 => vec![color.r, color.g, color.b, 0xFF],
            PixelLayout::Rgba32 => color.to_array().to_vec(),
            PixelLayout::Bgra32 => vec![color.b, color.g, color.r, color.a],
            PixelLayout::Luma8 => {
                let l = u32::from(color.r) * 299
                    + u32::from(color.g) * 587
                    + u32::from(color.b) * 114;
                vec![(l / 1000) as u8]
            }
        };
        let count = (width as usize).saturating_mul(height as usize);
        Self::new(width, height, layout, px.repeat(count))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn pitch(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Bit masks selecting each channel out of a native-order pixel word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelMasks {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    /// Zero when the layout carries no alpha.
    pub a: u32,
}

impl ChannelMasks {
    const fn new(r: u32, g: u32, b: u32, a: u32) -> Self {
        Self { r, g, b, a }
    }
}

// [byte order][Rgb24, Rgbx32, Rgba32]
const MASK_TABLE: [[ChannelMasks; 3]; 2] = [
    [
        ChannelMasks::new(0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0),
        ChannelMasks::new(0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0),
        ChannelMasks::new(0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000),
    ],
    [
        ChannelMasks::new(0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0),
        ChannelMasks::new(0xFF00_0000, 0x00FF_0000, 0x0000_FF00, 0),
        ChannelMasks::new(0xFF00_0000, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF),
    ],
];

/// Channel masks for `layout` when pixel words are read in `order`.
pub fn mask_table(order: ByteOrder, layout: PixelLayout) -> BridgeResult<ChannelMasks> {
    let slot = layout
        .mask_slot()
        .ok_or(BridgeError::UnsupportedPixelFormat(layout))?;
    Ok(MASK_TABLE[order.index()][slot])
}

/// CPU-side image with explicit channel masks. Lives for one frame only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    depth: u8,
    pitch: usize,
    masks: ChannelMasks,
    byte_order: ByteOrder,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bits per pixel: 24 or 32.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn masks(&self) -> ChannelMasks {
        self.masks
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn has_alpha(&self) -> bool {
        self.masks.a != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    fn word_at(&self, x: u32, y: u32) -> u32 {
        let bpp = usize::from(self.depth / 8);
        let off = y as usize * self.pitch + x as usize * bpp;
        let px = &self.pixels[off..off + bpp];
        match (bpp, self.byte_order) {
            (4, ByteOrder::Little) => u32::from_le_bytes([px[0], px[1], px[2], px[3]]),
            (4, ByteOrder::Big) => u32::from_be_bytes([px[0], px[1], px[2], px[3]]),
            (_, ByteOrder::Little) => {
                u32::from(px[0]) | u32::from(px[1]) << 8 | u32::from(px[2]) << 16
            }
            (_, ByteOrder::Big) => {
                u32::from(px[0]) << 16 | u32::from(px[1]) << 8 | u32::from(px[2])
            }
        }
    }

    /// Decode one pixel through the channel masks. Missing alpha reads as opaque.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let word = self.word_at(x, y);
        let m = self.masks;
        Some(Rgba8 {
            r: extract_channel(word, m.r).unwrap_or(0),
            g: extract_channel(word, m.g).unwrap_or(0),
            b: extract_channel(word, m.b).unwrap_or(0),
            a: extract_channel(word, m.a).unwrap_or(0xFF),
        })
    }

    /// Whole surface as tightly packed straight RGBA8.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                if let Some(px) = self.pixel(x, y) {
                    out.extend_from_slice(&px.to_array());
                }
            }
        }
        out
    }
}

fn extract_channel(word: u32, mask: u32) -> Option<u8> {
    if mask == 0 {
        return None;
    }
    Some(((word & mask) >> mask.trailing_zeros()) as u8)
}

/// Build a [`Surface`] from `buffer`, with masks chosen for `order`.
///
/// Copies the pixel bytes; the buffer is not referenced after return.
pub fn convert(buffer: &PixelBuffer, order: ByteOrder) -> BridgeResult<Surface> {
    let layout = buffer.layout();
    let masks = mask_table(order, layout)?;
    let depth = match layout {
        PixelLayout::Rgb24 => 24,
        _ => 32,
    };
    Ok(Surface {
        width: buffer.width(),
        height: buffer.height(),
        depth,
        pitch: buffer.pitch(),
        masks,
        byte_order: order,
        pixels: buffer.as_bytes().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: [ByteOrder; 2] = [ByteOrder::Little, ByteOrder::Big];

    #[test]
    fn layout_tags_parse_like_image_modes() {
        assert_eq!("RGB".parse::<PixelLayout>().unwrap(), PixelLayout::Rgb24);
        assert_eq!("RGBX".parse::<PixelLayout>().unwrap(), PixelLayout::Rgbx32);
        assert_eq!("RGBA".parse::<PixelLayout>().unwrap(), PixelLayout::Rgba32);
        assert!("CMYK".parse::<PixelLayout>().is_err());
    }

    #[test]
    fn mask_table_matches_byte_order() {
        let le = mask_table(ByteOrder::Little, PixelLayout::Rgba32).unwrap();
        assert_eq!(
            le,
            ChannelMasks::new(0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000)
        );
        let be = mask_table(ByteOrder::Big, PixelLayout::Rgba32).unwrap();
        assert_eq!(
            be,
            ChannelMasks::new(0xFF00_0000, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF)
        );
        let le_rgb = mask_table(ByteOrder::Little, PixelLayout::Rgb24).unwrap();
        assert_eq!(le_rgb, ChannelMasks::new(0x0000FF, 0x00FF00, 0xFF0000, 0));
        let be_rgb = mask_table(ByteOrder::Big, PixelLayout::Rgb24).unwrap();
        assert_eq!(be_rgb, ChannelMasks::new(0xFF0000, 0x00FF00, 0x0000FF, 0));
    }

    #[test]
    fn rgbx_has_no_alpha_mask() {
        for order in ORDERS {
            let m = mask_table(order, PixelLayout::Rgbx32).unwrap();
            assert_eq!(m.a, 0);
            let rgba = mask_table(order, PixelLayout::Rgba32).unwrap();
            assert_eq!(m, ChannelMasks { a: 0, ..rgba });
        }
    }

    #[test]
    fn convert_sets_depth_and_pitch() {
        for order in ORDERS {
            let rgba = PixelBuffer::solid(4, 4, PixelLayout::Rgba32, Rgba8::BLACK).unwrap();
            let s = convert(&rgba, order).unwrap();
            assert_eq!((s.depth(), s.pitch()), (32, 16));
            assert!(s.has_alpha());

            let rgb = PixelBuffer::solid(2, 2, PixelLayout::Rgb24, Rgba8::BLACK).unwrap();
            let s = convert(&rgb, order).unwrap();
            assert_eq!((s.depth(), s.pitch()), (24, 6));
            assert!(!s.has_alpha());
        }
    }

    #[test]
    fn decoded_channels_are_byte_order_independent() {
        let color = Rgba8::new(0x12, 0x34, 0x56, 0x78);
        for layout in [PixelLayout::Rgb24, PixelLayout::Rgbx32, PixelLayout::Rgba32] {
            let buf = PixelBuffer::solid(3, 2, layout, color).unwrap();
            for order in ORDERS {
                let px = convert(&buf, order).unwrap().pixel(2, 1).unwrap();
                assert_eq!((px.r, px.g, px.b), (0x12, 0x34, 0x56), "{layout:?} {order:?}");
                let expected_a = if layout == PixelLayout::Rgba32 { 0x78 } else { 0xFF };
                assert_eq!(px.a, expected_a);
            }
        }
    }

    #[test]
    fn unsupported_layouts_are_rejected() {
        for layout in [PixelLayout::Bgra32, PixelLayout::Luma8] {
            let buf = PixelBuffer::solid(1, 1, layout, Rgba8::BLACK).unwrap();
            let err = convert(&buf, ByteOrder::native()).unwrap_err();
            assert!(matches!(err, BridgeError::UnsupportedPixelFormat(l) if l == layout));
        }
    }

    #[test]
    fn buffer_length_must_match_pitch() {
        assert!(PixelBuffer::new(2, 2, PixelLayout::Rgba32, vec![0; 15]).is_err());
        assert!(PixelBuffer::new(0, 2, PixelLayout::Rgba32, vec![]).is_err());
        assert!(PixelBuffer::new(2, 2, PixelLayout::Rgb24, vec![0; 12]).is_ok());
    }

    #[test]
    fn surface_owns_its_bytes() {
        let buf = PixelBuffer::solid(1, 1, PixelLayout::Rgba32, Rgba8::new(1, 2, 3, 4)).unwrap();
        let surface = convert(&buf, ByteOrder::Little).unwrap();
        drop(buf);
        assert_eq!(surface.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(surface.pixel(1, 0), None);
    }
}
