use crate::foundation::error::{BridgeError, BridgeResult};

/// Byte order of 32/24-bit pixel words on the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the compilation target.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Little => 0,
            Self::Big => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Integer rectangle in window coordinates (origin top-left).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    /// Half-open containment: `[x, x + width) x [y, y + height)`.
    pub fn contains(self, px: i32, py: i32) -> bool {
        let (px, py) = (i64::from(px), i64::from(py));
        let (x0, y0) = (i64::from(self.x), i64::from(self.y));
        px >= x0
            && py >= y0
            && px < x0 + i64::from(self.width)
            && py < y0 + i64::from(self.height)
    }
}

/// Region of the host window that shows browser content.
///
/// Fixed at startup; nothing in the loop mutates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    rect: Rect,
}

impl Viewport {
    pub fn new(rect: Rect) -> BridgeResult<Self> {
        if rect.width == 0 || rect.height == 0 {
            return Err(BridgeError::validation(format!(
                "viewport must have non-zero extents, got {}x{}",
                rect.width, rect.height
            )));
        }
        Ok(Self { rect })
    }

    /// Viewport that fills a `width x height` window below a header strip.
    pub fn below_header(width: u32, height: u32, header_height: u32) -> BridgeResult<Self> {
        if header_height >= height {
            return Err(BridgeError::validation(format!(
                "header height {header_height} leaves no room in a window {height} tall"
            )));
        }
        let top = i32::try_from(header_height)
            .map_err(|_| BridgeError::validation("header height exceeds i32"))?;
        Self::new(Rect::new(0, top, width, height - header_height))
    }

    pub fn rect(self) -> Rect {
        self.rect
    }

    pub fn size(self) -> Size {
        self.rect.size()
    }

    pub fn top_offset(self) -> i32 {
        self.rect.y
    }

    pub fn contains(self, x: i32, y: i32) -> bool {
        self.rect.contains(x, y)
    }

    /// Window coordinates to browser coordinates.
    pub fn rebase(self, x: i32, y: i32) -> (i32, i32) {
        (x - self.rect.x, y - self.rect.y)
    }
}

/// Straight-alpha RGBA8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_byte_order_matches_target() {
        let expected = if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };
        assert_eq!(ByteOrder::native(), expected);
    }

    #[test]
    fn rect_containment_is_half_open() {
        let r = Rect::new(0, 20, 100, 50);
        assert!(r.contains(0, 20));
        assert!(r.contains(99, 69));
        assert!(!r.contains(100, 20));
        assert!(!r.contains(0, 70));
        assert!(!r.contains(0, 19));
        assert!(!r.contains(-1, 30));
    }

    #[test]
    fn viewport_rejects_empty_extents() {
        assert!(Viewport::new(Rect::new(0, 0, 0, 10)).is_err());
        assert!(Viewport::new(Rect::new(0, 0, 10, 0)).is_err());
        assert!(Viewport::below_header(640, 20, 20).is_err());
    }

    #[test]
    fn viewport_below_header_rebases_by_offset() {
        let vp = Viewport::below_header(1024, 768, 20).unwrap();
        assert_eq!(vp.top_offset(), 20);
        assert_eq!(
            vp.size(),
            Size {
                width: 1024,
                height: 748
            }
        );
        assert_eq!(vp.rebase(10, 25), (10, 5));
    }
}
