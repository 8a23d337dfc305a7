use std::collections::BTreeMap;

use image::{Rgba, RgbaImage, imageops};

use crate::{
    foundation::{
        core::{Rect, Rgba8},
        error::{BridgeError, BridgeResult},
    },
    surface::Surface,
    texture::{Renderer, TextureHandle},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareRendererOpts {
    /// Texture budget. Creation beyond it fails like a renderer out of memory.
    pub max_textures: Option<usize>,
}

/// CPU [`Renderer`] backed by `image` buffers.
///
/// Textures decode the surface through its channel masks, so read-back reflects what a GPU upload
/// would see.
pub struct SoftwareRenderer {
    opts: SoftwareRendererOpts,
    back: RgbaImage,
    front: RgbaImage,
    textures: BTreeMap<u64, RgbaImage>,
    next_id: u64,
    presents: u64,
    closed: bool,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_opts(width, height, SoftwareRendererOpts::default())
    }

    pub fn with_opts(width: u32, height: u32, opts: SoftwareRendererOpts) -> Self {
        Self {
            opts,
            back: RgbaImage::new(width, height),
            front: RgbaImage::new(width, height),
            textures: BTreeMap::new(),
            next_id: 0,
            presents: 0,
            closed: false,
        }
    }

    pub fn read_texture(&self, texture: TextureHandle) -> Option<&RgbaImage> {
        self.textures.get(&texture.raw())
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Last presented frame.
    pub fn framebuffer(&self) -> &RgbaImage {
        &self.front
    }

    pub fn presents(&self) -> u64 {
        self.presents
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Renderer for SoftwareRenderer {
    fn create_texture_from_surface(&mut self, surface: &Surface) -> BridgeResult<TextureHandle> {
        if self.closed {
            return Err(BridgeError::texture_creation("renderer is closed"));
        }
        if let Some(max) = self.opts.max_textures
            && self.textures.len() >= max
        {
            return Err(BridgeError::texture_creation(format!(
                "texture budget of {max} exhausted"
            )));
        }

        let img = RgbaImage::from_raw(surface.width(), surface.height(), surface.to_rgba8())
            .ok_or_else(|| {
                BridgeError::texture_creation(format!(
                    "surface {}x{} did not decode to a full image",
                    surface.width(),
                    surface.height()
                ))
            })?;

        self.next_id += 1;
        self.textures.insert(self.next_id, img);
        Ok(TextureHandle::from_raw(self.next_id))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture.raw()).is_none() {
            tracing::warn!(texture = texture.raw(), "destroy of unknown texture");
        }
    }

    fn clear(&mut self, color: Rgba8) {
        let px = Rgba(color.to_array());
        for p in self.back.pixels_mut() {
            *p = px;
        }
    }

    fn copy_texture(&mut self, texture: TextureHandle, dest: Rect) -> BridgeResult<()> {
        let tex = self.textures.get(&texture.raw()).ok_or_else(|| {
            BridgeError::validation(format!("copy of unknown texture {}", texture.raw()))
        })?;
        if dest.width == 0 || dest.height == 0 {
            return Ok(());
        }

        if tex.dimensions() == (dest.width, dest.height) {
            imageops::overlay(&mut self.back, tex, i64::from(dest.x), i64::from(dest.y));
        } else {
            let scaled =
                imageops::resize(tex, dest.width, dest.height, imageops::FilterType::Nearest);
            imageops::overlay(&mut self.back, &scaled, i64::from(dest.x), i64::from(dest.y));
        }
        Ok(())
    }

    fn present(&mut self) {
        self.front.clone_from(&self.back);
        self.presents += 1;
    }

    fn close(&mut self) {
        self.textures.clear();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        foundation::core::ByteOrder,
        surface::{PixelBuffer, PixelLayout, convert},
        texture::TextureCache,
    };

    fn solid_surface(w: u32, h: u32, layout: PixelLayout, c: Rgba8, order: ByteOrder) -> Surface {
        convert(&PixelBuffer::solid(w, h, layout, c).unwrap(), order).unwrap()
    }

    #[test]
    fn solid_color_round_trips_through_texture() {
        let color = Rgba8::new(200, 100, 50, 255);
        for order in [ByteOrder::Little, ByteOrder::Big] {
            for layout in [PixelLayout::Rgb24, PixelLayout::Rgbx32, PixelLayout::Rgba32] {
                let mut r = SoftwareRenderer::new(8, 8);
                let t = r
                    .create_texture_from_surface(&solid_surface(3, 3, layout, color, order))
                    .unwrap();
                let img = r.read_texture(t).unwrap();
                assert!(img.pixels().all(|p| p.0 == color.to_array()), "{layout:?} {order:?}");
            }
        }
    }

    #[test]
    fn cache_swap_leaves_one_live_texture() {
        let mut r = SoftwareRenderer::new(8, 8);
        let mut cache = TextureCache::new();
        let order = ByteOrder::native();

        let first = cache
            .install(&mut r, solid_surface(4, 4, PixelLayout::Rgba32, Rgba8::BLACK, order))
            .unwrap();
        let second = cache
            .install(&mut r, solid_surface(2, 2, PixelLayout::Rgb24, Rgba8::BLACK, order))
            .unwrap();

        assert_eq!(r.live_textures(), 1);
        assert!(r.read_texture(first).is_none());
        assert_eq!(r.read_texture(second).unwrap().dimensions(), (2, 2));
    }

    #[test]
    fn texture_budget_fails_creation() {
        let mut r = SoftwareRenderer::with_opts(
            4,
            4,
            SoftwareRendererOpts {
                max_textures: Some(1),
            },
        );
        let s = solid_surface(1, 1, PixelLayout::Rgba32, Rgba8::BLACK, ByteOrder::native());
        r.create_texture_from_surface(&s).unwrap();
        let err = r.create_texture_from_surface(&s).unwrap_err();
        assert!(matches!(err, BridgeError::TextureCreationFailed(_)));
    }

    #[test]
    fn copy_scales_into_dest_rect_and_present_publishes() {
        let mut r = SoftwareRenderer::new(4, 4);
        let red = Rgba8::new(255, 0, 0, 255);
        let t = r
            .create_texture_from_surface(&solid_surface(
                1,
                1,
                PixelLayout::Rgba32,
                red,
                ByteOrder::native(),
            ))
            .unwrap();

        r.clear(Rgba8::BLACK);
        r.copy_texture(t, Rect::new(0, 2, 4, 2)).unwrap();
        assert_eq!(r.framebuffer().get_pixel(0, 3).0, [0, 0, 0, 0]);

        r.present();
        let fb = r.framebuffer();
        assert_eq!(fb.get_pixel(0, 0).0, Rgba8::BLACK.to_array());
        assert_eq!(fb.get_pixel(3, 3).0, red.to_array());
        assert_eq!(r.presents(), 1);
    }

    #[test]
    fn close_drops_all_textures() {
        let mut r = SoftwareRenderer::new(2, 2);
        let s = solid_surface(1, 1, PixelLayout::Rgb24, Rgba8::BLACK, ByteOrder::native());
        r.create_texture_from_surface(&s).unwrap();
        r.close();
        assert_eq!(r.live_textures(), 0);
        assert!(r.create_texture_from_surface(&s).is_err());
    }
}
