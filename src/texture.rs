use crate::{
    foundation::{
        core::{Rect, Rgba8},
        error::{BridgeError, BridgeResult},
    },
    surface::Surface,
};

/// Opaque id of a renderer-resident texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Windowing-side capabilities the bridge draws through.
pub trait Renderer {
    fn create_texture_from_surface(&mut self, surface: &Surface) -> BridgeResult<TextureHandle>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    fn clear(&mut self, color: Rgba8);

    /// Draw `texture` stretched into `dest` on the back buffer.
    fn copy_texture(&mut self, texture: TextureHandle, dest: Rect) -> BridgeResult<()>;

    fn present(&mut self);

    /// Release window and renderer resources. Called once, last.
    fn close(&mut self);
}

/// Single-slot owner of the texture currently shown for a render target.
///
/// Every successful [`TextureCache::install`] invalidates the handle returned by the previous one.
#[derive(Debug, Default)]
pub struct TextureCache {
    current: Option<TextureHandle>,
    installs: u64,
    failures: u64,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload `surface` and make it the current texture.
    ///
    /// The new texture is created before the old one is destroyed, so a failed creation leaves the
    /// previous texture in place.
    pub fn install<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        surface: Surface,
    ) -> BridgeResult<TextureHandle> {
        let next = match renderer.create_texture_from_surface(&surface) {
            Ok(t) => t,
            Err(err) => {
                self.failures = self.failures.saturating_add(1);
                return Err(match err {
                    BridgeError::TextureCreationFailed(_) => err,
                    other => BridgeError::texture_creation(other.to_string()),
                });
            }
        };
        drop(surface);

        if let Some(prev) = self.current.replace(next) {
            renderer.destroy_texture(prev);
        }
        self.installs = self.installs.saturating_add(1);
        Ok(next)
    }

    pub fn current(&self) -> Option<TextureHandle> {
        self.current
    }

    pub fn is_current(&self, texture: TextureHandle) -> bool {
        self.current == Some(texture)
    }

    /// Destroy the held texture, if any. The cache is empty afterwards.
    pub fn release<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        if let Some(t) = self.current.take() {
            renderer.destroy_texture(t);
        }
    }

    pub fn installs(&self) -> u64 {
        self.installs
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{
        foundation::core::ByteOrder,
        surface::{PixelBuffer, PixelLayout, convert},
    };

    #[derive(Default)]
    struct CountingRenderer {
        next_id: u64,
        live: BTreeSet<u64>,
        fail_next: bool,
    }

    impl Renderer for CountingRenderer {
        fn create_texture_from_surface(
            &mut self,
            _surface: &Surface,
        ) -> BridgeResult<TextureHandle> {
            if std::mem::take(&mut self.fail_next) {
                return Err(BridgeError::validation("device lost"));
            }
            self.next_id += 1;
            self.live.insert(self.next_id);
            Ok(TextureHandle(self.next_id))
        }

        fn destroy_texture(&mut self, texture: TextureHandle) {
            assert!(self.live.remove(&texture.0), "double destroy of {texture:?}");
        }

        fn clear(&mut self, _color: Rgba8) {}

        fn copy_texture(&mut self, _texture: TextureHandle, _dest: Rect) -> BridgeResult<()> {
            Ok(())
        }

        fn present(&mut self) {}

        fn close(&mut self) {}
    }

    fn surface(w: u32, h: u32, layout: PixelLayout) -> Surface {
        let buf = PixelBuffer::solid(w, h, layout, Rgba8::BLACK).unwrap();
        convert(&buf, ByteOrder::native()).unwrap()
    }

    #[test]
    fn install_replaces_previous_texture() {
        let mut r = CountingRenderer::default();
        let mut cache = TextureCache::new();

        let t1 = cache.install(&mut r, surface(4, 4, PixelLayout::Rgba32)).unwrap();
        let t2 = cache.install(&mut r, surface(2, 2, PixelLayout::Rgb24)).unwrap();

        assert_ne!(t1, t2);
        assert!(!cache.is_current(t1));
        assert!(cache.is_current(t2));
        assert_eq!(r.live.len(), 1);
        assert_eq!(cache.installs(), 2);
    }

    #[test]
    fn failed_creation_keeps_previous_texture() {
        let mut r = CountingRenderer::default();
        let mut cache = TextureCache::new();
        let t1 = cache.install(&mut r, surface(1, 1, PixelLayout::Rgba32)).unwrap();

        r.fail_next = true;
        let err = cache
            .install(&mut r, surface(1, 1, PixelLayout::Rgba32))
            .unwrap_err();

        assert!(matches!(err, BridgeError::TextureCreationFailed(_)));
        assert_eq!(cache.current(), Some(t1));
        assert_eq!(r.live.len(), 1);
        assert_eq!(cache.failures(), 1);
    }

    #[test]
    fn release_empties_cache() {
        let mut r = CountingRenderer::default();
        let mut cache = TextureCache::new();
        cache.install(&mut r, surface(1, 1, PixelLayout::Rgbx32)).unwrap();

        cache.release(&mut r);
        cache.release(&mut r);

        assert_eq!(cache.current(), None);
        assert!(r.live.is_empty());
    }
}
