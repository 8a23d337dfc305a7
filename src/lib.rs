//! Offscreen browser rendering bridge.
//!
//! An embedded browser running in windowless mode hands out rendered frames as raw pixel buffers.
//! This crate turns those buffers into renderer textures and sends host input back:
//!
//! 1. **Convert**: `PixelBuffer -> Surface` with channel masks picked for the host byte order
//! 2. **Install**: `Surface -> Texture`, keeping exactly one live texture per render target
//! 3. **Translate**: window input events to browser input in viewport coordinates
//!
//! The browser engine and the windowing layer are collaborators behind the [`BrowserEngine`],
//! [`Browser`], [`Renderer`] and [`EventSource`] traits. [`SoftwareRenderer`] and the scripted
//! engine in [`script`] let the whole loop run headless.
#![forbid(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod engine;
mod foundation;
pub mod input;
pub mod paint;
pub mod script;
pub mod soft;
pub mod surface;
pub mod texture;

pub use bridge::{
    BridgeContext, EventSource, FrameStats, LoopOptions, LoopState, PaintHandler, RunOutcome,
    ShutdownReason, launch, run,
};
pub use config::{BridgeConfig, ByteOrderChoice};
pub use engine::{Browser, BrowserEngine, ClientHandler, EngineSettings, forward_input};
pub use foundation::core::{ByteOrder, Rect, Rgba8, Size, Viewport};
pub use foundation::error::{BridgeError, BridgeResult};
pub use input::{BrowserInputEvent, HostEvent, Key, MouseButton, is_quit, translate};
pub use paint::{PaintBuffer, PaintElementKind, PaintMode, PaintOrigin};
pub use soft::{SoftwareRenderer, SoftwareRendererOpts};
pub use surface::{ChannelMasks, PixelBuffer, PixelLayout, Surface, convert, mask_table};
pub use texture::{Renderer, TextureCache, TextureHandle};
