//! Contracts of the embedded browser engine.
//!
//! The bridge only consumes these; a native binding or the scripted engine in
//! [`crate::script`] provides them.

use crate::{
    foundation::{
        core::{Rect, Size},
        error::BridgeResult,
    },
    input::{BrowserInputEvent, MouseButton},
    paint::{PaintBuffer, PaintElementKind},
};

/// Process-wide engine settings passed to [`BrowserEngine::initialize`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EngineSettings {
    pub windowless_rendering_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            windowless_rendering_enabled: true,
        }
    }
}

/// Callbacks the engine invokes synchronously from inside
/// [`BrowserEngine::do_message_loop_work`].
pub trait ClientHandler {
    /// Rectangle the browser renders into, in browser coordinates.
    fn view_rect(&self) -> Rect;

    fn on_paint(&mut self, kind: PaintElementKind, buffer: &PaintBuffer, width: u32, height: u32);

    fn on_loading_state_change(&mut self, is_loading: bool);

    fn on_load_error(&mut self, is_main_frame: bool, code: i32, failed_url: &str);
}

/// One offscreen browser instance.
pub trait Browser {
    fn send_mouse_click_event(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        mouse_up: bool,
        click_count: u32,
    );

    fn send_mouse_move_event(&mut self, x: i32, y: i32, mouse_up: bool);

    fn send_focus_event(&mut self, focused: bool);

    /// Tell the browser its view rect is available (or changed). Paints start after the first call.
    fn notify_resized(&mut self);
}

pub trait BrowserEngine {
    type Browser: Browser;

    fn initialize(&mut self, settings: &EngineSettings) -> BridgeResult<()>;

    fn create_offscreen_browser(&mut self, size: Size, url: &str) -> BridgeResult<Self::Browser>;

    /// Run pending engine work. May call back into `client` before returning.
    fn do_message_loop_work(&mut self, browser: &mut Self::Browser, client: &mut dyn ClientHandler);

    fn shutdown(&mut self);
}

/// Deliver a translated event through the matching [`Browser`] call.
pub fn forward_input<B: Browser + ?Sized>(browser: &mut B, event: BrowserInputEvent) {
    match event {
        BrowserInputEvent::MouseClick {
            x,
            y,
            button,
            mouse_up,
            click_count,
        } => browser.send_mouse_click_event(x, y, button, mouse_up, click_count),
        BrowserInputEvent::MouseMove { x, y, mouse_up } => {
            browser.send_mouse_move_event(x, y, mouse_up)
        }
    }
}
