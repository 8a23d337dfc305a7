//! Scripted stand-ins for the browser engine and the window's event queue.
//!
//! A [`Session`] is a list of ticks. Tick `n` supplies the host events polled in loop iteration
//! `n` and what the engine does during that iteration's message-loop work. Every call the bridge
//! makes into the browser is recorded for inspection.

use std::{cell::RefCell, collections::VecDeque, path::Path, rc::Rc};

use anyhow::Context as _;

use crate::{
    bridge::EventSource,
    engine::{Browser, BrowserEngine, ClientHandler, EngineSettings},
    foundation::{
        core::{Rgba8, Size},
        error::{BridgeError, BridgeResult},
    },
    input::{HostEvent, MouseButton},
    paint::{PaintBuffer, PaintElementKind},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Session {
    pub ticks: Vec<SessionTick>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionTick {
    pub events: Vec<HostEvent>,
    /// Reported through `on_loading_state_change` before any paint of this tick.
    pub loading: Option<bool>,
    pub paints: Vec<ScriptedPaint>,
    pub load_error: Option<ScriptedLoadError>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScriptedPaint {
    #[serde(default = "view_kind")]
    pub kind: PaintElementKind,
    /// Defaults to the handler's view rect.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub pixels: PaintPixels,
}

fn view_kind() -> PaintElementKind {
    PaintElementKind::View
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PaintPixels {
    Fill { fill: Rgba8 },
    Raw { bgra: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScriptedLoadError {
    pub code: i32,
    pub url: String,
    #[serde(default = "main_frame")]
    pub main_frame: bool,
}

fn main_frame() -> bool {
    true
}

impl Session {
    pub fn from_json_str(s: &str) -> BridgeResult<Self> {
        serde_json::from_str(s).map_err(|e| BridgeError::serde(format!("session script: {e}")))
    }

    pub fn from_json_path(path: &Path) -> BridgeResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read session script '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Split into the engine half and the event-queue half.
    pub fn into_parts(self) -> (ScriptedEngine, ScriptedEvents) {
        let mut engine_ticks = VecDeque::with_capacity(self.ticks.len());
        let mut event_ticks = VecDeque::with_capacity(self.ticks.len());
        for tick in self.ticks {
            event_ticks.push_back(tick.events);
            engine_ticks.push_back(EngineTick {
                loading: tick.loading,
                paints: tick.paints,
                load_error: tick.load_error,
            });
        }
        (
            ScriptedEngine::new(engine_ticks),
            ScriptedEvents {
                ticks: event_ticks,
            },
        )
    }
}

/// Event queue that replays one batch per poll and reports `Quit` once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedEvents {
    ticks: VecDeque<Vec<HostEvent>>,
}

impl ScriptedEvents {
    pub fn new(batches: impl IntoIterator<Item = Vec<HostEvent>>) -> Self {
        Self {
            ticks: batches.into_iter().collect(),
        }
    }
}

impl EventSource for ScriptedEvents {
    fn poll_events(&mut self) -> Vec<HostEvent> {
        self.ticks.pop_front().unwrap_or_else(|| vec![HostEvent::Quit])
    }
}

/// Call made by the bridge into a [`ScriptedBrowser`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowserCall {
    MouseClick {
        x: i32,
        y: i32,
        button: MouseButton,
        mouse_up: bool,
        click_count: u32,
    },
    MouseMove {
        x: i32,
        y: i32,
        mouse_up: bool,
    },
    Focus(bool),
    Resized,
}

#[derive(Debug)]
pub struct ScriptedBrowser {
    size: Size,
    url: String,
    resized: bool,
    calls: Rc<RefCell<Vec<BrowserCall>>>,
}

impl ScriptedBrowser {
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn record(&self, call: BrowserCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Browser for ScriptedBrowser {
    fn send_mouse_click_event(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        mouse_up: bool,
        click_count: u32,
    ) {
        self.record(BrowserCall::MouseClick {
            x,
            y,
            button,
            mouse_up,
            click_count,
        });
    }

    fn send_mouse_move_event(&mut self, x: i32, y: i32, mouse_up: bool) {
        self.record(BrowserCall::MouseMove { x, y, mouse_up });
    }

    fn send_focus_event(&mut self, focused: bool) {
        self.record(BrowserCall::Focus(focused));
    }

    fn notify_resized(&mut self) {
        self.resized = true;
        self.record(BrowserCall::Resized);
    }
}

#[derive(Clone, Debug)]
struct EngineTick {
    loading: Option<bool>,
    paints: Vec<ScriptedPaint>,
    load_error: Option<ScriptedLoadError>,
}

/// Engine lifecycle as observed by the scripted engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineLog {
    pub initialized_with: Option<EngineSettings>,
    pub browsers_created: usize,
    pub ticks_run: u64,
    pub paints_delivered: u64,
    pub shutdown_calls: u32,
}

#[derive(Debug)]
pub struct ScriptedEngine {
    ticks: VecDeque<EngineTick>,
    log: EngineLog,
    calls: Rc<RefCell<Vec<BrowserCall>>>,
}

impl ScriptedEngine {
    fn new(ticks: VecDeque<EngineTick>) -> Self {
        Self {
            ticks,
            log: EngineLog::default(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn log(&self) -> &EngineLog {
        &self.log
    }

    /// Every call made into browsers created by this engine, in order.
    pub fn browser_calls(&self) -> Vec<BrowserCall> {
        self.calls.borrow().clone()
    }

    fn deliver_paint(
        &mut self,
        browser: &ScriptedBrowser,
        paint: &ScriptedPaint,
        client: &mut dyn ClientHandler,
    ) {
        let view = client.view_rect();
        if view.size() != browser.size() {
            tracing::debug!(
                ?view,
                created = ?browser.size(),
                "view rect differs from browser size"
            );
        }
        let width = paint.width.unwrap_or(view.width);
        let height = paint.height.unwrap_or(view.height);
        let buffer = match &paint.pixels {
            PaintPixels::Fill { fill } => PaintBuffer::solid(width, height, *fill),
            PaintPixels::Raw { bgra } => PaintBuffer::from_bgra(width, height, bgra.clone()),
        };
        match buffer {
            Ok(buffer) => {
                self.log.paints_delivered += 1;
                client.on_paint(paint.kind, &buffer, width, height);
            }
            Err(err) => tracing::warn!(error = %err, "scripted paint skipped"),
        }
    }
}

impl BrowserEngine for ScriptedEngine {
    type Browser = ScriptedBrowser;

    fn initialize(&mut self, settings: &EngineSettings) -> BridgeResult<()> {
        if self.log.initialized_with.is_some() {
            return Err(BridgeError::validation("engine initialized twice"));
        }
        self.log.initialized_with = Some(settings.clone());
        Ok(())
    }

    fn create_offscreen_browser(&mut self, size: Size, url: &str) -> BridgeResult<ScriptedBrowser> {
        match &self.log.initialized_with {
            Some(s) if s.windowless_rendering_enabled => {}
            Some(_) => {
                return Err(BridgeError::validation(
                    "offscreen browser needs windowless rendering",
                ));
            }
            None => return Err(BridgeError::validation("engine is not initialized")),
        }
        self.log.browsers_created += 1;
        Ok(ScriptedBrowser {
            size,
            url: url.to_string(),
            resized: false,
            calls: Rc::clone(&self.calls),
        })
    }

    fn do_message_loop_work(
        &mut self,
        browser: &mut ScriptedBrowser,
        client: &mut dyn ClientHandler,
    ) {
        let Some(tick) = self.ticks.pop_front() else {
            return;
        };
        self.log.ticks_run += 1;

        if let Some(is_loading) = tick.loading {
            client.on_loading_state_change(is_loading);
        }
        if let Some(err) = &tick.load_error {
            client.on_load_error(err.main_frame, err.code, &err.url);
        }
        if !browser.resized {
            return;
        }
        for paint in &tick.paints {
            self.deliver_paint(browser, paint, client);
        }
    }

    fn shutdown(&mut self) {
        self.log.shutdown_calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "ticks": [
            {
                "events": [{"type": "pointer_move", "x": 1, "y": 2}],
                "loading": false,
                "paints": [{"fill": {"r": 1, "g": 2, "b": 3, "a": 255}}]
            },
            {
                "paints": [{"kind": "popup", "width": 1, "height": 1, "bgra": [0, 0, 0, 255]}],
                "load_error": {"code": -105, "url": "https://example.invalid/"}
            }
        ]
    }"#;

    #[test]
    fn session_parses_paint_variants() {
        let s = Session::from_json_str(SCRIPT).unwrap();
        assert_eq!(s.ticks.len(), 2);
        assert!(matches!(s.ticks[0].paints[0].pixels, PaintPixels::Fill { .. }));
        assert_eq!(s.ticks[0].paints[0].kind, PaintElementKind::View);
        assert!(matches!(s.ticks[1].paints[0].pixels, PaintPixels::Raw { .. }));
        assert!(s.ticks[1].load_error.as_ref().unwrap().main_frame);
    }

    #[test]
    fn events_end_with_quit() {
        let (_, mut events) = Session::from_json_str(SCRIPT).unwrap().into_parts();
        assert_eq!(events.poll_events().len(), 1);
        assert!(events.poll_events().is_empty());
        assert_eq!(events.poll_events(), vec![HostEvent::Quit]);
    }

    #[test]
    fn browser_needs_initialized_engine() {
        let (mut engine, _) = Session::default().into_parts();
        let size = Size {
            width: 4,
            height: 4,
        };
        assert!(engine.create_offscreen_browser(size, "about:blank").is_err());
        engine.initialize(&EngineSettings::default()).unwrap();
        assert!(engine.initialize(&EngineSettings::default()).is_err());
        let browser = engine.create_offscreen_browser(size, "about:blank").unwrap();
        assert_eq!(browser.url(), "about:blank");
        assert_eq!(engine.log().browsers_created, 1);
    }
}
