//! The render loop that ties the engine, the texture cache and host input together.
//!
//! One iteration: poll input, forward what lands in the viewport, clear, tick the engine (which
//! may paint synchronously), draw the current texture, present.

use crate::{
    config::BridgeConfig,
    engine::{Browser, BrowserEngine, ClientHandler, forward_input},
    foundation::{
        core::{ByteOrder, Rect, Rgba8, Viewport},
        error::{BridgeError, BridgeResult},
    },
    input::{HostEvent, is_quit, translate},
    paint::{PaintBuffer, PaintElementKind},
    surface::{PixelBuffer, convert},
    texture::{Renderer, TextureCache, TextureHandle},
};

/// Windowing-side input source.
pub trait EventSource {
    /// Everything queued since the last call, oldest first.
    fn poll_events(&mut self) -> Vec<HostEvent>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    Quit,
    LoadError { code: i32, url: String },
    IterationLimit,
    RenderError(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub iterations: u64,
    pub paints: u64,
    pub frames_installed: u64,
    pub frames_dropped: u64,
    pub popups_ignored: u64,
    pub events_forwarded: u64,
    pub events_ignored: u64,
    pub presents: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoopOptions {
    /// Stop after this many iterations. `None` runs until quit or a load error.
    pub max_iterations: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub reason: ShutdownReason,
    pub stats: FrameStats,
}

impl RunOutcome {
    /// `Err` when the run ended on a main-frame load failure.
    pub fn into_result(self) -> BridgeResult<FrameStats> {
        match self.reason {
            ShutdownReason::LoadError { code, url } => Err(BridgeError::load(code, url)),
            ShutdownReason::RenderError(msg) => Err(BridgeError::Other(anyhow::anyhow!(msg))),
            ShutdownReason::Quit | ShutdownReason::IterationLimit => Ok(self.stats),
        }
    }
}

/// Render state of one browser instance, passed explicitly into the loop.
#[derive(Debug)]
pub struct BridgeContext {
    viewport: Viewport,
    byte_order: ByteOrder,
    background: Rgba8,
    cache: TextureCache,
    state: LoopState,
    reason: Option<ShutdownReason>,
    stats: FrameStats,
}

impl BridgeContext {
    pub fn new(viewport: Viewport, byte_order: ByteOrder, background: Rgba8) -> Self {
        Self {
            viewport,
            byte_order,
            background,
            cache: TextureCache::new(),
            state: LoopState::Running,
            reason: None,
            stats: FrameStats::default(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> BridgeResult<Self> {
        Ok(Self::new(
            config.viewport()?,
            config.byte_order.resolve(),
            config.background,
        ))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn cache(&self) -> &TextureCache {
        &self.cache
    }

    pub fn shutdown_reason(&self) -> Option<&ShutdownReason> {
        self.reason.as_ref()
    }

    /// Leave `Running`. Only the first call has an effect.
    pub fn begin_shutdown(&mut self, reason: ShutdownReason) -> bool {
        if self.state != LoopState::Running {
            return false;
        }
        tracing::info!(?reason, "shutting down");
        self.state = LoopState::ShuttingDown;
        self.reason = Some(reason);
        true
    }

    /// Convert `buffer` and swap it into the texture cache.
    ///
    /// On error the previous texture stays current and the frame counts as dropped.
    pub fn install_pixels<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        buffer: &PixelBuffer,
    ) -> BridgeResult<TextureHandle> {
        let installed = convert(buffer, self.byte_order)
            .and_then(|surface| self.cache.install(renderer, surface));
        match &installed {
            Ok(_) => self.stats.frames_installed += 1,
            Err(err) => {
                self.stats.frames_dropped += 1;
                tracing::warn!(
                    error = %err,
                    width = buffer.width(),
                    height = buffer.height(),
                    "dropping frame"
                );
            }
        }
        installed
    }

    fn handle_paint<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        kind: PaintElementKind,
        buffer: &PaintBuffer,
        width: u32,
        height: u32,
    ) {
        self.stats.paints += 1;
        if self.state != LoopState::Running {
            tracing::debug!("paint after shutdown began, ignored");
            return;
        }
        if kind != PaintElementKind::View {
            self.stats.popups_ignored += 1;
            tracing::warn!(?kind, "unsupported paint element kind");
            return;
        }
        if (buffer.width(), buffer.height()) != (width, height) {
            self.stats.frames_dropped += 1;
            tracing::warn!(
                width,
                height,
                buffer_width = buffer.width(),
                buffer_height = buffer.height(),
                "paint size does not match its buffer, dropping frame"
            );
            return;
        }
        match buffer.to_pixel_buffer() {
            Ok(pixels) => {
                if let Err(err) = self.install_pixels(renderer, &pixels) {
                    self.on_frame_error(err);
                }
            }
            Err(err) => {
                self.stats.frames_dropped += 1;
                tracing::warn!(error = %err, "dropping frame");
            }
        }
    }

    /// Per-frame errors were already counted and logged; anything else ends the loop.
    fn on_frame_error(&mut self, err: BridgeError) {
        if err.is_frame_recoverable() {
            return;
        }
        tracing::error!(error = %err, "unrecoverable render error");
        self.begin_shutdown(ShutdownReason::RenderError(err.to_string()));
    }

    fn forward_batch<B: Browser + ?Sized>(&mut self, browser: &mut B, events: Vec<HostEvent>) {
        for event in events {
            if is_quit(&event) {
                self.begin_shutdown(ShutdownReason::Quit);
                return;
            }
            if let HostEvent::Resized { width, height } = event {
                tracing::debug!(width, height, "window resized; viewport stays fixed");
            }
            match translate(&event, &self.viewport) {
                Some(ev) => {
                    forward_input(browser, ev);
                    self.stats.events_forwarded += 1;
                }
                None => self.stats.events_ignored += 1,
            }
        }
    }

    fn present<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        if let Some(texture) = self.cache.current()
            && let Err(err) = renderer.copy_texture(texture, self.viewport.rect())
        {
            tracing::warn!(error = %err, "texture copy failed");
        }
        renderer.present();
        self.stats.presents += 1;
    }
}

/// [`ClientHandler`] that feeds engine paints into a [`BridgeContext`].
pub struct PaintHandler<'a, R: Renderer + ?Sized> {
    pub ctx: &'a mut BridgeContext,
    pub renderer: &'a mut R,
}

impl<R: Renderer + ?Sized> ClientHandler for PaintHandler<'_, R> {
    fn view_rect(&self) -> Rect {
        let size = self.ctx.viewport.size();
        Rect::new(0, 0, size.width, size.height)
    }

    fn on_paint(&mut self, kind: PaintElementKind, buffer: &PaintBuffer, width: u32, height: u32) {
        self.ctx
            .handle_paint(&mut *self.renderer, kind, buffer, width, height);
    }

    fn on_loading_state_change(&mut self, is_loading: bool) {
        if !is_loading {
            tracing::info!("loading complete");
        }
    }

    fn on_load_error(&mut self, is_main_frame: bool, code: i32, failed_url: &str) {
        if !is_main_frame {
            tracing::debug!(code, failed_url, "sub-frame load error ignored");
            return;
        }
        tracing::error!(code, failed_url, "failed to load");
        self.ctx.begin_shutdown(ShutdownReason::LoadError {
            code,
            url: failed_url.to_string(),
        });
    }
}

/// Drive the loop until quit, a main-frame load error or the iteration limit, then shut down.
///
/// Shutdown order: release the current texture, shut the engine down, close the renderer.
#[tracing::instrument(skip_all, fields(viewport = ?ctx.viewport.rect()))]
pub fn run<E, R, S>(
    ctx: &mut BridgeContext,
    engine: &mut E,
    browser: &mut E::Browser,
    renderer: &mut R,
    events: &mut S,
    opts: &LoopOptions,
) -> RunOutcome
where
    E: BrowserEngine,
    R: Renderer + ?Sized,
    S: EventSource + ?Sized,
{
    // Paints only start once the browser knows its view rect.
    browser.send_focus_event(true);
    browser.notify_resized();

    while ctx.state == LoopState::Running {
        if let Some(max) = opts.max_iterations
            && ctx.stats.iterations >= max
        {
            ctx.begin_shutdown(ShutdownReason::IterationLimit);
            break;
        }
        ctx.stats.iterations += 1;

        let batch = events.poll_events();
        ctx.forward_batch(browser, batch);
        if ctx.state != LoopState::Running {
            break;
        }

        renderer.clear(ctx.background);
        engine.do_message_loop_work(
            browser,
            &mut PaintHandler {
                ctx: &mut *ctx,
                renderer: &mut *renderer,
            },
        );
        if ctx.state != LoopState::Running {
            break;
        }

        ctx.present(renderer);
    }

    shutdown(ctx, engine, renderer)
}

fn shutdown<E, R>(ctx: &mut BridgeContext, engine: &mut E, renderer: &mut R) -> RunOutcome
where
    E: BrowserEngine,
    R: Renderer + ?Sized,
{
    // A loop that ended without an explicit reason still has to pass through ShuttingDown.
    ctx.begin_shutdown(ShutdownReason::Quit);

    ctx.cache.release(renderer);
    engine.shutdown();
    renderer.close();
    ctx.state = LoopState::Stopped;

    let reason = ctx.reason.clone().unwrap_or(ShutdownReason::Quit);
    tracing::info!(?reason, iterations = ctx.stats.iterations, "stopped");
    RunOutcome {
        reason,
        stats: ctx.stats,
    }
}

/// Initialize the engine, open an offscreen browser sized to the viewport and run the loop.
pub fn launch<E, R, S>(
    config: &BridgeConfig,
    engine: &mut E,
    renderer: &mut R,
    events: &mut S,
) -> BridgeResult<RunOutcome>
where
    E: BrowserEngine,
    R: Renderer + ?Sized,
    S: EventSource + ?Sized,
{
    config.validate()?;
    let mut ctx = BridgeContext::from_config(config)?;

    tracing::info!(title = %config.title, url = %config.url, "launching offscreen browser");
    if let Err(err) = engine.initialize(&config.engine_settings()) {
        renderer.close();
        return Err(err);
    }
    let mut browser = match engine.create_offscreen_browser(ctx.viewport.size(), &config.url) {
        Ok(b) => b,
        Err(err) => {
            engine.shutdown();
            renderer.close();
            return Err(err);
        }
    };

    Ok(run(
        &mut ctx,
        engine,
        &mut browser,
        renderer,
        events,
        &config.loop_options(),
    ))
}
