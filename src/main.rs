use anyhow::{bail, Context, Result};
use glutin::{
    config::{Config, ConfigTemplateBuilder},
    context::{ContextApi, ContextAttributesBuilder, Version},
    display::{GetGlDisplay, GlDisplay},
    prelude::*,
    surface::{Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::{error, info, warn};
use raw_window_handle::HasRawWindowHandle;
use std::{
    ffi::CString,
    num::NonZeroU32,
    path::PathBuf,
    process::ExitCode,
    time::{Duration, Instant},
};
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    window::{Window, WindowBuilder},
};

use spincube::{
    config::AppConfig,
    render::recording::RecordingContext,
    utils::logging::init_logging,
    AnimationDriver, Diagnostics, FrameRenderer, GlowContext, LogDiagnostics, RenderContext,
    RenderError, Viewport,
};

const USAGE: &str = "usage: spincube [--config <path>] [--headless <frames>]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    headless_frames: Option<u32>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--headless" => {
                let frames = iter.next().context("--headless needs a frame count")?;
                args.headless_frames = Some(
                    frames
                        .parse()
                        .with_context(|| format!("invalid frame count '{}'", frames))?,
                );
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("unknown argument '{}'\n{}", other, USAGE),
        }
    }

    Ok(args)
}

struct App {
    window: Window,
    gl_context: glutin::context::PossiblyCurrentContext,
    gl_surface: Surface<WindowSurface>,
    ctx: GlowContext,
    renderer: FrameRenderer<GlowContext>,
    driver: AnimationDriver,
}

impl App {
    fn new(config: &AppConfig, diagnostics: &mut dyn Diagnostics) -> Result<(Self, EventLoop<()>)> {
        let event_loop = EventLoop::new()?;
        let window_builder = WindowBuilder::new()
            .with_title(&config.window.title)
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height));

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_depth_size(24);

        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

        let (window, gl_config) = display_builder
            .build(&event_loop, template, pick_config)
            .map_err(|err| context_unavailable(diagnostics, err.to_string()))?;

        let window = window
            .ok_or_else(|| context_unavailable(diagnostics, "no window was created".into()))?;
        let raw_window_handle = window.raw_window_handle();
        let gl_display = gl_config.display();

        // The cube shaders are GLSL ES 1.00, so ask for a GLES 2 context.
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(Version::new(2, 0))))
            .build(Some(raw_window_handle));

        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .map_err(|err| context_unavailable(diagnostics, err.to_string()))?;

        let surface_attributes = window.build_surface_attributes(Default::default());
        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(|err| context_unavailable(diagnostics, err.to_string()))?;

        let gl_context = not_current
            .make_current(&gl_surface)
            .map_err(|err| context_unavailable(diagnostics, err.to_string()))?;

        if config.window.vsync {
            if let Some(interval) = NonZeroU32::new(1) {
                if let Err(err) =
                    gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(interval))
                {
                    warn!("Failed to enable vsync: {}", err);
                }
            }
        }

        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| {
                CString::new(symbol)
                    .map(|symbol| gl_display.get_proc_address(&symbol))
                    .unwrap_or(std::ptr::null())
            })
        };
        // SAFETY: the context was just made current on this thread and is
        // owned by `App` alongside the wrapper.
        let ctx = unsafe { GlowContext::new(gl) };
        info!("GL context: {}", ctx.describe());

        let size = window.inner_size();
        ctx.viewport(0, 0, size.width as i32, size.height as i32);

        let mut renderer = FrameRenderer::new(&config.render);
        renderer
            .setup_cube(&ctx, diagnostics)
            .context("renderer setup failed")?;

        Ok((
            Self {
                window,
                gl_context,
                gl_surface,
                ctx,
                renderer,
                driver: AnimationDriver::new(),
            },
            event_loop,
        ))
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            self.gl_surface.resize(&self.gl_context, w, h);
        }
        self.ctx.viewport(0, 0, width as i32, height as i32);
    }

    fn redraw(&mut self) {
        let size = self.window.inner_size();
        self.driver.frame(
            Instant::now(),
            &mut self.renderer,
            &self.ctx,
            Viewport::new(size.width, size.height),
        );

        if let Err(err) = self.gl_surface.swap_buffers(&self.gl_context) {
            error!("Failed to present frame: {}", err);
        }
    }

    fn cleanup(&mut self) {
        self.renderer.release(&self.ctx);
        info!("Shut down after {} frames", self.driver.frame_index());
    }
}

fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|accum, config| {
            if config.num_samples() > accum.num_samples() {
                config
            } else {
                accum
            }
        })
        .expect("display offered no GL configs")
}

fn context_unavailable(diagnostics: &mut dyn Diagnostics, reason: String) -> anyhow::Error {
    let err = RenderError::ContextUnavailable(reason);
    diagnostics.report(&err.to_string());
    err.into()
}

fn run_windowed(config: &AppConfig) -> Result<()> {
    let mut diagnostics = LogDiagnostics;
    let (mut app, event_loop) = App::new(config, &mut diagnostics)?;

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                app.cleanup();
                elwt.exit();
            }
            WindowEvent::Resized(size) => app.resize(size.width, size.height),
            WindowEvent::RedrawRequested => app.redraw(),
            _ => (),
        },
        Event::AboutToWait => app.window.request_redraw(),
        _ => (),
    })?;

    Ok(())
}

/// Drives the pipeline against an in-memory context at a simulated 60 Hz.
fn run_headless(config: &AppConfig, frames: u32) -> Result<()> {
    let mut diagnostics = LogDiagnostics;
    let ctx = RecordingContext::new();
    let mut renderer = FrameRenderer::new(&config.render);
    renderer
        .setup_cube(&ctx, &mut diagnostics)
        .context("renderer setup failed")?;

    let viewport = Viewport::new(config.window.width, config.window.height);
    let mut driver = AnimationDriver::new();
    let start = Instant::now();
    let frame_time = Duration::from_micros(16_667);

    for i in 0..frames {
        driver.frame(start + frame_time * i, &mut renderer, &ctx, viewport);
    }

    info!(
        "headless: {} frames, {} draw calls, rotation {:.3} rad",
        driver.frame_index(),
        ctx.draw_calls().len(),
        renderer.rotation()
    );
    renderer.release(&ctx);
    Ok(())
}

fn run() -> Result<()> {
    let args = parse_args()?;
    let config = AppConfig::discover(args.config.as_deref()).context("Failed to load config")?;
    init_logging(&config.logging)?;
    info!("Initializing spincube...");

    match args.headless_frames {
        Some(frames) => run_headless(&config, frames),
        None => run_windowed(&config),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", exit_message(&err));
            ExitCode::FAILURE
        }
    }
}

/// Rendering failures have already gone through the diagnostics sink, so
/// they only get a short notice on exit.
fn exit_message(err: &anyhow::Error) -> String {
    if err.chain().any(|cause| cause.is::<RenderError>()) {
        "spincube: exiting after a rendering failure".to_string()
    } else {
        format!("spincube: {:#}", err)
    }
}
