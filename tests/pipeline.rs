use spincube::render::context::{DataType, Topology};
use spincube::render::recording::Command;
use spincube::render::shaders::{build_program, resolve_attribute, resolve_uniform};
use spincube::render::ShaderStage;
use spincube::utils::diagnostics::CollectedDiagnostics;
use spincube::{
    cube_shaders, AnimationDriver, FrameOutcome, FrameRenderer, Mesh, RecordingContext,
    RenderConfig, RenderError, RendererState, ShaderBindings, ShaderSource, Viewport,
};
use std::time::{Duration, Instant};

const VIEWPORT: Viewport = Viewport {
    width: 640,
    height: 480,
};

fn renderer() -> FrameRenderer<RecordingContext> {
    FrameRenderer::new(&RenderConfig::default())
}

#[test]
fn cube_setup_reaches_ready_and_draws_once_per_tick() {
    let ctx = RecordingContext::new();
    let mut diagnostics = CollectedDiagnostics::default();
    let mut renderer = renderer();

    renderer.setup_cube(&ctx, &mut diagnostics).unwrap();
    assert_eq!(renderer.state(), RendererState::Ready);
    assert!(diagnostics.messages.is_empty());

    ctx.take_commands();
    assert_eq!(renderer.tick(&ctx, VIEWPORT, 0.016), FrameOutcome::Drawn);

    assert_eq!(
        ctx.draw_calls(),
        vec![Command::DrawElements {
            topology: Topology::Triangles,
            count: 36,
            index_type: DataType::UnsignedShort,
            offset: 0,
        }]
    );
}

#[test]
fn broken_fragment_shader_keeps_renderer_uninitialized() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer();

    let err = renderer
        .setup(
            &ctx,
            &cube_shaders::vertex(),
            &ShaderSource::fragment("varying lowp vec4 vColor;\nvoid main() { gl_FragColor = vColor;"),
            &ShaderBindings::default(),
            &Mesh::cube(),
        )
        .unwrap_err();

    assert!(matches!(err, RenderError::Compile { .. }));
    assert_eq!(renderer.state(), RendererState::Uninitialized);

    for _ in 0..3 {
        assert_eq!(renderer.tick(&ctx, VIEWPORT, 0.016), FrameOutcome::Skipped);
    }
    assert!(ctx.draw_calls().is_empty());
    assert_eq!(ctx.live_shaders(), 0);
    assert_eq!(ctx.live_programs(), 0);
    assert_eq!(ctx.live_buffers(), 0);
}

#[test]
fn setup_failure_is_reported_exactly_once() {
    let ctx = RecordingContext::new();
    ctx.fail_allocations(true);
    let mut diagnostics = CollectedDiagnostics::default();
    let mut renderer = renderer();

    assert!(renderer.setup_cube(&ctx, &mut diagnostics).is_err());
    assert_eq!(diagnostics.messages.len(), 1);
    assert!(diagnostics.messages[0].contains("shader"));
}

#[test]
fn declared_names_resolve_and_undeclared_do_not() {
    let ctx = RecordingContext::new();
    let program = build_program(
        &ctx,
        &cube_shaders::vertex(),
        &cube_shaders::fragment(),
        &ShaderBindings::default(),
    )
    .unwrap();

    for name in ["aVertexPosition", "aVertexColor"] {
        assert!(resolve_attribute(&ctx, &program, name).is_found(), "{name}");
    }
    for name in ["uProjectionMatrix", "uModelViewMatrix"] {
        assert!(resolve_uniform(&ctx, &program, name).is_found(), "{name}");
    }
    assert!(!resolve_attribute(&ctx, &program, "position").is_found());
    assert!(!resolve_uniform(&ctx, &program, "projectionMatrix").is_found());
}

#[test]
fn malformed_sources_never_reach_the_linker() {
    let broken = [
        ShaderSource::vertex("attribute vec4 aVertexPosition;\nvoid main() { gl_Position = aVertexPosition;"),
        ShaderSource::vertex("void main() }"),
        ShaderSource::fragment("void main() { gl_FragColor = vec4(1.0); }}"),
        ShaderSource::fragment("precision mediump float;"),
        ShaderSource::fragment("varying lowp vec4 vColor;\nvoid main() {\n    gl_FragColor = vColor\n}"),
    ];

    for source in &broken {
        let ctx = RecordingContext::new();
        let (vertex, fragment) = match source.stage() {
            ShaderStage::Vertex => (source.clone(), cube_shaders::fragment()),
            ShaderStage::Fragment => (cube_shaders::vertex(), source.clone()),
        };

        let err = build_program(&ctx, &vertex, &fragment, &ShaderBindings::default()).unwrap_err();
        assert!(matches!(err, RenderError::Compile { stage, .. } if stage == source.stage()));
        assert!(!ctx
            .commands()
            .iter()
            .any(|c| matches!(c, Command::LinkProgram { .. })));
    }
}

#[test]
fn rotation_grows_by_each_elapsed_interval() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer();
    renderer.setup_cube(&ctx, &mut CollectedDiagnostics::default()).unwrap();
    let rate = renderer.clock().rate();

    let (t1, t2) = (0.25f32, 0.5f32);
    renderer.tick(&ctx, VIEWPORT, t1);
    let first = renderer.rotation();
    renderer.tick(&ctx, VIEWPORT, t2);
    let second = renderer.rotation();

    assert_eq!(first, f64::from(t1 * rate));
    assert!(second > first);
    assert_eq!(second, f64::from((t1 + t2) * rate));
}

#[test]
fn driver_first_frame_does_not_rotate() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer();
    renderer.setup_cube(&ctx, &mut CollectedDiagnostics::default()).unwrap();
    let mut driver = AnimationDriver::new();

    // a host clock that has been running for a long time
    let start = Instant::now() + Duration::from_secs(10_000);
    driver.frame(start, &mut renderer, &ctx, VIEWPORT);
    assert_eq!(renderer.rotation(), 0.0);

    driver.frame(start + Duration::from_millis(250), &mut renderer, &ctx, VIEWPORT);
    driver.frame(start + Duration::from_millis(750), &mut renderer, &ctx, VIEWPORT);
    assert_eq!(renderer.rotation(), 0.75);
    assert_eq!(driver.frame_index(), 3);
    assert_eq!(ctx.draw_calls().len(), 3);
}

#[test]
fn every_frame_rebinds_the_full_pipeline() {
    let ctx = RecordingContext::new();
    let mut renderer = renderer();
    renderer.setup_cube(&ctx, &mut CollectedDiagnostics::default()).unwrap();
    ctx.take_commands();

    renderer.tick(&ctx, VIEWPORT, 0.0);
    let first = ctx.take_commands();
    renderer.tick(&ctx, VIEWPORT, 0.0);
    let second = ctx.take_commands();

    // same angle and viewport, so the command streams are identical
    assert_eq!(first, second);
    assert_eq!(first.len(), 15);
}
