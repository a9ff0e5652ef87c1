//! Live-preview host for a single GLSL fragment shader.
//!
//! Opens a borderless always-on-top window, renders the shader over the full
//! surface every frame, and recompiles it whenever the source file changes on
//! disk. Alongside the image the host maintains ShaderToy-style standard
//! uniforms, a GPU-timed render-duration overlay, and drag-to-move window
//! handling for the frameless surface.

mod compile;
mod error;
mod gpu;
mod metrics;
mod overlay;
mod timing;
mod types;
mod watcher;
mod window;

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{WindowBuilder, WindowLevel};

pub use error::{CompileError, WatcherError};
pub use metrics::RenderMetrics;
pub use timing::TimingModel;
pub use types::{ControlAction, RendererConfig, UniformRegistry, UniformValue};
pub use watcher::HotReloadWatcher;
pub use window::{cursor_over_window, DragController, WindowHost};

use gpu::GpuState;
use window::{KeepAwakeGuard, WinitHost};

/// Pointer state assembled from window and device events.
///
/// `local` feeds `iMouse` and is only updated while the cursor is over the
/// window. `global` drives the drag: it is re-anchored from every
/// `CursorMoved` and advanced by raw motion deltas while the button is held,
/// so a drag keeps tracking after the cursor leaves the window rect.
///
/// Button state is held as one flag per button so window events and raw
/// device events can both feed it idempotently. Presses arrive as window
/// events; releases are additionally taken from device events, which keep
/// flowing when another window steals focus mid-drag and the release is
/// never delivered to ours.
#[derive(Default)]
struct PointerState {
    local: Option<(f64, f64)>,
    global: Option<(f64, f64)>,
    left_held: bool,
    right_held: bool,
    middle_held: bool,
}

impl PointerState {
    fn button(&mut self, button: MouseButton, state: ElementState) {
        let held = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.left_held = held,
            MouseButton::Right => self.right_held = held,
            MouseButton::Middle => self.middle_held = held,
            _ => {}
        }
    }

    /// Raw device button transition. Backends disagree on button numbering,
    /// so only releases of the common primary-button ids are honored; they
    /// exist to end a drag whose release event the window never received.
    fn device_button(&mut self, button: u32, state: ElementState) {
        if state == ElementState::Released && matches!(button, 0 | 1) {
            self.left_held = false;
        }
    }

    fn motion_delta(&mut self, delta: (f64, f64)) {
        if self.left_held {
            if let Some(global) = &mut self.global {
                global.0 += delta.0;
                global.1 += delta.1;
            }
        }
    }

    fn pressed_count(&self) -> u32 {
        self.left_held as u32 + self.right_held as u32 + self.middle_held as u32
    }

    /// `iMouse` value: window-local position with the y axis flipped to a
    /// bottom-left origin, plus the held-button count.
    fn mouse_uniform(&self, surface_height: u32) -> [f32; 4] {
        let (x, y) = self.local.unwrap_or((0.0, 0.0));
        [
            x as f32,
            surface_height as f32 - y as f32,
            self.pressed_count() as f32,
            0.0,
        ]
    }
}

fn control_action(code: KeyCode) -> Option<ControlAction> {
    match code {
        KeyCode::Escape | KeyCode::KeyQ => Some(ControlAction::Quit),
        KeyCode::Space => Some(ControlAction::TogglePause),
        KeyCode::KeyT => Some(ControlAction::ToggleAlwaysOnTop),
        KeyCode::KeyO => Some(ControlAction::ToggleOverlay),
        KeyCode::KeyR => Some(ControlAction::ResetAnimation),
        _ => None,
    }
}

/// Runs the preview window until the user quits.
///
/// `registry` declares every custom uniform the shader may reference; the
/// set is fixed for the lifetime of the run. Blocks the calling thread.
pub fn run(config: RendererConfig, registry: UniformRegistry) -> Result<()> {
    let shader_body = fs::read_to_string(&config.shader_source).with_context(|| {
        format!(
            "failed to read shader source {}",
            config.shader_source.display()
        )
    })?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let (width, height) = config.surface_size;
    let level = if config.always_on_top {
        WindowLevel::AlwaysOnTop
    } else {
        WindowLevel::Normal
    };
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("shaderpeek")
            .with_inner_size(PhysicalSize::new(width, height))
            .with_decorations(false)
            .with_transparent(true)
            .with_resizable(false)
            .with_window_level(level)
            .build(&event_loop)
            .context("failed to create preview window")?,
    );
    let host = WinitHost::new(window.clone());
    debug!(scale = host.scale_factor(), "preview window created");

    let mut gpu = GpuState::new(
        window.as_ref(),
        window.inner_size(),
        &shader_body,
        &registry,
    )?;

    let watcher =
        HotReloadWatcher::spawn(&config.shader_source).context("failed to start hot reload")?;

    let mut drag = DragController::new();
    let mut pointer = PointerState::default();
    let mut timing = TimingModel::new(Instant::now());
    let mut metrics = RenderMetrics::new();
    let mut always_on_top = config.always_on_top;
    let mut overlay_enabled = config.overlay_enabled;
    let _keep_awake = KeepAwakeGuard::acquire();

    info!(
        shader = %config.shader_source.display(),
        width,
        height,
        "starting preview loop"
    );

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => target.exit(),
                WindowEvent::Resized(new_size) => gpu.resize(new_size),
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    debug!(scale = scale_factor, "display scale changed");
                }
                WindowEvent::CursorMoved { position, .. } => {
                    pointer.local = Some((position.x, position.y));
                    let (wx, wy) = host.outer_position();
                    pointer.global = Some((wx as f64 + position.x, wy as f64 + position.y));
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    pointer.button(button, state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed || event.repeat {
                        return;
                    }
                    let PhysicalKey::Code(code) = event.physical_key else {
                        return;
                    };
                    let Some(action) = control_action(code) else {
                        return;
                    };
                    match action {
                        ControlAction::Quit => target.exit(),
                        ControlAction::TogglePause => {
                            timing.toggle_pause(Instant::now());
                            debug!(paused = timing.is_paused(), "pause toggled");
                        }
                        ControlAction::ToggleAlwaysOnTop => {
                            always_on_top = !always_on_top;
                            host.set_topmost(always_on_top);
                            debug!(always_on_top, "z-order toggled");
                        }
                        ControlAction::ToggleOverlay => {
                            overlay_enabled = !overlay_enabled;
                        }
                        ControlAction::ResetAnimation => {
                            timing.reset_animation(Instant::now());
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    drag.service(&host, pointer.left_held, pointer.global);

                    if watcher.take_reload_request() {
                        reload_shader(&mut gpu, &config, &registry);
                    }

                    let now = Instant::now();
                    let size = gpu.size();
                    gpu.set_frame_state(
                        timing.shader_time(now) as f32,
                        timing.animation_time(now) as f32,
                        timing.frame() as i32,
                        pointer.mouse_uniform(size.height),
                    );

                    let overlay_text = overlay_enabled.then(|| metrics.readout());
                    match gpu.render(&registry, overlay_text.as_deref()) {
                        Ok(elapsed) => {
                            if let Some(raw_ns) = elapsed {
                                metrics.record(raw_ns);
                            }
                            timing.advance_frame();
                        }
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            gpu.reconfigure();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory, shutting down");
                            target.exit();
                        }
                        Err(err) => warn!(error = %err, "frame skipped"),
                    }
                }
                _ => {}
            },
            Event::DeviceEvent { event, .. } => match event {
                DeviceEvent::MouseMotion { delta } => pointer.motion_delta(delta),
                DeviceEvent::Button { button, state } => pointer.device_button(button, state),
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            _ => {}
        })
        .context("event loop terminated abnormally")?;

    Ok(())
}

fn reload_shader(gpu: &mut GpuState, config: &RendererConfig, registry: &UniformRegistry) {
    let started = Instant::now();
    let body = match fs::read_to_string(&config.shader_source) {
        Ok(body) => body,
        Err(err) => {
            warn!(
                path = %config.shader_source.display(),
                error = %err,
                "shader file unreadable, keeping previous program"
            );
            return;
        }
    };
    match gpu.swap_shader(&body, registry) {
        Ok(()) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            info!(elapsed_ms = format_args!("{elapsed_ms:.1}"), "shader reloaded");
        }
        Err(err) => {
            warn!(error = %err, "reload rejected, keeping previous program");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(control_action(KeyCode::Escape), Some(ControlAction::Quit));
        assert_eq!(control_action(KeyCode::KeyQ), Some(ControlAction::Quit));
        assert_eq!(
            control_action(KeyCode::Space),
            Some(ControlAction::TogglePause)
        );
        assert_eq!(
            control_action(KeyCode::KeyT),
            Some(ControlAction::ToggleAlwaysOnTop)
        );
        assert_eq!(
            control_action(KeyCode::KeyO),
            Some(ControlAction::ToggleOverlay)
        );
        assert_eq!(
            control_action(KeyCode::KeyR),
            Some(ControlAction::ResetAnimation)
        );
        assert_eq!(control_action(KeyCode::KeyZ), None);
    }

    #[test]
    fn mouse_uniform_flips_y_and_counts_buttons() {
        let mut pointer = PointerState::default();
        pointer.local = Some((120.0, 40.0));
        pointer.button(MouseButton::Left, ElementState::Pressed);
        pointer.button(MouseButton::Right, ElementState::Pressed);

        let mouse = pointer.mouse_uniform(640);
        assert_eq!(mouse, [120.0, 600.0, 2.0, 0.0]);

        pointer.button(MouseButton::Left, ElementState::Released);
        assert_eq!(pointer.mouse_uniform(640)[2], 1.0);
    }

    #[test]
    fn mouse_uniform_defaults_before_first_move() {
        let pointer = PointerState::default();
        assert_eq!(pointer.mouse_uniform(480), [0.0, 480.0, 0.0, 0.0]);
    }

    #[test]
    fn device_release_ends_a_hold_the_window_never_saw() {
        let mut pointer = PointerState::default();
        pointer.button(MouseButton::Left, ElementState::Pressed);
        assert!(pointer.left_held);

        // Focus stolen mid-drag: the window gets no release event, the raw
        // device stream still does.
        pointer.device_button(1, ElementState::Released);
        assert!(!pointer.left_held);
        assert_eq!(pointer.pressed_count(), 0);
    }

    #[test]
    fn device_presses_do_not_start_a_hold() {
        let mut pointer = PointerState::default();
        pointer.device_button(0, ElementState::Pressed);
        assert!(!pointer.left_held);

        // Releases of other device buttons leave the primary hold alone.
        pointer.button(MouseButton::Left, ElementState::Pressed);
        pointer.device_button(4, ElementState::Released);
        assert!(pointer.left_held);
    }

    #[test]
    fn motion_deltas_only_apply_while_held() {
        let mut pointer = PointerState::default();
        pointer.global = Some((100.0, 100.0));
        pointer.motion_delta((5.0, -5.0));
        assert_eq!(pointer.global, Some((100.0, 100.0)));

        pointer.button(MouseButton::Left, ElementState::Pressed);
        pointer.motion_delta((5.0, -5.0));
        assert_eq!(pointer.global, Some((105.0, 95.0)));
    }
}
