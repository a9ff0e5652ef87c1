use std::sync::Arc;

use tracing::debug;
use winit::dpi::PhysicalPosition;
use winit::window::{Window, WindowLevel};

/// OS services the drag logic and render loop need from a window.
///
/// The loop and [`DragController`] only see this trait, so a platform backend
/// can be swapped without touching either.
pub trait WindowHost {
    /// Top-left corner of the window in screen coordinates.
    fn outer_position(&self) -> (i32, i32);
    fn outer_size(&self) -> (u32, u32);
    fn move_to(&self, x: i32, y: i32);
    fn set_topmost(&self, topmost: bool);
    /// DPI scale relative to the 96-DPI baseline.
    fn scale_factor(&self) -> f64;
}

pub(crate) struct WinitHost {
    window: Arc<Window>,
}

impl WinitHost {
    pub(crate) fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl WindowHost for WinitHost {
    fn outer_position(&self) -> (i32, i32) {
        self.window
            .outer_position()
            .map(|pos| (pos.x, pos.y))
            .unwrap_or((0, 0))
    }

    fn outer_size(&self) -> (u32, u32) {
        let size = self.window.outer_size();
        (size.width, size.height)
    }

    fn move_to(&self, x: i32, y: i32) {
        self.window.set_outer_position(PhysicalPosition::new(x, y));
    }

    fn set_topmost(&self, topmost: bool) {
        let level = if topmost {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        self.window.set_window_level(level);
    }

    fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }
}

/// Manual drag-to-move for a window with no title bar.
///
/// Polled once per frame with the raw button state and global cursor rather
/// than driven by windowing events: a frameless window can lose focus
/// mid-drag, and polling keeps the drag alive as long as the button is
/// physically held.
#[derive(Debug, Default)]
pub struct DragController {
    drag: Option<DragOrigin>,
}

#[derive(Debug, Clone, Copy)]
struct DragOrigin {
    cursor: (f64, f64),
    window: (i32, i32),
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Advances the drag state machine for this frame.
    ///
    /// A drag begins when the button is held with the cursor over the window;
    /// while it stays held the window origin is recomputed from the cursor's
    /// delta against the drag start. Releasing the button ends the drag.
    pub fn service(&mut self, host: &dyn WindowHost, button_held: bool, cursor: Option<(f64, f64)>) {
        if !button_held {
            self.drag = None;
            return;
        }
        let Some(cursor) = cursor else {
            return;
        };

        match self.drag {
            Some(origin) => {
                let dx = cursor.0 - origin.cursor.0;
                let dy = cursor.1 - origin.cursor.1;
                host.move_to(
                    origin.window.0 + dx.round() as i32,
                    origin.window.1 + dy.round() as i32,
                );
            }
            None => {
                if cursor_over_window(host, cursor) {
                    self.drag = Some(DragOrigin {
                        cursor,
                        window: host.outer_position(),
                    });
                }
            }
        }
    }
}

/// Compares the global cursor position against the window's screen rect.
pub fn cursor_over_window(host: &dyn WindowHost, cursor: (f64, f64)) -> bool {
    let (left, top) = host.outer_position();
    let (width, height) = host.outer_size();
    let (right, bottom) = (left + width as i32, top + height as i32);
    cursor.0 >= left as f64
        && cursor.0 < right as f64
        && cursor.1 >= top as f64
        && cursor.1 < bottom as f64
}

/// Scopes the OS "keep display awake" assertion to the render loop.
///
/// Acquired when the loop starts and released on drop, so the request never
/// outlives rendering. On Windows this drives `SetThreadExecutionState`;
/// elsewhere the transition is only logged.
pub(crate) struct KeepAwakeGuard;

impl KeepAwakeGuard {
    pub(crate) fn acquire() -> Self {
        set_execution_state(true);
        Self
    }
}

impl Drop for KeepAwakeGuard {
    fn drop(&mut self) {
        set_execution_state(false);
    }
}

#[cfg(windows)]
fn set_execution_state(active: bool) {
    use tracing::warn;
    use windows::Win32::System::Power::{
        SetThreadExecutionState, ES_CONTINUOUS, ES_DISPLAY_REQUIRED, ES_SYSTEM_REQUIRED,
    };

    let state = if active {
        ES_CONTINUOUS | ES_SYSTEM_REQUIRED | ES_DISPLAY_REQUIRED
    } else {
        ES_CONTINUOUS
    };
    // Returns the previous state; zero means the request was rejected.
    let previous = unsafe { SetThreadExecutionState(state) };
    if previous.0 == 0 {
        warn!("keep-awake execution state request rejected");
    } else {
        debug!(active, "keep-awake execution state updated");
    }
}

#[cfg(not(windows))]
fn set_execution_state(active: bool) {
    debug!(active, "keep-awake assertion has no backend on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct MockHost {
        position: Cell<(i32, i32)>,
        size: (u32, u32),
    }

    impl MockHost {
        fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
            Self {
                position: Cell::new((x, y)),
                size: (width, height),
            }
        }
    }

    impl WindowHost for MockHost {
        fn outer_position(&self) -> (i32, i32) {
            self.position.get()
        }

        fn outer_size(&self) -> (u32, u32) {
            self.size
        }

        fn move_to(&self, x: i32, y: i32) {
            self.position.set((x, y));
        }

        fn set_topmost(&self, _topmost: bool) {}

        fn scale_factor(&self) -> f64 {
            1.0
        }
    }

    #[test]
    fn drag_moves_window_by_cursor_delta() {
        let host = MockHost::new(100, 100, 640, 640);
        let mut drag = DragController::new();

        drag.service(&host, true, Some((150.0, 150.0)));
        assert!(drag.is_dragging());
        drag.service(&host, true, Some((200.0, 130.0)));
        assert_eq!(host.outer_position(), (150, 80));
    }

    #[test]
    fn drag_recomputes_from_start_every_frame() {
        let host = MockHost::new(0, 0, 100, 100);
        let mut drag = DragController::new();

        drag.service(&host, true, Some((50.0, 50.0)));
        drag.service(&host, true, Some((60.0, 50.0)));
        assert_eq!(host.outer_position(), (10, 0));
        drag.service(&host, true, Some((55.0, 45.0)));
        assert_eq!(host.outer_position(), (5, -5));
    }

    #[test]
    fn no_drag_begins_outside_the_window() {
        let host = MockHost::new(100, 100, 200, 200);
        let mut drag = DragController::new();

        drag.service(&host, true, Some((50.0, 50.0)));
        assert!(!drag.is_dragging());
        assert_eq!(host.outer_position(), (100, 100));
    }

    #[test]
    fn drag_survives_cursor_leaving_the_window() {
        let host = MockHost::new(0, 0, 100, 100);
        let mut drag = DragController::new();

        drag.service(&host, true, Some((50.0, 50.0)));
        // Cursor now far outside the original rect, button still held.
        drag.service(&host, true, Some((500.0, 50.0)));
        assert!(drag.is_dragging());
        assert_eq!(host.outer_position(), (450, 0));
    }

    #[test]
    fn release_ends_the_drag() {
        let host = MockHost::new(0, 0, 100, 100);
        let mut drag = DragController::new();

        drag.service(&host, true, Some((50.0, 50.0)));
        drag.service(&host, false, Some((80.0, 50.0)));
        assert!(!drag.is_dragging());
        assert_eq!(host.outer_position(), (0, 0));
        // A fresh press outside the window starts nothing.
        drag.service(&host, true, Some((500.0, 500.0)));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn keep_awake_guard_releases_on_drop() {
        let guard = KeepAwakeGuard::acquire();
        drop(guard);
    }

    #[test]
    fn hit_test_uses_half_open_rect() {
        let host = MockHost::new(100, 100, 200, 100);
        assert!(cursor_over_window(&host, (100.0, 100.0)));
        assert!(cursor_over_window(&host, (299.0, 199.0)));
        assert!(!cursor_over_window(&host, (300.0, 150.0)));
        assert!(!cursor_over_window(&host, (150.0, 200.0)));
        assert!(!cursor_over_window(&host, (99.0, 150.0)));
    }
}
