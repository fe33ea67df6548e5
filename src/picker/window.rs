//! The picker window and its event loop.
//!
//! Input is polled once per frame and each event is handled to completion
//! before the next, so the session is only ever mutated from this loop.

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use tracing::{debug, info};

use crate::error::{CardError, Result};
use crate::picker::state::{PickerSession, Transition};
use crate::picker::view::{Canvas, STATUS_HEIGHT, Viewport};

const MAX_VIEW_WIDTH: usize = 1280;
const MAX_VIEW_HEIGHT: usize = 900;
/// Pixels scrolled per wheel notch.
const SCROLL_STEP: f64 = 40.0;

#[derive(Default)]
struct Buttons {
    left: bool,
    right: bool,
    middle: Option<(f32, f32)>,
}

/// Runs until the operator presses Esc or closes the window.
/// `on_complete` is called each time the last field gets a position.
pub fn run<F>(session: &mut PickerSession, canvas: &mut Canvas, mut on_complete: F) -> Result<()>
where
    F: FnMut(&PickerSession) -> Result<()>,
{
    let view_w = canvas.width().clamp(1, MAX_VIEW_WIDTH);
    let view_h = canvas.height().clamp(1, MAX_VIEW_HEIGHT);
    let mut window = Window::new(
        &session.title(),
        view_w,
        view_h + STATUS_HEIGHT,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )
    .map_err(|err| CardError::Window(err.to_string()))?;
    window.set_target_fps(60);

    let mut viewport = Viewport {
        x: 0.0,
        y: 0.0,
        width: view_w,
        height: view_h,
    };
    let mut buttons = Buttons::default();
    let mut buffer = Vec::new();
    canvas.redraw(session);

    while window.is_open() {
        if window.is_key_pressed(Key::Escape, KeyRepeat::No) {
            info!("picker closed by operator");
            break;
        }

        let (win_w, win_h) = window.get_size();
        viewport.width = win_w.max(1);
        viewport.height = win_h.saturating_sub(STATUS_HEIGHT).max(1);
        viewport.clamp(canvas.width(), canvas.height());

        let cursor = window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(mx, my)| (mx as f64, my as f64))
            .filter(|&(_, my)| my < viewport.height as f64);

        let left = window.get_mouse_down(MouseButton::Left);
        if left && !buttons.left {
            if let Some((mx, my)) = cursor {
                let (cx, cy) = viewport.to_canvas(mx, my);
                if let Transition::Recorded {
                    field,
                    position,
                    completed,
                } = session.pick(cx, cy)
                {
                    debug!(field = %field, x = position.x, y = position.y, "position recorded");
                    canvas.add_marker(&field, cx as i64, cy as i64);
                    if completed {
                        info!("all fields picked");
                        on_complete(session)?;
                    }
                    window.set_title(&session.title());
                }
            }
        }
        buttons.left = left;

        let right = window.get_mouse_down(MouseButton::Right);
        if right && !buttons.right {
            if let Transition::Undone { field } = session.undo() {
                debug!(field = %field, "position removed");
                canvas.redraw(session);
                window.set_title(&session.title());
            }
        }
        buttons.right = right;

        if let Some((_, wheel)) = window.get_scroll_wheel().filter(|&(_, wheel)| wheel != 0.0) {
            let delta = -(wheel as f64).signum() * SCROLL_STEP;
            if window.is_key_down(Key::LeftShift) || window.is_key_down(Key::RightShift) {
                viewport.scroll_by(delta, 0.0, canvas.width(), canvas.height());
            } else {
                viewport.scroll_by(0.0, delta, canvas.width(), canvas.height());
            }
        }

        let middle = window.get_mouse_down(MouseButton::Middle);
        let raw_mouse = window.get_mouse_pos(MouseMode::Pass);
        buttons.middle = match (middle, buttons.middle, raw_mouse) {
            (true, Some((px, py)), Some((mx, my))) => {
                viewport.scroll_by(
                    (px - mx) as f64,
                    (py - my) as f64,
                    canvas.width(),
                    canvas.height(),
                );
                Some((mx, my))
            }
            (true, None, mouse) => mouse,
            _ => None,
        };

        let readout = cursor
            .map(|(mx, my)| {
                let (cx, cy) = viewport.to_canvas(mx, my);
                session.geometry().readout(cx, cy)
            })
            .unwrap_or_else(|| "x=—, y=—".to_string());
        let hint = session.hint();
        canvas.blit(&viewport, cursor, [&hint, &readout], &mut buffer);
        window
            .update_with_buffer(&buffer, viewport.width, viewport.height + STATUS_HEIGHT)
            .map_err(|err| CardError::Window(err.to_string()))?;
    }
    Ok(())
}
