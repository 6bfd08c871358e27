use eframe::egui;

use crate::viewer::{PointerButton, PointerEvent};

/// Scroll distance egui reports for one wheel notch.
const POINTS_PER_NOTCH: f32 = 50.0;

fn button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        _ => None,
    }
}

/// Wheel notches from a vertical scroll delta. Scrolling down moves forward.
pub(super) fn wheel_steps(delta_y: f32) -> f32 {
    -delta_y / POINTS_PER_NOTCH
}

/// Translates this frame's canvas interaction into viewer pointer events in canvas
/// coordinates (origin at the canvas's top-left corner).
pub(super) fn pointer_events(ui: &egui::Ui, response: &egui::Response) -> Vec<PointerEvent> {
    let mut events = Vec::new();
    let origin = response.rect.min;
    let local = |pos: egui::Pos2| (pos.x - origin.x, pos.y - origin.y);

    if let Some((x, y)) = response.interact_pointer_pos().map(local) {
        for egui_button in [egui::PointerButton::Primary, egui::PointerButton::Secondary] {
            let Some(button) = button(egui_button) else {
                continue;
            };
            if response.drag_started_by(egui_button) {
                events.push(PointerEvent::Press { button, x, y });
            } else if response.drag_stopped_by(egui_button) {
                events.push(PointerEvent::Release { button, x, y });
            } else if response.dragged_by(egui_button) {
                events.push(PointerEvent::Drag { button, x, y });
            }
        }
    }

    if response.hovered() {
        let (delta, ctrl) = ui.input(|input| (input.raw_scroll_delta.y, input.modifiers.ctrl));
        if delta != 0.0 {
            events.push(PointerEvent::Wheel {
                steps: wheel_steps(delta),
                ctrl,
            });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::wheel_steps;

    #[test]
    fn scrolling_down_steps_forward() {
        assert_eq!(wheel_steps(-50.0), 1.0);
        assert_eq!(wheel_steps(100.0), -2.0);
    }
}
