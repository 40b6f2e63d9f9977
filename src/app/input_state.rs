use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::ModifiersState;
use crate::renderer::contexts::frame_ctx::PointerState;

#[derive(Default)]
pub struct InputState {
    pub mouse_curr_pos: Vec2,
    pub mouse_left_down: bool,
    pub mouse_inside: bool,
    pub modifiers: ModifiersState,
}

impl InputState {
    pub fn process_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.mouse_left_down = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved {
                position,
                ..
            } => {
                self.mouse_curr_pos = Vec2::new(position.x as f32, position.y as f32);
                self.mouse_inside = true;
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse_inside = false;
            }
            WindowEvent::CursorEntered { .. } => {
                self.mouse_inside = true;
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::Focused(false) => {
                // Releases are not delivered to unfocused windows
                self.mouse_left_down = false;
                self.modifiers = ModifiersState::empty();
            }
            _ => {}
        }
    }

    /// Pointer as seen by the sample: pressed only while the left button is
    /// held over the window
    pub fn pointer(&self) -> PointerState {
        PointerState {
            pressed: self.mouse_left_down && self.mouse_inside,
            position: self.mouse_curr_pos,
        }
    }
}
