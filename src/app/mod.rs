mod input_state;

use super::renderer::Renderer;
use color_eyre::eyre::Report;
use color_eyre::Result;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};
use crate::app::input_state::InputState;
use crate::renderer::config::RenderConfig;

const TITLE: &str = "Shader Printf";

pub struct App {
    config: RenderConfig,
    renderer: Option<Renderer>,

    // State
    input_state: InputState,
    frames_rendered: u64,
    last_title: String,
    close_requested: bool,
    error: Option<Report>,
}

impl App {
    pub fn new(config: RenderConfig) -> Result<Self> {
        Ok(Self {
            config,
            renderer: None,

            input_state: InputState::default(),
            frames_rendered: 0,
            last_title: String::new(),
            close_requested: false,
            error: None,
        })
    }

    /// Run until the window closes, the frame limit is hit, or rendering fails
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        // Tear down the GPU side before reporting
        self.renderer = None;
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Report) {
        log::error!("{:?}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match renderer.draw(&self.input_state.pointer()) {
            Ok(true) => self.frames_rendered += 1,
            Ok(false) => {}
            Err(e) => {
                self.fail(event_loop, e.wrap_err("Failed to render frame"));
                return;
            }
        }

        let title = window_title(renderer.printf_enabled(), renderer.last_print().as_deref());
        if title != self.last_title {
            renderer.window().set_title(&title);
            self.last_title = title;
        }

        if self
            .config
            .frames
            .is_some_and(|limit| self.frames_rendered >= limit)
        {
            log::info!("Rendered {} frames, exiting", self.frames_rendered);
            self.close_requested = true;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, Report::new(e).wrap_err("Failed to create window"));
                return;
            }
        };

        match Renderer::new(window, &self.config) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => self.fail(event_loop, e.wrap_err("Failed to initialize renderer")),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent
    ) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if window_id != renderer.window().id() {
            return;
        }

        self.input_state.process_window_events(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                renderer.request_resize();
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            WindowEvent::KeyboardInput {
                event:
                KeyEvent {
                    logical_key: key,
                    state: ElementState::Pressed,
                    ..
                },
                ..
            } => {
                if is_close_shortcut(&key, self.input_state.modifiers.control_key()) {
                    self.close_requested = true;
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.close_requested {
            event_loop.exit();
            return;
        }

        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window().request_redraw();
        }
    }
}

/// Escape, or Ctrl+Q
fn is_close_shortcut(key: &Key, control: bool) -> bool {
    match key.as_ref() {
        Key::Named(NamedKey::Escape) => true,
        Key::Character(c) => control && c.eq_ignore_ascii_case("q"),
        _ => false,
    }
}

fn window_title(printf_enabled: bool, last_print: Option<&str>) -> String {
    match (printf_enabled, last_print) {
        (false, _) => format!("{} (printf unavailable)", TITLE),
        (true, None) => format!("{} - hold the left mouse button over the quad", TITLE),
        (true, Some(print)) => format!("{} - {}", TITLE, print.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_and_ctrl_q_close() {
        assert!(is_close_shortcut(&Key::Named(NamedKey::Escape), false));
        assert!(is_close_shortcut(&Key::Character("q".into()), true));
        assert!(is_close_shortcut(&Key::Character("Q".into()), true));
        assert!(!is_close_shortcut(&Key::Character("q".into()), false));
        assert!(!is_close_shortcut(&Key::Named(NamedKey::Enter), true));
    }

    #[test]
    fn title_shows_latest_print() {
        assert_eq!(
            window_title(true, Some("Fragment: 400, 300 -> color (0.5, 0.5, 0.5)\n")),
            "Shader Printf - Fragment: 400, 300 -> color (0.5, 0.5, 0.5)",
        );
        assert!(window_title(true, None).contains("left mouse button"));
        assert!(window_title(false, Some("ignored")).contains("unavailable"));
    }
}
