//! Rendering pipeline and frame scheduling.

pub mod tornado;

use nannou::prelude::*;

use crate::audio::SpectrumFrame;

pub use tornado::Tornado;

/// Trait that all visualizations must implement
pub trait Visualization {
    /// Update the visualization state from one spectrum frame
    fn update(&mut self, frame: &SpectrumFrame, bounds: Rect);

    /// Draw the visualization
    fn draw(&self, draw: &Draw, bounds: Rect);

    /// React to a surface resize
    fn on_resize(&mut self, bounds: Rect);
}

/// Resolution settings for the window
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Resolution {
    pub fn current(windowed: bool) -> Self {
        if cfg!(debug_assertions) {
            Self {
                width: 400,
                height: 300,
                fullscreen: false,
            }
        } else {
            Self {
                width: 1280,
                height: 720,
                fullscreen: !windowed,
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Phase {
    /// No audio yet; nothing to animate
    Idle,
    /// One iteration per display refresh, until the process exits
    Running,
}

/// Drives the visualization, one iteration per display refresh.
///
/// Starts Idle and switches to Running the first frame the audio stream is
/// live. There is deliberately no transition back: once running, the loop
/// keeps animating through silence until the hosting window is torn down.
pub struct Renderer {
    viz: Box<dyn Visualization>,
    phase: Phase,
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_viz(Box::new(Tornado::new()))
    }

    fn with_viz(viz: Box<dyn Visualization>) -> Self {
        Self {
            viz,
            phase: Phase::Idle,
        }
    }

    /// One update step. `audio_live` is the activation trigger: the first
    /// live frame spawns the particle batch and starts the loop.
    pub fn update(&mut self, audio_live: bool, frame: &SpectrumFrame, bounds: Rect) {
        if self.phase == Phase::Idle {
            if !audio_live {
                return;
            }
            self.viz.on_resize(bounds);
            self.phase = Phase::Running;
            println!("Audio stream live, visualization started");
        }

        self.viz.update(frame, bounds);
    }

    pub fn draw(&self, draw: &Draw, bounds: Rect) {
        match self.phase {
            Phase::Idle => {
                draw.background().color(BLACK);
            }
            Phase::Running => self.viz.draw(draw, bounds),
        }
    }

    /// Resize discards and respawns the particle batch. Before activation
    /// there is nothing to respawn.
    pub fn on_resize(&mut self, bounds: Rect) {
        if self.phase == Phase::Running {
            self.viz.on_resize(bounds);
        }
    }

    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SpectrumFrame;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Records which trait calls the scheduler makes.
    struct Probe {
        updates: Rc<Cell<u32>>,
        resizes: Rc<Cell<u32>>,
    }

    impl Visualization for Probe {
        fn update(&mut self, _frame: &SpectrumFrame, _bounds: Rect) {
            self.updates.set(self.updates.get() + 1);
        }

        fn draw(&self, _draw: &Draw, _bounds: Rect) {}

        fn on_resize(&mut self, _bounds: Rect) {
            self.resizes.set(self.resizes.get() + 1);
        }
    }

    fn probe_renderer() -> (Renderer, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let updates = Rc::new(Cell::new(0));
        let resizes = Rc::new(Cell::new(0));
        let renderer = Renderer::with_viz(Box::new(Probe {
            updates: Rc::clone(&updates),
            resizes: Rc::clone(&resizes),
        }));
        (renderer, updates, resizes)
    }

    fn silent_frame() -> SpectrumFrame {
        SpectrumFrame::new(vec![0; 128])
    }

    #[test]
    fn stays_idle_until_audio_is_live() {
        let (mut renderer, updates, resizes) = probe_renderer();
        let bounds = Rect::from_w_h(800.0, 600.0);

        for _ in 0..5 {
            renderer.update(false, &silent_frame(), bounds);
        }

        assert!(!renderer.is_running());
        assert_eq!(updates.get(), 0);
        assert_eq!(resizes.get(), 0);
    }

    #[test]
    fn activation_spawns_once_then_runs_forever() {
        let (mut renderer, updates, resizes) = probe_renderer();
        let bounds = Rect::from_w_h(800.0, 600.0);

        renderer.update(true, &silent_frame(), bounds);
        assert!(renderer.is_running());
        assert_eq!(resizes.get(), 1);
        assert_eq!(updates.get(), 1);

        // A dead stream later does not stop the loop.
        renderer.update(false, &silent_frame(), bounds);
        renderer.update(true, &silent_frame(), bounds);
        assert!(renderer.is_running());
        assert_eq!(updates.get(), 3);
        assert_eq!(resizes.get(), 1);
    }

    #[test]
    fn resize_respawns_only_while_running() {
        let (mut renderer, _updates, resizes) = probe_renderer();
        let bounds = Rect::from_w_h(800.0, 600.0);

        renderer.on_resize(bounds);
        assert_eq!(resizes.get(), 0);

        renderer.update(true, &silent_frame(), bounds);
        renderer.on_resize(bounds);
        renderer.on_resize(bounds);
        assert_eq!(resizes.get(), 3);
    }
}
