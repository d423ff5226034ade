mod audio;
mod renderer;
mod utils;

use audio::{SourcePipe, SpectrumAnalyzer};
use nannou::prelude::*;
use renderer::{Renderer, Resolution};
use std::env;

fn main() {
    // List all devices at startup
    SourcePipe::list_devices();

    nannou::app(model).update(update).run();
}

struct Model {
    source: SourcePipe,
    analyzer: SpectrumAnalyzer,
    renderer: Renderer,
}

fn model(app: &App) -> Model {
    let args: Vec<String> = env::args().collect();
    let windowed = args.contains(&"--windowed".to_string()) || args.contains(&"-w".to_string());
    let resolution = Resolution::current(windowed);

    let mut win = app
        .new_window()
        .view(view)
        .resized(resized)
        .size(resolution.width, resolution.height)
        .min_size(400, 400);

    if resolution.fullscreen {
        win = win.fullscreen();
    }

    win.build().unwrap();

    Model {
        source: SourcePipe::new(),
        analyzer: SpectrumAnalyzer::new(),
        renderer: Renderer::new(),
    }
}

fn update(app: &App, model: &mut Model, _update: Update) {
    let samples = model.source.stream();
    let frame = model.analyzer.analyze(&samples);

    model
        .renderer
        .update(model.source.is_live(), &frame, app.window_rect());
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    model.renderer.draw(&draw, app.window_rect());
    draw.to_frame(app, &frame).unwrap();
}

fn resized(app: &App, model: &mut Model, _size: Vec2) {
    model.renderer.on_resize(app.window_rect());
}
