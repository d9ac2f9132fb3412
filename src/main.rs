mod app;
mod render;
mod scene;

fn main() {
    env_logger::init();

    let state = app::state::ViewState::default();
    let renderer = render::Renderer::new();

    app::windowing::Windowing::run_app(state, renderer).expect("windowing failed");
}
