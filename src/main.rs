mod app;
mod gesture;
mod grid;
mod media;
mod metadata;
mod settings;
mod span_zoom;
mod thumbnail;
mod touch_area;
mod viewer;

fn main() -> iced::Result {
    env_logger::init();
    app::run()
}
