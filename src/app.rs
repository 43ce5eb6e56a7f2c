use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use iced::widget::{button, column, container, image, row, rule, scrollable, text, Space};
use iced::{Color, Element, Length, Subscription, Task, Theme};

use crate::gesture::PointerEvent;
use crate::grid::GridModel;
use crate::media::{self, Album};
use crate::metadata::{self, PhotoInfo};
use crate::settings::{keys, Settings};
use crate::span_zoom::{SpanZoomConfig, SpanZoomController};
use crate::thumbnail::{self, Pixels};
use crate::touch_area::TouchArea;
use crate::viewer::ViewerState;

const THUMBNAIL_BATCH_SIZE: usize = 32;
const THUMB_FADE_MS: f32 = 300.0;
const THUMB_RENDER_SIZE: u32 = 400;
const FILMSTRIP_CELL: f32 = 56.0;
const GRID_SPACING: f32 = 8.0;
const GRID_PADDING: f32 = 10.0;
const TOOLBAR_HEIGHT: f32 = 50.0;

const ALBUMS_DEFAULT_SPAN: usize = 3;
const PHOTOS_DEFAULT_SPAN: usize = 4;
const PHOTOS_ALLOWED_SPANS: [usize; 6] = [2, 3, 4, 5, 6, 9];

pub fn run() -> iced::Result {
    iced::application(boot, update, view)
        .title("Photogrid")
        .theme(theme)
        .subscription(subscription)
        .centered()
        .run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Albums,
    Photos,
}

struct Photogrid {
    settings: Option<Rc<Settings>>,
    folder: Option<PathBuf>,
    albums: Vec<Album>,
    screen: Screen,
    current_album: Option<usize>,
    album_grid: GridModel,
    photo_grid: GridModel,
    album_zoom: SpanZoomController,
    photo_zoom: SpanZoomController,
    thumbnails: HashMap<PathBuf, (image::Handle, Instant)>,
    pending_thumbnails: Vec<PathBuf>,
    last_thumb_added: Option<Instant>,
    loading: bool,
    viewer: ViewerState,
    viewer_cache: HashMap<usize, image::Handle>,
    photo_info: Option<(usize, PhotoInfo)>,
    filmstrip_enabled: bool,
    selected_thumb: Option<usize>,
    window: (f32, f32),
}

fn boot() -> (Photogrid, Task<Message>) {
    let settings = config_dir().and_then(|dir| {
        match Settings::open(&dir.join("settings.db")) {
            Ok(s) => Some(Rc::new(s)),
            Err(e) => {
                log::warn!("Failed to open settings DB: {}", e);
                None
            }
        }
    });

    let albums_span = read_span(&settings, keys::ALBUMS_SPAN, ALBUMS_DEFAULT_SPAN);
    let photos_span = read_span(&settings, keys::PHOTOS_SPAN, PHOTOS_DEFAULT_SPAN);
    let filmstrip_enabled = settings
        .as_ref()
        .map(|s| s.get_bool(keys::FILMSTRIP_ENABLED, true))
        .unwrap_or(true);

    let album_zoom = span_controller(
        settings.clone(),
        keys::ALBUMS_SPAN,
        SpanZoomConfig {
            min_span: 2,
            max_span: 4,
            initial_span: albums_span,
            ..SpanZoomConfig::default()
        },
    );
    let photo_zoom = span_controller(
        settings.clone(),
        keys::PHOTOS_SPAN,
        SpanZoomConfig {
            min_span: PHOTOS_ALLOWED_SPANS[0],
            max_span: PHOTOS_ALLOWED_SPANS[PHOTOS_ALLOWED_SPANS.len() - 1],
            initial_span: photos_span,
            allowed_spans: PHOTOS_ALLOWED_SPANS.to_vec(),
            ..SpanZoomConfig::default()
        },
    );

    let mut state = Photogrid {
        album_grid: GridModel::new(album_zoom.span_count(), GRID_SPACING, GRID_PADDING),
        photo_grid: GridModel::new(photo_zoom.span_count(), GRID_SPACING, GRID_PADDING),
        album_zoom,
        photo_zoom,
        settings,
        folder: None,
        albums: Vec::new(),
        screen: Screen::Albums,
        current_album: None,
        thumbnails: HashMap::new(),
        pending_thumbnails: Vec::new(),
        last_thumb_added: None,
        loading: false,
        viewer: ViewerState::default(),
        viewer_cache: HashMap::new(),
        photo_info: None,
        filmstrip_enabled,
        selected_thumb: None,
        window: (1280.0, 720.0),
    };

    if let Some(folder) = load_last_folder(&state.settings) {
        state.folder = Some(folder.clone());
        state.loading = true;
        let task = Task::perform(
            async move { media::scan_library(folder) },
            Message::LibraryScanned,
        );
        return (state, task);
    }
    (state, Task::none())
}

#[derive(Debug, Clone)]
pub enum Message {
    OpenFolder,
    FolderSelected(Option<PathBuf>),
    LibraryScanned(Vec<PathBuf>),
    ThumbnailBatch(Vec<(PathBuf, Pixels)>),
    OpenAlbum(usize),
    OpenPhoto(usize),
    CloseViewer,
    NextPhoto,
    PrevPhoto,
    ToggleInfo,
    ViewerLoaded(usize, Pixels),
    // Pinch-to-zoom grid input
    GridTouch(PointerEvent),
    GridScrolled(f32),
    WindowResized(f32, f32),
    Tick,
    KeyEscape,
    KeyLeft,
    KeyRight,
    KeyUp,
    KeyDown,
    KeyEnter,
    KeyZoomIn,
    KeyZoomOut,
    KeyFilmstrip,
}

fn subscription(state: &Photogrid) -> Subscription<Message> {
    let events = iced::event::listen_with(|event, _status, _window| match event {
        iced::Event::Keyboard(iced::keyboard::Event::KeyPressed { key, .. }) => {
            use iced::keyboard::key::Named;
            use iced::keyboard::Key;
            match key {
                Key::Named(Named::ArrowLeft) => Some(Message::KeyLeft),
                Key::Named(Named::ArrowRight) => Some(Message::KeyRight),
                Key::Named(Named::ArrowUp) => Some(Message::KeyUp),
                Key::Named(Named::ArrowDown) => Some(Message::KeyDown),
                Key::Named(Named::Enter) => Some(Message::KeyEnter),
                Key::Named(Named::Escape) => Some(Message::KeyEscape),
                Key::Character(c) => match c.as_str() {
                    "+" | "=" => Some(Message::KeyZoomIn),
                    "-" => Some(Message::KeyZoomOut),
                    "f" | "F" => Some(Message::KeyFilmstrip),
                    "i" | "I" => Some(Message::ToggleInfo),
                    _ => None,
                },
                _ => None,
            }
        }
        iced::Event::Window(iced::window::Event::Resized(size)) => {
            Some(Message::WindowResized(size.width, size.height))
        }
        _ => None,
    });

    let needs_tick = state.viewer.needs_ticks() || thumbnails_fading(state);
    if needs_tick {
        Subscription::batch([
            events,
            iced::time::every(Duration::from_millis(16)).map(|_| Message::Tick),
        ])
    } else {
        events
    }
}

fn thumbnails_fading(state: &Photogrid) -> bool {
    state
        .last_thumb_added
        .is_some_and(|added| added.elapsed().as_secs_f32() * 1000.0 < THUMB_FADE_MS)
}

fn update(state: &mut Photogrid, message: Message) -> Task<Message> {
    match message {
        Message::OpenFolder => {
            return Task::perform(pick_folder(), Message::FolderSelected);
        }
        Message::FolderSelected(Some(path)) => {
            if let Some(s) = &state.settings {
                s.set_string(keys::LAST_FOLDER, &path.to_string_lossy());
            }
            state.folder = Some(path.clone());
            state.albums.clear();
            state.screen = Screen::Albums;
            state.current_album = None;
            state.thumbnails.clear();
            state.pending_thumbnails.clear();
            state.viewer = ViewerState::default();
            state.viewer_cache.clear();
            state.photo_info = None;
            state.selected_thumb = None;
            state.loading = true;
            return Task::perform(
                async move { media::scan_library(path) },
                Message::LibraryScanned,
            );
        }
        Message::FolderSelected(None) => {}
        Message::LibraryScanned(paths) => {
            let root = state.folder.clone().unwrap_or_default();
            state.albums = media::build_albums(&root, &paths);
            state.album_grid.set_item_count(state.albums.len());
            state.pending_thumbnails = state
                .albums
                .iter()
                .filter_map(|a| a.cover())
                .cloned()
                .collect();
            return load_next_batch(state);
        }
        Message::ThumbnailBatch(results) => {
            let now = Instant::now();
            for (path, pixels) in results {
                let handle = image::Handle::from_rgba(pixels.width, pixels.height, pixels.rgba);
                state.thumbnails.insert(path, (handle, now));
            }
            state.last_thumb_added = Some(now);
            return load_next_batch(state);
        }
        Message::OpenAlbum(index) => {
            // A finishing pinch must not double as a tap.
            if state.album_zoom.is_gesture_active() || index >= state.albums.len() {
                return Task::none();
            }
            state.current_album = Some(index);
            state.screen = Screen::Photos;
            state.selected_thumb = None;
            state.photo_grid.set_scroll(0.0);
            state
                .photo_grid
                .set_item_count(state.albums[index].photos.len());
            queue_album_thumbnails(state, index);
            return load_next_batch(state);
        }
        Message::OpenPhoto(index) => {
            if state.photo_zoom.is_gesture_active() || index >= current_photos(state).len() {
                return Task::none();
            }
            if state.viewer.is_open() {
                let total = current_photos(state).len();
                state.viewer.jump(index, total);
            } else {
                state.selected_thumb = Some(index);
                state.viewer.open(index);
            }
            refresh_photo_info(state);
            return preload_viewer_images(state);
        }
        Message::CloseViewer => {
            state.viewer.close();
            state.photo_info = None;
            state.viewer_cache.clear();
            return restore_grid_scroll(state);
        }
        Message::NextPhoto => {
            state.viewer.next(current_photos(state).len());
            refresh_photo_info(state);
            return preload_viewer_images(state);
        }
        Message::PrevPhoto => {
            state.viewer.prev();
            refresh_photo_info(state);
            return preload_viewer_images(state);
        }
        Message::ToggleInfo => {
            if state.viewer.is_open() {
                state.viewer.toggle_info();
            }
        }
        Message::ViewerLoaded(index, pixels) => {
            let handle = image::Handle::from_rgba(pixels.width, pixels.height, pixels.rgba);
            state.viewer_cache.insert(index, handle);
            // Evict distant entries to limit memory (keep current ±3)
            if let Some(current) = state.viewer.current {
                let keep_min = current.saturating_sub(3);
                let keep_max = current + 3;
                state
                    .viewer_cache
                    .retain(|&k, _| k >= keep_min && k <= keep_max);
            }
        }
        Message::GridTouch(event) => {
            match state.screen {
                Screen::Albums => {
                    state
                        .album_zoom
                        .handle_touch(event, &mut state.album_grid);
                }
                Screen::Photos => {
                    state
                        .photo_zoom
                        .handle_touch(event, &mut state.photo_grid);
                }
            }
            return drain_grid_tasks(state);
        }
        Message::GridScrolled(y) => {
            active_grid_mut(state).set_scroll(y);
        }
        Message::WindowResized(width, height) => {
            state.window = (width, height);
            let grid_height = (height - TOOLBAR_HEIGHT).max(1.0);
            state.album_grid.set_viewport(width, grid_height);
            state.photo_grid.set_viewport(width, grid_height);
        }
        Message::Tick => {
            state.viewer.tick();
        }
        Message::KeyEscape => {
            if state.viewer.is_open() {
                state.viewer.close();
                state.photo_info = None;
                return restore_grid_scroll(state);
            }
            if state.screen == Screen::Photos {
                state.screen = Screen::Albums;
                state.current_album = None;
                state.selected_thumb = None;
                return restore_grid_scroll(state);
            }
            state.selected_thumb = None;
        }
        Message::KeyLeft => {
            if state.viewer.is_open() {
                state.viewer.prev();
                refresh_photo_info(state);
                return preload_viewer_images(state);
            }
            return move_grid_selection(state, -1);
        }
        Message::KeyRight => {
            if state.viewer.is_open() {
                state.viewer.next(current_photos(state).len());
                refresh_photo_info(state);
                return preload_viewer_images(state);
            }
            return move_grid_selection(state, 1);
        }
        Message::KeyUp => {
            if !state.viewer.is_open() {
                let cols = active_grid(state).columns() as i32;
                return move_grid_selection(state, -cols);
            }
        }
        Message::KeyDown => {
            if !state.viewer.is_open() {
                let cols = active_grid(state).columns() as i32;
                return move_grid_selection(state, cols);
            }
        }
        Message::KeyEnter => {
            if state.viewer.is_open() {
                return Task::none();
            }
            if let Some(index) = state.selected_thumb {
                return match state.screen {
                    Screen::Albums => update(state, Message::OpenAlbum(index)),
                    Screen::Photos => update(state, Message::OpenPhoto(index)),
                };
            }
        }
        Message::KeyZoomIn => {
            if state.viewer.is_open() {
                state.viewer.zoom.step_in();
            } else {
                // Bigger thumbnails: one fewer column.
                step_active_span(state, -1);
                return drain_grid_tasks(state);
            }
        }
        Message::KeyZoomOut => {
            if state.viewer.is_open() {
                state.viewer.zoom.step_out();
            } else {
                step_active_span(state, 1);
                return drain_grid_tasks(state);
            }
        }
        Message::KeyFilmstrip => {
            state.filmstrip_enabled = !state.filmstrip_enabled;
            if let Some(s) = &state.settings {
                s.set_bool(keys::FILMSTRIP_ENABLED, state.filmstrip_enabled);
            }
        }
    }
    Task::none()
}

// --- Update helpers ---

fn read_span(settings: &Option<Rc<Settings>>, key: &str, default: usize) -> usize {
    settings
        .as_ref()
        .map(|s| s.get_int(key, default as i64).max(0) as usize)
        .unwrap_or(default)
}

fn span_controller(
    settings: Option<Rc<Settings>>,
    key: &'static str,
    config: SpanZoomConfig,
) -> SpanZoomController {
    SpanZoomController::new(config, move |span| {
        log::debug!("span changed: {} = {}", key, span);
        if let Some(s) = &settings {
            s.set_int(key, span as i64);
        }
    })
}

fn active_grid(state: &Photogrid) -> &GridModel {
    match state.screen {
        Screen::Albums => &state.album_grid,
        Screen::Photos => &state.photo_grid,
    }
}

fn active_grid_mut(state: &mut Photogrid) -> &mut GridModel {
    match state.screen {
        Screen::Albums => &mut state.album_grid,
        Screen::Photos => &mut state.photo_grid,
    }
}

fn step_active_span(state: &mut Photogrid, direction: isize) {
    match state.screen {
        Screen::Albums => state
            .album_zoom
            .step_span_count(&mut state.album_grid, direction),
        Screen::Photos => state
            .photo_zoom
            .step_span_count(&mut state.photo_grid, direction),
    }
}

fn current_photos(state: &Photogrid) -> &[PathBuf] {
    state
        .current_album
        .and_then(|i| state.albums.get(i))
        .map(|a| a.photos.as_slice())
        .unwrap_or(&[])
}

fn active_item_count(state: &Photogrid) -> usize {
    match state.screen {
        Screen::Albums => state.albums.len(),
        Screen::Photos => current_photos(state).len(),
    }
}

fn grid_scroll_id(screen: Screen) -> iced::widget::Id {
    match screen {
        Screen::Albums => iced::widget::Id::new("albums_grid"),
        Screen::Photos => iced::widget::Id::new("photos_grid"),
    }
}

/// After a span change: the grid relayouts on the next view pass, then the
/// recorded scroll target re-anchors the viewport.
fn drain_grid_tasks(state: &mut Photogrid) -> Task<Message> {
    let screen = state.screen;
    let grid = active_grid_mut(state);
    if grid.take_relayout() {
        if let Some(y) = grid.take_pending_scroll() {
            return scroll_task(screen, y);
        }
    }
    Task::none()
}

fn scroll_task(screen: Screen, y: f32) -> Task<Message> {
    use iced::widget::operation::AbsoluteOffset;
    iced::widget::operation::scroll_to(
        grid_scroll_id(screen),
        AbsoluteOffset {
            x: None,
            y: Some(y.max(0.0)),
        },
    )
}

fn restore_grid_scroll(state: &Photogrid) -> Task<Message> {
    scroll_task(state.screen, active_grid(state).scroll_y())
}

fn move_grid_selection(state: &mut Photogrid, delta: i32) -> Task<Message> {
    let count = active_item_count(state);
    if count == 0 {
        return Task::none();
    }
    let current = state.selected_thumb.unwrap_or(0) as i32;
    let next = (current + delta).clamp(0, count as i32 - 1) as usize;
    state.selected_thumb = Some(next);

    let screen = state.screen;
    match active_grid_mut(state).reveal(next) {
        Some(y) => scroll_task(screen, y),
        None => Task::none(),
    }
}

fn queue_album_thumbnails(state: &mut Photogrid, album_index: usize) {
    let Some(album) = state.albums.get(album_index) else {
        return;
    };
    for path in &album.photos {
        if !state.thumbnails.contains_key(path) && !state.pending_thumbnails.contains(path) {
            state.pending_thumbnails.push(path.clone());
        }
    }
}

fn load_next_batch(state: &mut Photogrid) -> Task<Message> {
    if state.pending_thumbnails.is_empty() {
        state.loading = false;
        return Task::none();
    }

    let count = THUMBNAIL_BATCH_SIZE.min(state.pending_thumbnails.len());
    let batch: Vec<PathBuf> = state.pending_thumbnails.drain(..count).collect();

    Task::perform(
        async move { thumbnail::load_thumbnails_parallel(&batch, THUMB_RENDER_SIZE) },
        Message::ThumbnailBatch,
    )
}

fn preload_viewer_images(state: &Photogrid) -> Task<Message> {
    let Some(index) = state.viewer.current else {
        return Task::none();
    };
    let photos = current_photos(state);
    let total = photos.len();
    if total == 0 {
        return Task::none();
    }

    let mut tasks = Vec::new();
    for i in [
        index.saturating_sub(1),
        index,
        (index + 1).min(total - 1),
    ] {
        if !state.viewer_cache.contains_key(&i) {
            let path = photos[i].clone();
            tasks.push(Task::perform(
                async move { (i, thumbnail::load_oriented(&path)) },
                |(i, pixels)| match pixels {
                    Some(p) => Message::ViewerLoaded(i, p),
                    None => Message::Tick,
                },
            ));
        }
    }
    if tasks.is_empty() {
        Task::none()
    } else {
        Task::batch(tasks)
    }
}

fn refresh_photo_info(state: &mut Photogrid) {
    if let Some(index) = state.viewer.current {
        if state.photo_info.as_ref().is_some_and(|(i, _)| *i == index) {
            return;
        }
        if let Some(path) = current_photos(state).get(index) {
            let info = metadata::read_photo_info(path);
            state.photo_info = Some((index, info));
        }
    }
}

// --- Views ---

const LABEL_COLOR: Color = Color::from_rgb(0.5, 0.5, 0.55);

fn view(state: &Photogrid) -> Element<'_, Message> {
    if state.viewer.is_open() {
        return viewer_view(state);
    }
    match state.screen {
        Screen::Albums => albums_view(state),
        Screen::Photos => photos_view(state),
    }
}

fn albums_view(state: &Photogrid) -> Element<'_, Message> {
    let mut toolbar_items: Vec<Element<'_, Message>> = vec![
        button("Open Folder").on_press(Message::OpenFolder).into(),
    ];
    if !state.albums.is_empty() {
        let count_text = format!(
            "{} album{}",
            state.albums.len(),
            if state.albums.len() == 1 { "" } else { "s" }
        );
        toolbar_items.push(text(count_text).size(13).color(LABEL_COLOR).into());
    }
    toolbar_items.push(Space::new().width(Length::Fill).into());
    toolbar_items.push(
        text(match &state.folder {
            Some(p) => p.display().to_string(),
            None => "No folder selected".into(),
        })
        .size(14)
        .into(),
    );
    let toolbar = row(toolbar_items).spacing(10).padding(10);

    let content: Element<'_, Message> = if state.loading && state.thumbnails.is_empty() {
        container(text("Loading...")).center(Length::Fill).into()
    } else if state.albums.is_empty() {
        container(text("Open a folder to browse albums"))
            .center(Length::Fill)
            .into()
    } else {
        pinch_grid(Screen::Albums, album_cells(state))
    };

    container(column![toolbar, content]).into()
}

fn photos_view(state: &Photogrid) -> Element<'_, Message> {
    let album = state.current_album.and_then(|i| state.albums.get(i));
    let (album_name, photo_count) = match album {
        Some(a) => (a.name.as_str(), a.photos.len()),
        None => ("Album", 0),
    };

    let toolbar = row![
        button("Back").on_press(Message::KeyEscape),
        text(album_name).size(14),
        text(format!(
            "{} photo{}",
            photo_count,
            if photo_count == 1 { "" } else { "s" }
        ))
        .size(13)
        .color(LABEL_COLOR),
        Space::new().width(Length::Fill),
    ]
    .spacing(10)
    .padding(10);

    let content = pinch_grid(Screen::Photos, photo_cells(state));
    container(column![toolbar, content]).into()
}

/// Wrap grid content in its scrollable and the touch interceptor that feeds
/// the pinch controller.
fn pinch_grid<'a>(screen: Screen, cells: Element<'a, Message>) -> Element<'a, Message> {
    let body = scrollable(cells)
        .id(grid_scroll_id(screen))
        .on_scroll(|vp| Message::GridScrolled(vp.absolute_offset().y))
        .height(Length::Fill);
    TouchArea::new(body, Message::GridTouch).into()
}

fn album_cells(state: &Photogrid) -> Element<'_, Message> {
    let grid = &state.album_grid;
    let cols = grid.columns().max(1);
    let cell = grid.cell_size();
    let spacing = grid.spacing();
    let show_details = grid.show_details();

    let rows: Vec<Element<'_, Message>> = state
        .albums
        .chunks(cols)
        .enumerate()
        .map(|(row_idx, chunk)| {
            let cells: Vec<Element<'_, Message>> = chunk
                .iter()
                .enumerate()
                .map(|(col_idx, album)| {
                    let index = row_idx * cols + col_idx;
                    let thumb = album
                        .cover()
                        .and_then(|path| state.thumbnails.get(path));
                    let label = show_details.then(|| {
                        format!(
                            "{} ({})",
                            album.name,
                            album.photos.len()
                        )
                    });
                    grid_cell(
                        thumb,
                        label,
                        cell,
                        state.selected_thumb == Some(index),
                        Message::OpenAlbum(index),
                    )
                })
                .collect();
            row(cells).spacing(spacing).into()
        })
        .collect();

    column(rows)
        .spacing(spacing)
        .padding(grid.padding())
        .into()
}

fn photo_cells(state: &Photogrid) -> Element<'_, Message> {
    let grid = &state.photo_grid;
    let cols = grid.columns().max(1);
    let cell = grid.cell_size();
    let spacing = grid.spacing();
    let show_details = grid.show_details();
    let photos = current_photos(state);

    let rows: Vec<Element<'_, Message>> = photos
        .chunks(cols)
        .enumerate()
        .map(|(row_idx, chunk)| {
            let cells: Vec<Element<'_, Message>> = chunk
                .iter()
                .enumerate()
                .map(|(col_idx, path)| {
                    let index = row_idx * cols + col_idx;
                    let label = show_details
                        .then(|| path.file_name().map(|n| n.to_string_lossy().to_string()))
                        .flatten();
                    grid_cell(
                        state.thumbnails.get(path),
                        label,
                        cell,
                        state.selected_thumb == Some(index),
                        Message::OpenPhoto(index),
                    )
                })
                .collect();
            row(cells).spacing(spacing).into()
        })
        .collect();

    column(rows)
        .spacing(spacing)
        .padding(grid.padding())
        .into()
}

fn grid_cell<'a>(
    thumb: Option<&'a (image::Handle, Instant)>,
    label: Option<String>,
    cell: f32,
    is_selected: bool,
    on_press: Message,
) -> Element<'a, Message> {
    let picture: Element<'a, Message> = match thumb {
        Some((handle, added)) => {
            let age_ms = added.elapsed().as_secs_f32() * 1000.0;
            let opacity = (age_ms / THUMB_FADE_MS).min(1.0);
            image(handle.clone())
                .width(cell)
                .height(cell)
                .content_fit(iced::ContentFit::Cover)
                .opacity(opacity)
                .into()
        }
        None => container(Space::new())
            .width(cell)
            .height(cell)
            .style(container::dark)
            .into(),
    };

    let content: Element<'a, Message> = match label {
        Some(label) => iced::widget::stack![
            picture,
            container(
                container(text(label).size(11).color(Color::WHITE))
                    .padding([2, 6])
                    .style(cell_label_style),
            )
            .width(cell)
            .align_bottom(cell)
            .padding(4),
        ]
        .into(),
        None => picture,
    };

    let btn = button(content).on_press(on_press).padding(4);
    if is_selected {
        container(btn).style(selected_cell_style).into()
    } else {
        btn.into()
    }
}

fn selected_cell_style(theme: &Theme) -> container::Style {
    let palette = theme.palette();
    container::Style {
        border: iced::Border {
            color: palette.primary,
            width: 2.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

fn cell_label_style(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(iced::Background::Color(Color::from_rgba(
            0.0, 0.0, 0.0, 0.6,
        ))),
        border: iced::Border {
            radius: 4.0.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn viewer_view(state: &Photogrid) -> Element<'_, Message> {
    let photos = current_photos(state);
    let Some(index) = state.viewer.current else {
        return container(text("")).into();
    };
    let Some(path) = photos.get(index) else {
        return container(text("")).into();
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let toolbar = row![
        button("Back").on_press(Message::CloseViewer),
        button("Info").on_press(Message::ToggleInfo),
        Space::new().width(Length::Fill),
        text(format!("{} ({}/{})", filename, index + 1, photos.len())).size(14),
    ]
    .spacing(10)
    .padding(10);

    let image_area: Element<'_, Message> = if state.viewer.zoom.is_zoomed() {
        zoomed_image(state, path, index)
    } else {
        fading_image(state, path, index, photos)
    };

    let body: Element<'_, Message> = if state.viewer.show_info {
        let panel = state
            .photo_info
            .as_ref()
            .filter(|(i, _)| *i == index)
            .map(|(_, info)| info_panel(info));
        match panel {
            Some(panel) => row![panel, image_area].into(),
            None => image_area,
        }
    } else {
        image_area
    };

    let mut sections: Vec<Element<'_, Message>> = vec![toolbar.into(), body];
    if state.filmstrip_enabled && photos.len() > 1 {
        sections.push(filmstrip(state, photos, index));
    }
    column(sections).into()
}

fn viewer_image(
    path: &PathBuf,
    handle: Option<&image::Handle>,
) -> iced::widget::Image<image::Handle> {
    match handle {
        Some(h) => image(h.clone()),
        None => image(path.to_string_lossy().to_string()),
    }
}

fn zoomed_image<'a>(
    state: &'a Photogrid,
    path: &'a PathBuf,
    index: usize,
) -> Element<'a, Message> {
    let zoom = state.viewer.zoom.level;
    let (w, h) = state.window;
    scrollable(
        viewer_image(path, state.viewer_cache.get(&index))
            .content_fit(iced::ContentFit::Contain)
            .width(w * zoom)
            .height((h - TOOLBAR_HEIGHT) * zoom),
    )
    .direction(scrollable::Direction::Both {
        vertical: scrollable::Scrollbar::default(),
        horizontal: scrollable::Scrollbar::default(),
    })
    .width(Length::Fill)
    .height(Length::Fill)
    .into()
}

fn fading_image<'a>(
    state: &'a Photogrid,
    path: &'a PathBuf,
    index: usize,
    photos: &'a [PathBuf],
) -> Element<'a, Message> {
    let new_img = viewer_image(path, state.viewer_cache.get(&index))
        .content_fit(iced::ContentFit::Contain)
        .width(Length::Fill)
        .height(Length::Fill);

    let image_layer: Element<'a, Message> = match crossfade_source(state, photos) {
        // Old image on top fading out, new image underneath at full opacity,
        // so the fade starts even before the new image finishes loading.
        Some((from_path, from_handle, progress)) => {
            let old_img = viewer_image(from_path, from_handle)
                .content_fit(iced::ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fill)
                .opacity(1.0 - progress);
            iced::widget::stack![
                container(new_img).center(Length::Fill),
                container(old_img).center(Length::Fill),
            ]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
        }
        None => container(new_img).center(Length::Fill).into(),
    };

    let left_zone: Element<'_, Message> = if index > 0 {
        button(
            container(text("\u{2039}").size(48))
                .center_y(Length::Fill)
                .padding([0, 16]),
        )
        .on_press(Message::PrevPhoto)
        .style(button::text)
        .height(Length::Fill)
        .width(Length::FillPortion(3))
        .into()
    } else {
        Space::new()
            .width(Length::FillPortion(3))
            .height(Length::Fill)
            .into()
    };

    let right_zone: Element<'_, Message> = if index + 1 < photos.len() {
        button(
            container(text("\u{203A}").size(48))
                .center_y(Length::Fill)
                .align_right(Length::Fill)
                .padding([0, 16]),
        )
        .on_press(Message::NextPhoto)
        .style(button::text)
        .height(Length::Fill)
        .width(Length::FillPortion(3))
        .into()
    } else {
        Space::new()
            .width(Length::FillPortion(3))
            .height(Length::Fill)
            .into()
    };

    let nav_overlay = row![
        left_zone,
        Space::new()
            .width(Length::FillPortion(14))
            .height(Length::Fill),
        right_zone,
    ]
    .height(Length::Fill)
    .width(Length::Fill);

    iced::widget::stack![image_layer, nav_overlay]
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn crossfade_source<'a>(
    state: &'a Photogrid,
    photos: &'a [PathBuf],
) -> Option<(&'a PathBuf, Option<&'a image::Handle>, f32)> {
    let fade = state.viewer.fade.as_ref()?;
    let progress = state.viewer.fade_progress().unwrap_or(1.0);
    if progress >= 1.0 {
        return None;
    }
    let from_path = photos.get(fade.from_index)?;
    Some((
        from_path,
        state.viewer_cache.get(&fade.from_index),
        progress,
    ))
}

fn filmstrip<'a>(
    state: &'a Photogrid,
    photos: &'a [PathBuf],
    current: usize,
) -> Element<'a, Message> {
    // A window of neighbors keeps the strip light for huge albums.
    let start = current.saturating_sub(15);
    let end = (current + 16).min(photos.len());

    let cells: Vec<Element<'a, Message>> = (start..end)
        .map(|i| {
            let thumb: Element<'a, Message> = match state.thumbnails.get(&photos[i]) {
                Some((handle, _)) => image(handle.clone())
                    .width(FILMSTRIP_CELL)
                    .height(FILMSTRIP_CELL)
                    .content_fit(iced::ContentFit::Cover)
                    .into(),
                None => container(Space::new())
                    .width(FILMSTRIP_CELL)
                    .height(FILMSTRIP_CELL)
                    .style(container::dark)
                    .into(),
            };
            let btn = button(thumb).on_press(Message::OpenPhoto(i)).padding(2);
            if i == current {
                container(btn).style(selected_cell_style).into()
            } else {
                btn.into()
            }
        })
        .collect();

    container(
        scrollable(row(cells).spacing(4).padding(6)).direction(
            scrollable::Direction::Horizontal(scrollable::Scrollbar::default()),
        ),
    )
    .width(Length::Fill)
    .style(container::dark)
    .into()
}

fn info_panel(info: &PhotoInfo) -> Element<'_, Message> {
    let mut items: Vec<Element<'_, Message>> = Vec::new();

    items.push(text(&info.filename).size(15).into());
    items.push(
        text(metadata::format_file_size(info.file_size))
            .size(12)
            .color(LABEL_COLOR)
            .into(),
    );
    if let Some((w, h)) = info.dimensions {
        items.push(
            text(format!("{} x {} px", w, h))
                .size(12)
                .color(LABEL_COLOR)
                .into(),
        );
    }

    if info.date_taken.is_some() || info.date_modified.is_some() {
        items.push(section_divider());
        if let Some(ref date) = info.date_taken {
            items.push(info_field("Date Taken", date.clone()));
        }
        if let Some(ref date) = info.date_modified {
            items.push(info_field("Modified", date.clone()));
        }
    }

    let has_camera =
        info.camera_make.is_some() || info.camera_model.is_some() || info.lens_model.is_some();
    if has_camera {
        items.push(section_divider());
        items.push(section_header("Camera"));
        if let Some(ref make) = info.camera_make {
            items.push(info_field("Make", make.clone()));
        }
        if let Some(ref model) = info.camera_model {
            items.push(info_field("Model", model.clone()));
        }
        if let Some(ref lens) = info.lens_model {
            items.push(info_field("Lens", lens.clone()));
        }
    }

    let exposure = info.exposure_summary();
    if !exposure.is_empty() || info.focal_length.is_some() {
        items.push(section_divider());
        items.push(section_header("Exposure"));
        if !exposure.is_empty() {
            items.push(text(exposure).size(13).into());
        }
        if let Some(ref fl) = info.focal_length {
            items.push(info_field("Focal length", fl.clone()));
        }
    }

    if let (Some(lat), Some(lon)) = (info.gps_latitude, info.gps_longitude) {
        items.push(section_divider());
        items.push(section_header("Location"));
        items.push(info_field("Coordinates", format!("{:.6}, {:.6}", lat, lon)));
    }

    let panel_content = scrollable(column(items).spacing(6).padding(16)).height(Length::Fill);

    row![
        container(panel_content)
            .width(280)
            .height(Length::Fill)
            .style(container::dark),
        rule::vertical(1),
    ]
    .into()
}

fn section_header(label: &str) -> Element<'_, Message> {
    text(label.to_string()).size(11).color(LABEL_COLOR).into()
}

fn section_divider<'a>() -> Element<'a, Message> {
    container(rule::horizontal(1)).padding([4, 0]).into()
}

fn info_field(label: &str, value: String) -> Element<'_, Message> {
    row![
        text(label.to_string()).size(12).color(LABEL_COLOR).width(90),
        text(value).size(12),
    ]
    .spacing(8)
    .into()
}

fn theme(_state: &Photogrid) -> Theme {
    Theme::Dark
}

// --- IO helpers ---

async fn pick_folder() -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Select a photo folder")
        .pick_folder()
        .await
        .map(|handle| handle.path().to_path_buf())
}

fn config_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|d| d.join(".photogrid"))
}

fn load_last_folder(settings: &Option<Rc<Settings>>) -> Option<PathBuf> {
    let stored = settings.as_ref()?.get_string(keys::LAST_FOLDER)?;
    let path = PathBuf::from(stored.trim());
    if path.is_dir() {
        Some(path)
    } else {
        None
    }
}
