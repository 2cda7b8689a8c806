use rand::rngs::StdRng;
use ratatui::layout::Rect;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::animation::{animate_scene, AutoRotate, FrameClock};
use crate::config::Settings;
use crate::data::{sample_markers, GeoLoader, GeoSource, LoadedGeo, HUB_COLOR};
use crate::error::FetchResult;
use crate::filter::visual::{build_markers, collect_items, legend};
use crate::filter::{Fetcher, FilterLevel, FilterState, ResearchApi};
use crate::interaction::{Interaction, InteractionContext};
use crate::map::projection::unproject;
use crate::map::{Camera, Country, CountryRegistry, GlobeRenderer, Scene};
use crate::present::{Presenter, ViewState};
use crate::ui;

/// Radians per rotation key press
const KEY_ROTATE_STEP: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GeoStatus {
    Idle,
    Loading,
    Ready { countries: usize, borders: usize },
    Failed,
}

/// Application state: one interactive globe session
pub struct App {
    pub settings: Settings,
    pub camera: Camera,
    pub scene: Scene,
    pub registry: CountryRegistry,
    pub renderer: GlobeRenderer,
    pub interaction: Interaction,
    pub filters: FilterState,
    pub view: ViewState,
    /// Dropdown the filter keys act on
    pub focus: FilterLevel,
    pub mode: Mode,
    pub search: String,
    pub auto_rotate: AutoRotate,
    pub clock: FrameClock,
    pub geo_status: GeoStatus,
    pub should_quit: bool,
    /// Inner map area in terminal cells
    pub map_area: Rect,
    fetcher: Fetcher,
    geo_loader: Option<GeoLoader>,
    rng: StdRng,
}

impl App {
    pub fn new(settings: Settings, api: Arc<dyn ResearchApi>, width: u16, height: u16, rng: StdRng) -> Self {
        let map_area = ui::layout(Rect::new(0, 0, width, height)).map_inner;
        let mut renderer = GlobeRenderer::new(settings.globe_rgb());
        renderer.settings.inner_glow = settings.inner_glow;

        Self {
            camera: Camera::new(map_area.width as usize * 2, map_area.height as usize * 4),
            scene: Scene::new(),
            registry: CountryRegistry::new(),
            renderer,
            interaction: Interaction::new(),
            filters: FilterState::new(),
            view: ViewState::new(),
            focus: FilterLevel::Field,
            mode: Mode::Normal,
            search: String::new(),
            auto_rotate: AutoRotate {
                enabled: settings.auto_rotate,
                speed: settings.rotate_speed,
            },
            clock: FrameClock::new(Instant::now()),
            geo_status: GeoStatus::Idle,
            should_quit: false,
            map_area,
            fetcher: Fetcher::new(api),
            geo_loader: None,
            rng,
            settings,
        }
    }

    /// Kick off background work: outline loading, the root filter fetch and
    /// a health probe of the research service
    pub fn start(&mut self, geo: Option<GeoSource>) {
        if let Some(source) = geo {
            tracing::info!("loading country outlines from {source}");
            self.geo_loader = Some(GeoLoader::spawn(source, self.settings.request_timeout()));
            self.geo_status = GeoStatus::Loading;
            self.view.show_status("Loading countries...");
        }

        let request = self.filters.initial_request();
        self.fetcher.spawn(request);
        self.filters.present(&mut self.view);

        let api = self.fetcher.api();
        thread::spawn(move || match api.health() {
            Ok(body) => tracing::info!("research service healthy: {body}"),
            Err(err) => tracing::warn!("research service health check failed: {err}"),
        });

        if self.settings.sample_markers {
            let (markers, links) = sample_markers();
            self.scene.set_markers(markers);
            for (from, to) in links {
                self.scene.connect(from, to, HUB_COLOR);
            }
        }
    }

    /// Apply whatever background work has finished
    pub fn poll_background(&mut self) {
        if let Some(result) = self.geo_loader.as_ref().and_then(GeoLoader::poll) {
            self.geo_loader = None;
            self.install_geo(result);
        }

        let mut changed = false;
        for response in self.fetcher.drain() {
            changed |= self.filters.apply_response(response);
        }
        if changed {
            self.filters.present(&mut self.view);
        }
    }

    /// Register every feature's country and add its shape to the scene
    pub fn install_geo(&mut self, result: FetchResult<LoadedGeo>) {
        match result {
            Ok(loaded) => {
                for (feature, shape) in loaded.features.iter().zip(loaded.shapes) {
                    let id = self.registry.register(&feature.properties, feature.id.as_deref(), &mut self.rng);
                    if let Some(country) = self.registry.get(&id) {
                        self.scene.add_country_shape(country, shape);
                    }
                }
                self.geo_status = GeoStatus::Ready {
                    countries: self.registry.len(),
                    borders: self.scene.borders.len(),
                };
                tracing::info!(
                    "installed {} countries, {} borders, {} fills",
                    self.registry.len(),
                    self.scene.borders.len(),
                    self.scene.meshes.len()
                );
                self.view.show_status(&format!("{} countries", self.registry.len()));
            }
            Err(err) => {
                tracing::warn!("country outlines unavailable: {err}");
                self.geo_status = GeoStatus::Failed;
                self.view.show_status("Error loading data");
            }
        }
    }

    /// Per-frame update
    pub fn tick(&mut self, now: Instant) {
        let dt = self.clock.tick(now);
        self.auto_rotate
            .step(&mut self.camera, dt, self.interaction.is_dragging());
        animate_scene(&mut self.scene, &self.camera, self.clock.elapsed(now));
        self.poll_background();
    }

    /// Update layout-dependent sizes when the terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = ui::layout(Rect::new(0, 0, width, height)).map_inner;
        self.camera
            .set_size(self.map_area.width as usize * 2, self.map_area.height as usize * 4);
    }

    fn ctx(&mut self) -> (InteractionContext<'_>, &mut Interaction) {
        (
            InteractionContext {
                scene: &mut self.scene,
                camera: &mut self.camera,
                registry: &self.registry,
                presenter: &mut self.view,
            },
            &mut self.interaction,
        )
    }

    /// Terminal cell to braille pixel (cell centre), relative to the map area
    fn to_pixel(&self, col: u16, row: u16) -> (i32, i32) {
        let px = (col as i32 - self.map_area.x as i32) * 2 + 1;
        let py = (row as i32 - self.map_area.y as i32) * 4 + 2;
        (px, py)
    }

    fn in_map(&self, col: u16, row: u16) -> bool {
        let area = self.map_area;
        col >= area.x && col < area.x + area.width && row >= area.y && row < area.y + area.height
    }

    pub fn mouse_move(&mut self, col: u16, row: u16) {
        let inside = self.in_map(col, row);
        let (px, py) = self.to_pixel(col, row);
        let (mut ctx, interaction) = self.ctx();
        if inside || interaction.is_dragging() {
            interaction.pointer_move(&mut ctx, px, py);
        } else if interaction.pointer.is_some() {
            interaction.pointer_leave(&mut ctx);
        }
    }

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        if self.in_map(col, row) {
            let (px, py) = self.to_pixel(col, row);
            self.interaction.pointer_down(px, py);
        }
    }

    pub fn mouse_up(&mut self, col: u16, row: u16) {
        let (px, py) = self.to_pixel(col, row);
        let (mut ctx, interaction) = self.ctx();
        interaction.pointer_up(&mut ctx, px, py);
    }

    pub fn scroll(&mut self, col: u16, row: u16, zoom_in: bool) {
        if self.in_map(col, row) {
            self.interaction.wheel(&mut self.camera, zoom_in);
        }
    }

    pub fn rotate_left(&mut self) {
        self.camera.rotate(-KEY_ROTATE_STEP, 0.0);
    }

    pub fn rotate_right(&mut self) {
        self.camera.rotate(KEY_ROTATE_STEP, 0.0);
    }

    pub fn rotate_up(&mut self) {
        self.camera.rotate(0.0, -KEY_ROTATE_STEP);
    }

    pub fn rotate_down(&mut self) {
        self.camera.rotate(0.0, KEY_ROTATE_STEP);
    }

    pub fn zoom_in(&mut self) {
        self.camera.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_out();
    }

    pub fn toggle_auto_rotate(&mut self) {
        self.auto_rotate.enabled = !self.auto_rotate.enabled;
    }

    /// Back to the default camera with nothing selected
    pub fn reset_view(&mut self) {
        self.camera.reset();
        let (mut ctx, interaction) = self.ctx();
        interaction.deselect(&mut ctx);
    }

    /// Escape in normal mode: close the info panel and drop the selection
    pub fn dismiss(&mut self) {
        let (mut ctx, interaction) = self.ctx();
        interaction.deselect(&mut ctx);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // Filters

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next().unwrap_or(FilterLevel::Field);
    }

    pub fn focus_prev(&mut self) {
        let idx = (self.focus.index() + FilterLevel::ALL.len() - 1) % FilterLevel::ALL.len();
        self.focus = FilterLevel::ALL[idx];
    }

    /// Step the focused dropdown to its next (or previous) option
    pub fn cycle_option(&mut self, forward: bool) {
        let state = self.filters.level(self.focus);
        if !state.enabled || state.options.is_empty() {
            return;
        }
        let len = state.options.len();
        let current = state
            .selected
            .as_deref()
            .and_then(|id| state.options.iter().position(|o| o.id == id));
        let idx = match (current, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        let id = state.options[idx].id.clone();
        self.select_option(self.focus, Some(&id));
    }

    /// Clear the focused dropdown (and everything below it)
    pub fn clear_focused(&mut self) {
        self.select_option(self.focus, None);
    }

    pub fn select_option(&mut self, level: FilterLevel, id: Option<&str>) {
        if let Some(request) = self.filters.select(level, id) {
            self.fetcher.spawn(request);
        }
        self.filters.present(&mut self.view);
    }

    /// Rebuild markers and legend from the current filter state
    pub fn apply_filters(&mut self) {
        let items = collect_items(&self.filters);
        let markers = build_markers(&items, &self.settings.marker_style(), &mut self.rng);
        tracing::info!("visualizing {} research items", markers.len());

        self.scene.set_markers(markers);
        self.view.set_legend(&legend(&items));
        self.view.hide_tooltip();
        if items.is_empty() {
            self.view.show_status("Nothing to visualize; pick a field first");
        } else {
            self.view.show_status(&format!("{} markers", items.len()));
        }
    }

    /// Reset every filter and remove all markers
    pub fn clear_filters(&mut self) {
        self.filters.reset();
        self.scene.clear_markers();
        self.view.set_legend(&[]);
        self.view.hide_tooltip();
        self.filters.present(&mut self.view);
        self.view.show_status("Filters cleared");
    }

    // Search

    pub fn start_search(&mut self) {
        self.mode = Mode::Search;
        self.search.clear();
    }

    pub fn cancel_search(&mut self) {
        self.mode = Mode::Normal;
        self.search.clear();
    }

    pub fn search_input(&mut self, c: char) {
        self.search.push(c);
    }

    pub fn search_backspace(&mut self) {
        self.search.pop();
    }

    pub fn search_results(&self) -> Vec<&Country> {
        self.registry.search(&self.search)
    }

    /// Select the top match and turn the globe to face it
    pub fn search_submit(&mut self) {
        let top = self.search_results().first().map(|c| c.id.clone());
        self.mode = Mode::Normal;
        self.search.clear();

        let Some(id) = top else {
            self.view.show_status("No matching country");
            return;
        };
        if let Some(center) = self.scene.country_center(&id) {
            let (lat, lon) = unproject(center);
            self.camera.focus_on(lat, lon);
            self.auto_rotate.enabled = false;
        }
        let (mut ctx, interaction) = self.ctx();
        interaction.select(&mut ctx, &id);
    }

    /// Selected country, for the status bar
    pub fn selected_country(&self) -> Option<&Country> {
        self.interaction.selected.as_deref().and_then(|id| self.registry.get(id))
    }

    pub fn hovered_country(&self) -> Option<&Country> {
        self.interaction.hovered.as_deref().and_then(|id| self.registry.get(id))
    }

    /// Zoom as "1.0x"
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.camera.zoom_factor())
    }

    /// Position under the pointer as "12.3°N, 45.6°W"
    pub fn pointer_coords(&self) -> Option<String> {
        self.interaction.pointer_geo.map(|(lat, lon)| {
            format!(
                "{:.1}°{}, {:.1}°{}",
                lat.abs(),
                if lat >= 0.0 { "N" } else { "S" },
                lon.abs(),
                if lon >= 0.0 { "E" } else { "W" }
            )
        })
    }

    /// Block until every in-flight fetch has been applied
    #[cfg(test)]
    fn settle(&mut self) {
        while self.fetcher.in_flight() > 0 {
            match self.fetcher.wait(std::time::Duration::from_secs(5)) {
                Some(response) => {
                    self.filters.apply_response(response);
                }
                None => break,
            }
        }
        self.filters.present(&mut self.view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use crate::error::FetchError;
    use crate::filter::mock::MockApi;
    use crate::map::shape::build_all;
    use crate::map::{GeoFeature, Geometry, ResearchKind};
    use rand::SeedableRng;
    use serde_json::json;

    fn settings() -> Settings {
        let mut settings = Settings::load(&Cli::default()).unwrap();
        settings.sample_markers = false;
        settings
    }

    fn app(api: MockApi) -> App {
        App::new(settings(), Arc::new(api), 120, 40, StdRng::seed_from_u64(9))
    }

    fn feature(props: serde_json::Value, ring: Vec<(f64, f64)>) -> GeoFeature {
        GeoFeature {
            geometry: Geometry::Polygon(vec![ring]),
            properties: props.as_object().cloned().unwrap_or_default(),
            id: None,
        }
    }

    fn adjacent_countries() -> LoadedGeo {
        let features = vec![
            feature(
                json!({"ISO_A3": "AAA", "NAME": "Aland"}),
                vec![(-90.0, -5.0), (-90.0, 5.0), (-100.0, 5.0), (-100.0, -5.0), (-90.0, -5.0)],
            ),
            feature(
                json!({"ISO_A3": "BBB", "NAME": "Bland"}),
                vec![(-90.0, -5.0), (-80.0, -5.0), (-80.0, 5.0), (-90.0, 5.0), (-90.0, -5.0)],
            ),
            // same identity again: adds geometry, keeps the first entry
            feature(
                json!({"ISO_A3": "aaa", "NAME": "Aland Again"}),
                vec![(-120.0, 20.0), (-115.0, 20.0), (-115.0, 25.0), (-120.0, 20.0)],
            ),
        ];
        let shapes = build_all(&features);
        LoadedGeo { features, shapes }
    }

    #[test]
    fn test_install_geo_dedups_and_registers() {
        let mut app = app(MockApi::astronomy());
        app.install_geo(Ok(adjacent_countries()));

        assert_eq!(app.registry.len(), 2);
        assert_eq!(app.registry.get("aaa").unwrap().name, "Aland");
        assert_eq!(app.scene.meshes.len(), 3);
        // the shared-corner rings collapse onto one border
        assert_eq!(app.scene.borders.len(), 2);
        assert_eq!(app.geo_status, GeoStatus::Ready { countries: 2, borders: 2 });
    }

    #[test]
    fn test_geo_failure_keeps_bare_globe() {
        let mut app = app(MockApi::astronomy());
        app.install_geo(Err(FetchError::Status {
            status: 404,
            url: "http://example.test/countries.json".into(),
        }));
        assert_eq!(app.geo_status, GeoStatus::Failed);
        assert!(!app.scene.has_borders());
        assert_eq!(app.view.status, "Error loading data");
    }

    #[test]
    fn test_search_selects_and_focuses() {
        let mut app = app(MockApi::astronomy());
        app.install_geo(Ok(adjacent_countries()));
        app.camera.rotate(2.0, 0.5);

        app.start_search();
        for c in "blan".chars() {
            app.search_input(c);
        }
        assert_eq!(app.search_results().len(), 1);
        app.search_submit();

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.interaction.selected.as_deref(), Some("bbb"));
        assert_eq!(app.view.info.as_ref().unwrap().title, "Bland");
        let (lat, lon) = app.camera.center_latlon();
        assert!(lat.abs() < 2.0, "lat {lat}");
        assert!((lon + 85.0).abs() < 2.0, "lon {lon}");

        app.start_search();
        for c in "AAA".chars() {
            app.search_input(c);
        }
        app.search_submit();
        assert_eq!(app.interaction.selected.as_deref(), Some("aaa"));
        assert_eq!(app.scene.fill_opacity("bbb"), Some(0.0));
    }

    #[test]
    fn test_cascade_to_markers() {
        let mut app = app(MockApi::astronomy());
        app.start(None);
        app.settle();
        assert!(app.view.dropdown(FilterLevel::Field).enabled);
        assert_eq!(app.view.dropdown(FilterLevel::Field).options.len(), 2);

        app.select_option(FilterLevel::Field, Some("31"));
        app.settle();
        assert_eq!(app.filters.level(FilterLevel::Subfield).options.len(), 2);

        app.select_option(FilterLevel::Subfield, Some("3103"));
        app.settle();
        assert_eq!(app.filters.level(FilterLevel::Funder).options.len(), 2);

        app.apply_filters();
        // the selected subfield plus one per funder option
        assert_eq!(app.scene.markers.len(), 3);
        assert!(app.scene.markers.iter().all(|m| m.research.is_some()));
        let kinds: Vec<&str> = app.view.legend.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(kinds, vec!["Subfield", "Funder"]);
        assert_eq!(
            app.scene.markers[0].research.as_ref().unwrap().kind,
            ResearchKind::Subfield
        );

        app.clear_filters();
        assert!(app.scene.markers.is_empty());
        assert!(app.view.legend.is_empty());
        assert!(!app.view.dropdown(FilterLevel::Subfield).enabled);
        assert!(app.view.dropdown(FilterLevel::Field).enabled);
    }

    #[test]
    fn test_field_change_resets_lower_dropdowns() {
        let mut app = app(MockApi::astronomy());
        app.start(None);
        app.settle();
        app.select_option(FilterLevel::Field, Some("31"));
        app.settle();
        app.select_option(FilterLevel::Subfield, Some("3103"));
        app.settle();

        app.select_option(FilterLevel::Field, Some("17"));
        assert!(app.filters.selected(FilterLevel::Subfield).is_none());
        assert!(!app.view.dropdown(FilterLevel::Funder).enabled);
        assert!(!app.view.dropdown(FilterLevel::Topic).enabled);
        app.settle();
        // Computer Science has no subfields in the mock service
        assert!(!app.view.dropdown(FilterLevel::Subfield).enabled);
    }

    #[test]
    fn test_service_down_leaves_filters_disabled() {
        let mut app = app(MockApi::failing());
        app.start(None);
        app.settle();
        let field = app.view.dropdown(FilterLevel::Field);
        assert!(!field.enabled);
        assert!(field.options.is_empty());

        app.apply_filters();
        assert!(app.scene.markers.is_empty());
    }

    #[test]
    fn test_cycle_focus_and_options() {
        let mut app = app(MockApi::astronomy());
        app.start(None);
        app.settle();

        app.cycle_option(true);
        assert_eq!(app.filters.selected(FilterLevel::Field), Some("31"));
        app.cycle_option(true);
        assert_eq!(app.filters.selected(FilterLevel::Field), Some("17"));
        app.cycle_option(false);
        assert_eq!(app.filters.selected(FilterLevel::Field), Some("31"));

        app.focus_prev();
        assert_eq!(app.focus, FilterLevel::Topic);
        app.focus_next();
        assert_eq!(app.focus, FilterLevel::Field);

        app.clear_focused();
        assert!(app.filters.selected(FilterLevel::Field).is_none());
    }

    #[test]
    fn test_pointer_cells_map_into_globe() {
        let mut app = app(MockApi::astronomy());
        app.install_geo(Ok(adjacent_countries()));
        let area = app.map_area;
        // globe centre cell
        let col = area.x + area.width / 2;
        let row = area.y + area.height / 2;
        app.mouse_move(col, row);
        assert!(app.interaction.pointer_geo.is_some());

        // far corner of the map is off the globe
        app.mouse_move(area.x, area.y);
        assert!(app.interaction.pointer_geo.is_none());

        // leaving the map clears the pointer
        app.mouse_move(area.x + area.width + 2, area.y);
        assert!(app.interaction.pointer.is_none());
    }
}
