use crate::color::Rgb;
use crate::map::camera::Camera;
use crate::map::pick::{pick, ray_sphere, Pick};
use crate::map::projection::{unproject, GLOBE_RADIUS};
use crate::map::registry::{Country, CountryRegistry};
use crate::map::scene::{Marker, Scene};
use crate::present::{CursorStyle, InfoPanel, Presenter};

/// Pointer travel in pixels that turns a press into a drag
pub const DRAG_THRESHOLD: f64 = 5.0;
/// Radians of rotation per pixel of drag
pub const DRAG_SENSITIVITY: f64 = 0.01;
pub const HOVER_OPACITY: f64 = 0.2;
/// Fills at or above this are already highlighted and left alone on hover
const HOVER_CEILING: f64 = 0.3;
pub const SELECT_FILL_OPACITY: f64 = 0.4;
pub const SELECT_BORDER_OPACITY: f64 = 1.0;

/// Everything the engine reads or writes while handling one event
pub struct InteractionContext<'a> {
    pub scene: &'a mut Scene,
    pub camera: &'a mut Camera,
    pub registry: &'a CountryRegistry,
    pub presenter: &'a mut dyn Presenter,
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    start: (i32, i32),
    last: (i32, i32),
    moved: bool,
}

/// Hover/selection slots and drag tracking
#[derive(Debug, Default)]
pub struct Interaction {
    pub hovered: Option<String>,
    pub selected: Option<String>,
    /// Last pointer position in braille pixels
    pub pointer: Option<(i32, i32)>,
    /// Geographic position under the pointer, when it is over the globe
    pub pointer_geo: Option<(f64, f64)>,
    drag: Option<Drag>,
}

fn distance(a: (i32, i32), b: (i32, i32)) -> f64 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Character cell containing a braille pixel
fn cell_of(px: i32, py: i32) -> (u16, u16) {
    ((px.max(0) / 2) as u16, (py.max(0) / 4) as u16)
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a press has travelled past the drag threshold
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some_and(|d| d.moved)
    }

    pub fn pointer_down(&mut self, px: i32, py: i32) {
        self.pointer = Some((px, py));
        self.drag = Some(Drag {
            start: (px, py),
            last: (px, py),
            moved: false,
        });
    }

    pub fn pointer_move(&mut self, ctx: &mut InteractionContext<'_>, px: i32, py: i32) {
        self.pointer = Some((px, py));

        if let Some(drag) = self.drag.as_mut() {
            if !drag.moved && distance(drag.start, (px, py)) > DRAG_THRESHOLD {
                drag.moved = true;
            }
            if drag.moved {
                let dx = (px - drag.last.0) as f64;
                let dy = (py - drag.last.1) as f64;
                ctx.camera.rotate(dx * DRAG_SENSITIVITY, dy * DRAG_SENSITIVITY);
                ctx.presenter.set_cursor(CursorStyle::Grabbing);
                ctx.presenter.hide_tooltip();
            }
            drag.last = (px, py);
            return;
        }

        self.hover(ctx, px, py);
    }

    /// End a press. A press that never became a drag is a click; its pick
    /// result is returned.
    pub fn pointer_up(&mut self, ctx: &mut InteractionContext<'_>, px: i32, py: i32) -> Option<Pick> {
        self.pointer = Some((px, py));
        let drag = self.drag.take()?;

        let result = if !drag.moved && distance(drag.start, (px, py)) < DRAG_THRESHOLD {
            Some(self.click(ctx, px, py))
        } else {
            None
        };
        self.hover(ctx, px, py);
        result
    }

    /// Pointer left the globe area
    pub fn pointer_leave(&mut self, ctx: &mut InteractionContext<'_>) {
        self.pointer = None;
        self.pointer_geo = None;
        self.drag = None;
        self.clear_hover(ctx.scene);
        ctx.presenter.hide_tooltip();
        ctx.presenter.set_cursor(CursorStyle::Default);
    }

    pub fn wheel(&mut self, camera: &mut Camera, zoom_in: bool) {
        if zoom_in {
            camera.zoom_in();
        } else {
            camera.zoom_out();
        }
    }

    fn hover(&mut self, ctx: &mut InteractionContext<'_>, px: i32, py: i32) {
        let ray = ctx.camera.local_ray(px, py);
        self.pointer_geo = ray_sphere(&ray, glam::DVec3::ZERO, GLOBE_RADIUS).map(|t| unproject(ray.at(t)));

        match pick(ctx.scene, &ray) {
            Pick::Marker(idx) => {
                self.clear_hover(ctx.scene);
                if let Some(marker) = ctx.scene.markers.get(idx) {
                    ctx.presenter.show_tooltip(&marker.tooltip(), cell_of(px, py));
                }
                ctx.presenter.set_cursor(CursorStyle::Pointer);
            }
            Pick::Country(id) => {
                if self.hovered.as_deref() != Some(id.as_str()) {
                    self.clear_hover(ctx.scene);
                    if ctx.scene.fill_opacity(&id).is_some_and(|o| o < HOVER_CEILING) {
                        let color = ctx.registry.get(&id).map_or(Rgb::WHITE, |c| c.color);
                        ctx.scene.set_fill(&id, HOVER_OPACITY, color);
                    }
                    self.hovered = Some(id.clone());
                }
                let name = ctx.registry.get(&id).map_or(id.as_str(), |c| c.name.as_str());
                ctx.presenter.show_tooltip(name, cell_of(px, py));
                ctx.presenter.set_cursor(CursorStyle::Pointer);
            }
            Pick::Globe => {
                self.clear_hover(ctx.scene);
                ctx.presenter.hide_tooltip();
                ctx.presenter.set_cursor(CursorStyle::Grab);
            }
            Pick::Empty => {
                self.clear_hover(ctx.scene);
                ctx.presenter.hide_tooltip();
                ctx.presenter.set_cursor(CursorStyle::Default);
            }
        }
    }

    /// Drop the hover highlight; the selected country keeps its own
    fn clear_hover(&mut self, scene: &mut Scene) {
        if let Some(id) = self.hovered.take() {
            if self.selected.as_deref() != Some(id.as_str()) {
                scene.reset_fill(&id);
            }
        }
    }

    /// Priority hit test at a pixel, acting on whatever was hit
    pub fn click(&mut self, ctx: &mut InteractionContext<'_>, px: i32, py: i32) -> Pick {
        let ray = ctx.camera.local_ray(px, py);
        let hit = pick(ctx.scene, &ray);
        match &hit {
            Pick::Marker(idx) => {
                if let Some(marker) = ctx.scene.markers.get(*idx) {
                    tracing::debug!("clicked marker {}", marker.label);
                    ctx.presenter.show_info_panel(marker_panel(marker));
                }
            }
            Pick::Country(id) => self.select(ctx, id),
            Pick::Globe | Pick::Empty => {}
        }
        hit
    }

    /// Make `id` the selected country, reverting the previous one
    pub fn select(&mut self, ctx: &mut InteractionContext<'_>, id: &str) {
        self.revert_selection(ctx.scene);

        ctx.scene.set_fill(id, SELECT_FILL_OPACITY, Rgb::WHITE);
        ctx.scene.emphasize_borders(id, Rgb::WHITE, SELECT_BORDER_OPACITY);
        self.selected = Some(id.to_string());

        match ctx.registry.get(id) {
            Some(country) => {
                tracing::info!("selected {} ({})", country.name, country.id);
                ctx.presenter.show_info_panel(country_panel(country));
            }
            None => tracing::warn!("selected unregistered country {id:?}"),
        }
    }

    /// Clear the selection and close the info panel
    pub fn deselect(&mut self, ctx: &mut InteractionContext<'_>) {
        self.revert_selection(ctx.scene);
        ctx.presenter.hide_info_panel();
    }

    fn revert_selection(&mut self, scene: &mut Scene) {
        if let Some(prev) = self.selected.take() {
            scene.reset_fill(&prev);
            scene.reset_borders(&prev);
            if self.hovered.as_deref() == Some(prev.as_str()) {
                self.hovered = None;
            }
        }
    }
}

/// 1234567 -> "1,234,567"
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn country_panel(country: &Country) -> InfoPanel {
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    InfoPanel {
        title: country.name.clone(),
        rows: vec![
            ("Code".into(), or_dash(&country.code)),
            ("Region".into(), or_dash(&country.region)),
            ("Subregion".into(), or_dash(&country.subregion)),
            ("Population".into(), group_thousands(country.population)),
            ("GDP".into(), format!("${:.1}B", country.gdp_billions)),
        ],
    }
}

pub fn marker_panel(marker: &Marker) -> InfoPanel {
    let mut rows = Vec::new();
    if let Some(research) = &marker.research {
        rows.push(("Type".to_string(), research.kind.to_string()));
        rows.push(("Works".to_string(), group_thousands(research.metric)));
        if let Some(id) = research.record.get("id").or_else(|| research.record.get("topic_id")) {
            let id = id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string());
            rows.push(("ID".to_string(), id));
        }
    }
    rows.push(("Location".to_string(), format!("{:.2}, {:.2}", marker.lat, marker.lon)));
    InfoPanel {
        title: marker.label.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::projection::{project, FILL_RADIUS};
    use crate::map::shape::{build_shape, Geometry};
    use crate::present::ViewState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    struct Fixture {
        scene: Scene,
        camera: Camera,
        registry: CountryRegistry,
        view: ViewState,
        interaction: Interaction,
    }

    impl Fixture {
        /// Two squares facing the camera that share the lon = -90 edge. Both
        /// rings start on the shared corner.
        fn adjacent() -> Self {
            let mut rng = StdRng::seed_from_u64(5);
            let mut registry = CountryRegistry::new();
            let mut scene = Scene::new();

            let rings = [
                (json!({"ISO_A3": "AAA", "NAME": "Aland"}), vec![(-90.0, -5.0), (-90.0, 5.0), (-100.0, 5.0), (-100.0, -5.0), (-90.0, -5.0)]),
                (json!({"ISO_A3": "BBB", "NAME": "Bland"}), vec![(-90.0, -5.0), (-80.0, -5.0), (-80.0, 5.0), (-90.0, 5.0), (-90.0, -5.0)]),
            ];
            for (props, ring) in rings {
                let props = props.as_object().cloned().unwrap_or_default();
                let id = registry.register(&props, None, &mut rng);
                let country = registry.get(&id).unwrap().clone();
                scene.add_country_shape(&country, build_shape(&Geometry::Polygon(vec![ring])));
            }

            Self {
                scene,
                camera: Camera::new(200, 200),
                registry,
                view: ViewState::new(),
                interaction: Interaction::new(),
            }
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

        fn pixel(&self, lat: f64, lon: f64) -> (i32, i32) {
            self.camera.project_local(project(lat, lon, FILL_RADIUS)).unwrap()
        }

        fn move_to(&mut self, p: (i32, i32)) {
            let (mut ctx, interaction) = self.ctx();
            interaction.pointer_move(&mut ctx, p.0, p.1);
        }

        fn click_at(&mut self, p: (i32, i32)) -> Option<Pick> {
            let (mut ctx, interaction) = self.ctx();
            interaction.pointer_down(p.0, p.1);
            interaction.pointer_up(&mut ctx, p.0, p.1)
        }
    }

    // points chosen off the fan diagonals of both squares
    const IN_A: (f64, f64) = (2.0, -93.0);
    const IN_B: (f64, f64) = (-2.0, -85.0);

    #[test]
    fn test_rings_sharing_start_corner_collapse() {
        let f = Fixture::adjacent();
        assert_eq!(f.scene.meshes.len(), 2);
        assert_eq!(f.scene.borders.len(), 1);
        assert_eq!(f.scene.borders[0].country, "aaa");
    }

    #[test]
    fn test_click_selects_and_reverts() {
        let mut f = Fixture::adjacent();
        let a = f.pixel(IN_A.0, IN_A.1);
        let b = f.pixel(IN_B.0, IN_B.1);

        assert_eq!(f.click_at(a), Some(Pick::Country("aaa".into())));
        assert_eq!(f.interaction.selected.as_deref(), Some("aaa"));
        assert_eq!(f.scene.fill_opacity("aaa"), Some(SELECT_FILL_OPACITY));
        assert!(f.scene.borders[0].emphasized);
        assert_eq!(f.view.info.as_ref().unwrap().title, "Aland");

        assert_eq!(f.click_at(b), Some(Pick::Country("bbb".into())));
        assert_eq!(f.interaction.selected.as_deref(), Some("bbb"));
        assert_eq!(f.scene.fill_opacity("aaa"), Some(0.0));
        assert_eq!(f.scene.fill_opacity("bbb"), Some(SELECT_FILL_OPACITY));
        assert!(!f.scene.borders[0].emphasized);
        assert_eq!(f.scene.borders[0].color, f.registry.get("aaa").unwrap().color);
    }

    #[test]
    fn test_hover_never_dims_selection() {
        let mut f = Fixture::adjacent();
        let a = f.pixel(IN_A.0, IN_A.1);
        let b = f.pixel(IN_B.0, IN_B.1);
        f.click_at(a);

        f.move_to(a);
        assert_eq!(f.interaction.hovered.as_deref(), Some("aaa"));
        assert_eq!(f.scene.fill_opacity("aaa"), Some(SELECT_FILL_OPACITY));

        f.move_to(b);
        assert_eq!(f.scene.fill_opacity("aaa"), Some(SELECT_FILL_OPACITY));
        assert_eq!(f.scene.fill_opacity("bbb"), Some(HOVER_OPACITY));
        assert_eq!(f.view.tooltip.as_ref().unwrap().0, "Bland");

        f.move_to((0, 0));
        assert_eq!(f.scene.fill_opacity("bbb"), Some(0.0));
        assert!(f.interaction.hovered.is_none());
        assert!(f.view.tooltip.is_none());
        assert_eq!(f.view.cursor, CursorStyle::Default);
    }

    #[test]
    fn test_cursor_over_bare_globe() {
        let mut f = Fixture::adjacent();
        let ocean = f.pixel(-40.0, -90.0);
        f.move_to(ocean);
        assert_eq!(f.view.cursor, CursorStyle::Grab);
        let (lat, lon) = f.interaction.pointer_geo.unwrap();
        assert!((lat + 40.0).abs() < 2.0);
        assert!((lon + 90.0).abs() < 2.0);
    }

    #[test]
    fn test_drag_threshold() {
        let mut f = Fixture::adjacent();
        let a = f.pixel(IN_A.0, IN_A.1);
        {
            let (mut ctx, interaction) = f.ctx();
            interaction.pointer_down(a.0, a.1);
            interaction.pointer_move(&mut ctx, a.0 + 3, a.1);
            assert!(!interaction.is_dragging());
            assert_eq!(ctx.camera.rotation_y, 0.0);

            interaction.pointer_move(&mut ctx, a.0 + 10, a.1);
            assert!(interaction.is_dragging());
            assert!((ctx.camera.rotation_y - 7.0 * DRAG_SENSITIVITY).abs() < 1e-12);
        }
        assert_eq!(f.view.cursor, CursorStyle::Grabbing);

        // released after a drag: no click
        let (mut ctx, interaction) = f.ctx();
        assert!(interaction.pointer_up(&mut ctx, a.0 + 10, a.1).is_none());
        assert!(interaction.selected.is_none());
    }

    #[test]
    fn test_small_wobble_still_clicks() {
        let mut f = Fixture::adjacent();
        let a = f.pixel(IN_A.0, IN_A.1);
        let (mut ctx, interaction) = f.ctx();
        interaction.pointer_down(a.0, a.1);
        interaction.pointer_move(&mut ctx, a.0 + 1, a.1 + 1);
        let hit = interaction.pointer_up(&mut ctx, a.0 + 1, a.1 + 1);
        assert_eq!(hit, Some(Pick::Country("aaa".into())));
    }

    #[test]
    fn test_marker_tooltip_and_panel() {
        let mut f = Fixture::adjacent();
        f.scene.set_markers(vec![Marker::new(20.0, -90.0, "Boston", Rgb::WHITE, 3.0)]);
        let m = f.camera.project_local(f.scene.markers[0].position()).unwrap();

        f.move_to(m);
        assert_eq!(f.view.tooltip.as_ref().unwrap().0, "Boston");
        assert_eq!(f.view.cursor, CursorStyle::Pointer);

        assert_eq!(f.click_at(m), Some(Pick::Marker(0)));
        assert_eq!(f.view.info.as_ref().unwrap().title, "Boston");
        assert!(f.interaction.selected.is_none());
    }

    #[test]
    fn test_deselect() {
        let mut f = Fixture::adjacent();
        let a = f.pixel(IN_A.0, IN_A.1);
        f.click_at(a);
        let (mut ctx, interaction) = f.ctx();
        interaction.deselect(&mut ctx);
        assert!(interaction.selected.is_none());
        assert!(f.view.info.is_none());
        assert_eq!(f.scene.fill_opacity("aaa"), Some(0.0));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
