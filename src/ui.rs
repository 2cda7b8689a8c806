use crate::app::{App, GeoStatus, Mode};
use crate::braille::BrailleCanvas;
use crate::color::Rgb;
use crate::filter::FilterLevel;
use crate::map::GlobeLayers;
use crate::present::{CursorStyle, InfoPanel};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

/// Width of the filter/info side panel in cells
pub const SIDE_PANEL_WIDTH: u16 = 34;
const SEARCH_RESULTS: usize = 10;

/// Screen regions, shared by the renderer and pointer mapping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UiLayout {
    pub map: Rect,
    /// Map area inside its border, where the globe is drawn
    pub map_inner: Rect,
    pub side: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> UiLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map and side panel
            Constraint::Length(1), // Status bar
        ])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(rows[0]);

    UiLayout {
        map: cols[0],
        map_inner: map_block().inner(cols[0]),
        side: cols[1],
        status: rows[1],
    }
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Research Globe ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let regions = layout(frame.area());

    render_globe(frame, app, regions.map);
    render_side_panel(frame, app, regions.side);
    render_status_bar(frame, app, regions.status);

    if app.mode == Mode::Search {
        render_search(frame, app, regions.map_inner);
    }
}

fn render_globe(frame: &mut Frame, app: &App, area: Rect) {
    let block = map_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut camera = app.camera.clone();
    camera.set_size(inner.width as usize * 2, inner.height as usize * 4);
    let layers = app
        .renderer
        .render(&app.scene, &camera, inner.width as usize, inner.height as usize);

    let cursor = app
        .interaction
        .pointer
        .map(|(px, py)| ((px.max(0) / 2) as u16, (py.max(0) / 4) as u16, app.view.cursor));

    frame.render_widget(
        GlobeWidget {
            layers,
            cursor,
            tooltip: app.view.tooltip.clone(),
        },
        inner,
    );
}

/// Braille globe with labels, pointer glyph and tooltip overlaid
struct GlobeWidget {
    layers: GlobeLayers,
    cursor: Option<(u16, u16, CursorStyle)>,
    tooltip: Option<(String, (u16, u16))>,
}

impl GlobeWidget {
    fn render_layer(canvas: &BrailleCanvas, fallback: Color, area: Rect, buf: &mut Buffer) {
        for (col, row, ch, color) in canvas.cells() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            let fg = color.map(to_color).unwrap_or(fallback);
            buf[(area.x + col as u16, area.y + row as u16)].set_char(ch).set_fg(fg);
        }
    }

    fn render_text(text: &str, x: u16, y: u16, style: Style, area: Rect, buf: &mut Buffer) {
        if y >= area.y + area.height {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            let px = x + i as u16;
            if px >= area.x + area.width {
                break;
            }
            buf[(px, y)].set_char(ch).set_style(style);
        }
    }
}

impl Widget for GlobeWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::render_layer(&self.layers.surface, Color::Blue, area, buf);
        Self::render_layer(&self.layers.fills, Color::Gray, area, buf);
        Self::render_layer(&self.layers.borders, Color::White, area, buf);
        Self::render_layer(&self.layers.overlay, Color::Yellow, area, buf);

        let label_style = Style::default().fg(Color::White);
        for (lx, ly, text) in &self.layers.labels {
            if *lx >= area.width || *ly >= area.height {
                continue;
            }
            let text: String = text.chars().take(24).collect();
            Self::render_text(&text, area.x + lx, area.y + ly, label_style, area, buf);
        }

        if let Some((cx, cy, style)) = self.cursor {
            if cx < area.width && cy < area.height {
                buf[(area.x + cx, area.y + cy)].set_char(style.glyph()).set_fg(Color::Red);
            }
        }

        if let Some((text, (tx, ty))) = &self.tooltip {
            let text = format!(" {text} ");
            let width = text.chars().count() as u16;
            // Right of the pointer, flipped left near the edge
            let x = if tx + 2 + width <= area.width {
                tx + 2
            } else {
                tx.saturating_sub(width + 1)
            };
            let y = (*ty + 1).min(area.height.saturating_sub(1));
            let style = Style::default().fg(Color::Black).bg(Color::Rgb(255, 236, 179));
            Self::render_text(&text, area.x + x, area.y + y, style, area, buf);
        }
    }
}

fn render_side_panel(frame: &mut Frame, app: &App, area: Rect) {
    let legend_height = if app.view.legend.is_empty() {
        0
    } else {
        app.view.legend.len() as u16 + 2
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(FilterLevel::ALL.len() as u16 * 2 + 3), // Filters
            Constraint::Length(legend_height),                         // Legend
            Constraint::Min(3),                                        // Info
            Constraint::Length(7),                                     // Keys
        ])
        .split(area);

    render_filters(frame, app, chunks[0]);
    if legend_height > 0 {
        render_legend(frame, app, chunks[1]);
    }
    render_info(frame, app.view.info.as_ref(), chunks[2]);
    render_help(frame, chunks[3]);
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(format!(" {title} "), Style::default().fg(Color::Cyan)))
}

fn render_filters(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    for level in FilterLevel::ALL {
        let state = app.filters.level(level);
        let view = app.view.dropdown(level);
        let focused = app.focus == level;

        let marker = if focused { "▶ " } else { "  " };
        let title_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if view.enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, title_style),
            Span::styled(level.to_string(), title_style),
            Span::styled(format!(" ({})", view.options.len()), Style::default().fg(Color::DarkGray)),
        ]));

        let (value, style) = if state.loading {
            ("loading...".to_string(), Style::default().fg(Color::Magenta))
        } else if let Some(option) = state
            .selected
            .as_deref()
            .and_then(|id| view.options.iter().find(|o| o.id == id))
        {
            (option.label.clone(), Style::default().fg(Color::Green))
        } else if view.enabled {
            (format!("Select {}...", level.to_string().to_lowercase()), Style::default().fg(Color::Gray))
        } else {
            ("-".to_string(), Style::default().fg(Color::DarkGray))
        };
        lines.push(Line::from(Span::styled(format!("    {value}"), style)));
    }
    lines.push(Line::from(Span::styled(
        " [/]:option x:clear a:apply c:reset",
        Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Paragraph::new(lines).block(panel("Filters")), area);
}

fn render_legend(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .view
        .legend
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(" ● ", Style::default().fg(to_color(entry.color))),
                Span::raw(entry.label.clone()),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(panel("Legend")), area);
}

fn render_info(frame: &mut Frame, info: Option<&InfoPanel>, area: Rect) {
    let Some(info) = info else {
        let hint = Paragraph::new(Span::styled(
            " Click a country or marker",
            Style::default().fg(Color::DarkGray),
        ))
        .block(panel("Info"));
        frame.render_widget(hint, area);
        return;
    };

    let lines: Vec<Line> = info
        .rows
        .iter()
        .map(|(key, value)| {
            Line::from(vec![
                Span::styled(format!(" {key}: "), Style::default().fg(Color::DarkGray)),
                Span::styled(value.clone(), Style::default().fg(Color::White)),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel(&info.title)),
        area,
    );
}

fn render_help(frame: &mut Frame, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let lines = vec![
        Line::from(Span::styled(" drag:rotate wheel:zoom click:select", dim)),
        Line::from(Span::styled(" hjkl/arrows:rotate +/-:zoom", dim)),
        Line::from(Span::styled(" tab:filter /:search esc:close", dim)),
        Line::from(Span::styled(" space:spin g:glow b:border m:markers", dim)),
        Line::from(Span::styled(" r:reset q:quit", dim)),
    ];
    frame.render_widget(Paragraph::new(lines).block(panel("Keys")), area);
}

fn render_search(frame: &mut Frame, app: &App, map: Rect) {
    let results = app.search_results();
    let shown = results.len().min(SEARCH_RESULTS);
    let width = map.width.min(40);
    let height = (shown as u16 + 3).min(map.height);
    let area = Rect::new(map.x + (map.width - width) / 2, map.y + 1, width, height);

    let mut lines = vec![Line::from(vec![
        Span::styled(" / ", Style::default().fg(Color::Yellow)),
        Span::raw(app.search.clone()),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
    ])];
    for (i, country) in results.iter().take(shown).enumerate() {
        let style = if i == 0 {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(format!(" {} ({})", country.name, country.code), style)));
    }

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(panel("Search")), area);
}

fn toggle(on: bool, on_label: &'static str, off_label: &'static str) -> Span<'static> {
    Span::styled(
        if on { on_label } else { off_label },
        Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
    )
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.renderer.settings;
    let dim = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", dim),
        Span::styled(
            app.pointer_coords().unwrap_or_else(|| "--".to_string()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(" | ", dim),
        Span::styled(format!("{:.0} fps", app.clock.fps()), Style::default().fg(Color::Magenta)),
        Span::styled(" | ", dim),
        toggle(app.auto_rotate.enabled, "[S]pin ", "[s]pin "),
        toggle(settings.inner_glow, "[G]low ", "[g]low "),
        toggle(settings.show_borders, "[B]order ", "[b]order "),
        toggle(settings.show_markers, "[M]arkers ", "[m]arkers "),
    ];

    if let Some(country) = app.hovered_country() {
        spans.push(Span::styled("| ", dim));
        spans.push(Span::styled(country.name.clone(), Style::default().fg(Color::White)));
        spans.push(Span::raw(" "));
    }
    if let Some(country) = app.selected_country() {
        spans.push(Span::styled("| ", dim));
        spans.push(Span::styled(
            format!("★ {}", country.name),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
    }

    let status_color = match app.geo_status {
        GeoStatus::Failed => Color::Red,
        GeoStatus::Loading => Color::Magenta,
        _ => Color::Gray,
    };
    if !app.view.status.is_empty() {
        spans.push(Span::styled("| ", dim));
        spans.push(Span::styled(app.view.status.clone(), Style::default().fg(status_color)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
