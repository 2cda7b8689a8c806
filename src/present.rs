use crate::color::Rgb;
use crate::filter::FilterLevel;

/// Pointer cursor the globe is asking for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorStyle {
    #[default]
    Default,
    Grab,
    Grabbing,
    Pointer,
}

impl CursorStyle {
    /// Glyph drawn at the pointer position
    pub fn glyph(self) -> char {
        match self {
            CursorStyle::Default => '╋',
            CursorStyle::Grab => '✥',
            CursorStyle::Grabbing => '✊',
            CursorStyle::Pointer => '☞',
        }
    }
}

/// Titled key/value panel describing a country or marker
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InfoPanel {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DropdownOption {
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
}

/// Output port of the globe. The interaction engine and filter pipeline only
/// talk to the UI through this trait.
pub trait Presenter {
    /// `at` is the terminal cell the tooltip should sit next to
    fn show_tooltip(&mut self, text: &str, at: (u16, u16));
    fn hide_tooltip(&mut self);
    fn show_info_panel(&mut self, panel: InfoPanel);
    fn hide_info_panel(&mut self);
    fn set_dropdown_options(&mut self, level: FilterLevel, options: &[DropdownOption], enabled: bool);
    fn set_cursor(&mut self, cursor: CursorStyle);
    fn set_legend(&mut self, entries: &[LegendEntry]);
    fn show_status(&mut self, message: &str);
}

/// One dropdown as the UI shows it
#[derive(Clone, Debug, Default)]
pub struct DropdownView {
    pub options: Vec<DropdownOption>,
    pub enabled: bool,
}

/// Retained presentation state, read by the terminal UI each frame
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub tooltip: Option<(String, (u16, u16))>,
    pub info: Option<InfoPanel>,
    pub dropdowns: [DropdownView; 4],
    pub cursor: CursorStyle,
    pub legend: Vec<LegendEntry>,
    pub status: String,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropdown(&self, level: FilterLevel) -> &DropdownView {
        &self.dropdowns[level.index()]
    }
}

impl Presenter for ViewState {
    fn show_tooltip(&mut self, text: &str, at: (u16, u16)) {
        self.tooltip = Some((text.to_string(), at));
    }

    fn hide_tooltip(&mut self) {
        self.tooltip = None;
    }

    fn show_info_panel(&mut self, panel: InfoPanel) {
        self.info = Some(panel);
    }

    fn hide_info_panel(&mut self) {
        self.info = None;
    }

    fn set_dropdown_options(&mut self, level: FilterLevel, options: &[DropdownOption], enabled: bool) {
        self.dropdowns[level.index()] = DropdownView {
            options: options.to_vec(),
            enabled,
        };
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.cursor = cursor;
    }

    fn set_legend(&mut self, entries: &[LegendEntry]) {
        self.legend = entries.to_vec();
    }

    fn show_status(&mut self, message: &str) {
        self.status = message.to_string();
    }
}
