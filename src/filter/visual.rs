use rand::Rng;

use crate::filter::state::{FilterLevel, FilterOption, FilterState};
use crate::map::{Marker, ResearchKind, ResearchPayload};
use crate::present::LegendEntry;

/// Geographic centre of the contiguous United States
pub const US_CENTER: (f64, f64) = (39.8283, -98.5795);

/// Marker sizing and placement
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerStyle {
    pub min_size: f64,
    pub max_size: f64,
    /// Half-width in degrees of the box markers are scattered in
    pub jitter: f64,
    /// (lat, lon) the box is centred on
    pub center: (f64, f64),
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            min_size: 1.5,
            max_size: 6.0,
            jitter: 8.0,
            center: US_CENTER,
        }
    }
}

/// A record that will become one marker
#[derive(Clone, Debug, PartialEq)]
pub struct VisualItem {
    pub kind: ResearchKind,
    pub name: String,
    pub metric: u64,
    pub record: serde_json::Value,
}

impl VisualItem {
    fn from_option(kind: ResearchKind, option: &FilterOption) -> Self {
        Self {
            kind,
            name: option.name.clone(),
            metric: option.metric,
            record: option.record.clone(),
        }
    }
}

/// Items for the current filter state: every selected subfield/funder/topic,
/// then one per option of the level right below the deepest selection.
pub fn collect_items(state: &FilterState) -> Vec<VisualItem> {
    let mut items = Vec::new();

    for level in FilterLevel::ALL {
        if let (Some(kind), Some(option)) = (level.kind(), state.selected_option(level)) {
            items.push(VisualItem::from_option(kind, option));
        }
    }

    if let Some(below) = state.deepest_selected().and_then(FilterLevel::next) {
        if let Some(kind) = below.kind() {
            items.extend(
                state
                    .level(below)
                    .options
                    .iter()
                    .map(|option| VisualItem::from_option(kind, option)),
            );
        }
    }

    items
}

/// Linear in `metric / max_metric`; an all-zero set gets the minimum size
pub fn marker_size(metric: u64, max_metric: u64, style: &MarkerStyle) -> f64 {
    if max_metric == 0 {
        return style.min_size;
    }
    let t = (metric as f64 / max_metric as f64).clamp(0.0, 1.0);
    style.min_size + (style.max_size - style.min_size) * t
}

/// One marker per item, coloured by type and scattered around the style centre
pub fn build_markers(items: &[VisualItem], style: &MarkerStyle, rng: &mut impl Rng) -> Vec<Marker> {
    let max_metric = items.iter().map(|item| item.metric).max().unwrap_or(0);
    let jitter = style.jitter.max(0.0);

    items
        .iter()
        .map(|item| {
            let (d_lat, d_lon) = if jitter > 0.0 {
                (rng.random_range(-jitter..=jitter), rng.random_range(-jitter..=jitter))
            } else {
                (0.0, 0.0)
            };
            let mut marker = Marker::new(
                style.center.0 + d_lat,
                style.center.1 + d_lon,
                item.name.clone(),
                item.kind.color(),
                marker_size(item.metric, max_metric, style),
            );
            marker.research = Some(ResearchPayload {
                kind: item.kind,
                metric: item.metric,
                record: item.record.clone(),
            });
            marker
        })
        .collect()
}

/// Legend rows for the types present, in a fixed order
pub fn legend(items: &[VisualItem]) -> Vec<LegendEntry> {
    ResearchKind::ALL
        .iter()
        .filter(|kind| items.iter().any(|item| item.kind == **kind))
        .map(|kind| LegendEntry {
            label: kind.to_string(),
            color: kind.color(),
        })
        .collect()
}
