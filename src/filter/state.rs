use std::fmt;

use crate::error::FetchResult;
use crate::filter::api::{FieldRecord, FunderRecord, SubfieldRecord, TopicRecord};
use crate::map::ResearchKind;
use crate::present::{DropdownOption, Presenter};

/// The four cascading dropdowns, parent first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterLevel {
    Field,
    Subfield,
    Funder,
    Topic,
}

impl FilterLevel {
    pub const ALL: [FilterLevel; 4] = [
        FilterLevel::Field,
        FilterLevel::Subfield,
        FilterLevel::Funder,
        FilterLevel::Topic,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The level whose options depend on this one
    pub fn next(self) -> Option<FilterLevel> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Marker type for records at this level; fields are never drawn
    pub fn kind(self) -> Option<ResearchKind> {
        match self {
            FilterLevel::Field => None,
            FilterLevel::Subfield => Some(ResearchKind::Subfield),
            FilterLevel::Funder => Some(ResearchKind::Funder),
            FilterLevel::Topic => Some(ResearchKind::Topic),
        }
    }
}

impl fmt::Display for FilterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterLevel::Field => "Field",
            FilterLevel::Subfield => "Subfield",
            FilterLevel::Funder => "Funder",
            FilterLevel::Topic => "Topic",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountUnit {
    Funders,
    Works,
}

/// One selectable record at a filter level
#[derive(Clone, Debug, PartialEq)]
pub struct FilterOption {
    pub id: String,
    pub name: String,
    /// Number shown in the dropdown label
    pub count: u64,
    pub unit: CountUnit,
    /// Research-work count that sizes the marker
    pub metric: u64,
    pub record: serde_json::Value,
}

impl FilterOption {
    /// "<name> (N funders)" or "<name> (N works)"
    pub fn label(&self) -> String {
        let unit = match self.unit {
            CountUnit::Funders => "funders",
            CountUnit::Works => "works",
        };
        format!("{} ({} {})", self.name, self.count, unit)
    }
}

fn to_record<T: serde::Serialize>(record: &T) -> serde_json::Value {
    serde_json::to_value(record).unwrap_or(serde_json::Value::Null)
}

impl From<FieldRecord> for FilterOption {
    fn from(r: FieldRecord) -> Self {
        Self {
            record: to_record(&r),
            count: r.total_funders,
            unit: CountUnit::Funders,
            metric: r.total_works,
            id: r.id,
            name: r.name,
        }
    }
}

impl From<SubfieldRecord> for FilterOption {
    fn from(r: SubfieldRecord) -> Self {
        Self {
            record: to_record(&r),
            count: r.funder_count,
            unit: CountUnit::Funders,
            metric: r.works_count,
            id: r.id,
            name: r.name,
        }
    }
}

impl From<FunderRecord> for FilterOption {
    fn from(r: FunderRecord) -> Self {
        Self {
            record: to_record(&r),
            count: r.works_count,
            unit: CountUnit::Works,
            metric: r.works_count,
            id: r.id,
            name: r.name,
        }
    }
}

impl From<TopicRecord> for FilterOption {
    fn from(r: TopicRecord) -> Self {
        Self {
            record: to_record(&r),
            count: r.works_count,
            unit: CountUnit::Works,
            metric: r.works_count,
            id: r.id,
            name: r.name,
        }
    }
}

/// Dropdown state for one level
#[derive(Clone, Debug, Default)]
pub struct LevelState {
    pub options: Vec<FilterOption>,
    pub selected: Option<String>,
    pub enabled: bool,
    /// Bumped whenever the options at this level are invalidated
    pub generation: u64,
    pub loading: bool,
}

/// Parameters of a dependent option fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    Fields,
    Subfields { field_id: String },
    Funders { subfield_id: String },
    Topics { funder_id: String, subfield_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub level: FilterLevel,
    pub generation: u64,
    pub query: Query,
}

#[derive(Debug)]
pub struct FetchResponse {
    pub level: FilterLevel,
    pub generation: u64,
    pub result: FetchResult<Vec<FilterOption>>,
}

/// Selections and option lists of the cascading filter
#[derive(Clone, Debug)]
pub struct FilterState {
    levels: [LevelState; 4],
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterState {
    pub fn new() -> Self {
        let mut levels: [LevelState; 4] = Default::default();
        levels[0].enabled = true;
        Self { levels }
    }

    pub fn level(&self, level: FilterLevel) -> &LevelState {
        &self.levels[level.index()]
    }

    pub fn selected(&self, level: FilterLevel) -> Option<&str> {
        self.level(level).selected.as_deref()
    }

    pub fn selected_option(&self, level: FilterLevel) -> Option<&FilterOption> {
        let state = self.level(level);
        let id = state.selected.as_deref()?;
        state.options.iter().find(|o| o.id == id)
    }

    /// Lowest level that currently has a selection
    pub fn deepest_selected(&self) -> Option<FilterLevel> {
        FilterLevel::ALL
            .iter()
            .rev()
            .copied()
            .find(|&l| self.level(l).selected.is_some())
    }

    /// Request for the root option list
    pub fn initial_request(&mut self) -> FetchRequest {
        let field = &mut self.levels[0];
        field.generation += 1;
        field.loading = true;
        FetchRequest {
            level: FilterLevel::Field,
            generation: field.generation,
            query: Query::Fields,
        }
    }

    /// Change the selection at `level` (`None` clears it). Every lower level is
    /// emptied, disabled and its pending fetch invalidated. Returns the fetch
    /// for the next level when there is a new selection to drill into.
    pub fn select(&mut self, level: FilterLevel, id: Option<&str>) -> Option<FetchRequest> {
        let state = &self.levels[level.index()];
        if let Some(id) = id {
            if !state.enabled || !state.options.iter().any(|o| o.id == id) {
                tracing::warn!("ignoring selection of unknown {level} option {id:?}");
                return None;
            }
        }

        self.levels[level.index()].selected = id.map(str::to_string);
        for lower in &mut self.levels[level.index() + 1..] {
            lower.options.clear();
            lower.selected = None;
            lower.enabled = false;
            lower.loading = false;
            lower.generation += 1;
        }

        let id = id?.to_string();
        let next = level.next()?;
        let query = match next {
            FilterLevel::Field => return None,
            FilterLevel::Subfield => Query::Subfields { field_id: id },
            FilterLevel::Funder => Query::Funders { subfield_id: id },
            FilterLevel::Topic => Query::Topics {
                funder_id: id,
                subfield_id: self.selected(FilterLevel::Subfield)?.to_string(),
            },
        };

        let target = &mut self.levels[next.index()];
        target.loading = true;
        Some(FetchRequest {
            level: next,
            generation: target.generation,
            query,
        })
    }

    /// Install a fetch result. Responses for an invalidated generation are
    /// dropped and `false` is returned.
    pub fn apply_response(&mut self, response: FetchResponse) -> bool {
        let level = response.level;
        let state = &mut self.levels[level.index()];
        if response.generation != state.generation {
            tracing::debug!(
                "discarding stale {level} options (generation {} != {})",
                response.generation,
                state.generation
            );
            return false;
        }

        state.loading = false;
        match response.result {
            Ok(options) => {
                tracing::info!("loaded {} {level} options", options.len());
                state.enabled = !options.is_empty();
                state.options = options;
            }
            Err(err) => {
                tracing::warn!("failed to load {level} options: {err}");
                state.options.clear();
                state.enabled = false;
            }
        }
        true
    }

    /// Clear every selection; the root option list is kept
    pub fn reset(&mut self) {
        self.select(FilterLevel::Field, None);
    }

    /// Push every dropdown to the presenter
    pub fn present(&self, presenter: &mut dyn Presenter) {
        for level in FilterLevel::ALL {
            let state = self.level(level);
            let options: Vec<DropdownOption> = state
                .options
                .iter()
                .map(|o| DropdownOption {
                    id: o.id.clone(),
                    label: o.label(),
                })
                .collect();
            presenter.set_dropdown_options(level, &options, state.enabled);
        }
    }
}
