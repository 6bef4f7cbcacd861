use std::collections::BTreeMap;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use super::types::{FieldKind, ParamValue, Scenario, ScenarioField};

pub const DEFAULT_COMMON_TEXT_WIDTH: usize = 120;

const COMMON_TEXT_PREFIX: &str = "Common among visible curves: ";
const NO_COMMON_TEXT: &str = "No common parameters. All differ!";

/// Parameters whose value is identical across every scenario in a set.
pub type CommonParams = BTreeMap<ScenarioField, ParamValue>;

/// One scenario's label plus every parameter that is not common to the set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDiff {
    pub label: String,
    pub params: BTreeMap<ScenarioField, ParamValue>,
}

impl ScenarioDiff {
    pub fn get(&self, field: ScenarioField) -> Option<ParamValue> {
        self.params.get(&field).copied()
    }

    pub fn differing_fields(&self) -> impl Iterator<Item = ScenarioField> + '_ {
        self.params.keys().copied()
    }
}

// Flat on the wire: {"label": "...", "annual_return_investment": 0.07}
impl Serialize for ScenarioDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len() + 1))?;
        map.serialize_entry("label", &self.label)?;
        for (field, value) in &self.params {
            map.serialize_entry(field.name(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayedDifference {
    pub field: ScenarioField,
    pub title: String,
    pub value: String,
}

/// Splits the parameters of `scenarios` into those shared by all of them and,
/// per scenario, those that are not.
///
/// Values are compared exactly. Two floats one ulp apart are different, and a NaN
/// parameter differs from everything once there is more than one scenario.
pub fn compare(scenarios: &[Scenario]) -> (CommonParams, Vec<ScenarioDiff>) {
    let Some((first, rest)) = scenarios.split_first() else {
        return (CommonParams::new(), Vec::new());
    };

    let mut common = CommonParams::new();
    for field in ScenarioField::ALL {
        let reference = first.value(field);
        if rest.iter().all(|scenario| scenario.value(field) == reference) {
            common.insert(field, reference);
        }
    }

    let diffs = scenarios
        .iter()
        .map(|scenario| ScenarioDiff {
            label: scenario.label.clone(),
            params: scenario
                .parameters()
                .filter(|(field, _)| !common.contains_key(field))
                .collect(),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        scenarios = scenarios.len(),
        common = common.len(),
        "compared scenario parameters"
    );

    (common, diffs)
}

/// Percent-kind parameters render as `3.0%`; everything else as its plain value.
pub fn format_value(field: ScenarioField, value: ParamValue) -> String {
    match field.kind() {
        FieldKind::Percent => format!("{:.1}%", value.as_f64() * 100.0),
        FieldKind::Money | FieldKind::Count => value.to_string(),
    }
}

/// One-paragraph summary of the shared parameters, sorted by name and wrapped to
/// `max_chars` per line. Inflation is never listed, so a set sharing only
/// inflation has nothing in common to show.
pub fn format_common_text(common: &CommonParams, max_chars: usize) -> String {
    let mut shown = common
        .iter()
        .filter(|(field, _)| field.is_displayed())
        .collect::<Vec<_>>();
    if shown.is_empty() {
        return NO_COMMON_TEXT.to_string();
    }
    shown.sort_by_key(|(field, _)| field.name());
    let items = shown
        .into_iter()
        .map(|(field, value)| format!("{}={}", field.name(), format_value(*field, *value)))
        .collect::<Vec<_>>();

    let full_line = format!("{COMMON_TEXT_PREFIX}{}", items.join(", "));
    if full_line.len() <= max_chars {
        return full_line;
    }

    let mut lines = vec![COMMON_TEXT_PREFIX.trim_end().to_string()];
    let mut current = String::new();
    for item in items {
        let proposed = if current.is_empty() {
            item.clone()
        } else {
            format!("{current}, {item}")
        };
        if proposed.len() > max_chars && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, item));
        } else {
            current = proposed;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// The displayed differences of one scenario, in field order. Empty means the
/// scenario has nothing that sets it apart.
pub fn describe_differences(diff: &ScenarioDiff) -> Vec<DisplayedDifference> {
    diff.params
        .iter()
        .filter(|(field, _)| field.is_displayed())
        .map(|(field, value)| DisplayedDifference {
            field: *field,
            title: field.title(),
            value: format_value(*field, *value),
        })
        .collect()
}
