mod compare;
mod engine;
mod types;

pub use compare::{
    CommonParams, DEFAULT_COMMON_TEXT_WIDTH, DisplayedDifference, ScenarioDiff, compare,
    describe_differences, format_common_text, format_value,
};
pub use engine::project;
pub use types::{FieldKind, ParamValue, Scenario, ScenarioField, Trajectory, TrajectoryPoint};
