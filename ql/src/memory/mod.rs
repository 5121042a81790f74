//! Session memory: the rolling context window, the world-state document and the plan

mod plan;
mod session;
mod world;

pub use plan::{MAX_GOALS, Plan};
pub use session::{CompactionOutcome, INITIAL_SUMMARY, SessionMemory};
pub use world::{LocationInfo, MAX_LIST_LEN, MAX_TEXT_LEN, StateError, WorldState, WorldStatePatch};
