//! Multi-criteria journey planning: a RAPTOR variant over the in-memory
//! schedule with walking transfers and Pareto-optimal alternatives.

mod journey;
mod raptor;

pub use journey::{
    plan_journey, Journey, JourneyAlert, JourneyPlan, JourneySegment, JourneyStop,
    PlanError, PlanRequest,
};
