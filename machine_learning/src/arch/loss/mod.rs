mod actor_critic;
mod discount;
mod segment;

pub use actor_critic::{ActorCriticLoss, Cost, CostGrad, Targets};
pub use discount::discount;
pub use segment::{Segment, SegmentBuilder};
