//! Chain-of-trust evaluation from the root anchor down to a target name.

pub mod aggregate;
pub mod consistency;
pub mod model;
pub mod walker;
pub mod zone;

pub use consistency::{ConsistencyChecker, ConsistencyReport, ServerResponse};
pub use model::{ChainResult, Evidence, TrustStatus, ZoneVerdict};
pub use walker::ChainWalker;
pub use zone::{Delegation, HopOutcome, KeyState, ZoneEvaluator};
