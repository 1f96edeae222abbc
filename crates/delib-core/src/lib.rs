mod batch;
mod config;
mod deal;
mod error;
mod normalize;
mod pipeline;
mod record;
mod session;
mod sink;
mod trajectory;

pub use batch::{BatchSummary, SessionFailure};
pub use config::{
    AgentProfile, AgentRoster, CategoryShape, DealShape, Strategy, load_agent_config,
    load_deal_shape, parse_agent_config,
};
pub use deal::{DealItem, DealOutcome, DealParseError, DealProposal, parse_deal};
pub use error::CoreError;
pub use normalize::normalize;
pub use pipeline::{Pipeline, PipelineConfig};
pub use record::CanonicalRecord;
pub use session::{Session, session_id_from_path};
pub use sink::{IngestSink, JsonlExporter};
pub use trajectory::{Round, parse_trajectory};
