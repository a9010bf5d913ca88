pub mod config;
pub mod endpoint;
pub mod error;
pub mod network;
pub mod report;
pub mod reputation;

pub use config::{ProtocolConfig, SimulationConfig, SondeConfig};
pub use endpoint::{PeerEndpoint, ProcessEndpoint, ReputationEntry};
pub use error::Error;
pub use error::SondeResult as Result;
pub use network::{Network, SimPeer};
pub use report::{NetworkReport, PingStats, ReputationMatrix};
pub use reputation::{PeerId, PingOutcome, RatingLedger, RatingRecord};
