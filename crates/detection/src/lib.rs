pub mod alerts;
pub mod block_store;
pub mod campaign_store;
pub mod decision;
pub mod enforcement;
pub mod event;
pub mod event_log;
pub mod processor;
pub mod risk_engine;
pub mod rules;
pub mod settings_store;
pub mod signals;
pub mod state;
pub mod window;

pub use alerts::{AlertManager, AlertPayload, Severity};
pub use block_store::{BlockRecord, BlockSource, BlockStore};
pub use campaign_store::{Campaign, CampaignStore};
pub use decision::{Decision, DecisionOutcome, DecisionPolicy};
pub use enforcement::{EnforcementBridge, EnforcementResult};
pub use event::{ingest, AuthEvent, Endpoint, FailureReason, Method, Outcome, RawAuthEvent};
pub use event_log::{EventLog, EventLogRecord};
pub use processor::{process_event, Application, EnforcementRecord, EnforcementTelemetry, ProcessingResult};
pub use risk_engine::RiskEngine;
pub use rules::{Rule, RulesTable};
pub use settings_store::{RuntimeSettings, SettingsStore};
pub use signals::{EntityType, SignalTrigger};
pub use state::StateStore;
pub use window::SlidingWindow;
