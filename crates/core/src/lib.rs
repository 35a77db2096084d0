pub mod config;
pub mod directory;
pub mod orchestrator;
pub mod provider;
pub mod stats;
pub mod testing;
pub mod verifier;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, DirectoryConfig, DrillConfig, ProviderConfig, SanitizedConfig,
};
pub use directory::{
    collect_users, CollectedUsers, DirectoryError, DirectoryUser, OktaDirectory, UserDirectory,
    UserPage, UserRecord,
};
pub use orchestrator::{DrillOrchestrator, DrillReport, OrchestratorError, UserResult};
pub use provider::{
    Factor, FactorType, IdentityProvider, OktaProvider, PollReference, ProviderError,
    PushChallenge, PushInitiation, PushStatus,
};
pub use stats::{StatLabel, StatsAggregator, StatsTable, UNKNOWN_REGION};
pub use verifier::{
    cancel_pair, CancelHandle, CancelSignal, Outcome, PollTimer, PushVerifier, TokioTimer,
    VerifierSettings, VerifyError,
};
