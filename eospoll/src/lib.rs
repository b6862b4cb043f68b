//! # eospoll
//!
//! Async Arista EOS CLI session control and device fact normalization.
//!
//! eospoll drives an interactive EOS CLI over SSH, recognizing prompts and
//! error messages in the raw character stream, and turns the JSON replies of
//! a fixed set of `show` commands into a stable fact schema.
//!
//! ## Features
//!
//! - Async SSH PTY sessions via russh
//! - Ordered, first-match-wins prompt and error pattern sets with substring exclusions
//! - Privilege escalation (`enable`) and de-escalation driven by the prompt
//! - Per-command deadlines
//! - Fact gathering with `gather_subset` semantics and lenient JSON parsing
//! - Configuration push with check mode, backup and save
//! - Concurrent polling of many devices
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eospoll::{Driver, SessionBuilder, gather_facts};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), eospoll::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .connect()
//!         .await?;
//!
//!     session.escalate(None).await?;
//!     let gathered = gather_facts(&mut session, &["all"]).await?;
//!     println!("{:?}", gathered.facts.get("interfaces"));
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod facts;
pub mod platform;
pub mod poller;
pub mod transport;

// Re-export main types for convenience
pub use driver::{
    ConfigRequest, Driver, PromptedCommand, PushResult, Response, Session, SessionBuilder,
    SessionState, UpdateMode, push_config,
};
pub use error::{Error, Result};
pub use facts::{DeviceFacts, FactGatherer, FactSubset, GatheredFacts, gather_facts};
pub use platform::{PlatformDefinition, PrivilegeMode};
pub use poller::{DeviceTarget, FleetPoller, PollOutcome};
pub use transport::{Credentials, HostKeyPolicy, SshLogin, Transport};
