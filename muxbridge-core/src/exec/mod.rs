//! One-shot command execution against a server
//!
//! Local servers run commands as subprocesses, remote servers through an
//! SSH exec channel. Both sit behind [`CommandExecutor`].

mod local;
mod mock;
mod remote;
mod traits;
mod verify;

pub use local::LocalExecutor;
pub use mock::{MockExecutor, MockResponse};
pub use remote::SshExecutor;
pub use traits::{CommandExecutor, CommandOutput, ServerExecutor};
pub use verify::{Verification, run_verified};
