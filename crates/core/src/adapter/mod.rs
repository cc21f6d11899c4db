mod local;
mod remote;

pub use local::LocalReplyService;
pub use remote::RemoteReplyService;

use crate::config::{OracleConfig, OracleMode, StardustConfigError};
use crate::reply::ReplyService;

/// Select the reply backend once, at construction time. Remote when the
/// configured mode is `remote` (alias `real`), local otherwise.
pub fn get_reply_service(
    config: &OracleConfig,
) -> Result<Box<dyn ReplyService>, StardustConfigError> {
    match config.mode {
        OracleMode::Remote => Ok(Box::new(RemoteReplyService::new(config)?)),
        OracleMode::Local => Ok(Box::new(LocalReplyService::new())),
    }
}
