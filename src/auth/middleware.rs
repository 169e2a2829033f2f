//! Authentication for incoming requests.

use crate::config::Config;
use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult};

use super::shared_key::validate_shared_key;

/// Authentication result containing the authenticated account.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub account: String,
    pub is_anonymous: bool,
}

/// Authenticates a request.
///
/// A request carrying an `Authorization` header must be correctly signed.
/// Unsigned requests to a known account pass unless `require_auth` is set.
pub fn authenticate(ctx: &RequestContext, config: &Config) -> StorageResult<AuthResult> {
    if ctx.header("authorization").is_some() {
        validate_shared_key(ctx, config)?;
        return Ok(AuthResult {
            account: ctx.account.clone(),
            is_anonymous: false,
        });
    }

    if !config.require_auth && config.get_account_key(&ctx.account).is_some() {
        return Ok(AuthResult {
            account: ctx.account.clone(),
            is_anonymous: true,
        });
    }

    Err(StorageError::new(ErrorCode::AuthenticationFailed))
}
