//! Access token issuing for manual testing.

use clap::Args;
use serde::Serialize;

use eventhub_auth::JwtEncoder;
use eventhub_core::error::AppError;
use eventhub_core::types::{UserId, UserRole};

use crate::output::{self, OutputFormat};

/// Arguments for the token command
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// User ID carried in the token
    #[arg(short, long)]
    pub user_id: UserId,
    /// ADMIN, ORGANIZER or USER
    #[arg(short, long, default_value = "USER")]
    pub role: UserRole,
    /// Display name
    #[arg(short, long, default_value = "cli")]
    pub name: String,
    /// Lifetime override in minutes
    #[arg(long)]
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
struct IssuedToken {
    token: String,
    user_id: UserId,
    role: UserRole,
    expires_at: String,
}

/// Execute the token command
pub fn execute(args: &TokenArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;

    let mut encoder = JwtEncoder::new(&config.auth);
    if let Some(minutes) = args.ttl_minutes {
        if minutes <= 0 {
            return Err(AppError::validation("--ttl-minutes must be positive"));
        }
        encoder = encoder.with_ttl_minutes(minutes);
    }

    let (token, expires_at) = encoder.generate_access_token(args.user_id, args.role, &args.name)?;

    match format {
        OutputFormat::Table => println!("{token}"),
        OutputFormat::Json => output::print_item(
            &IssuedToken {
                token,
                user_id: args.user_id,
                role: args.role,
                expires_at: expires_at.to_rfc3339(),
            },
            format,
        ),
    }
    Ok(())
}
