//! Bus publishing commands.

use clap::{Args, Subcommand};
use serde_json::Value;

use eventhub_bus::{BusManager, PublisherFacade};
use eventhub_core::error::AppError;
use eventhub_core::events::BusChannels;
use eventhub_core::traits::MessageBus;
use eventhub_core::types::{EventId, UserId, UserRole};

use crate::output;

/// Arguments for the publish command
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Event name delivered to clients
    #[arg(short, long)]
    pub event: String,
    /// JSON payload
    #[arg(short, long, default_value = "{}")]
    pub data: String,
    /// Recipients
    #[command(subcommand)]
    pub target: PublishTarget,
}

/// Who receives the notification
#[derive(Debug, Clone, Subcommand)]
pub enum PublishTarget {
    /// Every connected socket
    All,
    /// Every socket of one user
    User {
        /// User ID
        id: UserId,
    },
    /// Every socket whose user has the role
    Role {
        /// ADMIN, ORGANIZER or USER
        role: UserRole,
    },
    /// Sockets that joined the event room
    Event {
        /// Event ID
        id: EventId,
    },
    /// Admin channel; reaches administrators only
    Admin,
}

impl PublishTarget {
    fn describe(&self) -> String {
        match self {
            Self::All => "all sockets".to_string(),
            Self::User { id } => format!("user {id}"),
            Self::Role { role } => format!("role {role}"),
            Self::Event { id } => format!("event room {id}"),
            Self::Admin => "administrators".to_string(),
        }
    }
}

/// Execute the publish command
pub async fn execute(args: &PublishArgs, env: &str) -> Result<(), AppError> {
    let data = parse_data(&args.data)?;
    let config = super::load_config(env)?;
    if config.bus.provider == "memory" {
        return Err(AppError::configuration(
            "bus.provider is \"memory\"; publishing needs a bus shared with the gateway",
        ));
    }
    let bus = BusManager::new(&config.bus).await?;
    let publisher = PublisherFacade::new(bus.provider(), BusChannels::from_config(&config.bus));

    let event = args.event.as_str();
    match &args.target {
        PublishTarget::All => publisher.publish_to_all(event, data).await?,
        PublishTarget::User { id } => publisher.publish_to_user(*id, event, data).await?,
        PublishTarget::Role { role } => publisher.publish_to_role(*role, event, data).await?,
        PublishTarget::Event { id } => publisher.publish_to_event(*id, event, data).await?,
        PublishTarget::Admin => publisher.publish_admin(event, data).await?,
    }

    output::print_success(&format!(
        "Published '{}' to {} via {}",
        event,
        args.target.describe(),
        bus.name()
    ));
    Ok(())
}

fn parse_data(raw: &str) -> Result<Value, AppError> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("--data is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        args: PublishArgs,
    }

    #[test]
    fn test_parses_targets() {
        let h = Harness::try_parse_from(["x", "--event", "booking_confirmed", "user", "42"]).unwrap();
        assert!(matches!(h.args.target, PublishTarget::User { id } if id == UserId::new(42)));
        assert_eq!(h.args.data, "{}");

        let h = Harness::try_parse_from(["x", "-e", "notice", "role", "organizer"]).unwrap();
        assert!(matches!(h.args.target, PublishTarget::Role { role: UserRole::Organizer }));

        assert!(Harness::try_parse_from(["x", "-e", "notice", "role", "root"]).is_err());
    }

    #[test]
    fn test_rejects_bad_payload() {
        assert!(parse_data("{\"a\":1}").is_ok());
        assert!(parse_data("{oops").is_err());
    }
}
