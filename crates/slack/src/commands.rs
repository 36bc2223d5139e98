use swarmbot_core::{ReviewId, ReviewSource, SwarmError};
use thiserror::Error;
use tracing::debug;

use crate::blocks::MessageTemplate;
use crate::compose::ViewComposer;

pub const USERNAME_PROMPT: &str = ":exclamation: Please type username";
pub const CHANGELIST_PROMPT: &str =
    ":exclamation: Please provide change list number you want to review";
pub const USER_NOT_FOUND: &str = ":warning: User Not Found!";
pub const REVIEW_NOT_FOUND: &str = ":warning: Review Not Found!";
pub const COMMAND_NOT_SUPPORTED: &str = ":warning: Command not supported!";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    pub channel_id: String,
    pub channel_name: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppCommand {
    Hello,
    User { username: Option<String> },
    Changelist(ChangelistArgument),
    Unsupported { command: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangelistArgument {
    Missing,
    Invalid(String),
    Review(ReviewId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error(transparent)]
    Source(#[from] SwarmError),
}

pub fn parse_app_command(payload: &SlashCommandPayload) -> AppCommand {
    let argument = payload.text.trim();
    match payload.command.trim().to_ascii_lowercase().as_str() {
        "/hello" => AppCommand::Hello,
        "/user" => AppCommand::User {
            username: (!argument.is_empty()).then(|| argument.to_owned()),
        },
        "/changelist" => AppCommand::Changelist(parse_changelist_argument(argument)),
        _ => AppCommand::Unsupported { command: payload.command.clone() },
    }
}

/// Accepts `12345` and `#12345`.
fn parse_changelist_argument(argument: &str) -> ChangelistArgument {
    if argument.is_empty() {
        return ChangelistArgument::Missing;
    }
    let digits = argument.strip_prefix('#').unwrap_or(argument);
    match digits.parse::<ReviewId>() {
        Ok(id) => ChangelistArgument::Review(id),
        Err(_) => ChangelistArgument::Invalid(argument.to_owned()),
    }
}

pub struct CommandRouter<S> {
    source: S,
    composer: ViewComposer,
}

impl<S> CommandRouter<S>
where
    S: ReviewSource,
{
    pub fn new(source: S, composer: ViewComposer) -> Self {
        Self { source, composer }
    }

    /// Answers a slash command with the acknowledgment body. Validation failures and
    /// not-found lookups are ordinary replies; only backend failures are errors.
    pub async fn route(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match parse_app_command(payload) {
            AppCommand::Hello => {
                Ok(MessageTemplate::text(format!(":wave: Hello {}!", payload.user_name)))
            }
            AppCommand::User { username: None } => {
                debug!(command = %payload.command, "slash command missing username");
                Ok(MessageTemplate::text(USERNAME_PROMPT))
            }
            AppCommand::User { username: Some(username) } => self.user_summary(&username).await,
            AppCommand::Changelist(ChangelistArgument::Missing) => {
                debug!(command = %payload.command, "slash command missing change list number");
                Ok(MessageTemplate::text(CHANGELIST_PROMPT))
            }
            AppCommand::Changelist(ChangelistArgument::Invalid(raw)) => {
                debug!(command = %payload.command, argument = %raw, "invalid change list number");
                Ok(MessageTemplate::text(format!(
                    ":exclamation: `{raw}` is not a change list number"
                )))
            }
            AppCommand::Changelist(ChangelistArgument::Review(id)) => {
                self.compact_review(id).await
            }
            AppCommand::Unsupported { .. } => Ok(MessageTemplate::text(COMMAND_NOT_SUPPORTED)),
        }
    }

    async fn user_summary(&self, username: &str) -> Result<MessageTemplate, CommandRouteError> {
        match self.source.fetch_user(username).await {
            Ok(user) => Ok(MessageTemplate::with_blocks(
                format!("Swarm user {username}"),
                self.composer.user_summary(&user),
            )),
            Err(error) if error.is_not_found() => Ok(MessageTemplate::text(USER_NOT_FOUND)),
            Err(error) => Err(error.into()),
        }
    }

    async fn compact_review(&self, id: ReviewId) -> Result<MessageTemplate, CommandRouteError> {
        match self.source.fetch_review(id).await {
            Ok(review) => Ok(MessageTemplate::with_blocks(
                format!("Change list {id}"),
                self.composer.compact_review(&review),
            )),
            Err(error) if error.is_not_found() => Ok(MessageTemplate::text(REVIEW_NOT_FOUND)),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use swarmbot_core::fixtures::{FixtureReviewSource, SourceCall};
    use swarmbot_core::{Review, ReviewId, SwarmError, User};

    use super::{
        parse_app_command, AppCommand, ChangelistArgument, CommandRouteError, CommandRouter,
        SlashCommandPayload, CHANGELIST_PROMPT, COMMAND_NOT_SUPPORTED, REVIEW_NOT_FOUND,
        USERNAME_PROMPT, USER_NOT_FOUND,
    };
    use crate::compose::ViewComposer;

    fn payload(command: &str, text: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            command: command.to_owned(),
            text: text.to_owned(),
            user_id: "U1".to_owned(),
            user_name: "jdoe".to_owned(),
            channel_id: "C1".to_owned(),
            channel_name: "reviews".to_owned(),
            trigger_id: "T1".to_owned(),
        }
    }

    fn router(source: FixtureReviewSource) -> CommandRouter<FixtureReviewSource> {
        CommandRouter::new(source, ViewComposer::new("https://swarm.example.com/reviews/"))
    }

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_app_command(&payload("/hello", "")), AppCommand::Hello);
        assert_eq!(
            parse_app_command(&payload("/user", "  jdoe ")),
            AppCommand::User { username: Some("jdoe".to_owned()) }
        );
        assert_eq!(
            parse_app_command(&payload("/changelist", "#42")),
            AppCommand::Changelist(ChangelistArgument::Review(ReviewId(42)))
        );
        assert_eq!(
            parse_app_command(&payload("/changelist", "forty-two")),
            AppCommand::Changelist(ChangelistArgument::Invalid("forty-two".to_owned()))
        );
        assert_eq!(
            parse_app_command(&payload("/standup", "today")),
            AppCommand::Unsupported { command: "/standup".to_owned() }
        );
    }

    #[tokio::test]
    async fn hello_greets_the_caller() {
        let message = router(FixtureReviewSource::new()).route(&payload("/hello", "")).await;
        assert_eq!(message.expect("route").fallback_text, ":wave: Hello jdoe!");
    }

    #[tokio::test]
    async fn blank_arguments_prompt_without_backend_calls() {
        let router = router(FixtureReviewSource::new());

        let user = router.route(&payload("/user", "   ")).await.expect("route");
        let changelist = router.route(&payload("/changelist", "")).await.expect("route");

        assert_eq!(user.fallback_text, USERNAME_PROMPT);
        assert_eq!(changelist.fallback_text, CHANGELIST_PROMPT);
        assert!(router.source.calls().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_changelist_is_rejected_before_lookup() {
        let router = router(FixtureReviewSource::new());
        let message = router.route(&payload("/changelist", "abc")).await.expect("route");

        assert_eq!(message.fallback_text, ":exclamation: `abc` is not a change list number");
        assert!(router.source.calls().is_empty());
    }

    #[tokio::test]
    async fn changelist_renders_compact_review() {
        let router = router(FixtureReviewSource::new().with_review(Review::new(12345, "needsReview")));
        let message = router.route(&payload("/changelist", "12345")).await.expect("route");

        assert_eq!(message.fallback_text, "Change list 12345");
        assert_eq!(message.blocks.len(), 4);
        assert_eq!(router.source.calls(), vec![SourceCall::Review(ReviewId(12345))]);
    }

    #[tokio::test]
    async fn missing_entities_reply_with_not_found_text() {
        let router = router(FixtureReviewSource::new());

        let review = router.route(&payload("/changelist", "999")).await.expect("route");
        let user = router.route(&payload("/user", "ghost")).await.expect("route");

        assert_eq!(review.fallback_text, REVIEW_NOT_FOUND);
        assert_eq!(user.fallback_text, USER_NOT_FOUND);
    }

    #[tokio::test]
    async fn user_command_renders_summary() {
        let router = router(FixtureReviewSource::new().with_user(User::new("jdoe")));
        let message = router.route(&payload("/user", "jdoe")).await.expect("route");

        assert_eq!(message.blocks.len(), 1);
        assert_eq!(router.source.calls(), vec![SourceCall::User("jdoe".to_owned())]);
    }

    #[tokio::test]
    async fn upstream_failures_propagate() {
        let failure = SwarmError::Upstream("connection refused".to_owned());
        let router = router(FixtureReviewSource::new().failing_with(failure.clone()));

        let error = router.route(&payload("/changelist", "1")).await.expect_err("should fail");

        assert_eq!(error, CommandRouteError::Source(failure));
    }

    #[tokio::test]
    async fn unknown_command_is_not_supported() {
        let message =
            router(FixtureReviewSource::new()).route(&payload("/deploy", "now")).await.expect("route");
        assert_eq!(message.fallback_text, COMMAND_NOT_SUPPORTED);
    }
}
