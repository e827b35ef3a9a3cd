//! Mix page model: folds domain events into chat, recipes and presence,
//! and tells the UI which notifications to show.
//!
//! DESIGN
//! ======
//! The reducer never renders anything. It returns [`Notice`] values; the
//! toast surface decides how to present them.

#[cfg(test)]
#[path = "mix_test.rs"]
mod mix_test;

use crate::net::types::{ChatMessagePayload, DomainEvent, Event, RecipePhase, User};
use crate::state::chat::ChatState;
use crate::state::recipes::RecipeCollection;

const DEFAULT_FAILURE_HINT: &str = "Please check the URL and try again";

/// A notification the UI should surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    UserJoined { name: String },
    UserLeft { name: String },
    RecipeProgress { phase: RecipePhase, message: String },
    RecipeReady { recipe: String, url: String, shared_by: String },
    RecipeFailed { status: String },
    ServerError { message: String },
}

impl Notice {
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::UserJoined { name } => format!("{name} joined the session"),
            Self::UserLeft { name } => format!("{name} left the session"),
            Self::RecipeProgress { phase, message } => {
                if message.is_empty() {
                    phase.description().to_owned()
                } else {
                    message.clone()
                }
            }
            Self::RecipeReady { recipe, shared_by, .. } => format!("{recipe} recipe has been added by {shared_by}!"),
            Self::RecipeFailed { .. } => "Recipe processing failed".to_owned(),
            Self::ServerError { message } => message.clone(),
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::UserJoined { .. } => Some("Good to see you!"),
            Self::UserLeft { .. } => Some("Until next time!"),
            Self::RecipeProgress { phase, .. } => Some(phase.description()),
            Self::RecipeFailed { .. } => Some(DEFAULT_FAILURE_HINT),
            Self::RecipeReady { .. } | Self::ServerError { .. } => None,
        }
    }
}

/// Everything the mix page renders for one session.
#[derive(Clone, Debug, Default)]
pub struct MixState {
    pub chat: ChatState,
    pub recipes: RecipeCollection,
    /// Participants seen joining, in join order.
    pub participants: Vec<User>,
}

impl MixState {
    /// Record a chat message the service just sent successfully.
    ///
    /// No echo follows for the sender, so the entry is confirmed here.
    pub fn record_sent_message(&mut self, message: ChatMessagePayload) {
        let id = message.id.clone();
        self.chat.insert_optimistic(message);
        self.chat.mark_sent(&id);
    }

    /// Record a recipe URL this client just submitted.
    pub fn record_submission(&mut self) {
        self.recipes.set_loading(true);
    }

    /// Fold one inbound event into the model.
    pub fn apply_event(&mut self, event: &DomainEvent) -> Vec<Notice> {
        match &event.event {
            Event::ChatMessage(message) => {
                self.chat.apply_remote(message.clone());
                Vec::new()
            }
            Event::UserJoined(joined) => {
                if !self.participants.iter().any(|user| user.id == joined.user.id) {
                    self.participants.push(joined.user.clone());
                }
                vec![Notice::UserJoined { name: joined.user.name.clone() }]
            }
            Event::UserLeft(left) => {
                self.participants.retain(|user| user.id != left.user.id);
                vec![Notice::UserLeft { name: left.user.name.clone() }]
            }
            Event::RecipeSubmission(_) => Vec::new(),
            Event::RecipeProgress(progress) => vec![Notice::RecipeProgress {
                phase: progress.phase.clone(),
                message: progress.message.clone(),
            }],
            Event::RecipeResult(result) => {
                self.recipes.apply_result(result);
                if !result.status.is_success() {
                    return vec![Notice::RecipeFailed { status: String::from(result.status.clone()) }];
                }
                let requester = result.request.as_ref().map(|request| request.sender.name.clone());
                result
                    .list
                    .iter()
                    .map(|recipe| Notice::RecipeReady {
                        recipe: recipe.name.clone(),
                        url: recipe.url.clone(),
                        shared_by: recipe
                            .sharer
                            .as_ref()
                            .map(|user| user.name.clone())
                            .or_else(|| requester.clone())
                            .unwrap_or_else(|| "someone".to_owned()),
                    })
                    .collect()
            }
            Event::Error(error) => vec![Notice::ServerError { message: error.message.clone() }],
        }
    }
}
