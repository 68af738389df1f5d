//! Serenity hands every gateway event to its own callback.  Listeners are bound by event name
//! instead, so the callbacks are folded into a single `Event` enum that knows its name.

use serenity::all::{Context, Guild, Interaction, Member, Message, Reaction, Ready, VoiceState};
use std::sync::Arc;

/// A Discord gateway event
#[derive(Clone, Debug)]
pub enum Event {
    Ready(Ready),
    GuildCreate {
        guild: Guild,
        is_new: Option<bool>,
    },
    GuildMemberAddition(Member),
    Message(Message),
    ReactionAdd(Reaction),
    ReactionRemove(Reaction),
    VoiceStateUpdate {
        old: Option<VoiceState>,
        new: VoiceState,
    },
    InteractionCreate(Interaction),
}

impl Event {
    /// Names of the supported events, as used for `events/<name>/` folders
    pub const NAMES: &'static [&'static str] = &[
        "ready",
        "guild_create",
        "guild_member_addition",
        "message",
        "reaction_add",
        "reaction_remove",
        "voice_state_update",
        "interaction_create",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Event::Ready(_) => "ready",
            Event::GuildCreate { .. } => "guild_create",
            Event::GuildMemberAddition(_) => "guild_member_addition",
            Event::Message(_) => "message",
            Event::ReactionAdd(_) => "reaction_add",
            Event::ReactionRemove(_) => "reaction_remove",
            Event::VoiceStateUpdate { .. } => "voice_state_update",
            Event::InteractionCreate(_) => "interaction_create",
        }
    }
}

/// What an event listener receives
#[derive(Clone)]
pub struct Gateway {
    pub ctx: Context,
    pub event: Arc<Event>,
}

impl Gateway {
    pub fn new(ctx: Context, event: Event) -> Self {
        Self {
            ctx,
            event: Arc::new(event),
        }
    }
}
