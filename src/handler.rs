use crate::event::{Event, Gateway};
use crate::inbound::Incoming;
use crate::sucrose::Sucrose;
use serenity::all::{Context, Guild, Interaction, Member, Message, Reaction, Ready, VoiceState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Discord event handler
pub struct Handler {
    sucrose: Arc<Sucrose>,
    /// Set on the first `ready`; reconnects don't register again
    registered: AtomicBool,
}

impl Handler {
    pub fn new(sucrose: Arc<Sucrose>) -> Self {
        Self {
            sucrose,
            registered: AtomicBool::new(false),
        }
    }

    async fn emit(&self, ctx: Context, event: Event) {
        let name = event.name();
        self.sucrose
            .events
            .emit(name, &Gateway::new(ctx, event))
            .await;
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.emit(ctx, Event::Ready(ready)).await;

        let register = self.sucrose.cfg.read().await.commands.register_on_ready;
        if register && !self.registered.swap(true, Ordering::SeqCst) {
            self.sucrose.register_all().await;
        }
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, is_new: Option<bool>) {
        self.emit(ctx, Event::GuildCreate { guild, is_new }).await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        self.emit(ctx, Event::GuildMemberAddition(new_member)).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        self.emit(ctx, Event::Message(msg)).await;
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        self.emit(ctx, Event::ReactionAdd(reaction)).await;
    }

    async fn reaction_remove(&self, ctx: Context, reaction: Reaction) {
        self.emit(ctx, Event::ReactionRemove(reaction)).await;
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        self.emit(ctx, Event::VoiceStateUpdate { old, new }).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        self.emit(ctx.clone(), Event::InteractionCreate(interaction.clone()))
            .await;

        let incoming = Incoming::new(ctx, interaction);
        let outcome = self
            .sucrose
            .interactions
            .dispatch(&self.sucrose, &incoming)
            .await;
        tracing::debug!(?outcome, "interaction handled");
    }
}
