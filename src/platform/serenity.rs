//! [`Platform`] backed by serenity's HTTP client and cache, plus conversions
//! from gateway interactions into our contexts.

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::{
    Builder, ButtonStyle as SerenityButtonStyle, Cache, ChannelId, Command, CommandDataOptionValue,
    CommandInteraction, CommandOptionType, CommandType, ComponentInteraction, CreateActionRow,
    CreateButton, CreateCommand, CreateCommandOption, CreateEmbed,
    CreateInputText, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, CreateModal, EditInteractionResponse,
    EditMessage, GuildId, Http, InputTextStyle, ModalInteraction, Permissions, ReactionType,
    UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::reply::TextInputStyle;
use super::*;
use crate::commands::{CommandOptions, CommandRegistry};
use crate::interaction::{
    CommandContext, CommandKind, ComponentContext, InteractionContext, ModalContext,
};

pub struct SerenityPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    modals: Arc<PendingModals>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, modals: Arc<PendingModals>) -> Self {
        Self { http, cache, modals }
    }
}

fn request_error(e: serenity::Error) -> PlatformError {
    if let serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) = &e {
        if response.status_code.as_u16() == 403 {
            return PlatformError::Forbidden(response.error.message.clone());
        }
    }
    PlatformError::Request(e.to_string())
}

fn is_not_found(e: &serenity::Error) -> bool {
    matches!(
        e,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

fn button_style(style: ButtonStyle) -> SerenityButtonStyle {
    match style {
        ButtonStyle::Primary => SerenityButtonStyle::Primary,
        ButtonStyle::Secondary => SerenityButtonStyle::Secondary,
        ButtonStyle::Success => SerenityButtonStyle::Success,
        ButtonStyle::Danger => SerenityButtonStyle::Danger,
    }
}

fn create_rows(rows: &[ActionRow]) -> Vec<CreateActionRow> {
    rows.iter()
        .filter(|row| !row.buttons.is_empty())
        .map(|row| {
            CreateActionRow::Buttons(
                row.buttons
                    .iter()
                    .map(|button| {
                        let mut created = CreateButton::new(&button.custom_id)
                            .label(&button.label)
                            .style(button_style(button.style))
                            .disabled(button.disabled);
                        if let Some(emoji) = button
                            .emoji
                            .as_deref()
                            .and_then(|e| ReactionType::try_from(e).ok())
                        {
                            created = created.emoji(emoji);
                        }
                        created
                    })
                    .collect(),
            )
        })
        .collect()
}

pub fn create_embed(embed: &Embed) -> CreateEmbed {
    let mut created = CreateEmbed::new();
    if let Some(title) = &embed.title {
        created = created.title(title);
    }
    if let Some(description) = &embed.description {
        created = created.description(description);
    }
    if let Some(color) = embed.color {
        created = created.color(color);
    }
    if let Some(url) = &embed.thumbnail {
        created = created.thumbnail(url);
    }
    if let Some(url) = &embed.image {
        created = created.image(url);
    }
    for field in &embed.fields {
        created = created.field(&field.name, &field.value, field.inline);
    }
    created
}

fn create_embeds(reply: &Reply) -> Vec<CreateEmbed> {
    reply.embeds.iter().map(create_embed).collect()
}

// Absent content, embeds or components leave the existing ones untouched on edits.

fn response_message(reply: &Reply) -> CreateInteractionResponseMessage {
    let mut message = CreateInteractionResponseMessage::new()
        .embeds(create_embeds(reply))
        .components(create_rows(&reply.components))
        .ephemeral(reply.ephemeral);
    if let Some(content) = &reply.content {
        message = message.content(content);
    }
    message
}

fn edit_response(reply: &Reply) -> EditInteractionResponse {
    let mut edit = EditInteractionResponse::new();
    if let Some(content) = &reply.content {
        edit = edit.content(content);
    }
    if !reply.embeds.is_empty() {
        edit = edit.embeds(create_embeds(reply));
    }
    if !reply.components.is_empty() {
        edit = edit.components(create_rows(&reply.components));
    }
    edit
}

fn sent(message: &serenity::Message) -> SentMessage {
    SentMessage {
        id: message.id,
        channel_id: message.channel_id,
    }
}

#[async_trait]
impl Platform for SerenityPlatform {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        let mut message = CreateMessage::new()
            .embeds(create_embeds(reply))
            .components(create_rows(&reply.components));
        if let Some(content) = &reply.content {
            message = message.content(content);
        }
        let message = channel_id
            .send_message(self.http.as_ref(), message)
            .await
            .map_err(request_error)?;
        Ok(sent(&message))
    }

    async fn edit_message(
        &self,
        message: &SentMessage,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        let mut edit = EditMessage::new();
        if let Some(content) = &reply.content {
            edit = edit.content(content);
        }
        if !reply.embeds.is_empty() {
            edit = edit.embeds(create_embeds(reply));
        }
        if !reply.components.is_empty() {
            edit = edit.components(create_rows(&reply.components));
        }
        let edited = message
            .channel_id
            .edit_message(self.http.as_ref(), message.id, edit)
            .await
            .map_err(request_error)?;
        Ok(sent(&edited))
    }

    async fn create_response(
        &self,
        interaction: &InteractionHandle,
        response: InteractionResponse,
    ) -> Result<(), PlatformError> {
        let response = match response {
            InteractionResponse::Message(reply) => {
                CreateInteractionResponse::Message(response_message(&reply))
            }
            InteractionResponse::Defer { ephemeral } => CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(ephemeral),
            ),
            InteractionResponse::Acknowledge => CreateInteractionResponse::Acknowledge,
            InteractionResponse::UpdateMessage(reply) => {
                CreateInteractionResponse::UpdateMessage(response_message(&reply))
            }
        };
        response
            .execute(self.http.as_ref(), (interaction.id, &interaction.token))
            .await
            .map_err(request_error)
    }

    async fn edit_original(
        &self,
        interaction: &InteractionHandle,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        let message = edit_response(reply)
            .execute(self.http.as_ref(), &interaction.token)
            .await
            .map_err(request_error)?;
        Ok(sent(&message))
    }

    async fn follow_up(
        &self,
        interaction: &InteractionHandle,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        let mut follow_up = CreateInteractionResponseFollowup::new()
            .embeds(create_embeds(reply))
            .components(create_rows(&reply.components))
            .ephemeral(reply.ephemeral);
        if let Some(content) = &reply.content {
            follow_up = follow_up.content(content);
        }
        let message = follow_up
            .execute(self.http.as_ref(), (None, &interaction.token))
            .await
            .map_err(request_error)?;
        Ok(sent(&message))
    }

    async fn fetch_response(
        &self,
        interaction: &InteractionHandle,
    ) -> Result<ResponseState, PlatformError> {
        let message = self
            .http
            .get_original_interaction_response(&interaction.token)
            .await
            .map_err(request_error)?;
        Ok(ResponseState {
            content: message.content,
            embed_count: message.embeds.len(),
        })
    }

    async fn send_modal(
        &self,
        interaction: &InteractionHandle,
        spec: &ModalSpec,
        on_submit: ModalCallback,
    ) -> Result<(), PlatformError> {
        let custom_id = format!("modal:{}", interaction.id);
        let rows = spec
            .inputs
            .iter()
            .map(|input| {
                let style = match input.style {
                    TextInputStyle::Short => InputTextStyle::Short,
                    TextInputStyle::Paragraph => InputTextStyle::Paragraph,
                };
                let mut text = CreateInputText::new(style, &input.label, &input.custom_id)
                    .required(input.required);
                if let Some(placeholder) = &input.placeholder {
                    text = text.placeholder(placeholder);
                }
                CreateActionRow::InputText(text)
            })
            .collect();
        let modal = CreateModal::new(&custom_id, &spec.title).components(rows);

        // Registered first so a fast submission always finds its callback.
        self.modals.insert(custom_id.clone(), on_submit);
        if let Err(e) = CreateInteractionResponse::Modal(modal)
            .execute(self.http.as_ref(), (interaction.id, &interaction.token))
            .await
        {
            self.modals.take(&custom_id);
            return Err(request_error(e));
        }
        Ok(())
    }

    async fn fetch_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<MemberInfo>, PlatformError> {
        let cached = self.cache.guild(guild_id).map(|guild| {
            let voice_channel = guild
                .voice_states
                .get(&user_id)
                .and_then(|state| state.channel_id);
            let user = guild.members.get(&user_id).map(|m| user_info(&m.user));
            (user, voice_channel)
        });

        if let Some((Some(user), voice_channel)) = cached {
            return Ok(Some(MemberInfo {
                user,
                voice_channel,
            }));
        }

        debug!("Member {} of guild {} not cached, fetching", user_id, guild_id);
        match self.http.get_member(guild_id, user_id).await {
            Ok(member) => Ok(Some(MemberInfo {
                user: user_info(&member.user),
                voice_channel: cached.and_then(|(_, voice)| voice),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(request_error(e)),
        }
    }

    async fn voice_listeners(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<usize, PlatformError> {
        let guild = self.cache.guild(guild_id).ok_or(PlatformError::NotFound("guild"))?;
        let listeners = guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel_id))
            .filter(|state| {
                let is_bot = state
                    .member
                    .as_ref()
                    .map(|m| m.user.bot)
                    .or_else(|| guild.members.get(&state.user_id).map(|m| m.user.bot));
                !is_bot.unwrap_or(false)
            })
            .count();
        Ok(listeners)
    }
}

pub fn user_info(user: &serenity::User) -> UserInfo {
    UserInfo {
        id: user.id,
        name: user.name.clone(),
        global_name: user.global_name.clone(),
        avatar_url: user.avatar_url(),
    }
}

fn interaction_context(
    platform: Arc<dyn Platform>,
    id: serenity::InteractionId,
    token: &str,
    user: &serenity::User,
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
) -> InteractionContext {
    InteractionContext::new(
        platform,
        InteractionHandle {
            id,
            token: token.to_string(),
        },
        user_info(user),
        guild_id,
        channel_id,
    )
}

fn option_value(value: &CommandDataOptionValue) -> Option<String> {
    match value {
        CommandDataOptionValue::String(s) => Some(s.clone()),
        CommandDataOptionValue::Integer(i) => Some(i.to_string()),
        CommandDataOptionValue::Number(n) => Some(n.to_string()),
        CommandDataOptionValue::Boolean(b) => Some(b.to_string()),
        CommandDataOptionValue::User(id) => Some(id.to_string()),
        CommandDataOptionValue::Channel(id) => Some(id.to_string()),
        CommandDataOptionValue::Role(id) => Some(id.to_string()),
        _ => None,
    }
}

pub fn command_context(platform: Arc<dyn Platform>, interaction: &CommandInteraction) -> CommandContext {
    let kind = match interaction.data.kind {
        CommandType::User => CommandKind::User,
        CommandType::Message => CommandKind::Message,
        _ => CommandKind::ChatInput,
    };
    let options: HashMap<String, String> = interaction
        .data
        .options
        .iter()
        .filter_map(|option| option_value(&option.value).map(|v| (option.name.clone(), v)))
        .collect();

    CommandContext::new(
        interaction_context(
            platform,
            interaction.id,
            &interaction.token,
            &interaction.user,
            interaction.guild_id,
            interaction.channel_id,
        ),
        kind,
        interaction.data.name.clone(),
        options,
        interaction.member.as_ref().and_then(|m| m.permissions),
    )
}

pub fn component_context(
    platform: Arc<dyn Platform>,
    interaction: &ComponentInteraction,
) -> ComponentContext {
    ComponentContext::new(
        interaction_context(
            platform,
            interaction.id,
            &interaction.token,
            &interaction.user,
            interaction.guild_id,
            interaction.channel_id,
        ),
        interaction.message.id,
        interaction.data.custom_id.clone(),
    )
}

pub fn modal_context(platform: Arc<dyn Platform>, interaction: &ModalInteraction) -> ModalContext {
    let values = interaction
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            serenity::ActionRowComponent::InputText(input) => {
                Some((input.custom_id.clone(), input.value.clone().unwrap_or_default()))
            }
            _ => None,
        })
        .collect();

    ModalContext::new(
        interaction_context(
            platform,
            interaction.id,
            &interaction.token,
            &interaction.user,
            interaction.guild_id,
            interaction.channel_id,
        ),
        interaction.data.custom_id.clone(),
        values,
    )
}

fn command_definition(options: &CommandOptions) -> CreateCommand {
    let mut command = CreateCommand::new(options.name).dm_permission(options.works_in_dms);

    command = match options.kind {
        CommandKind::ChatInput => {
            let mut command = command.description(options.description);
            for argument in &options.arguments {
                command = command.add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        argument.name,
                        argument.description,
                    )
                    .required(argument.required),
                );
            }
            command
        }
        CommandKind::User => command.kind(CommandType::User),
        CommandKind::Message => command.kind(CommandType::Message),
    };

    if options.guild_mods_only {
        command = command.default_member_permissions(Permissions::MANAGE_GUILD);
    }
    command
}

/// Pushes the registry to Discord. Global commands go to `dev_guild` instead
/// when one is set. Returns the names of everything registered.
pub async fn sync_commands(
    http: &Http,
    registry: &CommandRegistry,
    dev_guild: Option<GuildId>,
) -> Result<Vec<String>, PlatformError> {
    let mut global = Vec::new();
    let mut scoped: HashMap<GuildId, Vec<CreateCommand>> = HashMap::new();

    for command in registry.iter() {
        let options = command.options();
        if options.is_global() {
            global.push(command_definition(options));
        } else {
            for guild_id in &options.guild_ids {
                scoped
                    .entry(*guild_id)
                    .or_default()
                    .push(command_definition(options));
            }
        }
    }

    let mut registered = Vec::new();
    let global_commands = match dev_guild {
        Some(guild_id) => guild_id.set_commands(http, global).await,
        None => Command::set_global_commands(http, global).await,
    }
    .map_err(request_error)?;
    registered.extend(global_commands.into_iter().map(|c| c.name));

    for (guild_id, commands) in scoped {
        let commands = guild_id.set_commands(http, commands).await.map_err(request_error)?;
        registered.extend(commands.into_iter().map(|c| c.name));
    }

    Ok(registered)
}
