//! What a handler file turns into once loaded: commands, their sub command groups and sub
//! commands, buttons, and select menus, each with its permission requirements and callback.

use crate::context::Call;
use anyhow::Result;
use serenity::all::{
    ButtonStyle, CommandOptionType, CommandType, CreateButton, CreateCommand, CreateCommandOption,
    CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, Permissions, ReactionType,
};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Code run when a command, sub command, button or select menu is used
#[serenity::async_trait]
pub trait Exec: Send + Sync {
    async fn exec(&self, call: &Call<'_>) -> Result<()>;
}

/// A registered `Exec` together with the key it was bound by
#[derive(Clone)]
pub struct Callback {
    pub key: String,
    exec: Arc<dyn Exec>,
}

impl Callback {
    pub fn new(key: impl Into<String>, exec: Arc<dyn Exec>) -> Self {
        Self {
            key: key.into(),
            exec,
        }
    }

    pub async fn exec(&self, call: &Call<'_>) -> Result<()> {
        self.exec.exec(call).await
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Callback({})", self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ChatInput,
    User,
    Message,
}

impl CommandKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "chat_input" => Some(CommandKind::ChatInput),
            "user" => Some(CommandKind::User),
            "message" => Some(CommandKind::Message),
            _ => None,
        }
    }
}

impl From<CommandKind> for CommandType {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::ChatInput => CommandType::ChatInput,
            CommandKind::User => CommandType::User,
            CommandKind::Message => CommandType::Message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionKind {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "sub_command" => OptionKind::SubCommand,
            "sub_command_group" => OptionKind::SubCommandGroup,
            "string" => OptionKind::String,
            "integer" => OptionKind::Integer,
            "boolean" => OptionKind::Boolean,
            "user" => OptionKind::User,
            "channel" => OptionKind::Channel,
            "role" => OptionKind::Role,
            "mentionable" => OptionKind::Mentionable,
            "number" => OptionKind::Number,
            "attachment" => OptionKind::Attachment,
            _ => return None,
        })
    }

    /// Sub commands and groups, as opposed to value options
    pub fn is_structural(self) -> bool {
        matches!(self, OptionKind::SubCommand | OptionKind::SubCommandGroup)
    }
}

impl From<OptionKind> for CommandOptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::SubCommand => CommandOptionType::SubCommand,
            OptionKind::SubCommandGroup => CommandOptionType::SubCommandGroup,
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::User => CommandOptionType::User,
            OptionKind::Channel => CommandOptionType::Channel,
            OptionKind::Role => CommandOptionType::Role,
            OptionKind::Mentionable => CommandOptionType::Mentionable,
            OptionKind::Number => CommandOptionType::Number,
            OptionKind::Attachment => CommandOptionType::Attachment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i32),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub name: String,
    pub value: ChoiceValue,
}

/// Option descriptor as sent to Discord
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
    pub choices: Vec<Choice>,
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    pub fn to_create(&self) -> CreateCommandOption {
        let mut option =
            CreateCommandOption::new(self.kind.into(), &self.name, &self.description);

        if self.required {
            option = option.required(true);
        }

        for choice in &self.choices {
            option = match &choice.value {
                ChoiceValue::String(value) => option.add_string_choice(&choice.name, value),
                ChoiceValue::Integer(value) => option.add_int_choice(&choice.name, *value),
                ChoiceValue::Number(value) => option.add_number_choice(&choice.name, *value),
            };
        }

        for sub in &self.options {
            option = option.add_sub_option(sub.to_create());
        }

        option
    }
}

/// Command descriptor as sent to Discord
#[derive(Debug, Clone, PartialEq)]
pub struct CommandBody {
    pub name: String,
    pub description: String,
    pub kind: CommandKind,
    pub options: Vec<CommandOption>,
    pub default_member_permissions: Option<Permissions>,
    pub dm_permission: Option<bool>,
}

impl CommandBody {
    pub fn to_create(&self) -> CreateCommand {
        let mut command = CreateCommand::new(&self.name).kind(self.kind.into());

        // Context menu commands must not carry a description
        if self.kind == CommandKind::ChatInput {
            command = command.description(&self.description);
        }

        for option in &self.options {
            command = command.add_option(option.to_create());
        }

        if let Some(permissions) = self.default_member_permissions {
            command = command.default_member_permissions(permissions);
        }

        if let Some(dm_permission) = self.dm_permission {
            command = command.dm_permission(dm_permission);
        }

        command
    }
}

/// Capabilities checked before a handler runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    /// The bot itself
    pub client: Permissions,
    /// The member using the interaction
    pub member: Permissions,
}

impl Requirements {
    /// Parses flag names such as `EMBED_LINKS`; returns the first unknown name on failure
    pub fn parse_names(names: &[String]) -> Result<Permissions, String> {
        names.iter().try_fold(Permissions::empty(), |acc, name| {
            Permissions::from_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| name.clone())
        })
    }
}

pub type Options = BTreeMap<String, OptionDefinition>;

#[derive(Debug, Clone)]
pub struct CommandDefinition {
    pub body: CommandBody,
    pub permissions: Option<Requirements>,
    pub exec: Option<Callback>,
    /// File name relative to the scope folder, e.g. `ping.toml`
    pub path: PathBuf,
    /// Sub command groups and sub commands, when a same-named folder exists
    pub options: Option<Options>,
}

/// Sub command group or sub command
#[derive(Debug, Clone)]
pub struct OptionDefinition {
    pub option: CommandOption,
    pub permissions: Option<Requirements>,
    pub exec: Option<Callback>,
    /// Sub commands, for a group with its own folder
    pub options: Option<Options>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Primary,
    Secondary,
    Success,
    Danger,
}

impl Style {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "primary" => Some(Style::Primary),
            "secondary" => Some(Style::Secondary),
            "success" => Some(Style::Success),
            "danger" => Some(Style::Danger),
            _ => None,
        }
    }
}

impl From<Style> for ButtonStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Primary => ButtonStyle::Primary,
            Style::Secondary => ButtonStyle::Secondary,
            Style::Success => ButtonStyle::Success,
            Style::Danger => ButtonStyle::Danger,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ButtonData {
    Custom {
        custom_id: String,
        label: Option<String>,
        style: Style,
        emoji: Option<String>,
        disabled: bool,
    },
    Link {
        url: String,
        label: Option<String>,
        emoji: Option<String>,
        disabled: bool,
    },
}

#[derive(Debug, Clone)]
pub struct ButtonDefinition {
    pub data: ButtonData,
    pub permissions: Option<Requirements>,
    pub exec: Option<Callback>,
}

impl ButtonDefinition {
    /// Custom id, or url for link buttons
    pub fn key(&self) -> &str {
        match &self.data {
            ButtonData::Custom { custom_id, .. } => custom_id,
            ButtonData::Link { url, .. } => url,
        }
    }

    pub fn to_create(&self) -> CreateButton {
        let (button, label, emoji, disabled) = match &self.data {
            ButtonData::Custom {
                custom_id,
                label,
                style,
                emoji,
                disabled,
            } => (
                CreateButton::new(custom_id).style((*style).into()),
                label,
                emoji,
                disabled,
            ),
            ButtonData::Link {
                url,
                label,
                emoji,
                disabled,
            } => (CreateButton::new_link(url), label, emoji, disabled),
        };

        let mut button = button.disabled(*disabled);
        if let Some(label) = label {
            button = button.label(label);
        }
        if let Some(emoji) = emoji {
            button = button.emoji(ReactionType::Unicode(emoji.clone()));
        }
        button
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuChoice {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectMenuData {
    pub custom_id: String,
    pub placeholder: Option<String>,
    pub min_values: Option<u8>,
    pub max_values: Option<u8>,
    pub options: Vec<MenuChoice>,
}

#[derive(Debug, Clone)]
pub struct SelectMenuDefinition {
    pub data: SelectMenuData,
    pub permissions: Option<Requirements>,
    pub exec: Option<Callback>,
}

impl SelectMenuDefinition {
    pub fn to_create(&self) -> CreateSelectMenu {
        let options = self
            .data
            .options
            .iter()
            .map(|choice| {
                let option = CreateSelectMenuOption::new(&choice.label, &choice.value);
                match &choice.description {
                    Some(description) => option.description(description),
                    None => option,
                }
            })
            .collect();

        let mut menu =
            CreateSelectMenu::new(&self.data.custom_id, CreateSelectMenuKind::String { options });
        if let Some(placeholder) = &self.data.placeholder {
            menu = menu.placeholder(placeholder);
        }
        if let Some(min) = self.data.min_values {
            menu = menu.min_values(min);
        }
        if let Some(max) = self.data.max_values {
            menu = menu.max_values(max);
        }
        menu
    }
}

/// Anything a single handler file can define
#[derive(Debug, Clone)]
pub enum Definition {
    Command(CommandDefinition),
    Button(ButtonDefinition),
    SelectMenu(SelectMenuDefinition),
}

impl Definition {
    /// Key in its lookup table
    pub fn key(&self) -> &str {
        match self {
            Definition::Command(command) => &command.body.name,
            Definition::Button(button) => button.key(),
            Definition::SelectMenu(menu) => &menu.data.custom_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(name: &str, kind: OptionKind, options: Vec<CommandOption>) -> CommandOption {
        CommandOption {
            name: name.to_owned(),
            description: format!("{} description", name),
            kind,
            required: false,
            choices: Vec::new(),
            options,
        }
    }

    #[test]
    fn nested_options_serialize_for_discord() {
        let body = CommandBody {
            name: "info".to_owned(),
            description: "Information".to_owned(),
            kind: CommandKind::ChatInput,
            options: vec![option(
                "show",
                OptionKind::SubCommandGroup,
                vec![option("user", OptionKind::SubCommand, Vec::new())],
            )],
            default_member_permissions: None,
            dm_permission: None,
        };

        let json = serde_json::to_value(body.to_create()).unwrap();
        assert_eq!(json["name"], "info");
        assert_eq!(json["description"], "Information");
        assert_eq!(json["options"][0]["name"], "show");
        assert_eq!(json["options"][0]["type"], 2);
        assert_eq!(json["options"][0]["options"][0]["name"], "user");
        assert_eq!(json["options"][0]["options"][0]["type"], 1);
    }

    #[test]
    fn permission_names_parse() {
        let names = vec!["EMBED_LINKS".to_owned(), "ATTACH_FILES".to_owned()];
        assert_eq!(
            Requirements::parse_names(&names),
            Ok(Permissions::EMBED_LINKS | Permissions::ATTACH_FILES)
        );

        let names = vec!["EMBED_LINKS".to_owned(), "FLY".to_owned()];
        assert_eq!(Requirements::parse_names(&names), Err("FLY".to_owned()));
    }

    #[test]
    fn type_names_parse() {
        assert_eq!(OptionKind::parse("sub_command_group"), Some(OptionKind::SubCommandGroup));
        assert_eq!(OptionKind::parse("SUB_COMMAND"), None);
        assert_eq!(CommandKind::parse("message"), Some(CommandKind::Message));
        assert!(OptionKind::SubCommand.is_structural());
        assert!(!OptionKind::User.is_structural());
    }

    #[test]
    fn link_buttons_are_keyed_by_url() {
        let button = ButtonDefinition {
            data: ButtonData::Link {
                url: "https://example.com".to_owned(),
                label: Some("Site".to_owned()),
                emoji: None,
                disabled: false,
            },
            permissions: None,
            exec: None,
        };
        assert_eq!(button.key(), "https://example.com");
        assert_eq!(Definition::Button(button).key(), "https://example.com");
    }
}
