//! Handler files are TOML manifests.  This module holds their raw shapes and the checks that turn
//! them into definitions, binding each `handler` key to a registered callback.

use crate::definition::*;
use crate::error::{Code, DomainError};
use crate::registry::Registry;
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

#[derive(serde::Deserialize)]
struct RawPermissions {
    #[serde(default)]
    client: Vec<String>,
    #[serde(default)]
    member: Vec<String>,
}

#[derive(serde::Deserialize)]
struct RawCommandFile {
    handler: Option<String>,
    permissions: Option<RawPermissions>,
    body: Option<RawBody>,
}

#[derive(serde::Deserialize)]
struct RawBody {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
    default_member_permissions: Option<Vec<String>>,
    dm_permission: Option<bool>,
}

#[derive(serde::Deserialize)]
struct RawOption {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    choices: Vec<RawChoice>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(serde::Deserialize)]
struct RawChoice {
    name: String,
    value: ChoiceValue,
}

#[derive(serde::Deserialize)]
struct RawOptionFile {
    handler: Option<String>,
    permissions: Option<RawPermissions>,
    option: Option<RawOption>,
}

#[derive(serde::Deserialize)]
struct RawButtonFile {
    handler: Option<String>,
    permissions: Option<RawPermissions>,
    data: Option<RawButtonData>,
}

#[derive(serde::Deserialize)]
struct RawButtonData {
    custom_id: Option<String>,
    url: Option<String>,
    label: Option<String>,
    style: Option<String>,
    emoji: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[derive(serde::Deserialize)]
struct RawSelectMenuFile {
    handler: Option<String>,
    permissions: Option<RawPermissions>,
    data: Option<RawSelectMenuData>,
}

#[derive(serde::Deserialize)]
struct RawSelectMenuData {
    custom_id: Option<String>,
    placeholder: Option<String>,
    min_values: Option<u8>,
    max_values: Option<u8>,
    #[serde(default)]
    options: Vec<RawMenuChoice>,
}

#[derive(serde::Deserialize)]
struct RawMenuChoice {
    label: String,
    value: String,
    description: Option<String>,
}

#[derive(serde::Deserialize)]
struct RawEventFile {
    listener: Option<String>,
}

fn parse<T: DeserializeOwned>(text: &str, path: &Path) -> Result<T> {
    toml::from_str(text).map_err(|e| {
        DomainError::error(
            Code::ManifestInvalid,
            format!("{}: {}", path.display(), e.message()),
        )
        .into()
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn bind(
    handler: Option<String>,
    execs: &Registry<dyn Exec>,
    path: &Path,
) -> Result<Option<Callback>> {
    let Some(key) = handler else {
        return Ok(None);
    };

    match execs.get(&key) {
        Some(exec) => Ok(Some(Callback::new(key, exec))),
        None => Err(DomainError::error(
            Code::HandlerUnknown,
            format!("{} in {}", key, path.display()),
        )
        .into()),
    }
}

fn permission_names(names: &[String], path: &Path) -> Result<serenity::all::Permissions> {
    Requirements::parse_names(names).map_err(|name| {
        DomainError::error(
            Code::PermissionUnrecognized,
            format!("{} in {}", name, path.display()),
        )
        .into()
    })
}

fn requirements(raw: Option<RawPermissions>, path: &Path) -> Result<Option<Requirements>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    Ok(Some(Requirements {
        client: permission_names(&raw.client, path)?,
        member: permission_names(&raw.member, path)?,
    }))
}

fn option(raw: RawOption, path: &Path) -> Result<CommandOption> {
    let name = non_empty(raw.name)
        .ok_or_else(|| DomainError::error(Code::CommandMissingName, path.display()))?;

    let kind_name = raw.kind.unwrap_or_default();
    let kind = OptionKind::parse(&kind_name).ok_or_else(|| {
        DomainError::error(
            Code::TypeUnrecognized,
            format!("`{}` for option {} in {}", kind_name, name, path.display()),
        )
    })?;

    let description = non_empty(raw.description).ok_or_else(|| {
        DomainError::error(
            Code::CommandMissingDescription,
            format!("option {} in {}", name, path.display()),
        )
    })?;

    let choices = raw
        .choices
        .into_iter()
        .map(|c| Choice {
            name: c.name,
            value: c.value,
        })
        .collect();

    let options = raw
        .options
        .into_iter()
        .map(|o| option(o, path))
        .collect::<Result<Vec<_>>>()?;

    Ok(CommandOption {
        name,
        description,
        kind,
        required: raw.required,
        choices,
        options,
    })
}

/// `commands/global/*.toml`, `commands/guilds/<id>/*.toml`
pub fn command(
    text: &str,
    path: &Path,
    file: &Path,
    execs: &Registry<dyn Exec>,
) -> Result<CommandDefinition> {
    let raw: RawCommandFile = parse(text, path)?;

    let body = raw
        .body
        .ok_or_else(|| DomainError::error(Code::CommandMissingBody, path.display()))?;

    let name = non_empty(body.name)
        .ok_or_else(|| DomainError::error(Code::CommandMissingName, path.display()))?;

    let kind = match body.kind.as_deref() {
        None => CommandKind::ChatInput,
        Some(kind_name) => CommandKind::parse(kind_name).ok_or_else(|| {
            DomainError::error(
                Code::TypeUnrecognized,
                format!("`{}` in {}", kind_name, path.display()),
            )
        })?,
    };

    let description = non_empty(body.description).unwrap_or_default();
    if kind == CommandKind::ChatInput && description.is_empty() {
        return Err(DomainError::error(Code::CommandMissingDescription, path.display()).into());
    }

    let options = body
        .options
        .into_iter()
        .map(|o| option(o, path))
        .collect::<Result<Vec<_>>>()?;

    let default_member_permissions = match body.default_member_permissions {
        Some(names) => Some(permission_names(&names, path)?),
        None => None,
    };

    Ok(CommandDefinition {
        body: CommandBody {
            name,
            description,
            kind,
            options,
            default_member_permissions,
            dm_permission: body.dm_permission,
        },
        permissions: requirements(raw.permissions, path)?,
        exec: bind(raw.handler, execs, path)?,
        path: file.to_path_buf(),
        options: None,
    })
}

/// Sub command group or sub command file inside a command folder
pub fn sub_option(text: &str, path: &Path, execs: &Registry<dyn Exec>) -> Result<OptionDefinition> {
    let raw: RawOptionFile = parse(text, path)?;

    let option = option(
        raw.option
            .ok_or_else(|| DomainError::error(Code::OptionMissing, path.display()))?,
        path,
    )?;

    if !option.kind.is_structural() {
        return Err(DomainError::error(
            Code::TypeUnrecognized,
            format!(
                "option {} in {} is not a sub command or sub command group",
                option.name,
                path.display()
            ),
        )
        .into());
    }

    Ok(OptionDefinition {
        option,
        permissions: requirements(raw.permissions, path)?,
        exec: bind(raw.handler, execs, path)?,
        options: None,
    })
}

/// `interactions/buttons/*.toml`
pub fn button(text: &str, path: &Path, execs: &Registry<dyn Exec>) -> Result<ButtonDefinition> {
    let raw: RawButtonFile = parse(text, path)?;

    let data = raw
        .data
        .ok_or_else(|| DomainError::error(Code::InteractionMissingData, path.display()))?;

    let data = match (data.custom_id, data.url) {
        (Some(custom_id), _) => {
            if custom_id.trim().is_empty() {
                return Err(DomainError::error(Code::InteractionMissingId, path.display()).into());
            }

            let style = match data.style.as_deref() {
                None => Style::Primary,
                Some(name) => Style::parse(name).ok_or_else(|| {
                    DomainError::error(
                        Code::TypeUnrecognized,
                        format!("style `{}` in {}", name, path.display()),
                    )
                })?,
            };

            ButtonData::Custom {
                custom_id,
                label: data.label,
                style,
                emoji: data.emoji,
                disabled: data.disabled,
            }
        }
        (None, Some(url)) => {
            if url.trim().is_empty() {
                return Err(DomainError::error(Code::InteractionMissingUrl, path.display()).into());
            }

            ButtonData::Link {
                url,
                label: data.label,
                emoji: data.emoji,
                disabled: data.disabled,
            }
        }
        (None, None) => {
            return Err(DomainError::error(Code::InteractionMissingId, path.display()).into())
        }
    };

    Ok(ButtonDefinition {
        data,
        permissions: requirements(raw.permissions, path)?,
        exec: bind(raw.handler, execs, path)?,
    })
}

/// `interactions/select_menus/*.toml`
pub fn select_menu(
    text: &str,
    path: &Path,
    execs: &Registry<dyn Exec>,
) -> Result<SelectMenuDefinition> {
    let raw: RawSelectMenuFile = parse(text, path)?;

    let data = raw
        .data
        .ok_or_else(|| DomainError::error(Code::InteractionMissingData, path.display()))?;

    let custom_id = non_empty(data.custom_id)
        .ok_or_else(|| DomainError::error(Code::InteractionMissingId, path.display()))?;

    let options = data
        .options
        .into_iter()
        .map(|o| MenuChoice {
            label: o.label,
            value: o.value,
            description: o.description,
        })
        .collect();

    Ok(SelectMenuDefinition {
        data: SelectMenuData {
            custom_id,
            placeholder: data.placeholder,
            min_values: data.min_values,
            max_values: data.max_values,
            options,
        },
        permissions: requirements(raw.permissions, path)?,
        exec: bind(raw.handler, execs, path)?,
    })
}

/// `events/<name>/handler.toml`, returns the listener key
pub fn event_listener(text: &str, path: &Path) -> Result<String> {
    let raw: RawEventFile = parse(text, path)?;

    non_empty(raw.listener)
        .ok_or_else(|| DomainError::error(Code::EventMissingHandler, path.display()).into())
}
