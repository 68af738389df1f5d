//! Fixed replies sent when an interaction can't reach its handler

use serenity::all::{Permissions, UserId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

/// Something the user is told instead of running a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    MissingClientPermissions(Permissions),
    MissingMemberPermissions(Option<UserId>, Permissions),
    /// Group name
    MissingSubCommandGroup(String),
    /// Sub command name
    MissingSubCommand(String),
    /// Command name
    MissingSubCommandGroups(String),
    /// Command or group name
    MissingSubCommands(String),
}

pub struct Contents {
    pub locale: Locale,
}

fn names(permissions: Permissions) -> String {
    permissions
        .iter_names()
        .map(|(name, _)| format!("`{}`", name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn who(user: Option<UserId>) -> String {
    match user {
        Some(id) => format!("<@{}>", id),
        None => "?".to_owned(),
    }
}

impl Contents {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn render(&self, notice: &Notice) -> String {
        use Notice::*;

        match self.locale {
            Locale::En => match notice {
                MissingClientPermissions(p) => format!(
                    "❌ `| ` I am missing permissions to use this command here: {}",
                    names(*p)
                ),
                MissingMemberPermissions(user, p) => format!(
                    "❌ `| ` {} lacks the permissions required by this command: {}",
                    who(*user),
                    names(*p)
                ),
                MissingSubCommandGroup(group) => {
                    format!("❌ `| ` The command group **{}** no longer exists", group)
                }
                MissingSubCommand(name) => {
                    format!("❌ `| ` The sub command **{}** no longer exists", name)
                }
                MissingSubCommandGroups(command) => format!(
                    "❌ `| ` The command **{}** no longer has sub command groups",
                    command
                ),
                MissingSubCommands(name) => format!(
                    "❌ `| ` The command or command group **{}** no longer has sub commands",
                    name
                ),
            },
            Locale::Fr => match notice {
                MissingClientPermissions(p) => format!(
                    "❌ `| ` Je n'ai pas les permissions d'utiliser cette commande ici : {}",
                    names(*p)
                ),
                MissingMemberPermissions(user, p) => format!(
                    "❌ `| ` {} n'a pas les permissions requises pour utiliser cette commande : {}",
                    who(*user),
                    names(*p)
                ),
                MissingSubCommandGroup(group) => {
                    format!("❌ `| ` Le groupe de commande **{}** n'existe plus", group)
                }
                MissingSubCommand(name) => {
                    format!("❌ `| ` La sous commande **{}** n'existe plus", name)
                }
                MissingSubCommandGroups(command) => format!(
                    "❌ `| ` La commande **{}** ne possède plus de groupe de sous commandes",
                    command
                ),
                MissingSubCommands(name) => format!(
                    "❌ `| ` La commande ou le groupe de commande **{}** ne possède plus de sous commandes",
                    name
                ),
            },
        }
    }
}
