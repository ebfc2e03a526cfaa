//! User profile commands

use super::Context;
use clap::{Subcommand, ValueEnum};
use nearby_cli::output::{format_count, Status};
use nearby_core::Result;
use nearby_directory::prelude::*;
use owo_colors::OwoColorize;

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user
    Add {
        username: String,
        email: String,
        /// Location as "lat,lon"; either order is accepted
        #[arg(short, long, allow_hyphen_values = true)]
        location: Option<String>,
    },

    /// Change a user's profile; omitted fields keep their value
    Update {
        id: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// New location as "lat,lon"; an unreadable value removes it
        #[arg(short, long, allow_hyphen_values = true, conflicts_with = "clear_location")]
        location: Option<String>,
        /// Remove the stored location
        #[arg(long)]
        clear_location: bool,
    },

    /// Hide a user from listings
    Hide {
        id: String,
        /// Show the user again instead
        #[arg(long)]
        undo: bool,
    },

    /// Allow or block messages to a user
    Messages { id: String, state: Toggle },

    /// Delete a user
    Rm { id: String },

    /// Show one user
    Show { id: String },

    /// List users visible in listings
    List {
        /// Leave this user out
        #[arg(long)]
        viewer: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

pub fn run(ctx: &Context, command: UserCommand) -> Result<()> {
    let store = ctx.open_store()?;
    let profiles = ProfileService::new(&store);

    match command {
        UserCommand::Add {
            username,
            email,
            location,
        } => {
            let mut profile = NewProfile::new(username, email);
            profile.location = location;
            let id = profiles.register(profile)?;
            let record = profiles.get(&id)?;
            if ctx.json() {
                return ctx.print_json(&record);
            }
            Status::success(&format!("Registered {} as {}", record.username, id));
            if record.location.is_missing() {
                Status::warning("No usable location stored; searches from this user will fail");
            }
        }

        UserCommand::Update {
            id,
            username,
            email,
            location,
            clear_location,
        } => {
            let id = UserId::new(id);
            let current = profiles.get(&id)?;
            let location = match (location, clear_location) {
                (Some(text), _) => LocationChange::Set(text),
                (None, true) => LocationChange::Clear,
                (None, false) => LocationChange::Keep,
            };
            profiles.update_profile(
                &id,
                ProfileUpdate {
                    username: username.unwrap_or(current.username),
                    email: email.unwrap_or(current.email),
                    location,
                },
            )?;
            finish(ctx, &profiles, &id, "Updated")?;
        }

        UserCommand::Hide { id, undo } => {
            let id = UserId::new(id);
            profiles.set_hidden(&id, !undo)?;
            finish(ctx, &profiles, &id, if undo { "Unhidden" } else { "Hidden" })?;
        }

        UserCommand::Messages { id, state } => {
            let id = UserId::new(id);
            profiles.set_message_preference(&id, state == Toggle::On)?;
            let verb = match state {
                Toggle::On => "Messages allowed for",
                Toggle::Off => "Messages blocked for",
            };
            finish(ctx, &profiles, &id, verb)?;
        }

        UserCommand::Rm { id } => {
            let id = UserId::new(id);
            profiles.delete(&id)?;
            if ctx.json() {
                return ctx.print_json(&serde_json::json!({ "deleted": id }));
            }
            Status::success(&format!("Deleted {id}"));
        }

        UserCommand::Show { id } => {
            let record = profiles.get(&UserId::new(id))?;
            if ctx.json() {
                return ctx.print_json(&record);
            }
            print_record(&record);
        }

        UserCommand::List { viewer } => {
            let viewer = UserId::new(viewer.unwrap_or_default());
            let users = profiles.discoverable_users(&viewer)?;
            if ctx.json() {
                return ctx.print_json(&users);
            }
            Status::header(&format_count(users.len(), "visible user", "visible users"));
            for user in &users {
                println!("{}  {}", user.username, user.id.dimmed());
            }
        }
    }

    Ok(())
}

fn finish<S: UserStore + ?Sized>(
    ctx: &Context,
    profiles: &ProfileService<'_, S>,
    id: &UserId,
    verb: &str,
) -> Result<()> {
    let record = profiles.get(id)?;
    if ctx.json() {
        return ctx.print_json(&record);
    }
    Status::success(&format!("{verb} {}", record.username));
    Ok(())
}

fn print_record(record: &UserLocationRecord) {
    let location = match &record.location {
        LocationField::Missing => "not set".to_string(),
        LocationField::RawText(text) => format!("{text:?} (not normalized)"),
        LocationField::GeoPoint(_) => match record.location.canonical() {
            Some(point) => point.to_string(),
            None => "out of range".to_string(),
        },
        LocationField::Malformed(_) => "invalid".to_string(),
    };

    Status::header(&record.username);
    println!("  {:<10} {}", "id".dimmed(), record.id);
    println!("  {:<10} {}", "email".dimmed(), record.email);
    println!("  {:<10} {}", "location".dimmed(), location);
    println!("  {:<10} {}", "messages".dimmed(), on_off(record.can_receive_messages));
    println!("  {:<10} {}", "hidden".dimmed(), yes_no(record.is_hidden));
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
