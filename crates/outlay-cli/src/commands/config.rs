use std::env;

use crate::cli::ConfigCommands;
use crate::config_profiles::{is_http_url, normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values given to `config init`, before merging with env and the stored profile.
#[derive(Debug, Default)]
pub struct ProfileInput {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub firestore_url: Option<String>,
    pub auth_emulator_url: Option<String>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            project_id,
            api_key,
            firestore_url,
            auth_emulator_url,
            no_activate,
        } => run_config_init(
            global_profile,
            ProfileInput {
                project_id,
                api_key,
                firestore_url,
                auth_emulator_url,
            },
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    input: ProfileInput,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let profile = config.profile_mut_or_default(&profile_name);
    merge_profile_input(profile, input, |name| env::var(name).ok());
    validate_profile_urls(profile)?;
    profile
        .client_config()
        .firebase_project()
        .map_err(CliError::Config)?;
    let missing_fields = profile.missing_fields();

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `outlay auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {} (expenses stay local until configured)",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let Some(profile) = config.profile(&profile_name) else {
        println!("Profile '{profile_name}' is not configured.");
        return Ok(());
    };

    let mut shown = profile.clone();
    shown.api_key = shown.api_key.map(|_| "[REDACTED]".to_string());
    println!("Profile '{profile_name}':");
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

/// Merge explicit flags over env values over what the profile already holds.
pub fn merge_profile_input(
    profile: &mut CliProfile,
    input: ProfileInput,
    env_lookup: impl Fn(&str) -> Option<String>,
) {
    let pick = |explicit: Option<String>, env_name: &str, existing: Option<String>| {
        normalize_text_option(explicit)
            .or_else(|| normalize_text_option(env_lookup(env_name)))
            .or_else(|| normalize_text_option(existing))
    };

    profile.project_id = pick(
        input.project_id,
        "OUTLAY_FIREBASE_PROJECT_ID",
        profile.project_id.take(),
    );
    profile.api_key = pick(
        input.api_key,
        "OUTLAY_FIREBASE_API_KEY",
        profile.api_key.take(),
    );
    profile.firestore_base_url = pick(
        input.firestore_url,
        "OUTLAY_FIRESTORE_URL",
        profile.firestore_base_url.take(),
    );
    profile.auth_emulator_url = pick(
        input.auth_emulator_url,
        "OUTLAY_AUTH_EMULATOR_URL",
        profile.auth_emulator_url.take(),
    );
}

pub fn validate_profile_urls(profile: &CliProfile) -> Result<(), CliError> {
    for (field, value) in [
        ("firestore_url", &profile.firestore_base_url),
        ("auth_emulator_url", &profile.auth_emulator_url),
    ] {
        if let Some(url) = value {
            if !is_http_url(url) {
                return Err(CliError::Config(format!(
                    "{field} must include http:// or https://"
                )));
            }
        }
    }
    Ok(())
}
