use outlay_core::config::FirebaseProject;

use crate::auth::{clear_stored_session, load_stored_session, AuthSession, FirebaseAuthService};
use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let project = config
        .profile(&profile_name)
        .map(|profile| profile.client_config().firebase_project())
        .transpose()
        .map_err(CliError::Config)?
        .flatten();

    match command {
        AuthCommands::Login { email, password } => {
            let service = auth_service(&profile_name, project.as_ref())?;
            let session = service
                .sign_in(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!(
                "Signed in profile '{profile_name}' as {}",
                email_label(&session)
            );
            println!("Run `outlay sync` to download your expenses.");
            Ok(())
        }
        AuthCommands::Signup { email, password } => {
            let service = auth_service(&profile_name, project.as_ref())?;
            let session = service
                .sign_up(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!(
                "Created account and signed in profile '{profile_name}' as {}",
                email_label(&session)
            );
            Ok(())
        }
        AuthCommands::Status => {
            let session = if let Some(project) = project.as_ref() {
                auth_service(&profile_name, Some(project))?
                    .restore_session()
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?
            } else {
                println!("Profile '{profile_name}' has no Firebase project configured.");
                load_stored_session(&profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?
            };

            match session {
                Some(session) => println!(
                    "Profile '{}' is signed in as {} (user_id={}, expires_at={})",
                    profile_name,
                    email_label(&session),
                    session.user.id,
                    session.expires_at
                ),
                None => println!("Profile '{profile_name}' is not signed in."),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            if let Some(project) = project.as_ref() {
                auth_service(&profile_name, Some(project))?
                    .sign_out()
                    .map_err(|error| CliError::Auth(error.to_string()))?;
            } else {
                clear_stored_session(&profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?;
            }
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

fn auth_service(
    profile_name: &str,
    project: Option<&FirebaseProject>,
) -> Result<FirebaseAuthService, CliError> {
    let project = project.ok_or_else(|| {
        CliError::Config(format!(
            "Profile '{profile_name}' missing Firebase config. Run `outlay config init --project-id <ID> --api-key <KEY>` first."
        ))
    })?;
    FirebaseAuthService::new(profile_name, project).map_err(|error| CliError::Auth(error.to_string()))
}

fn email_label(session: &AuthSession) -> &str {
    session.user.email.as_deref().unwrap_or("(no email)")
}
