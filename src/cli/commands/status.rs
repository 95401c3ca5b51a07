use super::Context;
use crate::auth::SessionCache;
use crate::aws_config::ProfileStore;
use crate::error::Result;
use crate::expiry;
use crate::models::SsoInstance;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq)]
struct SessionStatus {
    start_url: String,
    region: String,
    active: bool,
    expires_at: Option<String>,
    remaining: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct CredentialStatus {
    profile: String,
    expires_at: String,
    remaining: String,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    sessions: Vec<SessionStatus>,
    credentials: Vec<CredentialStatus>,
}

pub fn execute(ctx: &Context, json: bool) -> Result<()> {
    let report = collect(&ctx.store, &ctx.session_cache(), Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.sessions.is_empty() {
        println!("No SSO profiles configured in {}", ctx.store.profiles_file().display());
    }
    for session in &report.sessions {
        match (&session.expires_at, &session.remaining) {
            (Some(_), Some(remaining)) if session.active => println!(
                "SSO session active for {} ({}), expires in {}",
                session.start_url, session.region, remaining
            ),
            (Some(expires_at), _) => println!(
                "SSO session for {} ({}) expired at {}",
                session.start_url, session.region, expires_at
            ),
            _ => println!(
                "No SSO session for {} ({})",
                session.start_url, session.region
            ),
        }
    }

    if !report.credentials.is_empty() {
        println!("\nCredentials in {}:", ctx.store.credentials_file().display());
        for creds in &report.credentials {
            println!("  {:<30} {}", creds.profile, creds.remaining);
        }
    }

    Ok(())
}

fn collect(store: &ProfileStore, cache: &SessionCache, now: DateTime<Utc>) -> Result<StatusReport> {
    let profiles = store.load_profiles()?;
    let mut instances: Vec<SsoInstance> = Vec::new();
    for name in profiles.profile_names() {
        match profiles.sso_profile(&name) {
            Ok(Some(profile)) => {
                let instance = profile.instance();
                if !instances.contains(&instance) {
                    instances.push(instance);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping profile '{}': {}", name, e),
        }
    }

    let mut sessions = Vec::with_capacity(instances.len());
    for instance in instances {
        let cached = cache.load(&instance)?;
        let (active, expires_at, remaining) = match cached {
            Some(session) => {
                let expires = expiry::parse_timestamp(&session.expires_at)?;
                (
                    now <= expires,
                    Some(session.expires_at),
                    Some(expiry::format_time_remaining(&expires, now)),
                )
            }
            None => (false, None, None),
        };
        sessions.push(SessionStatus {
            start_url: instance.start_url,
            region: instance.region,
            active,
            expires_at,
            remaining,
        });
    }

    let credentials = store
        .load_credentials()?
        .session_expirations()
        .into_iter()
        .map(|(profile, expires_at)| {
            let remaining = match expiry::parse_timestamp(&expires_at) {
                Ok(expires) => expiry::format_time_remaining(&expires, now),
                Err(_) => "invalid expiration".to_string(),
            };
            CredentialStatus {
                profile,
                expires_at,
                remaining,
            }
        })
        .collect();

    Ok(StatusReport {
        sessions,
        credentials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::models::LoginSession;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect() {
        let dir = TempDir::new().unwrap();
        let env = Environment::with_home(dir.path(), &dir.path().join("cache"));
        let store = ProfileStore::new(&env);
        store.ensure_initialized().unwrap();
        fs::write(
            store.profiles_file(),
            "[profile a]\nsso_start_url = https://a.awsapps.com/start\nsso_region = us-east-1\n\
             sso_account_id = 111111111111\nsso_role_name = Admin\n\
             [profile b]\nsso_start_url = https://a.awsapps.com/start\nsso_region = us-east-1\n\
             sso_account_id = 222222222222\nsso_role_name = Admin\n\
             [profile c]\nsso_start_url = https://c.awsapps.com/start\nsso_region = eu-west-1\n\
             sso_account_id = 333333333333\nsso_role_name = Admin\n",
        )
        .unwrap();
        fs::write(
            store.credentials_file(),
            "[static]\naws_access_key_id = AKIA\n\
             [a]\naws_session_expiration = 2024-06-01T13:30:00Z\n",
        )
        .unwrap();

        let cache = SessionCache::new(&env);
        cache
            .save(&LoginSession {
                start_url: "https://a.awsapps.com/start".to_string(),
                region: "us-east-1".to_string(),
                access_token: "token".to_string(),
                expires_at: "2024-06-01T14:00:00Z".to_string(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                registration_expires_at: "2024-09-01T00:00:00Z".to_string(),
            })
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let report = collect(&store, &cache, now).unwrap();

        assert_eq!(
            report.sessions,
            vec![
                SessionStatus {
                    start_url: "https://a.awsapps.com/start".to_string(),
                    region: "us-east-1".to_string(),
                    active: true,
                    expires_at: Some("2024-06-01T14:00:00Z".to_string()),
                    remaining: Some("2h 0m".to_string()),
                },
                SessionStatus {
                    start_url: "https://c.awsapps.com/start".to_string(),
                    region: "eu-west-1".to_string(),
                    active: false,
                    expires_at: None,
                    remaining: None,
                },
            ]
        );
        assert_eq!(
            report.credentials,
            vec![CredentialStatus {
                profile: "a".to_string(),
                expires_at: "2024-06-01T13:30:00Z".to_string(),
                remaining: "1h 30m".to_string(),
            }]
        );
    }
}
