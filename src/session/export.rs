// Text renderings of one role's credentials
use crate::error::Result;
use crate::models::RoleCredential;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// KEY=VALUE lines for .env files
    Dotenv,
    Json,
    /// `export KEY=VALUE` lines for eval in a shell
    Shell,
    /// Everything on one line, for `env` style invocations
    Arguments,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    access_key_id: &'a str,
    secret_access_key: &'a str,
    session_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
    expiration: String,
}

fn variables(creds: &RoleCredential) -> Vec<(&'static str, &str)> {
    let mut vars = vec![
        ("AWS_ACCESS_KEY_ID", creds.access_key_id.as_str()),
        ("AWS_SECRET_ACCESS_KEY", creds.secret_access_key.as_str()),
        ("AWS_SESSION_TOKEN", creds.session_token.as_str()),
    ];
    if let Some(region) = &creds.region {
        vars.push(("AWS_REGION", region.as_str()));
    }
    vars
}

pub fn render(creds: &RoleCredential, format: ExportFormat) -> Result<String> {
    let expiration = creds.expiration_display()?;
    let vars = variables(creds);

    let rendered = match format {
        ExportFormat::Dotenv | ExportFormat::Shell => {
            let prefix = if format == ExportFormat::Shell {
                "export "
            } else {
                ""
            };
            let mut lines = vec![format!("# Credentials expire at: {}", expiration)];
            lines.extend(
                vars.iter()
                    .map(|(key, value)| format!("{}{}={}", prefix, key, value)),
            );
            lines.join("\n")
        }
        ExportFormat::Arguments => {
            let mut pairs: Vec<String> = vars
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            pairs.push(format!("AWS_CREDENTIAL_EXPIRATION={}", expiration));
            pairs.join(" ")
        }
        ExportFormat::Json => serde_json::to_string_pretty(&JsonExport {
            access_key_id: &creds.access_key_id,
            secret_access_key: &creds.secret_access_key,
            session_token: &creds.session_token,
            region: creds.region.as_deref(),
            expiration,
        })?,
    };

    Ok(rendered)
}
