use super::Context;
use crate::aws_config::BackupSlot;
use crate::error::Result;
use crate::resolver::{self, ProfileSelector};
use crate::session::ExportFormat;

pub async fn execute(
    ctx: &Context,
    selector: &ProfileSelector,
    force: bool,
    export: Option<ExportFormat>,
) -> Result<()> {
    let resolved = resolver::resolve(&ctx.store, &ctx.config.defaults, selector)?;
    if resolved.profiles_updated {
        eprintln!(
            "✓ Profiles in {} updated from SSO config",
            ctx.store.profiles_file().display()
        );
    }
    let sessions = ctx.session_manager();

    if let Some(format) = export {
        let text = sessions
            .export_one(&resolved.primary, force, format)
            .await?;
        println!("{}", text);
        return Ok(());
    }

    let report = sessions.sync(&ctx.store, &resolved, force).await?;

    for name in &report.synced {
        eprintln!("✓ {}", name);
    }
    for failure in &report.failures {
        eprintln!(
            "✗ {} (account {}, role {}): {}",
            failure.profile, failure.account_id, failure.role_name, failure.error
        );
    }

    if report.backup == Some(BackupSlot::FirstRun) {
        eprintln!(
            "\nOriginal credentials saved to {}",
            ctx.store.backup_slots().first_run.display()
        );
    }
    eprintln!(
        "\nRefreshed {} of {} profiles in {}",
        report.synced.len(),
        resolved.profiles.len(),
        ctx.store.credentials_file().display()
    );

    Ok(())
}
