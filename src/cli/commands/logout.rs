use super::Context;
use crate::error::Result;
use crate::models::SsoInstance;
use crate::resolver::{self, ProfileSelector};
use crate::sso_config;

pub fn execute(ctx: &Context, selector: &ProfileSelector) -> Result<()> {
    // A declarative config names the SSO instance directly, no need to touch ~/.aws/config
    let instance = match selector {
        ProfileSelector::ConfigFile(path) => {
            let declared = sso_config::load(path, &ctx.config.defaults)?;
            SsoInstance {
                start_url: declared.start_url,
                region: declared.region,
            }
        }
        other => resolver::resolve(&ctx.store, &ctx.config.defaults, other)?
            .primary
            .instance(),
    };

    if ctx.auth_manager().logout(&instance)? {
        println!("✓ Logged out of {} ({})", instance.start_url, instance.region);
    } else {
        println!(
            "No cached session for {} ({})",
            instance.start_url, instance.region
        );
    }

    Ok(())
}
