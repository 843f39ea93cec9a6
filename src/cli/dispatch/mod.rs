use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let demo_email = matches
        .get_one::<String>("demo-email")
        .map(String::to_string)
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --demo-email"))?;
    let demo_password = matches
        .get_one::<String>("demo-password")
        .map(|password| SecretString::from(password.clone()))
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --demo-password"))?;

    let mut globals = GlobalArgs::new(demo_email, demo_password);
    globals.latency_ms = matches.get_one::<u64>("latency-ms").copied().unwrap_or(250);
    globals.access_ttl_secs = matches.get_one::<u64>("access-ttl").copied().unwrap_or(10);

    let action = Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
    };

    Ok((action, globals))
}
