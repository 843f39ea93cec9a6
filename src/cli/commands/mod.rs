use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("backdesk")
        .about("Back-office session core and development API simulator")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("BACKDESK_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("latency-ms")
                .long("latency-ms")
                .help("Fixed artificial delay applied to every response, in milliseconds")
                .default_value("250")
                .env("BACKDESK_LATENCY_MS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("access-ttl")
                .long("access-ttl")
                .help("Access-token lifetime in seconds; short by default so refresh is observable")
                .default_value("10")
                .env("BACKDESK_ACCESS_TTL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("demo-email")
                .long("demo-email")
                .help("Email of the demo credential pair")
                .default_value("admin@panpan.dev")
                .env("BACKDESK_DEMO_EMAIL"),
        )
        .arg(
            Arg::new("demo-password")
                .long("demo-password")
                .help("Password of the demo credential pair")
                .default_value("1234")
                .env("BACKDESK_DEMO_PASSWORD"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("BACKDESK_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "backdesk");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Back-office session core and development API simulator"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_defaults() {
        let command = new();
        let matches = command.get_matches_from(vec!["backdesk"]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
        assert_eq!(matches.get_one::<u64>("latency-ms").copied(), Some(250));
        assert_eq!(matches.get_one::<u64>("access-ttl").copied(), Some(10));
        assert_eq!(
            matches.get_one::<String>("demo-email").map(String::as_str),
            Some("admin@panpan.dev")
        );
        assert_eq!(
            matches
                .get_one::<String>("demo-password")
                .map(String::as_str),
            Some("1234")
        );
    }

    #[test]
    fn test_flags_override_defaults() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "backdesk",
            "--port",
            "9090",
            "--latency-ms",
            "5",
            "--access-ttl",
            "60",
            "--demo-email",
            "ops@example.org",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
        assert_eq!(matches.get_one::<u64>("latency-ms").copied(), Some(5));
        assert_eq!(matches.get_one::<u64>("access-ttl").copied(), Some(60));
        assert_eq!(
            matches.get_one::<String>("demo-email").map(String::as_str),
            Some("ops@example.org")
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("BACKDESK_PORT", Some("443")),
                ("BACKDESK_LATENCY_MS", Some("10")),
                ("BACKDESK_ACCESS_TTL", Some("30")),
                ("BACKDESK_DEMO_EMAIL", Some("env@example.org")),
                ("BACKDESK_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["backdesk"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(matches.get_one::<u64>("latency-ms").copied(), Some(10));
                assert_eq!(matches.get_one::<u64>("access-ttl").copied(), Some(30));
                assert_eq!(
                    matches.get_one::<String>("demo-email").map(String::as_str),
                    Some("env@example.org")
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("BACKDESK_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["backdesk"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("BACKDESK_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["backdesk".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();
                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }
}
