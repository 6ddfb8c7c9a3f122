use clap::{Parser, Subcommand};
use std::path::PathBuf;
use time::Duration;

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(inkpad::config::AppConfig, u16),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::AuthKey) = cli.command {
        let code = run_auth_key();
        return RunOutcome::Exit(code);
    }

    let uploads_dir = match cli.uploads_dir.as_ref() {
        Some(dir) => dir.clone(),
        None => {
            eprintln!("error: --uploads-dir is required unless using a subcommand");
            return RunOutcome::Exit(2);
        }
    };
    if let Err(err) = std::fs::create_dir_all(&uploads_dir) {
        eprintln!("error: failed to create uploads directory: {err}");
        return RunOutcome::Exit(2);
    }
    let uploads_dir = std::fs::canonicalize(&uploads_dir)
        .unwrap_or_else(|err| panic!("failed to resolve uploads directory: {err}"));

    let auth = match resolve_auth_config(&cli) {
        Ok(auth) => auth,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve(
        inkpad::config::AppConfig {
            uploads_dir,
            app_name: cli.app_name,
            upload_max_bytes: cli
                .upload_max_bytes
                .unwrap_or(inkpad::config::DEFAULT_UPLOAD_MAX_BYTES),
            auth,
        },
        cli.port,
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "inkpad",
    version,
    about = "Digital notebook server with realtime session sync"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long)]
    uploads_dir: Option<PathBuf>,
    #[arg(long, default_value = "Inkpad")]
    app_name: String,
    #[arg(long, default_value_t = 3000)]
    port: u16,
    #[arg(long, env = "INKPAD_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "INKPAD_AUTH_TOKEN_TTL")]
    auth_token_ttl: Option<String>,
    #[arg(long, env = "INKPAD_UPLOAD_MAX_BYTES")]
    upload_max_bytes: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a signing key for bearer tokens.
    AuthKey,
}

fn run_auth_key() -> i32 {
    let secret = match inkpad::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn resolve_auth_config(cli: &Cli) -> Result<inkpad::config::AuthConfig, String> {
    let auth_key = cli
        .auth_key
        .as_ref()
        .ok_or("--auth-key is required (generate one with `inkpad auth-key`)")?
        .trim();
    if auth_key.is_empty() {
        return Err("auth key cannot be empty".to_string());
    }

    let token_ttl = match cli.auth_token_ttl.as_deref() {
        Some(raw) => parse_auth_token_ttl(raw)?,
        None => default_auth_token_ttl(),
    };

    Ok(inkpad::config::AuthConfig {
        key: auth_key.to_string(),
        token_ttl,
    })
}

fn default_auth_token_ttl() -> Duration {
    Duration::days(7)
}

fn parse_auth_token_ttl(raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("auth token ttl cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err("auth token ttl must be greater than 0".to_string());
    }

    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        _ => Err(format!(
            "invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            command: None,
            uploads_dir: Some(PathBuf::from("/")),
            app_name: "Inkpad".to_string(),
            port: 3000,
            auth_key: None,
            auth_token_ttl: None,
            upload_max_bytes: None,
        }
    }

    #[test]
    fn parse_auth_token_ttl__should_parse_seconds_when_unit_missing() {
        // When
        let duration = parse_auth_token_ttl("30").expect("parse ttl");

        // Then
        assert_eq!(duration, Duration::seconds(30));
    }

    #[test]
    fn parse_auth_token_ttl__should_parse_units() {
        // When
        let duration = parse_auth_token_ttl("15m").expect("parse ttl");

        // Then
        assert_eq!(duration, Duration::minutes(15));
    }

    #[test]
    fn parse_auth_token_ttl__should_reject_invalid_values() {
        // Then
        assert!(parse_auth_token_ttl("").is_err());
        assert!(parse_auth_token_ttl("0").is_err());
        assert!(parse_auth_token_ttl("abc").is_err());
    }

    #[test]
    fn resolve_auth_config__should_require_an_auth_key() {
        // Given
        let cli = base_cli();

        // When
        let result = resolve_auth_config(&cli);

        // Then
        assert!(result.is_err());
    }

    #[test]
    fn resolve_auth_config__should_apply_the_default_ttl() {
        // Given
        let mut cli = base_cli();
        cli.auth_key = Some("base64-key".to_string());

        // When
        let config = resolve_auth_config(&cli).expect("resolve auth config");

        // Then
        assert_eq!(config.key, "base64-key");
        assert_eq!(config.token_ttl, default_auth_token_ttl());
    }
}
