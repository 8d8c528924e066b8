use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgGroup, ColorChoice, Command,
};

pub const ARG_VERBOSITY: &str = "verbosity";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
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

    Command::new("oidc2fer")
        .about("Identity broker attribute pipeline and signed userinfo endpoint")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("OIDC2FER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("pipeline-config")
                .long("pipeline-config")
                .help("JSON file declaring the request and response pipeline stages")
                .env("OIDC2FER_PIPELINE_CONFIG"),
        )
        .arg(
            Arg::new("signing-key")
                .long("signing-key")
                .help("RSA private key (PEM or DER) used to sign userinfo responses")
                .env("OIDC2FER_SIGNING_KEY")
                .required(true),
        )
        .arg(
            Arg::new("signing-key-id")
                .long("signing-key-id")
                .help("Key id placed in the JWT header")
                .default_value("oidc2fer")
                .env("OIDC2FER_SIGNING_KEY_ID"),
        )
        .arg(
            Arg::new("issuer")
                .long("issuer")
                .help("Issuer (iss) of the signed userinfo responses")
                .env("OIDC2FER_ISSUER")
                .required(true),
        )
        .arg(
            Arg::new("introspection-url")
                .long("introspection-url")
                .help("RFC 7662 token introspection endpoint, example: https://auth.tld/introspect")
                .env("OIDC2FER_INTROSPECTION_URL")
                .requires("introspection-client-id")
                .requires("introspection-client-secret"),
        )
        .arg(
            Arg::new("introspection-client-id")
                .long("introspection-client-id")
                .help("Client id used to authenticate to the introspection endpoint")
                .env("OIDC2FER_INTROSPECTION_CLIENT_ID"),
        )
        .arg(
            Arg::new("introspection-client-secret")
                .long("introspection-client-secret")
                .help("Client secret used to authenticate to the introspection endpoint")
                .env("OIDC2FER_INTROSPECTION_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .help("JSON file of static access tokens, instead of introspection")
                .env("OIDC2FER_TOKENS"),
        )
        .group(
            ArgGroup::new("verifier")
                .args(["introspection-url", "tokens"])
                .required(true),
        )
        .arg(
            Arg::new("claims")
                .long("claims")
                .help("JSON file of subject claims and custom scopes")
                .env("OIDC2FER_CLAIMS")
                .required(true),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("OIDC2FER_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
