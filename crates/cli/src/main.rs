//! CLI application resolving its configuration from flags, environment and defaults.

use clap::{Command, FromArgMatches, Subcommand};
use flagenv_config::{bind_env_convention, bind_env_mapping, env_var_name, FlagSet, ProcessEnv};
use flagenv_telemetry::{parse_level, LogFormat, Logger, LoggerConfig, Severity};
use serde::Serialize;
use std::fmt::Display;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info};

/// Prefix of the environment variables derived from flag names.
const ENV_PREFIX: &str = "FLAGENV";

/// Environment variables bound to flags outside the naming convention.
const ENV_MAPPING: [(&str, &str); 1] = [("POD_NAMESPACE", "namespace")];

#[derive(Subcommand)]
enum Commands {
    /// Print every flag with its resolved value
    Show {
        /// Print the flags as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the environment variable each flag can be set from
    EnvVars,
}

/// Typed view of the resolved flags.
#[derive(Debug, Serialize)]
struct Settings {
    namespace: String,
    target_namespaces: Vec<String>,
    listen: SocketAddr,
    max_retries: u32,
    #[serde(with = "seconds")]
    poll_interval: Duration,
}

/// Output of `show --json`.
#[derive(Debug, Serialize)]
struct Report<'a> {
    flags: Vec<FlagReport>,
    settings: &'a Settings,
}

/// One row of the `show` report.
#[derive(Debug, Serialize)]
struct FlagReport {
    name: String,
    value: String,
    default: String,
    set: bool,
    env_var: String,
}

fn main() -> anyhow::Result<()> {
    let mut flags = define_flags()?;

    let command = Commands::augment_subcommands(
        Command::new("flagenv")
            .about("Resolve configuration from command-line flags, environment variables and defaults")
            .version(env!("CARGO_PKG_VERSION"))
            .args(flags.args(Some(ENV_PREFIX))),
    );
    let matches = command.get_matches();

    if let Err(err) = flags.apply_matches(&matches) {
        fatal("error setting flags from the command line", err);
    }
    if let Err(err) = bind_env_convention(&mut flags, &ProcessEnv, ENV_PREFIX) {
        fatal("error setting flags from environment variables", err);
    }
    if let Err(err) = bind_env_mapping(&mut flags, &ProcessEnv, ENV_MAPPING) {
        fatal("error mapping environment variables to flags", err);
    }

    let logger = match init_logger(&flags) {
        Ok(logger) => logger,
        Err(err) => fatal("error initializing the logger", err),
    };
    logger.install()?;

    for flag in flags.visit() {
        debug!("Flag {} was set explicitly", flag.name());
    }
    let settings = settings(&flags)?;
    info!(
        "Resolved configuration: namespace={:?} listen={} max_retries={} poll_interval={:?}",
        settings.namespace, settings.listen, settings.max_retries, settings.poll_interval
    );

    let command = if matches.subcommand_name().is_some() {
        Commands::from_arg_matches(&matches)?
    } else {
        Commands::Show { json: false }
    };

    match command {
        Commands::Show { json } => show(&flags, &settings, json)?,
        Commands::EnvVars => env_vars(&flags),
    }

    Ok(())
}

fn define_flags() -> anyhow::Result<FlagSet> {
    let mut flags = FlagSet::new("flagenv");
    flags
        .string("log-level", "info", "log level (panic, fatal, error, warn, info, debug, trace)")?
        .parsed("log-format", LogFormat::Timestamped, "log layout (native, timestamped, uptime, json)")?
        .bool("disable-timestamp", false, "disable timestamp logging")?
        .string("namespace", "", "namespace the program is running in")?
        .list("target-namespaces", &[], "namespaces to watch, defaults to --namespace")?
        .parsed("listen", SocketAddr::from(([127, 0, 0, 1], 8080)), "ip:port to listen on")?
        .parsed("max-retries", 3u32, "how many times a failed operation is retried")?
        .duration("poll-interval", Duration::from_secs(30), "how often to poll for changes")?;
    Ok(flags)
}

fn init_logger(flags: &FlagSet) -> anyhow::Result<Logger> {
    let level = parse_level(&flags.value("log-level")?)?;
    let mut config = LoggerConfig::new(level)
        .field("app", "flagenv")
        .format(flags.get::<LogFormat>("log-format")?);
    if flags.get_bool("disable-timestamp")? {
        config = config.without_timestamps();
    }
    Ok(config.build())
}

fn settings(flags: &FlagSet) -> anyhow::Result<Settings> {
    let namespace = flags.value("namespace")?;
    let mut target_namespaces = flags.get_list("target-namespaces")?;
    if target_namespaces.is_empty() && !namespace.is_empty() {
        target_namespaces.push(namespace.clone());
    }

    Ok(Settings {
        namespace,
        target_namespaces,
        listen: flags.get("listen")?,
        max_retries: flags.get("max-retries")?,
        poll_interval: flags.get_duration("poll-interval")?,
    })
}

fn show(flags: &FlagSet, settings: &Settings, json: bool) -> anyhow::Result<()> {
    let reports: Vec<FlagReport> = flags
        .visit_all()
        .map(|flag| FlagReport {
            name: flag.name().to_string(),
            value: flag.value(),
            default: flag.default_value().to_string(),
            set: flag.is_changed(),
            env_var: env_var_name(ENV_PREFIX, flag.name()),
        })
        .collect();

    if json {
        let report = Report {
            flags: reports,
            settings,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let width = reports.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for report in &reports {
        let marker = if report.set { "*" } else { " " };
        println!("{} {:width$}  {}", marker, report.name, report.value, width = width);
    }
    Ok(())
}

fn env_vars(flags: &FlagSet) {
    let width = flags.visit_all().map(|f| f.name().len()).max().unwrap_or(0);
    for flag in flags.visit_all() {
        println!("{:width$}  {}", flag.name(), env_var_name(ENV_PREFIX, flag.name()), width = width);
    }
    for (env_var, flag) in ENV_MAPPING {
        println!("{:width$}  {}", flag, env_var, width = width);
    }
}

/// Log `err` on stderr and exit with status 1.
fn fatal(message: &str, err: impl Display) -> ! {
    let logger = LoggerConfig::new(Severity::Error)
        .field("app", "flagenv")
        .format(LogFormat::Timestamped)
        .build();
    logger.log(Severity::Fatal, format_args!("{}: {}", message, err));
    std::process::exit(1);
}

mod seconds {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }
}
