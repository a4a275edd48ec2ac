use alerts::{AlertEngine, AlertFilter, DisabledEffects, EngineConfig, MemoryStore, Selector};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use models::{AlertType, Id, Priority, UnknownPriorityPolicy};
use std::path::PathBuf;
use std::sync::Arc;

mod fixture;

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum LogFormat {
    Text,
    Json,
}

/// alertctl is an operator tool for the admin alert engine.
/// It loads alert records from a JSON file, and prints results as JSON.
#[derive(clap::Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path of a JSON array of alert records.
    #[clap(long, env = "ALERTS")]
    alerts: PathBuf,
    /// Identity of the operator, recorded upon resolution.
    #[clap(long, env = "ALERT_ACTOR", default_value = "admin")]
    actor: String,
    /// Act without admin privilege. No alerts are visible.
    #[clap(long, env = "ALERT_NO_ADMIN")]
    no_admin: bool,
    /// Policy for records having an unrecognized priority: medium or quarantine.
    #[clap(long, env = "UNKNOWN_PRIORITY", default_value = "medium")]
    unknown_priority: UnknownPriorityPolicy,
    /// Don't write resolutions back to the alerts file.
    #[clap(long, env = "ALERT_DRY_RUN")]
    dry_run: bool,
    /// Format of logs written to stderr.
    #[clap(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// List active alerts which match a filter, in priority order.
    List(FilterArgs),
    /// Group active alerts which match a filter by their priority.
    Groups(FilterArgs),
    /// Show statistics of all active alerts.
    Stats,
    /// Show alert records which were quarantined while loading.
    Rejected,
    /// Resolve an alert.
    Resolve {
        /// Id of the alert.
        id: Id,
        /// Action recorded as the resolution.
        #[clap(long, default_value = "dismissed")]
        action: String,
    },
    /// Execute quick actions of an alert in order, and show their history.
    Act {
        /// Id of the alert.
        id: Id,
        /// Ids of the alert's quick actions.
        #[clap(required = true)]
        actions: Vec<String>,
    },
    /// Print each snapshot of the active alerts until interrupted.
    Watch,
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Alert type to show, or "all".
    #[clap(long = "type", default_value = "all")]
    alert_type: Selector<AlertType>,
    /// Priority to show, or "all".
    #[clap(long, default_value = "all")]
    priority: Selector<Priority>,
    /// Case-insensitive search of titles, descriptions and source data.
    #[clap(long)]
    search: Option<String>,
    /// Show alerts created on or after this day (UTC).
    #[clap(long)]
    since: Option<NaiveDate>,
    /// Show alerts created on or before this day (UTC).
    #[clap(long)]
    until: Option<NaiveDate>,
}

impl From<FilterArgs> for AlertFilter {
    fn from(args: FilterArgs) -> Self {
        AlertFilter {
            alert_type: args.alert_type,
            priority: args.priority,
            search_term: args.search,
            ..Default::default()
        }
        .with_dates(args.since, args.until)
    }
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    // Logs go to stderr, so that stdout carries only command output.
    let builder = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .context("setting tracing default failed")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    tracing::debug!(?args, "started!");
    let result = runtime.block_on(async_main(args));

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result
}

async fn async_main(
    Args {
        alerts: path,
        actor,
        no_admin,
        unknown_priority,
        dry_run,
        log_format: _,
        command,
    }: Args,
) -> anyhow::Result<()> {
    let config = EngineConfig {
        unknown_priority,
        ..Default::default()
    };
    let mut fixture = fixture::Fixture::load(&path, config.unknown_priority)?;

    let store = Arc::new(MemoryStore::new(fixture.accepted()));
    let engine = AlertEngine::new(config, store.clone(), Arc::new(DisabledEffects), Arc::new(!no_admin));
    engine
        .refresh()
        .await
        .context("failed to load active alerts")?;

    match command {
        Command::List(filter) => print(&engine.active_alerts(&filter.into())),
        Command::Groups(filter) => print(&engine.grouped_alerts(&filter.into())),
        Command::Stats => print(&engine.stats()),
        Command::Rejected => print(&fixture.rejected()),
        Command::Resolve { id, action } => {
            let outcome = engine.resolve_alert(id, &actor, &action).await?;
            if !outcome.was_applied() {
                tracing::warn!(%id, "alert was already resolved");
            }
            if !dry_run {
                fixture.write_back(&store)?;
            }
            print(&serde_json::json!({
                "applied": outcome.was_applied(),
                "resolution": outcome.resolution(),
            }))
        }
        Command::Act { id, actions } => {
            let alert = engine
                .get(id)
                .with_context(|| format!("alert {id} is not an active alert"))?;

            let mut failed = None;
            for action_id in &actions {
                let Some(action) = alert.quick_action(action_id) else {
                    failed = Some(anyhow::anyhow!(
                        "alert {id} does not offer quick action '{action_id}'"
                    ));
                    break;
                };
                if let Err(err) = engine.execute_quick_action(&alert, action, &actor).await {
                    failed = Some(anyhow::Error::from(err));
                    break;
                }
            }

            if !dry_run {
                fixture.write_back(&store)?;
            }
            print(&engine.action_history(id))?;

            match failed {
                Some(err) => Err(err.context("failed to execute quick actions")),
                None => Ok(()),
            }
        }
        Command::Watch => watch(&engine).await,
    }
}

async fn watch(engine: &AlertEngine<MemoryStore, DisabledEffects>) -> anyhow::Result<()> {
    let sub = engine.subscribe(
        |alerts| {
            if let Err(err) = print_line(alerts) {
                tracing::error!(error = ?err, "failed to print alerts");
            }
        },
        |message| tracing::error!(%message, "alert feed failed"),
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            tracing::info!("interrupted, closing alert feed");
            Ok(())
        }
        () = sub.finished() => {
            let error = engine.feed().error.unwrap_or_else(|| "feed closed".to_string());
            anyhow::bail!("alert feed ended: {error}")
        }
    }
}

fn print<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("failed to write output")?;
    std::io::Write::write_all(&mut stdout, b"\n")?;
    Ok(())
}

fn print_line<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value).context("failed to write output")?;
    std::io::Write::write_all(&mut stdout, b"\n")?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "alertctl",
            "--alerts",
            "alerts.json",
            "--no-admin",
            "--unknown-priority",
            "quarantine",
            "list",
            "--priority",
            "high",
            "--search",
            "laptop",
            "--since",
            "2026-03-01",
        ])
        .unwrap();

        assert!(args.no_admin);
        assert!(!args.dry_run);
        assert_eq!(args.unknown_priority, UnknownPriorityPolicy::Quarantine);

        let Command::List(filter) = args.command else {
            panic!("expected list command");
        };
        let filter = AlertFilter::from(filter);
        assert_eq!(filter.priority, Selector::Only(Priority::High));
        assert_eq!(filter.alert_type, Selector::All);
        assert_eq!(filter.search_term.as_deref(), Some("laptop"));
        assert_eq!(
            filter.date_range.start,
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );

        let args =
            Args::try_parse_from(["alertctl", "--alerts", "a.json", "act", "0a", "remind", "dismiss"])
                .unwrap();
        assert!(!args.no_admin);
        let Command::Act { id, actions } = args.command else {
            panic!("expected act command");
        };
        assert_eq!(id, Id::from(10));
        assert_eq!(actions, vec!["remind", "dismiss"]);

        assert!(Args::try_parse_from(["alertctl", "--alerts", "a.json", "act", "0a"]).is_err());

        let args = Args::try_parse_from(["alertctl", "--alerts", "a.json", "--dry-run", "stats"])
            .unwrap();
        assert!(args.dry_run);
        assert!(
            Args::try_parse_from(["alertctl", "--alerts", "a.json", "list", "--type", "lost_item"])
                .is_err()
        );
    }

    #[test]
    fn test_global_flags_read_env() {
        use clap::CommandFactory;

        let command = Args::command();
        let envs: Vec<_> = command
            .get_arguments()
            .filter(|arg| !arg.is_positional() && !["help", "version"].contains(&arg.get_id().as_str()))
            .map(|arg| (arg.get_id().to_string(), arg.get_env().map(|e| e.to_string_lossy().into_owned())))
            .collect();

        assert_eq!(
            envs,
            vec![
                ("alerts".to_string(), Some("ALERTS".to_string())),
                ("actor".to_string(), Some("ALERT_ACTOR".to_string())),
                ("no_admin".to_string(), Some("ALERT_NO_ADMIN".to_string())),
                ("unknown_priority".to_string(), Some("UNKNOWN_PRIORITY".to_string())),
                ("dry_run".to_string(), Some("ALERT_DRY_RUN".to_string())),
                ("log_format".to_string(), Some("LOG_FORMAT".to_string())),
            ]
        );
    }
}
