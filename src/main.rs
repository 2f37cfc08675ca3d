mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use cumulus_config::Config;
use cumulus_offline::{
    ConnectivityMonitor, ConnectivityState, NewUpload, Offline, ReachabilitySource, Summary, TcpProbe, UploadOutcome,
};
use cumulus_remote::RemoteHandle;
use cumulus_remote::backend::LocalRemote;
use cumulus_store::Database;
use exn::{OptionExt, ResultExt};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct App {
    config: Config,
    db: Database,
    remote: Arc<LocalRemote>,
}
impl App {
    async fn open(config: Config) -> Result<Self> {
        if let Some(parent) = config.database.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::File(parent.to_path_buf()))?;
        }
        let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Store)?;
        let remote = LocalRemote::new(&config.remote.name, &config.remote.root).or_raise(|| ErrorKind::Remote)?;
        Ok(Self {
            config,
            db,
            remote: Arc::new(remote),
        })
    }

    fn offline(&self, monitor: Arc<ConnectivityMonitor>) -> Arc<Offline> {
        let remote: RemoteHandle = self.remote.clone();
        Arc::new(Offline::new(&self.db, remote, monitor, &self.config.identity, self.config.sync.remote_timeout()))
    }

    fn probe(&self) -> TcpProbe {
        let probe = &self.config.probe;
        TcpProbe::new(&probe.address, probe.interval(), probe.timeout())
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn read_upload(file: &Path, mime: String, folder: Option<String>) -> Result<NewUpload> {
    let payload = tokio::fs::read(file).await.or_raise(|| ErrorKind::File(file.to_path_buf()))?;
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_raise(|| ErrorKind::File(file.to_path_buf()))?;
    let upload = NewUpload::new(name, mime, payload);
    Ok(match folder {
        Some(folder) => upload.in_folder(folder),
        None => upload,
    })
}

fn print_summary(summary: Option<Summary>) {
    let Some(summary) = summary else {
        println!("reconciliation already in progress");
        return;
    };
    match summary.audit {
        Some(audit) => {
            println!("{} offline files confirmed in sync", audit.confirmed);
            for id in audit.local_only {
                println!("  {id} is no longer flagged offline remotely (kept)");
            }
        },
        None => println!("could not check offline flags"),
    }
    let drain = summary.drain;
    println!("{} of {} queued files synced", drain.succeeded, drain.succeeded + drain.remaining);
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let app = App::open(config).await?;
    let offline = app.offline(Arc::new(ConnectivityMonitor::new(ConnectivityState::Offline)));

    match cli.command {
        Command::Save { id, file, mime } => {
            let payload = tokio::fs::read(&file).await.or_raise(|| ErrorKind::File(file.clone()))?;
            let name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| id.clone());
            let size = payload.len() as u64;
            offline.save_for_offline(&id, name, payload, mime, size).await.or_raise(|| ErrorKind::Offline)?;
            println!("saved {id} for offline use");
        },
        Command::Remove { id } => {
            match offline.remove_from_offline(&id).await.or_raise(|| ErrorKind::Offline)? {
                true => println!("removed {id}"),
                false => println!("{id} was not cached"),
            }
        },
        Command::Read { id, out } => {
            let file = offline
                .read_offline(&id)
                .await
                .or_raise(|| ErrorKind::Offline)?
                .ok_or_raise(|| ErrorKind::NotCached(id.clone()))?;
            match out {
                Some(path) => tokio::fs::write(&path, &file.payload).await.or_raise(|| ErrorKind::File(path.clone()))?,
                None => std::io::stdout().write_all(&file.payload).or_raise(|| ErrorKind::File("<stdout>".into()))?,
            }
        },
        Command::List => {
            for file in offline.list_offline().await.or_raise(|| ErrorKind::Offline)? {
                println!("{}\t{}\t{}\t{}\t{}", file.id, file.name, file.size_bytes, file.mime_type, file.cached_at);
            }
        },
        Command::Upload { file, folder, mime } => {
            let upload = read_upload(&file, mime, folder).await?;
            let monitor = Arc::new(ConnectivityMonitor::from_source(&app.probe()).await);
            let offline = app.offline(monitor);
            match offline.upload(upload).await.or_raise(|| ErrorKind::Offline)? {
                UploadOutcome::Uploaded(path) => println!("uploaded to {}", path.display()),
                UploadOutcome::Queued(id) => println!("remote unreachable; queued as {id}"),
            }
        },
        Command::Enqueue { file, folder, mime } => {
            let upload = read_upload(&file, mime, folder).await?;
            let id = offline.enqueue_offline_write(upload).await.or_raise(|| ErrorKind::Offline)?;
            println!("queued as {id}");
        },
        Command::Queue => {
            for write in offline.list_queued().await.or_raise(|| ErrorKind::Offline)? {
                let folder = write.target_folder_id.as_deref().unwrap_or("/");
                println!("{}\t{}\t{}\t{}\t{}", write.id, write.name, write.size_bytes, folder, write.queued_at);
            }
        },
        Command::Stats => {
            let stats = offline.stats().await.or_raise(|| ErrorKind::Offline)?;
            println!("cached: {} files, {} bytes", stats.cached_files, stats.cached_bytes);
            println!("queued: {} files, {} bytes", stats.queued_files, stats.queued_bytes);
        },
        Command::Sync => {
            let offline = app.offline(Arc::new(ConnectivityMonitor::new(ConnectivityState::Online)));
            print_summary(offline.trigger_reconciliation().await.or_raise(|| ErrorKind::Offline)?);
        },
        Command::ClearCache => {
            let removed = offline.clear_offline().await.or_raise(|| ErrorKind::Offline)?;
            println!("removed {removed} offline files");
        },
        Command::ClearQueue => {
            let removed = offline.clear_queue().await.or_raise(|| ErrorKind::Offline)?;
            println!("discarded {removed} queued uploads");
        },
        Command::Watch => {
            let probe = app.probe();
            // Start offline so a reachable remote fires the first reconnection.
            let monitor = Arc::new(ConnectivityMonitor::new(ConnectivityState::Offline));
            let offline = app.offline(monitor.clone());
            let task = offline.spawn();
            tracing::info!(address = probe.address(), "watching connectivity");
            tokio::select! {
                _ = monitor.follow(probe.signals()) => {},
                _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
            }
            task.abort();
        },
        Command::RemoteLs => {
            for file in app.remote.list_files().await.or_raise(|| ErrorKind::Remote)? {
                let flag = if file.offline_enabled { "offline" } else { "-" };
                println!("{}\t{}\t{}\t{}\t{}", file.id, file.name, file.size_bytes, flag, file.storage_path.display());
            }
        },
        Command::RemoteFlag { id, off } => {
            app.remote.set_offline_flag(&id, !off).await.or_raise(|| ErrorKind::Remote)?;
            println!("{id} {}", if off { "unflagged" } else { "flagged offline" });
        },
    }
    app.db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(?error, "command failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        },
    }
}
