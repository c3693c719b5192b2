use std::path::{Path, PathBuf};

use dq_config::{DqConfig, Environment, default_path};
use dq_output::TaskOutput;
use dq_requests::{ApiClient, Manifest, Resource, load_manifests};
use dq_results::{QUEUE_CAPACITY, QueryResults};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::{
    cli::Cli,
    error::{Error, Result},
};

/// Where the configuration lives for this invocation.
pub fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(default_path()?),
    }
}

/// Client for `--server`, the named environment or the current one.
pub fn client(cli: &Cli) -> Result<ApiClient> {
    if let Some(server) = &cli.server {
        return Ok(ApiClient::new(server.as_str()));
    }
    let config = DqConfig::from_file(&config_path(cli)?)?;
    let environment = match &cli.environment {
        Some(name) => config.environment(name)?,
        None => config.current_environment()?,
    };
    debug!("Using environment {} at {}", environment.name, environment.api_url);
    Ok(ApiClient::new(environment.api_url.as_str()))
}

/// Run a manifest operation with live progress, closing the output either way.
async fn with_output<F, Fut>(files: &[PathBuf], operation: F) -> Result<()>
where
    F: FnOnce(Vec<Manifest>, TaskOutput) -> Fut,
    Fut: Future<Output = dq_requests::prelude::Result<()>>,
{
    let manifests = load_manifests(files)?;
    let output = TaskOutput::for_stdout();
    let result = operation(manifests, output.clone()).await;
    if let Err(err) = output.close().await {
        error!("Progress output failed - {err}");
    }
    Ok(result?)
}

pub async fn handle_apply(client: &ApiClient, files: &[PathBuf]) -> Result<()> {
    with_output(files, |manifests, output| async move {
        client.apply(&manifests, &output).await
    })
    .await
}

pub async fn handle_delete(client: &ApiClient, files: &[PathBuf]) -> Result<()> {
    with_output(files, |manifests, output| async move {
        client.delete(&manifests, &output).await
    })
    .await
}

pub async fn handle_wait(client: &ApiClient, files: &[PathBuf], timeout: u64) -> Result<()> {
    with_output(files, |manifests, output| async move {
        client.ready_wait(&manifests, timeout, &output).await
    })
    .await
}

fn availability(resource: &Resource) -> String {
    match resource.status.get("available") {
        Some(serde_json::Value::Bool(true)) => "true".to_string(),
        Some(serde_json::Value::Bool(false)) => "false".to_string(),
        _ => "unknown".to_string(),
    }
}

pub async fn handle_list(client: &ApiClient, kind: &str) -> Result<()> {
    let resources = client.list_resources(kind).await?;
    let width = resources
        .iter()
        .map(|resource| resource.id.len())
        .chain(std::iter::once(2))
        .max()
        .unwrap_or(2);

    println!("{:<width$}  AVAILABLE", "ID");
    for resource in &resources {
        println!("{:<width$}  {}", resource.id, availability(resource));
    }
    Ok(())
}

pub async fn handle_describe(client: &ApiClient, kind: &str, name: &str) -> Result<()> {
    let resource = client.get_resource(kind, name).await?;
    println!("{}", serde_json::to_string_pretty(&resource)?);
    Ok(())
}

/// Feed a continuous query watch into the live result table.
///
/// Ends when the server closes the stream, the user quits the table or on
/// Ctrl-C.
pub async fn handle_watch(client: &ApiClient, name: &str) -> Result<()> {
    let results = QueryResults::for_stdout()?;
    let (tx, mut rx) = mpsc::channel(QUEUE_CAPACITY);

    let watch_client = client.clone();
    let query = name.to_string();
    let watcher =
        tokio::spawn(async move { watch_client.watch("continuousquery", &query, tx).await });

    let mut stream_ended = false;
    loop {
        tokio::select! {
            change = rx.recv() => match change {
                Some(change) => results.change(change).await,
                None => {
                    stream_ended = true;
                    break;
                }
            },
            _ = results.closed() => {
                info!("Result view closed, stopping watch");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                break;
            }
        }
    }

    let watched = if stream_ended {
        Some(watcher.await)
    } else {
        watcher.abort();
        None
    };
    let closed = results.close().await;

    if let Some(joined) = watched {
        joined.map_err(|err| Error::WatchAborted(err.to_string()))??;
    }
    Ok(closed?)
}

pub fn handle_env_list(path: &Path) -> Result<()> {
    let config = DqConfig::from_file(path)?;
    for environment in &config.environments {
        let marker = if config.current.as_deref() == Some(environment.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:<16} {:<10} {}",
            environment.name,
            format!("{:?}", environment.kind).to_lowercase(),
            environment.api_url
        );
    }
    Ok(())
}

pub fn handle_env_use(path: &Path, name: &str) -> Result<()> {
    let mut config = DqConfig::from_file(path)?;
    config.set_current(name)?;
    config.to_file(path)?;
    println!("Current environment is now {name}");
    Ok(())
}

pub fn handle_env_add(path: &Path, environment: Environment) -> Result<()> {
    let mut config = DqConfig::from_file(path)?;
    let name = environment.name.clone();
    config.upsert(environment);
    config.to_file(path)?;
    println!("Registered environment {name}");
    Ok(())
}

pub fn handle_env_remove(path: &Path, name: &str) -> Result<()> {
    let mut config = DqConfig::from_file(path)?;
    config.remove(name)?;
    config.to_file(path)?;
    println!("Removed environment {name}");
    Ok(())
}
