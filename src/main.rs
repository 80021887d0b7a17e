//! Policy Gateway - authenticating API gateway for provider services

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info};

use policy_gateway::{
    audit::LogAuditor,
    auth::JwksTokenParser,
    cli::Cli,
    config::Config,
    idp::IdpClient,
    m2m::TokenSource,
    processor::{MetricsProcessor, Pipeline, PolicyStore, Processor},
    provider::{ClientRegistry, HttpProviderClient, ProviderClient},
    ratelimit::RedisGatekeeper,
    server::{admin_router, public_router, Server},
    setup_tracing, sync,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_tracing(&cli.log_level, cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gateway exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> policy_gateway::Result<()> {
    let config = Config::load(&cli.config)?;

    let (shutdown_tx, _) = broadcast::channel(1);
    spawn_signal_handler(shutdown_tx.clone());

    let gatekeeper = Arc::new(RedisGatekeeper::connect(&config.redis.url()).await?);
    info!(address = %config.redis.address, "connected to rate limiter backend");

    let idp = Arc::new(IdpClient::new(&config.idp));

    let clients = Arc::new(init_client_registry(&config, &idp, &shutdown_tx).await?);

    let descriptions = Arc::new(PolicyStore::new(HashMap::new()));
    sync::run(
        config.description_sync_period,
        Arc::clone(&clients),
        Arc::clone(&descriptions),
        &shutdown_tx,
    )
    .await;

    let token_parser = Arc::new(JwksTokenParser::new(&config.idp));

    let processor: Arc<dyn Processor> = Arc::new(Pipeline::new(
        descriptions,
        clients,
        token_parser,
        Arc::new(LogAuditor),
        gatekeeper,
    ));

    let registry = Arc::new(prometheus::Registry::new());
    let processor: Arc<dyn Processor> = Arc::new(MetricsProcessor::new(processor, &registry)?);

    let public = Server::new(
        "public",
        config.public_listen_address.clone(),
        public_router(processor),
    );
    let admin = Server::new(
        "admin",
        config.admin_listen_address.clone(),
        admin_router(registry),
    );

    tokio::try_join!(public.run(&shutdown_tx), admin.run(&shutdown_tx))?;

    Ok(())
}

/// Build the boot-time provider client registry, creating an M2M token source
/// for every service that declares an audience.
async fn init_client_registry(
    config: &Config,
    idp: &Arc<IdpClient>,
    shutdown: &broadcast::Sender<()>,
) -> policy_gateway::Result<ClientRegistry> {
    let mut clients: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();

    for service in &config.services {
        let audience = service.m2m_audience.as_deref().filter(|a| !a.is_empty());
        let m2m = match audience {
            Some(audience) => {
                Some(TokenSource::connect(Arc::clone(idp), audience.to_string(), shutdown).await?)
            }
            None => None,
        };

        let client = HttpProviderClient::new(
            service.name.clone(),
            service.address.clone(),
            m2m,
            service.operation_timeout,
        )?;

        info!(service = %service.name, address = %service.address, "registered provider client");
        clients.insert(service.name.clone(), Arc::new(client));
    }

    Ok(ClientRegistry::new(clients))
}

fn spawn_signal_handler(shutdown: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(_) => {
                    let _ = ctrl_c.await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        info!("shutdown signal received");
        let _ = shutdown.send(());
    });
}
