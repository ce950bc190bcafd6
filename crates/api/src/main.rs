use taskq_infra::config::JobsConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    taskq_observability::init();

    let config = JobsConfig::from_env()?;
    tracing::info!(
        database_url = %config.database_url,
        bind_addr = %config.bind_addr,
        simulated_work_ms = config.simulated_work.as_millis() as u64,
        worker = %config.worker_name,
        "starting taskq"
    );

    taskq_api::server::run(config).await
}
