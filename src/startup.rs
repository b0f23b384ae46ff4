use std::{net::TcpListener, sync::Arc, time::Duration};

use actix_files::Files;
use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};
use anyhow::Context;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tokio::sync::mpsc;

use crate::{
    configuration::{DatabaseSettings, Settings},
    routes,
    services::{
        analysis_worker_handler, cache_cleanup_handler, data_persistance_handler, AnalysisJob,
        AnalysisQueue, Analyzer, ArtifactWriter, Fetcher, PersistantData,
    },
};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    /// Connects and migrates the database, spawns the background handlers and
    /// binds the HTTP server. Port 0 binds a random port.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let pool = get_connection_pool(&settings.database)
            .context("Invalid database configuration")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        tokio::fs::create_dir_all(&settings.storage.output_dir)
            .await
            .with_context(|| {
                format!("Failed to create output dir {}", settings.storage.output_dir)
            })?;

        let fetcher = Fetcher::new(&settings.scraper).context("Failed to build HTTP client")?;
        let analyzer = Arc::new(Analyzer::new(fetcher));
        let writer = ArtifactWriter::new(
            &settings.storage.output_dir,
            settings.scraper.max_asset_downloads,
        );

        let queue_capacity = settings.worker.queue_capacity.max(1);
        let (job_sender, job_receiver) = mpsc::channel::<AnalysisJob>(queue_capacity);
        let (persistant_data_sender, persistant_data_receiver) =
            mpsc::channel::<PersistantData>(queue_capacity * 2);

        // Spawn background tasks
        let pool_clone = pool.clone();
        tokio::spawn(async move {
            data_persistance_handler(persistant_data_receiver, pool_clone).await
        });

        let analyzer_clone = analyzer.clone();
        let pool_size = settings.worker.pool_size;
        let job_timeout = settings.worker.job_timeout();
        tokio::spawn(async move {
            analysis_worker_handler(
                job_receiver,
                analyzer_clone,
                persistant_data_sender,
                pool_size,
                job_timeout,
            )
            .await
        });

        let pool_clone = pool.clone();
        let output_dir = writer.root().to_path_buf();
        let cache_settings = settings.cache.clone();
        tokio::spawn(async move {
            cache_cleanup_handler(pool_clone, output_dir, cache_settings).await
        });

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener =
            TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
        let port = listener.local_addr()?.port();
        log::info!("Listening on {}:{}", settings.application.host, port);

        let server = run(
            listener,
            pool,
            analyzer,
            AnalysisQueue { sender: job_sender },
            writer,
            settings,
        )?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    Ok(SqlitePoolOptions::new()
        .max_connections(configuration.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(configuration.with_db()?))
}

pub fn run(
    listener: TcpListener,
    db_pool: SqlitePool,
    analyzer: Arc<Analyzer>,
    analysis_queue: AnalysisQueue,
    artifact_writer: ArtifactWriter,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let extractions_dir = settings.storage.output_dir.clone();
    let db_pool = web::Data::new(db_pool);
    let analyzer = Data::from(analyzer);
    let analysis_queue = web::Data::new(analysis_queue);
    let artifact_writer = web::Data::new(artifact_writer);
    let settings = web::Data::new(settings);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(Files::new("/extractions", &extractions_dir).show_files_listing())
            .service(routes::default)
            .service(routes::health_check)
            .service(routes::analyze)
            .service(routes::list_results)
            .service(routes::export_result)
            .service(routes::get_result)
            .service(
                web::scope("/api")
                    .service(routes::status)
                    .service(routes::validate_url)
                    .service(routes::unified_extract)
                    .service(routes::cache_cleanup)
                    .service(routes::stats),
            )
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                routes::ApiError::Validation(err.to_string()).into()
            }))
            .app_data(web::FormConfig::default().error_handler(|err, _req| {
                routes::ApiError::Validation(err.to_string()).into()
            }))
            .app_data(db_pool.clone())
            .app_data(analyzer.clone())
            .app_data(analysis_queue.clone())
            .app_data(artifact_writer.clone())
            .app_data(settings.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
