use std::sync::Arc;

use dotenvy::dotenv;
use log::{error, info};
use order_outbox::application::event_transformer::OrderEventTransformer;
use order_outbox::application::outbox_relay::OutboxRelay;
use order_outbox::config::Settings;
use order_outbox::infrastructure::kafka::{KafkaEventConsumer, KafkaEventProducer, RetryPolicy};
use order_outbox::infrastructure::lookup::DieselOrderLookup;
use order_outbox::infrastructure::outbox_repo::DieselOutboxStore;
use order_outbox::{build_server, create_pool, log_worker_exit, run_migrations};
use tokio::sync::watch;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::from_env().expect("Invalid configuration");

    let pool = create_pool(&settings.database_url)
        .expect("Failed to create database connection pool");
    run_migrations(&pool);

    let producer = Arc::new(
        KafkaEventProducer::connect(&settings.kafka, RetryPolicy::default())
            .await
            .expect("Failed to connect Kafka producer"),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let relay = Arc::new(OutboxRelay::new(
        Arc::new(DieselOutboxStore::new(pool.clone())),
        producer.clone(),
        settings.outbox.batch_size,
    ));
    let relay_task = tokio::spawn(relay.run(settings.outbox.poll_interval, shutdown_rx.clone()));

    let transformer = OrderEventTransformer::new(
        Arc::new(DieselOrderLookup::new(pool.clone())),
        producer.clone(),
    );
    let consumer =
        KafkaEventConsumer::new(&settings.kafka).expect("Failed to create Kafka consumer");
    let consumer_task = tokio::spawn(async move {
        log_worker_exit("Kafka consumer", consumer.run(transformer, shutdown_rx)).await
    });

    info!(
        "Starting server at http://{}:{}",
        settings.host, settings.port
    );
    let served = build_server(pool, &settings.host, settings.port)?.await;

    info!("HTTP server stopped, shutting down background workers");
    let _ = shutdown_tx.send(true);
    if let Err(e) = relay_task.await {
        error!("Outbox relay task failed: {}", e);
    }
    if let Err(e) = consumer_task.await {
        error!("Kafka consumer task failed: {}", e);
    }
    producer.close();

    served
}
