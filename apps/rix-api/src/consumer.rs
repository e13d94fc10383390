//! Broker side of the process: topology, delivery loop and reconnects.

// std
use std::{sync::Arc, time::Duration};

// crates.io
use color_eyre::eyre;
use futures::StreamExt;
use lapin::{
	Channel, Connection, ConnectionProperties, ExchangeKind,
	message::Delivery,
	options::{
		BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions,
		ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
	},
	types::FieldTable,
};

// self
use rix_service::{Outcome, RixService};

const MAX_BACKOFF_MS: u64 = 60_000;

/// Connects with bounded retries, then consumes until the process exits. A dropped
/// connection is re-established with capped exponential backoff.
pub async fn run(service: Arc<RixService>, cfg: rix_config::Broker) -> color_eyre::Result<()> {
	let mut conn = connect_with_retry(&cfg).await?;

	loop {
		match consume(&service, &cfg, &conn).await {
			Ok(()) => tracing::warn!(queue = %cfg.queue, "Broker consumer stream ended."),
			Err(err) => tracing::error!(error = %err, queue = %cfg.queue, "Broker consumer failed."),
		}

		conn = reconnect(&cfg).await;
	}
}

pub async fn connect_with_retry(cfg: &rix_config::Broker) -> color_eyre::Result<Connection> {
	let delay = Duration::from_millis(cfg.retry_delay_ms);
	let mut attempt = 1;

	loop {
		match Connection::connect(&cfg.url, ConnectionProperties::default()).await {
			Ok(conn) => {
				tracing::info!(attempt, "Broker connection established.");

				return Ok(conn);
			},
			Err(err) if attempt < cfg.connect_retries => {
				tracing::warn!(error = %err, attempt, max_attempts = cfg.connect_retries, "Broker connection failed; retrying.");
				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => {
				return Err(eyre::eyre!(
					"Broker unreachable after {} attempts: {err}",
					cfg.connect_retries
				));
			},
		}
	}
}

async fn reconnect(cfg: &rix_config::Broker) -> Connection {
	let mut attempt = 1;

	loop {
		tokio::time::sleep(backoff_for_attempt(attempt, cfg.retry_delay_ms)).await;

		match Connection::connect(&cfg.url, ConnectionProperties::default()).await {
			Ok(conn) => {
				tracing::info!(attempt, "Broker connection re-established.");

				return conn;
			},
			Err(err) => {
				tracing::warn!(error = %err, attempt, "Broker reconnect failed.");

				attempt += 1;
			},
		}
	}
}

/// Durable topic exchange, durable queue, one binding per routing key.
pub async fn declare_topology(channel: &Channel, cfg: &rix_config::Broker) -> lapin::Result<()> {
	channel
		.exchange_declare(
			&cfg.exchange,
			ExchangeKind::Topic,
			ExchangeDeclareOptions { durable: true, ..Default::default() },
			FieldTable::default(),
		)
		.await?;
	channel
		.queue_declare(
			&cfg.queue,
			QueueDeclareOptions { durable: true, ..Default::default() },
			FieldTable::default(),
		)
		.await?;

	for routing_key in &cfg.routing_keys {
		channel
			.queue_bind(
				&cfg.queue,
				&cfg.exchange,
				routing_key,
				QueueBindOptions::default(),
				FieldTable::default(),
			)
			.await?;
	}

	Ok(())
}

async fn consume(
	service: &Arc<RixService>,
	cfg: &rix_config::Broker,
	conn: &Connection,
) -> lapin::Result<()> {
	let channel = conn.create_channel().await?;

	declare_topology(&channel, cfg).await?;
	channel.basic_qos(cfg.prefetch, BasicQosOptions::default()).await?;

	let mut deliveries = channel
		.basic_consume(
			&cfg.queue,
			&cfg.consumer_tag,
			BasicConsumeOptions::default(),
			FieldTable::default(),
		)
		.await?;

	tracing::info!(queue = %cfg.queue, exchange = %cfg.exchange, prefetch = cfg.prefetch, "Broker consumer started.");

	while let Some(delivery) = deliveries.next().await {
		let delivery = delivery?;

		tokio::spawn(settle(Arc::clone(service), delivery));
	}

	Ok(())
}

async fn settle(service: Arc<RixService>, delivery: Delivery) {
	let routing_key = delivery.routing_key.as_str();

	if delivery.redelivered {
		tracing::debug!(routing_key, delivery_tag = delivery.delivery_tag, "Processing redelivered message.");
	}

	let result = match service.handle_change(&delivery.data, routing_key).await {
		Outcome::Ack => delivery.acker.ack(BasicAckOptions::default()).await,
		Outcome::Reject { requeue } => delivery.acker.reject(BasicRejectOptions { requeue }).await,
	};

	if let Err(err) = result {
		tracing::error!(error = %err, routing_key, delivery_tag = delivery.delivery_tag, "Failed to settle delivery.");
	}
}

fn backoff_for_attempt(attempt: u32, base_ms: u64) -> Duration {
	let exp = attempt.max(1).saturating_sub(1).min(6);
	let delay = base_ms.max(1).saturating_mul(1 << exp);

	Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}
