use crate::domain::{DispatchOutcome, IngestionError, IngestionService, MqttIngestionConfig};
use crate::mqtt::BrokerAddress;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument, Span};

const REQUEST_CHANNEL_CAPACITY: usize = 100;
const DISCONNECT_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Keep a broker connection alive until cancelled.
///
/// Connection failures are retried forever after `retry_delay`; message
/// handling runs on a bounded pool and never ends the loop.
#[instrument(
    name = "mqtt_supervisor",
    skip_all,
    fields(broker = %format!("{}:{}", broker.host, broker.port), client_id = %config.client_id)
)]
pub async fn run_mqtt_supervisor(
    config: MqttIngestionConfig,
    broker: BrokerAddress,
    service: IngestionService,
    token: CancellationToken,
) {
    info!(
        topics = service.registry().topics().len(),
        max_in_flight = config.max_in_flight,
        "starting MQTT supervisor"
    );

    let mut pool = HandlerPool::new(config.max_in_flight, config.slot_wait());
    let mut attempt: u64 = 0;

    loop {
        if token.is_cancelled() {
            debug!("MQTT supervisor cancelled before connection");
            break;
        }

        match run_mqtt_connection(&config, &broker, &service, &mut pool, &token).await {
            Ok(()) => {
                debug!("MQTT connection closed on cancellation");
                break;
            }
            Err(e) => {
                attempt += 1;
                error!(error = %e, attempt, "MQTT connection error");
                warn!(
                    retry_in = ?config.retry_delay(),
                    "retrying MQTT connection"
                );

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(config.retry_delay()) => {}
                }
            }
        }
    }

    pool.drain(config.drain_timeout()).await;
    info!("MQTT supervisor stopped");
}

/// One connection session; returns Ok only when cancelled
async fn run_mqtt_connection(
    config: &MqttIngestionConfig,
    broker: &BrokerAddress,
    service: &IngestionService,
    pool: &mut HandlerPool,
    token: &CancellationToken,
) -> Result<(), IngestionError> {
    let mut mqtt_options = MqttOptions::new(&config.client_id, &broker.host, broker.port);
    mqtt_options.set_keep_alive(config.keep_alive());
    mqtt_options.set_clean_session(true);
    if let Some(username) = &config.username {
        mqtt_options.set_credentials(username, config.password.clone().unwrap_or_default());
    }

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);
    debug!("connecting to MQTT broker");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                release_connection(&client, &mut eventloop).await;
                return Ok(());
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                        subscribe_all(&client, &service.registry().topics());
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let handler_service = service.clone();
                        let topic = publish.topic;
                        let payload = publish.payload;
                        let dropped_topic = topic.clone();
                        let submission = pool
                            .submit(token, async move {
                                handle_mqtt_message(&handler_service, &topic, &payload).await;
                            })
                            .await;
                        match submission {
                            Submission::Spawned => {}
                            Submission::Saturated => {
                                warn!(
                                    topic = %dropped_topic,
                                    in_flight = pool.in_flight(),
                                    "all message handlers busy, dropping message"
                                );
                            }
                            Submission::Cancelled => {
                                release_connection(&client, &mut eventloop).await;
                                return Ok(());
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::SubAck(ack))) => {
                        debug!(pkid = ack.pkid, "subscription acknowledged");
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        return Err(IngestionError::Transport(
                            "broker closed the connection".to_string(),
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return Err(IngestionError::Transport(e.to_string()));
                    }
                }
            }
        }
    }
}

/// Subscribe to every topic in order; a failed subscription is not fatal
fn subscribe_all(client: &AsyncClient, topics: &[String]) {
    for topic in topics {
        match client.try_subscribe(topic, QoS::AtLeastOnce) {
            Ok(()) => info!(topic = %topic, "subscribed to MQTT topic"),
            Err(e) => error!(topic = %topic, error = %e, "failed to subscribe to MQTT topic"),
        }
    }
}

async fn release_connection(client: &AsyncClient, eventloop: &mut EventLoop) {
    debug!("disconnecting from MQTT broker");
    if client.try_disconnect().is_ok() {
        // Give the event loop a chance to put the DISCONNECT on the wire
        let _ = tokio::time::timeout(DISCONNECT_FLUSH_TIMEOUT, eventloop.poll()).await;
    }
}

/// Handle an incoming MQTT message
///
/// Each message gets its own root span, independent of the supervisor's.
pub(crate) async fn handle_mqtt_message(service: &IngestionService, topic: &str, payload: &[u8]) {
    let span = info_span!(
        parent: Span::none(),
        "mqtt_message",
        topic = %topic,
        payload_size = payload.len(),
        outcome = tracing::field::Empty,
    );

    async {
        let outcome = match service.dispatch(topic, payload).await {
            DispatchOutcome::Persisted(_) => "persisted",
            DispatchOutcome::NothingToRecord => "nothing_to_record",
            DispatchOutcome::Rejected(IngestionError::UnroutableTopic(_)) => "unroutable",
            DispatchOutcome::Rejected(_) => "rejected",
        };
        Span::current().record("outcome", outcome);
    }
    .instrument(span)
    .await
}

/// What became of a handler handed to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Submission {
    Spawned,
    /// No slot freed up within the slot wait; the handler was dropped
    Saturated,
    /// Cancelled while waiting; the handler was dropped
    Cancelled,
}

/// Bounded set of in-flight message handlers.
///
/// The event loop is not polled while `submit` waits for a slot, so the wait
/// is capped: a message that finds every slot busy for `slot_wait` is dropped
/// rather than letting the keep-alive lapse.
pub(crate) struct HandlerPool {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
    slot_wait: Duration,
}

impl HandlerPool {
    pub(crate) fn new(max_in_flight: usize, slot_wait: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: JoinSet::new(),
            slot_wait,
        }
    }

    /// Wait up to the slot wait for a free slot and spawn the handler
    pub(crate) async fn submit<F>(&mut self, token: &CancellationToken, handler: F) -> Submission
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap();

        let acquire = tokio::time::timeout(
            self.slot_wait,
            Arc::clone(&self.semaphore).acquire_owned(),
        );
        let permit = tokio::select! {
            _ = token.cancelled() => return Submission::Cancelled,
            acquired = acquire => match acquired {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Submission::Cancelled,
                Err(_) => return Submission::Saturated,
            },
        };

        self.tasks.spawn(async move {
            let _permit = permit;
            handler.await;
        });
        Submission::Spawned
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            log_join_result(joined);
        }
    }

    /// Wait for running handlers, aborting whatever is left after `timeout`
    pub(crate) async fn drain(&mut self, timeout: Duration) {
        if self.tasks.is_empty() {
            return;
        }

        debug!(in_flight = self.in_flight(), "draining message handlers");
        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = self.tasks.join_next().await {
                log_join_result(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                in_flight = self.in_flight(),
                "message handlers did not finish within {:?}, aborting", timeout
            );
            self.tasks.shutdown().await;
        }
    }
}

fn log_join_result(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!("message handler panicked: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObservationSink, TopicRegistry};
    use chrono::{TimeZone, Utc};
    use common::domain::{MockObservationRepository, Observation, ObservationDraft};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio::time::Instant;
    use uuid::Uuid;

    const SHT4X_TOPIC: &str = "tele/IoTorero_6057F8/SENSOR";
    const SHT4X_PAYLOAD: &[u8] = br#"{"Time":"2026-02-28T17:13:40","SHT4X":{"Temperature":23.3,"Humidity":29.8,"DewPoint":4.6}}"#;

    fn service_with(repo: MockObservationRepository) -> IngestionService {
        IngestionService::new(
            Arc::new(TopicRegistry::builtin()),
            ObservationSink::new(Arc::new(repo)),
            chrono_tz::Europe::Athens,
        )
    }

    fn persisted(drafts: Vec<ObservationDraft>) -> Vec<Observation> {
        drafts
            .into_iter()
            .map(|d| Observation {
                id: Uuid::new_v4(),
                datastream_id: d.datastream_id,
                result_time: d.result_time,
                result: d.result,
                parameters: d.parameters,
            })
            .collect()
    }

    /// How a scripted broker session ends once subscriptions are in
    #[derive(Debug, Clone, Copy)]
    enum SessionEnd {
        /// Send DISCONNECT, then close the socket
        Disconnect,
        /// Close the socket without a word
        Drop,
        /// Keep answering pings until the client leaves
        Hold,
    }

    #[derive(Debug)]
    enum BrokerEvent {
        Connected(usize, Instant),
        Subscribed(usize, String),
        Closed(usize, Instant),
    }

    struct Session {
        end: SessionEnd,
        publish: Option<(&'static str, &'static [u8])>,
    }

    /// Minimal MQTT 3.1.1 broker playing one script per accepted connection
    async fn spawn_stub_broker(
        sessions: Vec<Session>,
        expected_subscriptions: usize,
    ) -> (BrokerAddress, mpsc::UnboundedReceiver<BrokerEvent>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (events, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut sessions = sessions.into_iter();
            let mut number = 0;
            while let Ok((stream, _)) = listener.accept().await {
                number += 1;
                let session = sessions.next().unwrap_or(Session {
                    end: SessionEnd::Hold,
                    publish: None,
                });
                let events = events.clone();
                tokio::spawn(async move {
                    let _ = play_session(stream, number, session, expected_subscriptions, events)
                        .await;
                });
            }
        });

        let broker = BrokerAddress {
            host: "127.0.0.1".to_string(),
            port,
        };
        (broker, rx)
    }

    async fn play_session(
        mut stream: TcpStream,
        number: usize,
        session: Session,
        expected_subscriptions: usize,
        events: mpsc::UnboundedSender<BrokerEvent>,
    ) -> std::io::Result<()> {
        let (header, _) = read_packet(&mut stream).await?;
        assert_eq!(header >> 4, 1, "first packet must be CONNECT");
        let _ = events.send(BrokerEvent::Connected(number, Instant::now()));
        stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await?;

        let mut subscribed = 0;
        while subscribed < expected_subscriptions {
            let (header, body) = read_packet(&mut stream).await?;
            match header >> 4 {
                8 => {
                    let topic_len = u16::from_be_bytes([body[2], body[3]]) as usize;
                    let topic = String::from_utf8(body[4..4 + topic_len].to_vec()).unwrap();
                    let _ = events.send(BrokerEvent::Subscribed(number, topic));
                    stream.write_all(&[0x90, 0x03, body[0], body[1], 0x01]).await?;
                    subscribed += 1;
                }
                12 => stream.write_all(&[0xD0, 0x00]).await?,
                _ => {}
            }
        }

        if let Some((topic, payload)) = session.publish {
            stream.write_all(&encode_publish(topic, payload)).await?;
        }

        match session.end {
            SessionEnd::Disconnect => {
                stream.write_all(&[0xE0, 0x00]).await?;
                stream.shutdown().await?;
            }
            SessionEnd::Drop => {}
            SessionEnd::Hold => loop {
                let (header, _) = read_packet(&mut stream).await?;
                match header >> 4 {
                    12 => stream.write_all(&[0xD0, 0x00]).await?,
                    14 => break,
                    _ => {}
                }
            },
        }

        let _ = events.send(BrokerEvent::Closed(number, Instant::now()));
        Ok(())
    }

    async fn read_packet(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
        let header = stream.read_u8().await?;
        let mut remaining = 0usize;
        let mut shift = 0;
        loop {
            let byte = stream.read_u8().await?;
            remaining |= usize::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let mut body = vec![0u8; remaining];
        stream.read_exact(&mut body).await?;
        Ok((header, body))
    }

    fn encode_publish(topic: &str, payload: &[u8]) -> Vec<u8> {
        let mut packet = vec![0x30];
        let mut remaining = 2 + topic.len() + payload.len();
        loop {
            let mut byte = (remaining % 128) as u8;
            remaining /= 128;
            if remaining > 0 {
                byte |= 0x80;
            }
            packet.push(byte);
            if remaining == 0 {
                break;
            }
        }
        packet.extend_from_slice(&(topic.len() as u16).to_be_bytes());
        packet.extend_from_slice(topic.as_bytes());
        packet.extend_from_slice(payload);
        packet
    }

    fn stub_config(broker: &BrokerAddress) -> MqttIngestionConfig {
        MqttIngestionConfig {
            broker_url: format!("mqtt://{}:{}", broker.host, broker.port),
            retry_delay_secs: 1,
            drain_timeout_secs: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resubscribes_in_order_after_every_reconnect() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo.expect_create_observations().times(0);

        let topics = TopicRegistry::builtin().topics();
        let (broker, mut events) = spawn_stub_broker(
            vec![
                Session {
                    end: SessionEnd::Disconnect,
                    publish: None,
                },
                Session {
                    end: SessionEnd::Drop,
                    publish: None,
                },
            ],
            topics.len(),
        )
        .await;

        let token = CancellationToken::new();
        let supervisor = tokio::spawn(run_mqtt_supervisor(
            stub_config(&broker),
            broker,
            service_with(mock_repo),
            token.clone(),
        ));

        let mut connected = Vec::new();
        let mut closed = Vec::new();
        let mut subscriptions: Vec<Vec<String>> = vec![Vec::new(); 3];
        tokio::time::timeout(Duration::from_secs(10), async {
            while subscriptions[2].len() < topics.len() {
                match events.recv().await.expect("stub broker stopped") {
                    BrokerEvent::Connected(n, at) => connected.push((n, at)),
                    BrokerEvent::Subscribed(n, topic) => subscriptions[n - 1].push(topic),
                    BrokerEvent::Closed(n, at) => closed.push((n, at)),
                }
            }
        })
        .await
        .expect("supervisor should reconnect twice");

        for session in &subscriptions {
            assert_eq!(session, &topics);
        }
        assert_eq!(connected.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![1, 2, 3]);

        // Both the DISCONNECT and the dropped socket go through the backoff
        for (n, closed_at) in &closed {
            let (_, next_connect) = connected[*n];
            assert!(next_connect.duration_since(*closed_at) >= Duration::from_millis(900));
        }
        assert_eq!(closed.len(), 2);

        token.cancel();
        tokio::time::timeout(Duration::from_secs(3), supervisor)
            .await
            .expect("supervisor should stop on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_published_reading_is_persisted() {
        let (saved_tx, mut saved_rx) = mpsc::unbounded_channel();
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .times(1)
            .returning(move |drafts| {
                let _ = saved_tx.send(drafts.clone());
                Ok(persisted(drafts))
            });

        let (broker, _events) = spawn_stub_broker(
            vec![Session {
                end: SessionEnd::Hold,
                publish: Some((SHT4X_TOPIC, SHT4X_PAYLOAD)),
            }],
            TopicRegistry::builtin().topics().len(),
        )
        .await;

        let token = CancellationToken::new();
        let supervisor = tokio::spawn(run_mqtt_supervisor(
            stub_config(&broker),
            broker,
            service_with(mock_repo),
            token.clone(),
        ));

        let drafts = tokio::time::timeout(Duration::from_secs(10), saved_rx.recv())
            .await
            .expect("reading should be persisted")
            .unwrap();

        let time = Utc.with_ymd_and_hms(2026, 2, 28, 15, 13, 40).unwrap();
        assert_eq!(drafts.len(), 3);
        assert!(drafts.iter().all(|d| d.result_time == time));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(3), supervisor)
            .await
            .expect("supervisor should stop on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_broker_stops_promptly_on_cancel() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo.expect_create_observations().times(0);

        let config = MqttIngestionConfig {
            broker_url: "mqtt://127.0.0.1:1".to_string(),
            retry_delay_secs: 60,
            ..Default::default()
        };
        let broker = BrokerAddress {
            host: "127.0.0.1".to_string(),
            port: 1,
        };
        let token = CancellationToken::new();

        let handle = tokio::spawn(run_mqtt_supervisor(
            config,
            broker,
            service_with(mock_repo),
            token.clone(),
        ));

        // Let it fail the first connection and enter backoff
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("supervisor should stop during backoff")
            .unwrap();
    }

    #[tokio::test]
    async fn test_pool_survives_panicking_handler() {
        let mut pool = HandlerPool::new(1, Duration::from_secs(1));
        let token = CancellationToken::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        assert_eq!(
            pool.submit(&token, async { None::<()>.expect("handler bug") })
                .await,
            Submission::Spawned
        );
        assert_eq!(
            pool.submit(&token, async move {
                flag.store(true, Ordering::SeqCst);
            })
            .await,
            Submission::Spawned
        );

        pool.drain(Duration::from_secs(1)).await;
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let mut pool = HandlerPool::new(2, Duration::from_secs(1));
        let token = CancellationToken::new();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            let submission = pool
                .submit(&token, async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
            assert_eq!(submission, Submission::Spawned);
        }

        pool.drain(Duration::from_secs(2)).await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_saturated_pool_gives_up_after_slot_wait() {
        let mut pool = HandlerPool::new(1, Duration::from_millis(50));
        let token = CancellationToken::new();

        assert_eq!(
            pool.submit(&token, std::future::pending::<()>()).await,
            Submission::Spawned
        );

        let started = Instant::now();
        assert_eq!(pool.submit(&token, async {}).await, Submission::Saturated);
        assert!(started.elapsed() < Duration::from_secs(1));

        pool.drain(Duration::from_millis(50)).await;
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_submit_gives_up_when_cancelled_while_full() {
        let mut pool = HandlerPool::new(1, Duration::from_secs(30));
        let token = CancellationToken::new();

        assert_eq!(
            pool.submit(&token, std::future::pending::<()>()).await,
            Submission::Spawned
        );

        token.cancel();
        assert_eq!(pool.submit(&token, async {}).await, Submission::Cancelled);

        tokio::time::timeout(
            Duration::from_secs(2),
            pool.drain(Duration::from_millis(50)),
        )
        .await
        .expect("stuck handler should be aborted");
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_handle_message_dispatches_to_service() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .withf(|drafts: &Vec<ObservationDraft>| drafts.len() == 2)
            .times(1)
            .returning(|drafts| Ok(persisted(drafts)));

        handle_mqtt_message(
            &service_with(mock_repo),
            SHT4X_TOPIC,
            br#"{"Time":"2026-02-28T17:13:40","SHT4X":{"Temperature":23.3,"Humidity":29.8}}"#,
        )
        .await;
    }

    #[tokio::test]
    async fn test_handle_message_swallows_bad_payloads() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo.expect_create_observations().times(0);

        let service = service_with(mock_repo);
        handle_mqtt_message(&service, SHT4X_TOPIC, b"not json").await;
        handle_mqtt_message(&service, "unknown/topic", b"{}").await;
    }
}
