#[cfg(test)]
mod test {
    use std::{
        collections::{HashMap, VecDeque},
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };

    use async_std::task::JoinHandle;
    use chunkrpc_batch::{LogReporter, DEFAULT_BATCH_TTL_MS};
    use chunkrpc_rpc::{typed, BrokerPublisher, PublishError, RawProcedure, RpcClient, RpcConfig, RpcError, RpcServer};
    use chunkrpc_utils::{random::RealRandom, MockTimer};
    use parking_lot::Mutex;

    const SERVER_QUEUE: &str = "rpc.server";
    const CLIENT_QUEUE: &str = "rpc.client";

    #[derive(Clone, Copy)]
    enum Order {
        Fifo,
        /// each drained burst is delivered backwards with every message twice
        ReversedTwice,
    }

    /// In-memory broker with one FIFO per declared queue
    struct LoopbackBroker {
        order: Order,
        queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    }

    impl LoopbackBroker {
        fn new(order: Order, queues: &[&str]) -> Self {
            Self {
                order,
                queues: Mutex::new(queues.iter().map(|q| (q.to_string(), VecDeque::new())).collect()),
            }
        }

        fn drain(&self, queue: &str) -> Vec<Vec<u8>> {
            let msgs: Vec<Vec<u8>> = self.queues.lock().get_mut(queue).map(|q| q.drain(..).collect()).unwrap_or_default();
            match self.order {
                Order::Fifo => msgs,
                Order::ReversedTwice => msgs.into_iter().rev().flat_map(|m| [m.clone(), m]).collect(),
            }
        }
    }

    impl BrokerPublisher for LoopbackBroker {
        fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), PublishError> {
            let mut queues = self.queues.lock();
            let q = queues.get_mut(queue).ok_or_else(|| PublishError::QueueNotFound(queue.to_string()))?;
            q.push_back(body);
            Ok(())
        }
    }

    struct Pair {
        broker: Arc<LoopbackBroker>,
        timer: Arc<MockTimer>,
        server: Arc<RpcServer>,
        client: Arc<RpcClient>,
        running: Arc<AtomicBool>,
        pump: JoinHandle<()>,
    }

    fn run_pair(config: RpcConfig, order: Order) -> Pair {
        let broker = Arc::new(LoopbackBroker::new(order, &[SERVER_QUEUE, CLIENT_QUEUE]));
        let timer = Arc::new(MockTimer::default());
        let reporter = Arc::new(LogReporter());
        let server = Arc::new(RpcServer::new(config.clone(), SERVER_QUEUE, broker.clone(), reporter.clone(), timer.clone()));
        let client = Arc::new(RpcClient::new(config, CLIENT_QUEUE, SERVER_QUEUE, broker.clone(), reporter, timer.clone(), &RealRandom()));

        server.register("echo", RawProcedure(|p: &[u8]| Ok(p.to_vec())));
        server.register("sum", typed(|values: Vec<u64>| Ok::<_, String>(values.iter().sum::<u64>())));
        server.register("fail", typed(|reason: String| Err::<(), _>(reason)));

        let running = Arc::new(AtomicBool::new(true));
        let pump = {
            let (broker, server, client, running) = (broker.clone(), server.clone(), client.clone(), running.clone());
            async_std::task::spawn(async move {
                while running.load(Ordering::Relaxed) {
                    let mut idle = true;
                    for msg in broker.drain(SERVER_QUEUE) {
                        idle = false;
                        server.on_delivery(&msg);
                    }
                    for msg in broker.drain(CLIENT_QUEUE) {
                        idle = false;
                        client.on_delivery(&msg);
                    }
                    if idle {
                        async_std::task::sleep(Duration::from_millis(1)).await;
                    }
                }
            })
        };

        Pair {
            broker,
            timer,
            server,
            client,
            running,
            pump,
        }
    }

    impl Pair {
        async fn stop(self) {
            self.running.store(false, Ordering::Relaxed);
            self.pump.await;
        }
    }

    #[async_std::test]
    async fn small_and_typed_calls() {
        let _ = env_logger::builder().is_test(true).try_init();
        let pair = run_pair(RpcConfig::default(), Order::Fifo);

        assert_eq!(pair.client.call("echo", vec![1, 2, 3], 1000).await, Ok(vec![1, 2, 3]));
        assert_eq!(pair.client.call("echo", vec![], 1000).await, Ok(vec![]));
        let sum: Result<u64, RpcError> = pair.client.call_typed("sum", &vec![1u64, 2, 3, 4]).await;
        assert_eq!(sum, Ok(10));
        let failed: Result<(), RpcError> = pair.client.call_typed("fail", &"bad input".to_string()).await;
        assert_eq!(failed, Err(RpcError::RuntimeError("bad input".to_string())));
        assert_eq!(pair.client.call("missing", vec![], 1000).await, Err(RpcError::ProcedureNotFound("missing".to_string())));
        assert!(matches!(pair.client.call("sum", vec![1], 1000).await, Err(RpcError::InvalidParams(_))));

        assert_eq!(pair.client.pending_calls(), 0);
        assert_eq!(pair.client.pending_batches(), 0);
        assert_eq!(pair.server.pending_batches(), 0);
        pair.stop().await;
    }

    #[async_std::test]
    async fn large_payload_both_directions() {
        let config = RpcConfig {
            max_chunk_len: 1024,
            ..Default::default()
        };
        let pair = run_pair(config, Order::Fifo);

        let payload: Vec<u8> = (0..100_000).map(|i| (i % 251) as u8).collect();
        assert_eq!(pair.client.call("echo", payload.clone(), 5000).await, Ok(payload));
        assert_eq!(pair.server.pending_batches(), 0);
        assert_eq!(pair.client.pending_batches(), 0);
        pair.stop().await;
    }

    #[async_std::test]
    async fn reordered_and_duplicated_delivery() {
        let config = RpcConfig {
            max_chunk_len: 16,
            ..Default::default()
        };
        let pair = run_pair(config, Order::ReversedTwice);

        let payload: Vec<u8> = (0..200).map(|i| i as u8).collect();
        assert_eq!(pair.client.call("echo", payload.clone(), 5000).await, Ok(payload));

        // a redelivered chunk arriving after its batch completed opens a fresh batch, only the ttl sweep removes it
        async_std::task::sleep(Duration::from_millis(50)).await;
        assert!(pair.server.pending_batches() <= 1);
        assert!(pair.client.pending_batches() <= 1);
        pair.timer.advance(DEFAULT_BATCH_TTL_MS);
        pair.server.on_tick();
        pair.client.on_tick();
        assert_eq!(pair.server.pending_batches(), 0);
        assert_eq!(pair.client.pending_batches(), 0);
        pair.stop().await;
    }

    #[async_std::test]
    async fn concurrent_calls_are_isolated() {
        let config = RpcConfig {
            max_chunk_len: 8,
            ..Default::default()
        };
        let pair = run_pair(config, Order::Fifo);

        let mut joins = vec![];
        for i in 0..10u8 {
            let client = pair.client.clone();
            joins.push(async_std::task::spawn(async move {
                let payload = vec![i; 20 + i as usize];
                assert_eq!(client.call("echo", payload.clone(), 5000).await, Ok(payload));
            }));
        }
        for join in joins {
            join.await;
        }
        assert_eq!(pair.client.pending_calls(), 0);
        pair.stop().await;
    }

    #[async_std::test]
    async fn unknown_server_queue_fails_fast() {
        let broker = Arc::new(LoopbackBroker::new(Order::Fifo, &[CLIENT_QUEUE]));
        let client = RpcClient::new(
            RpcConfig::default(),
            CLIENT_QUEUE,
            SERVER_QUEUE,
            broker,
            Arc::new(LogReporter()),
            Arc::new(MockTimer::default()),
            &RealRandom(),
        );
        assert_eq!(
            client.call("echo", vec![1], 1000).await,
            Err(RpcError::PublishError(PublishError::QueueNotFound(SERVER_QUEUE.to_string()).to_string()))
        );
    }

    #[async_std::test]
    async fn no_server_times_out() {
        let pair = run_pair(RpcConfig::default(), Order::Fifo);
        // nobody consumes the server queue once the pump is gone
        let Pair { broker, client, running, pump, .. } = pair;
        running.store(false, Ordering::Relaxed);
        pump.await;

        assert_eq!(client.call("echo", vec![1], 20).await, Err(RpcError::Timeout));
        assert_eq!(broker.drain(SERVER_QUEUE).len(), 1);
        assert_eq!(client.pending_calls(), 0);
    }
}
