use std::sync::{Arc, Mutex};
use std::time::Duration;

use syncer_domain::{Capacity, ServiceError, SyncerError};
use syncer_testing_utils::{ClientConfigBuilder, CoolService, RecordingService};

use syncer_dispatcher::{ClientStatus, SyncClient};

/// 每 10ms 检查一次，最多等待 `within`
async fn eventually<F: Fn() -> bool>(within: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

fn client_with(service: Arc<RecordingService<u32>>) -> SyncClient<u32> {
    SyncClient::builder(ClientConfigBuilder::new().build())
        .service(service)
        .build()
        .unwrap()
}

async fn submit(client: &SyncClient<u32>, count: u32) {
    for i in 0..count {
        client.add_new_item(i).await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_even_batches_all_succeed() {
    let service = Arc::new(RecordingService::accepting(2));
    let client = client_with(service.clone());
    client.run().await.unwrap();

    submit(&client, 11).await;

    assert!(eventually(Duration::from_secs(1), || client.get_stats().success == 5).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = client.get_stats();
    assert_eq!(stats.success, 5);
    assert_eq!(stats.exceptions, 0);

    let batches = service.batches();
    assert_eq!(batches.len(), 5);
    assert!(batches.iter().all(|batch| batch.len() == 2));
    let flattened: Vec<u32> = batches.into_iter().flatten().collect();
    assert_eq!(flattened, (0..10).collect::<Vec<_>>());
    assert_eq!(client.get_chan_stats().batch, 0);
}

#[tokio::test(start_paused = true)]
async fn test_odd_items_leave_remainder_pending() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let recorded = sizes.clone();

    let client = SyncClient::<u32>::builder(ClientConfigBuilder::new().build())
        .service(Arc::new(CoolService::new(3, Duration::from_secs(10))))
        .on_success(move |batch| recorded.lock().unwrap().push(batch.len()))
        .build()
        .unwrap();
    client.run().await.unwrap();

    submit(&client, 11).await;

    assert!(eventually(Duration::from_secs(1), || client.get_stats().success == 3).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(client.get_stats().success, 3);
    assert_eq!(*sizes.lock().unwrap(), vec![3, 3, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_batch_goes_back_to_dispatch_queue() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let recorded = errors.clone();
    let service = Arc::new(RecordingService::rejecting(3));

    let client = SyncClient::<u32>::builder(ClientConfigBuilder::new().build())
        .service(service.clone())
        .on_exception(move |err| recorded.lock().unwrap().push(err.clone()))
        .build()
        .unwrap();
    client.run().await.unwrap();

    submit(&client, 11).await;

    assert!(eventually(Duration::from_secs(1), || client.get_stats().exceptions == 1).await);
    assert_eq!(*errors.lock().unwrap(), vec![ServiceError::Blocked]);

    // 两个未消费的批次加上回流的批次
    assert!(eventually(Duration::from_secs(1), || client.get_chan_stats().batch == 3).await);
    assert_eq!(client.get_chan_stats().resort, 0);
    assert_eq!(service.process_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_stops_draining_after_rejection() {
    let service = Arc::new(RecordingService::rejecting(5));
    let client = client_with(service.clone());
    client.run().await.unwrap();

    submit(&client, 21).await;

    assert!(eventually(Duration::from_secs(1), || client.get_chan_stats().batch == 4).await);
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(client.get_chan_stats().batch, 4);
    assert_eq!(client.get_stats().exceptions, 1);
    assert_eq!(service.process_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_batch_is_redelivered_in_order() {
    let service = Arc::new(
        RecordingService::accepting(3).with_script(vec![Err(ServiceError::Blocked)]),
    );
    let client = client_with(service.clone());
    client.run().await.unwrap();

    submit(&client, 9).await;

    assert!(eventually(Duration::from_secs(10), || client.get_stats().success == 3).await);

    let stats = client.get_stats();
    assert_eq!(stats.exceptions, 1);
    assert_eq!(
        service.batches(),
        vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![0, 1, 2]]
    );
}

#[tokio::test(start_paused = true)]
async fn test_consumption_waits_for_positive_limits() {
    let service = Arc::new(RecordingService::rejecting(2));
    let client = client_with(service.clone());
    client.run().await.unwrap();

    submit(&client, 4).await;
    assert!(eventually(Duration::from_secs(1), || client.get_stats().exceptions == 1).await);

    service.set_limits(Capacity::new(0, Duration::ZERO));
    service.set_fallback(Ok(()));
    tokio::time::sleep(Duration::from_secs(12)).await;

    // 首次探测加上两次轮询
    assert_eq!(service.limit_queries(), 3);
    assert_eq!(service.process_calls(), 1);

    service.set_limits(Capacity::new(2, Duration::from_secs(10)));
    assert!(eventually(Duration::from_secs(6), || client.get_stats().success == 2).await);
    assert_eq!(client.capacity(), Capacity::new(2, Duration::from_secs(10)));
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_at_startup_recovers_by_polling() {
    let service = Arc::new(RecordingService::new(Capacity::unavailable()));
    let client = client_with(service.clone());
    client.run().await.unwrap();

    service.set_limits(Capacity::new(2, Duration::from_secs(1)));
    submit(&client, 6).await;

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(service.process_calls(), 0);
    assert_eq!(client.get_chan_stats().input, 0);

    assert!(eventually(Duration::from_secs(2), || client.get_stats().success == 3).await);
    assert_eq!(service.limit_queries(), 2);
    assert_eq!(client.capacity(), Capacity::new(2, Duration::from_secs(1)));
    assert_eq!(
        service.batches(),
        vec![vec![0, 1], vec![2, 3], vec![4, 5]]
    );
}

#[tokio::test(start_paused = true)]
async fn test_full_input_blocks_submitter() {
    let service = Arc::new(RecordingService::accepting(1).gated());
    let config = ClientConfigBuilder::new().with_buffers(2, 1, 1).build();
    let client = SyncClient::builder(config)
        .service(service.clone())
        .build()
        .unwrap();
    client.run().await.unwrap();

    // 处理中 1 个，待发送通道 1 个，组装器手上 1 个，输入通道 2 个
    for i in 0..5 {
        tokio::time::timeout(Duration::from_secs(1), client.add_new_item(i))
            .await
            .expect("submission should not block yet")
            .unwrap();
    }

    let blocked = tokio::time::timeout(Duration::from_secs(1), client.add_new_item(5)).await;
    assert!(blocked.is_err());
    assert_eq!(client.get_chan_stats().input, 2);

    service.release(10);
    tokio::time::timeout(Duration::from_secs(1), client.add_new_item(6))
        .await
        .expect("submission should resume once drained")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unclassified_errors_are_counted() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let recorded = errors.clone();
    let service = Arc::new(
        RecordingService::accepting(2).with_fallback(Err(ServiceError::other("500"))),
    );

    let client = SyncClient::<u32>::builder(ClientConfigBuilder::new().build())
        .service(service.clone())
        .on_exception(move |err| recorded.lock().unwrap().push(err.clone()))
        .build()
        .unwrap();
    client.run().await.unwrap();

    submit(&client, 4).await;

    assert!(eventually(Duration::from_secs(1), || client.get_stats().discarded == 2).await);
    let stats = client.get_stats();
    assert_eq!(stats.success, 0);
    assert_eq!(stats.exceptions, 0);
    assert_eq!(service.process_calls(), 2);
    assert_eq!(errors.lock().unwrap().len(), 2);
    assert!(errors
        .lock()
        .unwrap()
        .iter()
        .all(|err| matches!(err, ServiceError::Other(_))));
}

#[tokio::test(start_paused = true)]
async fn test_resubmission_limit_drops_batch() {
    let service = Arc::new(RecordingService::rejecting(2));
    let config = ClientConfigBuilder::new()
        .with_check_status_interval_ms(100)
        .with_max_resubmissions(1)
        .build();
    let client = SyncClient::builder(config)
        .service(service.clone())
        .build()
        .unwrap();
    client.run().await.unwrap();

    submit(&client, 2).await;

    assert!(eventually(Duration::from_secs(2), || client.get_stats().discarded == 1).await);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let stats = client.get_stats();
    assert_eq!(stats.exceptions, 2);
    assert_eq!(service.process_calls(), 2);
    assert_eq!(client.get_chan_stats().batch, 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_is_idempotent() {
    let service = Arc::new(RecordingService::accepting(2));
    let client = client_with(service.clone());

    assert_eq!(client.status().await, ClientStatus::Created);
    client.run().await.unwrap();
    client.run().await.unwrap();

    assert_eq!(client.status().await, ClientStatus::Running);
    assert_eq!(service.limit_queries(), 1);
}

#[tokio::test]
async fn test_submission_before_run_fails() {
    let client = client_with(Arc::new(RecordingService::accepting(2)));

    let result = client.add_new_item(1).await;
    assert!(matches!(result, Err(SyncerError::NotStarted)));
    assert_eq!(client.get_chan_stats().as_array(), [0, 0, 0]);
}

#[tokio::test]
async fn test_build_requires_service_and_valid_config() {
    let result = SyncClient::<u32>::builder(ClientConfigBuilder::new().build()).build();
    assert!(matches!(result, Err(SyncerError::ServiceNotFound)));

    let config = ClientConfigBuilder::new().with_buffers(0, 10, 3).build();
    let result = SyncClient::<u32>::builder(config)
        .service(Arc::new(RecordingService::accepting(2)))
        .build();
    assert!(matches!(result, Err(SyncerError::Configuration(_))));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_all_stages() {
    let service = Arc::new(RecordingService::accepting(2).gated());
    let client = client_with(service.clone());
    client.run().await.unwrap();

    submit(&client, 5).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    client.shutdown().await.unwrap();
    assert_eq!(client.status().await, ClientStatus::Stopped);

    assert!(matches!(
        client.add_new_item(99).await,
        Err(SyncerError::Shutdown)
    ));
    assert!(matches!(client.run().await, Err(SyncerError::Shutdown)));

    // 重复关闭是安全的
    client.shutdown().await.unwrap();
}
