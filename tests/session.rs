use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

const REPLY_128X32: [u8; 6] = [0x06, 0x00, 0x01, 0x80, 0x01, 0x06];

fn session_over(config: ipixel::FakeLinkConfig) -> (ipixel::DeviceSession, Arc<ipixel::FakeLink>) {
    let link = Arc::new(ipixel::FakeLink::new(config));
    let session = ipixel::DeviceSession::new(link.clone(), ipixel::SessionConfig::default());
    (session, link)
}

#[tokio::test]
async fn connect_twice_reuses_the_live_link() {
    let (session, link) = session_over(ipixel::FakeLinkConfig::default());

    assert!(session.connect().await);
    assert!(session.connect().await);

    assert_eq!(1, link.connect_count());
    assert_eq!(ipixel::ConnectionState::Connected, session.state());
}

#[tokio::test]
async fn connect_after_radio_drop_reconnects() {
    let (session, link) = session_over(ipixel::FakeLinkConfig::default());
    assert!(session.connect().await);

    link.drop_connection();
    assert!(session.connect().await);

    assert_eq!(2, link.connect_count());
    assert!(session.send_command(&ipixel::Command::power(true)).await);
}

#[tokio::test]
async fn refused_connect_leaves_session_disconnected() {
    let (session, link) =
        session_over(ipixel::FakeLinkConfig::builder().connect_fails(true).build());

    let error = session
        .try_connect()
        .await
        .expect_err("fake link should refuse the connection");

    assert_matches!(error, ipixel::InteractionError::FakeConnectRefused);
    assert_eq!(ipixel::ConnectionState::Disconnected, session.state());
    assert_eq!(1, link.connect_count());
}

#[tokio::test]
async fn watch_state_observes_connect_and_disconnect() {
    let (session, _link) = session_over(ipixel::FakeLinkConfig::default());
    let mut states = session.watch_state();
    assert_eq!(ipixel::ConnectionState::Disconnected, *states.borrow());

    assert!(session.connect().await);
    assert_eq!(ipixel::ConnectionState::Connected, *states.borrow_and_update());

    session.disconnect().await;
    assert_eq!(ipixel::ConnectionState::Disconnected, *states.borrow_and_update());
}

#[tokio::test]
async fn sends_fail_closed_without_connection() {
    let (session, link) = session_over(ipixel::FakeLinkConfig::default());

    assert!(!session.send_command(&ipixel::Command::power(false)).await);
    assert_matches!(
        session.try_send_frame(&ipixel::ScreenPower::On.frame()).await,
        Err(ipixel::SendError::NotConnected)
    );
    assert!(link.writes().is_empty());
}

#[tokio::test]
async fn sends_after_disconnect_are_refused() {
    let (session, link) = session_over(ipixel::FakeLinkConfig::default());
    assert!(session.connect().await);
    session.disconnect().await;

    assert!(!session.send_command(&ipixel::Command::power(true)).await);
    assert!(link.writes().is_empty());
}

#[tokio::test]
async fn rejected_write_reports_link_error() {
    let (session, link) =
        session_over(ipixel::FakeLinkConfig::builder().reject_writes(true).build());
    assert!(session.connect().await);

    let result = session
        .try_send_command(&ipixel::Command::power(true))
        .await;

    assert_matches!(
        result,
        Err(ipixel::SendError::Link(
            ipixel::InteractionError::FakeWriteRejected { .. }
        ))
    );
    assert_eq!(1, link.writes().len());
}

#[tokio::test(start_paused = true)]
async fn silent_display_falls_back_within_deadline() {
    let (session, link) = session_over(ipixel::FakeLinkConfig::default());
    assert!(session.connect().await);
    let deadline = Duration::from_millis(250);

    let started = Instant::now();
    let info = session.query_device_info_with_timeout(deadline).await;
    let elapsed = started.elapsed();

    assert_eq!(ipixel::DeviceInfo::fallback(), info);
    assert!(elapsed >= deadline);
    assert!(elapsed < deadline + Duration::from_millis(50));

    let resolved = session
        .resolved_device_info()
        .expect("query outcome should be cached");
    assert_matches!(
        resolved.fallback_reason(),
        Some(ipixel::QueryError::Timeout { timeout_ms: 250 })
    );
    assert!(link.active_subscriptions().is_empty());
    assert_eq!(1, link.unsubscribe_count());
}

#[tokio::test]
async fn reported_info_is_parsed_and_cached() {
    let (session, link) = session_over(
        ipixel::FakeLinkConfig::builder()
            .device_info_reply(REPLY_128X32.to_vec())
            .build(),
    );
    assert!(session.connect().await);

    let first = session.query_device_info().await;
    let second = session.query_device_info().await;

    assert_eq!((128, 32), (first.width, first.height));
    assert_eq!(first, second);
    assert_eq!(1, link.subscribe_count());
    assert!(link.active_subscriptions().is_empty());
    assert!(
        !session
            .resolved_device_info()
            .expect("query outcome should be cached")
            .is_fallback()
    );
}

#[tokio::test]
async fn concurrent_queries_share_one_exchange() {
    let (session, link) = session_over(
        ipixel::FakeLinkConfig::builder()
            .device_info_reply(REPLY_128X32.to_vec())
            .build(),
    );
    assert!(session.connect().await);

    let (left, right) = tokio::join!(session.query_device_info(), session.query_device_info());

    assert_eq!(left, right);
    assert_eq!(1, link.subscribe_count());
}

#[tokio::test]
async fn query_without_connection_uses_fallback() {
    let (session, link) = session_over(
        ipixel::FakeLinkConfig::builder()
            .device_info_reply(REPLY_128X32.to_vec())
            .build(),
    );

    let info = session.query_device_info().await;

    assert_eq!(ipixel::DeviceInfo::fallback(), info);
    assert_matches!(
        session
            .resolved_device_info()
            .and_then(ipixel::ResolvedDeviceInfo::fallback_reason),
        Some(ipixel::QueryError::NotConnected)
    );
    assert_eq!(0, link.subscribe_count());
}

#[tokio::test]
async fn malformed_reply_uses_fallback() {
    let (session, _link) = session_over(
        ipixel::FakeLinkConfig::builder()
            .device_info_reply(vec![0x06, 0x00, 0x01, 0x80, 0x01, 0x63])
            .build(),
    );
    assert!(session.connect().await);

    let info = session.query_device_info().await;

    assert_eq!(ipixel::DeviceInfo::fallback(), info);
    assert_matches!(
        session
            .resolved_device_info()
            .and_then(ipixel::ResolvedDeviceInfo::fallback_reason),
        Some(ipixel::QueryError::Protocol(
            ipixel::DeviceInfoError::UnknownLedType { led_type: 0x63 }
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn late_reply_is_dropped_after_timeout() {
    let (session, link) = session_over(
        ipixel::FakeLinkConfig::builder()
            .device_info_reply(REPLY_128X32.to_vec())
            .reply_delay(Duration::from_secs(2))
            .build(),
    );
    assert!(session.connect().await);

    let info = session
        .query_device_info_with_timeout(Duration::from_millis(500))
        .await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(ipixel::DeviceInfo::fallback(), info);
    assert_eq!(info, session.query_device_info().await);
    assert!(session.send_command(&ipixel::Command::power(true)).await);
    assert!(link.active_subscriptions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn disconnect_wakes_pending_query() {
    let (session, link) = session_over(ipixel::FakeLinkConfig::default());
    assert!(session.connect().await);

    let disconnect_soon = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.disconnect().await;
    };
    let started = Instant::now();
    let (info, ()) = tokio::join!(session.query_device_info(), disconnect_soon);

    assert_eq!(ipixel::DeviceInfo::fallback(), info);
    assert!(started.elapsed() < ipixel::DEFAULT_REPLY_TIMEOUT);
    assert_matches!(
        session
            .resolved_device_info()
            .and_then(ipixel::ResolvedDeviceInfo::fallback_reason),
        Some(ipixel::QueryError::ReplyChannelClosed)
    );
    assert!(link.active_subscriptions().is_empty());
}

#[tokio::test]
async fn unsolicited_notifications_are_ignored() {
    let (session, link) = session_over(
        ipixel::FakeLinkConfig::builder()
            .device_info_reply(REPLY_128X32.to_vec())
            .build(),
    );
    assert!(session.connect().await);

    link.inject_notification(
        ipixel::EndpointId::NotifyCharacteristic,
        vec![0x05, 0x00, 0x04, 0x80, 0x32],
    );
    tokio::task::yield_now().await;

    let info = session.query_device_info().await;
    assert_eq!((128, 32), (info.width, info.height));
}

#[tokio::test]
async fn power_state_tracks_last_successful_send() {
    let (session, _link) = session_over(ipixel::FakeLinkConfig::default());
    assert!(session.connect().await);
    assert_eq!(None, session.power_state());

    assert!(ipixel::PowerHandler::set_power(&session, ipixel::ScreenPower::Off).await);

    assert_eq!(Some(ipixel::ScreenPower::Off), session.power_state());
}
