mod support;

use dashstate_core::{AuthPhase, AuthSyncHandle, ResponseOrdering, StatusResponse, Visibility};
use std::time::Duration;
use support::{config, synchronizer, ScriptedTransport, Step};
use tokio::time::sleep;

/// Lets spawned verifications run to completion under paused time.
async fn settle() {
    sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn visible_surface_verifies_on_start_and_every_interval() {
    let transport = ScriptedTransport::always(Step::ok(StatusResponse::authenticated_as(7)));
    let config = config(ResponseOrdering::LatestIssuedWins);
    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");

    let handle = AuthSyncHandle::start(sync, &config, Visibility::Visible);
    settle().await;
    assert_eq!(transport.status_calls(), 1);
    assert_eq!(handle.snapshot().phase(), AuthPhase::Authenticated);

    sleep(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(transport.status_calls(), 2);

    sleep(Duration::from_secs(20)).await;
    settle().await;
    assert_eq!(transport.status_calls(), 4);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn hidden_surface_suspends_polling_and_regain_checks_exactly_once() {
    let transport = ScriptedTransport::always(Step::ok(StatusResponse::authenticated_as(7)));
    let config = config(ResponseOrdering::LatestIssuedWins);
    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");

    let handle = AuthSyncHandle::start(sync, &config, Visibility::Visible);
    settle().await;
    assert_eq!(transport.status_calls(), 1);

    handle.set_visibility(Visibility::Hidden);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.status_calls(), 1);

    handle.set_visibility(Visibility::Visible);
    settle().await;
    assert_eq!(transport.status_calls(), 2);

    // Schedule restarts from the regain check; no backlog of missed ticks.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.status_calls(), 2);
    sleep(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(transport.status_calls(), 3);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn short_background_does_not_force_a_check() {
    let transport = ScriptedTransport::always(Step::ok(StatusResponse::authenticated_as(7)));
    let config = config(ResponseOrdering::LatestIssuedWins);
    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");

    let handle = AuthSyncHandle::start(sync, &config, Visibility::Visible);
    settle().await;

    handle.set_visibility(Visibility::Hidden);
    sleep(Duration::from_secs(2)).await;
    handle.set_visibility(Visibility::Visible);
    settle().await;
    assert_eq!(transport.status_calls(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn hidden_start_defers_first_check_until_visible() {
    let transport = ScriptedTransport::always(Step::ok(StatusResponse::authenticated_as(7)));
    let config = config(ResponseOrdering::LatestIssuedWins);
    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");

    let handle = AuthSyncHandle::start(sync, &config, Visibility::Hidden);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.status_calls(), 0);
    assert_eq!(handle.snapshot().phase(), AuthPhase::Unknown);

    handle.set_visibility(Visibility::Visible);
    settle().await;
    assert_eq!(transport.status_calls(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_request_runs_between_ticks() {
    let transport = ScriptedTransport::always(Step::ok(StatusResponse::authenticated_as(7)));
    let config = config(ResponseOrdering::LatestIssuedWins);
    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");

    let handle = AuthSyncHandle::start(sync, &config, Visibility::Visible);
    settle().await;
    handle.request_verify();
    settle().await;
    assert_eq!(transport.status_calls(), 2);

    let session = handle.verify_now().await;
    assert!(session.is_authenticated());
    assert_eq!(transport.status_calls(), 3);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_and_drop_release_the_timer() {
    let transport = ScriptedTransport::always(Step::ok(StatusResponse::authenticated_as(7)));
    let config = config(ResponseOrdering::LatestIssuedWins);

    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");
    let handle = AuthSyncHandle::start(sync, &config, Visibility::Visible);
    settle().await;
    handle.shutdown().await;
    sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.status_calls(), 1);

    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");
    let handle = AuthSyncHandle::start(sync, &config, Visibility::Visible);
    settle().await;
    drop(handle);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn each_check_passes_through_checking_phase() {
    let transport = ScriptedTransport::always(
        Step::ok(StatusResponse::authenticated_as(7)).after(Duration::from_secs(3)),
    );
    let config = config(ResponseOrdering::LatestIssuedWins);
    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");

    let handle = AuthSyncHandle::start(sync, &config, Visibility::Visible);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.snapshot().phase(), AuthPhase::Checking);
    assert!(!handle.snapshot().is_authenticated());

    sleep(Duration::from_secs(3)).await;
    assert_eq!(handle.snapshot().phase(), AuthPhase::Authenticated);

    // Scheduled tick at 10s re-enters Checking without dropping the identity.
    sleep(Duration::from_secs(7)).await;
    let during = handle.snapshot();
    assert_eq!(during.phase(), AuthPhase::Checking);
    assert!(during.is_authenticated());

    sleep(Duration::from_secs(3)).await;
    assert_eq!(handle.snapshot().phase(), AuthPhase::Authenticated);
    assert_eq!(transport.status_calls(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn cancelled_checks_do_not_leave_session_checking() {
    let transport = ScriptedTransport::always(
        Step::ok(StatusResponse::authenticated_as(7)).after(Duration::from_secs(3)),
    );
    let config = config(ResponseOrdering::LatestIssuedWins);

    let (sync, _navigator) = synchronizer(&config, transport.clone(), "/dashboard");
    let handle = AuthSyncHandle::start(sync.clone(), &config, Visibility::Visible);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(sync.snapshot().phase(), AuthPhase::Checking);
    handle.shutdown().await;
    assert_eq!(sync.snapshot().phase(), AuthPhase::Unknown);

    let (sync, _navigator) = synchronizer(&config, transport, "/dashboard");
    let handle = AuthSyncHandle::start(sync.clone(), &config, Visibility::Visible);
    sleep(Duration::from_secs(10) + Duration::from_millis(500)).await;
    assert_eq!(sync.snapshot().phase(), AuthPhase::Checking);
    drop(handle);
    settle().await;
    let session = sync.snapshot();
    assert_eq!(session.phase(), AuthPhase::Authenticated);
    assert!(session.is_authenticated());
}
