// Correlation engine tests against an in-memory device.
//
// All tests run on a paused clock, so deadlines and grace windows elapse
// instantly and deterministically.

use std::collections::VecDeque;
use std::time::Duration;

use safebridge_core::constants::{NOTIFY_DURESS, NOTIFY_INTRUDER};
use safebridge_core::{CommandOutcome, OneTimeCode, OutcomeStatus, Password, Resolution};
use safebridge_gateway::{GatewayConfig, GatewayError, GatewayHandle, RunningGateway, spawn};
use safebridge_notify::mock::{NotificationLog, RecordingNotifier};
use safebridge_protocol::CodeSource;
use safebridge_serial::mock::MockDevice;
use tokio::task::JoinHandle;
use tokio::time::Instant;

// ── Helpers ─────────────────────────────────────────────────────────

const RECIPIENT: &str = "4242";

/// Hands out predetermined codes.
struct FixedCodes(VecDeque<&'static str>);

impl CodeSource for FixedCodes {
    fn next_code(&mut self) -> OneTimeCode {
        OneTimeCode::new(self.0.pop_front().unwrap_or("000000")).unwrap()
    }
}

struct Harness {
    gateway: RunningGateway,
    device: MockDevice,
    log: NotificationLog,
}

impl Harness {
    fn start(config: GatewayConfig) -> Self {
        let (transport, device) = MockDevice::connect();
        let (notifier, log) = RecordingNotifier::new();
        let codes = FixedCodes(VecDeque::from(["482913", "105077"]));
        let gateway = spawn(transport, config, notifier, codes, RECIPIENT);

        Self {
            gateway,
            device,
            log,
        }
    }

    fn handle(&self) -> GatewayHandle {
        self.gateway.handle.clone()
    }

    fn open(&self, password: &str) -> JoinHandle<Result<CommandOutcome, GatewayError>> {
        let handle = self.handle();
        let password = Password::new(password).unwrap();
        tokio::spawn(async move { handle.open(password).await })
    }

    fn lock(&self) -> JoinHandle<Result<CommandOutcome, GatewayError>> {
        let handle = self.handle();
        tokio::spawn(async move { handle.lock().await })
    }

    async fn expect_line(&mut self, expected: &str) {
        let line = self.device.next_line().await.unwrap();
        assert_eq!(line.as_deref(), Some(expected));
    }

    async fn expect_no_write(&mut self, within: Duration) {
        let line = self.device.next_line_within(within).await;
        assert_eq!(line, None, "unexpected device write");
    }

    async fn reply(&mut self, line: &str) {
        self.device.send_line(line).await.unwrap();
    }
}

fn with_grace(grace_ms: u64) -> GatewayConfig {
    GatewayConfig {
        late_reply_grace: Duration::from_millis(grace_ms),
        ..GatewayConfig::default()
    }
}

async fn outcome(task: JoinHandle<Result<CommandOutcome, GatewayError>>) -> CommandOutcome {
    task.await.unwrap().unwrap()
}

/// Yield until the reactor has published `check` as true.
async fn settle(handle: &GatewayHandle, check: impl Fn(&safebridge_gateway::StatsSnapshot) -> bool) {
    for _ in 0..100 {
        if check(&handle.stats()) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("gateway never reached expected state: {:?}", handle.stats());
}

// ── Reply mapping ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_open_acknowledged() {
    let mut h = Harness::start(GatewayConfig::default());

    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    h.reply("OK").await;

    let result = outcome(open).await;
    assert_eq!(result.status, OutcomeStatus::Success);
    assert_eq!(result.message, "Request Sent. Check Safe.");
    assert_eq!(result.resolution, Resolution::Reply);

    let stats = h.handle().stats();
    assert_eq!(stats.replies_matched, 1);
    assert_eq!(stats.ambiguous_acks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_wrong_password() {
    let mut h = Harness::start(GatewayConfig::default());

    let open = h.open("0000");
    h.expect_line("CMD_OPEN:0000").await;
    h.reply("ERR_WRONG_PASS").await;

    let result = outcome(open).await;
    assert_eq!(result.status, OutcomeStatus::Error);
    assert_eq!(result.message, "Wrong Password!");
    assert_eq!(h.handle().stats().ambiguous_acks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_open_locked_out_with_diagnostic_prefix() {
    let mut h = Harness::start(GatewayConfig::default());

    let open = h.open("9999");
    h.expect_line("CMD_OPEN:9999").await;
    h.reply("[kp] ERR_LOCKED_OUT 30s").await;

    let result = outcome(open).await;
    assert_eq!(result.status, OutcomeStatus::Error);
    assert_eq!(result.message, "System is in Lockdown! Wait timer.");
}

#[tokio::test(start_paused = true)]
async fn test_lock_on_empty_safe() {
    let mut h = Harness::start(GatewayConfig::default());

    let lock = h.lock();
    h.expect_line("CMD_LOCK").await;
    h.reply("ERR_EMPTY").await;

    let result = outcome(lock).await;
    assert_eq!(result.status, OutcomeStatus::Error);
    assert_eq!(result.message, "Safe is Empty! Cannot Lock.");
}

#[tokio::test(start_paused = true)]
async fn test_lock_without_password_set() {
    let mut h = Harness::start(GatewayConfig::default());

    let lock = h.lock();
    h.expect_line("CMD_LOCK").await;
    h.reply("ERR_NO_PASS").await;

    assert_eq!(
        outcome(lock).await.message,
        "Setup Password on Keypad First!"
    );
}

#[tokio::test(start_paused = true)]
async fn test_foreign_token_uses_default_outcome() {
    let mut h = Harness::start(GatewayConfig::default());

    let lock = h.lock();
    h.expect_line("CMD_LOCK").await;
    h.reply("ERR_WRONG_PASS").await;

    let result = outcome(lock).await;
    assert_eq!(result.status, OutcomeStatus::Success);
    assert_eq!(result.message, "Lock Command Sent");
    assert_eq!(h.handle().stats().foreign_tokens, 1);
}

#[tokio::test(start_paused = true)]
async fn test_blank_line_does_not_resolve() {
    let mut h = Harness::start(GatewayConfig::default());

    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;
    h.reply("   ").await;
    h.reply("ERR_WRONG_PASS").await;

    assert_eq!(outcome(open).await.message, "Wrong Password!");
}

// ── Deadlines ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_timeout_resolves_with_default_success() {
    let mut h = Harness::start(GatewayConfig::default());

    let start = Instant::now();
    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;

    let result = outcome(open).await;
    let elapsed = start.elapsed();

    assert_eq!(result.status, OutcomeStatus::Success);
    assert_eq!(result.message, "Request Sent. Check Safe.");
    assert_eq!(result.resolution, Resolution::TimedOut);
    assert!(elapsed >= Duration::from_millis(500), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(550), "fired late: {elapsed:?}");
    assert_eq!(h.handle().stats().timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_reply_is_discarded_inside_grace_window() {
    let mut h = Harness::start(with_grace(250));

    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;
    let lock = h.lock();

    assert_eq!(outcome(open).await.resolution, Resolution::TimedOut);

    // The queued lock waits out the window
    h.expect_no_write(Duration::from_millis(50)).await;

    // Late reply to the open: must not resolve the lock
    h.reply("ERR_WRONG_PASS").await;
    h.expect_line("CMD_LOCK").await;
    h.reply("ERR_EMPTY").await;

    let result = outcome(lock).await;
    assert_eq!(result.message, "Safe is Empty! Cannot Lock.");

    let stats = h.handle().stats();
    assert_eq!(stats.stale_replies, 1);
    assert_eq!(stats.replies_matched, 1);
}

#[tokio::test(start_paused = true)]
async fn test_grace_window_delays_next_command() {
    let mut h = Harness::start(with_grace(250));

    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;
    let lock = h.lock();

    outcome(open).await;
    let timed_out_at = Instant::now();

    h.expect_line("CMD_LOCK").await;
    assert!(timed_out_at.elapsed() >= Duration::from_millis(250));

    h.reply("OK").await;
    assert_eq!(outcome(lock).await.message, "Lock Command Sent");
}

#[tokio::test(start_paused = true)]
async fn test_without_grace_late_reply_is_flagged() {
    let mut h = Harness::start(with_grace(0));

    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;
    let lock = h.lock();

    outcome(open).await;
    h.expect_line("CMD_LOCK").await;

    // Stale open reply lands on the lock
    h.reply("ERR_WRONG_PASS").await;

    let result = outcome(lock).await;
    assert_eq!(result.message, "Lock Command Sent");

    let stats = h.handle().stats();
    assert_eq!(stats.suspect_attributions, 1);
    assert_eq!(stats.foreign_tokens, 1);
}

#[tokio::test(start_paused = true)]
async fn test_without_grace_later_command_is_not_flagged() {
    let mut h = Harness::start(with_grace(0));

    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;
    outcome(open).await;

    // Nothing was queued behind the timed-out open
    tokio::time::sleep(Duration::from_secs(60)).await;

    let lock = h.lock();
    h.expect_line("CMD_LOCK").await;
    h.reply("OK").await;
    assert!(outcome(lock).await.is_success());

    let stats = h.handle().stats();
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.replies_matched, 1);
    assert_eq!(stats.suspect_attributions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_reply_with_nothing_in_flight_is_counted() {
    let mut h = Harness::start(GatewayConfig::default());

    h.reply("ERR_EMPTY").await;
    // Lines are handled in order; once the alert is out, the reply was seen
    h.reply("ALERT_DURESS").await;
    h.log.recv().await.unwrap();

    assert_eq!(h.handle().stats().unattributed_replies, 1);
}

// ── Serialization ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_concurrent_commands_are_written_one_at_a_time() {
    let mut h = Harness::start(GatewayConfig::default());

    let first = h.open("1111");
    let second = h.lock();

    let line = h.device.next_line().await.unwrap().unwrap();
    h.expect_no_write(Duration::from_millis(100)).await;
    h.reply("OK").await;

    let next = h.device.next_line().await.unwrap().unwrap();
    let mut written = vec![line, next];
    written.sort();
    assert_eq!(written, ["CMD_LOCK", "CMD_OPEN:1111"]);

    h.reply("OK").await;
    assert!(outcome(first).await.is_success());
    assert!(outcome(second).await.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_queue_preserves_submission_order() {
    let mut h = Harness::start(GatewayConfig::default());

    let first = h.open("1111");
    h.expect_line("CMD_OPEN:1111").await;

    let second = h.open("2222");
    settle(&h.handle(), |s| s.queued == 1).await;
    let third = h.lock();
    settle(&h.handle(), |s| s.queued == 2).await;

    h.reply("ERR_WRONG_PASS").await;
    h.expect_line("CMD_OPEN:2222").await;
    h.reply("OK").await;
    h.expect_line("CMD_LOCK").await;
    h.reply("ERR_NO_PASS").await;

    assert_eq!(outcome(first).await.message, "Wrong Password!");
    assert_eq!(outcome(second).await.message, "Request Sent. Check Safe.");
    assert_eq!(outcome(third).await.message, "Setup Password on Keypad First!");
}

#[tokio::test(start_paused = true)]
async fn test_full_queue_rejects_with_busy() {
    let mut h = Harness::start(GatewayConfig {
        queue_depth: 1,
        ..GatewayConfig::default()
    });

    let first = h.open("1111");
    h.expect_line("CMD_OPEN:1111").await;
    let second = h.lock();
    settle(&h.handle(), |s| s.queued == 1).await;

    let third = h.handle().lock().await;
    assert_eq!(third, Err(GatewayError::Busy { queued: 1 }));
    assert_eq!(h.handle().stats().busy_rejections, 1);

    h.reply("OK").await;
    h.expect_line("CMD_LOCK").await;
    h.reply("OK").await;
    assert!(outcome(first).await.is_success());
    assert!(outcome(second).await.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_zero_depth_rejects_any_overtaking_command() {
    let mut h = Harness::start(GatewayConfig {
        queue_depth: 0,
        ..GatewayConfig::default()
    });

    let first = h.lock();
    h.expect_line("CMD_LOCK").await;

    let second = h.handle().lock().await;
    assert_eq!(second, Err(GatewayError::Busy { queued: 0 }));

    h.reply("OK").await;
    assert!(outcome(first).await.is_success());
}

// ── Events ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_code_request_writes_and_notifies_same_code() {
    let mut h = Harness::start(GatewayConfig::default());

    h.reply("REQ_OTP").await;
    h.expect_line("OTP:482913").await;

    let sent = h.log.recv().await.unwrap();
    assert_eq!(sent.recipient, RECIPIENT);
    assert_eq!(sent.text, "OTP Code Request: 482913");

    h.expect_no_write(Duration::from_millis(100)).await;
    assert!(h.log.try_recv().is_none());
    assert_eq!(h.handle().stats().codes_written, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duress_alert_notifies_without_writing() {
    let mut h = Harness::start(GatewayConfig::default());

    h.reply("ALERT_DURESS").await;

    let sent = h.log.recv().await.unwrap();
    assert_eq!(sent.text, NOTIFY_DURESS);
    h.expect_no_write(Duration::from_secs(1)).await;
    assert!(h.log.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_alert_while_command_pending() {
    let mut h = Harness::start(GatewayConfig::default());

    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;

    h.reply("ALERT_INTRUDER").await;
    assert_eq!(h.log.recv().await.unwrap().text, NOTIFY_INTRUDER);
    h.expect_no_write(Duration::from_millis(100)).await;

    // The alert did not resolve the open
    h.reply("ERR_WRONG_PASS").await;
    let result = outcome(open).await;
    assert_eq!(result.message, "Wrong Password!");
    assert_eq!(result.resolution, Resolution::Reply);

    // Command replies never reach the notification sink
    assert!(h.log.recv_within(Duration::from_secs(1)).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_code_request_while_command_pending() {
    let mut h = Harness::start(GatewayConfig::default());

    let lock = h.lock();
    h.expect_line("CMD_LOCK").await;

    h.reply("REQ_OTP").await;
    h.expect_line("OTP:482913").await;
    h.log.recv().await.unwrap();

    h.reply("ERR_EMPTY").await;
    assert_eq!(outcome(lock).await.message, "Safe is Empty! Cannot Lock.");
}

#[tokio::test(start_paused = true)]
async fn test_notification_failure_is_counted_only() {
    let (transport, mut device) = MockDevice::connect();
    let (notifier, mut log) = RecordingNotifier::failing();
    let gateway = spawn(
        transport,
        GatewayConfig::default(),
        notifier,
        FixedCodes(VecDeque::from(["482913"])),
        RECIPIENT,
    );

    device.send_line("REQ_OTP").await.unwrap();
    assert_eq!(
        device.next_line().await.unwrap().as_deref(),
        Some("OTP:482913")
    );
    log.recv().await.unwrap();

    settle(&gateway.handle, |s| s.notifications_failed == 1).await;
    assert_eq!(gateway.handle.stats().codes_written, 1);
}

// ── Link failures ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_device_disconnect_fails_pending_command() {
    let h = Harness::start(GatewayConfig::default());
    let Harness {
        gateway,
        mut device,
        ..
    } = h;

    let handle = gateway.handle.clone();
    let open = tokio::spawn(async move { handle.open(Password::new("1234").unwrap()).await });
    assert_eq!(
        device.next_line().await.unwrap().as_deref(),
        Some("CMD_OPEN:1234")
    );

    device.disconnect().await.unwrap();

    let result = open.await.unwrap();
    assert!(matches!(result, Err(GatewayError::DeviceUnavailable { .. })));

    let reactor = gateway.reactor.await.unwrap();
    assert!(matches!(reactor, Err(GatewayError::DeviceUnavailable { .. })));

    assert_eq!(gateway.handle.lock().await, Err(GatewayError::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_answers_waiting_callers() {
    let mut h = Harness::start(GatewayConfig::default());

    let open = h.open("1234");
    h.expect_line("CMD_OPEN:1234").await;

    h.handle().shutdown();

    assert_eq!(open.await.unwrap(), Err(GatewayError::Shutdown));
    assert_eq!(h.gateway.reactor.await.unwrap(), Ok(()));
    h.gateway.dispatcher.await.unwrap();
}
