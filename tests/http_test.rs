#![allow(clippy::unwrap_used)]
// Integration tests for the HTTP command path and subnet scan using wiremock.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rgbww_controller::{
    scan, Channel, ChannelCommand, ChannelLayout, ChannelValue, ColorCommand, ColorMode,
    ControllerConfig, Direction, Fade, HsvValues, QueueingPolicy, RawValues, RgbwwController,
    RgbwwError,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> ControllerConfig {
    ControllerConfig::default().with_http_port(server.address().port())
}

async fn setup() -> (MockServer, RgbwwController) {
    let server = MockServer::start().await;
    let controller = RgbwwController::with_config("127.0.0.1", config_for(&server)).unwrap();
    (server, controller)
}

async fn expect_post(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .and(body_json(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(server)
        .await;
}

fn controller_info(mac: &str) -> serde_json::Value {
    json!({
        "firmware": "1.0",
        "connection": { "mac": mac, "ip": "127.0.0.1" },
    })
}

// ── Color commands ──────────────────────────────────────────────────

#[tokio::test]
async fn test_command_string_is_posted_as_animation() {
    let (server, controller) = setup().await;

    expect_post(
        &server,
        "/color",
        json!({
            "cmds": [
                { "hsv": { "h": "0", "s": "100", "v": "50" }, "t": 2000, "stay": 5000, "q": "back" },
                { "hsv": { "h": "240", "s": "100", "v": "50" }, "t": 2000, "r": true, "name": "loop" },
            ]
        }),
    )
    .await;

    controller
        .send_command_string("0,100,50 2 5s q;240,100,50 2 r:loop", ChannelLayout::Hsv)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_single_command_payload() {
    let (server, controller) = setup().await;

    expect_post(
        &server,
        "/color",
        json!({
            "hsv": { "h": "+20", "v": "80" },
            "s": 50,
            "q": "front_reset",
            "d": "long",
        }),
    )
    .await;

    let cmd = ColorCommand::hsv(HsvValues {
        h: Some(ChannelValue::parse("+20").unwrap()),
        v: Some(80.into()),
        ..Default::default()
    })
    .with_fade(Fade::Speed(50))
    .with_queueing_policy(QueueingPolicy::FrontReset)
    .with_direction(Direction::Long);

    controller.send_color_command(&cmd).await.unwrap();
}

#[tokio::test]
async fn test_set_hsv_and_raw() {
    let (server, controller) = setup().await;

    expect_post(
        &server,
        "/color",
        json!({ "hsv": { "h": "120", "s": "100", "v": "100" }, "t": 1500 }),
    )
    .await;
    expect_post(
        &server,
        "/color",
        json!({ "raw": { "r": "1023", "g": "0", "b": "0", "cw": "0", "ww": "0" } }),
    )
    .await;

    controller
        .set_hsv(
            HsvValues {
                h: Some(120.into()),
                s: Some(100.into()),
                v: Some(100.into()),
                ct: None,
            },
            Some(1500),
        )
        .await
        .unwrap();

    controller
        .set_raw(RawValues {
            r: Some(1023.into()),
            g: Some(0.into()),
            b: Some(0.into()),
            cw: Some(0.into()),
            ww: Some(0.into()),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_parse_error_sends_nothing() {
    let (server, controller) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = controller
        .send_command_string("0,100,50 2;1,2,x", ChannelLayout::Hsv)
        .await;
    assert!(
        matches!(result, Err(RgbwwError::Parse { .. })),
        "expected Parse error, got: {result:?}"
    );

    let result = controller
        .send_command_string("0,100,50 eq", ChannelLayout::Hsv)
        .await;
    assert!(
        matches!(result, Err(RgbwwError::ConflictingPolicy { .. })),
        "expected ConflictingPolicy error, got: {result:?}"
    );
}

// ── Channel control ─────────────────────────────────────────────────

#[tokio::test]
async fn test_channel_commands() {
    let (server, controller) = setup().await;

    expect_post(&server, "/pause", json!({ "channels": ["h", "v"] })).await;
    expect_post(&server, "/continue", json!({ "channels": ["ct"] })).await;
    expect_post(&server, "/stop", json!({ "channels": ["h", "s", "v", "ct"] })).await;

    controller
        .send_channel_command(ChannelCommand::Pause, &[Channel::Hue, Channel::Value, Channel::Hue])
        .await
        .unwrap();
    controller
        .send_channel_command(ChannelCommand::Continue, &[Channel::ColorTemp])
        .await
        .unwrap();
    controller
        .send_channel_command(
            ChannelCommand::Stop,
            &[Channel::Hue, Channel::Saturation, Channel::Value, Channel::ColorTemp],
        )
        .await
        .unwrap();
}

// ── Refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_loads_state() {
    let (server, controller) = setup().await;

    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(controller_info("a020a6aabbcc")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "general": { "device_name": "Kitchen" },
            "color": { "colortemp": { "ww": 2900, "cw": 6000 } },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/color"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hsv": { "h": 10, "s": 20, "v": 30, "ct": 4000 },
            "raw": { "r": 1, "g": 2, "b": 3, "cw": 4, "ww": 5 },
            "mode": "raw",
        })))
        .mount(&server)
        .await;

    assert!(controller.info().is_err());
    controller.refresh().await.unwrap();

    assert_eq!(controller.mac().unwrap().as_deref(), Some("a020a6aabbcc"));
    assert_eq!(controller.device_name().unwrap().as_deref(), Some("Kitchen"));
    assert_eq!(controller.color_temp_range().unwrap(), Some((2900, 6000)));

    let color = controller.color();
    assert_eq!(color.hue, 10);
    assert_eq!(color.color_temp, 4000);
    assert_eq!(color.raw_ww, 5);
    assert_eq!(color.color_mode, ColorMode::Raw);
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let (server, controller) = setup().await;

    Mock::given(method("POST"))
        .and(path("/color"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let result = controller
        .send_command_string("0,0,0", ChannelLayout::Hsv)
        .await;
    assert!(
        matches!(result, Err(RgbwwError::ControllerUnavailable { ref host, .. }) if host == "127.0.0.1"),
        "expected ControllerUnavailable error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unreachable_host_is_unavailable() {
    // Reserve a port, then free it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ControllerConfig::default().with_http_port(port);
    let controller = RgbwwController::with_config("127.0.0.1", config).unwrap();

    let result = controller.refresh().await;
    assert!(
        matches!(result, Err(RgbwwError::ControllerUnavailable { .. })),
        "expected ControllerUnavailable error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_slow_controller_times_out() {
    let server = MockServer::start().await;
    let config = config_for(&server).with_http_timeout(Duration::from_millis(200));
    let controller = RgbwwController::with_config("127.0.0.1", config).unwrap();

    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(controller_info("a020a6aabbcc"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = controller.refresh().await;
    assert!(
        matches!(result, Err(RgbwwError::ControllerUnavailable { .. })),
        "expected ControllerUnavailable error, got: {result:?}"
    );
    assert!(controller.info().is_err());
}

// ── Scan ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scan_finds_controller() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(controller_info("a020a6010203")))
        .mount(&server)
        .await;

    let config = config_for(&server).with_http_timeout(Duration::from_secs(1));
    let hosts = [Ipv4Addr::LOCALHOST, Ipv4Addr::new(127, 0, 0, 2)];
    let found = scan(hosts, &config).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].ip, Ipv4Addr::LOCALHOST);
    assert_eq!(found[0].mac, "a020a6010203");
    assert_eq!(found[0].info["firmware"], "1.0");
}

#[tokio::test]
async fn test_scan_skips_other_http_servers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let found = scan([Ipv4Addr::LOCALHOST], &config_for(&server)).await.unwrap();
    assert!(found.is_empty());
}
