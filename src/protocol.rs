use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{ChannelValues, ColorCommand, Direction, Fade, HsvValues, QueueingPolicy, RawValues};
use crate::types::Channel;

/// Message streamed by the controller over the TCP connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Classify the method name
    pub fn kind(&self) -> Method {
        Method::from_name(&self.method)
    }
}

/// Known notification methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Color,
    Info,
    Config,
    TransitionFinished,
    StateCompleted,
    ClockSlaveStatus,
    KeepAlive,
    Unknown,
}

impl Method {
    pub fn from_name(name: &str) -> Self {
        match name {
            "color_event" | "color" => Method::Color,
            "info" => Method::Info,
            "config" => Method::Config,
            "transition_finished" => Method::TransitionFinished,
            "state_completed" => Method::StateCompleted,
            "clock_slave_status" => Method::ClockSlaveStatus,
            "keep_alive" => Method::KeepAlive,
            _ => Method::Unknown,
        }
    }
}

/// Parameters of a `transition_finished` notification
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionFinished {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub requeued: bool,
}

/// HTTP endpoints of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Info,
    Config,
    Color,
    Pause,
    Continue,
    Stop,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Info => "info",
            Endpoint::Config => "config",
            Endpoint::Color => "color",
            Endpoint::Pause => "pause",
            Endpoint::Continue => "continue",
            Endpoint::Stop => "stop",
        }
    }
}

/// Body of `POST /color` for a single command
#[derive(Debug, Serialize)]
pub(crate) struct CommandPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsv: Option<&'a HsvValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<&'a RawValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<QueueingPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

impl<'a> From<&'a ColorCommand> for CommandPayload<'a> {
    fn from(cmd: &'a ColorCommand) -> Self {
        let (hsv, raw) = match &cmd.channels {
            channels if channels.is_empty() => (None, None),
            ChannelValues::Hsv(values) => (Some(values), None),
            ChannelValues::Raw(values) => (None, Some(values)),
        };
        let (t, s) = match cmd.fade {
            Some(Fade::Duration(ms)) => (Some(ms), None),
            Some(Fade::Speed(speed)) => (None, Some(speed)),
            None => (None, None),
        };

        Self {
            hsv,
            raw,
            t,
            s,
            stay: cmd.stay,
            q: cmd.queueing_policy,
            r: cmd.requeue.then_some(true),
            d: cmd.direction,
            name: cmd.anim_name.as_deref(),
        }
    }
}

/// Body of `POST /color` for an animation sequence
#[derive(Debug, Serialize)]
pub(crate) struct AnimationPayload<'a> {
    pub cmds: &'a [ColorCommand],
}

/// Body of `POST /{pause,continue,stop}`
#[derive(Debug, Serialize)]
pub(crate) struct ChannelsPayload {
    pub channels: Vec<Channel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_names() {
        assert_eq!(Method::from_name("color_event"), Method::Color);
        assert_eq!(Method::from_name("color"), Method::Color);
        assert_eq!(Method::from_name("keep_alive"), Method::KeepAlive);
        assert_eq!(Method::from_name("firmware_update"), Method::Unknown);
    }

    #[test]
    fn test_notification_without_params() {
        let msg: Notification = serde_json::from_value(json!({"method": "state_completed"})).unwrap();
        assert_eq!(msg.kind(), Method::StateCompleted);
        assert!(msg.params.is_null());
    }

    #[test]
    fn test_animation_payload() {
        let cmds = vec![
            ColorCommand::hsv(HsvValues {
                v: Some(100.into()),
                ..Default::default()
            }),
            ColorCommand::hsv(HsvValues::default()).with_stay(250),
        ];
        let payload = serde_json::to_value(AnimationPayload { cmds: &cmds }).unwrap();
        assert_eq!(
            payload,
            json!({ "cmds": [ { "hsv": { "v": "100" } }, { "stay": 250 } ] })
        );
    }
}
