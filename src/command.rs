//! Compact color/animation command syntax.
//!
//! A command is a whitespace separated list of tokens, in any order:
//!
//! - `h,s,v,ct` or `r,g,b,cw,ww`: channel values. Empty fields leave the
//!   channel untouched, `+N`/`-N` are relative to the current value.
//! - `N`: fade duration in seconds.
//! - `sN`: fade speed, sent verbatim.
//! - `Ns`: stay duration in seconds.
//! - anything else is a flag bundle: `r` requeue, `d` long direction,
//!   `e`/`f`/`q` queue at front-reset/front/back. In `flags:NAME` the part
//!   after the first `:` names the animation and the part before it is
//!   still read as flags.
//! - a later fade token (`N` or `sN`) replaces an earlier one.
//!
//! Several commands separated by `;` form an animation sequence.

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, RgbwwError};
use crate::protocol::CommandPayload;

/// How a command is inserted into the device's transition queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueingPolicy {
    /// Append to the end of the queue
    Back,
    /// Run next, keep the rest of the queue
    Front,
    /// Run next and clear the rest of the queue
    FrontReset,
    /// Replace the queue entirely
    Single,
}

impl QueueingPolicy {
    /// Wire tag sent under `q`
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueingPolicy::Back => "back",
            QueueingPolicy::Front => "front",
            QueueingPolicy::FrontReset => "front_reset",
            QueueingPolicy::Single => "single",
        }
    }

    fn from_flag(flag: char) -> Option<Self> {
        match flag {
            'e' => Some(QueueingPolicy::FrontReset),
            'f' => Some(QueueingPolicy::Front),
            'q' => Some(QueueingPolicy::Back),
            _ => None,
        }
    }
}

/// Direction taken around the hue circle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Short,
    Long,
}

/// Fade towards the target, either over a duration or at a speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fade {
    /// Fade duration in milliseconds
    Duration(u64),
    /// Fade speed, in device units
    Speed(u64),
}

/// Channel model a command string is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// `h,s,v,ct`
    Hsv,
    /// `r,g,b,cw,ww`
    Rgbww,
}

impl ChannelLayout {
    /// Number of fields in a channel group
    pub fn arity(&self) -> usize {
        match self {
            ChannelLayout::Hsv => 4,
            ChannelLayout::Rgbww => 5,
        }
    }
}

/// A single channel target as written by the user.
///
/// Kept as text so relative values (`+50`, `-10`) survive until the device
/// resolves them against its current color. Serialized unchanged, as a JSON
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ChannelValue(String);

impl ChannelValue {
    /// Parse a channel field, rejecting anything that is not a (signed) number
    pub fn parse(field: &str) -> Result<Self> {
        let digits = field.strip_prefix(['+', '-']).unwrap_or(field);
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (digits, None),
        };
        if !is_digits(int_part) || frac_part.is_some_and(|f| !is_digits(f)) {
            return Err(RgbwwError::parse(field, "channel value must be a number"));
        }
        Ok(Self(field.to_string()))
    }

    /// Whether the value is a delta against the current channel value
    pub fn is_relative(&self) -> bool {
        self.0.starts_with(['+', '-'])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u32> for ChannelValue {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for ChannelValue {
    // Sent as written; the device parses the text itself.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Hue/saturation/value/color-temperature targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<ChannelValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<ChannelValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<ChannelValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<ChannelValue>,
}

/// Per-diode targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<ChannelValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g: Option<ChannelValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<ChannelValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cw: Option<ChannelValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ww: Option<ChannelValue>,
}

/// Channel targets of a command in one of the two channel models
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelValues {
    Hsv(HsvValues),
    Raw(RawValues),
}

impl ChannelValues {
    fn empty(layout: ChannelLayout) -> Self {
        match layout {
            ChannelLayout::Hsv => ChannelValues::Hsv(HsvValues::default()),
            ChannelLayout::Rgbww => ChannelValues::Raw(RawValues::default()),
        }
    }

    /// True if no channel is set
    pub fn is_empty(&self) -> bool {
        match self {
            ChannelValues::Hsv(v) => {
                v.h.is_none() && v.s.is_none() && v.v.is_none() && v.ct.is_none()
            }
            ChannelValues::Raw(v) => {
                v.r.is_none() && v.g.is_none() && v.b.is_none() && v.cw.is_none() && v.ww.is_none()
            }
        }
    }
}

/// One transition step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCommand {
    pub channels: ChannelValues,
    pub fade: Option<Fade>,
    /// Stay duration in milliseconds
    pub stay: Option<u64>,
    pub requeue: bool,
    pub queueing_policy: Option<QueueingPolicy>,
    pub anim_name: Option<String>,
    pub direction: Option<Direction>,
}

impl ColorCommand {
    /// Command with every field unset
    pub fn new(layout: ChannelLayout) -> Self {
        Self {
            channels: ChannelValues::empty(layout),
            fade: None,
            stay: None,
            requeue: false,
            queueing_policy: None,
            anim_name: None,
            direction: None,
        }
    }

    /// Command targeting the given HSV values
    pub fn hsv(values: HsvValues) -> Self {
        Self {
            channels: ChannelValues::Hsv(values),
            ..Self::new(ChannelLayout::Hsv)
        }
    }

    /// Command targeting the given raw values
    pub fn raw(values: RawValues) -> Self {
        Self {
            channels: ChannelValues::Raw(values),
            ..Self::new(ChannelLayout::Rgbww)
        }
    }

    pub fn with_fade(mut self, fade: Fade) -> Self {
        self.fade = Some(fade);
        self
    }

    pub fn with_stay(mut self, stay_ms: u64) -> Self {
        self.stay = Some(stay_ms);
        self
    }

    pub fn with_queueing_policy(mut self, policy: QueueingPolicy) -> Self {
        self.queueing_policy = Some(policy);
        self
    }

    pub fn with_requeue(mut self, requeue: bool) -> Self {
        self.requeue = requeue;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.anim_name = Some(name.into());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// True if parsing produced nothing at all
    pub fn is_noop(&self) -> bool {
        self.channels.is_empty()
            && self.fade.is_none()
            && self.stay.is_none()
            && !self.requeue
            && self.queueing_policy.is_none()
            && self.anim_name.is_none()
            && self.direction.is_none()
    }

    fn apply_flags(&mut self, token: &str) -> Result<()> {
        // Whatever precedes the label is still a flag bundle, so `name:x`
        // carries the `e` of "name".
        let flags = match token.split_once(':') {
            Some((flags, name)) => {
                self.anim_name = Some(name.to_string());
                flags
            }
            None => token,
        };

        if flags.chars().any(|c| c.is_ascii_digit()) {
            return Err(RgbwwError::parse(token, "malformed numeric token"));
        }

        if flags.contains('r') {
            self.requeue = true;
        }
        if flags.contains('d') {
            self.direction = Some(Direction::Long);
        }
        for flag in ['e', 'f', 'q'] {
            if !flags.contains(flag) {
                continue;
            }
            if self.queueing_policy.is_some() {
                return Err(RgbwwError::ConflictingPolicy {
                    token: token.to_string(),
                });
            }
            self.queueing_policy = QueueingPolicy::from_flag(flag);
        }
        Ok(())
    }
}

impl Serialize for ColorCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        CommandPayload::from(self).serialize(serializer)
    }
}

/// Parse a single command for the given channel layout.
///
/// Empty input yields a command with every field unset.
pub fn parse_color_command(input: &str, layout: ChannelLayout) -> Result<ColorCommand> {
    let mut cmd = ColorCommand::new(layout);

    for token in input.split_whitespace() {
        if token.contains(',') {
            cmd.channels = parse_channel_group(token, layout)?;
        } else if let Some(speed) = token.strip_prefix('s').filter(|rest| is_digits(rest)) {
            cmd.fade = Some(Fade::Speed(parse_u64(token, speed)?));
        } else if is_digits(token) {
            cmd.fade = Some(Fade::Duration(seconds_to_millis(token, token)?));
        } else if let Some(stay) = token.strip_suffix('s').filter(|rest| is_digits(rest)) {
            cmd.stay = Some(seconds_to_millis(token, stay)?);
        } else {
            cmd.apply_flags(token)?;
        }
    }

    Ok(cmd)
}

/// Parse a `;` separated animation sequence, keeping the order of the steps
pub fn parse_color_commands(input: &str, layout: ChannelLayout) -> Result<Vec<ColorCommand>> {
    input
        .split(';')
        .map(|part| parse_color_command(part, layout))
        .collect()
}

fn parse_channel_group(token: &str, layout: ChannelLayout) -> Result<ChannelValues> {
    let mut fields = token
        .split(',')
        .map(|field| {
            if field.is_empty() {
                Ok(None)
            } else {
                ChannelValue::parse(field).map(Some)
            }
        })
        .chain(std::iter::repeat_with(|| Ok(None)))
        .take(layout.arity());

    let mut next = || fields.next().unwrap_or(Ok(None));

    Ok(match layout {
        ChannelLayout::Hsv => ChannelValues::Hsv(HsvValues {
            h: next()?,
            s: next()?,
            v: next()?,
            ct: next()?,
        }),
        ChannelLayout::Rgbww => ChannelValues::Raw(RawValues {
            r: next()?,
            g: next()?,
            b: next()?,
            cw: next()?,
            ww: next()?,
        }),
    })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_u64(token: &str, digits: &str) -> Result<u64> {
    digits
        .parse()
        .map_err(|_| RgbwwError::parse(token, "number out of range"))
}

fn seconds_to_millis(token: &str, digits: &str) -> Result<u64> {
    parse_u64(token, digits)?
        .checked_mul(1000)
        .ok_or_else(|| RgbwwError::parse(token, "duration out of range"))
}
