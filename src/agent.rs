use std::{fmt, num::NonZeroU8};

use serde::Deserialize;

use crate::sim_protocol::{KillRequest, SetPenRequest, SpawnRequest};

/// Name the simulator gave to an agent we spawned.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AgentHandle(String);

impl AgentHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn kill_request(&self) -> KillRequest {
        KillRequest {
            name: self.0.clone(),
        }
    }
}

impl fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where and under which name the extra agent appears.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub x: f32,
    pub y: f32,
    /// heading in radians
    pub theta: f32,
    pub name: String,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            x: 20.,
            y: 20.,
            theta: 0.,
            name: "turtle2".to_string(),
        }
    }
}

impl SpawnConfig {
    pub fn request(&self) -> SpawnRequest {
        SpawnRequest {
            x: self.x,
            y: self.y,
            theta: self.theta,
            name: self.name.clone(),
        }
    }
}

const DEFAULT_PEN_THICKNESS: NonZeroU8 = match NonZeroU8::new(15) {
    Some(thickness) => thickness,
    None => panic!("pen thickness must be positive"),
};

/// Trail drawing style. Channel ranges and a positive thickness are guaranteed by the types.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(default)]
pub struct PenConfig {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub thickness: NonZeroU8,
    pub disabled: bool,
}

impl Default for PenConfig {
    fn default() -> Self {
        Self {
            red: 255,
            green: 210,
            blue: 20,
            thickness: DEFAULT_PEN_THICKNESS,
            disabled: false,
        }
    }
}

impl PenConfig {
    pub fn request_for(&self, agent: &str) -> SetPenRequest {
        SetPenRequest {
            agent: agent.to_string(),
            r: self.red.into(),
            g: self.green.into(),
            b: self.blue.into(),
            width: self.thickness.get().into(),
            off: self.disabled,
        }
    }
}
