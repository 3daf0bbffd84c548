//! Signal phases and the mapping from server state to a phase.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SamplerError};

/// Observable state of a traffic signal.
///
/// The numeric values are what gets written to the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SignalPhase {
    Green = 1,
    Red = 2,
    /// Never produced by [`map_phase`]; the stage index alone cannot tell
    /// yellow apart from red.
    Yellow = 3,
}

impl SignalPhase {
    /// Ordinal written to the `y` column.
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(Self::Green),
            2 => Some(Self::Red),
            3 => Some(Self::Yellow),
            _ => None,
        }
    }
}

impl fmt::Display for SignalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Green => "GREEN",
            Self::Red => "RED",
            Self::Yellow => "YELLOW",
        })
    }
}

/// One signal's entry in `get-all-current-state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalState {
    pub current_stage_idx: usize,
    /// Whatever else the server reports for the signal.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignalState {
    pub fn at_stage(current_stage_idx: usize) -> Self {
        Self {
            current_stage_idx,
            extra: Map::new(),
        }
    }
}

/// Full state mapping keyed by signal id.
pub type SignalStates = HashMap<String, SignalState>;

/// Phase of `signal_id`: green on stage 0, red on any other stage.
pub fn map_phase(states: &SignalStates, signal_id: &str) -> Result<SignalPhase> {
    let state = states
        .get(signal_id)
        .ok_or_else(|| SamplerError::MissingSignal {
            signal_id: signal_id.to_owned(),
        })?;

    Ok(if state.current_stage_idx == 0 {
        SignalPhase::Green
    } else {
        SignalPhase::Red
    })
}
