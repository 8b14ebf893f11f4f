//! Engine errors.

use std::fmt;

use crate::sprite::SpriteId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxError {
    /// `new` was called with every registry slot occupied.
    CapacityExceeded { capacity: usize },
    /// The handle does not name a live sprite.
    InvalidHandle(SpriteId),
    /// Model index outside the catalog.
    UnknownModel(u8),
    /// A catalog entry does not fit the configured sprite height.
    InvalidModel { model: usize, reason: String },
    InvalidConfig(String),
}

impl fmt::Display for MuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { capacity } => {
                write!(f, "sprite registry full ({capacity} sprites live)")
            }
            Self::InvalidHandle(id) => write!(f, "sprite {id} is not live"),
            Self::UnknownModel(model) => write!(f, "model {model} is not in the catalog"),
            Self::InvalidModel { model, reason } => write!(f, "model {model}: {reason}"),
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for MuxError {}
