//! Core match types and entities

pub mod card;
pub mod effects;
pub mod entity;
pub mod player;
pub mod types;

pub use card::{Buff, CardInstance, CardKind, CardTemplate};
pub use effects::{
    ActivatedAbility, BuffDuration, EffectDef, Passive, Target, TargetClass, TargetSpec,
};
pub use entity::{InstanceId, InstanceRegistry, Seat};
pub use player::Player;
pub use types::{CardName, MatchId, PlayerName, TemplateId};
