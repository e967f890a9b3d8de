use chrono::{DateTime, Utc};

use crate::error::SnapshotError;
use crate::model::{FIRST_GAMEWEEK, Gameweek, LAST_GAMEWEEK, is_valid_gameweek};

#[derive(Debug, Clone)]
pub struct GameweekContext {
    pub current: Option<Gameweek>,
    pub next: Option<Gameweek>,
}

impl GameweekContext {
    pub fn from_events(events: &[Gameweek]) -> Result<Self, SnapshotError> {
        if let Some(bad) = events.iter().find(|gw| !is_valid_gameweek(gw.id)) {
            return Err(SnapshotError::GameweekOutOfRange(bad.id));
        }

        let current: Vec<&Gameweek> = events.iter().filter(|gw| gw.is_current).collect();
        if current.len() > 1 {
            return Err(SnapshotError::MultipleCurrent(
                current.iter().map(|gw| gw.id).collect(),
            ));
        }
        let next: Vec<&Gameweek> = events.iter().filter(|gw| gw.is_next).collect();
        if next.len() > 1 {
            return Err(SnapshotError::MultipleNext(
                next.iter().map(|gw| gw.id).collect(),
            ));
        }

        let current = current.first().map(|gw| (*gw).clone());
        let next = next.first().map(|gw| (*gw).clone());
        if let (Some(c), Some(n)) = (&current, &next) {
            if n.id != c.id + 1 {
                return Err(SnapshotError::NextNotAfterCurrent {
                    current: c.id,
                    next: n.id,
                });
            }
        }
        Ok(Self { current, next })
    }

    pub fn current_id(&self) -> Option<u8> {
        self.current.as_ref().map(|gw| gw.id)
    }

    /// The gameweek transfers and captaincy are being planned for.
    pub fn planning_gameweek(&self) -> u8 {
        self.next
            .as_ref()
            .or(self.current.as_ref())
            .map(|gw| gw.id)
            .unwrap_or(FIRST_GAMEWEEK)
    }

    pub fn remaining_gameweeks(&self) -> u8 {
        LAST_GAMEWEEK.saturating_sub(self.planning_gameweek()) + 1
    }

    /// Hours until the next deadline; negative once it has passed.
    pub fn hours_until_deadline(&self, now: DateTime<Utc>) -> Option<f64> {
        let deadline = self.next.as_ref()?.deadline()?;
        Some((deadline - now).num_minutes() as f64 / 60.0)
    }
}
