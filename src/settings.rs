//! Game settings and balance tuning
//!
//! Every timing threshold the round, the humans and the zombie rely on lives
//! here rather than in code. Settings are stored as JSON and every section
//! falls back to its defaults when missing from the file.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to read or write a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Round orchestration timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundTuning {
    /// Humans spawned per round
    pub humans_per_round: u32,
    /// Delay between two spawns (seconds)
    pub human_spawn_interval: f32,
    /// Where humans gather before boarding
    pub gathering_point: Vec2,
    /// Humans spawn inside this radius around the gathering point
    pub gathering_radius: f32,
    /// Time humans mill around after the last spawn
    pub settle_time: f32,
    /// Pause between the zombie hiding and humans walking to seats
    pub boarding_delay: f32,
    /// Give up on humans still walking after this long
    pub boarding_timeout: f32,
    /// Rail speed while the ride is in progress
    pub ride_speed: f32,
    /// Delay before any abort path loops back to gathering
    pub restart_delay: f32,
    /// How long to wait for the zombie to take its seat
    pub zombie_wait_time: f32,
    /// How long to wait for the player to hide the zombie
    pub wait_for_zombie_hiding_time: f32,
    /// Fleeing humans are removed this long after they panic
    pub flee_cleanup_delay: f32,
    /// Pause between the ride stopping and the restart countdown
    pub ride_complete_delay: f32,
    /// Stray-human reconciliation period, in frames
    pub stray_check_interval_frames: u64,
    /// Panic spreads to unseated humans within this radius
    pub panic_radius: f32,
    /// Hide the zombie automatically whenever gathering begins
    pub auto_hide_on_round_start: bool,
}

impl Default for RoundTuning {
    fn default() -> Self {
        Self {
            humans_per_round: 8,
            human_spawn_interval: 0.5,
            gathering_point: Vec2::new(-2.0, -4.0),
            gathering_radius: 2.0,
            settle_time: 1.5,
            boarding_delay: 1.5,
            boarding_timeout: 15.0,
            ride_speed: 5.0,
            restart_delay: 3.0,
            // Unhide takes unhide_delay plus the reveal, so leave headroom
            zombie_wait_time: 3.0,
            wait_for_zombie_hiding_time: 5.0,
            flee_cleanup_delay: 2.0,
            ride_complete_delay: 2.0,
            stray_check_interval_frames: 120,
            panic_radius: 5.0,
            auto_hide_on_round_start: true,
        }
    }
}

/// Human reaction timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanTuning {
    pub min_vulnerable: f32,
    pub max_vulnerable: f32,
    pub min_defensive: f32,
    pub max_defensive: f32,
    /// Grace period after turning defensive, and the dead-body jump delay
    pub defensive_jump_delay: f32,
    pub empty_seat_jump_delay: f32,
    /// Reaction time to a visible zombie
    pub zombie_detection_delay: f32,
    /// Seat check period while vulnerable
    pub zombie_check_interval: f32,
    /// Seat check period while defensive
    pub defensive_check_interval: f32,
    pub move_speed: f32,
    pub arrival_distance: f32,
    pub scream_duration: f32,
    /// Time spent running before the screaming flag clears
    pub scream_recovery: f32,
    pub flee_distance: f32,
    pub panic_run_speed_multiplier: f32,
    pub jump_height: f32,
    pub jump_duration: f32,
    pub force_jump_duration: f32,
    pub throw_duration: f32,
    pub throw_arc_height: f32,
    pub throw_distance: f32,
}

impl Default for HumanTuning {
    fn default() -> Self {
        Self {
            min_vulnerable: 2.0,
            max_vulnerable: 5.0,
            min_defensive: 3.0,
            max_defensive: 6.0,
            defensive_jump_delay: 0.5,
            empty_seat_jump_delay: 1.0,
            zombie_detection_delay: 0.2,
            zombie_check_interval: 0.5,
            defensive_check_interval: 0.2,
            move_speed: 2.0,
            arrival_distance: 0.1,
            scream_duration: 2.0,
            scream_recovery: 3.0,
            flee_distance: 0.5,
            panic_run_speed_multiplier: 0.7,
            jump_height: 2.0,
            jump_duration: 0.5,
            force_jump_duration: 0.1,
            throw_duration: 1.5,
            throw_arc_height: 2.0,
            throw_distance: 3.0,
        }
    }
}

/// Zombie actor timings and click radii
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZombieTuning {
    pub hide_move_duration: f32,
    pub unhide_delay: f32,
    pub hide_spot_click_radius: f32,
    pub seat_switch_duration: f32,
    pub cart_switch_duration: f32,
    pub seat_click_radius: f32,
    pub human_click_radius: f32,
    pub dead_human_click_radius: f32,
    pub throw_animation_duration: f32,
    pub eat_duration: f32,
    pub eat_attempt_duration: f32,
    /// Delay before a defensive neighbour of the victim bolts
    pub escape_check_delay: f32,
}

impl Default for ZombieTuning {
    fn default() -> Self {
        Self {
            hide_move_duration: 1.5,
            unhide_delay: 0.5,
            hide_spot_click_radius: 1.5,
            seat_switch_duration: 1.0,
            cart_switch_duration: 2.0,
            seat_click_radius: 1.0,
            human_click_radius: 1.5,
            dead_human_click_radius: 1.8,
            throw_animation_duration: 1.0,
            eat_duration: 1.0,
            eat_attempt_duration: 0.8,
            escape_check_delay: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HungerTuning {
    pub max_hunger: f32,
    /// Hunger gained per second of ride
    pub increase_rate: f32,
    /// Hunger removed per human eaten
    pub decrease_per_head: f32,
}

impl Default for HungerTuning {
    fn default() -> Self {
        Self {
            max_hunger: 100.0,
            increase_rate: 8.0,
            decrease_per_head: 25.0,
        }
    }
}

/// Rail and background scroll easing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollTuning {
    pub transition_duration: f32,
    pub easing_power: f32,
    /// Background speed as a fraction of rail speed
    pub background_ratio: f32,
}

impl Default for ScrollTuning {
    fn default() -> Self {
        Self {
            transition_duration: 1.5,
            easing_power: 2.0,
            background_ratio: 0.4,
        }
    }
}

/// Coaster geometry and hide spot placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoasterLayout {
    pub cart_count: usize,
    pub seats_per_cart: usize,
    /// X of the front cart; the rest trail behind it
    pub front_cart_x: f32,
    pub rail_y: f32,
    pub cart_spacing: f32,
    pub seat_spacing: f32,
    pub hide_spot_center: Vec2,
    pub hide_spot_offscreen_left: Vec2,
    pub hide_spot_offscreen_right: Vec2,
    /// Hide spot glide back to center after a ride
    pub hide_spot_return_duration: f32,
}

impl Default for CoasterLayout {
    fn default() -> Self {
        Self {
            cart_count: 5,
            seats_per_cart: 2,
            front_cart_x: 5.0,
            rail_y: 0.0,
            cart_spacing: 2.5,
            seat_spacing: 0.8,
            hide_spot_center: Vec2::new(0.0, 3.0),
            hide_spot_offscreen_left: Vec2::new(-25.0, 3.0),
            hide_spot_offscreen_right: Vec2::new(25.0, 3.0),
            hide_spot_return_duration: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }
}

/// Complete game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run seed for reproducibility
    pub seed: u64,
    pub round: RoundTuning,
    pub human: HumanTuning,
    pub zombie: ZombieTuning,
    pub hunger: HungerTuning,
    pub scroll: ScrollTuning,
    pub coaster: CoasterLayout,
    pub audio: AudioSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            round: RoundTuning::default(),
            human: HumanTuning::default(),
            zombie: ZombieTuning::default(),
            hunger: HungerTuning::default(),
            scroll: ScrollTuning::default(),
            coaster: CoasterLayout::default(),
            audio: AudioSettings::default(),
        }
    }
}

impl Settings {
    /// Default settings with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Number of seats humans may board (every cart but the rear one)
    pub fn passenger_capacity(&self) -> usize {
        self.coaster.cart_count.saturating_sub(1) * self.coaster.seats_per_cart
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("{err}; using default settings");
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::with_seed(42);
        settings.round.humans_per_round = 4;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "round": { "restart_delay": 1.0 } }"#).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.round.restart_delay, 1.0);
        assert_eq!(loaded.round.humans_per_round, 8);
        assert_eq!(loaded.human, HumanTuning::default());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn test_bad_json_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse(_))));
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }

    #[test]
    fn test_passenger_capacity_excludes_rear_cart() {
        let settings = Settings::default();
        assert_eq!(settings.passenger_capacity(), 8);
    }
}
