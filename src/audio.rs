//! Audio cue sink
//!
//! Gameplay code triggers sounds by name and only ever asks whether a cue is
//! currently playing. `AudioManager` is a headless implementation that tracks
//! cue lifetimes so membership checks behave as they would with real playback.

use std::collections::{BTreeMap, BTreeSet};

/// Anything that can play named sound cues
pub trait AudioSink {
    /// Start a cue (fire-and-forget)
    fn play(&mut self, name: &str);
    /// Stop every instance of a cue
    fn stop(&mut self, name: &str);
    /// Whether any instance of the cue is still playing
    fn is_playing(&self, name: &str) -> bool;
    /// Advance playback clocks
    fn update(&mut self, _dt: f32) {}
}

/// Sound cues used by the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    ManScream,
    WomanScream,
    ManJump,
    WomanJump,
    /// Zombie bites a vulnerable human
    Eat,
    /// Zombie lunges at a defensive human and misses
    EatAttempt,
}

impl SoundCue {
    pub const ALL: [SoundCue; 6] = [
        SoundCue::ManScream,
        SoundCue::WomanScream,
        SoundCue::ManJump,
        SoundCue::WomanJump,
        SoundCue::Eat,
        SoundCue::EatAttempt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SoundCue::ManScream => "Man Scream",
            SoundCue::WomanScream => "Woman Scream",
            SoundCue::ManJump => "Man Jump",
            SoundCue::WomanJump => "Woman Jump",
            SoundCue::Eat => "Eat",
            SoundCue::EatAttempt => "Eat Attempt",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cue| cue.name() == name)
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f32 {
        match self {
            SoundCue::ManScream | SoundCue::WomanScream => 1.8,
            SoundCue::ManJump | SoundCue::WomanJump => 0.6,
            SoundCue::Eat => 1.2,
            SoundCue::EatAttempt => 0.7,
        }
    }

    /// Whether several instances may overlap
    pub fn repetitive(&self) -> bool {
        !matches!(self, SoundCue::Eat | SoundCue::EatAttempt)
    }
}

/// Maximum simultaneous instances of one cue
pub const MAX_INSTANCES_PER_CUE: usize = 5;

/// Headless audio manager
#[derive(Debug, Clone)]
pub struct AudioManager {
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
    /// Remaining play time of each live instance, by cue name
    playing: BTreeMap<&'static str, Vec<f32>>,
    /// Total times each cue was started
    play_counts: BTreeMap<&'static str, u32>,
    /// Unknown names already reported
    warned: BTreeSet<String>,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            playing: BTreeMap::new(),
            play_counts: BTreeMap::new(),
            warned: BTreeSet::new(),
        }
    }

    pub fn from_settings(settings: &crate::settings::AudioSettings) -> Self {
        let mut audio = Self::new();
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);
        audio.set_muted(settings.muted);
        audio
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Names of cues with at least one live instance
    pub fn playing_sound_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.playing
            .iter()
            .filter(|(_, instances)| !instances.is_empty())
            .map(|(name, _)| *name)
    }

    /// How many times a cue has been started
    pub fn play_count(&self, cue: SoundCue) -> u32 {
        self.play_counts.get(cue.name()).copied().unwrap_or(0)
    }
}

impl AudioSink for AudioManager {
    fn play(&mut self, name: &str) {
        let Some(cue) = SoundCue::from_name(name) else {
            if self.warned.insert(name.to_string()) {
                log::warn!("Sound '{name}' not found");
            }
            return;
        };
        if self.effective_volume() <= 0.0 {
            return;
        }

        let instances = self.playing.entry(cue.name()).or_default();
        if !cue.repetitive() && !instances.is_empty() {
            return;
        }
        if instances.len() >= MAX_INSTANCES_PER_CUE {
            // Steal the oldest instance
            instances.remove(0);
        }
        instances.push(cue.duration());
        *self.play_counts.entry(cue.name()).or_default() += 1;
        log::debug!("Playing '{}'", cue.name());
    }

    fn stop(&mut self, name: &str) {
        if let Some(instances) = self.playing.get_mut(name) {
            instances.clear();
        }
    }

    fn is_playing(&self, name: &str) -> bool {
        self.playing
            .get(name)
            .is_some_and(|instances| !instances.is_empty())
    }

    fn update(&mut self, dt: f32) {
        for instances in self.playing.values_mut() {
            for remaining in instances.iter_mut() {
                *remaining -= dt;
            }
            instances.retain(|remaining| *remaining > 0.0);
        }
    }
}

/// Restart `cue` from the beginning after silencing any conflicting cues
pub fn restart_cue(sink: &mut dyn AudioSink, cue: SoundCue, silence: &[SoundCue]) {
    for other in silence.iter().chain(std::iter::once(&cue)) {
        if sink.is_playing(other.name()) {
            sink.stop(other.name());
        }
    }
    sink.play(cue.name());
}
