use crate::physics::CollisionBehavior;
use serde::{Deserialize, Serialize};

/// Rectangular arena with independent per-axis wrapping.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    /// Extent along x in world units.
    pub width: f64,
    /// Extent along y in world units.
    pub height: f64,
    /// Leaving through the east/west edge re-enters on the opposite side.
    pub wrap_east_west: bool,
    /// Leaving through the north/south edge re-enters on the opposite side.
    pub wrap_north_south: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            wrap_east_west: true,
            wrap_north_south: true,
        }
    }
}

impl ArenaConfig {
    pub fn contains(&self, position: [f64; 2]) -> bool {
        (0.0..self.width).contains(&position[0]) && (0.0..self.height).contains(&position[1])
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for scenario scattering.
    pub seed: u64,
    pub arena: ArenaConfig,
    /// Simulated seconds advanced per tick.
    pub delta_time: f64,
    /// Pacing hint for hosts that run ticks in real time. The kernel never sleeps.
    pub ticks_per_second: u32,
    /// Collision handling, resolved per vehicle color.
    pub collision: CollisionBehavior,
    /// Upper bound on live vehicles.
    pub max_vehicles: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            arena: ArenaConfig::default(),
            delta_time: 0.1,
            ticks_per_second: 30,
            collision: CollisionBehavior::default(),
            max_vehicles: 10_000,
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidArenaWidth => "arena.width must be positive and finite";
    InvalidArenaHeight => "arena.height must be positive and finite";
    ArenaTooLarge { max: f64, actual: f64 } => "arena dimension ({actual}) exceeds supported maximum ({max})";
    InvalidDeltaTime => "delta_time must be positive and finite";
    InvalidTicksPerSecond => "ticks_per_second must be greater than 0";
    InvalidMaxVehicles => "max_vehicles must be greater than 0";
    TooManyVehicles { max: usize, actual: usize } => "max_vehicles ({actual}) exceeds supported maximum ({max})";
    EmptyCollisionColor => "collision color overrides must name a color";
}

impl std::error::Error for SimConfigError {}

impl SimConfig {
    pub const MAX_ARENA_SIZE: f64 = crate::constants::MAX_ARENA_SIZE;

    pub const MAX_TOTAL_VEHICLES: usize = 250_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_arena()?;
        self.validate_timing()?;
        self.validate_population()?;
        self.validate_collision()?;
        Ok(())
    }

    fn validate_arena(&self) -> Result<(), SimConfigError> {
        let ArenaConfig { width, height, .. } = self.arena;
        if !(width.is_finite() && width > 0.0) {
            return Err(SimConfigError::InvalidArenaWidth);
        }
        if !(height.is_finite() && height > 0.0) {
            return Err(SimConfigError::InvalidArenaHeight);
        }
        let largest = width.max(height);
        if largest > Self::MAX_ARENA_SIZE {
            return Err(SimConfigError::ArenaTooLarge {
                max: Self::MAX_ARENA_SIZE,
                actual: largest,
            });
        }
        Ok(())
    }

    fn validate_timing(&self) -> Result<(), SimConfigError> {
        if !(self.delta_time.is_finite() && self.delta_time > 0.0) {
            return Err(SimConfigError::InvalidDeltaTime);
        }
        if self.ticks_per_second == 0 {
            return Err(SimConfigError::InvalidTicksPerSecond);
        }
        Ok(())
    }

    fn validate_population(&self) -> Result<(), SimConfigError> {
        if self.max_vehicles == 0 {
            return Err(SimConfigError::InvalidMaxVehicles);
        }
        if self.max_vehicles > Self::MAX_TOTAL_VEHICLES {
            return Err(SimConfigError::TooManyVehicles {
                max: Self::MAX_TOTAL_VEHICLES,
                actual: self.max_vehicles,
            });
        }
        Ok(())
    }

    fn validate_collision(&self) -> Result<(), SimConfigError> {
        if self.collision.color_overrides.keys().any(|c| c.is_empty()) {
            return Err(SimConfigError::EmptyCollisionColor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::CollisionMode;

    #[test]
    fn validate_accepts_default() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_follow_the_classic_settings() {
        let config = SimConfig::default();
        assert_eq!(config.delta_time, 0.1);
        assert_eq!(config.ticks_per_second, 30);
        assert_eq!(config.collision.default_mode, CollisionMode::Bounce);
    }

    #[test]
    fn validate_rejects_invalid_arena() {
        let config = SimConfig {
            arena: ArenaConfig {
                width: 0.0,
                ..ArenaConfig::default()
            },
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidArenaWidth));

        let config = SimConfig {
            arena: ArenaConfig {
                height: f64::INFINITY,
                ..ArenaConfig::default()
            },
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidArenaHeight));

        let config = SimConfig {
            arena: ArenaConfig {
                width: SimConfig::MAX_ARENA_SIZE + 1.0,
                ..ArenaConfig::default()
            },
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::ArenaTooLarge { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_timing() {
        let config = SimConfig {
            delta_time: -0.1,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidDeltaTime));

        let config = SimConfig {
            ticks_per_second: 0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidTicksPerSecond));
    }

    #[test]
    fn validate_rejects_population_limits() {
        let config = SimConfig {
            max_vehicles: 0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidMaxVehicles));

        let config = SimConfig {
            max_vehicles: SimConfig::MAX_TOTAL_VEHICLES + 1,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::TooManyVehicles { .. })
        ));
    }

    #[test]
    fn error_messages_name_the_field() {
        let message = SimConfigError::TooManyVehicles {
            max: 10,
            actual: 11,
        }
        .to_string();
        assert_eq!(message, "max_vehicles (11) exceeds supported maximum (10)");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SimConfig = serde_json::from_str(
            r#"{"arena": {"width": 300.0, "wrap_north_south": false},
                "collision": {"default_mode": "BREAK", "color_overrides": {"white": "NONE"}}}"#,
        )
        .expect("parses");
        assert_eq!(config.arena.width, 300.0);
        assert_eq!(config.arena.height, 600.0);
        assert!(config.arena.wrap_east_west);
        assert!(!config.arena.wrap_north_south);
        assert_eq!(config.collision.resolve("white"), CollisionMode::None);
        assert_eq!(config.collision.resolve("blue"), CollisionMode::Break);
        assert_eq!(config.delta_time, 0.1);

        let json = serde_json::to_string(&config).expect("serialize");
        let back: SimConfig = serde_json::from_str(&json).expect("roundtrip");
        assert_eq!(back, config);
    }
}
