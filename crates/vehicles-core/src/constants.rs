/// Largest valid arena dimension (world units). Keeps the spatial index well conditioned.
pub const MAX_ARENA_SIZE: f64 = 100_000.0;

/// Prime multiplier used to derive per-population RNG streams from a base seed.
pub const RNG_DERIVATION_PRIME: u64 = 7919;

/// Brightness given to vehicles whose species does not override it.
pub const DEFAULT_VEHICLE_BRIGHTNESS: f64 = 0.8;

/// Case-insensitive marker for an INPUT neurode that always fires.
pub const BIAS_MARKER: &str = "bias";

/// Case-insensitive markers identifying the two motor OUTPUT neurodes.
pub const MOTOR_MARKER: &str = "motor";
pub const LEFT_MARKER: &str = "left";
pub const RIGHT_MARKER: &str = "right";
