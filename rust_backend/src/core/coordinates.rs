//! Survey (ra, dec, distance) to Cartesian comoving coordinates.
//!
//! Conversions follow the Pan et al. void catalog conventions: `x` points to
//! (ra, dec) = (0°, 0°), `z` to the celestial north pole, distances in Mpc/h.

use qtty::{Degrees, Quantity, Radian, Radians};
use serde::{Deserialize, Serialize};

/// Speed of light used by the Hubble-law distance, in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 3e5;

/// Cartesian comoving position in Mpc/h.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Unit in which a catalog stores its angular columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Degrees,
    Radians,
}

impl AngleUnit {
    /// Resolves an astropy unit string; anything that is not a radian spelling
    /// is treated as degrees.
    pub fn from_unit_str(unit: &str) -> Self {
        match unit.trim().to_lowercase().as_str() {
            "rad" | "radian" | "radians" => AngleUnit::Radians,
            _ => AngleUnit::Degrees,
        }
    }

    pub fn to_radians(self, value: f64) -> Radians {
        match self {
            AngleUnit::Degrees => Degrees::new(value).to::<Radian>(),
            AngleUnit::Radians => Radians::new(value),
        }
    }
}

/// Projects a point at distance `r` towards (`ra`, `dec`) onto Cartesian axes.
///
/// # Examples
///
/// ```
/// use qtty::Degrees;
/// use vast_rust::core::coordinates::spherical_to_cartesian;
///
/// let p = spherical_to_cartesian(100.0, Degrees::new(90.0), Degrees::new(0.0));
/// assert!(p.x.abs() < 1e-9);
/// assert!((p.y - 100.0).abs() < 1e-9);
/// assert!(p.z.abs() < 1e-9);
/// ```
pub fn spherical_to_cartesian<U>(r: f64, ra: Quantity<U>, dec: Quantity<U>) -> CartesianPosition
where
    U: qtty::AngularUnit + Copy,
{
    let (sin_ra, cos_ra) = ra.sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();
    CartesianPosition {
        x: r * cos_dec * cos_ra,
        y: r * cos_dec * sin_ra,
        z: r * sin_dec,
    }
}

/// Hubble-law distance `c z / H` with `H = 100 h` km/s/Mpc.
pub fn hubble_distance(redshift: f64, speed_of_light: f64, h: f64) -> f64 {
    speed_of_light * redshift / (100.0 * h)
}

/// Converts parallel ra/dec/distance columns to Cartesian positions.
pub fn positions_from_columns(
    ra: &[f64],
    dec: &[f64],
    r: &[f64],
    unit: AngleUnit,
) -> Vec<CartesianPosition> {
    ra.iter()
        .zip(dec)
        .zip(r)
        .map(|((&ra, &dec), &r)| {
            spherical_to_cartesian(r, unit.to_radians(ra), unit.to_radians(dec))
        })
        .collect()
}
