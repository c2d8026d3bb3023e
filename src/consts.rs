use crate::Float;
use serde::Deserialize;

/// Physical constants used by the kick. Carried by value into every
/// `ElectronLens` instead of living as globals, so a test can swap them out.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PhysConsts {
    /// Speed of light [m/s]
    pub c_light: Float,
    /// Elementary charge [C]
    pub qelem: Float,
    /// Vacuum permittivity [F/m]
    pub epsilon_0: Float,
    /// Electron rest energy [eV]
    pub emass: Float,
}

impl Default for PhysConsts {
    fn default() -> PhysConsts {
        PhysConsts {
            c_light: 299792458.0,
            qelem: 1.60217662e-19,
            epsilon_0: 8.854187817620e-12,
            emass: 510998.928,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let consts: PhysConsts = toml::from_str("emass = 511000.0").unwrap();
        assert_eq!(consts.emass, 511000.0);
        assert_eq!(consts.c_light, PhysConsts::default().c_light);
        assert_eq!(consts.qelem, PhysConsts::default().qelem);
    }
}
