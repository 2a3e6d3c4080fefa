//! Field identifiers carried by sample frames

/// Measurement kind named by a field identifier (FID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldKind {
    /// Probe sync header
    Sync,
    /// Inclination (degrees)
    Inclination,
    /// Azimuth (degrees)
    Azimuth,
    /// Toolface of unspecified reference
    Toolface,
    /// Gravity-referenced toolface
    GravityToolface,
    /// Magnetic-referenced toolface
    MagneticToolface,
    /// Identifier outside the known set
    #[default]
    Unknown,
}

// Wire format values
const FID_SYNC: u8 = 0x00;
const FID_INCLINATION: u8 = 0x10;
const FID_AZIMUTH: u8 = 0x11;
const FID_TOOLFACE: u8 = 0x12;
const FID_GRAVITY_TOOLFACE: u8 = 0x13;
const FID_MAGNETIC_TOOLFACE: u8 = 0x14;

/// Classify a field identifier
///
/// Total over `u8`; the identifier is authoritative and labels carried in
/// the payload never change the result.
pub fn resolve(field_id: u8) -> FieldKind {
    FieldKind::resolve(field_id)
}

impl FieldKind {
    /// Classify a field identifier
    pub fn resolve(field_id: u8) -> Self {
        match field_id {
            FID_SYNC => FieldKind::Sync,
            FID_INCLINATION => FieldKind::Inclination,
            FID_AZIMUTH => FieldKind::Azimuth,
            FID_TOOLFACE => FieldKind::Toolface,
            FID_GRAVITY_TOOLFACE => FieldKind::GravityToolface,
            FID_MAGNETIC_TOOLFACE => FieldKind::MagneticToolface,
            _ => FieldKind::Unknown,
        }
    }

    /// Wire identifier, if the kind has one
    pub fn field_id(self) -> Option<u8> {
        match self {
            FieldKind::Sync => Some(FID_SYNC),
            FieldKind::Inclination => Some(FID_INCLINATION),
            FieldKind::Azimuth => Some(FID_AZIMUTH),
            FieldKind::Toolface => Some(FID_TOOLFACE),
            FieldKind::GravityToolface => Some(FID_GRAVITY_TOOLFACE),
            FieldKind::MagneticToolface => Some(FID_MAGNETIC_TOOLFACE),
            FieldKind::Unknown => None,
        }
    }

    /// Returns true for any toolface variant
    pub fn is_toolface(&self) -> bool {
        matches!(
            self,
            FieldKind::Toolface | FieldKind::GravityToolface | FieldKind::MagneticToolface
        )
    }

    /// Decode-log rows for the sync header are highlighted
    pub fn highlight(&self) -> bool {
        matches!(self, FieldKind::Sync)
    }

    /// Short display name; `None` when the sample label should be shown
    pub fn display_name(&self) -> Option<&'static str> {
        match self {
            FieldKind::Sync => Some("Sync"),
            FieldKind::Inclination => Some("Inc"),
            FieldKind::Azimuth => Some("Azi"),
            FieldKind::Toolface => Some("TF"),
            FieldKind::GravityToolface => Some("GTF"),
            FieldKind::MagneticToolface => Some("MTF"),
            FieldKind::Unknown => None,
        }
    }
}
