use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Transformation model the registration estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransformKind {
    #[serde(rename = "Translation")]
    Translation,
    #[default]
    #[serde(rename = "Rigid body")]
    RigidBody,
    #[serde(rename = "Scaled rotation")]
    ScaledRotation,
    #[serde(rename = "Affine")]
    Affine,
    #[serde(rename = "Bilinear")]
    Bilinear,
}

impl TransformKind {
    pub const ALL: [TransformKind; 5] = [
        TransformKind::Translation,
        TransformKind::RigidBody,
        TransformKind::ScaledRotation,
        TransformKind::Affine,
        TransformKind::Bilinear,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Translation => "Translation",
            Self::RigidBody => "Rigid body",
            Self::ScaledRotation => "Scaled rotation",
            Self::Affine => "Affine",
            Self::Bilinear => "Bilinear",
        }
    }

    pub fn all_display_names() -> [&'static str; 5] {
        Self::ALL.map(Self::display_name)
    }

    /// Number of landmarks that pin down the model.
    pub fn point_count(self) -> usize {
        match self {
            Self::Translation => 1,
            Self::ScaledRotation => 2,
            Self::RigidBody | Self::Affine => 3,
            Self::Bilinear => 4,
        }
    }

    /// Every model except bilinear shares the gradient-based pipeline.
    pub fn is_affine_family(self) -> bool {
        !matches!(self, Self::Bilinear)
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for TransformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.display_name() == s)
            .ok_or_else(|| Error::UnknownTransform(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::TransformKind;
    use crate::Error;

    #[test]
    fn names_parse_back() {
        for kind in TransformKind::ALL {
            assert_eq!(kind.to_string().parse::<TransformKind>(), Ok(kind));
        }
        assert_eq!(
            "rigid body".parse::<TransformKind>(),
            Err(Error::UnknownTransform("rigid body".into()))
        );
    }

    #[test]
    fn point_counts_follow_model() {
        let counts: Vec<usize> = TransformKind::ALL.iter().map(|k| k.point_count()).collect();
        assert_eq!(counts, vec![1, 3, 2, 3, 4]);
        assert_eq!(TransformKind::default(), TransformKind::RigidBody);
        assert!(!TransformKind::Bilinear.is_affine_family());
        assert!(TransformKind::Translation.is_affine_family());
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&TransformKind::ScaledRotation).unwrap();
        assert_eq!(json, "\"Scaled rotation\"");
        let back: TransformKind = serde_json::from_str("\"Affine\"").unwrap();
        assert_eq!(back, TransformKind::Affine);
    }
}
