//! Persisted form of a scene's transforms.

use serde::{Deserialize, Serialize};

use crate::affine::TransformComponents;
use crate::error::{SceneError, SceneResult};

/// Decomposed transforms of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneTransforms {
    /// Bone components; identity by default.
    pub bone: TransformComponents,
    /// Prosthesis components, absent when no prosthesis was attached.
    pub prosthesis: Option<TransformComponents>,
}

/// One flat row per plan: nine bone values, always set, and nine prosthesis
/// values that are either all set or all null.
///
/// Field order within each group is translation x/y/z, rotation x/y/z in
/// degrees, scale x/y/z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Bone translation, rotation and scale.
    pub bone: [f64; 9],
    /// Prosthesis translation, rotation and scale; `None` entries are null
    /// columns.
    pub prosthesis: [Option<f64>; 9],
}

impl Default for SceneRecord {
    fn default() -> Self {
        Self::from(&SceneTransforms::default())
    }
}

impl From<&SceneTransforms> for SceneRecord {
    fn from(transforms: &SceneTransforms) -> Self {
        let prosthesis = transforms
            .prosthesis
            .map_or([None; 9], |c| c.to_array().map(Some));
        Self {
            bone: transforms.bone.to_array(),
            prosthesis,
        }
    }
}

impl TryFrom<&SceneRecord> for SceneTransforms {
    type Error = SceneError;

    fn try_from(record: &SceneRecord) -> SceneResult<Self> {
        let present = record.prosthesis.iter().filter(|v| v.is_some()).count();
        let prosthesis = match present {
            0 => None,
            9 => Some(TransformComponents::from_array(
                record.prosthesis.map(|v| v.unwrap_or_default()),
            )),
            _ => return Err(SceneError::PartialProsthesisRecord { present }),
        };
        Ok(Self {
            bone: TransformComponents::from_array(record.bone),
            prosthesis,
        })
    }
}

impl SceneRecord {
    /// Whether prosthesis values are stored.
    #[must_use]
    pub fn has_prosthesis(&self) -> bool {
        self.prosthesis.iter().any(Option::is_some)
    }

    /// Validates and converts to decomposed transforms.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::PartialProsthesisRecord`] when only some of the
    /// prosthesis fields are set.
    pub fn transforms(&self) -> SceneResult<SceneTransforms> {
        SceneTransforms::try_from(self)
    }
}
