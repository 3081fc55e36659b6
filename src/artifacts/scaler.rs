//! Feature transforms

use serde::{Deserialize, Serialize};

use super::FeatureTransform;
use crate::error::ArtifactError;
use crate::features::FeatureVector;

/// Standardization fitted at training time: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl FeatureTransform for StandardScaler {
    fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>, ArtifactError> {
        let values = features.as_slice();
        for fitted in [self.mean.len(), self.scale.len()] {
            if fitted != values.len() {
                return Err(ArtifactError::ShapeMismatch {
                    expected: fitted,
                    actual: values.len(),
                });
            }
        }

        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // constant features were fit with zero variance
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

/// Pass-through transform for scorers trained on raw features
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl FeatureTransform for IdentityTransform {
    fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>, ArtifactError> {
        Ok(features.as_slice().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;

    #[test]
    fn test_standard_scaler() {
        let scaler = StandardScaler {
            mean: vec![1.0; FEATURE_COUNT],
            scale: vec![2.0; FEATURE_COUNT],
        };
        let features = FeatureVector::new([5.0; FEATURE_COUNT]);

        let transformed = scaler.transform(&features).unwrap();
        assert_eq!(transformed, vec![2.0; FEATURE_COUNT]);
    }

    #[test]
    fn test_zero_scale_is_treated_as_one() {
        let mut scale = vec![1.0; FEATURE_COUNT];
        scale[3] = 0.0;
        let scaler = StandardScaler {
            mean: vec![0.0; FEATURE_COUNT],
            scale,
        };

        let transformed = scaler.transform(&FeatureVector::new([3.0; FEATURE_COUNT])).unwrap();
        assert_eq!(transformed[3], 3.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let scaler = StandardScaler {
            mean: vec![0.0; 3],
            scale: vec![1.0; 3],
        };

        let result = scaler.transform(&FeatureVector::new([0.0; FEATURE_COUNT]));
        assert!(matches!(
            result,
            Err(ArtifactError::ShapeMismatch { expected: 3, actual: FEATURE_COUNT })
        ));
    }

    #[test]
    fn test_identity_transform() {
        let features = FeatureVector::new([7.0; FEATURE_COUNT]);
        assert_eq!(IdentityTransform.transform(&features).unwrap(), vec![7.0; FEATURE_COUNT]);
    }
}
