//! Filtering of noisy exception families.

use crate::config::NoiseConfig;
use crate::semantic::{SemanticModel, TypeId};

/// Drops exception types that belong to a filtered family.
pub struct NoiseFilter {
    roots: Vec<TypeId>,
}

impl NoiseFilter {
    pub fn new(model: &SemanticModel, config: &NoiseConfig) -> Self {
        let roots = config
            .filtered_roots()
            .into_iter()
            .filter_map(|name| model.lookup(name))
            .collect();
        Self { roots }
    }

    pub fn is_noise(&self, model: &SemanticModel, ty: TypeId) -> bool {
        model.is_covered(ty, &self.roots)
    }

    /// Keep only the items whose exception type is not noise.
    pub fn filter<T, F>(&self, model: &SemanticModel, items: Vec<T>, ty_of: F) -> Vec<T>
    where
        F: Fn(&T) -> TypeId,
    {
        items
            .into_iter()
            .filter(|item| !self.is_noise(model, ty_of(item)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_families_and_subtypes() {
        let model = SemanticModel::build(&[]);
        let filter = NoiseFilter::new(&model, &NoiseConfig::default());
        let ty = |n: &str| model.lookup(n).unwrap();

        assert!(filter.is_noise(&model, ty("System.ArgumentNullException")));
        assert!(filter.is_noise(&model, ty("System.UriFormatException")));
        assert!(filter.is_noise(&model, ty("System.OverflowException")));
        assert!(filter.is_noise(&model, ty("System.PlatformNotSupportedException")));
        assert!(!filter.is_noise(&model, ty("System.ArithmeticException")));
        assert!(!filter.is_noise(&model, ty("System.Exception")));
        assert!(!filter.is_noise(&model, ty("System.IO.IOException")));
    }

    #[test]
    fn test_enabled_family_is_reported() {
        let model = SemanticModel::build(&[]);
        let config = NoiseConfig {
            argument: true,
            ..Default::default()
        };
        let filter = NoiseFilter::new(&model, &config);
        let items = vec![
            model.lookup("System.ArgumentException").unwrap(),
            model.lookup("System.FormatException").unwrap(),
        ];
        let kept = filter.filter(&model, items, |t| *t);
        assert_eq!(kept.len(), 1);
        assert_eq!(model.ty(kept[0]).name, "ArgumentException");
    }
}
