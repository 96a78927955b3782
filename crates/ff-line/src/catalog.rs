//! Product catalog — defect pool and product type definitions

use serde::{Deserialize, Serialize};

use ff_core::{ConfigError, DefectId, ProductTypeId};

/// An atomic fault a product may carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    pub id: DefectId,
    /// Short name shown on the fix button
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Defect {
    pub fn new(id: u32, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: DefectId::new(id),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A product type that can be spawned on a lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: ProductTypeId,
    pub name: String,
    /// Defects this type can roll
    pub defects: Vec<DefectId>,
}

impl ProductType {
    pub fn new(id: u32, name: impl Into<String>, defects: &[u32]) -> Self {
        Self {
            id: ProductTypeId::new(id),
            name: name.into(),
            defects: defects.iter().copied().map(DefectId::new).collect(),
        }
    }
}

/// All defects and product types available to a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub defects: Vec<Defect>,
    pub products: Vec<ProductType>,
}

impl ProductCatalog {
    /// Built-in catalog: three appliances sharing a pool of eight faults
    pub fn standard() -> Self {
        let defects = vec![
            Defect::new(1, "Loose Screw", "A housing screw is not torqued"),
            Defect::new(2, "Cracked Casing", "Hairline crack in the shell"),
            Defect::new(3, "Bent Pin", "Connector pin out of alignment"),
            Defect::new(4, "Missing Label", "Serial label not applied"),
            Defect::new(5, "Scratched Panel", "Cosmetic scratch on the front"),
            Defect::new(6, "Frayed Cable", "Insulation damage on the lead"),
            Defect::new(7, "Misaligned Lid", "Lid does not sit flush"),
            Defect::new(8, "Dead Pixel", "Display has a stuck pixel"),
        ];

        let products = vec![
            ProductType::new(1, "Toaster", &[1, 2, 4, 5, 6, 7]),
            ProductType::new(2, "Radio", &[1, 3, 4, 5, 6, 8]),
            ProductType::new(3, "Console", &[2, 3, 4, 6, 7, 8]),
        ];

        Self { defects, products }
    }

    pub fn defect(&self, id: DefectId) -> Option<&Defect> {
        self.defects.iter().find(|d| d.id == id)
    }

    pub fn product_type(&self, id: ProductTypeId) -> Option<&ProductType> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Defect names for a product type, in catalog order
    pub fn defect_names(&self, id: ProductTypeId) -> Vec<&str> {
        self.product_type(id)
            .map(|ty| {
                ty.defects
                    .iter()
                    .filter_map(|d| self.defect(*d).map(|d| d.name.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every product type must reference known defects
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.products.is_empty() {
            return Err(ConfigError::EmptyProductPool);
        }
        for ty in &self.products {
            if let Some(defect) = ty.defects.iter().find(|d| self.defect(**d).is_none()) {
                return Err(ConfigError::UnknownDefect {
                    product: ty.id,
                    defect: *defect,
                });
            }
        }
        Ok(())
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog() {
        let catalog = ProductCatalog::standard();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.products.len(), 3);
        assert_eq!(catalog.defect_names(ProductTypeId::new(1)).len(), 6);
        assert!(catalog.defect(DefectId::new(8)).is_some());
    }

    #[test]
    fn test_unknown_defect_rejected() {
        let mut catalog = ProductCatalog::standard();
        catalog.products.push(ProductType::new(9, "Broken", &[1, 99]));
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::UnknownDefect { .. })
        ));
    }

    #[test]
    fn test_empty_pool_rejected() {
        let catalog = ProductCatalog {
            defects: Vec::new(),
            products: Vec::new(),
        };
        assert!(matches!(catalog.validate(), Err(ConfigError::EmptyProductPool)));
    }
}
