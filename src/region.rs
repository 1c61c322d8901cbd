//! Region catalog: the fixed, ordered pickup regions.
//!
//! Index 0 is the region nearest the venue. Several residential halls share
//! one pickup point, so the catalog also resolves hall aliases.

use std::collections::HashMap;

use crate::error::AllocationError;

/// Deployed pickup regions, nearest the venue first.
const DEPLOYED_REGIONS: &[(&str, &str)] = &[
    ("RK", "RK + RP Halls"),
    ("VS", "GKH + VS Halls"),
    ("MS", "MS Hall"),
    ("HJB", "HJB + JCB Halls"),
    ("LLR", "LLR Hall"),
    ("LBS", "LBS + MMM Halls"),
    ("PAN", "PAN loop"),
];

/// Halls that board at another hall's pickup point.
const DEPLOYED_ALIASES: &[(&str, &str)] = &[
    ("RP", "RK"),
    ("GKH", "VS"),
    ("JCB", "HJB"),
    ("MMM", "LBS"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub index: usize,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct RegionCatalog {
    regions: Vec<Region>,
    lookup: HashMap<String, usize>,
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::deployed()
    }
}

impl RegionCatalog {
    /// Builds a catalog from `(code, description)` pairs in venue-proximity order.
    pub fn new<I, C, D>(regions: I) -> Result<Self, AllocationError>
    where
        I: IntoIterator<Item = (C, D)>,
        C: Into<String>,
        D: Into<String>,
    {
        let mut catalog = Self {
            regions: Vec::new(),
            lookup: HashMap::new(),
        };

        for (code, description) in regions {
            let code = code.into().trim().to_string();
            if code.is_empty() {
                return Err(AllocationError::InvalidInput(
                    "region code must not be empty".to_string(),
                ));
            }
            let index = catalog.regions.len();
            if catalog.lookup.insert(code.clone(), index).is_some() {
                return Err(AllocationError::InvalidInput(format!(
                    "duplicate region code '{}'",
                    code
                )));
            }
            catalog.regions.push(Region {
                index,
                code,
                description: description.into(),
            });
        }

        if catalog.regions.is_empty() {
            return Err(AllocationError::InvalidInput(
                "region catalog must contain at least one region".to_string(),
            ));
        }

        Ok(catalog)
    }

    /// The seven deployed regions with their hall aliases.
    pub fn deployed() -> Self {
        let mut catalog = Self {
            regions: Vec::with_capacity(DEPLOYED_REGIONS.len()),
            lookup: HashMap::new(),
        };
        for (index, (code, description)) in DEPLOYED_REGIONS.iter().enumerate() {
            catalog.lookup.insert(code.to_string(), index);
            catalog.regions.push(Region {
                index,
                code: code.to_string(),
                description: description.to_string(),
            });
        }
        for (alias, code) in DEPLOYED_ALIASES {
            if let Some(&index) = catalog.lookup.get(*code) {
                catalog.lookup.insert(alias.to_string(), index);
            }
        }
        catalog
    }

    /// Registers `alias` as another name for the region coded `code`.
    pub fn with_alias(mut self, alias: &str, code: &str) -> Result<Self, AllocationError> {
        let alias = alias.trim();
        if self.lookup.contains_key(alias) {
            return Err(AllocationError::InvalidInput(format!(
                "identifier '{}' is already registered",
                alias
            )));
        }
        let index = self.index_of(code)?;
        self.lookup.insert(alias.to_string(), index);
        Ok(self)
    }

    /// Resolves a region code or hall alias to its canonical index.
    pub fn index_of(&self, identifier: &str) -> Result<usize, AllocationError> {
        let key = identifier.trim();
        self.lookup
            .get(key)
            .copied()
            .ok_or_else(|| AllocationError::UnknownRegion(key.to_string()))
    }

    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    pub fn code(&self, index: usize) -> Option<&str> {
        self.regions.get(index).map(|region| region.code.as_str())
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
