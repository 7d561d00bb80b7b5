//! # Asset Discovery Module
//!
//! Questo modulo costruisce le liste di asset da ottimizzare.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di asset in una directory del sito (`walkdir`)
//! - Classificazione per estensione (immagine, stylesheet, script)
//! - Liste di riferimento quando nessuna directory è indicata
//!
//! ## Formati riconosciuti:
//! - **Immagini**: JPG, JPEG, PNG, WebP, SVG
//! - **Stylesheet**: CSS
//! - **Script**: JS, MJS
//!
//! Gli id degli asset sono path relativi alla directory del sito, ordinati.

use crate::{error::OptimizeError, job::AssetKind};
use std::path::Path;
use walkdir::WalkDir;

/// Assets of a site, grouped by optimization phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCatalog {
    pub images: Vec<String>,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
    /// Resources to pre-generate cache entries for
    pub critical_resources: Vec<String>,
}

impl AssetCatalog {
    /// The reference studio site
    pub fn reference() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            images: owned(&[
                "hero-bg.jpg",
                "portfolio-1.jpg",
                "portfolio-2.jpg",
                "mayu-avatar.png",
                "jack-avatar.png",
            ]),
            stylesheets: owned(&["styles.css"]),
            scripts: owned(&["script.js"]),
            critical_resources: owned(&["styles.css", "script.js", "hero-background.jpg", "logo.svg"]),
        }
    }

    /// Walk `site_dir` and classify every recognised asset
    pub fn discover(site_dir: &Path) -> Result<Self, OptimizeError> {
        if !site_dir.is_dir() {
            return Err(OptimizeError::Validation(format!(
                "Site directory does not exist: {}",
                site_dir.display()
            )));
        }

        let mut catalog = Self::default();

        for entry in WalkDir::new(site_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(kind) = Self::classify(path) else {
                continue;
            };
            let asset_id = path
                .strip_prefix(site_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            match kind {
                AssetKind::Image => catalog.images.push(asset_id),
                AssetKind::Css => catalog.stylesheets.push(asset_id),
                AssetKind::Js => catalog.scripts.push(asset_id),
                AssetKind::CacheResource => {}
            }
        }

        catalog.images.sort();
        catalog.stylesheets.sort();
        catalog.scripts.sort();

        // stylesheet e script sono le risorse critiche da mettere in cache
        catalog.critical_resources = catalog
            .stylesheets
            .iter()
            .chain(catalog.scripts.iter())
            .cloned()
            .collect();

        Ok(catalog)
    }

    /// Job kind for a file, based on its extension
    pub fn classify(path: &Path) -> Option<AssetKind> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "svg" => Some(AssetKind::Image),
            "css" => Some(AssetKind::Css),
            "js" | "mjs" => Some(AssetKind::Js),
            _ => None,
        }
    }

    pub fn total_jobs(&self) -> usize {
        self.images.len() + self.stylesheets.len() + self.scripts.len() + self.critical_resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_jobs() == 0
    }
}
