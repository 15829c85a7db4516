use anyhow::Result;
use serde::Serialize;

use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::CatalogEntry;
use crate::services::ResultClassifier;

#[derive(Debug, Serialize)]
pub struct CatalogOutput {
    pub polynomials: Vec<CatalogEntry>,
}

impl CommandOutput for CatalogOutput {
    fn to_human(&self) -> String {
        format!(
            "{} Zernike polynomials (bold: salient aberrations)\n{}",
            self.polynomials.len(),
            TableFormatter::new().format_catalog(&self.polynomials, false)
        )
    }
}

pub fn execute(json: bool) -> Result<()> {
    let catalog = ResultClassifier::initialize_catalog();
    let out = CatalogOutput {
        polynomials: catalog.entries().to_vec(),
    };
    output(&out, json);
    Ok(())
}
