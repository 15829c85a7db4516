//! Spreadsheet report: one worksheet with a fixed cell map.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use super::ReportContext;
use crate::domain::error::ReportError;
use crate::domain::models::{FitParameters, ParameterKey};

pub const SHEET_NAME: &str = "Zernike decomposition";

/// First row of the catalog table
pub const CATALOG_FIRST_ROW: u32 = 11;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Plain,
    Bold,
    TwoDecimals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u16,
    pub value: CellValue,
    pub style: CellStyle,
}

/// Every cell of the report sheet, in write order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetLayout {
    cells: Vec<Cell>,
}

impl SheetLayout {
    pub fn build(ctx: &ReportContext<'_>) -> Self {
        let mut sheet = Self::default();

        sheet.text(0, 0, ctx.source.display().to_string(), CellStyle::Bold);

        sheet.text(2, 0, "PSF Parameters", CellStyle::Bold);
        sheet.parameter_block(3, 0, &ParameterKey::PSF, ctx.parameters);

        sheet.text(2, 2, "Phase Retrieval Parameters", CellStyle::Bold);
        sheet.parameter_block(3, 2, &ParameterKey::FIT, ctx.parameters);

        let max_iterations = ctx.parameters.max_iterations.unwrap_or_default();
        sheet.text(
            6,
            2,
            format!(
                "Phase retrieval stopped after iteration {} out of {}.",
                ctx.progress.iteration, max_iterations
            ),
            CellStyle::Plain,
        );
        sheet.text(7, 2, ctx.progress.status_summary(), CellStyle::Bold);

        sheet.text(9, 0, "Zernike Decomposition Results", CellStyle::Bold);
        sheet.text(10, 0, "Noll Order", CellStyle::Bold);
        sheet.text(10, 1, "Noll Name", CellStyle::Bold);
        sheet.text(10, 2, "Value", CellStyle::Bold);

        for (row, entry) in (CATALOG_FIRST_ROW..).zip(ctx.catalog.entries()) {
            sheet.number(row, 0, f64::from(entry.order), CellStyle::Plain);
            sheet.text(row, 1, entry.name, CellStyle::Plain);
            sheet.number(row, 2, entry.value, CellStyle::TwoDecimals);
        }

        sheet
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }

    /// Write the layout to an `.xlsx` file
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let bold = Format::new().set_bold();
        let two_decimals = Format::new().set_num_format("0.00");

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for cell in &self.cells {
            let format = match cell.style {
                CellStyle::Plain => None,
                CellStyle::Bold => Some(&bold),
                CellStyle::TwoDecimals => Some(&two_decimals),
            };
            match (&cell.value, format) {
                (CellValue::Text(text), Some(format)) => {
                    worksheet.write_string_with_format(cell.row, cell.col, text, format)?;
                }
                (CellValue::Text(text), None) => {
                    worksheet.write_string(cell.row, cell.col, text)?;
                }
                (CellValue::Number(number), Some(format)) => {
                    worksheet.write_number_with_format(cell.row, cell.col, *number, format)?;
                }
                (CellValue::Number(number), None) => {
                    worksheet.write_number(cell.row, cell.col, *number)?;
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }

    fn parameter_block(
        &mut self,
        first_row: u32,
        col: u16,
        keys: &[ParameterKey],
        parameters: &FitParameters,
    ) {
        for (row, &key) in (first_row..).zip(keys) {
            self.text(row, col, key.label_with_unit(), CellStyle::Plain);
            if let Some(value) = parameters.value(key) {
                self.number(row, col + 1, value.as_f64(), CellStyle::Plain);
            }
        }
    }

    fn text(&mut self, row: u32, col: u16, text: impl Into<String>, style: CellStyle) {
        self.cells.push(Cell {
            row,
            col,
            value: CellValue::Text(text.into()),
            style,
        });
    }

    fn number(&mut self, row: u32, col: u16, number: f64, style: CellStyle) {
        self.cells.push(Cell {
            row,
            col,
            value: CellValue::Number(number),
            style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        ImageArtifactStore, ImageSize, ProgressState, TerminationReason, ZernikeCatalog,
    };
    use crate::services::ResultClassifier;
    use chrono::Local;
    use std::path::PathBuf;

    fn parameters() -> FitParameters {
        FitParameters {
            emission_wavelength: Some(520),
            numerical_aperture: Some(1.4),
            refractive_index: Some(1.518),
            xy_resolution: Some(52),
            z_resolution: Some(200),
            max_iterations: Some(100),
            pupil_tolerance: Some(1e-8),
            mse_tolerance: Some(1e-6),
            phase_tolerance: Some(0.5),
            image_size: Some(ImageSize { xy: 64, z: 32 }),
        }
    }

    fn text(sheet: &SheetLayout, row: u32, col: u16) -> String {
        match &sheet.get(row, col).unwrap().value {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(n) => panic!("expected text at ({row}, {col}), got {n}"),
        }
    }

    #[test]
    fn test_fixed_cell_map() {
        let source = PathBuf::from("/data/beads/psf_01.tif");
        let parameters = parameters();
        let progress = ProgressState::started(100);
        let progress = ProgressState {
            iteration: 42,
            ..progress
        }
        .stopped(TerminationReason::MseConverged);
        let catalog = ResultClassifier::classify(&[0.3, -0.6], &ZernikeCatalog::initialize(), 0.5);
        let artifacts = ImageArtifactStore::new();
        let ctx = ReportContext {
            source: &source,
            parameters: &parameters,
            progress: &progress,
            catalog: &catalog,
            artifacts: &artifacts,
            generated_at: Local::now(),
        };

        let sheet = SheetLayout::build(&ctx);

        assert_eq!(text(&sheet, 0, 0), "/data/beads/psf_01.tif");
        assert_eq!(sheet.get(0, 0).unwrap().style, CellStyle::Bold);
        assert_eq!(text(&sheet, 3, 0), "Emission wavelength in nm");
        assert_eq!(text(&sheet, 7, 0), "z-Resolution in nm");
        assert_eq!(sheet.get(4, 1).unwrap().value, CellValue::Number(1.4));
        assert_eq!(text(&sheet, 5, 2), "Minimal relative MSE difference");
        assert_eq!(
            text(&sheet, 6, 2),
            "Phase retrieval stopped after iteration 42 out of 100."
        );
        assert_eq!(text(&sheet, 7, 2), "Mean-square error converged.");
        assert_eq!(text(&sheet, 10, 1), "Noll Name");

        let last = CATALOG_FIRST_ROW + 14;
        assert_eq!(sheet.get(last, 0).unwrap().value, CellValue::Number(15.0));
        assert_eq!(text(&sheet, last, 1), "Oblique quadrafoil");
        assert_eq!(
            sheet.get(CATALOG_FIRST_ROW + 1, 2).unwrap(),
            &Cell {
                row: CATALOG_FIRST_ROW + 1,
                col: 2,
                value: CellValue::Number(-0.6),
                style: CellStyle::TwoDecimals,
            }
        );
    }
}
