#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::workbook::WORKBOOK_EXTENSIONS;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, Validate,
};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

/// Settings for one export run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub workbook_path: String,
    pub output_path: String,
    pub bundle_name: String,
    pub currency_symbol: String,
}

impl ConfigProvider for ExportConfig {
    fn workbook_path(&self) -> &str {
        &self.workbook_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }
}

impl Validate for ExportConfig {
    fn validate(&self) -> Result<()> {
        validate_path("workbook", &self.workbook_path)?;
        if !Path::new(&self.workbook_path).is_dir() {
            validate_file_extension("workbook", &self.workbook_path, &WORKBOOK_EXTENSIONS)?;
        }
        validate_path("report.output_path", &self.output_path)?;
        validate_non_empty_string("report.bundle_name", &self.bundle_name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn export_config(workbook_path: &str) -> ExportConfig {
        ExportConfig {
            workbook_path: workbook_path.to_string(),
            output_path: "./output".to_string(),
            bundle_name: "portfolio_report.zip".to_string(),
            currency_symbol: "₹".to_string(),
        }
    }

    #[test]
    fn test_export_config_validation() {
        assert!(export_config("fund.xlsx").validate().is_ok());
        assert!(export_config("fund.ZIP").validate().is_ok());
        assert!(export_config("fund.pdf").validate().is_err());
        assert!(export_config("").validate().is_err());

        let dir = TempDir::new().unwrap();
        assert!(export_config(dir.path().to_str().unwrap()).validate().is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().display().to_string());

        storage.write_file("nested/out.zip", b"data").await.unwrap();
        assert_eq!(storage.read_file("nested/out.zip").await.unwrap(), b"data");
    }
}
