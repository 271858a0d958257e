//! Pipeline configuration loading and validation
//!
//! The pipeline configuration is a JSON document with PascalCase keys naming
//! where raw data comes from, which contacts are test contacts, how raw keys
//! are renamed, and the project window. It is validated once after parsing;
//! every later stage can rely on the checks below.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Where raw runs are pulled from
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "SourceType")]
pub enum RawDataSource {
    RapidPro(RapidProSource),
    GCloudBucket(GCloudBucketSource),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RapidProSource {
    pub domain: String,
    #[serde(rename = "TokenFileURL")]
    pub token_file_url: String,
    pub contacts_file_name: String,
    #[serde(default)]
    pub activation_flow_names: Vec<String>,
    #[serde(default)]
    pub survey_flow_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GCloudBucketSource {
    #[serde(rename = "ActivationFlowURLs", default)]
    pub activation_flow_urls: Vec<String>,
    #[serde(rename = "SurveyFlowURLs", default)]
    pub survey_flow_urls: Vec<String>,
}

impl RawDataSource {
    /// Names (or bucket URLs) of the flows holding radio show responses
    pub fn activation_flow_names(&self) -> &[String] {
        match self {
            RawDataSource::RapidPro(source) => &source.activation_flow_names,
            RawDataSource::GCloudBucket(source) => &source.activation_flow_urls,
        }
    }

    /// Names (or bucket URLs) of the flows holding survey responses
    pub fn survey_flow_names(&self) -> &[String] {
        match self {
            RawDataSource::RapidPro(source) => &source.survey_flow_names,
            RawDataSource::GCloudBucket(source) => &source.survey_flow_urls,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            RawDataSource::RapidPro(source) => {
                validate_string(&source.domain, "Domain")?;
                validate_gs_url(&source.token_file_url, "TokenFileURL")?;
                validate_string(&source.contacts_file_name, "ContactsFileName")?;
                for (i, name) in source.activation_flow_names.iter().enumerate() {
                    validate_string(name, &format!("ActivationFlowNames[{}]", i))?;
                }
                for (i, name) in source.survey_flow_names.iter().enumerate() {
                    validate_string(name, &format!("SurveyFlowNames[{}]", i))?;
                }
            }
            RawDataSource::GCloudBucket(source) => {
                for (i, url) in source.activation_flow_urls.iter().enumerate() {
                    validate_gs_url(url, &format!("ActivationFlowURLs[{}]", i))?;
                }
                for (i, url) in source.survey_flow_urls.iter().enumerate() {
                    validate_gs_url(url, &format!("SurveyFlowURLs[{}]", i))?;
                }
            }
        }
        Ok(())
    }
}

/// Location of the phone number <-> uuid table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhoneNumberUuidTable {
    #[serde(rename = "FirebaseCredentialsFileURL")]
    pub firebase_credentials_file_url: String,
    #[serde(rename = "TableName")]
    pub table_name: String,
}

/// Rename of one exported key to the name the pipeline uses
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RapidProKeyRemapping {
    /// Activation messages may arrive through any flow; see `translate_keys`
    #[serde(default)]
    pub is_activation_message: bool,
    pub rapid_pro_key: String,
    pub pipeline_key: String,
}

/// Destination paths for the outputs that are shared with analysts
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriveUpload {
    #[serde(rename = "DriveCredentialsFileURL")]
    pub drive_credentials_file_url: String,
    pub production_upload_path: String,
    pub messages_upload_path: String,
    pub individuals_upload_path: String,
    pub messages_traced_data_upload_path: String,
    pub individuals_traced_data_upload_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineConfiguration {
    pub raw_data_sources: Vec<RawDataSource>,
    #[serde(rename = "RapidProTestContactUUIDs")]
    pub rapid_pro_test_contact_uuids: Vec<String>,
    pub phone_number_uuid_table: PhoneNumberUuidTable,
    #[serde(rename = "RecoveryCSVURLs", default)]
    pub recovery_csv_urls: Option<Vec<String>>,
    pub rapid_pro_key_remappings: Vec<RapidProKeyRemapping>,
    pub project_start_date: DateTime<FixedOffset>,
    pub project_end_date: DateTime<FixedOffset>,
    pub filter_test_messages: bool,
    #[serde(rename = "FlowDefinitionsUploadURLPrefix")]
    pub flow_definitions_upload_url_prefix: String,
    #[serde(rename = "MemoryProfileUploadURLPrefix")]
    pub memory_profile_upload_url_prefix: String,
    #[serde(default)]
    pub drive_upload: Option<DriveUpload>,
}

impl PipelineConfiguration {
    /// Parse and validate a configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid pipeline configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read pipeline configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_json_str(&content)?;
        info!(
            "Loaded pipeline configuration from {} ({} raw data sources, {} key remappings)",
            path.display(),
            config.raw_data_sources.len(),
            config.rapid_pro_key_remappings.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.raw_data_sources.is_empty() {
            return Err(Error::Config("RawDataSources must not be empty".to_string()));
        }
        for source in &self.raw_data_sources {
            source.validate()?;
        }

        if let Some(urls) = &self.recovery_csv_urls {
            for (i, url) in urls.iter().enumerate() {
                validate_string(url, &format!("RecoveryCSVURLs[{}]", i))?;
            }
        }

        for (i, uuid) in self.rapid_pro_test_contact_uuids.iter().enumerate() {
            validate_string(uuid, &format!("RapidProTestContactUUIDs[{}]", i))?;
        }

        validate_gs_url(
            &self.phone_number_uuid_table.firebase_credentials_file_url,
            "FirebaseCredentialsFileURL",
        )?;
        validate_string(&self.phone_number_uuid_table.table_name, "TableName")?;

        for (i, remapping) in self.rapid_pro_key_remappings.iter().enumerate() {
            validate_string(&remapping.rapid_pro_key, &format!("RapidProKeyRemappings[{}].RapidProKey", i))?;
            validate_string(&remapping.pipeline_key, &format!("RapidProKeyRemappings[{}].PipelineKey", i))?;
        }

        if self.project_start_date >= self.project_end_date {
            return Err(Error::Config(format!(
                "ProjectStartDate ({}) must be before ProjectEndDate ({})",
                self.project_start_date, self.project_end_date
            )));
        }

        if let Some(drive) = &self.drive_upload {
            validate_gs_url(&drive.drive_credentials_file_url, "DriveCredentialsFileURL")?;
            validate_string(&drive.production_upload_path, "ProductionUploadPath")?;
            validate_string(&drive.messages_upload_path, "MessagesUploadPath")?;
            validate_string(&drive.individuals_upload_path, "IndividualsUploadPath")?;
            validate_string(&drive.messages_traced_data_upload_path, "MessagesTracedDataUploadPath")?;
            validate_string(
                &drive.individuals_traced_data_upload_path,
                "IndividualsTracedDataUploadPath",
            )?;
        }

        validate_string(&self.flow_definitions_upload_url_prefix, "FlowDefinitionsUploadURLPrefix")?;
        validate_string(&self.memory_profile_upload_url_prefix, "MemoryProfileUploadURLPrefix")?;
        Ok(())
    }
}

fn validate_string(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{} must be a non-empty string", name)));
    }
    Ok(())
}

fn validate_gs_url(value: &str, name: &str) -> Result<()> {
    validate_string(value, name)?;
    match value.strip_prefix("gs://") {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
        _ => Err(Error::Config(format!(
            "{} must be a gs URL (gs://bucket-name/file), got '{}'",
            name, value
        ))),
    }
}
