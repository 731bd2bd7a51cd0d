//! Image list loading for `quayscan scan`

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::cli::ScanArgs;
use crate::error::CliError;

/// Body of an image list file: `{ "images": [...] }`.
///
/// A missing or null `images` key yields an empty list.
#[derive(Debug, Default, Deserialize)]
struct ImageList {
    #[serde(default)]
    images: Option<Vec<String>>,
}

/// Collect the image references requested by `scan` arguments.
///
/// Returns an error when neither source yields at least one reference.
pub async fn load_image_refs(args: &ScanArgs) -> Result<Vec<String>, CliError> {
    let images = match (&args.image, &args.file) {
        (Some(image), _) => {
            info!(image = %image, "processing single image");
            vec![image.clone()]
        }
        (None, Some(path)) => load_from_file(path).await?,
        (None, None) => Vec::new(),
    };

    if images.is_empty() {
        return Err(CliError::Input(
            "no image references specified or found in the input file".to_owned(),
        ));
    }
    Ok(images)
}

/// Read an image list from a `.json`, `.yaml` or `.yml` file.
pub async fn load_from_file(path: &Path) -> Result<Vec<String>, CliError> {
    info!(path = %path.display(), "reading image list");

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    // Reject unsupported files before reading them
    if !matches!(extension.as_str(), "json" | "yaml" | "yml") {
        return Err(CliError::Input(format!(
            "unsupported file extension '.{extension}' for '{}': use .json, .yaml, or .yml",
            path.display()
        )));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::Input(format!("reading input file '{}': {e}", path.display())))?;

    let list = if extension == "json" {
        parse_json(&content)
            .map_err(|e| CliError::Input(format!("parsing JSON file '{}': {e}", path.display())))?
    } else {
        parse_yaml(&content)
            .map_err(|e| CliError::Input(format!("parsing YAML file '{}': {e}", path.display())))?
    };

    let images = list.images.unwrap_or_default();
    debug!(count = images.len(), "image list loaded");
    Ok(images)
}

fn parse_json(content: &str) -> Result<ImageList, serde_json::Error> {
    serde_json::from_str(content)
}

fn parse_yaml(content: &str) -> Result<ImageList, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(ImageList::default());
    }
    Ok(serde_yaml::from_str::<Option<ImageList>>(content)?.unwrap_or_default())
}
