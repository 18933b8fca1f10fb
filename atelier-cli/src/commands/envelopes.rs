//! Envelope builders for each command

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use atelier_protocol::{AssetRef, Envelope, InsertImage, ToolRequest};
use atelier_utils::{AtelierError, Result};

pub fn preview(url: &str) -> Envelope {
    Envelope::new("UPDATE_PREVIEW", json!({ "url": url }))
}

/// `DESIGN_COMMAND` from inline JSON or a JSON file
pub fn design(input: &str) -> Result<Envelope> {
    let path = Path::new(input);
    let text = if path.is_file() {
        std::fs::read_to_string(path).map_err(|e| AtelierError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?
    } else {
        input.to_string()
    };

    let payload: Value = serde_json::from_str(&text)
        .map_err(|e| AtelierError::InvalidMessage(format!("Invalid design JSON: {}", e)))?;
    Ok(Envelope::new("DESIGN_COMMAND", payload))
}

/// MIME type for an image data URL, from the file extension
pub fn image_mime(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" => "image/jpeg".to_string(),
        "svg" => "image/svg+xml".to_string(),
        "" => "application/octet-stream".to_string(),
        other => format!("image/{}", other),
    }
}

/// `INSERT_IMAGE` with the file inlined as a base64 data URL
pub fn image(path: &Path, name: Option<&str>, width: u32, height: u32) -> Result<Envelope> {
    let bytes = std::fs::read(path).map_err(|e| AtelierError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let name = match name {
        Some(name) => name.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let insert = InsertImage {
        image_data: format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes)),
        name,
        width: f64::from(width),
        height: f64::from(height),
        x: 0.0,
        y: 0.0,
    };
    let payload = serde_json::to_value(&insert)
        .map_err(|e| AtelierError::InvalidMessage(format!("Invalid image payload: {}", e)))?;
    Ok(Envelope::new("INSERT_IMAGE", payload))
}

/// `PREVIEW_UPDATE` or `VIDEO_UPDATE` naming an asset under `asset_base`
pub fn asset(path: &Path, asset_base: &str) -> Result<Envelope> {
    if !path.is_file() {
        return Err(AtelierError::InvalidMessage(format!(
            "File not found: {}",
            path.display()
        )));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AtelierError::InvalidMessage("Asset path has no file name".into()))?;

    let url = format!(
        "{}{}",
        asset_base.trim_end_matches('/'),
        atelier_protocol::asset_path(&name)
    );
    let asset = AssetRef::new(url, name);

    let is_video = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false);
    Ok(if is_video {
        Envelope::video_update(&asset)
    } else {
        Envelope::preview_update(&asset)
    })
}

/// `EXECUTE_TOOL photoshop execute_script` for `path`
pub fn script(path: &Path) -> Result<Envelope> {
    let path = std::path::absolute(path).map_err(|e| AtelierError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let request = ToolRequest::new(
        "photoshop",
        "execute_script",
        json!({ "scriptPath": path.to_string_lossy() }),
    );
    Ok(Envelope::execute_tool(&request))
}

/// Generic `EXECUTE_TOOL`; `data` must be a JSON object when present
pub fn tool(tool: &str, action: &str, data: Option<&str>) -> Result<Envelope> {
    let data = match data {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw)
                .map_err(|e| AtelierError::InvalidMessage(format!("Invalid --data JSON: {}", e)))?;
            if !value.is_object() {
                return Err(AtelierError::InvalidMessage(
                    "--data must be a JSON object".into(),
                ));
            }
            value
        }
        None => json!({}),
    };
    Ok(Envelope::execute_tool(&ToolRequest::new(tool, action, data)))
}

pub fn chat(words: &[String]) -> Envelope {
    Envelope::chat(words.join(" "))
}
