// Multipart form parsing shared by the staff panels. Collects text fields
// and uploaded files into one structure so handlers can read them in any
// order.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct ParsedForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

pub async fn parse_multipart(mut multipart: Multipart) -> AppResult<ParsedForm> {
    let mut form = ParsedForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_owned) {
            Some(file_name) if !file_name.is_empty() => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
                if !bytes.is_empty() {
                    form.files.push(UploadedFile {
                        field: name,
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field: {}", e)))?;
                form.fields.insert(name, value);
            }
        }
    }
    Ok(form)
}

impl ParsedForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn text_or_default(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    pub fn required(&self, name: &str) -> AppResult<String> {
        match self.text(name) {
            Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
            _ => Err(AppError::Validation(format!("Field '{}' is required", name))),
        }
    }

    pub fn i64_or(&self, name: &str, default: i64) -> AppResult<i64> {
        match self.text(name) {
            None => Ok(default),
            Some(value) if value.trim().is_empty() => Ok(default),
            Some(value) => value.trim().parse().map_err(|_| {
                AppError::Validation(format!("Field '{}' must be a number", name))
            }),
        }
    }

    pub fn opt_i64(&self, name: &str) -> AppResult<Option<i64>> {
        match self.text(name) {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| AppError::Validation(format!("Field '{}' must be a number", name))),
        }
    }

    /// Checkbox-style flags: "on", "true" and "1" all count.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        match self.text(name) {
            None => default,
            Some(value) => matches!(value.trim(), "on" | "true" | "1"),
        }
    }

    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(fields: &[(&str, &str)]) -> ParsedForm {
        ParsedForm {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: Vec::new(),
        }
    }

    #[test]
    fn numeric_fields_fall_back_and_validate() {
        let form = form_with(&[("order", "7"), ("blank", ""), ("bad", "seven")]);
        assert_eq!(form.i64_or("order", 0).unwrap(), 7);
        assert_eq!(form.i64_or("blank", 3).unwrap(), 3);
        assert_eq!(form.i64_or("missing", 5).unwrap(), 5);
        assert!(form.i64_or("bad", 0).is_err());
    }

    #[test]
    fn flags_accept_checkbox_values() {
        let form = form_with(&[("a", "on"), ("b", "false"), ("c", "1")]);
        assert!(form.flag("a", false));
        assert!(!form.flag("b", true));
        assert!(form.flag("c", false));
        assert!(form.flag("missing", true));
    }
}
